//! 全体判定の集計

use crate::types::{FieldResult, FieldStatus, OverallStatus};

/// フィールド結果から全体判定を導く
///
/// - 受理済み（accepted）でないFAILが1件でもあればFAIL
/// - なければWARNING/NOT_FOUNDが1件でもあればREVIEW
/// - それ以外はPASS
///
/// 受理済みの結果は集計から除外する。confirmed_issueは除外しない。
pub fn compute_overall_status(results: &[FieldResult]) -> OverallStatus {
    let blocking: Vec<&FieldResult> = results.iter().filter(|r| !r.is_accepted()).collect();

    if blocking.iter().any(|r| r.status == FieldStatus::Fail) {
        OverallStatus::Fail
    } else if blocking
        .iter()
        .any(|r| matches!(r.status, FieldStatus::Warning | FieldStatus::NotFound))
    {
        OverallStatus::Review
    } else {
        OverallStatus::Pass
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{MatchResult, MatchStatus, MatchType, OverrideAction};
    use chrono::Utc;

    fn field(status: MatchStatus) -> FieldResult {
        FieldResult::from_match("Brand Name", "Old Tom", Some("Old Tom"), MatchType::Fuzzy, MatchResult::new(status, 0.5, ""))
    }

    #[test]
    fn test_all_pass() {
        let results = vec![field(MatchStatus::Pass), field(MatchStatus::Pass)];
        assert_eq!(compute_overall_status(&results), OverallStatus::Pass);
        assert_eq!(compute_overall_status(&[]), OverallStatus::Pass);
    }

    #[test]
    fn test_fail_wins() {
        let results = vec![field(MatchStatus::Warning), field(MatchStatus::Fail), field(MatchStatus::Pass)];
        assert_eq!(compute_overall_status(&results), OverallStatus::Fail);
    }

    #[test]
    fn test_review_for_warning_or_not_found() {
        assert_eq!(
            compute_overall_status(&[field(MatchStatus::Pass), field(MatchStatus::Warning)]),
            OverallStatus::Review
        );
        assert_eq!(
            compute_overall_status(&[field(MatchStatus::NotFound)]),
            OverallStatus::Review
        );
    }

    #[test]
    fn test_accepted_override_neutralizes_fail() {
        let accepted = field(MatchStatus::Fail).with_override(OverrideAction::Accepted, Utc::now());
        assert_eq!(accepted.status, FieldStatus::Overridden);
        let results = vec![field(MatchStatus::Pass), accepted];
        assert_eq!(compute_overall_status(&results), OverallStatus::Pass);
    }

    #[test]
    fn test_confirmed_issue_still_blocks() {
        let confirmed = field(MatchStatus::Fail).with_override(OverrideAction::ConfirmedIssue, Utc::now());
        assert_eq!(compute_overall_status(&[confirmed]), OverallStatus::Fail);
    }

    #[test]
    fn test_idempotent() {
        let results = vec![field(MatchStatus::Warning), field(MatchStatus::Pass)];
        assert_eq!(compute_overall_status(&results), compute_overall_status(&results));
    }
}
