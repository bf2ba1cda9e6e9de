//! ラベル1件の検証
//!
//! 画像が1枚ならその抽出結果を、複数なら統合結果の合意値を照合器に渡し、
//! 警告表示の4項目を加えて全体判定まで行う。

use crate::fields::FIELD_CONFIGS;
use crate::matcher::Matcher;
use crate::merge::{all_conflicts_resolved, merge_extractions, MergedExtraction};
use crate::status::compute_overall_status;
use crate::types::{
    ApplicationData, ExtractedFields, FieldKey, FieldResult, ImageExtraction, OverallStatus,
    GOVERNMENT_WARNING_TEXT,
};
use crate::warning::verify_government_warning_with;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// ラベル1件の検証結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub results: Vec<FieldResult>,
    pub overall_status: OverallStatus,
    /// 複数画像を統合した場合のみ
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub merged: Option<MergedExtraction>,
}

impl VerificationReport {
    /// 人の確認が必要か（判定がPASS以外、または未解決の食い違いあり）
    pub fn needs_attention(&self) -> bool {
        self.overall_status != OverallStatus::Pass
            || self.merged.as_ref().map_or(false, |m| !all_conflicts_resolved(m))
    }

    /// 結果を差し替えて全体判定を再計算する
    pub fn with_results(&self, results: Vec<FieldResult>) -> Self {
        Self {
            overall_status: compute_overall_status(&results),
            results,
            merged: self.merged.clone(),
        }
    }
}

/// 組み込みテーブルで1件の抽出結果を検証
pub fn verify_label(application: &ApplicationData, extracted: &ExtractedFields) -> Vec<FieldResult> {
    verify_label_with(Matcher::builtin(), application, extracted)
}

/// 設定済みの全フィールドを照合し、警告表示の4項目を加える
///
/// 任意フィールドは申請側が省略していれば照合しない。
pub fn verify_label_with(
    matcher: &Matcher,
    application: &ApplicationData,
    extracted: &ExtractedFields,
) -> Vec<FieldResult> {
    let mut results = Vec::with_capacity(FIELD_CONFIGS.len() + 3);

    for config in FIELD_CONFIGS.iter() {
        if config.key == FieldKey::GovernmentWarning {
            continue;
        }
        let expected = match application.value(config.key) {
            Some(value) => value,
            None if !config.required => {
                debug!(field = %config.key, "optional field omitted by application");
                continue;
            }
            None => "",
        };
        let label_value = extracted.get(config.key);
        let compared = matcher.compare_field(config.key, config.match_type, label_value, expected);
        results.push(FieldResult::from_match(
            config.display_name,
            expected,
            label_value,
            config.match_type,
            compared,
        ));
    }

    let expected_warning = application
        .value(FieldKey::GovernmentWarning)
        .unwrap_or(GOVERNMENT_WARNING_TEXT);
    results.extend(verify_government_warning_with(matcher, extracted, expected_warning));
    results
}

/// 組み込みテーブルで画像群を検証
pub fn verify_images(application: &ApplicationData, extractions: &[ImageExtraction]) -> VerificationReport {
    verify_images_with(Matcher::builtin(), application, extractions)
}

/// 画像1枚ならそのまま、複数なら統合してから検証する
pub fn verify_images_with(
    matcher: &Matcher,
    application: &ApplicationData,
    extractions: &[ImageExtraction],
) -> VerificationReport {
    let (fields, merged) = match extractions {
        [single] => (single.fields.clone(), None),
        _ => {
            let merged = merge_extractions(extractions);
            (merged.consensus.clone(), Some(merged))
        }
    };

    let results = verify_label_with(matcher, application, &fields);
    let overall_status = compute_overall_status(&results);
    debug!(images = extractions.len(), status = ?overall_status, "label verified");

    VerificationReport {
        results,
        overall_status,
        merged,
    }
}

/// 組み込みテーブルで統合結果を検証
pub fn verify_merged(application: &ApplicationData, merged: &MergedExtraction) -> VerificationReport {
    verify_merged_with(Matcher::builtin(), application, merged)
}

/// 統合結果（食い違い解決後を含む）の合意値で検証し直す
pub fn verify_merged_with(
    matcher: &Matcher,
    application: &ApplicationData,
    merged: &MergedExtraction,
) -> VerificationReport {
    let results = verify_label_with(matcher, application, &merged.consensus);
    let overall_status = compute_overall_status(&results);
    debug!(
        conflicts = merged.conflicts.len(),
        status = ?overall_status,
        "merged extraction verified"
    );

    VerificationReport {
        results,
        overall_status,
        merged: Some(merged.clone()),
    }
}
