//! 複数画像の統合と食い違いの解決
//!
//! 同じラベルを撮った複数画像の抽出結果をフィールドごとに多数決で統合する。
//! 値の比較は小文字化 + 空白統一のみ（照合器より粗い同一判定）。
//! 食い違いは `FieldConflict` として残し、人の判断で `resolve_conflict` する。
//! 解決は常に新しい `MergedExtraction` を返し、元の値は変更しない。

use crate::fields::FIELD_CONFIGS;
use crate::normalize::normalize_key;
use crate::types::{ExtractedFields, FieldKey, HeaderEmphasis, HeaderFormat, ImageExtraction, ImageSource};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// 候補値とその値を出した画像
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourcedFieldValue {
    pub value: String,
    pub sources: Vec<ImageSource>,
}

/// 画像間で値が食い違ったフィールド
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConflict {
    pub field_key: FieldKey,
    pub display_name: String,
    /// 画像数の多い順、同数なら正規化キー（小文字化 + 空白統一）の昇順
    pub candidates: Vec<SourcedFieldValue>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_value: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl FieldConflict {
    pub fn is_resolved(&self) -> bool {
        self.selected_value.is_some()
    }

    /// 正規化キーが一致する候補
    pub fn find_candidate(&self, value: &str) -> Option<&SourcedFieldValue> {
        let key = normalize_key(value);
        self.candidates.iter().find(|c| normalize_key(&c.value) == key)
    }
}

/// 統合結果（リクエストごとに作り、解決のたびに複製する）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MergedExtraction {
    pub consensus: ExtractedFields,
    #[serde(default)]
    pub sources: BTreeMap<FieldKey, SourcedFieldValue>,
    #[serde(default)]
    pub conflicts: Vec<FieldConflict>,
    #[serde(default)]
    pub extractions: Vec<ImageExtraction>,
}

impl MergedExtraction {
    pub fn conflict(&self, key: FieldKey) -> Option<&FieldConflict> {
        self.conflicts.iter().find(|c| c.field_key == key)
    }
}

struct Group {
    key: String,
    first_value: String,
    sources: Vec<ImageSource>,
}

/// 複数画像の抽出結果を統合する
///
/// 一部の画像が処理できなかった場合も残りの画像だけで統合する。
pub fn merge_extractions(extractions: &[ImageExtraction]) -> MergedExtraction {
    let mut consensus = ExtractedFields::default();
    let mut sources = BTreeMap::new();
    let mut conflicts = Vec::new();

    for config in FIELD_CONFIGS.iter() {
        let mut groups = group_values(extractions, config.key);
        if groups.is_empty() {
            continue;
        }

        // 安定ソート: 画像数の降順、同数なら正規化キーの昇順
        groups.sort_by(|a, b| {
            b.sources
                .len()
                .cmp(&a.sources.len())
                .then_with(|| a.key.cmp(&b.key))
        });

        let candidates: Vec<SourcedFieldValue> = groups
            .into_iter()
            .map(|g| SourcedFieldValue {
                value: g.first_value,
                sources: g.sources,
            })
            .collect();

        let top = candidates[0].clone();
        consensus.set(config.key, Some(top.value.clone()));
        sources.insert(config.key, top);

        if candidates.len() > 1 {
            warn!(
                field = %config.key,
                candidates = candidates.len(),
                provisional = %candidates[0].value,
                "images disagree on field value"
            );
            conflicts.push(FieldConflict {
                field_key: config.key,
                display_name: config.display_name.to_string(),
                candidates,
                selected_value: None,
                resolved_at: None,
            });
        }
    }

    consensus.header_format = extractions
        .iter()
        .map(|e| e.fields.header_format)
        .find(|f| *f != HeaderFormat::default())
        .unwrap_or_default();
    consensus.header_emphasis = extractions
        .iter()
        .map(|e| e.fields.header_emphasis)
        .find(|e| *e != HeaderEmphasis::default())
        .unwrap_or_default();

    let observations: Vec<&str> = extractions
        .iter()
        .filter_map(|e| e.fields.observations.as_deref())
        .map(str::trim)
        .filter(|o| !o.is_empty())
        .collect();
    consensus.observations = if observations.is_empty() {
        None
    } else {
        Some(observations.join("; "))
    };

    debug!(
        images = extractions.len(),
        conflicts = conflicts.len(),
        "merged extractions"
    );

    MergedExtraction {
        consensus,
        sources,
        conflicts,
        extractions: extractions.to_vec(),
    }
}

fn group_values(extractions: &[ImageExtraction], key: FieldKey) -> Vec<Group> {
    let mut groups: Vec<Group> = Vec::new();
    for extraction in extractions {
        let Some(value) = extraction.fields.get(key).filter(|v| !v.trim().is_empty()) else {
            continue;
        };
        let normalized = normalize_key(value);
        match groups.iter_mut().find(|g| g.key == normalized) {
            Some(group) => group.sources.push(extraction.source.clone()),
            None => groups.push(Group {
                key: normalized,
                first_value: value.to_string(),
                sources: vec![extraction.source.clone()],
            }),
        }
    }
    groups
}

/// 食い違いを選択値で解決した新しい統合結果を返す
pub fn resolve_conflict(merged: &MergedExtraction, field_key: FieldKey, selected_value: &str) -> MergedExtraction {
    resolve_conflict_at(merged, field_key, selected_value, Utc::now())
}

/// 解決時刻を指定して解決する
///
/// 候補にない値や食い違いのないフィールドを指定した場合は入力をそのまま返す。
/// 解決済みのフィールドも再解決できる。
pub fn resolve_conflict_at(
    merged: &MergedExtraction,
    field_key: FieldKey,
    selected_value: &str,
    at: DateTime<Utc>,
) -> MergedExtraction {
    let Some(index) = merged.conflicts.iter().position(|c| c.field_key == field_key) else {
        debug!(field = %field_key, "no conflict to resolve");
        return merged.clone();
    };
    let Some(candidate) = merged.conflicts[index].find_candidate(selected_value).cloned() else {
        warn!(field = %field_key, value = selected_value, "selected value is not a candidate");
        return merged.clone();
    };

    let mut resolved = merged.clone();
    resolved.consensus.set(field_key, Some(candidate.value.clone()));
    resolved.sources.insert(field_key, candidate.clone());

    let conflict = &mut resolved.conflicts[index];
    conflict.selected_value = Some(candidate.value.clone());
    conflict.resolved_at = Some(at);

    info!(field = %field_key, value = %candidate.value, "conflict resolved");
    resolved
}

pub fn all_conflicts_resolved(merged: &MergedExtraction) -> bool {
    merged.conflicts.iter().all(FieldConflict::is_resolved)
}

pub fn get_unresolved_conflicts(merged: &MergedExtraction) -> Vec<&FieldConflict> {
    merged.conflicts.iter().filter(|c| !c.is_resolved()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageLabel;
    use chrono::TimeZone;

    fn image(id: &str, label: ImageLabel, fields: ExtractedFields) -> ImageExtraction {
        ImageExtraction {
            source: ImageSource {
                id: id.to_string(),
                label,
                filename: format!("{}.jpg", id),
            },
            fields,
            latency_ms: 0,
        }
    }

    fn brand(value: &str) -> ExtractedFields {
        ExtractedFields {
            brand_name: Some(value.to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_identical_values_no_conflict() {
        let merged = merge_extractions(&[
            image("a", ImageLabel::Front, brand("Old Tom Distillery")),
            image("b", ImageLabel::Back, brand("Old Tom Distillery")),
        ]);
        assert!(merged.conflicts.is_empty());
        assert_eq!(merged.sources[&FieldKey::BrandName].sources.len(), 2);
        assert_eq!(merged.consensus.brand_name.as_deref(), Some("Old Tom Distillery"));
    }

    #[test]
    fn test_case_and_spacing_group_together() {
        let merged = merge_extractions(&[
            image("a", ImageLabel::Front, brand("Old Tom  Distillery")),
            image("b", ImageLabel::Back, brand("OLD TOM DISTILLERY")),
        ]);
        assert!(merged.conflicts.is_empty());
        // 最初に見つかった表記を採用
        assert_eq!(merged.consensus.brand_name.as_deref(), Some("Old Tom  Distillery"));
    }

    #[test]
    fn test_disagreement_creates_one_conflict() {
        let merged = merge_extractions(&[
            image("a", ImageLabel::Front, brand("Old Tom Distillery")),
            image("b", ImageLabel::Back, brand("Old Tim Distillery")),
        ]);
        assert_eq!(merged.conflicts.len(), 1);
        let conflict = &merged.conflicts[0];
        assert_eq!(conflict.field_key, FieldKey::BrandName);
        assert_eq!(conflict.display_name, "Brand Name");
        assert_eq!(conflict.candidates.len(), 2);
        assert!(conflict.candidates.iter().all(|c| c.sources.len() == 1));
        // 同数なので正規化キーの昇順
        assert_eq!(conflict.candidates[0].value, "Old Tim Distillery");
        assert_eq!(merged.consensus.brand_name.as_deref(), Some("Old Tim Distillery"));
        assert!(!conflict.is_resolved());
    }

    #[test]
    fn test_tie_break_uses_normalized_key_not_raw_value() {
        // 生の値では "ZETA" < "alpha" だが、正規化キーでは "alpha" < "zeta"
        let merged = merge_extractions(&[
            image("a", ImageLabel::Front, brand("ZETA")),
            image("b", ImageLabel::Back, brand("alpha")),
        ]);
        let conflict = merged.conflict(FieldKey::BrandName).unwrap();
        assert_eq!(conflict.candidates[0].value, "alpha");
        assert_eq!(conflict.candidates[1].value, "ZETA");
        assert_eq!(merged.consensus.brand_name.as_deref(), Some("alpha"));
    }

    #[test]
    fn test_majority_wins() {
        let merged = merge_extractions(&[
            image("a", ImageLabel::Front, brand("Old Tom Distillery")),
            image("b", ImageLabel::Back, brand("Old Tim Distillery")),
            image("c", ImageLabel::Neck, brand("old tom distillery")),
        ]);
        let conflict = merged.conflict(FieldKey::BrandName).unwrap();
        assert_eq!(conflict.candidates[0].value, "Old Tom Distillery");
        assert_eq!(conflict.candidates[0].sources.len(), 2);
        assert_eq!(merged.consensus.brand_name.as_deref(), Some("Old Tom Distillery"));
    }

    #[test]
    fn test_missing_field_has_no_sources() {
        let merged = merge_extractions(&[
            image("a", ImageLabel::Front, brand("Old Tom")),
            image("b", ImageLabel::Back, ExtractedFields::default()),
        ]);
        assert!(merged.consensus.net_contents.is_none());
        assert!(!merged.sources.contains_key(&FieldKey::NetContents));
        assert_eq!(merged.sources[&FieldKey::BrandName].sources.len(), 1);
    }

    #[test]
    fn test_header_and_observations() {
        let front = ExtractedFields {
            observations: Some("glare on left".into()),
            ..Default::default()
        };
        let back = ExtractedFields {
            header_format: HeaderFormat::AllCaps,
            header_emphasis: HeaderEmphasis::AppearsBoldOrHeavy,
            observations: Some("small print".into()),
            ..Default::default()
        };
        let merged = merge_extractions(&[
            image("a", ImageLabel::Front, front),
            image("b", ImageLabel::Back, back),
        ]);
        assert_eq!(merged.consensus.header_format, HeaderFormat::AllCaps);
        assert_eq!(merged.consensus.header_emphasis, HeaderEmphasis::AppearsBoldOrHeavy);
        assert_eq!(merged.consensus.observations.as_deref(), Some("glare on left; small print"));
    }

    #[test]
    fn test_empty_input() {
        let merged = merge_extractions(&[]);
        assert!(merged.conflicts.is_empty());
        assert!(merged.sources.is_empty());
        assert!(all_conflicts_resolved(&merged));
    }

    #[test]
    fn test_resolve_conflict_returns_new_copy() {
        let merged = merge_extractions(&[
            image("a", ImageLabel::Front, brand("Old Tom Distillery")),
            image("b", ImageLabel::Back, brand("Old Tim Distillery")),
        ]);
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap();
        let resolved = resolve_conflict_at(&merged, FieldKey::BrandName, "old tom distillery", at);

        assert_eq!(resolved.consensus.brand_name.as_deref(), Some("Old Tom Distillery"));
        assert_eq!(resolved.sources[&FieldKey::BrandName].sources[0].id, "a");
        let conflict = resolved.conflict(FieldKey::BrandName).unwrap();
        assert_eq!(conflict.selected_value.as_deref(), Some("Old Tom Distillery"));
        assert_eq!(conflict.resolved_at, Some(at));
        assert!(all_conflicts_resolved(&resolved));

        // 元のスナップショットは変わらない
        assert!(!all_conflicts_resolved(&merged));
        assert_eq!(merged.consensus.brand_name.as_deref(), Some("Old Tim Distillery"));
    }

    #[test]
    fn test_resolve_with_unknown_value_is_noop() {
        let merged = merge_extractions(&[
            image("a", ImageLabel::Front, brand("Old Tom Distillery")),
            image("b", ImageLabel::Back, brand("Old Tim Distillery")),
        ]);
        let unchanged = resolve_conflict(&merged, FieldKey::BrandName, "Old Tam Distillery");
        assert_eq!(unchanged, merged);

        let no_conflict = resolve_conflict(&merged, FieldKey::NetContents, "750 mL");
        assert_eq!(no_conflict, merged);
    }

    #[test]
    fn test_re_resolve() {
        let merged = merge_extractions(&[
            image("a", ImageLabel::Front, brand("Old Tom Distillery")),
            image("b", ImageLabel::Back, brand("Old Tim Distillery")),
        ]);
        let first = resolve_conflict(&merged, FieldKey::BrandName, "Old Tom Distillery");
        let second = resolve_conflict(&first, FieldKey::BrandName, "Old Tim Distillery");
        assert_eq!(second.consensus.brand_name.as_deref(), Some("Old Tim Distillery"));
        assert_eq!(
            second.conflict(FieldKey::BrandName).unwrap().selected_value.as_deref(),
            Some("Old Tim Distillery")
        );
    }

    #[test]
    fn test_unresolved_conflicts() {
        let front = ExtractedFields {
            brand_name: Some("Old Tom".into()),
            net_contents: Some("750 mL".into()),
            ..Default::default()
        };
        let back = ExtractedFields {
            brand_name: Some("Old Tim".into()),
            net_contents: Some("700 mL".into()),
            ..Default::default()
        };
        let merged = merge_extractions(&[
            image("a", ImageLabel::Front, front),
            image("b", ImageLabel::Back, back),
        ]);
        assert_eq!(get_unresolved_conflicts(&merged).len(), 2);

        let partial = resolve_conflict(&merged, FieldKey::NetContents, "750 mL");
        let unresolved = get_unresolved_conflicts(&partial);
        assert_eq!(unresolved.len(), 1);
        assert_eq!(unresolved[0].field_key, FieldKey::BrandName);
        assert!(!all_conflicts_resolved(&partial));
    }

    #[test]
    fn test_serde_roundtrip_keeps_conflicts() {
        let merged = merge_extractions(&[
            image("a", ImageLabel::Front, brand("Old Tom")),
            image("b", ImageLabel::Back, brand("Old Tim")),
        ]);
        let json = serde_json::to_string(&merged).unwrap();
        assert!(json.contains("\"brandName\""));
        let back: MergedExtraction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, merged);
    }
}
