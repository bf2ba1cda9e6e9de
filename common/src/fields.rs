//! フィールド設定
//!
//! フィールドキーごとの表示名・照合方式・必須フラグ。
//! 必須でないフィールドは申請側が値を省略した場合に照合しない。

use crate::types::{FieldKey, MatchType};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldConfig {
    pub key: FieldKey,
    pub display_name: &'static str,
    pub match_type: MatchType,
    pub required: bool,
}

pub const FIELD_CONFIGS: [FieldConfig; 7] = [
    FieldConfig {
        key: FieldKey::BrandName,
        display_name: "Brand Name",
        match_type: MatchType::Fuzzy,
        required: true,
    },
    FieldConfig {
        key: FieldKey::ClassType,
        display_name: "Class/Type",
        match_type: MatchType::Fuzzy,
        required: true,
    },
    FieldConfig {
        key: FieldKey::AlcoholContent,
        display_name: "Alcohol Content",
        match_type: MatchType::Abv,
        required: true,
    },
    FieldConfig {
        key: FieldKey::NetContents,
        display_name: "Net Contents",
        match_type: MatchType::Volume,
        required: true,
    },
    FieldConfig {
        key: FieldKey::NameAddress,
        display_name: "Name and Address",
        match_type: MatchType::Address,
        required: true,
    },
    FieldConfig {
        key: FieldKey::CountryOfOrigin,
        display_name: "Country of Origin",
        match_type: MatchType::Strict,
        required: false,
    },
    FieldConfig {
        key: FieldKey::GovernmentWarning,
        display_name: "Government Warning",
        match_type: MatchType::Strict,
        required: true,
    },
];

/// フィールドキーの設定を取得
pub fn field_config(key: FieldKey) -> &'static FieldConfig {
    // FIELD_CONFIGS は FieldKey::ALL と同じ順序
    &FIELD_CONFIGS[FieldKey::ALL.iter().position(|k| *k == key).unwrap_or(0)]
}
