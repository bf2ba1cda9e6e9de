//! 照合の型定義
//!
//! - ApplicationData: 申請データ（照合の基準）
//! - ExtractedFields: 1枚の画像から抽出されたフィールド
//! - ImageSource / ImageExtraction: 画像の識別情報と抽出結果
//! - MatchResult / FieldResult: フィールド単位の照合結果
//! - OverallStatus: 全体判定（常にFieldResultから導出）

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// 27 CFR 16.21 の健康警告文
pub const GOVERNMENT_WARNING_TEXT: &str = "GOVERNMENT WARNING: (1) According to the Surgeon General, \
women should not drink alcoholic beverages during pregnancy because of the risk of birth defects. \
(2) Consumption of alcoholic beverages impairs your ability to drive a car or operate machinery, \
and may cause health problems.";

fn default_government_warning() -> String {
    GOVERNMENT_WARNING_TEXT.to_string()
}

/// 照合対象フィールドのキー
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FieldKey {
    BrandName,
    ClassType,
    AlcoholContent,
    NetContents,
    NameAddress,
    CountryOfOrigin,
    GovernmentWarning,
}

impl FieldKey {
    /// 統合・照合で走査する順序
    pub const ALL: [FieldKey; 7] = [
        FieldKey::BrandName,
        FieldKey::ClassType,
        FieldKey::AlcoholContent,
        FieldKey::NetContents,
        FieldKey::NameAddress,
        FieldKey::CountryOfOrigin,
        FieldKey::GovernmentWarning,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            FieldKey::BrandName => "brandName",
            FieldKey::ClassType => "classType",
            FieldKey::AlcoholContent => "alcoholContent",
            FieldKey::NetContents => "netContents",
            FieldKey::NameAddress => "nameAddress",
            FieldKey::CountryOfOrigin => "countryOfOrigin",
            FieldKey::GovernmentWarning => "governmentWarning",
        }
    }
}

impl fmt::Display for FieldKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for FieldKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FieldKey::ALL
            .iter()
            .find(|k| k.as_str().eq_ignore_ascii_case(s.trim()))
            .copied()
            .ok_or_else(|| {
                let known: Vec<&str> = FieldKey::ALL.iter().map(|k| k.as_str()).collect();
                format!("Unknown field: {}. Use one of {}", s, known.join(", "))
            })
    }
}

/// 申請データ（不変の入力）
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationData {
    #[serde(default)]
    pub brand_name: String,

    #[serde(default)]
    pub class_type: String,

    #[serde(default)]
    pub alcohol_content: String,

    #[serde(default)]
    pub net_contents: String,

    #[serde(default)]
    pub name_address: String,

    #[serde(default)]
    pub country_of_origin: Option<String>,

    #[serde(default = "default_government_warning")]
    pub government_warning: String,
}

impl Default for ApplicationData {
    fn default() -> Self {
        Self {
            brand_name: String::new(),
            class_type: String::new(),
            alcohol_content: String::new(),
            net_contents: String::new(),
            name_address: String::new(),
            country_of_origin: None,
            government_warning: default_government_warning(),
        }
    }
}

impl ApplicationData {
    /// フィールド値を取得（空文字はNone扱い）
    pub fn value(&self, key: FieldKey) -> Option<&str> {
        let value = match key {
            FieldKey::BrandName => self.brand_name.as_str(),
            FieldKey::ClassType => self.class_type.as_str(),
            FieldKey::AlcoholContent => self.alcohol_content.as_str(),
            FieldKey::NetContents => self.net_contents.as_str(),
            FieldKey::NameAddress => self.name_address.as_str(),
            FieldKey::CountryOfOrigin => self.country_of_origin.as_deref().unwrap_or(""),
            FieldKey::GovernmentWarning => self.government_warning.as_str(),
        };
        if value.trim().is_empty() {
            None
        } else {
            Some(value)
        }
    }
}

/// 警告文見出しの大文字判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeaderFormat {
    AllCaps,
    MixedCase,
    #[default]
    NotFound,
}

/// 警告文見出しの太字判定（写真からの判定は信頼できない）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HeaderEmphasis {
    AppearsBoldOrHeavy,
    AppearsNormalWeight,
    #[default]
    Uncertain,
}

impl HeaderEmphasis {
    pub fn as_str(&self) -> &'static str {
        match self {
            HeaderEmphasis::AppearsBoldOrHeavy => "APPEARS_BOLD_OR_HEAVY",
            HeaderEmphasis::AppearsNormalWeight => "APPEARS_NORMAL_WEIGHT",
            HeaderEmphasis::Uncertain => "UNCERTAIN",
        }
    }
}

/// 1枚の画像から抽出されたフィールド
///
/// どのフィールドもnullになり得る。列挙値は不明時にデフォルト値を取る。
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ExtractedFields {
    pub brand_name: Option<String>,
    pub class_type: Option<String>,
    pub alcohol_content: Option<String>,
    pub net_contents: Option<String>,
    pub name_address: Option<String>,
    pub country_of_origin: Option<String>,
    pub government_warning: Option<String>,
    pub header_format: HeaderFormat,
    pub header_emphasis: HeaderEmphasis,
    pub observations: Option<String>,
}

impl ExtractedFields {
    pub fn get(&self, key: FieldKey) -> Option<&str> {
        match key {
            FieldKey::BrandName => self.brand_name.as_deref(),
            FieldKey::ClassType => self.class_type.as_deref(),
            FieldKey::AlcoholContent => self.alcohol_content.as_deref(),
            FieldKey::NetContents => self.net_contents.as_deref(),
            FieldKey::NameAddress => self.name_address.as_deref(),
            FieldKey::CountryOfOrigin => self.country_of_origin.as_deref(),
            FieldKey::GovernmentWarning => self.government_warning.as_deref(),
        }
    }

    pub fn set(&mut self, key: FieldKey, value: Option<String>) {
        let slot = match key {
            FieldKey::BrandName => &mut self.brand_name,
            FieldKey::ClassType => &mut self.class_type,
            FieldKey::AlcoholContent => &mut self.alcohol_content,
            FieldKey::NetContents => &mut self.net_contents,
            FieldKey::NameAddress => &mut self.name_address,
            FieldKey::CountryOfOrigin => &mut self.country_of_origin,
            FieldKey::GovernmentWarning => &mut self.government_warning,
        };
        *slot = value;
    }
}

/// 画像の撮影部位
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageLabel {
    Front,
    Back,
    Neck,
    Side,
    Detail,
    #[default]
    Other,
}

impl ImageLabel {
    /// ファイル名から撮影部位を推定（該当なしはOther）
    pub fn from_file_name(file_name: &str) -> Self {
        let lower = file_name.to_lowercase();
        [
            ("front", ImageLabel::Front),
            ("back", ImageLabel::Back),
            ("neck", ImageLabel::Neck),
            ("side", ImageLabel::Side),
            ("detail", ImageLabel::Detail),
        ]
        .into_iter()
        .find(|(word, _)| lower.contains(word))
        .map(|(_, label)| label)
        .unwrap_or_default()
    }
}

/// 画像の識別情報（不変）
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageSource {
    pub id: String,
    #[serde(default)]
    pub label: ImageLabel,
    #[serde(default)]
    pub filename: String,
}

/// 画像1枚分の抽出結果
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageExtraction {
    pub source: ImageSource,
    #[serde(default)]
    pub fields: ExtractedFields,
    #[serde(default)]
    pub latency_ms: u64,
}

/// 照合方式（規則で定められた5種類のみ）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchType {
    Strict,
    Fuzzy,
    Address,
    Abv,
    Volume,
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MatchType::Strict => write!(f, "strict"),
            MatchType::Fuzzy => write!(f, "fuzzy"),
            MatchType::Address => write!(f, "address"),
            MatchType::Abv => write!(f, "abv"),
            MatchType::Volume => write!(f, "volume"),
        }
    }
}

/// 比較器の判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchStatus {
    Pass,
    Fail,
    Warning,
    NotFound,
}

/// 比較器の出力（一時的な値）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchResult {
    pub status: MatchStatus,
    pub confidence: f64,
    pub details: String,
}

impl MatchResult {
    pub fn new(status: MatchStatus, confidence: f64, details: impl Into<String>) -> Self {
        Self {
            status,
            confidence: confidence.clamp(0.0, 1.0),
            details: details.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(MatchStatus::NotFound, 0.0, "Field not found on label")
    }
}

/// フィールド結果の判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldStatus {
    Pass,
    Fail,
    Warning,
    NotFound,
    Overridden,
}

impl From<MatchStatus> for FieldStatus {
    fn from(status: MatchStatus) -> Self {
        match status {
            MatchStatus::Pass => FieldStatus::Pass,
            MatchStatus::Fail => FieldStatus::Fail,
            MatchStatus::Warning => FieldStatus::Warning,
            MatchStatus::NotFound => FieldStatus::NotFound,
        }
    }
}

impl fmt::Display for FieldStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldStatus::Pass => write!(f, "PASS"),
            FieldStatus::Fail => write!(f, "FAIL"),
            FieldStatus::Warning => write!(f, "WARNING"),
            FieldStatus::NotFound => write!(f, "NOT_FOUND"),
            FieldStatus::Overridden => write!(f, "OVERRIDDEN"),
        }
    }
}

/// 人による判定の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverrideAction {
    /// 問題なしとして受理（集計から除外）
    Accepted,
    /// 問題ありとして確認（集計上は引き続きブロック）
    ConfirmedIssue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldOverride {
    pub action: OverrideAction,
    pub timestamp: DateTime<Utc>,
}

/// フィールド単位の照合結果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldResult {
    pub field_name: String,
    pub application_value: String,
    pub extracted_value: Option<String>,
    pub status: FieldStatus,
    pub match_type: MatchType,
    pub confidence: f64,
    pub details: String,
    #[serde(default, rename = "override", skip_serializing_if = "Option::is_none")]
    pub override_: Option<FieldOverride>,
}

impl FieldResult {
    pub fn from_match(
        field_name: impl Into<String>,
        application_value: impl Into<String>,
        extracted_value: Option<&str>,
        match_type: MatchType,
        result: MatchResult,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            application_value: application_value.into(),
            extracted_value: extracted_value.map(str::to_string),
            status: result.status.into(),
            match_type,
            confidence: result.confidence,
            details: result.details,
            override_: None,
        }
    }

    /// 人の判定を付与した新しい結果を返す
    ///
    /// Acceptedは判定をOVERRIDDENにする。ConfirmedIssueは判定を変えない。
    pub fn with_override(&self, action: OverrideAction, at: DateTime<Utc>) -> Self {
        let mut updated = self.clone();
        if action == OverrideAction::Accepted {
            updated.status = FieldStatus::Overridden;
        }
        updated.override_ = Some(FieldOverride { action, timestamp: at });
        updated
    }

    /// 受理済みで集計に影響しないか
    pub fn is_accepted(&self) -> bool {
        matches!(
            self.override_,
            Some(FieldOverride { action: OverrideAction::Accepted, .. })
        )
    }
}

/// 全体判定
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OverallStatus {
    Pass,
    Fail,
    Review,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OverallStatus::Pass => write!(f, "PASS"),
            OverallStatus::Fail => write!(f, "FAIL"),
            OverallStatus::Review => write!(f, "REVIEW"),
        }
    }
}
