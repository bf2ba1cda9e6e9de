//! フィールド照合
//!
//! `compare_field` が照合方式（strict / fuzzy / address / abv / volume）に
//! 振り分ける。どの方式も例外を出さず、解析できない入力はWARNINGかFAILに落とす。
//!
//! 共通の約束:
//! - 抽出値がnull（または空白のみ）なら NOT_FOUND / 0.0
//! - 正規化後に完全一致なら PASS / 1.0

use crate::normalize::{jaro_winkler, normalize_text, normalize_whitespace};
use crate::parsers::{parse_abv, volumes_equivalent, AbvSource, AddressNormalizer, CountryResolver, VolumeParser};
use crate::tables::LookupTables;
use crate::types::{FieldKey, MatchResult, MatchStatus, MatchType};
use lazy_static::lazy_static;
use std::collections::HashSet;
use tracing::debug;

/// 曖昧照合のPASS閾値
pub const FUZZY_THRESHOLD: f64 = 0.85;
/// 曖昧照合のWARNING下限
pub const FUZZY_WARNING_THRESHOLD: f64 = 0.6;
/// 住所照合のPASS閾値
pub const ADDRESS_PASS_THRESHOLD: f64 = 0.90;
/// 住所照合のWARNING下限
pub const ADDRESS_WARNING_THRESHOLD: f64 = 0.70;
/// 解析できなかった場合の確信度
const UNPARSABLE_CONFIDENCE: f64 = 0.5;
/// 数値が食い違った場合の確信度
const NUMERIC_MISMATCH_CONFIDENCE: f64 = 0.9;

lazy_static! {
    static ref BUILTIN: Matcher = Matcher {
        volume: VolumeParser::builtin().clone(),
        address: AddressNormalizer::builtin().clone(),
        country: CountryResolver::builtin().clone(),
    };
}

/// 参照テーブルを組み込んだ照合器
#[derive(Debug, Clone)]
pub struct Matcher {
    volume: VolumeParser,
    address: AddressNormalizer,
    country: CountryResolver,
}

impl Matcher {
    pub fn new(tables: &LookupTables) -> Self {
        Self {
            volume: VolumeParser::new(&tables.volume.units),
            address: AddressNormalizer::new(&tables.address),
            country: CountryResolver::new(&tables.countries),
        }
    }

    /// 組み込みテーブルの照合器
    pub fn builtin() -> &'static Matcher {
        &BUILTIN
    }

    pub fn volume_parser(&self) -> &VolumeParser {
        &self.volume
    }

    pub fn address_normalizer(&self) -> &AddressNormalizer {
        &self.address
    }

    pub fn country_resolver(&self) -> &CountryResolver {
        &self.country
    }

    /// 1フィールドを照合する
    pub fn compare_field(
        &self,
        field_key: FieldKey,
        match_type: MatchType,
        extracted: Option<&str>,
        expected: &str,
    ) -> MatchResult {
        let extracted = match extracted {
            Some(value) if !value.trim().is_empty() => value,
            _ => {
                debug!(field = %field_key, "field not found on label");
                return MatchResult::not_found();
            }
        };

        let result = match match_type {
            MatchType::Strict if field_key == FieldKey::CountryOfOrigin => {
                self.country_match(extracted, expected)
            }
            MatchType::Strict => match_strict(extracted, expected),
            MatchType::Fuzzy => fuzzy_match(extracted, expected, FUZZY_THRESHOLD),
            MatchType::Address => self.address_match(extracted, expected),
            MatchType::Abv => match_abv(extracted, expected),
            MatchType::Volume => self.volume_match(extracted, expected),
        };

        debug!(
            field = %field_key,
            match_type = %match_type,
            status = ?result.status,
            confidence = result.confidence,
            "field compared"
        );
        result
    }

    /// 住所照合（fuzzyより緩い閾値）
    pub fn address_match(&self, extracted: &str, expected: &str) -> MatchResult {
        let label = self.address.normalize(extracted);
        let application = self.address.normalize(expected);

        if !label.is_empty() && label == application {
            return MatchResult::new(MatchStatus::Pass, 1.0, "Exact match after address normalization");
        }

        let similarity = jaro_winkler(&label, &application);
        let percent = similarity * 100.0;
        if similarity >= ADDRESS_PASS_THRESHOLD {
            MatchResult::new(MatchStatus::Pass, similarity, format!("Address match ({:.0}% similar)", percent))
        } else if similarity >= ADDRESS_WARNING_THRESHOLD {
            MatchResult::new(
                MatchStatus::Warning,
                similarity,
                format!("Partial address match ({:.0}% similar); label may abbreviate or omit parts", percent),
            )
        } else {
            MatchResult::new(
                MatchStatus::Fail,
                similarity,
                format!("Address mismatch ({:.0}% similar)", percent),
            )
        }
    }

    /// 内容量照合（相対差0.5%以内で一致）
    pub fn volume_match(&self, extracted: &str, expected: &str) -> MatchResult {
        let label = self.volume.parse_ml(extracted);
        let application = self.volume.parse_ml(expected);

        match (label, application) {
            (Some(label_ml), Some(application_ml)) => {
                if label_ml == application_ml {
                    MatchResult::new(MatchStatus::Pass, 1.0, "Exact match")
                } else if volumes_equivalent(label_ml, application_ml) {
                    MatchResult::new(
                        MatchStatus::Pass,
                        1.0,
                        format!(
                            "Match within 0.5% tolerance (label {:.1} mL vs application {:.1} mL)",
                            label_ml, application_ml
                        ),
                    )
                } else {
                    MatchResult::new(
                        MatchStatus::Fail,
                        NUMERIC_MISMATCH_CONFIDENCE,
                        format!(
                            "Mismatch: label {:.1} mL vs application {:.1} mL",
                            label_ml, application_ml
                        ),
                    )
                }
            }
            (label, application) => unparsable("net contents", label.is_none(), application.is_none()),
        }
    }

    /// 原産国照合（strictで一致しなければ国名を正規化して比較）
    pub fn country_match(&self, extracted: &str, expected: &str) -> MatchResult {
        let strict = match_strict(extracted, expected);
        if strict.status == MatchStatus::Pass {
            return strict;
        }

        let label = self.country.resolve(extracted);
        let application = self.country.resolve(expected);
        if !label.canonical.is_empty() && label.canonical == application.canonical {
            return MatchResult::new(
                MatchStatus::Pass,
                1.0,
                format!("Match after country normalization ({})", label.canonical),
            );
        }

        MatchResult::new(
            strict.status,
            strict.confidence,
            format!(
                "{} (label resolves to '{}', application to '{}')",
                strict.details, label.canonical, application.canonical
            ),
        )
    }
}

/// 組み込みテーブルで1フィールドを照合する
pub fn compare_field(
    field_key: FieldKey,
    match_type: MatchType,
    extracted: Option<&str>,
    expected: &str,
) -> MatchResult {
    BUILTIN.compare_field(field_key, match_type, extracted, expected)
}

/// 厳密照合（空白のみ正規化）
///
/// 完全一致はPASS(1.0)、大文字小文字のみの違いはPASS(0.95)。
/// それ以外は単語単位の差分を添えてFAIL。
pub fn match_strict(extracted: &str, expected: &str) -> MatchResult {
    let label = normalize_whitespace(extracted);
    let application = normalize_whitespace(expected);

    if label == application {
        return MatchResult::new(MatchStatus::Pass, 1.0, "Exact match");
    }
    if label.to_lowercase() == application.to_lowercase() {
        return MatchResult::new(MatchStatus::Pass, 0.95, "Match (letter case differs)");
    }

    let label_lower = label.to_lowercase();
    let application_lower = application.to_lowercase();
    let label_words: HashSet<&str> = label_lower.split_whitespace().collect();
    let expected_words = unique_words(&application_lower);
    let missing: Vec<&str> = expected_words
        .iter()
        .copied()
        .filter(|w| !label_words.contains(w))
        .collect();
    let expected_set: HashSet<&str> = expected_words.iter().copied().collect();
    let unexpected: Vec<&str> = unique_words(&label_lower)
        .into_iter()
        .filter(|w| !expected_set.contains(w))
        .collect();

    let expected_count = expected_words.len().max(1) as f64;
    let missing_ratio = missing.len() as f64 / expected_count;
    let confidence = 1.0 - missing_ratio;

    let details = if missing_ratio > 0.5 {
        format!("{:.0}% of expected words missing", missing_ratio * 100.0)
    } else {
        let mut parts = Vec::new();
        if !missing.is_empty() {
            parts.push(format!("Missing: {}", missing.join(", ")));
        }
        if !unexpected.is_empty() {
            parts.push(format!("Unexpected: {}", unexpected.join(", ")));
        }
        if parts.is_empty() {
            "Word order or repetition differs".to_string()
        } else {
            parts.join("; ")
        }
    };

    MatchResult::new(MatchStatus::Fail, confidence, details)
}

/// 出現順を保った重複なしの単語列
fn unique_words(text: &str) -> Vec<&str> {
    let mut seen = HashSet::new();
    text.split_whitespace().filter(|w| seen.insert(*w)).collect()
}

/// 曖昧照合（normalize_text + Jaro-Winkler）
pub fn fuzzy_match(extracted: &str, expected: &str, threshold: f64) -> MatchResult {
    let label = normalize_text(extracted);
    let application = normalize_text(expected);

    if !label.is_empty() && label == application {
        return MatchResult::new(MatchStatus::Pass, 1.0, "Exact match after normalization");
    }

    let similarity = jaro_winkler(&label, &application);
    let percent = similarity * 100.0;
    if similarity >= threshold {
        MatchResult::new(MatchStatus::Pass, similarity, format!("Similar ({:.0}% match)", percent))
    } else if similarity >= FUZZY_WARNING_THRESHOLD {
        MatchResult::new(
            MatchStatus::Warning,
            similarity,
            format!("Partial match ({:.0}% similar); needs review", percent),
        )
    } else {
        MatchResult::new(MatchStatus::Fail, similarity, format!("Mismatch ({:.0}% similar)", percent))
    }
}

/// 組み込みテーブルで住所を照合
pub fn address_match(extracted: &str, expected: &str) -> MatchResult {
    BUILTIN.address_match(extracted, expected)
}

/// 組み込み単位表で内容量を照合
pub fn match_volume(extracted: &str, expected: &str) -> MatchResult {
    BUILTIN.volume_match(extracted, expected)
}

/// 度数照合（許容誤差なし）
pub fn match_abv(extracted: &str, expected: &str) -> MatchResult {
    match (parse_abv(extracted), parse_abv(expected)) {
        (Some(label), Some(application)) => {
            if !label.same_as(&application) {
                return MatchResult::new(
                    MatchStatus::Fail,
                    NUMERIC_MISMATCH_CONFIDENCE,
                    format!(
                        "Mismatch: label {}% vs application {}%",
                        label.percent, application.percent
                    ),
                );
            }
            let details = match (label.source, application.source) {
                (AbvSource::Proof, AbvSource::Percent) => {
                    format!("Match ({} proof on label = {}%)", label.raw, label.percent)
                }
                (AbvSource::Percent, AbvSource::Proof) => {
                    format!("Match ({} proof in application = {}%)", application.raw, application.percent)
                }
                _ => "Exact match".to_string(),
            };
            MatchResult::new(MatchStatus::Pass, 1.0, details)
        }
        (label, application) => unparsable("alcohol content", label.is_none(), application.is_none()),
    }
}

fn unparsable(what: &str, label_failed: bool, application_failed: bool) -> MatchResult {
    let side = match (label_failed, application_failed) {
        (true, true) => "label or application",
        (true, false) => "label",
        _ => "application",
    };
    MatchResult::new(
        MatchStatus::Warning,
        UNPARSABLE_CONFIDENCE,
        format!("Could not parse {} from {}", what, side),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_for_missing_value() {
        let result = compare_field(FieldKey::BrandName, MatchType::Fuzzy, None, "Old Tom");
        assert_eq!(result.status, MatchStatus::NotFound);
        assert_eq!(result.confidence, 0.0);

        let blank = compare_field(FieldKey::NetContents, MatchType::Volume, Some("   "), "750 mL");
        assert_eq!(blank.status, MatchStatus::NotFound);
    }

    #[test]
    fn test_strict_exact_and_case() {
        let exact = match_strict("GOVERNMENT  WARNING: text", "GOVERNMENT WARNING: text");
        assert_eq!(exact.status, MatchStatus::Pass);
        assert_eq!(exact.confidence, 1.0);

        let case = match_strict("Government Warning: text", "GOVERNMENT WARNING: TEXT");
        assert_eq!(case.status, MatchStatus::Pass);
        assert_eq!(case.confidence, 0.95);
    }

    #[test]
    fn test_strict_word_diff() {
        let result = match_strict("women should drink during pregnancy", "women should not drink during pregnancy");
        assert_eq!(result.status, MatchStatus::Fail);
        assert_eq!(result.details, "Missing: not");
        assert!((result.confidence - 5.0 / 6.0).abs() < 1e-9);

        let extra = match_strict("may cause serious health problems", "may cause health problems");
        assert_eq!(extra.details, "Unexpected: serious");
    }

    #[test]
    fn test_strict_summary_when_mostly_missing() {
        let result = match_strict("GOVERNMENT WARNING", "GOVERNMENT WARNING: (1) According to the Surgeon General");
        assert_eq!(result.status, MatchStatus::Fail);
        assert!(result.details.ends_with("% of expected words missing"), "{}", result.details);
    }

    #[test]
    fn test_fuzzy_case_and_quotes() {
        let result = fuzzy_match("STONE'S THROW", "Stone's Throw", FUZZY_THRESHOLD);
        assert_eq!(result.status, MatchStatus::Pass);
        assert_eq!(result.confidence, 1.0);

        let curly = fuzzy_match("STONE\u{2019}S THROW", "Stone's Throw", FUZZY_THRESHOLD);
        assert_eq!(curly.confidence, 1.0);
    }

    #[test]
    fn test_fuzzy_one_letter_difference_scores_above_threshold() {
        // 接頭辞補正により 0.95 となり閾値0.85を上回る
        let result = fuzzy_match("Jim Beam", "Jim Bean", FUZZY_THRESHOLD);
        assert!((result.confidence - 0.95).abs() < 1e-9);
        assert_eq!(result.status, MatchStatus::Pass);
        assert!(result.confidence < 1.0);
    }

    #[test]
    fn test_fuzzy_bands() {
        // jaro_winkler("crater", "trace") = 0.7
        let warning = fuzzy_match("crater", "trace", FUZZY_THRESHOLD);
        assert_eq!(warning.status, MatchStatus::Warning);

        // 小数点が落ちて "254 fl oz" との比較になる（約0.61）
        let low = fuzzy_match("750 ml", "25.4 fl oz", FUZZY_THRESHOLD);
        assert_eq!(low.status, MatchStatus::Warning);

        let fail = fuzzy_match("Vodka", "Bourbon Whiskey", FUZZY_THRESHOLD);
        assert_eq!(fail.status, MatchStatus::Fail);
    }

    #[test]
    fn test_fuzzy_punctuation_only_is_not_a_pass() {
        let result = fuzzy_match("!!!", "...", FUZZY_THRESHOLD);
        assert_eq!(result.status, MatchStatus::Fail);
    }

    #[test]
    fn test_address_abbreviation() {
        let result = address_match("123 Main St", "123 Main Street");
        assert_eq!(result.status, MatchStatus::Pass);
        assert_eq!(result.confidence, 1.0);
    }

    #[test]
    fn test_address_close_but_not_exact_passes() {
        // 郵便番号の有無のみ（約0.97）
        let result = address_match(
            "Old Tom Distillery, Louisville, KY 40202",
            "Old Tom Distillery, Louisville, KY",
        );
        assert_eq!(result.status, MatchStatus::Pass);
        assert!(result.confidence >= ADDRESS_PASS_THRESHOLD);
        assert!(result.confidence < 1.0);
    }

    #[test]
    fn test_address_partial_is_warning() {
        // 番地が省略されたラベル（約0.884）
        let result = address_match(
            "Old Tom Distillery, Louisville, KY",
            "Old Tom Distillery, 123 Main St, Louisville, KY 40202",
        );
        assert_eq!(result.status, MatchStatus::Warning);
        assert!((result.confidence - 0.8841).abs() < 1e-3);
    }

    #[test]
    fn test_address_lower_band_edges() {
        // 約0.7006: WARNING下限のすぐ上
        let above = address_match("Acme Spirits, Louisville, KY", "Old Tom Distillery, Louisville, KY");
        assert_eq!(above.status, MatchStatus::Warning);
        assert!(above.confidence >= ADDRESS_WARNING_THRESHOLD);

        // 約0.631: WARNING下限のすぐ下
        let below = address_match("Tom Distillery Co.", "Old Tom Distillery, Louisville, KY");
        assert_eq!(below.status, MatchStatus::Fail);
        assert!(below.confidence < ADDRESS_WARNING_THRESHOLD);
        assert!(below.confidence > 0.6);
    }

    #[test]
    fn test_address_mismatch() {
        let result = address_match("Acme Spirits, Portland, OR", "Old Tom Distillery, Louisville, KY");
        assert_eq!(result.status, MatchStatus::Fail);
    }

    #[test]
    fn test_abv_match_and_proof_conversion() {
        let same = match_abv("45%", "45%");
        assert_eq!(same.status, MatchStatus::Pass);
        assert_eq!(same.confidence, 1.0);

        let proof = match_abv("90 Proof", "45%");
        assert_eq!(proof.status, MatchStatus::Pass);
        assert_eq!(proof.confidence, 1.0);
        assert!(proof.details.contains("proof"));
    }

    #[test]
    fn test_abv_mismatch_and_unparsable() {
        let mismatch = match_abv("40%", "45%");
        assert_eq!(mismatch.status, MatchStatus::Fail);
        assert_eq!(mismatch.confidence, 0.9);

        let label = match_abv("Alcohol by volume", "45%");
        assert_eq!(label.status, MatchStatus::Warning);
        assert_eq!(label.confidence, 0.5);
        assert!(label.details.ends_with("from label"));

        let application = match_abv("45%", "forty five");
        assert!(application.details.ends_with("from application"));
    }

    #[test]
    fn test_volume_tolerance() {
        let imperial = match_volume("25.4 fl oz", "750 mL");
        assert_eq!(imperial.status, MatchStatus::Pass);

        let wrong = match_volume("700 mL", "750 mL");
        assert_eq!(wrong.status, MatchStatus::Fail);
        assert_eq!(wrong.confidence, 0.9);

        let unparsable = match_volume("750", "750 mL");
        assert_eq!(unparsable.status, MatchStatus::Warning);
        assert!(unparsable.details.contains("from label"));
    }

    #[test]
    fn test_country_uses_normalizer() {
        let result = compare_field(
            FieldKey::CountryOfOrigin,
            MatchType::Strict,
            Some("Product of Scotland"),
            "Scotland",
        );
        assert_eq!(result.status, MatchStatus::Pass);

        let burma = compare_field(FieldKey::CountryOfOrigin, MatchType::Strict, Some("Burma"), "Myanmar");
        assert_eq!(burma.status, MatchStatus::Pass);

        let wrong = compare_field(FieldKey::CountryOfOrigin, MatchType::Strict, Some("Made in Italy"), "France");
        assert_eq!(wrong.status, MatchStatus::Fail);
        assert!(wrong.details.contains("'italy'"));
    }

    #[test]
    fn test_custom_tables_matcher() {
        let mut tables = LookupTables::builtin();
        tables.merge(
            &LookupTables::from_json(r#"{"volume": {"units": [{"name": "jigger", "ml": 44.36}]}}"#).unwrap(),
        );
        let matcher = Matcher::new(&tables);
        let result = matcher.compare_field(FieldKey::NetContents, MatchType::Volume, Some("2 jigger"), "88.72 ml");
        assert_eq!(result.status, MatchStatus::Pass);
    }
}
