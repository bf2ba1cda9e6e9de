//! 抽出レスポンスのパーサー
//!
//! 外部の抽出処理（画像認識）が返したテキストからJSONを取り出し、
//! `ExtractedFields` / `ImageExtraction` に変換する

use crate::error::{Error, Result};
use crate::types::{ExtractedFields, ImageExtraction};
use serde::Deserialize;
use serde_json::Value;

/// レスポンスからJSONオブジェクト部分を抽出
///
/// 抽出優先順位:
/// 1. ```json ... ``` ブロック
/// 2. 生の {...} オブジェクト
/// 3. エラー
///
/// # Examples
/// ```
/// use label_verify_common::extract_json;
///
/// let response = "Result: {\"brandName\": \"Old Tom\"}";
/// let json = extract_json(response).unwrap();
/// assert_eq!(json, "{\"brandName\": \"Old Tom\"}");
/// ```
pub fn extract_json(response: &str) -> Result<&str> {
    if let Some(start_marker) = response.find("```json") {
        let start = start_marker + 7; // "```json" の長さ
        if let Some(end_offset) = response[start..].find("```") {
            let end = start + end_offset;
            return Ok(response[start..end].trim());
        }
    }

    if let Some(start) = response.find('{') {
        if let Some(end) = response.rfind('}') {
            if end >= start {
                return Ok(&response[start..=end]);
            }
        }
    }

    Err(Error::Parse("JSON object not found in response".into()))
}

/// 抽出レスポンスをパース（欠けたフィールドはnull、列挙値は不明扱い）
pub fn parse_extraction_response(response: &str) -> Result<ExtractedFields> {
    let json_str = extract_json(response)?;
    serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("extraction JSON: {}", e)))
}

/// 包み形式（`ImageExtraction`）と判定するキー
const WRAPPED_KEYS: [&str; 2] = ["source", "fields"];

/// 抽出ファイルを読み込む
///
/// `ImageExtraction` 形式（source付き）でも `ExtractedFields` 単体でも受け付ける。
/// 単体の場合は `fallback` を画像情報とする。
/// `source` か `fields` キーがあれば包み形式として厳密に読み、壊れていればエラー。
pub fn parse_image_extraction(json: &str, fallback: ImageExtraction) -> Result<ImageExtraction> {
    let json_str = extract_json(json)?;
    let value: Value = serde_json::from_str(json_str.trim())
        .map_err(|e| Error::Parse(format!("extraction JSON: {}", e)))?;

    let wrapped = value
        .as_object()
        .map(|object| WRAPPED_KEYS.iter().any(|key| object.contains_key(*key)))
        .unwrap_or(false);

    if wrapped {
        ImageExtraction::deserialize(value)
            .map_err(|e| Error::Parse(format!("image extraction JSON: {}", e)))
    } else {
        let fields = ExtractedFields::deserialize(value)
            .map_err(|e| Error::Parse(format!("extraction JSON: {}", e)))?;
        Ok(ImageExtraction { fields, ..fallback })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HeaderEmphasis, HeaderFormat, ImageLabel, ImageSource};

    #[test]
    fn test_extract_json_with_block() {
        let response = r#"Here are the fields:
```json
{"brandName": "Old Tom Distillery"}
```
Let me know if you need more."#;

        let json = extract_json(response).unwrap();
        assert_eq!(json, r#"{"brandName": "Old Tom Distillery"}"#);
    }

    #[test]
    fn test_extract_json_with_surrounding_text() {
        let response = r#"Result: {"netContents": "750 mL"} done."#;
        assert_eq!(extract_json(response).unwrap(), r#"{"netContents": "750 mL"}"#);
    }

    #[test]
    fn test_extract_json_error() {
        let result = extract_json("No JSON here, just plain text.");
        assert!(matches!(result, Err(Error::Parse(_))));
        assert!(extract_json("").is_err());
    }

    #[test]
    fn test_parse_extraction_response() {
        let response = r#"```json
{
  "brandName": "OLD TOM DISTILLERY",
  "alcoholContent": "90 Proof",
  "netContents": null,
  "headerFormat": "ALL_CAPS",
  "observations": "glare"
}
```"#;
        let fields = parse_extraction_response(response).unwrap();
        assert_eq!(fields.brand_name.as_deref(), Some("OLD TOM DISTILLERY"));
        assert_eq!(fields.alcohol_content.as_deref(), Some("90 Proof"));
        assert!(fields.net_contents.is_none());
        assert!(fields.class_type.is_none());
        assert_eq!(fields.header_format, HeaderFormat::AllCaps);
        assert_eq!(fields.header_emphasis, HeaderEmphasis::Uncertain);
    }

    #[test]
    fn test_parse_extraction_response_invalid() {
        let result = parse_extraction_response(r#"{"brandName": 12}"#);
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    fn fallback() -> ImageExtraction {
        ImageExtraction {
            source: ImageSource {
                id: "back".into(),
                label: ImageLabel::Back,
                filename: "back.extraction.json".into(),
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_parse_image_extraction_bare_fields() {
        let extraction = parse_image_extraction(r#"{"brandName": "Old Tom"}"#, fallback()).unwrap();
        assert_eq!(extraction.source.id, "back");
        assert_eq!(extraction.fields.brand_name.as_deref(), Some("Old Tom"));
    }

    #[test]
    fn test_parse_image_extraction_with_source() {
        let json = r#"{
  "source": {"id": "img-1", "label": "neck", "filename": "neck.jpg"},
  "fields": {"netContents": "750 mL"},
  "latencyMs": 1830
}"#;
        let extraction = parse_image_extraction(json, fallback()).unwrap();
        assert_eq!(extraction.source.id, "img-1");
        assert_eq!(extraction.source.label, ImageLabel::Neck);
        assert_eq!(extraction.fields.net_contents.as_deref(), Some("750 mL"));
        assert_eq!(extraction.latency_ms, 1830);
    }

    #[test]
    fn test_parse_image_extraction_broken_source_is_error() {
        // source.id 欠落: フィールドを空にして通さない
        let json = r#"{"source":{"label":"front","filename":"f.jpg"},"fields":{"brandName":"Old Tom"}}"#;
        let result = parse_image_extraction(json, fallback());
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_image_extraction_fields_without_source_is_error() {
        let result = parse_image_extraction(r#"{"fields": {"brandName": "Old Tom"}}"#, fallback());
        assert!(matches!(result, Err(Error::Parse(_))));
    }

    #[test]
    fn test_parse_image_extraction_bare_fields_not_an_object() {
        let result = parse_image_extraction(r#"["brandName"]"#, fallback());
        assert!(result.is_err());
    }
}
