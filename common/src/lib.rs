//! Label Verify Common Library
//!
//! ラベル照合の中核（正規化・類似度・フィールド照合・警告表示検証・
//! 全体判定・複数画像の統合）。CLIから利用される。

pub mod error;
pub mod fields;
pub mod matcher;
pub mod merge;
pub mod normalize;
pub mod parser;
pub mod parsers;
pub mod status;
pub mod tables;
pub mod types;
pub mod verify;
pub mod warning;

pub use error::{Error, Result};
pub use fields::{field_config, FieldConfig, FIELD_CONFIGS};
pub use matcher::{
    address_match, compare_field, fuzzy_match, match_abv, match_strict, match_volume, Matcher,
    ADDRESS_PASS_THRESHOLD, ADDRESS_WARNING_THRESHOLD, FUZZY_THRESHOLD,
};
pub use merge::{
    all_conflicts_resolved, get_unresolved_conflicts, merge_extractions, resolve_conflict,
    resolve_conflict_at, FieldConflict, MergedExtraction, SourcedFieldValue,
};
pub use normalize::{jaro_winkler, normalize_key, normalize_text, normalize_whitespace};
pub use parser::{extract_json, parse_extraction_response, parse_image_extraction};
pub use parsers::{normalize_address, normalize_country, parse_abv, parse_volume_ml, VOLUME_TOLERANCE};
pub use status::compute_overall_status;
pub use tables::LookupTables;
pub use types::*;
pub use verify::{verify_images, verify_images_with, verify_label, verify_label_with, verify_merged, verify_merged_with, VerificationReport};
pub use warning::{verify_government_warning, verify_government_warning_with};
