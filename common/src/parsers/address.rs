//! 製造者名・住所の正規化
//!
//! 1. 「Bottled by」等の前置き句と「<動詞> in <地名> by」を除去
//! 2. 改行を除去
//! 3. 略語を展開（単語単位で照合するので「St」が「Stone」に化けない）
//! 4. アポストロフィを含む記号を除去（Maker's と Makers を同一視）
//! 5. 空白を統一

use crate::normalize::normalize_whitespace;
use crate::tables::{AddressTables, LookupTables};
use lazy_static::lazy_static;
use regex::Regex;
use std::collections::HashMap;

lazy_static! {
    static ref BUILTIN: AddressNormalizer = AddressNormalizer::new(&LookupTables::builtin().address);
    static ref GENERIC_LEAD_IN_RE: Regex =
        Regex::new(r"^[a-z]+(?:\s+(?:and|&)\s+[a-z]+)?\s+in\s+[a-z]+\s+by\b[\s:,]*").unwrap();
}

/// テーブルから構築した住所正規化器
#[derive(Debug, Clone)]
pub struct AddressNormalizer {
    /// 前置き句（長い順）
    lead_ins: Vec<String>,
    abbreviations: HashMap<String, String>,
}

impl AddressNormalizer {
    pub fn new(tables: &AddressTables) -> Self {
        let mut lead_ins: Vec<String> = tables
            .lead_ins
            .iter()
            .map(|l| normalize_whitespace(&l.to_lowercase()))
            .filter(|l| !l.is_empty())
            .collect();
        lead_ins.sort_by(|a, b| b.len().cmp(&a.len()));

        let abbreviations = tables
            .abbreviations
            .iter()
            .map(|(k, v)| (k.to_lowercase(), v.to_lowercase()))
            .collect();

        Self { lead_ins, abbreviations }
    }

    pub fn builtin() -> &'static AddressNormalizer {
        &BUILTIN
    }

    pub fn normalize(&self, text: &str) -> String {
        let flattened = normalize_whitespace(&text.to_lowercase().replace(['\r', '\n'], " "));
        let stripped = self.strip_lead_in(&flattened);
        let expanded = self.expand_abbreviations(&stripped);

        let cleaned: String = expanded
            .chars()
            .filter(|c| !matches!(c, '\'' | '\u{2019}' | '\u{2018}'))
            .map(|c| if c.is_alphanumeric() || c.is_whitespace() { c } else { ' ' })
            .collect();

        normalize_whitespace(&cleaned)
    }

    fn strip_lead_in(&self, text: &str) -> String {
        for lead_in in &self.lead_ins {
            if let Some(rest) = text.strip_prefix(lead_in.as_str()) {
                // 単語の途中で切らない
                if rest.chars().next().map_or(true, |c| !c.is_alphanumeric()) {
                    return rest.trim_start_matches([' ', ':', ',']).to_string();
                }
            }
        }
        GENERIC_LEAD_IN_RE.replace(text, "").into_owned()
    }

    fn expand_abbreviations(&self, text: &str) -> String {
        text.replace(',', ", ")
            .split_whitespace()
            .map(|token| {
                let core = token.trim_end_matches(['.', ',', ';', ':']);
                let suffix = &token[core.len()..];
                match self.abbreviations.get(core) {
                    Some(expanded) => format!("{}{}", expanded, suffix),
                    None => token.to_string(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// 組み込みテーブルで住所を正規化
pub fn normalize_address(text: &str) -> String {
    BUILTIN.normalize(text)
}
