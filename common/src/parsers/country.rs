//! 原産国の正規化
//!
//! 「Product of」等の前置き句（多言語）を除去したうえで、次の優先順で解決する。
//! 1. ISOにないTTB独自の地域（Scotland, Puerto Rico など）はそのまま
//! 2. ワイン・蒸留酒の産地 → 国（Champagne → France, Islay → Scotland）
//! 3. 旧国名・通称 → ISO（Burma, USSR, NZ）
//! 4. ISO国名・コード（複数言語の国名を英語名に統一）
//! 5. いずれにも該当しなければ整形済みの入力をそのまま返す
//!
//! 戻り値は比較用の小文字表記。

use crate::normalize::normalize_text;
use crate::tables::{CountryTables, LookupTables};
use lazy_static::lazy_static;
use std::collections::HashMap;

lazy_static! {
    static ref BUILTIN: CountryResolver = CountryResolver::new(&LookupTables::builtin().countries);
}

/// どの規則で解決したか
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountryRule {
    TtbRegion,
    WineRegion,
    Historical,
    Iso,
    Unresolved,
}

/// 原産国の解決結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryResolution {
    /// 比較用の正規化済み国名（小文字）
    pub canonical: String,
    pub rule: CountryRule,
}

/// テーブルから構築した原産国リゾルバ
#[derive(Debug, Clone)]
pub struct CountryResolver {
    /// 前置き句（長い順）
    lead_ins: Vec<String>,
    ttb_regions: HashMap<String, String>,
    regions: HashMap<String, String>,
    historical: HashMap<String, String>,
    /// alpha-2 / alpha-3 → 英語名
    by_code: HashMap<String, String>,
    /// 英語名・他言語名 → 英語名
    by_name: HashMap<String, String>,
}

fn clean(text: &str) -> String {
    normalize_text(text).replace('"', "").trim().to_string()
}

impl CountryResolver {
    pub fn new(tables: &CountryTables) -> Self {
        let mut lead_ins: Vec<String> = tables
            .lead_ins
            .iter()
            .map(|l| clean(l))
            .filter(|l| !l.is_empty())
            .collect();
        lead_ins.sort_by(|a, b| b.len().cmp(&a.len()));

        let ttb_regions = tables
            .ttb_regions
            .iter()
            .map(|r| (clean(r), r.to_lowercase()))
            .collect();

        let regions = tables
            .regions
            .iter()
            .map(|(k, v)| (clean(k), v.clone()))
            .collect();

        let historical = tables
            .historical
            .iter()
            .map(|(k, v)| (clean(k), v.to_lowercase()))
            .collect();

        let mut by_code = HashMap::new();
        let mut by_name = HashMap::new();
        for country in &tables.iso_countries {
            let english = country.name.to_lowercase();
            by_code.insert(country.alpha2.to_lowercase(), english.clone());
            by_code.insert(country.alpha3.to_lowercase(), english.clone());
            by_name.insert(clean(&country.name), english.clone());
            for alias in &country.aliases {
                by_name.insert(clean(alias), english.clone());
            }
        }

        Self {
            lead_ins,
            ttb_regions,
            regions,
            historical,
            by_code,
            by_name,
        }
    }

    pub fn builtin() -> &'static CountryResolver {
        &BUILTIN
    }

    /// 原産国を解決する
    pub fn resolve(&self, text: &str) -> CountryResolution {
        let cleaned = self.strip_lead_ins(&clean(text));

        if let Some(region) = self.ttb_regions.get(&cleaned) {
            return CountryResolution {
                canonical: region.clone(),
                rule: CountryRule::TtbRegion,
            };
        }

        if let Some(country) = self.regions.get(&cleaned) {
            // 産地の行き先はTTB地域名か英語国名
            let key = clean(country);
            let canonical = self
                .ttb_regions
                .get(&key)
                .or_else(|| self.by_name.get(&key))
                .cloned()
                .unwrap_or_else(|| country.to_lowercase());
            return CountryResolution {
                canonical,
                rule: CountryRule::WineRegion,
            };
        }

        if let Some(code) = self.historical.get(&cleaned) {
            if let Some(english) = self.by_code.get(code) {
                return CountryResolution {
                    canonical: english.clone(),
                    rule: CountryRule::Historical,
                };
            }
        }

        if let Some(english) = self.by_code.get(&cleaned).or_else(|| self.by_name.get(&cleaned)) {
            return CountryResolution {
                canonical: english.clone(),
                rule: CountryRule::Iso,
            };
        }

        CountryResolution {
            canonical: cleaned,
            rule: CountryRule::Unresolved,
        }
    }

    /// 比較用の国名
    pub fn normalize(&self, text: &str) -> String {
        self.resolve(text).canonical
    }

    fn strip_lead_ins(&self, text: &str) -> String {
        let mut current = text.trim().to_string();
        loop {
            let stripped = self.lead_ins.iter().find_map(|lead_in| {
                current
                    .strip_prefix(lead_in.as_str())
                    .filter(|rest| rest.is_empty() || rest.starts_with(' '))
                    .map(|rest| rest.trim().to_string())
            });
            match stripped {
                Some(rest) if !rest.is_empty() => current = rest,
                _ => break,
            }
        }
        match current.strip_prefix("the ") {
            Some(rest) => rest.to_string(),
            None => current,
        }
    }
}

/// 組み込みテーブルで原産国を正規化
pub fn normalize_country(text: &str) -> String {
    BUILTIN.normalize(text)
}
