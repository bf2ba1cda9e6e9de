//! 照合用の参照テーブル
//!
//! 住所の略語・前置き句、容量単位、原産国の地域名・旧国名・ISO国名は
//! ロジックではなくデータとして `data/*.json` に置く。
//! 利用者は同じ形式のJSONで項目を追加・上書きできる。

use crate::error::{Error, Result};
use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

const ADDRESS_JSON: &str = include_str!("../data/address.json");
const VOLUME_UNITS_JSON: &str = include_str!("../data/volume_units.json");
const COUNTRIES_JSON: &str = include_str!("../data/countries.json");

lazy_static! {
    static ref BUILTIN: LookupTables = LookupTables {
        address: serde_json::from_str(ADDRESS_JSON).expect("data/address.json が不正"),
        volume: serde_json::from_str(VOLUME_UNITS_JSON).expect("data/volume_units.json が不正"),
        countries: serde_json::from_str(COUNTRIES_JSON).expect("data/countries.json が不正"),
    };
}

/// 住所正規化のテーブル
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AddressTables {
    /// 「Bottled by」等の前置き句
    pub lead_ins: Vec<String>,
    /// 略語 → 正式表記
    pub abbreviations: BTreeMap<String, String>,
}

/// 容量単位
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VolumeUnit {
    pub name: String,
    /// 1単位あたりのmL
    pub ml: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct VolumeTables {
    pub units: Vec<VolumeUnit>,
}

/// ISO国名エントリ
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IsoCountry {
    pub alpha2: String,
    pub alpha3: String,
    /// 英語名（正規化後の表記）
    pub name: String,
    /// 他言語での国名
    #[serde(default)]
    pub aliases: Vec<String>,
}

/// 原産国正規化のテーブル
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CountryTables {
    /// 「Product of」等の前置き句（多言語）
    pub lead_ins: Vec<String>,
    /// ISOにないTTB独自の地域名
    pub ttb_regions: Vec<String>,
    /// ワイン・蒸留酒の産地 → 国
    pub regions: BTreeMap<String, String>,
    /// 旧国名・通称 → ISO alpha-2
    pub historical: BTreeMap<String, String>,
    pub iso_countries: Vec<IsoCountry>,
}

/// 参照テーブル一式
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupTables {
    pub address: AddressTables,
    pub volume: VolumeTables,
    pub countries: CountryTables,
}

impl LookupTables {
    /// 組み込みテーブルを取得
    pub fn builtin() -> Self {
        BUILTIN.clone()
    }

    /// JSONファイルから読み込み
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// JSON文字列から読み込み（省略したセクションは空）
    pub fn from_json(json: &str) -> Result<Self> {
        let tables: Self = serde_json::from_str(json)?;
        tables.validate()?;
        Ok(tables)
    }

    /// 組み込みテーブルに利用者のテーブルを重ねる
    pub fn builtin_with_overrides(path: Option<&std::path::Path>) -> Result<Self> {
        let mut tables = Self::builtin();
        if let Some(path) = path {
            let custom = Self::from_file(path)?;
            tables.merge(&custom);
        }
        Ok(tables)
    }

    fn validate(&self) -> Result<()> {
        for unit in &self.volume.units {
            if unit.name.trim().is_empty() {
                return Err(Error::Config("容量単位の名前が空です".into()));
            }
            if !(unit.ml.is_finite() && unit.ml > 0.0) {
                return Err(Error::Config(format!(
                    "容量単位 '{}' の換算値が不正: {}",
                    unit.name, unit.ml
                )));
            }
        }
        for country in &self.countries.iso_countries {
            if country.name.trim().is_empty() {
                return Err(Error::Config(format!(
                    "国コード '{}' の英語名が空です",
                    country.alpha2
                )));
            }
        }
        Ok(())
    }

    /// テーブルをマージ（後から追加した設定が優先）
    pub fn merge(&mut self, other: &LookupTables) {
        extend_unique(&mut self.address.lead_ins, &other.address.lead_ins);
        self.address.abbreviations.extend(other.address.abbreviations.clone());

        for unit in &other.volume.units {
            match self.volume.units.iter_mut().find(|u| u.name.eq_ignore_ascii_case(&unit.name)) {
                Some(existing) => existing.ml = unit.ml,
                None => self.volume.units.push(unit.clone()),
            }
        }

        extend_unique(&mut self.countries.lead_ins, &other.countries.lead_ins);
        extend_unique(&mut self.countries.ttb_regions, &other.countries.ttb_regions);
        self.countries.regions.extend(other.countries.regions.clone());
        self.countries.historical.extend(other.countries.historical.clone());
        for country in &other.countries.iso_countries {
            match self
                .countries
                .iso_countries
                .iter_mut()
                .find(|c| c.alpha2.eq_ignore_ascii_case(&country.alpha2))
            {
                Some(existing) => *existing = country.clone(),
                None => self.countries.iso_countries.push(country.clone()),
            }
        }
    }
}

fn extend_unique(target: &mut Vec<String>, items: &[String]) {
    for item in items {
        if !target.iter().any(|t| t.eq_ignore_ascii_case(item)) {
            target.push(item.clone());
        }
    }
}
