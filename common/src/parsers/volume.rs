//! 内容量の解析
//!
//! 登録されたすべての単位を長い名前から順に走査し、見つかった数量を
//! mLに換算して合計する（`1 pint 0.9 fl oz` のような複合表記に対応）。
//! 一致した部分は空白で塗りつぶし、短い単位での二重計上を防ぐ。

use crate::tables::{LookupTables, VolumeUnit};
use lazy_static::lazy_static;
use regex::Regex;

/// 容量一致とみなす相対差（0.5%）
pub const VOLUME_TOLERANCE: f64 = 0.005;

lazy_static! {
    static ref BUILTIN: VolumeParser = VolumeParser::new(&LookupTables::builtin().volume.units);
}

/// 単位表から構築した容量パーサー
#[derive(Debug, Clone)]
pub struct VolumeParser {
    /// (単位パターン, 1単位あたりのmL) を単位名の長い順に保持
    units: Vec<(Regex, f64)>,
}

impl VolumeParser {
    pub fn new(units: &[VolumeUnit]) -> Self {
        let mut sorted: Vec<&VolumeUnit> = units.iter().collect();
        sorted.sort_by(|a, b| b.name.len().cmp(&a.name.len()));

        let units = sorted
            .into_iter()
            .filter_map(|unit| {
                let name_pattern = unit
                    .name
                    .to_lowercase()
                    .split_whitespace()
                    .map(regex::escape)
                    .collect::<Vec<_>>()
                    .join(r"\s*");
                if name_pattern.is_empty() {
                    return None;
                }
                // group1: 数量+単位、group2: 数量
                let pattern = format!(r"((\d*\.?\d+)\s*{})(?:[^a-z]|$)", name_pattern);
                Regex::new(&pattern).ok().map(|re| (re, unit.ml))
            })
            .collect();

        Self { units }
    }

    /// 組み込み単位表のパーサー
    pub fn builtin() -> &'static VolumeParser {
        &BUILTIN
    }

    /// 合計容量をmLで返す（単位が見つからなければNone）
    pub fn parse_ml(&self, text: &str) -> Option<f64> {
        let mut working = text.to_lowercase();
        let mut total = 0.0;
        let mut found = false;

        for (re, ml_per_unit) in &self.units {
            let hits: Vec<(std::ops::Range<usize>, f64)> = re
                .captures_iter(&working)
                .filter_map(|cap| {
                    let span = cap.get(1)?.range();
                    let amount = cap[2].parse::<f64>().ok()?;
                    Some((span, amount))
                })
                .collect();

            for (span, amount) in hits {
                total += amount * ml_per_unit;
                found = true;
                let blank = " ".repeat(span.len());
                working.replace_range(span, &blank);
            }
        }

        found.then_some(total)
    }
}

/// 組み込み単位表で容量を解析
pub fn parse_volume_ml(text: &str) -> Option<f64> {
    BUILTIN.parse_ml(text)
}

/// 相対差が許容範囲（0.5%）以内か
pub fn volumes_equivalent(a_ml: f64, b_ml: f64) -> bool {
    if a_ml == b_ml {
        return true;
    }
    let larger = a_ml.abs().max(b_ml.abs());
    (a_ml - b_ml).abs() / larger <= VOLUME_TOLERANCE
}
