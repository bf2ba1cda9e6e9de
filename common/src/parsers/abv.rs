//! アルコール度数の解析
//!
//! `45%` をそのまま、または `90 Proof` を半分にしてパーセントに変換する。
//! 比較は許容誤差なしの完全一致。

use lazy_static::lazy_static;
use regex::Regex;

/// 度数の表記元
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AbvSource {
    Percent,
    Proof,
}

/// 解析済みの度数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Abv {
    /// アルコール度数（%）
    pub percent: f64,
    /// ラベル上の数値（Proofならproof値）
    pub raw: f64,
    pub source: AbvSource,
}

impl Abv {
    /// 度数が一致するか（許容誤差なし）
    pub fn same_as(&self, other: &Abv) -> bool {
        self.percent == other.percent
    }
}

/// テキストから度数を抽出（%優先、なければProof）
pub fn parse_abv(text: &str) -> Option<Abv> {
    lazy_static! {
        static ref PERCENT_RE: Regex = Regex::new(r"(\d*\.?\d+)\s*%").unwrap();
        static ref PROOF_RE: Regex = Regex::new(r"(?i)(\d*\.?\d+)\s*°?\s*proof\b").unwrap();
    }

    if let Some(value) = PERCENT_RE
        .captures(text)
        .and_then(|cap| cap[1].parse::<f64>().ok())
    {
        return Some(Abv {
            percent: value,
            raw: value,
            source: AbvSource::Percent,
        });
    }

    PROOF_RE
        .captures(text)
        .and_then(|cap| cap[1].parse::<f64>().ok())
        .map(|proof| Abv {
            percent: proof / 2.0,
            raw: proof,
            source: AbvSource::Proof,
        })
}
