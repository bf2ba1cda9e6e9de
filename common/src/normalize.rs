//! テキスト正規化と類似度
//!
//! - normalize_text: 書式ノイズを除去した比較用テキスト
//! - normalize_whitespace: 空白のみ統一（大文字小文字は保持）
//! - normalize_key: 複数画像統合時のグループ化キー
//! - jaro_winkler: すべての曖昧比較が依存する類似度

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref WHITESPACE_RE: Regex = Regex::new(r"\s+").unwrap();
}

/// Winkler補正の係数
pub const WINKLER_PREFIX_SCALE: f64 = 0.1;
/// Winkler補正で数える共通接頭辞の最大長
pub const WINKLER_MAX_PREFIX: usize = 4;

/// 空白の連続を1つにまとめ、前後を除去する
pub fn normalize_whitespace(text: &str) -> String {
    WHITESPACE_RE.replace_all(text.trim(), " ").into_owned()
}

/// 比較用にテキストを正規化する
///
/// 小文字化、曲線引用符の統一、アポストロフィ・ハイフン・引用符以外の
/// 記号除去、空白の統一を行う。
pub fn normalize_text(text: &str) -> String {
    let cleaned: String = text
        .to_lowercase()
        .chars()
        .map(unify_quote)
        .filter(|c| c.is_alphanumeric() || c.is_whitespace() || matches!(c, '\'' | '-' | '"'))
        .collect();
    normalize_whitespace(&cleaned)
}

/// 統合処理のグループ化キー（小文字化 + 空白統一のみ）
pub fn normalize_key(text: &str) -> String {
    normalize_whitespace(&text.to_lowercase())
}

fn unify_quote(c: char) -> char {
    match c {
        '\u{2018}' | '\u{2019}' | '\u{201A}' | '\u{201B}' | '\u{2032}' | '`' => '\'',
        '\u{201C}' | '\u{201D}' | '\u{201E}' | '\u{201F}' | '\u{2033}' => '"',
        _ => c,
    }
}

/// Jaro-Winkler類似度（0.0〜1.0）
///
/// 一致窓は `floor(max(len) / 2) - 1`。どちらかが空なら0.0
/// （両方空でも0.0）、完全一致なら1.0。
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();

    let jaro = jaro(&a_chars, &b_chars);
    if jaro == 0.0 {
        return 0.0;
    }

    let prefix = a_chars
        .iter()
        .zip(b_chars.iter())
        .take(WINKLER_MAX_PREFIX)
        .take_while(|(x, y)| x == y)
        .count();

    jaro + prefix as f64 * WINKLER_PREFIX_SCALE * (1.0 - jaro)
}

fn jaro(a: &[char], b: &[char]) -> f64 {
    let a_len = a.len();
    let b_len = b.len();
    // 1文字同士では窓が負になり、一致は発生しない
    let window = (a_len.max(b_len) / 2) as isize - 1;

    let mut a_matched = vec![false; a_len];
    let mut b_matched = vec![false; b_len];
    let mut matches = 0usize;

    for (i, &ac) in a.iter().enumerate() {
        let start = (i as isize - window).max(0);
        let end = (i as isize + window + 1).min(b_len as isize);
        for j in start..end {
            let j = j as usize;
            if b_matched[j] || b[j] != ac {
                continue;
            }
            a_matched[i] = true;
            b_matched[j] = true;
            matches += 1;
            break;
        }
    }

    if matches == 0 {
        return 0.0;
    }

    let mut transpositions = 0usize;
    let mut k = 0usize;
    for (i, &ac) in a.iter().enumerate() {
        if !a_matched[i] {
            continue;
        }
        while !b_matched[k] {
            k += 1;
        }
        if ac != b[k] {
            transpositions += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    let t = transpositions as f64 / 2.0;
    (m / a_len as f64 + m / b_len as f64 + (m - t) / m) / 3.0
}
