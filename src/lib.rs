//! label-verify
//!
//! 酒類ラベルの抽出結果を申請データと照合するCLIの構成要素

pub mod adjudicate;
pub mod batch;
pub mod cli;
pub mod config;
pub mod error;
pub mod report;
pub mod scanner;

use config::Config;
use error::Result;
use label_verify_common::{verify_merged_with, LookupTables, Matcher, VerificationReport};
use std::path::Path;

/// 設定の上書きテーブルを反映した照合器を作る
pub fn build_matcher(config: &Config) -> Result<Matcher> {
    let tables = LookupTables::builtin_with_overrides(config.tables_path.as_deref())?;
    Ok(Matcher::new(&tables))
}

/// 保存済みの統合結果（解決済みを含む）を申請データと照合する
pub fn verify_merged_file(config: &Config, application: &Path, merged: &Path) -> Result<VerificationReport> {
    let matcher = build_matcher(config)?;
    let application = scanner::load_application(application)?;
    let merged = adjudicate::load_merged(merged)?;
    Ok(verify_merged_with(&matcher, &application, &merged))
}
