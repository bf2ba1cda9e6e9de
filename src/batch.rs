//! ラベルの一括照合
//!
//! ラベル単位で並列に照合する（同時実行数は設定値で上限を設ける）。
//! 読めないラベルは記録して飛ばし、読めない抽出ファイルはそのラベルから除外する。

use crate::error::{LabelVerifyError, Result};
use crate::scanner::{load_application, load_extractions, scan_label_folders, ExcludedFile, LabelFolder};
use indicatif::{ProgressBar, ProgressStyle};
use label_verify_common::{verify_images_with, Matcher, OverallStatus, VerificationReport};
use rayon::prelude::*;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// ラベル1件の処理結果
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelOutcome {
    pub name: String,
    pub path: PathBuf,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub report: Option<VerificationReport>,
    /// 除外した抽出ファイル
    pub excluded: Vec<String>,
    /// ラベル自体を処理できなかった理由
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl LabelOutcome {
    pub fn status(&self) -> Option<OverallStatus> {
        self.report.as_ref().map(|r| r.overall_status)
    }
}

/// 一括照合の集計
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchSummary {
    pub pass: usize,
    pub fail: usize,
    pub review: usize,
    pub skipped: usize,
    pub labels: Vec<LabelOutcome>,
}

impl BatchSummary {
    fn from_outcomes(labels: Vec<LabelOutcome>) -> Self {
        let mut summary = BatchSummary::default();
        for label in &labels {
            match label.status() {
                Some(OverallStatus::Pass) => summary.pass += 1,
                Some(OverallStatus::Fail) => summary.fail += 1,
                Some(OverallStatus::Review) => summary.review += 1,
                None => summary.skipped += 1,
            }
        }
        summary.labels = labels;
        summary
    }
}

/// 1ラベルを照合する
pub fn verify_folder(matcher: &Matcher, label: &LabelFolder) -> LabelOutcome {
    let mut outcome = LabelOutcome {
        name: label.name.clone(),
        path: label.path.clone(),
        report: None,
        excluded: Vec::new(),
        error: None,
    };

    let application = match load_application(&label.application) {
        Ok(application) => application,
        Err(e) => {
            warn!(label = %label.name, error = %e, "label skipped");
            outcome.error = Some(e.to_string());
            return outcome;
        }
    };

    let (extractions, excluded) = load_extractions(&label.extractions);
    outcome.excluded = excluded
        .iter()
        .map(|ExcludedFile { path, reason }| format!("{}: {}", path.display(), reason))
        .collect();

    if extractions.is_empty() {
        outcome.error = Some("読み込める抽出結果がありません".to_string());
        return outcome;
    }

    outcome.report = Some(verify_images_with(matcher, &application, &extractions));
    outcome
}

/// フォルダ内の全ラベルを照合する
pub fn run_batch(root: &Path, matcher: &Matcher, concurrency: usize, show_progress: bool) -> Result<BatchSummary> {
    let labels = scan_label_folders(root)?;
    info!(labels = labels.len(), concurrency, "batch started");

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .build()
        .map_err(|e| LabelVerifyError::Config(format!("スレッドプールを作成できません: {}", e)))?;

    let pb = if show_progress {
        ProgressBar::new(labels.len() as u64)
    } else {
        ProgressBar::hidden()
    };
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
    {
        pb.set_style(style.progress_chars("#>-"));
    }

    let outcomes: Vec<LabelOutcome> = pool.install(|| {
        labels
            .par_iter()
            .map(|label| {
                let outcome = verify_folder(matcher, label);
                pb.set_message(label.name.clone());
                pb.inc(1);
                outcome
            })
            .collect()
    });
    pb.finish_and_clear();

    let summary = BatchSummary::from_outcomes(outcomes);
    info!(
        pass = summary.pass,
        fail = summary.fail,
        review = summary.review,
        skipped = summary.skipped,
        "batch finished"
    );
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn write_label(root: &Path, name: &str, application: &str, extractions: &[(&str, &str)]) {
        let dir = root.join(name);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("application.json"), application).unwrap();
        for (file, content) in extractions {
            fs::write(dir.join(file), content).unwrap();
        }
    }

    #[test]
    fn test_summary_counts() {
        let outcome = |status: Option<OverallStatus>| LabelOutcome {
            name: "x".into(),
            path: PathBuf::new(),
            report: status.map(|overall_status| VerificationReport {
                results: Vec::new(),
                overall_status,
                merged: None,
            }),
            excluded: Vec::new(),
            error: None,
        };
        let summary = BatchSummary::from_outcomes(vec![
            outcome(Some(OverallStatus::Pass)),
            outcome(Some(OverallStatus::Review)),
            outcome(Some(OverallStatus::Review)),
            outcome(None),
        ]);
        assert_eq!(summary.pass, 1);
        assert_eq!(summary.review, 2);
        assert_eq!(summary.fail, 0);
        assert_eq!(summary.skipped, 1);
    }

    #[test]
    fn test_broken_application_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        write_label(dir.path(), "a-good", r#"{"brandName": "Old Tom"}"#, &[("front.extraction.json", r#"{"brandName": "Old Tom"}"#)]);
        write_label(dir.path(), "b-broken", "{", &[("front.extraction.json", "{}")]);

        let summary = run_batch(dir.path(), Matcher::builtin(), 2, false).unwrap();
        assert_eq!(summary.labels.len(), 2);
        assert_eq!(summary.skipped, 1);
        assert!(summary.labels[0].report.is_some());
        assert!(summary.labels[1].error.is_some());
    }

    #[test]
    fn test_broken_extraction_is_excluded() {
        let dir = tempfile::tempdir().unwrap();
        write_label(
            dir.path(),
            "label",
            r#"{"brandName": "Old Tom"}"#,
            &[
                ("back.extraction.json", "not json"),
                ("front.extraction.json", r#"{"brandName": "Old Tom"}"#),
            ],
        );

        let summary = run_batch(dir.path(), Matcher::builtin(), 1, false).unwrap();
        let label = &summary.labels[0];
        assert_eq!(label.excluded.len(), 1);
        let report = label.report.as_ref().unwrap();
        // 1枚だけなので統合しない
        assert!(report.merged.is_none());
    }

    #[test]
    fn test_missing_folder() {
        let result = run_batch(Path::new("/nonexistent/labels"), Matcher::builtin(), 1, false);
        assert!(matches!(result, Err(LabelVerifyError::FolderNotFound(_))));
    }
}
