//! 照合結果の表示

use crate::config::OutputFormat;
use crate::error::Result;
use label_verify_common::{
    get_unresolved_conflicts, FieldResult, FieldStatus, MergedExtraction, OverallStatus,
    OverrideAction, VerificationReport,
};
use std::fmt::Write as _;

fn status_mark(status: FieldStatus) -> &'static str {
    match status {
        FieldStatus::Pass => "✔",
        FieldStatus::Fail => "✘",
        FieldStatus::Warning => "⚠",
        FieldStatus::NotFound => "?",
        FieldStatus::Overridden => "✎",
    }
}

fn overall_mark(status: OverallStatus) -> &'static str {
    match status {
        OverallStatus::Pass => "✅",
        OverallStatus::Fail => "❌",
        OverallStatus::Review => "🔍",
    }
}

fn format_result(result: &FieldResult) -> String {
    let mut line = format!(
        "{} {:<44} {:<10} {:>4.0}%  {}",
        status_mark(result.status),
        result.field_name,
        result.status.to_string(),
        result.confidence * 100.0,
        result.details
    );
    if let Some(value) = &result.extracted_value {
        let _ = write!(line, "\n    label: {}", value);
    }
    if let Some(decision) = &result.override_ {
        let action = match decision.action {
            OverrideAction::Accepted => "accepted",
            OverrideAction::ConfirmedIssue => "confirmed issue",
        };
        let _ = write!(line, "\n    override: {} at {}", action, decision.timestamp.to_rfc3339());
    }
    line
}

/// 統合結果の要約（食い違いと候補）
pub fn format_merge_summary(merged: &MergedExtraction) -> String {
    let mut out = format!(
        "画像: {}枚 / 食い違い: {}件 (未解決 {}件)",
        merged.extractions.len(),
        merged.conflicts.len(),
        get_unresolved_conflicts(merged).len()
    );
    for conflict in &merged.conflicts {
        let state = match &conflict.selected_value {
            Some(value) => format!("解決済み → {}", value),
            None => "未解決".to_string(),
        };
        let _ = write!(out, "\n  {} [{}]", conflict.display_name, state);
        for candidate in &conflict.candidates {
            let ids: Vec<&str> = candidate.sources.iter().map(|s| s.id.as_str()).collect();
            let _ = write!(out, "\n    - {} ({})", candidate.value, ids.join(", "));
        }
    }
    out
}

/// 照合結果をテキストで整形
pub fn format_text(report: &VerificationReport) -> String {
    let mut out = String::new();
    for result in &report.results {
        let _ = writeln!(out, "{}", format_result(result));
    }
    if let Some(merged) = &report.merged {
        let _ = writeln!(out, "\n{}", format_merge_summary(merged));
    }
    let _ = write!(out, "\n{} 判定: {}", overall_mark(report.overall_status), report.overall_status);
    out
}

pub fn render(report: &VerificationReport, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(format_text(report)),
        OutputFormat::Json => Ok(serde_json::to_string_pretty(report)?),
    }
}
