//! 食い違いの解決（人による判断）
//!
//! 統合結果ファイルを読み込み、未解決の食い違いを1件ずつ選択させて
//! 新しいスナップショットとして保存する。

use crate::error::{LabelVerifyError, Result};
use dialoguer::Select;
use label_verify_common::{
    get_unresolved_conflicts, resolve_conflict, FieldConflict, FieldKey, MergedExtraction,
};
use std::path::Path;

/// 対話アクション
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveAction {
    /// 候補を採用
    Select(String),
    /// このフィールドを保留
    Skip,
    /// 保存して終了
    Quit,
}

pub fn load_merged(path: &Path) -> Result<MergedExtraction> {
    if !path.is_file() {
        return Err(LabelVerifyError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

pub fn save_merged(merged: &MergedExtraction, path: &Path) -> Result<()> {
    let json = serde_json::to_string_pretty(merged)?;
    std::fs::write(path, json)?;
    Ok(())
}

/// 候補の表示文字列（値と、その値を出した画像）
pub fn candidate_labels(conflict: &FieldConflict) -> Vec<String> {
    conflict
        .candidates
        .iter()
        .map(|c| {
            let images: Vec<String> = c
                .sources
                .iter()
                .map(|s| if s.filename.is_empty() { s.id.clone() } else { s.filename.clone() })
                .collect();
            format!("{}  ({}枚: {})", c.value, c.sources.len(), images.join(", "))
        })
        .collect()
}

/// 引数で指定された値で解決する
///
/// 候補にない値はエラーにする（中核処理は入力をそのまま返すだけなので）。
pub fn resolve_with_value(merged: &MergedExtraction, field: &str, value: &str) -> Result<MergedExtraction> {
    let key: FieldKey = field.parse().map_err(LabelVerifyError::InvalidInput)?;
    let conflict = merged
        .conflict(key)
        .ok_or_else(|| LabelVerifyError::InvalidInput(format!("{} に食い違いはありません", key)))?;

    if conflict.find_candidate(value).is_none() {
        let values: Vec<&str> = conflict.candidates.iter().map(|c| c.value.as_str()).collect();
        return Err(LabelVerifyError::InvalidInput(format!(
            "'{}' は {} の候補にありません（候補: {}）",
            value,
            key,
            values.join(" / ")
        )));
    }

    Ok(resolve_conflict(merged, key, value))
}

/// 未解決の食い違いを対話的に解決
pub fn run_interactive_resolve(input_path: &Path, output_path: Option<&Path>) -> Result<()> {
    let mut merged = load_merged(input_path)?;

    let pending: Vec<FieldConflict> = get_unresolved_conflicts(&merged).into_iter().cloned().collect();
    if pending.is_empty() {
        println!("✓ 未解決の食い違いはありません");
        return Ok(());
    }

    println!("⚖ 未解決の食い違い: {}件", pending.len());
    println!("---\n");

    for (count, conflict) in pending.iter().enumerate() {
        println!("[{}/{}] {} ({})", count + 1, pending.len(), conflict.display_name, conflict.field_key);

        match prompt_resolve_action(conflict)? {
            ResolveAction::Select(value) => {
                merged = resolve_conflict(&merged, conflict.field_key, &value);
                println!("  → {}\n", value);
            }
            ResolveAction::Skip => {
                println!("  → 保留\n");
            }
            ResolveAction::Quit => {
                println!("保存して終了します...");
                break;
            }
        }
    }

    let output = output_path.unwrap_or(input_path);
    save_merged(&merged, output)?;

    let remaining = get_unresolved_conflicts(&merged).len();
    println!("\n✓ 保存しました: {}", output.display());
    if remaining > 0 {
        println!("  未解決: {}件", remaining);
    }

    Ok(())
}

fn prompt_resolve_action(conflict: &FieldConflict) -> Result<ResolveAction> {
    let mut items = candidate_labels(conflict);
    items.push("保留".to_string());
    items.push("保存して終了".to_string());

    let selection = Select::new()
        .with_prompt("採用する値")
        .items(&items)
        .default(0)
        .interact()
        .map_err(|e| LabelVerifyError::Prompt(e.to_string()))?;

    Ok(action_for_selection(conflict, selection))
}

/// 選択番号をアクションに変換（候補の後ろに「保留」「終了」が並ぶ）
pub fn action_for_selection(conflict: &FieldConflict, selection: usize) -> ResolveAction {
    let count = conflict.candidates.len();
    match selection {
        i if i < count => ResolveAction::Select(conflict.candidates[i].value.clone()),
        i if i == count => ResolveAction::Skip,
        _ => ResolveAction::Quit,
    }
}
