//! ラベルフォルダの走査と入力ファイルの読み込み
//!
//! 1ラベル = `application.json` を含むフォルダ。
//! 同じフォルダの `*.extraction.json` がそのラベルの画像ごとの抽出結果。

use crate::error::{LabelVerifyError, Result};
use label_verify_common::{parse_image_extraction, ApplicationData, ImageExtraction, ImageLabel, ImageSource};
use std::path::{Path, PathBuf};
use tracing::warn;
use walkdir::WalkDir;

pub const APPLICATION_FILE: &str = "application.json";
pub const EXTRACTION_SUFFIX: &str = ".extraction.json";

/// ラベル1件分の入力ファイル
#[derive(Debug, Clone)]
pub struct LabelFolder {
    pub path: PathBuf,
    pub name: String,
    pub application: PathBuf,
    pub extractions: Vec<PathBuf>,
}

/// 読み込めなかった抽出ファイル
#[derive(Debug, Clone)]
pub struct ExcludedFile {
    pub path: PathBuf,
    pub reason: String,
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn is_extraction_file(path: &Path) -> bool {
    path.is_file() && file_name(path).to_lowercase().ends_with(EXTRACTION_SUFFIX)
}

/// フォルダ直下の抽出ファイル（ファイル名順）
pub fn scan_extractions(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(LabelVerifyError::FolderNotFound(folder.display().to_string()));
    }

    let mut files: Vec<PathBuf> = WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .map(|e| e.into_path())
        .filter(|p| is_extraction_file(p))
        .collect();

    files.sort_by_key(|p| file_name(p));
    Ok(files)
}

/// ラベルフォルダを探す（ルート自身も対象、フォルダ名順）
pub fn scan_label_folders(root: &Path) -> Result<Vec<LabelFolder>> {
    if !root.is_dir() {
        return Err(LabelVerifyError::FolderNotFound(root.display().to_string()));
    }

    let mut labels = Vec::new();
    for entry in WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| e.depth() == 0 || !file_name(e.path()).starts_with('.'))
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                warn!("フォルダを読めません: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_dir() {
            continue;
        }

        let application = entry.path().join(APPLICATION_FILE);
        if !application.is_file() {
            continue;
        }

        labels.push(LabelFolder {
            path: entry.path().to_path_buf(),
            name: entry
                .path()
                .strip_prefix(root)
                .ok()
                .filter(|p| !p.as_os_str().is_empty())
                .map(|p| p.display().to_string())
                .unwrap_or_else(|| file_name(entry.path())),
            application,
            extractions: scan_extractions(entry.path())?,
        });
    }

    Ok(labels)
}

/// 申請データを読み込む
pub fn load_application(path: &Path) -> Result<ApplicationData> {
    if !path.is_file() {
        return Err(LabelVerifyError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    Ok(serde_json::from_str(&content)?)
}

/// 抽出結果を読み込む
///
/// 画像情報がなければファイル名から補う（`front.extraction.json` → id "front", label front）。
pub fn load_extraction(path: &Path) -> Result<ImageExtraction> {
    if !path.is_file() {
        return Err(LabelVerifyError::FileNotFound(path.display().to_string()));
    }
    let content = std::fs::read_to_string(path)?;
    let name = file_name(path);
    let id = name
        .strip_suffix(EXTRACTION_SUFFIX)
        .or_else(|| name.strip_suffix(".json"))
        .unwrap_or(&name)
        .to_string();

    let fallback = ImageExtraction {
        source: ImageSource {
            label: ImageLabel::from_file_name(&id),
            id,
            filename: name,
        },
        ..Default::default()
    };
    Ok(parse_image_extraction(&content, fallback)?)
}

/// 抽出結果をまとめて読み込む（読めないファイルは除外して続行）
pub fn load_extractions(paths: &[PathBuf]) -> (Vec<ImageExtraction>, Vec<ExcludedFile>) {
    let mut extractions = Vec::new();
    let mut excluded = Vec::new();

    for path in paths {
        match load_extraction(path) {
            Ok(extraction) => extractions.push(extraction),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "extraction excluded");
                excluded.push(ExcludedFile {
                    path: path.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    (extractions, excluded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_scan_extractions_not_found() {
        let result = scan_extractions(Path::new("/nonexistent/folder"));
        assert!(matches!(result, Err(LabelVerifyError::FolderNotFound(_))));
    }

    #[test]
    fn test_scan_extractions_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("side.extraction.json"), "{}").unwrap();
        fs::write(dir.path().join("back.extraction.json"), "{}").unwrap();
        fs::write(dir.path().join("application.json"), "{}").unwrap();
        fs::write(dir.path().join("notes.txt"), "x").unwrap();

        let files = scan_extractions(dir.path()).unwrap();
        let names: Vec<String> = files.iter().map(|p| file_name(p)).collect();
        assert_eq!(names, vec!["back.extraction.json", "side.extraction.json"]);
    }

    #[test]
    fn test_load_extraction_bare_fields_uses_file_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("front.extraction.json");
        fs::write(&path, r#"{"brandName": "Old Tom"}"#).unwrap();

        let extraction = load_extraction(&path).unwrap();
        assert_eq!(extraction.source.id, "front");
        assert_eq!(extraction.source.label, ImageLabel::Front);
        assert_eq!(extraction.source.filename, "front.extraction.json");
        assert_eq!(extraction.fields.brand_name.as_deref(), Some("Old Tom"));
    }

    #[test]
    fn test_load_extractions_excludes_broken_files() {
        let dir = tempfile::tempdir().unwrap();
        let good = dir.path().join("front.extraction.json");
        let broken = dir.path().join("back.extraction.json");
        fs::write(&good, r#"{"brandName": "Old Tom"}"#).unwrap();
        fs::write(&broken, "not json at all").unwrap();

        let (extractions, excluded) = load_extractions(&[good, broken.clone()]);
        assert_eq!(extractions.len(), 1);
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].path, broken);
    }

    #[test]
    fn test_load_extractions_excludes_wrapped_file_with_bad_source() {
        let dir = tempfile::tempdir().unwrap();
        let broken = dir.path().join("front.extraction.json");
        fs::write(
            &broken,
            r#"{"source":{"label":"front","filename":"f.jpg"},"fields":{"brandName":"Old Tom"}}"#,
        )
        .unwrap();

        let (extractions, excluded) = load_extractions(&[broken.clone()]);
        assert!(extractions.is_empty());
        assert_eq!(excluded.len(), 1);
        assert_eq!(excluded[0].path, broken);
    }

    #[test]
    fn test_load_application_missing() {
        let result = load_application(Path::new("/nonexistent/application.json"));
        assert!(matches!(result, Err(LabelVerifyError::FileNotFound(_))));
    }
}
