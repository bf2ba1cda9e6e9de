use crate::error::{LabelVerifyError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};

/// 結果の出力形式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Text,
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown format: {}. Use text or json", s)),
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

fn default_batch_concurrency() -> usize {
    4
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// 参照テーブルの上書きファイル
    #[serde(default)]
    pub tables_path: Option<PathBuf>,
    /// バッチ処理で同時に検証するラベル数
    #[serde(default = "default_batch_concurrency")]
    pub batch_concurrency: usize,
    #[serde(default)]
    pub output_format: OutputFormat,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tables_path: None,
            batch_concurrency: default_batch_concurrency(),
            output_format: OutputFormat::default(),
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// 指定パスから読み込む（なければデフォルト）
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| LabelVerifyError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("label-verify").join("config.json"))
    }

    fn validate(&self) -> Result<()> {
        if self.batch_concurrency == 0 {
            return Err(LabelVerifyError::Config(
                "batch_concurrency は1以上を指定してください".into(),
            ));
        }
        Ok(())
    }

    pub fn set_tables_path(&mut self, path: PathBuf) -> Result<()> {
        if !path.exists() {
            return Err(LabelVerifyError::FileNotFound(path.display().to_string()));
        }
        self.tables_path = Some(path);
        Ok(())
    }

    pub fn set_batch_concurrency(&mut self, concurrency: usize) -> Result<()> {
        let updated = Self {
            batch_concurrency: concurrency,
            ..self.clone()
        };
        updated.validate()?;
        *self = updated;
        Ok(())
    }
}
