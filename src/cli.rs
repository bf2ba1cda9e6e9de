use crate::config::OutputFormat;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "label-verify")]
#[command(about = "酒類ラベルの抽出結果を申請データと照合するツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// 出力形式 (text/json)。省略時は設定ファイルの値
    #[arg(long, global = true)]
    pub format: Option<OutputFormat>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// 抽出結果を申請データと照合
    Verify {
        /// 申請データJSON
        #[arg(short, long, required = true)]
        application: PathBuf,

        /// 抽出結果JSON（複数指定で統合してから照合）
        #[arg(short, long = "extraction", required_unless_present = "merged", num_args = 1..)]
        extractions: Vec<PathBuf>,

        /// 統合結果JSON（`resolve` で解決済みのもの）を照合
        #[arg(short, long, conflicts_with = "extractions")]
        merged: Option<PathBuf>,

        /// 問題なしとして受理するフィールド名（例: "Government Warning - Header Emphasis"）
        #[arg(long)]
        accept: Vec<String>,

        /// 問題ありとして確認するフィールド名
        #[arg(long)]
        confirm: Vec<String>,

        /// 結果JSONの保存先
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 複数画像の抽出結果を統合
    Merge {
        /// 抽出結果JSON
        #[arg(short, long = "extraction", required = true, num_args = 1..)]
        extractions: Vec<PathBuf>,

        /// 統合結果の保存先（省略時は標準出力）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 統合結果の食い違いを解決
    Resolve {
        /// 統合結果JSON
        #[arg(short, long, required = true)]
        merged: PathBuf,

        /// フィールドキー（例: brandName）
        #[arg(long, requires = "value", conflicts_with = "interactive")]
        field: Option<String>,

        /// 採用する値（候補のいずれか）
        #[arg(long, requires = "field")]
        value: Option<String>,

        /// 未解決の食い違いを対話的に解決
        #[arg(short, long)]
        interactive: bool,

        /// 出力先（省略時は上書き）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// フォルダ内のラベルを一括照合
    Batch {
        /// ラベルフォルダを含むフォルダ
        #[arg(required = true)]
        folder: PathBuf,

        /// 同時に照合するラベル数（省略時は設定値）
        #[arg(short, long)]
        concurrency: Option<usize>,

        /// 結果JSONの保存先
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 設定を表示/編集
    Config {
        /// 参照テーブルの上書きファイルを設定
        #[arg(long)]
        set_tables: Option<PathBuf>,

        /// バッチの同時実行数を設定
        #[arg(long)]
        set_concurrency: Option<usize>,

        /// 出力形式を設定 (text/json)
        #[arg(long)]
        set_format: Option<OutputFormat>,

        /// 設定を表示
        #[arg(long)]
        show: bool,
    },
}
