use chrono::Utc;
use clap::Parser;
use label_verify::{adjudicate, batch, build_matcher, cli, config, error, report, scanner, verify_merged_file};
use label_verify_common::{merge_extractions, verify_images_with, OverrideAction, VerificationReport};
use cli::{Cli, Commands};
use config::Config;
use error::{LabelVerifyError, Result};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// フィールド名で指定された人の判断を反映する
fn apply_overrides(verification: VerificationReport, accept: &[String], confirm: &[String]) -> VerificationReport {
    if accept.is_empty() && confirm.is_empty() {
        return verification;
    }
    let now = Utc::now();
    let results = verification
        .results
        .iter()
        .map(|r| {
            if accept.iter().any(|name| name.eq_ignore_ascii_case(&r.field_name)) {
                r.with_override(OverrideAction::Accepted, now)
            } else if confirm.iter().any(|name| name.eq_ignore_ascii_case(&r.field_name)) {
                r.with_override(OverrideAction::ConfirmedIssue, now)
            } else {
                r.clone()
            }
        })
        .collect();
    verification.with_results(results)
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    let config = Config::load()?;
    let format = cli.format.unwrap_or(config.output_format);

    match cli.command {
        Commands::Verify { application, extractions, merged, accept, confirm, output } => {
            let verification = match merged {
                Some(merged) => verify_merged_file(&config, &application, &merged)?,
                None => {
                    let matcher = build_matcher(&config)?;
                    let application = scanner::load_application(&application)?;

                    let (images, excluded) = scanner::load_extractions(&extractions);
                    for file in &excluded {
                        println!("⚠ 除外: {} ({})", file.path.display(), file.reason);
                    }
                    if images.is_empty() {
                        return Err(LabelVerifyError::InvalidInput("読み込める抽出結果がありません".into()));
                    }
                    verify_images_with(&matcher, &application, &images)
                }
            };
            let verification = apply_overrides(verification, &accept, &confirm);

            println!("{}", report::render(&verification, format)?);

            if let Some(path) = output {
                std::fs::write(&path, serde_json::to_string_pretty(&verification)?)?;
                println!("\n✔ 結果を保存: {}", path.display());
            }
        }

        Commands::Merge { extractions, output } => {
            let (images, excluded) = scanner::load_extractions(&extractions);
            for file in &excluded {
                println!("⚠ 除外: {} ({})", file.path.display(), file.reason);
            }

            let merged = merge_extractions(&images);
            match output {
                Some(path) => {
                    adjudicate::save_merged(&merged, &path)?;
                    println!("{}", report::format_merge_summary(&merged));
                    println!("\n✔ 統合結果を保存: {}", path.display());
                }
                None => println!("{}", serde_json::to_string_pretty(&merged)?),
            }
        }

        Commands::Resolve { merged, field, value, interactive, output } => {
            if interactive {
                adjudicate::run_interactive_resolve(&merged, output.as_deref())?;
            } else {
                let (Some(field), Some(value)) = (field, value) else {
                    return Err(LabelVerifyError::InvalidInput(
                        "--field と --value、または --interactive を指定してください".into(),
                    ));
                };
                let snapshot = adjudicate::load_merged(&merged)?;
                let resolved = adjudicate::resolve_with_value(&snapshot, &field, &value)?;
                let target = output.unwrap_or(merged);
                adjudicate::save_merged(&resolved, &target)?;
                println!("{}", report::format_merge_summary(&resolved));
                println!("\n✔ 保存しました: {}", target.display());
            }
        }

        Commands::Batch { folder, concurrency, output } => {
            println!("🍾 label-verify - 一括照合\n");
            let matcher = build_matcher(&config)?;
            let concurrency = concurrency.unwrap_or(config.batch_concurrency);
            let summary = batch::run_batch(&folder, &matcher, concurrency, true)?;

            for label in &summary.labels {
                match (&label.report, &label.error) {
                    (Some(verification), _) => println!("{} {}", verification.overall_status, label.name),
                    (None, Some(error)) => println!("SKIPPED {} ({})", label.name, error),
                    (None, None) => {}
                }
                for file in &label.excluded {
                    println!("    ⚠ 除外: {}", file);
                }
            }
            println!(
                "\nPASS {} / FAIL {} / REVIEW {} / SKIPPED {}",
                summary.pass, summary.fail, summary.review, summary.skipped
            );

            if let Some(path) = output {
                std::fs::write(&path, serde_json::to_string_pretty(&summary)?)?;
                println!("✔ 結果を保存: {}", path.display());
            }
        }

        Commands::Config { set_tables, set_concurrency, set_format, show } => {
            let mut config = config;
            let changed = set_tables.is_some() || set_concurrency.is_some() || set_format.is_some();

            if let Some(path) = set_tables {
                config.set_tables_path(path)?;
                println!("✔ 参照テーブルを設定しました");
            }
            if let Some(concurrency) = set_concurrency {
                config.set_batch_concurrency(concurrency)?;
                println!("✔ 同時実行数を設定しました");
            }
            if let Some(format) = set_format {
                config.output_format = format;
                println!("✔ 出力形式を設定しました");
            }
            if changed {
                config.save()?;
            }

            if show || !changed {
                println!("設定:");
                println!(
                    "  参照テーブル: {}",
                    config
                        .tables_path
                        .as_ref()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "組み込み".into())
                );
                println!("  同時実行数: {}", config.batch_concurrency);
                println!("  出力形式: {}", config.output_format);
            }
        }
    }

    Ok(())
}
