use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use dirsync_engine::{CategoryOutcome, SyncConfig, SyncEngine};
use dirsync_fetch::{FileSource, HttpSource, SourceAdapter};
use dirsync_store::{DataStore, FsDataStore};
use dirsync_types::{CategoryName, Timestamp};
use dirsync_validate::{AuditStatus, Validator};
use tracing::{debug, warn};

use crate::cli::*;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let config = SyncConfig::load(&cli.config)
        .with_context(|| format!("loading {}", cli.config.display()))?;
    match cli.command {
        Command::Sync(args) => cmd_sync(config, args).await,
        Command::Validate(_) => cmd_validate(config),
        Command::Backup(_) => cmd_backup(config),
        Command::Config(_) => cmd_config(config),
    }
}

async fn cmd_sync(config: SyncConfig, args: SyncArgs) -> anyhow::Result<()> {
    let only = args
        .categories
        .iter()
        .map(CategoryName::new)
        .collect::<Result<Vec<_>, _>>()?;

    let source: Arc<dyn SourceAdapter> = match &args.fixtures {
        Some(dir) => Arc::new(FileSource::new(dir)),
        None => Arc::new(http_source(&config)?),
    };
    let validator = Validator::with_default_checks(config.contracts());
    let store = Arc::new(FsDataStore::new(&config.data_dir));
    let metrics_file = config.metrics_file.clone();
    let engine = SyncEngine::new(config, source, store, validator);

    let result = engine.run_categories(&only).await;
    if !args.no_metrics {
        match (engine.stats().save_metrics(&metrics_file, Timestamp::now()), &result) {
            (Ok(()), _) => debug!(path = %metrics_file.display(), "metrics written"),
            (Err(e), Ok(_)) => return Err(e.into()),
            (Err(e), Err(_)) => warn!(error = %e, "metrics not written"),
        }
    }
    let report = result?;

    println!("Snapshot: {}", report.snapshot.display().to_string().dimmed());
    for entry in &report.categories {
        let name = entry.category.as_str().bold();
        match &entry.outcome {
            CategoryOutcome::Updated {
                added,
                updated,
                delta,
                entries,
            } => println!(
                "{} {name}: {added} added, {updated} updated ({delta:+}), {entries} entries",
                "✓".green().bold()
            ),
            CategoryOutcome::Unchanged { entries } => {
                println!("{} {name}: unchanged, {entries} entries", "=".cyan())
            }
            CategoryOutcome::Skipped { reason } => {
                println!("{} {name}: skipped ({reason})", "-".yellow())
            }
            CategoryOutcome::Failed { error, backup } => {
                println!("{} {name}: {error}", "✗".red().bold());
                if let Some(path) = backup {
                    println!("    backup: {}", path.display().to_string().yellow());
                }
            }
        }
    }

    if report.has_changes() {
        println!("\nChanges:");
        for line in report.summary_lines() {
            println!("  {line}");
        }
    } else {
        println!("\nNo changes.");
    }
    Ok(())
}

fn http_source(config: &SyncConfig) -> anyhow::Result<HttpSource> {
    let mut source = HttpSource::new(&config.api.base_url, config.api.timeout())?;
    if let Some(var) = &config.api.token_env {
        let token = std::env::var(var)
            .with_context(|| format!("api.token_env names {var}, which is not set"))?;
        source = source.with_bearer_token(token);
    }
    Ok(source)
}

fn cmd_validate(config: SyncConfig) -> anyhow::Result<()> {
    let validator = Validator::with_default_checks(config.contracts());
    let report = validator.validate_all(&config.data_dir, &config.category_names());

    for (category, status) in &report.results {
        match status {
            AuditStatus::Valid => println!("{} {}", "✓".green().bold(), category),
            AuditStatus::Missing => println!("{} {} (no file)", "-".yellow(), category),
            AuditStatus::Invalid(err) => {
                println!("{} {}", "✗".red().bold(), category);
                for violation in &err.violations {
                    println!("    {violation}");
                }
            }
        }
    }

    let failures = report.failures().count();
    if failures > 0 {
        anyhow::bail!("{failures} category file(s) failed validation");
    }
    Ok(())
}

fn cmd_backup(config: SyncConfig) -> anyhow::Result<()> {
    let store = FsDataStore::new(&config.data_dir);
    let path = store.snapshot_all(&Timestamp::now())?;
    println!("{} Backup written to {}", "✓".green().bold(), path.display().to_string().bold());
    Ok(())
}

fn cmd_config(config: SyncConfig) -> anyhow::Result<()> {
    print!("{}", config.to_toml()?);
    Ok(())
}
