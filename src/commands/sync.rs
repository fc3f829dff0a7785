use crate::core::config::Config;
use crate::core::pipeline::{CatalogSync, SyncOptions};
use crate::ui;
use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;
use std::path::PathBuf;

/// Reconcile both target roots against the manifest
pub fn execute(matches: &ArgMatches, mut config: Config) -> Result<()> {
    apply_overrides(matches, &mut config)?;
    let dry_run = matches.get_flag("dry-run");

    if dry_run {
        println!("{}", "DRY RUN MODE - No files will be changed".yellow().bold());
        println!();
    }
    ui::info(&format!("Syncing catalog from {}", config.manifest.display()));

    let options = SyncOptions {
        dry_run,
        show_progress: true,
    };
    let sync = CatalogSync::new(&config, options);
    let summary = sync
        .run()
        .with_context(|| format!("Sync from {} aborted", config.manifest.display()))?;

    ui::print_run_summary(&summary);
    Ok(())
}

/// Layer command line flags over the loaded config
pub fn apply_overrides(matches: &ArgMatches, config: &mut Config) -> Result<()> {
    if let Some(manifest) = matches.get_one::<PathBuf>("manifest") {
        config.manifest = manifest.clone();
    }
    if let Some(concurrency) = matches.get_one::<usize>("concurrency") {
        config.probe.concurrency = *concurrency;
    }
    config.validate().context("Invalid command line overrides")?;
    Ok(())
}
