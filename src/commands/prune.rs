use crate::core::config::Config;
use crate::core::reconciler::prune_empty_dirs;
use crate::ui;
use anyhow::{Context, Result};
use clap::ArgMatches;
use colored::Colorize;

/// Remove artifact-free directories below both target roots
pub fn execute(matches: &ArgMatches, config: &Config) -> Result<()> {
    let dry_run = matches.get_flag("dry-run");

    if dry_run {
        println!("{}", "DRY RUN MODE - No directories will be removed".yellow().bold());
        println!();
    }

    let mut failures = 0;
    for root in [&config.movies_root, &config.series_root] {
        let report = prune_empty_dirs(root, dry_run)
            .with_context(|| format!("Failed to prune {}", root.display()))?;
        failures += report.failures.len();
        ui::print_prune_report(&report);
    }

    if failures > 0 {
        ui::warn(&format!("{} directories could not be removed", failures));
    }
    Ok(())
}
