// Terminal rendering of run results

use crate::core::pipeline::RunSummary;
use crate::core::reconciler::{PruneReport, ReconcileReport};
use colored::Colorize;

/// Identifiers listed per section before the rest is collapsed
const MAX_LISTED: usize = 20;

pub fn print_run_summary(summary: &RunSummary) {
    println!();
    if summary.dry_run {
        println!("{}", "DRY RUN - no files were changed".yellow().bold());
    }
    println!("{}", "Sync summary".white().bold());
    println!(
        "  {} {} entries from {} line pairs ({} CAM, {} excluded)",
        "Parsed:".white(),
        summary.parse.entries.to_string().cyan(),
        summary.parse.pairs,
        summary.parse.cam,
        summary.excluded
    );
    println!(
        "  {} {} distinct URLs, {} live, {} offline entries",
        "Probed:".white(),
        summary.distinct_urls.to_string().cyan(),
        summary.live_urls.to_string().green(),
        summary.offline_entries.to_string().yellow()
    );
    if summary.parse.streams > 0 {
        let state = if summary.streams_playlist_updated {
            "playlist updated"
        } else {
            "playlist unchanged"
        };
        println!(
            "  {} {} live streams, {}",
            "Streams:".white(),
            summary.parse.streams.to_string().cyan(),
            state.dimmed()
        );
    }

    print_section("Movies", &summary.movies);
    print_section("Series", &summary.series);

    println!();
    let totals = format!(
        "{} created, {} updated, {} deleted in {:.1}s",
        summary.created(),
        summary.updated(),
        summary.deleted(),
        summary.duration_secs
    );
    if summary.failures() > 0 {
        println!(
            "{} {}",
            totals.green().bold(),
            format!("({} failures, retried next run)", summary.failures()).red()
        );
    } else {
        println!("{}", totals.green().bold());
    }
}

fn print_section(label: &str, report: &ReconcileReport) {
    println!();
    println!(
        "{} {}",
        format!("{}:", label).white().bold(),
        report.root.display().to_string().dimmed()
    );
    print_ids("+", &report.created, |s| s.green().to_string());
    print_ids("~", &report.updated, |s| s.cyan().to_string());
    print_ids("-", &report.deleted, |s| s.red().to_string());
    println!(
        "  {} unchanged, {} directories pruned",
        report.unchanged,
        report.pruned_dirs.len()
    );
    for failure in &report.failures {
        println!(
            "  {} {} {}: {}",
            "!".red().bold(),
            failure.action,
            failure.path.display(),
            failure.cause
        );
    }
}

fn print_ids<F>(marker: &str, ids: &[String], paint: F)
where
    F: Fn(&str) -> String,
{
    for id in ids.iter().take(MAX_LISTED) {
        println!("  {} {}", paint(marker), id);
    }
    if ids.len() > MAX_LISTED {
        println!("  {}", format!("... and {} more", ids.len() - MAX_LISTED).dimmed());
    }
}

pub fn print_prune_report(report: &PruneReport) {
    let verb = if report.dry_run { "Would prune" } else { "Pruned" };
    println!(
        "{} {} {} directories",
        format!("{}:", report.root.display()).white().bold(),
        verb,
        report.pruned_dirs.len().to_string().cyan()
    );
    for dir in report.pruned_dirs.iter().take(MAX_LISTED) {
        println!("  {} {}", "-".red(), dir.display());
    }
    if report.pruned_dirs.len() > MAX_LISTED {
        println!(
            "  {}",
            format!("... and {} more", report.pruned_dirs.len() - MAX_LISTED).dimmed()
        );
    }
    for failure in &report.failures {
        println!("  {} {}: {}", "!".red().bold(), failure.path.display(), failure.cause);
    }
}
