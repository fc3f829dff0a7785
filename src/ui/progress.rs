// Single-line progress bar for the probe stage

use colored::Colorize;
use std::io::{self, Write};

const BAR_WIDTH: usize = 30;

/// Render the bar for `processed` of `total` items
pub fn progress_line(processed: usize, total: usize, prefix: &str) -> String {
    let processed = processed.min(total);
    let (percentage, filled) = if total > 0 {
        (processed * 100 / total, processed * BAR_WIDTH / total)
    } else {
        (0, 0)
    };

    format!(
        "{} [{}{}] {}% ({}/{})",
        prefix.white(),
        "=".repeat(filled).green(),
        " ".repeat(BAR_WIDTH - filled),
        percentage,
        processed,
        total
    )
}

/// Redraw the progress bar in place on stdout
pub fn show_progress_bar(processed: usize, total: usize, prefix: &str) {
    print!("\r{} ", progress_line(processed, total, prefix));
    io::stdout().flush().ok();
}

/// Clear the current line
pub fn clear_line() {
    print!("\r{}\r", " ".repeat(BAR_WIDTH + 40));
    io::stdout().flush().ok();
}
