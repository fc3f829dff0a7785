use crate::core::config::Config;
use crate::core::exclusion::append_to_list;
use crate::core::naming::sanitize_filename;
use crate::ui;
use anyhow::{anyhow, Result};
use clap::ArgMatches;

/// Append titles to the exclusion list
pub fn execute(matches: &ArgMatches, config: &Config) -> Result<()> {
    let path = config
        .exclusion_list
        .as_deref()
        .ok_or_else(|| anyhow!("No exclusion_list configured"))?;

    let titles: Vec<&String> = matches
        .get_many::<String>("titles")
        .map(|values| values.collect())
        .unwrap_or_default();

    for title in titles {
        let safe = sanitize_filename(title.trim());
        if append_to_list(path, title)? {
            ui::success(&format!("Blocked: {}", safe));
        } else {
            ui::dimmed(&format!("Already blocked: {}", safe));
        }
    }
    Ok(())
}
