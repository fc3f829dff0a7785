//! Export of the live-stream pairs as a playlist of their own
//!
//! Pairs whose URL is not a video file never become catalog entries. They
//! are written unchanged, in manifest order, to a separate M3U file. The
//! file is only replaced when its content changes, so players watching it
//! are not reloaded on every run.

use crate::core::manifest::StreamPair;
use crate::error::Result;
use std::fs;
use std::path::Path;

const PLAYLIST_HEADER: &str = "#EXTM3U";

/// Render the pairs as M3U text with a header line
pub fn render_playlist(streams: &[StreamPair]) -> String {
    let mut content = String::with_capacity(PLAYLIST_HEADER.len() + 1 + streams.len() * 96);
    content.push_str(PLAYLIST_HEADER);
    content.push('\n');
    for stream in streams {
        content.push_str(&stream.metadata_line);
        content.push('\n');
        content.push_str(&stream.url);
        content.push('\n');
    }
    content
}

/// Write the streams playlist if it differs from the file on disk
///
/// Returns whether the file was (or, in dry-run, would be) written.
pub fn export_streams(path: &Path, streams: &[StreamPair], dry_run: bool) -> Result<bool> {
    let content = render_playlist(streams);

    if let Ok(existing) = fs::read(path) {
        if String::from_utf8_lossy(&existing) == content {
            log::info!("Streams playlist {} is unchanged", path.display());
            return Ok(false);
        }
    }

    if dry_run {
        log::info!(
            "[dry-run] Would write {} streams to {}",
            streams.len(),
            path.display()
        );
        return Ok(true);
    }

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content)?;
    log::info!("Wrote {} streams to {}", streams.len(), path.display());
    Ok(true)
}
