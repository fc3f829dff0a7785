// Console and per-run log file setup

use anyhow::{Context, Result};
use chrono::Local;
use env_logger::{Builder, Env, Target};
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Suffix shared by every per-run log file
pub const LOG_FILE_SUFFIX: &str = "_strmsync.log";

/// Number of log files kept in the log directory, the current one included
pub const KEEP_LOG_FILES: usize = 10;

/// Writes every log line to stderr and to the run's log file
struct TeeWriter {
    file: File,
}

impl Write for TeeWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        io::stderr().write_all(buf)?;
        self.file.write_all(buf)?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        io::stderr().flush()?;
        self.file.flush()
    }
}

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbose: bool) -> &'static str {
    if verbose {
        "info,strmsync=debug"
    } else {
        "info"
    }
}

/// Initialize logging for the process
///
/// `RUST_LOG` takes precedence; otherwise the level is `info`, with debug
/// output from this crate when `verbose` is set. With a `log_dir` each run
/// also writes a timestamped log file there. Returns the path of that file.
pub fn init(verbose: bool, log_dir: Option<&Path>) -> Result<Option<PathBuf>> {
    let mut builder = Builder::from_env(Env::default().default_filter_or(default_filter(verbose)));
    builder.format(|buf, record| {
        writeln!(
            buf,
            "[{}] {}: {}",
            Local::now().format("%Y-%m-%d %H:%M:%S"),
            record.level(),
            record.args()
        )
    });

    let log_file = match log_dir {
        Some(dir) => {
            let path = open_log_file(dir)?;
            let file = File::create(&path)
                .with_context(|| format!("Failed to create log file: {}", path.display()))?;
            builder.target(Target::Pipe(Box::new(TeeWriter { file })));
            Some(path)
        }
        None => None,
    };

    // A logger may already be installed, e.g. by the test harness
    if builder.try_init().is_err() {
        log::debug!("Logger already initialized");
    }

    Ok(log_file)
}

/// Prepare the log directory and return the path for this run's file
fn open_log_file(dir: &Path) -> Result<PathBuf> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;

    rotate_logs(dir, KEEP_LOG_FILES.saturating_sub(1))?;

    let name = format!("{}{}", Local::now().format("%Y-%m-%d_%H-%M-%S"), LOG_FILE_SUFFIX);
    Ok(dir.join(name))
}

/// Delete all but the `keep` newest log files in `dir`
///
/// File names start with a sortable timestamp, so name order is age order.
pub fn rotate_logs(dir: &Path, keep: usize) -> Result<usize> {
    let mut logs: Vec<PathBuf> = fs::read_dir(dir)
        .with_context(|| format!("Failed to read log directory: {}", dir.display()))?
        .flatten()
        .map(|entry| entry.path())
        .filter(|path| {
            path.is_file()
                && path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .map(|n| n.ends_with(LOG_FILE_SUFFIX))
                    .unwrap_or(false)
        })
        .collect();

    if logs.len() <= keep {
        return Ok(0);
    }

    logs.sort();
    let excess = logs.len() - keep;
    let mut removed = 0;
    for old in logs.into_iter().take(excess) {
        match fs::remove_file(&old) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!("Could not remove old log file {}: {}", old.display(), e),
        }
    }
    Ok(removed)
}
