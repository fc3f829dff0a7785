use crate::error::{Result, StrmError};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::time::Duration;

/// Environment variable pointing at an alternative config file
pub const CONFIG_ENV: &str = "STRMSYNC_CONFIG";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Base directory that relative paths are resolved against
    #[serde(default)]
    pub main_path: Option<PathBuf>,
    /// Already-downloaded playlist manifest
    pub manifest: PathBuf,
    pub movies_root: PathBuf,
    pub series_root: PathBuf,
    #[serde(default)]
    pub exclusion_list: Option<PathBuf>,
    #[serde(default)]
    pub offline_report: Option<PathBuf>,
    #[serde(default)]
    pub summary_report: Option<PathBuf>,
    /// Export of the live-stream pairs that are not part of the catalog
    #[serde(default)]
    pub streams_playlist: Option<PathBuf>,
    #[serde(default)]
    pub log_dir: Option<PathBuf>,
    #[serde(default)]
    pub catalog: CatalogRules,
    #[serde(default)]
    pub probe: ProbeSettings,
}

/// Markers used to classify manifest entries
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CatalogRules {
    pub info_prefix: String,
    pub language_markers: Vec<String>,
    pub video_extensions: Vec<String>,
    pub movie_marker: String,
    pub series_marker: String,
    pub cam_marker: String,
}

impl Default for CatalogRules {
    fn default() -> Self {
        Self {
            info_prefix: "#EXTINF:-1,".to_string(),
            language_markers: vec!["(DE)".to_string(), "[DE]".to_string()],
            video_extensions: [".mp4", ".mkv", ".avi", ".ts", ".mpg"]
                .iter()
                .map(|ext| ext.to_string())
                .collect(),
            movie_marker: "/movie/".to_string(),
            series_marker: "/series/".to_string(),
            cam_marker: "(CAM)".to_string(),
        }
    }
}

/// Liveness probing limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeSettings {
    pub concurrency: usize,
    pub head_timeout_ms: u64,
    pub get_timeout_ms: u64,
    pub retries: u32,
    pub backoff_ms: u64,
    pub user_agent: String,
    pub retry_statuses: Vec<u16>,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            concurrency: 32,
            head_timeout_ms: 3_000,
            get_timeout_ms: 5_000,
            retries: 2,
            backoff_ms: 300,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0 Safari/537.36".to_string(),
            retry_statuses: vec![429, 500, 502, 503, 504],
        }
    }
}

impl ProbeSettings {
    pub fn head_timeout(&self) -> Duration {
        Duration::from_millis(self.head_timeout_ms)
    }

    pub fn get_timeout(&self) -> Duration {
        Duration::from_millis(self.get_timeout_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

impl Config {
    /// Load configuration from an explicit path, `$STRMSYNC_CONFIG`, or the
    /// per-user config directory, in that order.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.to_path_buf(),
            None => match std::env::var_os(CONFIG_ENV) {
                Some(p) => PathBuf::from(p),
                None => Self::get_config_path()?,
            },
        };

        log::debug!("Loading config from {:?}", config_path);

        let data = fs::read_to_string(&config_path).map_err(|e| {
            StrmError::config(format!(
                "Failed to read config file {}: {}",
                config_path.display(),
                e
            ))
        })?;

        Self::from_toml(&data)
    }

    /// Parse, resolve against `main_path`, and validate
    pub fn from_toml(data: &str) -> Result<Self> {
        let mut config: Config = toml::from_str(data)
            .map_err(|e| StrmError::config(format!("Invalid config: {}", e)))?;
        config.resolve_paths();
        config.validate()?;
        Ok(config)
    }

    fn get_config_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| StrmError::config("Could not determine config directory"))?;

        Ok(config_dir.join("strmsync").join("config.toml"))
    }

    /// Join every relative path onto `main_path` when one is set
    pub fn resolve_paths(&mut self) {
        let Some(base) = self.main_path.clone() else {
            return;
        };

        let join = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };

        join(&mut self.manifest);
        join(&mut self.movies_root);
        join(&mut self.series_root);
        for p in [
            &mut self.exclusion_list,
            &mut self.offline_report,
            &mut self.summary_report,
            &mut self.streams_playlist,
            &mut self.log_dir,
        ]
        .into_iter()
        .flatten()
        {
            join(p);
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.probe.concurrency == 0 {
            return Err(StrmError::config("probe.concurrency must be at least 1"));
        }
        if self.probe.head_timeout_ms == 0 || self.probe.get_timeout_ms == 0 {
            return Err(StrmError::config("probe timeouts must be non-zero"));
        }
        let movies = normalize(&self.movies_root);
        let series = normalize(&self.series_root);
        if movies == series {
            return Err(StrmError::config(
                "movies_root and series_root must be different directories",
            ));
        }
        // Each reconciler deletes every artifact below its root that it does not own
        if movies.starts_with(&series) || series.starts_with(&movies) {
            return Err(StrmError::config(format!(
                "movies_root {} and series_root {} must not contain each other",
                self.movies_root.display(),
                self.series_root.display()
            )));
        }
        if self.catalog.info_prefix.is_empty() {
            return Err(StrmError::config("catalog.info_prefix must not be empty"));
        }
        Ok(())
    }
}

/// Absolute form of a path with `.` and `..` resolved lexically
fn normalize(path: &Path) -> PathBuf {
    let absolute = if path.is_relative() {
        std::env::current_dir()
            .map(|cwd| cwd.join(path))
            .unwrap_or_else(|_| path.to_path_buf())
    } else {
        path.to_path_buf()
    };

    let mut normalized = PathBuf::new();
    for component in absolute.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                normalized.pop();
            }
            other => normalized.push(other.as_os_str()),
        }
    }
    normalized
}
