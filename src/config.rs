//! Configuration loading.
//!
//! All paths, endpoints, and tunables live in one `Config` struct,
//! deserialized from a TOML file named on the command line and passed by
//! reference into each component. There is no process-global state.
//!
//! ```toml
//! [paths]
//! inbound = "/var/payspool/inbound"
//! archive = "/var/payspool/archive"
//! failed = "/var/payspool/failed"
//! logs = "/var/payspool/logs"
//! remote = "/mnt/drop/payloads"        # optional
//!
//! [worker]
//! command = ["python", "run_payload.py", "-i"]
//!
//! [notify]
//! start_url = "https://example.test/hooks/start"          # optional
//! completion_url = "https://example.test/hooks/complete"  # optional
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The config file could not be read.
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    /// The config file is not valid TOML for the expected schema.
    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },

    /// The config parsed but fails a semantic check.
    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Top-level configuration for one engine instance.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub paths: Paths,
    pub worker: WorkerConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub drain: DrainConfig,
    #[serde(default)]
    pub retention: RetentionConfig,
}

impl Config {
    /// Loads and validates configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, does not parse, or
    /// fails validation.
    pub fn load(path: &Path) -> Result<Config> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.worker.command.is_empty() {
            return Err(ConfigError::Invalid(
                "worker.command must name a program".to_string(),
            ));
        }
        if self.drain.max_passes == 0 {
            return Err(ConfigError::Invalid(
                "drain.max_passes must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Queue directory layout.
///
/// The four local directories are created at startup; creation failure is
/// fatal, since nothing downstream can work without them. The remote drop
/// location is optional and merely unreachable-tolerant.
#[derive(Debug, Clone, Deserialize)]
pub struct Paths {
    /// Directory scanned for pending payloads.
    pub inbound: PathBuf,
    /// Terminal location for processed payloads, result records, and
    /// archived duplicates.
    pub archive: PathBuf,
    /// Terminal location for failed payloads.
    pub failed: PathBuf,
    /// Directory for worker log files; also holds the retention stamp.
    pub logs: PathBuf,
    /// Remote drop location new payloads are fetched from, if any.
    #[serde(default)]
    pub remote: Option<PathBuf>,
    /// Override for the retention stamp file location.
    #[serde(default)]
    pub sweep_stamp: Option<PathBuf>,
}

impl Paths {
    /// The local directories that must exist before a tick runs.
    pub fn local_dirs(&self) -> [&Path; 4] {
        [&self.inbound, &self.archive, &self.failed, &self.logs]
    }

    /// The directories covered by the retention sweep.
    pub fn swept_dirs(&self) -> [&Path; 3] {
        [&self.archive, &self.failed, &self.logs]
    }

    /// The retention stamp file path (defaults to `<logs>/retention.stamp`).
    pub fn sweep_stamp(&self) -> PathBuf {
        self.sweep_stamp
            .clone()
            .unwrap_or_else(|| self.logs.join("retention.stamp"))
    }
}

/// External worker invocation.
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Program and leading arguments; the payload's absolute path is
    /// appended as the final argument.
    pub command: Vec<String>,
}

/// Notification endpoints.
///
/// Unset URLs disable the corresponding event. Delivery is always
/// fire-and-forget.
#[derive(Debug, Clone, Deserialize)]
pub struct NotifyConfig {
    /// POST target for the run-start event.
    #[serde(default)]
    pub start_url: Option<String>,
    /// POST target for per-item completion events.
    #[serde(default)]
    pub completion_url: Option<String>,
    /// Request timeout in seconds.
    #[serde(default = "default_notify_timeout_secs")]
    pub timeout_secs: u64,
}

impl NotifyConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for NotifyConfig {
    fn default() -> Self {
        NotifyConfig {
            start_url: None,
            completion_url: None,
            timeout_secs: default_notify_timeout_secs(),
        }
    }
}

fn default_notify_timeout_secs() -> u64 {
    10
}

/// Drain-loop tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct DrainConfig {
    /// Pacing delay between items, in milliseconds.
    #[serde(default = "default_pause_ms")]
    pub pause_ms: u64,
    /// Ceiling on outer drain passes per tick. A producer that keeps
    /// feeding inbound extends the run only up to this many passes; the
    /// remainder waits for the next tick.
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,
}

impl DrainConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }
}

impl Default for DrainConfig {
    fn default() -> Self {
        DrainConfig {
            pause_ms: default_pause_ms(),
            max_passes: default_max_passes(),
        }
    }
}

fn default_pause_ms() -> u64 {
    2000
}

fn default_max_passes() -> u32 {
    64
}

/// Retention sweep tunables.
#[derive(Debug, Clone, Deserialize)]
pub struct RetentionConfig {
    /// Files older than this are purged from the swept directories.
    #[serde(default = "default_max_age_days")]
    pub max_age_days: u64,
    /// Minimum interval between sweeps, gated on the stamp file.
    #[serde(default = "default_min_interval_days")]
    pub min_interval_days: u64,
}

impl Default for RetentionConfig {
    fn default() -> Self {
        RetentionConfig {
            max_age_days: default_max_age_days(),
            min_interval_days: default_min_interval_days(),
        }
    }
}

fn default_max_age_days() -> u64 {
    14
}

fn default_min_interval_days() -> u64 {
    7
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_config(text: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(text.as_bytes()).unwrap();
        file
    }

    const MINIMAL: &str = r#"
[paths]
inbound = "/q/inbound"
archive = "/q/archive"
failed = "/q/failed"
logs = "/q/logs"

[worker]
command = ["python", "run_payload.py", "-i"]
"#;

    #[test]
    fn minimal_config_loads_with_defaults() {
        let file = write_config(MINIMAL);
        let config = Config::load(file.path()).unwrap();

        assert_eq!(config.worker.command.len(), 3);
        assert!(config.paths.remote.is_none());
        assert!(config.notify.start_url.is_none());
        assert_eq!(config.notify.timeout_secs, 10);
        assert_eq!(config.drain.pause_ms, 2000);
        assert_eq!(config.drain.max_passes, 64);
        assert_eq!(config.retention.max_age_days, 14);
        assert_eq!(config.retention.min_interval_days, 7);
    }

    #[test]
    fn stamp_defaults_under_logs() {
        let file = write_config(MINIMAL);
        let config = Config::load(file.path()).unwrap();
        assert_eq!(
            config.paths.sweep_stamp(),
            PathBuf::from("/q/logs/retention.stamp")
        );
    }

    #[test]
    fn empty_worker_command_is_rejected() {
        let text = MINIMAL.replace(
            "command = [\"python\", \"run_payload.py\", \"-i\"]",
            "command = []",
        );
        let file = write_config(&text);
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn zero_max_passes_is_rejected() {
        let text = format!("{MINIMAL}\n[drain]\nmax_passes = 0\n");
        let file = write_config(&text);
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn missing_file_reports_read_error() {
        let err = Config::load(Path::new("/nonexistent/payspool.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn malformed_toml_reports_parse_error() {
        let file = write_config("this is not toml [");
        let err = Config::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }
}
