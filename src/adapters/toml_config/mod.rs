// TOML config adapter - Configuration management using TOML files

use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::adapters::tracing_log::{LibavLogLevel, LogFormat, LogLevel, LoggingSettings};
use crate::domain::model::MediaKind;
use crate::error::{RemuxError, RemuxResult};

/// Upper bound for `max_parallel_jobs`
pub const MAX_PARALLEL_JOBS_LIMIT: usize = 256;

/// Remuxer settings, read from the `[remuxer]` table of a TOML file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RemuxerConfig {
    pub log_level: LogLevel,
    pub log_format: LogFormat,
    pub libav_log_level: LibavLogLevel,
    pub default_kind: MediaKind,
    pub overwrite: bool,
    /// 0 means one job per CPU
    pub max_parallel_jobs: usize,
}

impl Default for RemuxerConfig {
    fn default() -> Self {
        Self {
            log_level: LogLevel::Info,
            log_format: LogFormat::Pretty,
            libav_log_level: LibavLogLevel::Error,
            default_kind: MediaKind::Audio,
            overwrite: false,
            max_parallel_jobs: 0,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
struct ConfigFile {
    #[serde(default)]
    remuxer: RemuxerConfig,
}

impl RemuxerConfig {
    /// Looked up in the working directory when no path is given
    pub const DEFAULT_FILE: &'static str = "remuxer.toml";

    pub const ENV_LOG_LEVEL: &'static str = "REMUXER_LOG_LEVEL";
    pub const ENV_LOG_FORMAT: &'static str = "REMUXER_LOG_FORMAT";
    pub const ENV_LIBAV_LOG_LEVEL: &'static str = "REMUXER_LIBAV_LOG_LEVEL";
    pub const ENV_DEFAULT_KIND: &'static str = "REMUXER_DEFAULT_KIND";
    pub const ENV_OVERWRITE: &'static str = "REMUXER_OVERWRITE";
    pub const ENV_MAX_PARALLEL_JOBS: &'static str = "REMUXER_MAX_PARALLEL_JOBS";

    /// Resolve file and environment layers over the defaults.
    ///
    /// An explicit path must exist; the default file is optional.
    pub fn load(explicit: Option<&Path>) -> RemuxResult<Self> {
        let mut config = match Self::config_path(explicit) {
            Some(path) => {
                info!("Loading configuration from: {}", path.display());
                Self::from_file(&path)?
            }
            None => {
                debug!("No configuration file, using defaults");
                Self::default()
            }
        };

        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn config_path(explicit: Option<&Path>) -> Option<PathBuf> {
        match explicit {
            Some(path) => Some(path.to_path_buf()),
            None => {
                let default = PathBuf::from(Self::DEFAULT_FILE);
                default.is_file().then_some(default)
            }
        }
    }

    pub fn from_file(path: &Path) -> RemuxResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RemuxError::Config {
            message: format!("Failed to read config file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> RemuxResult<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|e| RemuxError::Config {
            message: format!("Failed to parse TOML config: {}", e),
        })?;
        Ok(file.remuxer)
    }

    /// Apply `REMUXER_*` environment overrides
    pub fn apply_env(&mut self) -> RemuxResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup; keys are the `ENV_*` names
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> RemuxResult<()> {
        let mut overrides = 0;

        if let Some(value) = lookup(Self::ENV_LOG_LEVEL) {
            self.log_level = parse_override(Self::ENV_LOG_LEVEL, &value)?;
            overrides += 1;
        }
        if let Some(value) = lookup(Self::ENV_LOG_FORMAT) {
            self.log_format = parse_override(Self::ENV_LOG_FORMAT, &value)?;
            overrides += 1;
        }
        if let Some(value) = lookup(Self::ENV_LIBAV_LOG_LEVEL) {
            self.libav_log_level = parse_override(Self::ENV_LIBAV_LOG_LEVEL, &value)?;
            overrides += 1;
        }
        if let Some(value) = lookup(Self::ENV_DEFAULT_KIND) {
            self.default_kind = MediaKind::parse(&value).map_err(|e| RemuxError::Config {
                message: format!("{}: {}", Self::ENV_DEFAULT_KIND, e),
            })?;
            overrides += 1;
        }
        if let Some(value) = lookup(Self::ENV_OVERWRITE) {
            self.overwrite = parse_bool(Self::ENV_OVERWRITE, &value)?;
            overrides += 1;
        }
        if let Some(value) = lookup(Self::ENV_MAX_PARALLEL_JOBS) {
            self.max_parallel_jobs = parse_override(Self::ENV_MAX_PARALLEL_JOBS, &value)?;
            overrides += 1;
        }

        if overrides > 0 {
            debug!("Applied {} environment overrides", overrides);
        }
        Ok(())
    }

    pub fn validate(&self) -> RemuxResult<()> {
        if self.max_parallel_jobs > MAX_PARALLEL_JOBS_LIMIT {
            return Err(RemuxError::Config {
                message: format!(
                    "max_parallel_jobs cannot exceed {} (got {})",
                    MAX_PARALLEL_JOBS_LIMIT, self.max_parallel_jobs
                ),
            });
        }
        Ok(())
    }

    pub fn logging(&self) -> LoggingSettings {
        LoggingSettings {
            level: self.log_level,
            format: self.log_format,
            libav_level: self.libav_log_level,
        }
    }

    /// Effective batch concurrency
    pub fn parallel_jobs(&self) -> usize {
        match self.max_parallel_jobs {
            0 => num_cpus::get().max(1),
            n => n,
        }
    }
}

fn parse_override<T>(key: &str, value: &str) -> RemuxResult<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e| RemuxError::Config {
        message: format!("{}: {}", key, e),
    })
}

fn parse_bool(key: &str, value: &str) -> RemuxResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => Err(RemuxError::Config {
            message: format!("{}: invalid boolean value {}", key, value),
        }),
    }
}
