// Tracing log adapter - Structured logging using tracing crate

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

/// Verbosity of the remuxer's own log output
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl LogLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogLevel::Trace => "trace",
            LogLevel::Debug => "debug",
            LogLevel::Info => "info",
            LogLevel::Warn => "warn",
            LogLevel::Error => "error",
        }
    }
}

impl FromStr for LogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "trace" => Ok(LogLevel::Trace),
            "debug" => Ok(LogLevel::Debug),
            "info" => Ok(LogLevel::Info),
            "warn" | "warning" => Ok(LogLevel::Warn),
            "error" => Ok(LogLevel::Error),
            _ => Err(format!(
                "Invalid log level: {}. Must be one of: trace, debug, info, warn, error",
                s
            )),
        }
    }
}

impl fmt::Display for LogLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Shape of each log line on stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "compact" => Ok(LogFormat::Compact),
            "json" => Ok(LogFormat::Json),
            _ => Err(format!(
                "Invalid log format: {}. Must be one of: pretty, compact, json",
                s
            )),
        }
    }
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LogFormat::Pretty => "pretty",
            LogFormat::Compact => "compact",
            LogFormat::Json => "json",
        })
    }
}

/// Threshold for FFmpeg's own console messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LibavLogLevel {
    Quiet,
    Panic,
    Fatal,
    Error,
    Warning,
    Info,
    Verbose,
    Debug,
    Trace,
}

impl LibavLogLevel {
    pub fn to_ffmpeg(self) -> ffmpeg_next::util::log::Level {
        use ffmpeg_next::util::log::Level;
        match self {
            LibavLogLevel::Quiet => Level::Quiet,
            LibavLogLevel::Panic => Level::Panic,
            LibavLogLevel::Fatal => Level::Fatal,
            LibavLogLevel::Error => Level::Error,
            LibavLogLevel::Warning => Level::Warning,
            LibavLogLevel::Info => Level::Info,
            LibavLogLevel::Verbose => Level::Verbose,
            LibavLogLevel::Debug => Level::Debug,
            LibavLogLevel::Trace => Level::Trace,
        }
    }
}

impl FromStr for LibavLogLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "quiet" => Ok(LibavLogLevel::Quiet),
            "panic" => Ok(LibavLogLevel::Panic),
            "fatal" => Ok(LibavLogLevel::Fatal),
            "error" => Ok(LibavLogLevel::Error),
            "warning" | "warn" => Ok(LibavLogLevel::Warning),
            "info" => Ok(LibavLogLevel::Info),
            "verbose" => Ok(LibavLogLevel::Verbose),
            "debug" => Ok(LibavLogLevel::Debug),
            "trace" => Ok(LibavLogLevel::Trace),
            _ => Err(format!("Invalid FFmpeg log level: {}", s)),
        }
    }
}

/// Everything `init_logging` needs to know
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoggingSettings {
    pub level: LogLevel,
    pub format: LogFormat,
    pub libav_level: LibavLogLevel,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: LogLevel::Info,
            format: LogFormat::Pretty,
            libav_level: LibavLogLevel::Error,
        }
    }
}

impl LoggingSettings {
    /// Filter directives: `RUST_LOG` wins over the configured level when set
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
    }
}

/// Install the global subscriber on stderr and set FFmpeg's log threshold.
///
/// Returns `false` when a subscriber was already installed; the earlier one
/// stays in effect.
pub fn init_logging(settings: &LoggingSettings) -> bool {
    ffmpeg_next::util::log::set_level(settings.libav_level.to_ffmpeg());

    let builder = tracing_subscriber::fmt()
        .with_env_filter(settings.env_filter())
        .with_writer(std::io::stderr)
        .with_target(false);

    let installed = match settings.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
        LogFormat::Json => builder.json().flatten_event(true).try_init(),
    };
    installed.is_ok()
}
