//! CLI module for the remuxer
//!
//! This module handles command-line argument parsing and command execution.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::adapters::toml_config::RemuxerConfig;
use crate::adapters::tracing_log::{LogFormat, LogLevel};
use crate::error::RemuxResult;

pub mod args;
pub mod commands;

pub use args::{BatchArgs, InspectArgs, RemuxArgs, TimestampsArgs};

/// Lossless single-stream remuxer
///
/// Copies one audio, video or subtitle stream from a source container into a
/// new container without decoding, rescaling timestamps on the way.
#[derive(Parser, Debug)]
#[command(name = "remuxer")]
#[command(about = "Copy one stream from a media container into another, losslessly")]
#[command(version)]
#[command(long_about = None)]
pub struct Cli {
    /// Logging level (trace, debug, info, warn, error)
    #[arg(long, global = true)]
    pub log_level: Option<LogLevel>,

    /// Log line format (pretty, compact, json)
    #[arg(long, global = true)]
    pub log_format: Option<LogFormat>,

    /// Configuration file (default: ./remuxer.toml when present)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// The command to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Resolve configuration: CLI flags over environment over file over defaults
    pub fn load_config(&self) -> RemuxResult<RemuxerConfig> {
        let mut config = RemuxerConfig::load(self.config.as_deref())?;
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        Ok(config)
    }
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Copy the best stream of one kind into a new container
    Remux(RemuxArgs),
    /// Show container format, streams and per-kind selection
    Inspect(InspectArgs),
    /// List packet timestamps of the best stream of one kind
    Timestamps(TimestampsArgs),
    /// Run remux jobs from a TOML jobs file concurrently
    Batch(BatchArgs),
}
