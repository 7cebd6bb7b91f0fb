//! Remuxer CLI
//!
//! Copies one stream of a media container into a new container without
//! re-encoding.
//!
//! # Usage
//!
//! ```bash
//! remuxer remux -i input.mp4 -o audio.mka --kind audio
//! remuxer inspect -i input.mp4
//! remuxer timestamps -i input.mp4 --kind video --limit 20
//! remuxer batch --jobs jobs.toml --parallel 4
//! ```

use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info};

use remuxer_cli::adapters::tracing_log::init_logging;
use remuxer_cli::cli::{commands, Cli};
use remuxer_cli::error::{ErrorKind, RemuxError};

/// Main entry point for the remuxer CLI
fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match cli.load_config() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::from(ErrorKind::Usage.exit_code());
        }
    };

    init_logging(&config.logging());
    info!("Starting remuxer");
    debug!(?config, "Effective configuration");

    match commands::dispatch(cli.command, &config) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code(&e))
        }
    }
}

/// Exit code of the first remux error in the chain; anything else is a usage error
fn exit_code(error: &anyhow::Error) -> u8 {
    error
        .chain()
        .find_map(|cause| cause.downcast_ref::<RemuxError>())
        .map_or(ErrorKind::Usage, RemuxError::kind)
        .exit_code()
}
