//! Command-line argument definitions

use std::path::PathBuf;

use clap::Args;

/// Arguments for the remux command
#[derive(Args, Debug)]
pub struct RemuxArgs {
    /// Input media file path or URL
    #[arg(short, long)]
    pub input: String,

    /// Output file path; its extension picks the container
    #[arg(short, long)]
    pub output: String,

    /// Stream kind to copy: audio, video, subtitle (default from config)
    #[arg(short, long)]
    pub kind: Option<String>,

    /// Output container format name, overriding the extension
    #[arg(short, long)]
    pub format: Option<String>,

    /// Replace the output file if it exists
    #[arg(short = 'y', long)]
    pub overwrite: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the inspect command
#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Input media file path or URL
    #[arg(short, long)]
    pub input: String,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the timestamps command
#[derive(Args, Debug)]
pub struct TimestampsArgs {
    /// Input media file path or URL
    #[arg(short, long)]
    pub input: String,

    /// Stream kind to list (default from config)
    #[arg(short, long)]
    pub kind: Option<String>,

    /// Stop after this many packets
    #[arg(long)]
    pub limit: Option<usize>,

    /// Output in JSON format
    #[arg(long)]
    pub json: bool,
}

/// Arguments for the batch command
#[derive(Args, Debug)]
pub struct BatchArgs {
    /// TOML file with [[job]] entries
    #[arg(short, long)]
    pub jobs: PathBuf,

    /// Jobs to run at once (default from config)
    #[arg(short, long)]
    pub parallel: Option<usize>,

    /// Replace existing output files
    #[arg(short = 'y', long)]
    pub overwrite: bool,

    /// Print outcomes as JSON
    #[arg(long)]
    pub json: bool,
}
