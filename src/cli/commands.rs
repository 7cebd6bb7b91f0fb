//! Command implementations

use std::process::ExitCode;

use anyhow::{Context, Result};
use tracing::info;

use crate::adapters::libav::LibavBackend;
use crate::adapters::toml_config::RemuxerConfig;
use crate::app::{BatchInteractor, BatchJobs, InspectInteractor, JobOutcome, RemuxInteractor};
use crate::cli::args::{BatchArgs, InspectArgs, RemuxArgs, TimestampsArgs};
use crate::cli::Commands;
use crate::domain::model::MediaKind;
use crate::engine::{RelayReport, RelayRequest};
use crate::error::ErrorKind;

/// Run the selected command; failures come back as errors, batch job failures as an exit code
pub fn dispatch(command: Commands, config: &RemuxerConfig) -> Result<ExitCode> {
    match command {
        Commands::Remux(args) => remux(args, config).map(|()| ExitCode::SUCCESS),
        Commands::Inspect(args) => inspect(args).map(|()| ExitCode::SUCCESS),
        Commands::Timestamps(args) => timestamps(args, config).map(|()| ExitCode::SUCCESS),
        Commands::Batch(args) => batch(args, config),
    }
}

/// Execute the remux command
pub fn remux(args: RemuxArgs, config: &RemuxerConfig) -> Result<()> {
    let kind = resolve_kind(args.kind.as_deref(), config)?;
    info!("Input: {}", args.input);
    info!("Output: {}", args.output);

    let mut request = RelayRequest::new(args.input, args.output, kind);
    if let Some(format) = args.format {
        request = request.with_format(format);
    }

    let backend = LibavBackend::new()?;
    let report = RemuxInteractor::new(backend, args.overwrite || config.overwrite)
        .execute(&request)
        .with_context(|| format!("Remux of {} failed", request.input))?;

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .context("Failed to serialize remux report to JSON")?;
        println!("{}", json);
    } else {
        println!("{}", summary_line(&report));
    }
    Ok(())
}

/// Execute the inspect command
pub fn inspect(args: InspectArgs) -> Result<()> {
    let interactor = InspectInteractor::new(LibavBackend::new()?);
    let report = interactor
        .inspect(&args.input)
        .with_context(|| format!("Failed to inspect {}", args.input))?;

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .context("Failed to serialize inspection to JSON")?;
        println!("{}", json);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

/// Execute the timestamps command
pub fn timestamps(args: TimestampsArgs, config: &RemuxerConfig) -> Result<()> {
    let kind = resolve_kind(args.kind.as_deref(), config)?;
    let interactor = InspectInteractor::new(LibavBackend::new()?);
    let report = interactor
        .timestamps(&args.input, kind, args.limit)
        .with_context(|| format!("Failed to list timestamps of {}", args.input))?;

    if args.json {
        let json = serde_json::to_string_pretty(&report)
            .context("Failed to serialize timestamps to JSON")?;
        println!("{}", json);
    } else {
        print!("{}", report.render_text());
    }
    Ok(())
}

/// Execute the batch command
pub fn batch(args: BatchArgs, config: &RemuxerConfig) -> Result<ExitCode> {
    let jobs = BatchJobs::from_file(&args.jobs)?;
    let requests = jobs.requests(config.default_kind);
    let parallel = args.parallel.unwrap_or_else(|| config.parallel_jobs());
    info!("Loaded {} jobs from {}", requests.len(), args.jobs.display());

    // fail fast on a broken FFmpeg install instead of once per job
    LibavBackend::new()?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;
    let interactor = BatchInteractor::new(parallel, args.overwrite || config.overwrite);
    let outcomes = runtime.block_on(interactor.run(requests, LibavBackend::new));

    if args.json {
        let json = serde_json::to_string_pretty(&outcomes)
            .context("Failed to serialize batch outcomes to JSON")?;
        println!("{}", json);
    } else {
        for outcome in &outcomes {
            println!("{}", outcome_line(outcome));
        }
    }

    let failed = outcomes.iter().filter(|o| !o.is_success()).count();
    if failed > 0 {
        eprintln!("{} of {} jobs failed", failed, outcomes.len());
        return Ok(ExitCode::from(ErrorKind::Job.exit_code()));
    }
    Ok(ExitCode::SUCCESS)
}

fn resolve_kind(kind: Option<&str>, config: &RemuxerConfig) -> Result<MediaKind> {
    match kind {
        Some(kind) => Ok(MediaKind::parse(kind)?),
        None => Ok(config.default_kind),
    }
}

fn summary_line(report: &RelayReport) -> String {
    format!(
        "{} stream #{} -> {}: {} packets, {} bytes in {:.2}s",
        report.kind,
        report
            .source_stream
            .map_or_else(|| "?".to_string(), |index| index.to_string()),
        report.output,
        report.packets_relayed,
        report.bytes_relayed,
        report.elapsed.as_secs_f64()
    )
}

fn outcome_line(outcome: &JobOutcome) -> String {
    match &outcome.result {
        Ok(report) => format!("[{}] ok    {}", outcome.job, summary_line(report)),
        Err(message) => format!(
            "[{}] error {} -> {}: {}",
            outcome.job, outcome.input, outcome.output, message
        ),
    }
}
