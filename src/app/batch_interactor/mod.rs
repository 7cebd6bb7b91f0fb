// Batch interactor - Runs independent remux jobs concurrently

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::app::remux_interactor::RemuxInteractor;
use crate::domain::model::MediaKind;
use crate::engine::{RelayReport, RelayRequest};
use crate::error::{RemuxError, RemuxResult};
use crate::ports::MediaBackend;

/// One `[[job]]` entry of a jobs file
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BatchJob {
    pub input: String,
    pub output: String,
    #[serde(default)]
    pub kind: Option<MediaKind>,
    #[serde(default)]
    pub format: Option<String>,
}

/// Contents of a jobs file
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BatchJobs {
    #[serde(default, rename = "job")]
    pub jobs: Vec<BatchJob>,
}

impl BatchJobs {
    pub fn from_file(path: &Path) -> RemuxResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| RemuxError::Config {
            message: format!("Failed to read jobs file {}: {}", path.display(), e),
        })?;
        Self::from_toml_str(&content)
    }

    pub fn from_toml_str(content: &str) -> RemuxResult<Self> {
        toml::from_str(content).map_err(|e| RemuxError::Config {
            message: format!("Failed to parse jobs file: {}", e),
        })
    }

    /// Relay requests in file order; jobs without a kind use `default_kind`
    pub fn requests(&self, default_kind: MediaKind) -> Vec<RelayRequest> {
        self.jobs
            .iter()
            .map(|job| RelayRequest {
                input: job.input.clone(),
                output: job.output.clone(),
                kind: job.kind.unwrap_or(default_kind),
                format: job.format.clone(),
            })
            .collect()
    }
}

/// Result of one batch job
#[derive(Debug, Serialize)]
pub struct JobOutcome {
    /// Position of the job in the batch
    pub job: usize,
    pub input: String,
    pub output: String,
    pub result: Result<RelayReport, String>,
}

impl JobOutcome {
    pub fn is_success(&self) -> bool {
        self.result.is_ok()
    }
}

/// Interactor for concurrent remux batches
pub struct BatchInteractor {
    parallel: usize,
    overwrite: bool,
}

impl BatchInteractor {
    /// At most `parallel` jobs run at once (minimum one)
    pub fn new(parallel: usize, overwrite: bool) -> Self {
        Self {
            parallel: parallel.max(1),
            overwrite,
        }
    }

    /// Run every job on a blocking worker with its own backend from `backend_factory`.
    ///
    /// Outcomes come back in job order. A job that fails, panics or is
    /// cancelled only affects its own outcome.
    pub async fn run<B, F>(&self, jobs: Vec<RelayRequest>, backend_factory: F) -> Vec<JobOutcome>
    where
        B: MediaBackend + 'static,
        F: Fn() -> RemuxResult<B> + Send + Sync + 'static,
    {
        info!(
            "Starting batch of {} jobs ({} at a time)",
            jobs.len(),
            self.parallel
        );

        let semaphore = Arc::new(Semaphore::new(self.parallel));
        let factory = Arc::new(backend_factory);
        let overwrite = self.overwrite;

        let mut handles = Vec::with_capacity(jobs.len());
        for (job, request) in jobs.into_iter().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let factory = Arc::clone(&factory);
            let task_request = request.clone();

            let handle = tokio::spawn(async move {
                let _permit = semaphore
                    .acquire_owned()
                    .await
                    .map_err(|e| RemuxError::Job {
                        job,
                        message: e.to_string(),
                    })?;

                let report = tokio::task::spawn_blocking(move || {
                    let backend = factory()?;
                    RemuxInteractor::new(backend, overwrite).execute(&task_request)
                })
                .await
                .map_err(|e| RemuxError::Job {
                    job,
                    message: e.to_string(),
                })??;
                Ok::<RelayReport, RemuxError>(report)
            });
            handles.push((job, request, handle));
        }

        let mut outcomes = Vec::with_capacity(handles.len());
        for (job, request, handle) in handles {
            let result = match handle.await {
                Ok(result) => result,
                Err(e) => Err(RemuxError::Job {
                    job,
                    message: e.to_string(),
                }),
            };
            if let Err(e) = &result {
                warn!(job, "Job {} -> {} failed: {}", request.input, request.output, e);
            }

            outcomes.push(JobOutcome {
                job,
                input: request.input,
                output: request.output,
                result: result.map_err(|e| e.to_string()),
            });
        }

        let failed = outcomes.iter().filter(|o| !o.is_success()).count();
        info!(
            "Batch finished: {} succeeded, {} failed",
            outcomes.len() - failed,
            failed
        );
        outcomes
    }
}
