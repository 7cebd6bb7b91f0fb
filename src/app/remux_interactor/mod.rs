// Remux interactor - Orchestrates the single-stream remux use case

use std::path::Path;

use tracing::{info, warn};

use crate::engine::{RelayEngine, RelayReport, RelayRequest};
use crate::error::{RemuxError, RemuxResult};
use crate::ports::MediaBackend;

/// Interactor for one remux run
pub struct RemuxInteractor<B: MediaBackend> {
    backend: B,
    overwrite: bool,
}

impl<B: MediaBackend> RemuxInteractor<B> {
    /// Create new remux interactor with injected backend
    pub fn new(backend: B, overwrite: bool) -> Self {
        Self { backend, overwrite }
    }

    /// Execute the remux; the backend is consumed by the run
    pub fn execute(self, request: &RelayRequest) -> RemuxResult<RelayReport> {
        self.validate_request(request)?;

        let mut engine = RelayEngine::new(self.backend);
        let report = engine.run(request)?;

        info!(
            "Wrote {} stream #{} to {}",
            report.kind,
            report.source_stream.unwrap_or_default(),
            report.output
        );
        Ok(report)
    }

    fn validate_request(&self, request: &RelayRequest) -> RemuxResult<()> {
        if request.input.is_empty() {
            return Err(RemuxError::invalid("input locator is empty"));
        }
        if request.output.is_empty() {
            return Err(RemuxError::invalid("output locator is empty"));
        }
        if request.input == request.output {
            return Err(RemuxError::invalid(format!(
                "input and output are the same: {}",
                request.input
            )));
        }

        if Path::new(&request.output).exists() {
            if !self.overwrite {
                return Err(RemuxError::invalid(format!(
                    "output already exists: {} (pass --overwrite to replace it)",
                    request.output
                )));
            }
            warn!("Overwriting existing output: {}", request.output);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::memory::{MemoryBackend, MemoryCodecParameters, MemoryPacket, MemorySource};
    use crate::domain::model::{MediaKind, Timebase};
    use tempfile::TempDir;

    fn backend() -> MemoryBackend {
        let tb = Timebase::new(1, 1000).unwrap();
        MemoryBackend::new().with_source(
            "in.mp4",
            MemorySource::new("mov,mp4,m4a,3gp,3g2,mj2")
                .with_stream(MediaKind::Audio, tb, MemoryCodecParameters::new("aac", 0, vec![]))
                .with_packet(MemoryPacket::new(0, 0, vec![1, 2, 3])),
        )
    }

    #[test]
    fn test_execute_relays() {
        let journal = backend();
        let report = RemuxInteractor::new(journal.clone(), false)
            .execute(&RelayRequest::new("in.mp4", "out.mka", MediaKind::Audio))
            .unwrap();

        assert_eq!(report.packets_relayed, 1);
        assert_eq!(journal.written_packets().len(), 1);
    }

    #[test]
    fn test_refuses_existing_output() {
        let dir = TempDir::new().unwrap();
        let existing = dir.path().join("out.mka");
        std::fs::write(&existing, b"old").unwrap();
        let output = existing.to_string_lossy().to_string();

        let journal = backend();
        let result = RemuxInteractor::new(journal.clone(), false)
            .execute(&RelayRequest::new("in.mp4", output.clone(), MediaKind::Audio));

        assert!(matches!(result, Err(RemuxError::InvalidArgument { .. })));
        assert!(journal.events().is_empty());

        let report = RemuxInteractor::new(backend(), true)
            .execute(&RelayRequest::new("in.mp4", output, MediaKind::Audio))
            .unwrap();
        assert_eq!(report.packets_relayed, 1);
    }

    #[test]
    fn test_rejects_same_locator() {
        let result = RemuxInteractor::new(backend(), true)
            .execute(&RelayRequest::new("in.mp4", "in.mp4", MediaKind::Audio));
        assert!(matches!(result, Err(RemuxError::InvalidArgument { .. })));
    }
}
