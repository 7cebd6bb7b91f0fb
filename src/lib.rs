//! Remuxer Library
//!
//! Copies one elementary stream (audio, video or subtitle) from a source media
//! container into a new destination container without decoding, rescaling
//! packet timestamps between the two time bases.
//!
//! The relay engine is generic over a [`ports::MediaBackend`]; the FFmpeg
//! implementation lives in [`adapters::libav`] and an in-memory one in
//! [`adapters::memory`].

use std::sync::OnceLock;

pub mod adapters;
pub mod app;
pub mod cli;
pub mod domain;
pub mod engine;
pub mod error;
pub mod ports;

// Re-export commonly used types
pub use domain::model::{MediaKind, StreamDescriptor, Timebase};
pub use engine::{RelayEngine, RelayReport, RelayRequest, RelayState};
pub use error::{ErrorKind, RemuxError, RemuxResult};

static FFMPEG_INIT: OnceLock<Result<(), String>> = OnceLock::new();

/// Initialize the FFmpeg libraries; later calls return the first outcome
pub fn init() -> RemuxResult<()> {
    FFMPEG_INIT
        .get_or_init(|| ffmpeg_next::init().map_err(|e| e.to_string()))
        .clone()
        .map_err(|message| RemuxError::Init { message })
}
