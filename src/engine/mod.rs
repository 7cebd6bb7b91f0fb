//! Core relay engine module

use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::domain::model::{MediaKind, Timebase};

pub mod relay;

pub use relay::RelayEngine;

/// One remux run: which stream kind to move from `input` to `output`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelayRequest {
    /// Source locator (file path or URL understood by the backend)
    pub input: String,
    /// Destination locator; its extension picks the container format
    pub output: String,
    /// Media kind of the stream to relay
    pub kind: MediaKind,
    /// Explicit container format name, overriding extension inference
    #[serde(default)]
    pub format: Option<String>,
}

impl RelayRequest {
    pub fn new(input: impl Into<String>, output: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            input: input.into(),
            output: output.into(),
            kind,
            format: None,
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format = Some(format.into());
        self
    }
}

/// Relay engine lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RelayState {
    Init,
    Opened,
    Probed,
    StreamSelected,
    OutputDeclared,
    HeaderWritten,
    Relaying,
    TrailerWritten,
    Closed,
    Failed,
}

impl fmt::Display for RelayState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Summary of a completed run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelayReport {
    pub input: String,
    pub output: String,
    pub kind: MediaKind,
    /// Index of the relayed stream in the source
    pub source_stream: Option<usize>,
    pub source_time_base: Option<Timebase>,
    pub destination_time_base: Option<Timebase>,
    pub packets_read: u64,
    pub packets_relayed: u64,
    pub packets_discarded: u64,
    pub bytes_relayed: u64,
    pub state: RelayState,
    pub elapsed: Duration,
}

impl RelayReport {
    fn new(request: &RelayRequest) -> Self {
        Self {
            input: request.input.clone(),
            output: request.output.clone(),
            kind: request.kind,
            source_stream: None,
            source_time_base: None,
            destination_time_base: None,
            packets_read: 0,
            packets_relayed: 0,
            packets_discarded: 0,
            bytes_relayed: 0,
            state: RelayState::Init,
            elapsed: Duration::ZERO,
        }
    }
}
