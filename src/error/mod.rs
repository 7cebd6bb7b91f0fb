//! Error handling module for the remuxer

use std::fmt;

use thiserror::Error;

use crate::domain::model::MediaKind;

/// Diagnostic carried by every collaborator failure: which primitive failed,
/// the collaborator's error code (if it has one) and its message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackendFault {
    pub operation: &'static str,
    pub code: Option<i32>,
    pub message: String,
}

impl BackendFault {
    pub fn new(operation: &'static str, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: None,
            message: message.into(),
        }
    }

    pub fn with_code(operation: &'static str, code: i32, message: impl Into<String>) -> Self {
        Self {
            operation,
            code: Some(code),
            message: message.into(),
        }
    }

    /// Wrap an FFmpeg error, keeping its numeric code
    pub fn libav(operation: &'static str, error: ffmpeg_next::Error) -> Self {
        Self::with_code(operation, i32::from(error), error.to_string())
    }
}

impl fmt::Display for BackendFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "{} failed, error: [{}] {}", self.operation, code, self.message),
            None => write!(f, "{} failed: {}", self.operation, self.message),
        }
    }
}

/// Main error type for remux operations
#[derive(Error, Debug)]
pub enum RemuxError {
    /// Source container could not be resolved or opened
    #[error("Failed to open source {locator}: {cause}")]
    Open { locator: String, cause: BackendFault },

    /// Stream metadata could not be determined
    #[error("Failed to probe stream metadata: {cause}")]
    Probe { cause: BackendFault },

    /// No stream of the requested kind exists
    #[error("No {kind} stream found in source")]
    StreamNotFound { kind: MediaKind },

    /// Destination container could not be constructed
    #[error("Failed to create destination {locator}: {cause}")]
    Create { locator: String, cause: BackendFault },

    /// Destination stream could not be declared
    #[error("Failed to declare output stream: {cause}")]
    Declare { cause: BackendFault },

    /// Byte sink could not be opened
    #[error("Failed to open output sink: {cause}")]
    Io { cause: BackendFault },

    /// Container header could not be serialized
    #[error("Failed to write container header: {cause}")]
    Header { cause: BackendFault },

    /// Packet read failed mid-stream
    #[error("Failed to read packet: {cause}")]
    Read { cause: BackendFault },

    /// Packet write failed mid-stream
    #[error("Failed to write packet: {cause}")]
    Write { cause: BackendFault },

    /// Container trailer could not be serialized
    #[error("Failed to write container trailer: {cause}")]
    Trailer { cause: BackendFault },

    /// FFmpeg initialization error
    #[error("Failed to initialize FFmpeg: {message}")]
    Init { message: String },

    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Invalid arguments provided
    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    /// A batch job did not run to completion
    #[error("Job {job} did not complete: {message}")]
    Job { job: usize, message: String },
}

/// Terminal classification of a failed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Open,
    Probe,
    StreamNotFound,
    Create,
    Declare,
    Io,
    Header,
    Read,
    Write,
    Trailer,
    Init,
    Usage,
    Job,
}

impl ErrorKind {
    /// Process exit code reported by the CLI driver
    pub fn exit_code(self) -> u8 {
        match self {
            ErrorKind::Usage => 2,
            ErrorKind::Open => 10,
            ErrorKind::Probe => 11,
            ErrorKind::StreamNotFound => 12,
            ErrorKind::Create => 13,
            ErrorKind::Declare => 14,
            ErrorKind::Io => 15,
            ErrorKind::Header => 16,
            ErrorKind::Read => 17,
            ErrorKind::Write => 18,
            ErrorKind::Trailer => 19,
            ErrorKind::Init => 20,
            ErrorKind::Job => 21,
        }
    }
}

impl RemuxError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            RemuxError::Open { .. } => ErrorKind::Open,
            RemuxError::Probe { .. } => ErrorKind::Probe,
            RemuxError::StreamNotFound { .. } => ErrorKind::StreamNotFound,
            RemuxError::Create { .. } => ErrorKind::Create,
            RemuxError::Declare { .. } => ErrorKind::Declare,
            RemuxError::Io { .. } => ErrorKind::Io,
            RemuxError::Header { .. } => ErrorKind::Header,
            RemuxError::Read { .. } => ErrorKind::Read,
            RemuxError::Write { .. } => ErrorKind::Write,
            RemuxError::Trailer { .. } => ErrorKind::Trailer,
            RemuxError::Init { .. } => ErrorKind::Init,
            RemuxError::Config { .. } | RemuxError::InvalidArgument { .. } => ErrorKind::Usage,
            RemuxError::Job { .. } => ErrorKind::Job,
        }
    }

    /// Collaborator diagnostic, when the failure came from one
    pub fn fault(&self) -> Option<&BackendFault> {
        match self {
            RemuxError::Open { cause, .. }
            | RemuxError::Probe { cause }
            | RemuxError::Create { cause, .. }
            | RemuxError::Declare { cause }
            | RemuxError::Io { cause }
            | RemuxError::Header { cause }
            | RemuxError::Read { cause }
            | RemuxError::Write { cause }
            | RemuxError::Trailer { cause } => Some(cause),
            _ => None,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        RemuxError::InvalidArgument {
            message: message.into(),
        }
    }
}

/// Result type alias for remux operations
pub type RemuxResult<T> = std::result::Result<T, RemuxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fault_display_includes_operation_and_code() {
        let fault = BackendFault::with_code("avformat_write_header", -22, "Invalid argument");
        assert_eq!(
            fault.to_string(),
            "avformat_write_header failed, error: [-22] Invalid argument"
        );

        let fault = BackendFault::new("write_packet", "sink is full");
        assert_eq!(fault.to_string(), "write_packet failed: sink is full");
    }

    #[test]
    fn test_error_kind_classification() {
        let error = RemuxError::StreamNotFound {
            kind: MediaKind::Audio,
        };
        assert_eq!(error.kind(), ErrorKind::StreamNotFound);
        assert_eq!(error.kind().exit_code(), 12);
        assert!(error.fault().is_none());

        let error = RemuxError::Write {
            cause: BackendFault::new("write_packet", "disk full"),
        };
        assert_eq!(error.kind(), ErrorKind::Write);
        assert_eq!(error.fault().map(|f| f.operation), Some("write_packet"));
        assert!(error.to_string().contains("disk full"));
    }

    #[test]
    fn test_usage_errors_share_exit_code() {
        assert_eq!(RemuxError::invalid("bad").kind().exit_code(), 2);
        let error = RemuxError::Config {
            message: "bad level".to_string(),
        };
        assert_eq!(error.kind(), ErrorKind::Usage);
    }
}
