use std::fmt;
use std::io;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::compression::CompressionError;

/// Classification of a terminal pipeline failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// I/O failure reading a chunk, or the source ended early.
    SourceRead,
    /// Codec failure (or codec panic) on a chunk.
    Compression,
    /// I/O failure writing output, or a submission protocol violation.
    DestinationWrite,
    /// Externally requested cancellation, or the worker pool vanished.
    Aborted,
    /// No compressed unit arrived within the configured stall timeout.
    Stalled,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::SourceRead       => "source read error",
            ErrorKind::Compression      => "compression error",
            ErrorKind::DestinationWrite => "destination write error",
            ErrorKind::Aborted          => "aborted",
            ErrorKind::Stalled          => "stalled",
        };
        f.write_str(name)
    }
}

/// Terminal failure delivered exactly once to the caller of a pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct PipelineError {
    pub kind: ErrorKind,
    pub message: String,
}

impl PipelineError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self { kind, message: message.into() }
    }

    pub fn aborted(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Aborted, message)
    }
}

/// Unified error for the public API.
/// - `From<T>` impls enable `?` from setup code down to the codecs.
/// - `Pipeline` carries the coordinator's terminal outcome unchanged.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("compression error: {0}")]
    Compression(#[from] CompressionError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}
