//! Analysis error types

use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Faults raised by an engine session.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("No engine could be started (tried: {})", .tried.join(", "))]
    Unavailable { tried: Vec<String> },

    #[error("Engine protocol error: {0}")]
    Protocol(String),

    #[error("Engine did not respond within {0:?}")]
    Timeout(Duration),

    #[error("Analysis cancelled")]
    Cancelled,
}

/// Serializable failure reason recorded on partial results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    EngineUnavailable,
    EngineProtocolError,
    EngineTimeout,
    CancellationRequested,
}

impl EngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            EngineError::Unavailable { .. } => ErrorKind::EngineUnavailable,
            EngineError::Protocol(_) => ErrorKind::EngineProtocolError,
            EngineError::Timeout(_) => ErrorKind::EngineTimeout,
            EngineError::Cancelled => ErrorKind::CancellationRequested,
        }
    }

    /// Faults the pipeline may retry (per move).
    pub fn is_retryable(&self) -> bool {
        matches!(self, EngineError::Protocol(_) | EngineError::Timeout(_))
    }
}

/// A game that produced no usable analysis at all.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Analysis failed{}: {source}", .move_number.map(|n| format!(" at move {n}")).unwrap_or_default())]
    Engine {
        /// Move being analyzed when the fault became fatal (None = during startup).
        move_number: Option<usize>,
        source: EngineError,
    },
}

impl AnalysisError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AnalysisError::Engine { source, .. } => source.kind(),
        }
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Invalid(&'static str),

    #[error("Configuration error: {0} is out of range")]
    OutOfRange(&'static str),
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Failed to write analysis: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}
