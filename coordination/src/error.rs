//! Error types for the coordination crate.
//!
//! Tool execution failures never reach these types — they are captured
//! inline as `isError` tool-result strings (see `crate::tools`). These
//! enums cover the seams where a caller legitimately needs a `Result`:
//! persistence I/O and the workflow engine's catch-all failure mode.

use thiserror::Error;

/// Failure reading or writing task/artifact records to the persistence store.
#[derive(Debug, Error)]
pub enum PersistenceError {
    #[error("io error at {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize record for key {key}: {source}")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to deserialize record for key {key}: {source}")]
    Deserialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Catch-all error the workflow engine wraps any internal failure into
/// before reporting the run as `failed`. Never escapes `WorkflowEngine::run`.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("agent '{role}' failed: {reason}")]
    AgentFailed { role: String, reason: String },

    #[error("persistence failure: {0}")]
    Persistence(#[from] PersistenceError),

    #[error("run was cancelled")]
    Cancelled,

    #[error("internal workflow error: {0}")]
    Internal(String),
}
