//! Error types for the Rubble solver.
//!
//! The per-frame solve path never fails. Errors only come from
//! validating inputs at construction or configuration time.

use thiserror::Error;

/// Unified error type for the Rubble workspace.
#[derive(Debug, Error)]
pub enum RubbleError {
    /// Support graph description is malformed or inconsistent.
    #[error("Invalid support graph: {0}")]
    InvalidGraph(String),

    /// Configuration value is invalid.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Node or bond index outside of the graph.
    #[error("Index {index} out of range for {kind} (count: {count})")]
    IndexOutOfRange {
        kind: &'static str,
        index: u32,
        count: u32,
    },
}

/// Convenience alias for `Result<T, RubbleError>`.
pub type RubbleResult<T> = Result<T, RubbleError>;
