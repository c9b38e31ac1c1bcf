//! Error types for the loan agent orchestrator

use thiserror::Error;

/// Result type alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestrationError>;

#[derive(Error, Debug)]
pub enum OrchestrationError {

    // =============================
    // Recoverable Service Errors
    // =============================
    //
    // These never abort a pass: the tool layer renders them as text
    // inside the ToolResult that the decision capability reads next.

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Remote service unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // =============================
    // Pass-Fatal Errors
    // =============================

    #[error("Decision capability unavailable: {0}")]
    DecisionUnavailable(String),

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid thread state: {0}")]
    InvalidThreadState(String),

    #[error("Tool loop exceeded: more than {0} tool rounds in one pass")]
    ToolLoopExceeded(usize),

    // =============================
    // External Library Conversions
    // =============================

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    #[error("HTTP client error: {0}")]
    HttpError(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl OrchestrationError {
    /// True for failures the tool layer absorbs into conversation text
    /// instead of failing the pass.
    pub fn is_tool_recoverable(&self) -> bool {
        matches!(
            self,
            OrchestrationError::NotFound(_)
                | OrchestrationError::RemoteUnavailable(_)
                | OrchestrationError::InvalidInput(_)
        )
    }
}
