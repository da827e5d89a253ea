//! Error types for the MCP adapter.

use evolution_http_tools::runtime::HttpToolsError;
use evolution_http_tools::validation::ValidationError;
use thiserror::Error;

/// Process-level errors: configuration, startup and transport I/O.
#[derive(Error, Debug)]
pub enum AdapterError {
    /// Configuration errors (missing environment, invalid URL, duplicate tools)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Startup errors (listener failed to bind)
    #[error("Startup error: {0}")]
    Startup(String),

    /// Runtime errors (server loop failed)
    #[error("Runtime error: {0}")]
    Runtime(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for adapter operations.
pub type Result<T> = std::result::Result<T, AdapterError>;

/// Why a single tool call failed.
///
/// Upstream failures are not in this list: they are reported inside a normal result with
/// `isError: true`, see [`crate::dispatcher::Dispatcher::handle`].
#[derive(Error, Debug)]
pub enum ToolCallError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid arguments for tool '{tool}': {source}")]
    InvalidArguments {
        tool: String,
        #[source]
        source: ValidationError,
    },

    /// The outbound request could not be assembled (bad template, bad URL).
    #[error("Failed to build request for tool '{tool}': {source}")]
    Request {
        tool: String,
        #[source]
        source: HttpToolsError,
    },
}

impl ToolCallError {
    /// JSON-RPC error code reported to the caller.
    #[must_use]
    pub fn code(&self) -> i64 {
        match self {
            Self::UnknownTool(_) => crate::protocol::METHOD_NOT_FOUND,
            Self::InvalidArguments { .. } => crate::protocol::INVALID_PARAMS,
            Self::Request { .. } => crate::protocol::INTERNAL_ERROR,
        }
    }
}
