// GSD MCP Server - Error Types
// Copyright 2026 Joseph Stone - All Rights Reserved
//
// One error enum for the whole server. Rendered to text only where a
// response is built: tool failures become error envelopes, routing
// failures become JSON-RPC error objects.

use std::process::ExitStatus;
use std::time::Duration;
use thiserror::Error;

// JSON-RPC error codes
pub const PARSE_ERROR: i64 = -32700;
pub const INVALID_REQUEST: i64 = -32600;
pub const METHOD_NOT_FOUND: i64 = -32601;
pub const INVALID_PARAMS: i64 = -32602;
pub const INTERNAL_ERROR: i64 = -32603;
/// MCP: requested resource does not exist
pub const RESOURCE_NOT_FOUND: i64 = -32002;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("HOME or USERPROFILE environment variable must be set")]
    MissingHome,

    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Unknown prompt: {0}")]
    UnknownPrompt(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Missing required argument '{argument}' for prompt {prompt}")]
    MissingPromptArgument { prompt: String, argument: String },

    #[error("Invalid GSD resource URI: {0}")]
    InvalidUri(String),

    #[error("Unknown resource category: {0}")]
    UnknownCategory(String),

    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    #[error("Access denied: path outside allowed directory")]
    AccessDenied,

    #[error("Workflow '{0}' not found")]
    WorkflowNotFound(String),

    #[error("gsd-tools failed: {0}")]
    ExternalTool(#[from] RunnerError),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ServerError {
    /// JSON-RPC error code for errors that surface at the routing layer.
    pub fn code(&self) -> i64 {
        match self {
            ServerError::UnknownTool(_)
            | ServerError::UnknownPrompt(_)
            | ServerError::InvalidRequest(_)
            | ServerError::MissingPromptArgument { .. } => INVALID_PARAMS,
            ServerError::InvalidUri(_)
            | ServerError::UnknownCategory(_)
            | ServerError::ResourceNotFound(_)
            | ServerError::AccessDenied => RESOURCE_NOT_FOUND,
            _ => INTERNAL_ERROR,
        }
    }
}

/// Failures of the external gsd-tools process. The message of the
/// underlying cause is always preserved.
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("failed to spawn {program}: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("timed out after {}s", .0.as_secs_f64())]
    Timeout(Duration),

    #[error("command failed ({status}): {stderr}")]
    Failed { status: ExitStatus, stderr: String },

    #[error("output exceeded {0} bytes")]
    OutputOverflow(usize),

    #[error("i/o error while running command: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ServerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn routing_errors_map_to_invalid_params() {
        assert_eq!(ServerError::UnknownTool("x".into()).code(), INVALID_PARAMS);
        assert_eq!(ServerError::UnknownPrompt("x".into()).code(), INVALID_PARAMS);
    }

    #[test]
    fn access_denied_is_reported_like_not_found() {
        assert_eq!(ServerError::AccessDenied.code(), RESOURCE_NOT_FOUND);
        assert_eq!(
            ServerError::ResourceNotFound("gsd://templates/foo".into()).code(),
            RESOURCE_NOT_FOUND
        );
    }

    #[test]
    fn external_tool_message_keeps_cause() {
        let err: ServerError = RunnerError::OutputOverflow(1024).into();
        assert_eq!(err.to_string(), "gsd-tools failed: output exceeded 1024 bytes");
        assert_eq!(err.code(), INTERNAL_ERROR);
    }
}
