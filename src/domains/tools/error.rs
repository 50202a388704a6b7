//! Tool-specific error types.

use thiserror::Error;

use crate::domains::jira::JiraError;

/// Result type for tool operations.
pub type ToolResult<T> = Result<T, ToolError>;

/// Errors that can occur while resolving, validating or running a tool.
///
/// Every variant is converted into a response envelope by the dispatcher;
/// none of them is fatal to the process.
#[derive(Debug, Error)]
pub enum ToolError {
    /// The requested tool was not found.
    #[error("Tool not found: {0}")]
    NotFound(String),

    /// A required argument was omitted.
    #[error("Missing required argument: {parameter}")]
    MissingArgument { parameter: String },

    /// An argument did not have the declared kind or format.
    #[error("Invalid argument '{parameter}': expected {expected}")]
    InvalidArgument { parameter: String, expected: String },

    /// The remote API answered with a non-success status.
    #[error("Remote call failed with status {status}: {message}")]
    RemoteCall { status: u16, message: String },

    /// Anything else, such as a connection failure or a panicking handler.
    #[error("{0}")]
    Unknown(String),
}

impl ToolError {
    /// Create a new "not found" error.
    pub fn not_found(name: impl Into<String>) -> Self {
        Self::NotFound(name.into())
    }

    /// Create a new "missing argument" error.
    pub fn missing(parameter: impl Into<String>) -> Self {
        Self::MissingArgument {
            parameter: parameter.into(),
        }
    }

    /// Create a new "invalid argument" error.
    pub fn invalid(parameter: impl Into<String>, expected: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter: parameter.into(),
            expected: expected.into(),
        }
    }

    /// Create a new "unknown" error.
    pub fn unknown(msg: impl Into<String>) -> Self {
        Self::Unknown(msg.into())
    }

    /// Stable kind name used on the wire.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "ToolNotFound",
            Self::MissingArgument { .. } => "MissingArgument",
            Self::InvalidArgument { .. } => "InvalidArgument",
            Self::RemoteCall { .. } => "RemoteCallError",
            Self::Unknown(_) => "UnknownError",
        }
    }

    /// Short message carried in the response envelope.
    pub fn wire_message(&self) -> String {
        match self {
            Self::NotFound(name) => name.clone(),
            Self::MissingArgument { parameter } => parameter.clone(),
            Self::InvalidArgument {
                parameter,
                expected,
            } => format!("{parameter}: expected {expected}"),
            Self::RemoteCall { message, .. } => message.clone(),
            Self::Unknown(msg) => msg.clone(),
        }
    }
}

impl From<JiraError> for ToolError {
    fn from(err: JiraError) -> Self {
        match err {
            JiraError::Status { status, message } => Self::RemoteCall { status, message },
            JiraError::UnexpectedBody { status, message } => Self::RemoteCall { status, message },
            other => Self::Unknown(other.to_string()),
        }
    }
}

/// Configuration errors raised while building the tool registry.
///
/// These indicate a programming error and are fatal at startup.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// Two tools were registered under the same name.
    #[error("Duplicate tool name: {0}")]
    DuplicateTool(String),

    /// A parameter default does not match the parameter's declared kind.
    #[error("Tool '{tool}': default for parameter '{parameter}' is not a {kind}")]
    InvalidDefault {
        tool: String,
        parameter: String,
        kind: &'static str,
    },

    /// The parameter specs and the typed parameter struct disagree.
    #[error("Tool '{tool}': parameter specs do not match parameter struct ({detail})")]
    SchemaMismatch { tool: String, detail: String },
}
