//! Remote client error types.

use thiserror::Error;

/// Result type for remote API calls.
pub type JiraResult<T> = Result<T, JiraError>;

/// Errors that can occur while talking to the Jira REST API.
#[derive(Debug, Error)]
pub enum JiraError {
    /// Jira answered with a non-success status.
    #[error("Jira responded with status {status}: {message}")]
    Status { status: u16, message: String },

    /// A success status with a body that is not the expected JSON.
    #[error("Unexpected response body (status {status}): {message}")]
    UnexpectedBody { status: u16, message: String },

    /// Connection, timeout or protocol failure below HTTP.
    #[error("Request to Jira failed: {0}")]
    Network(#[from] reqwest::Error),

    /// An absolute URL that does not belong to the configured instance.
    #[error("URL '{0}' is not under the configured Jira base URL")]
    ForeignUrl(String),

    /// Local file I/O for uploads.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl JiraError {
    /// HTTP status, if the error came from a response.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } | Self::UnexpectedBody { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }
}
