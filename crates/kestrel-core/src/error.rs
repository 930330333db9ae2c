use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Failed to load content: {0}")]
    LoadFailure(String),

    #[error("Accessibility scan failed: {0}")]
    ScanFailure(String),

    #[error("Performance audit unavailable: {0}")]
    AuditUnavailable(String),

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Browser error: {0}")]
    Browser(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse report: {0}")]
    Parse(#[from] serde_json::Error),
}

impl Error {
    /// Whether the caller can fix this by changing the request
    pub fn is_client_error(&self) -> bool {
        matches!(self, Error::InvalidRequest(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
