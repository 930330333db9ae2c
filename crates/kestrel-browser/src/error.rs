use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Browser error: {0}")]
    Browser(String),

    #[error("CDP error: {0}")]
    Cdp(String),

    #[error("axe-core error: {0}")]
    Axe(String),

    #[error("Lighthouse error: {0}")]
    Lighthouse(String),

    #[error("Timed out after {0:?}: {1}")]
    Timeout(std::time::Duration, String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<chromiumoxide::error::CdpError> for Error {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        Error::Cdp(err.to_string())
    }
}

impl From<Error> for kestrel_core::Error {
    fn from(err: Error) -> Self {
        match err {
            Error::Lighthouse(msg) => kestrel_core::Error::AuditUnavailable(msg),
            Error::Io(e) => kestrel_core::Error::Io(e),
            other => kestrel_core::Error::Browser(other.to_string()),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
