//!
//! src/errors.rs  Andrew Belles  Oct 2nd, 2026
//!
//! Defines enums and methods of error conversion
//! for errors the chart engine uses
//!
//!

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("config error: {0}")]
    Config(String),
    #[error("http error: {0}")]
    Http(String),
    #[error("unexpected status {status} from {url}")]
    Status { url: String, status: u16 },
    #[error("timed out: {0}")]
    Timeout(String),
    #[error("parse error: {0}")]
    Parse(String),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error)
}

impl ChartError {
    /// Network level failures that are worth another attempt. Status codes
    /// are judged separately against the retry config.
    pub fn is_transient(&self) -> bool {
        matches!(self, ChartError::Http(_) | ChartError::Timeout(_))
    }
}

/// A failed refresh is handed to every reader that queued behind it, so
/// the error has to be shareable. io errors keep their kind and message.
impl Clone for ChartError {
    fn clone(&self) -> Self {
        match self {
            ChartError::Config(m)  => ChartError::Config(m.clone()),
            ChartError::Http(m)    => ChartError::Http(m.clone()),
            ChartError::Status { url, status } =>
                ChartError::Status { url: url.clone(), status: *status },
            ChartError::Timeout(m) => ChartError::Timeout(m.clone()),
            ChartError::Parse(m)   => ChartError::Parse(m.clone()),
            ChartError::Io(e)      =>
                ChartError::Io(std::io::Error::new(e.kind(), e.to_string()))
        }
    }
}

impl From<reqwest::Error> for ChartError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ChartError::Timeout(e.to_string())
        } else {
            ChartError::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for ChartError {
    fn from(e: serde_json::Error) -> Self { ChartError::Parse(e.to_string()) }
}

impl From<url::ParseError> for ChartError {
    fn from(e: url::ParseError) -> Self { ChartError::Config(e.to_string()) }
}
