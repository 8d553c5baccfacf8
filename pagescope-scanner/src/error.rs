use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("invalid URL format: {0}")]
    InvalidUrl(String),

    #[error("failed to fetch page: {0}")]
    FetchFailed(#[from] reqwest::Error),

    #[error("received non-OK status code: {0}")]
    BadStatus(u16),

    #[error("failed to parse HTML: {0}")]
    ParseFailed(String),

    #[error("analysis cancelled")]
    Cancelled,

    #[error("analysis timed out after {0:?}")]
    TimedOut(Duration),
}

impl ScanError {
    /// Label used for the request-outcome counter.
    pub fn outcome_label(&self) -> &'static str {
        match self {
            ScanError::InvalidUrl(_) => "invalid",
            ScanError::FetchFailed(_) => "failed",
            ScanError::BadStatus(_) => "error",
            ScanError::ParseFailed(_) => "parse_error",
            ScanError::Cancelled => "cancelled",
            ScanError::TimedOut(_) => "timeout",
        }
    }

    pub fn is_cancellation(&self) -> bool {
        matches!(self, ScanError::Cancelled)
    }
}

pub type Result<T> = std::result::Result<T, ScanError>;
