//! Reasons a single historical data source could not supply samples

use reqwest::StatusCode;
use thiserror::Error;

use crate::models::ClimateVariable;

/// Failure of one source adapter; always recovered by falling through the chain
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Unexpected HTTP status {status}")]
    Http { status: u16 },

    #[error("Failed to parse response: {message}")]
    Parse { message: String },

    #[error("Credentials rejected by provider")]
    Authentication,

    #[error("Rate limited by provider")]
    RateLimited,

    #[error("Variable {variable} is not offered by this source")]
    Unsupported { variable: ClimateVariable },

    #[error("No response within {seconds}s")]
    Timeout { seconds: u64 },

    #[error("Source disabled: {reason}")]
    Disabled { reason: String },
}

impl SourceError {
    pub fn parse<S: Into<String>>(message: S) -> Self {
        Self::Parse {
            message: message.into(),
        }
    }

    pub fn disabled<S: Into<String>>(reason: S) -> Self {
        Self::Disabled {
            reason: reason.into(),
        }
    }

    /// Classify a non-success response status
    #[must_use]
    pub fn from_status(status: StatusCode) -> Self {
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Self::Authentication,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            other => Self::Http {
                status: other.as_u16(),
            },
        }
    }
}

impl From<reqwest::Error> for SourceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            Self::parse(err.to_string())
        } else if let Some(status) = err.status() {
            Self::from_status(status)
        } else {
            Self::Network {
                message: err.to_string(),
            }
        }
    }
}

impl From<reqwest_middleware::Error> for SourceError {
    fn from(err: reqwest_middleware::Error) -> Self {
        match err {
            reqwest_middleware::Error::Reqwest(inner) => inner.into(),
            reqwest_middleware::Error::Middleware(inner) => Self::Network {
                message: inner.to_string(),
            },
        }
    }
}
