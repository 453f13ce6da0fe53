//! Error types and handling for the Raincheck engine

use thiserror::Error;

/// Main error type for the Raincheck engine
#[derive(Error, Debug)]
pub enum RaincheckError {
    /// Malformed or out-of-range request input
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// A condition had no samples to analyse
    #[error("No samples available for {condition}")]
    InsufficientData { condition: String },

    /// Internal guarantee broken, e.g. the synthetic generator produced nothing
    #[error("Engine invariant violated: {message}")]
    EngineInvariant { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl RaincheckError {
    /// Create a new invalid request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    pub fn insufficient_data<S: Into<String>>(condition: S) -> Self {
        Self::InsufficientData {
            condition: condition.into(),
        }
    }

    pub fn engine_invariant<S: Into<String>>(message: S) -> Self {
        Self::EngineInvariant {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the caller, not the engine, is at fault
    #[must_use]
    pub fn is_client_error(&self) -> bool {
        matches!(self, RaincheckError::InvalidRequest { .. })
    }

    /// Get a user-friendly error message
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            RaincheckError::InvalidRequest { message } => message.clone(),
            RaincheckError::InsufficientData { condition } => {
                format!("Not enough historical data to assess {condition}.")
            }
            RaincheckError::EngineInvariant { .. } => {
                "Analysis failed unexpectedly. Please try again later.".to_string()
            }
            RaincheckError::Config { .. } => {
                "Configuration error. Please check your config file and credentials.".to_string()
            }
        }
    }
}
