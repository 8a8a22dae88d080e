//! Error types and handling for dayahead
//!
//! Two families live here: [`DayAheadError`] for the host side (configuration,
//! I/O, web) and [`FetchError`] for a single price feed attempt. Fetch errors are
//! never propagated past the service; they are logged and turned into a retry.

use thiserror::Error;

/// Result type alias for dayahead operations
pub type Result<T> = std::result::Result<T, DayAheadError>;

/// Main error type for dayahead
#[derive(Debug, Error)]
pub enum DayAheadError {
    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// Validation errors
    #[error("Validation error: {field} - {message}")]
    Validation { field: String, message: String },

    /// Serialization/deserialization errors
    #[error("Serialization error: {message}")]
    Serialization { message: String },

    /// File I/O errors
    #[error("I/O error: {message}")]
    Io { message: String },

    /// Network-related errors
    #[error("Network error: {message}")]
    Network { message: String },

    /// HTTP/Web server errors
    #[error("Web server error: {message}")]
    Web { message: String },
}

impl DayAheadError {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        DayAheadError::Config {
            message: message.into(),
        }
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(field: S, message: S) -> Self {
        DayAheadError::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a new I/O error
    pub fn io<S: Into<String>>(message: S) -> Self {
        DayAheadError::Io {
            message: message.into(),
        }
    }

    /// Create a new network error
    pub fn network<S: Into<String>>(message: S) -> Self {
        DayAheadError::Network {
            message: message.into(),
        }
    }

    /// Create a new web error
    pub fn web<S: Into<String>>(message: S) -> Self {
        DayAheadError::Web {
            message: message.into(),
        }
    }
}

impl From<std::io::Error> for DayAheadError {
    fn from(err: std::io::Error) -> Self {
        DayAheadError::io(err.to_string())
    }
}

impl From<serde_yaml::Error> for DayAheadError {
    fn from(err: serde_yaml::Error) -> Self {
        DayAheadError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for DayAheadError {
    fn from(err: serde_json::Error) -> Self {
        DayAheadError::Serialization {
            message: err.to_string(),
        }
    }
}

impl From<reqwest::Error> for DayAheadError {
    fn from(err: reqwest::Error) -> Self {
        DayAheadError::network(err.to_string())
    }
}

impl From<chrono::ParseError> for DayAheadError {
    fn from(err: chrono::ParseError) -> Self {
        DayAheadError::Validation {
            field: "time".to_string(),
            message: err.to_string(),
        }
    }
}

/// Why a single price feed attempt produced no usable data
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network failure or non-success HTTP status
    #[error("price feed transport error: {message}")]
    Transport { message: String },

    /// Malformed JSON, missing fields or unparseable numeric text
    #[error("price feed parse error: {message}")]
    Parse { message: String },

    /// Well-formed response without any row for today's date
    #[error("price feed has no data for {date}")]
    NoData { date: String },
}

impl FetchError {
    pub fn transport<S: Into<String>>(message: S) -> Self {
        FetchError::Transport {
            message: message.into(),
        }
    }

    pub fn parse<S: Into<String>>(message: S) -> Self {
        FetchError::Parse {
            message: message.into(),
        }
    }

    pub fn no_data<S: Into<String>>(date: S) -> Self {
        FetchError::NoData { date: date.into() }
    }

    /// Short tag used in log fields
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Transport { .. } => "transport",
            FetchError::Parse { .. } => "parse",
            FetchError::NoData { .. } => "no_data",
        }
    }
}

impl From<reqwest::Error> for FetchError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FetchError::parse(err.to_string())
        } else {
            FetchError::transport(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::parse(err.to_string())
    }
}
