//! Error types for ODBC Crusher

use thiserror::Error;

use crate::diagnostic::diagnose;

/// A failure reported by the native ODBC gateway, carrying its SQLSTATE.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("[{sqlstate}] {message}")]
pub struct GatewayError {
    /// Five character SQLSTATE, `HY000` when the driver did not report one
    pub sqlstate: String,
    /// Driver supplied message text
    pub message: String,
    /// Driver specific native error code
    pub native_code: Option<i32>,
}

impl GatewayError {
    pub fn new(sqlstate: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            sqlstate: sqlstate.into(),
            message: message.into(),
            native_code: None,
        }
    }

    pub fn with_native_code(mut self, code: i32) -> Self {
        self.native_code = Some(code);
        self
    }

    /// General error without a more specific state
    pub fn general(message: impl Into<String>) -> Self {
        Self::new("HY000", message)
    }

    /// The binding does not expose the requested function
    pub fn unsupported(function: &str) -> Self {
        Self::new("IM001", format!("Driver does not support {function}"))
    }

    /// Optional feature not implemented (`HYC00`) or function missing from the
    /// driver (`IM001`).
    pub fn is_unsupported(&self) -> bool {
        matches!(self.sqlstate.as_str(), "IM001" | "HYC00")
    }

    /// Whether the error means no connection could be established.
    pub fn is_connection_failure(&self) -> bool {
        self.sqlstate.starts_with("08")
            || self.sqlstate.starts_with("28")
            || matches!(self.sqlstate.as_str(), "IM002" | "IM003" | "HYT00")
    }

    /// Human readable suggestion for this error.
    pub fn diagnostic(&self) -> String {
        diagnose(&self.sqlstate, &self.message)
    }
}

/// Core error type for ODBC Crusher operations
#[derive(Error, Debug)]
pub enum CrusherError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Unknown suite: {0}")]
    UnknownSuite(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Configuration parse error: {0}")]
    ConfigParse(#[from] toml::de::Error),
}

/// Result type alias for ODBC Crusher operations
pub type Result<T> = std::result::Result<T, CrusherError>;

/// Result of a single gateway call
pub type GatewayResult<T> = std::result::Result<T, GatewayError>;
