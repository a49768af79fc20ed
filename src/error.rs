//! Error types for power6
//!
//! Exit codes:
//! - 0: Success
//! - 2: User error (bad args, invalid config)
//! - 3: Blocked by tier (view requires a higher subscription)
//! - 4: Operation failed (io, storage lock, remote unavailable)
//!
//! Validation rejections (empty task text, full working set) are not errors;
//! the task operations report them as `Ok(None)`.

use std::path::PathBuf;
use thiserror::Error;

use crate::tier::{Feature, Tier};

/// Exit codes for the power6 CLI
pub mod exit_codes {
    pub const SUCCESS: i32 = 0;
    pub const USER_ERROR: i32 = 2;
    pub const TIER_BLOCKED: i32 = 3;
    pub const OPERATION_FAILED: i32 = 4;
}

/// Main error type for power6 operations
#[derive(Error, Debug)]
pub enum Error {
    // User errors (exit code 2)
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    // Tier blocks (exit code 3)
    #[error("{feature} requires the {required} tier (current tier: {current})")]
    FeatureLocked {
        feature: Feature,
        required: Tier,
        current: Tier,
    },

    // Operation failures (exit code 4)
    #[error("Remote unavailable: {0}")]
    RemoteUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("Lock acquisition failed: {0}")]
    LockFailed(PathBuf),
}

impl Error {
    /// Get the exit code for this error
    pub fn exit_code(&self) -> i32 {
        match self {
            Error::InvalidConfig(_) | Error::InvalidArgument(_) => exit_codes::USER_ERROR,

            Error::FeatureLocked { .. } => exit_codes::TIER_BLOCKED,

            Error::RemoteUnavailable(_)
            | Error::Io(_)
            | Error::Json(_)
            | Error::TomlParse(_)
            | Error::TomlSerialize(_)
            | Error::LockFailed(_) => exit_codes::OPERATION_FAILED,
        }
    }

    /// Structured details for JSON error output, when the variant carries any
    pub fn details(&self) -> Option<serde_json::Value> {
        match self {
            Error::FeatureLocked {
                feature,
                required,
                current,
            } => Some(serde_json::json!({
                "feature": feature,
                "required": required,
                "current": current,
            })),
            Error::LockFailed(path) => Some(serde_json::json!({ "path": path })),
            _ => None,
        }
    }

    /// Shorthand for building a `RemoteUnavailable` from any displayable cause
    pub fn remote(cause: impl std::fmt::Display) -> Self {
        Error::RemoteUnavailable(cause.to_string())
    }
}

/// Result type alias for power6 operations
pub type Result<T> = std::result::Result<T, Error>;

/// Wrapper for displaying errors in JSON format
#[derive(serde::Serialize)]
pub struct JsonError {
    pub error: String,
    pub code: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl From<&Error> for JsonError {
    fn from(err: &Error) -> Self {
        JsonError {
            error: err.to_string(),
            code: err.exit_code(),
            details: err.details(),
        }
    }
}
