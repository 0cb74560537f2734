//! # Error Types
//!
//! Custom error types for the RC transmitter using `thiserror`.
//!
//! Errors only surface while loading configuration or settings. Faults
//! detected during a tick are reported through the alarm state instead.

use thiserror::Error;

/// Main error type for the RC transmitter
#[derive(Debug, Error)]
pub enum TxError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Settings storage errors (missing dataset, unreadable file)
    #[error("Storage error: {0}")]
    Storage(String),

    /// Settings rejected by the integrity check
    #[error("Invalid settings: {0}")]
    InvalidSettings(String),
}

/// Result type alias for the RC transmitter
pub type Result<T> = std::result::Result<T, TxError>;
