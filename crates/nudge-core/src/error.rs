//! Core error types for nudge-core.
//!
//! Scoring itself never fails: unknown interaction kinds fall back to a
//! neutral score and persistence problems degrade to in-memory operation.
//! These errors surface only at the edges (config files, flag stores and
//! config validation).

use std::path::PathBuf;
use thiserror::Error;

/// Core error type for nudge-core.
#[derive(Error, Debug)]
pub enum CoreError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Flag storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Config view could not be converted to or from JSON
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to load configuration
    #[error("Failed to load configuration from {path}: {message}")]
    LoadFailed { path: PathBuf, message: String },

    /// Failed to save configuration
    #[error("Failed to save configuration to {path}: {message}")]
    SaveFailed { path: PathBuf, message: String },

    /// Unknown dot-path key
    #[error("Unknown configuration key: {0}")]
    UnknownKey(String),

    /// Invalid configuration value
    #[error("Invalid configuration value for '{key}': {message}")]
    InvalidValue { key: String, message: String },

    /// Unknown prompt section
    #[error("No prompt configured with name '{0}'")]
    UnknownPrompt(String),

    /// Data directory could not be determined or created
    #[error("Data directory unavailable: {0}")]
    DataDir(String),
}

/// Flag store errors. Callers on the scheduling path swallow these.
#[derive(Error, Debug)]
pub enum StorageError {
    /// Backing store could not be read
    #[error("Failed to read flags from {path}: {message}")]
    ReadFailed { path: PathBuf, message: String },

    /// Backing store could not be written
    #[error("Failed to write flags to {path}: {message}")]
    WriteFailed { path: PathBuf, message: String },

    /// Stored value is not a timestamp
    #[error("Corrupt value for flag '{key}': {value}")]
    Corrupt { key: String, value: String },

    /// Store refuses writes (disabled storage, quota exceeded)
    #[error("Flag store unavailable: {0}")]
    Unavailable(String),
}

/// Validation errors.
#[derive(Error, Debug, PartialEq)]
pub enum ValidationError {
    /// Decay rate outside the open interval (0, 1)
    #[error("decay_rate must be in (0, 1), got {0}")]
    DecayRateOutOfRange(f64),

    /// Zero-length activity timeout
    #[error("activity_timeout_secs must be greater than zero")]
    ZeroActivityTimeout,

    /// Zero-length evaluation interval
    #[error("evaluation_interval_ms must be greater than zero")]
    ZeroEvaluationInterval,

    /// History must hold at least one entry
    #[error("history_capacity must be greater than zero")]
    ZeroHistoryCapacity,

    /// Negative or non-finite score in a score table
    #[error("score for '{key}' must be a finite non-negative number, got {value}")]
    InvalidScore { key: String, value: f64 },

    /// Rule with an invalid threshold
    #[error("threshold rule '{name}': {message}")]
    InvalidRule { name: String, message: String },

    /// Empty collection
    #[error("Empty collection: {0}")]
    EmptyCollection(String),
}
