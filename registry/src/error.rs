//! Error types for spec registry operations.
//!
//! Covers every failure mode of loading and bundling plugin specs: I/O,
//! serialization, spec self-check failures and bundle hash verification.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while loading or bundling plugin specs.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// File I/O failure.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing or serialization failure.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// YAML parsing failure.
    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    /// A spec file failed to parse, with the offending path.
    #[error("failed to read spec '{}': {message}", path.display())]
    InvalidFile { path: PathBuf, message: String },

    /// A plugin spec failed its self-check or collided with another plugin.
    #[error("invalid spec in '{origin}': {message}")]
    InvalidSpec { origin: String, message: String },

    /// Input path is not a spec file or directory.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Bundle hash does not match the bundled plugins.
    #[error("invalid checksum: {0}")]
    InvalidChecksum(String),

    /// All configured sources failed, or none were configured.
    #[error("no spec sources available")]
    NoSourcesAvailable,
}

/// Convenience alias for results with [`RegistryError`].
pub type Result<T> = std::result::Result<T, RegistryError>;
