//! Error types for the fallible edges of the crate
//!
//! Parsing and validation never fail: their problems are [`crate::Finding`]s.
//! Only reading input and loading configuration can return an error.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PairlError {
    #[error("failed to read '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config file '{path}': {source}")]
    Config {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("invalid value '{value}' for {var}")]
    InvalidEnv { var: String, value: String },
}

pub type Result<T> = std::result::Result<T, PairlError>;
