//! Error types for the `srf` command-line driver.

use srf_core::SrfError;
use thiserror::Error;

use crate::config::ConfigFileError;

/// CLI error type
#[derive(Debug, Error)]
pub enum CliError {
    /// Input or configuration file does not exist
    #[error("File not found: {0}")]
    FileNotFound(String),

    /// Malformed input file
    #[error("Parse error in {path}: {message}")]
    Parse {
        /// Offending file.
        path: String,
        /// What went wrong, including the line where known.
        message: String,
    },

    /// Invalid command-line argument
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration file error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigFileError),

    /// Rejected run or failed verification
    #[error(transparent)]
    Srf(#[from] SrfError),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Report serialisation error
    #[error("Output error: {0}")]
    Output(String),
}

impl CliError {
    /// Create a parse error
    pub fn parse(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::Parse {
            path: path.display().to_string(),
            message: message.into(),
        }
    }

    /// Create an output error
    pub fn output(msg: impl std::fmt::Display) -> Self {
        Self::Output(msg.to_string())
    }
}

/// Result type for CLI operations
pub type Result<T> = std::result::Result<T, CliError>;

#[cfg(test)]
mod tests {
    use super::*;
    use srf_core::error::ConfigError;

    #[test]
    fn test_error_display() {
        let err = CliError::parse(std::path::Path::new("obs.txt"), "line 3: bad token");
        assert_eq!(err.to_string(), "Parse error in obs.txt: line 3: bad token");
    }

    #[test]
    fn test_core_error_is_transparent() {
        let err: CliError = SrfError::from(ConfigError::InvalidInterval(0)).into();
        assert_eq!(err.to_string(), SrfError::from(ConfigError::InvalidInterval(0)).to_string());
    }
}
