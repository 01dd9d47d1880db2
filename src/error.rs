//! Error handling module for udlf-runner
//!
//! Provides centralized error handling with proper error types using thiserror.
//! Every fallible library call returns [`Result`].

use thiserror::Error;

/// Main error type for udlf-runner
#[derive(Error, Debug)]
pub enum UdlfError {
    /// IO errors (config files, ranked lists, logs)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration errors (unknown keys, malformed files)
    #[error("Configuration error: {0}")]
    Config(String),

    /// Validation errors (parameter values, paths)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Binary or config installation errors
    #[error("Install error: {0}")]
    Install(String),

    /// HTTP download errors
    #[error("Download error: {0}")]
    Download(String),

    /// The UDLF binary failed or reported problems in its log
    #[error("UDLF execution failed: {message}")]
    Execution {
        message: String,
        /// Log lines that tripped the error keyword scan
        flagged: Vec<String>,
    },

    /// Malformed ranked lists, matrices, class files or logs
    #[error("Parse error: {0}")]
    Parse(String),

    /// Metric computation errors (depth, indices)
    #[error("Evaluation error: {0}")]
    Evaluation(String),

    /// Image rendering errors
    #[error("Render error: {0}")]
    Render(String),
}

/// Result type alias for udlf-runner operations
pub type Result<T> = std::result::Result<T, UdlfError>;

impl UdlfError {
    /// Create a configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create an install error
    pub fn install(msg: impl Into<String>) -> Self {
        Self::Install(msg.into())
    }

    /// Create a download error
    pub fn download(msg: impl Into<String>) -> Self {
        Self::Download(msg.into())
    }

    /// Create an execution error with the offending log lines
    pub fn execution(msg: impl Into<String>, flagged: Vec<String>) -> Self {
        Self::Execution {
            message: msg.into(),
            flagged,
        }
    }

    /// Create a parse error
    pub fn parse(msg: impl Into<String>) -> Self {
        Self::Parse(msg.into())
    }

    /// Create an evaluation error
    pub fn evaluation(msg: impl Into<String>) -> Self {
        Self::Evaluation(msg.into())
    }

    /// Create a render error
    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render(msg.into())
    }
}
