use std::io;
use thiserror::Error;

/// Custom error type for rtop.
///
/// Only fatal conditions become errors: startup failures abort before
/// the display loop begins, provider failures abort mid-session (after
/// the terminal has been restored).  Invalid interactive input is never
/// an error -- it is reported through a transient on-screen message and
/// the loop keeps running.
#[derive(Error, Debug)]
pub enum RtopError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("startup failure: {0}")]
    Startup(String),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("provider failure: {0}")]
    Provider(String),

    #[error("terminal error: {0}")]
    Term(String),
}

/// Result type alias for rtop.
pub type Result<T> = std::result::Result<T, RtopError>;

impl RtopError {
    /// Create a startup error
    pub fn startup<S: Into<String>>(msg: S) -> Self {
        RtopError::Startup(msg.into())
    }

    /// Create a config error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        RtopError::Config(msg.into())
    }

    /// Create a provider error
    pub fn provider<S: Into<String>>(msg: S) -> Self {
        RtopError::Provider(msg.into())
    }

    pub fn term<S: Into<String>>(msg: S) -> Self {
        RtopError::Term(msg.into())
    }
}
