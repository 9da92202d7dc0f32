use std::{io, path::PathBuf};

use thiserror::Error;

/// Failures reading or writing the session credential cache
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Failed to read credential cache {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to decode credential cache {}", path.display())]
    Decode {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Failed to encode credentials for cache")]
    Encode(#[source] serde_json::Error),
    #[error("Failed to create directory: {}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write credential cache {}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Failures of the PIN entry mechanism
#[derive(Debug, Error)]
pub enum PromptError {
    /// The human dismissed the prompt
    #[error("PIN entry cancelled")]
    Cancelled,
    #[error("Failed to run PIN entry program {program}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("PIN entry I/O failed")]
    Io(#[from] io::Error),
    #[error("PIN entry protocol error: {0}")]
    Protocol(String),
}

/// Failures reported by the identity provider
#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{operation} failed: {message}")]
    Request {
        operation: &'static str,
        message: String,
    },
    #[error("AWS STS returned no credentials for {operation}")]
    MissingCredentials { operation: &'static str },
    #[error("AWS STS returned an unrepresentable expiration for {operation}")]
    InvalidExpiration { operation: &'static str },
}

/// Failures obtaining MFA session credentials
#[derive(Debug, Error)]
pub enum AcquireError {
    #[error(transparent)]
    Cache(CacheError),
    #[error("PIN entry cancelled")]
    Cancelled,
    #[error(transparent)]
    Prompt(PromptError),
    #[error(transparent)]
    Provider(ProviderError),
    #[error("saveCache")]
    Save(#[source] CacheError),
}

impl From<PromptError> for AcquireError {
    fn from(err: PromptError) -> Self {
        match err {
            PromptError::Cancelled => Self::Cancelled,
            other => Self::Prompt(other),
        }
    }
}

/// Failures handing the final credentials to the caller
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("executable file not found in $PATH: {program}")]
    NotFound { program: String },
    #[error("Failed to execute {}", program.display())]
    Exec {
        program: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("Failed to write credentials")]
    Output(#[source] io::Error),
}
