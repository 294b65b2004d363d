//! use spiffekit::error::ExternalToolError;

use std::process::ExitStatus;

use thiserror::Error;

/// Result type of every toolkit-backed operation.
pub type Result<T> = std::result::Result<T, ExternalToolError>;

/// The underlying reason an external tool invocation failed.
#[derive(Debug, Error)]
pub enum ToolFailure {
    /// Spawning the process, creating a pipe or a temporary file failed.
    #[error("{0}")]
    Io(#[from] std::io::Error),

    /// The process ran and exited unsuccessfully.
    #[error("{0}")]
    ExitStatus(ExitStatus),

    /// A stream requested as piped was not handed back by the child.
    #[error("{0} pipe unavailable")]
    MissingPipe(&'static str),
}

/// Error raised when the external PKI toolkit, or the local setup around it, fails.
///
/// There is a single kind for "the toolkit reported an error" and "the toolkit
/// could not be started"; inspect [`ExternalToolError::output`] or the source
/// to tell them apart.
#[derive(Debug, Error)]
#[error("{operation}: {source}\n{output}")]
pub struct ExternalToolError {
    operation: String,
    #[source]
    source: ToolFailure,
    output: String,
}

impl ExternalToolError {
    /// Wraps `source` with a description of the operation and the captured output.
    pub fn new(
        operation: impl Into<String>,
        source: impl Into<ToolFailure>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            operation: operation.into(),
            source: source.into(),
            output: output.into(),
        }
    }

    /// Failure that happened before any process produced output.
    pub fn setup(operation: impl Into<String>, source: impl Into<ToolFailure>) -> Self {
        Self::new(operation, source, String::new())
    }

    /// Human-readable description of the failed operation.
    pub fn operation(&self) -> &str {
        &self.operation
    }

    /// Combined stdout and stderr captured from the toolkit, if any ran.
    pub fn output(&self) -> &str {
        &self.output
    }

    /// The underlying process or I/O failure.
    pub fn failure(&self) -> &ToolFailure {
        &self.source
    }

    /// Exit code reported by the toolkit, when it ran to completion.
    pub fn exit_code(&self) -> Option<i32> {
        match &self.source {
            ToolFailure::ExitStatus(status) => status.code(),
            _ => None,
        }
    }
}

/// Errors raised while reading a produced certificate file back for inspection.
#[derive(Debug, Error)]
pub enum DecodeError {
    /// Reading the file failed.
    #[error("Failed to read certificate: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid PEM.
    #[error("Failed to decode PEM: {0}")]
    Pem(#[from] pem::PemError),

    /// The PEM body is not a valid DER certificate.
    #[error("Failed to decode data: {0}")]
    Der(String),

    /// The certificate lacks a required extension.
    #[error("Certificate has no {0} extension")]
    MissingExtension(&'static str),
}

impl From<der::Error> for DecodeError {
    /// Converts a `der::Error` into a `DecodeError`.
    fn from(err: der::Error) -> Self {
        DecodeError::Der(err.to_string())
    }
}
