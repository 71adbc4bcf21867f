//! Error types for the client layer.

use std::fmt;
use std::path::PathBuf;

use crate::client::SessionState;

/// The one error type callers see.
///
/// Every variant belongs to one [`ErrorKind`]; branch on [`AspenError::kind`]
/// rather than on individual variants when only the category matters.
#[derive(Debug, thiserror::Error)]
pub enum AspenError {
    #[error("Connection error: {message}")]
    Connection { message: String },

    #[error("Case error: {message}")]
    Case { message: String },

    #[error("Case not found: {path}")]
    CaseNotFound { path: PathBuf },

    #[error("Failed to read case file: {path}")]
    CaseFileRead {
        path: PathBuf,
        source: ap_case::CaseFileError,
    },

    #[error("Failed to write case file: {path}")]
    CaseFileWrite {
        path: PathBuf,
        source: ap_case::CaseFileError,
    },

    #[error("No case is open")]
    NoCaseOpen,

    #[error("Run error: {message}")]
    Run { message: String },

    #[error("Invalid state: {operation} is not allowed while {state}")]
    State {
        operation: &'static str,
        state: SessionState,
    },

    #[error("Configuration error: {0}")]
    Config(String),
}

/// Result type for client operations.
pub type AspenResult<T> = Result<T, AspenError>;

/// Coarse error category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Backend unreachable or unavailable.
    Connection,
    /// Bad path, unloadable or unwritable file, or no case open.
    Case,
    /// The simulation failed to execute or converge.
    Run,
    /// Operation invoked outside its valid lifecycle state.
    State,
    /// Invalid client configuration.
    Config,
}

impl AspenError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            AspenError::Connection { .. } => ErrorKind::Connection,
            AspenError::Case { .. }
            | AspenError::CaseNotFound { .. }
            | AspenError::CaseFileRead { .. }
            | AspenError::CaseFileWrite { .. }
            | AspenError::NoCaseOpen => ErrorKind::Case,
            AspenError::Run { .. } => ErrorKind::Run,
            AspenError::State { .. } => ErrorKind::State,
            AspenError::Config(_) => ErrorKind::Config,
        }
    }

    pub(crate) fn connection(message: impl Into<String>) -> Self {
        AspenError::Connection {
            message: message.into(),
        }
    }

    pub(crate) fn case(message: impl Into<String>) -> Self {
        AspenError::Case {
            message: message.into(),
        }
    }

    pub(crate) fn run(message: impl Into<String>) -> Self {
        AspenError::Run {
            message: message.into(),
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ErrorKind::Connection => "connection",
            ErrorKind::Case => "case",
            ErrorKind::Run => "run",
            ErrorKind::State => "state",
            ErrorKind::Config => "config",
        };
        f.write_str(label)
    }
}
