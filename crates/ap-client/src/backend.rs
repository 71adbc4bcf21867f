//! Backend capability shared by the mock and COM implementations.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ap_core::{Stream, UnitSet};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AspenError, AspenResult};

/// Something that can execute case operations.
///
/// Both implementations have the same shape; the [`Client`](crate::Client)
/// never inspects which one it holds. Calls block until the backend is done,
/// which for a real engine run can take arbitrarily long.
///
/// Backends are not `Send`: a COM document is bound to the apartment that
/// created it. Use one client per thread.
pub trait Backend {
    /// Backend name (for logging).
    fn name(&self) -> &str;

    /// Become ready to accept commands.
    fn connect(&mut self) -> AspenResult<()>;

    /// Load a case. On failure the current session is left untouched.
    fn open_case(&mut self, path: &Path) -> AspenResult<()>;

    /// Execute the simulation.
    fn run(&mut self) -> AspenResult<RunReport>;

    /// Snapshot of every stream in the session, in a stable order.
    fn get_streams(&mut self) -> AspenResult<Vec<Stream>>;

    /// Upsert the properties of `stream` under `name`.
    fn set_stream(&mut self, name: &str, stream: &Stream) -> AspenResult<()>;

    /// Persist the case, to `path` or else over the opened file. Returns where
    /// the case was written.
    fn save(&mut self, path: Option<&Path>) -> AspenResult<PathBuf>;

    /// Release session resources. Calling it again is a no-op.
    fn close(&mut self) -> AspenResult<()>;

    /// Path of the open case, if any.
    fn case_path(&self) -> Option<&Path>;

    /// Unit set the open case reports values in.
    fn units(&self) -> UnitSet {
        UnitSet::Si
    }
}

/// Which backend a client is built with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// In-memory simulation of case state.
    Mock,
    /// Aspen Plus through COM automation.
    #[default]
    Com,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Mock => f.write_str("mock"),
            BackendKind::Com => f.write_str("com"),
        }
    }
}

impl FromStr for BackendKind {
    type Err = AspenError;

    fn from_str(s: &str) -> AspenResult<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mock" => Ok(BackendKind::Mock),
            "com" => Ok(BackendKind::Com),
            other => Err(AspenError::Config(format!(
                "Unknown backend '{}': choose 'com' or 'mock'",
                other
            ))),
        }
    }
}

/// Summary of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunReport {
    pub started_at: DateTime<Utc>,
    pub duration: Duration,
    /// Entry point that performed the run (e.g. `Engine.Run2`, `mock`).
    pub entry_point: String,
}

impl RunReport {
    pub(crate) fn finished(started_at: DateTime<Utc>, duration: Duration, entry_point: &str) -> Self {
        Self {
            started_at,
            duration,
            entry_point: entry_point.to_string(),
        }
    }
}
