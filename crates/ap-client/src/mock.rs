//! In-memory backend for development and tests without Aspen installed.
//!
//! Cases come from a [`MockCatalog`] of named fixtures first, then from YAML
//! or JSON fixture files on disk. Running a case is the identity on stream
//! values: it marks the session solved and leaves every stream as it was, so
//! whatever was written with `set_stream` reads back unchanged. A fixture with
//! `run_failure` set fails every run instead, standing in for a flowsheet
//! that does not converge.

use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use std::time::Instant;

use ap_case::CaseFile;
use ap_core::{Stream, UnitSet};
use chrono::Utc;
use tracing::{debug, info};

use crate::backend::{Backend, RunReport};
use crate::error::{AspenError, AspenResult};

/// Named fixtures served without touching the filesystem.
///
/// The catalog outlives sessions: saving a catalog case writes back here, and
/// a later `open_case` in a new connection sees the saved state.
#[derive(Debug, Clone)]
pub struct MockCatalog {
    cases: BTreeMap<PathBuf, CaseFile>,
}

impl MockCatalog {
    /// An empty catalog; only files on disk can be opened.
    pub fn empty() -> Self {
        Self {
            cases: BTreeMap::new(),
        }
    }

    /// The built-in sample cases (`example.bkp`, `column.bkp`).
    pub fn builtin() -> Self {
        let mut catalog = Self::empty();
        for (path, case) in ap_case::samples::builtin_cases() {
            catalog.insert(path, case);
        }
        catalog
    }

    pub fn insert(&mut self, path: impl AsRef<Path>, case: CaseFile) {
        self.cases.insert(catalog_key(path.as_ref()), case);
    }

    pub fn get(&self, path: &Path) -> Option<&CaseFile> {
        self.cases.get(&catalog_key(path))
    }

    pub fn contains(&self, path: &Path) -> bool {
        self.cases.contains_key(&catalog_key(path))
    }
}

/// `./example.bkp` and `example.bkp` name the same entry.
fn catalog_key(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::builtin()
    }
}

/// State of one opened case.
#[derive(Debug, Clone)]
struct MockSession {
    path: PathBuf,
    name: String,
    units: UnitSet,
    run_failure: Option<String>,
    streams: BTreeMap<String, Stream>,
    solved: bool,
}

impl MockSession {
    fn from_case(path: &Path, case: CaseFile) -> Self {
        let streams = case
            .streams
            .into_iter()
            .map(|s| (s.name.clone(), s))
            .collect();
        Self {
            path: path.to_path_buf(),
            name: case.name,
            units: case.units,
            run_failure: case.run_failure,
            streams,
            solved: false,
        }
    }

    fn to_case(&self) -> CaseFile {
        CaseFile {
            version: ap_case::LATEST_VERSION,
            name: self.name.clone(),
            units: self.units,
            streams: self.streams.values().cloned().collect(),
            run_failure: self.run_failure.clone(),
        }
    }
}

/// Backend that simulates case state in memory.
#[derive(Debug, Default)]
pub struct MockBackend {
    catalog: MockCatalog,
    ready: bool,
    session: Option<MockSession>,
}

impl MockBackend {
    /// Mock backend serving the built-in sample cases.
    pub fn new() -> Self {
        Self::with_catalog(MockCatalog::builtin())
    }

    pub fn with_catalog(catalog: MockCatalog) -> Self {
        Self {
            catalog,
            ready: false,
            session: None,
        }
    }

    pub fn catalog(&self) -> &MockCatalog {
        &self.catalog
    }

    /// Whether the open case has been run since it was loaded or last changed.
    pub fn is_solved(&self) -> bool {
        self.session.as_ref().is_some_and(|s| s.solved)
    }

    fn ensure_ready(&self) -> AspenResult<()> {
        if self.ready {
            Ok(())
        } else {
            Err(AspenError::connection("mock backend not connected"))
        }
    }

    fn session_mut(&mut self) -> AspenResult<&mut MockSession> {
        self.ensure_ready()?;
        self.session.as_mut().ok_or(AspenError::NoCaseOpen)
    }

    fn load(&self, path: &Path) -> AspenResult<CaseFile> {
        if let Some(case) = self.catalog.get(path) {
            return Ok(case.clone());
        }
        if !path.exists() {
            return Err(AspenError::CaseNotFound {
                path: path.to_path_buf(),
            });
        }
        ap_case::load(path).map_err(|source| AspenError::CaseFileRead {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl Backend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn connect(&mut self) -> AspenResult<()> {
        self.ready = true;
        Ok(())
    }

    fn open_case(&mut self, path: &Path) -> AspenResult<()> {
        self.ensure_ready()?;
        // Resolve fully before touching the session.
        let case = self.load(path)?;
        let session = MockSession::from_case(path, case);
        info!(
            case = %path.display(),
            streams = session.streams.len(),
            "mock case opened"
        );
        self.session = Some(session);
        Ok(())
    }

    fn run(&mut self) -> AspenResult<RunReport> {
        let started_at = Utc::now();
        let started = Instant::now();
        let session = self.session_mut()?;

        if let Some(message) = &session.run_failure {
            return Err(AspenError::run(message.clone()));
        }

        session.solved = true;
        Ok(RunReport::finished(started_at, started.elapsed(), "mock"))
    }

    fn get_streams(&mut self) -> AspenResult<Vec<Stream>> {
        let session = self.session_mut()?;
        Ok(session.streams.values().cloned().collect())
    }

    fn set_stream(&mut self, name: &str, stream: &Stream) -> AspenResult<()> {
        let session = self.session_mut()?;
        debug!(stream = name, "mock stream upsert");
        session
            .streams
            .insert(name.to_string(), stream.clone().renamed(name));
        session.solved = false;
        Ok(())
    }

    fn save(&mut self, path: Option<&Path>) -> AspenResult<PathBuf> {
        let session = self.session_mut()?;
        let target = path.map_or_else(|| session.path.clone(), Path::to_path_buf);
        let case = session.to_case();

        if self.catalog.contains(&target) {
            self.catalog.insert(&target, case);
        } else {
            ap_case::save(&target, &case).map_err(|source| AspenError::CaseFileWrite {
                path: target.clone(),
                source,
            })?;
        }

        info!(case = %target.display(), "mock case saved");
        Ok(target)
    }

    fn close(&mut self) -> AspenResult<()> {
        self.session = None;
        self.ready = false;
        Ok(())
    }

    fn case_path(&self) -> Option<&Path> {
        self.session.as_ref().map(|s| s.path.as_path())
    }

    fn units(&self) -> UnitSet {
        self.session.as_ref().map_or(UnitSet::Si, |s| s.units)
    }
}
