//! The client facade and its scoped connection.

use std::fmt;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};

use ap_core::{Stream, UnitSet};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{Backend, BackendKind, RunReport};
use crate::com::ComBackend;
use crate::config::ClientConfig;
use crate::error::{AspenError, AspenResult};
use crate::mock::MockBackend;

/// Lifecycle of a client session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Disconnected,
    Connected,
    CaseOpen,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionState::Disconnected => f.write_str("disconnected"),
            SessionState::Connected => f.write_str("connected"),
            SessionState::CaseOpen => f.write_str("case open"),
        }
    }
}

const CASE_OPEN: &[SessionState] = &[SessionState::CaseOpen];
const CAN_OPEN: &[SessionState] = &[SessionState::Connected, SessionState::CaseOpen];

/// Client owning exactly one backend.
///
/// Operations delegate to the backend after checking the session state, so
/// misuse fails the same way whichever backend is configured. Obtain a
/// [`Connection`] with [`Client::connect`] to do any work.
pub struct Client {
    backend: Box<dyn Backend>,
    state: SessionState,
    /// Id of the current connection; nil while disconnected.
    session: Uuid,
    default_case: Option<PathBuf>,
}

impl Client {
    pub fn new(config: &ClientConfig) -> Self {
        let backend: Box<dyn Backend> = match config.backend {
            BackendKind::Mock => Box::new(MockBackend::new()),
            BackendKind::Com => Box::new(ComBackend::new(config)),
        };
        Self {
            backend,
            state: SessionState::Disconnected,
            session: Uuid::nil(),
            default_case: config.flowsheet_path.clone(),
        }
    }

    /// Client over the in-memory backend with the built-in sample cases.
    pub fn mock() -> Self {
        Self::new(&ClientConfig::mock())
    }

    /// Client over Aspen Plus; `None` uses [`DEFAULT_PROG_ID`](crate::DEFAULT_PROG_ID).
    pub fn com(prog_id: Option<String>) -> Self {
        Self::new(&ClientConfig::com(prog_id))
    }

    /// Client over a caller-built backend.
    pub fn with_backend(backend: impl Backend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            state: SessionState::Disconnected,
            session: Uuid::nil(),
            default_case: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    pub fn case_path(&self) -> Option<&Path> {
        self.backend.case_path()
    }

    /// Unit set of the open case's values.
    pub fn units(&self) -> UnitSet {
        self.backend.units()
    }

    fn require(&self, operation: &'static str, allowed: &[SessionState]) -> AspenResult<()> {
        if allowed.contains(&self.state) {
            Ok(())
        } else {
            Err(AspenError::State {
                operation,
                state: self.state,
            })
        }
    }

    /// Connect the backend and return a scope that closes it on drop.
    ///
    /// If the configuration names a flowsheet it is opened before returning;
    /// a failure there closes the backend again.
    pub fn connect(&mut self) -> AspenResult<Connection<'_>> {
        self.require("connect", &[SessionState::Disconnected])?;

        let session_id = Uuid::new_v4();
        if let Err(e) = self.backend.connect() {
            if let Err(close_err) = self.backend.close() {
                warn!(session = %session_id, error = %close_err, "release after failed connect also failed");
            }
            return Err(e);
        }
        self.state = SessionState::Connected;
        self.session = session_id;
        info!(session = %session_id, backend = self.backend.name(), "connected");

        let mut conn = Connection {
            client: self,
            session_id,
        };
        if let Some(path) = conn.default_case.clone() {
            conn.open_case(&path)?;
        }
        Ok(conn)
    }

    /// Run `f` inside a connection scope.
    ///
    /// The backend is closed whether `f` succeeds, fails or panics. A close
    /// failure is returned only when `f` succeeded.
    pub fn with_connection<T, F>(&mut self, f: F) -> AspenResult<T>
    where
        F: FnOnce(&mut Connection<'_>) -> AspenResult<T>,
    {
        let mut conn = self.connect()?;
        let out = f(&mut conn)?;
        conn.finish()?;
        Ok(out)
    }

    /// Load a case, replacing any open one.
    pub fn open_case(&mut self, path: impl AsRef<Path>) -> AspenResult<()> {
        let path = path.as_ref();
        self.require("open_case", CAN_OPEN)?;
        self.backend.open_case(path)?;
        self.state = SessionState::CaseOpen;
        info!(session = %self.session, case = %path.display(), "case opened");
        Ok(())
    }

    /// Run the simulation. Blocks until the engine returns.
    pub fn run(&mut self) -> AspenResult<RunReport> {
        self.require("run", CASE_OPEN)?;
        let report = self.backend.run()?;
        info!(
            session = %self.session,
            via = %report.entry_point,
            seconds = report.duration.as_secs_f64(),
            "run finished"
        );
        Ok(report)
    }

    pub fn get_streams(&mut self) -> AspenResult<Vec<Stream>> {
        self.require("get_streams", CASE_OPEN)?;
        self.backend.get_streams()
    }

    /// Write `stream`'s properties to the stream called `name`.
    pub fn set_stream(&mut self, name: &str, stream: &Stream) -> AspenResult<()> {
        self.require("set_stream", CASE_OPEN)?;
        debug!(session = %self.session, stream = name, flow = stream.flow, "set stream");
        self.backend.set_stream(name, stream)
    }

    /// Save to `path`, or over the opened case. Returns where it was written.
    pub fn save(&mut self, path: Option<&Path>) -> AspenResult<PathBuf> {
        self.require("save", CASE_OPEN)?;
        let saved = self.backend.save(path)?;
        info!(session = %self.session, case = %saved.display(), "case saved");
        Ok(saved)
    }

    /// Release the backend. Valid in any state; a no-op when disconnected.
    pub fn close(&mut self) -> AspenResult<()> {
        if self.state == SessionState::Disconnected {
            return Ok(());
        }
        let result = self.backend.close();
        info!(session = %self.session, "disconnected");
        self.state = SessionState::Disconnected;
        self.session = Uuid::nil();
        result
    }
}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("backend", &self.backend.name())
            .field("state", &self.state)
            .field("case", &self.backend.case_path())
            .finish()
    }
}

/// An open session. Dropping it closes the backend exactly once.
///
/// Dereferences to the [`Client`], so every client operation is available on
/// the connection.
pub struct Connection<'a> {
    client: &'a mut Client,
    session_id: Uuid,
}

impl Connection<'_> {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    /// End the scope now and report any release error. `conn.close()` on a
    /// live connection reaches [`Client::close`] instead and leaves the drop
    /// guard a no-op.
    pub fn finish(self) -> AspenResult<()> {
        self.client.close()
    }
}

impl Deref for Connection<'_> {
    type Target = Client;

    fn deref(&self) -> &Client {
        self.client
    }
}

impl DerefMut for Connection<'_> {
    fn deref_mut(&mut self) -> &mut Client {
        self.client
    }
}

impl Drop for Connection<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.client.close() {
            warn!(session = %self.session_id, error = %e, "release on scope exit failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn lifecycle_states() {
        let mut client = Client::mock();
        assert_eq!(client.state(), SessionState::Disconnected);
        {
            let mut conn = client.connect().unwrap();
            assert_eq!(conn.state(), SessionState::Connected);
            conn.open_case("example.bkp").unwrap();
            assert_eq!(conn.state(), SessionState::CaseOpen);
            conn.run().unwrap();
            assert_eq!(conn.state(), SessionState::CaseOpen);
        }
        assert_eq!(client.state(), SessionState::Disconnected);
        assert!(client.case_path().is_none());
    }

    #[test]
    fn operations_need_a_connection() {
        let mut client = Client::mock();
        let err = client.open_case("example.bkp").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        assert_eq!(client.run().unwrap_err().kind(), ErrorKind::State);
        assert_eq!(client.get_streams().unwrap_err().kind(), ErrorKind::State);
    }

    #[test]
    fn operations_need_an_open_case() {
        let mut client = Client::mock();
        let mut conn = client.connect().unwrap();
        for err in [
            conn.run().map(|_| ()).unwrap_err(),
            conn.get_streams().map(|_| ()).unwrap_err(),
            conn.set_stream("F1", &Stream::new("F1", 1.0)).unwrap_err(),
            conn.save(None).map(|_| ()).unwrap_err(),
        ] {
            assert!(
                matches!(err, AspenError::State { state: SessionState::Connected, .. }),
                "{err}"
            );
        }
    }

    #[test]
    fn connect_twice_is_state_error() {
        let mut client = Client::mock();
        let mut conn = client.connect().unwrap();
        let err = conn.connect().map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        assert!(err.to_string().contains("connect"));
    }

    #[test]
    fn close_is_idempotent_and_disconnects() {
        let mut client = Client::mock();
        let mut conn = client.connect().unwrap();
        conn.open_case("example.bkp").unwrap();
        conn.finish().unwrap();
        assert_eq!(client.state(), SessionState::Disconnected);
        client.close().unwrap();
        assert_eq!(client.run().unwrap_err().kind(), ErrorKind::State);
    }

    #[test]
    fn failed_open_keeps_state() {
        let mut client = Client::mock();
        let mut conn = client.connect().unwrap();
        assert!(conn.open_case("no/such/case.bkp").is_err());
        assert_eq!(conn.state(), SessionState::Connected);

        conn.open_case("example.bkp").unwrap();
        let err = conn.open_case("no/such/case.bkp").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Case);
        assert_eq!(conn.state(), SessionState::CaseOpen);
        assert_eq!(conn.case_path(), Some(Path::new("example.bkp")));
    }

    #[test]
    fn configured_flowsheet_opens_on_connect() {
        let config = ClientConfig {
            flowsheet_path: Some(PathBuf::from("column.bkp")),
            ..ClientConfig::mock()
        };
        let mut client = Client::new(&config);
        let mut conn = client.connect().unwrap();
        assert_eq!(conn.state(), SessionState::CaseOpen);
        assert_eq!(conn.get_streams().unwrap().len(), 3);
    }

    #[test]
    fn missing_flowsheet_fails_connect_and_releases() {
        let config = ClientConfig {
            flowsheet_path: Some(PathBuf::from("nowhere.bkp")),
            ..ClientConfig::mock()
        };
        let mut client = Client::new(&config);
        let err = client.connect().map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Case);
        assert_eq!(client.state(), SessionState::Disconnected);
    }

    #[test]
    fn with_connection_returns_value_and_closes() {
        let mut client = Client::mock();
        let flows = client
            .with_connection(|conn| {
                conn.open_case("example.bkp")?;
                let streams = conn.get_streams()?;
                Ok(streams.iter().map(|s| s.flow).sum::<f64>())
            })
            .unwrap();
        assert_eq!(flows, 150.0);
        assert_eq!(client.state(), SessionState::Disconnected);
    }

    #[test]
    fn close_inside_with_connection_is_not_an_error() {
        let mut client = Client::mock();
        let case = client
            .with_connection(|conn| {
                conn.open_case("example.bkp")?;
                let path = conn.case_path().map(Path::to_path_buf);
                conn.close()?;
                assert_eq!(conn.state(), SessionState::Disconnected);
                Ok(path)
            })
            .unwrap();
        assert_eq!(case.as_deref(), Some(Path::new("example.bkp")));
        assert_eq!(client.state(), SessionState::Disconnected);
    }

    #[test]
    fn sessions_get_distinct_ids() {
        let mut client = Client::mock();
        let first = client.connect().unwrap().session_id();
        let second = client.connect().unwrap().session_id();
        assert_ne!(first, second);
    }

    #[test]
    fn com_client_without_aspen_fails_to_connect() {
        // Only meaningful where Aspen is absent; on Windows the outcome
        // depends on the installation.
        if cfg!(windows) {
            return;
        }
        let mut client = Client::com(None);
        assert_eq!(client.backend_name(), "com");
        let err = client.connect().map(|_| ()).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Connection);
        assert_eq!(client.state(), SessionState::Disconnected);
    }
}
