use std::cell::Cell;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::rc::Rc;

use ap_client::com::dispatch::{AutomationDocument, AutomationServer, DispatchError, DispatchResult, Variant};
use ap_client::*;

/// Mock backend that counts lifecycle calls.
struct Counting {
    inner: MockBackend,
    connects: Rc<Cell<u32>>,
    closes: Rc<Cell<u32>>,
}

impl Counting {
    fn new(catalog: MockCatalog) -> (Self, Rc<Cell<u32>>, Rc<Cell<u32>>) {
        let connects = Rc::new(Cell::new(0));
        let closes = Rc::new(Cell::new(0));
        let backend = Self {
            inner: MockBackend::with_catalog(catalog),
            connects: Rc::clone(&connects),
            closes: Rc::clone(&closes),
        };
        (backend, connects, closes)
    }
}

impl Backend for Counting {
    fn name(&self) -> &str {
        "counting"
    }

    fn connect(&mut self) -> AspenResult<()> {
        self.connects.set(self.connects.get() + 1);
        self.inner.connect()
    }

    fn open_case(&mut self, path: &Path) -> AspenResult<()> {
        self.inner.open_case(path)
    }

    fn run(&mut self) -> AspenResult<RunReport> {
        self.inner.run()
    }

    fn get_streams(&mut self) -> AspenResult<Vec<Stream>> {
        self.inner.get_streams()
    }

    fn set_stream(&mut self, name: &str, stream: &Stream) -> AspenResult<()> {
        self.inner.set_stream(name, stream)
    }

    fn save(&mut self, path: Option<&Path>) -> AspenResult<PathBuf> {
        self.inner.save(path)
    }

    fn close(&mut self) -> AspenResult<()> {
        self.closes.set(self.closes.get() + 1);
        self.inner.close()
    }

    fn case_path(&self) -> Option<&Path> {
        self.inner.case_path()
    }
}

fn diverging_catalog() -> MockCatalog {
    let mut case = ap_case::samples::example_case();
    case.run_failure = Some("Flowsheet did not converge".to_string());
    let mut catalog = MockCatalog::builtin();
    catalog.insert("diverges.bkp", case);
    catalog
}

#[test]
fn close_runs_once_when_run_fails_in_scope() {
    let (backend, connects, closes) = Counting::new(diverging_catalog());
    let mut client = Client::with_backend(backend);

    let result = client.with_connection(|conn| {
        conn.open_case("diverges.bkp")?;
        conn.run()
    });

    let err = result.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Run);
    assert_eq!(connects.get(), 1);
    assert_eq!(closes.get(), 1);
    assert_eq!(client.state(), SessionState::Disconnected);
}

#[test]
fn close_runs_once_on_early_return() {
    fn first_flow(client: &mut Client) -> AspenResult<f64> {
        let mut conn = client.connect()?;
        conn.open_case("diverges.bkp")?;
        conn.run()?;
        let streams = conn.get_streams()?;
        Ok(streams[0].flow)
    }

    let (backend, _, closes) = Counting::new(diverging_catalog());
    let mut client = Client::with_backend(backend);
    assert!(first_flow(&mut client).is_err());
    assert_eq!(closes.get(), 1);
}

#[test]
fn close_runs_once_on_panic() {
    let (backend, _, closes) = Counting::new(MockCatalog::builtin());
    let mut client = Client::with_backend(backend);

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut conn = client.connect().unwrap();
        conn.open_case("example.bkp").unwrap();
        panic!("caller bug inside the scope");
    }));

    assert!(outcome.is_err());
    assert_eq!(closes.get(), 1);
    assert_eq!(client.state(), SessionState::Disconnected);
}

#[test]
fn explicit_close_is_not_repeated_on_drop() {
    let (backend, _, closes) = Counting::new(MockCatalog::builtin());
    let mut client = Client::with_backend(backend);
    {
        let mut conn = client.connect().unwrap();
        conn.open_case("example.bkp").unwrap();
        conn.finish().unwrap();
    }
    client.close().unwrap();
    assert_eq!(closes.get(), 1);
}

#[test]
fn close_through_connection_inside_scope_closes_once() {
    let (backend, _, closes) = Counting::new(MockCatalog::builtin());
    let mut client = Client::with_backend(backend);

    let flow = client
        .with_connection(|conn| {
            conn.open_case("example.bkp")?;
            let flow = conn.get_streams()?[0].flow;
            conn.close()?;
            Ok(flow)
        })
        .unwrap();

    assert_eq!(flow, 100.0);
    assert_eq!(closes.get(), 1);
    assert_eq!(client.state(), SessionState::Disconnected);
}

#[test]
fn each_scope_closes_its_own_connect() {
    let (backend, connects, closes) = Counting::new(MockCatalog::builtin());
    let mut client = Client::with_backend(backend);
    for _ in 0..3 {
        let mut conn = client.connect().unwrap();
        conn.open_case("column.bkp").unwrap();
    }
    assert_eq!(connects.get(), 3);
    assert_eq!(closes.get(), 3);
}

/// Automation server whose documents accept nothing.
struct InertServer;

struct InertDocument;

impl AutomationServer for InertServer {
    fn create(&self, _prog_id: &str) -> DispatchResult<Box<dyn AutomationDocument>> {
        Ok(Box::new(InertDocument))
    }
}

impl AutomationDocument for InertDocument {
    fn has_member(&mut self, _member: &str) -> bool {
        false
    }

    fn call(&mut self, member: &str, _args: &[Variant]) -> DispatchResult<Variant> {
        Err(DispatchError::UnknownMember {
            member: member.to_string(),
        })
    }

    fn get(&mut self, member: &str) -> DispatchResult<Variant> {
        Err(DispatchError::UnknownMember {
            member: member.to_string(),
        })
    }

    fn put(&mut self, member: &str, _value: Variant) -> DispatchResult<()> {
        Err(DispatchError::UnknownMember {
            member: member.to_string(),
        })
    }

    fn read_node(&mut self, path: &str) -> DispatchResult<Variant> {
        Err(DispatchError::NodeNotFound {
            path: path.to_string(),
        })
    }

    fn write_node(&mut self, path: &str, _value: Variant) -> DispatchResult<()> {
        Err(DispatchError::NodeNotFound {
            path: path.to_string(),
        })
    }

    fn node_children(&mut self, path: &str) -> DispatchResult<Vec<String>> {
        Err(DispatchError::NodeNotFound {
            path: path.to_string(),
        })
    }
}

fn com_client() -> Client {
    let config = ClientConfig::com(None);
    Client::with_backend(ComBackend::with_server(&config, Box::new(InertServer)))
}

fn state_errors(client: &mut Client) -> Vec<String> {
    let mut conn = client.connect().unwrap();
    let errors = vec![
        conn.run().map(|_| ()).unwrap_err(),
        conn.get_streams().map(|_| ()).unwrap_err(),
        conn.set_stream("F1", &Stream::new("F1", 1.0)).unwrap_err(),
        conn.save(None).map(|_| ()).unwrap_err(),
    ];
    errors
        .into_iter()
        .map(|e| {
            assert_eq!(e.kind(), ErrorKind::State);
            e.to_string()
        })
        .collect()
}

#[test]
fn both_backends_reject_work_before_open_identically() {
    let mock = state_errors(&mut Client::mock());
    let com = state_errors(&mut com_client());
    assert_eq!(mock, com);
    assert!(mock[0].contains("run"));
}

#[test]
fn both_backends_reject_work_when_disconnected() {
    for mut client in [Client::mock(), com_client()] {
        let err = client.open_case("example.bkp").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::State);
        assert!(err.to_string().contains("disconnected"));
    }
}
