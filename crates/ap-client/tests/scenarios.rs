use std::path::PathBuf;

use ap_client::*;
use proptest::prelude::*;

fn temp_path(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("ap_client_{}_{}", std::process::id(), name))
}

fn feed() -> Stream {
    Stream::new("F1", 100.0)
        .with_temperature(300.0)
        .with_pressure(101_325.0)
        .with_component("H2O", 1.0)
}

#[test]
fn mock_example_case_end_to_end() {
    let mut client = Client::mock();
    let mut conn = client.connect().unwrap();
    conn.open_case("example.bkp").unwrap();
    conn.set_stream("F1", &feed()).unwrap();
    conn.run().unwrap();

    let streams = conn.get_streams().unwrap();
    let f1 = streams.iter().find(|s| s.name == "F1").unwrap();
    assert_eq!(f1.flow, 100.0);
    assert_eq!(f1, &feed());
}

#[test]
fn sequential_scopes_do_not_share_state() {
    let mut client = Client::mock();

    {
        let mut conn = client.connect().unwrap();
        conn.open_case("example.bkp").unwrap();
        conn.set_stream("EXTRA", &Stream::new("EXTRA", 1.0)).unwrap();
        assert_eq!(conn.get_streams().unwrap().len(), 3);
    }

    let mut conn = client.connect().unwrap();
    conn.open_case("column.bkp").unwrap();
    let names: Vec<String> = conn
        .get_streams()
        .unwrap()
        .into_iter()
        .map(|s| s.name)
        .collect();
    assert_eq!(names, ["S1", "S2", "S3"]);
    assert_eq!(conn.case_path(), Some(std::path::Path::new("column.bkp")));
}

#[test]
fn unsaved_changes_are_dropped_with_the_session() {
    let mut client = Client::mock();
    client
        .with_connection(|conn| {
            conn.open_case("example.bkp")?;
            conn.set_stream("F2", &Stream::new("F2", 999.0))
        })
        .unwrap();

    let f2 = client
        .with_connection(|conn| {
            conn.open_case("example.bkp")?;
            let streams = conn.get_streams()?;
            Ok(streams.into_iter().find(|s| s.name == "F2"))
        })
        .unwrap()
        .unwrap();
    assert_eq!(f2.flow, 50.0);
}

#[test]
fn saved_file_reopens_in_next_session() {
    let path = temp_path("saved_case.yaml");
    let mut client = Client::mock();

    let written = client
        .with_connection(|conn| {
            conn.open_case("example.bkp")?;
            conn.set_stream("F1", &feed().with_temperature(320.0))?;
            conn.save(Some(path.as_path()))
        })
        .unwrap();
    assert_eq!(written, path);

    let streams = client
        .with_connection(|conn| {
            conn.open_case(&path)?;
            conn.get_streams()
        })
        .unwrap();
    let f1 = streams.iter().find(|s| s.name == "F1").unwrap();
    assert_eq!(f1.temperature, Some(320.0));
    let _ = std::fs::remove_file(&path);
}

#[test]
fn json_save_of_non_finite_stream_is_case_error() {
    let mut client = Client::mock();
    let mut conn = client.connect().unwrap();
    conn.open_case("example.bkp").unwrap();

    let nan_path = temp_path("nan_case.json");
    conn.set_stream("F1", &feed().with_temperature(f64::NAN)).unwrap();
    let err = conn.save(Some(nan_path.as_path())).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Case);
    assert!(!nan_path.exists());

    let inf_path = temp_path("inf_case.json");
    conn.set_stream("F1", &Stream::new("F1", f64::INFINITY)).unwrap();
    let err = conn.save(Some(inf_path.as_path())).unwrap_err();
    assert!(matches!(err, AspenError::CaseFileWrite { .. }));
    assert!(!inf_path.exists());
}

#[test]
fn fixture_on_disk_can_fail_its_run() {
    let path = temp_path("diverging.yaml");
    std::fs::write(
        &path,
        "version: 1\nname: diverging\nunits: MET\nrun_failure: Block B1 did not converge\nstreams:\n  - name: FEED\n    flow: 10.0\n    temperature: 25.0\n",
    )
    .unwrap();

    let mut client = Client::mock();
    let mut conn = client.connect().unwrap();
    conn.open_case(&path).unwrap();
    assert_eq!(conn.units(), UnitSet::Met);

    let err = conn.run().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Run);
    assert!(err.to_string().contains("B1"));

    // The session survives a failed run.
    assert_eq!(conn.state(), SessionState::CaseOpen);
    let streams = conn.get_streams().unwrap();
    assert_eq!(streams[0].temperature, Some(25.0));
    drop(conn);
    let _ = std::fs::remove_file(&path);
}

#[test]
fn missing_case_fails_before_touching_session() {
    let mut client = Client::mock();
    let mut conn = client.connect().unwrap();
    let err = conn.open_case(temp_path("absent.bkp")).unwrap_err();
    assert!(matches!(err, AspenError::CaseNotFound { .. }));
    assert_eq!(err.kind(), ErrorKind::Case);
    assert_eq!(conn.state(), SessionState::Connected);
    assert!(conn.case_path().is_none());
}

#[test]
fn run_report_is_recent() {
    let mut client = Client::mock();
    let report = client
        .with_connection(|conn| {
            conn.open_case("example.bkp")?;
            conn.run()
        })
        .unwrap();
    assert_eq!(report.entry_point, "mock");
    let age = chrono::Utc::now() - report.started_at;
    assert!(age.num_seconds() < 60);
}

fn arb_stream() -> impl Strategy<Value = Stream> {
    (
        "[A-Z][A-Z0-9]{0,5}",
        -1.0e6..1.0e6f64,
        proptest::option::of(100.0..2000.0f64),
        proptest::option::of(1.0..1.0e7f64),
        proptest::option::of(proptest::collection::btree_map(
            "[A-Z][A-Z0-9-]{0,7}",
            0.0..1.0f64,
            1..5,
        )),
    )
        .prop_map(|(name, flow, temperature, pressure, composition)| Stream {
            name,
            flow,
            temperature,
            pressure,
            composition,
        })
}

proptest! {
    #[test]
    fn written_stream_reads_back_through_client(stream in arb_stream(), run in any::<bool>()) {
        let mut client = Client::mock();
        let mut conn = client.connect().unwrap();
        conn.open_case("column.bkp").unwrap();
        conn.set_stream(&stream.name, &stream).unwrap();
        if run {
            conn.run().unwrap();
        }
        let streams = conn.get_streams().unwrap();
        let matching: Vec<&Stream> = streams.iter().filter(|s| s.name == stream.name).collect();
        prop_assert_eq!(matching, vec![&stream]);
    }
}
