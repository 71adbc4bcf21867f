//! Built-in sample cases.
//!
//! The mock backend serves these without touching the filesystem.

use ap_core::{Stream, UnitSet};

use crate::schema::CaseFile;

pub const EXAMPLE_CASE: &str = "example.bkp";
pub const COLUMN_CASE: &str = "column.bkp";

/// Two single-component feeds.
pub fn example_case() -> CaseFile {
    CaseFile::new("example", UnitSet::Si)
        .with_stream(
            Stream::new("F1", 100.0)
                .with_temperature(300.0)
                .with_pressure(101_325.0)
                .with_component("H2O", 1.0),
        )
        .with_stream(
            Stream::new("F2", 50.0)
                .with_temperature(310.0)
                .with_pressure(101_325.0)
                .with_component("Ethanol", 1.0),
        )
}

/// Light hydrocarbon column: feed S1, tops S2, bottoms S3.
///
/// Composition entries are component molar flows. The products carry no
/// results until a real engine solves the column.
pub fn column_case() -> CaseFile {
    let feed = Stream::new("S1", 100.0)
        .with_temperature(322.0)
        .with_pressure(1_740_000.0)
        .with_composition([
            ("ETHANE", 2.0),
            ("PROPANE", 28.0),
            ("I-BUTANE", 18.0),
            ("N-BUTANE", 22.0),
            ("I-PENTAN", 14.0),
            ("N-PENTAN", 16.0),
        ]);

    CaseFile::new("column", UnitSet::Si)
        .with_stream(feed)
        .with_stream(Stream::new("S2", 0.0))
        .with_stream(Stream::new("S3", 0.0))
}

/// All built-in cases keyed by the path they answer to.
pub fn builtin_cases() -> Vec<(&'static str, CaseFile)> {
    vec![(EXAMPLE_CASE, example_case()), (COLUMN_CASE, column_case())]
}
