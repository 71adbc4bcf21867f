//! Case fixture schema.

use ap_core::{Stream, UnitSet};
use serde::{Deserialize, Serialize};

pub const LATEST_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseFile {
    pub version: u32,
    pub name: String,
    #[serde(default)]
    pub units: UnitSet,
    #[serde(default)]
    pub streams: Vec<Stream>,
    /// When set, running this case fails with the given message, the way a
    /// flowsheet that does not converge would.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub run_failure: Option<String>,
}

impl CaseFile {
    pub fn new(name: impl Into<String>, units: UnitSet) -> Self {
        Self {
            version: LATEST_VERSION,
            name: name.into(),
            units,
            streams: Vec::new(),
            run_failure: None,
        }
    }

    pub fn with_stream(mut self, stream: Stream) -> Self {
        self.streams.push(stream);
        self
    }

    pub fn stream(&self, name: &str) -> Option<&Stream> {
        self.streams.iter().find(|s| s.name == name)
    }
}
