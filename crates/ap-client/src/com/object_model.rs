//! Names the COM backend looks up in the Aspen object model.
//!
//! Each entry is a fallback chain tried in order; the first that works wins.
//! Defaults cover the common Aspen Plus versions. Installations that differ are
//! handled by overriding entries in the client configuration, so the mapping
//! is checked against a real installation at integration time, not here.

use serde::{Deserialize, Serialize};

/// Placeholder substituted with a component id in component templates.
pub const COMPONENT: &str = "{component}";

/// Tree paths for stream data.
///
/// Stream templates are relative to `<streams_root>\<stream name>`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NodeMap {
    pub streams_root: String,
    pub components_root: String,
    pub input_temperature: Vec<String>,
    pub input_pressure: Vec<String>,
    pub input_total_flow: Vec<String>,
    pub input_component: Vec<String>,
    pub output_temperature: Vec<String>,
    pub output_pressure: Vec<String>,
    pub output_total_flow: Vec<String>,
    pub output_component: Vec<String>,
}

fn paths(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

impl Default for NodeMap {
    fn default() -> Self {
        Self {
            streams_root: r"\Data\Streams".to_string(),
            components_root: r"\Data\Components\Specifications\Input\TYPE".to_string(),
            input_temperature: paths(&[r"Input\TEMP\MIXED", r"Input\TEMP"]),
            input_pressure: paths(&[r"Input\PRES\MIXED", r"Input\PRES"]),
            input_total_flow: paths(&[r"Input\TOTFLOW\MIXED", r"Input\TOTFLOW"]),
            input_component: paths(&[
                r"Input\MOLEFLMX\{component}",
                r"Input\MOLFRAC\{component}",
                r"Input\{component}",
            ]),
            output_temperature: paths(&[
                r"Output\TEMP_OUT\MIXED",
                r"Output\TEMP\MIXED",
                r"Output\TEMP",
            ]),
            output_pressure: paths(&[
                r"Output\PRES_OUT\MIXED",
                r"Output\PRES\MIXED",
                r"Output\PRES",
            ]),
            output_total_flow: paths(&[r"Output\MOLEFLMX\MIXED", r"Output\TOT_FLOW"]),
            output_component: paths(&[
                r"Output\MOLEFLMX\{component}\MIXED",
                r"Output\MASSFLOW3\{component}",
                r"Output\{component}",
            ]),
        }
    }
}

impl NodeMap {
    /// Absolute node path of a stream's subtree.
    pub fn stream_root(&self, stream: &str) -> String {
        format!("{}\\{}", self.streams_root.trim_end_matches('\\'), stream)
    }

    /// Expand templates into absolute paths for one stream (and component).
    pub fn expand(&self, templates: &[String], stream: &str, component: Option<&str>) -> Vec<String> {
        let root = self.stream_root(stream);
        templates
            .iter()
            .map(|t| {
                let rel = match component {
                    Some(c) => t.replace(COMPONENT, c),
                    None => t.clone(),
                };
                format!("{}\\{}", root, rel.trim_start_matches('\\'))
            })
            .collect()
    }
}

/// Document members used for lifecycle operations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Entrypoints {
    pub open: Vec<String>,
    pub run: Vec<String>,
    /// Boolean property read after a run; a missing member counts as converged.
    pub converged: String,
    pub visible: Vec<String>,
    pub suppress_dialogs: String,
    pub save: String,
    pub save_as: String,
    pub close: String,
}

impl Default for Entrypoints {
    fn default() -> Self {
        Self {
            open: paths(&["InitFromArchive2", "InitFromArchive", "InitFromFile", "Open"]),
            run: paths(&["Engine.Run2", "Engine.Run", "Run2", "Run"]),
            converged: "Converged".to_string(),
            visible: paths(&["Visible", "VisibleApp"]),
            suppress_dialogs: "SuppressDialogs".to_string(),
            save: "Save".to_string(),
            save_as: "SaveAs".to_string(),
            close: "Close".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn expands_stream_templates() {
        let map = NodeMap::default();
        let temps = map.expand(&map.output_temperature, "S2", None);
        assert_eq!(temps[0], r"\Data\Streams\S2\Output\TEMP_OUT\MIXED");
        assert_eq!(temps.len(), 3);
    }

    #[test]
    fn expands_component_placeholder() {
        let map = NodeMap::default();
        let flows = map.expand(&map.input_component, "S1", Some("PROPANE"));
        assert_eq!(flows[0], r"\Data\Streams\S1\Input\MOLEFLMX\PROPANE");
        assert_eq!(flows[2], r"\Data\Streams\S1\Input\PROPANE");
    }

    #[test]
    fn tolerates_stray_separators() {
        let map = NodeMap {
            streams_root: r"\Data\Streams\".to_string(),
            ..NodeMap::default()
        };
        let paths = map.expand(&[r"\Input\TEMP".to_string()], "F1", None);
        assert_eq!(paths, [r"\Data\Streams\F1\Input\TEMP"]);
    }

    #[test]
    fn partial_yaml_keeps_defaults() {
        let map: NodeMap = serde_yaml::from_str("output_temperature: ['Output\\TEMP']").unwrap();
        assert_eq!(map.output_temperature, [r"Output\TEMP"]);
        assert_eq!(map.input_pressure, NodeMap::default().input_pressure);
    }
}
