//! Aspen Plus over COM automation.
//!
//! The backend translates the fixed [`Backend`] contract onto whatever members
//! and tree nodes the installed Aspen version exposes, via the fallback chains
//! in [`NodeMap`] and [`Entrypoints`].

pub mod dispatch;
pub mod object_model;
#[cfg(windows)]
pub mod win32;

use std::path::{Path, PathBuf};
use std::time::Instant;

use ap_core::{Composition, Stream, UnitSet, finite};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::backend::{Backend, RunReport};
use crate::config::ClientConfig;
use crate::error::{AspenError, AspenResult};

pub use dispatch::{AutomationDocument, AutomationServer, DispatchError, DispatchResult, Variant};
pub use object_model::{Entrypoints, NodeMap};

/// COM-specific settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ComOptions {
    pub nodes: NodeMap,
    pub entrypoints: Entrypoints,
    /// Streams to report. Empty means enumerate the streams node.
    pub streams: Vec<String>,
    /// Component ids to read. Empty means enumerate the components node.
    pub components: Vec<String>,
    /// Unit set the flowsheet reports values in.
    pub units: UnitSet,
}

/// Backend driving a live Aspen Plus document.
pub struct ComBackend {
    prog_id: String,
    visible: bool,
    suppress_dialogs: bool,
    options: ComOptions,
    server: Box<dyn AutomationServer>,
    document: Option<Box<dyn AutomationDocument>>,
    case_path: Option<PathBuf>,
}

impl ComBackend {
    /// Backend using the platform's automation server.
    pub fn new(config: &ClientConfig) -> Self {
        Self::with_server(config, default_server())
    }

    /// Backend using a caller-supplied automation server.
    pub fn with_server(config: &ClientConfig, server: Box<dyn AutomationServer>) -> Self {
        Self {
            prog_id: config.prog_id().to_string(),
            visible: config.visible,
            suppress_dialogs: config.suppress_dialogs,
            options: config.com.clone(),
            server,
            document: None,
            case_path: None,
        }
    }

    pub fn prog_id(&self) -> &str {
        &self.prog_id
    }

    fn document(&mut self) -> AspenResult<&mut (dyn AutomationDocument + 'static)> {
        match self.document.as_deref_mut() {
            Some(doc) => Ok(doc),
            None => Err(AspenError::connection("COM backend not connected")),
        }
    }

    /// Document plus the pieces of configuration needed alongside it.
    fn open_document(
        &mut self,
    ) -> AspenResult<(&mut (dyn AutomationDocument + 'static), &ComOptions)> {
        if self.case_path.is_none() {
            // Connection problems take precedence over a missing case.
            self.document()?;
            return Err(AspenError::NoCaseOpen);
        }
        match self.document.as_deref_mut() {
            Some(doc) => Ok((doc, &self.options)),
            None => Err(AspenError::connection("COM backend not connected")),
        }
    }

    fn configure_window(&mut self) {
        let visible = self.visible;
        let suppress = self.suppress_dialogs;
        let visible_members = self.options.entrypoints.visible.clone();
        let suppress_member = self.options.entrypoints.suppress_dialogs.clone();
        let Ok(doc) = self.document() else {
            return;
        };

        if let Some(member) = first_member(doc, &visible_members) {
            if let Err(e) = doc.put(&member, Variant::Bool(visible)) {
                debug!(member = %member, error = %e, "could not set visibility");
            }
        }
        if doc.has_member(&suppress_member) {
            if let Err(e) = doc.put(&suppress_member, Variant::Int(i64::from(suppress))) {
                debug!(member = %suppress_member, error = %e, "could not suppress dialogs");
            }
        }
    }
}

#[cfg(windows)]
fn default_server() -> Box<dyn AutomationServer> {
    Box::new(win32::ComServer)
}

#[cfg(not(windows))]
fn default_server() -> Box<dyn AutomationServer> {
    Box::new(dispatch::UnsupportedPlatform)
}

fn first_member(doc: &mut dyn AutomationDocument, candidates: &[String]) -> Option<String> {
    candidates.iter().find(|m| doc.has_member(m)).cloned()
}

/// First finite number found along a fallback chain of node paths.
fn read_first(doc: &mut dyn AutomationDocument, paths: &[String]) -> Option<f64> {
    for path in paths {
        match doc.read_node(path) {
            Ok(value) => {
                if let Some(v) = value.as_f64().and_then(finite) {
                    return Some(v);
                }
            }
            Err(DispatchError::NodeNotFound { .. }) => {}
            Err(e) => debug!(node = %path, error = %e, "node read failed, trying next"),
        }
    }
    None
}

/// Write along a fallback chain; returns the path that took the value.
fn write_first(doc: &mut dyn AutomationDocument, paths: &[String], value: f64) -> Option<String> {
    for path in paths {
        match doc.write_node(path, Variant::Real(value)) {
            Ok(()) => return Some(path.clone()),
            Err(e) => debug!(node = %path, error = %e, "node write failed, trying next"),
        }
    }
    None
}

fn names_or_children(
    doc: &mut dyn AutomationDocument,
    configured: &[String],
    root: &str,
) -> DispatchResult<Vec<String>> {
    if configured.is_empty() {
        doc.node_children(root)
    } else {
        Ok(configured.to_vec())
    }
}

impl Backend for ComBackend {
    fn name(&self) -> &str {
        "com"
    }

    fn connect(&mut self) -> AspenResult<()> {
        if self.document.is_some() {
            return Ok(());
        }
        let document = self.server.create(&self.prog_id).map_err(|e| {
            AspenError::connection(format!(
                "Failed to create Aspen automation object '{}': {}",
                self.prog_id, e
            ))
        })?;
        self.document = Some(document);
        self.configure_window();
        info!(prog_id = %self.prog_id, "COM document dispatched");
        Ok(())
    }

    fn open_case(&mut self, path: &Path) -> AspenResult<()> {
        let open_members = self.options.entrypoints.open.clone();
        let doc = self.document()?;
        if !path.exists() {
            return Err(AspenError::CaseNotFound {
                path: path.to_path_buf(),
            });
        }

        let member = first_member(doc, &open_members).ok_or_else(|| {
            AspenError::case("No known method to open a case on this Aspen automation object")
        })?;
        let arg = Variant::Text(path.to_string_lossy().into_owned());
        doc.call(&member, &[arg]).map_err(|e| {
            AspenError::case(format!("Failed to open case '{}': {}", path.display(), e))
        })?;

        info!(case = %path.display(), via = %member, "COM case opened");
        self.case_path = Some(path.to_path_buf());
        Ok(())
    }

    fn run(&mut self) -> AspenResult<RunReport> {
        let started_at = Utc::now();
        let started = Instant::now();
        let (doc, options) = self.open_document()?;
        let entry = &options.entrypoints;

        let member = first_member(doc, &entry.run)
            .ok_or_else(|| AspenError::run("No run entry point on the Aspen automation object"))?;
        doc.call(&member, &[])
            .map_err(|e| AspenError::run(format!("Aspen run failed: {}", e)))?;

        // A document without the member reports nothing; one that has it must
        // answer with a flag.
        if doc.has_member(&entry.converged) {
            let value = doc.get(&entry.converged).map_err(|e| {
                AspenError::run(format!("Cannot read convergence status: {}", e))
            })?;
            let converged = value.as_bool().ok_or_else(|| {
                AspenError::run(format!("Convergence status is not a flag: {}", value))
            })?;
            if !converged {
                return Err(AspenError::run(format!(
                    "Aspen run did not converge (after {:.1} s)",
                    started.elapsed().as_secs_f64()
                )));
            }
        }

        let report = RunReport::finished(started_at, started.elapsed(), &member);
        info!(via = %member, seconds = report.duration.as_secs_f64(), "COM run finished");
        Ok(report)
    }

    fn get_streams(&mut self) -> AspenResult<Vec<Stream>> {
        let (doc, options) = self.open_document()?;
        let nodes = &options.nodes;

        let names = names_or_children(doc, &options.streams, &nodes.streams_root)
            .map_err(|e| AspenError::case(format!("Cannot enumerate streams: {}", e)))?;
        let components = match names_or_children(doc, &options.components, &nodes.components_root) {
            Ok(c) => c,
            Err(e) => {
                debug!(error = %e, "cannot enumerate components, reading none");
                Vec::new()
            }
        };

        let mut streams = Vec::with_capacity(names.len());
        for name in names {
            let temperature = read_first(doc, &nodes.expand(&nodes.output_temperature, &name, None));
            let pressure = read_first(doc, &nodes.expand(&nodes.output_pressure, &name, None));

            let mut composition = Composition::new();
            for component in &components {
                let paths = nodes.expand(&nodes.output_component, &name, Some(component));
                if let Some(v) = read_first(doc, &paths) {
                    composition.insert(component.clone(), v);
                }
            }

            let flow = read_first(doc, &nodes.expand(&nodes.output_total_flow, &name, None))
                .unwrap_or_else(|| composition.values().sum());

            streams.push(Stream {
                name,
                flow,
                temperature,
                pressure,
                composition: (!composition.is_empty()).then_some(composition),
            });
        }
        Ok(streams)
    }

    fn set_stream(&mut self, name: &str, stream: &Stream) -> AspenResult<()> {
        let (doc, options) = self.open_document()?;
        let nodes = &options.nodes;

        if let Some(t) = stream.temperature {
            write_first(doc, &nodes.expand(&nodes.input_temperature, name, None), t).ok_or_else(
                || AspenError::case(format!("Failed to set stream temperature for '{}'", name)),
            )?;
        }
        if let Some(p) = stream.pressure {
            write_first(doc, &nodes.expand(&nodes.input_pressure, name, None), p).ok_or_else(
                || AspenError::case(format!("Failed to set stream pressure for '{}'", name)),
            )?;
        }

        // Flow specifications depend on how the stream is defined in the
        // flowsheet; nodes that do not exist are skipped.
        if write_first(doc, &nodes.expand(&nodes.input_total_flow, name, None), stream.flow).is_none() {
            debug!(stream = name, "no total flow input node");
        }
        if let Some(composition) = &stream.composition {
            for (component, amount) in composition {
                let paths = nodes.expand(&nodes.input_component, name, Some(component));
                if write_first(doc, &paths, *amount).is_none() {
                    debug!(stream = name, component = %component, "component input node missing");
                }
            }
        }

        debug!(stream = name, "COM stream written");
        Ok(())
    }

    fn save(&mut self, path: Option<&Path>) -> AspenResult<PathBuf> {
        let case_path = self.case_path.clone();
        let (doc, options) = self.open_document()?;
        let entry = &options.entrypoints;

        let target = match path {
            Some(p) => {
                let arg = Variant::Text(p.to_string_lossy().into_owned());
                doc.call(&entry.save_as, &[arg]).map_err(|e| {
                    AspenError::case(format!("Failed to save case to '{}': {}", p.display(), e))
                })?;
                p.to_path_buf()
            }
            None => {
                doc.call(&entry.save, &[])
                    .map_err(|e| AspenError::case(format!("Failed to save case: {}", e)))?;
                case_path.ok_or(AspenError::NoCaseOpen)?
            }
        };

        info!(case = %target.display(), "COM case saved");
        Ok(target)
    }

    fn close(&mut self) -> AspenResult<()> {
        self.case_path = None;
        let Some(mut doc) = self.document.take() else {
            return Ok(());
        };
        let close = &self.options.entrypoints.close;
        if doc.has_member(close) {
            if let Err(e) = doc.call(close, &[]) {
                warn!(error = %e, "Aspen document did not close cleanly");
            }
        }
        info!("COM document released");
        Ok(())
    }

    fn case_path(&self) -> Option<&Path> {
        self.case_path.as_deref()
    }

    fn units(&self) -> UnitSet {
        self.options.units
    }
}
