//! Client configuration, loadable from YAML or JSON.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::backend::BackendKind;
use crate::com::ComOptions;
use crate::error::{AspenError, AspenResult};

/// Automation identifier registered by Aspen Plus.
pub const DEFAULT_PROG_ID: &str = "Apwn.Document";

/// How to build a [`Client`](crate::Client).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    pub backend: BackendKind,
    /// COM automation identifier; ignored by the mock backend.
    pub prog_id: Option<String>,
    /// Show the Aspen window while connected.
    pub visible: bool,
    pub suppress_dialogs: bool,
    /// Case opened as soon as a connection is made.
    pub flowsheet_path: Option<PathBuf>,
    pub com: ComOptions,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend: BackendKind::default(),
            prog_id: None,
            visible: false,
            suppress_dialogs: true,
            flowsheet_path: None,
            com: ComOptions::default(),
        }
    }
}

impl ClientConfig {
    pub fn new(backend: BackendKind) -> Self {
        Self {
            backend,
            ..Self::default()
        }
    }

    pub fn mock() -> Self {
        Self::new(BackendKind::Mock)
    }

    pub fn com(prog_id: Option<String>) -> Self {
        Self {
            prog_id,
            ..Self::new(BackendKind::Com)
        }
    }

    /// Effective automation identifier.
    pub fn prog_id(&self) -> &str {
        self.prog_id.as_deref().unwrap_or(DEFAULT_PROG_ID)
    }

    /// Load from `path`; `.json` files are JSON, everything else YAML.
    pub fn load(path: &Path) -> AspenResult<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            AspenError::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        let parsed = if is_json {
            serde_json::from_str(&text).map_err(|e| e.to_string())
        } else {
            serde_yaml::from_str(&text).map_err(|e| e.to_string())
        };
        parsed.map_err(|e| AspenError::Config(format!("invalid {}: {}", path.display(), e)))
    }
}
