//! ap-case: the plain-text case format understood by the mock backend.
//!
//! A real Aspen archive is opaque to this workspace. For offline development
//! the mock backend reads and writes small YAML or JSON fixtures describing a
//! case's streams instead.

pub mod samples;
pub mod schema;
pub mod validate;

use std::path::Path;

pub use schema::*;
pub use validate::{ValidationError, validate_case};

pub type CaseFileResult<T> = Result<T, CaseFileError>;

#[derive(thiserror::Error, Debug)]
pub enum CaseFileError {
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Stream {stream}: {field} is {value}, which JSON cannot represent")]
    NonFinite {
        stream: String,
        field: String,
        value: f64,
    },
}

/// On-disk encoding of a case fixture.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaseFormat {
    Yaml,
    Json,
}

impl CaseFormat {
    /// `.json` files are JSON; everything else (`.yaml`, `.yml`, `.bkp`, ...)
    /// is read as YAML.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => CaseFormat::Json,
            _ => CaseFormat::Yaml,
        }
    }
}

pub fn load_yaml(path: &Path) -> CaseFileResult<CaseFile> {
    let content = std::fs::read_to_string(path)?;
    let case: CaseFile = serde_yaml::from_str(&content)?;
    validate_case(&case)?;
    Ok(case)
}

pub fn save_yaml(path: &Path, case: &CaseFile) -> CaseFileResult<()> {
    validate_case(case)?;
    let content = serde_yaml::to_string(case)?;
    std::fs::write(path, content)?;
    Ok(())
}

pub fn load_json(path: &Path) -> CaseFileResult<CaseFile> {
    let content = std::fs::read_to_string(path)?;
    let case: CaseFile = serde_json::from_str(&content)?;
    validate_case(&case)?;
    Ok(case)
}

pub fn save_json(path: &Path, case: &CaseFile) -> CaseFileResult<()> {
    validate_case(case)?;
    ensure_finite(case)?;
    let content = serde_json::to_string_pretty(case)?;
    std::fs::write(path, content)?;
    Ok(())
}

/// serde_json writes NaN and infinities as `null`, which does not load back.
fn ensure_finite(case: &CaseFile) -> CaseFileResult<()> {
    for stream in &case.streams {
        let components = stream
            .composition
            .iter()
            .flatten()
            .map(|(c, v)| (c.as_str(), Some(*v)));
        let fields = [
            ("flow", Some(stream.flow)),
            ("temperature", stream.temperature),
            ("pressure", stream.pressure),
        ]
        .into_iter()
        .chain(components);

        for (field, value) in fields {
            if let Some(value) = value.filter(|v| !v.is_finite()) {
                return Err(CaseFileError::NonFinite {
                    stream: stream.name.clone(),
                    field: field.to_string(),
                    value,
                });
            }
        }
    }
    Ok(())
}

/// Load a fixture, picking the format from the file extension.
pub fn load(path: &Path) -> CaseFileResult<CaseFile> {
    match CaseFormat::from_path(path) {
        CaseFormat::Yaml => load_yaml(path),
        CaseFormat::Json => load_json(path),
    }
}

/// Save a fixture, picking the format from the file extension.
pub fn save(path: &Path, case: &CaseFile) -> CaseFileResult<()> {
    match CaseFormat::from_path(path) {
        CaseFormat::Yaml => save_yaml(path, case),
        CaseFormat::Json => save_json(path, case),
    }
}
