//! Case fixture validation.
//!
//! Structural checks only. Physical plausibility (negative flows, fractions
//! that do not sum to one) is left to the engine.

use crate::schema::{CaseFile, LATEST_VERSION};
use std::collections::HashSet;

#[derive(thiserror::Error, Debug)]
pub enum ValidationError {
    #[error("Unsupported version: {version}")]
    UnsupportedVersion { version: u32 },

    #[error("Empty name in {context}")]
    EmptyName { context: String },

    #[error("Duplicate stream: {name}")]
    DuplicateStream { name: String },
}

pub fn validate_case(case: &CaseFile) -> Result<(), ValidationError> {
    if case.version == 0 || case.version > LATEST_VERSION {
        return Err(ValidationError::UnsupportedVersion {
            version: case.version,
        });
    }

    let mut names = HashSet::new();
    for stream in &case.streams {
        if stream.name.trim().is_empty() {
            return Err(ValidationError::EmptyName {
                context: "streams".to_string(),
            });
        }
        if !names.insert(stream.name.as_str()) {
            return Err(ValidationError::DuplicateStream {
                name: stream.name.clone(),
            });
        }
        if let Some(comp) = &stream.composition {
            if comp.keys().any(|c| c.trim().is_empty()) {
                return Err(ValidationError::EmptyName {
                    context: format!("composition of stream '{}'", stream.name),
                });
            }
        }
    }

    Ok(())
}
