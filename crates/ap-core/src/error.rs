use thiserror::Error;

pub type CoreResult<T> = Result<T, CoreError>;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    #[error("Unknown unit set: {name} (expected SI, MET or ENG)")]
    UnknownUnitSet { name: String },

    #[error("Invalid component amount: {input} (expected NAME=VALUE)")]
    InvalidComponent { input: String },
}
