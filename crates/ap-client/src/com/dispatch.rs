//! Late-bound automation seam.
//!
//! Aspen Plus exposes its object model only through `IDispatch`, and member
//! and node names move between installed versions. The COM backend therefore
//! talks to the application through these two traits, using names it looks up
//! at runtime. The Windows implementation lives in `win32`; tests supply an
//! in-memory document.

use std::fmt;

/// A value crossing the automation boundary.
#[derive(Debug, Clone, PartialEq)]
pub enum Variant {
    Empty,
    Bool(bool),
    Int(i64),
    Real(f64),
    Text(String),
}

impl Variant {
    /// Numeric view; text is parsed, booleans and empty values are not numbers.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Variant::Real(v) => Some(*v),
            Variant::Int(v) => Some(*v as f64),
            Variant::Text(s) => s.trim().parse().ok(),
            Variant::Bool(_) | Variant::Empty => None,
        }
    }

    /// Truth view following automation conventions (non-zero is true).
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Variant::Bool(b) => Some(*b),
            Variant::Int(v) => Some(*v != 0),
            Variant::Real(v) => Some(*v != 0.0),
            Variant::Text(_) | Variant::Empty => None,
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Variant::Empty => f.write_str("<empty>"),
            Variant::Bool(b) => write!(f, "{}", b),
            Variant::Int(v) => write!(f, "{}", v),
            Variant::Real(v) => write!(f, "{}", v),
            Variant::Text(s) => write!(f, "{:?}", s),
        }
    }
}

pub type DispatchResult<T> = Result<T, DispatchError>;

/// Failures reported by an automation server.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DispatchError {
    #[error("Automation unavailable: {message}")]
    Unavailable { message: String },

    #[error("Unknown member: {member}")]
    UnknownMember { member: String },

    #[error("Node not found: {path}")]
    NodeNotFound { path: String },

    #[error("Call to {member} failed: {message}")]
    Call { member: String, message: String },
}

/// Creates application documents from a programmatic identifier.
pub trait AutomationServer {
    fn create(&self, prog_id: &str) -> DispatchResult<Box<dyn AutomationDocument>>;
}

/// One live application document.
///
/// Members are addressed by dotted paths from the document object
/// (`"Engine.Run2"`); tree nodes by backslash paths passed to the tree's
/// node lookup (`"\Data\Streams\F1\Output\TEMP_OUT\MIXED"`).
pub trait AutomationDocument {
    /// Whether `member` resolves on this installation.
    fn has_member(&mut self, member: &str) -> bool;

    /// Invoke a method.
    fn call(&mut self, member: &str, args: &[Variant]) -> DispatchResult<Variant>;

    /// Read a property.
    fn get(&mut self, member: &str) -> DispatchResult<Variant>;

    /// Write a property.
    fn put(&mut self, member: &str, value: Variant) -> DispatchResult<()>;

    /// Value of a tree node. `NodeNotFound` when the path does not exist.
    fn read_node(&mut self, path: &str) -> DispatchResult<Variant>;

    /// Set the value of a tree node.
    fn write_node(&mut self, path: &str, value: Variant) -> DispatchResult<()>;

    /// Names of the direct children of a tree node.
    fn node_children(&mut self, path: &str) -> DispatchResult<Vec<String>>;
}

/// Server used where COM does not exist.
#[cfg_attr(windows, allow(dead_code))]
pub(crate) struct UnsupportedPlatform;

impl AutomationServer for UnsupportedPlatform {
    fn create(&self, _prog_id: &str) -> DispatchResult<Box<dyn AutomationDocument>> {
        Err(DispatchError::Unavailable {
            message: "COM backend requires Windows and Aspen Plus installed".to_string(),
        })
    }
}
