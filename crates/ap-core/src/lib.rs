//! ap-core: shared vocabulary for aspenflow.
//!
//! Contains:
//! - stream (the `Stream` record every backend reads and writes)
//! - units (Aspen unit sets + uom constructors)
//! - numeric (Real + tolerances + float helpers)
//! - error (shared error types)

pub mod error;
pub mod numeric;
pub mod stream;
pub mod units;

// Re-exports: nice ergonomics for downstream crates
pub use error::{CoreError, CoreResult};
pub use numeric::*;
pub use stream::{Composition, Stream, parse_component};
pub use units::*;
