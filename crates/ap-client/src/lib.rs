//! Backend-abstracted client for Aspen Plus.
//!
//! A [`Client`] owns exactly one [`Backend`]: either the in-memory
//! [`MockBackend`] for offline work and tests, or the [`ComBackend`] that
//! drives an installed Aspen Plus through COM automation. Work happens inside
//! a scoped [`Connection`], which releases the backend on every exit path.
//!
//! ```
//! use ap_client::{Client, Stream};
//!
//! # fn main() -> ap_client::AspenResult<()> {
//! let mut client = Client::mock();
//! let mut conn = client.connect()?;
//! conn.open_case("example.bkp")?;
//! conn.set_stream("F1", &Stream::new("F1", 100.0).with_temperature(300.0))?;
//! conn.run()?;
//! let streams = conn.get_streams()?;
//! assert!(streams.iter().any(|s| s.name == "F1" && s.flow == 100.0));
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod client;
pub mod com;
pub mod config;
pub mod error;
pub mod mock;

// Re-export key types for convenience
pub use ap_core::{Composition, Stream, UnitSet};
pub use backend::{Backend, BackendKind, RunReport};
pub use client::{Client, Connection, SessionState};
pub use com::{ComBackend, ComOptions};
pub use config::{ClientConfig, DEFAULT_PROG_ID};
pub use error::{AspenError, AspenResult, ErrorKind};
pub use mock::{MockBackend, MockCatalog};
