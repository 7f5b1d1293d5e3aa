//! An in-memory Source Map v3 engine: a VLQ codec for the `mappings`
//! string, an indexed mapping table, a binary snapshot codec for
//! caching, and an `extends` operator for composing maps produced by
//! successive build stages.
//!
//! The crate has no opinion on transport: no JSON envelope, no file
//! I/O, no FFI surface. Callers own the source-map JSON object and
//! pass this crate only the `mappings` string and the parallel
//! sources/names arrays (or a previously captured binary snapshot).

pub mod compose;
pub mod engine;
pub mod error;
pub mod intern;
pub mod segment;
pub mod snapshot;
pub mod table;
pub mod vlq;

pub use engine::SourceMapEngine;
pub use error::{Error, Result};
pub use segment::{IndexedMapping, ResolvedMapping, VlqMappings};

/// The crate's own semantic version, exposed so embedders can record
/// which engine produced a given snapshot.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
