#![forbid(unsafe_code)]
//! rowstream-core: shared kernel for rowstream.
//!
//! This crate contains only *pure* types and the traits other crates
//! implement. There is **no I/O** here.
//!
//! Crates that use this:
//! - rowstream-io: encodes/decodes `Record` values to and from Parquet row groups
//!   held in an object store.
//! - rowstream-cli: loads `StreamConfig` and drives the readers/writers.

pub mod config;
pub mod error;
pub mod prelude;
pub mod record;
pub mod schema;
pub mod types;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
