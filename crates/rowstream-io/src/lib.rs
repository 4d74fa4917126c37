#![forbid(unsafe_code)]
//! rowstream-io: object storage adapters and chunked Parquet streaming.
//!
//! - `storage`: the `ObjectStore` collaborator trait plus `FsStore` and `MemoryStore`.
//! - `arrow_convert`: `Row` <-> Arrow `RecordBatch` conversion.
//! - `engine`: Parquet decoder/encoder bound to a `Record` type.
//! - `readers`: `ChunkedReader`, fixed-size typed batches out of a stored object.
//! - `writers`: `BufferedWriter`, typed records into row groups of a stored object.

pub mod arrow_convert;
pub mod engine;
pub mod error;
pub mod readers;
pub mod storage;
pub mod writers;

pub use error::{CloseError, Error, Result};
pub use readers::ChunkedReader;
pub use storage::{FsStore, MemoryStore, ObjectLocation, ObjectStore, WriteOptions};
pub use writers::BufferedWriter;
