#![forbid(unsafe_code)]
//! rowstream: chunked, typed streaming access to Parquet objects in object storage.
//!
//! Re-exports the workspace crates under one name:
//! - [`rowstream_core`]: `Record`, schemas, scalars, `StreamConfig`.
//! - [`rowstream_io`]: stores, `ChunkedReader`, `BufferedWriter`.

pub use rowstream_core::{config, prelude, record, schema, types};
pub use rowstream_io::{
    arrow_convert, engine, error, readers, storage, writers, BufferedWriter, ChunkedReader,
    CloseError, Error, FsStore, MemoryStore, ObjectLocation, ObjectStore, Result, WriteOptions,
};
