//! Readers over stored objects.

pub mod chunked;
pub mod footer;

pub use chunked::ChunkedReader;
pub use footer::{describe, FileSummary};
