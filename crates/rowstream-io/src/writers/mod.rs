//! Writers into stored objects.

pub mod buffered;

pub use buffered::BufferedWriter;
