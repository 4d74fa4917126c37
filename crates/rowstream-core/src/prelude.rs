//! Convenience re-exports for record implementors.

pub use crate::config::{Compression, StreamConfig};
pub use crate::error::{Error, Result};
pub use crate::record::Record;
pub use crate::schema::{DataType, Field, Schema};
pub use crate::types::{Row, RowReader, Scalar};
