//! Footer-only inspection of a stored Parquet object, without a record type.

use std::sync::Arc;

use arrow_schema::SchemaRef;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use crate::engine::decoder::RemoteChunks;
use crate::error::{Error, Result};
use crate::storage::{ObjectLocation, ObjectReader, ObjectStore};

#[derive(Debug, Clone)]
pub struct FileSummary {
    pub size_bytes: u64,
    pub num_rows: u64,
    pub schema: SchemaRef,
    /// Row count of each row group, in file order.
    pub row_group_rows: Vec<u64>,
}

impl FileSummary {
    pub fn num_row_groups(&self) -> usize {
        self.row_group_rows.len()
    }

    /// Chunk count a reader with `batch_size` would report.
    pub fn num_chunks(&self, batch_size: usize) -> usize {
        (self.num_rows / batch_size.max(1) as u64) as usize + 1
    }
}

/// Read the footer of `location` and close the handle again.
pub fn describe(store: &dyn ObjectStore, location: &ObjectLocation) -> Result<FileSummary> {
    let handle: Arc<dyn ObjectReader> = store
        .open_read(location)
        .map_err(|e| Error::open(location, e))?
        .into();
    let size_bytes = handle.len();
    let summary = ParquetRecordBatchReaderBuilder::try_new(RemoteChunks::new(Arc::clone(&handle)))
        .map_err(|e| Error::DecodeInit(format!("cannot read Parquet footer: {}", e)))
        .map(|builder| {
            let metadata = builder.metadata();
            FileSummary {
                size_bytes,
                num_rows: metadata.file_metadata().num_rows().max(0) as u64,
                schema: builder.schema().clone(),
                row_group_rows: metadata
                    .row_groups()
                    .iter()
                    .map(|rg| rg.num_rows().max(0) as u64)
                    .collect(),
            }
        });
    let closed = handle.close();
    let summary = summary?;
    closed?;
    Ok(summary)
}
