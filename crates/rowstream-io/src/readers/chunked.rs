//! Chunked reader: a remote Parquet object as a pull sequence of typed batches.
//!
//! Supports:
//! - Fixed caller batch size, independent of the file's row-group layout
//! - Row count / row group / chunk count introspection from the footer
//! - Optional background read-ahead (`parallelism > 1`)
//! - Paired close of the decoder and the remote handle

use std::sync::Arc;

use arrow_schema::SchemaRef;
use tracing::{debug, info, trace, warn};

use rowstream_core::config::StreamConfig;
use rowstream_core::record::Record;

use crate::engine::Decoder;
use crate::error::{CloseError, Error, Result};
use crate::storage::{ObjectLocation, ObjectReader, ObjectStore};

/// Rows Parquet decodes per internal step; unrelated to the caller's batch size.
const READ_BATCH_ROWS: usize = 8192;

/// The remote handle and the decoder reading it. Opened together, closed together.
struct Open<T: Record> {
    handle: Arc<dyn ObjectReader>,
    decoder: Decoder<T>,
}

/// Reads a stored Parquet object as batches of `batch_size` records of `T`.
///
/// Not synchronised: one instance serves one caller at a time.
pub struct ChunkedReader<T: Record> {
    location: ObjectLocation,
    open: Option<Open<T>>,
    batch_size: usize,
    num_rows: u64,
    num_row_groups: usize,
    rows_consumed: u64,
    schema: SchemaRef,
    /// Set once the iterator has yielded an error.
    iter_done: bool,
}

impl<T: Record> ChunkedReader<T> {
    /// Open `bucket/key` in `store` and prepare to decode it as `T`.
    ///
    /// # Arguments
    /// * `batch_size` - Records per `next_chunk` call; must be greater than zero
    /// * `parallelism` - Read-ahead depth of the background decoder; `0`/`1` decode inline
    ///
    /// Construction is all-or-nothing: if the decoder cannot start, the remote
    /// handle is closed before the error is returned.
    pub fn open(
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
        batch_size: usize,
        parallelism: usize,
    ) -> Result<Self> {
        if batch_size == 0 {
            return Err(Error::Config("batch size must be greater than zero".into()));
        }
        let location = ObjectLocation::new(bucket, key);
        let handle: Arc<dyn ObjectReader> = store
            .open_read(&location)
            .map_err(|e| Error::open(&location, e))?
            .into();

        let decoder = match Decoder::<T>::open(Arc::clone(&handle), parallelism, READ_BATCH_ROWS) {
            Ok(decoder) => decoder,
            Err(e) => {
                if let Err(close_err) = handle.close() {
                    warn!(%location, error = %close_err, "failed to close handle after decoder init error");
                }
                return Err(e.with_context(location.to_string()));
            }
        };

        let num_rows = decoder.num_rows();
        let num_row_groups = decoder.num_row_groups();
        let schema = decoder.schema();
        debug!(%location, num_rows, num_row_groups, batch_size, "opened chunked reader");

        Ok(Self {
            location,
            open: Some(Open { handle, decoder }),
            batch_size,
            num_rows,
            num_row_groups,
            rows_consumed: 0,
            schema,
            iter_done: false,
        })
    }

    /// Open using the location, batch size and parallelism from `cfg`.
    pub fn open_with_config(store: &dyn ObjectStore, cfg: &StreamConfig) -> Result<Self> {
        cfg.validate()?;
        Self::open(store, &cfg.bucket, &cfg.key, cfg.batch_size, cfg.parallelism)
    }

    pub fn location(&self) -> &ObjectLocation {
        &self.location
    }

    /// Get the configured batch size.
    pub fn batch_size(&self) -> usize {
        self.batch_size
    }

    /// Total rows recorded in the file footer.
    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    pub fn num_row_groups(&self) -> usize {
        self.num_row_groups
    }

    /// `num_rows / batch_size + 1`.
    ///
    /// Always counts one extra chunk, so when the row count divides evenly the
    /// final `next_chunk` returns an empty batch.
    pub fn num_chunks(&self) -> usize {
        (self.num_rows / self.batch_size as u64) as usize + 1
    }

    pub fn rows_consumed(&self) -> u64 {
        self.rows_consumed
    }

    pub fn rows_remaining(&self) -> u64 {
        self.num_rows.saturating_sub(self.rows_consumed)
    }

    /// Arrow schema stored in the file.
    pub fn arrow_schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    pub fn is_closed(&self) -> bool {
        self.open.is_none()
    }

    /// Read the next batch of records.
    ///
    /// The returned vector holds only real records: `batch_size` of them, fewer
    /// for the last chunk, and none once the file is exhausted. A decode error
    /// is permanent; the rows it covered are never delivered.
    pub fn next_chunk(&mut self) -> Result<Vec<T>> {
        let open = self.open.as_mut().ok_or(Error::Closed("chunked reader"))?;
        let rows = open.decoder.fill_batch(self.batch_size)?;
        if rows.is_empty() && self.rows_remaining() > 0 {
            return Err(Error::Decode(format!(
                "stream ended with {} of {} rows unread",
                self.rows_remaining(),
                self.num_rows
            )));
        }
        self.rows_consumed += rows.len() as u64;
        trace!(
            location = %self.location,
            rows = rows.len(),
            consumed = self.rows_consumed,
            "read chunk"
        );
        Ok(rows)
    }

    /// Stop the decoder, then close the remote handle.
    ///
    /// Both steps always run; any failures are reported together in
    /// `Error::Close`. A second call returns `Error::Closed`.
    pub fn close(&mut self) -> Result<()> {
        let Open { handle, mut decoder } = self.open.take().ok_or(Error::Closed("chunked reader"))?;
        let format = decoder.stop();
        drop(decoder);
        let storage = handle.close();
        CloseError::from_parts(storage, format)?;
        info!(location = %self.location, rows_consumed = self.rows_consumed, "closed chunked reader");
        Ok(())
    }
}

impl<T: Record> Iterator for ChunkedReader<T> {
    type Item = Result<Vec<T>>;

    /// Yields non-empty chunks; ends when the file is exhausted, the reader is
    /// closed, or after the first error has been yielded.
    fn next(&mut self) -> Option<Self::Item> {
        if self.is_closed() || self.iter_done {
            return None;
        }
        match self.next_chunk() {
            Ok(rows) if rows.is_empty() => None,
            Err(e) => {
                self.iter_done = true;
                Some(Err(e))
            }
            ok => Some(ok),
        }
    }
}

impl<T: Record> Drop for ChunkedReader<T> {
    fn drop(&mut self) {
        if self.open.is_some() {
            if let Err(e) = self.close() {
                warn!(location = %self.location, error = %e, "error closing chunked reader on drop");
            }
        }
    }
}
