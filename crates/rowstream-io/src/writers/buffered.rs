//! Buffered writer: typed records into a stored Parquet object, one row group
//! at a time.
//!
//! Supports:
//! - Single-record and batch appends
//! - Configurable row group size (in rows) and compression codec
//! - Paired close of the encoder and the remote handle with both failures reported

use std::io::{self, Write};
use std::marker::PhantomData;
use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};

use rowstream_core::config::{Compression, StreamConfig};
use rowstream_core::record::Record;

use crate::engine::Encoder;
use crate::error::{CloseError, Error, Result};
use crate::storage::{lock, ObjectLocation, ObjectStore, ObjectWriter, WriteOptions};

/// Write half of the remote handle, shared between the encoder (which appends)
/// and the owning writer (which finalizes it on close).
#[derive(Clone)]
struct SharedSink(Arc<Mutex<Box<dyn ObjectWriter>>>);

impl SharedSink {
    fn close(&self) -> Result<()> {
        lock(&self.0, "object writer")?.close()
    }

    fn abort(&self) -> Result<()> {
        lock(&self.0, "object writer")?.abort()
    }
}

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "object writer lock poisoned"))?
            .write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.0
            .lock()
            .map_err(|_| io::Error::new(io::ErrorKind::Other, "object writer lock poisoned"))?
            .flush()
    }
}

/// The remote handle and the encoder writing it. Opened together, closed together.
struct Open {
    sink: SharedSink,
    encoder: Encoder<SharedSink>,
}

/// Writes records of `T` to a stored Parquet object.
///
/// Rows are buffered until `row_group_size` of them have accumulated, then
/// written out as one row group. The trailing partial group is written by
/// `close`. Not synchronised: one instance serves one caller at a time.
pub struct BufferedWriter<T: Record> {
    location: ObjectLocation,
    open: Option<Open>,
    parallelism: usize,
    rows_written: u64,
    row_groups_flushed: usize,
    _record: PhantomData<fn(&T)>,
}

impl<T: Record> BufferedWriter<T> {
    /// Create (or replace) `bucket/key` in `store`.
    ///
    /// `parallelism` is an encoder worker hint. The Parquet encoder is
    /// sequential, so it is recorded but does not change output.
    pub fn create(
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
        parallelism: usize,
    ) -> Result<Self> {
        Self::create_with_options(store, bucket, key, parallelism, &WriteOptions::default())
    }

    /// Like `create`, with storage write options.
    ///
    /// Construction is all-or-nothing: if the encoder cannot start, the remote
    /// handle is aborted before the error is returned and any object already
    /// stored at `bucket/key` is left as it was.
    pub fn create_with_options(
        store: &dyn ObjectStore,
        bucket: &str,
        key: &str,
        parallelism: usize,
        options: &WriteOptions,
    ) -> Result<Self> {
        let location = ObjectLocation::new(bucket, key);
        let handle = store
            .open_write(&location, options)
            .map_err(|e| Error::open(&location, e))?;
        let sink = SharedSink(Arc::new(Mutex::new(handle)));

        let encoder = match Encoder::new(sink.clone(), T::schema()) {
            Ok(encoder) => encoder,
            Err(e) => {
                if let Err(abort_err) = sink.abort() {
                    warn!(%location, error = %abort_err, "failed to abort handle after encoder init error");
                }
                return Err(e.with_context(location.to_string()));
            }
        };

        debug!(%location, parallelism, "created buffered writer");
        Ok(Self {
            location,
            open: Some(Open { sink, encoder }),
            parallelism,
            rows_written: 0,
            row_groups_flushed: 0,
            _record: PhantomData,
        })
    }

    /// Create using the location, parallelism, row group size and compression from `cfg`.
    pub fn create_with_config(store: &dyn ObjectStore, cfg: &StreamConfig) -> Result<Self> {
        cfg.validate()?;
        let mut writer = Self::create(store, &cfg.bucket, &cfg.key, cfg.parallelism)?;
        writer.set_row_group_size(cfg.row_group_size)?;
        writer.set_compression(cfg.compression)?;
        Ok(writer)
    }

    fn open_mut(&mut self) -> Result<&mut Open> {
        self.open.as_mut().ok_or(Error::Closed("buffered writer"))
    }

    pub fn location(&self) -> &ObjectLocation {
        &self.location
    }

    pub fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Rows per row group. Zero is rejected.
    ///
    /// Call before the first write for predictable segmentation; a later call
    /// applies from the next write on.
    pub fn set_row_group_size(&mut self, size: usize) -> Result<()> {
        self.open_mut()?.encoder.set_row_group_size(size)
    }

    /// Compression codec for the whole file. Fails once a row group has been flushed.
    pub fn set_compression(&mut self, codec: Compression) -> Result<()> {
        self.open_mut()?.encoder.set_compression(codec)
    }

    /// Records accepted so far, buffered or flushed.
    ///
    /// Accepted is not durable: rows reach storage only when their row group
    /// flushes cleanly and `close` succeeds. If a flush fails, the rows of that
    /// row group are dropped and the writer refuses further records.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn row_groups_flushed(&self) -> usize {
        self.row_groups_flushed
    }

    /// Records accepted but not yet part of a flushed row group.
    pub fn buffered_rows(&self) -> usize {
        self.open
            .as_ref()
            .map(|o| o.encoder.buffered_rows())
            .unwrap_or(0)
    }

    pub fn is_closed(&self) -> bool {
        self.open.is_none()
    }

    /// Encode one record into the in-progress row group.
    ///
    /// Storage is touched only when this record completes a row group.
    pub fn write(&mut self, record: &T) -> Result<()> {
        let (result, flushed) = {
            let open = self.open_mut()?;
            let result = open.encoder.append_row(record.to_row());
            (result, open.encoder.row_groups_flushed())
        };
        self.row_groups_flushed = flushed;
        if result.is_ok() {
            self.rows_written += 1;
        }
        result
    }

    /// Write `records` in order, stopping at the first failure.
    ///
    /// Not atomic: records before the failing one stay written, the failing
    /// record and everything after it are not. Encode errors carry the index
    /// of the failing record.
    pub fn write_chunk(&mut self, records: &[T]) -> Result<()> {
        for (idx, record) in records.iter().enumerate() {
            self.write(record).map_err(|e| e.at_record(idx))?;
        }
        Ok(())
    }

    /// Flush the trailing row group and write the footer, then finalize the
    /// remote object.
    ///
    /// Both steps always run. Failures are reported together in
    /// `Error::Close` with the storage and format halves kept apart. A second
    /// call returns `Error::Closed`.
    pub fn close(&mut self) -> Result<()> {
        let Open { sink, mut encoder } = self.open.take().ok_or(Error::Closed("buffered writer"))?;
        let format = encoder.finish();
        self.row_groups_flushed = encoder.row_groups_flushed();
        drop(encoder);
        let storage = sink.close();
        CloseError::from_parts(storage, format)?;
        info!(
            location = %self.location,
            rows = self.rows_written,
            row_groups = self.row_groups_flushed,
            "closed buffered writer"
        );
        Ok(())
    }
}

impl<T: Record> Drop for BufferedWriter<T> {
    fn drop(&mut self) {
        if self.open.is_some() {
            if let Err(e) = self.close() {
                warn!(location = %self.location, error = %e, "error closing buffered writer on drop");
            }
        }
    }
}
