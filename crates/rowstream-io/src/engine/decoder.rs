//! Sequential Parquet decoder bound to one record type and one read handle.

use std::collections::VecDeque;
use std::io::{self, Read};
use std::sync::mpsc::{sync_channel, Receiver, SyncSender};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use arrow_array::RecordBatch;
use arrow_schema::SchemaRef;
use bytes::{Buf, Bytes};
use parquet::arrow::arrow_reader::{ParquetRecordBatchReader, ParquetRecordBatchReaderBuilder};
use parquet::errors::ParquetError;
use parquet::file::reader::{ChunkReader, Length};
use tracing::{debug, trace};

use rowstream_core::record::Record;

use crate::arrow_convert::{check_file_schema, record_batch_to_rows};
use crate::error::{Error, Result};
use crate::storage::ObjectReader;

/// Bytes fetched per ranged read when Parquet asks for a streaming reader.
const RANGE_READ_SIZE: usize = 64 * 1024;

/// Presents a remote read handle to the Parquet reader.
#[derive(Clone)]
pub struct RemoteChunks(Arc<dyn ObjectReader>);

impl RemoteChunks {
    pub fn new(handle: Arc<dyn ObjectReader>) -> Self {
        Self(handle)
    }
}

impl Length for RemoteChunks {
    fn len(&self) -> u64 {
        self.0.len()
    }
}

impl ChunkReader for RemoteChunks {
    type T = RangeReader;

    fn get_read(&self, start: u64) -> parquet::errors::Result<RangeReader> {
        Ok(RangeReader {
            handle: Arc::clone(&self.0),
            pos: start,
            end: self.0.len(),
            buf: Bytes::new(),
        })
    }

    fn get_bytes(&self, start: u64, length: usize) -> parquet::errors::Result<Bytes> {
        self.0
            .read_range(start, length)
            .map_err(|e| ParquetError::External(Box::new(e)))
    }
}

/// Streaming `Read` over `[pos, end)` of a remote object, fetched in ranges.
pub struct RangeReader {
    handle: Arc<dyn ObjectReader>,
    pos: u64,
    end: u64,
    buf: Bytes,
}

impl Read for RangeReader {
    fn read(&mut self, out: &mut [u8]) -> io::Result<usize> {
        if !self.buf.has_remaining() {
            if self.pos >= self.end {
                return Ok(0);
            }
            let want = (self.end - self.pos).min(RANGE_READ_SIZE as u64) as usize;
            self.buf = self
                .handle
                .read_range(self.pos, want)
                .map_err(|e| io::Error::new(io::ErrorKind::Other, e))?;
            self.pos += want as u64;
        }
        let n = out.len().min(self.buf.remaining());
        self.buf.copy_to_slice(&mut out[..n]);
        Ok(n)
    }
}

enum Source<T> {
    Inline(ParquetRecordBatchReader),
    Worker {
        rx: Receiver<Result<Vec<T>>>,
        handle: JoinHandle<()>,
    },
    Exhausted,
    /// A decode step failed. The rows of that step are gone, so every later
    /// call reports the failure instead of continuing past it.
    Failed(String),
    Stopped,
}

/// Decodes rows of `T` in file order.
///
/// With `parallelism > 1` a background worker decodes ahead into a bounded
/// queue holding at most `parallelism` batches. Rows are always delivered in
/// file order; there is a single producer.
pub struct Decoder<T: Record> {
    source: Source<T>,
    pending: VecDeque<T>,
    num_rows: u64,
    num_row_groups: usize,
    schema: SchemaRef,
}

impl<T: Record> Decoder<T> {
    /// Read the footer, validate it against `T::schema()`, and prepare decoding.
    ///
    /// `read_batch` is the number of rows Parquet materialises per step; it is
    /// independent of the caller's batch size.
    pub fn open(handle: Arc<dyn ObjectReader>, parallelism: usize, read_batch: usize) -> Result<Self> {
        let expected = T::schema();
        expected
            .validate()
            .map_err(|e| Error::DecodeInit(e.to_string()))?;

        let builder = ParquetRecordBatchReaderBuilder::try_new(RemoteChunks::new(handle))
            .map_err(|e| Error::DecodeInit(format!("cannot read Parquet footer: {}", e)))?;

        check_file_schema(builder.schema().as_ref(), &expected)
            .map_err(|e| Error::DecodeInit(e.to_string()))?;

        let schema = builder.schema().clone();
        let metadata = builder.metadata().clone();
        let num_rows = metadata.file_metadata().num_rows().max(0) as u64;
        let num_row_groups = metadata.num_row_groups();

        let reader = builder
            .with_batch_size(read_batch.max(1))
            .build()
            .map_err(|e| Error::DecodeInit(format!("failed to build Parquet reader: {}", e)))?;

        let source = if parallelism > 1 {
            let (tx, rx) = sync_channel(parallelism);
            let handle = thread::Builder::new()
                .name("rowstream-decode".into())
                .spawn(move || run_worker::<T>(reader, tx))
                .map_err(|e| Error::DecodeInit(format!("cannot start decode worker: {}", e)))?;
            Source::Worker { rx, handle }
        } else {
            Source::Inline(reader)
        };

        debug!(num_rows, num_row_groups, parallelism, "decoder opened");
        Ok(Self {
            source,
            pending: VecDeque::new(),
            num_rows,
            num_row_groups,
            schema,
        })
    }

    pub fn num_rows(&self) -> u64 {
        self.num_rows
    }

    pub fn num_row_groups(&self) -> usize {
        self.num_row_groups
    }

    pub fn schema(&self) -> SchemaRef {
        Arc::clone(&self.schema)
    }

    /// Decode up to `n` rows. Fewer are returned only at end of file; an empty
    /// vector means the file is exhausted. After a decode error every later
    /// call fails as well.
    pub fn fill_batch(&mut self, n: usize) -> Result<Vec<T>> {
        while self.pending.len() < n {
            match self.next_decoded()? {
                Some(rows) => self.pending.extend(rows),
                None => break,
            }
        }
        let take = n.min(self.pending.len());
        Ok(self.pending.drain(..take).collect())
    }

    fn next_decoded(&mut self) -> Result<Option<Vec<T>>> {
        let step = match &mut self.source {
            Source::Inline(reader) => reader.next().map(|batch| {
                batch
                    .map_err(|e| Error::Decode(e.to_string()))
                    .and_then(|b| decode_records::<T>(&b))
            }),
            // A hang-up means the worker finished the file or panicked.
            Source::Worker { rx, .. } => rx.recv().ok(),
            Source::Exhausted => return Ok(None),
            Source::Failed(msg) => {
                return Err(Error::Decode(format!(
                    "decoding stopped after an earlier error: {}",
                    msg
                )))
            }
            Source::Stopped => return Err(Error::Closed("decoder")),
        };

        match step {
            Some(Ok(rows)) => Ok(Some(rows)),
            Some(Err(e)) => {
                let msg = match &e {
                    Error::Decode(m) => m.clone(),
                    other => other.to_string(),
                };
                if let Err(join_err) = self.retire_source(Source::Failed(msg)) {
                    debug!(error = %join_err, "decode worker did not exit cleanly");
                }
                Err(e)
            }
            None => {
                self.retire_source(Source::Exhausted)?;
                Ok(None)
            }
        }
    }

    /// Replace the source, joining the read-ahead worker if it was running.
    fn retire_source(&mut self, next: Source<T>) -> Result<()> {
        match std::mem::replace(&mut self.source, next) {
            Source::Worker { rx, handle } => {
                // Unblocks a worker parked on a full queue.
                drop(rx);
                join_worker(handle)
            }
            _ => Ok(()),
        }
    }

    /// Shut down decoding, joining the read-ahead worker if one is running.
    pub fn stop(&mut self) -> Result<()> {
        self.pending.clear();
        if matches!(self.source, Source::Stopped) {
            return Err(Error::Closed("decoder"));
        }
        self.retire_source(Source::Stopped)
    }
}

fn join_worker(handle: JoinHandle<()>) -> Result<()> {
    handle
        .join()
        .map_err(|_| Error::Decode("decode worker panicked".into()))
}

fn run_worker<T: Record>(reader: ParquetRecordBatchReader, tx: SyncSender<Result<Vec<T>>>) {
    for batch in reader {
        let decoded = batch
            .map_err(|e| Error::Decode(e.to_string()))
            .and_then(|b| decode_records::<T>(&b));
        let failed = decoded.is_err();
        if tx.send(decoded).is_err() || failed {
            break;
        }
    }
    trace!("decode worker finished");
}

fn decode_records<T: Record>(batch: &RecordBatch) -> Result<Vec<T>> {
    record_batch_to_rows(batch)
        .map_err(|e| Error::Decode(e.to_string()))?
        .into_iter()
        .map(|row| T::from_row(row).map_err(|e| Error::Decode(e.to_string())))
        .collect()
}
