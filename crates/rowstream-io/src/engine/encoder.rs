//! Row-group buffering Parquet encoder.
//!
//! Rows are validated as they arrive and held in memory. A row group is cut
//! and written to the sink exactly when the buffer reaches `row_group_size`
//! rows; the trailing partial group is written only by `finish`. The Parquet
//! writer itself is created on the first flush so that compression chosen
//! before then applies to the whole file.

use std::io::Write;
use std::sync::Arc;

use arrow_schema::SchemaRef;
use parquet::arrow::ArrowWriter;
use parquet::file::properties::WriterProperties;
use tracing::trace;

use rowstream_core::config::{Compression, DEFAULT_ROW_GROUP_SIZE};
use rowstream_core::schema::Schema;
use rowstream_core::types::Row;

use super::to_parquet_compression;
use crate::arrow_convert::{rows_to_record_batch, to_arrow_schema};
use crate::error::{Error, Result};

pub struct Encoder<W: Write + Send> {
    schema: Schema,
    arrow_schema: SchemaRef,
    sink: Option<W>,
    writer: Option<ArrowWriter<W>>,
    buffer: Vec<Row>,
    row_group_size: usize,
    compression: Compression,
    row_groups_flushed: usize,
    rows_flushed: u64,
    finished: bool,
    failed: bool,
}

impl<W: Write + Send> Encoder<W> {
    pub fn new(sink: W, schema: Schema) -> Result<Self> {
        schema
            .validate()
            .map_err(|e| Error::EncodeInit(e.to_string()))?;
        let arrow_schema = Arc::new(to_arrow_schema(&schema));

        // Probe the schema against the Parquet writer without touching the sink.
        ArrowWriter::try_new(std::io::sink(), Arc::clone(&arrow_schema), None)
            .map_err(|e| Error::EncodeInit(format!("schema not encodable: {}", e)))?;

        Ok(Self {
            schema,
            arrow_schema,
            sink: Some(sink),
            writer: None,
            buffer: Vec::new(),
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            compression: Compression::default(),
            row_groups_flushed: 0,
            rows_flushed: 0,
            finished: false,
            failed: false,
        })
    }

    pub fn row_group_size(&self) -> usize {
        self.row_group_size
    }

    /// Takes effect from the next `append_row`; rows already buffered stay
    /// buffered until that append or `finish`.
    pub fn set_row_group_size(&mut self, size: usize) -> Result<()> {
        if size == 0 {
            return Err(Error::Config("row group size must be greater than zero".into()));
        }
        self.row_group_size = size;
        Ok(())
    }

    pub fn compression(&self) -> Compression {
        self.compression
    }

    /// Parquet fixes the codec per file, so it can only change before the first
    /// row group is written.
    pub fn set_compression(&mut self, codec: Compression) -> Result<()> {
        if self.writer.is_some() {
            return Err(Error::Config(
                "compression cannot change after the first row group is flushed".into(),
            ));
        }
        self.compression = codec;
        Ok(())
    }

    pub fn buffered_rows(&self) -> usize {
        self.buffer.len()
    }

    pub fn row_groups_flushed(&self) -> usize {
        self.row_groups_flushed
    }

    pub fn rows_flushed(&self) -> u64 {
        self.rows_flushed
    }

    /// A row group failed to reach the sink; the file can no longer be completed.
    pub fn has_failed(&self) -> bool {
        self.failed
    }

    /// Validate and buffer one row, flushing a row group once the threshold is hit.
    pub fn append_row(&mut self, row: Row) -> Result<()> {
        if self.finished {
            return Err(Error::Closed("encoder"));
        }
        if self.failed {
            return Err(Error::encode(
                "an earlier row group failed to flush; the file cannot be completed",
            ));
        }
        self.schema.check_row(&row).map_err(Error::encode)?;
        self.buffer.push(row);
        if self.buffer.len() >= self.row_group_size {
            self.flush_row_group()?;
        }
        Ok(())
    }

    fn ensure_writer(&mut self) -> Result<&mut ArrowWriter<W>> {
        if self.writer.is_none() {
            let sink = self.sink.take().ok_or(Error::Closed("encoder"))?;
            // Row groups are cut by this encoder's buffer, never by ArrowWriter.
            let props = WriterProperties::builder()
                .set_compression(to_parquet_compression(self.compression))
                .set_max_row_group_size(usize::MAX)
                .build();
            let writer = ArrowWriter::try_new(sink, Arc::clone(&self.arrow_schema), Some(props))
                .map_err(|e| Error::encode(format!("cannot start Parquet writer: {}", e)))?;
            self.writer = Some(writer);
        }
        self.writer.as_mut().ok_or(Error::Closed("encoder"))
    }

    fn flush_row_group(&mut self) -> Result<()> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        // The rows of a failed group are dropped; the writer may already hold
        // part of that group, so it cannot be retried.
        let rows = std::mem::take(&mut self.buffer);
        if let Err(e) = self.write_row_group(&rows) {
            self.failed = true;
            return Err(e);
        }

        self.row_groups_flushed += 1;
        self.rows_flushed += rows.len() as u64;
        trace!(
            rows = rows.len(),
            row_group = self.row_groups_flushed,
            "flushed row group"
        );
        Ok(())
    }

    fn write_row_group(&mut self, rows: &[Row]) -> Result<()> {
        let batch = rows_to_record_batch(rows, Arc::clone(&self.arrow_schema)).map_err(Error::encode)?;
        let writer = self.ensure_writer()?;
        writer.write(&batch).map_err(Error::encode)?;
        writer.flush().map_err(Error::encode)
    }

    /// Flush the trailing partial row group and write the footer.
    ///
    /// A file with no rows is still complete and readable.
    pub fn finish(&mut self) -> Result<()> {
        if self.finished {
            return Err(Error::Closed("encoder"));
        }
        self.finished = true;
        let flushed = self.flush_row_group();
        let footer = self.close_writer();
        flushed.and(footer)
    }

    fn close_writer(&mut self) -> Result<()> {
        self.ensure_writer()?;
        let writer = self.writer.take().ok_or(Error::Closed("encoder"))?;
        writer.close().map_err(Error::encode)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rowstream_core::schema::{DataType, Field};
    use rowstream_core::types::Scalar;

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("id", DataType::Int64, false),
            Field::new("tag", DataType::Utf8, true),
        ])
    }

    fn row(i: i64) -> Row {
        vec![Scalar::I64(i), Scalar::Str(format!("t{}", i))]
    }

    #[test]
    fn flushes_only_full_groups_until_finish() {
        let mut enc = Encoder::new(Vec::new(), schema()).unwrap();
        enc.set_row_group_size(4).unwrap();
        for i in 0..10 {
            enc.append_row(row(i)).unwrap();
        }
        assert_eq!(enc.row_groups_flushed(), 2);
        assert_eq!(enc.rows_flushed(), 8);
        assert_eq!(enc.buffered_rows(), 2);

        enc.finish().unwrap();
        assert_eq!(enc.row_groups_flushed(), 3);
        assert_eq!(enc.rows_flushed(), 10);
        assert!(matches!(enc.append_row(row(11)), Err(Error::Closed(_))));
        assert!(enc.finish().is_err());
    }

    #[test]
    fn invalid_row_is_rejected_without_buffering() {
        let mut enc = Encoder::new(Vec::new(), schema()).unwrap();
        let err = enc
            .append_row(vec![Scalar::Null, Scalar::Null])
            .unwrap_err();
        assert!(matches!(err, Error::Encode { .. }));
        assert_eq!(enc.buffered_rows(), 0);
    }

    #[test]
    fn zero_row_group_size_rejected() {
        let mut enc = Encoder::new(Vec::new(), schema()).unwrap();
        assert!(matches!(enc.set_row_group_size(0), Err(Error::Config(_))));
        assert_eq!(enc.row_group_size(), DEFAULT_ROW_GROUP_SIZE);
    }

    #[test]
    fn compression_locked_after_first_flush() {
        let mut enc = Encoder::new(Vec::new(), schema()).unwrap();
        enc.set_compression(Compression::Zstd).unwrap();
        enc.set_row_group_size(1).unwrap();
        enc.append_row(row(1)).unwrap();
        assert!(enc.set_compression(Compression::Gzip).is_err());
        assert_eq!(enc.compression(), Compression::Zstd);
    }

    struct BrokenSink;

    impl Write for BrokenSink {
        fn write(&mut self, _: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::Other, "disk gone"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn failed_flush_refuses_later_rows() {
        let blob_schema = Schema::new(vec![Field::new("blob", DataType::Binary, false)]);
        let mut enc = Encoder::new(BrokenSink, blob_schema).unwrap();
        enc.set_compression(Compression::Uncompressed).unwrap();
        enc.set_row_group_size(1).unwrap();

        // Larger than any internal write buffer, so the sink sees the bytes.
        let big = vec![Scalar::Bin(vec![7u8; 64 * 1024])];
        let err = enc.append_row(big.clone()).unwrap_err();
        assert!(matches!(err, Error::Encode { .. }), "{}", err);
        assert!(enc.has_failed());
        assert_eq!(enc.row_groups_flushed(), 0);
        assert_eq!(enc.buffered_rows(), 0);

        let err = enc.append_row(big).unwrap_err();
        assert!(err.to_string().contains("earlier row group"), "{}", err);
        assert!(enc.finish().is_err());
    }

    #[test]
    fn empty_schema_fails_init() {
        let err = Encoder::new(Vec::new(), Schema::new(vec![])).err().unwrap();
        assert!(matches!(err, Error::EncodeInit(_)));
    }
}
