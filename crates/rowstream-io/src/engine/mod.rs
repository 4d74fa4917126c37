//! Format engine: Parquet encode/decode of `Record` values.
//!
//! - `decoder`: footer/schema validation and sequential row decoding over a
//!   remote read handle, optionally with a background read-ahead worker.
//! - `encoder`: row-group buffering and Parquet output over any `Write` sink.

pub mod decoder;
pub mod encoder;

pub use decoder::Decoder;
pub use encoder::Encoder;

use parquet::basic::{Compression as ParquetCodec, GzipLevel, ZstdLevel};
use rowstream_core::config::Compression;

/// Convert to Parquet's Compression enum.
pub fn to_parquet_compression(codec: Compression) -> ParquetCodec {
    match codec {
        Compression::Uncompressed => ParquetCodec::UNCOMPRESSED,
        Compression::Snappy => ParquetCodec::SNAPPY,
        Compression::Gzip => ParquetCodec::GZIP(GzipLevel::default()),
        Compression::Zstd => ParquetCodec::ZSTD(ZstdLevel::default()),
        Compression::Lz4 => ParquetCodec::LZ4,
    }
}
