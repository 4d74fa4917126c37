//! Stream configuration supplied by the host program.
//!
//! Values come from a config file (YAML/JSON via serde), from `ROWSTREAM_*`
//! environment variables, or from CLI flag overrides.

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Default rows per caller-facing batch.
pub const DEFAULT_BATCH_SIZE: usize = 1024;

/// Default rows per physical row group (matches the Parquet writer default).
pub const DEFAULT_ROW_GROUP_SIZE: usize = 1024 * 1024;

/// Column compression codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Compression {
    /// No compression
    Uncompressed,
    /// Snappy compression (fast, good compression)
    #[default]
    Snappy,
    /// GZIP compression (good compression ratio)
    Gzip,
    /// ZSTD compression (excellent compression ratio)
    Zstd,
    /// LZ4 compression (very fast)
    Lz4,
}

impl std::str::FromStr for Compression {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "uncompressed" | "none" => Ok(Compression::Uncompressed),
            "snappy" => Ok(Compression::Snappy),
            "gzip" => Ok(Compression::Gzip),
            "zstd" => Ok(Compression::Zstd),
            "lz4" => Ok(Compression::Lz4),
            other => Err(Error::Config(format!("unknown compression codec '{}'", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    pub bucket: String,
    pub key: String,
    /// Rows returned per `next_chunk` call.
    pub batch_size: usize,
    /// Decode/encode worker hint. `0` and `1` both mean "no background worker".
    pub parallelism: usize,
    /// Rows buffered before a row group is flushed.
    pub row_group_size: usize,
    pub compression: Compression,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            bucket: String::new(),
            key: String::new(),
            batch_size: DEFAULT_BATCH_SIZE,
            parallelism: 1,
            row_group_size: DEFAULT_ROW_GROUP_SIZE,
            compression: Compression::default(),
        }
    }
}

impl StreamConfig {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
            ..Self::default()
        }
    }

    /// Defaults overridden by `ROWSTREAM_BUCKET`, `ROWSTREAM_KEY`,
    /// `ROWSTREAM_BATCH_SIZE`, `ROWSTREAM_PARALLELISM`, `ROWSTREAM_ROW_GROUP_SIZE`
    /// and `ROWSTREAM_COMPRESSION`. Unparseable numbers are reported, not ignored.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut cfg = Self::default();
        if let Some(v) = lookup("ROWSTREAM_BUCKET") {
            cfg.bucket = v;
        }
        if let Some(v) = lookup("ROWSTREAM_KEY") {
            cfg.key = v;
        }
        if let Some(v) = lookup("ROWSTREAM_BATCH_SIZE") {
            cfg.batch_size = parse_count("ROWSTREAM_BATCH_SIZE", &v)?;
        }
        if let Some(v) = lookup("ROWSTREAM_PARALLELISM") {
            cfg.parallelism = parse_count("ROWSTREAM_PARALLELISM", &v)?;
        }
        if let Some(v) = lookup("ROWSTREAM_ROW_GROUP_SIZE") {
            cfg.row_group_size = parse_count("ROWSTREAM_ROW_GROUP_SIZE", &v)?;
        }
        if let Some(v) = lookup("ROWSTREAM_COMPRESSION") {
            cfg.compression = v.parse()?;
        }
        Ok(cfg)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() {
            return Err(Error::Config("bucket must not be empty".into()));
        }
        if self.key.is_empty() {
            return Err(Error::Config("key must not be empty".into()));
        }
        if self.batch_size == 0 {
            return Err(Error::Config("batch_size must be greater than zero".into()));
        }
        if self.row_group_size == 0 {
            return Err(Error::Config(
                "row_group_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }
}

fn parse_count(name: &str, value: &str) -> Result<usize> {
    value
        .trim()
        .parse()
        .map_err(|_| Error::Config(format!("{} must be a non-negative integer, got '{}'", name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn defaults_need_location() {
        let cfg = StreamConfig::default();
        assert!(cfg.validate().is_err());
        assert!(StreamConfig::new("b", "k").validate().is_ok());
    }

    #[test]
    fn zero_sizes_rejected() {
        let mut cfg = StreamConfig::new("b", "k");
        cfg.batch_size = 0;
        let err = cfg.validate().unwrap_err();
        assert!(!err.suggestions().is_empty());

        let mut cfg = StreamConfig::new("b", "k");
        cfg.row_group_size = 0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn env_overrides() {
        let vars: HashMap<&str, &str> = [
            ("ROWSTREAM_BUCKET", "data"),
            ("ROWSTREAM_KEY", "trips/part-0.parquet"),
            ("ROWSTREAM_BATCH_SIZE", "64"),
            ("ROWSTREAM_COMPRESSION", "ZSTD"),
        ]
        .into_iter()
        .collect();
        let cfg = StreamConfig::from_lookup(|k| vars.get(k).map(|v| v.to_string())).unwrap();
        assert_eq!(cfg.bucket, "data");
        assert_eq!(cfg.batch_size, 64);
        assert_eq!(cfg.compression, Compression::Zstd);
        assert_eq!(cfg.row_group_size, DEFAULT_ROW_GROUP_SIZE);

        let bad = StreamConfig::from_lookup(|k| {
            (k == "ROWSTREAM_BATCH_SIZE").then(|| "lots".to_string())
        });
        assert!(bad.is_err());
    }

    #[test]
    fn json_partial_uses_defaults() {
        let cfg = StreamConfig::from_json(r#"{"bucket":"b","key":"k","compression":"gzip"}"#)
            .unwrap();
        assert_eq!(cfg.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(cfg.compression, Compression::Gzip);
    }
}
