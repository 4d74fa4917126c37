//! Object storage adapters.
//!
//! A store hands out exclusively-owned handles bound to one `(bucket, key)`:
//! random-access readers for the decoder and append-only writers for the
//! encoder. Retry/backoff is the store implementation's business.

use std::fmt;
use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use bytes::Bytes;

use crate::error::{Error, Result};

pub mod fs;
pub mod memory;

pub use fs::FsStore;
pub use memory::MemoryStore;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.bucket.is_empty() || self.bucket.contains('/') {
            return Err(Error::Storage(format!("invalid bucket name '{}'", self.bucket)));
        }
        if self.key.is_empty()
            || self.key.starts_with('/')
            || self.key.split('/').any(|seg| seg == ".." || seg == ".")
        {
            return Err(Error::Storage(format!("invalid object key '{}'", self.key)));
        }
        Ok(())
    }
}

impl fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.bucket, self.key)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteOptions {
    /// Fail instead of replacing an existing object.
    pub if_absent: bool,
}

/// A source of remote file handles.
pub trait ObjectStore: Send + Sync {
    fn open_read(&self, location: &ObjectLocation) -> Result<Box<dyn ObjectReader>>;

    fn open_write(
        &self,
        location: &ObjectLocation,
        options: &WriteOptions,
    ) -> Result<Box<dyn ObjectWriter>>;
}

/// Random-access read handle over one stored object.
pub trait ObjectReader: Send + Sync {
    /// Object size in bytes, fixed at open time.
    fn len(&self) -> u64;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Read exactly `len` bytes starting at `start`.
    fn read_range(&self, start: u64, len: usize) -> Result<Bytes>;

    /// Release the handle. Reads after close fail.
    fn close(&self) -> Result<()>;
}

/// Append-only write handle. Nothing is visible at the location until `close`
/// commits it.
pub trait ObjectWriter: Write + Send {
    /// Commit everything written so far to the location.
    fn close(&mut self) -> Result<()>;

    /// Release the handle without committing. Whatever was stored at the
    /// location before stays untouched.
    fn abort(&mut self) -> Result<()>;
}

pub(crate) fn lock<'a, T>(m: &'a Mutex<T>, what: &str) -> Result<MutexGuard<'a, T>> {
    m.lock()
        .map_err(|_| Error::Storage(format!("{} lock poisoned", what)))
}

pub(crate) fn check_range(start: u64, len: usize, size: u64) -> Result<()> {
    match start.checked_add(len as u64) {
        Some(end) if end <= size => Ok(()),
        _ => Err(Error::Storage(format!(
            "range {}+{} is beyond end of object ({} bytes)",
            start, len, size
        ))),
    }
}
