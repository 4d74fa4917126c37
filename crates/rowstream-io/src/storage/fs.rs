//! Local filesystem store: `<root>/<bucket>/<key>`.
//!
//! Writes land in a hidden temporary sibling and are renamed into place on
//! `close`, so readers never observe a half-written object.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use bytes::Bytes;

use super::{check_range, lock, ObjectLocation, ObjectReader, ObjectStore, ObjectWriter, WriteOptions};
use crate::error::{Error, Result};

#[derive(Debug, Clone)]
pub struct FsStore {
    root: PathBuf,
}

impl FsStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn object_path(&self, location: &ObjectLocation) -> Result<PathBuf> {
        location.validate()?;
        Ok(self.root.join(&location.bucket).join(&location.key))
    }
}

impl ObjectStore for FsStore {
    fn open_read(&self, location: &ObjectLocation) -> Result<Box<dyn ObjectReader>> {
        let path = self.object_path(location)?;
        let file = File::open(&path)?;
        let len = file.metadata()?.len();
        Ok(Box::new(FsReader {
            file: Mutex::new(file),
            len,
            closed: AtomicBool::new(false),
        }))
    }

    fn open_write(
        &self,
        location: &ObjectLocation,
        options: &WriteOptions,
    ) -> Result<Box<dyn ObjectWriter>> {
        let dest = self.object_path(location)?;
        if options.if_absent && dest.exists() {
            return Err(Error::Storage(format!("{} already exists", location)));
        }
        let parent = dest
            .parent()
            .ok_or_else(|| Error::Storage(format!("{} has no parent directory", location)))?;
        fs::create_dir_all(parent)?;

        let name = dest
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let tmp = parent.join(format!(".{}.{}.tmp", name, uuid::Uuid::new_v4()));
        let file = OpenOptions::new().write(true).create_new(true).open(&tmp)?;

        Ok(Box::new(FsWriter {
            file: Some(BufWriter::new(file)),
            tmp,
            dest,
            if_absent: options.if_absent,
        }))
    }
}

struct FsReader {
    file: Mutex<File>,
    len: u64,
    closed: AtomicBool,
}

impl ObjectReader for FsReader {
    fn len(&self) -> u64 {
        self.len
    }

    fn read_range(&self, start: u64, len: usize) -> Result<Bytes> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed("file reader"));
        }
        check_range(start, len, self.len)?;
        let mut file = lock(&self.file, "file reader")?;
        file.seek(SeekFrom::Start(start))?;
        let mut buf = vec![0u8; len];
        file.read_exact(&mut buf)?;
        Ok(Bytes::from(buf))
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::Closed("file reader"));
        }
        Ok(())
    }
}

struct FsWriter {
    file: Option<BufWriter<File>>,
    tmp: PathBuf,
    dest: PathBuf,
    if_absent: bool,
}

impl FsWriter {
    fn commit(&mut self, file: BufWriter<File>) -> Result<()> {
        let file = file.into_inner().map_err(|e| e.into_error())?;
        file.sync_all()?;
        drop(file);
        if self.if_absent && self.dest.exists() {
            return Err(Error::Storage(format!(
                "{} was created by another writer",
                self.dest.display()
            )));
        }
        fs::rename(&self.tmp, &self.dest)?;
        Ok(())
    }
}

impl Write for FsWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.file.as_mut() {
            Some(f) => f.write(buf),
            None => Err(io::Error::new(io::ErrorKind::Other, "file writer is closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self.file.as_mut() {
            Some(f) => f.flush(),
            None => Ok(()),
        }
    }
}

impl ObjectWriter for FsWriter {
    fn close(&mut self) -> Result<()> {
        let file = self.file.take().ok_or(Error::Closed("file writer"))?;
        let res = self.commit(file);
        if res.is_err() {
            let _ = fs::remove_file(&self.tmp);
        }
        res
    }

    fn abort(&mut self) -> Result<()> {
        let file = self.file.take().ok_or(Error::Closed("file writer"))?;
        drop(file);
        fs::remove_file(&self.tmp)?;
        Ok(())
    }
}

impl Drop for FsWriter {
    fn drop(&mut self) {
        // Never committed: discard the partial object.
        if self.file.take().is_some() {
            let _ = fs::remove_file(&self.tmp);
        }
    }
}
