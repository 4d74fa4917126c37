//! Process-local object store. Cloning shares the underlying objects.

use std::collections::BTreeMap;
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use super::{check_range, lock, ObjectLocation, ObjectReader, ObjectStore, ObjectWriter, WriteOptions};
use crate::error::{Error, Result};

type Objects = Arc<Mutex<BTreeMap<ObjectLocation, Bytes>>>;

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    objects: Objects,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&self, location: ObjectLocation, data: impl Into<Bytes>) -> Result<()> {
        location.validate()?;
        lock(&self.objects, "memory store")?.insert(location, data.into());
        Ok(())
    }

    pub fn get(&self, location: &ObjectLocation) -> Option<Bytes> {
        self.objects.lock().ok()?.get(location).cloned()
    }

    pub fn contains(&self, location: &ObjectLocation) -> bool {
        self.get(location).is_some()
    }

    pub fn locations(&self) -> Vec<ObjectLocation> {
        self.objects
            .lock()
            .map(|m| m.keys().cloned().collect())
            .unwrap_or_default()
    }
}

impl ObjectStore for MemoryStore {
    fn open_read(&self, location: &ObjectLocation) -> Result<Box<dyn ObjectReader>> {
        location.validate()?;
        let data = self.get(location).ok_or_else(|| {
            Error::Io(io::Error::new(
                io::ErrorKind::NotFound,
                format!("{} not found", location),
            ))
        })?;
        Ok(Box::new(MemoryReader {
            data,
            closed: AtomicBool::new(false),
        }))
    }

    fn open_write(
        &self,
        location: &ObjectLocation,
        options: &WriteOptions,
    ) -> Result<Box<dyn ObjectWriter>> {
        location.validate()?;
        if options.if_absent && self.contains(location) {
            return Err(Error::Storage(format!("{} already exists", location)));
        }
        Ok(Box::new(MemoryWriter {
            objects: Arc::clone(&self.objects),
            location: location.clone(),
            buf: Some(Vec::new()),
            if_absent: options.if_absent,
        }))
    }
}

struct MemoryReader {
    data: Bytes,
    closed: AtomicBool,
}

impl ObjectReader for MemoryReader {
    fn len(&self) -> u64 {
        self.data.len() as u64
    }

    fn read_range(&self, start: u64, len: usize) -> Result<Bytes> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::Closed("memory reader"));
        }
        check_range(start, len, self.len())?;
        let start = start as usize;
        Ok(self.data.slice(start..start + len))
    }

    fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Err(Error::Closed("memory reader"));
        }
        Ok(())
    }
}

struct MemoryWriter {
    objects: Objects,
    location: ObjectLocation,
    buf: Option<Vec<u8>>,
    if_absent: bool,
}

impl Write for MemoryWriter {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        match self.buf.as_mut() {
            Some(b) => {
                b.extend_from_slice(data);
                Ok(data.len())
            }
            None => Err(io::Error::new(io::ErrorKind::Other, "memory writer is closed")),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl ObjectWriter for MemoryWriter {
    fn close(&mut self) -> Result<()> {
        let buf = self.buf.take().ok_or(Error::Closed("memory writer"))?;
        let mut objects = lock(&self.objects, "memory store")?;
        if self.if_absent && objects.contains_key(&self.location) {
            return Err(Error::Storage(format!(
                "{} was created by another writer",
                self.location
            )));
        }
        objects.insert(self.location.clone(), Bytes::from(buf));
        Ok(())
    }

    fn abort(&mut self) -> Result<()> {
        self.buf.take().ok_or(Error::Closed("memory writer"))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn objects_visible_after_close() {
        let store = MemoryStore::new();
        let loc = ObjectLocation::new("b", "k");
        let mut w = store.open_write(&loc, &WriteOptions::default()).unwrap();
        w.write_all(b"abc").unwrap();
        assert!(!store.contains(&loc));
        w.close().unwrap();
        assert!(matches!(w.close(), Err(Error::Closed(_))));
        assert!(w.write(b"x").is_err());

        let r = store.clone().open_read(&loc).unwrap();
        assert_eq!(&r.read_range(1, 2).unwrap()[..], b"bc");
        assert_eq!(store.locations(), vec![loc]);
    }

    #[test]
    fn abort_discards_writes() {
        let store = MemoryStore::new();
        let loc = ObjectLocation::new("b", "k");
        store.put(loc.clone(), &b"old"[..]).unwrap();

        let mut w = store.open_write(&loc, &WriteOptions::default()).unwrap();
        w.write_all(b"new").unwrap();
        w.abort().unwrap();
        assert!(w.close().is_err());
        assert_eq!(store.get(&loc).unwrap(), Bytes::from_static(b"old"));
    }

    #[test]
    fn missing_object_is_not_found() {
        let store = MemoryStore::new();
        let err = store
            .open_read(&ObjectLocation::new("b", "missing"))
            .err()
            .unwrap();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
    }
}
