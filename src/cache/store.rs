//! Persistent tier
//!
//! [`PersistentStore`] is the seam the manager writes through to. The
//! bundled [`DiskStore`] keeps one file per key in a directory and evicts
//! least-recently-used files once the directory exceeds its byte budget.

use lru::LruCache;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::SystemTime;
use tracing::debug;

use super::lock::mutex_lock;

const SOURCE: &str = "cache::store";

/// A bounded key to bytes store
///
/// Implementations own their own locking and eviction. Every operation may
/// fail with an I/O error.
pub trait PersistentStore: Send + Sync {
    /// Returns the stored bytes, or `None` if the key is not present
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>>;

    fn put(&self, key: &str, value: &[u8]) -> io::Result<()>;

    fn contains(&self, key: &str) -> io::Result<bool>;

    /// Removes every stored value
    fn clear(&self) -> io::Result<()>;
}

impl<S: PersistentStore + ?Sized> PersistentStore for Arc<S> {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        (**self).get(key)
    }

    fn put(&self, key: &str, value: &[u8]) -> io::Result<()> {
        (**self).put(key, value)
    }

    fn contains(&self, key: &str) -> io::Result<bool> {
        (**self).contains(key)
    }

    fn clear(&self) -> io::Result<()> {
        (**self).clear()
    }
}

/// Recency order and sizes of the files in the store directory
struct Index {
    sizes: LruCache<String, u64>,
    total_bytes: u64,
}

/// Size-bounded, LRU-evicting store of one file per key
///
/// Files live at `<dir>/<key>.json`. The recency index is rebuilt from file
/// modification times when the store is opened.
pub struct DiskStore {
    dir: PathBuf,
    max_bytes: u64,
    index: Mutex<Index>,
}

impl DiskStore {
    /// Opens (creating if needed) a store rooted at `dir`
    ///
    /// Existing entries are indexed oldest first; if they already exceed
    /// `max_bytes`, the oldest are evicted immediately.
    pub fn open(dir: impl Into<PathBuf>, max_bytes: u64) -> io::Result<Self> {
        let dir = dir.into();
        if max_bytes == 0 {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                "store capacity must be greater than zero",
            ));
        }
        fs::create_dir_all(&dir)?;

        let mut found: Vec<(SystemTime, String, u64)> = Vec::new();
        for dirent in fs::read_dir(&dir)? {
            let dirent = dirent?;
            let path = dirent.path();
            match path.extension().and_then(|ext| ext.to_str()) {
                Some("json") => {}
                Some("tmp") => {
                    // Left behind by an interrupted write
                    if let Err(e) = fs::remove_file(&path) {
                        debug!(path = %path.display(), error = %e, "Could not remove stale temp file");
                    }
                    continue;
                }
                _ => continue,
            }
            let Some(key) = path.file_stem().and_then(|stem| stem.to_str()) else {
                continue;
            };
            if validate_key(key).is_err() {
                continue;
            }
            let metadata = dirent.metadata()?;
            let modified = metadata.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            found.push((modified, key.to_string(), metadata.len()));
        }
        found.sort();

        let mut index = Index {
            sizes: LruCache::unbounded(),
            total_bytes: 0,
        };
        for (_, key, size) in found {
            index.total_bytes += size;
            index.sizes.put(key, size);
        }

        let store = Self {
            dir,
            max_bytes,
            index: Mutex::new(index),
        };
        {
            let mut index = mutex_lock(&store.index, SOURCE, "open");
            store.evict(&mut index)?;
        }
        debug!(dir = %store.dir.display(), max_bytes, "Opened disk store");
        Ok(store)
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn max_bytes(&self) -> u64 {
        self.max_bytes
    }

    /// Number of entries currently stored
    pub fn len(&self) -> usize {
        mutex_lock(&self.index, SOURCE, "len").sizes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sum of the sizes of all stored values
    pub fn total_bytes(&self) -> u64 {
        mutex_lock(&self.index, SOURCE, "total_bytes").total_bytes
    }

    fn entry_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }

    /// Drops least-recently-used files until the budget is respected
    fn evict(&self, index: &mut Index) -> io::Result<()> {
        while index.total_bytes > self.max_bytes {
            let Some((key, size)) = index.sizes.pop_lru() else {
                break;
            };
            index.total_bytes -= size;
            remove_if_present(&self.entry_path(&key))?;
            debug!(key = %key, size, "Evicted least recently used entry");
        }
        Ok(())
    }
}

impl PersistentStore for DiskStore {
    fn get(&self, key: &str) -> io::Result<Option<Vec<u8>>> {
        validate_key(key)?;
        let mut index = mutex_lock(&self.index, SOURCE, "get");

        match fs::read(self.entry_path(key)) {
            Ok(bytes) => {
                // Written behind our back, e.g. by another process sharing the directory
                if index.sizes.get(key).is_none() {
                    index.total_bytes += bytes.len() as u64;
                    index.sizes.put(key.to_string(), bytes.len() as u64);
                    self.evict(&mut index)?;
                }
                Ok(Some(bytes))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                if let Some(size) = index.sizes.pop(key) {
                    index.total_bytes -= size;
                }
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn put(&self, key: &str, value: &[u8]) -> io::Result<()> {
        validate_key(key)?;
        let size = value.len() as u64;
        if size > self.max_bytes {
            return Err(io::Error::new(
                ErrorKind::InvalidInput,
                format!(
                    "value of {} bytes exceeds store capacity of {} bytes",
                    size, self.max_bytes
                ),
            ));
        }

        let mut index = mutex_lock(&self.index, SOURCE, "put");
        let temp_path = self.dir.join(format!("{}.tmp", key));
        fs::write(&temp_path, value)?;
        if let Err(e) = fs::rename(&temp_path, self.entry_path(key)) {
            let _ = fs::remove_file(&temp_path);
            return Err(e);
        }

        if let Some(previous) = index.sizes.put(key.to_string(), size) {
            index.total_bytes -= previous;
        }
        index.total_bytes += size;
        self.evict(&mut index)
    }

    fn contains(&self, key: &str) -> io::Result<bool> {
        validate_key(key)?;
        let mut index = mutex_lock(&self.index, SOURCE, "contains");

        match fs::metadata(self.entry_path(key)) {
            Ok(_) => {
                index.sizes.promote(key);
                Ok(true)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e),
        }
    }

    fn clear(&self) -> io::Result<()> {
        let mut index = mutex_lock(&self.index, SOURCE, "clear");

        for dirent in fs::read_dir(&self.dir)? {
            let path = dirent?.path();
            if matches!(
                path.extension().and_then(|ext| ext.to_str()),
                Some("json") | Some("tmp")
            ) {
                remove_if_present(&path)?;
            }
        }
        index.sizes.clear();
        index.total_bytes = 0;
        debug!(dir = %self.dir.display(), "Cleared disk store");
        Ok(())
    }
}

/// Keys become file names, so only a conservative charset is accepted
fn validate_key(key: &str) -> io::Result<()> {
    let valid = !key.is_empty()
        && key
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_');
    if valid {
        Ok(())
    } else {
        Err(io::Error::new(
            ErrorKind::InvalidInput,
            format!("invalid store key: {:?}", key),
        ))
    }
}

fn remove_if_present(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Err(e) if e.kind() != ErrorKind::NotFound => Err(e),
        _ => Ok(()),
    }
}
