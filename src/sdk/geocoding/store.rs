use super::error::StoreError;
use parking_lot::RwLock;
use std::{
    collections::BTreeMap,
    ffi::OsString,
    fs,
    io::Write,
    path::{Path, PathBuf},
};
use tempfile::NamedTempFile;

/// Durable string-to-string storage, one entry per address. Entries never expire.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
    /// Returns whether an entry was actually removed.
    fn remove(&self, key: &str) -> Result<bool, StoreError>;
}

#[derive(Default, Debug)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.entries.write().remove(key).is_some())
    }
}

/// A single pretty-printed JSON object on disk, rewritten after every change.
///
/// Each rewrite goes to a temporary sibling that is then renamed over the
/// cache, so a crash mid-write leaves the previous file intact.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Loads `path` if it exists, otherwise starts empty. The file is created on first write.
    ///
    /// A file that isn't a JSON object of strings is renamed to `<path>.corrupt`
    /// and the store starts empty; only I/O failures are errors.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        let entries = if path.exists() {
            let data = fs::read_to_string(&path)?;
            if data.trim().is_empty() {
                BTreeMap::new()
            } else {
                match serde_json::from_str(&data) {
                    Ok(entries) => entries,
                    Err(e) => {
                        set_aside(&path, &e);
                        BTreeMap::new()
                    }
                }
            }
        } else {
            BTreeMap::new()
        };
        log::debug!("Opened geo cache {} with {} entries", path.display(), entries.len());
        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn save(&self, entries: &BTreeMap<String, String>) -> Result<(), StoreError> {
        let data = serde_json::to_string_pretty(entries)?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };

        let mut tmp = NamedTempFile::new_in(dir)?;
        tmp.write_all(data.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        Ok(())
    }
}

/// Where an unreadable cache file is moved before starting over.
pub fn corrupt_path(path: &Path) -> PathBuf {
    let mut aside = OsString::from(path.as_os_str());
    aside.push(".corrupt");
    PathBuf::from(aside)
}

fn set_aside(path: &Path, cause: &serde_json::Error) {
    let aside = corrupt_path(path);
    match fs::rename(path, &aside) {
        Ok(()) => log::warn!(
            "Geo cache {} is unreadable ({}); moved it to {} and starting empty",
            path.display(),
            cause,
            aside.display()
        ),
        Err(e) => log::warn!(
            "Geo cache {} is unreadable ({}) and could not be moved aside ({}); starting empty",
            path.display(),
            cause,
            e
        ),
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.read().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        // Hold the write lock across the save so concurrent writers don't interleave files.
        let mut entries = self.entries.write();
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries)
    }

    fn remove(&self, key: &str) -> Result<bool, StoreError> {
        let mut entries = self.entries.write();
        if entries.remove(key).is_none() {
            return Ok(false);
        }
        self.save(&entries)?;
        Ok(true)
    }
}
