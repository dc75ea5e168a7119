//! Local cache persisted as a JSON object on disk.

use crate::{prelude::HashMap, traits::LocalCache, Error, Result};
use std::{
    path::{Path, PathBuf},
    sync::Mutex,
};

#[derive(Debug)]
pub struct FileCache {
    path: PathBuf,
    entries: Mutex<HashMap<String, String>>,
}

impl FileCache {
    /// Opens the cache file, starting empty when it does not exist yet
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match std::fs::read_to_string(&path) {
            Ok(json) if json.trim().is_empty() => HashMap::default(),
            Ok(json) => serde_json::from_str(&json)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => HashMap::default(),
            Err(e) => return Err(e.into()),
        };
        log::debug!("Opened local cache at {} ({} entries)", path.display(), entries.len());
        Ok(Self {
            path,
            entries: Mutex::new(entries),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn flush(&self, entries: &HashMap<String, String>) -> Result<()> {
        let json = serde_json::to_string_pretty(entries)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    fn with_entries<R>(&self, f: impl FnOnce(&mut HashMap<String, String>) -> R) -> Result<R> {
        let mut entries = self
            .entries
            .lock()
            .map_err(|_| Error::Store("local cache lock poisoned".to_string()))?;
        Ok(f(&mut entries))
    }
}

impl LocalCache for FileCache {
    fn get(&self, key: &str) -> Result<Option<String>> {
        self.with_entries(|entries| entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<()> {
        self.with_entries(|entries| {
            entries.insert(key.to_string(), value.to_string());
            self.flush(entries)
        })?
    }

    fn remove(&self, key: &str) -> Result<()> {
        self.with_entries(|entries| {
            if entries.remove(key).is_some() {
                self.flush(entries)
            } else {
                Ok(())
            }
        })?
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_values_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");

        let cache = FileCache::open(&path).unwrap();
        assert_eq!(cache.get("userLocation").unwrap(), None);
        cache.set("userLocation", "{\"lat\":1}").unwrap();
        drop(cache);

        let reopened = FileCache::open(&path).unwrap();
        assert_eq!(
            reopened.get("userLocation").unwrap().as_deref(),
            Some("{\"lat\":1}")
        );
        reopened.remove("userLocation").unwrap();
        assert_eq!(FileCache::open(&path).unwrap().get("userLocation").unwrap(), None);
    }

    #[test]
    fn test_corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.json");
        std::fs::write(&path, "[1, 2").unwrap();
        assert!(matches!(FileCache::open(&path), Err(Error::Serialization(_))));
    }
}
