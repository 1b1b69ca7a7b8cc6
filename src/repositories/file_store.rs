use std::{
    collections::BTreeMap,
    fs,
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::RwLock,
};

use log::{debug, info};

use crate::{
    errors::AppResult,
    repositories::local_store::{lock_poisoned, LocalStore},
};

/// A `LocalStore` persisted as a single JSON object on disk.
///
/// The whole map is held in memory and rewritten on each mutation through a
/// sibling temp file, so a crash never leaves a truncated store behind.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl FileStore {
    pub fn open(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(contents) if contents.trim().is_empty() => BTreeMap::new(),
            Ok(contents) => serde_json::from_str(&contents)?,
            Err(err) if err.kind() == ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err.into()),
        };
        info!("Opened local store at {} ({} keys)", path.display(), entries.len());

        Ok(Self {
            path,
            entries: RwLock::new(entries),
        })
    }

    fn flush(&self, entries: &BTreeMap<String, String>) -> AppResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(entries)?)?;
        fs::rename(&tmp, &self.path)?;
        debug!("Flushed {} keys to {}", entries.len(), self.path.display());
        Ok(())
    }

    /// Applies `change` to a copy of the map and only publishes it once the
    /// copy is on disk, so a failed write leaves memory matching the file.
    fn commit(
        &self,
        change: impl FnOnce(&mut BTreeMap<String, String>) -> bool,
    ) -> AppResult<()> {
        let mut entries = self.entries.write().map_err(lock_poisoned)?;
        let mut next = entries.clone();
        if !change(&mut next) {
            return Ok(());
        }
        self.flush(&next)?;
        *entries = next;
        Ok(())
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> AppResult<Option<String>> {
        let entries = self.entries.read().map_err(lock_poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> AppResult<()> {
        self.commit(|entries| {
            if entries.get(key).map(String::as_str) == Some(value) {
                return false;
            }
            entries.insert(key.to_string(), value.to_string());
            true
        })
    }

    fn remove(&self, key: &str) -> AppResult<()> {
        self.commit(|entries| entries.remove(key).is_some())
    }

    fn keys(&self) -> AppResult<Vec<String>> {
        let entries = self.entries.read().map_err(lock_poisoned)?;
        Ok(entries.keys().cloned().collect())
    }
}
