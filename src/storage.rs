use std::{
    collections::{HashMap, HashSet},
    io::ErrorKind,
    path::PathBuf,
    sync::{
        atomic::{AtomicBool, Ordering},
        RwLock,
    },
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{
    eid::Eid,
    errors::{StoreError, StoreResult},
};

pub const PREFERENCES_KEY: &str = "furniture_preferences";
pub const SEARCH_HISTORY_KEY: &str = "furniture_search_history";
pub const WISHLIST_KEY: &str = "furniture_wishlist";
pub const COMPARISON_KEY: &str = "furniture_comparison";
pub const USER_CONTEXT_KEY: &str = "furniture_user_context";

pub trait StorageManager: Send + Sync {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()>;
    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>>;
    fn exists(&self, ident: &str) -> bool;
    fn delete(&self, ident: &str) -> std::io::Result<()>;
}

#[derive(Clone)]
pub struct BackendLocal {
    pub base_dir: PathBuf,
}

impl BackendLocal {
    pub fn new(storage_dir: &str) -> std::io::Result<Self> {
        let path = PathBuf::from(storage_dir);
        std::fs::create_dir_all(&path)?;
        Ok(BackendLocal { base_dir: path })
    }
}

impl StorageManager for BackendLocal {
    fn exists(&self, ident: &str) -> bool {
        std::fs::metadata(self.base_dir.join(ident)).is_ok()
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        std::fs::read(self.base_dir.join(ident))
    }

    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        let path = self.base_dir.join(ident);
        let temp_path = self.base_dir.join(format!(".{}-{ident}", Eid::new()));

        if let Err(err) = std::fs::write(&temp_path, data) {
            let _ = std::fs::remove_file(&temp_path);
            return Err(err);
        }

        std::fs::rename(&temp_path, &path)
    }

    fn delete(&self, ident: &str) -> std::io::Result<()> {
        std::fs::remove_file(self.base_dir.join(ident))
    }
}

/// Process-local storage. Writes can be switched off, for every key or for
/// chosen keys, to simulate a full or disabled store.
#[derive(Default)]
pub struct BackendMemory {
    entries: RwLock<HashMap<String, Vec<u8>>>,
    reject_writes: AtomicBool,
    failing_keys: RwLock<HashSet<String>>,
}

impl BackendMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    /// Makes writes and deletes of `ident` fail until `restore_key` is called.
    pub fn fail_key(&self, ident: &str) {
        if let Ok(mut keys) = self.failing_keys.write() {
            keys.insert(ident.to_string());
        }
    }

    pub fn restore_key(&self, ident: &str) {
        if let Ok(mut keys) = self.failing_keys.write() {
            keys.remove(ident);
        }
    }

    fn check_writable(&self, ident: &str) -> std::io::Result<()> {
        let key_fails = self
            .failing_keys
            .read()
            .map(|keys| keys.contains(ident))
            .unwrap_or(false);

        if key_fails || self.reject_writes.load(Ordering::SeqCst) {
            return Err(std::io::Error::new(
                ErrorKind::Other,
                "storage quota exceeded",
            ));
        }
        Ok(())
    }
}

impl StorageManager for BackendMemory {
    fn write(&self, ident: &str, data: &[u8]) -> std::io::Result<()> {
        self.check_writable(ident)?;
        self.entries
            .write()
            .map_err(|_| std::io::Error::new(ErrorKind::Other, "storage lock poisoned"))?
            .insert(ident.to_string(), data.to_vec());
        Ok(())
    }

    fn read(&self, ident: &str) -> std::io::Result<Vec<u8>> {
        self.entries
            .read()
            .map_err(|_| std::io::Error::new(ErrorKind::Other, "storage lock poisoned"))?
            .get(ident)
            .cloned()
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotFound, ident.to_string()))
    }

    fn exists(&self, ident: &str) -> bool {
        self.entries
            .read()
            .map(|entries| entries.contains_key(ident))
            .unwrap_or(false)
    }

    fn delete(&self, ident: &str) -> std::io::Result<()> {
        self.check_writable(ident)?;
        self.entries
            .write()
            .map_err(|_| std::io::Error::new(ErrorKind::Other, "storage lock poisoned"))?
            .remove(ident)
            .map(|_| ())
            .ok_or_else(|| std::io::Error::new(ErrorKind::NotFound, ident.to_string()))
    }
}

/// Reads a JSON record. A missing key yields `Ok(None)`.
pub fn read_json<T: DeserializeOwned>(
    store: &dyn StorageManager,
    key: &str,
) -> StoreResult<Option<T>> {
    let data = match store.read(key) {
        Ok(data) => data,
        Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
        Err(err) => return Err(StoreError::io(key, err)),
    };

    serde_json::from_slice(&data)
        .map(Some)
        .map_err(|err| StoreError::serialization(key, err))
}

pub fn write_json<T: Serialize + ?Sized>(
    store: &dyn StorageManager,
    key: &str,
    value: &T,
) -> StoreResult<()> {
    let data = serde_json::to_vec(value).map_err(|err| StoreError::serialization(key, err))?;
    store.write(key, &data).map_err(|err| {
        log::error!("failed to persist {key}: {err}");
        StoreError::io(key, err)
    })
}

/// Removes a record; removing an absent key is not an error.
pub fn remove_key(store: &dyn StorageManager, key: &str) -> StoreResult<()> {
    match store.delete(key) {
        Ok(()) => Ok(()),
        Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
        Err(err) => {
            log::error!("failed to remove {key}: {err}");
            Err(StoreError::io(key, err))
        }
    }
}

/// Loads a record at startup, falling back to the type's default when the
/// record is absent or unreadable.
pub fn load_or_default<T: DeserializeOwned + Default>(store: &dyn StorageManager, key: &str) -> T {
    match read_json(store, key) {
        Ok(Some(value)) => value,
        Ok(None) => T::default(),
        Err(err) => {
            log::warn!("ignoring unreadable {key}: {err}");
            T::default()
        }
    }
}
