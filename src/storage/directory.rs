//! A filesystem backed key-value store
//!
//! The [`DirectoryStore`] keeps one JSON file per key in a single directory.
//! Writes go to a temporary file in the same directory which is then renamed
//! over the target, so a failed write never leaves a half-written value.

use std::{
    ffi::OsStr,
    fs, io,
    io::Write,
    path::{Path, PathBuf},
};

use tempfile::NamedTempFile;
use walkdir::WalkDir;

use super::{KeyValueStore, StoreError};

const EXTENSION: &str = "json";

/// A filesystem backed key-value store.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectoryStore {
    /// The directory values are stored in.
    root: PathBuf,
}

impl DirectoryStore {
    /// Opens a store in the given directory, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn new(root: PathBuf) -> io::Result<Self> {
        fs::create_dir_all(&root)?;
        Ok(Self { root })
    }

    /// The directory values are stored in.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Every key currently stored, sorted.
    #[must_use]
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = WalkDir::new(&self.root)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(Result::ok)
            .filter(|entry| entry.file_type().is_file())
            .filter(|entry| entry.path().extension() == Some(OsStr::new(EXTENSION)))
            .filter_map(|entry| {
                entry
                    .path()
                    .file_stem()
                    .and_then(OsStr::to_str)
                    .map(str::to_string)
            })
            .collect();
        keys.sort();
        keys
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StoreError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && !key.contains(['/', '\\'])
            && key.chars().all(|c| !c.is_control());
        if !valid {
            return Err(StoreError::InvalidKey(key.to_string()));
        }
        Ok(self.root.join(format!("{key}.{EXTENSION}")))
    }
}

impl KeyValueStore for DirectoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!("No value stored at {}", path.display());
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        let path = self.path_for(key)?;

        let mut file = NamedTempFile::new_in(&self.root)?;
        file.write_all(value.as_bytes())?;
        file.as_file().sync_all()?;
        file.persist(&path).map_err(|e| e.error)?;

        tracing::debug!("Wrote {} bytes to {}", value.len(), path.display());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => {
                tracing::debug!("Removed {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn set_then_get() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirectoryStore::new(tmp.path().to_path_buf()).unwrap();

        store.set("permit-draft-abc", "{}".to_string()).unwrap();

        assert_eq!(
            store.get("permit-draft-abc").unwrap().as_deref(),
            Some("{}")
        );
        assert!(tmp.path().join("permit-draft-abc.json").exists());
    }

    #[test]
    fn remove_deletes_the_file() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirectoryStore::new(tmp.path().to_path_buf()).unwrap();
        store.set("k", "v".to_string()).unwrap();

        store.remove("k").unwrap();
        store.remove("k").unwrap();

        assert_eq!(store.get("k").unwrap(), None);
        assert!(store.keys().is_empty());
    }

    #[test]
    fn missing_key_is_none() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryStore::new(tmp.path().to_path_buf()).unwrap();
        assert_eq!(store.get("nothing").unwrap(), None);
    }

    #[test]
    fn overwrite_replaces_value() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirectoryStore::new(tmp.path().to_path_buf()).unwrap();

        store.set("k", "first".to_string()).unwrap();
        store.set("k", "second".to_string()).unwrap();

        assert_eq!(store.get("k").unwrap().as_deref(), Some("second"));
        assert_eq!(store.keys(), ["k"]);
    }

    #[test]
    fn path_like_keys_are_rejected() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirectoryStore::new(tmp.path().to_path_buf()).unwrap();

        for key in ["", "../escape", "a/b", ".hidden"] {
            let error = store.set(key, String::new()).unwrap_err();
            assert!(matches!(error, StoreError::InvalidKey(_)), "{key}");
        }
    }

    #[test]
    fn keys_ignore_other_files() {
        let tmp = TempDir::new().unwrap();
        let mut store = DirectoryStore::new(tmp.path().to_path_buf()).unwrap();
        store.set("b", String::new()).unwrap();
        store.set("a", String::new()).unwrap();
        fs::write(tmp.path().join("config.toml"), "").unwrap();
        fs::create_dir(tmp.path().join("nested")).unwrap();

        assert_eq!(store.keys(), ["a", "b"]);
    }

    #[test]
    fn creates_missing_directory() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("drafts").join("site-a");

        let store = DirectoryStore::new(root.clone()).unwrap();

        assert!(root.is_dir());
        assert_eq!(store.root(), root);
    }
}
