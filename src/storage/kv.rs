use std::{collections::HashMap, io};

/// A minimal string key-value store.
///
/// This is the only durability boundary of the crate. Writes are expected
/// to be idempotent: writing the same value twice leaves the store as if it
/// were written once, so failed writes can simply be retried.
pub trait KeyValueStore {
    /// Read the value stored under `key`, if any.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written. A failed
    /// write leaves the previous value in place.
    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError>;

    /// Remove the value stored under `key`. Removing a missing key is not an
    /// error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &mut S {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        (**self).set(key, value)
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        (**self).remove(key)
    }
}

/// Errors raised by a [`KeyValueStore`].
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The key cannot be used by this store.
    #[error("invalid storage key '{0}'")]
    InvalidKey(String),

    /// The backing store failed.
    #[error("storage I/O error")]
    Io(#[from] io::Error),

    /// A value could not be encoded for storage.
    #[error("failed to encode value for storage")]
    Encode(#[from] serde_json::Error),
}

/// A [`KeyValueStore`] held in memory.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    /// An empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of keys stored.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Iterate over the stored keys, in no particular order.
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: String) -> Result<(), StoreError> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_overwrites() {
        let mut store = MemoryStore::new();
        assert_eq!(store.get("a").unwrap(), None);

        store.set("a", "1".to_string()).unwrap();
        store.set("a", "2".to_string()).unwrap();

        assert_eq!(store.get("a").unwrap().as_deref(), Some("2"));
        assert_eq!(store.len(), 1);

        store.remove("a").unwrap();
        store.remove("a").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn mutable_references_are_stores() {
        fn write(mut store: impl KeyValueStore) {
            store.set("k", "v".to_string()).unwrap();
        }

        let mut store = MemoryStore::new();
        write(&mut store);
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v"));
    }
}
