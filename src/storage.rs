mod kv;
pub use kv::{KeyValueStore, MemoryStore, StoreError};

pub mod directory;
pub use directory::DirectoryStore;

mod drafts;
pub use drafts::{DraftStore, Envelope, LoadError};
