use std::collections::HashSet;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{DirectoryStore, KeyValueStore, StoreError};
use crate::domain::{AuditEvent, Config, PermitDocument, PermitId};

/// The persisted unit: a permit document together with its audit trail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    /// The permit document.
    pub data: PermitDocument,

    /// Audit events, oldest first.
    #[serde(default)]
    pub audit_trail: Vec<AuditEvent>,
}

impl Envelope {
    /// An envelope with an empty audit trail.
    #[must_use]
    pub const fn new(data: PermitDocument) -> Self {
        Self {
            data,
            audit_trail: Vec::new(),
        }
    }
}

/// Errors raised when reading a draft back from storage.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    /// Nothing is stored under the key.
    #[error("no draft stored under '{0}'")]
    NotFound(String),

    /// The stored value is not a valid envelope.
    #[error("draft stored under '{key}' is corrupt")]
    Corrupt {
        /// The key that was read.
        key: String,
        /// The parse failure.
        #[source]
        source: serde_json::Error,
    },

    /// The store itself failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Saves and loads permit drafts in a [`KeyValueStore`].
///
/// Each save writes the envelope twice: under `{namespace}-{permit id}` and
/// under `{namespace}-latest`. The stored audit trail is append-only; events
/// already stored are kept even if the envelope being saved does not carry
/// them, and only the oldest events are dropped once the configured limit is
/// reached.
#[derive(Debug, Clone)]
pub struct DraftStore<S> {
    store: S,
    config: Config,
}

impl<S: KeyValueStore> DraftStore<S> {
    /// Wrap a store.
    #[must_use]
    pub const fn new(store: S, config: Config) -> Self {
        Self { store, config }
    }

    /// The configuration in use.
    #[must_use]
    pub const fn config(&self) -> &Config {
        &self.config
    }

    /// The underlying store.
    #[must_use]
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// Unwrap the underlying store.
    #[must_use]
    pub fn into_inner(self) -> S {
        self.store
    }

    /// The key a permit is stored under.
    #[must_use]
    pub fn key(&self, permit_id: &PermitId) -> String {
        format!("{}-{permit_id}", self.config.namespace())
    }

    /// The key of the most recently saved permit.
    #[must_use]
    pub fn latest_key(&self) -> String {
        format!("{}-latest", self.config.namespace())
    }

    /// Persist an envelope, returning exactly what was stored.
    ///
    /// # Errors
    ///
    /// Returns an error if the store cannot be read or written. A failed save
    /// leaves both keys holding what they held before.
    pub fn save(&mut self, envelope: &Envelope) -> Result<Envelope, StoreError> {
        let key = self.key(envelope.data.permit_id());
        let previous = self.store.get(&key)?;

        let parsed = previous.as_deref().map(serde_json::from_str::<Envelope>);
        let mut audit_trail = match parsed {
            None => Vec::new(),
            Some(Ok(stored)) => stored.audit_trail,
            Some(Err(e)) => {
                tracing::warn!("Discarding corrupt audit trail under '{key}': {e}");
                Vec::new()
            }
        };

        let mut seen: HashSet<String> = audit_trail
            .iter()
            .map(|event| event.id().to_string())
            .collect();
        audit_trail.extend(
            envelope
                .audit_trail
                .iter()
                .filter(|event| seen.insert(event.id().to_string()))
                .cloned(),
        );

        let limit = self.config.audit_trail_limit().get();
        if audit_trail.len() > limit {
            let excess = audit_trail.len() - limit;
            audit_trail.drain(..excess);
            tracing::debug!("Dropped {excess} oldest audit events from '{key}'");
        }

        let stored = Envelope {
            data: envelope.data.clone(),
            audit_trail,
        };
        let json = serde_json::to_string_pretty(&stored)?;

        self.store.set(&key, json.clone())?;
        if let Err(e) = self.store.set(&self.latest_key(), json) {
            self.restore(&key, previous);
            return Err(e);
        }

        tracing::debug!(
            "Saved '{key}' ({} audit events)",
            stored.audit_trail.len()
        );
        Ok(stored)
    }

    /// Put back the value `key` held before a save that failed half way.
    fn restore(&mut self, key: &str, previous: Option<String>) {
        let restored = match previous {
            Some(value) => self.store.set(key, value),
            None => self.store.remove(key),
        };
        match restored {
            Ok(()) => tracing::debug!("Rolled back '{key}'"),
            Err(e) => tracing::error!("Failed to roll back '{key}': {e}"),
        }
    }

    /// Load a permit by its identifier.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::NotFound`] if the permit was never saved,
    /// [`LoadError::Corrupt`] if the stored value cannot be parsed, and
    /// [`LoadError::Store`] if the store fails.
    pub fn load(&self, permit_id: &PermitId) -> Result<Envelope, LoadError> {
        self.load_key(&self.key(permit_id))
    }

    /// Load the most recently saved permit.
    ///
    /// # Errors
    ///
    /// See [`DraftStore::load`].
    pub fn load_latest(&self) -> Result<Envelope, LoadError> {
        self.load_key(&self.latest_key())
    }

    fn load_key(&self, key: &str) -> Result<Envelope, LoadError> {
        let json = self
            .store
            .get(key)?
            .ok_or_else(|| LoadError::NotFound(key.to_string()))?;
        serde_json::from_str(&json).map_err(|source| LoadError::Corrupt {
            key: key.to_string(),
            source,
        })
    }
}

impl DraftStore<DirectoryStore> {
    /// Every permit stored in the directory, keyed by storage key.
    ///
    /// Only keys of the form `{namespace}-{uuid}` are read, so `latest`
    /// aliases and the permits of a namespace that merely shares this one's
    /// prefix are skipped. Envelopes are parsed in parallel.
    #[must_use]
    pub fn list(&self) -> Vec<(String, Result<Envelope, LoadError>)> {
        let prefix = format!("{}-", self.config.namespace());

        let keys: Vec<String> = self
            .store
            .keys()
            .into_iter()
            .filter(|key| {
                key.strip_prefix(&prefix)
                    .is_some_and(|id| Uuid::try_parse(id).is_ok())
            })
            .collect();

        keys.into_par_iter()
            .map(|key| {
                let envelope = self.load_key(&key);
                (key, envelope)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::num::NonZeroUsize;

    use tempfile::TempDir;

    use super::*;
    use crate::{
        domain::{AuditAction, sections::BasicDetails},
        storage::MemoryStore,
    };

    fn drafts() -> DraftStore<MemoryStore> {
        DraftStore::new(MemoryStore::new(), Config::default())
    }

    fn envelope() -> Envelope {
        let document = PermitDocument::new(&Config::default());
        let basic = BasicDetails {
            power_line: "132kV Feeder 7".to_string(),
            ..document.step_data().basic.clone()
        };
        Envelope {
            data: document.with_step_data(basic),
            audit_trail: vec![AuditEvent::new(AuditAction::PermitCreated, None)],
        }
    }

    #[test]
    fn load_returns_what_was_saved() {
        let mut drafts = drafts();
        let envelope = envelope();

        let stored = drafts.save(&envelope).unwrap();

        assert_eq!(stored, envelope);
        assert_eq!(drafts.load(envelope.data.permit_id()).unwrap(), envelope);
        assert_eq!(drafts.load_latest().unwrap(), envelope);
    }

    #[test]
    fn writes_permit_and_latest_keys() {
        let mut drafts = drafts();
        let envelope = envelope();
        drafts.save(&envelope).unwrap();

        let mut keys: Vec<&str> = drafts.store().keys().collect();
        keys.sort_unstable();
        let expected = format!("permit-draft-{}", envelope.data.permit_id());
        assert_eq!(keys, ["permit-draft-latest", expected.as_str()]);
    }

    #[test]
    fn latest_follows_the_last_save() {
        let mut drafts = drafts();
        let first = envelope();
        let second = envelope();

        drafts.save(&first).unwrap();
        drafts.save(&second).unwrap();

        assert_eq!(drafts.load_latest().unwrap().data, second.data);
        assert_eq!(drafts.load(first.data.permit_id()).unwrap().data, first.data);
    }

    #[test]
    fn missing_permit_is_not_found() {
        let drafts = drafts();
        assert!(matches!(
            drafts.load_latest(),
            Err(LoadError::NotFound(key)) if key == "permit-draft-latest"
        ));
    }

    #[test]
    fn unparseable_value_is_corrupt() {
        let mut store = MemoryStore::new();
        store
            .set("permit-draft-latest", "{ not json".to_string())
            .unwrap();
        let drafts = DraftStore::new(store, Config::default());

        assert!(matches!(
            drafts.load_latest(),
            Err(LoadError::Corrupt { .. })
        ));
    }

    #[test]
    fn stored_events_survive_sessions_that_do_not_carry_them() {
        let mut drafts = drafts();
        let mut envelope = envelope();
        drafts.save(&envelope).unwrap();
        let created = envelope.audit_trail[0].clone();

        // a second session only knows about its own event
        envelope.audit_trail = vec![AuditEvent::new(AuditAction::DraftSaved, None)];
        let stored = drafts.save(&envelope).unwrap();

        let actions: Vec<&AuditAction> = stored
            .audit_trail
            .iter()
            .map(AuditEvent::action)
            .collect();
        assert_eq!(
            actions,
            [&AuditAction::PermitCreated, &AuditAction::DraftSaved]
        );
        assert_eq!(stored.audit_trail[0], created);
    }

    #[test]
    fn events_are_not_duplicated_on_resave() {
        let mut drafts = drafts();
        let envelope = envelope();

        drafts.save(&envelope).unwrap();
        let stored = drafts.save(&envelope).unwrap();

        assert_eq!(stored.audit_trail.len(), 1);
    }

    #[test]
    fn audit_trail_is_capped_keeping_the_newest() {
        let mut config = Config::default();
        config.set_audit_trail_limit(NonZeroUsize::new(3).unwrap());
        let mut drafts = DraftStore::new(MemoryStore::new(), config);

        let mut envelope = envelope();
        envelope.audit_trail = (0..5)
            .map(|_| AuditEvent::new(AuditAction::StepUpdated, None))
            .collect();
        let newest = envelope.audit_trail[2..].to_vec();

        let stored = drafts.save(&envelope).unwrap();
        assert_eq!(stored.audit_trail, newest);

        // a cap of one still keeps the most recent event
        let mut config = Config::default();
        config.set_audit_trail_limit(NonZeroUsize::MIN);
        let mut drafts = DraftStore::new(MemoryStore::new(), config);
        let stored = drafts.save(&envelope).unwrap();
        assert_eq!(stored.audit_trail, envelope.audit_trail[4..]);
    }

    #[test]
    fn corrupt_trail_is_replaced_on_save() {
        let mut drafts = drafts();
        let envelope = envelope();
        let key = drafts.key(envelope.data.permit_id());
        drafts.store.set(&key, "42".to_string()).unwrap();

        let stored = drafts.save(&envelope).unwrap();
        assert_eq!(stored, envelope);
    }

    #[test]
    fn list_reads_every_permit_in_a_directory() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryStore::new(tmp.path().to_path_buf()).unwrap();
        let mut drafts = DraftStore::new(store, Config::default());

        let first = envelope();
        let second = envelope();
        drafts.save(&first).unwrap();
        drafts.save(&second).unwrap();
        let broken = format!("permit-draft-{}", PermitId::generate());
        std::fs::write(tmp.path().join(format!("{broken}.json")), "oops").unwrap();
        std::fs::write(tmp.path().join("unrelated.json"), "{}").unwrap();

        let listed = drafts.list();

        assert_eq!(listed.len(), 3);
        let ok: Vec<&PermitId> = listed
            .iter()
            .filter_map(|(_, result)| result.as_ref().ok())
            .map(|envelope| envelope.data.permit_id())
            .collect();
        assert_eq!(ok.len(), 2);
        assert!(ok.contains(&first.data.permit_id()));
        assert!(ok.contains(&second.data.permit_id()));
        assert!(listed.iter().any(|(key, result)| {
            *key == broken && matches!(result, Err(LoadError::Corrupt { .. }))
        }));
    }

    #[test]
    fn list_skips_namespaces_sharing_a_prefix() {
        let tmp = TempDir::new().unwrap();
        let store = DirectoryStore::new(tmp.path().to_path_buf()).unwrap();
        let mut other = DraftStore::new(store.clone(), Config::default());
        other.save(&envelope()).unwrap();

        let mut config = Config::default();
        config.set_namespace("permit".parse().unwrap());
        let mut drafts = DraftStore::new(store, config);
        let own = envelope();
        drafts.save(&own).unwrap();

        let listed = drafts.list();

        let keys: Vec<&str> = listed.iter().map(|(key, _)| key.as_str()).collect();
        assert_eq!(keys, [drafts.key(own.data.permit_id()).as_str()]);
        assert_eq!(other.list().len(), 1);
    }
}
