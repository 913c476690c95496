//! Persistence store: string key/value pairs holding JSON documents.

mod memory;
mod migrations;
mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::Database;

use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Serialize};

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&self, key: &str, value: &str) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Reads and decodes a document. A missing key is `Ok(None)`; a present but
/// undecodable value is an error so callers can decide how to fall back.
pub fn load_document<T: DeserializeOwned>(store: &dyn KeyValueStore, key: &str) -> Result<Option<T>> {
    let Some(raw) = store.get(key)? else {
        return Ok(None);
    };
    let document = serde_json::from_str(&raw)
        .with_context(|| format!("malformed document under '{key}'"))?;
    Ok(Some(document))
}

pub fn save_document<T: Serialize>(store: &dyn KeyValueStore, key: &str, document: &T) -> Result<()> {
    let serialized = serde_json::to_string(document)
        .with_context(|| format!("failed to encode document for '{key}'"))?;
    store.set(key, &serialized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{GeneralState, GENERAL_STATE_KEY};

    #[test]
    fn documents_round_trip_through_a_store() {
        let store = MemoryStore::new();
        let state = GeneralState {
            task_name: "Inbox zero".into(),
            ..GeneralState::default()
        };

        save_document(&store, GENERAL_STATE_KEY, &state).unwrap();
        let loaded: Option<GeneralState> = load_document(&store, GENERAL_STATE_KEY).unwrap();

        assert_eq!(loaded, Some(state));
    }

    #[test]
    fn missing_and_malformed_documents_are_distinguished() {
        let store = MemoryStore::new();
        let missing: Option<GeneralState> = load_document(&store, GENERAL_STATE_KEY).unwrap();
        assert!(missing.is_none());

        store.set(GENERAL_STATE_KEY, "{not json").unwrap();
        let malformed = load_document::<GeneralState>(&store, GENERAL_STATE_KEY);
        assert!(malformed.is_err());
    }
}
