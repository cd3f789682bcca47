//! Durable widget snapshot: a single named slot holding `[{id, sourceText}]`.

use crate::registry::WidgetDefinition;
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use sled::Db;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};
use thiserror::Error;
use tracing::{debug, warn};
use voxgrid_synth::{PropertyBag, WidgetId};

#[derive(Error, Debug)]
pub enum PersistenceError {
    #[error("stored widget data is malformed: {0}")]
    MalformedStoredData(String),
    #[error("store error: {0}")]
    Store(String),
}

impl From<sled::Error> for PersistenceError {
    fn from(e: sled::Error) -> Self {
        PersistenceError::Store(e.to_string())
    }
}

pub type PersistenceResult<T> = Result<T, PersistenceError>;

/// Key/value slot storage.
pub trait SlotStore: Send + Sync {
    fn read(&self, slot: &str) -> PersistenceResult<Option<Vec<u8>>>;
    fn write(&self, slot: &str, value: &[u8]) -> PersistenceResult<()>;
    fn clear(&self, slot: &str) -> PersistenceResult<()>;
}

// ---------------------------------------------------------------------------
// Sled-backed store
// ---------------------------------------------------------------------------

/// Sled database with a hot in-memory cache, checked before sled.
pub struct SledSlotStore {
    db: Db,
    cache: Arc<DashMap<String, Vec<u8>>>,
}

impl SledSlotStore {
    pub fn open_path<P: AsRef<Path>>(path: P) -> Result<Self, sled::Error> {
        let db = sled::open(path)?;
        Ok(Self {
            db,
            cache: Arc::new(DashMap::new()),
        })
    }
}

impl SlotStore for SledSlotStore {
    fn read(&self, slot: &str) -> PersistenceResult<Option<Vec<u8>>> {
        if let Some(v) = self.cache.get(slot) {
            return Ok(Some(v.clone()));
        }
        let out = self.db.get(slot.as_bytes())?.map(|iv| iv.to_vec());
        if let Some(ref bytes) = out {
            self.cache.insert(slot.to_string(), bytes.clone());
        }
        Ok(out)
    }

    fn write(&self, slot: &str, value: &[u8]) -> PersistenceResult<()> {
        self.db.insert(slot.as_bytes(), value)?;
        self.db.flush()?;
        self.cache.insert(slot.to_string(), value.to_vec());
        Ok(())
    }

    fn clear(&self, slot: &str) -> PersistenceResult<()> {
        self.cache.remove(slot);
        self.db.remove(slot.as_bytes())?;
        self.db.flush()?;
        Ok(())
    }
}

/// Process-local store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemorySlotStore {
    slots: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemorySlotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slots(&self) -> PersistenceResult<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.slots
            .lock()
            .map_err(|_| PersistenceError::Store("memory store lock poisoned".to_string()))
    }
}

impl SlotStore for MemorySlotStore {
    fn read(&self, slot: &str) -> PersistenceResult<Option<Vec<u8>>> {
        Ok(self.slots()?.get(slot).cloned())
    }

    fn write(&self, slot: &str, value: &[u8]) -> PersistenceResult<()> {
        self.slots()?.insert(slot.to_string(), value.to_vec());
        Ok(())
    }

    fn clear(&self, slot: &str) -> PersistenceResult<()> {
        self.slots()?.remove(slot);
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Bridge
// ---------------------------------------------------------------------------

/// Wire form of one persisted widget. Properties are not stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredWidget {
    id: WidgetId,
    #[serde(rename = "sourceText", alias = "code")]
    source_text: String,
}

pub struct PersistenceBridge {
    store: Arc<dyn SlotStore>,
    slot: String,
}

impl PersistenceBridge {
    pub fn new(store: Arc<dyn SlotStore>, slot: impl Into<String>) -> Self {
        Self {
            store,
            slot: slot.into(),
        }
    }

    pub fn slot(&self) -> &str {
        &self.slot
    }

    pub fn save(&self, definitions: &[WidgetDefinition]) -> PersistenceResult<()> {
        let stored: Vec<StoredWidget> = definitions
            .iter()
            .map(|d| StoredWidget {
                id: d.id.clone(),
                source_text: d.source_text.clone(),
            })
            .collect();
        let bytes = serde_json::to_vec(&stored)
            .map_err(|e| PersistenceError::Store(e.to_string()))?;
        self.store.write(&self.slot, &bytes)?;
        debug!(
            target: "voxgrid::persistence",
            slot = %self.slot,
            widgets = stored.len(),
            "snapshot saved"
        );
        Ok(())
    }

    /// Strict load: a malformed slot is an error and is left in place.
    pub fn try_load(&self) -> PersistenceResult<Vec<WidgetDefinition>> {
        let Some(bytes) = self.store.read(&self.slot)? else {
            return Ok(Vec::new());
        };
        let stored: Vec<StoredWidget> = serde_json::from_slice(&bytes)
            .map_err(|e| PersistenceError::MalformedStoredData(e.to_string()))?;
        Ok(stored
            .into_iter()
            .map(|s| WidgetDefinition::new(s.id, s.source_text, PropertyBag::new()))
            .collect())
    }

    /// Never fails: malformed data is logged and discarded, store errors yield
    /// an empty list.
    pub fn load(&self) -> Vec<WidgetDefinition> {
        match self.try_load() {
            Ok(defs) => defs,
            Err(PersistenceError::MalformedStoredData(reason)) => {
                warn!(
                    target: "voxgrid::persistence",
                    slot = %self.slot,
                    reason = %reason,
                    "discarding malformed widget slot"
                );
                if let Err(e) = self.store.clear(&self.slot) {
                    warn!(target: "voxgrid::persistence", error = %e, "failed to clear slot");
                }
                Vec::new()
            }
            Err(e) => {
                warn!(target: "voxgrid::persistence", error = %e, "widget slot unreadable");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bridge() -> (Arc<MemorySlotStore>, PersistenceBridge) {
        let store = Arc::new(MemorySlotStore::new());
        let bridge = PersistenceBridge::new(store.clone(), "dashboard-widgets");
        (store, bridge)
    }

    #[test]
    fn empty_slot_loads_empty() {
        let (_, bridge) = bridge();
        assert!(bridge.load().is_empty());
    }

    #[test]
    fn save_writes_id_and_source_text_only() {
        let (store, bridge) = bridge();
        let mut props = PropertyBag::new();
        props.insert("city".into(), "Oslo".into());
        bridge
            .save(&[WidgetDefinition::new("w1".into(), "const AWidget = () => 1", props)])
            .unwrap();

        let raw = store.read("dashboard-widgets").unwrap().unwrap();
        let json: serde_json::Value = serde_json::from_slice(&raw).unwrap();
        assert_eq!(
            json,
            serde_json::json!([{ "id": "w1", "sourceText": "const AWidget = () => 1" }])
        );

        let loaded = bridge.load();
        assert_eq!(loaded.len(), 1);
        assert!(loaded[0].properties.is_empty());
    }

    #[test]
    fn legacy_code_field_accepted() {
        let (store, bridge) = bridge();
        store
            .write("dashboard-widgets", br#"[{"id":"old","code":"const OldWidget = () => 'x'"}]"#)
            .unwrap();
        let loaded = bridge.load();
        assert_eq!(loaded[0].id.as_str(), "old");
        assert_eq!(loaded[0].source_text, "const OldWidget = () => 'x'");
    }

    #[test]
    fn malformed_slot_is_discarded() {
        let (store, bridge) = bridge();
        store.write("dashboard-widgets", b"{not json").unwrap();
        assert!(matches!(
            bridge.try_load(),
            Err(PersistenceError::MalformedStoredData(_))
        ));
        assert!(bridge.load().is_empty());
        assert!(store.read("dashboard-widgets").unwrap().is_none());
    }

    #[test]
    fn wrong_shape_is_malformed() {
        let (store, bridge) = bridge();
        store.write("dashboard-widgets", br#"{"id":"w1"}"#).unwrap();
        assert!(bridge.try_load().is_err());
    }
}
