// In-memory state store backed by `DashMap`, with a `watch` version
// counter so observers can wait for changes.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tokio::sync::watch;

use super::StateStore;
use crate::error::StoreError;
use crate::model::{ObjectDef, Quality, StateValue, StateWrite, ValueType};

/// A stored value with its write metadata.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredValue {
    pub value: StateValue,
    pub ack: bool,
    pub quality: Quality,
    pub ts: DateTime<Utc>,
}

/// One row of a store snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StateRow {
    pub id: String,
    #[serde(rename = "type")]
    pub value_type: ValueType,
    pub role: String,
    pub value: Option<StateValue>,
    pub ack: bool,
    pub quality: Quality,
    pub ts: Option<DateTime<Utc>>,
}

/// Concurrent in-memory implementation of [`StateStore`].
pub struct MemoryStore {
    objects: DashMap<String, ObjectDef>,
    values: DashMap<String, StoredValue>,
    version: watch::Sender<u64>,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        let (version, _) = watch::channel(0u64);
        Self {
            objects: DashMap::new(),
            values: DashMap::new(),
            version,
        }
    }

    /// The declared object at `id`, if any.
    pub fn object(&self, id: &str) -> Option<ObjectDef> {
        self.objects.get(id).map(|o| o.clone())
    }

    /// The current value of the state at `id`, if one was written.
    pub fn state(&self, id: &str) -> Option<StoredValue> {
        self.values.get(id).map(|v| v.clone())
    }

    /// All declared states, sorted by id.
    pub fn snapshot(&self) -> Vec<StateRow> {
        let mut rows: Vec<StateRow> = self
            .objects
            .iter()
            .filter_map(|entry| {
                let ObjectDef::State(common) = entry.value() else {
                    return None;
                };
                let stored = self.values.get(entry.key()).map(|v| v.clone());
                Some(StateRow {
                    id: entry.key().clone(),
                    value_type: common.value_type,
                    role: common.role.clone(),
                    ack: stored.as_ref().is_some_and(|s| s.ack),
                    quality: stored.as_ref().map_or(Quality::GOOD, |s| s.quality),
                    ts: stored.as_ref().map(|s| s.ts),
                    value: stored.map(|s| s.value),
                })
            })
            .collect();
        rows.sort_by(|a, b| a.id.cmp(&b.id));
        rows
    }

    /// Subscribe to the mutation counter.
    pub fn subscribe(&self) -> watch::Receiver<u64> {
        self.version.subscribe()
    }

    fn bump_version(&self) {
        self.version.send_modify(|v| *v += 1);
    }
}

fn validate_id(id: &str) -> Result<(), StoreError> {
    if id.is_empty() || id.split('.').any(str::is_empty) {
        return Err(StoreError::InvalidId { id: id.to_owned() });
    }
    Ok(())
}

impl StateStore for MemoryStore {
    async fn declare_object(&self, id: &str, object: &ObjectDef) -> Result<(), StoreError> {
        validate_id(id)?;

        let previous = self.objects.insert(id.to_owned(), object.clone());
        // A type change invalidates the stored value.
        if previous.and_then(|p| p.value_type()) != object.value_type() {
            self.values.remove(id);
        }

        self.bump_version();
        Ok(())
    }

    async fn write_state(&self, id: &str, write: &StateWrite) -> Result<(), StoreError> {
        let declared = {
            let object = self
                .objects
                .get(id)
                .ok_or_else(|| StoreError::UnknownObject { id: id.to_owned() })?;
            object
                .value_type()
                .ok_or_else(|| StoreError::NotAState { id: id.to_owned() })?
        };

        let actual = write.value.value_type();
        if declared != actual {
            return Err(StoreError::TypeMismatch {
                id: id.to_owned(),
                declared,
                actual,
            });
        }

        self.values.insert(
            id.to_owned(),
            StoredValue {
                value: write.value.clone(),
                ack: write.ack,
                quality: write.quality,
                ts: Utc::now(),
            },
        );
        self.bump_version();
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::StateCommon;

    fn number_state() -> ObjectDef {
        ObjectDef::State(StateCommon::read_only("load", ValueType::Number, "value"))
    }

    fn write(value: StateValue) -> StateWrite {
        StateWrite {
            value,
            ack: true,
            quality: Quality::GOOD,
        }
    }

    #[tokio::test]
    async fn rejects_writes_to_undeclared_objects() {
        let store = MemoryStore::new();
        let err = store
            .write_state("a.b", &write(StateValue::Number(1.0)))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::UnknownObject { .. }));
    }

    #[tokio::test]
    async fn rejects_writes_to_folders_and_wrong_types() {
        let store = MemoryStore::new();
        store
            .declare_object("a", &ObjectDef::Folder { name: "a".into() })
            .await
            .unwrap();
        store.declare_object("a.load", &number_state()).await.unwrap();

        let folder = store
            .write_state("a", &write(StateValue::Number(1.0)))
            .await
            .unwrap_err();
        assert!(matches!(folder, StoreError::NotAState { .. }));

        let mismatch = store
            .write_state("a.load", &write(StateValue::Text("x".into())))
            .await
            .unwrap_err();
        assert!(matches!(
            mismatch,
            StoreError::TypeMismatch {
                declared: ValueType::Number,
                actual: ValueType::String,
                ..
            }
        ));
    }

    #[tokio::test]
    async fn rejects_empty_segments() {
        let store = MemoryStore::new();
        for id in ["", "a..b", ".a", "a."] {
            assert!(matches!(
                store.declare_object(id, &number_state()).await,
                Err(StoreError::InvalidId { .. })
            ));
        }
    }

    #[tokio::test]
    async fn redeclaring_with_new_type_drops_old_value() {
        let store = MemoryStore::new();
        store.declare_object("x", &number_state()).await.unwrap();
        store
            .write_state("x", &write(StateValue::Number(3.0)))
            .await
            .unwrap();

        let text = ObjectDef::State(StateCommon::read_only("x", ValueType::String, "value"));
        store.declare_object("x", &text).await.unwrap();

        assert!(store.state("x").is_none());
        store
            .write_state("x", &write(StateValue::Text("3 MB".into())))
            .await
            .unwrap();
        assert_eq!(store.state("x").unwrap().value, StateValue::Text("3 MB".into()));
    }

    #[tokio::test]
    async fn snapshot_lists_states_sorted() {
        let store = MemoryStore::new();
        let rx = store.subscribe();
        store.declare_object("b", &number_state()).await.unwrap();
        store.declare_object("a", &number_state()).await.unwrap();
        store
            .declare_object("f", &ObjectDef::Folder { name: "f".into() })
            .await
            .unwrap();
        store
            .write_state("a", &write(StateValue::Number(2.0)))
            .await
            .unwrap();

        let rows = store.snapshot();
        let ids: Vec<&str> = rows.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["a", "b"]);
        assert_eq!(rows[0].value, Some(StateValue::Number(2.0)));
        assert!(rows[0].ack);
        assert_eq!(rows[1].value, None);
        assert_eq!(*rx.borrow(), 4);
    }
}
