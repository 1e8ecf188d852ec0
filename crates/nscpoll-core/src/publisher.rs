// ── State publisher ──
//
// Idempotent "declare then write" on top of a `StateStore`. A cache of
// what has already been declared avoids redeclaring on every poll; a
// state is redeclared only when its value type changes.

use std::sync::Arc;

use dashmap::DashMap;
use tracing::{debug, error, warn};

use crate::error::StoreError;
use crate::model::{Entry, ObjectDef, Quality, StateCommon, StateValue, StateWrite, ValueType};
use crate::store::StateStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Declared {
    Folder,
    Device,
    State(ValueType),
}

/// Publishes parser output and structural nodes into a [`StateStore`].
pub struct StatePublisher<S> {
    store: Arc<S>,
    declared: DashMap<String, Declared>,
}

impl<S: StateStore> StatePublisher<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            declared: DashMap::new(),
        }
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    fn cached(&self, id: &str) -> Option<Declared> {
        self.declared.get(id).map(|d| *d)
    }

    /// Create a valueless folder node at `id` if not already present.
    pub async fn ensure_folder(&self, id: &str) -> Result<(), StoreError> {
        if self.cached(id) == Some(Declared::Folder) {
            return Ok(());
        }
        let name = id.rsplit('.').next().unwrap_or(id).to_owned();
        self.store
            .declare_object(id, &ObjectDef::Folder { name })
            .await?;
        self.declared.insert(id.to_owned(), Declared::Folder);
        Ok(())
    }

    /// Create a device node at `id` carrying the human-readable `name`.
    pub async fn ensure_device(&self, id: &str, name: &str) -> Result<(), StoreError> {
        if self.cached(id) == Some(Declared::Device) {
            return Ok(());
        }
        self.store
            .declare_object(
                id,
                &ObjectDef::Device {
                    name: name.to_owned(),
                },
            )
            .await?;
        self.declared.insert(id.to_owned(), Declared::Device);
        Ok(())
    }

    /// Declare the state at `id` if needed, then write `value` acknowledged.
    ///
    /// A failed declaration is logged and the write is still attempted;
    /// only the write's outcome is returned.
    pub async fn upsert(
        &self,
        id: &str,
        value: StateValue,
        quality: Quality,
        common: &StateCommon,
    ) -> Result<(), StoreError> {
        let value_type = value.value_type();
        if self.cached(id) != Some(Declared::State(value_type)) {
            let mut common = common.clone();
            common.value_type = value_type;
            match self
                .store
                .declare_object(id, &ObjectDef::State(common))
                .await
            {
                Ok(()) => {
                    self.declared
                        .insert(id.to_owned(), Declared::State(value_type));
                }
                Err(e) => error!(path = %id, error = %e, "failed to declare state"),
            }
        }

        let write = StateWrite {
            value,
            ack: true,
            quality,
        };
        self.store.write_state(id, &write).await?;
        debug!(path = %id, value = %write.value, "state written");
        Ok(())
    }

    /// Publish parser output in order. Returns the number of entries that
    /// failed; failures never stop the remaining entries.
    pub async fn publish(&self, entries: &[Entry]) -> usize {
        let mut failed = 0;
        for entry in entries {
            let result = match entry {
                Entry::Folder { id } => self.ensure_folder(id).await,
                Entry::State(leaf) => {
                    self.upsert(&leaf.id, leaf.value.clone(), Quality::GOOD, &leaf.common)
                        .await
                }
            };
            if let Err(e) = result {
                warn!(path = %entry.id(), error = %e, "failed to publish");
                failed += 1;
            }
        }
        failed
    }
}
