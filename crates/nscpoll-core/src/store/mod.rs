// ── State store boundary ──
//
// The host store is an external collaborator. The core only declares
// objects and writes values through this trait; `MemoryStore` is the
// bundled implementation used by the binary and the tests.

mod memory;

use std::future::Future;

pub use memory::{MemoryStore, StateRow, StoredValue};

use crate::error::StoreError;
use crate::model::{ObjectDef, StateWrite};

/// Hierarchical key-value store of declared objects and their values.
///
/// Implementations must accept concurrent calls for disjoint ids.
pub trait StateStore: Send + Sync + 'static {
    /// Create or update the object at `id`.
    fn declare_object(
        &self,
        id: &str,
        object: &ObjectDef,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;

    /// Write a value to a previously declared state.
    fn write_state(
        &self,
        id: &str,
        write: &StateWrite,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
}
