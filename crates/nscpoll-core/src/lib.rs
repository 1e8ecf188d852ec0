//! Polling engine between `nscpoll-api` and a hierarchical state store.
//!
//! - **[`Scheduler`]** owns one [`DeviceContext`] per enabled agent and
//!   drives each on its own timer: an immediate poll, then one per interval.
//!   [`Scheduler::poll_all_once`] runs a single cycle for one-shot use.
//!
//! - **[`poll_device`]** is the per-device state machine: identify the agent
//!   once, then run its enabled checks in catalog order, tracking
//!   reachability in `<id>.online`.
//!
//! - **[`CheckKind`]** catalogs the agent queries and their
//!   [`PayloadParser`]s, which turn JSON bodies into ordered state entries.
//!
//! - **[`StatePublisher`]** declares and writes those entries through the
//!   [`StateStore`] trait; [`MemoryStore`] is the bundled implementation.

pub mod catalog;
pub mod config;
pub mod device;
pub mod error;
pub mod model;
pub mod normalize;
pub mod parser;
pub mod poller;
pub mod publisher;
pub mod scheduler;
pub mod store;

#[cfg(test)]
mod testing;

// ── Primary re-exports ──────────────────────────────────────────────
pub use catalog::CheckKind;
pub use config::{CheckFlags, DeviceConfig, TlsVerification};
pub use device::{DeviceContext, Reachability};
pub use error::{CoreError, ParseError, StoreError};
pub use model::{ObjectDef, Quality, Severity, StateCommon, StateValue, StateWrite, ValueType};
pub use parser::{Payload, PayloadParser};
pub use poller::{CheckSource, PollOutcome, poll_device};
pub use publisher::StatePublisher;
pub use scheduler::{CONNECTION_ID, Scheduler};
pub use store::{MemoryStore, StateRow, StateStore, StoredValue};
