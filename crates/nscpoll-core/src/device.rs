// ── Per-device runtime context ──
//
// Mutable poll state of one agent. The flags are atomics so a context can
// be shared behind an `Arc` between its timer task and one-shot polls.

use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::catalog::CheckKind;
use crate::config::DeviceConfig;
use crate::model::{StateCommon, ValueType};

/// Reachability overlay of a device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reachability {
    /// No poll has finished yet.
    Unknown,
    Online,
    Offline,
}

impl Reachability {
    fn to_u8(self) -> u8 {
        match self {
            Self::Unknown => 0,
            Self::Online => 1,
            Self::Offline => 2,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            1 => Self::Online,
            2 => Self::Offline,
            _ => Self::Unknown,
        }
    }
}

/// Runtime state of one configured agent.
pub struct DeviceContext<Q> {
    name: String,
    id: String,
    address: String,
    checks: Vec<CheckKind>,
    timeout: Duration,
    poll_interval: Duration,
    source: Q,
    busy: AtomicBool,
    initialized: AtomicBool,
    reachability: AtomicU8,
    timer: CancellationToken,
}

impl<Q> DeviceContext<Q> {
    pub fn new(config: &DeviceConfig, source: Q) -> Self {
        Self {
            name: config.name.trim().to_owned(),
            id: config.id(),
            address: format!("{}:{}", config.host, config.port),
            checks: config.checks.enabled_checks(),
            timeout: config.timeout,
            poll_interval: config.poll_interval,
            source,
            busy: AtomicBool::new(false),
            initialized: AtomicBool::new(false),
            reachability: AtomicU8::new(Reachability::Unknown.to_u8()),
            timer: CancellationToken::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized store id; root of this device's subtree.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// `host:port` of the agent.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Enabled checks in run order.
    pub fn checks(&self) -> &[CheckKind] {
        &self.checks
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn source(&self) -> &Q {
        &self.source
    }

    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized.load(Ordering::Acquire)
    }

    pub(crate) fn mark_initialized(&self) {
        self.initialized.store(true, Ordering::Release);
    }

    pub fn reachability(&self) -> Reachability {
        Reachability::from_u8(self.reachability.load(Ordering::Acquire))
    }

    /// Set the reachability and return the previous one.
    pub(crate) fn set_reachability(&self, next: Reachability) -> Reachability {
        Reachability::from_u8(self.reachability.swap(next.to_u8(), Ordering::AcqRel))
    }

    /// Claim the device for one poll cycle. `None` while a cycle runs.
    pub(crate) fn try_begin(&self) -> Option<BusyGuard<'_>> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| BusyGuard { busy: &self.busy })
    }

    /// Token cancelling this device's repeating poll.
    pub fn timer(&self) -> &CancellationToken {
        &self.timer
    }

    /// Id of the reachability indicator state.
    pub fn online_id(&self) -> String {
        format!("{}.online", self.id)
    }

    pub(crate) fn online_common(&self) -> StateCommon {
        StateCommon::read_only(
            format!("{} online", self.name),
            ValueType::Boolean,
            "indicator.reachable",
        )
    }
}

/// Clears the busy flag when a poll cycle ends, however it ends.
pub(crate) struct BusyGuard<'a> {
    busy: &'a AtomicBool,
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}
