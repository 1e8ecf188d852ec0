// ── Runtime device configuration ──
//
// These types describe *which* agents to poll and how. They carry
// credentials and tuning but never touch disk: the config crate loads,
// validates and clamps them before handing them in.

use std::ops::RangeInclusive;
use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use url::Url;

pub use nscpoll_api::TlsMode as TlsVerification;

use crate::catalog::CheckKind;
use crate::normalize::to_id;

/// Agent port used when the address carries none.
pub const DEFAULT_PORT: u16 = 8443;

/// Request timeout, in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 5;
pub const TIMEOUT_RANGE_SECS: RangeInclusive<u64> = 1..=600;

/// Poll interval, in seconds.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 30;
pub const POLL_INTERVAL_RANGE_SECS: RangeInclusive<u64> = 5..=3600;

/// Which optional checks a device runs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CheckFlags {
    pub cpu: bool,
    pub memory: bool,
    pub drives: bool,
}

impl CheckFlags {
    /// Enabled checks in run order.
    pub fn enabled_checks(self) -> Vec<CheckKind> {
        [
            (self.cpu, CheckKind::CheckCpu),
            (self.drives, CheckKind::CheckDrivesize),
            (self.memory, CheckKind::CheckMemory),
        ]
        .into_iter()
        .filter_map(|(on, kind)| on.then_some(kind))
        .collect()
    }
}

/// One validated agent entry.
#[derive(Debug, Clone)]
pub struct DeviceConfig {
    /// Display name; the store id is derived from it.
    pub name: String,
    pub enabled: bool,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: SecretString,
    pub timeout: Duration,
    pub poll_interval: Duration,
    pub checks: CheckFlags,
    pub tls: TlsVerification,
}

impl DeviceConfig {
    /// Normalized store id of this device.
    pub fn id(&self) -> String {
        to_id(self.name.trim())
    }

    /// Agent base URL, `https://<host>:<port>`.
    pub fn endpoint(&self) -> Result<Url, url::ParseError> {
        Url::parse(&format!("https://{}:{}", self.host, self.port))
    }
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            enabled: true,
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            password: SecretString::from(String::new()),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            checks: CheckFlags::default(),
            tls: TlsVerification::default(),
        }
    }
}
