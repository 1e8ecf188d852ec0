//! Configuration for the nscpoll binary.
//!
//! A TOML device list layered with `NSCPOLL_` environment overrides,
//! per-device password resolution (env + keyring + plaintext), and
//! validation into `nscpoll_core::DeviceConfig`. Core never reads files;
//! this crate is the only place that does.

mod validate;

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use nscpoll_core::{CheckFlags, DeviceConfig};
use nscpoll_core::config::{DEFAULT_POLL_INTERVAL_SECS, DEFAULT_TIMEOUT_SECS};

pub use validate::{ConfigIssue, effective_poll_interval, effective_timeout, parse_address, validate};

/// Keyring service under which device passwords are stored.
pub const KEYRING_SERVICE: &str = "nscpoll";

/// Prefix of environment overrides, e.g. `NSCPOLL_DEFAULTS__TIMEOUT=10`.
pub const ENV_PREFIX: &str = "NSCPOLL_";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{} configuration problem(s) found", .0.len())]
    Invalid(Vec<ConfigIssue>),

    #[error("no devices configured")]
    NoDevices,

    #[error("no password for device '{device}': ${env} is not set and no other source has one")]
    NoCredentials { device: String, env: String },

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct Config {
    /// Fallbacks for devices that omit a setting.
    #[serde(default)]
    pub defaults: Defaults,

    /// Monitored agents, in poll order.
    #[serde(default)]
    pub devices: Vec<DeviceEntry>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Defaults {
    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Poll interval in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,

    /// Look device passwords up in the system keyring.
    #[serde(default = "default_true")]
    pub keyring: bool,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
            keyring: true,
        }
    }
}

fn default_timeout() -> u64 {
    DEFAULT_TIMEOUT_SECS
}
fn default_poll_interval() -> u64 {
    DEFAULT_POLL_INTERVAL_SECS
}
fn default_true() -> bool {
    true
}

/// One `[[devices]]` table.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DeviceEntry {
    /// Display name; the store id is derived from it.
    #[serde(default)]
    pub name: String,

    #[serde(default = "default_true")]
    pub enabled: bool,

    /// `host` or `host:port` of the agent.
    #[serde(default)]
    pub address: String,

    #[serde(default)]
    pub username: String,

    /// Plaintext password; keyring and env var take precedence.
    pub password: Option<String>,

    /// Environment variable name containing the password.
    pub password_env: Option<String>,

    /// Override `defaults.timeout`.
    pub timeout: Option<u64>,

    /// Override `defaults.poll_interval`.
    pub poll_interval: Option<u64>,

    #[serde(default)]
    pub checks: CheckFlags,

    /// CA certificate to verify the agent with, instead of accepting any.
    pub ca_cert: Option<PathBuf>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "nscpoll", "nscpoll").map_or_else(
        || PathBuf::from("nscpoll.toml"),
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the config from `path` layered with environment overrides.
///
/// A missing file yields an empty device list, which validation rejects.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed(ENV_PREFIX).ignore(&["config"]).split("__"));

    let config: Config = figment.extract()?;
    Ok(config)
}

/// Load and validate in one step.
pub fn load_devices(path: &Path) -> Result<Vec<DeviceConfig>, ConfigError> {
    validate(&load_config_from(path)?)
}

// ── Credential resolution ───────────────────────────────────────────

/// Resolve a device password from the credential chain.
///
/// Order: `password_env` → system keyring (`nscpoll`, `<name>/password`)
/// → plaintext. A device without any password gets an empty one, unless it
/// names a `password_env` that nothing could satisfy.
pub fn resolve_password(
    entry: &DeviceEntry,
    use_keyring: bool,
) -> Result<SecretString, ConfigError> {
    let name = entry.name.trim();

    // 1. Env var named by the entry
    if let Some(ref env_name) = entry.password_env {
        if let Ok(val) = std::env::var(env_name) {
            return Ok(SecretString::from(val));
        }
    }

    // 2. System keyring
    if use_keyring {
        if let Ok(keyring_entry) = keyring::Entry::new(KEYRING_SERVICE, &format!("{name}/password")) {
            if let Ok(pw) = keyring_entry.get_password() {
                return Ok(SecretString::from(pw));
            }
        }
    }

    // 3. Plaintext in config
    if let Some(ref pw) = entry.password {
        return Ok(SecretString::from(pw.trim().to_owned()));
    }

    match entry.password_env {
        Some(ref env) => Err(ConfigError::NoCredentials {
            device: name.to_owned(),
            env: env.clone(),
        }),
        None => Ok(SecretString::from(String::new())),
    }
}
