// ── Config validation ──
//
// Turns raw `DeviceEntry` tables into `DeviceConfig`s. Hard problems are
// collected per device and reported together; out-of-range timings are
// clamped with a warning instead.

use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use tracing::{debug, warn};

use nscpoll_core::config::{
    DEFAULT_POLL_INTERVAL_SECS, DEFAULT_PORT, DEFAULT_TIMEOUT_SECS, POLL_INTERVAL_RANGE_SECS,
    TIMEOUT_RANGE_SECS,
};
use nscpoll_core::normalize::to_id;
use nscpoll_core::{DeviceConfig, TlsVerification};

use crate::{Config, ConfigError, DeviceEntry, resolve_password};

/// One problem with one device entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigIssue {
    /// Device name, or `#<n>` when the name itself is unusable.
    pub device: String,
    pub field: &'static str,
    pub reason: String,
}

impl fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "device '{}': invalid {}: {}", self.device, self.field, self.reason)
    }
}

/// Validate every enabled device entry.
///
/// Disabled entries are skipped but still count towards "at least one
/// device configured".
pub fn validate(config: &Config) -> Result<Vec<DeviceConfig>, ConfigError> {
    if config.devices.is_empty() {
        return Err(ConfigError::NoDevices);
    }

    let mut issues = Vec::new();
    let mut devices = Vec::new();
    let mut seen_ids: HashMap<String, String> = HashMap::new();

    for (index, entry) in config.devices.iter().enumerate() {
        let name = entry.name.trim();
        if !entry.enabled {
            debug!(device = %name, "device disabled");
            continue;
        }

        let label = if name.is_empty() {
            format!("#{}", index + 1)
        } else {
            name.to_owned()
        };
        let mut issue = |field: &'static str, reason: String| {
            issues.push(ConfigIssue {
                device: label.clone(),
                field,
                reason,
            });
        };
        let mut valid = true;

        if let Err(reason) = check_name(name) {
            issue("name", reason);
            valid = false;
        } else {
            let id = to_id(name);
            if let Some(other) = seen_ids.insert(id.clone(), name.to_owned()) {
                issue(
                    "name",
                    format!("'{name}' and '{other}' both map to id '{id}'"),
                );
                valid = false;
            }
        }

        let address = parse_address(&entry.address);
        if let Err(ref reason) = address {
            issue("address", reason.clone());
            valid = false;
        }

        let password = match resolve_password(entry, config.defaults.keyring) {
            Ok(pw) => Some(pw),
            Err(e) => {
                issue("password", e.to_string());
                None
            }
        };

        let tls = match entry.ca_cert {
            Some(ref path) if !path.is_file() => {
                issue("ca_cert", format!("'{}' is not a file", path.display()));
                valid = false;
                TlsVerification::default()
            }
            Some(ref path) => TlsVerification::CustomCa(path.clone()),
            None => TlsVerification::default(),
        };

        let (Ok((host, port)), Some(password), true) = (address, password, valid) else {
            continue;
        };

        let timeout = effective_timeout(name, entry.timeout.unwrap_or(config.defaults.timeout));
        let poll_interval = effective_poll_interval(
            name,
            entry.poll_interval.unwrap_or(config.defaults.poll_interval),
            timeout,
        );

        devices.push(build_device(entry, host, port, password, timeout, poll_interval, tls));
    }

    if !issues.is_empty() {
        return Err(ConfigError::Invalid(issues));
    }
    Ok(devices)
}

fn build_device(
    entry: &DeviceEntry,
    host: String,
    port: u16,
    password: secrecy::SecretString,
    timeout: u64,
    poll_interval: u64,
    tls: TlsVerification,
) -> DeviceConfig {
    DeviceConfig {
        name: entry.name.trim().to_owned(),
        enabled: true,
        host,
        port,
        username: entry.username.trim().to_owned(),
        password,
        timeout: Duration::from_secs(timeout),
        poll_interval: Duration::from_secs(poll_interval),
        checks: entry.checks,
        tls,
    }
}

fn check_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("name must not be empty".into());
    }
    if name.starts_with('.') || name.ends_with('.') {
        return Err(format!("'{name}' must not start or end with '.'"));
    }
    if name.contains("..") {
        return Err(format!("'{name}' must not contain '..'"));
    }
    Ok(())
}

/// Split `host[:port]`, defaulting the port.
///
/// The host must be an IPv4 address or a name made of ASCII letters,
/// digits, `.` and `-`.
pub fn parse_address(address: &str) -> Result<(String, u16), String> {
    let address = address.trim();
    let (host, port) = match address.rsplit_once(':') {
        Some((host, port)) => {
            let port = port
                .parse::<u16>()
                .ok()
                .filter(|p| *p != 0)
                .ok_or_else(|| format!("'{port}' is not a valid port"))?;
            (host, port)
        }
        None => (address, DEFAULT_PORT),
    };

    if host.is_empty() {
        return Err("address must not be empty".into());
    }
    if !host
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
    {
        return Err(format!("'{address}' is not an IPv4 address or host name"));
    }
    Ok((host.to_owned(), port))
}

/// Timeout in seconds: 0 means default, otherwise clamped into range.
pub fn effective_timeout(device: &str, raw: u64) -> u64 {
    if raw == 0 {
        return DEFAULT_TIMEOUT_SECS;
    }
    let clamped = raw.clamp(*TIMEOUT_RANGE_SECS.start(), *TIMEOUT_RANGE_SECS.end());
    if clamped != raw {
        warn!(device = %device, requested = raw, used = clamped, "timeout out of range, adjusted");
    }
    clamped
}

/// Poll interval in seconds: 0 means default, clamped into range, and
/// always longer than the timeout.
pub fn effective_poll_interval(device: &str, raw: u64, timeout: u64) -> u64 {
    let mut interval = if raw == 0 {
        DEFAULT_POLL_INTERVAL_SECS
    } else {
        let clamped = raw.clamp(
            *POLL_INTERVAL_RANGE_SECS.start(),
            *POLL_INTERVAL_RANGE_SECS.end(),
        );
        if clamped != raw {
            warn!(
                device = %device,
                requested = raw,
                used = clamped,
                "poll interval out of range, adjusted"
            );
        }
        clamped
    };

    if interval <= timeout {
        warn!(
            device = %device,
            interval,
            timeout,
            "poll interval must exceed timeout, adjusted"
        );
        interval = timeout + 1;
    }
    interval
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names() {
        assert!(check_name("Srv1").is_ok());
        assert!(check_name("file.server").is_ok());
        assert!(check_name("").is_err());
        assert!(check_name(".srv").is_err());
        assert!(check_name("srv.").is_err());
        assert!(check_name("a..b").is_err());
    }

    #[test]
    fn addresses() {
        assert_eq!(parse_address("10.0.0.5"), Ok(("10.0.0.5".into(), 8443)));
        assert_eq!(parse_address("10.0.0.5:8444"), Ok(("10.0.0.5".into(), 8444)));
        assert_eq!(
            parse_address(" agent-01.lan:443 "),
            Ok(("agent-01.lan".into(), 443))
        );
        assert!(parse_address("").is_err());
        assert!(parse_address(":8443").is_err());
        assert!(parse_address("host:0").is_err());
        assert!(parse_address("host:http").is_err());
        assert!(parse_address("bad_host").is_err());
        assert!(parse_address("https://host").is_err());
    }

    #[test]
    fn timeout_defaults_and_clamps() {
        assert_eq!(effective_timeout("d", 0), 5);
        assert_eq!(effective_timeout("d", 7), 7);
        assert_eq!(effective_timeout("d", 900), 600);
    }

    #[test]
    fn poll_interval_defaults_clamps_and_exceeds_timeout() {
        assert_eq!(effective_poll_interval("d", 0, 5), 30);
        assert_eq!(effective_poll_interval("d", 2, 1), 5);
        assert_eq!(effective_poll_interval("d", 9000, 5), 3600);
        assert_eq!(effective_poll_interval("d", 10, 10), 11);
        assert_eq!(effective_poll_interval("d", 0, 60), 61);
    }
}
