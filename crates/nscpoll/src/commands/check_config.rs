//! `nscpoll check-config`: validate and list the configured devices.

use serde::Serialize;
use tabled::Tabled;

use nscpoll_core::{CheckKind, DeviceConfig, TlsVerification};

use crate::cli::GlobalOpts;
use crate::commands::util;
use crate::error::CliError;
use crate::output;

#[derive(Debug, Serialize)]
struct DeviceSummary {
    name: String,
    id: String,
    address: String,
    timeout_secs: u64,
    poll_interval_secs: u64,
    checks: Vec<CheckKind>,
    tls: String,
}

impl From<&DeviceConfig> for DeviceSummary {
    fn from(config: &DeviceConfig) -> Self {
        Self {
            name: config.name.clone(),
            id: config.id(),
            address: format!("{}:{}", config.host, config.port),
            timeout_secs: config.timeout.as_secs(),
            poll_interval_secs: config.poll_interval.as_secs(),
            checks: config.checks.enabled_checks(),
            tls: match config.tls {
                TlsVerification::System => "system".to_owned(),
                TlsVerification::CustomCa(ref path) => format!("ca:{}", path.display()),
                TlsVerification::DangerAcceptInvalid => "accept-any".to_owned(),
            },
        }
    }
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Name")]
    name: String,
    #[tabled(rename = "Id")]
    id: String,
    #[tabled(rename = "Address")]
    address: String,
    #[tabled(rename = "Poll")]
    poll: String,
    #[tabled(rename = "Timeout")]
    timeout: String,
    #[tabled(rename = "Checks")]
    checks: String,
    #[tabled(rename = "TLS")]
    tls: String,
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let (_, devices) = util::load_devices(global)?;
    let summaries: Vec<DeviceSummary> = devices.iter().map(DeviceSummary::from).collect();

    let rendered = output::render_list(
        global.output,
        &summaries,
        |s| DeviceRow {
            name: s.name.clone(),
            id: s.id.clone(),
            address: s.address.clone(),
            poll: format!("{}s", s.poll_interval_secs),
            timeout: format!("{}s", s.timeout_secs),
            checks: s
                .checks
                .iter()
                .map(|k| k.name())
                .collect::<Vec<_>>()
                .join(", "),
            tls: s.tls.clone(),
        },
        |s| s.id.clone(),
    )?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
