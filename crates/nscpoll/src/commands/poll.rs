//! `nscpoll poll`: one cycle per device, then print the tree.

use std::sync::Arc;

use serde::Serialize;
use tabled::Tabled;

use nscpoll_core::{CheckKind, DeviceConfig, MemoryStore, PollOutcome, Scheduler};

use crate::cli::{GlobalOpts, OutputFormat, PollArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output::{self, Tone};

#[derive(Debug, Serialize)]
struct DeviceReport {
    device: String,
    status: &'static str,
    completed: Vec<CheckKind>,
    #[serde(skip_serializing_if = "Option::is_none")]
    failed: Option<CheckKind>,
}

impl DeviceReport {
    fn new(device: String, outcome: PollOutcome) -> Self {
        let (status, completed, failed) = match outcome {
            PollOutcome::Completed { completed } => ("ok", completed, None),
            PollOutcome::Aborted { completed, failed } => ("offline", completed, Some(failed)),
            PollOutcome::Unreachable => ("offline", Vec::new(), Some(CheckKind::Info)),
            PollOutcome::Unidentified => ("error", Vec::new(), Some(CheckKind::Info)),
            PollOutcome::Busy => ("busy", Vec::new(), None),
        };
        Self {
            device,
            status,
            completed,
            failed,
        }
    }

    fn reachable(&self) -> bool {
        self.status != "offline"
    }

    fn tone(&self) -> Tone {
        match self.status {
            "ok" => Tone::Good,
            "offline" => Tone::Bad,
            _ => Tone::Warn,
        }
    }
}

#[derive(Tabled)]
struct DeviceRow {
    #[tabled(rename = "Device")]
    device: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Checks")]
    checks: String,
    #[tabled(rename = "Failed")]
    failed: String,
}

#[derive(Serialize)]
struct PollReport<'a> {
    devices: &'a [DeviceReport],
    states: Vec<nscpoll_core::StateRow>,
}

pub async fn handle(args: PollArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (_, devices) = util::load_devices(global)?;
    let devices = select(devices, &args.device)?;

    let store = Arc::new(MemoryStore::new());
    let scheduler = Scheduler::from_configs(&devices, Arc::clone(&store))?;
    scheduler.init_objects().await;

    let reports: Vec<DeviceReport> = scheduler
        .poll_all_once()
        .await
        .into_iter()
        .map(|(device, outcome)| DeviceReport::new(device, outcome))
        .collect();

    let rendered = match global.output {
        OutputFormat::Json => serde_json::to_string_pretty(&PollReport {
            devices: &reports,
            states: store.snapshot(),
        })?,
        OutputFormat::JsonCompact => serde_json::to_string(&PollReport {
            devices: &reports,
            states: store.snapshot(),
        })?,
        OutputFormat::Plain => util::render_states(&store, global)?,
        OutputFormat::Table => {
            let color = output::should_color(global.color);
            let devices = output::render_list(
                global.output,
                &reports,
                |r| DeviceRow {
                    device: r.device.clone(),
                    status: output::paint(r.status, r.tone(), color),
                    checks: names(&r.completed),
                    failed: r.failed.map_or_else(String::new, |k| k.to_string()),
                },
                |r| r.device.clone(),
            )?;
            format!("{devices}\n{}", util::render_states(&store, global)?)
        }
    };
    output::print_output(&rendered, global.quiet);

    let offline: Vec<&str> = reports
        .iter()
        .filter(|r| !r.reachable())
        .map(|r| r.device.as_str())
        .collect();
    if offline.is_empty() {
        Ok(())
    } else {
        Err(CliError::Unreachable {
            count: offline.len(),
            names: offline.join(", "),
        })
    }
}

fn names(kinds: &[CheckKind]) -> String {
    kinds
        .iter()
        .map(|k| k.name())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Keep the devices named in `wanted` (by name or id); all when empty.
fn select(devices: Vec<DeviceConfig>, wanted: &[String]) -> Result<Vec<DeviceConfig>, CliError> {
    if wanted.is_empty() {
        return Ok(devices);
    }

    let unknown: Vec<&str> = wanted
        .iter()
        .filter(|w| !devices.iter().any(|d| d.name == **w || d.id() == **w))
        .map(String::as_str)
        .collect();
    if !unknown.is_empty() {
        return Err(CliError::UnknownDevice {
            names: unknown.join(", "),
        });
    }

    Ok(devices
        .into_iter()
        .filter(|d| wanted.iter().any(|w| d.name == *w || d.id() == *w))
        .collect())
}
