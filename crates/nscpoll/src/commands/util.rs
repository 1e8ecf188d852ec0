//! Helpers shared by the subcommand handlers.

use std::path::PathBuf;

use chrono::Local;
use tabled::Tabled;

use nscpoll_core::{DeviceConfig, MemoryStore, StateRow};

use crate::cli::GlobalOpts;
use crate::error::CliError;
use crate::output;

/// Config file in effect: `--config` / `NSCPOLL_CONFIG`, else the platform path.
pub fn config_path(global: &GlobalOpts) -> PathBuf {
    global
        .config
        .clone()
        .unwrap_or_else(nscpoll_config::config_path)
}

/// Load and validate the device list.
pub fn load_devices(global: &GlobalOpts) -> Result<(PathBuf, Vec<DeviceConfig>), CliError> {
    let path = config_path(global);
    let devices =
        nscpoll_config::load_devices(&path).map_err(|e| CliError::from_config(e, &path))?;
    Ok((path, devices))
}

// ── State tree rendering ─────────────────────────────────────────────

#[derive(Tabled)]
struct StateTableRow {
    #[tabled(rename = "State")]
    id: String,
    #[tabled(rename = "Type")]
    value_type: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Updated")]
    updated: String,
}

fn value_text(row: &StateRow) -> String {
    row.value
        .as_ref()
        .map_or_else(|| "-".to_owned(), ToString::to_string)
}

/// Render every state in `store`.
pub fn render_states(store: &MemoryStore, global: &GlobalOpts) -> Result<String, CliError> {
    let rows = store.snapshot();
    output::render_list(
        global.output,
        &rows,
        |r| StateTableRow {
            id: r.id.clone(),
            value_type: r.value_type.to_string(),
            value: value_text(r),
            updated: r.ts.map_or_else(
                || "-".to_owned(),
                |ts| ts.with_timezone(&Local).format("%H:%M:%S").to_string(),
            ),
        },
        |r| format!("{}={}", r.id, value_text(r)),
    )
}
