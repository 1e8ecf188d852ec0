//! `nscpoll run`: poll every enabled device until Ctrl-C.

use std::sync::Arc;

use tracing::info;

use nscpoll_core::{MemoryStore, Scheduler};

use crate::cli::{GlobalOpts, RunArgs};
use crate::commands::util;
use crate::error::CliError;
use crate::output;

pub async fn handle(args: RunArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let (path, devices) = util::load_devices(global)?;

    let store = Arc::new(MemoryStore::new());
    let mut scheduler = Scheduler::from_configs(&devices, Arc::clone(&store))?;

    info!(
        config = %path.display(),
        devices = scheduler.devices().len(),
        "starting"
    );
    scheduler.start().await;

    // Shut down cleanly even when the signal handler could not be installed.
    let signal = tokio::signal::ctrl_c().await;
    info!("shutting down");
    scheduler.shutdown().await;
    signal?;

    if args.print_state {
        output::print_output(&util::render_states(&store, global)?, global.quiet);
    }
    Ok(())
}
