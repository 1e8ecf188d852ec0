// ── Device registry and scheduler ──
//
// Owns every `DeviceContext` and the shared `StatePublisher`. `start`
// gives each device its own timer task: one immediate poll, then one per
// interval, until the device's timer token is cancelled. A slow device
// only ever delays itself.

use std::sync::Arc;
use std::time::Duration;

use nscpoll_api::transport::MAX_REQUEST_TIMEOUT;
use nscpoll_api::{AgentClient, TransportConfig};
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::config::DeviceConfig;
use crate::device::DeviceContext;
use crate::error::CoreError;
use crate::model::{Quality, StateCommon, StateValue, ValueType};
use crate::poller::{CheckSource, PollOutcome, poll_device, write_online};
use crate::publisher::StatePublisher;
use crate::store::StateStore;

/// Adapter-level connection indicator.
pub const CONNECTION_ID: &str = "info.connection";

/// Build one context per enabled device.
///
/// Fails when two enabled devices normalize to the same id.
pub fn build<Q, F>(
    configs: &[DeviceConfig],
    mut make_source: F,
) -> Result<Vec<DeviceContext<Q>>, CoreError>
where
    F: FnMut(&DeviceConfig) -> Result<Q, CoreError>,
{
    let mut devices: Vec<DeviceContext<Q>> = Vec::new();

    for config in configs {
        if !config.enabled {
            debug!(device = %config.name, "device disabled, skipping");
            continue;
        }
        let id = config.id();
        if devices.iter().any(|d| d.id() == id) {
            return Err(CoreError::Config {
                message: format!("device name '{}' is not unique (id '{id}')", config.name),
            });
        }
        let source = make_source(config)?;
        debug!(device = %config.name, id = %id, "device registered");
        devices.push(DeviceContext::new(config, source));
    }

    Ok(devices)
}

/// Runs the poll timers of every configured device.
pub struct Scheduler<Q, S> {
    devices: Vec<Arc<DeviceContext<Q>>>,
    publisher: Arc<StatePublisher<S>>,
    tasks: JoinSet<()>,
}

impl<S: StateStore> Scheduler<AgentClient, S> {
    /// Build a scheduler with one HTTPS agent client per enabled device.
    pub fn from_configs(configs: &[DeviceConfig], store: Arc<S>) -> Result<Self, CoreError> {
        let devices = build(configs, |config| {
            let transport = TransportConfig {
                tls: config.tls.clone(),
                timeout: MAX_REQUEST_TIMEOUT,
            };
            config
                .endpoint()
                .map_err(nscpoll_api::Error::from)
                .and_then(|endpoint| {
                    AgentClient::new(
                        endpoint,
                        config.username.clone(),
                        config.password.clone(),
                        &transport,
                    )
                })
                .map_err(|source| CoreError::Client {
                    device: config.name.clone(),
                    source,
                })
        })?;
        Ok(Self::new(devices, store))
    }
}

impl<Q: CheckSource, S: StateStore> Scheduler<Q, S> {
    pub fn new(devices: Vec<DeviceContext<Q>>, store: Arc<S>) -> Self {
        Self {
            devices: devices.into_iter().map(Arc::new).collect(),
            publisher: Arc::new(StatePublisher::new(store)),
            tasks: JoinSet::new(),
        }
    }

    pub fn devices(&self) -> &[Arc<DeviceContext<Q>>] {
        &self.devices
    }

    pub fn publisher(&self) -> &Arc<StatePublisher<S>> {
        &self.publisher
    }

    /// Declare every device's base objects and reset the indicators.
    pub async fn init_objects(&self) {
        self.write_connection(false).await;

        for device in &self.devices {
            let (id, name) = (device.id(), device.name());
            if let Err(e) = self.publisher.ensure_device(id, name).await {
                warn!(device = %name, error = %e, "failed to declare device");
            }
            if let Err(e) = self.publisher.ensure_folder(&format!("{id}.info")).await {
                warn!(device = %name, error = %e, "failed to declare info folder");
            }
            write_online(device, &self.publisher, false).await;
        }
    }

    /// Initialize base objects and start one timer task per device.
    pub async fn start(&mut self) {
        self.init_objects().await;

        if self.devices.is_empty() {
            warn!("no enabled devices configured");
        }

        for device in &self.devices {
            let device = Arc::clone(device);
            let publisher = Arc::clone(&self.publisher);
            self.tasks.spawn(poll_loop(device, publisher));
        }

        self.write_connection(true).await;
        info!(devices = self.devices.len(), "polling started");
    }

    /// Poll every device once, concurrently, and report each outcome in
    /// device order.
    pub async fn poll_all_once(&self) -> Vec<(String, PollOutcome)> {
        let mut polls = JoinSet::new();
        for (index, device) in self.devices.iter().enumerate() {
            let device = Arc::clone(device);
            let publisher = Arc::clone(&self.publisher);
            polls.spawn(async move {
                let outcome = poll_device(&device, &publisher).await;
                (index, device.name().to_owned(), outcome)
            });
        }

        let mut outcomes = Vec::with_capacity(self.devices.len());
        while let Some(joined) = polls.join_next().await {
            match joined {
                Ok(result) => outcomes.push(result),
                Err(e) => warn!(error = %e, "poll task failed"),
            }
        }
        outcomes.sort_by_key(|(index, _, _)| *index);
        outcomes
            .into_iter()
            .map(|(_, name, outcome)| (name, outcome))
            .collect()
    }

    /// Cancel the repeating poll of the device with `id`. A cycle already
    /// running is allowed to finish. Returns `false` for an unknown id.
    pub fn stop_device(&self, id: &str) -> bool {
        let Some(device) = self.devices.iter().find(|d| d.id() == id) else {
            return false;
        };
        device.timer().cancel();
        info!(device = %device.name(), "polling stopped for device");
        true
    }

    /// Stop all timers, wait for in-flight polls, and flush the
    /// reachability indicators to `false`.
    pub async fn shutdown(&mut self) {
        for device in &self.devices {
            device.timer().cancel();
        }
        while let Some(joined) = self.tasks.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "device task failed");
            }
        }

        for device in &self.devices {
            write_online(device, &self.publisher, false).await;
        }
        self.write_connection(false).await;
        info!("polling stopped");
    }

    async fn write_connection(&self, connected: bool) {
        if let Err(e) = self.publisher.ensure_folder("info").await {
            warn!(error = %e, "failed to declare info folder");
        }
        let common = StateCommon::read_only(
            "If connected to at least one agent",
            ValueType::Boolean,
            "indicator.connected",
        );
        if let Err(e) = self
            .publisher
            .upsert(
                CONNECTION_ID,
                StateValue::Bool(connected),
                Quality::GOOD,
                &common,
            )
            .await
        {
            warn!(error = %e, "failed to write connection state");
        }
    }
}

/// Timer task of one device. Each tick spawns a poll so an overrunning
/// cycle is reported busy instead of silently delaying the schedule.
async fn poll_loop<Q: CheckSource, S: StateStore>(
    device: Arc<DeviceContext<Q>>,
    publisher: Arc<StatePublisher<S>>,
) {
    let period = device.poll_interval().max(Duration::from_millis(1));
    let mut interval = tokio::time::interval_at(Instant::now() + period, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut polls = JoinSet::new();

    debug!(
        device = %device.name(),
        interval_secs = period.as_secs(),
        "poll timer started"
    );
    spawn_poll(&mut polls, &device, &publisher);

    loop {
        tokio::select! {
            biased;
            () = device.timer().cancelled() => break,
            _ = interval.tick() => {
                while polls.try_join_next().is_some() {}
                spawn_poll(&mut polls, &device, &publisher);
            }
        }
    }

    while polls.join_next().await.is_some() {}
}

fn spawn_poll<Q: CheckSource, S: StateStore>(
    polls: &mut JoinSet<()>,
    device: &Arc<DeviceContext<Q>>,
    publisher: &Arc<StatePublisher<S>>,
) {
    let device = Arc::clone(device);
    let publisher = Arc::clone(publisher);
    polls.spawn(async move {
        poll_device(&device, &publisher).await;
    });
}
