// ── Device poll cycle ──
//
// One tick of a device: identify it once, then run its enabled checks in
// order, publishing each payload. Reachability transitions are logged
// once per run and mirrored into `<id>.online`.

use std::future::Future;
use std::time::Duration;

use nscpoll_api::AgentClient;
use tracing::{debug, info, warn};

use crate::catalog::CheckKind;
use crate::device::{DeviceContext, Reachability};
use crate::model::{Quality, StateValue};
use crate::publisher::StatePublisher;
use crate::store::StateStore;

/// Something that can answer agent queries.
pub trait CheckSource: Send + Sync + 'static {
    /// GET `path` within `timeout`, returning the 200 body.
    fn fetch(
        &self,
        path: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, nscpoll_api::Error>> + Send;
}

impl CheckSource for AgentClient {
    fn fetch(
        &self,
        path: &str,
        timeout: Duration,
    ) -> impl Future<Output = Result<String, nscpoll_api::Error>> + Send {
        self.query(path, timeout)
    }
}

/// How a poll cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    /// A previous cycle was still running; nothing was done.
    Busy,
    /// The identity query failed.
    Unreachable,
    /// The agent answered the identity query with an unusable payload.
    Unidentified,
    /// A check query failed; the remaining checks were skipped.
    Aborted {
        completed: Vec<CheckKind>,
        failed: CheckKind,
    },
    /// All enabled checks were queried.
    Completed { completed: Vec<CheckKind> },
}

/// Log text for a failed query.
pub fn failure_text(err: &nscpoll_api::Error) -> String {
    match err {
        nscpoll_api::Error::Http { .. } => err.to_string(),
        other => format!("{} - {other}", other.code()),
    }
}

/// Run one poll cycle for `device`.
pub async fn poll_device<Q, S>(
    device: &DeviceContext<Q>,
    publisher: &StatePublisher<S>,
) -> PollOutcome
where
    Q: CheckSource,
    S: StateStore,
{
    let Some(_busy) = device.try_begin() else {
        warn!(
            device = %device.name(),
            "device is still busy, poll interval should be increased"
        );
        return PollOutcome::Busy;
    };
    debug!(device = %device.name(), "poll cycle starting");

    if !device.is_initialized() {
        let body = match query(device, CheckKind::Info).await {
            Ok(body) => body,
            Err(e) => {
                mark_offline(device, publisher, &e).await;
                return PollOutcome::Unreachable;
            }
        };
        mark_online(device, publisher).await;

        match CheckKind::Info.parser().parse(device.id(), &body) {
            Ok(payload) => {
                publisher.publish(&payload.entries).await;
                device.mark_initialized();
                info!(device = %device.name(), "device connected, {}", payload.summary);
            }
            Err(e) => {
                warn!(device = %device.name(), error = %e, "unusable identity response");
                return PollOutcome::Unidentified;
            }
        }
    }

    let mut completed = Vec::with_capacity(device.checks().len());
    for &kind in device.checks() {
        let body = match query(device, kind).await {
            Ok(body) => body,
            Err(e) => {
                mark_offline(device, publisher, &e).await;
                debug!(device = %device.name(), check = %kind, "poll cycle aborted");
                return PollOutcome::Aborted {
                    completed,
                    failed: kind,
                };
            }
        };
        mark_online(device, publisher).await;

        match kind.parser().parse(device.id(), &body) {
            Ok(payload) => {
                let failed = publisher.publish(&payload.entries).await;
                debug!(
                    device = %device.name(),
                    check = %kind,
                    summary = %payload.summary,
                    failed,
                    "check published"
                );
            }
            Err(e) => {
                warn!(device = %device.name(), check = %kind, error = %e, "unusable check response");
            }
        }
        completed.push(kind);
    }

    debug!(device = %device.name(), "poll cycle completed");
    PollOutcome::Completed { completed }
}

async fn query<Q: CheckSource>(
    device: &DeviceContext<Q>,
    kind: CheckKind,
) -> Result<String, nscpoll_api::Error> {
    debug!(device = %device.name(), check = %kind, "querying agent");
    device.source().fetch(&kind.path(), device.timeout()).await
}

async fn mark_offline<Q, S: StateStore>(
    device: &DeviceContext<Q>,
    publisher: &StatePublisher<S>,
    err: &nscpoll_api::Error,
) {
    if device.set_reachability(Reachability::Offline) == Reachability::Offline {
        debug!(
            device = %device.name(),
            error = %err,
            transient = err.is_transient(),
            "still offline"
        );
        return;
    }
    warn!(device = %device.name(), "{}", failure_text(err));
    info!(device = %device.name(), "offline");
    write_online(device, publisher, false).await;
}

async fn mark_online<Q, S: StateStore>(device: &DeviceContext<Q>, publisher: &StatePublisher<S>) {
    match device.set_reachability(Reachability::Online) {
        Reachability::Online => return,
        Reachability::Offline => info!(device = %device.name(), "online"),
        Reachability::Unknown => {}
    }
    write_online(device, publisher, true).await;
}

pub(crate) async fn write_online<Q, S: StateStore>(
    device: &DeviceContext<Q>,
    publisher: &StatePublisher<S>,
    online: bool,
) {
    if let Err(e) = publisher
        .upsert(
            &device.online_id(),
            StateValue::Bool(online),
            Quality::GOOD,
            &device.online_common(),
        )
        .await
    {
        warn!(device = %device.name(), error = %e, "failed to write reachability");
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;

    use super::*;
    use crate::config::{CheckFlags, DeviceConfig};
    use crate::store::MemoryStore;
    use crate::testing::{CountingStore, Reply, ScriptedSource, cpu_body, info_body, memory_body};

    fn srv1(source: ScriptedSource) -> DeviceContext<ScriptedSource> {
        let config = DeviceConfig {
            name: "Srv1".into(),
            host: "10.0.0.5".into(),
            checks: CheckFlags {
                cpu: true,
                memory: true,
                drives: false,
            },
            ..DeviceConfig::default()
        };
        DeviceContext::new(&config, source)
    }

    fn healthy() -> ScriptedSource {
        ScriptedSource::new()
            .route(CheckKind::Info, [Reply::Body(info_body())])
            .route(CheckKind::CheckCpu, [Reply::Body(cpu_body())])
            .route(CheckKind::CheckMemory, [Reply::Body(memory_body())])
    }

    #[tokio::test]
    async fn first_cycle_identifies_and_runs_checks() {
        let device = srv1(healthy());
        let publisher = StatePublisher::new(Arc::new(MemoryStore::new()));

        let outcome = poll_device(&device, &publisher).await;

        assert_eq!(
            outcome,
            PollOutcome::Completed {
                completed: vec![CheckKind::CheckCpu, CheckKind::CheckMemory]
            }
        );
        assert!(device.is_initialized());
        assert!(!device.is_busy());
        assert_eq!(device.reachability(), Reachability::Online);

        let store = publisher.store();
        assert_eq!(
            store.state("Srv1.info.name").unwrap().value,
            StateValue::Text("nsclient".into())
        );
        assert_eq!(
            store.state("Srv1.info.version").unwrap().value,
            StateValue::Text("0.5.2".into())
        );
        assert_eq!(
            store.state("Srv1.check_cpu.result").unwrap().value,
            StateValue::Number(1.0)
        );
        assert_eq!(
            store.state("Srv1.check_cpu.perf.cpu.load").unwrap().value,
            StateValue::Number(85.0)
        );
        assert_eq!(
            store.state("Srv1.online").unwrap().value,
            StateValue::Bool(true)
        );
        assert_eq!(
            device.source().calls(),
            ["info", "check_cpu", "check_memory"]
        );
    }

    #[tokio::test]
    async fn identity_is_queried_only_once() {
        let device = srv1(healthy());
        let publisher = StatePublisher::new(Arc::new(MemoryStore::new()));

        poll_device(&device, &publisher).await;
        poll_device(&device, &publisher).await;

        assert_eq!(
            device.source().calls(),
            [
                "info",
                "check_cpu",
                "check_memory",
                "check_cpu",
                "check_memory"
            ]
        );
    }

    #[tokio::test]
    async fn info_failure_skips_checks_and_stays_uninitialized() {
        let source = healthy().route(CheckKind::Info, [Reply::Timeout]);
        let device = srv1(source);
        let publisher = StatePublisher::new(Arc::new(MemoryStore::new()));

        assert_eq!(
            poll_device(&device, &publisher).await,
            PollOutcome::Unreachable
        );
        assert!(!device.is_initialized());
        assert!(!device.is_busy());
        assert_eq!(device.reachability(), Reachability::Offline);
        assert_eq!(device.source().calls(), ["info"]);
        assert_eq!(
            publisher.store().state("Srv1.online").unwrap().value,
            StateValue::Bool(false)
        );
    }

    #[tokio::test]
    async fn http_404_aborts_remaining_checks() {
        let source = healthy().route(CheckKind::CheckCpu, [Reply::Status(404)]);
        let device = srv1(source);
        let publisher = StatePublisher::new(Arc::new(MemoryStore::new()));

        let outcome = poll_device(&device, &publisher).await;

        assert_eq!(
            outcome,
            PollOutcome::Aborted {
                completed: vec![],
                failed: CheckKind::CheckCpu
            }
        );
        assert!(device.is_initialized());
        assert!(!device.is_busy());
        assert_eq!(device.reachability(), Reachability::Offline);
        assert_eq!(device.source().calls(), ["info", "check_cpu"]);
    }

    #[tokio::test]
    async fn parse_error_continues_with_next_check() {
        let source = healthy().route(CheckKind::CheckCpu, [Reply::Body("{}".into())]);
        let device = srv1(source);
        let publisher = StatePublisher::new(Arc::new(MemoryStore::new()));

        let outcome = poll_device(&device, &publisher).await;

        assert_eq!(
            outcome,
            PollOutcome::Completed {
                completed: vec![CheckKind::CheckCpu, CheckKind::CheckMemory]
            }
        );
        assert!(publisher.store().state("Srv1.check_cpu.result").is_none());
        assert!(publisher.store().state("Srv1.check_memory.result").is_some());
    }

    #[tokio::test]
    async fn unusable_identity_leaves_device_uninitialized() {
        let source = healthy().route(CheckKind::Info, [Reply::Body(r#"{"name":1}"#.into())]);
        let device = srv1(source);
        let publisher = StatePublisher::new(Arc::new(MemoryStore::new()));

        assert_eq!(
            poll_device(&device, &publisher).await,
            PollOutcome::Unidentified
        );
        assert!(!device.is_initialized());
        assert_eq!(device.reachability(), Reachability::Online);
    }

    #[tokio::test]
    async fn reachability_transitions_are_written_once_per_run() {
        let source = healthy().route(
            CheckKind::CheckCpu,
            [
                Reply::Body(cpu_body()),
                Reply::Status(500),
                Reply::Status(503),
                Reply::Body(cpu_body()),
                Reply::Body(cpu_body()),
            ],
        );
        let device = srv1(source);
        let store = Arc::new(CountingStore::default());
        let publisher = StatePublisher::new(Arc::clone(&store));

        for _ in 0..5 {
            poll_device(&device, &publisher).await;
        }

        // unknown → online, online → offline, offline → online
        assert_eq!(store.writes_to("Srv1.online"), 3);
        assert_eq!(device.reachability(), Reachability::Online);
    }

    #[tokio::test(start_paused = true)]
    async fn overlapping_cycle_is_rejected_while_busy() {
        let source = healthy().with_delay(Duration::from_secs(2));
        let device = srv1(source);
        let publisher = StatePublisher::new(Arc::new(MemoryStore::new()));

        let (first, second) = tokio::join!(
            poll_device(&device, &publisher),
            poll_device(&device, &publisher)
        );

        assert!(matches!(first, PollOutcome::Completed { .. }));
        assert_eq!(second, PollOutcome::Busy);
        assert!(!device.is_busy());
    }

    #[test]
    fn failure_text_formats() {
        assert_eq!(
            failure_text(&nscpoll_api::Error::http(404)),
            "HTTP error [404] Not Found"
        );
        let timeout = nscpoll_api::Error::Timeout { timeout_ms: 5000 };
        assert!(failure_text(&timeout).starts_with("ETIMEDOUT - "));
    }
}
