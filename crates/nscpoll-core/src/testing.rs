// Test doubles shared by the unit test modules.
#![allow(clippy::unwrap_used)]

use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

use serde_json::json;

use crate::catalog::CheckKind;
use crate::error::StoreError;
use crate::model::{ObjectDef, StateWrite};
use crate::poller::CheckSource;
use crate::store::{MemoryStore, StateStore};

/// Canned agent answer.
#[derive(Debug, Clone)]
pub(crate) enum Reply {
    Body(String),
    Status(u16),
    Timeout,
}

/// Agent stand-in answering from per-check scripts. The last reply of a
/// script repeats forever; unscripted paths answer 404.
#[derive(Default)]
pub(crate) struct ScriptedSource {
    routes: Mutex<HashMap<String, VecDeque<Reply>>>,
    calls: Mutex<Vec<String>>,
    delay: Duration,
}

impl ScriptedSource {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn route(self, kind: CheckKind, replies: impl IntoIterator<Item = Reply>) -> Self {
        self.routes
            .lock()
            .unwrap()
            .insert(kind.path().into_owned(), replies.into_iter().collect());
        self
    }

    pub(crate) fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Names of the checks queried so far, in order.
    pub(crate) fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next_reply(&self, path: &str) -> Reply {
        let mut routes = self.routes.lock().unwrap();
        match routes.get_mut(path) {
            Some(script) if script.len() > 1 => script.pop_front().unwrap(),
            Some(script) => script.front().cloned().unwrap_or(Reply::Status(404)),
            None => Reply::Status(404),
        }
    }
}

impl CheckSource for ScriptedSource {
    async fn fetch(&self, path: &str, timeout: Duration) -> Result<String, nscpoll_api::Error> {
        let name = if path == CheckKind::Info.path() {
            "info".to_owned()
        } else {
            path.split('/').nth(4).unwrap_or(path).to_owned()
        };
        self.calls.lock().unwrap().push(name);
        let reply = self.next_reply(path);

        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }

        match reply {
            Reply::Body(body) => Ok(body),
            Reply::Status(status) => Err(nscpoll_api::Error::http(status)),
            Reply::Timeout => Err(nscpoll_api::Error::Timeout {
                timeout_ms: u64::try_from(timeout.as_millis()).unwrap(),
            }),
        }
    }
}

/// `MemoryStore` that counts writes per id.
#[derive(Default)]
pub(crate) struct CountingStore {
    pub(crate) inner: MemoryStore,
    writes: Mutex<HashMap<String, usize>>,
}

impl CountingStore {
    pub(crate) fn writes_to(&self, id: &str) -> usize {
        self.writes.lock().unwrap().get(id).copied().unwrap_or(0)
    }
}

impl StateStore for CountingStore {
    async fn declare_object(&self, id: &str, object: &ObjectDef) -> Result<(), StoreError> {
        self.inner.declare_object(id, object).await
    }

    async fn write_state(&self, id: &str, write: &StateWrite) -> Result<(), StoreError> {
        *self.writes.lock().unwrap().entry(id.to_owned()).or_default() += 1;
        self.inner.write_state(id, write).await
    }
}

// ── Bodies ──────────────────────────────────────────────────────────

pub(crate) fn info_body() -> String {
    json!({ "name": "nsclient", "version": "0.5.2" }).to_string()
}

pub(crate) fn cpu_body() -> String {
    json!({
        "command": "check_cpu",
        "result": 1,
        "lines": [{ "message": "high load", "perf": { "cpu": { "load": "85" } } }]
    })
    .to_string()
}

pub(crate) fn memory_body() -> String {
    json!({
        "command": "check_memory",
        "result": 0,
        "lines": [{
            "message": "OK: committed 2.1GB",
            "perf": { "committed": { "value": "2.1", "unit": "GB" } }
        }]
    })
    .to_string()
}
