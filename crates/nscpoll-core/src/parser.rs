// ── Payload parsers ──
//
// Pure transformations from an agent's JSON body into ordered state
// entries. Each payload shape has a serde schema; anything that does not
// fit it is rejected with a `ParseError` instead of being half-published.

use indexmap::IndexMap;
use serde::Deserialize;
use tracing::debug;

use crate::error::ParseError;
use crate::model::{Entry, Leaf, Severity, StateCommon, StateValue, ValueType};
use crate::normalize::{child_id, is_numeric_text, to_segment};

/// Parsed payload: the entries to publish plus a one-line summary for logs.
#[derive(Debug, Clone, PartialEq)]
pub struct Payload {
    pub entries: Vec<Entry>,
    pub summary: String,
}

impl Payload {
    /// Iterate the value leaves, skipping folders.
    pub fn leaves(&self) -> impl Iterator<Item = &Leaf> {
        self.entries.iter().filter_map(Entry::as_leaf)
    }
}

/// Turns one response body into state entries under `device_id`.
pub trait PayloadParser: Send + Sync {
    fn parse(&self, device_id: &str, body: &str) -> Result<Payload, ParseError>;
}

fn decode<'a, T: Deserialize<'a>>(shape: &'static str, body: &'a str) -> Result<T, ParseError> {
    serde_json::from_str(body).map_err(|e| ParseError::Schema {
        shape,
        message: e.to_string(),
    })
}

// ── Identity ────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct AgentInfo {
    name: String,
    version: String,
}

/// Parser for `/api/v1/info`.
pub struct IdentityParser;

impl PayloadParser for IdentityParser {
    fn parse(&self, device_id: &str, body: &str) -> Result<Payload, ParseError> {
        let info: AgentInfo = decode("identity", body)?;
        let base = format!("{device_id}.info");

        let summary = format!("client {} / {}", info.name, info.version);
        let entries = vec![
            Entry::Folder { id: base.clone() },
            Entry::State(Leaf {
                id: format!("{base}.name"),
                value: StateValue::Text(info.name),
                common: StateCommon::read_only("client name", ValueType::String, "info.name"),
            }),
            Entry::State(Leaf {
                id: format!("{base}.version"),
                value: StateValue::Text(info.version),
                common: StateCommon::read_only(
                    "client version",
                    ValueType::String,
                    "info.version",
                ),
            }),
        ];

        Ok(Payload { entries, summary })
    }
}

// ── Performance checks ──────────────────────────────────────────────

#[derive(Debug, Deserialize)]
struct CommandResponse {
    command: String,
    result: i64,
    lines: Vec<ResultLine>,
}

#[derive(Debug, Deserialize)]
struct ResultLine {
    message: String,
    #[serde(default)]
    perf: Option<IndexMap<String, PerfGroup>>,
}

/// One counter group; anything but an object is skipped.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PerfGroup {
    Fields(IndexMap<String, serde_json::Value>),
    Malformed(serde_json::Value),
}

/// Parser for `check_*` command executions.
///
/// Only the first result line is published. The agent emits one line for
/// the standard checks; further lines are dropped and logged.
pub struct PerformanceParser;

impl PayloadParser for PerformanceParser {
    fn parse(&self, device_id: &str, body: &str) -> Result<Payload, ParseError> {
        let response: CommandResponse = decode("performance", body)?;

        let severity = Severity::try_from(response.result).map_err(|value| {
            ParseError::UnknownSeverity {
                command: response.command.clone(),
                value,
            }
        })?;

        let mut lines = response.lines.into_iter();
        let line = lines.next().ok_or_else(|| ParseError::NoResultLines {
            command: response.command.clone(),
        })?;
        let dropped = lines.count();
        if dropped > 0 {
            debug!(
                command = %response.command,
                dropped,
                "ignoring additional result lines"
            );
        }

        let base = child_id(device_id, &response.command);
        let perf_base = format!("{base}.perf");
        let mut entries = vec![
            Entry::Folder { id: base.clone() },
            Entry::State(Leaf {
                id: format!("{base}.result"),
                value: StateValue::Number(f64::from(severity.code())),
                common: StateCommon::read_only("result", ValueType::Number, "value.severity")
                    .with_states(Severity::labels()),
            }),
            Entry::State(Leaf {
                id: format!("{base}.message"),
                value: StateValue::Text(line.message),
                common: StateCommon::read_only("message", ValueType::String, "text"),
            }),
            Entry::Folder {
                id: perf_base.clone(),
            },
        ];

        for (counter, group) in line.perf.unwrap_or_default() {
            let fields = match group {
                PerfGroup::Fields(fields) => fields,
                PerfGroup::Malformed(other) => {
                    debug!(
                        command = %response.command,
                        counter = %counter,
                        value = %other,
                        "skipping perf group that is not an object"
                    );
                    continue;
                }
            };
            let counter_id = child_id(&perf_base, &counter);
            entries.push(Entry::Folder {
                id: counter_id.clone(),
            });
            for (field, raw) in fields {
                entries.push(Entry::State(perf_leaf(&counter_id, &field, &raw)));
            }
        }

        let summary = format!("{} {}", response.command, severity);
        Ok(Payload { entries, summary })
    }
}

/// Build one perf field leaf, typed by the shape of its textual value.
fn perf_leaf(counter_id: &str, field: &str, raw: &serde_json::Value) -> Leaf {
    let text = match raw {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    };

    // Digit strings too long for an f64 stay text rather than infinity.
    let number = is_numeric_text(&text)
        .then(|| text.parse::<f64>().ok())
        .flatten()
        .filter(|n| n.is_finite());
    let value = number.map_or(StateValue::Text(text), StateValue::Number);

    Leaf {
        id: format!("{counter_id}.{}", to_segment(field)),
        common: StateCommon::read_only(field, value.value_type(), "value"),
        value,
    }
}
