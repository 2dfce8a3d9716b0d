//! Classification of raw session-update records into typed events.
//!
//! Inbound records are JSON values shaped
//! `{ "update": { "sessionUpdate": <discriminator>, ... } }` as produced by
//! ACP agent runtimes. Unknown discriminators are dropped so newer runtimes
//! never fail the run, and missing fields degrade to documented defaults
//! instead of raising.

use derive_more::IsVariant;
use serde::Deserialize;
use serde_json::{Map, Value};
use tracing::trace;

/// Tool category reported by the agent. Drives the display label and the
/// argument-summary extraction in the formatter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolKind {
    Read,
    Edit,
    Execute,
    Fetch,
    Search,
    Think,
    SwitchMode,
    Other,
}

impl ToolKind {
    pub fn from_wire(kind: &str) -> Self {
        match kind {
            "read" => Self::Read,
            "edit" => Self::Edit,
            "execute" => Self::Execute,
            "fetch" => Self::Fetch,
            "search" => Self::Search,
            "think" => Self::Think,
            "switch_mode" | "switch-mode" => Self::SwitchMode,
            _ => Self::Other,
        }
    }

    /// Display name for recognized kinds. `None` means the raw tool title is
    /// used as the label instead.
    pub fn label(self) -> Option<&'static str> {
        match self {
            Self::Read => Some("Read"),
            Self::Edit => Some("Write"),
            Self::Execute => Some("Bash"),
            Self::Fetch => Some("Fetch"),
            Self::Search => Some("Search"),
            Self::Think => Some("Task"),
            Self::SwitchMode => Some("Mode"),
            Self::Other => None,
        }
    }
}

/// Tool lifecycle status. Later events may repeat a status; the session state
/// is responsible for suppressing redundant re-renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IsVariant)]
pub enum ToolStatus {
    Pending,
    InProgress,
    Completed,
    Failed,
}

impl ToolStatus {
    /// Unknown status strings degrade to `Pending` rather than failing.
    pub fn from_wire(status: &str) -> Self {
        match status {
            "in_progress" | "in-progress" => Self::InProgress,
            "completed" => Self::Completed,
            "failed" => Self::Failed,
            _ => Self::Pending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanEntryStatus {
    Pending,
    InProgress,
    Completed,
}

impl PlanEntryStatus {
    pub fn from_wire(status: &str) -> Self {
        match status {
            "in_progress" | "in-progress" => Self::InProgress,
            "completed" => Self::Completed,
            _ => Self::Pending,
        }
    }
}

/// One checklist entry of a plan broadcast, in the order given by the agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanEntry {
    pub status: PlanEntryStatus,
    pub content: String,
}

#[derive(Debug, Deserialize)]
struct WirePlanEntry {
    #[serde(default)]
    status: String,
    #[serde(default)]
    content: String,
}

/// A classified session update. The set of variants is closed on purpose:
/// dispatch is an explicit match, not open-ended handler registration.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    MessageChunk(String),
    ThoughtChunk(String),
    ToolCall {
        id: String,
        title: String,
        kind: ToolKind,
        status: ToolStatus,
        args: Map<String, Value>,
    },
    ToolUpdate {
        id: String,
        status: Option<ToolStatus>,
        title: Option<String>,
    },
    Plan(Vec<PlanEntry>),
}

/// Classify one raw record. Returns `None` for records without a recognized
/// `update.sessionUpdate` discriminator (forward-compatibility policy).
pub fn classify(record: &Value) -> Option<SessionEvent> {
    let update = record.get("update")?;
    let discriminator = update.get("sessionUpdate").and_then(Value::as_str)?;

    match discriminator {
        "agent_message_chunk" => text_content(update).map(SessionEvent::MessageChunk),
        "agent_thought_chunk" => text_content(update).map(SessionEvent::ThoughtChunk),
        "tool_call" => Some(SessionEvent::ToolCall {
            id: str_field(update, "toolCallId").unwrap_or_default(),
            title: str_field(update, "title").unwrap_or_else(|| "Tool".to_string()),
            kind: ToolKind::from_wire(
                update.get("kind").and_then(Value::as_str).unwrap_or("other"),
            ),
            status: ToolStatus::from_wire(
                update
                    .get("status")
                    .and_then(Value::as_str)
                    .unwrap_or("pending"),
            ),
            args: update
                .get("rawInput")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default(),
        }),
        "tool_call_update" => Some(SessionEvent::ToolUpdate {
            id: str_field(update, "toolCallId").unwrap_or_default(),
            status: update
                .get("status")
                .and_then(Value::as_str)
                .map(ToolStatus::from_wire),
            title: str_field(update, "title"),
        }),
        "plan" => Some(SessionEvent::Plan(plan_entries(update))),
        other => {
            trace!(discriminator = other, "dropping unrecognized session update");
            None
        }
    }
}

/// Extract `content.text` when `content.type == "text"`. Non-text content
/// blocks carry nothing renderable here and are ignored.
fn text_content(update: &Value) -> Option<String> {
    let content = update.get("content")?;
    if content.get("type").and_then(Value::as_str) != Some("text") {
        return None;
    }
    str_field(content, "text")
}

fn str_field(value: &Value, key: &str) -> Option<String> {
    value.get(key).and_then(Value::as_str).map(str::to_string)
}

fn plan_entries(update: &Value) -> Vec<PlanEntry> {
    let Some(entries) = update.get("entries") else {
        return Vec::new();
    };
    let wire: Vec<WirePlanEntry> = serde_json::from_value(entries.clone()).unwrap_or_default();
    wire.into_iter()
        .map(|entry| PlanEntry {
            status: PlanEntryStatus::from_wire(&entry.status),
            content: entry.content,
        })
        .collect()
}
