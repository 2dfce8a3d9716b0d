//! Per-turn renderer state: the ordered tool map, text accumulators and plan
//! de-duplication.
//!
//! All of this is owned by exactly one [`crate::renderer::Renderer`] instance
//! per chat session and reset at the start of every turn. It is deliberately
//! not a process-wide singleton so concurrent sessions can each own an
//! independent copy.

use indexmap::IndexMap;
use serde_json::{Map, Value};

use crate::events::{PlanEntry, ToolKind, ToolStatus};
use crate::format;

/// One tracked tool call. Created on first sight of its identifier — from
/// either a `tool_call` or a `tool_call_update` — and kept for the rest of
/// the turn.
#[derive(Debug, Clone)]
pub struct ToolRecord {
    pub title: String,
    pub kind: ToolKind,
    pub status: ToolStatus,
    pub args: Map<String, Value>,
    /// Index of this tool's rendered line in the sink, assigned when the line
    /// is first printed. `None` for tools that have not been rendered yet.
    pub line: Option<usize>,
}

impl ToolRecord {
    /// Todo-list bookkeeping tools are tracked in state but never rendered.
    pub fn is_denylisted(&self) -> bool {
        matches!(self.title.as_str(), "write_todos" | "TodoWrite")
            || self.title.to_lowercase().contains("todo")
    }
}

/// Mutable per-turn session state, keyed by tool-call identifier. The map's
/// insertion order is the append-only Tool Order: first-seen order, never
/// reordered or pruned within a turn.
#[derive(Debug, Default)]
pub struct SessionState {
    tools: IndexMap<String, ToolRecord>,
    message: String,
    reasoning: String,
    /// Canonical serialization of the last rendered plan.
    last_plan: String,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop all per-turn state. Called on every new user prompt.
    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn push_message(&mut self, text: &str) {
        self.message.push_str(text);
    }

    pub fn push_reasoning(&mut self, text: &str) {
        self.reasoning.push_str(text);
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn take_message(&mut self) -> String {
        std::mem::take(&mut self.message)
    }

    pub fn reasoning(&self) -> &str {
        &self.reasoning
    }

    pub fn take_reasoning(&mut self) -> String {
        std::mem::take(&mut self.reasoning)
    }

    pub fn tool(&self, id: &str) -> Option<&ToolRecord> {
        self.tools.get(id)
    }

    pub fn tool_mut(&mut self, id: &str) -> Option<&mut ToolRecord> {
        self.tools.get_mut(id)
    }

    pub fn tools(&self) -> impl Iterator<Item = (&String, &ToolRecord)> {
        self.tools.iter()
    }

    /// Upsert from a `tool_call` event. Some backends emit `tool_call` more
    /// than once per identifier; fields are overwritten with the latest
    /// values (last-write-wins) while the Tool Order position is kept.
    pub fn upsert_call(
        &mut self,
        id: &str,
        title: String,
        kind: ToolKind,
        status: ToolStatus,
        args: Map<String, Value>,
    ) -> &ToolRecord {
        let record = self
            .tools
            .entry(id.to_string())
            .or_insert_with(|| ToolRecord {
                title: String::new(),
                kind: ToolKind::Other,
                status: ToolStatus::Pending,
                args: Map::new(),
                line: None,
            });
        record.title = title;
        record.kind = kind;
        record.status = status;
        record.args = args;
        record
    }

    /// Apply a `tool_call_update`, synthesizing a placeholder record when the
    /// update arrives before its originating call. Returns true when the
    /// change warrants a re-render: a status that actually differs, or a
    /// title arriving. A no-op status update returns false.
    pub fn apply_update(
        &mut self,
        id: &str,
        status: Option<ToolStatus>,
        title: Option<String>,
    ) -> bool {
        if let Some(record) = self.tools.get_mut(id) {
            let mut needs_render = false;
            if let Some(status) = status {
                if record.status != status {
                    record.status = status;
                    needs_render = true;
                }
            }
            if let Some(title) = title {
                record.title = title;
                needs_render = true;
            }
            needs_render
        } else {
            self.tools.insert(
                id.to_string(),
                ToolRecord {
                    title: title.unwrap_or_else(|| "Tool".to_string()),
                    kind: ToolKind::Other,
                    status: status.unwrap_or(ToolStatus::Pending),
                    args: Map::new(),
                    line: None,
                },
            );
            true
        }
    }

    /// Canonicalize a plan broadcast and compare it against the last rendered
    /// one. Returns false for an identical repeat, which must be ignored
    /// entirely; otherwise caches the new serialization.
    pub fn plan_changed(&mut self, entries: &[PlanEntry]) -> bool {
        let key = format::plan_key(entries);
        if key == self.last_plan {
            return false;
        }
        self.last_plan = key;
        true
    }
}
