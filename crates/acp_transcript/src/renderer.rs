//! The render driver: turns classified session events into sink operations.
//!
//! Owns the per-turn [`SessionState`] and enforces the transcript layout
//! rules: message text accumulates until a tool call, plan or turn end
//! flushes it as a permanent block; tool lines render immediately and are
//! rewritten in place as their status changes; plans render as a bordered
//! panel; reasoning renders once at turn end when enabled.

use std::time::Instant;

use derive_more::IsVariant;
use serde_json::Value;
use tracing::debug;

use crate::events::{self, PlanEntry, SessionEvent, ToolKind, ToolStatus};
use crate::format::{self, Theme};
use crate::session::SessionState;
use crate::sink::{SinkError, StatusSink};

/// Driver configuration, fixed for the lifetime of a session.
#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    /// Show the accumulated reasoning panel at turn end.
    pub show_reasoning: bool,
    /// Emit ANSI color sequences.
    pub color: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            show_reasoning: false,
            color: true,
        }
    }
}

#[derive(Debug, Clone, Copy, IsVariant)]
enum Phase {
    Idle,
    Active,
}

pub struct Renderer<S: StatusSink> {
    sink: S,
    state: SessionState,
    theme: Theme,
    show_reasoning: bool,
    phase: Phase,
    /// Count of tool lines pushed this turn; the next push gets this index.
    lines_pushed: usize,
    /// Whether the most recent permanent content was a tool line. Controls
    /// the blank line preceding a flushed message.
    last_was_tool: bool,
    /// Whether anything has been rendered this turn. Controls the blank line
    /// preceding a plan panel.
    has_content: bool,
    indicator_on: bool,
    turn_started: Instant,
}

impl<S: StatusSink> Renderer<S> {
    pub fn new(sink: S, options: RenderOptions) -> Self {
        Self {
            sink,
            state: SessionState::new(),
            theme: Theme::new(options.color),
            show_reasoning: options.show_reasoning,
            phase: Phase::Idle,
            lines_pushed: 0,
            last_was_tool: false,
            has_content: false,
            indicator_on: false,
            turn_started: Instant::now(),
        }
    }

    /// Start a fresh turn, dropping all per-turn state. Anything already in
    /// the scrollback stays; live lines are committed as-is.
    pub fn reset(&mut self) -> Result<(), SinkError> {
        if self.indicator_on {
            self.sink.set_indicator(None)?;
        }
        self.sink.finish()?;
        self.state.reset();
        self.phase = Phase::Active;
        self.lines_pushed = 0;
        self.last_was_tool = false;
        self.has_content = false;
        self.indicator_on = false;
        self.turn_started = Instant::now();
        Ok(())
    }

    /// Advance the working indicator. Call at the animation cadence; a no-op
    /// between turns.
    pub fn tick(&mut self) -> Result<(), SinkError> {
        if self.phase.is_idle() {
            return Ok(());
        }
        let line = format::indicator_line(self.turn_started.elapsed(), &self.theme);
        self.sink.set_indicator(Some(&line))?;
        self.indicator_on = true;
        Ok(())
    }

    /// Render one raw record. Two control shapes bound the turn: a record
    /// carrying `reset: true` drops all per-turn state mid-stream, and one
    /// carrying `stopReason` ends the turn. Everything else goes through
    /// session-update classification; unrecognized records are dropped
    /// without effect.
    pub fn handle_record(&mut self, record: &Value) -> Result<(), SinkError> {
        if record.get("reset").and_then(Value::as_bool) == Some(true) {
            return self.reset();
        }
        if record.get("stopReason").is_some() {
            return self.finalize();
        }
        let Some(event) = events::classify(record) else {
            return Ok(());
        };
        if self.phase.is_idle() {
            debug!("session update while idle; starting a new turn");
            self.reset()?;
        }
        match event {
            SessionEvent::MessageChunk(text) => {
                self.state.push_message(&text);
                Ok(())
            }
            SessionEvent::ThoughtChunk(text) => {
                self.state.push_reasoning(&text);
                Ok(())
            }
            SessionEvent::ToolCall {
                id,
                title,
                kind,
                status,
                args,
            } => self.on_tool_call(&id, title, kind, status, args),
            SessionEvent::ToolUpdate { id, status, title } => {
                self.on_tool_update(&id, status, title)
            }
            SessionEvent::Plan(entries) => self.on_plan(&entries),
        }
    }

    /// End the turn: flush pending text, show the reasoning panel when
    /// enabled, and release the terminal.
    pub fn finalize(&mut self) -> Result<(), SinkError> {
        if self.phase.is_idle() {
            return Ok(());
        }
        if self.indicator_on {
            self.sink.set_indicator(None)?;
            self.indicator_on = false;
        }
        self.flush_message()?;
        if self.show_reasoning {
            let reasoning = self.state.take_reasoning();
            if !reasoning.trim().is_empty() {
                let mut rows = vec![String::new()];
                rows.extend(format::reasoning_block(&reasoning, &self.theme));
                self.sink.print_block(&rows)?;
            }
        }
        self.sink.finish()?;
        self.phase = Phase::Idle;
        Ok(())
    }

    fn on_tool_call(
        &mut self,
        id: &str,
        title: String,
        kind: ToolKind,
        status: ToolStatus,
        args: serde_json::Map<String, Value>,
    ) -> Result<(), SinkError> {
        self.flush_message()?;
        let (existing, line_text) = {
            let record = self.state.upsert_call(id, title, kind, status, args);
            if record.is_denylisted() {
                return Ok(());
            }
            (record.line, format::tool_line(record, &self.theme))
        };
        match existing {
            Some(index) => self.sink.rewrite_line(index, &line_text),
            None => self.print_tool_line(id, &line_text),
        }
    }

    fn on_tool_update(
        &mut self,
        id: &str,
        status: Option<ToolStatus>,
        title: Option<String>,
    ) -> Result<(), SinkError> {
        let needs_render = self.state.apply_update(id, status, title);
        let Some(record) = self.state.tool(id) else {
            return Ok(());
        };
        if record.is_denylisted() {
            return Ok(());
        }
        let existing = record.line;
        let line_text = format::tool_line(record, &self.theme);
        match existing {
            None => self.print_tool_line(id, &line_text),
            Some(index) if needs_render => self.sink.rewrite_line(index, &line_text),
            Some(_) => Ok(()),
        }
    }

    fn on_plan(&mut self, entries: &[PlanEntry]) -> Result<(), SinkError> {
        if entries.is_empty() {
            return Ok(());
        }
        // An identical repeat is ignored entirely; it must not even flush
        // pending message text.
        if !self.state.plan_changed(entries) {
            return Ok(());
        }
        self.flush_message()?;
        let mut rows = Vec::new();
        if self.has_content {
            rows.push(String::new());
        }
        rows.extend(format::plan_block(entries, &self.theme));
        rows.push(String::new());
        self.suspend_indicator()?;
        self.sink.print_block(&rows)?;
        self.last_was_tool = false;
        self.has_content = true;
        self.resume_indicator()
    }

    /// Print accumulated message text as a permanent block. Whitespace-only
    /// accumulations stay buffered in case later chunks add real content.
    fn flush_message(&mut self) -> Result<(), SinkError> {
        if self.state.message().trim().is_empty() {
            return Ok(());
        }
        let message = self.state.take_message();
        let mut rows = Vec::new();
        if self.last_was_tool {
            rows.push(String::new());
        }
        rows.extend(message.trim().lines().map(str::to_string));
        rows.push(String::new());
        self.suspend_indicator()?;
        self.sink.print_block(&rows)?;
        self.last_was_tool = false;
        self.has_content = true;
        self.resume_indicator()
    }

    fn print_tool_line(&mut self, id: &str, line: &str) -> Result<(), SinkError> {
        self.suspend_indicator()?;
        self.sink.push_line(line)?;
        if let Some(record) = self.state.tool_mut(id) {
            record.line = Some(self.lines_pushed);
        }
        self.lines_pushed += 1;
        self.last_was_tool = true;
        self.has_content = true;
        self.resume_indicator()
    }

    fn suspend_indicator(&mut self) -> Result<(), SinkError> {
        if self.indicator_on {
            self.sink.set_indicator(None)?;
        }
        Ok(())
    }

    fn resume_indicator(&mut self) -> Result<(), SinkError> {
        if self.indicator_on {
            let line = format::indicator_line(self.turn_started.elapsed(), &self.theme);
            self.sink.set_indicator(Some(&line))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Sink double that maintains the transcript as plain lines instead of
    /// escape traffic, honoring the freeze rule for rewrites.
    #[derive(Default)]
    struct RecordingSink {
        lines: Vec<String>,
        /// Transcript position of each pushed line, in push order.
        pushed: Vec<usize>,
        frozen_pushed: usize,
        indicator: Option<String>,
        finished: bool,
    }

    impl StatusSink for RecordingSink {
        fn print_block(&mut self, rows: &[String]) -> Result<(), SinkError> {
            self.lines.extend(rows.iter().cloned());
            self.frozen_pushed = self.pushed.len();
            Ok(())
        }

        fn push_line(&mut self, line: &str) -> Result<(), SinkError> {
            self.pushed.push(self.lines.len());
            self.lines.push(line.to_string());
            Ok(())
        }

        fn rewrite_line(&mut self, index: usize, line: &str) -> Result<(), SinkError> {
            if index < self.frozen_pushed {
                return Ok(());
            }
            if let Some(&position) = self.pushed.get(index) {
                self.lines[position] = line.to_string();
            }
            Ok(())
        }

        fn set_indicator(&mut self, line: Option<&str>) -> Result<(), SinkError> {
            self.indicator = line.map(str::to_string);
            Ok(())
        }

        fn finish(&mut self) -> Result<(), SinkError> {
            self.indicator = None;
            self.finished = true;
            self.pushed.clear();
            self.frozen_pushed = 0;
            Ok(())
        }
    }

    fn renderer(show_reasoning: bool) -> Renderer<RecordingSink> {
        Renderer::new(
            RecordingSink::default(),
            RenderOptions {
                show_reasoning,
                color: false,
            },
        )
    }

    fn message(text: &str) -> Value {
        json!({"update": {
            "sessionUpdate": "agent_message_chunk",
            "content": {"type": "text", "text": text}
        }})
    }

    fn thought(text: &str) -> Value {
        json!({"update": {
            "sessionUpdate": "agent_thought_chunk",
            "content": {"type": "text", "text": text}
        }})
    }

    fn tool_call(id: &str, title: &str, kind: &str, input: Value) -> Value {
        json!({"update": {
            "sessionUpdate": "tool_call",
            "toolCallId": id,
            "title": title,
            "kind": kind,
            "status": "pending",
            "rawInput": input
        }})
    }

    fn tool_update(id: &str, status: &str) -> Value {
        json!({"update": {
            "sessionUpdate": "tool_call_update",
            "toolCallId": id,
            "status": status
        }})
    }

    fn plan(entries: Value) -> Value {
        json!({"update": {"sessionUpdate": "plan", "entries": entries}})
    }

    #[test]
    fn status_update_rewrites_tool_line_in_place() {
        let mut r = renderer(false);
        r.handle_record(&tool_call("t1", "shell", "execute", json!({"command": "ls"})))
            .unwrap();
        r.handle_record(&tool_update("t1", "completed")).unwrap();
        r.finalize().unwrap();

        assert_eq!(r.sink.lines, vec!["● Bash(ls)"]);
    }

    #[test]
    fn message_flushes_before_next_tool_and_freezes_earlier_lines() {
        let mut r = renderer(false);
        r.handle_record(&tool_call("t1", "shell", "execute", json!({"command": "ls"})))
            .unwrap();
        r.handle_record(&message("Listing done.")).unwrap();
        r.handle_record(&tool_call("t2", "reader", "read", json!({"file_path": "a.txt"})))
            .unwrap();
        // Too late: t1's line is frozen under the message block.
        r.handle_record(&tool_update("t1", "failed")).unwrap();
        r.finalize().unwrap();

        assert_eq!(
            r.sink.lines,
            vec![
                "● Bash(ls)",
                "",
                "Listing done.",
                "",
                "● Read(a.txt)",
            ]
        );
    }

    #[test]
    fn transcript_order_is_chronological() {
        let mut r = renderer(false);
        r.handle_record(&tool_call("t1", "shell", "execute", json!({"command": "ls"})))
            .unwrap();
        r.handle_record(&message("Done.")).unwrap();
        r.handle_record(&plan(json!([{"status": "pending", "content": "step"}])))
            .unwrap();
        r.finalize().unwrap();

        let transcript = r.sink.lines.join("\n");
        let tool = transcript.find("Bash(ls)").unwrap();
        let msg = transcript.find("Done.").unwrap();
        let plan_pos = transcript.find("Plan").unwrap();
        assert!(tool < msg && msg < plan_pos, "{transcript}");
    }

    #[test]
    fn denylisted_tools_never_render() {
        let mut r = renderer(false);
        r.handle_record(&tool_call("t1", "TodoWrite", "other", json!({})))
            .unwrap();
        r.handle_record(&tool_update("t1", "completed")).unwrap();
        r.handle_record(&tool_call("t2", "Update todo list", "other", json!({})))
            .unwrap();
        r.finalize().unwrap();

        assert!(r.sink.lines.is_empty(), "{:?}", r.sink.lines);
    }

    #[test]
    fn out_of_order_update_renders_placeholder_line() {
        let mut r = renderer(false);
        r.handle_record(&tool_update("t1", "in_progress")).unwrap();
        r.finalize().unwrap();

        assert_eq!(r.sink.lines, vec!["● Tool(Tool)"]);
    }

    #[test]
    fn repeated_plan_renders_once() {
        let mut r = renderer(false);
        let entries = json!([{"status": "pending", "content": "only step"}]);
        r.handle_record(&plan(entries.clone())).unwrap();
        r.handle_record(&plan(entries)).unwrap();
        r.finalize().unwrap();

        let count = r
            .sink
            .lines
            .iter()
            .filter(|line| line.contains("only step"))
            .count();
        assert_eq!(count, 1);
    }

    #[test]
    fn reset_record_drops_buffered_turn_state() {
        let mut r = renderer(false);
        r.handle_record(&message("stale half-turn text ")).unwrap();
        r.handle_record(&json!({"reset": true})).unwrap();
        r.handle_record(&message("fresh turn")).unwrap();
        r.finalize().unwrap();

        let transcript = r.sink.lines.join("\n");
        assert!(!transcript.contains("stale"), "{transcript}");
        assert!(transcript.contains("fresh turn"));
    }

    #[test]
    fn stop_reason_record_finalizes_the_turn() {
        let mut r = renderer(false);
        r.handle_record(&message("answer")).unwrap();
        r.handle_record(&json!({"stopReason": "end_turn"})).unwrap();

        assert!(r.sink.finished);
        assert!(r.sink.lines.join("\n").contains("answer"));
    }

    #[test]
    fn duplicate_plan_produces_no_output_at_all() {
        let mut r = renderer(false);
        let entries = json!([{"status": "pending", "content": "only step"}]);
        r.handle_record(&plan(entries.clone())).unwrap();
        r.handle_record(&message("buffered text")).unwrap();
        r.handle_record(&plan(entries)).unwrap();
        // The repeat must not flush the pending message either.
        assert!(
            !r.sink.lines.iter().any(|line| line.contains("buffered text")),
            "{:?}",
            r.sink.lines
        );

        r.finalize().unwrap();
        assert!(r.sink.lines.iter().any(|line| line.contains("buffered text")));
    }

    #[test]
    fn empty_plan_is_ignored() {
        let mut r = renderer(false);
        r.handle_record(&plan(json!([]))).unwrap();
        r.finalize().unwrap();
        assert!(r.sink.lines.is_empty());
    }

    #[test]
    fn plan_after_content_gets_separating_blank() {
        let mut r = renderer(false);
        r.handle_record(&tool_call("t1", "shell", "execute", json!({"command": "ls"})))
            .unwrap();
        r.handle_record(&plan(json!([{"status": "pending", "content": "step"}])))
            .unwrap();
        r.finalize().unwrap();

        assert_eq!(r.sink.lines[0], "● Bash(ls)");
        assert_eq!(r.sink.lines[1], "");
        assert!(r.sink.lines[2].contains("Plan"));
    }

    #[test]
    fn reasoning_panel_only_when_enabled() {
        let mut hidden = renderer(false);
        hidden.handle_record(&thought("private chain")).unwrap();
        hidden.handle_record(&message("visible")).unwrap();
        hidden.finalize().unwrap();
        assert!(!hidden.sink.lines.join("\n").contains("private chain"));

        let mut shown = renderer(true);
        shown.handle_record(&thought("private chain")).unwrap();
        shown.handle_record(&message("visible")).unwrap();
        shown.finalize().unwrap();
        let transcript = shown.sink.lines.join("\n");
        assert!(transcript.contains("Reasoning"));
        assert!(transcript.contains("private chain"));
        // Reasoning trails the message at turn end.
        assert!(transcript.find("visible").unwrap() < transcript.find("Reasoning").unwrap());
    }

    #[test]
    fn whitespace_only_message_prints_nothing() {
        let mut r = renderer(false);
        r.handle_record(&message("  \n\t")).unwrap();
        r.finalize().unwrap();
        assert!(r.sink.lines.is_empty());
    }

    #[test]
    fn finalize_resets_for_the_next_turn() {
        let mut r = renderer(false);
        r.handle_record(&message("turn one")).unwrap();
        r.finalize().unwrap();
        assert!(r.sink.finished);

        r.handle_record(&message("turn two")).unwrap();
        r.finalize().unwrap();
        let transcript = r.sink.lines.join("\n");
        assert!(transcript.contains("turn one"));
        assert!(transcript.contains("turn two"));
    }

    #[test]
    fn tick_arms_indicator_only_while_active() {
        let mut r = renderer(false);
        r.tick().unwrap();
        assert!(r.sink.indicator.is_none());

        r.handle_record(&message("hello")).unwrap();
        r.tick().unwrap();
        assert!(r.sink.indicator.as_deref().unwrap().contains("Working..."));

        r.finalize().unwrap();
        assert!(r.sink.indicator.is_none());
    }
}
