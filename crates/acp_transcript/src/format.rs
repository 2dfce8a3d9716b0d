//! Formatting of tool lines, plan panels and the working indicator.
//!
//! Everything here produces plain `String`s (optionally carrying ANSI style
//! sequences); the sinks decide how those strings reach the terminal.

use std::time::Duration;

use crossterm::style::{ContentStyle, Stylize};
use serde_json::{Map, Value};
use unicode_width::UnicodeWidthStr;

use crate::events::{PlanEntry, PlanEntryStatus, ToolKind, ToolStatus};
use crate::session::ToolRecord;

/// Maximum width of a one-line argument summary, truncation marker included.
pub const MAX_SUMMARY_LEN: usize = 120;

const TRUNCATION_MARKER: &str = "...";

const SPINNER_FRAMES: [char; 10] = ['⠋', '⠙', '⠹', '⠸', '⠼', '⠴', '⠦', '⠧', '⠇', '⠏'];

/// Rendering theme. With colors disabled every helper returns its input
/// unchanged, which also keeps golden output free of escape sequences.
#[derive(Debug, Clone, Copy)]
pub struct Theme {
    color: bool,
}

impl Theme {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn apply(&self, text: &str, style: ContentStyle) -> String {
        if self.color {
            style.apply(text).to_string()
        } else {
            text.to_string()
        }
    }

    pub fn success(&self, text: &str) -> String {
        self.apply(text, ContentStyle::new().green().bold())
    }

    pub fn error(&self, text: &str) -> String {
        self.apply(text, ContentStyle::new().red().bold())
    }

    pub fn info(&self, text: &str) -> String {
        self.apply(text, ContentStyle::new().cyan())
    }

    pub fn muted(&self, text: &str) -> String {
        self.apply(text, ContentStyle::new().dim())
    }

    pub fn tool(&self, text: &str) -> String {
        self.apply(text, ContentStyle::new().cyan().dim())
    }

    pub fn thought(&self, text: &str) -> String {
        self.apply(text, ContentStyle::new().dim().italic())
    }

    pub fn bold(&self, text: &str) -> String {
        self.apply(text, ContentStyle::new().bold())
    }
}

/// Collapse internal whitespace runs to single spaces and cap the result at
/// [`MAX_SUMMARY_LEN`] characters, marker included.
pub fn one_line(value: &str) -> String {
    let compact = value.split_whitespace().collect::<Vec<_>>().join(" ");
    if compact.chars().count() > MAX_SUMMARY_LEN {
        let kept: String = compact
            .chars()
            .take(MAX_SUMMARY_LEN - TRUNCATION_MARKER.len())
            .collect();
        format!("{kept}{TRUNCATION_MARKER}")
    } else {
        compact
    }
}

/// Kind-specific one-line argument summary, falling back through the known
/// argument names for the kind and finally to the tool title.
pub fn arg_summary(kind: ToolKind, args: &Map<String, Value>, title: &str) -> String {
    let keys: &[&str] = match kind {
        ToolKind::Fetch => &["url", "query"],
        ToolKind::Search => &["query", "pattern", "path"],
        ToolKind::Edit => &["file_path", "path"],
        ToolKind::Read => &["file_path", "absolute_path", "path"],
        ToolKind::Execute => &["command"],
        _ => &["command", "query", "file_path", "path", "instruction"],
    };
    keys.iter()
        .find_map(|key| arg_value(args, key))
        .unwrap_or_else(|| title.to_string())
}

/// Coerce a raw argument to its string form. Null and empty-string values
/// count as absent so the fallback chain keeps going.
fn arg_value(args: &Map<String, Value>, key: &str) -> Option<String> {
    match args.get(key)? {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        other => Some(other.to_string()),
    }
}

/// One display line for a tool record: status dot, label, and the one-line
/// argument summary in parentheses.
pub fn tool_line(record: &ToolRecord, theme: &Theme) -> String {
    let dot = match record.status {
        ToolStatus::Completed => theme.success("●"),
        ToolStatus::Failed => theme.error("●"),
        ToolStatus::Pending | ToolStatus::InProgress => theme.tool("●"),
    };
    let label = record.kind.label().unwrap_or(&record.title);
    let summary = one_line(&arg_summary(record.kind, &record.args, &record.title));
    format!("{dot} {label}({})", theme.muted(&summary))
}

pub fn plan_icon(status: PlanEntryStatus) -> char {
    match status {
        PlanEntryStatus::Completed => '✓',
        PlanEntryStatus::InProgress => '→',
        PlanEntryStatus::Pending => '○',
    }
}

/// Canonical line-per-entry serialization used to deduplicate repeated plan
/// broadcasts.
pub fn plan_key(entries: &[PlanEntry]) -> String {
    entries
        .iter()
        .map(|entry| format!("{} {}", plan_icon(entry.status), entry.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Bordered "Plan" panel, one entry per line in the order given by the event.
pub fn plan_block(entries: &[PlanEntry], theme: &Theme) -> Vec<String> {
    let rows: Vec<(String, usize)> = entries
        .iter()
        .map(|entry| {
            let plain = format!("{} {}", plan_icon(entry.status), entry.content);
            let width = plain.width();
            let styled = match entry.status {
                PlanEntryStatus::Completed => theme.success(&plain),
                PlanEntryStatus::InProgress => theme.info(&plain),
                PlanEntryStatus::Pending => theme.muted(&plain),
            };
            (styled, width)
        })
        .collect();
    panel("Plan", &rows, &|s| theme.info(s), &|s| theme.bold(s))
}

/// Bordered "Reasoning" panel shown at turn end when reasoning display is
/// enabled.
pub fn reasoning_block(text: &str, theme: &Theme) -> Vec<String> {
    let rows: Vec<(String, usize)> = text
        .trim()
        .lines()
        .map(|line| (theme.thought(line), line.width()))
        .collect();
    panel("Reasoning", &rows, &|s| theme.muted(s), &|s| theme.muted(s))
}

/// One frame of the working indicator, selected from elapsed turn time at
/// 10 frames per second.
pub fn indicator_line(elapsed: Duration, theme: &Theme) -> String {
    let index = (elapsed.as_millis() / 100) as usize % SPINNER_FRAMES.len();
    let frame = SPINNER_FRAMES[index].to_string();
    format!("{} {}", theme.info(&frame), theme.tool("Working..."))
}

/// Rows are (styled content, plain display width) pairs; the width is
/// measured before styling so ANSI sequences don't skew the border math.
fn panel(
    title: &str,
    rows: &[(String, usize)],
    border: &dyn Fn(&str) -> String,
    title_style: &dyn Fn(&str) -> String,
) -> Vec<String> {
    let inner = rows
        .iter()
        .map(|(_, width)| *width)
        .max()
        .unwrap_or(0)
        .max(title.width() + 2);

    let mut out = Vec::with_capacity(rows.len() + 2);
    let fill = "─".repeat(inner - title.width() - 1);
    out.push(format!(
        "{} {} {}",
        border("╭─"),
        title_style(title),
        border(&format!("{fill}╮"))
    ));
    for (styled, width) in rows {
        let pad = " ".repeat(inner - width);
        out.push(format!("{} {styled}{pad} {}", border("│"), border("│")));
    }
    out.push(border(&format!("╰{}╯", "─".repeat(inner + 2))));
    out
}
