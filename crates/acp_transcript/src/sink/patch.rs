//! Cursor-patching output strategy.

use std::io::Write;

use crossterm::cursor::{Hide, MoveDown, MoveToColumn, MoveUp, Show};
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};
use tracing::trace;

use super::{SinkError, StatusSink};

/// Low-overhead variant of the sink contract: tool lines are appended to the
/// scrollback immediately and a status change rewrites only the affected
/// line via relative cursor movement. In-place rewrites are only safe while
/// nothing else has been printed below a line; once a permanent block lands,
/// every line above it is frozen and later rewrites are accepted but
/// dropped.
///
/// Cursor invariant: between calls the cursor rests on the indicator row,
/// one row below the last permanent line.
pub struct PatchSink<W: Write> {
    out: W,
    /// Lines pushed this turn.
    total: usize,
    /// Lines no longer reachable for patching.
    frozen: usize,
    cursor_hidden: bool,
}

impl<W: Write> PatchSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            total: 0,
            frozen: 0,
            cursor_hidden: false,
        }
    }

    fn clear_indicator_row(&mut self) -> Result<(), SinkError> {
        queue!(self.out, MoveToColumn(0), Clear(ClearType::CurrentLine))?;
        Ok(())
    }
}

impl<W: Write> StatusSink for PatchSink<W> {
    fn print_block(&mut self, rows: &[String]) -> Result<(), SinkError> {
        self.clear_indicator_row()?;
        for row in rows {
            queue!(self.out, Print(row), Print("\n"))?;
        }
        self.frozen = self.total;
        self.out.flush()?;
        Ok(())
    }

    fn push_line(&mut self, line: &str) -> Result<(), SinkError> {
        self.clear_indicator_row()?;
        queue!(self.out, Print(line), Print("\n"))?;
        self.total += 1;
        self.out.flush()?;
        Ok(())
    }

    fn rewrite_line(&mut self, index: usize, line: &str) -> Result<(), SinkError> {
        if index < self.frozen {
            trace!(index, "line frozen by interleaved content; not re-rendered");
            return Ok(());
        }
        if index >= self.total {
            return Ok(());
        }
        // Unfrozen lines sit in a contiguous run directly above the
        // indicator row, so the distance up is a simple count.
        let up = (self.total - index) as u16;
        queue!(
            self.out,
            MoveUp(up),
            MoveToColumn(0),
            Clear(ClearType::CurrentLine),
            Print(line),
            MoveDown(up),
            MoveToColumn(0)
        )?;
        self.out.flush()?;
        Ok(())
    }

    fn set_indicator(&mut self, line: Option<&str>) -> Result<(), SinkError> {
        self.clear_indicator_row()?;
        if let Some(line) = line {
            if !self.cursor_hidden {
                queue!(self.out, Hide)?;
                self.cursor_hidden = true;
            }
            queue!(self.out, Print(line))?;
        }
        self.out.flush()?;
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.clear_indicator_row()?;
        if self.cursor_hidden {
            queue!(self.out, Show)?;
            self.cursor_hidden = false;
        }
        self.out.flush()?;
        self.total = 0;
        self.frozen = 0;
        Ok(())
    }
}

impl<W: Write> Drop for PatchSink<W> {
    fn drop(&mut self) {
        if self.cursor_hidden {
            if let Err(err) = execute!(self.out, Show) {
                eprintln!("Failed to show the cursor: {err}");
            }
        }
    }
}
