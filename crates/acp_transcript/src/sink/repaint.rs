//! Full-repaint live region, the reference output strategy.

use std::io::Write;

use crossterm::cursor::{Hide, MoveToColumn, MoveUp, Show};
use crossterm::style::Print;
use crossterm::terminal::{Clear, ClearType};
use crossterm::{execute, queue};

use super::{SinkError, StatusSink};

/// On every state change the visible status region — live tool lines plus the
/// indicator — is erased and redrawn as one unit. Costs one repaint of the
/// region per update, but needs no per-line cursor arithmetic: any line still
/// in the region can always be updated consistently.
pub struct RepaintSink<W: Write> {
    out: W,
    /// Live lines not yet committed to scrollback by a permanent block.
    region: Vec<String>,
    /// Count of lines already committed; offsets `rewrite_line` indices.
    committed: usize,
    /// Indicator text currently part of the painted region, if any.
    indicator: Option<String>,
    /// Terminal rows occupied by the last paint of the region.
    painted_rows: u16,
    cursor_hidden: bool,
}

impl<W: Write> RepaintSink<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            region: Vec::new(),
            committed: 0,
            indicator: None,
            painted_rows: 0,
            cursor_hidden: false,
        }
    }

    /// Move the cursor back to the top of the painted region and wipe it.
    fn erase_region(&mut self) -> Result<(), SinkError> {
        if self.painted_rows > 0 {
            queue!(
                self.out,
                MoveUp(self.painted_rows),
                MoveToColumn(0),
                Clear(ClearType::FromCursorDown)
            )?;
            self.painted_rows = 0;
        }
        Ok(())
    }

    fn paint_region(&mut self) -> Result<(), SinkError> {
        let mut rows: u16 = 0;
        for line in &self.region {
            queue!(self.out, Print(line), Print("\n"))?;
            rows += 1;
        }
        if let Some(ref indicator) = self.indicator {
            if !self.region.is_empty() {
                queue!(self.out, Print("\n"))?;
                rows += 1;
            }
            queue!(self.out, Print(indicator), Print("\n"))?;
            rows += 1;
        }
        self.painted_rows = rows;
        self.out.flush()?;
        Ok(())
    }

    fn repaint(&mut self) -> Result<(), SinkError> {
        self.erase_region()?;
        self.paint_region()
    }

    /// Write the current region lines as permanent scrollback content.
    fn commit_region(&mut self) -> Result<(), SinkError> {
        self.committed += self.region.len();
        for line in self.region.drain(..) {
            queue!(self.out, Print(line), Print("\n"))?;
        }
        Ok(())
    }
}

impl<W: Write> StatusSink for RepaintSink<W> {
    fn print_block(&mut self, rows: &[String]) -> Result<(), SinkError> {
        self.erase_region()?;
        self.commit_region()?;
        for row in rows {
            queue!(self.out, Print(row), Print("\n"))?;
        }
        self.paint_region()
    }

    fn push_line(&mut self, line: &str) -> Result<(), SinkError> {
        self.region.push(line.to_string());
        self.repaint()
    }

    fn rewrite_line(&mut self, index: usize, line: &str) -> Result<(), SinkError> {
        if index < self.committed {
            return Ok(());
        }
        if let Some(slot) = self.region.get_mut(index - self.committed) {
            *slot = line.to_string();
            self.repaint()?;
        }
        Ok(())
    }

    fn set_indicator(&mut self, line: Option<&str>) -> Result<(), SinkError> {
        if line.is_some() && !self.cursor_hidden {
            queue!(self.out, Hide)?;
            self.cursor_hidden = true;
        }
        self.indicator = line.map(str::to_string);
        self.repaint()
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        self.indicator = None;
        self.erase_region()?;
        self.commit_region()?;
        if self.cursor_hidden {
            queue!(self.out, Show)?;
            self.cursor_hidden = false;
        }
        self.out.flush()?;
        self.committed = 0;
        Ok(())
    }
}

impl<W: Write> Drop for RepaintSink<W> {
    fn drop(&mut self) {
        if self.cursor_hidden {
            if let Err(err) = execute!(self.out, Show) {
                eprintln!("Failed to show the cursor: {err}");
            }
        }
    }
}
