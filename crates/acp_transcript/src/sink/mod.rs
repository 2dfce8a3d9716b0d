//! Terminal output strategies.
//!
//! The render driver talks to the terminal through [`StatusSink`]: permanent
//! blocks are appended to the scrollback while tool lines form a live region
//! with a working indicator pinned underneath. Two interchangeable
//! strategies implement the contract — a full-repaint live region
//! ([`RepaintSink`], the reference implementation) and a raw cursor-patching
//! variant ([`PatchSink`]). The final transcript content is identical under
//! both; only the escape traffic differs.

mod patch;
mod repaint;

pub use patch::PatchSink;
pub use repaint::RepaintSink;

use thiserror::Error;

/// Terminal write failures are not recovered locally — once the display
/// surface is gone there is no meaningful fallback, so they propagate to the
/// caller as hard failures.
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("terminal write failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Output contract for the render driver.
///
/// Printing operations (`print_block`, `push_line`) clear the indicator row;
/// the driver re-arms the indicator afterwards so the animation never
/// collides with fresh content.
pub trait StatusSink {
    /// Append permanent rows to the scrollback. Any live tool lines above
    /// the block are committed in place and stop being rewritable.
    fn print_block(&mut self, rows: &[String]) -> Result<(), SinkError>;

    /// Append a new live tool line beneath all previously printed content.
    fn push_line(&mut self, line: &str) -> Result<(), SinkError>;

    /// Rewrite a previously pushed line. `index` counts every line pushed
    /// this turn, in push order. Lines committed by an interleaved block are
    /// silently left untouched rather than risk corrupting unrelated
    /// content.
    fn rewrite_line(&mut self, index: usize, line: &str) -> Result<(), SinkError>;

    /// Draw (`Some`) or clear (`None`) the indicator row pinned below the
    /// live lines.
    fn set_indicator(&mut self, line: Option<&str>) -> Result<(), SinkError>;

    /// Commit all remaining live content, clear the indicator, restore the
    /// cursor and reset per-turn bookkeeping.
    fn finish(&mut self) -> Result<(), SinkError>;
}

impl<S: StatusSink + ?Sized> StatusSink for Box<S> {
    fn print_block(&mut self, rows: &[String]) -> Result<(), SinkError> {
        (**self).print_block(rows)
    }

    fn push_line(&mut self, line: &str) -> Result<(), SinkError> {
        (**self).push_line(line)
    }

    fn rewrite_line(&mut self, index: usize, line: &str) -> Result<(), SinkError> {
        (**self).rewrite_line(index, line)
    }

    fn set_indicator(&mut self, line: Option<&str>) -> Result<(), SinkError> {
        (**self).set_indicator(line)
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        (**self).finish()
    }
}
