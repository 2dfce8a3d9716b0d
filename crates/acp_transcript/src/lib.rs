//! Live terminal transcript rendering for streamed agent session updates.
//!
//! Raw session-update records ([`events::classify`]) feed a per-session
//! [`renderer::Renderer`], which maintains turn state ([`session`]) and
//! writes the transcript through one of two interchangeable terminal
//! strategies ([`sink::RepaintSink`], [`sink::PatchSink`]). Formatting of
//! tool lines, plan panels and the working indicator lives in [`format`].

pub mod events;
pub mod format;
pub mod renderer;
pub mod session;
pub mod sink;

pub use events::{PlanEntry, PlanEntryStatus, SessionEvent, ToolKind, ToolStatus};
pub use renderer::{RenderOptions, Renderer};
pub use session::SessionState;
pub use sink::{PatchSink, RepaintSink, SinkError, StatusSink};
