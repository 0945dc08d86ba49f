//! Effectful application of classified push frames.
//!
//! Classification itself is the pure `classify_frame` in the core crate;
//! this layer only routes the typed event into the registry and surface.
//! A malformed frame is logged and dropped; it never tears down the
//! channel or blocks the frames behind it.

use qa_console_core::{ConsoleSurface, PushEvent, RunRegistry, classify_frame};
use tracing::warn;

/// Dispatch one raw push-channel frame.
pub fn dispatch<S: ConsoleSurface>(raw: &str, registry: &mut RunRegistry, surface: &mut S) {
    match classify_frame(raw) {
        Ok(PushEvent::Output(html)) => registry.append_output(surface, &html),
        Ok(PushEvent::Result(text)) => registry.complete(surface, &text),
        Ok(PushEvent::StatusRunning) => registry.mark_running(surface),
        Err(error) => warn!(%error, frame = raw, "dropping unrecognized push frame"),
    }
}
