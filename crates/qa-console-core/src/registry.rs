//! Run registry: the single source of truth for "is a run active".
//!
//! Records are keyed by run id so a protocol extension that tags streamed
//! frames only has to change dispatcher routing; the wire today carries no
//! id on `{output}`/`{result}`, so at most one record is *current* and
//! receives streamed fragments.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::protocol::RunId;
use crate::surface::ConsoleSurface;

/// Per-run lifecycle. Terminal at `Completed`; no transition back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Submitted,
    Streaming,
    Completed,
}

/// One server-side QA execution as observed by the client.
#[derive(Debug, Clone)]
pub struct RunRecord {
    id: RunId,
    state: RunState,
    result_summary: Option<String>,
    debug_cache: Option<String>,
}

impl RunRecord {
    fn new(id: RunId) -> Self {
        Self {
            id,
            state: RunState::Submitted,
            result_summary: None,
            debug_cache: None,
        }
    }

    pub fn id(&self) -> &RunId {
        &self.id
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Present only once the run completed.
    pub fn result_summary(&self) -> Option<&str> {
        self.result_summary.as_deref()
    }

    /// Debug text fetched on demand; absent until first requested.
    pub fn debug_text(&self) -> Option<&str> {
        self.debug_cache.as_deref()
    }
}

/// Maps run ids to live records and applies state transitions to a surface.
#[derive(Debug, Default)]
pub struct RunRegistry {
    records: HashMap<RunId, RunRecord>,
    current: Option<RunId>,
    busy: bool,
    /// At most the most recent fragment that arrived before the ack
    /// allocated a record; flushed on `begin`.
    pending_fragment: Option<String>,
    /// Most recent terminal result text, kept even when the run was tracked
    /// only server-side and no local record exists.
    last_result: Option<String>,
}

impl RunRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether a run is currently active (with or without a local record).
    pub fn is_active(&self) -> bool {
        self.busy
    }

    /// The record bound to the next inbound output fragment, if any.
    pub fn current(&self) -> Option<&RunRecord> {
        self.current.as_ref().and_then(|id| self.records.get(id))
    }

    pub fn get(&self, id: &RunId) -> Option<&RunRecord> {
        self.records.get(id)
    }

    /// Result text of the most recently completed run, if any.
    pub fn last_result(&self) -> Option<&str> {
        self.last_result.as_deref()
    }

    /// Allocate a record for a freshly acked run and flip the UI busy.
    ///
    /// Inserts the run header and output pane, then flushes the pending
    /// fragment if output raced ahead of the ack.
    pub fn begin<S: ConsoleSurface>(&mut self, surface: &mut S, id: RunId) {
        debug!(run = %id, "run accepted");
        self.records.insert(id.clone(), RunRecord::new(id.clone()));
        self.current = Some(id.clone());
        self.busy = true;
        surface.set_busy(true);
        surface.insert_run_pane(&id);

        if let Some(fragment) = self.pending_fragment.take() {
            debug!(run = %id, "flushing fragment that arrived before the ack");
            self.append_output(surface, &fragment);
        }
    }

    /// Flip the UI busy without allocating: a run is already active
    /// server-side and its output belongs to some earlier client.
    pub fn mark_running<S: ConsoleSurface>(&mut self, surface: &mut S) {
        debug!("run already active server-side");
        self.busy = true;
        surface.set_busy(true);
    }

    /// Route an output fragment to the current run's pane.
    ///
    /// With no current record the fragment is held as the single pending
    /// fragment (newest wins) until an ack allocates one.
    pub fn append_output<S: ConsoleSurface>(&mut self, surface: &mut S, fragment: &str) {
        let Some(id) = self.current.clone() else {
            debug!("buffering output fragment with no current run");
            self.pending_fragment = Some(fragment.to_string());
            return;
        };
        if let Some(record) = self.records.get_mut(&id) {
            if record.state == RunState::Submitted {
                record.state = RunState::Streaming;
            }
        }
        surface.append_output(&id, fragment);
    }

    /// Complete the current run: flip the UI idle, record the summary and
    /// append the summary row (class attribute = the result text).
    ///
    /// Safe to invoke with no current record; logs and skips the record
    /// bookkeeping, the UI still returns to idle.
    pub fn complete<S: ConsoleSurface>(&mut self, surface: &mut S, result_text: &str) {
        self.busy = false;
        surface.set_busy(false);
        surface.append_summary(result_text, result_text);
        self.last_result = Some(result_text.to_string());

        match self.current.take() {
            Some(id) => {
                if let Some(record) = self.records.get_mut(&id) {
                    record.state = RunState::Completed;
                    record.result_summary = Some(result_text.to_string());
                }
                debug!(run = %id, result = result_text, "run completed");
            }
            None => warn!(result = result_text, "result arrived with no current run"),
        }
    }

    /// Cache fetched debug text on the run's record.
    pub fn cache_debug(&mut self, id: &RunId, text: &str) {
        if let Some(record) = self.records.get_mut(id) {
            record.debug_cache = Some(text.to_string());
        }
    }
}
