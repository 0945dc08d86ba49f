//! The surface seam between the run state machine and whatever renders it.
//!
//! The original host is a document with stable element ids; the trait keeps
//! those ids as its contract so any surface (a real DOM, a terminal, the
//! in-memory reference below) stays interchangeable.

use crate::protocol::RunId;

/// Element id of the pane accumulating streamed output for a run.
pub fn output_pane_id(id: &RunId) -> String {
    format!("qa-output-{id}")
}

/// Element id of a run's header row.
pub fn run_header_id(id: &RunId) -> String {
    format!("run-header-{id}")
}

/// Element id of a run's on-demand debug region.
pub fn debug_region_id(id: &RunId) -> String {
    format!("debug-info-{id}")
}

/// Effectful UI application, driven by the run registry.
///
/// Implementations must treat streamed fragments as a trust-boundary
/// decision of their own: render as HTML only when the server is trusted.
pub trait ConsoleSurface {
    /// Disable and relabel the start control while a run is active.
    fn set_busy(&mut self, busy: bool);

    /// Append the run header and its empty output pane under the runs list.
    fn insert_run_pane(&mut self, id: &RunId);

    /// Append a fragment to the run's output pane and stick its scroll
    /// position to the bottom edge.
    fn append_output(&mut self, id: &RunId, html: &str);

    /// Append a one-line summary row bearing the literal result text; the
    /// class attribute equals the result text for styling.
    fn append_summary(&mut self, text: &str, class_attr: &str);

    /// Create the run's debug region immediately after its header on first
    /// call; on later calls replace the existing region's content.
    fn replace_debug_region(&mut self, id: &RunId, html: &str);
}

/// One addressable region of the in-memory surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pane {
    pub id: String,
    pub class_attr: String,
    pub content: String,
    /// Current scroll offset; pinned to `scroll_height` on every append.
    pub scroll_top: usize,
}

impl Pane {
    fn new(id: String, class_attr: &str) -> Self {
        Self {
            id,
            class_attr: class_attr.to_string(),
            content: String::new(),
            scroll_top: 0,
        }
    }

    /// Content height stand-in: the accumulated content length.
    pub fn scroll_height(&self) -> usize {
        self.content.len()
    }
}

/// In-memory reference surface.
///
/// Mirrors the host page contract: a start control, an ordered runs list,
/// and panes addressable by the same stable ids a document would carry.
/// Fragments are stored verbatim (the trusted-server posture of the
/// original page).
#[derive(Debug, Default)]
pub struct MemorySurface {
    busy: bool,
    start_label: String,
    /// Region ids in document order under the runs list.
    order: Vec<String>,
    panes: Vec<Pane>,
}

impl MemorySurface {
    pub fn new() -> Self {
        let mut surface = Self::default();
        surface.set_busy(false);
        surface
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    /// Label of the start control ("Perform QA" when idle).
    pub fn start_label(&self) -> &str {
        &self.start_label
    }

    pub fn pane(&self, id: &str) -> Option<&Pane> {
        self.panes.iter().find(|pane| pane.id == id)
    }

    /// Region ids under the runs list, in insertion order.
    pub fn region_order(&self) -> &[String] {
        &self.order
    }

    /// Summary rows appended so far, as (text, class) pairs.
    pub fn summaries(&self) -> Vec<(&str, &str)> {
        self.panes
            .iter()
            .filter(|pane| pane.id.starts_with("summary-"))
            .map(|pane| (pane.content.as_str(), pane.class_attr.as_str()))
            .collect()
    }

    fn push_pane(&mut self, pane: Pane) {
        self.order.push(pane.id.clone());
        self.panes.push(pane);
    }

    fn pane_mut(&mut self, id: &str) -> Option<&mut Pane> {
        self.panes.iter_mut().find(|pane| pane.id == id)
    }
}

impl ConsoleSurface for MemorySurface {
    fn set_busy(&mut self, busy: bool) {
        self.busy = busy;
        self.start_label = if busy { "QA is running" } else { "Perform QA" }.to_string();
    }

    fn insert_run_pane(&mut self, id: &RunId) {
        let mut header = Pane::new(run_header_id(id), "run-header");
        header.content = format!("QA execution #{id}");
        self.push_pane(header);
        self.push_pane(Pane::new(output_pane_id(id), "qa_output"));
    }

    fn append_output(&mut self, id: &RunId, html: &str) {
        let pane_id = output_pane_id(id);
        if let Some(pane) = self.pane_mut(&pane_id) {
            pane.content.push_str(html);
            pane.scroll_top = pane.content.len();
        }
    }

    fn append_summary(&mut self, text: &str, class_attr: &str) {
        let count = self
            .panes
            .iter()
            .filter(|pane| pane.id.starts_with("summary-"))
            .count();
        let mut row = Pane::new(format!("summary-{count}"), class_attr);
        row.content = text.to_string();
        self.push_pane(row);
    }

    fn replace_debug_region(&mut self, id: &RunId, html: &str) {
        let region_id = debug_region_id(id);
        if let Some(region) = self.pane_mut(&region_id) {
            region.content = html.to_string();
            return;
        }

        let mut region = Pane::new(region_id.clone(), "qa_output");
        region.content = html.to_string();
        // Position the region immediately after the run's header.
        let header_id = run_header_id(id);
        let at = self
            .order
            .iter()
            .position(|existing| existing == &header_id)
            .map_or(self.order.len(), |index| index + 1);
        self.order.insert(at, region_id);
        self.panes.push(region);
    }
}
