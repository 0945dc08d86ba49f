//! Pure state layer for the QA console.
//!
//! This crate intentionally does no I/O:
//! - wire classification of push frames and submission acks
//! - the run registry state machine
//! - the QA form snapshot with the level-constraint table
//! - the surface seam that UI application happens behind

pub mod config;
pub mod error;
pub mod form;
pub mod protocol;
pub mod registry;
pub mod surface;

pub use config::{DEFAULT_BASE_URL, ENV_BASE_URL, normalize_base_url, push_channel_url, resolve_base_url};
pub use error::{ClientError, Result};
pub use form::{Level, QaForm, SelectionMode, TerminologyMode};
pub use protocol::{PushEvent, RunId, SubmissionAck, classify_frame, decode_ack, decode_file_selection};
pub use registry::{RunRecord, RunRegistry, RunState};
pub use surface::{ConsoleSurface, MemorySurface, Pane};
