//! Transports and controller for the QA console.
//!
//! The pure state machine lives in `qa-console-core`; this crate owns the
//! I/O around it:
//! - the push-channel connection (lazy, reconnect-on-demand)
//! - the submission gateway and debug loader over HTTP
//! - the dispatcher applying classified frames to registry and surface
//! - `QaConsole`, the controller tying the pieces to one server

pub mod connection;
pub mod console;
pub mod dispatcher;
pub mod gateway;

pub use connection::{ChannelEvent, ConnectionManager, ReadyState};
pub use console::QaConsole;
pub use dispatcher::dispatch;
pub use gateway::QaGateway;
