//! Turn reconstruction core for remote agent job streams.
//!
//! This crate owns the normalization of the backend's two wire encodings into
//! one turn model, and the folding logic that rebuilds ordered conversation
//! turns from partially-ordered event fragments. It intentionally contains no
//! transport or display coupling: events arrive as already-parsed JSON values,
//! turns leave as plain owned data.
//!
//! Two decoders share the model:
//! - [`LiveDecoder`] folds incremental stream events one at a time, yielding
//!   each completed [`Turn`] as soon as its boundary event arrives and exposing
//!   the in-progress text buffer between boundaries.
//! - [`decode_history`] folds a fully materialized list of stored records (a
//!   structurally different encoding) in one pass, correlating tool results to
//!   invocations by identifier across arbitrary gaps.
//!
//! Malformed input is never fatal anywhere in this crate: unrecognized records
//! normalize to nothing and the decoders degrade to best-effort partial
//! reconstruction.

pub mod accumulator;
pub mod event;
pub mod live;
pub mod replay;
pub mod session;
pub mod turn;

pub use accumulator::Accumulator;
pub use event::JobEvent;
pub use live::LiveDecoder;
pub use replay::decode_history;
pub use session::SessionTracker;
pub use turn::{PendingToolCall, Role, ToolCall, Turn};
