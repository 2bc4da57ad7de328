//! Conversation reconstruction for a remote coding-agent backend.
//!
//! The workspace splits along the seams of the problem: `backend_api` owns
//! the HTTP transport and the live event-line parser, `turn_decoder` owns
//! the pure event-to-turn fold shared by live and replay paths, and this
//! crate joins them with a producer/consumer stream coordinator.
//!
//! # Typical flow
//! - Build a [`BackendClient`] from a [`BackendConfig`] and call
//!   [`BackendClient::login`].
//! - Submit a prompt, then drive [`stream_job`] with a [`CancelSignal`] and
//!   a snapshot callback for incremental repaints.
//! - For stored conversations, fetch raw records and fold them through
//!   [`decode_history`] in one pass.

pub mod coordinator;

pub use coordinator::{
    consume_stream, stream_job, CancelSignal, StreamOutcome, StreamSnapshot, POLL_INTERVAL,
};

pub use backend_api::{
    BackendApiError, BackendClient, BackendConfig, JobCreated, JobDetail, JobSummary,
    PromptRequest, StoredSession,
};
pub use turn_decoder::{
    decode_history, Accumulator, JobEvent, LiveDecoder, Role, SessionTracker, ToolCall, Turn,
};
