//! Transport client for the remote job backend.
//!
//! This crate owns the HTTP surface only: cookie login with CSRF capture,
//! the control endpoints (jobs, prompts, stored sessions, files), and the
//! incremental line parser for live job event streams. Event semantics
//! live in `turn_decoder`; this crate hands it raw [`JobEvent`] values and
//! never interprets them.

pub mod client;
pub mod config;
pub mod error;
pub mod payload;
pub mod sse;

pub use client::{BackendClient, CancellationSignal};
pub use config::BackendConfig;
pub use error::BackendApiError;
pub use payload::{JobCreated, JobDetail, JobSummary, PromptRequest, SessionEvents, StoredSession};
pub use sse::EventLineParser;

pub use turn_decoder::JobEvent;
