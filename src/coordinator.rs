use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{Receiver, RecvTimeoutError, Sender};
use std::sync::{mpsc, Arc};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use backend_api::{BackendApiError, BackendClient, JobEvent};
use turn_decoder::{LiveDecoder, SessionTracker, Turn};

/// Shared cancellation flag raised by the caller to stop a stream.
pub type CancelSignal = Arc<AtomicBool>;

/// Consumer wake-up interval. A raised cancel signal is observed within at
/// most one interval even when no events are arriving.
pub const POLL_INTERVAL: Duration = Duration::from_millis(300);

/// Point-in-time view of a stream handed to the snapshot callback after
/// every consumed batch and every idle wake-up.
#[derive(Debug)]
pub struct StreamSnapshot<'a> {
    /// Turns completed so far, in emission order.
    pub turns: &'a [Turn],
    /// Reply text accumulated since the last turn boundary.
    pub partial_text: &'a str,
    /// True when this snapshot comes from an idle wake-up rather than a
    /// consumed batch.
    pub waiting: bool,
}

/// Final result of a consumed stream.
///
/// Transport failures are not a separate case: the worker converts them to
/// diagnostic events before closing the channel, so they arrive here as
/// ordinary system turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamOutcome {
    pub turns: Vec<Turn>,
    pub cancelled: bool,
}

/// Streams one job to completion, reconstructing turns as events arrive.
///
/// The network read runs on a dedicated worker thread that forwards events
/// over an unbounded channel; this thread consumes them, folds them through
/// a [`LiveDecoder`], and repaints via `on_snapshot`. The call returns when
/// the stream ends, errors out, or `cancel` is raised. Queued events are
/// never dropped on cancellation.
pub fn stream_job<F>(
    client: Arc<BackendClient>,
    job_id: &str,
    cancel: CancelSignal,
    sessions: &mut SessionTracker,
    on_snapshot: F,
) -> StreamOutcome
where
    F: FnMut(StreamSnapshot<'_>),
{
    let (sender, receiver) = mpsc::channel();

    match spawn_stream_worker(client, job_id.to_string(), Arc::clone(&cancel), sender) {
        Ok(worker) => {
            let outcome = consume_stream(receiver, &cancel, sessions, on_snapshot);
            // The worker observes the cancel signal itself and exits shortly
            // after the consumer does.
            let _ = worker.join();
            outcome
        }
        Err(error) => {
            // The sender was consumed by the failed spawn, so the channel is
            // already disconnected; decode the failure directly.
            let mut decoder = LiveDecoder::new();
            let mut on_snapshot = on_snapshot;
            let turns: Vec<Turn> = decoder
                .feed(
                    JobEvent::Error {
                        text: format!("failed to spawn stream worker: {error}"),
                    },
                    sessions,
                )
                .into_iter()
                .collect();
            on_snapshot(StreamSnapshot {
                turns: &turns,
                partial_text: decoder.partial_text(),
                waiting: false,
            });
            StreamOutcome {
                turns,
                cancelled: false,
            }
        }
    }
}

/// Consumes forwarded events until the channel disconnects or `cancel` is
/// raised, calling `on_snapshot` after every batch and idle wake-up.
///
/// End of stream is the channel disconnect itself: the worker drops its
/// sender when the network read finishes for any reason. On an unclean end
/// the decoder flush still emits whatever content accumulated.
pub fn consume_stream<F>(
    receiver: Receiver<JobEvent>,
    cancel: &CancelSignal,
    sessions: &mut SessionTracker,
    mut on_snapshot: F,
) -> StreamOutcome
where
    F: FnMut(StreamSnapshot<'_>),
{
    let mut decoder = LiveDecoder::new();
    let mut turns: Vec<Turn> = Vec::new();
    let mut cancelled = false;

    loop {
        match receiver.recv_timeout(POLL_INTERVAL) {
            Ok(event) => {
                turns.extend(decoder.feed(event, sessions));
                drain_queued(&receiver, &mut decoder, sessions, &mut turns);
                if is_cancelled(cancel) {
                    cancelled = true;
                    break;
                }
                on_snapshot(StreamSnapshot {
                    turns: &turns,
                    partial_text: decoder.partial_text(),
                    waiting: false,
                });
            }
            Err(RecvTimeoutError::Timeout) => {
                if is_cancelled(cancel) {
                    drain_queued(&receiver, &mut decoder, sessions, &mut turns);
                    cancelled = true;
                    break;
                }
                on_snapshot(StreamSnapshot {
                    turns: &turns,
                    partial_text: decoder.partial_text(),
                    waiting: true,
                });
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    turns.extend(decoder.finish());
    on_snapshot(StreamSnapshot {
        turns: &turns,
        partial_text: decoder.partial_text(),
        waiting: false,
    });

    StreamOutcome { turns, cancelled }
}

fn drain_queued(
    receiver: &Receiver<JobEvent>,
    decoder: &mut LiveDecoder,
    sessions: &mut SessionTracker,
    turns: &mut Vec<Turn>,
) {
    while let Ok(event) = receiver.try_recv() {
        turns.extend(decoder.feed(event, sessions));
    }
}

fn spawn_stream_worker(
    client: Arc<BackendClient>,
    job_id: String,
    cancel: CancelSignal,
    sender: Sender<JobEvent>,
) -> std::io::Result<JoinHandle<()>> {
    thread::Builder::new()
        .name(format!("job-stream-{job_id}"))
        .spawn(move || {
            let result = run_stream(client.as_ref(), &job_id, &cancel, &sender);
            if let Err(error) = result {
                if !matches!(error, BackendApiError::Cancelled) {
                    let _ = sender.send(JobEvent::Error {
                        text: error.to_string(),
                    });
                }
            }
            // Dropping the sender here is the end-of-stream signal.
        })
}

fn run_stream(
    client: &BackendClient,
    job_id: &str,
    cancel: &CancelSignal,
    sender: &Sender<JobEvent>,
) -> Result<(), BackendApiError> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|error| {
            BackendApiError::Unknown(format!("failed to initialize tokio runtime: {error}"))
        })?;

    runtime.block_on(client.stream_job(job_id, Some(cancel), |event| {
        // A send failure means the consumer is gone; the cancel check in the
        // transport loop ends the read shortly after.
        let _ = sender.send(event);
    }))
}

fn is_cancelled(cancel: &CancelSignal) -> bool {
    cancel.load(Ordering::Acquire)
}
