//! The job-store capability.
//!
//! The scheduler backend is consumed only through the narrow [`JobStore`]
//! contract: submit a descriptor, watch the shared completion stream, resolve
//! a consumed completion, and poll aggregate state counts. The orchestrator
//! never sees the backend's wire format.

mod http;

pub use http::HttpJobStore;

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::{mpsc, watch};

use crate::error::{Error, Result};
use crate::job::{CompletionEvent, JobDescriptor};

/// Job states the scheduler moves a job through, in lifecycle order
pub const JOB_STATES: [&str; 5] = ["pending", "claimed", "running", "completed", "resolving"];

/// Capability contract for the scheduler backend
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Submit a descriptor for execution. At most one submission per
    /// descriptor; the caller does not assume idempotency.
    async fn submit(&self, job: &JobDescriptor) -> Result<()>;

    /// Open the live completion watch. The returned streams produce until
    /// the watch is cancelled; the watch is not restartable.
    async fn watch_completions(&self) -> Result<CompletionWatch>;

    /// Acknowledge that a completion was consumed by this client. Safe to
    /// call once per completion; best effort.
    async fn resolve(&self, completion: CompletionEvent) -> Result<()>;

    /// Aggregate job counts per state plus per-node stats, for the emitter
    async fn job_state_counts(&self) -> Result<StateCounts>;
}

/// A live completion watch: the completion stream, the transient-error
/// stream, and the cancellation handle.
///
/// Both streams are consumed by exactly one reader. Watch errors are
/// transient and reported for operator visibility only; they never
/// terminate a run.
pub struct CompletionWatch {
    pub completions: mpsc::UnboundedReceiver<CompletionEvent>,
    pub errors: mpsc::UnboundedReceiver<Error>,
    pub cancel: CancelHandle,
}

impl CompletionWatch {
    /// Create a watch and the feeder half used to drive it
    pub fn channel() -> (WatchFeeder, CompletionWatch) {
        let (completions_tx, completions_rx) = mpsc::unbounded_channel();
        let (errors_tx, errors_rx) = mpsc::unbounded_channel();
        let (cancel_tx, cancel_rx) = watch::channel(false);

        (
            WatchFeeder {
                completions: completions_tx,
                errors: errors_tx,
                cancelled: cancel_rx,
            },
            CompletionWatch {
                completions: completions_rx,
                errors: errors_rx,
                cancel: CancelHandle { tx: cancel_tx },
            },
        )
    }
}

/// Producer half of a [`CompletionWatch`], held by the watch driver task
#[derive(Clone)]
pub struct WatchFeeder {
    pub completions: mpsc::UnboundedSender<CompletionEvent>,
    pub errors: mpsc::UnboundedSender<Error>,
    /// Flips to true once [`CancelHandle::cancel`] is invoked
    pub cancelled: watch::Receiver<bool>,
}

impl WatchFeeder {
    /// Whether the watch has been cancelled
    pub fn is_cancelled(&self) -> bool {
        *self.cancelled.borrow()
    }
}

/// Cancellation handle for a completion watch.
///
/// `cancel` is idempotent and causes both streams to stop producing after a
/// bounded delay. The orchestrator invokes it on every exit path so the
/// backend-side watch registration is never leaked.
pub struct CancelHandle {
    tx: watch::Sender<bool>,
}

impl CancelHandle {
    /// Stop the watch. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }
}

/// Aggregate state counts reported by the backend
#[derive(Debug, Clone, Default)]
pub struct StateCounts {
    /// Job count per state name
    pub states: BTreeMap<String, u64>,

    /// Watch registrations per backend node, indexed by endpoint order
    pub node_watchers: Vec<u64>,

    /// Scheduler nodes currently maintaining presence
    pub schedulers_present: u64,
}
