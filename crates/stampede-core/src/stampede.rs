//! The stampede orchestrator.
//!
//! Submits `count` copies of a job template concurrently, watches the shared
//! completion stream, correlates each completion back to its submission, and
//! resolves every consumed completion.
//!
//! ```text
//! template ──► fan-out (one task per job) ──► submission records ─┐
//!                                                                 ▼
//!   watch stream ──► completions ──────────────► correlation loop ──► results
//!                    watch errors ──► logged ──►        │
//!                                                       └──► resolve tasks (joined at shutdown)
//! ```
//!
//! All run state lives in the correlation loop; worker tasks communicate with
//! it only through channels. A failed submission aborts the whole run (it is
//! evidence of backend unavailability, not a per-job condition); watch errors
//! and resolve failures are logged and absorbed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::error::{Error, Result};
use crate::job::{JobResult, JobTemplate};
use crate::store::{CompletionWatch, JobStore};
use crate::telemetry::EventSink;

/// Outcome of a finished stampede
#[derive(Debug)]
pub struct StampedeSummary {
    /// Number of jobs submitted and completed
    pub count: usize,
    /// Wall-clock time from just before fan-out to after the last resolve
    pub elapsed: Duration,
    /// Per-job outcomes, in completion order
    pub results: Vec<JobResult>,
}

/// Submission record published by a fan-out task once its submit call lands
struct Submission {
    guid: String,
    submitted_at: Instant,
}

/// Run one stampede: fan out `count` jobs built from `template`, wait for all
/// of their completions, resolve each one, and report start/stop telemetry.
///
/// The watch is cancelled on every exit path, and all dispatched resolve
/// tasks are joined before this returns, on the abort path included.
pub async fn run(
    store: Arc<dyn JobStore>,
    sink: Arc<dyn EventSink>,
    template: JobTemplate,
    count: usize,
) -> Result<StampedeSummary> {
    let mut watch = store.watch_completions().await?;
    let started_at = Instant::now();

    report_event(
        &*sink,
        "stampede_start",
        "started the stampede",
        vec![format!("count:{count}")],
    )
    .await;

    let (submissions_tx, submissions_rx) = mpsc::unbounded_channel();
    // Single-slot fatal channel: the first failed submission aborts the run,
    // later failures are dropped.
    let (fatal_tx, fatal_rx) = mpsc::channel::<Error>(1);

    for job in template.generate(count) {
        let store = store.clone();
        let submissions_tx = submissions_tx.clone();
        let fatal_tx = fatal_tx.clone();
        tokio::spawn(async move {
            let submitted_at = Instant::now();
            match store.submit(&job).await {
                Ok(()) => {
                    info!(guid = %job.guid, "submitted job");
                    let _ = submissions_tx.send(Submission {
                        guid: job.guid,
                        submitted_at,
                    });
                }
                Err(e) => {
                    let _ = fatal_tx.try_send(Error::submit_failed(job.guid, e.to_string()));
                }
            }
        });
    }
    drop(submissions_tx);
    drop(fatal_tx);

    let mut acks: JoinSet<()> = JoinSet::new();
    let outcome = correlate(&store, &mut watch, submissions_rx, fatal_rx, &mut acks, count).await;

    // Every dispatched resolve must land before we return, abort path
    // included. Resolve failures were already logged inside the tasks.
    while acks.join_next().await.is_some() {}

    watch.cancel.cancel();

    let results = outcome?;
    let elapsed = started_at.elapsed();

    report_event(
        &*sink,
        "stampede_stop",
        "stopped the stampede",
        vec![format!("count:{count}"), format!("duration:{elapsed:?}")],
    )
    .await;

    Ok(StampedeSummary {
        count,
        elapsed,
        results,
    })
}

/// The correlation loop: sole owner of the pending-submissions map, handling
/// one event per iteration from whichever source is ready first.
async fn correlate(
    store: &Arc<dyn JobStore>,
    watch: &mut CompletionWatch,
    mut submissions: mpsc::UnboundedReceiver<Submission>,
    mut fatal: mpsc::Receiver<Error>,
    acks: &mut JoinSet<()>,
    target: usize,
) -> Result<Vec<JobResult>> {
    let mut pending: HashMap<String, Instant> = HashMap::new();
    let mut results = Vec::with_capacity(target);

    while results.len() < target {
        tokio::select! {
            Some(submission) = submissions.recv() => {
                pending.insert(submission.guid, submission.submitted_at);
            }
            Some(event) = watch.completions.recv() => {
                let Some(submitted_at) = pending.remove(&event.guid) else {
                    // Another run's job, a duplicate delivery, or a completion
                    // that beat its own submission record. Absorbed, never
                    // credited, never resolved.
                    debug!(guid = %event.guid, "ignoring completion for unknown job");
                    continue;
                };

                let result = JobResult {
                    guid: event.guid.clone(),
                    duration: submitted_at.elapsed(),
                    failed: event.failed,
                };
                info!(
                    done = results.len(),
                    guid = %result.guid,
                    duration = ?result.duration,
                    failed = result.failed,
                    "job completed"
                );
                results.push(result);

                let store = store.clone();
                acks.spawn(async move {
                    if let Err(e) = store.resolve(event).await {
                        warn!(error = %e, "failed to resolve completion");
                    }
                });
            }
            Some(error) = watch.errors.recv() => {
                warn!(error = %error, "watch error");
            }
            Some(error) = fatal.recv() => {
                return Err(error);
            }
            else => return Err(Error::WatchClosed),
        }
    }

    Ok(results)
}

/// Post a lifecycle event; emission failures are logged, never fatal
async fn report_event(sink: &dyn EventSink, title: &str, text: &str, tags: Vec<String>) {
    match sink.post_event(title, text, tags).await {
        Ok(()) => info!(title, "posted telemetry event"),
        Err(e) => warn!(title, error = %e, "failed to post telemetry event"),
    }
}
