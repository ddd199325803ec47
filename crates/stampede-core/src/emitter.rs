//! Periodic job-state metric emitter.
//!
//! Polls aggregate counts from the job store once a second and posts one
//! gauge per job state, one per backend node's watcher count, and one for
//! scheduler presence. Poll and post failures are logged and the loop
//! continues; it runs until the process is killed.

use std::sync::Arc;

use chrono::Utc;
use tokio::time::{interval, Duration};
use tracing::warn;

use crate::store::{JobStore, StateCounts, JOB_STATES};
use crate::telemetry::{EventSink, Metric};

/// Poll-and-post loop; never returns
pub async fn emit_job_states(store: Arc<dyn JobStore>, sink: Arc<dyn EventSink>) {
    let mut ticker = interval(Duration::from_secs(1));

    loop {
        ticker.tick().await;

        let counts = match store.job_state_counts().await {
            Ok(counts) => counts,
            Err(e) => {
                warn!(error = %e, "failed to fetch job state counts");
                continue;
            }
        };

        let metrics = state_metrics(&counts, Utc::now().timestamp());
        if let Err(e) = sink.post_metrics(metrics).await {
            warn!(error = %e, "failed to post state metrics");
        }
    }
}

/// Build the gauge batch for one poll. States the backend did not report are
/// emitted as zero so dashboards keep a continuous series.
fn state_metrics(counts: &StateCounts, timestamp: i64) -> Vec<Metric> {
    let mut metrics = Vec::with_capacity(JOB_STATES.len() + counts.node_watchers.len() + 1);

    for state in JOB_STATES {
        let count = counts.states.get(state).copied().unwrap_or(0);
        metrics.push(Metric::gauge(
            format!("stampede_job_{state}"),
            timestamp,
            count as f64,
        ));
    }

    for (node, watchers) in counts.node_watchers.iter().enumerate() {
        metrics.push(Metric::gauge(
            format!("scheduler_watchers_{node}"),
            timestamp,
            *watchers as f64,
        ));
    }

    metrics.push(Metric::gauge(
        "schedulers_maintaining_presence",
        timestamp,
        counts.schedulers_present as f64,
    ));

    metrics
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_metrics_cover_all_states() {
        let mut counts = StateCounts::default();
        counts.states.insert("pending".to_string(), 7);
        counts.states.insert("completed".to_string(), 3);
        counts.node_watchers = vec![12, 0];
        counts.schedulers_present = 4;

        let metrics = state_metrics(&counts, 1_700_000_000);
        assert_eq!(metrics.len(), JOB_STATES.len() + 2 + 1);

        let find = |name: &str| {
            metrics
                .iter()
                .find(|m| m.metric == name)
                .unwrap_or_else(|| panic!("missing metric {name}"))
        };

        assert_eq!(find("stampede_job_pending").points[0], (1_700_000_000, 7.0));
        assert_eq!(find("stampede_job_completed").points[0].1, 3.0);
        // Unreported states emit zero, not a gap.
        assert_eq!(find("stampede_job_claimed").points[0].1, 0.0);
        assert_eq!(find("scheduler_watchers_0").points[0].1, 12.0);
        assert_eq!(find("scheduler_watchers_1").points[0].1, 0.0);
        assert_eq!(find("schedulers_maintaining_presence").points[0].1, 4.0);
    }
}
