//! HTTP client for the job-store API.
//!
//! Jobs are submitted and resolved against the first configured endpoint;
//! per-node stats are polled from every endpoint. The completion watch is a
//! streaming NDJSON response pumped into channels by a background task that
//! reconnects on transient failures until the watch is cancelled.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use serde::Deserialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::job::{CompletionEvent, JobDescriptor};

use super::{CompletionWatch, JobStore, StateCounts, WatchFeeder};

/// Delay between watch reconnect attempts
const WATCH_RETRY_DELAY: Duration = Duration::from_secs(1);

/// HTTP job store client
#[derive(Debug, Clone)]
pub struct HttpJobStore {
    client: reqwest::Client,
    endpoints: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CountsResponse {
    #[serde(default)]
    states: BTreeMap<String, u64>,
    #[serde(default)]
    schedulers_present: u64,
}

#[derive(Debug, Deserialize)]
struct NodeStatsResponse {
    #[serde(default)]
    watchers: u64,
}

impl HttpJobStore {
    /// Connect to the job store, verifying the first endpoint is reachable.
    /// Connect failure is fatal to the caller; there is no retry here.
    pub async fn connect(endpoints: Vec<String>) -> Result<Self> {
        let endpoints: Vec<String> = endpoints
            .into_iter()
            .map(|e| e.trim_end_matches('/').to_string())
            .filter(|e| !e.is_empty())
            .collect();

        if endpoints.is_empty() {
            return Err(Error::NoEndpoints);
        }

        let store = Self {
            client: reqwest::Client::new(),
            endpoints,
        };

        let url = store.url("/v1/health");
        store
            .client
            .get(&url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| Error::Connect {
                endpoint: store.endpoints[0].clone(),
                reason: e.to_string(),
            })?;

        debug!(endpoint = %store.endpoints[0], "connected to job store");
        Ok(store)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.endpoints[0], path)
    }
}

#[async_trait]
impl JobStore for HttpJobStore {
    async fn submit(&self, job: &JobDescriptor) -> Result<()> {
        let response = self
            .client
            .post(self.url("/v1/jobs"))
            .json(job)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::UnexpectedStatus {
                operation: "submit",
                status: response.status(),
            });
        }
        Ok(())
    }

    async fn watch_completions(&self) -> Result<CompletionWatch> {
        let (feeder, watch) = CompletionWatch::channel();
        let client = self.client.clone();
        let url = self.url("/v1/jobs/completions/watch");

        tokio::spawn(pump_watch(client, url, feeder));

        Ok(watch)
    }

    async fn resolve(&self, completion: CompletionEvent) -> Result<()> {
        let response = self
            .client
            .post(self.url(&format!("/v1/jobs/{}/resolve", completion.guid)))
            .json(&completion)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Error::UnexpectedStatus {
                operation: "resolve",
                status: response.status(),
            });
        }
        Ok(())
    }

    async fn job_state_counts(&self) -> Result<StateCounts> {
        let counts: CountsResponse = self
            .client
            .get(self.url("/v1/jobs/counts"))
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        // Per-node stats are best effort; a node that fails to answer is
        // skipped rather than failing the whole poll.
        let mut node_watchers = Vec::with_capacity(self.endpoints.len());
        for endpoint in &self.endpoints {
            let stats: std::result::Result<NodeStatsResponse, reqwest::Error> = async {
                self.client
                    .get(format!("{endpoint}/v1/stats"))
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await
            }
            .await;

            match stats {
                Ok(stats) => node_watchers.push(stats.watchers),
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "failed to fetch node stats");
                    node_watchers.push(0);
                }
            }
        }

        Ok(StateCounts {
            states: counts.states,
            node_watchers,
            schedulers_present: counts.schedulers_present,
        })
    }
}

/// Drive the watch streams until cancelled. Transport and parse failures go
/// out on the error stream and the connection is retried; only cancellation
/// (or the consumer dropping the receivers) stops the pump.
async fn pump_watch(client: reqwest::Client, url: String, feeder: WatchFeeder) {
    let mut cancelled = feeder.cancelled.clone();

    loop {
        if *cancelled.borrow() {
            return;
        }

        let response = tokio::select! {
            _ = cancelled.changed() => return,
            r = client.get(&url).send() => r.and_then(|r| r.error_for_status()),
        };

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                if feeder.errors.send(Error::Http(e)).is_err() {
                    return;
                }
                tokio::select! {
                    _ = cancelled.changed() => return,
                    _ = sleep(WATCH_RETRY_DELAY) => continue,
                }
            }
        };

        let mut stream = response.bytes_stream();
        let mut buf: Vec<u8> = Vec::new();

        loop {
            let chunk = tokio::select! {
                _ = cancelled.changed() => return,
                c = stream.next() => c,
            };

            match chunk {
                // Stream ended server-side; reconnect.
                None => break,
                Some(Err(e)) => {
                    if feeder.errors.send(Error::Http(e)).is_err() {
                        return;
                    }
                    break;
                }
                Some(Ok(bytes)) => {
                    buf.extend_from_slice(&bytes);
                    while let Some(pos) = buf.iter().position(|&b| b == b'\n') {
                        let line: Vec<u8> = buf.drain(..=pos).collect();
                        match parse_completion_line(&line[..line.len() - 1]) {
                            Ok(Some(event)) => {
                                if feeder.completions.send(event).is_err() {
                                    return;
                                }
                            }
                            Ok(None) => {}
                            Err(e) => {
                                if feeder.errors.send(e).is_err() {
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        }

        tokio::select! {
            _ = cancelled.changed() => return,
            _ = sleep(WATCH_RETRY_DELAY) => {}
        }
    }
}

/// Parse one NDJSON line into a completion event; blank lines are keepalives
fn parse_completion_line(line: &[u8]) -> Result<Option<CompletionEvent>> {
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    if line.iter().all(|b| b.is_ascii_whitespace()) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(line)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_completion_line() {
        let event = parse_completion_line(br#"{"guid":"abc","failed":true}"#)
            .unwrap()
            .unwrap();
        assert_eq!(event.guid, "abc");
        assert!(event.failed);
    }

    #[test]
    fn test_parse_blank_line_is_keepalive() {
        assert!(parse_completion_line(b"").unwrap().is_none());
        assert!(parse_completion_line(b"  \r").unwrap().is_none());
    }

    #[test]
    fn test_parse_garbage_line_is_error() {
        assert!(parse_completion_line(b"not json").is_err());
    }

    #[tokio::test]
    async fn test_connect_requires_endpoints() {
        let err = HttpJobStore::connect(vec![]).await.unwrap_err();
        assert!(matches!(err, Error::NoEndpoints));

        let err = HttpJobStore::connect(vec!["".to_string(), "/".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, Error::NoEndpoints));
    }
}
