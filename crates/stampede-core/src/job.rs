//! Job templates, per-run descriptors, and completion events.
//!
//! A stampede run takes one [`JobTemplate`] and fans it out into `count`
//! independent [`JobDescriptor`]s, each carrying a freshly generated guid.
//! The scheduler reports terminal states back as [`CompletionEvent`]s, which
//! the correlation engine turns into [`JobResult`]s.

use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Log routing for a job's output (empty guid means no log routing)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct LogConfig {
    pub guid: String,
    pub source_name: String,
}

/// Immutable template describing the work every job in a stampede runs
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JobTemplate {
    /// Script to run
    pub script: String,

    /// Maximum runtime in seconds, enforced by the scheduler (0 for no limit)
    pub timeout_secs: u64,

    /// Memory limit in MB (0 for no limit)
    pub memory_mb: u32,

    /// Disk limit in MB (0 for no limit)
    pub disk_mb: u32,

    /// Stack tag the scheduler places the job on
    pub stack: String,

    /// Optional log routing target
    #[serde(skip_serializing_if = "Option::is_none")]
    pub log: Option<LogConfig>,
}

/// A single submittable job: the template plus a per-instance guid
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub guid: String,

    #[serde(flatten)]
    pub template: JobTemplate,
}

impl JobTemplate {
    /// Generate `count` independent descriptors from this template, each a
    /// copy with a fresh random guid. Guids are unique with overwhelming
    /// probability; collisions are not defended against.
    pub fn generate(&self, count: usize) -> Vec<JobDescriptor> {
        (0..count)
            .map(|_| JobDescriptor {
                guid: Uuid::new_v4().to_string(),
                template: self.clone(),
            })
            .collect()
    }
}

/// Scheduler-originated notification that a job reached a terminal state.
///
/// Arrives in arbitrary order relative to submission, and may carry a guid
/// this run never submitted (another stampede sharing the backend).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionEvent {
    pub guid: String,

    #[serde(default)]
    pub failed: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<String>,
}

/// Per-job outcome computed by the correlation engine
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub guid: String,
    pub duration: Duration,
    pub failed: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn template() -> JobTemplate {
        JobTemplate {
            script: "echo hello, world".to_string(),
            timeout_secs: 10,
            memory_mb: 256,
            disk_mb: 512,
            stack: "default".to_string(),
            log: Some(LogConfig {
                guid: "log-guid".to_string(),
                source_name: "TST".to_string(),
            }),
        }
    }

    #[test]
    fn test_generate_unique_guids() {
        let descriptors = template().generate(100);
        assert_eq!(descriptors.len(), 100);

        let mut guids: Vec<_> = descriptors.iter().map(|d| d.guid.clone()).collect();
        guids.sort();
        guids.dedup();
        assert_eq!(guids.len(), 100);
    }

    #[test]
    fn test_generate_copies_template() {
        let template = template();
        let descriptors = template.generate(3);
        for d in &descriptors {
            assert_eq!(d.template, template);
        }
    }

    #[test]
    fn test_generate_zero() {
        assert!(template().generate(0).is_empty());
    }

    #[test]
    fn test_descriptor_serializes_flat() {
        let descriptor = &template().generate(1)[0];
        let json = serde_json::to_value(descriptor).unwrap();
        assert_eq!(json["guid"], descriptor.guid.as_str());
        assert_eq!(json["script"], "echo hello, world");
        assert_eq!(json["log"]["source_name"], "TST");
    }

    #[test]
    fn test_completion_event_defaults() {
        let event: CompletionEvent = serde_json::from_str(r#"{"guid":"abc"}"#).unwrap();
        assert_eq!(event.guid, "abc");
        assert!(!event.failed);
        assert!(event.failure_reason.is_none());
    }
}
