//! stampede-core - Core library for Stampede
//!
//! This crate provides everything behind the stampede CLI:
//!
//! - **job**: job templates, per-run descriptors, completion events
//! - **store**: the job-store capability trait and its HTTP client
//! - **stampede**: the concurrent submission / completion-correlation engine
//! - **emitter**: the periodic job-state metric emitter
//! - **telemetry**: event/metric sinks (Datadog or no-op)

pub mod emitter;
pub mod error;
pub mod job;
pub mod stampede;
pub mod store;
pub mod telemetry;

// Re-export commonly used types
pub use error::{Error, Result};
pub use job::{CompletionEvent, JobDescriptor, JobResult, JobTemplate};
