//! stampede - burst-load generator for a job scheduler
//!
//! Connects to the job store, fans out `--count` copies of one job template,
//! reports each job's completion duration, and posts start/stop telemetry.
//! With `--emit-states` it instead polls aggregate job-state counts forever.

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use stampede_core::store::{HttpJobStore, JobStore};
use stampede_core::telemetry::{DatadogSink, EventSink, NoopSink};
use stampede_core::{emitter, stampede, JobTemplate};

mod cli;

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(
            EnvFilter::from_default_env()
                .add_directive("stampede=info".parse()?)
                .add_directive("stampede_core=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    let sink: Arc<dyn EventSink> = match cli.datadog_api_key {
        Some(api_key) => Arc::new(DatadogSink::new(api_key, cli.datadog_app_key)),
        None => Arc::new(NoopSink),
    };

    let store: Arc<dyn JobStore> = Arc::new(
        HttpJobStore::connect(cli.endpoints)
            .await
            .context("failed to connect to job store")?,
    );

    if cli.emit_states {
        emitter::emit_job_states(store, sink).await;
        return Ok(());
    }

    let template = JobTemplate {
        script: cli.script,
        timeout_secs: cli.timeout_secs,
        memory_mb: cli.memory_mb,
        disk_mb: cli.disk_mb,
        stack: cli.stack,
        log: cli.log_guid.map(|guid| stampede_core::job::LogConfig {
            guid,
            source_name: cli.log_source_name,
        }),
    };

    let summary = stampede::run(store, sink, template, cli.count).await?;

    info!(
        count = summary.count,
        elapsed = ?summary.elapsed,
        "stampede complete"
    );

    Ok(())
}
