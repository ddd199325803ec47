//! CLI argument definitions using clap derive macros.

use clap::Parser;

/// Stampede - burst-load generation against a job scheduler
///
/// Submits a batch of identical jobs simultaneously, correlates their
/// completions, and reports per-job durations plus start/stop telemetry.
#[derive(Parser, Debug)]
#[command(name = "stampede")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Comma-separated list of job store API endpoints
    #[arg(long, env = "STAMPEDE_ENDPOINTS", value_delimiter = ',')]
    pub endpoints: Vec<String>,

    /// Number of jobs to create
    #[arg(long, default_value_t = 1)]
    pub count: usize,

    /// Script to run in each job
    #[arg(long, default_value = "echo hello, world")]
    pub script: String,

    /// Maximum runtime of each job in seconds (0 for no limit)
    #[arg(long, default_value_t = 10)]
    pub timeout_secs: u64,

    /// Memory limit of each job in MB (0 for no limit)
    #[arg(long, default_value_t = 0)]
    pub memory_mb: u32,

    /// Disk limit of each job in MB (0 for no limit)
    #[arg(long, default_value_t = 0)]
    pub disk_mb: u32,

    /// Stack tag the scheduler places jobs on
    #[arg(long, default_value = "default")]
    pub stack: String,

    /// Guid for log routing (empty for no logs)
    #[arg(long)]
    pub log_guid: Option<String>,

    /// Source name for routed logs
    #[arg(long, default_value = "TST")]
    pub log_source_name: String,

    /// Emit job state counts to the telemetry backend instead of stampeding
    #[arg(long)]
    pub emit_states: bool,

    /// Datadog API key (telemetry is a no-op without it)
    #[arg(long, env = "DATADOG_API_KEY", hide_env_values = true)]
    pub datadog_api_key: Option<String>,

    /// Datadog application key
    #[arg(long, env = "DATADOG_APP_KEY", hide_env_values = true)]
    pub datadog_app_key: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let cli = Cli::parse_from(["stampede", "--endpoints", "http://localhost:4001"]);
        assert_eq!(cli.endpoints, vec!["http://localhost:4001"]);
        assert_eq!(cli.count, 1);
        assert_eq!(cli.script, "echo hello, world");
        assert_eq!(cli.timeout_secs, 10);
        assert!(cli.log_guid.is_none());
        assert!(!cli.emit_states);
    }

    #[test]
    fn test_endpoints_split_on_comma() {
        let cli = Cli::parse_from([
            "stampede",
            "--endpoints",
            "http://a:4001,http://b:4001",
            "--count",
            "50",
        ]);
        assert_eq!(cli.endpoints, vec!["http://a:4001", "http://b:4001"]);
        assert_eq!(cli.count, 50);
    }
}
