use std::path::PathBuf;

use clap::Args;

use crate::output::OutputFormat;

#[derive(Debug, Args, Clone)]
pub struct OutputArgs {
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
    #[arg(long, short)]
    pub quiet: bool,
}

/// Pacing and retry settings; flags override the config file.
#[derive(Debug, Args, Clone)]
pub struct PacingArgs {
    /// JSON or YAML executor config.
    #[arg(long)]
    pub config: Option<PathBuf>,
    #[arg(long)]
    pub batch_size: Option<usize>,
    #[arg(long)]
    pub item_delay_ms: Option<u64>,
    #[arg(long)]
    pub batch_delay_ms: Option<u64>,
    #[arg(long)]
    pub max_retries: Option<u32>,
    #[arg(long)]
    pub retry_default_delay_ms: Option<u64>,
    #[arg(long)]
    pub retry_max_delay_ms: Option<u64>,
}

/// Behaviour of the synthetic operation.
#[derive(Debug, Args, Clone)]
pub struct SimulationArgs {
    /// Time each call takes.
    #[arg(long, default_value_t = 0)]
    pub latency_ms: u64,
    /// Probability that a call fails with a terminal error.
    #[arg(long, default_value_t = 0.0)]
    pub fail_rate: f64,
    /// Probability that a call is throttled.
    #[arg(long, default_value_t = 0.0)]
    pub rate_limit_rate: f64,
    /// Retry hint carried by throttling errors; omit to fall back to the default delay.
    #[arg(long)]
    pub retry_after_secs: Option<u64>,
    #[arg(long)]
    pub seed: Option<u64>,
}
