use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use batchrun_exec::ExecutorConfig;

use crate::args::{OutputArgs, PacingArgs};
use crate::exit_codes::Exit;
use crate::output::Printer;

pub fn config_cmd(output: OutputArgs, pacing: PacingArgs) -> Exit {
    let printer = Printer::new(&output);
    match effective_config(&pacing) {
        Ok(cfg) => {
            printer.document(&cfg);
            Exit::Success
        }
        Err(msg) => {
            printer.error(&msg);
            Exit::InvalidInput
        }
    }
}

/// Config file (if any) with command-line overrides applied on top.
pub fn effective_config(pacing: &PacingArgs) -> Result<ExecutorConfig, String> {
    let mut cfg = match pacing.config.as_deref() {
        Some(path) => load_config(path)?,
        None => ExecutorConfig::default(),
    };

    if let Some(batch_size) = pacing.batch_size {
        cfg.batch_size = batch_size;
    }
    if let Some(ms) = pacing.item_delay_ms {
        cfg.delay_between_items = Duration::from_millis(ms);
    }
    if let Some(ms) = pacing.batch_delay_ms {
        cfg.delay_between_batches = Duration::from_millis(ms);
    }
    if let Some(max_retries) = pacing.max_retries {
        cfg.retry.max_retries = max_retries;
    }
    if let Some(ms) = pacing.retry_default_delay_ms {
        cfg.retry.default_delay = Duration::from_millis(ms);
    }
    if let Some(ms) = pacing.retry_max_delay_ms {
        cfg.retry.max_delay = Some(Duration::from_millis(ms));
    }

    cfg.validate().map_err(|e| e.to_string())?;
    Ok(cfg)
}

fn load_config(path: &Path) -> Result<ExecutorConfig, String> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| format!("failed to read config {}: {e}", path.display()))?;
    ExecutorConfig::from_str(&raw).map_err(|e| format!("{}: {e}", path.display()))
}
