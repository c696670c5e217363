use std::path::Path;
use std::sync::Arc;

use batchrun_core::{ItemResult, RunSummary};
use batchrun_exec::executor::{
    CompositeEventSink, MetricsCollector, MetricsEventSink, StdoutEventSink,
};
use batchrun_exec::{EventSink, Executor};
use serde::Serialize;
use tracing::{info, warn};

use crate::args::{OutputArgs, PacingArgs, SimulationArgs};
use crate::cmd::config::effective_config;
use crate::cmd::progress::ProgressEventSink;
use crate::cmd::synthetic::SyntheticOperation;
use crate::exit_codes::Exit;
use crate::output::Printer;

#[derive(Debug, Serialize)]
struct SimulationReport<'a> {
    summary: &'a RunSummary,
    metrics: serde_json::Value,
    results: &'a [ItemResult<String>],
}

pub async fn simulate_cmd(
    ids: Vec<String>,
    ids_file: Option<&Path>,
    events: bool,
    output: OutputArgs,
    pacing: PacingArgs,
    simulation: SimulationArgs,
) -> Exit {
    let printer = Printer::new(&output);
    let config = match effective_config(&pacing) {
        Ok(cfg) => cfg,
        Err(msg) => {
            printer.error(&msg);
            return Exit::InvalidInput;
        }
    };
    let ids = match collect_ids(ids, ids_file) {
        Ok(ids) if ids.is_empty() => {
            printer.error("no ids given");
            return Exit::InvalidInput;
        }
        Ok(ids) => ids,
        Err(msg) => {
            printer.error(&msg);
            return Exit::InvalidInput;
        }
    };
    let operation = match SyntheticOperation::new(&simulation) {
        Ok(op) => Arc::new(op),
        Err(msg) => {
            printer.error(&msg);
            return Exit::InvalidInput;
        }
    };

    let mut sinks = CompositeEventSink::<String>::new();
    if printer.is_text() && !printer.is_quiet() {
        sinks.add(Arc::new(ProgressEventSink::new()));
    }
    if events {
        sinks.add(Arc::new(StdoutEventSink));
    }
    let collector = Arc::new(MetricsCollector::new());
    let event_sink: Arc<dyn EventSink<String>> =
        Arc::new(MetricsEventSink::new(collector.clone(), Arc::new(sinks)));

    let executor = Executor::<String>::new(config, operation, event_sink);
    let handle = match executor.start(ids) {
        Ok(handle) => handle,
        Err(e) => {
            printer.error(&e.to_string());
            return Exit::InvalidInput;
        }
    };
    info!(run_id = %handle.run_id(), "simulation started");

    let canceller = executor.clone();
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupt received; cancelling after the current item");
            canceller.cancel();
        }
    });

    let results = handle.wait().await;
    interrupt.abort();
    let results = match results {
        Ok(results) => results,
        Err(e) => {
            printer.error(&e.to_string());
            return Exit::Runtime;
        }
    };

    let summary = executor.state().summary();
    // With --events stdout is reserved for the event stream.
    if !events {
        let report = SimulationReport {
            summary: &summary,
            metrics: collector.get_metrics().await.to_json(),
            results: &results,
        };
        let json = serde_json::to_value(&report).unwrap_or_default();
        printer.run_report(&summary, &results, &json);
    }

    Exit::for_run(summary.status, summary.failed)
}

/// Positional ids first, then the ids file in order.
fn collect_ids(mut ids: Vec<String>, ids_file: Option<&Path>) -> Result<Vec<String>, String> {
    if let Some(path) = ids_file {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| format!("failed to read ids file {}: {e}", path.display()))?;
        ids.extend(
            raw.lines()
                .map(str::trim)
                .filter(|line| !line.is_empty() && !line.starts_with('#'))
                .map(str::to_string),
        );
    }
    if let Some(blank) = ids.iter().position(|id| id.trim().is_empty()) {
        return Err(format!("id at position {} is blank", blank + 1));
    }
    Ok(ids)
}
