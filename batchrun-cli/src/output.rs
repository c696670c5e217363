use batchrun_core::{ItemResult, RunSummary};
use serde::Serialize;

use crate::args::OutputArgs;

#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Short human-readable report.
    Text,
    /// One JSON document on stdout.
    Json,
}

/// Writes command results to stdout and errors to stderr.
#[derive(Debug, Clone, Copy)]
pub struct Printer {
    format: OutputFormat,
    quiet: bool,
}

impl Printer {
    pub fn new(args: &OutputArgs) -> Self {
        Self {
            format: args.format,
            quiet: args.quiet,
        }
    }

    pub fn is_text(&self) -> bool {
        self.format == OutputFormat::Text
    }

    pub fn is_quiet(&self) -> bool {
        self.quiet
    }

    /// Text mode renders YAML, the same shape a config file takes.
    pub fn document<T: Serialize>(&self, value: &T) {
        if self.quiet {
            return;
        }
        let rendered = match self.format {
            OutputFormat::Text => serde_yaml::to_string(value).map_err(|e| e.to_string()),
            OutputFormat::Json => serde_json::to_string(value).map_err(|e| e.to_string()),
        };
        match rendered {
            Ok(out) => println!("{}", out.trim_end()),
            Err(e) => self.error(&format!("failed to render output: {e}")),
        }
    }

    pub fn run_report<T: Serialize>(
        &self,
        summary: &RunSummary,
        results: &[ItemResult<T>],
        json: &serde_json::Value,
    ) {
        if self.quiet {
            return;
        }
        if self.format == OutputFormat::Json {
            self.document(json);
            return;
        }

        let took = summary
            .duration_ms
            .map(|ms| format!(" in {ms}ms"))
            .unwrap_or_default();
        println!(
            "{}: {}/{} processed, {} succeeded, {} failed{took}",
            summary.status, summary.processed, summary.total, summary.succeeded, summary.failed
        );
        for result in results {
            if let Some(err) = result.error() {
                println!("  {} ({} attempts): {}", result.id, err.attempts, err.message);
            }
        }
    }

    pub fn error(&self, message: &str) {
        if self.quiet {
            return;
        }
        match self.format {
            OutputFormat::Text => eprintln!("error: {message}"),
            OutputFormat::Json => eprintln!("{}", serde_json::json!({ "error": message })),
        }
    }
}
