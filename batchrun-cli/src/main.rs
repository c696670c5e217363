use clap::Parser;
use tracing_subscriber::EnvFilter;

mod args;
mod cmd;
mod commands;
mod exit_codes;
mod output;

use commands::Command;

#[derive(Debug, Parser)]
#[command(name = "batchrun", version, about = "Paced batch execution simulator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

fn main() {
    let cli = Cli::parse();
    init_tracing();

    let rt = match tokio::runtime::Runtime::new() {
        Ok(rt) => rt,
        Err(e) => {
            eprintln!("error: failed to create tokio runtime: {e}");
            std::process::exit(exit_codes::Exit::Runtime.code());
        }
    };

    let exit = rt.block_on(run_command(cli.command));
    std::process::exit(exit.code());
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env("BATCHRUN_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run_command(command: Command) -> exit_codes::Exit {
    match command {
        Command::Simulate {
            ids,
            ids_file,
            events,
            output,
            pacing,
            simulation,
        } => {
            cmd::simulate::simulate_cmd(
                ids,
                ids_file.as_deref(),
                events,
                output,
                pacing,
                simulation,
            )
            .await
        }
        Command::Config { output, pacing } => cmd::config::config_cmd(output, pacing),
    }
}
