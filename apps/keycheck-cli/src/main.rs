mod cli;
mod commands;

use clap::Parser;
use cli::{Cli, Command};
use commands::{cmd_call, cmd_personas, cmd_run, cmd_selftest};
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: u8) {
    let default_level = match verbose {
        0 => "info",
        1 => "debug",
        _ => "trace",
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Command::Run {
            personas,
            scenarios,
            json,
        } => {
            cmd_run(
                cli.config.as_deref(),
                cli.endpoint.as_deref(),
                personas,
                scenarios,
                json,
            )
            .await?;
        }
        Command::Call {
            operation,
            role,
            expect,
            params,
        } => {
            cmd_call(
                cli.config.as_deref(),
                cli.endpoint.as_deref(),
                operation,
                role,
                expect,
                params,
            )
            .await?;
        }
        Command::Personas => {
            cmd_personas();
        }
        Command::Selftest { json } => {
            cmd_selftest(json).await?;
        }
    }

    Ok(())
}
