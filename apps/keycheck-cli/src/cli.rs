use clap::{Parser, Subcommand};
use keycheck_client::Operation;
use keycheck_config::Role;
use keycheck_harness::{Expected, ScenarioKind};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "keycheck")]
#[command(about = "Authorization conformance checks for a key manager secrets API")]
pub struct Cli {
    /// Path to the harness config (defaults to ~/.keycheck/config.json)
    #[arg(long, env = "KEYCHECK_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Key manager base URL, overriding the config file
    #[arg(long, env = "KEYCHECK_ENDPOINT", global = true)]
    pub endpoint: Option<String>,

    /// Increase log verbosity (-v debug, -vv trace). RUST_LOG takes precedence.
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Run the scenario suite against the configured endpoint
    Run {
        /// Only run these personas (repeatable)
        #[arg(long = "persona")]
        personas: Vec<String>,

        /// Only run these scenarios (repeatable)
        #[arg(long = "scenario")]
        scenarios: Vec<ScenarioKind>,

        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Perform a single call as one role
    Call {
        /// Operation name, e.g. get_secret_metadata
        operation: Operation,

        /// Role whose credential makes the call
        #[arg(long = "as")]
        role: Role,

        /// Expected outcome: a status code or a denial kind such as forbidden
        #[arg(long)]
        expect: Option<Expected>,

        /// Operation parameter as key=value (repeatable)
        #[arg(long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
    },
    /// Print the persona expectation table
    Personas,
    /// Run the suite against the built-in in-memory service
    Selftest {
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
}

fn parse_param(s: &str) -> Result<(String, String), String> {
    let (key, value) = s
        .split_once('=')
        .ok_or_else(|| format!("expected key=value, got '{}'", s))?;
    if key.is_empty() {
        return Err(format!("empty parameter name in '{}'", s));
    }
    Ok((key.to_string(), value.to_string()))
}
