//! ProxBox CLI - Ubuntu cloud-image templates and VMs on Proxmox VE

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use proxbox_cli::cli::Cli;
use proxbox_cli::domain::error::is_expected;
use proxbox_cli::output::json;

/// Environment variable holding a `tracing` filter directive.
const LOG_ENV: &str = "PROXBOX_LOG";

fn init_tracing(quiet: bool, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else if quiet {
        "warn"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(verbose)
        .without_time()
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.quiet, cli.verbose);
    let json_errors = cli.json;

    let Err(e) = cli.run().await else {
        return ExitCode::SUCCESS;
    };
    let (label, code): (&str, u8) = if is_expected(&e) {
        ("Error", 1)
    } else {
        ("Unexpected error", 2)
    };
    match json_errors.then(|| json::format_error(&format!("{e:#}"), i32::from(code))) {
        Some(Ok(body)) => println!("{body}"),
        _ => eprintln!("{label}: {e:#}"),
    }
    ExitCode::from(code)
}
