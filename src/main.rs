//! td - local task manager CLI
//!
//! Add, list, edit and complete tasks from the shell, or browse them on an
//! interactive board grouped by status.

use clap::Parser;
use taskdeck::cli::Cli;
use taskdeck::output::{emit_error, infer_command_name_from_args};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Longest RUST_LOG value we try to parse
const MAX_FILTER_LEN: usize = 4096;

/// RUST_LOG when it parses, else `taskdeck=debug` under `-v`, else silent.
fn log_filter(verbose: bool) -> EnvFilter {
    let from_env = std::env::var("RUST_LOG").ok().and_then(|raw| {
        let raw = raw.trim();
        (!raw.is_empty() && raw.len() <= MAX_FILTER_LEN)
            .then(|| EnvFilter::try_new(raw).ok())
            .flatten()
    });
    from_env.unwrap_or_else(|| EnvFilter::new(if verbose { "taskdeck=debug" } else { "off" }))
}

fn main() {
    let command = infer_command_name_from_args();
    let cli = Cli::parse();

    // Logs go to stderr so --json output on stdout stays parseable
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(log_filter(cli.verbose))
        .init();

    let json = cli.json;
    if let Err(err) = cli.run() {
        let _ = emit_error(&command, &err, json);
        std::process::exit(err.exit_code());
    }
}
