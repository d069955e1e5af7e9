//! linkwire - act on LinkedIn as one authorized member from the terminal.
//!
//! Configuration comes from the environment (and a `.env` file if present).
//! Run `linkwire auth-url` to start authorization, then `linkwire authorize
//! <code>` with the code the browser hands back.

mod commands;
mod format;

use std::io;
use std::process::ExitCode;

use clap::Parser;
use tracing::{debug, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use commands::Command;

/// Directory for a daily rolling log file, in addition to stderr
const LOG_DIR_ENV: &str = "LINKWIRE_LOG_DIR";

const LOG_FILE_PREFIX: &str = "linkwire.log";

#[derive(Debug, Parser)]
#[command(name = "linkwire", version, about = "Act on LinkedIn as one authorized member")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

/// Initialize the tracing subscriber for logging.
///
/// The returned guard flushes the file writer and must live until exit.
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=linkwire_core=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var_os(LOG_DIR_ENV) {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_ansi(false).with_writer(writer)), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> ExitCode {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _guard = init_tracing();
    let cli = Cli::parse();
    debug!(command = ?cli.command, "linkwire starting");

    match commands::run(cli.command).await {
        Ok(output) => {
            println!("{}", output);
            ExitCode::SUCCESS
        }
        Err(e) => {
            info!(error = %e, "Command failed");
            eprintln!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}
