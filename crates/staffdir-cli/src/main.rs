//! staffdir - a command-line client for the employee directory.
//!
//! Every command is a session check point: an expired session is noticed
//! here and the user is sent back to `staffdir login`.

mod app;
mod prompt;
mod sign_in;

use std::io;
use std::path::Path;

use anyhow::Result;
use staffdir_core::Config;
use tracing::{info, Level};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{filter::LevelFilter, fmt, prelude::*, EnvFilter};

use app::{App, Command};

/// Log file prefix inside the cache directory
const LOG_FILE_PREFIX: &str = "staffdir.log";

/// Initialize the tracing subscriber for logging.
///
/// Stderr follows `RUST_LOG` (default `warn`). When a cache directory is
/// available, debug-level logs also go to a daily rolling file there.
fn init_tracing(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let stderr_layer = fmt::layer().with_writer(io::stderr).with_filter(filter);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir.join("logs"), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(LevelFilter::from_level(Level::DEBUG));
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(stderr_layer)
        .with(file_layer)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}\n\n{}", e, app::USAGE);
            std::process::exit(2);
        }
    };

    if command == Command::Help {
        println!("{}", app::USAGE);
        return Ok(());
    }

    // The cache directory does not depend on config contents
    let log_dir = Config::default().cache_dir().ok();
    let log_guard = init_tracing(log_dir.as_deref());

    let mut app = App::new()?;
    info!(?command, api_url = %app.config.api_url, "staffdir starting");

    if let Err(e) = app.run(command).await {
        eprintln!("Error: {}", e);
        // Flush the log file before exiting
        drop(log_guard);
        std::process::exit(1);
    }

    Ok(())
}
