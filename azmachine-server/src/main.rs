use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod arm;
mod backend;
mod cli;
mod commands;
mod config;

use cli::{Args, Mode};

/// Initialize tracing with two outputs:
/// 1. Console (stderr) for interactive use
/// 2. File (~/.azmachine/server.log) for persistence
fn initialize_tracing() -> Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        "info,\
         azmachine_server=debug,\
         azmachine_orchestrations=debug,\
         tower_http=debug"
            .into()
    });

    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    let azmachine_dir = PathBuf::from(home).join(".azmachine");
    std::fs::create_dir_all(&azmachine_dir).ok();

    let file_appender = tracing_appender::rolling::never(&azmachine_dir, "server.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    // Dropping the guard stops file logging
    std::mem::forget(guard);

    let file_layer = fmt::layer().with_writer(file_writer).with_ansi(false);
    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    initialize_tracing()?;

    match args.mode {
        Mode::Serve { port } => commands::server::run_serve_mode(port).await,
        Mode::Create {
            name,
            spec,
            remote,
            timeout,
            output,
        } => commands::machine::run_create(name, &spec, remote, timeout, output).await,
        Mode::Delete { name, spec, remote } => commands::machine::run_delete(name, &spec, remote).await,
        Mode::Status {
            name,
            spec,
            remote,
            output,
        } => commands::machine::run_status(name, &spec, remote, output).await,
    }
}
