//! Switch binary: runs the message switch and the log sink in one
//! process, joined by the bounded record queue.
//!
//! Usage:
//!   switch --port 49153 --max-connections 999
//!   switch --config switch.toml --log-file messages.msg

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use switch::{Switch, SwitchConfig};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "switch")]
#[command(about = "Identity-routed message switch")]
#[command(version)]
struct Args {
    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Listen port (overrides the config file)
    #[arg(short, long)]
    port: Option<u16>,

    /// Maximum number of concurrently connected members
    #[arg(short = 'n', long)]
    max_connections: Option<usize>,

    /// Where the sink appends one line per routed message
    #[arg(long, default_value = sink::DEFAULT_LOG_FILE)]
    log_file: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let mut config = match &args.config {
        Some(path) => SwitchConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => SwitchConfig::default(),
    };
    if let Some(port) = args.port {
        config.port = port;
    }
    if let Some(max) = args.max_connections {
        config.max_connections = max;
    }

    // The sink is its own unit on the far side of the bounded record
    // queue; running it as a task here is an arrangement choice, not
    // a code dependency.
    let (log_tx, log_rx) = sink::record_queue(config.log_queue_depth);
    let log_file = sink::open_log(&args.log_file)
        .await
        .with_context(|| format!("opening log file {}", args.log_file.display()))?;
    let sink_task = tokio::spawn(sink::Sink::new(log_file).run(log_rx));

    let switch = Switch::start(config, log_tx).await?;
    info!(addr = %switch.local_addr(), log_file = %args.log_file.display(), "ready");

    tokio::signal::ctrl_c()
        .await
        .context("installing CTRL+C handler")?;
    info!("shutdown signal received");

    // Stopping the switch drops the queue sender, which is the sink's
    // signal to drain out and close the log file.
    switch.shutdown().await;
    let written = sink_task.await??;
    info!(records = written, "log sink finished");

    Ok(())
}

fn init_logging(level: &str) {
    let level = match level.to_lowercase().as_str() {
        "trace" => tracing::Level::TRACE,
        "debug" => tracing::Level::DEBUG,
        "warn" => tracing::Level::WARN,
        "error" => tracing::Level::ERROR,
        _ => tracing::Level::INFO,
    };
    tracing_subscriber::fmt().with_max_level(level).init();
}
