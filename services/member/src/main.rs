//! Interactive member binary. Type `<mti> <dst>` on stdin to send a
//! request; inbound requests are printed and answered automatically
//! with mti + 10.

use std::net::{IpAddr, SocketAddr};

use anyhow::{Context, Result};
use clap::Parser;
use member::{addressed_to, auto_reply, Member};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(name = "member")]
#[command(about = "Interactive client for the message switch")]
#[command(version)]
struct Args {
    /// Switch IP address
    #[arg(short, long, default_value = "127.0.0.1")]
    addr: IpAddr,

    /// Switch port
    #[arg(short, long, default_value_t = 49153)]
    port: u16,

    /// Our identity (1..=16777215)
    #[arg(short = 's', long, value_parser = clap::value_parser!(u32).range(1..=codec::MAX_MEMBER_ID as i64))]
    id: u32,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, default_value = "info")]
    log_level: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args.log_level);

    let addr = SocketAddr::new(args.addr, args.port);
    let member = Member::connect(addr, args.id)
        .await
        .with_context(|| format!("connecting to {addr}"))?;
    let id = member.id();
    info!(%addr, id, "connected, type \"<mti> <dst>\" to send");

    let (mut reader, mut writer) = member.split();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            frame = reader.recv_frame() => {
                let Some(frame) = frame.context("reading from switch")? else {
                    info!("switch closed the connection");
                    break;
                };
                if !addressed_to(&frame, id) {
                    debug!(src = frame.src, dst = frame.dst, "dropping frame not for us");
                    continue;
                }
                let kind = if frame.is_reply() { "Reply" } else { "Request" };
                println!("{} message: {} from member({})", kind, frame.mti, frame.src);
                if let Some(reply) = auto_reply(&frame) {
                    writer.send_frame(&reply).await.context("sending reply")?;
                }
            }
            line = lines.next_line() => {
                let Some(line) = line.context("reading stdin")? else {
                    break; // stdin closed
                };
                match parse_command(&line) {
                    Some((mti, dst)) => writer.send_request(mti, dst).await?,
                    None => warn!(input = %line.trim(), "expected \"<mti> <dst>\""),
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown signal received");
                break;
            }
        }
    }

    Ok(())
}

/// Parse an input line of the form `<mti> <dst>`.
fn parse_command(line: &str) -> Option<(u32, u32)> {
    let mut parts = line.split_whitespace();
    let mti = parts.next()?.parse().ok()?;
    let dst = parts.next()?.parse().ok()?;
    if parts.next().is_some() {
        return None;
    }
    Some((mti, dst))
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
