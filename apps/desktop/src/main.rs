use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use client_core::{config::load_settings, connect, run_session, FunnelSession, SystemClock};
use shared::domain::UiMode;
use tokio::sync::mpsc;
use tracing::info;

mod input;
mod surface;

use surface::TerminalSurface;

#[derive(Parser, Debug)]
struct Args {
    /// Overrides `server_url` from client.toml / FUNNEL_SERVER_URL.
    #[arg(long)]
    server_url: Option<String>,
    /// Starting view: `old`/`legacy` or `new`/`assisted`.
    #[arg(long, value_parser = parse_mode)]
    mode: Option<UiMode>,
}

fn parse_mode(raw: &str) -> Result<UiMode, String> {
    UiMode::parse(raw).ok_or_else(|| format!("unknown mode '{raw}', expected old or new"))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter("info").init();
    let args = Args::parse();

    let mut settings = load_settings();
    if let Some(url) = args.server_url {
        settings.server_url = url;
    }
    if let Some(mode) = args.mode {
        settings.mode = mode;
    }

    let (channel, events) = connect(&settings.server_url)
        .await
        .with_context(|| format!("failed to connect to {}", settings.server_url))?;
    info!(server_url = %settings.server_url, mode = settings.mode.wire_name(), "connected");

    let mut session = FunnelSession::new(
        channel,
        Arc::new(SystemClock::new()),
        settings.mode,
        settings.timings,
    );
    let (actions_tx, actions_rx) = mpsc::channel(16);
    tokio::spawn(input::forward_stdin(actions_tx, settings.mode));

    println!("{}", input::HELP);
    let mut surface = TerminalSurface::new(std::io::stdout());
    let exit = run_session(&mut session, events, actions_rx, &mut surface).await;
    info!(?exit, "session ended");
    Ok(())
}
