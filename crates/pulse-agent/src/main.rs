//! # pulse-agent
//!
//! Listens on the notification channel, prints notifications and logs data
//! updates. Host reachability signals (`visible`, `online`, ...) can be fed
//! one per line on stdin.

#![deny(unsafe_code)]

mod terminal;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use futures::StreamExt;
use pulse_client::{ChannelEvent, ClientConfig, PulseClient, ReachabilitySignal, TungsteniteConnector};
use pulse_settings::loader::{load_settings_from_path, settings_path};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::broadcast::{self, error::RecvError};
use tokio_stream::wrappers::LinesStream;

use crate::terminal::TerminalSink;

/// Pulse notification channel listener.
#[derive(Parser, Debug)]
#[command(name = "pulse-agent", about = "Pulse notification channel listener")]
struct Cli {
    /// Session token for the notification endpoint.
    #[arg(long, env = "PULSE_TOKEN", hide_env_values = true)]
    token: String,

    /// API base URL (overrides settings).
    #[arg(long)]
    base_url: Option<String>,

    /// Origin of the hosting page, for relative base URLs.
    #[arg(long)]
    origin: Option<String>,

    /// Log level or filter directive (overrides settings).
    #[arg(long)]
    log_level: Option<String>,

    /// Settings file (defaults to `~/.pulse/settings.json`).
    #[arg(long)]
    settings: Option<PathBuf>,

    /// Read reachability signals from stdin, one per line.
    #[arg(long)]
    stdin_signals: bool,

    /// Ring the terminal bell on notifications.
    #[arg(long)]
    bell: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let path = args.settings.clone().unwrap_or_else(settings_path);
    let mut settings = load_settings_from_path(&path)
        .with_context(|| format!("Failed to load settings from {}", path.display()))?;
    if let Some(url) = args.base_url {
        settings.channel.api_base_url = url;
    }
    if let Some(origin) = args.origin {
        settings.channel.page_origin = Some(origin);
    }
    if let Some(level) = args.log_level {
        settings.logging.level = level;
    }
    settings.validate().context("Invalid settings")?;

    pulse_core::logging::init_subscriber_with_format(&settings.logging.level, settings.logging.format);
    tracing::info!(version = pulse_core::constants::VERSION, settings = %path.display(), "starting");

    let config = ClientConfig::from_settings(&settings);
    let connector = Arc::new(TungsteniteConnector::new(config.endpoint.connect_timeout));
    let sink = Arc::new(TerminalSink { bell: args.bell });
    let client = PulseClient::spawn(config, connector, sink);

    let updates = client.on_data_update(|update| {
        tracing::info!(
            kind = %update.kind,
            reason = update.reason.as_deref().unwrap_or("-"),
            order_id = update.order_id().as_deref().unwrap_or("-"),
            station_id = update.station_id().as_deref().unwrap_or("-"),
            "data update"
        );
    });
    let watcher = tokio::spawn(log_events(client.subscribe_events()));

    let signals = args.stdin_signals.then(|| {
        let lines = LinesStream::new(BufReader::new(tokio::io::stdin()).lines());
        client.attach_reachability(lines.filter_map(|line| async move {
            let line = line.ok()?;
            match line.parse::<ReachabilitySignal>() {
                Ok(signal) => Some(signal),
                Err(e) => {
                    tracing::warn!(error = %e, "ignoring stdin line");
                    None
                }
            }
        }))
    });

    let _ = client.request_notification_permission().await;
    client.connect(args.token).context("Failed to start notification channel")?;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;

    tracing::info!("Shutting down...");
    let _ = updates.unsubscribe();
    client.disconnect();
    client.shutdown().await;
    watcher.abort();
    if let Some(signals) = signals {
        signals.abort();
    }
    tracing::info!("Shutdown complete");
    Ok(())
}

/// Log lifecycle events until the emitter goes away.
async fn log_events(mut events: broadcast::Receiver<ChannelEvent>) {
    loop {
        match events.recv().await {
            Ok(ChannelEvent::Connected { connection_id }) => {
                tracing::info!(%connection_id, "connected");
            }
            Ok(ChannelEvent::ReconnectScheduled { attempt, delay }) => {
                tracing::info!(attempt, delay_ms = delay.as_millis(), "reconnect scheduled");
            }
            Ok(ChannelEvent::ReconnectFailed { attempts }) => {
                tracing::error!(attempts, "gave up reconnecting; restart to try again");
            }
            Ok(ChannelEvent::IdleClosed { idle_for }) => {
                tracing::info!(idle_secs = idle_for.as_secs(), "closed while idle; send `visible` to resume");
            }
            Ok(_) => {}
            Err(RecvError::Lagged(skipped)) => {
                tracing::warn!(skipped, "event log lagged");
            }
            Err(RecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn flags_parse() {
        let cli = Cli::try_parse_from([
            "pulse-agent",
            "--token",
            "abc",
            "--base-url",
            "/api",
            "--origin",
            "https://app.example.com",
            "--stdin-signals",
        ])
        .unwrap();
        assert_eq!(cli.token, "abc");
        assert_eq!(cli.base_url.as_deref(), Some("/api"));
        assert_eq!(cli.origin.as_deref(), Some("https://app.example.com"));
        assert!(cli.stdin_signals);
        assert!(!cli.bell);
    }
}
