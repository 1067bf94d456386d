use anyhow::Result;
use dnsmon::*;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt::time::FormatTime;

use dnsmon::reconciler::{Command, Reconciler};

struct LocalTimer;

impl FormatTime for LocalTimer {
    fn format_time(&self, w: &mut tracing_subscriber::fmt::format::Writer<'_>) -> std::fmt::Result {
        write!(
            w,
            "{}",
            chrono::Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z")
        )
    }
}

/// Terminal stand-ins for the browser's visibility, connectivity and button
/// triggers.
fn parse_command(line: &str) -> Option<Command> {
    match line.trim() {
        "hide" => Some(Command::Visibility(false)),
        "show" => Some(Command::Visibility(true)),
        "online" => Some(Command::NetworkOnline),
        "offline" => Some(Command::NetworkOffline),
        "pause" => Some(Command::TogglePause),
        "refresh" => Some(Command::Refresh),
        "clear" => Some(Command::ClearQueries),
        "quit" | "exit" => Some(Command::Shutdown),
        _ => None,
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_timer(LocalTimer)
        .with_env_filter(filter)
        .init();

    tracing::info!(version = version::VERSION, "{} starting", version::NAME);
    let app_config = config::AppConfig::load()?;

    let transport = transport::TransportChannel::new(transport::TransportConfig::from_app(
        &app_config,
    ))
    .map_err(|e| anyhow::anyhow!("transport: {}", e))?;
    let prefs = prefs::PrefsStore::new(&app_config.ui.prefs_path);
    let reconciler = Reconciler::new(transport, render::LogRenderer, prefs)
        .with_clock_interval(app_config.clock_interval());

    let (tx, rx) = mpsc::channel(16);

    let stdin_tx = tx.clone();
    tokio::spawn(async move {
        let mut lines = BufReader::new(tokio::io::stdin()).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            match parse_command(&line) {
                Some(command) => {
                    if stdin_tx.send(command).await.is_err() {
                        break;
                    }
                }
                None if line.trim().is_empty() => {}
                None => tracing::warn!(input = %line.trim(), "unknown command"),
            }
        }
    });

    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Received shutdown signal");
            let _ = tx.send(Command::Shutdown).await;
        }
    });

    reconciler.run(rx).await;
    tracing::info!("stopped");
    Ok(())
}
