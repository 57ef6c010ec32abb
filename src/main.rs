//! Headless engine host wiring recovery, autosave, and remote sync.

use std::io::Write as _;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use courtside_engine::config::EngineConfig;
use courtside_engine::dao::store::{DurableStore, file::JsonFileStore};
use courtside_engine::services::remote::HttpRemote;
use courtside_engine::services::{autosave, recovery, sync_supervisor};
use courtside_engine::state::{Scoreboard, SharedScoreboard};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = EngineConfig::load();
    let store: Arc<dyn DurableStore> = Arc::new(
        JsonFileStore::open(config.data_dir.clone())
            .await
            .context("opening durable store")?,
    );

    let board = restore_or_create(&config, Arc::clone(&store)).await;

    let autosave_task = tokio::spawn(autosave::run(Arc::clone(&board)));

    // The host assumes connectivity; failed deliveries stay queued and are
    // retried on the next drain.
    let (online_tx, online_rx) = watch::channel(true);
    let (sync_trigger, manual_rx) = sync_supervisor::trigger_channel();
    let remote = Arc::new(HttpRemote::new(config.api_base_url.clone()));
    let sync_task = tokio::spawn(sync_supervisor::run(
        Arc::clone(&store),
        remote,
        online_rx,
        manual_rx,
    ));

    info!(mode = ?config.mode, "engine running; press Ctrl+C to stop");
    shutdown_signal().await;

    // Flush one last drain request, then stop the background loops.
    sync_trigger.fire();
    tokio::task::yield_now().await;
    autosave_task.abort();
    sync_task.abort();
    drop(online_tx);

    if let Err(err) = board.persist_if_in_progress().await {
        tracing::warn!(error = %err, "final snapshot write failed");
    }
    info!("engine stopped");
    Ok(())
}

/// Inspect the current-game slot and either resume or start fresh,
/// prompting on the console for snapshots in the prompt window.
async fn restore_or_create(
    config: &EngineConfig,
    store: Arc<dyn DurableStore>,
) -> SharedScoreboard {
    match recovery::inspect(store.as_ref(), config.mode).await {
        recovery::RecoveryDecision::AutoResume(snapshot) => {
            Scoreboard::resume(store, snapshot, config.location.clone())
        }
        recovery::RecoveryDecision::PromptResume(snapshot) => {
            let saved_at = recovery::describe_saved_at(&snapshot);
            if confirm_resume(&saved_at) {
                Scoreboard::resume(store, snapshot, config.location.clone())
            } else {
                recovery::discard(store.as_ref()).await;
                Scoreboard::new(store, config.mode, config.timer_minutes, config.location.clone())
            }
        }
        recovery::RecoveryDecision::NotRecoverable => {
            Scoreboard::new(store, config.mode, config.timer_minutes, config.location.clone())
        }
    }
}

/// Console confirmation gate for a prompted resume. Anything but an explicit
/// yes discards the snapshot.
fn confirm_resume(saved_at: &str) -> bool {
    print!("Found an unfinished game saved {saved_at}. Resume it? [y/N] ");
    let _ = std::io::stdout().flush();
    let mut answer = String::new();
    if std::io::stdin().read_line(&mut answer).is_err() {
        return false;
    }
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM and shut the engine down gracefully.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(_) => {
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = term.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
