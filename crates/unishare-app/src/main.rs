// UniShare entry point.
//
// Startup sequence:
// 1. Initialize tracing (log to file)
// 2. Load config
// 3. Open the store and seed empty collections
// 4. Build the AI client
// 5. Spawn the session poller
// 6. Wait for Ctrl+C
// 7. Cleanup on exit

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::mpsc;
use tracing::{error, info};

use unishare_ai::AiClient;
use unishare_app::app::AppState;
use unishare_app::session_sync;
use unishare_core::config;
use unishare_core::store::Store;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Initialize tracing
    init_tracing()?;
    info!("UniShare starting up");

    // 2. Load config
    let config = config::load_config().context("failed to load configuration")?;
    info!(
        "Config loaded: storage={}",
        config.storage.path
    );

    // 3. Open the store
    let store = Store::open(&config).context("failed to open store")?;
    store.init().context("failed to seed store")?;
    info!(
        "Store ready: {} listings, {} notes, trade policy={:?}",
        store.listings()?.len(),
        store.notes()?.len(),
        store.policy()
    );

    // 4. Build the AI client
    let ai = AiClient::from_config(&config);
    if ai.is_enabled() {
        info!("AI client initialized (API key configured)");
    } else {
        info!("AI client disabled (no API key)");
    }

    let state = Arc::new(AppState::new(config, store, Arc::new(ai)));

    // 5. Spawn the session poller and log every change it reports
    let (session_tx, mut session_rx) = mpsc::channel(16);
    let poller = tokio::spawn(session_sync::run(Arc::clone(&state), session_tx));
    let watcher = tokio::spawn(async move {
        while let Some(user) = session_rx.recv().await {
            match user {
                Some(user) => info!(uid = %user.uid, karma = user.karma, "Session active"),
                None => info!("No active session"),
            }
        }
    });

    // 6. Run until interrupted
    info!("Application ready");
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for Ctrl+C: {}", e);
    }

    // 7. Cleanup
    poller.abort();
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), watcher).await;

    info!("UniShare shut down cleanly");
    Ok(())
}

/// Initialize tracing to log to `logs/unishare.log`.
fn init_tracing() -> anyhow::Result<()> {
    use tracing_subscriber::fmt;
    use tracing_subscriber::EnvFilter;

    let log_dir = std::env::current_dir()?.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let log_file = std::fs::File::create(log_dir.join("unishare.log"))?;

    let subscriber = fmt::Subscriber::builder()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("unishare=info,warn")),
        )
        .with_writer(log_file)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .context("failed to set tracing subscriber")?;

    Ok(())
}
