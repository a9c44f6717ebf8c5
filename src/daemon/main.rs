/**
 * journey-syncd
 *
 * Keeps the offline store of one user in sync with the API: probes
 * connectivity, drains the pending queue whenever the server comes back,
 * and logs a status line every probe interval.
 */
use journey_sync::config::Config;
use journey_sync::offline::OfflineManager;
use journey_sync::sync::SyncService;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file if present
    dotenv::dotenv().ok();

    let env_filter = std::env::var("RUST_LOG").unwrap_or_else(|_| "journey_sync=info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(&env_filter))
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        server = config.server_url(),
        db = %config.db_path().display(),
        "Starting journey-syncd"
    );

    let manager = OfflineManager::open(&config).await?;
    tracing::info!(user_id = %manager.user_id().await?, "Offline store ready");

    let mut service = SyncService::new(manager);
    service.start();

    let mut ticker = tokio::time::interval(config.probe_interval());
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => match service.status().await {
                Ok(status) => tracing::info!(
                    online = status.is_online,
                    syncing = status.is_syncing,
                    pending = status.pending_mutations,
                    snapshot_version = ?status.snapshot_version,
                    last_sync = ?status.last_sync_time,
                    "Sync status"
                ),
                Err(e) => tracing::error!("Failed to read sync status: {}", e),
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Shutdown requested");
                break;
            }
        }
    }

    service.stop();
    let metrics = service.metrics().await;
    tracing::info!(
        drains = metrics.total_drains,
        replayed = metrics.mutations_replayed,
        failed = metrics.mutations_failed,
        "journey-syncd stopped"
    );
    Ok(())
}
