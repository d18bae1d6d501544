use std::time::Duration;

use moviesync::{
    config::{self, WorkerConfig},
    db,
    store::BucketStore,
    worker::{BatchHandler, WorkerManager},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = WorkerConfig::from_env()?;
    config::init_tracing(config.verbose);

    let db = db::connect_and_migrate(&config.db.url()).await?;
    let store = BucketStore::from_env(&config.bucket).await;

    let handler = BatchHandler::new(store, db, config.items_limit);
    let manager = WorkerManager::new(handler, Duration::from_secs(config.idle_sleep_secs));

    let stop = manager.stop_handle();
    tokio::spawn(async move {
        let mut stop_requested = false;
        loop {
            if tokio::signal::ctrl_c().await.is_err() {
                return;
            }
            if stop_requested {
                tracing::warn!("second interrupt, exiting immediately");
                std::process::exit(1);
            }
            tracing::info!("stop requested, finishing current batch");
            stop.request_stop();
            stop_requested = true;
        }
    });

    tracing::info!(bucket = %config.bucket, limit = config.items_limit, "worker starting");
    manager.run().await?;

    Ok(())
}
