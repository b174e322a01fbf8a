use chrono::Utc;
use kasir_engine::{PaymentApi, SqliteDatabase};
use log::*;
use tokio::task::JoinHandle;

/// Starts the payment expiry worker. Do not await the returned JoinHandle, as it will run indefinitely.
///
/// The worker is a safety net behind the lazy sweep that runs on order listings: it guarantees that expired
/// payments are reaped even when no-one is looking at a tenant's orders.
pub fn start_expiry_worker(db: SqliteDatabase, interval_secs: u64) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(interval_secs));
        let api = PaymentApi::new(db);
        info!("🕰️ Payment expiry worker started, sweeping every {interval_secs}s");
        loop {
            timer.tick().await;
            match api.sweep_all_expired(Utc::now()).await {
                Ok(0) => trace!("🕰️ Expiry sweep found nothing to do"),
                Ok(n) => info!("🕰️ Expiry sweep cancelled {n} overdue transaction(s)"),
                Err(e) => error!("🕰️ Error running payment expiry sweep: {e}"),
            }
        }
    })
}
