//! Reconciliation worker pool
//!
//! A ticker-driven dispatcher enumerates unfinished orders and fans them out
//! to N workers over a bounded channel. Workers ask the accrual system about
//! each order and write terminal outcomes back; everything else is left for
//! the next tick. The store's guarded update makes duplicate terminal writes
//! no-ops, so re-enqueueing the same order across ticks is safe.

use std::sync::Arc;

use rust_decimal::Decimal;
use sqlx::PgPool;
use tokio::sync::{Mutex, mpsc};
use tokio::time::{self, Duration};
use tokio_util::sync::CancellationToken;

use crate::accrual::{AccrualApi, AccrualOrder, AccrualReply, AccrualStatus};
use crate::db;
use crate::db::orders::UnfinishedOrder;
use crate::models::OrderStatus;

/// Job queue capacity. Not load-bearing: the dispatcher refills every tick.
const JOB_QUEUE_CAPACITY: usize = 5;
/// Fallback when the upstream's Retry-After header is missing or unparsable
const DEFAULT_RETRY_AFTER_SECS: u64 = 1;

pub struct ReconcileWorker {
    pool: PgPool,
    accrual: Arc<dyn AccrualApi>,
    poll_interval: Duration,
    worker_count: usize,
    shutdown: CancellationToken,
}

impl ReconcileWorker {
    pub fn new(
        pool: PgPool,
        accrual: Arc<dyn AccrualApi>,
        poll_interval_secs: u64,
        worker_count: usize,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            pool,
            accrual,
            poll_interval: Duration::from_secs(poll_interval_secs),
            worker_count,
            shutdown,
        }
    }

    /// Run dispatcher and workers until the shutdown token fires, then drain.
    pub async fn run(self) {
        tracing::info!(
            workers = self.worker_count,
            interval_secs = self.poll_interval.as_secs(),
            "reconciliation pool started"
        );

        let (tx, rx) = mpsc::channel::<UnfinishedOrder>(JOB_QUEUE_CAPACITY);
        let jobs = Arc::new(Mutex::new(rx));

        let mut handles = Vec::with_capacity(self.worker_count);
        for id in 0..self.worker_count {
            handles.push(tokio::spawn(worker_loop(
                id,
                Arc::clone(&jobs),
                self.pool.clone(),
                Arc::clone(&self.accrual),
                self.shutdown.clone(),
            )));
        }

        let mut ticker = time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => break,
                _ = ticker.tick() => self.dispatch_tick(&tx).await,
            }
        }

        // Closing the channel lets idle workers drain and exit.
        drop(tx);
        for handle in handles {
            let _ = handle.await;
        }
        tracing::info!("reconciliation pool stopped");
    }

    /// One sweep: enqueue every unfinished order. A store error skips the
    /// tick; the ticker keeps going.
    async fn dispatch_tick(&self, tx: &mpsc::Sender<UnfinishedOrder>) {
        let orders = match db::orders::list_unfinished(&self.pool).await {
            Ok(orders) => orders,
            Err(e) => {
                tracing::error!(error = %e, "listing unfinished orders failed, skipping tick");
                return;
            }
        };

        for order in orders {
            tokio::select! {
                _ = self.shutdown.cancelled() => return,
                sent = tx.send(order) => {
                    if sent.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

async fn worker_loop(
    id: usize,
    jobs: Arc<Mutex<mpsc::Receiver<UnfinishedOrder>>>,
    pool: PgPool,
    accrual: Arc<dyn AccrualApi>,
    shutdown: CancellationToken,
) {
    loop {
        // Lock only around the dequeue so workers compete one job at a time.
        let job = {
            let mut rx = jobs.lock().await;
            tokio::select! {
                _ = shutdown.cancelled() => None,
                job = rx.recv() => job,
            }
        };

        let Some(order) = job else { break };
        process_order(id, &order, &pool, accrual.as_ref(), &shutdown).await;
    }
    tracing::debug!(worker = id, "reconciliation worker stopped");
}

async fn process_order(
    id: usize,
    order: &UnfinishedOrder,
    pool: &PgPool,
    accrual: &dyn AccrualApi,
    shutdown: &CancellationToken,
) {
    let number = order.order_number;

    let reply = match accrual.get_order(number).await {
        Ok(reply) => reply,
        Err(e) => {
            tracing::warn!(worker = id, order = number, error = %e, "accrual request failed");
            return;
        }
    };

    match reply {
        AccrualReply::NotRegistered => {
            tracing::debug!(worker = id, order = number, "order not registered upstream");
        }
        AccrualReply::RateLimited { retry_after_secs } => {
            let secs = backoff_secs(retry_after_secs);
            tracing::warn!(worker = id, order = number, retry_after = secs, "rate limited");
            tokio::select! {
                _ = shutdown.cancelled() => {}
                _ = time::sleep(Duration::from_secs(secs)) => {}
            }
        }
        AccrualReply::Unexpected(code) => {
            tracing::warn!(worker = id, order = number, code, "unexpected accrual status code");
        }
        AccrualReply::Order(body) => match terminal_update(&body) {
            Ok(Some((status, accrual_value))) => {
                // Write under the number the upstream reported on.
                match db::orders::apply_accrual_result(pool, body.order, status, accrual_value).await
                {
                    Ok(()) => tracing::debug!(
                        worker = id,
                        order = number,
                        status = status.as_db(),
                        "order finalized"
                    ),
                    Err(e) => tracing::error!(
                        worker = id,
                        order = number,
                        error = %e,
                        "failed to store accrual result"
                    ),
                }
            }
            Ok(None) => {
                tracing::debug!(worker = id, order = number, status = %body.status, "still in progress");
            }
            Err(reason) => {
                tracing::warn!(worker = id, order = number, status = %body.status, reason, "skipping accrual reply");
            }
        },
    }
}

fn backoff_secs(retry_after: Option<u64>) -> u64 {
    retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS).max(1)
}

/// Decide what a decoded 200 body means for the ledger.
///
/// `Ok(Some(..))` is a terminal transition to write, `Ok(None)` means the
/// order is still moving upstream, `Err` is a reply we refuse to act on.
fn terminal_update(
    body: &AccrualOrder,
) -> Result<Option<(OrderStatus, Option<Decimal>)>, &'static str> {
    let Some(status) = AccrualStatus::from_response(&body.status) else {
        return Err("unknown status");
    };

    match status {
        AccrualStatus::Processed => {
            let accrual = body.accrual.unwrap_or(Decimal::ZERO);
            if accrual.is_sign_negative() {
                return Err("negative accrual");
            }
            Ok(Some((OrderStatus::Processed, Some(accrual))))
        }
        AccrualStatus::Invalid => Ok(Some((OrderStatus::Invalid, None))),
        AccrualStatus::Registered | AccrualStatus::Processing => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal_macros::dec;
    use sqlx::postgres::PgPoolOptions;

    fn body(status: &str, accrual: Option<Decimal>) -> AccrualOrder {
        AccrualOrder {
            order: 79927398713,
            status: status.to_string(),
            accrual,
        }
    }

    #[test]
    fn processed_reply_becomes_terminal_write() {
        let update = terminal_update(&body("PROCESSED", Some(dec!(100.5)))).unwrap();
        assert_eq!(
            update,
            Some((OrderStatus::Processed, Some(dec!(100.5))))
        );
    }

    #[test]
    fn processed_without_accrual_defaults_to_zero() {
        let update = terminal_update(&body("PROCESSED", None)).unwrap();
        assert_eq!(update, Some((OrderStatus::Processed, Some(Decimal::ZERO))));
    }

    #[test]
    fn invalid_reply_stores_no_accrual() {
        let update = terminal_update(&body("INVALID", Some(dec!(5)))).unwrap();
        assert_eq!(update, Some((OrderStatus::Invalid, None)));
    }

    #[test]
    fn in_progress_replies_write_nothing() {
        assert_eq!(terminal_update(&body("REGISTERED", None)).unwrap(), None);
        assert_eq!(terminal_update(&body("PROCESSING", None)).unwrap(), None);
    }

    #[test]
    fn unknown_status_is_refused() {
        assert!(terminal_update(&body("BANANA", None)).is_err());
    }

    #[test]
    fn negative_accrual_is_refused() {
        assert!(terminal_update(&body("PROCESSED", Some(dec!(-1)))).is_err());
    }

    #[test]
    fn backoff_defaults_to_one_second_minimum() {
        assert_eq!(backoff_secs(None), 1);
        assert_eq!(backoff_secs(Some(0)), 1);
        assert_eq!(backoff_secs(Some(2)), 2);
    }

    struct NoAccrual;

    #[async_trait]
    impl AccrualApi for NoAccrual {
        async fn get_order(&self, _number: i64) -> Result<AccrualReply, reqwest::Error> {
            Ok(AccrualReply::NotRegistered)
        }
    }

    #[tokio::test]
    async fn pool_stops_on_cancellation() {
        // Lazy pool: every query fails, which the dispatcher logs and survives.
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost:1/unreachable")
            .unwrap();
        let shutdown = CancellationToken::new();
        let worker = ReconcileWorker::new(pool, Arc::new(NoAccrual), 1, 2, shutdown.clone());

        let handle = tokio::spawn(worker.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown.cancel();

        tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("worker pool did not stop in time")
            .unwrap();
    }
}
