//! Background sweepers.
//!
//! Two interval workers drive the time-based transitions: the expiry sweep claims pending orders
//! whose payment never arrived, and the completion sweep settles accepted orders after the
//! acceptance window. Each can be paused at runtime through [`SweeperControls`]; a paused
//! sweeper keeps ticking but does no work, and pausing never loses orders because eligibility is
//! re-evaluated from the database on every tick.

use std::sync::{
    atomic::{AtomicBool, Ordering},
    Arc,
};

use bazaar_engine::{db_types::Order, OrderFlowApi, SqliteDatabase, SweepOutcome};
use chrono::Duration;
use log::*;
use tokio::task::JoinHandle;

#[derive(Debug, Default)]
pub struct SweeperControls {
    expiry_paused: AtomicBool,
    completion_paused: AtomicBool,
}

impl SweeperControls {
    pub fn set_completion_enabled(&self, enabled: bool) {
        self.completion_paused.store(!enabled, Ordering::Relaxed);
    }

    pub fn set_expiry_enabled(&self, enabled: bool) {
        self.expiry_paused.store(!enabled, Ordering::Relaxed);
    }

    pub fn completion_enabled(&self) -> bool {
        !self.completion_paused.load(Ordering::Relaxed)
    }

    pub fn expiry_enabled(&self) -> bool {
        !self.expiry_paused.load(Ordering::Relaxed)
    }
}

/// One tick of the expiry sweeper. Returns `None` when the sweeper is paused.
pub async fn expiry_tick(
    api: &OrderFlowApi<SqliteDatabase>,
    controls: &SweeperControls,
    payment_timeout: Duration,
) -> Option<SweepOutcome> {
    if !controls.expiry_enabled() {
        debug!("🕰️ Expiry sweeper is paused; skipping this tick");
        return None;
    }
    info!("🕰️ Running unpaid order expiry sweep");
    match api.expire_unpaid_orders(payment_timeout).await {
        Ok(outcome) => {
            info!("🕰️ {} orders expired ({} skipped)", outcome.count(), outcome.skipped);
            debug!("🕰️ Expired orders: {}", order_list(&outcome.transitioned));
            Some(outcome)
        },
        Err(e) => {
            error!("🕰️ Error running unpaid order expiry sweep: {e}");
            None
        },
    }
}

/// One tick of the completion sweeper. Returns `None` when the sweeper is paused.
pub async fn completion_tick(
    api: &OrderFlowApi<SqliteDatabase>,
    controls: &SweeperControls,
    acceptance_window: Duration,
) -> Option<SweepOutcome> {
    if !controls.completion_enabled() {
        debug!("🕰️ Completion sweeper is paused; skipping this tick");
        return None;
    }
    info!("🕰️ Running order completion sweep");
    match api.complete_aged_orders(acceptance_window).await {
        Ok(outcome) => {
            info!("🕰️ {} orders completed ({} skipped)", outcome.count(), outcome.skipped);
            debug!("🕰️ Completed orders: {}", order_list(&outcome.transitioned));
            Some(outcome)
        },
        Err(e) => {
            error!("🕰️ Error running order completion sweep: {e}");
            None
        },
    }
}

/// Starts the expiry sweeper. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_expiry_sweeper(
    api: Arc<OrderFlowApi<SqliteDatabase>>,
    controls: Arc<SweeperControls>,
    interval: Duration,
    payment_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval.to_std().unwrap_or(std::time::Duration::from_secs(600)));
        info!("🕰️ Unpaid order expiry sweeper started");
        loop {
            timer.tick().await;
            expiry_tick(&api, &controls, payment_timeout).await;
        }
    })
}

/// Starts the completion sweeper. Do not await the returned JoinHandle.
pub fn start_completion_sweeper(
    api: Arc<OrderFlowApi<SqliteDatabase>>,
    controls: Arc<SweeperControls>,
    interval: Duration,
    acceptance_window: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(interval.to_std().unwrap_or(std::time::Duration::from_secs(1800)));
        info!("🕰️ Order completion sweeper started");
        loop {
            timer.tick().await;
            completion_tick(&api, &controls, acceptance_window).await;
        }
    })
}

fn order_list(orders: &[Order]) -> String {
    orders
        .iter()
        .map(|o| format!("{} buyer: {} seller: {}", o.id, o.buyer_id, o.seller_id))
        .collect::<Vec<String>>()
        .join(", ")
}

#[cfg(test)]
mod test {
    use bazaar_engine::{
        db_types::OrderStatus,
        test_utils::{backdate_accepted, buyer, memory_api, seller},
        SellerDecision,
    };
    use bzr_common::MinorUnits;

    use super::*;

    #[test]
    fn sweepers_start_enabled_and_toggle_independently() {
        let controls = SweeperControls::default();
        assert!(controls.expiry_enabled());
        assert!(controls.completion_enabled());
        controls.set_completion_enabled(false);
        assert!(controls.expiry_enabled());
        assert!(!controls.completion_enabled());
        controls.set_completion_enabled(true);
        assert!(controls.completion_enabled());
    }

    #[tokio::test]
    async fn a_paused_completion_sweeper_leaves_aged_orders_alone() {
        let _ = env_logger::try_init();
        let api = memory_api().await;
        let order =
            api.place_order(&buyer(), "prod-1", "bob", MinorUnits::from_major(50), None).await.expect("placed");
        api.seller_respond(&order.id, &seller(), SellerDecision::Accept).await.expect("accepted");
        backdate_accepted(api.db(), &order.id, Duration::days(8)).await;

        let controls = SweeperControls::default();
        controls.set_completion_enabled(false);
        assert!(completion_tick(&api, &controls, Duration::days(7)).await.is_none());
        let untouched = api.fetch_order(&order.id).await.expect("order");
        assert_eq!(untouched.status, OrderStatus::Accepted);
        assert!(untouched.completed_at.is_none());

        controls.set_completion_enabled(true);
        let outcome = completion_tick(&api, &controls, Duration::days(7)).await.expect("an enabled tick sweeps");
        assert_eq!(outcome.count(), 1);
        let completed = api.fetch_order(&order.id).await.expect("order");
        assert_eq!(completed.status, OrderStatus::Completed);
    }
}
