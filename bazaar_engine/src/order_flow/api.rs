use std::fmt::Debug;

use bzr_common::MinorUnits;
use chrono::{Duration, Utc};
use log::*;

use crate::{
    db_types::{Actor, ActivityLogEntry, NewOrder, Order, OrderId, OrderStatus, PaymentStatus},
    events::{Notification, NotificationProducers, ADMIN_AUDIENCE},
    helpers::{payment_signature_payload, verify_signature},
    order_flow::OrderFlowError,
    traits::{MarketplaceDatabase, OrderUpdate, PaymentGatewayClient, PaymentIntent, PaymentUpdate},
};

/// Audit-log action names. One row is appended per committed transition, under the name of the
/// transition that produced it.
pub mod actions {
    pub const PLACED: &str = "order.placed";
    pub const ACCEPTED: &str = "order.accepted";
    pub const REJECTED: &str = "order.rejected";
    pub const CANCELLED: &str = "order.cancelled";
    pub const EXPIRED: &str = "order.expired";
    pub const COMPLETED: &str = "order.completed";
    pub const PAYMENT_INITIATED: &str = "payment.initiated";
    pub const PAYMENT_CAPTURED: &str = "payment.captured";
    pub const PAYMENT_FAILED: &str = "payment.failed";
    pub const REFUNDED: &str = "order.refunded";
    pub const REFUND_FAILED: &str = "refund.failed";
    pub const DELETED: &str = "order.deleted";
    pub const RESTORED: &str = "order.restored";
    pub const HARD_DELETED: &str = "order.hard_deleted";
}

/// Policy quotas enforced before a transition commits. Exceeding a quota rejects the request
/// without mutating state.
#[derive(Debug, Clone, Copy)]
pub struct PolicyLimits {
    pub max_orders_per_day: u32,
    pub max_cancellations_per_day: u32,
    pub max_deletes_per_hour: u32,
}

impl Default for PolicyLimits {
    fn default() -> Self {
        Self { max_orders_per_day: 20, max_cancellations_per_day: 5, max_deletes_per_hour: 10 }
    }
}

/// The seller's decision on a pending order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SellerDecision {
    Accept,
    Reject,
}

/// The result of one sweeper pass. Skips are lost races (another writer transitioned the order
/// between selection and write) and are normal; failures are logged per order and never abort
/// the rest of the sweep.
#[derive(Debug, Default)]
pub struct SweepOutcome {
    pub transitioned: Vec<Order>,
    pub skipped: usize,
    pub failures: usize,
}

impl SweepOutcome {
    pub fn count(&self) -> usize {
        self.transitioned.len()
    }
}

/// The single choke point for every order state change.
///
/// All three stimulus sources — user HTTP actions, webhook deliveries and sweeper ticks — call
/// into this API rather than mutating orders directly. Every transition follows the same shape:
/// read the current order, validate the actor and guards against it, then issue a
/// *compare-and-swap* write conditioned on the source state still holding. A lost race surfaces
/// as [`OrderFlowError::StaleTransition`] for user actions and as a silent skip for sweepers and
/// webhooks, never as a double-applied transition.
///
/// After a successful commit the API appends exactly one activity-log row and publishes
/// notifications to the interested audiences. Both happen strictly after the write; a
/// notification failure never rolls a transition back.
pub struct OrderFlowApi<B> {
    db: B,
    producers: NotificationProducers,
    limits: PolicyLimits,
}

impl<B> Debug for OrderFlowApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "OrderFlowApi")
    }
}

impl<B> OrderFlowApi<B> {
    pub fn new(db: B, producers: NotificationProducers, limits: PolicyLimits) -> Self {
        Self { db, producers, limits }
    }

    pub fn db(&self) -> &B {
        &self.db
    }

    pub fn db_mut(&mut self) -> &mut B {
        &mut self.db
    }
}

impl<B> OrderFlowApi<B>
where B: MarketplaceDatabase
{
    //----------------------------------------  User actions  ---------------------------------------------------------

    /// A buyer places a new order. The order starts `Pending` with a `pending` payment record,
    /// and the product is marked as ordered.
    pub async fn place_order(
        &self,
        buyer: &Actor,
        product_id: &str,
        seller_id: &str,
        amount: MinorUnits,
        currency: Option<String>,
    ) -> Result<Order, OrderFlowError> {
        if !amount.is_positive() {
            return Err(OrderFlowError::InvalidInput(format!("order amount must be positive, got {amount}")));
        }
        if buyer.id == seller_id {
            return Err(OrderFlowError::InvalidInput("buyer and seller cannot be the same party".into()));
        }
        let since = Utc::now() - Duration::days(1);
        let placed = self.db.count_orders_placed_since(&buyer.id, since).await.map_err(OrderFlowError::db)?;
        if placed >= i64::from(self.limits.max_orders_per_day) {
            return Err(OrderFlowError::RateLimitExceeded {
                scope: "orders per buyer per day",
                limit: self.limits.max_orders_per_day,
            });
        }
        let mut new_order = NewOrder::new(product_id, buyer.id.as_str(), seller_id, amount);
        if let Some(currency) = currency {
            new_order = new_order.with_currency(currency);
        }
        let order = self.db.insert_order(new_order).await.map_err(OrderFlowError::db)?;
        debug!("🔄️📦️ Order {} placed by {} for product {product_id}", order.id, buyer.id);
        self.log(&order.id, &buyer.id, actions::PLACED, &format!("Order placed for {amount}")).await;
        self.notify(&order.seller_id, actions::PLACED, &order).await;
        Ok(order)
    }

    /// The seller accepts or rejects a pending order.
    pub async fn seller_respond(
        &self,
        id: &OrderId,
        actor: &Actor,
        decision: SellerDecision,
    ) -> Result<Order, OrderFlowError> {
        let order = self.fetch_live(id).await?;
        if actor.id != order.seller_id {
            return Err(OrderFlowError::Forbidden("only the seller may respond to an order".into()));
        }
        let target = match decision {
            SellerDecision::Accept => OrderStatus::Accepted,
            SellerDecision::Reject => OrderStatus::Rejected,
        };
        if !order.status.can_become(target) {
            return Err(OrderFlowError::IllegalTransition { from: order.status, to: target });
        }
        let mut update = OrderUpdate::status(target);
        if decision == SellerDecision::Accept {
            update = update.with_accepted_at(Utc::now());
        }
        let updated = self
            .db
            .checked_status_update(id, OrderStatus::Pending, None, update)
            .await
            .map_err(OrderFlowError::db)?
            .ok_or_else(|| OrderFlowError::StaleTransition(id.clone()))?;
        let action = match decision {
            SellerDecision::Accept => actions::ACCEPTED,
            SellerDecision::Reject => actions::REJECTED,
        };
        self.log(id, &actor.id, action, "").await;
        self.notify(&updated.buyer_id, action, &updated).await;
        Ok(updated)
    }

    /// A participant cancels a still-pending order. Buyers are subject to a daily cancellation
    /// quota.
    pub async fn cancel_order(&self, id: &OrderId, actor: &Actor, reason: &str) -> Result<Order, OrderFlowError> {
        let order = self.fetch_live(id).await?;
        if !order.is_participant(actor) {
            return Err(OrderFlowError::Forbidden("only the buyer or seller may cancel an order".into()));
        }
        if !order.status.can_become(OrderStatus::Cancelled) {
            return Err(OrderFlowError::IllegalTransition { from: order.status, to: OrderStatus::Cancelled });
        }
        if actor.id == order.buyer_id {
            let since = Utc::now() - Duration::days(1);
            let cancelled =
                self.db.count_activity_since(&actor.id, actions::CANCELLED, since).await.map_err(OrderFlowError::db)?;
            if cancelled >= i64::from(self.limits.max_cancellations_per_day) {
                return Err(OrderFlowError::RateLimitExceeded {
                    scope: "cancellations per buyer per day",
                    limit: self.limits.max_cancellations_per_day,
                });
            }
        }
        let updated = self
            .db
            .checked_status_update(id, OrderStatus::Pending, None, OrderUpdate::status(OrderStatus::Cancelled))
            .await
            .map_err(OrderFlowError::db)?
            .ok_or_else(|| OrderFlowError::StaleTransition(id.clone()))?;
        self.log(id, &actor.id, actions::CANCELLED, reason).await;
        let counterparty = if actor.id == updated.buyer_id { &updated.seller_id } else { &updated.buyer_id };
        self.notify(counterparty, actions::CANCELLED, &updated).await;
        Ok(updated)
    }

    pub async fn fetch_order(&self, id: &OrderId) -> Result<Order, OrderFlowError> {
        self.db
            .fetch_order(id)
            .await
            .map_err(OrderFlowError::db)?
            .ok_or_else(|| OrderFlowError::OrderNotFound(id.clone()))
    }

    pub async fn activity(&self, id: &OrderId) -> Result<Vec<ActivityLogEntry>, OrderFlowError> {
        self.db.activity_for_order(id).await.map_err(OrderFlowError::db)
    }

    /// Fetches an order on behalf of `actor`. Only the buyer, the seller and admins may see it.
    pub async fn order_for(&self, id: &OrderId, actor: &Actor) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(id).await?;
        if !actor.is_admin() && !order.is_participant(actor) {
            return Err(OrderFlowError::Forbidden("you are not a party to this order".into()));
        }
        Ok(order)
    }

    /// The audit trail is admin-only.
    pub async fn activity_for(&self, id: &OrderId, actor: &Actor) -> Result<Vec<ActivityLogEntry>, OrderFlowError> {
        if !actor.is_admin() {
            return Err(OrderFlowError::Forbidden("only an admin may view the activity log".into()));
        }
        self.activity(id).await
    }

    //----------------------------------------  Payment flow  ---------------------------------------------------------

    /// Creates a payment intent at the gateway for an accepted order. Idempotent: if an intent
    /// already exists for the order, it is returned without another gateway call.
    pub async fn initiate_payment<G: PaymentGatewayClient>(
        &self,
        id: &OrderId,
        actor: &Actor,
        gateway: &G,
    ) -> Result<PaymentIntent, OrderFlowError> {
        let order = self.fetch_live(id).await?;
        if actor.id != order.buyer_id {
            return Err(OrderFlowError::Forbidden("only the buyer may initiate payment".into()));
        }
        if order.status != OrderStatus::Accepted {
            return Err(OrderFlowError::InvalidInput(format!(
                "payment can only be initiated for an accepted order (status is {})",
                order.status
            )));
        }
        if !order.amount.is_positive() {
            return Err(OrderFlowError::InvalidInput("order amount must be positive".into()));
        }
        if let Some(gateway_order_id) = &order.payment.gateway_order_id {
            debug!("🔄️💳️ Payment intent already exists for {id}; returning it");
            return Ok(PaymentIntent {
                gateway_order_id: gateway_order_id.clone(),
                amount: order.amount,
                currency: order.currency.clone(),
            });
        }
        if order.payment.status != PaymentStatus::Pending {
            return Err(OrderFlowError::IllegalPaymentTransition {
                from: order.payment.status,
                to: PaymentStatus::Pending,
            });
        }
        let intent = gateway
            .create_intent(id, order.amount, &order.currency)
            .await
            .map_err(|e| OrderFlowError::GatewayError(e.to_string()))?;
        self.db
            .checked_payment_update(
                id,
                PaymentStatus::Pending,
                PaymentUpdate::default().with_gateway_order_id(&intent.gateway_order_id),
            )
            .await
            .map_err(OrderFlowError::db)?
            .ok_or_else(|| OrderFlowError::StaleTransition(id.clone()))?;
        self.log(id, &actor.id, actions::PAYMENT_INITIATED, &intent.gateway_order_id).await;
        Ok(intent)
    }

    /// Verifies the signature the client received from the gateway checkout and, on success,
    /// marks the payment as captured. Re-verifying an already-paid order is a safe no-op.
    pub async fn verify_payment(
        &self,
        id: &OrderId,
        actor: &Actor,
        payment_id: &str,
        signature: &str,
        gateway_secret: &str,
    ) -> Result<Order, OrderFlowError> {
        let order = self.fetch_live(id).await?;
        if actor.id != order.buyer_id {
            return Err(OrderFlowError::Forbidden("only the buyer may verify a payment".into()));
        }
        let Some(gateway_order_id) = &order.payment.gateway_order_id else {
            return Err(OrderFlowError::InvalidInput("no payment intent exists for this order".into()));
        };
        let payload = payment_signature_payload(gateway_order_id, payment_id);
        if !verify_signature(gateway_secret, payload.as_bytes(), signature) {
            warn!("🔄️💳️ Payment signature mismatch for {id}");
            return Err(OrderFlowError::SignatureMismatch);
        }
        if order.payment.status == PaymentStatus::Paid {
            return Ok(order);
        }
        let update = PaymentUpdate::status(PaymentStatus::Paid)
            .with_payment_id(payment_id)
            .with_signature(signature)
            .with_verified(true)
            .with_paid_at(Utc::now());
        match self.db.checked_payment_update(id, PaymentStatus::Pending, update).await.map_err(OrderFlowError::db)? {
            Some(updated) => {
                self.log(id, &actor.id, actions::PAYMENT_CAPTURED, payment_id).await;
                self.notify(&updated.buyer_id, "order.paid", &updated).await;
                self.notify(&updated.seller_id, "order.paid", &updated).await;
                Ok(updated)
            },
            // The webhook may have captured the payment in the meantime; that is success, not
            // an error.
            None => {
                let now = self.fetch_order(id).await?;
                if now.payment.status == PaymentStatus::Paid {
                    Ok(now)
                } else {
                    Err(OrderFlowError::StaleTransition(id.clone()))
                }
            },
        }
    }

    //----------------------------------------  Refund flow  ----------------------------------------------------------

    /// Admin-triggered refund.
    ///
    /// The refundability precondition is checked before any gateway traffic. The "refund
    /// initiated" notification goes out *before* the gateway call so the client gets immediate
    /// feedback on what is otherwise a slow, synchronous call. A gateway failure surfaces as an
    /// error without mutating persisted state — the gateway's own `refund.processed` /
    /// `refund.failed` webhook remains the authoritative, idempotent second path to the terminal
    /// state, so both paths are safe to run zero, one or two times.
    pub async fn refund_order<G: PaymentGatewayClient>(
        &self,
        id: &OrderId,
        actor: &Actor,
        reason: &str,
        gateway: &G,
    ) -> Result<Order, OrderFlowError> {
        if !actor.is_admin() {
            return Err(OrderFlowError::Forbidden("only an admin may refund an order".into()));
        }
        let order = self.fetch_live(id).await?;
        if order.payment.status != PaymentStatus::Paid {
            return Err(OrderFlowError::PaymentNotRefundable(order.payment.status));
        }
        let Some(payment_id) = order.payment.payment_id.clone() else {
            return Err(OrderFlowError::InvalidInput("paid order has no payment id on record".into()));
        };
        self.notify(&order.buyer_id, "refund.initiated", &order).await;
        let receipt = match gateway.refund(&payment_id, order.amount, reason).await {
            Ok(receipt) => receipt,
            Err(e) => {
                warn!("🔄️💸️ Refund of {id} failed at the gateway. {e}");
                self.notify(&order.buyer_id, "refund.failed", &order).await;
                return Err(OrderFlowError::GatewayError(e.to_string()));
            },
        };
        let update = PaymentUpdate::status(PaymentStatus::Refunded).with_refunded_at(Utc::now()).with_refund_reason(reason);
        match self.db.checked_payment_update(id, PaymentStatus::Paid, update).await.map_err(OrderFlowError::db)? {
            Some(updated) => {
                self.log(id, &actor.id, actions::REFUNDED, &format!("{} ({reason})", receipt.refund_id)).await;
                self.notify(&updated.buyer_id, "refund.processed", &updated).await;
                Ok(updated)
            },
            None => {
                // The refund webhook beat us to it.
                let now = self.fetch_order(id).await?;
                if now.payment.status == PaymentStatus::Refunded {
                    Ok(now)
                } else {
                    Err(OrderFlowError::StaleTransition(id.clone()))
                }
            },
        }
    }

    //----------------------------------------  Webhook application  --------------------------------------------------

    /// Applies a `payment.captured` gateway event. Returns `None` when the event is a duplicate
    /// or lost a race — both are safe no-ops with no new activity rows.
    pub async fn apply_payment_captured(
        &self,
        order: &Order,
        payment_id: &str,
    ) -> Result<Option<Order>, OrderFlowError> {
        if order.payment.status == PaymentStatus::Paid {
            debug!("🔄️🪝️ Duplicate payment.captured for {}; acknowledged without mutation", order.id);
            return Ok(None);
        }
        let update = PaymentUpdate::status(PaymentStatus::Paid)
            .with_payment_id(payment_id)
            .with_verified(true)
            .with_paid_at(Utc::now());
        let applied =
            self.db.checked_payment_update(&order.id, PaymentStatus::Pending, update).await.map_err(OrderFlowError::db)?;
        match applied {
            Some(updated) => {
                self.log(&order.id, "system", actions::PAYMENT_CAPTURED, payment_id).await;
                self.notify(&updated.buyer_id, "order.paid", &updated).await;
                self.notify(&updated.seller_id, "order.paid", &updated).await;
                Ok(Some(updated))
            },
            None => {
                debug!("🔄️🪝️ payment.captured for {} lost its race; skipped", order.id);
                Ok(None)
            },
        }
    }

    pub async fn apply_payment_failed(&self, order: &Order) -> Result<Option<Order>, OrderFlowError> {
        if order.payment.status == PaymentStatus::Failed {
            return Ok(None);
        }
        let applied = self
            .db
            .checked_payment_update(&order.id, PaymentStatus::Pending, PaymentUpdate::status(PaymentStatus::Failed))
            .await
            .map_err(OrderFlowError::db)?;
        match applied {
            Some(updated) => {
                self.log(&order.id, "system", actions::PAYMENT_FAILED, "").await;
                self.notify(&updated.buyer_id, "payment.failed", &updated).await;
                Ok(Some(updated))
            },
            None => Ok(None),
        }
    }

    pub async fn apply_refund_processed(&self, order: &Order) -> Result<Option<Order>, OrderFlowError> {
        if order.payment.status == PaymentStatus::Refunded {
            return Ok(None);
        }
        let update = PaymentUpdate::status(PaymentStatus::Refunded).with_refunded_at(Utc::now());
        let applied =
            self.db.checked_payment_update(&order.id, PaymentStatus::Paid, update).await.map_err(OrderFlowError::db)?;
        match applied {
            Some(updated) => {
                self.log(&order.id, "system", "refund.processed", "").await;
                self.notify(&updated.buyer_id, "refund.processed", &updated).await;
                Ok(Some(updated))
            },
            None => Ok(None),
        }
    }

    pub async fn apply_refund_failed(&self, order: &Order) -> Result<Option<Order>, OrderFlowError> {
        if order.payment.status == PaymentStatus::RefundFailed {
            return Ok(None);
        }
        let applied = self
            .db
            .checked_payment_update(&order.id, PaymentStatus::Paid, PaymentUpdate::status(PaymentStatus::RefundFailed))
            .await
            .map_err(OrderFlowError::db)?;
        match applied {
            Some(updated) => {
                self.log(&order.id, "system", actions::REFUND_FAILED, "requires manual intervention").await;
                self.notify(&updated.buyer_id, "refund.failed", &updated).await;
                Ok(Some(updated))
            },
            None => Ok(None),
        }
    }

    //----------------------------------------  Sweepers  -------------------------------------------------------------

    /// Expires orders whose payment has been pending for longer than `max_age`. Each order is
    /// transitioned independently; a lost race or a per-order failure never aborts the rest of
    /// the sweep. Re-running the sweep is a no-op because expired orders no longer match the
    /// selection predicate.
    pub async fn expire_unpaid_orders(&self, max_age: Duration) -> Result<SweepOutcome, OrderFlowError> {
        let cutoff = Utc::now() - max_age;
        let candidates = self.db.expirable_orders(cutoff).await.map_err(OrderFlowError::db)?;
        let mut outcome = SweepOutcome::default();
        let reason = format!("Auto-expired: payment still pending after {} minutes", max_age.num_minutes());
        for order in candidates {
            let update = OrderUpdate::status(OrderStatus::Expired)
                .with_payment_status(PaymentStatus::Expired)
                .with_expiry_reason(&reason);
            // The guard covers both columns: a payment captured between selection and this write
            // must win, turning the expiry into a skip.
            match self.db.checked_status_update(&order.id, OrderStatus::Pending, Some(PaymentStatus::Pending), update).await
            {
                Ok(Some(expired)) => {
                    // TODO: this releases the product even if a newer order has since reserved
                    // it; needs a reservation check keyed on the order id.
                    match self.db.release_product(&expired.product_id).await {
                        Ok(true) => {},
                        Ok(false) => {
                            error!(
                                "🕰️ Order {} references product {} which does not exist. Flagged for manual \
                                 reconciliation.",
                                expired.id, expired.product_id
                            );
                        },
                        Err(e) => {
                            error!("🕰️ Could not release product {} for {}: {e}", expired.product_id, expired.id);
                            outcome.failures += 1;
                        },
                    }
                    self.log(&expired.id, "system", actions::EXPIRED, &reason).await;
                    self.notify(&expired.buyer_id, actions::EXPIRED, &expired).await;
                    self.notify(&expired.seller_id, actions::EXPIRED, &expired).await;
                    self.notify(ADMIN_AUDIENCE, actions::EXPIRED, &expired).await;
                    outcome.transitioned.push(expired);
                },
                Ok(None) => {
                    debug!("🕰️ Expiry of {} skipped; the order changed concurrently", order.id);
                    outcome.skipped += 1;
                },
                Err(e) => {
                    error!("🕰️ Could not expire order {}: {e}", order.id);
                    outcome.failures += 1;
                },
            }
        }
        Ok(outcome)
    }

    /// Completes orders that were accepted more than `max_age` ago.
    pub async fn complete_aged_orders(&self, max_age: Duration) -> Result<SweepOutcome, OrderFlowError> {
        let cutoff = Utc::now() - max_age;
        let candidates = self.db.completable_orders(cutoff).await.map_err(OrderFlowError::db)?;
        let mut outcome = SweepOutcome::default();
        for order in candidates {
            let update = OrderUpdate::status(OrderStatus::Completed).with_completed_at(Utc::now());
            match self.db.checked_status_update(&order.id, OrderStatus::Accepted, None, update).await {
                Ok(Some(completed)) => {
                    self.log(&completed.id, "system", actions::COMPLETED, "auto-completed after acceptance window").await;
                    self.notify(&completed.buyer_id, actions::COMPLETED, &completed).await;
                    self.notify(&completed.seller_id, actions::COMPLETED, &completed).await;
                    outcome.transitioned.push(completed);
                },
                Ok(None) => {
                    debug!("🕰️ Completion of {} skipped; the order changed concurrently", order.id);
                    outcome.skipped += 1;
                },
                Err(e) => {
                    error!("🕰️ Could not complete order {}: {e}", order.id);
                    outcome.failures += 1;
                },
            }
        }
        Ok(outcome)
    }

    //----------------------------------------  Admin actions  --------------------------------------------------------

    /// Soft-deletes an order. While the flag is set every transition except restore is refused.
    pub async fn soft_delete(&self, id: &OrderId, actor: &Actor, reason: &str) -> Result<Order, OrderFlowError> {
        self.check_delete_quota(actor).await?;
        // Existence check first so a missing order reports 404 rather than a conflict.
        let _ = self.fetch_order(id).await?;
        let deleted = self
            .db
            .set_deleted(id, &actor.id, true)
            .await
            .map_err(OrderFlowError::db)?
            .ok_or_else(|| OrderFlowError::OrderDeleted(id.clone()))?;
        self.log(id, &actor.id, actions::DELETED, reason).await;
        self.notify(ADMIN_AUDIENCE, actions::DELETED, &deleted).await;
        Ok(deleted)
    }

    /// Clears the soft-delete flag. Does not change the order status.
    pub async fn restore(&self, id: &OrderId, actor: &Actor) -> Result<Order, OrderFlowError> {
        if !actor.is_admin() {
            return Err(OrderFlowError::Forbidden("only an admin may restore an order".into()));
        }
        let _ = self.fetch_order(id).await?;
        let restored = self
            .db
            .set_deleted(id, &actor.id, false)
            .await
            .map_err(OrderFlowError::db)?
            .ok_or_else(|| OrderFlowError::InvalidInput("order is not deleted".into()))?;
        self.log(id, &actor.id, actions::RESTORED, "").await;
        self.notify(ADMIN_AUDIENCE, actions::RESTORED, &restored).await;
        Ok(restored)
    }

    /// Physically removes the order. Bypasses the state machine; logged separately, and the
    /// activity trail for the id survives.
    pub async fn hard_delete(&self, id: &OrderId, actor: &Actor, reason: &str) -> Result<(), OrderFlowError> {
        self.check_delete_quota(actor).await?;
        let order = self.fetch_order(id).await?;
        if !self.db.hard_delete(id).await.map_err(OrderFlowError::db)? {
            return Err(OrderFlowError::OrderNotFound(id.clone()));
        }
        self.log(id, &actor.id, actions::HARD_DELETED, reason).await;
        self.notify(ADMIN_AUDIENCE, actions::HARD_DELETED, &order).await;
        Ok(())
    }

    //----------------------------------------  Internals  ------------------------------------------------------------

    /// Fetches an order and refuses to act on a soft-deleted one.
    async fn fetch_live(&self, id: &OrderId) -> Result<Order, OrderFlowError> {
        let order = self.fetch_order(id).await?;
        if order.is_deleted {
            return Err(OrderFlowError::OrderDeleted(id.clone()));
        }
        Ok(order)
    }

    async fn check_delete_quota(&self, actor: &Actor) -> Result<(), OrderFlowError> {
        if !actor.is_admin() {
            return Err(OrderFlowError::Forbidden("only an admin may delete an order".into()));
        }
        let since = Utc::now() - Duration::hours(1);
        let soft =
            self.db.count_activity_since(&actor.id, actions::DELETED, since).await.map_err(OrderFlowError::db)?;
        let hard =
            self.db.count_activity_since(&actor.id, actions::HARD_DELETED, since).await.map_err(OrderFlowError::db)?;
        if soft + hard >= i64::from(self.limits.max_deletes_per_hour) {
            return Err(OrderFlowError::RateLimitExceeded {
                scope: "deletes per admin per hour",
                limit: self.limits.max_deletes_per_hour,
            });
        }
        Ok(())
    }

    /// Activity logging is part of the transition contract; a failure here is a real error
    /// condition but the state change has already committed, so it is logged loudly rather than
    /// unwound.
    async fn log(&self, id: &OrderId, actor_id: &str, action: &str, remarks: &str) {
        if let Err(e) = self.db.log_activity(id, actor_id, action, remarks).await {
            error!("🔄️📝️ Could not write activity log row ({action} on {id}): {e}");
        }
    }

    async fn notify(&self, audience: &str, event: &str, order: &Order) {
        let notification = Notification::new(audience, event, Notification::order_payload(order));
        self.producers.publish(notification).await;
    }
}
