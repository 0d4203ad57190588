use chrono::{DateTime, Utc};

use crate::{
    db_types::{ActivityLogEntry, NewOrder, Order, OrderId, OrderStatus, PaymentStatus, ProductStatus},
    traits::{OrderUpdate, PaymentUpdate},
};

/// The persistence boundary for the order lifecycle engine.
///
/// Backends must provide atomic, precondition-checked single-order writes and append-only writes
/// of activity-log rows. The `checked_*` methods are the core race-safety mechanism: they apply
/// the update only if the record's current status still matches `expected`, returning `None`
/// (a no-op, not an error) otherwise. Under a race — say a buyer cancel and a sweeper expiry
/// attempt on the same pending order — whichever write commits first wins, and the loser's
/// precondition fails silently.
#[allow(async_fn_in_trait)]
pub trait MarketplaceDatabase: Clone {
    type Error: std::error::Error + Send + Sync + 'static;

    /// The URL of the database.
    fn url(&self) -> &str;

    /// Persists a brand-new order in `Pending` status with a `pending` payment record, and marks
    /// the product as ordered in the same transaction. Returns the stored order.
    async fn insert_order(&self, order: NewOrder) -> Result<Order, Self::Error>;

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, Self::Error>;

    /// Looks up the order that owns the given gateway-assigned order id.
    async fn fetch_order_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>, Self::Error>;

    /// Looks up the order that owns the given gateway payment id.
    async fn fetch_order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, Self::Error>;

    /// Applies `update` iff the order's current status equals `expected`, and, when
    /// `expected_payment` is given, its payment status still matches too. Writes that touch both
    /// sides of the record (expiry sets `payment_status` alongside `status`) must pass the
    /// payment precondition, or a capture landing between read and write would be overwritten.
    /// Returns the updated order, or `None` when a precondition no longer holds.
    async fn checked_status_update(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        expected_payment: Option<PaymentStatus>,
        update: OrderUpdate,
    ) -> Result<Option<Order>, Self::Error>;

    /// Applies `update` iff the order's current *payment* status equals `expected`. Returns the
    /// updated order, or `None` when the precondition no longer holds.
    async fn checked_payment_update(
        &self,
        id: &OrderId,
        expected: PaymentStatus,
        update: PaymentUpdate,
    ) -> Result<Option<Order>, Self::Error>;

    /// Sets or clears the soft-delete flag, checked against its current value. `None` means the
    /// flag was already in the requested state.
    async fn set_deleted(&self, id: &OrderId, deleted_by: &str, deleted: bool) -> Result<Option<Order>, Self::Error>;

    /// Physically removes the order row. Activity-log rows are keyed by order id without a
    /// foreign key, so the audit trail survives. Returns false if no such order existed.
    async fn hard_delete(&self, id: &OrderId) -> Result<bool, Self::Error>;

    /// Orders eligible for expiry: `Pending` status, `pending` payment, created before `cutoff`,
    /// not soft-deleted.
    async fn expirable_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, Self::Error>;

    /// Orders eligible for auto-completion: `Accepted` status, no `completed_at`, accepted
    /// before `cutoff`, not soft-deleted.
    async fn completable_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, Self::Error>;

    /// Appends one activity-log row. Rows are never mutated or deleted.
    async fn log_activity(&self, order_id: &OrderId, actor_id: &str, action: &str, remarks: &str)
        -> Result<(), Self::Error>;

    async fn activity_for_order(&self, order_id: &OrderId) -> Result<Vec<ActivityLogEntry>, Self::Error>;

    /// Counts activity rows by one actor for one action since `since`. Backs the policy quotas
    /// (daily cancellations, hourly admin deletes).
    async fn count_activity_since(&self, actor_id: &str, action: &str, since: DateTime<Utc>)
        -> Result<i64, Self::Error>;

    /// Counts orders a buyer has placed since `since`. Backs the daily order quota.
    async fn count_orders_placed_since(&self, buyer_id: &str, since: DateTime<Utc>) -> Result<i64, Self::Error>;

    /// Ensures a product row exists with the given status. Order placement marks products as
    /// ordered; catalog management itself is out of scope.
    async fn upsert_product(&self, product_id: &str, status: ProductStatus) -> Result<(), Self::Error>;

    async fn fetch_product_status(&self, product_id: &str) -> Result<Option<ProductStatus>, Self::Error>;

    /// Marks the product available again. Returns false when the product row is missing, which
    /// the expiry sweep logs for manual reconciliation.
    async fn release_product(&self, product_id: &str) -> Result<bool, Self::Error>;

    /// Closes the database connection.
    async fn close(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}
