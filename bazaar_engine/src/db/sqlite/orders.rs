use std::str::FromStr;

use bzr_common::MinorUnits;
use chrono::{DateTime, Utc};
use log::trace;
use sqlx::{sqlite::SqliteRow, FromRow, QueryBuilder, Row, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{NewOrder, Order, OrderId, OrderStatus, PaymentInfo, PaymentStatus},
    traits::{OrderUpdate, PaymentUpdate},
};

const ORDER_COLUMNS: &str = "id, product_id, buyer_id, seller_id, status, amount, currency, gateway_order_id, \
                             payment_id, payment_signature, payment_status, payment_verified, paid_at, refunded_at, \
                             refund_reason, accepted_at, completed_at, expiry_reason, is_deleted, deleted_at, \
                             deleted_by, created_at, updated_at";

fn decode_error(column: &str, source: impl std::error::Error + Send + Sync + 'static) -> sqlx::Error {
    sqlx::Error::ColumnDecode { index: column.to_string(), source: Box::new(source) }
}

fn timestamp(row: &SqliteRow, column: &str) -> Result<DateTime<Utc>, sqlx::Error> {
    let secs: i64 = row.try_get(column)?;
    DateTime::from_timestamp(secs, 0)
        .ok_or_else(|| decode_error(column, crate::db_types::ConversionError("timestamp", secs.to_string())))
}

fn opt_timestamp(row: &SqliteRow, column: &str) -> Result<Option<DateTime<Utc>>, sqlx::Error> {
    let secs: Option<i64> = row.try_get(column)?;
    secs.map(|s| {
        DateTime::from_timestamp(s, 0)
            .ok_or_else(|| decode_error(column, crate::db_types::ConversionError("timestamp", s.to_string())))
    })
    .transpose()
}

impl FromRow<'_, SqliteRow> for Order {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let status_str: String = row.try_get("status")?;
        let status = OrderStatus::from_str(&status_str).map_err(|e| decode_error("status", e))?;
        let payment_status_str: String = row.try_get("payment_status")?;
        let payment_status =
            PaymentStatus::from_str(&payment_status_str).map_err(|e| decode_error("payment_status", e))?;
        let payment = PaymentInfo {
            gateway_order_id: row.try_get("gateway_order_id")?,
            payment_id: row.try_get("payment_id")?,
            signature: row.try_get("payment_signature")?,
            status: payment_status,
            verified: row.try_get("payment_verified")?,
            paid_at: opt_timestamp(row, "paid_at")?,
            refunded_at: opt_timestamp(row, "refunded_at")?,
            refund_reason: row.try_get("refund_reason")?,
        };
        Ok(Order {
            id: OrderId(row.try_get("id")?),
            product_id: row.try_get("product_id")?,
            buyer_id: row.try_get("buyer_id")?,
            seller_id: row.try_get("seller_id")?,
            status,
            amount: MinorUnits::from(row.try_get::<i64, _>("amount")?),
            currency: row.try_get("currency")?,
            payment,
            accepted_at: opt_timestamp(row, "accepted_at")?,
            completed_at: opt_timestamp(row, "completed_at")?,
            expiry_reason: row.try_get("expiry_reason")?,
            is_deleted: row.try_get("is_deleted")?,
            deleted_at: opt_timestamp(row, "deleted_at")?,
            deleted_by: row.try_get("deleted_by")?,
            created_at: timestamp(row, "created_at")?,
            updated_at: timestamp(row, "updated_at")?,
        })
    }
}

/// Inserts a new order. This is not atomic on its own; embed it in a transaction and pass
/// `&mut *tx` when other writes must commit with it.
pub(crate) async fn insert_order(order: &NewOrder, conn: &mut SqliteConnection) -> Result<(), SqliteDatabaseError> {
    let now = Utc::now().timestamp();
    let result = sqlx::query(
        "INSERT INTO orders (id, product_id, buyer_id, seller_id, amount, currency, created_at, updated_at) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, $7) \
         ON CONFLICT (id) DO NOTHING",
    )
    .bind(order.id.as_str())
    .bind(&order.product_id)
    .bind(&order.buyer_id)
    .bind(&order.seller_id)
    .bind(order.amount.value())
    .bind(&order.currency)
    .bind(now)
    .execute(conn)
    .await?;
    if result.rows_affected() == 0 {
        return Err(SqliteDatabaseError::DuplicateOrder(order.id.as_str().to_string()));
    }
    Ok(())
}

pub(crate) async fn fetch_order_by_id(
    id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    fetch_one_where("id = $1", id.as_str(), conn).await
}

pub(crate) async fn fetch_order_by_gateway_order_id(
    gateway_order_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    fetch_one_where("gateway_order_id = $1", gateway_order_id, conn).await
}

pub(crate) async fn fetch_order_by_payment_id(
    payment_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    fetch_one_where("payment_id = $1", payment_id, conn).await
}

async fn fetch_one_where(
    clause: &str,
    value: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let sql = format!("SELECT {ORDER_COLUMNS} FROM orders WHERE {clause} LIMIT 1");
    let order = sqlx::query_as::<_, Order>(&sql).bind(value).fetch_optional(conn).await?;
    Ok(order)
}

/// The compare-and-swap write behind every order-status transition. The `WHERE status = expected`
/// clause is what makes a lost race a no-op: zero rows affected means another writer got there
/// first, and we return `None` without touching anything. `expected_payment` extends the guard to
/// the payment column for writes that mutate both.
pub(crate) async fn checked_status_update(
    id: &OrderId,
    expected: OrderStatus,
    expected_payment: Option<PaymentStatus>,
    update: OrderUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = ");
    builder.push_bind(Utc::now().timestamp());
    if let Some(status) = update.status {
        builder.push(", status = ");
        builder.push_bind(status.to_string());
    }
    if let Some(at) = update.accepted_at {
        builder.push(", accepted_at = ");
        builder.push_bind(at.timestamp());
    }
    if let Some(at) = update.completed_at {
        builder.push(", completed_at = ");
        builder.push_bind(at.timestamp());
    }
    if let Some(reason) = update.expiry_reason {
        builder.push(", expiry_reason = ");
        builder.push_bind(reason);
    }
    if let Some(payment_status) = update.payment_status {
        builder.push(", payment_status = ");
        builder.push_bind(payment_status.to_string());
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id.as_str());
    builder.push(" AND status = ");
    builder.push_bind(expected.to_string());
    if let Some(payment) = expected_payment {
        builder.push(" AND payment_status = ");
        builder.push_bind(payment.to_string());
    }
    trace!("🗃️ Executing query: {}", builder.sql());
    let result = builder.build().execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_order_by_id(id, conn).await
}

/// The payment-side counterpart of [`checked_status_update`], guarded on `payment_status`. This
/// is what makes webhook re-delivery and the sync-refund/webhook-refund pair safe to run any
/// number of times.
pub(crate) async fn checked_payment_update(
    id: &OrderId,
    expected: PaymentStatus,
    update: PaymentUpdate,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let mut builder = QueryBuilder::new("UPDATE orders SET updated_at = ");
    builder.push_bind(Utc::now().timestamp());
    if let Some(status) = update.status {
        builder.push(", payment_status = ");
        builder.push_bind(status.to_string());
    }
    if let Some(gateway_order_id) = update.gateway_order_id {
        builder.push(", gateway_order_id = ");
        builder.push_bind(gateway_order_id);
    }
    if let Some(payment_id) = update.payment_id {
        builder.push(", payment_id = ");
        builder.push_bind(payment_id);
    }
    if let Some(signature) = update.signature {
        builder.push(", payment_signature = ");
        builder.push_bind(signature);
    }
    if let Some(verified) = update.verified {
        builder.push(", payment_verified = ");
        builder.push_bind(verified);
    }
    if let Some(at) = update.paid_at {
        builder.push(", paid_at = ");
        builder.push_bind(at.timestamp());
    }
    if let Some(at) = update.refunded_at {
        builder.push(", refunded_at = ");
        builder.push_bind(at.timestamp());
    }
    if let Some(reason) = update.refund_reason {
        builder.push(", refund_reason = ");
        builder.push_bind(reason);
    }
    builder.push(" WHERE id = ");
    builder.push_bind(id.as_str());
    builder.push(" AND payment_status = ");
    builder.push_bind(expected.to_string());
    trace!("🗃️ Executing query: {}", builder.sql());
    let result = builder.build().execute(&mut *conn).await?;
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_order_by_id(id, conn).await
}

pub(crate) async fn set_deleted(
    id: &OrderId,
    deleted_by: &str,
    deleted: bool,
    conn: &mut SqliteConnection,
) -> Result<Option<Order>, SqliteDatabaseError> {
    let now = Utc::now().timestamp();
    let result = if deleted {
        sqlx::query(
            "UPDATE orders SET is_deleted = 1, deleted_at = $1, deleted_by = $2, updated_at = $1 \
             WHERE id = $3 AND is_deleted = 0",
        )
        .bind(now)
        .bind(deleted_by)
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?
    } else {
        sqlx::query(
            "UPDATE orders SET is_deleted = 0, deleted_at = NULL, deleted_by = NULL, updated_at = $1 \
             WHERE id = $2 AND is_deleted = 1",
        )
        .bind(now)
        .bind(id.as_str())
        .execute(&mut *conn)
        .await?
    };
    if result.rows_affected() == 0 {
        return Ok(None);
    }
    fetch_order_by_id(id, conn).await
}

pub(crate) async fn hard_delete(id: &OrderId, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("DELETE FROM orders WHERE id = $1").bind(id.as_str()).execute(conn).await?;
    Ok(result.rows_affected() > 0)
}

/// Orders selected for expiry. The predicate is also the idempotence guard: once an order is
/// expired it no longer matches, so re-running the sweep over it is a no-op.
pub(crate) async fn expirable_orders(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders \
         WHERE status = 'Pending' AND payment_status = 'pending' AND is_deleted = 0 AND created_at < $1 \
         ORDER BY created_at ASC"
    );
    let orders = sqlx::query_as::<_, Order>(&sql).bind(cutoff.timestamp()).fetch_all(conn).await?;
    Ok(orders)
}

pub(crate) async fn completable_orders(
    cutoff: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<Vec<Order>, SqliteDatabaseError> {
    let sql = format!(
        "SELECT {ORDER_COLUMNS} FROM orders \
         WHERE status = 'Accepted' AND completed_at IS NULL AND is_deleted = 0 \
         AND accepted_at IS NOT NULL AND accepted_at < $1 \
         ORDER BY accepted_at ASC"
    );
    let orders = sqlx::query_as::<_, Order>(&sql).bind(cutoff.timestamp()).fetch_all(conn).await?;
    Ok(orders)
}

pub(crate) async fn count_orders_placed_since(
    buyer_id: &str,
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM orders WHERE buyer_id = $1 AND created_at >= $2")
        .bind(buyer_id)
        .bind(since.timestamp())
        .fetch_one(conn)
        .await?;
    Ok(count)
}
