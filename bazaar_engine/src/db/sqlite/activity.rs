use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqliteRow, FromRow, Row, SqliteConnection};

use crate::{
    db::sqlite::SqliteDatabaseError,
    db_types::{ActivityLogEntry, OrderId},
};

impl FromRow<'_, SqliteRow> for ActivityLogEntry {
    fn from_row(row: &SqliteRow) -> Result<Self, sqlx::Error> {
        let secs: i64 = row.try_get("created_at")?;
        let created_at = DateTime::from_timestamp(secs, 0).ok_or_else(|| sqlx::Error::ColumnDecode {
            index: "created_at".to_string(),
            source: Box::new(crate::db_types::ConversionError("timestamp", secs.to_string())),
        })?;
        Ok(ActivityLogEntry {
            id: row.try_get("id")?,
            order_id: OrderId(row.try_get("order_id")?),
            actor_id: row.try_get("actor_id")?,
            action: row.try_get("action")?,
            remarks: row.try_get("remarks")?,
            created_at,
        })
    }
}

pub(crate) async fn append(
    order_id: &OrderId,
    actor_id: &str,
    action: &str,
    remarks: &str,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query("INSERT INTO activity_log (order_id, actor_id, action, remarks, created_at) VALUES ($1, $2, $3, $4, $5)")
        .bind(order_id.as_str())
        .bind(actor_id)
        .bind(action)
        .bind(remarks)
        .bind(Utc::now().timestamp())
        .execute(conn)
        .await?;
    Ok(())
}

pub(crate) async fn for_order(
    order_id: &OrderId,
    conn: &mut SqliteConnection,
) -> Result<Vec<ActivityLogEntry>, SqliteDatabaseError> {
    let entries = sqlx::query_as::<_, ActivityLogEntry>(
        "SELECT id, order_id, actor_id, action, remarks, created_at FROM activity_log \
         WHERE order_id = $1 ORDER BY id ASC",
    )
    .bind(order_id.as_str())
    .fetch_all(conn)
    .await?;
    Ok(entries)
}

pub(crate) async fn count_since(
    actor_id: &str,
    action: &str,
    since: DateTime<Utc>,
    conn: &mut SqliteConnection,
) -> Result<i64, SqliteDatabaseError> {
    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM activity_log WHERE actor_id = $1 AND action = $2 AND created_at >= $3",
    )
    .bind(actor_id)
    .bind(action)
    .bind(since.timestamp())
    .fetch_one(conn)
    .await?;
    Ok(count)
}
