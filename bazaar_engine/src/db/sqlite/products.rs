use std::str::FromStr;

use chrono::Utc;
use sqlx::SqliteConnection;

use crate::{db::sqlite::SqliteDatabaseError, db_types::ProductStatus};

pub(crate) async fn upsert(
    product_id: &str,
    status: ProductStatus,
    conn: &mut SqliteConnection,
) -> Result<(), SqliteDatabaseError> {
    sqlx::query(
        "INSERT INTO products (id, status, updated_at) VALUES ($1, $2, $3) \
         ON CONFLICT (id) DO UPDATE SET status = excluded.status, updated_at = excluded.updated_at",
    )
    .bind(product_id)
    .bind(status.to_string())
    .bind(Utc::now().timestamp())
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn fetch_status(
    product_id: &str,
    conn: &mut SqliteConnection,
) -> Result<Option<ProductStatus>, SqliteDatabaseError> {
    let status: Option<String> = sqlx::query_scalar("SELECT status FROM products WHERE id = $1")
        .bind(product_id)
        .fetch_optional(conn)
        .await?;
    status
        .map(|s| ProductStatus::from_str(&s).map_err(|e| SqliteDatabaseError::QueryError(e.to_string())))
        .transpose()
}

/// Returns false when the product row does not exist.
pub(crate) async fn release(product_id: &str, conn: &mut SqliteConnection) -> Result<bool, SqliteDatabaseError> {
    let result = sqlx::query("UPDATE products SET status = 'available', updated_at = $1 WHERE id = $2")
        .bind(Utc::now().timestamp())
        .bind(product_id)
        .execute(conn)
        .await?;
    Ok(result.rows_affected() > 0)
}
