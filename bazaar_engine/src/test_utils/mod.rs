//! Shared helpers for integration tests. Real behaviour lives elsewhere; nothing here is used in
//! production code paths.

use chrono::{DateTime, Duration, Utc};

use crate::{
    db_types::{Actor, ActorRole, OrderId},
    events::NotificationProducers,
    order_flow::{OrderFlowApi, PolicyLimits},
    SqliteDatabase,
};

/// A fresh in-memory database with migrations applied. A single connection keeps every query on
/// the same in-memory instance.
pub async fn memory_db() -> SqliteDatabase {
    SqliteDatabase::new_with_url("sqlite::memory:", 1).await.expect("in-memory database should open")
}

pub async fn memory_api() -> OrderFlowApi<SqliteDatabase> {
    OrderFlowApi::new(memory_db().await, NotificationProducers::default(), PolicyLimits::default())
}

pub fn buyer() -> Actor {
    Actor::new("alice", ActorRole::Buyer)
}

pub fn seller() -> Actor {
    Actor::new("bob", ActorRole::Seller)
}

pub fn admin() -> Actor {
    Actor::new("root", ActorRole::Admin)
}

/// Rewrites `created_at` so sweeper cutoffs can be tested without sleeping.
pub async fn backdate_created(db: &SqliteDatabase, id: &OrderId, age: Duration) {
    let ts = (Utc::now() - age).timestamp();
    sqlx::query("UPDATE orders SET created_at = ? WHERE id = ?")
        .bind(ts)
        .bind(id.as_str())
        .execute(db.pool())
        .await
        .expect("backdating created_at should succeed");
}

/// Rewrites `accepted_at` for completion-sweeper tests.
pub async fn backdate_accepted(db: &SqliteDatabase, id: &OrderId, age: Duration) {
    let ts = (Utc::now() - age).timestamp();
    sqlx::query("UPDATE orders SET accepted_at = ? WHERE id = ?")
        .bind(ts)
        .bind(id.as_str())
        .execute(db.pool())
        .await
        .expect("backdating accepted_at should succeed");
}

pub fn moments_ago(seconds: i64) -> DateTime<Utc> {
    Utc::now() - Duration::seconds(seconds)
}
