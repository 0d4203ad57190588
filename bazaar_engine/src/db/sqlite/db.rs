use std::{fmt::Debug, str::FromStr};

use chrono::{DateTime, Utc};
use log::*;
use sqlx::{
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
    SqlitePool,
};

use super::{activity, orders, products, SqliteDatabaseError};
use crate::{
    db_types::{ActivityLogEntry, NewOrder, Order, OrderId, OrderStatus, PaymentStatus, ProductStatus},
    traits::{MarketplaceDatabase, OrderUpdate, PaymentUpdate},
};

#[derive(Clone)]
pub struct SqliteDatabase {
    url: String,
    pool: SqlitePool,
}

impl Debug for SqliteDatabase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SqliteDatabase ({:?})", self.pool)
    }
}

impl SqliteDatabase {
    /// Connects to the database at `url`, creating the file if needed, and brings the schema up
    /// to date.
    pub async fn new_with_url(url: &str, max_connections: u32) -> Result<Self, SqliteDatabaseError> {
        let options = SqliteConnectOptions::from_str(url)?.create_if_missing(true);
        let pool = SqlitePoolOptions::new().max_connections(max_connections).connect_with(options).await?;
        sqlx::migrate!("./src/db/sqlite/migrations").run(&pool).await?;
        debug!("🗃️ Connected to database at {url}");
        Ok(Self { url: url.to_string(), pool })
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }
}

impl MarketplaceDatabase for SqliteDatabase {
    type Error = SqliteDatabaseError;

    fn url(&self) -> &str {
        self.url.as_str()
    }

    async fn insert_order(&self, order: NewOrder) -> Result<Order, Self::Error> {
        let mut tx = self.pool.begin().await?;
        orders::insert_order(&order, &mut tx).await?;
        products::upsert(&order.product_id, ProductStatus::Ordered, &mut tx).await?;
        let stored = orders::fetch_order_by_id(&order.id, &mut tx)
            .await?
            .ok_or_else(|| SqliteDatabaseError::OrderVanished(order.id.as_str().to_string()))?;
        tx.commit().await?;
        debug!("🗃️ Order {} saved for buyer {}", stored.id, stored.buyer_id);
        Ok(stored)
    }

    async fn fetch_order(&self, id: &OrderId) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_id(id, &mut conn).await
    }

    async fn fetch_order_by_gateway_order_id(&self, gateway_order_id: &str) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_gateway_order_id(gateway_order_id, &mut conn).await
    }

    async fn fetch_order_by_payment_id(&self, payment_id: &str) -> Result<Option<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::fetch_order_by_payment_id(payment_id, &mut conn).await
    }

    async fn checked_status_update(
        &self,
        id: &OrderId,
        expected: OrderStatus,
        expected_payment: Option<PaymentStatus>,
        update: OrderUpdate,
    ) -> Result<Option<Order>, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let order = orders::checked_status_update(id, expected, expected_payment, update, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn checked_payment_update(
        &self,
        id: &OrderId,
        expected: PaymentStatus,
        update: PaymentUpdate,
    ) -> Result<Option<Order>, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let order = orders::checked_payment_update(id, expected, update, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn set_deleted(&self, id: &OrderId, deleted_by: &str, deleted: bool) -> Result<Option<Order>, Self::Error> {
        let mut tx = self.pool.begin().await?;
        let order = orders::set_deleted(id, deleted_by, deleted, &mut tx).await?;
        tx.commit().await?;
        Ok(order)
    }

    async fn hard_delete(&self, id: &OrderId) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::hard_delete(id, &mut conn).await
    }

    async fn expirable_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::expirable_orders(cutoff, &mut conn).await
    }

    async fn completable_orders(&self, cutoff: DateTime<Utc>) -> Result<Vec<Order>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::completable_orders(cutoff, &mut conn).await
    }

    async fn log_activity(
        &self,
        order_id: &OrderId,
        actor_id: &str,
        action: &str,
        remarks: &str,
    ) -> Result<(), Self::Error> {
        let mut conn = self.pool.acquire().await?;
        activity::append(order_id, actor_id, action, remarks, &mut conn).await
    }

    async fn activity_for_order(&self, order_id: &OrderId) -> Result<Vec<ActivityLogEntry>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        activity::for_order(order_id, &mut conn).await
    }

    async fn count_activity_since(
        &self,
        actor_id: &str,
        action: &str,
        since: DateTime<Utc>,
    ) -> Result<i64, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        activity::count_since(actor_id, action, since, &mut conn).await
    }

    async fn count_orders_placed_since(&self, buyer_id: &str, since: DateTime<Utc>) -> Result<i64, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        orders::count_orders_placed_since(buyer_id, since, &mut conn).await
    }

    async fn upsert_product(&self, product_id: &str, status: ProductStatus) -> Result<(), Self::Error> {
        let mut conn = self.pool.acquire().await?;
        products::upsert(product_id, status, &mut conn).await
    }

    async fn fetch_product_status(&self, product_id: &str) -> Result<Option<ProductStatus>, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        products::fetch_status(product_id, &mut conn).await
    }

    async fn release_product(&self, product_id: &str) -> Result<bool, Self::Error> {
        let mut conn = self.pool.acquire().await?;
        products::release(product_id, &mut conn).await
    }

    async fn close(&mut self) -> Result<(), Self::Error> {
        self.pool.close().await;
        Ok(())
    }
}
