//! Order repository
//!
//! Database operations for orders, including the summary aggregates. The
//! cancel path uses a conditional UPDATE keyed off the prior status so the
//! stock restore in the live service can fire at most once per order.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::{Order, OrderStatus, OrderWithProduct};
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::str::FromStr;
use std::sync::Arc;

/// Per-status order counts for a user
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatusCounts {
    pub total: i64,
    pub pending: i64,
    pub paid: i64,
    pub cancelled: i64,
}

/// The product with the greatest summed quantity over non-cancelled orders
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct BestSeller {
    pub product_name: String,
    pub total_qty: i64,
}

/// Order repository trait
#[async_trait]
pub trait OrderRepository: Send + Sync {
    /// Create a new order
    async fn create(&self, order: &Order) -> Result<Order>;

    /// Get an order by ID, scoped to its owner
    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Order>>;

    /// List a session's orders joined with their products, newest first
    async fn list_for_session(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<Vec<OrderWithProduct>>;

    /// Write a new status. Returns the number of rows affected.
    async fn update_status(&self, id: i64, user_id: i64, status: OrderStatus) -> Result<u64>;

    /// Move an order into CANCELLED, guarded on the prior status not already
    /// being CANCELLED. Returns the number of rows affected: 1 means the
    /// caller owes the product a stock restore, 0 means nothing changed.
    async fn cancel(&self, id: i64, user_id: i64) -> Result<u64>;

    /// Count the user's orders per status
    async fn count_by_status(&self, user_id: i64) -> Result<StatusCounts>;

    /// Sum of qty × unit price over the user's PAID orders
    async fn paid_revenue(&self, user_id: i64) -> Result<f64>;

    /// The user's best-selling product over non-cancelled orders
    async fn best_seller(&self, user_id: i64) -> Result<Option<BestSeller>>;

    /// All the user's orders joined with their products, oldest first
    /// (CSV export order)
    async fn export_rows(&self, user_id: i64) -> Result<Vec<OrderWithProduct>>;
}

/// SQLx-based order repository implementation.
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxOrderRepository {
    pool: DynDatabasePool,
}

impl SqlxOrderRepository {
    /// Create a new SQLx order repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn shared(pool: DynDatabasePool) -> Arc<dyn OrderRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl OrderRepository for SqlxOrderRepository {
    async fn create(&self, order: &Order) -> Result<Order> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), order).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), order).await,
        }
    }

    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Order>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_for_user_sqlite(self.pool.as_sqlite().unwrap(), id, user_id).await
            }
            DatabaseDriver::Mysql => {
                get_for_user_mysql(self.pool.as_mysql().unwrap(), id, user_id).await
            }
        }
    }

    async fn list_for_session(
        &self,
        session_id: i64,
        user_id: i64,
    ) -> Result<Vec<OrderWithProduct>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_for_session_sqlite(self.pool.as_sqlite().unwrap(), session_id, user_id).await
            }
            DatabaseDriver::Mysql => {
                list_for_session_mysql(self.pool.as_mysql().unwrap(), session_id, user_id).await
            }
        }
    }

    async fn update_status(&self, id: i64, user_id: i64, status: OrderStatus) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_status_sqlite(self.pool.as_sqlite().unwrap(), id, user_id, status).await
            }
            DatabaseDriver::Mysql => {
                update_status_mysql(self.pool.as_mysql().unwrap(), id, user_id, status).await
            }
        }
    }

    async fn cancel(&self, id: i64, user_id: i64) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                cancel_sqlite(self.pool.as_sqlite().unwrap(), id, user_id).await
            }
            DatabaseDriver::Mysql => cancel_mysql(self.pool.as_mysql().unwrap(), id, user_id).await,
        }
    }

    async fn count_by_status(&self, user_id: i64) -> Result<StatusCounts> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                count_by_status_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                count_by_status_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }

    async fn paid_revenue(&self, user_id: i64) -> Result<f64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                paid_revenue_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => {
                paid_revenue_mysql(self.pool.as_mysql().unwrap(), user_id).await
            }
        }
    }

    async fn best_seller(&self, user_id: i64) -> Result<Option<BestSeller>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                best_seller_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => best_seller_mysql(self.pool.as_mysql().unwrap(), user_id).await,
        }
    }

    async fn export_rows(&self, user_id: i64) -> Result<Vec<OrderWithProduct>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                export_rows_sqlite(self.pool.as_sqlite().unwrap(), user_id).await
            }
            DatabaseDriver::Mysql => export_rows_mysql(self.pool.as_mysql().unwrap(), user_id).await,
        }
    }
}

const JOINED_COLUMNS: &str = "o.id, o.user_id, o.session_id, o.product_id, o.customer_name, \
     o.qty, o.status, o.created_at, p.name AS product_name, p.price AS unit_price";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, order: &Order) -> Result<Order> {
    let result = sqlx::query(
        r#"
        INSERT INTO orders (user_id, session_id, product_id, customer_name, qty, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(order.user_id)
    .bind(order.session_id)
    .bind(order.product_id)
    .bind(&order.customer_name)
    .bind(order.qty)
    .bind(order.status.to_string())
    .bind(order.created_at)
    .execute(pool)
    .await
    .context("Failed to create order")?;

    let mut created = order.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_for_user_sqlite(pool: &SqlitePool, id: i64, user_id: i64) -> Result<Option<Order>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, session_id, product_id, customer_name, qty, status, created_at
        FROM orders
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get order")?;

    row.map(|row| row_to_order_sqlite(&row)).transpose()
}

async fn list_for_session_sqlite(
    pool: &SqlitePool,
    session_id: i64,
    user_id: i64,
) -> Result<Vec<OrderWithProduct>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM orders o
        JOIN products p ON p.id = o.product_id
        WHERE o.session_id = ? AND o.user_id = ?
        ORDER BY o.id DESC
        "#,
        JOINED_COLUMNS
    ))
    .bind(session_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list session orders")?;

    rows.iter().map(row_to_order_with_product_sqlite).collect()
}

async fn update_status_sqlite(
    pool: &SqlitePool,
    id: i64,
    user_id: i64,
    status: OrderStatus,
) -> Result<u64> {
    let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND user_id = ?")
        .bind(status.to_string())
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to update order status")?;

    Ok(result.rows_affected())
}

async fn cancel_sqlite(pool: &SqlitePool, id: i64, user_id: i64) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'CANCELLED'
        WHERE id = ? AND user_id = ? AND status <> 'CANCELLED'
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("Failed to cancel order")?;

    Ok(result.rows_affected())
}

async fn count_by_status_sqlite(pool: &SqlitePool, user_id: i64) -> Result<StatusCounts> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            COALESCE(SUM(CASE WHEN status = 'PENDING' THEN 1 ELSE 0 END), 0) AS pending,
            COALESCE(SUM(CASE WHEN status = 'PAID' THEN 1 ELSE 0 END), 0) AS paid,
            COALESCE(SUM(CASE WHEN status = 'CANCELLED' THEN 1 ELSE 0 END), 0) AS cancelled
        FROM orders
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("Failed to count orders")?;

    Ok(StatusCounts {
        total: row.get("total"),
        pending: row.get("pending"),
        paid: row.get("paid"),
        cancelled: row.get("cancelled"),
    })
}

async fn paid_revenue_sqlite(pool: &SqlitePool, user_id: i64) -> Result<f64> {
    let row = sqlx::query(
        r#"
        SELECT CAST(COALESCE(SUM(o.qty * p.price), 0) AS REAL) AS revenue
        FROM orders o
        JOIN products p ON p.id = o.product_id
        WHERE o.user_id = ? AND o.status = 'PAID'
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("Failed to compute revenue")?;

    Ok(row.get("revenue"))
}

async fn best_seller_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Option<BestSeller>> {
    let row = sqlx::query(
        r#"
        SELECT p.name AS product_name, SUM(o.qty) AS total_qty
        FROM orders o
        JOIN products p ON p.id = o.product_id
        WHERE o.user_id = ? AND o.status <> 'CANCELLED'
        GROUP BY p.name
        ORDER BY SUM(o.qty) DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to compute best seller")?;

    Ok(row.map(|row| BestSeller {
        product_name: row.get("product_name"),
        total_qty: row.get("total_qty"),
    }))
}

async fn export_rows_sqlite(pool: &SqlitePool, user_id: i64) -> Result<Vec<OrderWithProduct>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM orders o
        JOIN products p ON p.id = o.product_id
        WHERE o.user_id = ?
        ORDER BY o.id ASC
        "#,
        JOINED_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to export orders")?;

    rows.iter().map(row_to_order_with_product_sqlite).collect()
}

fn row_to_order_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<Order> {
    let status_str: String = row.get("status");
    let status = OrderStatus::from_str(&status_str)
        .with_context(|| format!("Invalid status in database: {}", status_str))?;

    Ok(Order {
        id: row.get("id"),
        user_id: row.get("user_id"),
        session_id: row.get("session_id"),
        product_id: row.get("product_id"),
        customer_name: row.get("customer_name"),
        qty: row.get("qty"),
        status,
        created_at: row.get("created_at"),
    })
}

fn row_to_order_with_product_sqlite(row: &sqlx::sqlite::SqliteRow) -> Result<OrderWithProduct> {
    Ok(OrderWithProduct {
        order: row_to_order_sqlite(row)?,
        product_name: row.get("product_name"),
        unit_price: row.get("unit_price"),
    })
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, order: &Order) -> Result<Order> {
    let result = sqlx::query(
        r#"
        INSERT INTO orders (user_id, session_id, product_id, customer_name, qty, status, created_at)
        VALUES (?, ?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(order.user_id)
    .bind(order.session_id)
    .bind(order.product_id)
    .bind(&order.customer_name)
    .bind(order.qty)
    .bind(order.status.to_string())
    .bind(order.created_at)
    .execute(pool)
    .await
    .context("Failed to create order")?;

    let mut created = order.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn get_for_user_mysql(pool: &MySqlPool, id: i64, user_id: i64) -> Result<Option<Order>> {
    let row = sqlx::query(
        r#"
        SELECT id, user_id, session_id, product_id, customer_name, qty, status, created_at
        FROM orders
        WHERE id = ? AND user_id = ?
        "#,
    )
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get order")?;

    row.map(|row| row_to_order_mysql(&row)).transpose()
}

async fn list_for_session_mysql(
    pool: &MySqlPool,
    session_id: i64,
    user_id: i64,
) -> Result<Vec<OrderWithProduct>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM orders o
        JOIN products p ON p.id = o.product_id
        WHERE o.session_id = ? AND o.user_id = ?
        ORDER BY o.id DESC
        "#,
        JOINED_COLUMNS
    ))
    .bind(session_id)
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list session orders")?;

    rows.iter().map(row_to_order_with_product_mysql).collect()
}

async fn update_status_mysql(
    pool: &MySqlPool,
    id: i64,
    user_id: i64,
    status: OrderStatus,
) -> Result<u64> {
    let result = sqlx::query("UPDATE orders SET status = ? WHERE id = ? AND user_id = ?")
        .bind(status.to_string())
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to update order status")?;

    Ok(result.rows_affected())
}

async fn cancel_mysql(pool: &MySqlPool, id: i64, user_id: i64) -> Result<u64> {
    let result = sqlx::query(
        r#"
        UPDATE orders
        SET status = 'CANCELLED'
        WHERE id = ? AND user_id = ? AND status <> 'CANCELLED'
        "#,
    )
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("Failed to cancel order")?;

    Ok(result.rows_affected())
}

async fn count_by_status_mysql(pool: &MySqlPool, user_id: i64) -> Result<StatusCounts> {
    let row = sqlx::query(
        r#"
        SELECT
            COUNT(*) AS total,
            CAST(COALESCE(SUM(CASE WHEN status = 'PENDING' THEN 1 ELSE 0 END), 0) AS SIGNED) AS pending,
            CAST(COALESCE(SUM(CASE WHEN status = 'PAID' THEN 1 ELSE 0 END), 0) AS SIGNED) AS paid,
            CAST(COALESCE(SUM(CASE WHEN status = 'CANCELLED' THEN 1 ELSE 0 END), 0) AS SIGNED) AS cancelled
        FROM orders
        WHERE user_id = ?
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("Failed to count orders")?;

    Ok(StatusCounts {
        total: row.get("total"),
        pending: row.get("pending"),
        paid: row.get("paid"),
        cancelled: row.get("cancelled"),
    })
}

async fn paid_revenue_mysql(pool: &MySqlPool, user_id: i64) -> Result<f64> {
    let row = sqlx::query(
        r#"
        SELECT COALESCE(SUM(o.qty * p.price), 0) AS revenue
        FROM orders o
        JOIN products p ON p.id = o.product_id
        WHERE o.user_id = ? AND o.status = 'PAID'
        "#,
    )
    .bind(user_id)
    .fetch_one(pool)
    .await
    .context("Failed to compute revenue")?;

    Ok(row.get("revenue"))
}

async fn best_seller_mysql(pool: &MySqlPool, user_id: i64) -> Result<Option<BestSeller>> {
    let row = sqlx::query(
        r#"
        SELECT p.name AS product_name, CAST(SUM(o.qty) AS SIGNED) AS total_qty
        FROM orders o
        JOIN products p ON p.id = o.product_id
        WHERE o.user_id = ? AND o.status <> 'CANCELLED'
        GROUP BY p.name
        ORDER BY SUM(o.qty) DESC
        LIMIT 1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to compute best seller")?;

    Ok(row.map(|row| BestSeller {
        product_name: row.get("product_name"),
        total_qty: row.get("total_qty"),
    }))
}

async fn export_rows_mysql(pool: &MySqlPool, user_id: i64) -> Result<Vec<OrderWithProduct>> {
    let rows = sqlx::query(&format!(
        r#"
        SELECT {}
        FROM orders o
        JOIN products p ON p.id = o.product_id
        WHERE o.user_id = ?
        ORDER BY o.id ASC
        "#,
        JOINED_COLUMNS
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to export orders")?;

    rows.iter().map(row_to_order_with_product_mysql).collect()
}

fn row_to_order_mysql(row: &sqlx::mysql::MySqlRow) -> Result<Order> {
    let status_str: String = row.get("status");
    let status = OrderStatus::from_str(&status_str)
        .with_context(|| format!("Invalid status in database: {}", status_str))?;

    Ok(Order {
        id: row.get("id"),
        user_id: row.get("user_id"),
        session_id: row.get("session_id"),
        product_id: row.get("product_id"),
        customer_name: row.get("customer_name"),
        qty: row.get("qty"),
        status,
        created_at: row.get("created_at"),
    })
}

fn row_to_order_with_product_mysql(row: &sqlx::mysql::MySqlRow) -> Result<OrderWithProduct> {
    Ok(OrderWithProduct {
        order: row_to_order_mysql(row)?,
        product_name: row.get("product_name"),
        unit_price: row.get("unit_price"),
    })
}
