//! Product repository
//!
//! Database operations for inventory items. Stock mutations go through
//! `reserve_stock`/`restore_stock`: the reserve is a conditional decrement
//! (`stock >= qty` in the WHERE clause) so concurrent order submissions
//! cannot drive stock negative.

use crate::config::DatabaseDriver;
use crate::db::DynDatabasePool;
use crate::models::Product;
use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::{MySqlPool, Row, SqlitePool};
use std::sync::Arc;

/// Product repository trait
#[async_trait]
pub trait ProductRepository: Send + Sync {
    /// Create a new product
    async fn create(&self, product: &Product) -> Result<Product>;

    /// Get a product by ID, scoped to its owner
    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Product>>;

    /// List a user's products, newest first
    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Product>>;

    /// List a user's products ordered by name (for the live page picker)
    async fn list_for_user_by_name(&self, user_id: i64) -> Result<Vec<Product>>;

    /// Update name/price/stock. Returns the number of rows affected.
    async fn update_details(
        &self,
        id: i64,
        user_id: i64,
        name: &str,
        price: f64,
        stock: i64,
    ) -> Result<u64>;

    /// Replace the stored image path. Returns the number of rows affected.
    async fn set_image_path(&self, id: i64, user_id: i64, image_path: &str) -> Result<u64>;

    /// Delete a product. Returns the number of rows affected.
    async fn delete(&self, id: i64, user_id: i64) -> Result<u64>;

    /// Atomically decrement stock by `qty` if at least `qty` units remain.
    ///
    /// Returns true when the reservation succeeded. The conditional UPDATE
    /// is the oversell guard: two concurrent reservations can never take
    /// stock below zero.
    async fn reserve_stock(&self, id: i64, user_id: i64, qty: i64) -> Result<bool>;

    /// Return `qty` units to stock (order cancelled, or a failed insert
    /// rolling back its reservation).
    async fn restore_stock(&self, id: i64, user_id: i64, qty: i64) -> Result<()>;

    /// List products at or below the given stock threshold, lowest first
    async fn low_stock(&self, user_id: i64, threshold: i64) -> Result<Vec<Product>>;
}

/// SQLx-based product repository implementation.
///
/// Supports both SQLite and MySQL databases.
pub struct SqlxProductRepository {
    pool: DynDatabasePool,
}

impl SqlxProductRepository {
    /// Create a new SQLx product repository
    pub fn new(pool: DynDatabasePool) -> Self {
        Self { pool }
    }

    /// Create a shared repository for use with dependency injection
    pub fn shared(pool: DynDatabasePool) -> Arc<dyn ProductRepository> {
        Arc::new(Self::new(pool))
    }
}

#[async_trait]
impl ProductRepository for SqlxProductRepository {
    async fn create(&self, product: &Product) -> Result<Product> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => create_sqlite(self.pool.as_sqlite().unwrap(), product).await,
            DatabaseDriver::Mysql => create_mysql(self.pool.as_mysql().unwrap(), product).await,
        }
    }

    async fn get_for_user(&self, id: i64, user_id: i64) -> Result<Option<Product>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                get_for_user_sqlite(self.pool.as_sqlite().unwrap(), id, user_id).await
            }
            DatabaseDriver::Mysql => {
                get_for_user_mysql(self.pool.as_mysql().unwrap(), id, user_id).await
            }
        }
    }

    async fn list_for_user(&self, user_id: i64) -> Result<Vec<Product>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_sqlite(self.pool.as_sqlite().unwrap(), user_id, "id DESC").await
            }
            DatabaseDriver::Mysql => {
                list_mysql(self.pool.as_mysql().unwrap(), user_id, "id DESC").await
            }
        }
    }

    async fn list_for_user_by_name(&self, user_id: i64) -> Result<Vec<Product>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                list_sqlite(self.pool.as_sqlite().unwrap(), user_id, "name ASC").await
            }
            DatabaseDriver::Mysql => {
                list_mysql(self.pool.as_mysql().unwrap(), user_id, "name ASC").await
            }
        }
    }

    async fn update_details(
        &self,
        id: i64,
        user_id: i64,
        name: &str,
        price: f64,
        stock: i64,
    ) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                update_details_sqlite(self.pool.as_sqlite().unwrap(), id, user_id, name, price, stock)
                    .await
            }
            DatabaseDriver::Mysql => {
                update_details_mysql(self.pool.as_mysql().unwrap(), id, user_id, name, price, stock)
                    .await
            }
        }
    }

    async fn set_image_path(&self, id: i64, user_id: i64, image_path: &str) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                set_image_path_sqlite(self.pool.as_sqlite().unwrap(), id, user_id, image_path).await
            }
            DatabaseDriver::Mysql => {
                set_image_path_mysql(self.pool.as_mysql().unwrap(), id, user_id, image_path).await
            }
        }
    }

    async fn delete(&self, id: i64, user_id: i64) -> Result<u64> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                delete_sqlite(self.pool.as_sqlite().unwrap(), id, user_id).await
            }
            DatabaseDriver::Mysql => delete_mysql(self.pool.as_mysql().unwrap(), id, user_id).await,
        }
    }

    async fn reserve_stock(&self, id: i64, user_id: i64, qty: i64) -> Result<bool> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                reserve_stock_sqlite(self.pool.as_sqlite().unwrap(), id, user_id, qty).await
            }
            DatabaseDriver::Mysql => {
                reserve_stock_mysql(self.pool.as_mysql().unwrap(), id, user_id, qty).await
            }
        }
    }

    async fn restore_stock(&self, id: i64, user_id: i64, qty: i64) -> Result<()> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                restore_stock_sqlite(self.pool.as_sqlite().unwrap(), id, user_id, qty).await
            }
            DatabaseDriver::Mysql => {
                restore_stock_mysql(self.pool.as_mysql().unwrap(), id, user_id, qty).await
            }
        }
    }

    async fn low_stock(&self, user_id: i64, threshold: i64) -> Result<Vec<Product>> {
        match self.pool.driver() {
            DatabaseDriver::Sqlite => {
                low_stock_sqlite(self.pool.as_sqlite().unwrap(), user_id, threshold).await
            }
            DatabaseDriver::Mysql => {
                low_stock_mysql(self.pool.as_mysql().unwrap(), user_id, threshold).await
            }
        }
    }
}

const SELECT_COLUMNS: &str = "id, user_id, name, price, stock, image_path, created_at";

// ============================================================================
// SQLite implementations
// ============================================================================

async fn create_sqlite(pool: &SqlitePool, product: &Product) -> Result<Product> {
    let result = sqlx::query(
        r#"
        INSERT INTO products (user_id, name, price, stock, image_path, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(product.user_id)
    .bind(&product.name)
    .bind(product.price)
    .bind(product.stock)
    .bind(&product.image_path)
    .bind(product.created_at)
    .execute(pool)
    .await
    .context("Failed to create product")?;

    let mut created = product.clone();
    created.id = result.last_insert_rowid();
    Ok(created)
}

async fn get_for_user_sqlite(pool: &SqlitePool, id: i64, user_id: i64) -> Result<Option<Product>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM products WHERE id = ? AND user_id = ?",
        SELECT_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get product")?;

    Ok(row.map(|row| row_to_product_sqlite(&row)))
}

async fn list_sqlite(pool: &SqlitePool, user_id: i64, order_by: &str) -> Result<Vec<Product>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM products WHERE user_id = ? ORDER BY {}",
        SELECT_COLUMNS, order_by
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list products")?;

    Ok(rows.iter().map(row_to_product_sqlite).collect())
}

async fn update_details_sqlite(
    pool: &SqlitePool,
    id: i64,
    user_id: i64,
    name: &str,
    price: f64,
    stock: i64,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE products SET name = ?, price = ?, stock = ? WHERE id = ? AND user_id = ?",
    )
    .bind(name)
    .bind(price)
    .bind(stock)
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("Failed to update product")?;

    Ok(result.rows_affected())
}

async fn set_image_path_sqlite(
    pool: &SqlitePool,
    id: i64,
    user_id: i64,
    image_path: &str,
) -> Result<u64> {
    let result = sqlx::query("UPDATE products SET image_path = ? WHERE id = ? AND user_id = ?")
        .bind(image_path)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to update product image")?;

    Ok(result.rows_affected())
}

async fn delete_sqlite(pool: &SqlitePool, id: i64, user_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM products WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to delete product")?;

    Ok(result.rows_affected())
}

async fn reserve_stock_sqlite(pool: &SqlitePool, id: i64, user_id: i64, qty: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?
        WHERE id = ? AND user_id = ? AND stock >= ?
        "#,
    )
    .bind(qty)
    .bind(id)
    .bind(user_id)
    .bind(qty)
    .execute(pool)
    .await
    .context("Failed to reserve stock")?;

    Ok(result.rows_affected() == 1)
}

async fn restore_stock_sqlite(pool: &SqlitePool, id: i64, user_id: i64, qty: i64) -> Result<()> {
    sqlx::query("UPDATE products SET stock = stock + ? WHERE id = ? AND user_id = ?")
        .bind(qty)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to restore stock")?;

    Ok(())
}

async fn low_stock_sqlite(pool: &SqlitePool, user_id: i64, threshold: i64) -> Result<Vec<Product>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM products WHERE user_id = ? AND stock <= ? ORDER BY stock ASC",
        SELECT_COLUMNS
    ))
    .bind(user_id)
    .bind(threshold)
    .fetch_all(pool)
    .await
    .context("Failed to list low-stock products")?;

    Ok(rows.iter().map(row_to_product_sqlite).collect())
}

fn row_to_product_sqlite(row: &sqlx::sqlite::SqliteRow) -> Product {
    Product {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        price: row.get("price"),
        stock: row.get("stock"),
        image_path: row.get("image_path"),
        created_at: row.get("created_at"),
    }
}

// ============================================================================
// MySQL implementations
// ============================================================================

async fn create_mysql(pool: &MySqlPool, product: &Product) -> Result<Product> {
    let result = sqlx::query(
        r#"
        INSERT INTO products (user_id, name, price, stock, image_path, created_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(product.user_id)
    .bind(&product.name)
    .bind(product.price)
    .bind(product.stock)
    .bind(&product.image_path)
    .bind(product.created_at)
    .execute(pool)
    .await
    .context("Failed to create product")?;

    let mut created = product.clone();
    created.id = result.last_insert_id() as i64;
    Ok(created)
}

async fn get_for_user_mysql(pool: &MySqlPool, id: i64, user_id: i64) -> Result<Option<Product>> {
    let row = sqlx::query(&format!(
        "SELECT {} FROM products WHERE id = ? AND user_id = ?",
        SELECT_COLUMNS
    ))
    .bind(id)
    .bind(user_id)
    .fetch_optional(pool)
    .await
    .context("Failed to get product")?;

    Ok(row.map(|row| row_to_product_mysql(&row)))
}

async fn list_mysql(pool: &MySqlPool, user_id: i64, order_by: &str) -> Result<Vec<Product>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM products WHERE user_id = ? ORDER BY {}",
        SELECT_COLUMNS, order_by
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await
    .context("Failed to list products")?;

    Ok(rows.iter().map(row_to_product_mysql).collect())
}

async fn update_details_mysql(
    pool: &MySqlPool,
    id: i64,
    user_id: i64,
    name: &str,
    price: f64,
    stock: i64,
) -> Result<u64> {
    let result = sqlx::query(
        "UPDATE products SET name = ?, price = ?, stock = ? WHERE id = ? AND user_id = ?",
    )
    .bind(name)
    .bind(price)
    .bind(stock)
    .bind(id)
    .bind(user_id)
    .execute(pool)
    .await
    .context("Failed to update product")?;

    Ok(result.rows_affected())
}

async fn set_image_path_mysql(
    pool: &MySqlPool,
    id: i64,
    user_id: i64,
    image_path: &str,
) -> Result<u64> {
    let result = sqlx::query("UPDATE products SET image_path = ? WHERE id = ? AND user_id = ?")
        .bind(image_path)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to update product image")?;

    Ok(result.rows_affected())
}

async fn delete_mysql(pool: &MySqlPool, id: i64, user_id: i64) -> Result<u64> {
    let result = sqlx::query("DELETE FROM products WHERE id = ? AND user_id = ?")
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to delete product")?;

    Ok(result.rows_affected())
}

async fn reserve_stock_mysql(pool: &MySqlPool, id: i64, user_id: i64, qty: i64) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE products
        SET stock = stock - ?
        WHERE id = ? AND user_id = ? AND stock >= ?
        "#,
    )
    .bind(qty)
    .bind(id)
    .bind(user_id)
    .bind(qty)
    .execute(pool)
    .await
    .context("Failed to reserve stock")?;

    Ok(result.rows_affected() == 1)
}

async fn restore_stock_mysql(pool: &MySqlPool, id: i64, user_id: i64, qty: i64) -> Result<()> {
    sqlx::query("UPDATE products SET stock = stock + ? WHERE id = ? AND user_id = ?")
        .bind(qty)
        .bind(id)
        .bind(user_id)
        .execute(pool)
        .await
        .context("Failed to restore stock")?;

    Ok(())
}

async fn low_stock_mysql(pool: &MySqlPool, user_id: i64, threshold: i64) -> Result<Vec<Product>> {
    let rows = sqlx::query(&format!(
        "SELECT {} FROM products WHERE user_id = ? AND stock <= ? ORDER BY stock ASC",
        SELECT_COLUMNS
    ))
    .bind(user_id)
    .bind(threshold)
    .fetch_all(pool)
    .await
    .context("Failed to list low-stock products")?;

    Ok(rows.iter().map(row_to_product_mysql).collect())
}

fn row_to_product_mysql(row: &sqlx::mysql::MySqlRow) -> Product {
    Product {
        id: row.get("id"),
        user_id: row.get("user_id"),
        name: row.get("name"),
        price: row.get("price"),
        stock: row.get("stock"),
        image_path: row.get("image_path"),
        created_at: row.get("created_at"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;
    use crate::services::password::hash_password;

    async fn setup() -> (SqlxProductRepository, i64) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let users = SqlxUserRepository::new(pool.clone());
        let user = users
            .create(&User::new(
                "Seller".to_string(),
                "seller@example.com".to_string(),
                hash_password("pw").expect("Failed to hash"),
                None,
                None,
            ))
            .await
            .expect("Failed to create user");

        (SqlxProductRepository::new(pool), user.id)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (repo, user_id) = setup().await;

        let created = repo
            .create(&Product::new(user_id, "Enamel Mug".to_string(), 9.5, 24))
            .await
            .expect("Failed to create product");

        assert!(created.id > 0);

        let found = repo
            .get_for_user(created.id, user_id)
            .await
            .expect("Failed to get product")
            .expect("Product not found");
        assert_eq!(found.name, "Enamel Mug");
        assert_eq!(found.stock, 24);
    }

    #[tokio::test]
    async fn test_get_enforces_ownership() {
        let (repo, user_id) = setup().await;
        let created = repo
            .create(&Product::new(user_id, "Mug".to_string(), 9.5, 24))
            .await
            .expect("Failed to create product");

        let other = repo
            .get_for_user(created.id, user_id + 1)
            .await
            .expect("Failed to query");
        assert!(other.is_none());
    }

    #[tokio::test]
    async fn test_list_newest_first() {
        let (repo, user_id) = setup().await;
        repo.create(&Product::new(user_id, "First".to_string(), 1.0, 1))
            .await
            .expect("create");
        repo.create(&Product::new(user_id, "Second".to_string(), 2.0, 2))
            .await
            .expect("create");

        let products = repo.list_for_user(user_id).await.expect("Failed to list");
        assert_eq!(products.len(), 2);
        assert_eq!(products[0].name, "Second");
        assert_eq!(products[1].name, "First");
    }

    #[tokio::test]
    async fn test_list_by_name() {
        let (repo, user_id) = setup().await;
        repo.create(&Product::new(user_id, "Zebra Print".to_string(), 1.0, 1))
            .await
            .expect("create");
        repo.create(&Product::new(user_id, "Apron".to_string(), 2.0, 2))
            .await
            .expect("create");

        let products = repo
            .list_for_user_by_name(user_id)
            .await
            .expect("Failed to list");
        assert_eq!(products[0].name, "Apron");
        assert_eq!(products[1].name, "Zebra Print");
    }

    #[tokio::test]
    async fn test_update_details() {
        let (repo, user_id) = setup().await;
        let created = repo
            .create(&Product::new(user_id, "Mug".to_string(), 9.5, 24))
            .await
            .expect("create");

        let affected = repo
            .update_details(created.id, user_id, "Big Mug", 12.0, 30)
            .await
            .expect("Failed to update");
        assert_eq!(affected, 1);

        let found = repo
            .get_for_user(created.id, user_id)
            .await
            .expect("get")
            .expect("Product not found");
        assert_eq!(found.name, "Big Mug");
        assert_eq!(found.price, 12.0);
        assert_eq!(found.stock, 30);
    }

    #[tokio::test]
    async fn test_update_wrong_owner_is_noop() {
        let (repo, user_id) = setup().await;
        let created = repo
            .create(&Product::new(user_id, "Mug".to_string(), 9.5, 24))
            .await
            .expect("create");

        let affected = repo
            .update_details(created.id, user_id + 1, "Hacked", 0.0, 0)
            .await
            .expect("Failed to update");
        assert_eq!(affected, 0);
    }

    #[tokio::test]
    async fn test_delete() {
        let (repo, user_id) = setup().await;
        let created = repo
            .create(&Product::new(user_id, "Mug".to_string(), 9.5, 24))
            .await
            .expect("create");

        let affected = repo.delete(created.id, user_id).await.expect("delete");
        assert_eq!(affected, 1);

        let found = repo.get_for_user(created.id, user_id).await.expect("get");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_reserve_stock_success() {
        let (repo, user_id) = setup().await;
        let created = repo
            .create(&Product::new(user_id, "Mug".to_string(), 9.5, 10))
            .await
            .expect("create");

        let reserved = repo
            .reserve_stock(created.id, user_id, 3)
            .await
            .expect("reserve");
        assert!(reserved);

        let found = repo
            .get_for_user(created.id, user_id)
            .await
            .expect("get")
            .expect("Product not found");
        assert_eq!(found.stock, 7);
    }

    #[tokio::test]
    async fn test_reserve_stock_insufficient() {
        let (repo, user_id) = setup().await;
        let created = repo
            .create(&Product::new(user_id, "Mug".to_string(), 9.5, 2))
            .await
            .expect("create");

        let reserved = repo
            .reserve_stock(created.id, user_id, 3)
            .await
            .expect("reserve");
        assert!(!reserved);

        // Stock unchanged on a failed reservation
        let found = repo
            .get_for_user(created.id, user_id)
            .await
            .expect("get")
            .expect("Product not found");
        assert_eq!(found.stock, 2);
    }

    #[tokio::test]
    async fn test_reserve_stock_exact_amount() {
        let (repo, user_id) = setup().await;
        let created = repo
            .create(&Product::new(user_id, "Mug".to_string(), 9.5, 3))
            .await
            .expect("create");

        let reserved = repo
            .reserve_stock(created.id, user_id, 3)
            .await
            .expect("reserve");
        assert!(reserved);

        let found = repo
            .get_for_user(created.id, user_id)
            .await
            .expect("get")
            .expect("Product not found");
        assert_eq!(found.stock, 0);
    }

    #[tokio::test]
    async fn test_reserve_stock_wrong_owner() {
        let (repo, user_id) = setup().await;
        let created = repo
            .create(&Product::new(user_id, "Mug".to_string(), 9.5, 10))
            .await
            .expect("create");

        let reserved = repo
            .reserve_stock(created.id, user_id + 1, 3)
            .await
            .expect("reserve");
        assert!(!reserved);
    }

    #[tokio::test]
    async fn test_restore_stock() {
        let (repo, user_id) = setup().await;
        let created = repo
            .create(&Product::new(user_id, "Mug".to_string(), 9.5, 10))
            .await
            .expect("create");

        repo.reserve_stock(created.id, user_id, 4)
            .await
            .expect("reserve");
        repo.restore_stock(created.id, user_id, 4)
            .await
            .expect("restore");

        let found = repo
            .get_for_user(created.id, user_id)
            .await
            .expect("get")
            .expect("Product not found");
        assert_eq!(found.stock, 10);
    }

    #[tokio::test]
    async fn test_low_stock() {
        let (repo, user_id) = setup().await;
        repo.create(&Product::new(user_id, "Plenty".to_string(), 1.0, 50))
            .await
            .expect("create");
        repo.create(&Product::new(user_id, "Few".to_string(), 1.0, 3))
            .await
            .expect("create");
        repo.create(&Product::new(user_id, "Gone".to_string(), 1.0, 0))
            .await
            .expect("create");

        let low = repo.low_stock(user_id, 3).await.expect("low_stock");
        assert_eq!(low.len(), 2);
        assert_eq!(low[0].name, "Gone");
        assert_eq!(low[1].name, "Few");
    }
}
