//! Inventory service
//!
//! Business logic for the product inventory: listing, adding, editing and
//! deleting products, and swapping product images. File storage itself
//! happens in the API layer; this service only tracks the stored path.

use crate::db::repositories::ProductRepository;
use crate::models::{CreateProductInput, Product, UpdateProductInput};
use anyhow::Context;
use std::sync::Arc;

/// Error types for inventory operations
#[derive(Debug, thiserror::Error)]
pub enum InventoryError {
    /// Validation error (invalid input)
    #[error("Validation error: {0}")]
    ValidationError(String),

    /// Product not found (or owned by someone else)
    #[error("Product not found")]
    NotFound,

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Inventory service for product management
pub struct InventoryService {
    products: Arc<dyn ProductRepository>,
}

impl InventoryService {
    /// Create a new inventory service with the given repository
    pub fn new(products: Arc<dyn ProductRepository>) -> Self {
        Self { products }
    }

    /// List the user's products, newest first (inventory page order)
    pub async fn list(&self, user_id: i64) -> Result<Vec<Product>, InventoryError> {
        Ok(self
            .products
            .list_for_user(user_id)
            .await
            .context("Failed to list products")?)
    }

    /// List the user's products by name (live page picker order)
    pub async fn list_by_name(&self, user_id: i64) -> Result<Vec<Product>, InventoryError> {
        Ok(self
            .products
            .list_for_user_by_name(user_id)
            .await
            .context("Failed to list products")?)
    }

    /// Get one product, scoped to its owner
    pub async fn product(&self, user_id: i64, id: i64) -> Result<Product, InventoryError> {
        self.products
            .get_for_user(id, user_id)
            .await
            .context("Failed to get product")?
            .ok_or(InventoryError::NotFound)
    }

    /// Add a product to the inventory
    pub async fn add(
        &self,
        user_id: i64,
        input: CreateProductInput,
    ) -> Result<Product, InventoryError> {
        let name = validate_details(&input.name, input.price, input.stock)?;

        let mut product = Product::new(user_id, name, input.price, input.stock);
        product.image_path = input.image_path;

        let created = self
            .products
            .create(&product)
            .await
            .context("Failed to create product")?;

        tracing::debug!(user_id, product_id = created.id, "Product added");

        Ok(created)
    }

    /// Edit a product's name, price and stock
    pub async fn edit(
        &self,
        user_id: i64,
        id: i64,
        input: UpdateProductInput,
    ) -> Result<(), InventoryError> {
        let name = validate_details(&input.name, input.price, input.stock)?;

        let affected = self
            .products
            .update_details(id, user_id, &name, input.price, input.stock)
            .await
            .context("Failed to update product")?;

        if affected == 0 {
            return Err(InventoryError::NotFound);
        }

        Ok(())
    }

    /// Delete a product
    pub async fn delete(&self, user_id: i64, id: i64) -> Result<(), InventoryError> {
        let affected = self
            .products
            .delete(id, user_id)
            .await
            .context("Failed to delete product")?;

        if affected == 0 {
            return Err(InventoryError::NotFound);
        }

        Ok(())
    }

    /// Point a product at a newly stored image.
    ///
    /// Returns the previous image path, if any, so the caller can delete the
    /// file that is no longer referenced.
    pub async fn replace_image(
        &self,
        user_id: i64,
        id: i64,
        new_path: &str,
    ) -> Result<Option<String>, InventoryError> {
        let existing = self.product(user_id, id).await?;

        self.products
            .set_image_path(id, user_id, new_path)
            .await
            .context("Failed to update product image")?;

        Ok(existing.image_path)
    }
}

fn validate_details(name: &str, price: f64, stock: i64) -> Result<String, InventoryError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(InventoryError::ValidationError(
            "Product name cannot be empty.".to_string(),
        ));
    }

    if !price.is_finite() || price < 0.0 {
        return Err(InventoryError::ValidationError(
            "Price must be zero or positive.".to_string(),
        ));
    }

    if stock < 0 {
        return Err(InventoryError::ValidationError(
            "Stock must be zero or positive.".to_string(),
        ));
    }

    Ok(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{SqlxProductRepository, SqlxUserRepository, UserRepository};
    use crate::db::{create_test_pool, migrations};
    use crate::models::User;
    use crate::services::password::hash_password;

    async fn setup() -> (InventoryService, i64) {
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

        (
            InventoryService::new(SqlxProductRepository::shared(pool)),
            user.id,
        )
    }

    fn mug(image_path: Option<&str>) -> CreateProductInput {
        CreateProductInput {
            name: "Enamel Mug".to_string(),
            price: 9.5,
            stock: 24,
            image_path: image_path.map(String::from),
        }
    }

    #[tokio::test]
    async fn test_add_and_list() {
        let (service, user_id) = setup().await;

        let created = service.add(user_id, mug(None)).await.expect("add");
        assert!(created.id > 0);

        let products = service.list(user_id).await.expect("list");
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "Enamel Mug");
    }

    #[tokio::test]
    async fn test_add_trims_name() {
        let (service, user_id) = setup().await;

        let mut input = mug(None);
        input.name = "  Enamel Mug  ".to_string();

        let created = service.add(user_id, input).await.expect("add");
        assert_eq!(created.name, "Enamel Mug");
    }

    #[tokio::test]
    async fn test_add_rejects_bad_input() {
        let (service, user_id) = setup().await;

        let mut empty_name = mug(None);
        empty_name.name = "  ".to_string();
        assert!(matches!(
            service.add(user_id, empty_name).await,
            Err(InventoryError::ValidationError(_))
        ));

        let mut negative_price = mug(None);
        negative_price.price = -1.0;
        assert!(matches!(
            service.add(user_id, negative_price).await,
            Err(InventoryError::ValidationError(_))
        ));

        let mut negative_stock = mug(None);
        negative_stock.stock = -5;
        assert!(matches!(
            service.add(user_id, negative_stock).await,
            Err(InventoryError::ValidationError(_))
        ));
    }

    #[tokio::test]
    async fn test_edit() {
        let (service, user_id) = setup().await;
        let created = service.add(user_id, mug(None)).await.expect("add");

        service
            .edit(
                user_id,
                created.id,
                UpdateProductInput {
                    name: "Big Mug".to_string(),
                    price: 12.0,
                    stock: 30,
                },
            )
            .await
            .expect("edit");

        let product = service.product(user_id, created.id).await.expect("get");
        assert_eq!(product.name, "Big Mug");
        assert_eq!(product.stock, 30);
    }

    #[tokio::test]
    async fn test_edit_unknown_product() {
        let (service, user_id) = setup().await;

        let result = service
            .edit(
                user_id,
                999,
                UpdateProductInput {
                    name: "Ghost".to_string(),
                    price: 1.0,
                    stock: 1,
                },
            )
            .await;
        assert!(matches!(result, Err(InventoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_delete() {
        let (service, user_id) = setup().await;
        let created = service.add(user_id, mug(None)).await.expect("add");

        service.delete(user_id, created.id).await.expect("delete");

        let result = service.product(user_id, created.id).await;
        assert!(matches!(result, Err(InventoryError::NotFound)));
    }

    #[tokio::test]
    async fn test_replace_image_returns_old_path() {
        let (service, user_id) = setup().await;
        let created = service
            .add(user_id, mug(Some("/static/uploads/old.jpg")))
            .await
            .expect("add");

        let old = service
            .replace_image(user_id, created.id, "/static/uploads/new.jpg")
            .await
            .expect("replace");
        assert_eq!(old.as_deref(), Some("/static/uploads/old.jpg"));

        let product = service.product(user_id, created.id).await.expect("get");
        assert_eq!(product.image_path.as_deref(), Some("/static/uploads/new.jpg"));
    }

    #[tokio::test]
    async fn test_replace_image_first_time() {
        let (service, user_id) = setup().await;
        let created = service.add(user_id, mug(None)).await.expect("add");

        let old = service
            .replace_image(user_id, created.id, "/static/uploads/new.jpg")
            .await
            .expect("replace");
        assert!(old.is_none());
    }

    #[tokio::test]
    async fn test_ownership_enforced() {
        let (service, user_id) = setup().await;
        let created = service.add(user_id, mug(None)).await.expect("add");

        let stranger = user_id + 1;
        assert!(matches!(
            service.product(stranger, created.id).await,
            Err(InventoryError::NotFound)
        ));
        assert!(matches!(
            service.delete(stranger, created.id).await,
            Err(InventoryError::NotFound)
        ));
    }
}
