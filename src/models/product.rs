//! Product model
//!
//! A product is a sellable inventory item owned by one user. Stock must stay
//! non-negative under valid transitions; the repository enforces this with a
//! conditional decrement.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Product entity representing an inventory item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    /// Unique identifier
    pub id: i64,
    /// Owning user
    pub user_id: i64,
    /// Product name
    pub name: String,
    /// Unit price
    pub price: f64,
    /// Units currently in stock
    pub stock: i64,
    /// URL path of the product image under the static directory, if any
    pub image_path: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// Create a new Product with the given parameters.
    pub fn new(user_id: i64, name: String, price: f64, stock: i64) -> Self {
        Self {
            id: 0, // Will be set by the database
            user_id,
            name,
            price,
            stock,
            image_path: None,
            created_at: Utc::now(),
        }
    }
}

/// Input for adding a product to the inventory
#[derive(Debug, Clone)]
pub struct CreateProductInput {
    pub name: String,
    pub price: f64,
    pub stock: i64,
    /// URL path of an already-stored image, if one was uploaded
    pub image_path: Option<String>,
}

/// Input for editing a product's details
#[derive(Debug, Clone)]
pub struct UpdateProductInput {
    pub name: String,
    pub price: f64,
    pub stock: i64,
}
