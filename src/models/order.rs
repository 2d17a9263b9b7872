//! Order model
//!
//! An order records a customer claim against a product during a live
//! session. Creating an order reserves stock; cancelling it returns the
//! reserved stock exactly once.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Order entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Unique identifier
    pub id: i64,
    /// Owning user (the seller)
    pub user_id: i64,
    /// Live session the order was taken in
    pub session_id: i64,
    /// Ordered product
    pub product_id: i64,
    /// Customer name as called out during the stream
    pub customer_name: String,
    /// Ordered quantity (always > 0)
    pub qty: i64,
    /// Current lifecycle status
    pub status: OrderStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Order {
    /// Create a new pending order.
    pub fn new(
        user_id: i64,
        session_id: i64,
        product_id: i64,
        customer_name: String,
        qty: i64,
    ) -> Self {
        Self {
            id: 0, // Will be set by the database
            user_id,
            session_id,
            product_id,
            customer_name,
            qty,
            status: OrderStatus::Pending,
            created_at: Utc::now(),
        }
    }
}

/// Order lifecycle status.
///
/// PENDING is the initial state. Moving into CANCELLED from a non-cancelled
/// state restores the reserved stock; every other transition is a bare
/// field write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OrderStatus {
    /// Awaiting payment
    Pending,
    /// Payment received
    Paid,
    /// Cancelled, stock returned
    Cancelled,
}

impl Default for OrderStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderStatus::Pending => write!(f, "PENDING"),
            OrderStatus::Paid => write!(f, "PAID"),
            OrderStatus::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

impl FromStr for OrderStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PENDING" => Ok(OrderStatus::Pending),
            "PAID" => Ok(OrderStatus::Paid),
            "CANCELLED" => Ok(OrderStatus::Cancelled),
            _ => Err(anyhow::anyhow!("Invalid order status: {}", s)),
        }
    }
}

/// An order joined with the product it was placed against.
///
/// Used by the live page listing and the CSV export, both of which need the
/// product name and unit price next to the order fields.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithProduct {
    #[serde(flatten)]
    pub order: Order,
    /// Product name at query time
    pub product_name: String,
    /// Product unit price at query time
    pub unit_price: f64,
}

impl OrderWithProduct {
    /// qty × unit price for this order/product pair.
    pub fn line_total(&self) -> f64 {
        self.order.qty as f64 * self.unit_price
    }
}

/// Input for placing an order during a live session
#[derive(Debug, Clone)]
pub struct CreateOrderInput {
    pub customer_name: String,
    pub product_id: i64,
    pub qty: i64,
}
