//! Live selling service
//!
//! The order/session state machine:
//!
//! - `active_session` resolves the user's open session, creating one when
//!   none exists (at most one session per user has no end timestamp).
//! - `place_order` reserves stock with a conditional decrement and inserts
//!   a PENDING order against the active session.
//! - `set_status` writes a new status; moving into CANCELLED from any other
//!   state returns the reserved stock exactly once.

use crate::db::repositories::{LiveSessionRepository, OrderRepository, ProductRepository};
use crate::models::{
    CreateOrderInput, LiveSession, Order, OrderStatus, OrderWithProduct, DEFAULT_SESSION_TITLE,
};
use anyhow::Context;
use chrono::Utc;
use std::str::FromStr;
use std::sync::Arc;

/// Error types for live selling operations
#[derive(Debug, thiserror::Error)]
pub enum LiveError {
    /// Customer name is empty after trimming
    #[error("Customer name cannot be empty")]
    EmptyCustomerName,

    /// Quantity must be positive
    #[error("Quantity must be greater than zero")]
    InvalidQuantity,

    /// Not enough stock to cover the order
    #[error("Insufficient stock")]
    InsufficientStock,

    /// Product not found (or owned by someone else)
    #[error("Product not found")]
    ProductNotFound,

    /// Order not found (or owned by someone else)
    #[error("Order not found")]
    OrderNotFound,

    /// Status string is not one of PENDING/PAID/CANCELLED
    #[error("Invalid order status: {0}")]
    InvalidStatus(String),

    /// Internal error
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}

/// Live selling service
pub struct LiveService {
    sessions: Arc<dyn LiveSessionRepository>,
    orders: Arc<dyn OrderRepository>,
    products: Arc<dyn ProductRepository>,
}

impl LiveService {
    /// Create a new live service with the given repositories
    pub fn new(
        sessions: Arc<dyn LiveSessionRepository>,
        orders: Arc<dyn OrderRepository>,
        products: Arc<dyn ProductRepository>,
    ) -> Self {
        Self {
            sessions,
            orders,
            products,
        }
    }

    /// Get the user's active session, creating one if none exists.
    ///
    /// This is the lookup-or-create that keeps "at most one active session
    /// per user" true: a new session is only ever created when no unended
    /// one is found.
    pub async fn active_session(&self, user_id: i64) -> Result<LiveSession, LiveError> {
        if let Some(session) = self
            .sessions
            .find_active(user_id)
            .await
            .context("Failed to look up active session")?
        {
            return Ok(session);
        }

        let session = self
            .sessions
            .create(&LiveSession::new(user_id, DEFAULT_SESSION_TITLE.to_string()))
            .await
            .context("Failed to create live session")?;

        tracing::info!(user_id, session_id = session.id, "Live session started");

        Ok(session)
    }

    /// End the user's active session, if any.
    ///
    /// Returns true when a session was actually ended. Ending is terminal;
    /// the next `active_session` call starts a fresh one.
    pub async fn end_session(&self, user_id: i64) -> Result<bool, LiveError> {
        let affected = self
            .sessions
            .end_active(user_id, Utc::now())
            .await
            .context("Failed to end live session")?;

        if affected > 0 {
            tracing::info!(user_id, "Live session ended");
        }

        Ok(affected > 0)
    }

    /// Place an order against the user's active session.
    ///
    /// Stock is reserved with a conditional decrement before the order row
    /// is inserted, so two concurrent submissions can never oversell. The
    /// order starts as PENDING.
    pub async fn place_order(
        &self,
        user_id: i64,
        input: CreateOrderInput,
    ) -> Result<Order, LiveError> {
        let customer_name = input.customer_name.trim().to_string();
        if customer_name.is_empty() {
            return Err(LiveError::EmptyCustomerName);
        }

        if input.qty <= 0 {
            return Err(LiveError::InvalidQuantity);
        }

        let session = self.active_session(user_id).await?;

        let product = self
            .products
            .get_for_user(input.product_id, user_id)
            .await
            .context("Failed to look up product")?
            .ok_or(LiveError::ProductNotFound)?;

        let reserved = self
            .products
            .reserve_stock(product.id, user_id, input.qty)
            .await
            .context("Failed to reserve stock")?;

        if !reserved {
            return Err(LiveError::InsufficientStock);
        }

        let order = Order::new(user_id, session.id, product.id, customer_name, input.qty);

        match self.orders.create(&order).await {
            Ok(created) => {
                tracing::debug!(
                    user_id,
                    order_id = created.id,
                    product_id = product.id,
                    qty = created.qty,
                    "Order placed"
                );
                Ok(created)
            }
            Err(e) => {
                // Roll the reservation back so the stock isn't lost
                if let Err(restore_err) = self
                    .products
                    .restore_stock(product.id, user_id, input.qty)
                    .await
                {
                    tracing::error!(
                        user_id,
                        product_id = product.id,
                        "Failed to restore stock after order insert failure: {}",
                        restore_err
                    );
                }
                Err(LiveError::InternalError(
                    e.context("Failed to insert order"),
                ))
            }
        }
    }

    /// Update an order's status.
    ///
    /// Moving into CANCELLED from a non-cancelled state restores the
    /// product's stock by the order's quantity; the conditional UPDATE in
    /// the repository guarantees the restore fires at most once. Every
    /// other transition (including back out of CANCELLED) is a bare field
    /// write with no stock side effect.
    pub async fn set_status(
        &self,
        user_id: i64,
        order_id: i64,
        status: &str,
    ) -> Result<(), LiveError> {
        let status = OrderStatus::from_str(status)
            .map_err(|_| LiveError::InvalidStatus(status.to_string()))?;

        let order = self
            .orders
            .get_for_user(order_id, user_id)
            .await
            .context("Failed to look up order")?
            .ok_or(LiveError::OrderNotFound)?;

        if status == OrderStatus::Cancelled {
            let affected = self
                .orders
                .cancel(order_id, user_id)
                .await
                .context("Failed to cancel order")?;

            if affected > 0 {
                self.products
                    .restore_stock(order.product_id, user_id, order.qty)
                    .await
                    .context("Failed to restore stock")?;
                tracing::debug!(user_id, order_id, qty = order.qty, "Order cancelled, stock restored");
            }
        } else {
            self.orders
                .update_status(order_id, user_id, status)
                .await
                .context("Failed to update order status")?;
        }

        Ok(())
    }

    /// List a session's orders joined with their products, newest first
    pub async fn orders_for_session(
        &self,
        user_id: i64,
        session_id: i64,
    ) -> Result<Vec<OrderWithProduct>, LiveError> {
        Ok(self
            .orders
            .list_for_session(session_id, user_id)
            .await
            .context("Failed to list session orders")?)
    }
}
