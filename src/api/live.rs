//! Live selling endpoints
//!
//! The live page shows the active session (created on first visit), the
//! product picker and the session's orders. Order submissions and status
//! changes redirect back to the page; the page reload is the refresh
//! mechanism.

use axum::{
    extract::{Path, State},
    response::{Html, Redirect},
    Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::middleware::{AppError, AppState, CurrentUser};
use crate::models::CreateOrderInput;
use crate::services::LiveError;

/// Form body for POST /live/order/add
#[derive(Debug, Deserialize)]
pub struct AddOrderForm {
    pub customer_name: String,
    pub product_id: i64,
    pub qty: i64,
}

/// Form body for POST /live/order/{id}/status
#[derive(Debug, Deserialize)]
pub struct UpdateStatusForm {
    pub status: String,
}

/// GET /live
pub async fn live_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    let session = state
        .live_service
        .active_session(user.uid)
        .await?;

    let products = state
        .inventory_service
        .list_by_name(user.uid)
        .await?;

    let orders = state
        .live_service
        .orders_for_session(user.uid, session.id)
        .await?;

    let mut ctx = TeraContext::new();
    ctx.insert("session", &session);
    ctx.insert("products", &products);
    ctx.insert("orders", &orders);
    Ok(Html(state.templates.render("live.html", &ctx)?))
}

/// POST /live/order/add
pub async fn add_order(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Form(form): Form<AddOrderForm>,
) -> Result<Redirect, AppError> {
    let input = CreateOrderInput {
        customer_name: form.customer_name,
        product_id: form.product_id,
        qty: form.qty,
    };

    match state.live_service.place_order(user.uid, input).await {
        Ok(_) => Ok(Redirect::to("/live")),
        // Rejected orders leave stock untouched; back to the page
        Err(LiveError::EmptyCustomerName)
        | Err(LiveError::InvalidQuantity)
        | Err(LiveError::InsufficientStock)
        | Err(LiveError::ProductNotFound) => Ok(Redirect::to("/live")),
        Err(e) => Err(AppError::from(e)),
    }
}

/// POST /live/order/{id}/status
pub async fn update_order_status(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(order_id): Path<i64>,
    Form(form): Form<UpdateStatusForm>,
) -> Result<Redirect, AppError> {
    match state
        .live_service
        .set_status(user.uid, order_id, &form.status)
        .await
    {
        Ok(())
        | Err(LiveError::InvalidStatus(_))
        | Err(LiveError::OrderNotFound) => Ok(Redirect::to("/live")),
        Err(e) => Err(AppError::from(e)),
    }
}

/// POST /live/end
pub async fn end_live_session(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Redirect, AppError> {
    state
        .live_service
        .end_session(user.uid)
        .await?;

    Ok(Redirect::to("/live"))
}
