//! Summary endpoints
//!
//! The sales summary page and the CSV export download.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Response},
};
use chrono::Utc;
use tera::Context as TeraContext;

use crate::api::middleware::{AppError, AppState, CurrentUser};

/// GET /summary
pub async fn summary_page(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    let summary = state.summary_service.overview(user.uid).await?;

    let mut ctx = TeraContext::new();
    ctx.insert("summary", &summary);
    Ok(Html(state.templates.render("summary.html", &ctx)?))
}

/// GET /summary/export.csv
pub async fn export_csv(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Response, AppError> {
    let csv = state.summary_service.export_csv(user.uid).await?;

    let filename = format!(
        "livesell_orders_{}.csv",
        Utc::now().format("%Y%m%d_%H%M%S")
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/csv; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{}\"", filename))
            .map_err(|e| anyhow::anyhow!("Invalid header value: {}", e))?,
    );

    Ok((headers, csv).into_response())
}
