//! API middleware
//!
//! Contains:
//! - `AppState`, the shared service container
//! - The authentication middleware: the signed session cookie is verified
//!   and the identity stored in request extensions; anything unauthenticated
//!   is redirected to /login
//! - `AppError`, the catch-all 500 wrapper for handler errors

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, StatusCode},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use crate::config::UploadConfig;
use crate::services::session::{SessionKey, SessionUser, SESSION_COOKIE};
use crate::services::{InventoryService, LiveService, SummaryService, UserService};
use crate::templates::TemplateEngine;

/// Application state containing shared services
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<UserService>,
    pub inventory_service: Arc<InventoryService>,
    pub live_service: Arc<LiveService>,
    pub summary_service: Arc<SummaryService>,
    pub session_key: Arc<SessionKey>,
    pub templates: Arc<TemplateEngine>,
    pub upload_config: Arc<UploadConfig>,
}

/// Authenticated user extracted from the session cookie
#[derive(Debug, Clone)]
pub struct CurrentUser(pub SessionUser);

/// Catch-all error for handlers: logged, rendered as a bare 500.
///
/// Validation and not-found cases are handled per-route (re-render or
/// redirect); only genuinely unexpected failures end up here.
#[derive(Debug)]
pub struct AppError(anyhow::Error);

impl<E> From<E> for AppError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        tracing::error!("Request failed: {:#}", self.0);
        (StatusCode::INTERNAL_SERVER_ERROR, "Something went wrong").into_response()
    }
}

/// Extract the session token from the request's Cookie header
fn extract_session_token(headers: &axum::http::HeaderMap) -> Option<String> {
    let cookie_str = headers.get(header::COOKIE)?.to_str().ok()?;

    for cookie in cookie_str.split(';') {
        if let Some((name, value)) = cookie.trim().split_once('=') {
            if name == SESSION_COOKIE {
                return Some(value.to_string());
            }
        }
    }

    None
}

/// Authentication middleware.
///
/// Verifies the signed session cookie and stores the identity in request
/// extensions. Unauthenticated requests are redirected to the login page.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, Redirect> {
    let token = extract_session_token(request.headers())
        .ok_or_else(|| Redirect::to("/login"))?;

    let session = state
        .session_key
        .verify(&token)
        .ok_or_else(|| Redirect::to("/login"))?;

    request.extensions_mut().insert(CurrentUser(session));
    Ok(next.run(request).await)
}

// Extractor for CurrentUser from request extensions
impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| Redirect::to("/login"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_session_token() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(
            header::COOKIE,
            "theme=dark; session=abc.def; lang=en".parse().unwrap(),
        );

        assert_eq!(extract_session_token(&headers).as_deref(), Some("abc.def"));
    }

    #[test]
    fn test_extract_session_token_missing() {
        let mut headers = axum::http::HeaderMap::new();
        headers.insert(header::COOKIE, "theme=dark".parse().unwrap());

        assert!(extract_session_token(&headers).is_none());
        assert!(extract_session_token(&axum::http::HeaderMap::new()).is_none());
    }
}
