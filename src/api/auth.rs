//! Authentication endpoints
//!
//! Handles the login/register/logout pages and their form submissions.
//! Validation failures re-render the form with a user-facing message;
//! successful logins set the signed session cookie and redirect to the
//! dashboard.

use axum::{
    extract::State,
    http::{header, HeaderMap, HeaderValue},
    response::{Html, IntoResponse, Redirect, Response},
    Form,
};
use serde::Deserialize;
use tera::Context as TeraContext;

use crate::api::middleware::{AppError, AppState};
use crate::models::RegisterInput;
use crate::services::session::{SESSION_COOKIE, SESSION_TTL_SECONDS};
use crate::services::UserServiceError;

/// Form body for POST /login
#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub email: String,
    pub password: String,
}

/// Form body for POST /register
#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub business_name: Option<String>,
    pub phone: Option<String>,
}

/// GET /login
pub async fn login_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    render_auth_page(&state, "login.html", None)
}

/// POST /login
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Response, AppError> {
    match state.user_service.login(&form.email, &form.password).await {
        Ok(user) => {
            let token = state.session_key.sign(&user);
            Ok((session_cookie_headers(&token), Redirect::to("/")).into_response())
        }
        Err(UserServiceError::InvalidCredentials) => Ok(render_auth_page(
            &state,
            "login.html",
            Some("Invalid credentials."),
        )?
        .into_response()),
        Err(UserServiceError::ValidationError(msg)) => {
            Ok(render_auth_page(&state, "login.html", Some(&msg))?.into_response())
        }
        Err(e) => Err(AppError::from(e)),
    }
}

/// GET /register
pub async fn register_page(State(state): State<AppState>) -> Result<Html<String>, AppError> {
    render_auth_page(&state, "register.html", None)
}

/// POST /register
pub async fn register(
    State(state): State<AppState>,
    Form(form): Form<RegisterForm>,
) -> Result<Response, AppError> {
    let input = RegisterInput {
        full_name: form.full_name,
        email: form.email,
        password: form.password,
        business_name: form.business_name,
        phone: form.phone,
    };

    match state.user_service.register(input).await {
        Ok(user) => {
            // Log the fresh account straight in
            let token = state.session_key.sign(&user);
            Ok((session_cookie_headers(&token), Redirect::to("/")).into_response())
        }
        Err(UserServiceError::ValidationError(msg)) => {
            Ok(render_auth_page(&state, "register.html", Some(&msg))?.into_response())
        }
        Err(UserServiceError::EmailTaken(_)) => Ok(render_auth_page(
            &state,
            "register.html",
            Some("Email is already registered."),
        )?
        .into_response()),
        Err(e) => Err(AppError::from(e)),
    }
}

/// GET /logout
pub async fn logout() -> Response {
    // Expire the cookie immediately
    let cookie = format!(
        "{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0",
        SESSION_COOKIE
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("static cookie string"),
    );

    (headers, Redirect::to("/login")).into_response()
}

fn session_cookie_headers(token: &str) -> HeaderMap {
    let cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, SESSION_TTL_SECONDS
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::SET_COOKIE,
        HeaderValue::from_str(&cookie).expect("cookie value is ascii"),
    );
    headers
}

fn render_auth_page(
    state: &AppState,
    template: &str,
    error: Option<&str>,
) -> Result<Html<String>, AppError> {
    let mut ctx = TeraContext::new();
    ctx.insert("error", &error);
    Ok(Html(state.templates.render(template, &ctx)?))
}
