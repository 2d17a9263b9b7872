//! API layer - HTTP handlers and routing
//!
//! Server-rendered HTML endpoints:
//! - Auth: login/register/logout
//! - Inventory: product CRUD and image upload
//! - Live: active session, order entry, status changes
//! - Summary: sales aggregates and CSV export
//!
//! Everything except the auth pages sits behind the session-cookie
//! middleware, which redirects unauthenticated requests to /login.

pub mod auth;
pub mod inventory;
pub mod live;
pub mod middleware;
pub mod summary;

use axum::{
    extract::State,
    middleware as axum_middleware,
    response::Html,
    routing::{get, post},
    Router,
};
use std::path::Path;
use tera::Context as TeraContext;
use tower::ServiceBuilder;
use tower_http::{compression::CompressionLayer, services::ServeDir, trace::TraceLayer};

pub use middleware::{AppError, AppState, CurrentUser};

/// GET / - the dashboard
async fn dashboard(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> Result<Html<String>, AppError> {
    let mut ctx = TeraContext::new();
    ctx.insert("user", &user.name);
    Ok(Html(state.templates.render("dashboard.html", &ctx)?))
}

/// Build the complete router with middleware
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    let protected = Router::new()
        .route("/", get(dashboard))
        .route("/inventory", get(inventory::inventory_page))
        .route("/inventory/add", post(inventory::add_product))
        .route("/inventory/{id}/edit", post(inventory::edit_product))
        .route("/inventory/{id}/delete", post(inventory::delete_product))
        .route("/inventory/{id}/image", post(inventory::update_product_image))
        .route("/live", get(live::live_page))
        .route("/live/order/add", post(live::add_order))
        .route("/live/order/{id}/status", post(live::update_order_status))
        .route("/live/end", post(live::end_live_session))
        .route("/summary", get(summary::summary_page))
        .route("/summary/export.csv", get(summary::export_csv))
        .route_layer(axum_middleware::from_fn_with_state(
            state.clone(),
            middleware::require_auth,
        ));

    Router::new()
        .merge(protected)
        .route("/login", get(auth::login_page).post(auth::login))
        .route("/register", get(auth::register_page).post(auth::register))
        .route("/logout", get(auth::logout))
        .nest_service("/static", ServeDir::new(static_dir))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(CompressionLayer::new()),
        )
        .with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::repositories::{
        SqlxLiveSessionRepository, SqlxOrderRepository, SqlxProductRepository, SqlxUserRepository,
    };
    use crate::db::{create_test_pool, migrations};
    use crate::services::session::SessionKey;
    use crate::services::{InventoryService, LiveService, SummaryService, UserService};
    use crate::templates::TemplateEngine;
    use axum::http::StatusCode;
    use axum_test::multipart::MultipartForm;
    use axum_test::{TestServer, TestServerConfig};
    use std::sync::Arc;

    async fn test_server() -> (TestServer, tempfile::TempDir) {
        let pool = create_test_pool().await.expect("Failed to create test pool");
        migrations::run_migrations(&pool)
            .await
            .expect("Failed to run migrations");

        let upload_dir = tempfile::tempdir().expect("Failed to create upload dir");

        let user_repo = SqlxUserRepository::shared(pool.clone());
        let product_repo = SqlxProductRepository::shared(pool.clone());
        let session_repo = SqlxLiveSessionRepository::shared(pool.clone());
        let order_repo = SqlxOrderRepository::shared(pool.clone());

        let state = AppState {
            user_service: Arc::new(UserService::new(user_repo)),
            inventory_service: Arc::new(InventoryService::new(product_repo.clone())),
            live_service: Arc::new(LiveService::new(
                session_repo,
                order_repo.clone(),
                product_repo.clone(),
            )),
            summary_service: Arc::new(SummaryService::new(order_repo, product_repo)),
            session_key: Arc::new(SessionKey::new("test-secret")),
            templates: Arc::new(
                TemplateEngine::new(Path::new("templates")).expect("Failed to load templates"),
            ),
            upload_config: Arc::new(crate::config::UploadConfig {
                path: upload_dir.path().to_path_buf(),
                ..Default::default()
            }),
        };

        let app = build_router(state, Path::new("static"));

        let config = TestServerConfig {
            save_cookies: true,
            ..Default::default()
        };
        let server = TestServer::new_with_config(app, config).expect("Failed to start test server");

        (server, upload_dir)
    }

    async fn register(server: &TestServer) {
        let response = server
            .post("/register")
            .form(&[
                ("full_name", "Maria Cruz"),
                ("email", "maria@example.com"),
                ("password", "sampaguita"),
                ("business_name", "Maria's Finds"),
                ("phone", ""),
            ])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_protected_routes_redirect_to_login() {
        let (server, _dir) = test_server().await;

        for path in ["/", "/inventory", "/live", "/summary", "/summary/export.csv"] {
            let response = server.get(path).await;
            response.assert_status(StatusCode::SEE_OTHER);
            assert_eq!(
                response.headers().get("location").unwrap(),
                "/login",
                "{} should redirect to login",
                path
            );
        }
    }

    #[tokio::test]
    async fn test_login_page_renders() {
        let (server, _dir) = test_server().await;

        let response = server.get("/login").await;
        response.assert_status_ok();
        assert!(response.text().contains("Log in"));
    }

    #[tokio::test]
    async fn test_register_logs_in_and_dashboard_greets() {
        let (server, _dir) = test_server().await;

        register(&server).await;

        let response = server.get("/").await;
        response.assert_status_ok();
        assert!(response.text().contains("Maria Cruz"));
    }

    #[tokio::test]
    async fn test_login_with_wrong_credentials_rerenders() {
        let (server, _dir) = test_server().await;
        register(&server).await;

        let response = server
            .post("/login")
            .form(&[("email", "maria@example.com"), ("password", "wrong")])
            .await;

        response.assert_status_ok();
        assert!(response.text().contains("Invalid credentials."));
    }

    #[tokio::test]
    async fn test_login_after_logout() {
        let (server, _dir) = test_server().await;
        register(&server).await;

        let response = server.get("/logout").await;
        response.assert_status(StatusCode::SEE_OTHER);

        // Logged out: the dashboard bounces us
        let response = server.get("/").await;
        response.assert_status(StatusCode::SEE_OTHER);

        let response = server
            .post("/login")
            .form(&[("email", "maria@example.com"), ("password", "sampaguita")])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let response = server.get("/").await;
        response.assert_status_ok();
    }

    #[tokio::test]
    async fn test_tampered_cookie_is_rejected() {
        let (server, _dir) = test_server().await;

        let response = server
            .get("/inventory")
            .add_header(
                axum::http::header::COOKIE,
                axum::http::HeaderValue::from_static("session=forged.token"),
            )
            .await;
        response.assert_status(StatusCode::SEE_OTHER);
    }

    #[tokio::test]
    async fn test_inventory_add_and_list() {
        let (server, _dir) = test_server().await;
        register(&server).await;

        let form = MultipartForm::new()
            .add_text("name", "Enamel Mug")
            .add_text("price", "9.50")
            .add_text("stock", "24");
        let response = server.post("/inventory/add").multipart(form).await;
        response.assert_status(StatusCode::SEE_OTHER);

        let response = server.get("/inventory").await;
        response.assert_status_ok();
        let body = response.text();
        assert!(body.contains("Enamel Mug"));
        assert!(body.contains("24"));
    }

    #[tokio::test]
    async fn test_live_order_flow() {
        let (server, _dir) = test_server().await;
        register(&server).await;

        let form = MultipartForm::new()
            .add_text("name", "Enamel Mug")
            .add_text("price", "9.50")
            .add_text("stock", "10");
        server.post("/inventory/add").multipart(form).await;

        // Visiting the live page opens a session
        let response = server.get("/live").await;
        response.assert_status_ok();

        // The product picker has id 1 (first row in a fresh database)
        let response = server
            .post("/live/order/add")
            .form(&[("customer_name", "Ana"), ("product_id", "1"), ("qty", "3")])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let response = server.get("/live").await;
        let body = response.text();
        assert!(body.contains("Ana"));
        assert!(body.contains("7 left")); // 10 - 3

        // Cancel the order: stock comes back
        let response = server
            .post("/live/order/1/status")
            .form(&[("status", "CANCELLED")])
            .await;
        response.assert_status(StatusCode::SEE_OTHER);

        let response = server.get("/live").await;
        assert!(response.text().contains("10 left"));
    }

    #[tokio::test]
    async fn test_end_session_clears_orders() {
        let (server, _dir) = test_server().await;
        register(&server).await;

        let form = MultipartForm::new()
            .add_text("name", "Mug")
            .add_text("price", "1.00")
            .add_text("stock", "5");
        server.post("/inventory/add").multipart(form).await;

        server
            .post("/live/order/add")
            .form(&[("customer_name", "Ana"), ("product_id", "1"), ("qty", "1")])
            .await;

        let response = server.post("/live/end").await;
        response.assert_status(StatusCode::SEE_OTHER);

        // Fresh session, no orders listed
        let response = server.get("/live").await;
        assert!(response.text().contains("No orders in this session yet."));
    }

    #[tokio::test]
    async fn test_summary_and_csv_export() {
        let (server, _dir) = test_server().await;
        register(&server).await;

        let form = MultipartForm::new()
            .add_text("name", "Mug")
            .add_text("price", "9.50")
            .add_text("stock", "100");
        server.post("/inventory/add").multipart(form).await;

        server
            .post("/live/order/add")
            .form(&[("customer_name", "Ana"), ("product_id", "1"), ("qty", "2")])
            .await;
        server
            .post("/live/order/1/status")
            .form(&[("status", "PAID")])
            .await;

        let response = server.get("/summary").await;
        response.assert_status_ok();
        assert!(response.text().contains("19")); // 2 × 9.50 revenue

        let response = server.get("/summary/export.csv").await;
        response.assert_status_ok();
        assert!(response
            .headers()
            .get("content-type")
            .unwrap()
            .to_str()
            .unwrap()
            .starts_with("text/csv"));
        let csv = response.text();
        assert!(csv.starts_with(
            "order_id,customer_name,product,qty,unit_price,status,line_total,created_at"
        ));
        assert!(csv.contains("Ana,Mug,2,9.50,PAID,19.00"));
    }
}
