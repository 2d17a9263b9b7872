//! Livesell - A lightweight livestream-selling order manager

use anyhow::{ensure, Result};
use std::path::Path;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use livesell::{
    api::{self, AppState},
    config::Config,
    db::{
        self,
        repositories::{
            SqlxLiveSessionRepository, SqlxOrderRepository, SqlxProductRepository,
            SqlxUserRepository,
        },
    },
    services::{
        session::SessionKey, InventoryService, LiveService, SummaryService, UserService,
    },
    templates::TemplateEngine,
};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "livesell=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Livesell...");

    // Load configuration
    let config = Config::load_with_env(Path::new("config.yml"))?;
    ensure!(
        !config.session.secret.is_empty(),
        "Session secret missing: set session.secret in config.yml or LIVESELL_SESSION_SECRET"
    );
    tracing::info!("Configuration loaded");

    // Initialize database
    let pool = db::create_pool(&config.database).await?;
    tracing::info!("Database connected: {:?}", config.database.driver);

    // Run migrations
    db::migrations::run_migrations(&pool).await?;
    tracing::info!("Database migrations completed");

    // Create repositories
    let user_repo = SqlxUserRepository::shared(pool.clone());
    let product_repo = SqlxProductRepository::shared(pool.clone());
    let session_repo = SqlxLiveSessionRepository::shared(pool.clone());
    let order_repo = SqlxOrderRepository::shared(pool.clone());

    // Initialize services
    let user_service = Arc::new(UserService::new(user_repo));
    let inventory_service = Arc::new(InventoryService::new(product_repo.clone()));
    let live_service = Arc::new(LiveService::new(
        session_repo,
        order_repo.clone(),
        product_repo.clone(),
    ));
    let summary_service = Arc::new(SummaryService::new(order_repo, product_repo));

    // Initialize template engine
    let templates = TemplateEngine::new(&config.templates.path)?;
    tracing::info!("Templates loaded from {:?}", config.templates.path);

    // Build application state
    let state = AppState {
        user_service,
        inventory_service,
        live_service,
        summary_service,
        session_key: Arc::new(SessionKey::new(&config.session.secret)),
        templates: Arc::new(templates),
        upload_config: Arc::new(config.upload.clone()),
    };

    // Build router
    let app = api::build_router(state, &config.server.static_dir);

    // Start server
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on http://{}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
