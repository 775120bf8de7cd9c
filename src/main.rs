use axum::{routing::get, Router};
use sqlx::sqlite::SqlitePool;
use std::sync::Arc;
use tower_cookies::CookieManagerLayer;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod api;
mod auth;
mod db;
mod state;

use state::AppState;
use webdash_backend::config;
use webdash_backend::search::{ProviderRegistry, RateLimiter, SearchCoordinator};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "webdash_backend=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Load configuration / 加载配置
    let app_config = config::init_config().map_err(anyhow::Error::msg)?;
    let app_config = app_config.read().clone();
    tracing::info!(
        "Server will listen on {}:{}",
        app_config.server.host,
        app_config.server.port
    );

    // Create data directory if not exists / 创建数据目录
    let data_dir = app_config.get_data_dir();
    if !data_dir.exists() {
        std::fs::create_dir_all(&data_dir)?;
        tracing::info!("Created data directory: {:?}", data_dir);
    }

    let database_url = std::env::var("DATABASE_URL")
        .unwrap_or_else(|_| app_config.get_database_url());

    let pool = SqlitePool::connect(&database_url).await?;
    sqlx::query("PRAGMA journal_mode=WAL").execute(&pool).await?;

    db::run_migrations(&pool).await?;
    db::seed_if_empty(&pool).await?;

    // Register all search providers / 注册所有搜索提供者
    let registry = ProviderRegistry::new();
    webdash_backend::register_search_providers(&registry, &pool).await;
    tracing::info!(
        "Search providers ready: {}",
        registry.all_types().await.join(", ")
    );

    let coordinator = SearchCoordinator::new(
        registry.clone(),
        app_config.provider_timeout(),
        app_config.search.quick_search_limit,
    );
    let rate_limiter = RateLimiter::new(app_config.rate_limit.clone());

    let app_state = Arc::new(AppState {
        db: pool,
        registry,
        coordinator,
        rate_limiter,
    });

    let app = Router::new()
        .route("/api/search", get(api::search::search))
        .route("/api/search/quick", get(api::search::quick_search))
        .route("/api/search/types", get(api::search::searchable_types))
        .layer(CookieManagerLayer::new())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    let bind_addr = app_config.get_bind_address();
    tracing::info!("WebDash backend listening on {}", bind_addr);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
