use sqlx::SqlitePool;
use webdash_backend::search::{ProviderRegistry, RateLimiter, SearchCoordinator};

pub struct AppState {
    pub db: SqlitePool,
    pub registry: ProviderRegistry,
    pub coordinator: SearchCoordinator,
    pub rate_limiter: RateLimiter,
}
