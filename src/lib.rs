pub mod config;
pub mod models;
pub mod providers;
pub mod search;

use search::ProviderRegistry;
use sqlx::SqlitePool;

// Register all entity search providers (call unified registration function from providers module) / 注册所有实体搜索提供者
pub async fn register_search_providers(registry: &ProviderRegistry, db: &SqlitePool) {
    providers::register_all(registry, db).await
}
