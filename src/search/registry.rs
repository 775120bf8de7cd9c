use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use super::provider::SearchProvider;

pub type ProviderRef = Arc<dyn SearchProvider>;

/// Provider registry (manages all registered search providers) / 搜索提供者注册表
///
/// Populated once at startup; request-time access is read-only. Re-registering
/// an entity type overwrites the previous provider, last write wins.
#[derive(Clone)]
pub struct ProviderRegistry {
    providers: Arc<RwLock<HashMap<String, ProviderRef>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self {
            providers: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Register a provider / 注册提供者
    pub async fn register(&self, provider: ProviderRef) {
        let entity_type = provider.entity_type().to_string();
        let mut providers = self.providers.write().await;
        if providers.insert(entity_type.clone(), provider).is_some() {
            tracing::warn!("Search provider overwritten: {}", entity_type);
        } else {
            tracing::info!("Search provider registered: {}", entity_type);
        }
    }

    /// Get provider for one entity type / 获取单个实体类型的提供者
    pub async fn get(&self, entity_type: &str) -> Option<ProviderRef> {
        let providers = self.providers.read().await;
        providers.get(entity_type).cloned()
    }

    /// Get providers for a set of types, silently dropping unknown ones
    /// (validation rejects these upstream; the registry stays defensive)
    /// / 按类型集合获取提供者，未知类型静默丢弃
    pub async fn get_many(&self, entity_types: &[String]) -> Vec<ProviderRef> {
        let providers = self.providers.read().await;
        entity_types
            .iter()
            .filter_map(|t| providers.get(t).cloned())
            .collect()
    }

    /// All providers, in stable entity-type order / 所有提供者，按类型名稳定排序
    pub async fn all(&self) -> Vec<ProviderRef> {
        let providers = self.providers.read().await;
        let mut all: Vec<ProviderRef> = providers.values().cloned().collect();
        all.sort_by_key(|p| p.entity_type());
        all
    }

    /// All registered entity types, sorted / 所有已注册的实体类型
    pub async fn all_types(&self) -> Vec<String> {
        let providers = self.providers.read().await;
        let mut types: Vec<String> = providers.keys().cloned().collect();
        types.sort();
        types
    }
}

impl Default for ProviderRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::provider::{SearchOptions, SearchProvider};
    use crate::search::types::{PermissionContext, SearchResultItem};
    use async_trait::async_trait;

    struct DummyProvider {
        entity_type: &'static str,
        marker: &'static str,
    }

    #[async_trait]
    impl SearchProvider for DummyProvider {
        fn entity_type(&self) -> &'static str {
            self.entity_type
        }

        fn required_permission(&self) -> &'static str {
            "test.read"
        }

        async fn search(
            &self,
            _ctx: &PermissionContext,
            _query: &str,
            _options: SearchOptions,
        ) -> anyhow::Result<Vec<SearchResultItem>> {
            Ok(vec![SearchResultItem {
                id: "1".to_string(),
                entity_type: self.entity_type.to_string(),
                title: self.marker.to_string(),
                description: String::new(),
                url: String::new(),
                metadata: serde_json::Map::new(),
                relevance_score: 1.0,
            }])
        }

        async fn count(&self, _ctx: &PermissionContext, _query: &str) -> anyhow::Result<u64> {
            Ok(1)
        }
    }

    #[tokio::test]
    async fn test_register_and_lookup() {
        let registry = ProviderRegistry::new();
        registry
            .register(Arc::new(DummyProvider { entity_type: "products", marker: "a" }))
            .await;
        registry
            .register(Arc::new(DummyProvider { entity_type: "posts", marker: "b" }))
            .await;

        assert!(registry.get("products").await.is_some());
        assert!(registry.get("widgets").await.is_none());
        assert_eq!(registry.all_types().await, vec!["posts", "products"]);
    }

    #[tokio::test]
    async fn test_reregister_overwrites_last_write_wins() {
        let registry = ProviderRegistry::new();
        registry
            .register(Arc::new(DummyProvider { entity_type: "products", marker: "old" }))
            .await;
        registry
            .register(Arc::new(DummyProvider { entity_type: "products", marker: "new" }))
            .await;

        // The type is reported exactly once and resolves to the newer provider
        assert_eq!(registry.all_types().await, vec!["products"]);

        let ctx = PermissionContext::new("u1", Default::default());
        let provider = registry.get("products").await.unwrap();
        let items = provider
            .search(&ctx, "x", SearchOptions::relevance(10))
            .await
            .unwrap();
        assert_eq!(items[0].title, "new");
    }

    #[tokio::test]
    async fn test_get_many_drops_unknown_types() {
        let registry = ProviderRegistry::new();
        registry
            .register(Arc::new(DummyProvider { entity_type: "products", marker: "a" }))
            .await;

        let found = registry
            .get_many(&["products".to_string(), "widgets".to_string()])
            .await;
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].entity_type(), "products");
    }
}
