//! Search coordinator / 搜索协调器
//!
//! Orchestrates a query across one, many, or all registered providers:
//! permission-gates, fans out concurrently, merges, sorts, paginates. One
//! provider's failure or timeout never cancels or fails its siblings.

use std::cmp::Ordering;
use std::time::Duration;

use futures::future::join_all;
use tokio::time::timeout;

use super::error::SearchError;
use super::provider::SearchOptions;
use super::registry::{ProviderRef, ProviderRegistry};
use super::types::{
    EntityTypeFilter, PaginatedSearchResult, PermissionContext, SearchQuery, SearchResultItem,
    SortBy, MAX_QUERY_LEN, METADATA_UPDATED_AT,
};

/// Sort merged results by the requested key / 按请求的排序键排序
///
/// The sort is stable: relevance ties keep each provider's original relative
/// order. Date sorts descending on the RFC3339 `updated_at` metadata field
/// (lexicographic order is chronological); items without it go last.
pub fn sort_results(items: &mut [SearchResultItem], sort_by: SortBy) {
    match sort_by {
        SortBy::Relevance => items.sort_by(|a, b| {
            b.relevance_score
                .partial_cmp(&a.relevance_score)
                .unwrap_or(Ordering::Equal)
        }),
        SortBy::Date => items.sort_by(|a, b| date_key(b).cmp(&date_key(a))),
        SortBy::Name => {
            items.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()))
        }
    }
}

fn date_key(item: &SearchResultItem) -> Option<&str> {
    item.metadata.get(METADATA_UPDATED_AT).and_then(|v| v.as_str())
}

fn total_pages(total: u64, limit: usize) -> u64 {
    if total == 0 {
        0
    } else {
        (total + limit as u64 - 1) / limit as u64
    }
}

/// Coordinates fan-out, merge and pagination over the registry / 协调注册表上的并发查询、合并与分页
pub struct SearchCoordinator {
    registry: ProviderRegistry,
    provider_timeout: Duration,
    quick_limit: usize,
}

impl SearchCoordinator {
    pub fn new(registry: ProviderRegistry, provider_timeout: Duration, quick_limit: usize) -> Self {
        Self {
            registry,
            provider_timeout,
            quick_limit,
        }
    }

    /// Full federated search / 完整联合搜索
    pub async fn search(
        &self,
        ctx: &PermissionContext,
        query: &SearchQuery,
    ) -> Result<PaginatedSearchResult, SearchError> {
        let registered = self.registry.all_types().await;
        query.validate(&registered)?;

        match &query.entity_types {
            EntityTypeFilter::Types(types) if types.len() == 1 => {
                self.search_single(ctx, &types[0], query).await
            }
            EntityTypeFilter::Types(types) => {
                let providers = self.registry.get_many(types).await;
                Ok(self.search_merged(ctx, providers, query).await)
            }
            EntityTypeFilter::All => {
                let providers = self.registry.all().await;
                Ok(self.search_merged(ctx, providers, query).await)
            }
        }
    }

    /// Quick search: capped, unpaginated, always relevance-ranked / 快速搜索
    ///
    /// An empty query or an empty eligible set yields `[]`, never an error.
    pub async fn quick_search(
        &self,
        ctx: &PermissionContext,
        text: &str,
    ) -> Vec<SearchResultItem> {
        let text = text.trim();
        if text.is_empty() || text.chars().count() > MAX_QUERY_LEN {
            return Vec::new();
        }

        let eligible = self.eligible(ctx, self.registry.all().await);
        if eligible.is_empty() {
            return Vec::new();
        }

        let calls = eligible.iter().map(|provider| {
            let provider = provider.clone();
            async move {
                let options = SearchOptions::relevance(self.quick_limit);
                match timeout(self.provider_timeout, provider.search(ctx, text, options)).await {
                    Ok(Ok(items)) => items,
                    Ok(Err(e)) => {
                        tracing::warn!(
                            "Quick search provider {} failed: {}",
                            provider.entity_type(),
                            e
                        );
                        Vec::new()
                    }
                    Err(_) => {
                        tracing::warn!(
                            "Quick search provider {} timed out after {:?}",
                            provider.entity_type(),
                            self.provider_timeout
                        );
                        Vec::new()
                    }
                }
            }
        });

        let mut merged: Vec<SearchResultItem> =
            join_all(calls).await.into_iter().flatten().collect();
        sort_results(&mut merged, SortBy::Relevance);
        merged.truncate(self.quick_limit);
        merged
    }

    /// Providers the caller is allowed to consult; forbidden types are
    /// silently omitted, not an error / 调用者可查询的提供者，无权限的类型静默省略
    fn eligible(&self, ctx: &PermissionContext, providers: Vec<ProviderRef>) -> Vec<ProviderRef> {
        providers
            .into_iter()
            .filter(|p| ctx.has_permission(p.required_permission()))
            .collect()
    }

    /// Single-type path: pagination is delegated to the provider / 单类型路径，分页下放给提供者
    async fn search_single(
        &self,
        ctx: &PermissionContext,
        entity_type: &str,
        query: &SearchQuery,
    ) -> Result<PaginatedSearchResult, SearchError> {
        let provider = match self.registry.get(entity_type).await {
            Some(p) => p,
            None => return Ok(PaginatedSearchResult::empty(query.page, query.limit)),
        };

        // A forbidden type reads as "no results", not 403 / 无权限的类型表现为空结果
        if !ctx.has_permission(provider.required_permission()) {
            return Ok(PaginatedSearchResult::empty(query.page, query.limit));
        }

        let options = SearchOptions {
            page: query.page,
            limit: query.limit,
            sort_by: query.sort_by,
        };
        let call = async {
            let results = provider.search(ctx, &query.text, options).await?;
            let total = provider.count(ctx, &query.text).await?;
            anyhow::Ok((results, total))
        };

        let (results, total) = match timeout(self.provider_timeout, call).await {
            Ok(Ok(pair)) => pair,
            Ok(Err(e)) => {
                tracing::warn!("Search provider {} failed: {}", entity_type, e);
                (Vec::new(), 0)
            }
            Err(_) => {
                tracing::warn!(
                    "Search provider {} timed out after {:?}",
                    entity_type,
                    self.provider_timeout
                );
                (Vec::new(), 0)
            }
        };

        Ok(PaginatedSearchResult {
            total_pages: total_pages(total, query.limit),
            results,
            total,
            page: query.page,
            limit: query.limit,
        })
    }

    /// Multi-type path: concurrent fan-out, merge, sort, slice / 多类型路径
    async fn search_merged(
        &self,
        ctx: &PermissionContext,
        providers: Vec<ProviderRef>,
        query: &SearchQuery,
    ) -> PaginatedSearchResult {
        let eligible = self.eligible(ctx, providers);

        // Each provider is asked for up to page*limit candidates so global
        // pagination after the merge stays consistent / 每个提供者取page*limit条候选
        let fetch_limit = query.page.saturating_mul(query.limit);

        let calls = eligible.iter().map(|provider| {
            let provider = provider.clone();
            let text = query.text.clone();
            async move {
                let options = SearchOptions::relevance(fetch_limit);
                let call = async {
                    let items = provider.search(ctx, &text, options).await?;
                    let count = provider.count(ctx, &text).await?;
                    anyhow::Ok((items, count))
                };
                match timeout(self.provider_timeout, call).await {
                    Ok(Ok(pair)) => pair,
                    Ok(Err(e)) => {
                        tracing::warn!(
                            "Search provider {} failed: {}",
                            provider.entity_type(),
                            e
                        );
                        (Vec::new(), 0)
                    }
                    Err(_) => {
                        tracing::warn!(
                            "Search provider {} timed out after {:?}",
                            provider.entity_type(),
                            self.provider_timeout
                        );
                        (Vec::new(), 0)
                    }
                }
            }
        });

        let mut merged: Vec<SearchResultItem> = Vec::new();
        let mut total: u64 = 0;
        for (items, count) in join_all(calls).await {
            total += count;
            merged.extend(items);
        }

        sort_results(&mut merged, query.sort_by);

        let skip = query.page.saturating_sub(1).saturating_mul(query.limit);
        let results: Vec<SearchResultItem> =
            merged.into_iter().skip(skip).take(query.limit).collect();

        PaginatedSearchResult {
            results,
            total,
            page: query.page,
            limit: query.limit,
            total_pages: total_pages(total, query.limit),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::provider::SearchProvider;
    use async_trait::async_trait;
    use std::collections::HashSet;
    use std::sync::Arc;

    /// In-memory provider for coordinator tests / 协调器测试用的内存提供者
    struct StaticProvider {
        entity_type: &'static str,
        permission: &'static str,
        items: Vec<SearchResultItem>,
        delay: Option<Duration>,
        fail: bool,
    }

    impl StaticProvider {
        fn new(entity_type: &'static str, permission: &'static str) -> Self {
            Self {
                entity_type,
                permission,
                items: Vec::new(),
                delay: None,
                fail: false,
            }
        }

        fn with_items(mut self, scores: &[f32]) -> Self {
            let entity_type = self.entity_type;
            self.items = scores
                .iter()
                .enumerate()
                .map(|(i, &score)| item(entity_type, &format!("{}-{}", entity_type, i), score))
                .collect();
            self
        }
    }

    fn item(entity_type: &str, id: &str, score: f32) -> SearchResultItem {
        SearchResultItem {
            id: id.to_string(),
            entity_type: entity_type.to_string(),
            title: format!("{} item", id),
            description: String::new(),
            url: format!("/dashboard/{}/{}", entity_type, id),
            metadata: serde_json::Map::new(),
            relevance_score: score,
        }
    }

    #[async_trait]
    impl SearchProvider for StaticProvider {
        fn entity_type(&self) -> &'static str {
            self.entity_type
        }

        fn required_permission(&self) -> &'static str {
            self.permission
        }

        async fn search(
            &self,
            _ctx: &PermissionContext,
            _query: &str,
            options: SearchOptions,
        ) -> anyhow::Result<Vec<SearchResultItem>> {
            if let Some(delay) = self.delay {
                tokio::time::sleep(delay).await;
            }
            if self.fail {
                anyhow::bail!("backing store unavailable");
            }
            let mut items = self.items.clone();
            sort_results(&mut items, options.sort_by);
            Ok(items
                .into_iter()
                .skip(options.page.saturating_sub(1) * options.limit)
                .take(options.limit)
                .collect())
        }

        async fn count(&self, _ctx: &PermissionContext, _query: &str) -> anyhow::Result<u64> {
            if self.fail {
                anyhow::bail!("backing store unavailable");
            }
            Ok(self.items.len() as u64)
        }
    }

    fn ctx(perms: &[&str]) -> PermissionContext {
        let set: HashSet<String> = perms.iter().map(|p| p.to_string()).collect();
        PermissionContext::new("u1", set)
    }

    async fn coordinator_with(providers: Vec<StaticProvider>) -> SearchCoordinator {
        let registry = ProviderRegistry::new();
        for p in providers {
            registry.register(Arc::new(p)).await;
        }
        SearchCoordinator::new(registry, Duration::from_millis(200), 8)
    }

    #[tokio::test]
    async fn test_merged_results_sorted_by_relevance_and_paginated() {
        let coordinator = coordinator_with(vec![
            StaticProvider::new("products", "products.read").with_items(&[100.0, 50.0]),
            StaticProvider::new("posts", "posts.read").with_items(&[75.0, 20.0]),
        ])
        .await;

        let query = SearchQuery::new("anything");
        let result = coordinator
            .search(&ctx(&["products.read", "posts.read"]), &query)
            .await
            .unwrap();

        assert_eq!(result.total, 4);
        assert_eq!(result.total_pages, 1);
        let scores: Vec<f32> = result.results.iter().map(|r| r.relevance_score).collect();
        assert_eq!(scores, vec![100.0, 75.0, 50.0, 20.0]);
    }

    #[tokio::test]
    async fn test_pagination_slices_merged_list() {
        let coordinator = coordinator_with(vec![
            StaticProvider::new("products", "products.read").with_items(&[90.0, 80.0, 70.0]),
            StaticProvider::new("posts", "posts.read").with_items(&[85.0, 75.0]),
        ])
        .await;

        let mut query = SearchQuery::new("anything");
        query.page = 2;
        query.limit = 2;
        let result = coordinator
            .search(&ctx(&["products.read", "posts.read"]), &query)
            .await
            .unwrap();

        assert_eq!(result.total, 5);
        assert_eq!(result.total_pages, 3);
        let scores: Vec<f32> = result.results.iter().map(|r| r.relevance_score).collect();
        assert_eq!(scores, vec![80.0, 75.0]);
    }

    #[tokio::test]
    async fn test_forbidden_provider_contributes_nothing() {
        let coordinator = coordinator_with(vec![
            StaticProvider::new("products", "products.read").with_items(&[100.0]),
            StaticProvider::new("users", "users.read").with_items(&[90.0]),
        ])
        .await;

        let query = SearchQuery::new("anything");
        let result = coordinator
            .search(&ctx(&["products.read"]), &query)
            .await
            .unwrap();

        assert_eq!(result.total, 1);
        assert!(result.results.iter().all(|r| r.entity_type == "products"));
    }

    #[tokio::test]
    async fn test_single_type_forbidden_is_empty_not_error() {
        let coordinator = coordinator_with(vec![
            StaticProvider::new("users", "users.read").with_items(&[90.0]),
        ])
        .await;

        let mut query = SearchQuery::new("anything");
        query.entity_types = EntityTypeFilter::Types(vec!["users".to_string()]);
        let result = coordinator.search(&ctx(&[]), &query).await.unwrap();

        assert!(result.results.is_empty());
        assert_eq!(result.total, 0);
        assert_eq!(result.total_pages, 0);
    }

    #[tokio::test]
    async fn test_provider_timeout_degrades_to_empty() {
        let mut slow = StaticProvider::new("posts", "posts.read").with_items(&[95.0]);
        slow.delay = Some(Duration::from_secs(5));
        let coordinator = coordinator_with(vec![
            StaticProvider::new("products", "products.read").with_items(&[60.0]),
            slow,
        ])
        .await;

        let query = SearchQuery::new("anything");
        let result = coordinator
            .search(&ctx(&["products.read", "posts.read"]), &query)
            .await
            .unwrap();

        // The slow provider is dropped, the fast one still answers
        assert_eq!(result.total, 1);
        assert_eq!(result.results.len(), 1);
        assert_eq!(result.results[0].entity_type, "products");
    }

    #[tokio::test]
    async fn test_provider_failure_does_not_fail_request() {
        let mut broken = StaticProvider::new("posts", "posts.read").with_items(&[95.0]);
        broken.fail = true;
        let coordinator = coordinator_with(vec![
            StaticProvider::new("products", "products.read").with_items(&[60.0]),
            broken,
        ])
        .await;

        let query = SearchQuery::new("anything");
        let result = coordinator
            .search(&ctx(&["products.read", "posts.read"]), &query)
            .await
            .unwrap();

        assert_eq!(result.total, 1);
        assert_eq!(result.results[0].entity_type, "products");
    }

    #[tokio::test]
    async fn test_all_providers_failing_returns_empty_ok() {
        let mut broken = StaticProvider::new("products", "products.read").with_items(&[95.0]);
        broken.fail = true;
        let coordinator = coordinator_with(vec![broken]).await;

        let query = SearchQuery::new("anything");
        let result = coordinator
            .search(&ctx(&["products.read"]), &query)
            .await
            .unwrap();

        assert!(result.results.is_empty());
        assert_eq!(result.total, 0);
        assert_eq!(result.total_pages, 0);
    }

    #[tokio::test]
    async fn test_validation_rejects_before_providers_run() {
        let coordinator = coordinator_with(vec![
            StaticProvider::new("products", "products.read").with_items(&[60.0]),
        ])
        .await;

        let mut query = SearchQuery::new("anything");
        query.page = 0;
        assert!(matches!(
            coordinator.search(&ctx(&["products.read"]), &query).await,
            Err(SearchError::InvalidQuery(_))
        ));

        let mut query = SearchQuery::new("anything");
        query.limit = 101;
        assert!(matches!(
            coordinator.search(&ctx(&["products.read"]), &query).await,
            Err(SearchError::InvalidQuery(_))
        ));

        let mut query = SearchQuery::new("anything");
        query.entity_types = EntityTypeFilter::Types(vec!["widgets".to_string()]);
        assert!(matches!(
            coordinator.search(&ctx(&["products.read"]), &query).await,
            Err(SearchError::InvalidQuery(_))
        ));
    }

    #[tokio::test]
    async fn test_quick_search_caps_and_ranks() {
        let coordinator = coordinator_with(vec![
            StaticProvider::new("products", "products.read")
                .with_items(&[100.0, 90.0, 80.0, 70.0, 60.0, 50.0]),
            StaticProvider::new("posts", "posts.read").with_items(&[95.0, 85.0, 75.0, 65.0]),
        ])
        .await;

        let items = coordinator
            .quick_search(&ctx(&["products.read", "posts.read"]), "anything")
            .await;

        assert_eq!(items.len(), 8);
        let scores: Vec<f32> = items.iter().map(|r| r.relevance_score).collect();
        let mut sorted = scores.clone();
        sorted.sort_by(|a, b| b.partial_cmp(a).unwrap());
        assert_eq!(scores, sorted);
        assert_eq!(scores[0], 100.0);
    }

    #[tokio::test]
    async fn test_quick_search_empty_query_or_permissions_is_empty() {
        let coordinator = coordinator_with(vec![
            StaticProvider::new("products", "products.read").with_items(&[100.0]),
        ])
        .await;

        assert!(coordinator
            .quick_search(&ctx(&["products.read"]), "   ")
            .await
            .is_empty());
        assert!(coordinator
            .quick_search(&ctx(&[]), "anything")
            .await
            .is_empty());
    }

    #[tokio::test]
    async fn test_sort_by_name_and_date() {
        let mut a = item("products", "a", 10.0);
        a.title = "Walnut Shelf".to_string();
        a.metadata.insert(
            METADATA_UPDATED_AT.to_string(),
            serde_json::Value::String("2026-01-01T00:00:00Z".to_string()),
        );
        let mut b = item("posts", "b", 90.0);
        b.title = "aurora lamp review".to_string();
        b.metadata.insert(
            METADATA_UPDATED_AT.to_string(),
            serde_json::Value::String("2026-03-01T00:00:00Z".to_string()),
        );

        let mut by_name = vec![a.clone(), b.clone()];
        sort_results(&mut by_name, SortBy::Name);
        assert_eq!(by_name[0].id, "b");

        let mut by_date = vec![a, b];
        sort_results(&mut by_date, SortBy::Date);
        assert_eq!(by_date[0].id, "b");
    }

    #[test]
    fn test_total_pages_arithmetic() {
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(1, 10), 1);
        assert_eq!(total_pages(10, 10), 1);
        assert_eq!(total_pages(11, 10), 2);
    }
}
