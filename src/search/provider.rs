use async_trait::async_trait;
use serde::Serialize;

use super::types::{PermissionContext, SearchResultItem, SortBy};

/// Pagination and ordering for a single-provider query / 单个提供者查询的分页与排序
#[derive(Debug, Clone, Copy)]
pub struct SearchOptions {
    pub page: usize,
    pub limit: usize,
    pub sort_by: SortBy,
}

impl SearchOptions {
    /// First page, relevance order / 第一页，按相关度排序
    pub fn relevance(limit: usize) -> Self {
        Self {
            page: 1,
            limit,
            sort_by: SortBy::Relevance,
        }
    }
}

/// Registration-time identity of a provider / 提供者的注册期标识
#[derive(Debug, Clone, Serialize)]
pub struct ProviderDescriptor {
    pub entity_type: String,
    pub required_permission: String,
}

/// The capability every entity-type adapter implements / 每个实体类型适配器实现的能力
///
/// Implementations own their row-level visibility: `search` and `count` must
/// apply the same filter for the same caller, so pagination stays consistent.
#[async_trait]
pub trait SearchProvider: Send + Sync {
    /// Stable unique entity type key / 稳定唯一的实体类型标识
    fn entity_type(&self) -> &'static str;

    /// Capability required before this provider is consulted at all / 查询该提供者所需权限
    fn required_permission(&self) -> &'static str;

    fn descriptor(&self) -> ProviderDescriptor {
        ProviderDescriptor {
            entity_type: self.entity_type().to_string(),
            required_permission: self.required_permission().to_string(),
        }
    }

    /// Search within this single type, paginated / 在单个类型内搜索并分页
    async fn search(
        &self,
        ctx: &PermissionContext,
        query: &str,
        options: SearchOptions,
    ) -> anyhow::Result<Vec<SearchResultItem>>;

    /// Total matches under the same visibility filter `search` applies / 同一可见性过滤下的总匹配数
    async fn count(&self, ctx: &PermissionContext, query: &str) -> anyhow::Result<u64>;
}
