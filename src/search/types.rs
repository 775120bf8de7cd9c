//! Shared search vocabulary / 搜索共享数据类型

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::error::SearchError;

/// Max query text length in characters / 查询文本最大长度(字符)
pub const MAX_QUERY_LEN: usize = 200;
/// Max page size / 单页最大条数
pub const MAX_PAGE_LIMIT: usize = 100;
/// Metadata key carrying the provider-supplied RFC3339 timestamp used by date sort
/// / 日期排序使用的元数据字段
pub const METADATA_UPDATED_AT: &str = "updated_at";

/// Sort key for search results / 搜索结果排序方式
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortBy {
    #[default]
    Relevance,
    Date,
    Name,
}

impl SortBy {
    /// Parse a query-string value; unknown values are a validation error upstream
    /// / 解析查询参数，未知值由上游按校验错误处理
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "relevance" => Some(SortBy::Relevance),
            "date" => Some(SortBy::Date),
            "name" => Some(SortBy::Name),
            _ => None,
        }
    }
}

/// Requested entity types: everything, or an explicit set / 请求的实体类型
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EntityTypeFilter {
    #[default]
    All,
    Types(Vec<String>),
}

impl EntityTypeFilter {
    /// Parse the `type` query parameter ("all" or comma-separated list) / 解析type参数
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() || raw.eq_ignore_ascii_case("all") {
            return EntityTypeFilter::All;
        }
        let mut types: Vec<String> = raw
            .split(',')
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .collect();
        // A repeated type must not query its provider twice / 重复类型不能查询两次
        let mut seen = HashSet::new();
        types.retain(|t| seen.insert(t.clone()));
        if types.is_empty() {
            EntityTypeFilter::All
        } else {
            EntityTypeFilter::Types(types)
        }
    }
}

/// A validated federated search request / 一次联合搜索请求
#[derive(Debug, Clone)]
pub struct SearchQuery {
    pub text: String,
    pub entity_types: EntityTypeFilter,
    pub page: usize,
    pub limit: usize,
    pub sort_by: SortBy,
}

impl SearchQuery {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            entity_types: EntityTypeFilter::All,
            page: 1,
            limit: 20,
            sort_by: SortBy::Relevance,
        }
    }

    /// Fail fast before any provider is touched / 在接触任何提供者之前快速失败
    pub fn validate(&self, registered_types: &[String]) -> Result<(), SearchError> {
        let text = self.text.trim();
        if text.is_empty() {
            return Err(SearchError::InvalidQuery(
                "search text must not be empty".to_string(),
            ));
        }
        if text.chars().count() > MAX_QUERY_LEN {
            return Err(SearchError::InvalidQuery(format!(
                "search text too long (max {} characters)",
                MAX_QUERY_LEN
            )));
        }
        if self.page < 1 {
            return Err(SearchError::InvalidQuery(
                "page must be at least 1".to_string(),
            ));
        }
        if self.limit < 1 || self.limit > MAX_PAGE_LIMIT {
            return Err(SearchError::InvalidQuery(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_LIMIT
            )));
        }
        if let EntityTypeFilter::Types(types) = &self.entity_types {
            for t in types {
                if !registered_types.iter().any(|r| r == t) {
                    return Err(SearchError::InvalidQuery(format!(
                        "unknown entity type: {} (known: {})",
                        t,
                        registered_types.join(", ")
                    )));
                }
            }
        }
        Ok(())
    }
}

/// One search hit / 单条搜索结果
///
/// Identity is the pair (entity_type, id); ids are not globally unique and
/// results are never deduplicated across types.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResultItem {
    pub id: String,
    pub entity_type: String,
    pub title: String,
    /// Pre-truncated display string / 已截断的展示文本
    pub description: String,
    /// Deep link into the dashboard / 指向面板的深层链接
    pub url: String,
    /// Provider-specific fields (status, price, author, ...) / 提供者自有字段
    pub metadata: serde_json::Map<String, serde_json::Value>,
    pub relevance_score: f32,
}

/// Paginated response for full search / 完整搜索的分页响应
#[derive(Debug, Clone, Serialize)]
pub struct PaginatedSearchResult {
    pub results: Vec<SearchResultItem>,
    pub total: u64,
    pub page: usize,
    pub limit: usize,
    pub total_pages: u64,
}

impl PaginatedSearchResult {
    pub fn empty(page: usize, limit: usize) -> Self {
        Self {
            results: Vec::new(),
            total: 0,
            page,
            limit,
            total_pages: 0,
        }
    }
}

/// Caller identity plus capability check, built by the auth collaborator
/// and consumed read-only / 调用者身份与权限检查，由认证模块构造，只读消费
#[derive(Debug, Clone)]
pub struct PermissionContext {
    pub user_id: String,
    permissions: HashSet<String>,
}

impl PermissionContext {
    pub fn new(user_id: impl Into<String>, permissions: HashSet<String>) -> Self {
        Self {
            user_id: user_id.into(),
            permissions,
        }
    }

    pub fn has_permission(&self, perm: &str) -> bool {
        self.permissions.contains(perm)
    }
}
