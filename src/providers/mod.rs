//! Entity search providers / 实体搜索提供者
//!
//! One sqlx-backed adapter per searchable entity type. Each provider owns its
//! row-level visibility; the coordinator only does type-level gating.

pub mod pages;
pub mod posts;
pub mod products;
pub mod users;

use std::sync::Arc;

use sqlx::SqlitePool;

use crate::search::provider::SearchOptions;
use crate::search::registry::ProviderRegistry;
use crate::search::types::SearchResultItem;

/// Display length for result descriptions / 结果描述的展示长度
pub(crate) const DESCRIPTION_DISPLAY_LEN: usize = 160;

/// Build a LIKE pattern from an already-lowercased query / 构造LIKE模式
pub(crate) fn like_pattern(query_lower: &str) -> String {
    format!("%{}%", query_lower)
}

/// Truncate a long-form field for display / 截断长文本用于展示
pub(crate) fn truncate_display(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        text.to_string()
    } else {
        let cut: String = text.chars().take(max_chars).collect();
        format!("{}…", cut.trim_end())
    }
}

/// In-type pagination, applied after scoring and ordering / 打分排序后的类型内分页
pub(crate) fn paginate(
    items: Vec<SearchResultItem>,
    options: &SearchOptions,
) -> Vec<SearchResultItem> {
    let skip = options.page.saturating_sub(1).saturating_mul(options.limit);
    items.into_iter().skip(skip).take(options.limit).collect()
}

/// Register all entity search providers / 注册所有实体搜索提供者
pub async fn register_all(registry: &ProviderRegistry, db: &SqlitePool) {
    // Products / 商品
    registry
        .register(Arc::new(products::ProductSearchProvider::new(db.clone())))
        .await;
    // Blog posts / 博客文章
    registry
        .register(Arc::new(posts::PostSearchProvider::new(db.clone())))
        .await;
    // Static pages / 静态页面
    registry
        .register(Arc::new(pages::PageSearchProvider::new(db.clone())))
        .await;
    // User accounts, admin capability / 用户账户
    registry
        .register(Arc::new(users::UserSearchProvider::new(db.clone())))
        .await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_display() {
        assert_eq!(truncate_display("short", 10), "short");
        let long = "a".repeat(20);
        let cut = truncate_display(&long, 10);
        assert!(cut.starts_with("aaaaaaaaaa"));
        assert!(cut.ends_with('…'));
    }
}
