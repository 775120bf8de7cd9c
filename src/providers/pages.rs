use async_trait::async_trait;
use serde_json::json;
use sqlx::SqlitePool;

use crate::models::Page;
use crate::search::coordinator::sort_results;
use crate::search::provider::{SearchOptions, SearchProvider};
use crate::search::score;
use crate::search::types::{PermissionContext, SearchResultItem, METADATA_UPDATED_AT};

use super::{like_pattern, paginate, truncate_display, DESCRIPTION_DISPLAY_LEN};

/// Static page search provider / 静态页面搜索提供者
pub struct PageSearchProvider {
    db: SqlitePool,
}

impl PageSearchProvider {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    fn sees_all_statuses(ctx: &PermissionContext) -> bool {
        ctx.has_permission("pages.manage")
    }

    fn score_row(page: &Page, query_lower: &str) -> f32 {
        score::primary(&page.title, query_lower)
            + score::secondary(&page.slug, query_lower)
            + score::long_form(&page.body, query_lower, 21.0)
    }

    fn to_item(page: Page, query_lower: &str) -> SearchResultItem {
        let relevance_score = Self::score_row(&page, query_lower);
        let mut metadata = serde_json::Map::new();
        metadata.insert("status".to_string(), json!(page.status));
        metadata.insert("slug".to_string(), json!(page.slug));
        metadata.insert(METADATA_UPDATED_AT.to_string(), json!(page.updated_at));
        SearchResultItem {
            url: format!("/dashboard/pages/{}", page.id),
            id: page.id,
            entity_type: "pages".to_string(),
            title: page.title,
            description: truncate_display(&page.body, DESCRIPTION_DISPLAY_LEN),
            metadata,
            relevance_score,
        }
    }
}

#[async_trait]
impl SearchProvider for PageSearchProvider {
    fn entity_type(&self) -> &'static str {
        "pages"
    }

    fn required_permission(&self) -> &'static str {
        "pages.read"
    }

    async fn search(
        &self,
        ctx: &PermissionContext,
        query: &str,
        options: SearchOptions,
    ) -> anyhow::Result<Vec<SearchResultItem>> {
        let query_lower = query.trim().to_lowercase();
        if query_lower.is_empty() {
            return Ok(Vec::new());
        }
        let pattern = like_pattern(&query_lower);

        let rows: Vec<Page> = if Self::sees_all_statuses(ctx) {
            sqlx::query_as(
                "SELECT id, title, slug, body, status, created_at, updated_at FROM pages \
                 WHERE lower(title) LIKE ? OR lower(slug) LIKE ? OR lower(body) LIKE ?",
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as(
                "SELECT id, title, slug, body, status, created_at, updated_at FROM pages \
                 WHERE status = 'PUBLISHED' \
                   AND (lower(title) LIKE ? OR lower(slug) LIKE ? OR lower(body) LIKE ?)",
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&self.db)
            .await?
        };

        let mut items: Vec<SearchResultItem> = rows
            .into_iter()
            .map(|row| Self::to_item(row, &query_lower))
            .collect();
        sort_results(&mut items, options.sort_by);
        Ok(paginate(items, &options))
    }

    async fn count(&self, ctx: &PermissionContext, query: &str) -> anyhow::Result<u64> {
        let query_lower = query.trim().to_lowercase();
        if query_lower.is_empty() {
            return Ok(0);
        }
        let pattern = like_pattern(&query_lower);

        let count: i64 = if Self::sees_all_statuses(ctx) {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM pages \
                 WHERE lower(title) LIKE ? OR lower(slug) LIKE ? OR lower(body) LIKE ?",
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&self.db)
            .await?
        } else {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM pages \
                 WHERE status = 'PUBLISHED' \
                   AND (lower(title) LIKE ? OR lower(slug) LIKE ? OR lower(body) LIKE ?)",
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&self.db)
            .await?
        };
        Ok(count as u64)
    }
}
