use async_trait::async_trait;
use serde_json::json;
use sqlx::SqlitePool;

use crate::models::Post;
use crate::search::coordinator::sort_results;
use crate::search::provider::{SearchOptions, SearchProvider};
use crate::search::score;
use crate::search::types::{PermissionContext, SearchResultItem, METADATA_UPDATED_AT};

use super::{like_pattern, paginate, truncate_display, DESCRIPTION_DISPLAY_LEN};

/// Blog post search provider / 博客文章搜索提供者
///
/// Drafts are visible only to their author or to a caller holding the manage
/// capability.
pub struct PostSearchProvider {
    db: SqlitePool,
}

impl PostSearchProvider {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    fn sees_all_statuses(ctx: &PermissionContext) -> bool {
        ctx.has_permission("posts.manage")
    }

    fn score_row(post: &Post, query_lower: &str) -> f32 {
        // Excerpt is more specific than the full body, so it carries the
        // higher long-form weight / 摘要比正文更具体，长文本权重更高
        score::primary(&post.title, query_lower)
            + score::secondary(&post.slug, query_lower)
            + score::long_form(&post.excerpt, query_lower, 25.0)
            + score::long_form(&post.body, query_lower, 20.0)
    }

    fn to_item(post: Post, query_lower: &str) -> SearchResultItem {
        let relevance_score = Self::score_row(&post, query_lower);
        let mut metadata = serde_json::Map::new();
        metadata.insert("status".to_string(), json!(post.status));
        metadata.insert("slug".to_string(), json!(post.slug));
        metadata.insert("author".to_string(), json!(post.author_id));
        metadata.insert(METADATA_UPDATED_AT.to_string(), json!(post.updated_at));
        SearchResultItem {
            url: format!("/dashboard/posts/{}", post.id),
            id: post.id,
            entity_type: "posts".to_string(),
            title: post.title,
            description: truncate_display(&post.excerpt, DESCRIPTION_DISPLAY_LEN),
            metadata,
            relevance_score,
        }
    }
}

#[async_trait]
impl SearchProvider for PostSearchProvider {
    fn entity_type(&self) -> &'static str {
        "posts"
    }

    fn required_permission(&self) -> &'static str {
        "posts.read"
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

        let rows: Vec<Post> = if Self::sees_all_statuses(ctx) {
            sqlx::query_as(
                "SELECT id, title, slug, excerpt, body, status, author_id, created_at, updated_at \
                 FROM posts \
                 WHERE lower(title) LIKE ? OR lower(slug) LIKE ? \
                    OR lower(excerpt) LIKE ? OR lower(body) LIKE ?",
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&self.db)
            .await?
        } else {
            // Drafts stay visible to their own author / 草稿仅作者本人可见
            sqlx::query_as(
                "SELECT id, title, slug, excerpt, body, status, author_id, created_at, updated_at \
                 FROM posts \
                 WHERE (status = 'PUBLISHED' OR author_id = ?) \
                   AND (lower(title) LIKE ? OR lower(slug) LIKE ? \
                     OR lower(excerpt) LIKE ? OR lower(body) LIKE ?)",
            )
            .bind(&ctx.user_id)
            .bind(&pattern)
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
                "SELECT COUNT(*) FROM posts \
                 WHERE lower(title) LIKE ? OR lower(slug) LIKE ? \
                    OR lower(excerpt) LIKE ? OR lower(body) LIKE ?",
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&self.db)
            .await?
        } else {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM posts \
                 WHERE (status = 'PUBLISHED' OR author_id = ?) \
                   AND (lower(title) LIKE ? OR lower(slug) LIKE ? \
                     OR lower(excerpt) LIKE ? OR lower(body) LIKE ?)",
            )
            .bind(&ctx.user_id)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&self.db)
            .await?
        };
        Ok(count as u64)
    }
}
