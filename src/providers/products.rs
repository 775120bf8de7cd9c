use async_trait::async_trait;
use serde_json::json;
use sqlx::SqlitePool;

use crate::models::Product;
use crate::search::coordinator::sort_results;
use crate::search::provider::{SearchOptions, SearchProvider};
use crate::search::score;
use crate::search::types::{PermissionContext, SearchResultItem, METADATA_UPDATED_AT};

use super::{like_pattern, paginate, truncate_display, DESCRIPTION_DISPLAY_LEN};

/// Product search provider / 商品搜索提供者
///
/// Non-privileged callers only see published products; the manage capability
/// lifts the row gate.
pub struct ProductSearchProvider {
    db: SqlitePool,
}

impl ProductSearchProvider {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    fn sees_all_statuses(ctx: &PermissionContext) -> bool {
        ctx.has_permission("products.manage")
    }

    fn score_row(product: &Product, query_lower: &str) -> f32 {
        score::primary(&product.name, query_lower)
            + score::secondary(&product.sku, query_lower)
            + score::long_form(&product.description, query_lower, 22.0)
    }

    fn to_item(product: Product, query_lower: &str) -> SearchResultItem {
        let relevance_score = Self::score_row(&product, query_lower);
        let mut metadata = serde_json::Map::new();
        metadata.insert("status".to_string(), json!(product.status));
        metadata.insert("sku".to_string(), json!(product.sku));
        metadata.insert("price".to_string(), json!(product.price));
        metadata.insert(METADATA_UPDATED_AT.to_string(), json!(product.updated_at));
        SearchResultItem {
            url: format!("/dashboard/products/{}", product.id),
            id: product.id,
            entity_type: "products".to_string(),
            title: product.name,
            description: truncate_display(&product.description, DESCRIPTION_DISPLAY_LEN),
            metadata,
            relevance_score,
        }
    }
}

#[async_trait]
impl SearchProvider for ProductSearchProvider {
    fn entity_type(&self) -> &'static str {
        "products"
    }

    fn required_permission(&self) -> &'static str {
        "products.read"
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

        let rows: Vec<Product> = if Self::sees_all_statuses(ctx) {
            sqlx::query_as(
                "SELECT id, name, sku, description, status, price, created_at, updated_at \
                 FROM products \
                 WHERE lower(name) LIKE ? OR lower(sku) LIKE ? OR lower(description) LIKE ?",
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as(
                "SELECT id, name, sku, description, status, price, created_at, updated_at \
                 FROM products \
                 WHERE status = 'PUBLISHED' \
                   AND (lower(name) LIKE ? OR lower(sku) LIKE ? OR lower(description) LIKE ?)",
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
                "SELECT COUNT(*) FROM products \
                 WHERE lower(name) LIKE ? OR lower(sku) LIKE ? OR lower(description) LIKE ?",
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&self.db)
            .await?
        } else {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM products \
                 WHERE status = 'PUBLISHED' \
                   AND (lower(name) LIKE ? OR lower(sku) LIKE ? OR lower(description) LIKE ?)",
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
