use async_trait::async_trait;
use serde_json::json;
use sqlx::SqlitePool;

use crate::models::User;
use crate::search::coordinator::sort_results;
use crate::search::provider::{SearchOptions, SearchProvider};
use crate::search::score;
use crate::search::types::{PermissionContext, SearchResultItem, METADATA_UPDATED_AT};

use super::{like_pattern, paginate};

/// User account search provider / 用户账户搜索提供者
///
/// Gated behind an administrative capability; disabled accounts only show up
/// for callers who can manage users.
pub struct UserSearchProvider {
    db: SqlitePool,
}

impl UserSearchProvider {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    fn sees_disabled(ctx: &PermissionContext) -> bool {
        ctx.has_permission("users.manage")
    }

    fn score_row(user: &User, query_lower: &str) -> f32 {
        score::primary(&user.display_name, query_lower)
            + score::secondary(&user.username, query_lower)
            + score::secondary(&user.email, query_lower)
    }

    fn to_item(user: User, query_lower: &str) -> SearchResultItem {
        let relevance_score = Self::score_row(&user, query_lower);
        let mut metadata = serde_json::Map::new();
        metadata.insert("role".to_string(), json!(user.role));
        metadata.insert("email".to_string(), json!(user.email));
        metadata.insert("enabled".to_string(), json!(user.enabled));
        metadata.insert(METADATA_UPDATED_AT.to_string(), json!(user.updated_at));
        SearchResultItem {
            url: format!("/dashboard/users/{}", user.id),
            id: user.id,
            entity_type: "users".to_string(),
            title: user.display_name,
            description: user.username,
            metadata,
            relevance_score,
        }
    }
}

#[async_trait]
impl SearchProvider for UserSearchProvider {
    fn entity_type(&self) -> &'static str {
        "users"
    }

    fn required_permission(&self) -> &'static str {
        "users.read"
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

        let rows: Vec<User> = if Self::sees_disabled(ctx) {
            sqlx::query_as(
                "SELECT id, username, display_name, email, role, enabled, created_at, updated_at \
                 FROM users \
                 WHERE lower(display_name) LIKE ? OR lower(username) LIKE ? OR lower(email) LIKE ?",
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_all(&self.db)
            .await?
        } else {
            sqlx::query_as(
                "SELECT id, username, display_name, email, role, enabled, created_at, updated_at \
                 FROM users \
                 WHERE enabled = 1 \
                   AND (lower(display_name) LIKE ? OR lower(username) LIKE ? OR lower(email) LIKE ?)",
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

        let count: i64 = if Self::sees_disabled(ctx) {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM users \
                 WHERE lower(display_name) LIKE ? OR lower(username) LIKE ? OR lower(email) LIKE ?",
            )
            .bind(&pattern)
            .bind(&pattern)
            .bind(&pattern)
            .fetch_one(&self.db)
            .await?
        } else {
            sqlx::query_scalar(
                "SELECT COUNT(*) FROM users \
                 WHERE enabled = 1 \
                   AND (lower(display_name) LIKE ? OR lower(username) LIKE ? OR lower(email) LIKE ?)",
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

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;
    use std::collections::HashSet;

    async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        sqlx::query(
            "CREATE TABLE users (
                id TEXT PRIMARY KEY,
                username TEXT NOT NULL,
                display_name TEXT NOT NULL,
                email TEXT NOT NULL,
                role TEXT NOT NULL,
                enabled INTEGER NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&pool)
        .await
        .unwrap();

        for (id, username, display_name, email, enabled) in [
            ("u1", "mchen", "Mara Chen", "mara@example.com", 1),
            ("u2", "mcormick", "Mara Cormick", "cormick@example.com", 0),
        ] {
            sqlx::query(
                "INSERT INTO users (id, username, display_name, email, role, enabled, created_at, updated_at) \
                 VALUES (?, ?, ?, ?, 'viewer', ?, '2026-01-01T00:00:00Z', '2026-01-02T00:00:00Z')",
            )
            .bind(id)
            .bind(username)
            .bind(display_name)
            .bind(email)
            .bind(enabled)
            .execute(&pool)
            .await
            .unwrap();
        }
        pool
    }

    fn ctx(perms: &[&str]) -> PermissionContext {
        let set: HashSet<String> = perms.iter().map(|p| p.to_string()).collect();
        PermissionContext::new("admin-1", set)
    }

    #[tokio::test]
    async fn test_disabled_accounts_hidden_without_manage() {
        let provider = UserSearchProvider::new(test_pool().await);

        let reader = ctx(&["users.read"]);
        let items = provider
            .search(&reader, "mara", SearchOptions::relevance(10))
            .await
            .unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].id, "u1");

        let manager = ctx(&["users.read", "users.manage"]);
        let items = provider
            .search(&manager, "mara", SearchOptions::relevance(10))
            .await
            .unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(provider.count(&manager, "mara").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_username_and_email_are_matchable() {
        let provider = UserSearchProvider::new(test_pool().await);
        let reader = ctx(&["users.read"]);

        let by_username = provider
            .search(&reader, "mchen", SearchOptions::relevance(10))
            .await
            .unwrap();
        assert_eq!(by_username.len(), 1);
        assert!(by_username[0].relevance_score >= score::SECONDARY_EXACT);

        let by_email = provider
            .search(&reader, "mara@example.com", SearchOptions::relevance(10))
            .await
            .unwrap();
        assert_eq!(by_email.len(), 1);
        assert_eq!(by_email[0].id, "u1");
    }
}
