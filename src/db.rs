use anyhow::Result;
use chrono::Utc;
use sqlx::SqlitePool;
use uuid::Uuid;

/// Run database migrations / 运行数据库迁移
pub async fn run_migrations(pool: &SqlitePool) -> Result<()> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            username TEXT NOT NULL UNIQUE,
            display_name TEXT NOT NULL,
            email TEXT NOT NULL,
            role TEXT NOT NULL DEFAULT 'viewer',
            enabled INTEGER NOT NULL DEFAULT 1,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            expires_at INTEGER NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS products (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            sku TEXT NOT NULL UNIQUE,
            description TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'DRAFT',
            price REAL NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS posts (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            excerpt TEXT NOT NULL DEFAULT '',
            body TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'DRAFT',
            author_id TEXT NOT NULL,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS pages (
            id TEXT PRIMARY KEY,
            title TEXT NOT NULL,
            slug TEXT NOT NULL UNIQUE,
            body TEXT NOT NULL DEFAULT '',
            status TEXT NOT NULL DEFAULT 'DRAFT',
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Row-gate filters hit these columns on every search / 行级过滤每次搜索都会用到这些列
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_products_status ON products(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_posts_status ON posts(status)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_sessions_user ON sessions(user_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Seed demo accounts and content on first run / 首次运行时写入演示账户与内容
pub async fn seed_if_empty(pool: &SqlitePool) -> Result<()> {
    let user_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
        .fetch_one(pool)
        .await?;
    if user_count > 0 {
        return Ok(());
    }

    let now = Utc::now().to_rfc3339();

    let mut session_notes = Vec::new();
    for (username, display_name, email, role) in [
        ("admin", "Administrator", "admin@example.com", "admin"),
        ("editor", "Content Editor", "editor@example.com", "editor"),
        ("viewer", "Read Only", "viewer@example.com", "viewer"),
    ] {
        let id = Uuid::new_v4().to_string();
        sqlx::query(
            "INSERT INTO users (id, username, display_name, email, role, enabled, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, 1, ?, ?)",
        )
        .bind(&id)
        .bind(username)
        .bind(display_name)
        .bind(email)
        .bind(role)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;

        let token = crate::auth::create_session(&id, pool).await?;
        session_notes.push((username, token));
    }

    for (name, sku, description, status, price) in [
        (
            "Aurora Desk Lamp",
            "SKU-1001",
            "Warm LED desk lamp with adjustable arm",
            "PUBLISHED",
            79.0,
        ),
        (
            "Walnut Monitor Stand",
            "SKU-1002",
            "Solid walnut stand with cable channel",
            "PUBLISHED",
            59.0,
        ),
        (
            "Prototype Split Keyboard",
            "SKU-1003",
            "Unreleased split mechanical keyboard",
            "DRAFT",
            149.0,
        ),
    ] {
        sqlx::query(
            "INSERT INTO products (id, name, sku, description, status, price, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(name)
        .bind(sku)
        .bind(description)
        .bind(status)
        .bind(price)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    let author_id: String = sqlx::query_scalar("SELECT id FROM users WHERE username = 'editor'")
        .fetch_one(pool)
        .await?;
    for (title, slug, excerpt, body, status) in [
        (
            "Spring release notes",
            "spring-release-notes",
            "Everything that shipped this spring",
            "The spring release brings the new dashboard search.",
            "PUBLISHED",
        ),
        (
            "Roadmap sketch",
            "roadmap-sketch",
            "Rough notes for the next quarter",
            "Still collecting ideas, do not publish yet.",
            "DRAFT",
        ),
    ] {
        sqlx::query(
            "INSERT INTO posts (id, title, slug, excerpt, body, status, author_id, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(title)
        .bind(slug)
        .bind(excerpt)
        .bind(body)
        .bind(status)
        .bind(&author_id)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    for (title, slug, body, status) in [
        (
            "About us",
            "about-us",
            "We build a small dashboard with federated search.",
            "PUBLISHED",
        ),
        (
            "Shipping policy",
            "shipping-policy",
            "Orders ship within two business days.",
            "PUBLISHED",
        ),
    ] {
        sqlx::query(
            "INSERT INTO pages (id, title, slug, body, status, created_at, updated_at) \
             VALUES (?, ?, ?, ?, ?, ?, ?)",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(title)
        .bind(slug)
        .bind(body)
        .bind(status)
        .bind(&now)
        .bind(&now)
        .execute(pool)
        .await?;
    }

    tracing::info!("Seeded demo data ({} users)", session_notes.len());
    for (username, token) in session_notes {
        tracing::info!("Demo session for {}: session_token={}", username, token);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    #[tokio::test]
    async fn test_migrations_and_seed_are_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let db_path = dir.path().join("webdash.db");
        let url = format!("sqlite:{}?mode=rwc", db_path.to_string_lossy());
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect(&url)
            .await
            .unwrap();

        run_migrations(&pool).await.unwrap();
        run_migrations(&pool).await.unwrap();
        seed_if_empty(&pool).await.unwrap();
        // Second seed run must not duplicate rows / 第二次seed不能重复写入
        seed_if_empty(&pool).await.unwrap();

        let users: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 3);
        let sessions: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sessions")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(sessions, 3);
        let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(products, 3);
    }
}
