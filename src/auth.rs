use sqlx::SqlitePool;
use std::collections::HashSet;
use tower_cookies::Cookies;

use webdash_backend::config;
use webdash_backend::search::PermissionContext;

pub const SESSION_COOKIE_NAME: &str = "session_token";

/// Capabilities granted to each role / 各角色持有的权限
pub fn role_permissions(role: &str) -> HashSet<String> {
    let perms: &[&str] = match role {
        "admin" => &[
            "products.read",
            "products.manage",
            "posts.read",
            "posts.manage",
            "pages.read",
            "pages.manage",
            "users.read",
            "users.manage",
        ],
        "editor" => &[
            "products.read",
            "products.manage",
            "posts.read",
            "posts.manage",
            "pages.read",
            "pages.manage",
        ],
        "viewer" => &["products.read", "posts.read", "pages.read"],
        _ => &[],
    };
    perms.iter().map(|s| s.to_string()).collect()
}

/// Guest capabilities (public content only) / 游客权限（仅公开内容）
fn guest_context() -> PermissionContext {
    let perms: HashSet<String> = ["products.read", "pages.read"]
        .iter()
        .map(|s| s.to_string())
        .collect();
    PermissionContext::new("guest", perms)
}

/// Resolve the caller's permission context from the session cookie
/// / 从会话Cookie解析调用者的权限上下文
///
/// Invalid or expired sessions fall back to guest access when guests are
/// enabled; `None` means the request cannot be served at all (401).
pub async fn get_permission_context(
    db: &SqlitePool,
    cookies: &Cookies,
) -> Option<PermissionContext> {
    if let Some(token) = cookies.get(SESSION_COOKIE_NAME).map(|c| c.value().to_string()) {
        let row: Option<(String, String, bool)> = sqlx::query_as(
            "SELECT u.id, u.role, u.enabled FROM users u \
             JOIN sessions s ON u.id = s.user_id \
             WHERE s.token = ? AND s.expires_at > ?",
        )
        .bind(&token)
        .bind(chrono::Utc::now().timestamp())
        .fetch_optional(db)
        .await
        .ok()
        .flatten();

        match row {
            Some((user_id, role, true)) => {
                return Some(PermissionContext::new(user_id, role_permissions(&role)));
            }
            Some((user_id, _, false)) => {
                tracing::debug!("Session for disabled user rejected: {}", user_id);
            }
            None => {
                // Session invalid or expired, fall through to guest / 会话无效则回退游客
                tracing::debug!("Session token did not resolve to an active user");
            }
        }
    }

    if config::config().server.allow_guest {
        Some(guest_context())
    } else {
        None
    }
}

/// Create a session for a user, returns the token / 为用户创建会话，返回令牌
pub async fn create_session(user_id: &str, db: &SqlitePool) -> anyhow::Result<String> {
    use rand::Rng;
    let token: String = rand::thread_rng()
        .sample_iter(&rand::distributions::Alphanumeric)
        .take(64)
        .map(char::from)
        .collect();

    // Sessions last 7 days / 会话有效期7天
    let expires_at = chrono::Utc::now().timestamp() + 7 * 24 * 60 * 60;

    sqlx::query("INSERT INTO sessions (token, user_id, expires_at, created_at) VALUES (?, ?, ?, ?)")
        .bind(&token)
        .bind(user_id)
        .bind(expires_at)
        .bind(chrono::Utc::now().to_rfc3339())
        .execute(db)
        .await?;

    Ok(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        assert!(role_permissions("admin").contains("users.read"));
        assert!(!role_permissions("editor").contains("users.read"));
        assert!(role_permissions("editor").contains("posts.manage"));
        assert!(!role_permissions("viewer").contains("posts.manage"));
        assert!(role_permissions("unknown-role").is_empty());
    }
}
