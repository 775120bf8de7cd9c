use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use tower_cookies::Cookies;

use webdash_backend::search::{
    EndpointClass, EntityTypeFilter, PaginatedSearchResult, SearchError, SearchQuery,
    SearchResultItem, SortBy,
};

use crate::auth;
use crate::state::AppState;

use super::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub q: String,
    #[serde(rename = "type", default)]
    pub entity_type: Option<String>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub sort_by: Option<String>,
}

fn default_page() -> usize {
    1
}
fn default_limit() -> usize {
    20
}

#[derive(Debug, Deserialize)]
pub struct QuickSearchParams {
    #[serde(default)]
    pub q: String,
}

type ApiError = (StatusCode, Json<Value>);

fn unauthorized() -> ApiError {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": "authentication required"})),
    )
}

fn reject(err: SearchError) -> ApiError {
    match err {
        SearchError::InvalidQuery(msg) => (StatusCode::BAD_REQUEST, Json(json!({"error": msg}))),
        SearchError::RateLimited { retry_after_secs } => (
            StatusCode::TOO_MANY_REQUESTS,
            Json(json!({
                "error": "too many search requests",
                "retry_after_secs": retry_after_secs,
            })),
        ),
    }
}

/// GET /api/search / 完整联合搜索
pub async fn search(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Query(params): Query<SearchParams>,
) -> Result<Json<ApiResponse<PaginatedSearchResult>>, ApiError> {
    let ctx = auth::get_permission_context(&state.db, &cookies)
        .await
        .ok_or_else(unauthorized)?;

    state
        .rate_limiter
        .check(&ctx.user_id, EndpointClass::FullSearch)
        .map_err(reject)?;

    let sort_by = match params.sort_by.as_deref() {
        None => SortBy::default(),
        Some(raw) => SortBy::parse(raw).ok_or_else(|| {
            reject(SearchError::InvalidQuery(format!(
                "unknown sort_by value: {}",
                raw
            )))
        })?,
    };

    let query = SearchQuery {
        text: params.q,
        entity_types: EntityTypeFilter::parse(params.entity_type.as_deref().unwrap_or("all")),
        page: params.page,
        limit: params.limit,
        sort_by,
    };

    let result = state.coordinator.search(&ctx, &query).await.map_err(reject)?;
    Ok(Json(ApiResponse::success(result)))
}

/// GET /api/search/quick / 快速搜索(即时搜索UI)
pub async fn quick_search(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
    Query(params): Query<QuickSearchParams>,
) -> Result<Json<ApiResponse<Vec<SearchResultItem>>>, ApiError> {
    let ctx = auth::get_permission_context(&state.db, &cookies)
        .await
        .ok_or_else(unauthorized)?;

    state
        .rate_limiter
        .check(&ctx.user_id, EndpointClass::QuickSearch)
        .map_err(reject)?;

    let items = state.coordinator.quick_search(&ctx, &params.q).await;
    Ok(Json(ApiResponse::success(items)))
}

/// GET /api/search/types - entity types the caller may search / 调用者可搜索的实体类型
pub async fn searchable_types(
    State(state): State<Arc<AppState>>,
    cookies: Cookies,
) -> Result<Json<ApiResponse<Vec<String>>>, ApiError> {
    let ctx = auth::get_permission_context(&state.db, &cookies)
        .await
        .ok_or_else(unauthorized)?;

    let mut types = Vec::new();
    for provider in state.registry.all().await {
        if ctx.has_permission(provider.required_permission()) {
            types.push(provider.entity_type().to_string());
        }
    }
    Ok(Json(ApiResponse::success(types)))
}
