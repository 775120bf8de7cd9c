use thiserror::Error;

/// Caller-visible search errors / 对调用方可见的搜索错误
///
/// Provider-internal failures are not part of this taxonomy: a provider that
/// errors or times out degrades to an empty contribution and a warning log.
#[derive(Debug, Error)]
pub enum SearchError {
    /// Malformed query parameters, rejected before any provider is touched / 参数校验失败
    #[error("invalid search query: {0}")]
    InvalidQuery(String),

    /// Request budget for the current window is exhausted / 当前窗口配额已用完
    #[error("rate limit exceeded, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },
}
