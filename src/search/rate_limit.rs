//! Per-user sliding-window rate limiting / 按用户的滑动窗口限流
//!
//! Guards the coordinator's two entry points. Counters are shared mutable
//! state across concurrent requests from the same user; increment-and-compare
//! happens under one lock so two racing requests cannot both slip under the
//! ceiling.

use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use std::collections::HashMap;

use crate::config::{RateLimitConfig, RateLimitRule};

use super::error::SearchError;

/// Endpoint class with its own budget / 拥有独立配额的端点类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EndpointClass {
    FullSearch,
    QuickSearch,
}

impl EndpointClass {
    fn as_str(&self) -> &'static str {
        match self {
            EndpointClass::FullSearch => "full-search",
            EndpointClass::QuickSearch => "quick-search",
        }
    }
}

/// Window counter state / 窗口计数状态
#[derive(Debug, Clone)]
struct WindowState {
    count: u32,
    window_start: DateTime<Utc>,
}

/// Rate limiter with per (user, endpoint-class) windows / 按(用户,端点类别)的限流器
///
/// Constructed once and injected everywhere; window and ceiling come from
/// configuration so operators can tune burst tolerance per endpoint class.
pub struct RateLimiter {
    config: RateLimitConfig,
    windows: Mutex<HashMap<(String, EndpointClass), WindowState>>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            config,
            windows: Mutex::new(HashMap::new()),
        }
    }

    fn rule(&self, class: EndpointClass) -> RateLimitRule {
        match class {
            EndpointClass::FullSearch => self.config.search,
            EndpointClass::QuickSearch => self.config.quick_search,
        }
    }

    /// Count one request; reject once the window ceiling is reached / 计数一次请求，达到上限则拒绝
    pub fn check(&self, user_id: &str, class: EndpointClass) -> Result<(), SearchError> {
        self.check_at(user_id, class, Utc::now())
    }

    fn check_at(
        &self,
        user_id: &str,
        class: EndpointClass,
        now: DateTime<Utc>,
    ) -> Result<(), SearchError> {
        let rule = self.rule(class);
        let window = Duration::seconds(rule.window_secs as i64);

        let mut windows = self.windows.lock();

        // Prune entries whose window has elapsed / 清理已过期的窗口
        let search_rule = self.config.search;
        let quick_rule = self.config.quick_search;
        windows.retain(|(_, c), state| {
            let w = match c {
                EndpointClass::FullSearch => search_rule.window_secs,
                EndpointClass::QuickSearch => quick_rule.window_secs,
            };
            now.signed_duration_since(state.window_start) < Duration::seconds(w as i64)
        });

        let state = windows
            .entry((user_id.to_string(), class))
            .or_insert(WindowState {
                count: 0,
                window_start: now,
            });

        // Roll the window once it elapses / 窗口过期后重置
        if now.signed_duration_since(state.window_start) >= window {
            state.count = 0;
            state.window_start = now;
        }

        if state.count >= rule.max_requests {
            let elapsed = now.signed_duration_since(state.window_start);
            let retry_after_secs = (window - elapsed).num_seconds().max(1) as u64;
            tracing::warn!(
                "Rate limit exceeded: user={} endpoint={} ({}/{} in {}s window)",
                user_id,
                class.as_str(),
                state.count,
                rule.max_requests,
                rule.window_secs
            );
            return Err(SearchError::RateLimited { retry_after_secs });
        }

        state.count += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter(max_requests: u32, window_secs: u64) -> RateLimiter {
        let rule = RateLimitRule { max_requests, window_secs };
        RateLimiter::new(RateLimitConfig {
            search: rule,
            quick_search: rule,
        })
    }

    #[test]
    fn test_rejects_once_ceiling_reached() {
        let limiter = limiter(10, 60);
        let now = Utc::now();

        let mut rejected = 0;
        for _ in 0..12 {
            if limiter.check_at("u1", EndpointClass::FullSearch, now).is_err() {
                rejected += 1;
            }
        }
        assert_eq!(rejected, 2);
    }

    #[test]
    fn test_window_rollover_allows_again() {
        let limiter = limiter(2, 60);
        let start = Utc::now();

        assert!(limiter.check_at("u1", EndpointClass::FullSearch, start).is_ok());
        assert!(limiter.check_at("u1", EndpointClass::FullSearch, start).is_ok());
        assert!(limiter.check_at("u1", EndpointClass::FullSearch, start).is_err());

        let later = start + Duration::seconds(61);
        assert!(limiter.check_at("u1", EndpointClass::FullSearch, later).is_ok());
    }

    #[test]
    fn test_rejection_carries_retry_hint() {
        let limiter = limiter(1, 60);
        let start = Utc::now();

        assert!(limiter.check_at("u1", EndpointClass::FullSearch, start).is_ok());
        let err = limiter
            .check_at("u1", EndpointClass::FullSearch, start + Duration::seconds(20))
            .unwrap_err();
        match err {
            SearchError::RateLimited { retry_after_secs } => {
                assert_eq!(retry_after_secs, 40);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_endpoint_classes_are_independent() {
        let limiter = limiter(1, 60);
        let now = Utc::now();

        assert!(limiter.check_at("u1", EndpointClass::FullSearch, now).is_ok());
        // Full search budget is spent but quick search still passes
        assert!(limiter.check_at("u1", EndpointClass::FullSearch, now).is_err());
        assert!(limiter.check_at("u1", EndpointClass::QuickSearch, now).is_ok());
    }

    #[test]
    fn test_users_are_independent() {
        let limiter = limiter(1, 60);
        let now = Utc::now();

        assert!(limiter.check_at("u1", EndpointClass::FullSearch, now).is_ok());
        assert!(limiter.check_at("u2", EndpointClass::FullSearch, now).is_ok());
    }
}
