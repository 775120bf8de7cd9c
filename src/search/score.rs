//! Tiered-match relevance policy / 分级匹配相关度策略
//!
//! Not shared code but a shared contract: every provider scores its own
//! candidates with these tiers so cross-type ranking stays comparable.
//! Scores are additive across matched fields and never negative; a record
//! that matches nothing was already excluded by the provider's own predicate.

/// Exact case-insensitive match on the primary display field / 主字段完全匹配
pub const PRIMARY_EXACT: f32 = 100.0;
/// Primary field starts with the query / 主字段前缀匹配
pub const PRIMARY_PREFIX: f32 = 75.0;
/// Primary field contains the query / 主字段包含匹配
pub const PRIMARY_CONTAINS: f32 = 50.0;
/// Exact match on a secondary identifying field (SKU, slug, username) / 次级标识字段完全匹配
pub const SECONDARY_EXACT: f32 = 90.0;
/// Substring match on a secondary identifying field / 次级标识字段包含匹配
pub const SECONDARY_CONTAINS: f32 = 40.0;
/// Long-form field weight range; a more specific field (excerpt) may pick a
/// higher constant than a less specific one (full body) / 长文本字段权重范围
pub const LONG_FORM_MIN: f32 = 20.0;
pub const LONG_FORM_MAX: f32 = 25.0;

/// Score the primary display field (title/name) / 为主展示字段打分
pub fn primary(field: &str, query_lower: &str) -> f32 {
    let field = field.to_lowercase();
    if field == query_lower {
        PRIMARY_EXACT
    } else if field.starts_with(query_lower) {
        PRIMARY_PREFIX
    } else if field.contains(query_lower) {
        PRIMARY_CONTAINS
    } else {
        0.0
    }
}

/// Score a secondary identifying field / 为次级标识字段打分
pub fn secondary(field: &str, query_lower: &str) -> f32 {
    let field = field.to_lowercase();
    if field == query_lower {
        SECONDARY_EXACT
    } else if field.contains(query_lower) {
        SECONDARY_CONTAINS
    } else {
        0.0
    }
}

/// Score a long-form field (description/body/excerpt) with a provider-chosen
/// weight inside the allowed range / 为长文本字段打分
pub fn long_form(field: &str, query_lower: &str, weight: f32) -> f32 {
    if field.to_lowercase().contains(query_lower) {
        weight.clamp(LONG_FORM_MIN, LONG_FORM_MAX)
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_tiers() {
        assert_eq!(primary("Aurora Lamp", "aurora lamp"), PRIMARY_EXACT);
        assert_eq!(primary("Aurora Lamp", "aurora"), PRIMARY_PREFIX);
        assert_eq!(primary("Aurora Lamp", "lamp"), PRIMARY_CONTAINS);
        assert_eq!(primary("Aurora Lamp", "desk"), 0.0);
    }

    #[test]
    fn test_secondary_tiers() {
        assert_eq!(secondary("SKU-1024", "sku-1024"), SECONDARY_EXACT);
        assert_eq!(secondary("SKU-1024", "1024"), SECONDARY_CONTAINS);
        assert_eq!(secondary("SKU-1024", "2048"), 0.0);
    }

    #[test]
    fn test_long_form_weight_is_clamped() {
        assert_eq!(long_form("a warm light", "warm", 22.0), 22.0);
        assert_eq!(long_form("a warm light", "warm", 99.0), LONG_FORM_MAX);
        assert_eq!(long_form("a warm light", "warm", 1.0), LONG_FORM_MIN);
        assert_eq!(long_form("a warm light", "cold", 22.0), 0.0);
    }

    #[test]
    fn test_scores_add_across_fields() {
        // A record matching title prefix and description sums points
        let total = primary("Aurora Lamp", "aurora")
            + long_form("the aurora series", "aurora", 22.0);
        assert_eq!(total, PRIMARY_PREFIX + 22.0);
    }
}
