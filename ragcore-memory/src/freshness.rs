//! ABOUTME: The freshness-weighted recall score. Constants are a contract
//! ABOUTME: per spec.md §4.B, not free tuning parameters.

/// Time constant, in days, for the recency decay term.
pub const RECENCY_TAU_DAYS: f64 = 30.0;

/// `score = sim * (0.4 + 0.3*imp + 0.2*exp(-age_days/tau) + 0.1*min(n,10)/10)`.
#[must_use]
pub fn freshness_score(sim: f32, importance: f32, age_days: f64, access_count: u32) -> f32 {
    let recency = (-age_days / RECENCY_TAU_DAYS).exp();
    let access_term = f64::from(access_count.min(10)) / 10.0;
    let weight = 0.4 + 0.3 * f64::from(importance) + 0.2 * recency + 0.1 * access_term;
    sim * weight as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn brand_new_memory_with_zero_importance_and_access() {
        let score = freshness_score(1.0, 0.0, 0.0, 0);
        assert!((score - 0.6).abs() < 1e-4);
    }

    #[test]
    fn max_importance_and_access_and_fresh() {
        let score = freshness_score(1.0, 1.0, 0.0, 10);
        assert!((score - 1.0).abs() < 1e-4);
    }

    #[test]
    fn decays_with_age() {
        let fresh = freshness_score(1.0, 0.5, 0.0, 0);
        let old = freshness_score(1.0, 0.5, 60.0, 0);
        assert!(old < fresh);
    }

    #[test]
    fn scales_with_similarity() {
        let half_sim = freshness_score(0.5, 0.5, 0.0, 0);
        let full_sim = freshness_score(1.0, 0.5, 0.0, 0);
        assert!((full_sim - 2.0 * half_sim).abs() < 1e-4);
    }
}
