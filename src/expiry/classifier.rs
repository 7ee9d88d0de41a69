//! Expiry classification
//!
//! Maps an expiry timestamp to an urgency tier using whole-day differences:
//! - EXPIRED: already past (days < 0)
//! - CRITICAL: today or tomorrow (0 ≤ days ≤ critical_days)
//! - WARNING: inside the alert horizon (critical_days < days ≤ warning_days)
//! - FRESH: everything later

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

const SECONDS_PER_DAY: i64 = 86_400;

/// Urgency tier for an item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UrgencyTier {
    Fresh,
    Warning,
    Critical,
    Expired,
}

impl std::fmt::Display for UrgencyTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl UrgencyTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            UrgencyTier::Fresh => "fresh",
            UrgencyTier::Warning => "warning",
            UrgencyTier::Critical => "critical",
            UrgencyTier::Expired => "expired",
        }
    }

    /// Tiers that produce an alert
    pub fn is_alertable(&self) -> bool {
        matches!(self, UrgencyTier::Warning | UrgencyTier::Critical)
    }
}

/// Day thresholds, inclusive upper bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExpiryThresholds {
    pub critical_days: i64,
    pub warning_days: i64,
}

impl Default for ExpiryThresholds {
    fn default() -> Self {
        Self {
            critical_days: 1,
            warning_days: 3,
        }
    }
}

impl ExpiryThresholds {
    /// Alert horizon in days; the critical bound never exceeds it
    pub fn with_horizon(warning_days: i64) -> Self {
        let defaults = Self::default();
        Self {
            critical_days: defaults.critical_days.min(warning_days),
            warning_days,
        }
    }

    pub fn classify_days(&self, days: i64) -> UrgencyTier {
        if days < 0 {
            UrgencyTier::Expired
        } else if days <= self.critical_days {
            UrgencyTier::Critical
        } else if days <= self.warning_days {
            UrgencyTier::Warning
        } else {
            UrgencyTier::Fresh
        }
    }
}

/// Whole days until expiry, floored.
///
/// Anything already past yields a negative value, so an item that expired an
/// hour ago is `-1` rather than `0`.
pub fn days_until(expiry: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    (expiry - now).num_seconds().div_euclid(SECONDS_PER_DAY)
}

/// Classify with the default 1/3 day thresholds
pub fn classify(expiry: DateTime<Utc>, now: DateTime<Utc>) -> UrgencyTier {
    ExpiryThresholds::default().classify_days(days_until(expiry, now))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 16, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_classify_expired() {
        assert_eq!(classify(now() - Duration::hours(1), now()), UrgencyTier::Expired);
        assert_eq!(classify(now() - Duration::days(3), now()), UrgencyTier::Expired);
    }

    #[test]
    fn test_classify_critical_today_and_tomorrow() {
        assert_eq!(classify(now(), now()), UrgencyTier::Critical);
        assert_eq!(classify(now() + Duration::hours(5), now()), UrgencyTier::Critical);
        assert_eq!(classify(now() + Duration::days(1), now()), UrgencyTier::Critical);
        assert_eq!(
            classify(now() + Duration::days(1) + Duration::hours(23), now()),
            UrgencyTier::Critical
        );
    }

    #[test]
    fn test_classify_warning_window() {
        assert_eq!(classify(now() + Duration::days(2), now()), UrgencyTier::Warning);
        assert_eq!(classify(now() + Duration::days(3), now()), UrgencyTier::Warning);
    }

    #[test]
    fn test_classify_fresh() {
        assert_eq!(classify(now() + Duration::days(4), now()), UrgencyTier::Fresh);
        assert_eq!(classify(now() + Duration::days(30), now()), UrgencyTier::Fresh);
    }

    #[test]
    fn test_days_until_floors_negative_values() {
        assert_eq!(days_until(now() - Duration::minutes(1), now()), -1);
        assert_eq!(days_until(now() + Duration::minutes(1), now()), 0);
        assert_eq!(days_until(now() + Duration::hours(47), now()), 1);
    }

    #[test]
    fn test_every_day_offset_matches_table() {
        let thresholds = ExpiryThresholds::default();
        for days in -5..=10 {
            let expected = match days {
                d if d < 0 => UrgencyTier::Expired,
                0 | 1 => UrgencyTier::Critical,
                2 | 3 => UrgencyTier::Warning,
                _ => UrgencyTier::Fresh,
            };
            assert_eq!(thresholds.classify_days(days), expected, "days = {}", days);
        }
    }

    #[test]
    fn test_seven_day_horizon() {
        let thresholds = ExpiryThresholds::with_horizon(7);
        assert_eq!(thresholds.classify_days(1), UrgencyTier::Critical);
        assert_eq!(thresholds.classify_days(6), UrgencyTier::Warning);
        assert_eq!(thresholds.classify_days(7), UrgencyTier::Warning);
        assert_eq!(thresholds.classify_days(8), UrgencyTier::Fresh);
    }

    #[test]
    fn test_tier_display_and_serde() {
        assert_eq!(UrgencyTier::Critical.to_string(), "critical");
        assert_eq!(
            serde_json::to_string(&UrgencyTier::Warning).unwrap(),
            "\"warning\""
        );
        assert!(UrgencyTier::Warning.is_alertable());
        assert!(!UrgencyTier::Expired.is_alertable());
    }
}
