use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Records a free account may log per calendar month.
pub const FREE_MONTHLY_QUOTA: usize = 50;

/// How far back a free account can see, in days.
pub const FREE_VISIBILITY_DAYS: i64 = 30;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Free,
    Premium,
}

impl Tier {
    pub fn from_premium_flag(is_premium: bool) -> Self {
        if is_premium {
            Tier::Premium
        } else {
            Tier::Free
        }
    }

    pub fn limits(self) -> TierLimits {
        TierLimits::for_tier(self)
    }
}

/// What a tier may do.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TierLimits {
    pub tier: Tier,
    /// Visible history in days. None = unlimited.
    pub visibility_days: Option<i64>,
    /// Writes per calendar month. None = unlimited.
    pub monthly_quota: Option<usize>,
    pub family_sharing: bool,
}

impl TierLimits {
    /// | Tier | History | Writes/month | Family |
    /// |------|---------|--------------|--------|
    /// | Free | 30 days | 50 | No |
    /// | Premium | Unlimited | Unlimited | Yes |
    pub fn for_tier(tier: Tier) -> Self {
        match tier {
            Tier::Free => Self {
                tier,
                visibility_days: Some(FREE_VISIBILITY_DAYS),
                monthly_quota: Some(FREE_MONTHLY_QUOTA),
                family_sharing: false,
            },
            Tier::Premium => Self {
                tier,
                visibility_days: None,
                monthly_quota: None,
                family_sharing: true,
            },
        }
    }

    /// Whether another write would exceed the monthly quota.
    pub fn quota_reached(&self, monthly_count: usize) -> bool {
        self.monthly_quota
            .map(|max| monthly_count >= max)
            .unwrap_or(false)
    }

    /// Oldest visible instant, when history is limited.
    pub fn visible_since(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.visibility_days.map(|days| now - Duration::days(days))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn free_quota_boundary() {
        let limits = Tier::Free.limits();
        assert!(!limits.quota_reached(49));
        assert!(limits.quota_reached(50));
        assert!(limits.quota_reached(51));
    }

    #[test]
    fn premium_is_unlimited() {
        let limits = Tier::Premium.limits();
        assert!(!limits.quota_reached(10_000));
        assert!(limits.visible_since(Utc::now()).is_none());
        assert!(limits.family_sharing);
    }

    #[test]
    fn free_visibility_window() {
        let now = Utc::now();
        let since = Tier::Free.limits().visible_since(now).unwrap();
        assert_eq!(now - since, Duration::days(30));
    }
}
