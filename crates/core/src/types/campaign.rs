//! Catalog taxonomy and promotional campaigns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::coupon::CouponCode;
use super::id::{CampaignId, CategoryId};

/// A product category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    /// URL-safe unique key derived from the name.
    pub slug: String,
}

/// A coupon campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: CampaignId,
    pub code: CouponCode,
    /// Discount in percent, `1..=100`.
    pub discount_percent: u8,
    #[serde(default)]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl Campaign {
    /// Whether a customer can redeem this campaign at `now`.
    #[must_use]
    pub fn is_redeemable(&self, now: DateTime<Utc>) -> bool {
        self.active && self.expires_at.is_none_or(|expiry| expiry > now)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn campaign(expires_at: Option<DateTime<Utc>>, active: bool) -> Campaign {
        Campaign {
            id: CampaignId::from(1),
            code: CouponCode::parse("SPRING").unwrap(),
            discount_percent: 10,
            expires_at,
            active,
        }
    }

    #[test]
    fn test_redeemable_without_expiry() {
        assert!(campaign(None, true).is_redeemable(Utc::now()));
    }

    #[test]
    fn test_not_redeemable_when_expired_or_inactive() {
        let now = Utc::now();
        assert!(!campaign(Some(now - Duration::hours(1)), true).is_redeemable(now));
        assert!(!campaign(None, false).is_redeemable(now));
    }
}
