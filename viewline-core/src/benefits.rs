use std::fmt::{self, Display};

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// The reward multiplier granted by an active VIP benefit
pub const VIP_MULTIPLIER: f64 = 2.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BenefitKind {
    SkipAds,
    AdFreeHour,
    PremiumContent,
    VipDay,
}

impl BenefitKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::SkipAds => "skip_ads",
            Self::AdFreeHour => "ad_free_hour",
            Self::PremiumContent => "premium_content",
            Self::VipDay => "vip_day",
        }
    }
}

impl Display for BenefitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum RedeemError {
    #[error("benefit {0} is not in the redemption catalog")]
    NotInCatalog(BenefitKind),
}

/// A redeemable perk as described by the reference catalog
#[derive(Debug, Clone, Serialize)]
pub struct CatalogEntry {
    #[serde(rename = "type")]
    pub kind: BenefitKind,
    pub name: String,
    pub description: String,
    /// Token cost charged on redemption
    pub cost: u64,
    /// How long the benefit stays active, none means it never expires
    pub duration_secs: Option<u64>,
}

/// The static redemption reference table. The core consumes this, it never
/// computes it.
#[derive(Debug, Clone)]
pub struct RedemptionCatalog {
    entries: Vec<CatalogEntry>,
}

impl RedemptionCatalog {
    pub fn new(entries: Vec<CatalogEntry>) -> Self {
        Self { entries }
    }

    pub fn entry(&self, kind: BenefitKind) -> Option<&CatalogEntry> {
        self.entries.iter().find(|e| e.kind == kind)
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }
}

impl Default for RedemptionCatalog {
    fn default() -> Self {
        Self::new(vec![
            CatalogEntry {
                kind: BenefitKind::SkipAds,
                name: "Skip Ads (1 session)".to_string(),
                description: "Skip all ads in your next viewing session".to_string(),
                cost: 50,
                duration_secs: None,
            },
            CatalogEntry {
                kind: BenefitKind::AdFreeHour,
                name: "Ad-Free Hour".to_string(),
                description: "No ads for 1 hour".to_string(),
                cost: 75,
                duration_secs: Some(3600),
            },
            CatalogEntry {
                kind: BenefitKind::PremiumContent,
                name: "Premium Content Access".to_string(),
                description: "Unlock premium content library".to_string(),
                cost: 100,
                duration_secs: None,
            },
            CatalogEntry {
                kind: BenefitKind::VipDay,
                name: "VIP Status (1 day)".to_string(),
                description: "All benefits + 2x rewards for 24 hours".to_string(),
                cost: 200,
                duration_secs: Some(86400),
            },
        ])
    }
}

/// A redeemed perk held by an account
#[derive(Debug, Clone, Serialize)]
pub struct Benefit {
    pub kind: BenefitKind,
    pub name: String,
    pub activated_at: DateTime<Utc>,
    pub expires_at: Option<DateTime<Utc>>,
}

impl Benefit {
    fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.map(|at| at < now).unwrap_or(false)
    }

    /// Whole seconds until expiry, none for benefits that never expire
    pub fn remaining_seconds(&self) -> Option<i64> {
        self.expires_at.map(|at| (at - Utc::now()).num_seconds())
    }
}

/// Holds the single active benefit per account. Expiry is lazy, any read
/// that finds an expired benefit evicts it.
#[derive(Default)]
pub struct BenefitLedger {
    active: DashMap<String, Benefit>,
}

impl BenefitLedger {
    /// Activates a benefit for an account, replacing whatever was active
    pub fn redeem(&self, account_id: &str, entry: &CatalogEntry) -> Benefit {
        let now = Utc::now();

        let benefit = Benefit {
            kind: entry.kind,
            name: entry.name.clone(),
            activated_at: now,
            expires_at: entry
                .duration_secs
                .map(|secs| now + Duration::seconds(secs as i64)),
        };

        self.active.insert(account_id.to_string(), benefit.clone());
        benefit
    }

    /// The account's active benefit, evicting it first if it expired
    pub fn current(&self, account_id: &str) -> Option<Benefit> {
        let now = Utc::now();

        self.active.remove_if(account_id, |_, b| b.is_expired_at(now));
        self.active.get(account_id).map(|b| b.clone())
    }

    /// The reward multiplier the account currently enjoys. This is the only
    /// place the multiplier is decided, reward computations must go through
    /// it rather than re-deriving it.
    pub fn active_multiplier(&self, account_id: &str) -> f64 {
        match self.current(account_id) {
            Some(benefit) if benefit.kind == BenefitKind::VipDay => VIP_MULTIPLIER,
            _ => 1.0,
        }
    }
}

#[cfg(test)]
mod test {
    use chrono::{Duration, Utc};

    use super::{Benefit, BenefitKind, BenefitLedger, RedemptionCatalog};

    fn ledger_with_benefit(account_id: &str, kind: BenefitKind, expires_in_ms: i64) -> BenefitLedger {
        let ledger = BenefitLedger::default();
        let now = Utc::now();

        ledger.active.insert(
            account_id.to_string(),
            Benefit {
                kind,
                name: kind.to_string(),
                activated_at: now,
                expires_at: Some(now + Duration::milliseconds(expires_in_ms)),
            },
        );

        ledger
    }

    #[test]
    fn redemption_overwrites() {
        let ledger = BenefitLedger::default();
        let catalog = RedemptionCatalog::default();

        ledger.redeem("alice", catalog.entry(BenefitKind::SkipAds).unwrap());
        ledger.redeem("alice", catalog.entry(BenefitKind::VipDay).unwrap());

        let current = ledger.current("alice").unwrap();
        assert_eq!(current.kind, BenefitKind::VipDay);
        assert!(current.remaining_seconds().unwrap() > 86000);
    }

    #[test]
    fn expired_benefit_is_evicted_on_read() {
        let ledger = ledger_with_benefit("alice", BenefitKind::VipDay, -1);

        assert!(ledger.current("alice").is_none());
        // The eviction is permanent, not just filtered from the read
        assert!(ledger.active.get("alice").is_none());
    }

    #[test]
    fn multiplier_law() {
        let catalog = RedemptionCatalog::default();

        let ledger = BenefitLedger::default();
        assert_eq!(ledger.active_multiplier("alice"), 1.0);

        ledger.redeem("alice", catalog.entry(BenefitKind::VipDay).unwrap());
        assert_eq!(ledger.active_multiplier("alice"), 2.0);

        ledger.redeem("alice", catalog.entry(BenefitKind::AdFreeHour).unwrap());
        assert_eq!(ledger.active_multiplier("alice"), 1.0);

        let expired = ledger_with_benefit("bob", BenefitKind::VipDay, -1);
        assert_eq!(expired.active_multiplier("bob"), 1.0);
    }

    #[test]
    fn catalog_defaults() {
        let catalog = RedemptionCatalog::default();

        assert_eq!(catalog.entries().len(), 4);

        let vip = catalog.entry(BenefitKind::VipDay).unwrap();
        assert_eq!(vip.cost, 200);
        assert_eq!(vip.duration_secs, Some(86400));

        let skip = catalog.entry(BenefitKind::SkipAds).unwrap();
        assert_eq!(skip.duration_secs, None);
    }
}
