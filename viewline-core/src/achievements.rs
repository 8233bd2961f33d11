use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Badge {
    FirstWatch,
    BingeWatcher,
    RatingMaster,
    VipMember,
}

/// The static description of an achievement, consumed as reference data
#[derive(Debug)]
pub struct AchievementDef {
    pub badge: Badge,
    pub name: &'static str,
    pub description: &'static str,
    pub icon: &'static str,
    /// The count a progress-based badge asks for, shown to users
    pub requirement: Option<u32>,
}

const DEFINITIONS: [AchievementDef; 4] = [
    AchievementDef {
        badge: Badge::FirstWatch,
        name: "First Watch",
        description: "Watched your first video",
        icon: "🥇",
        requirement: None,
    },
    AchievementDef {
        badge: Badge::BingeWatcher,
        name: "Binge Watcher",
        description: "Watched 10 videos in total",
        icon: "📺",
        requirement: Some(10),
    },
    AchievementDef {
        badge: Badge::RatingMaster,
        name: "Rating Master",
        description: "Submitted 5 ratings",
        icon: "⭐",
        requirement: Some(5),
    },
    AchievementDef {
        badge: Badge::VipMember,
        name: "VIP Member",
        description: "Activated VIP status",
        icon: "👑",
        requirement: None,
    },
];

impl Badge {
    /// Every badge in its fixed evaluation order
    pub const ALL: [Badge; 4] = [
        Badge::FirstWatch,
        Badge::BingeWatcher,
        Badge::RatingMaster,
        Badge::VipMember,
    ];

    pub fn definition(&self) -> &'static AchievementDef {
        DEFINITIONS
            .iter()
            .find(|d| d.badge == *self)
            .expect("every badge has a definition")
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstWatch => "first_watch",
            Self::BingeWatcher => "binge_watcher",
            Self::RatingMaster => "rating_master",
            Self::VipMember => "vip_member",
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum BadgeState {
    /// An award attempt owns this badge but its settlement outcome is not
    /// known yet
    Pending,
    Earned { serial: Option<u64> },
}

#[derive(Default)]
struct AccountRecord {
    badges: Mutex<HashMap<Badge, BadgeState>>,
}

/// A badge an account holds, with the mint serial when settlement succeeded
#[derive(Debug, Clone, Copy)]
pub struct OwnedBadge {
    pub badge: Badge,
    pub serial: Option<u64>,
}

/// Per-account badge records. A badge moves from unearned to earned exactly
/// once, the transition is claimed under the account's lock so concurrent
/// checks cannot double-award.
#[derive(Default)]
pub struct AchievementEngine {
    records: DashMap<String, Arc<AccountRecord>>,
}

impl AchievementEngine {
    fn record(&self, account_id: &str) -> Arc<AccountRecord> {
        self.records
            .entry(account_id.to_string())
            .or_default()
            .value()
            .clone()
    }

    pub fn has(&self, account_id: &str, badge: Badge) -> bool {
        self.records
            .get(account_id)
            .map(|r| r.badges.lock().contains_key(&badge))
            .unwrap_or(false)
    }

    /// The account's earned badges in definition order
    pub fn owned(&self, account_id: &str) -> Vec<OwnedBadge> {
        let record = self.record(account_id);
        let badges = record.badges.lock();

        Badge::ALL
            .iter()
            .filter_map(|badge| match badges.get(badge) {
                Some(BadgeState::Earned { serial }) => Some(OwnedBadge {
                    badge: *badge,
                    serial: *serial,
                }),
                Some(BadgeState::Pending) => Some(OwnedBadge {
                    badge: *badge,
                    serial: None,
                }),
                None => None,
            })
            .collect()
    }

    /// Claims the right to award a badge. Returns false when the badge is
    /// already earned or another attempt is in flight, which makes awarding
    /// idempotent without holding any lock across the settlement call.
    pub(crate) fn begin_award(&self, account_id: &str, badge: Badge) -> bool {
        let record = self.record(account_id);
        let mut badges = record.badges.lock();

        if badges.contains_key(&badge) {
            return false;
        }

        badges.insert(badge, BadgeState::Pending);
        true
    }

    /// Records the settlement outcome of a claimed award. The badge is
    /// earned either way, a failed mint just leaves the serial empty.
    pub(crate) fn finish_award(&self, account_id: &str, badge: Badge, serial: Option<u64>) {
        let record = self.record(account_id);

        record
            .badges
            .lock()
            .insert(badge, BadgeState::Earned { serial });
    }
}

#[cfg(test)]
mod test {
    use super::{AchievementEngine, Badge};

    #[test]
    fn award_is_claimed_once() {
        let engine = AchievementEngine::default();

        assert!(engine.begin_award("alice", Badge::FirstWatch));
        // A second attempt must not pass while the first is in flight
        assert!(!engine.begin_award("alice", Badge::FirstWatch));

        engine.finish_award("alice", Badge::FirstWatch, Some(7));

        assert!(!engine.begin_award("alice", Badge::FirstWatch));
        assert!(engine.has("alice", Badge::FirstWatch));
    }

    #[test]
    fn failed_settlement_still_earns() {
        let engine = AchievementEngine::default();

        assert!(engine.begin_award("alice", Badge::VipMember));
        engine.finish_award("alice", Badge::VipMember, None);

        assert!(engine.has("alice", Badge::VipMember));

        let owned = engine.owned("alice");
        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].serial, None);
    }

    #[test]
    fn definitions_cover_every_badge() {
        for badge in Badge::ALL {
            let def = badge.definition();
            assert_eq!(def.badge, badge);
            assert!(!def.name.is_empty());
        }
    }
}
