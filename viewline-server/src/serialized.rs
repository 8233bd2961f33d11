//! All schemas that are exposed from endpoints are defined here
//! along with the ToSerialized impls

use chrono::{DateTime, Utc};
use serde::Serialize;
use viewline_core::{
    AwardedBadge, Badge, BadgeStatus, Benefit, BenefitKind, BonusOutcome, RatingOutcome,
    RedeemOutcome, RewardOutcome, WatchOutcome,
};

#[derive(Debug, Serialize)]
pub struct BenefitBody {
    #[serde(rename = "type")]
    kind: BenefitKind,
    name: String,
    activated_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    remaining_seconds: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct BadgeBody {
    #[serde(rename = "type")]
    badge: Badge,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    requirement: Option<u32>,
    owned: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    serial: Option<u64>,
}

#[derive(Debug, Serialize)]
pub struct AwardedBadgeBody {
    #[serde(rename = "type")]
    badge: Badge,
    name: &'static str,
    description: &'static str,
    icon: &'static str,
    serial: Option<u64>,
    /// False when the badge was recorded without a settled mint
    settled: bool,
}

#[derive(Debug, Serialize)]
pub struct VideosWatchedBody {
    pub videos_watched: usize,
    pub new_badges: Vec<AwardedBadgeBody>,
}

#[derive(Debug, Serialize)]
pub struct RatingResultBody {
    rating: u8,
    reward: u64,
    base_reward: u64,
    multiplier: f64,
    vip_bonus: bool,
    settled: bool,
    transaction_id: Option<String>,
    new_badges: Vec<AwardedBadgeBody>,
}

#[derive(Debug, Serialize)]
pub struct BonusBody {
    bonus: u64,
    base_bonus: u64,
    multiplier: f64,
    vip_bonus: bool,
    videos_watched: usize,
    message: String,
    /// Absent when no tier was claimed by this probe
    #[serde(skip_serializing_if = "Option::is_none")]
    settled: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    transaction_id: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct RedeemBody {
    benefit: BenefitBody,
    cost: u64,
    settled: bool,
    transaction_id: Option<String>,
    new_badges: Vec<AwardedBadgeBody>,
}

#[derive(Debug, Serialize)]
pub struct RewardBody {
    amount: u64,
    settled: bool,
    transaction_id: Option<String>,
}

/// Helper trait to convert any type into a serialized version
pub trait ToSerialized<T>
where
    T: Serialize,
{
    fn to_serialized(&self) -> T;
}

impl<I, O> ToSerialized<Vec<O>> for Vec<I>
where
    I: ToSerialized<O>,
    O: Serialize,
{
    fn to_serialized(&self) -> Vec<O> {
        self.iter().map(|x| x.to_serialized()).collect()
    }
}

impl ToSerialized<BenefitBody> for Benefit {
    fn to_serialized(&self) -> BenefitBody {
        BenefitBody {
            kind: self.kind,
            name: self.name.clone(),
            activated_at: self.activated_at,
            expires_at: self.expires_at,
            remaining_seconds: self.remaining_seconds(),
        }
    }
}

impl ToSerialized<BadgeBody> for BadgeStatus {
    fn to_serialized(&self) -> BadgeBody {
        let def = self.badge.definition();

        BadgeBody {
            badge: self.badge,
            name: def.name,
            description: def.description,
            icon: def.icon,
            requirement: def.requirement,
            owned: self.owned,
            serial: self.serial,
        }
    }
}

impl ToSerialized<AwardedBadgeBody> for AwardedBadge {
    fn to_serialized(&self) -> AwardedBadgeBody {
        let def = self.badge.definition();

        AwardedBadgeBody {
            badge: self.badge,
            name: def.name,
            description: def.description,
            icon: def.icon,
            serial: self.serial,
            settled: self.settlement.is_settled(),
        }
    }
}

impl ToSerialized<VideosWatchedBody> for WatchOutcome {
    fn to_serialized(&self) -> VideosWatchedBody {
        VideosWatchedBody {
            videos_watched: self.videos_watched,
            new_badges: self.new_badges.to_serialized(),
        }
    }
}

impl ToSerialized<RatingResultBody> for RatingOutcome {
    fn to_serialized(&self) -> RatingResultBody {
        RatingResultBody {
            rating: self.rating.rating,
            reward: self.reward,
            base_reward: self.base_reward,
            multiplier: self.multiplier,
            vip_bonus: self.multiplier > 1.0,
            settled: self.settlement.is_settled(),
            transaction_id: self.settlement.transaction_id().map(str::to_string),
            new_badges: self.new_badges.to_serialized(),
        }
    }
}

impl ToSerialized<BonusBody> for BonusOutcome {
    fn to_serialized(&self) -> BonusBody {
        BonusBody {
            bonus: self.bonus,
            base_bonus: self.base_bonus,
            multiplier: self.multiplier,
            vip_bonus: self.multiplier > 1.0,
            videos_watched: self.videos_watched,
            message: self.message.clone(),
            settled: self.settlement.as_ref().map(|s| s.is_settled()),
            transaction_id: self
                .settlement
                .as_ref()
                .and_then(|s| s.transaction_id())
                .map(str::to_string),
        }
    }
}

impl ToSerialized<RedeemBody> for RedeemOutcome {
    fn to_serialized(&self) -> RedeemBody {
        RedeemBody {
            benefit: self.benefit.to_serialized(),
            cost: self.cost,
            settled: self.settlement.is_settled(),
            transaction_id: self.settlement.transaction_id().map(str::to_string),
            new_badges: self.new_badges.to_serialized(),
        }
    }
}

impl ToSerialized<RewardBody> for RewardOutcome {
    fn to_serialized(&self) -> RewardBody {
        RewardBody {
            amount: self.amount,
            settled: self.settlement.is_settled(),
            transaction_id: self.settlement.transaction_id().map(str::to_string),
        }
    }
}
