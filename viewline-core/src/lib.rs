use crossbeam::channel::unbounded;
use log::{info, warn};
use tokio::time::timeout;

mod achievements;
mod audit;
mod benefits;
mod config;
mod devices;
mod events;
mod ratings;
mod rewards;
mod sessions;
mod settlement;
mod util;

pub mod implementors;

pub use achievements::*;
pub use audit::*;
pub use benefits::*;
pub use config::*;
pub use devices::*;
pub use events::*;
pub use ratings::*;
pub use rewards::*;
pub use sessions::*;
pub use settlement::*;
pub use util::*;

/// The coordination core, tying the stores together and forwarding
/// settlement instructions to the ledger gateway.
///
/// Every operation commits its in-memory state transition first and settles
/// afterwards, outside any lock. A failed or timed-out settlement degrades
/// the response but never rolls the transition back.
///
/// Must be created inside a tokio runtime, the audit delivery worker is
/// spawned immediately.
pub struct Coordinator {
    gateway: SharedGateway,
    audit: AuditSender,

    event_sender: EventSender,
    event_receiver: EventReceiver,

    pub config: Config,
    pub catalog: RedemptionCatalog,

    pub devices: DeviceRegistry,
    pub sessions: SessionTracker,
    pub benefits: BenefitLedger,
    pub ratings: RatingStore,
    achievements: AchievementEngine,
}

/// A badge that just transitioned to earned
#[derive(Debug, Clone)]
pub struct AwardedBadge {
    pub badge: Badge,
    pub serial: Option<u64>,
    pub settlement: SettlementOutcome,
}

/// One badge's standing for an account
#[derive(Debug, Clone, Copy)]
pub struct BadgeStatus {
    pub badge: Badge,
    pub owned: bool,
    pub serial: Option<u64>,
}

#[derive(Debug, Clone)]
pub struct WatchOutcome {
    pub videos_watched: usize,
    pub new_badges: Vec<AwardedBadge>,
}

#[derive(Debug, Clone)]
pub struct RatingOutcome {
    pub rating: Rating,
    pub base_reward: u64,
    pub multiplier: f64,
    pub reward: u64,
    pub settlement: SettlementOutcome,
    pub new_badges: Vec<AwardedBadge>,
}

#[derive(Debug, Clone)]
pub struct BonusOutcome {
    pub bonus: u64,
    pub base_bonus: u64,
    pub multiplier: f64,
    pub videos_watched: usize,
    pub message: String,
    /// Present only when a tier was actually claimed
    pub settlement: Option<SettlementOutcome>,
}

impl BonusOutcome {
    fn without_bonus(videos_watched: usize) -> Self {
        let message = if videos_watched < FIRST_BINGE_THRESHOLD {
            format!(
                "Watch {} more video(s) for a bonus",
                FIRST_BINGE_THRESHOLD - videos_watched
            )
        } else {
            "Binge bonus already claimed".to_string()
        };

        Self {
            bonus: 0,
            base_bonus: 0,
            multiplier: 1.0,
            videos_watched,
            message,
            settlement: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RedeemOutcome {
    pub benefit: Benefit,
    pub cost: u64,
    pub settlement: SettlementOutcome,
    pub new_badges: Vec<AwardedBadge>,
}

#[derive(Debug, Clone)]
pub struct RewardOutcome {
    pub amount: u64,
    pub settlement: SettlementOutcome,
}

impl Coordinator {
    pub fn new(gateway: SharedGateway, config: Config, catalog: RedemptionCatalog) -> Self {
        let (event_sender, event_receiver) = unbounded();
        let audit = audit::spawn_delivery_worker(gateway.clone(), config.settlement_timeout);

        Self {
            gateway,
            audit,
            event_sender,
            event_receiver,
            config,
            catalog,
            devices: Default::default(),
            sessions: Default::default(),
            benefits: Default::default(),
            ratings: Default::default(),
            achievements: Default::default(),
        }
    }

    /// Receive events from the coordinator.
    pub fn wait_for_event(&self) -> CoordinatorEvent {
        self.event_receiver
            .recv()
            .expect("event is received without error")
    }

    fn emit(&self, event: CoordinatorEvent) {
        self.event_sender.send(event).expect("event is sent");
    }

    fn enqueue_audit(&self, event: AuditEvent) {
        self.audit.send(event).expect("audit worker is running");
    }

    /// Binds a device to an account, refusing conflicting bindings
    pub fn register_device(&self, account_id: &str, device_id: &str) -> RegisterOutcome {
        let outcome = self.devices.register(account_id, device_id);

        match outcome {
            RegisterOutcome::Registered => {
                info!("Device registered for {}", account_id);

                self.emit(CoordinatorEvent::DeviceRegistered {
                    account_id: account_id.to_string(),
                    device_id: device_id.to_string(),
                });
            }
            RegisterOutcome::FraudConflict => {
                warn!(
                    "Device registration refused for {}: device belongs to another account",
                    account_id
                );

                self.emit(CoordinatorEvent::FraudAttemptDetected {
                    account_id: account_id.to_string(),
                    device_id: device_id.to_string(),
                });
            }
            RegisterOutcome::MultipleDevicesNotAllowed => {
                warn!(
                    "Device registration refused for {}: account already has a device",
                    account_id
                );
            }
            RegisterOutcome::AlreadyRegistered => {}
        }

        outcome
    }

    pub fn verify_device(&self, account_id: &str, device_id: &str) -> Verification {
        self.devices.verify(account_id, device_id)
    }

    pub fn start_session(&self, account_id: &str) -> std::sync::Arc<Session> {
        let session = self.sessions.start(account_id);

        self.emit(CoordinatorEvent::SessionStarted {
            session_id: session.id().to_string(),
            account_id: account_id.to_string(),
        });

        session
    }

    /// Appends a watched video to a session and runs the achievement check
    /// for the session's account
    pub async fn record_video(
        &self,
        session_id: &str,
        content_id: &str,
    ) -> Result<WatchOutcome, SessionError> {
        let (session, videos_watched) = self.sessions.record_video(session_id, content_id)?;

        self.emit(CoordinatorEvent::VideoWatched {
            session_id: session_id.to_string(),
            account_id: session.account_id().to_string(),
            videos_watched,
        });

        let new_badges = self.check_achievements(session.account_id()).await;

        Ok(WatchOutcome {
            videos_watched,
            new_badges,
        })
    }

    /// Records a rating, runs the achievement check, then pays the rating
    /// reward with the account's active multiplier applied
    pub async fn submit_rating(
        &self,
        account_id: &str,
        content_id: &str,
        rating: u8,
        session_id: &str,
    ) -> Result<RatingOutcome, RatingError> {
        let entry = self
            .ratings
            .submit(account_id, content_id, rating, session_id)?;

        self.emit(CoordinatorEvent::RatingSubmitted {
            account_id: account_id.to_string(),
            content_id: content_id.to_string(),
            rating,
        });

        self.enqueue_audit(AuditEvent::Rating {
            account_id: account_id.to_string(),
            content_id: content_id.to_string(),
            rating,
            session_id: session_id.to_string(),
        });

        let new_badges = self.check_achievements(account_id).await;

        let multiplier = self.benefits.active_multiplier(account_id);
        let base_reward = self.config.rating_base_reward;
        let reward = apply_multiplier(base_reward, multiplier);

        let memo = format!(
            "Rating reward: {} stars{}",
            rating,
            vip_suffix(multiplier)
        );

        let settlement = self
            .settle_transfer(&self.config.treasury_account, account_id, reward, &memo)
            .await;

        Ok(RatingOutcome {
            rating: entry,
            base_reward,
            multiplier,
            reward,
            settlement,
            new_badges,
        })
    }

    /// Claims the session's binge bonus if an unclaimed tier is reached.
    /// Each tier settles at most once per session, further probes at the
    /// same count report zero.
    pub async fn claim_binge_bonus(
        &self,
        session_id: &str,
        account_override: Option<&str>,
    ) -> BonusOutcome {
        let Some(session) = self.sessions.get(session_id) else {
            return BonusOutcome::without_bonus(0);
        };

        let account_id = account_override.unwrap_or(session.account_id()).to_string();
        let videos_watched = session.watched_count();

        let Some(tier) = session.claim_bonus_tier() else {
            return BonusOutcome::without_bonus(videos_watched);
        };

        let multiplier = self.benefits.active_multiplier(&account_id);
        let bonus = apply_multiplier(tier.bonus, multiplier);

        info!(
            "Binge bonus of {} {} for {} ({} videos)",
            bonus, self.config.token_symbol, account_id, videos_watched
        );

        let memo = format!(
            "Binge bonus: {} videos{}",
            videos_watched,
            vip_suffix(multiplier)
        );

        let settlement = self
            .settle_transfer(&self.config.treasury_account, &account_id, bonus, &memo)
            .await;

        self.emit(CoordinatorEvent::BingeBonusClaimed {
            session_id: session_id.to_string(),
            account_id: account_id.clone(),
            videos_watched,
            bonus,
        });

        self.enqueue_audit(AuditEvent::BingeBonus {
            account_id,
            session_id: session_id.to_string(),
            videos_watched,
            bonus,
            vip: multiplier > 1.0,
        });

        BonusOutcome {
            bonus,
            base_bonus: tier.bonus,
            multiplier,
            videos_watched,
            message: format!("Watched {}+ videos!", tier.threshold),
            settlement: Some(settlement),
        }
    }

    /// Activates a benefit, charges its cost, and for VIP redemptions runs
    /// the achievement check
    pub async fn redeem(
        &self,
        account_id: &str,
        kind: BenefitKind,
    ) -> Result<RedeemOutcome, RedeemError> {
        let entry = self
            .catalog
            .entry(kind)
            .ok_or(RedeemError::NotInCatalog(kind))?
            .clone();

        let benefit = self.benefits.redeem(account_id, &entry);

        info!("{} redeemed {} for {}", account_id, entry.name, entry.cost);

        self.emit(CoordinatorEvent::BenefitRedeemed {
            account_id: account_id.to_string(),
            kind,
        });

        self.enqueue_audit(AuditEvent::Redemption {
            account_id: account_id.to_string(),
            kind,
            name: benefit.name.clone(),
            cost: entry.cost,
            expires_at: benefit.expires_at,
        });

        let memo = format!("Redemption: {}", kind);
        let settlement = self
            .settle_transfer(account_id, &self.config.treasury_account, entry.cost, &memo)
            .await;

        let new_badges = if kind == BenefitKind::VipDay {
            self.check_achievements(account_id).await
        } else {
            Vec::new()
        };

        Ok(RedeemOutcome {
            benefit,
            cost: entry.cost,
            settlement,
            new_badges,
        })
    }

    /// Pays out an arbitrary reward, used for externally decided awards
    pub async fn grant_reward(
        &self,
        account_id: &str,
        amount: u64,
        reason: &str,
    ) -> RewardOutcome {
        let settlement = self
            .settle_transfer(&self.config.treasury_account, account_id, amount, reason)
            .await;

        self.enqueue_audit(AuditEvent::Reward {
            account_id: account_id.to_string(),
            amount,
            reason: reason.to_string(),
            transaction_id: settlement.transaction_id().map(str::to_string),
        });

        RewardOutcome { amount, settlement }
    }

    /// Evaluates every achievement predicate in fixed order and awards the
    /// badges that newly qualify. Safe to call arbitrarily often, earned
    /// badges are skipped.
    pub async fn check_achievements(&self, account_id: &str) -> Vec<AwardedBadge> {
        let mut newly_awarded = Vec::new();

        for badge in Badge::ALL {
            if self.achievements.has(account_id, badge) {
                continue;
            }

            if !self.badge_predicate(account_id, badge) {
                continue;
            }

            if let Some(awarded) = self.award_badge(account_id, badge).await {
                newly_awarded.push(awarded);
            }
        }

        newly_awarded
    }

    pub fn has_achievement(&self, account_id: &str, badge: Badge) -> bool {
        self.achievements.has(account_id, badge)
    }

    /// Every badge's standing for an account, in definition order
    pub fn badges_for(&self, account_id: &str) -> Vec<BadgeStatus> {
        let owned = self.achievements.owned(account_id);

        Badge::ALL
            .iter()
            .map(|badge| {
                let held = owned.iter().find(|o| o.badge == *badge);

                BadgeStatus {
                    badge: *badge,
                    owned: held.is_some(),
                    serial: held.and_then(|o| o.serial),
                }
            })
            .collect()
    }

    fn badge_predicate(&self, account_id: &str, badge: Badge) -> bool {
        match badge {
            Badge::FirstWatch => self.sessions.total_videos_watched(account_id) >= 1,
            Badge::BingeWatcher => self.sessions.total_videos_watched(account_id) >= 10,
            Badge::RatingMaster => self.ratings.count_for(account_id) >= 5,
            Badge::VipMember => matches!(
                self.benefits.current(account_id),
                Some(benefit) if benefit.kind == BenefitKind::VipDay
            ),
        }
    }

    /// Awards a badge if this call is the one that claims it. The claim is
    /// taken under the account's lock, the mint happens outside it, and the
    /// outcome is reconciled afterwards. A failed mint still earns the
    /// badge, just with no serial.
    async fn award_badge(&self, account_id: &str, badge: Badge) -> Option<AwardedBadge> {
        if !self.achievements.begin_award(account_id, badge) {
            return None;
        }

        let def = badge.definition();
        info!("Awarding {} to {}", def.name, account_id);

        let mint = BadgeMint {
            account_id: account_id.to_string(),
            metadata: badge.as_str().to_string(),
        };

        let minted = timeout(
            self.config.settlement_timeout,
            self.gateway.mint_and_transfer_badge(mint),
        )
        .await;

        let (serial, settlement) = match minted {
            Ok(Ok(receipt)) => (
                Some(receipt.serial),
                SettlementOutcome::Settled {
                    transaction_id: receipt.transaction_id,
                },
            ),
            Ok(Err(e)) => {
                warn!("{} for {} recorded without settlement: {}", def.name, account_id, e);

                (
                    None,
                    SettlementOutcome::Failed {
                        reason: e.to_string(),
                    },
                )
            }
            Err(_) => {
                warn!("{} for {} recorded without settlement: mint timed out", def.name, account_id);

                (
                    None,
                    SettlementOutcome::Failed {
                        reason: SettlementError::TimedOut.to_string(),
                    },
                )
            }
        };

        self.achievements.finish_award(account_id, badge, serial);

        self.emit(CoordinatorEvent::BadgeAwarded {
            account_id: account_id.to_string(),
            badge,
            serial,
        });

        self.enqueue_audit(AuditEvent::Achievement {
            account_id: account_id.to_string(),
            badge,
            serial,
        });

        Some(AwardedBadge {
            badge,
            serial,
            settlement,
        })
    }

    async fn settle_transfer(
        &self,
        from: &str,
        to: &str,
        amount: u64,
        memo: &str,
    ) -> SettlementOutcome {
        let transfer = TokenTransfer {
            from: from.to_string(),
            to: to.to_string(),
            amount,
            memo: memo.to_string(),
        };

        match timeout(
            self.config.settlement_timeout,
            self.gateway.transfer_tokens(transfer),
        )
        .await
        {
            Ok(Ok(transaction_id)) => SettlementOutcome::Settled { transaction_id },
            Ok(Err(e)) => {
                warn!(
                    "transfer of {} {} to {} did not settle: {}",
                    amount, self.config.token_symbol, to, e
                );

                SettlementOutcome::Failed {
                    reason: e.to_string(),
                }
            }
            Err(_) => {
                warn!(
                    "transfer of {} {} to {} timed out",
                    amount, self.config.token_symbol, to
                );

                SettlementOutcome::Failed {
                    reason: SettlementError::TimedOut.to_string(),
                }
            }
        }
    }
}

fn vip_suffix(multiplier: f64) -> &'static str {
    if multiplier > 1.0 {
        " (VIP)"
    } else {
        ""
    }
}

#[cfg(test)]
mod test {
    use std::sync::Arc;

    use crate::implementors::MemorySettlement;
    use crate::{Badge, BenefitKind, Config, Coordinator, RedemptionCatalog};

    fn coordinator() -> (Arc<MemorySettlement>, Coordinator) {
        let gateway = Arc::new(MemorySettlement::new());
        let coordinator = Coordinator::new(
            gateway.clone(),
            Config::default(),
            RedemptionCatalog::default(),
        );

        (gateway, coordinator)
    }

    #[tokio::test]
    async fn rating_master_is_awarded_exactly_once() {
        let (gateway, coordinator) = coordinator();
        let session = coordinator.start_session("A1");

        for (i, stars) in [3, 4, 5, 2, 1].into_iter().enumerate() {
            let outcome = coordinator
                .submit_rating("A1", "content", stars, session.id())
                .await
                .unwrap();

            if i < 4 {
                assert!(outcome.new_badges.is_empty());
            } else {
                assert_eq!(outcome.new_badges.len(), 1);
                assert_eq!(outcome.new_badges[0].badge, Badge::RatingMaster);
            }
        }

        // Further submissions must never re-award
        let outcome = coordinator
            .submit_rating("A1", "content", 4, session.id())
            .await
            .unwrap();

        assert!(outcome.new_badges.is_empty());
        assert_eq!(gateway.mints().len(), 1);
    }

    #[tokio::test]
    async fn watch_badges_land_on_exact_milestones() {
        let (_, coordinator) = coordinator();

        let first = coordinator.start_session("A2");
        let second = coordinator.start_session("A2");

        let mut awarded = Vec::new();

        for n in 0..4 {
            let outcome = coordinator
                .record_video(first.id(), &format!("clip-{n}"))
                .await
                .unwrap();
            awarded.push(outcome.new_badges);
        }

        for n in 4..10 {
            let outcome = coordinator
                .record_video(second.id(), &format!("clip-{n}"))
                .await
                .unwrap();
            awarded.push(outcome.new_badges);
        }

        assert_eq!(awarded[0].len(), 1);
        assert_eq!(awarded[0][0].badge, Badge::FirstWatch);

        for badges in &awarded[1..9] {
            assert!(badges.is_empty());
        }

        assert_eq!(awarded[9].len(), 1);
        assert_eq!(awarded[9][0].badge, Badge::BingeWatcher);
    }

    #[tokio::test]
    async fn checking_twice_awards_nothing_new() {
        let (_, coordinator) = coordinator();
        let session = coordinator.start_session("alice");

        coordinator.record_video(session.id(), "clip").await.unwrap();

        assert!(coordinator.check_achievements("alice").await.is_empty());
        assert!(coordinator.check_achievements("alice").await.is_empty());
    }

    #[tokio::test]
    async fn badge_is_earned_even_when_settlement_fails() {
        let (gateway, coordinator) = coordinator();
        gateway.set_failing(true);

        let session = coordinator.start_session("alice");
        let outcome = coordinator.record_video(session.id(), "clip").await.unwrap();

        assert_eq!(outcome.new_badges.len(), 1);
        assert_eq!(outcome.new_badges[0].serial, None);
        assert!(!outcome.new_badges[0].settlement.is_settled());
        assert!(coordinator.has_achievement("alice", Badge::FirstWatch));

        // Recovery must not re-attempt the earned badge
        gateway.set_failing(false);
        assert!(coordinator.check_achievements("alice").await.is_empty());
        assert!(gateway.mints().is_empty());
    }

    #[tokio::test]
    async fn vip_redemption_doubles_rewards() {
        let (gateway, coordinator) = coordinator();

        let outcome = coordinator.redeem("alice", BenefitKind::VipDay).await.unwrap();

        assert_eq!(outcome.cost, 200);
        assert!(outcome
            .new_badges
            .iter()
            .any(|b| b.badge == Badge::VipMember));

        let session = coordinator.start_session("alice");
        let rated = coordinator
            .submit_rating("alice", "clip", 5, session.id())
            .await
            .unwrap();

        assert_eq!(rated.multiplier, 2.0);
        assert_eq!(rated.reward, 4);

        let transfers = gateway.transfers();

        // The redemption charge runs account to treasury
        assert!(transfers
            .iter()
            .any(|t| t.from == "alice" && t.amount == 200));
        assert!(transfers
            .iter()
            .any(|t| t.to == "alice" && t.amount == 4 && t.memo.contains("(VIP)")));
    }

    #[tokio::test]
    async fn binge_bonus_settles_once_per_tier() {
        let (_, coordinator) = coordinator();
        let session = coordinator.start_session("alice");

        for n in 0..3 {
            coordinator
                .record_video(session.id(), &format!("clip-{n}"))
                .await
                .unwrap();
        }

        let claimed = coordinator.claim_binge_bonus(session.id(), None).await;
        assert_eq!(claimed.base_bonus, 5);
        assert_eq!(claimed.bonus, 5);
        assert!(claimed.settlement.unwrap().is_settled());

        let repeat = coordinator.claim_binge_bonus(session.id(), None).await;
        assert_eq!(repeat.bonus, 0);
        assert!(repeat.settlement.is_none());

        for n in 3..5 {
            coordinator
                .record_video(session.id(), &format!("clip-{n}"))
                .await
                .unwrap();
        }

        let higher = coordinator.claim_binge_bonus(session.id(), None).await;
        assert_eq!(higher.base_bonus, 15);

        let unknown = coordinator.claim_binge_bonus("session_missing", None).await;
        assert_eq!(unknown.bonus, 0);
    }

    #[tokio::test]
    async fn degraded_rating_still_records() {
        let (gateway, coordinator) = coordinator();
        gateway.set_failing(true);

        let session = coordinator.start_session("alice");
        let outcome = coordinator
            .submit_rating("alice", "clip", 4, session.id())
            .await
            .unwrap();

        assert!(!outcome.settlement.is_settled());
        assert_eq!(outcome.settlement.transaction_id(), None);
        assert_eq!(coordinator.ratings.count_for("alice"), 1);
    }
}
