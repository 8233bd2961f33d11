use std::time::Duration;

use chrono::{DateTime, Utc};
use log::{debug, warn};
use serde_json::{json, Value};
use tokio::sync::mpsc::{self, UnboundedSender};

use crate::{Badge, BenefitKind, SharedGateway, TransactionId};

pub type AuditSender = UnboundedSender<AuditEvent>;

/// An event destined for the external append-only log. Events are enqueued
/// after the local state transition commits and delivered by a background
/// worker, so log latency never shows up in request latency.
#[derive(Debug, Clone)]
pub enum AuditEvent {
    Reward {
        account_id: String,
        amount: u64,
        reason: String,
        transaction_id: Option<TransactionId>,
    },
    Rating {
        account_id: String,
        content_id: String,
        rating: u8,
        session_id: String,
    },
    Redemption {
        account_id: String,
        kind: BenefitKind,
        name: String,
        cost: u64,
        expires_at: Option<DateTime<Utc>>,
    },
    BingeBonus {
        account_id: String,
        session_id: String,
        videos_watched: usize,
        bonus: u64,
        vip: bool,
    },
    Achievement {
        account_id: String,
        badge: Badge,
        serial: Option<u64>,
    },
}

impl AuditEvent {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Reward { .. } => "reward",
            Self::Rating { .. } => "rating",
            Self::Redemption { .. } => "redemption",
            Self::BingeBonus { .. } => "binge_bonus",
            Self::Achievement { .. } => "achievement",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::Reward {
                account_id,
                amount,
                reason,
                transaction_id,
            } => json!({
                "account_id": account_id,
                "amount": amount,
                "reason": reason,
                "transaction_id": transaction_id,
            }),
            Self::Rating {
                account_id,
                content_id,
                rating,
                session_id,
            } => json!({
                "account_id": account_id,
                "content_id": content_id,
                "rating": rating,
                "session_id": session_id,
            }),
            Self::Redemption {
                account_id,
                kind,
                name,
                cost,
                expires_at,
            } => json!({
                "account_id": account_id,
                "benefit_type": kind,
                "benefit_name": name,
                "cost": cost,
                "expires_at": expires_at.map(|at| at.timestamp_millis()),
            }),
            Self::BingeBonus {
                account_id,
                session_id,
                videos_watched,
                bonus,
                vip,
            } => json!({
                "account_id": account_id,
                "session_id": session_id,
                "videos_watched": videos_watched,
                "bonus_amount": bonus,
                "vip_multiplier": vip,
            }),
            Self::Achievement {
                account_id,
                badge,
                serial,
            } => json!({
                "account_id": account_id,
                "badge_type": badge,
                "badge_name": badge.definition().name,
                "nft_serial": serial,
            }),
        }
    }
}

/// Spawns the delivery worker and returns the queue it drains. Delivery
/// failures are logged and dropped, they must never reach a request path.
pub(crate) fn spawn_delivery_worker(gateway: SharedGateway, timeout: Duration) -> AuditSender {
    let (sender, mut receiver) = mpsc::unbounded_channel::<AuditEvent>();

    tokio::spawn(async move {
        while let Some(event) = receiver.recv().await {
            let kind = event.kind();
            let submit = gateway.submit_event(kind, event.payload());

            match tokio::time::timeout(timeout, submit).await {
                Ok(Ok(receipt)) => {
                    debug!(
                        "audit event {} logged at sequence {}",
                        kind, receipt.sequence_number
                    )
                }
                Ok(Err(e)) => warn!("audit event {} was not logged: {}", kind, e),
                Err(_) => warn!("audit event {} delivery timed out", kind),
            }
        }
    });

    sender
}

#[cfg(test)]
mod test {
    use std::sync::Arc;
    use std::time::Duration;

    use crate::implementors::MemorySettlement;
    use crate::SharedGateway;

    use super::{spawn_delivery_worker, AuditEvent};

    #[tokio::test]
    async fn delivers_enqueued_events() {
        let gateway = Arc::new(MemorySettlement::new());
        let shared: SharedGateway = gateway.clone();

        let sender = spawn_delivery_worker(shared, Duration::from_secs(1));

        sender
            .send(AuditEvent::Reward {
                account_id: "alice".to_string(),
                amount: 2,
                reason: "Reward".to_string(),
                transaction_id: None,
            })
            .unwrap();

        for _ in 0..50 {
            if !gateway.events().is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }

        let events = gateway.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].0, "reward");
        assert_eq!(events[0].1["account_id"], "alice");
    }

    #[tokio::test]
    async fn failed_delivery_is_swallowed() {
        let gateway = Arc::new(MemorySettlement::new());
        gateway.set_failing(true);
        let shared: SharedGateway = gateway.clone();

        let sender = spawn_delivery_worker(shared, Duration::from_secs(1));

        let event = AuditEvent::Rating {
            account_id: "alice".to_string(),
            content_id: "clip".to_string(),
            rating: 5,
            session_id: "s1".to_string(),
        };

        // Both sends must succeed even though delivery fails
        sender.send(event.clone()).unwrap();
        sender.send(event).unwrap();

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(gateway.events().is_empty());
    }
}
