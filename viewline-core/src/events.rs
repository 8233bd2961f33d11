use crossbeam::channel::{Receiver, Sender};

use crate::{Badge, BenefitKind};

pub type EventSender = Sender<CoordinatorEvent>;
pub type EventReceiver = Receiver<CoordinatorEvent>;

/// Describes the events emitted by the coordinator as state changes commit.
/// These are in-process observations, the external audit log is fed
/// separately.
#[derive(Debug)]
pub enum CoordinatorEvent {
    /// A device was bound to an account for the first time
    DeviceRegistered {
        account_id: String,
        device_id: String,
    },
    /// A registration attempted to rebind a device owned by another account
    FraudAttemptDetected {
        account_id: String,
        device_id: String,
    },
    SessionStarted {
        session_id: String,
        account_id: String,
    },
    VideoWatched {
        session_id: String,
        account_id: String,
        /// The session's new watched count
        videos_watched: usize,
    },
    RatingSubmitted {
        account_id: String,
        content_id: String,
        rating: u8,
    },
    BenefitRedeemed {
        account_id: String,
        kind: BenefitKind,
    },
    BingeBonusClaimed {
        session_id: String,
        account_id: String,
        videos_watched: usize,
        bonus: u64,
    },
    /// A badge transitioned to earned, with the mint serial if settlement
    /// succeeded
    BadgeAwarded {
        account_id: String,
        badge: Badge,
        serial: Option<u64>,
    },
}
