use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

use crate::util::random_string;

pub type SessionId = String;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session {0} does not exist")]
    InvalidSession(SessionId),
}

/// A bonus milestone within a single session. The tiers are mutually
/// exclusive, crossing a threshold yields that tier's full bonus and
/// nothing from the tiers below it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BingeTier {
    pub threshold: usize,
    pub bonus: u64,
}

/// Highest tier first, so the first qualifying entry wins
const BINGE_TIERS: [BingeTier; 2] = [
    BingeTier {
        threshold: 5,
        bonus: 15,
    },
    BingeTier {
        threshold: 3,
        bonus: 5,
    },
];

/// The minimum watched count before any bonus exists
pub const FIRST_BINGE_THRESHOLD: usize = 3;

/// Returns the tier a watched count qualifies for, if any
pub fn tier_for(count: usize) -> Option<BingeTier> {
    BINGE_TIERS.iter().find(|t| count >= t.threshold).copied()
}

#[derive(Debug, Clone, Serialize)]
pub struct WatchedVideo {
    pub content_id: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Default)]
struct SessionState {
    videos: Vec<WatchedVideo>,
    /// Thresholds a bonus has already been claimed at
    claimed_tiers: Vec<usize>,
}

/// An open viewing session. Sessions accumulate watched videos for the
/// lifetime of the process and are never merged or deleted.
pub struct Session {
    id: SessionId,
    account_id: String,
    started_at: DateTime<Utc>,
    state: Mutex<SessionState>,
}

impl Session {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn watched_count(&self) -> usize {
        self.state.lock().videos.len()
    }

    pub fn videos(&self) -> Vec<WatchedVideo> {
        self.state.lock().videos.clone()
    }

    fn record(&self, content_id: &str) -> usize {
        let mut state = self.state.lock();

        state.videos.push(WatchedVideo {
            content_id: content_id.to_string(),
            timestamp: Utc::now(),
        });

        state.videos.len()
    }

    /// Claims the tier the current watched count qualifies for. Each tier is
    /// claimable once per session, so repeated probes at the same count come
    /// back empty. Count read and claim happen under one lock.
    pub fn claim_bonus_tier(&self) -> Option<BingeTier> {
        let mut state = self.state.lock();

        let tier = tier_for(state.videos.len())?;

        if state.claimed_tiers.contains(&tier.threshold) {
            return None;
        }

        state.claimed_tiers.push(tier.threshold);
        Some(tier)
    }
}

/// Tracks every viewing session in the process
#[derive(Default)]
pub struct SessionTracker {
    sessions: DashMap<SessionId, Arc<Session>>,
}

impl SessionTracker {
    /// Opens a new session for an account. The id combines the current
    /// millisecond clock with random alphanumerics, which keeps collisions
    /// negligible without global coordination.
    pub fn start(&self, account_id: &str) -> Arc<Session> {
        let id = format!(
            "session_{}_{}",
            Utc::now().timestamp_millis(),
            random_string(9)
        );

        let session = Arc::new(Session {
            id: id.clone(),
            account_id: account_id.to_string(),
            started_at: Utc::now(),
            state: Default::default(),
        });

        self.sessions.insert(id, session.clone());
        session
    }

    pub fn get(&self, session_id: &str) -> Option<Arc<Session>> {
        self.sessions.get(session_id).map(|s| s.clone())
    }

    /// Appends a watched video and returns the session with its new count
    pub fn record_video(
        &self,
        session_id: &str,
        content_id: &str,
    ) -> Result<(Arc<Session>, usize), SessionError> {
        let session = self
            .get(session_id)
            .ok_or_else(|| SessionError::InvalidSession(session_id.to_string()))?;

        let count = session.record(content_id);
        Ok((session, count))
    }

    /// Sums watched videos over every session the account has ever opened
    pub fn total_videos_watched(&self, account_id: &str) -> usize {
        self.sessions
            .iter()
            .filter(|s| s.account_id() == account_id)
            .map(|s| s.watched_count())
            .sum()
    }
}

#[cfg(test)]
mod test {
    use super::{tier_for, SessionTracker};

    #[test]
    fn bonus_tiers() {
        assert_eq!(tier_for(0), None);
        assert_eq!(tier_for(2), None);
        assert_eq!(tier_for(3).unwrap().bonus, 5);
        assert_eq!(tier_for(4).unwrap().bonus, 5);
        // Crossing the second threshold yields 15, not 5 + 15
        assert_eq!(tier_for(5).unwrap().bonus, 15);
        assert_eq!(tier_for(9).unwrap().bonus, 15);
    }

    #[test]
    fn tiers_claim_once() {
        let tracker = SessionTracker::default();
        let session = tracker.start("alice");

        for _ in 0..3 {
            session.record("clip");
        }

        assert_eq!(session.claim_bonus_tier().unwrap().bonus, 5);
        assert_eq!(session.claim_bonus_tier(), None);

        session.record("clip");
        // Still inside the first tier
        assert_eq!(session.claim_bonus_tier(), None);

        session.record("clip");
        assert_eq!(session.claim_bonus_tier().unwrap().bonus, 15);
        assert_eq!(session.claim_bonus_tier(), None);
    }

    #[test]
    fn totals_span_sessions() {
        let tracker = SessionTracker::default();

        let first = tracker.start("alice");
        let second = tracker.start("alice");
        let other = tracker.start("bob");

        first.record("one");
        first.record("two");
        second.record("three");
        other.record("four");

        assert_eq!(tracker.total_videos_watched("alice"), 3);
        assert_eq!(tracker.total_videos_watched("bob"), 1);
        assert_eq!(tracker.total_videos_watched("carol"), 0);
    }

    #[test]
    fn session_ids_are_distinct() {
        let tracker = SessionTracker::default();

        let a = tracker.start("alice");
        let b = tracker.start("alice");

        assert_ne!(a.id(), b.id());
        assert!(a.id().starts_with("session_"));
    }

    #[test]
    fn recording_on_unknown_session_fails() {
        let tracker = SessionTracker::default();

        assert!(tracker.record_video("session_missing", "clip").is_err());
    }
}
