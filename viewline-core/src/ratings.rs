use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RatingError {
    #[error("rating must be between 1 and 5 stars")]
    InvalidRating,
}

#[derive(Debug, Clone, Serialize)]
pub struct Rating {
    pub timestamp: DateTime<Utc>,
    pub account_id: String,
    pub content_id: String,
    pub rating: u8,
    pub session_id: String,
}

/// Append-only record of every rating submission
#[derive(Default)]
pub struct RatingStore {
    entries: Mutex<Vec<Rating>>,
}

impl RatingStore {
    /// Appends a rating. Out-of-range values are rejected before anything
    /// is stored.
    pub fn submit(
        &self,
        account_id: &str,
        content_id: &str,
        rating: u8,
        session_id: &str,
    ) -> Result<Rating, RatingError> {
        if !(1..=5).contains(&rating) {
            return Err(RatingError::InvalidRating);
        }

        let entry = Rating {
            timestamp: Utc::now(),
            account_id: account_id.to_string(),
            content_id: content_id.to_string(),
            rating,
            session_id: session_id.to_string(),
        };

        self.entries.lock().push(entry.clone());
        Ok(entry)
    }

    pub fn count_for(&self, account_id: &str) -> usize {
        self.entries
            .lock()
            .iter()
            .filter(|r| r.account_id == account_id)
            .count()
    }

    /// The account's ratings in submission order
    pub fn all_for(&self, account_id: &str) -> Vec<Rating> {
        self.entries
            .lock()
            .iter()
            .filter(|r| r.account_id == account_id)
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod test {
    use super::RatingStore;

    #[test]
    fn rejects_out_of_range() {
        let store = RatingStore::default();

        assert!(store.submit("alice", "clip", 0, "s1").is_err());
        assert!(store.submit("alice", "clip", 6, "s1").is_err());
        assert_eq!(store.count_for("alice"), 0);

        assert!(store.submit("alice", "clip", 1, "s1").is_ok());
        assert!(store.submit("alice", "clip", 5, "s1").is_ok());
    }

    #[test]
    fn preserves_order_per_account() {
        let store = RatingStore::default();

        for (content, stars) in [("a", 3), ("b", 4), ("c", 5)] {
            store.submit("alice", content, stars, "s1").unwrap();
        }
        store.submit("bob", "d", 1, "s2").unwrap();

        let ratings = store.all_for("alice");
        let contents: Vec<_> = ratings.iter().map(|r| r.content_id.as_str()).collect();

        assert_eq!(contents, vec!["a", "b", "c"]);
        assert_eq!(store.count_for("bob"), 1);
    }
}
