//! Session model

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Login session; `id` is the bearer token
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Session {
    pub id: String,
    pub user_id: i64,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl Session {
    /// New session for `user_id` with a random token, valid for `days`
    pub fn issue(user_id: i64, days: i64) -> Self {
        let now = super::timestamp_now();
        Self {
            id: uuid::Uuid::new_v4().simple().to_string(),
            user_id,
            expires_at: now + Duration::days(days),
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        self.expires_at < Utc::now()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_issue_sets_expiry() {
        let session = Session::issue(7, 3);
        assert_eq!(session.user_id, 7);
        assert_eq!(session.id.len(), 32);
        assert_eq!(session.expires_at - session.created_at, Duration::days(3));
        assert!(!session.is_expired());
    }

    #[test]
    fn test_is_expired() {
        let mut session = Session::issue(1, 1);
        session.expires_at = Utc::now() - Duration::seconds(1);
        assert!(session.is_expired());
    }

    #[test]
    fn test_tokens_are_unique() {
        assert_ne!(Session::issue(1, 1).id, Session::issue(1, 1).id);
    }
}
