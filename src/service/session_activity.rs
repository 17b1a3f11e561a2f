// service/session_activity.rs
use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Duration, TimeZone, Utc};
use uuid::Uuid;

/// Longer than any access token lives.
const LOGOUT_RETENTION_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Active,
    Expired,
}

#[derive(Debug, Clone, Copy)]
struct UserActivity {
    last_seen: DateTime<Utc>,
    /// Tokens issued at or before this instant are no longer accepted.
    logged_out_at: Option<DateTime<Utc>>,
}

/// Tracks the last authenticated request per user. A user idle for longer than
/// the timeout is logged out: their current tokens stop working and they must
/// sign in again to get a fresh one.
#[derive(Debug)]
pub struct SessionActivity {
    timeout: Duration,
    users: Mutex<HashMap<Uuid, UserActivity>>,
}

impl SessionActivity {
    pub fn new(timeout_minutes: i64) -> Self {
        SessionActivity {
            timeout: Duration::minutes(timeout_minutes.max(1)),
            users: Mutex::new(HashMap::new()),
        }
    }

    pub fn touch(&self, user_id: Uuid, token_issued_at: usize) -> Activity {
        self.touch_at(user_id, token_issued_at, Utc::now())
    }

    pub fn touch_at(&self, user_id: Uuid, token_issued_at: usize, now: DateTime<Utc>) -> Activity {
        let issued_at = Utc
            .timestamp_opt(token_issued_at as i64, 0)
            .single()
            .unwrap_or(now);

        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        let entry = users.entry(user_id).or_insert(UserActivity {
            last_seen: now,
            logged_out_at: None,
        });

        if let Some(logged_out_at) = entry.logged_out_at {
            if issued_at <= logged_out_at {
                return Activity::Expired;
            }
            // A token minted after the logout starts a new session.
            entry.logged_out_at = None;
            entry.last_seen = now;
            return Activity::Active;
        }

        if now - entry.last_seen > self.timeout {
            tracing::info!("Session for {} expired after inactivity", user_id);
            entry.logged_out_at = Some(now);
            return Activity::Expired;
        }

        entry.last_seen = now;
        Activity::Active
    }

    /// Logs out users idle past the timeout and forgets logout markers older
    /// than `LOGOUT_RETENTION_HOURS`. Returns how many users were forgotten.
    pub fn prune(&self) -> usize {
        self.prune_at(Utc::now())
    }

    pub fn prune_at(&self, now: DateTime<Utc>) -> usize {
        let logout_cutoff = now - Duration::hours(LOGOUT_RETENTION_HOURS);
        let mut users = self.users.lock().unwrap_or_else(|e| e.into_inner());
        let before = users.len();
        users.retain(|_, activity| {
            if activity.logged_out_at.is_none() && now - activity.last_seen > self.timeout {
                // The idle token must stay rejected once the entry is gone from the active set.
                activity.logged_out_at = Some(activity.last_seen + self.timeout);
            }
            match activity.logged_out_at {
                Some(logged_out_at) => logged_out_at > logout_cutoff,
                None => true,
            }
        });
        before - users.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ts(dt: DateTime<Utc>) -> usize {
        dt.timestamp() as usize
    }

    #[test]
    fn activity_within_timeout_keeps_session() {
        let tracker = SessionActivity::new(30);
        let user = Uuid::new_v4();
        let start = Utc::now();

        assert_eq!(tracker.touch_at(user, ts(start), start), Activity::Active);
        assert_eq!(
            tracker.touch_at(user, ts(start), start + Duration::minutes(29)),
            Activity::Active
        );
        assert_eq!(
            tracker.touch_at(user, ts(start), start + Duration::minutes(58)),
            Activity::Active
        );
    }

    #[test]
    fn idle_session_expires_until_new_token() {
        let tracker = SessionActivity::new(30);
        let user = Uuid::new_v4();
        let start = Utc::now();

        tracker.touch_at(user, ts(start), start);
        let later = start + Duration::minutes(31);
        assert_eq!(tracker.touch_at(user, ts(start), later), Activity::Expired);
        assert_eq!(
            tracker.touch_at(user, ts(start), later + Duration::seconds(5)),
            Activity::Expired
        );

        let relogin = later + Duration::minutes(1);
        assert_eq!(tracker.touch_at(user, ts(relogin), relogin), Activity::Active);
    }

    #[test]
    fn prune_forgets_markers_after_retention() {
        let tracker = SessionActivity::new(10);
        let start = Utc::now();
        tracker.touch_at(Uuid::new_v4(), ts(start), start);
        tracker.touch_at(Uuid::new_v4(), ts(start), start + Duration::minutes(15));

        assert_eq!(tracker.prune_at(start + Duration::minutes(25)), 0);
        assert_eq!(
            tracker.prune_at(start + Duration::hours(LOGOUT_RETENTION_HOURS) + Duration::minutes(11)),
            1
        );
        assert_eq!(
            tracker.prune_at(start + Duration::hours(LOGOUT_RETENTION_HOURS) + Duration::minutes(30)),
            1
        );
    }

    #[test]
    fn pruned_idle_user_keeps_old_token_rejected() {
        let tracker = SessionActivity::new(30);
        let user = Uuid::new_v4();
        let start = Utc::now();
        assert_eq!(tracker.touch_at(user, ts(start), start), Activity::Active);

        tracker.prune_at(start + Duration::minutes(65));
        assert_eq!(
            tracker.touch_at(user, ts(start), start + Duration::minutes(66)),
            Activity::Expired
        );

        let relogin = start + Duration::minutes(70);
        assert_eq!(tracker.touch_at(user, ts(relogin), relogin), Activity::Active);
    }

    #[test]
    fn prune_keeps_logged_out_users_so_old_tokens_stay_rejected() {
        let tracker = SessionActivity::new(10);
        let user = Uuid::new_v4();
        let start = Utc::now();
        tracker.touch_at(user, ts(start), start);
        let expired_at = start + Duration::minutes(11);
        assert_eq!(tracker.touch_at(user, ts(start), expired_at), Activity::Expired);

        assert_eq!(tracker.prune_at(expired_at + Duration::hours(1)), 0);
        assert_eq!(
            tracker.touch_at(user, ts(start), expired_at + Duration::hours(1)),
            Activity::Expired
        );
    }
}
