//! # Session Tracking
//!
//! Idle-timeout session state, replacing the legacy client-side idle timer
//! that read the wall clock from scattered effect hooks. Time comes in
//! through the [`Clock`] trait so expiry is fully testable.
//!
//! Sessions are keyed by caller identity. Every authenticated request
//! touches its session; a session idle beyond the timeout is reported as
//! expired once and then removed, so the next request re-establishes it
//! (the bearer token itself stays valid — this models idle logout, not
//! token revocation).

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;

/// Source of the current time. Injected so expiry logic never reads the
/// wall clock directly.
pub trait Clock: Send + Sync {
    /// Current UTC time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock backed by `Utc::now()`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Outcome of touching a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionCheck {
    /// A fresh session was established for this key.
    Started,
    /// The session was active and its activity time has been advanced.
    Active,
    /// The session had gone idle past the timeout and has been removed.
    Expired,
}

/// Default idle timeout, seconds. Overridable via `SESSION_IDLE_SECS`.
pub const DEFAULT_IDLE_SECS: u64 = 1800;

/// Thread-safe idle-timeout session tracker.
#[derive(Clone)]
pub struct SessionTracker {
    last_seen: Arc<RwLock<HashMap<String, DateTime<Utc>>>>,
    idle_timeout: Duration,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for SessionTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionTracker")
            .field("active", &self.last_seen.read().len())
            .field("idle_timeout_secs", &self.idle_timeout.num_seconds())
            .finish()
    }
}

impl SessionTracker {
    /// Create a tracker with the system clock.
    pub fn new(idle_timeout_secs: u64) -> Self {
        Self::with_clock(idle_timeout_secs, Arc::new(SystemClock))
    }

    /// Create a tracker with an injected clock (tests).
    pub fn with_clock(idle_timeout_secs: u64, clock: Arc<dyn Clock>) -> Self {
        Self {
            last_seen: Arc::new(RwLock::new(HashMap::new())),
            idle_timeout: Duration::seconds(idle_timeout_secs as i64),
            clock,
        }
    }

    /// Record activity for `key`, reporting whether the session was fresh,
    /// active, or had expired while idle.
    pub fn touch(&self, key: &str) -> SessionCheck {
        let now = self.clock.now();
        let mut map = self.last_seen.write();
        match map.get(key).copied() {
            Some(last) if now - last > self.idle_timeout => {
                map.remove(key);
                SessionCheck::Expired
            }
            Some(_) => {
                map.insert(key.to_string(), now);
                SessionCheck::Active
            }
            None => {
                map.insert(key.to_string(), now);
                SessionCheck::Started
            }
        }
    }

    /// Drop every session idle past the timeout. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let mut map = self.last_seen.write();
        let before = map.len();
        map.retain(|_, last| now - *last <= self.idle_timeout);
        before - map.len()
    }

    /// Number of currently tracked sessions.
    pub fn active_count(&self) -> usize {
        self.last_seen.read().len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    /// Manually advanced clock for expiry tests.
    struct ManualClock {
        now: Mutex<DateTime<Utc>>,
    }

    impl ManualClock {
        fn new(start: DateTime<Utc>) -> Self {
            Self {
                now: Mutex::new(start),
            }
        }

        fn advance(&self, secs: i64) {
            let mut now = self.now.lock();
            *now += Duration::seconds(secs);
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.now.lock()
        }
    }

    fn start_time() -> DateTime<Utc> {
        use chrono::TimeZone;
        Utc.with_ymd_and_hms(2026, 8, 5, 9, 0, 0).unwrap()
    }

    #[test]
    fn first_touch_starts_a_session() {
        let tracker = SessionTracker::new(60);
        assert_eq!(tracker.touch("admin:-"), SessionCheck::Started);
        assert_eq!(tracker.active_count(), 1);
    }

    #[test]
    fn activity_within_timeout_stays_active() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let tracker = SessionTracker::with_clock(60, clock.clone());

        tracker.touch("officer:-");
        clock.advance(59);
        assert_eq!(tracker.touch("officer:-"), SessionCheck::Active);
    }

    #[test]
    fn idle_past_timeout_expires_then_restarts() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let tracker = SessionTracker::with_clock(60, clock.clone());

        tracker.touch("officer:-");
        clock.advance(61);
        assert_eq!(tracker.touch("officer:-"), SessionCheck::Expired);
        // The expired entry was removed; the next touch starts fresh.
        assert_eq!(tracker.touch("officer:-"), SessionCheck::Started);
    }

    #[test]
    fn exact_timeout_boundary_is_still_active() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let tracker = SessionTracker::with_clock(60, clock.clone());

        tracker.touch("k");
        clock.advance(60);
        assert_eq!(tracker.touch("k"), SessionCheck::Active);
    }

    #[test]
    fn touch_advances_the_idle_window() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let tracker = SessionTracker::with_clock(60, clock.clone());

        tracker.touch("k");
        clock.advance(40);
        tracker.touch("k");
        clock.advance(40);
        // 80 seconds since start but only 40 since last activity.
        assert_eq!(tracker.touch("k"), SessionCheck::Active);
    }

    #[test]
    fn purge_removes_only_stale_sessions() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let tracker = SessionTracker::with_clock(60, clock.clone());

        tracker.touch("stale");
        clock.advance(45);
        tracker.touch("fresh");
        clock.advance(30);

        assert_eq!(tracker.purge_expired(), 1);
        assert_eq!(tracker.active_count(), 1);
    }

    #[test]
    fn sessions_are_independent_per_key() {
        let clock = Arc::new(ManualClock::new(start_time()));
        let tracker = SessionTracker::with_clock(60, clock.clone());

        tracker.touch("a");
        clock.advance(61);
        assert_eq!(tracker.touch("b"), SessionCheck::Started);
        assert_eq!(tracker.touch("a"), SessionCheck::Expired);
    }

    #[test]
    fn clone_shares_state() {
        let tracker = SessionTracker::new(60);
        let clone = tracker.clone();
        tracker.touch("k");
        assert_eq!(clone.active_count(), 1);
    }
}
