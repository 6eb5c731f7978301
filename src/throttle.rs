//! Sliding-window request throttling.
//!
//! One [`RequestThrottle`] serves every operation class; budgets are
//! supplied per call site. Per identity (typically the client's network
//! origin) it keeps the timestamps of recent requests, evicts entries
//! older than the window lazily on each check, and denies when the
//! retained count has already reached the budget. Identity tables live
//! for the process lifetime; there is no eviction of idle identities.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use crate::config::Budget;

/// Policy signal raised when an identity exceeds its budget. Carries the
/// budget so the caller can tell the client how to back off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleExceeded {
    pub budget: Budget,
}

impl std::fmt::Display for ThrottleExceeded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "request budget exceeded: {} per {}s",
            self.budget.max_requests, self.budget.window_secs
        )
    }
}

impl std::error::Error for ThrottleExceeded {}

/// Per-identity sliding-window counters.
#[derive(Default)]
pub struct RequestThrottle {
    requests: Mutex<HashMap<String, Vec<Instant>>>,
}

impl RequestThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one request attempt for `identity` against `budget`.
    ///
    /// Allows and records the attempt when the identity has headroom;
    /// denies without recording when the window is already full.
    pub fn allow(&self, identity: &str, budget: Budget) -> Result<(), ThrottleExceeded> {
        self.allow_at(identity, budget, Instant::now())
    }

    fn allow_at(
        &self,
        identity: &str,
        budget: Budget,
        now: Instant,
    ) -> Result<(), ThrottleExceeded> {
        let window = Duration::from_secs(budget.window_secs);
        let mut requests = self.requests.lock().unwrap_or_else(|e| e.into_inner());
        let timestamps = requests.entry(identity.to_string()).or_default();

        timestamps.retain(|t| now.duration_since(*t) < window);

        if timestamps.len() >= budget.max_requests {
            return Err(ThrottleExceeded { budget });
        }

        timestamps.push(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn budget(max_requests: usize, window_secs: u64) -> Budget {
        Budget {
            max_requests,
            window_secs,
        }
    }

    #[test]
    fn allows_up_to_budget_then_denies() {
        let throttle = RequestThrottle::new();
        let b = budget(3, 60);
        let now = Instant::now();

        for _ in 0..3 {
            assert!(throttle.allow_at("10.0.0.1", b, now).is_ok());
        }
        let err = throttle.allow_at("10.0.0.1", b, now).unwrap_err();
        assert_eq!(err.budget, b);
    }

    #[test]
    fn denied_attempts_are_not_recorded() {
        let throttle = RequestThrottle::new();
        let b = budget(1, 60);
        let start = Instant::now();

        assert!(throttle.allow_at("ip", b, start).is_ok());
        // Hammering while denied must not extend the lockout.
        for i in 1..10 {
            assert!(throttle
                .allow_at("ip", b, start + Duration::from_secs(i))
                .is_err());
        }
        // The single recorded timestamp expires after the window.
        assert!(throttle
            .allow_at("ip", b, start + Duration::from_secs(61))
            .is_ok());
    }

    #[test]
    fn window_slides() {
        let throttle = RequestThrottle::new();
        let b = budget(2, 10);
        let start = Instant::now();

        assert!(throttle.allow_at("ip", b, start).is_ok());
        assert!(throttle
            .allow_at("ip", b, start + Duration::from_secs(5))
            .is_ok());
        assert!(throttle
            .allow_at("ip", b, start + Duration::from_secs(6))
            .is_err());
        // First timestamp falls out of the trailing window.
        assert!(throttle
            .allow_at("ip", b, start + Duration::from_secs(11))
            .is_ok());
    }

    #[test]
    fn identities_are_independent() {
        let throttle = RequestThrottle::new();
        let b = budget(1, 60);
        let now = Instant::now();

        assert!(throttle.allow_at("a", b, now).is_ok());
        assert!(throttle.allow_at("b", b, now).is_ok());
        assert!(throttle.allow_at("a", b, now).is_err());
    }

    #[test]
    fn distinct_budgets_share_one_table_per_identity() {
        // One throttle instance per operation class is the intended
        // wiring; the same instance with different budgets shares counts.
        let throttle = RequestThrottle::new();
        let now = Instant::now();

        assert!(throttle.allow_at("ip", budget(2, 60), now).is_ok());
        assert!(throttle.allow_at("ip", budget(1, 60), now).is_err());
    }
}
