//! Clock abstraction for determinism.

use chrono::{DateTime, Utc};

/// Abstraction over system time for deterministic behavior.
pub trait Clock: Send + Sync {
    /// Returns the current time.
    fn now(&self) -> DateTime<Utc>;
}

/// Production clock that delegates to the system clock.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Returns how long to wait from `clock.now()` until `at`; zero once `at`
/// has passed.
#[must_use]
pub fn duration_until(clock: &dyn Clock, at: DateTime<Utc>) -> std::time::Duration {
    (at - clock.now())
        .to_std()
        .unwrap_or(std::time::Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use chrono::{TimeDelta, TimeZone};

    use super::*;

    struct At(DateTime<Utc>);

    impl Clock for At {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[test]
    fn test_duration_until_future_instant() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();

        let wait = duration_until(&At(now), now + TimeDelta::seconds(90));

        assert_eq!(wait, std::time::Duration::from_secs(90));
    }

    #[test]
    fn test_duration_until_past_instant_is_zero() {
        let now = Utc.with_ymd_and_hms(2026, 1, 15, 10, 0, 0).unwrap();

        let wait = duration_until(&At(now), now - TimeDelta::minutes(5));

        assert_eq!(wait, std::time::Duration::ZERO);
    }
}
