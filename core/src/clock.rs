//! Clock abstraction for date-sensitive reads.

use chrono::{DateTime, NaiveDate, Utc};

/// Source of "now" for as-of defaulting and future-date clamping.
pub trait Clock: Send + Sync {
    /// Current instant.
    fn now(&self) -> DateTime<Utc>;

    /// Current date.
    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }
}

/// Wall-clock time in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock pinned to a fixed instant, for deterministic tests.
#[cfg(any(test, feature = "test-utils"))]
#[derive(Debug, Clone, Copy)]
pub struct FixedClock {
    instant: DateTime<Utc>,
}

#[cfg(any(test, feature = "test-utils"))]
impl FixedClock {
    /// Pin the clock to the given instant.
    pub fn at(instant: DateTime<Utc>) -> Self {
        Self { instant }
    }

    /// Pin the clock to noon UTC on the given date.
    pub fn on(date: NaiveDate) -> Self {
        let instant = date
            .and_hms_opt(12, 0, 0)
            .expect("noon is a valid time")
            .and_utc();
        Self { instant }
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        self.instant
    }
}
