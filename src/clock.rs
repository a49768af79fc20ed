//! Wall-clock access.
//!
//! Every date the engine uses comes from a `Clock`, so tests can pin "today".
//! Dates are the device's local calendar date; no timezone handling beyond that.

use std::sync::Mutex;

use chrono::{Days, Local, NaiveDate, NaiveDateTime};

pub trait Clock: Send + Sync {
    /// Current local date and time
    fn now(&self) -> NaiveDateTime;

    /// Current local calendar date
    fn today(&self) -> NaiveDate {
        self.now().date()
    }

    /// Milliseconds since the epoch, reading `now()` as UTC
    fn now_millis(&self) -> i64 {
        self.now().and_utc().timestamp_millis()
    }
}

/// The device's local clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A settable clock for tests
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<NaiveDateTime>,
}

impl FixedClock {
    pub fn new(now: NaiveDateTime) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    /// Clock pinned to noon on `date`
    pub fn on(date: NaiveDate) -> Self {
        Self::new(noon(date))
    }

    /// Move to noon on `date`
    pub fn set_date(&self, date: NaiveDate) {
        if let Ok(mut now) = self.now.lock() {
            *now = noon(date);
        }
    }

    /// Move forward by whole days, keeping the time of day
    pub fn advance_days(&self, days: u64) {
        if let Ok(mut now) = self.now.lock() {
            if let Some(next) = now.checked_add_days(Days::new(days)) {
                *now = next;
            }
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        match self.now.lock() {
            Ok(now) => *now,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }
}

fn noon(date: NaiveDate) -> NaiveDateTime {
    date.and_hms_opt(12, 0, 0).unwrap_or_default()
}

/// Format a date as its `YYYY-MM-DD` key form
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Parse a strict `YYYY-MM-DD` date key
pub fn parse_date_key(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    if raw.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d").ok()
}
