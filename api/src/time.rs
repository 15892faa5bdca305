use jiff::{Timestamp, civil, tz::TimeZone};
#[cfg(feature = "mock-time")]
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct TimeSource {
    #[cfg(feature = "mock-time")]
    time: Arc<Mutex<Timestamp>>,
}

impl TimeSource {
    #[allow(clippy::new_without_default)]
    #[cfg(not(feature = "mock-time"))]
    pub fn new() -> Self {
        Self {}
    }

    #[cfg(feature = "mock-time")]
    pub fn new(initial_time: Timestamp) -> Self {
        Self {
            time: Arc::new(Mutex::new(initial_time)),
        }
    }

    #[cfg(not(feature = "mock-time"))]
    pub fn now(&self) -> Timestamp {
        Timestamp::now()
    }

    #[cfg(feature = "mock-time")]
    pub fn now(&self) -> Timestamp {
        *self.time.lock().unwrap()
    }

    /// Move the mocked clock forward. Spans with calendar units (days,
    /// weeks) are resolved against UTC; `Timestamp` arithmetic alone only
    /// accepts absolute units.
    #[cfg(feature = "mock-time")]
    pub fn advance(&self, duration: jiff::Span) {
        let mut time = self.time.lock().unwrap();
        let zoned = time.to_zoned(TimeZone::UTC);
        *time = zoned
            .checked_add(duration)
            .expect("mocked time overflowed")
            .timestamp();
    }

    #[cfg(feature = "mock-time")]
    pub fn set(&self, time: Timestamp) {
        *self.time.lock().unwrap() = time;
    }
}

/// The calendar date of a timestamp in the configured business timezone.
///
/// Falls back to UTC if the timezone name is unknown, rather than failing
/// the request or the scheduler tick.
pub fn local_date(ts: Timestamp, tz_name: &str) -> civil::Date {
    let tz = TimeZone::get(tz_name).unwrap_or(TimeZone::UTC);
    ts.to_zoned(tz).date()
}

/// Midnight UTC of a calendar date, used when a date needs to be compared
/// against or stored in a timestamptz column.
pub fn start_of_day_utc(date: civil::Date) -> Result<Timestamp, jiff::Error> {
    Ok(date.to_zoned(TimeZone::UTC)?.timestamp())
}
