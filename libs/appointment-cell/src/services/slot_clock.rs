// libs/appointment-cell/src/services/slot_clock.rs
//
// Slot labels are "HH:00" or "HH:30" and always read in the clinic's fixed
// UTC+09:00 zone. No timezone database is consulted.

use std::sync::{Mutex, OnceLock, PoisonError};

use chrono::{DateTime, Duration, FixedOffset, NaiveDate, Utc};
use regex::Regex;
use tracing::error;

use crate::models::AppointmentError;

pub const CLINIC_UTC_OFFSET: &str = "+09:00";
const CLINIC_UTC_OFFSET_SECS: i32 = 9 * 3600;

fn slot_pattern() -> Option<&'static Regex> {
    static SLOT_PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    SLOT_PATTERN
        .get_or_init(|| match Regex::new(r"^([01]\d|2[0-3]):(00|30)$") {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                error!("Slot pattern failed to compile, rejecting every time: {}", e);
                None
            }
        })
        .as_ref()
}

/// True iff `time` is a 30-minute slot label between `00:00` and `23:30`.
pub fn validate_slot_time(time: &str) -> bool {
    slot_pattern().is_some_and(|pattern| pattern.is_match(time))
}

pub fn parse_date(date: &str) -> Result<NaiveDate, AppointmentError> {
    NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").map_err(|_| {
        AppointmentError::InvalidInput(format!("Invalid appointmentDate: {:?}, expected YYYY-MM-DD", date))
    })
}

/// Builds `{date}T{time}:00+09:00`.
pub fn compose_instant(date: NaiveDate, time: &str) -> Result<DateTime<FixedOffset>, AppointmentError> {
    let raw = format!("{}T{}:00{}", date.format("%Y-%m-%d"), time, CLINIC_UTC_OFFSET);
    DateTime::parse_from_rfc3339(&raw)
        .map_err(|_| AppointmentError::InvalidTime(format!("Invalid appointmentTime: {:?}", time)))
}

/// Re-expresses `instant` in the clinic zone.
pub fn to_clinic_time(instant: &DateTime<FixedOffset>) -> DateTime<FixedOffset> {
    match FixedOffset::east_opt(CLINIC_UTC_OFFSET_SECS) {
        Some(offset) => instant.with_timezone(&offset),
        None => *instant,
    }
}

/// Stored form of an instant, e.g. `2025-01-23T10:30:00+09:00`.
pub fn format_instant(instant: &DateTime<FixedOffset>) -> String {
    to_clinic_time(instant)
        .format("%Y-%m-%dT%H:%M:%S%:z")
        .to_string()
}

/// Source of "now" for the scheduling core.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<FixedOffset>;

    /// Not strictly in the future, evaluated against a fresh `now()`.
    fn is_past(&self, instant: &DateTime<FixedOffset>) -> bool {
        *instant <= self.now()
    }
}

/// Wall-clock time, read on every call.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<FixedOffset> {
        Utc::now().into()
    }
}

/// Manually driven clock for tests and replays.
#[derive(Debug)]
pub struct FixedClock {
    now: Mutex<DateTime<FixedOffset>>,
}

impl FixedClock {
    pub fn new(now: DateTime<FixedOffset>) -> Self {
        Self { now: Mutex::new(now) }
    }

    pub fn set(&self, now: DateTime<FixedOffset>) {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner) = now;
    }

    pub fn advance(&self, by: Duration) {
        let mut now = self.now.lock().unwrap_or_else(PoisonError::into_inner);
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<FixedOffset> {
        *self.now.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
