use std::fmt;

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

const MILLIS_PER_DAY: i64 = 86_400_000;

/// The last representable millisecond of `date` (23:59:59.999).
pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default()) + Duration::milliseconds(MILLIS_PER_DAY - 1)
}

/// Whole calendar days from `now` until `target`; negative once the target day has passed.
pub fn days_until(target: NaiveDateTime, now: NaiveDateTime) -> i64 {
    target
        .date()
        .signed_duration_since(now.date())
        .num_days()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "kind", content = "days", rename_all = "snake_case")]
pub enum TimeLeft {
    Remaining(u64),
    Today,
    Overdue(u64),
}

impl TimeLeft {
    pub fn from_days(days: i64) -> Self {
        match days {
            0 => TimeLeft::Today,
            d if d > 0 => TimeLeft::Remaining(d.unsigned_abs()),
            d => TimeLeft::Overdue(d.unsigned_abs()),
        }
    }

    pub fn days(&self) -> i64 {
        match *self {
            TimeLeft::Remaining(days) => days as i64,
            TimeLeft::Today => 0,
            TimeLeft::Overdue(days) => -(days as i64),
        }
    }

    pub fn is_overdue(&self) -> bool {
        matches!(self, TimeLeft::Overdue(_))
    }
}

impl fmt::Display for TimeLeft {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeLeft::Remaining(1) => write!(f, "1 day left"),
            TimeLeft::Remaining(days) => write!(f, "{} days left", days),
            TimeLeft::Today => write!(f, "Today!"),
            TimeLeft::Overdue(days) => write!(f, "{} days overdue", days),
        }
    }
}

/// Countdown from `now` to `target`. Recompute on every read; `now` moves.
pub fn time_left(target: NaiveDateTime, now: NaiveDateTime) -> TimeLeft {
    TimeLeft::from_days(days_until(target, now))
}

pub fn time_left_label(target: NaiveDateTime, now: NaiveDateTime) -> String {
    time_left(target, now).to_string()
}
