//! Injected sources of time and identity, so every transform can be driven
//! deterministically from tests.

use std::sync::Arc;

use chrono::{Local, NaiveDateTime};
use parking_lot::Mutex;
use ulid::Ulid;

use crate::mission::MissionId;

/// Supplies the owner's local wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> NaiveDateTime;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> NaiveDateTime {
        Local::now().naive_local()
    }
}

/// A clock that only moves when told to.
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

    pub fn set(&self, now: NaiveDateTime) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.now.lock();
        *now += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> NaiveDateTime {
        *self.now.lock()
    }
}

impl<C: Clock + ?Sized> Clock for Arc<C> {
    fn now(&self) -> NaiveDateTime {
        (**self).now()
    }
}

pub trait IdGenerator: Send + Sync {
    fn generate_mission_id(&self) -> MissionId;
}

/// Mission ids are ULIDs, so they carry the creation timestamp and sort by it.
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_mission_id(&self) -> MissionId {
        let timestamp_ms = self.clock.now().and_utc().timestamp_millis().max(0) as u64;
        let ulid = Ulid::from_parts(timestamp_ms, rand::random());
        MissionId::from(ulid.to_string())
    }
}

impl<G: IdGenerator + ?Sized> IdGenerator for Arc<G> {
    fn generate_mission_id(&self) -> MissionId {
        (**self).generate_mission_id()
    }
}

/// Hands out `prefix-1`, `prefix-2`, ... in order.
#[derive(Debug)]
pub struct SequentialIds {
    prefix: String,
    next: Mutex<u64>,
}

impl SequentialIds {
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            next: Mutex::new(1),
        }
    }
}

impl IdGenerator for SequentialIds {
    fn generate_mission_id(&self) -> MissionId {
        let mut next = self.next.lock();
        let id = MissionId::from(format!("{}-{}", self.prefix, *next));
        *next += 1;
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn noon() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap()
    }

    #[test]
    fn ulid_ids_are_unique_and_carry_the_clock_timestamp() {
        let ids = UlidGenerator::new(FixedClock::new(noon()));
        let first = ids.generate_mission_id();
        let second = ids.generate_mission_id();
        assert_ne!(first, second);

        let parsed = Ulid::from_string(first.as_str()).expect("valid ulid");
        assert_eq!(
            parsed.timestamp_ms(),
            noon().and_utc().timestamp_millis() as u64
        );
    }

    #[test]
    fn fixed_clock_moves_only_when_asked() {
        let clock = Arc::new(FixedClock::new(noon()));
        assert_eq!(clock.now(), noon());
        clock.advance(chrono::Duration::hours(13));
        assert_eq!(clock.now().date(), NaiveDate::from_ymd_opt(2024, 1, 2).unwrap());
        clock.set(noon());
        assert_eq!(clock.now(), noon());
    }

    #[test]
    fn sequential_ids_count_up() {
        let ids = SequentialIds::new("mission");
        assert_eq!(ids.generate_mission_id().as_str(), "mission-1");
        assert_eq!(ids.generate_mission_id().as_str(), "mission-2");
    }
}
