// libs/appointment-cell/src/services/slot_lock.rs
//
// Serialises the conflict check and the write that follows it for one
// (doctor, instant) slot within this process. Entries are weak so idle slots
// do not accumulate.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, Weak};

use chrono::{DateTime, FixedOffset};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::debug;

pub type SlotGuard = OwnedMutexGuard<()>;

#[derive(Debug, Default)]
pub struct SlotLockRegistry {
    slots: Mutex<HashMap<String, Weak<AsyncMutex<()>>>>,
}

impl SlotLockRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn generate_lock_key(doctor_id: &str, instant: &DateTime<FixedOffset>) -> String {
        format!("{}|{}", doctor_id, instant.timestamp())
    }

    /// Waits until the slot is free and holds it until the guard drops.
    pub async fn acquire(&self, doctor_id: &str, instant: &DateTime<FixedOffset>) -> SlotGuard {
        let key = Self::generate_lock_key(doctor_id, instant);

        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.retain(|_, slot| slot.strong_count() > 0);

            match slots.get(&key).and_then(Weak::upgrade) {
                Some(slot) => slot,
                None => {
                    let slot = Arc::new(AsyncMutex::new(()));
                    slots.insert(key.clone(), Arc::downgrade(&slot));
                    slot
                }
            }
        };

        debug!("Acquiring slot lock {}", key);
        slot.lock_owned().await
    }
}

#[cfg(test)]
impl SlotLockRegistry {
    /// Slots currently held or awaited.
    fn active_slots(&self) -> usize {
        self.slots
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .filter(|slot| slot.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn instant(raw: &str) -> DateTime<FixedOffset> {
        DateTime::parse_from_rfc3339(raw).unwrap()
    }

    #[tokio::test]
    async fn same_slot_is_exclusive() {
        let registry = Arc::new(SlotLockRegistry::new());
        let at = instant("2025-01-23T10:00:00+09:00");

        let guard = registry.acquire("doctor-1", &at).await;

        let contender = {
            let registry = registry.clone();
            tokio::spawn(async move {
                let _guard = registry.acquire("doctor-1", &at).await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), contender)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn different_doctors_and_equal_instants_across_offsets() {
        let registry = SlotLockRegistry::new();
        let local = instant("2025-01-23T10:00:00+09:00");
        let utc = instant("2025-01-23T01:00:00Z");

        let _first = registry.acquire("doctor-1", &local).await;
        let _other_doctor = tokio::time::timeout(Duration::from_millis(50), registry.acquire("doctor-2", &local))
            .await
            .unwrap();

        // same instant written with another offset maps to the same slot
        let blocked = tokio::time::timeout(Duration::from_millis(50), registry.acquire("doctor-1", &utc)).await;
        assert!(blocked.is_err());
    }

    #[tokio::test]
    async fn released_slots_are_dropped() {
        let registry = SlotLockRegistry::new();
        let at = instant("2025-01-23T10:00:00+09:00");

        {
            let _guard = registry.acquire("doctor-1", &at).await;
            assert_eq!(registry.active_slots(), 1);
        }
        assert_eq!(registry.active_slots(), 0);
    }
}
