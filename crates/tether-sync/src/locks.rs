//! Per-object lock array — serializes all state mutation for one object.
//!
//! A fixed array of mutexes, indexed by hashing (org, type, id). Distinct
//! objects may share a slot; that only costs a little contention, never
//! correctness. The array bounds the lock footprint no matter how many
//! objects are in flight.

use static_assertions::const_assert;
use std::sync::{Mutex, MutexGuard};

use tether_core::model::ObjectKey;

/// Number of lock slots. Must be a power of two so the hash can be masked.
const LOCK_COUNT: usize = 256;
const_assert!(LOCK_COUNT.is_power_of_two());

pub struct ObjectLocks {
    locks: Vec<Mutex<()>>,
}

impl ObjectLocks {
    pub fn new() -> Self {
        Self {
            locks: (0..LOCK_COUNT).map(|_| Mutex::new(())).collect(),
        }
    }

    fn index(object: &ObjectKey) -> usize {
        let mut hasher = blake3::Hasher::new();
        hasher.update(object.org_id.as_bytes());
        hasher.update(b"/");
        hasher.update(object.object_type.as_bytes());
        hasher.update(b"/");
        hasher.update(object.object_id.as_bytes());
        let digest = hasher.finalize();
        let word: [u8; 4] = digest.as_bytes()[..4].try_into().expect("digest >= 4 bytes");
        u32::from_be_bytes(word) as usize & (LOCK_COUNT - 1)
    }

    /// Acquire the slot for this object. Held across the whole
    /// read-record / mutate-chunk-info / write-record / send sequence.
    pub fn lock(&self, object: &ObjectKey) -> MutexGuard<'_, ()> {
        // A poisoned slot still serializes its objects; take the guard.
        self.locks[Self::index(object)]
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }
}

impl Default for ObjectLocks {
    fn default() -> Self {
        Self::new()
    }
}
