//! In-flight chunk index — tracks, per (object, peer) pair, which chunks
//! have been requested, which have arrived, and when each outstanding
//! request may be retried.
//!
//! The map itself is guarded by a single reader/writer lock; entries are
//! copied out under the read lock, mutated by value, and re-inserted under
//! the write lock. That discipline is sound because all mutation for a
//! given key is serialized by the per-object lock, and it keeps blocking
//! I/O out of the map lock entirely.

use std::collections::HashMap;
use std::sync::RwLock;
use std::time::{SystemTime, UNIX_EPOCH};

use tether_core::model::{MetaData, ObjectKey, TransferId};

/// A chunk request is considered lost after this many base resend
/// intervals without a reply.
const RESEND_BACKOFF_FACTOR: i64 = 6;

/// Current unix time in seconds.
pub(crate) fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or(0)
}

// ── Chunk info ────────────────────────────────────────────────────────────────

/// In-memory descriptor of one ongoing chunked transfer.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChunkInfo {
    /// Snapshot of the object's chunk size at transfer start.
    pub chunk_size: i64,

    /// Bitmap of delivered chunks; bit i covers offset i·chunk_size.
    /// Empty iff the transfer moves as a single request at offset 0.
    pub chunks_received: Vec<u8>,

    /// Offset → earliest retry time (unix seconds). Presence means the
    /// offset is in flight.
    pub chunk_resend_times: HashMap<i64, i64>,

    pub max_requested_offset: i64,
    pub max_received_offset: i64,

    /// Total bytes whose bitmap bit flipped 0→1. Duplicates don't count.
    pub received_data_size: i64,

    /// Overall next-retry deadline, used as a cheap gate by the resend
    /// planner before scanning the per-offset map.
    pub resend_time: i64,
}

impl ChunkInfo {
    fn new(meta: &MetaData) -> Self {
        let bitmap_len = if meta.chunk_size > 0 && meta.object_size > 0 {
            ((meta.object_size / meta.chunk_size + 1) / 8 + 1) as usize
        } else {
            0
        };
        Self {
            chunk_size: meta.chunk_size,
            chunks_received: vec![0u8; bitmap_len],
            ..Default::default()
        }
    }
}

// ── Errors ────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChunkError {
    #[error("no transfer in flight for {0}")]
    UnknownTransfer(String),

    /// The offset is not in the resend map: it was never requested, or its
    /// request was already retired by an earlier delivery.
    #[error("offset {0} was not requested or was already retired")]
    UnexpectedOffset(i64),
}

// ── Tracker ───────────────────────────────────────────────────────────────────

/// Process-wide table of in-flight transfers.
pub struct ChunkTracker {
    entries: RwLock<HashMap<TransferId, ChunkInfo>>,
    resend_interval: i64,
}

impl ChunkTracker {
    pub fn new(resend_interval_secs: i64) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            resend_interval: resend_interval_secs,
        }
    }

    fn deadline(&self, now: i64) -> i64 {
        now + RESEND_BACKOFF_FACTOR * self.resend_interval
    }

    /// Record that the chunk at `offset` has been requested, creating the
    /// entry on first use. Arms the per-offset retry timer and refreshes
    /// the entry-level gate.
    pub fn track_request(&self, id: &TransferId, meta: &MetaData, offset: i64) {
        let mut info = self
            .snapshot(id)
            .unwrap_or_else(|| ChunkInfo::new(meta));

        let deadline = self.deadline(unix_now());
        info.chunk_resend_times.insert(offset, deadline);
        if offset > info.max_requested_offset {
            info.max_requested_offset = offset;
        }
        info.resend_time = deadline;

        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), info);
    }

    /// Record a delivered chunk of `size` bytes at `offset`: retire the
    /// outstanding request and flip the bitmap bit, counting the bytes once.
    /// Returns `max_requested_offset` so the caller can compute the next
    /// offset to request.
    pub fn mark_received(&self, id: &TransferId, offset: i64, size: i64) -> Result<i64, ChunkError> {
        let mut info = self
            .snapshot(id)
            .ok_or_else(|| ChunkError::UnknownTransfer(id.to_string()))?;

        if info.chunk_resend_times.remove(&offset).is_none() {
            return Err(ChunkError::UnexpectedOffset(offset));
        }

        if info.chunks_received.is_empty() {
            // Single-request transfer; the retired resend entry is the
            // duplicate guard.
            info.received_data_size += size;
        } else {
            let chunk_index = (offset / info.chunk_size) as usize;
            let byte_index = chunk_index >> 3;
            let bit_mask = 1u8 << (chunk_index & 7);
            if info.chunks_received[byte_index] & bit_mask == 0 {
                info.chunks_received[byte_index] |= bit_mask;
                info.received_data_size += size;
            } else {
                tracing::debug!(transfer = %id, offset, "duplicate chunk delivery, bit already set");
            }
        }

        if offset > info.max_received_offset {
            info.max_received_offset = offset;
        }
        info.resend_time = self.deadline(unix_now());

        let max_requested = info.max_requested_offset;
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), info);
        Ok(max_requested)
    }

    /// Copy of the entry, if a transfer is active.
    pub fn snapshot(&self, id: &TransferId) -> Option<ChunkInfo> {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(id)
            .cloned()
    }

    pub fn contains(&self, id: &TransferId) -> bool {
        self.entries
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .contains_key(id)
    }

    /// Drop the entry: the transfer completed or was abandoned.
    pub fn remove(&self, id: &TransferId) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .remove(id);
    }

    /// Drop every entry for the object, across all peers. Used on object
    /// deletion.
    pub fn remove_object(&self, object: &ObjectKey) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .retain(|id, _| id.object != *object);
    }

    /// Offsets whose retry deadline has passed.
    ///
    /// Scanning the per-offset map on every tick is wasteful, so the scan
    /// is gated: it runs when the entry-level deadline has passed, or when
    /// `(max_requested − max_received) / chunk_size` drops below the number
    /// of outstanding requests — the signature of a lost or out-of-order
    /// chunk opening a gap in the sequence.
    pub fn offsets_due(&self, id: &TransferId, now: i64) -> Vec<i64> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        let Some(info) = entries.get(id) else {
            return Vec::new();
        };

        let gap_chunks = if info.chunk_size > 0 {
            (info.max_requested_offset - info.max_received_offset) / info.chunk_size
        } else {
            0
        };
        let has_gap = (gap_chunks as usize) < info.chunk_resend_times.len();

        if info.resend_time <= now || has_gap {
            let mut due: Vec<i64> = info
                .chunk_resend_times
                .iter()
                .filter(|&(_, &deadline)| deadline <= now)
                .map(|(&offset, _)| offset)
                .collect();
            due.sort_unstable();
            due
        } else {
            Vec::new()
        }
    }

    #[cfg(test)]
    fn insert_raw(&self, id: &TransferId, info: ChunkInfo) {
        self.entries
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .insert(id.clone(), info);
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
