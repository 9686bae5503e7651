//! Object update receipt — the recipient-side entry point of a transfer.

use tether_core::model::{MetaData, ObjectStatus, TransferId};

use crate::comms::NotificationKind;
use crate::engine::Engine;
use crate::error::SyncError;

impl Engine {
    /// Handle an inbound `Update` notification for an object.
    ///
    /// Duplicates and replays are filtered by instance id. A fresh update
    /// purges whatever transfer was in progress for the object, stores the
    /// new metadata, acknowledges with `Updated`, and opens the chunk
    /// request window (unless the object carries no payload, in which case
    /// it is complete on arrival).
    pub fn handle_update(&self, meta: &MetaData) -> Result<(), SyncError> {
        let object = meta.object_key();
        let peer = meta.origin_peer();
        let id = TransferId {
            object: object.clone(),
            peer: peer.clone(),
        };

        // Serializes against concurrent data chunks and replayed updates
        // for the same object.
        let _guard = self.locks.lock(&object);

        if let Some(existing) = self.store.retrieve_notification_record(&object, &peer)? {
            if existing.instance_id >= meta.instance_id {
                tracing::debug!(
                    object = %object,
                    stored_instance = existing.instance_id,
                    incoming_instance = meta.instance_id,
                    "duplicate or out-of-order update ignored"
                );
                return Ok(());
            }
            // A newer instance supersedes whatever was in flight.
            self.store.delete_notification_records(&object, Some(&peer))?;
            self.chunks.remove(&id);
        }

        let status = if meta.has_no_payload() {
            ObjectStatus::CompletelyReceived
        } else {
            ObjectStatus::PartiallyReceived
        };
        self.store.store_object(meta, None, status)?;
        tracing::info!(object = %object, instance = meta.instance_id, status = %status, "object update stored");

        self.comms.send_notification(
            NotificationKind::Updated,
            &peer.peer_type,
            &peer.peer_id,
            meta.instance_id,
            Some(meta),
        )?;

        if meta.has_no_payload() {
            return Ok(());
        }

        if meta.chunk_size <= 0 || meta.object_size <= 0 {
            // Small or unknown-size object: one request at offset 0.
            self.request_chunk(meta, &peer, 0)?;
        } else {
            let mut offset = 0i64;
            let mut in_flight = 0usize;
            while offset < meta.object_size && in_flight < self.max_inflight_chunks {
                self.request_chunk(meta, &peer, offset)?;
                offset += meta.chunk_size;
                in_flight += 1;
            }
        }
        Ok(())
    }
}
