//! Resend planner — decides which chunk requests to re-issue.
//!
//! The engine generates no timers of its own; an external periodic driver
//! (the daemon's ticker) samples the planner and re-requests whatever it
//! yields.

use tether_core::model::{MetaData, Notification, TransportProtocol};

use crate::chunks::unix_now;
use crate::engine::Engine;
use crate::error::SyncError;

impl Engine {
    /// Offsets that should be re-requested now for a pending notification.
    ///
    /// With an active in-flight entry this applies the tracker's gate and
    /// returns the offsets past their retry deadline. Without one — typical
    /// after a restart — the transfer is planned from scratch. Store
    /// failures are absorbed: the planner logs and yields nothing, and the
    /// next tick tries again.
    pub fn offsets_to_resend(&self, notification: &Notification, meta: &MetaData) -> Vec<i64> {
        let id = notification.transfer_id();
        if self.chunks.contains(&id) {
            return self.chunks.offsets_due(&id, unix_now());
        }
        match self.offsets_from_scratch(notification, meta) {
            Ok(offsets) => offsets,
            Err(e) => {
                tracing::warn!(transfer = %id, error = %e, "resend planning failed");
                Vec::new()
            }
        }
    }

    /// Plan the initial request batch for a transfer with no in-flight
    /// entry. Creates the entry without touching the store's notification
    /// record.
    ///
    /// The batch size is the full in-flight window for MQTT destinations
    /// and 1 for HTTP. Degenerate sizes collapse to a single request at
    /// offset 0.
    pub fn offsets_from_scratch(
        &self,
        notification: &Notification,
        meta: &MetaData,
    ) -> Result<Vec<i64>, SyncError> {
        let id = notification.transfer_id();
        let peer = notification.peer();

        let protocol = self
            .store
            .retrieve_destination_protocol(&notification.org_id, &peer)?;
        let window = match protocol {
            TransportProtocol::Mqtt => self.max_inflight_chunks,
            TransportProtocol::Http => 1,
        };

        if meta.chunk_size <= 0 || meta.object_size <= 0 {
            self.chunks.track_request(&id, meta, 0);
            return Ok(vec![0]);
        }

        let mut offsets = Vec::with_capacity(window);
        let mut offset = 0i64;
        while offset < meta.object_size && offsets.len() < window {
            self.chunks.track_request(&id, meta, offset);
            offsets.push(offset);
            offset += meta.chunk_size;
        }
        Ok(offsets)
    }

    /// One driver tick: sweep every pending `Getdata` record and re-request
    /// the offsets the planner yields. Returns how many requests went out.
    pub fn resend_pending(&self) -> Result<usize, SyncError> {
        let pending = match self.store.retrieve_pending_notifications() {
            Ok(pending) => pending,
            Err(e) => {
                tracing::warn!(error = %e, "could not enumerate pending notifications");
                return Ok(0);
            }
        };

        let mut requested = 0usize;
        for record in pending {
            let object = record.object_key();
            let peer = record.peer();

            let meta = match self.store.retrieve_object(&object) {
                Ok(Some(meta)) => meta,
                Ok(None) => {
                    tracing::warn!(object = %object, "pending notification for unknown object");
                    continue;
                }
                Err(e) => {
                    tracing::warn!(object = %object, error = %e, "metadata lookup failed");
                    continue;
                }
            };

            let _guard = self.locks.lock(&object);
            for offset in self.offsets_to_resend(&record, &meta) {
                self.update_get_data_notification(&meta, &peer, offset)?;
                self.comms.get_data(&meta, offset)?;
                requested += 1;
            }
        }

        if requested > 0 {
            tracing::info!(requested, "chunk requests re-issued");
        }
        Ok(requested)
    }
}
