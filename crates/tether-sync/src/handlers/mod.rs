//! Event handlers — one routine per inbound event kind.
//!
//! Every handler returns an error only on unrecoverable failure. Late,
//! duplicate, and out-of-order events are dropped by the instance-id and
//! status filters with a log line, which is what makes the protocol safe
//! over at-least-once transports.

mod acks;
mod data;
mod delete;
mod register;
mod update;

use tether_core::model::{Notification, NotificationStatus, ObjectKey, Peer};

use crate::engine::Engine;
use crate::error::SyncError;

impl Engine {
    /// Advance a notification record to `next` if it exists with the given
    /// instance id and one of the `allowed` statuses.
    ///
    /// Returns the updated record, `Ok(None)` for a stale event (logged and
    /// ignored), or `MissingRecord` when no record exists at all.
    pub(crate) fn advance_notification(
        &self,
        object: &ObjectKey,
        peer: &Peer,
        instance_id: i64,
        event: &'static str,
        allowed: &[NotificationStatus],
        next: NotificationStatus,
    ) -> Result<Option<Notification>, SyncError> {
        let Some(mut record) = self.store.retrieve_notification_record(object, peer)? else {
            return Err(SyncError::MissingRecord(format!("{event} for {object}")));
        };

        if record.instance_id != instance_id || !allowed.contains(&record.status) {
            tracing::debug!(
                object = %object,
                peer = %peer,
                event,
                status = %record.status,
                recorded_instance = record.instance_id,
                incoming_instance = instance_id,
                "late or duplicate event ignored"
            );
            return Ok(None);
        }

        record.status = next;
        self.store.update_notification_record(&record)?;
        tracing::debug!(object = %object, peer = %peer, status = %next, event, "notification advanced");
        Ok(Some(record))
    }
}
