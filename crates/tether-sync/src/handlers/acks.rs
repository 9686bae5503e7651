//! Ack and progression events — the middle of the notification lifecycle.
//!
//! All of these are idempotent by (instance id, current status): a replayed
//! or late ack fails the filter in `advance_notification` and is dropped
//! with a log line.

use tether_core::model::{DeliveryStatus, NodeRole, NotificationStatus, ObjectKey, Peer};

use crate::comms::NotificationKind;
use crate::engine::Engine;
use crate::error::SyncError;

impl Engine {
    /// The peer acknowledged our update notification.
    pub fn handle_object_updated(
        &self,
        object: &ObjectKey,
        instance_id: i64,
        peer: &Peer,
    ) -> Result<(), SyncError> {
        self.advance_notification(
            object,
            peer,
            instance_id,
            "objectUpdated",
            &[
                NotificationStatus::Update,
                NotificationStatus::UpdatePending,
            ],
            NotificationStatus::Updated,
        )?;
        Ok(())
    }

    /// The peer reports it holds the complete object. Mark delivery and
    /// acknowledge.
    pub fn handle_object_received(
        &self,
        object: &ObjectKey,
        instance_id: i64,
        peer: &Peer,
    ) -> Result<(), SyncError> {
        let advanced = self.advance_notification(
            object,
            peer,
            instance_id,
            "objectReceived",
            &[NotificationStatus::Data, NotificationStatus::Updated],
            NotificationStatus::ReceivedByDestination,
        )?;
        if advanced.is_none() {
            return Ok(());
        }

        self.store
            .update_object_delivery_status(DeliveryStatus::Delivered, object, peer)?;
        let meta = self.store.retrieve_object(object)?;
        self.comms.send_notification(
            NotificationKind::AckReceived,
            &peer.peer_type,
            &peer.peer_id,
            instance_id,
            meta.as_ref(),
        )?;
        Ok(())
    }

    /// The origin acknowledged our `Received` report.
    pub fn handle_ack_object_received(
        &self,
        object: &ObjectKey,
        instance_id: i64,
        peer: &Peer,
    ) -> Result<(), SyncError> {
        self.advance_notification(
            object,
            peer,
            instance_id,
            "ackObjectReceived",
            &[
                NotificationStatus::Received,
                NotificationStatus::ReceivedPending,
            ],
            NotificationStatus::AckReceived,
        )?;
        Ok(())
    }

    /// The peer consumed the object. An edge node is finished with it and
    /// deletes everything; the hub records consumption for that peer.
    pub fn handle_object_consumed(
        &self,
        object: &ObjectKey,
        instance_id: i64,
        peer: &Peer,
    ) -> Result<(), SyncError> {
        let Some(record) = self.store.retrieve_notification_record(object, peer)? else {
            return Err(SyncError::MissingRecord(format!(
                "objectConsumed for {object}"
            )));
        };
        if record.instance_id != instance_id
            || !matches!(
                record.status,
                NotificationStatus::Data
                    | NotificationStatus::Updated
                    | NotificationStatus::ReceivedByDestination
            )
        {
            tracing::debug!(
                object = %object,
                peer = %peer,
                status = %record.status,
                "late or duplicate objectConsumed ignored"
            );
            return Ok(());
        }

        // Fetch the metadata before any deletion so the ack can carry it.
        let meta = self.store.retrieve_object(object)?;

        if self.role == NodeRole::Ess {
            self.store.delete_stored_object(object)?;
            self.store.delete_notification_records(object, None)?;
            self.chunks.remove_object(object);
            tracing::info!(object = %object, "object consumed, removed from edge node");
        } else {
            self.store
                .update_object_delivery_status(DeliveryStatus::Consumed, object, peer)?;
            let mut record = record;
            record.status = NotificationStatus::AckConsumed;
            self.store.update_notification_record(&record)?;
        }

        self.comms.send_notification(
            NotificationKind::AckConsumed,
            &peer.peer_type,
            &peer.peer_id,
            instance_id,
            meta.as_ref(),
        )?;
        Ok(())
    }

    /// The origin acknowledged our consumption report.
    pub fn handle_ack_consumed(
        &self,
        object: &ObjectKey,
        instance_id: i64,
        peer: &Peer,
    ) -> Result<(), SyncError> {
        let advanced = self.advance_notification(
            object,
            peer,
            instance_id,
            "ackConsumed",
            &[
                NotificationStatus::Consumed,
                NotificationStatus::ConsumedPending,
            ],
            NotificationStatus::AckConsumed,
        )?;
        if advanced.is_some() && self.role == NodeRole::Ess {
            self.store.delete_stored_object(object)?;
            self.store.delete_notification_records(object, None)?;
        }
        Ok(())
    }

    /// Resend acknowledged — one-shot process flag.
    pub fn handle_ack_resend(&self) {
        self.set_resend_acked();
        tracing::debug!("resend request acknowledged");
    }

    /// Registration acknowledged — one-shot process flag.
    pub fn handle_register_ack(&self) {
        self.set_registered();
        tracing::debug!("registration acknowledged");
    }
}
