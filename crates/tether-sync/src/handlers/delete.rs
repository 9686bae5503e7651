//! Delete lifecycle — removing objects and tearing down their transfers.

use tether_core::model::{MetaData, NodeRole, NotificationStatus, ObjectKey, ObjectStatus, Peer};

use crate::comms::NotificationKind;
use crate::engine::Engine;
use crate::error::SyncError;
use crate::store::StoreError;

impl Engine {
    /// Handle an inbound `Delete` for an object.
    ///
    /// The object is marked deleted rather than removed, so late chunk
    /// appends hit the `Discarded` sentinel instead of recreating state.
    /// An edge node that never stored the object recreates a tombstone; the
    /// hub instead tells the origin the object is already gone.
    pub fn handle_delete(&self, meta: &MetaData) -> Result<(), SyncError> {
        let object = meta.object_key();
        let peer = meta.origin_peer();

        let mut forward_deleted = false;
        match self.store.mark_object_deleted(&object) {
            Ok(()) => {}
            Err(StoreError::NotFound) => {
                if self.role == NodeRole::Ess {
                    let mut tombstone = meta.clone();
                    tombstone.deleted = true;
                    self.store
                        .store_object(&tombstone, None, ObjectStatus::ObjDeleted)?;
                    tracing::debug!(object = %object, "delete for unknown object, tombstone recorded");
                } else {
                    forward_deleted = true;
                    self.comms.send_notification(
                        NotificationKind::Deleted,
                        &peer.peer_type,
                        &peer.peer_id,
                        meta.instance_id,
                        Some(meta),
                    )?;
                }
            }
            Err(e) => return Err(e.into()),
        }

        match self.store.delete_stored_data(&object) {
            Ok(()) | Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        match self.store.reset_object_remaining_consumers(&object) {
            Ok(()) | Err(StoreError::NotFound) => {}
            Err(e) => return Err(e.into()),
        }
        self.store.delete_notification_records(&object, None)?;
        self.chunks.remove_object(&object);

        // Recorded after the wipe above so the pending `Deleted` survives
        // until the origin acknowledges it.
        if forward_deleted {
            self.store
                .update_notification_record(&tether_core::model::Notification::new(
                    &object,
                    &peer,
                    NotificationStatus::Deleted,
                    meta.instance_id,
                ))?;
        }

        self.comms.send_notification(
            NotificationKind::AckDelete,
            &peer.peer_type,
            &peer.peer_id,
            meta.instance_id,
            Some(meta),
        )?;
        tracing::info!(object = %object, "object deleted");
        Ok(())
    }

    /// The peer acknowledged our delete notification.
    pub fn handle_ack_delete(
        &self,
        object: &ObjectKey,
        instance_id: i64,
        peer: &Peer,
    ) -> Result<(), SyncError> {
        let advanced = self.advance_notification(
            object,
            peer,
            instance_id,
            "ackDelete",
            &[
                NotificationStatus::Delete,
                NotificationStatus::DeletePending,
            ],
            NotificationStatus::AckDelete,
        )?;
        if advanced.is_some() {
            self.store.delete_stored_object(object)?;
        }
        Ok(())
    }

    /// The peer reports the object is gone on its side. Retire the record
    /// and acknowledge.
    pub fn handle_object_deleted(
        &self,
        object: &ObjectKey,
        instance_id: i64,
        peer: &Peer,
    ) -> Result<(), SyncError> {
        let Some(record) = self.store.retrieve_notification_record(object, peer)? else {
            return Err(SyncError::MissingRecord(format!(
                "objectDeleted for {object}"
            )));
        };
        if record.instance_id != instance_id
            || !matches!(
                record.status,
                NotificationStatus::Delete
                    | NotificationStatus::DeletePending
                    | NotificationStatus::AckDelete
            )
        {
            tracing::debug!(
                object = %object,
                peer = %peer,
                status = %record.status,
                "late or duplicate objectDeleted ignored"
            );
            return Ok(());
        }

        self.store.delete_notification_records(object, Some(peer))?;
        self.chunks.remove(&tether_core::model::TransferId {
            object: object.clone(),
            peer: peer.clone(),
        });
        self.comms.send_notification(
            NotificationKind::AckDeleted,
            &peer.peer_type,
            &peer.peer_id,
            instance_id,
            None,
        )?;
        Ok(())
    }

    /// The peer acknowledged our `Deleted` report; the object can finally
    /// be dropped here too.
    pub fn handle_ack_object_deleted(
        &self,
        object: &ObjectKey,
        instance_id: i64,
        peer: &Peer,
    ) -> Result<(), SyncError> {
        let Some(record) = self.store.retrieve_notification_record(object, peer)? else {
            return Err(SyncError::MissingRecord(format!(
                "ackObjectDeleted for {object}"
            )));
        };
        if record.instance_id != instance_id
            || !matches!(
                record.status,
                NotificationStatus::Deleted | NotificationStatus::DeletedPending
            )
        {
            tracing::debug!(
                object = %object,
                peer = %peer,
                status = %record.status,
                "late or duplicate ackObjectDeleted ignored"
            );
            return Ok(());
        }

        self.store.delete_notification_records(object, Some(peer))?;
        self.store.delete_stored_object(object)?;
        Ok(())
    }
}
