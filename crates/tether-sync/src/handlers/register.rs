//! Destination registration and bulk notification replay.

use tether_core::model::{Destination, NodeRole, Notification, NotificationStatus};

use crate::comms::NotificationKind;
use crate::engine::Engine;
use crate::error::SyncError;

impl Engine {
    /// Register a destination. Hub-side only.
    ///
    /// A brand-new destination gets an `Update` for every object routed to
    /// it. A reconnecting destination only gets the notifications that were
    /// never acknowledged — unless this node runs without persistent
    /// storage, in which case the records may not have survived and the
    /// whole object set is replayed (receivers dedup by instance id).
    pub fn handle_registration(&self, dest: &Destination) -> Result<(), SyncError> {
        if self.role == NodeRole::Ess {
            return Err(SyncError::WrongRole {
                event: "registration",
                role: self.role,
            });
        }

        let existed =
            self.store
                .destination_exists(&dest.org_id, &dest.dest_type, &dest.dest_id)?;
        self.store.store_destination(dest)?;
        self.comms.register_ack(dest)?;
        tracing::info!(
            org = %dest.org_id,
            dest = %dest.peer(),
            reconnect = existed,
            "destination registered"
        );

        if existed && self.persistent_storage {
            self.resend_unacknowledged(dest)
        } else {
            self.announce_all_objects(dest)
        }
    }

    /// A peer asked for a full replay. Ack first, then replay — the peer
    /// must tolerate updates that overlap with the ack.
    pub fn handle_resend_request(&self, dest: &Destination) -> Result<(), SyncError> {
        self.comms.send_ack_resend(dest)?;
        tracing::info!(dest = %dest.peer(), "resend requested, replaying updates");
        self.announce_all_objects(dest)
    }

    /// Send an `Update` for every object routed to the destination.
    fn announce_all_objects(&self, dest: &Destination) -> Result<(), SyncError> {
        let peer = dest.peer();
        for meta in self
            .store
            .retrieve_objects(&dest.org_id, &dest.dest_type, &dest.dest_id)?
        {
            self.store.update_notification_record(&Notification::new(
                &meta.object_key(),
                &peer,
                NotificationStatus::Update,
                meta.instance_id,
            ))?;
            self.comms.send_notification(
                NotificationKind::Update,
                &peer.peer_type,
                &peer.peer_id,
                meta.instance_id,
                Some(&meta),
            )?;
        }
        Ok(())
    }

    /// Re-send `Update` only for objects whose notification never reached a
    /// settled state. Objects with no record are fully acknowledged and
    /// stay quiet.
    fn resend_unacknowledged(&self, dest: &Destination) -> Result<(), SyncError> {
        let peer = dest.peer();
        for meta in self
            .store
            .retrieve_objects(&dest.org_id, &dest.dest_type, &dest.dest_id)?
        {
            let object = meta.object_key();
            let Some(record) = self.store.retrieve_notification_record(&object, &peer)? else {
                continue;
            };
            if !matches!(
                record.status,
                NotificationStatus::Update
                    | NotificationStatus::UpdatePending
                    | NotificationStatus::Updated
                    | NotificationStatus::Data
            ) {
                continue;
            }
            self.comms.send_notification(
                NotificationKind::Update,
                &peer.peer_type,
                &peer.peer_id,
                meta.instance_id,
                Some(&meta),
            )?;
            tracing::debug!(object = %object, status = %record.status, "unacknowledged update resent");
        }
        Ok(())
    }
}
