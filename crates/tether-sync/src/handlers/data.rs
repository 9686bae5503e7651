//! Data plane — receiving chunks and serving chunk requests.

use bytes::Bytes;

use tether_core::model::{
    MetaData, NodeRole, NotificationStatus, ObjectKey, ObjectStatus, Peer, TransferId,
};
use tether_core::wire;

use crate::comms::NotificationKind;
use crate::engine::Engine;
use crate::error::SyncError;
use crate::store::StoreError;

impl Engine {
    /// Handle an inbound data message carrying one chunk.
    ///
    /// Unlike the ack handlers, a mismatch here is returned as an error so
    /// the transport knows the chunk was not consumed; it remains free to
    /// drop it.
    pub fn handle_data(&self, raw: Bytes) -> Result<(), SyncError> {
        let msg = wire::decode_data_message(raw)?;
        let object = ObjectKey::new(
            msg.org_id.clone(),
            msg.object_type.clone(),
            msg.object_id.clone(),
        );

        let meta = self
            .store
            .retrieve_object(&object)?
            .ok_or_else(|| SyncError::MissingObject(object.to_string()))?;
        let peer = meta.origin_peer();
        let id = TransferId {
            object: object.clone(),
            peer: peer.clone(),
        };

        let _guard = self.locks.lock(&object);

        self.check_notification_record(&id, msg.instance_id, msg.offset)?;

        let info = self
            .chunks
            .snapshot(&id)
            .ok_or_else(|| SyncError::StaleEvent(format!("no transfer in flight for {id}")))?;
        let data_len = msg.data.len() as i64;
        let is_first = info.received_data_size == 0;
        let is_last = info.received_data_size + data_len >= meta.object_size;

        // Mid-stream chunks mutate shared transfer state that only the
        // elected leader holds authoritatively. A complete object in one
        // message is safe on any node.
        if self.role == NodeRole::Css && !(is_first && is_last) && !self.leader.is_leader() {
            return Err(SyncError::NotLeader);
        }

        if data_len > 0 {
            if let Some(uri) = &meta.destination_data_uri {
                self.data_uri.append_data(
                    uri,
                    &msg.data,
                    msg.offset,
                    meta.object_size,
                    is_first,
                    is_last,
                )?;
            } else {
                match self.store.append_object_data(
                    &object,
                    &msg.data,
                    msg.offset,
                    meta.object_size,
                    is_first,
                    is_last,
                ) {
                    Err(StoreError::Discarded) => {
                        tracing::debug!(object = %object, offset = msg.offset, "append discarded by store");
                    }
                    other => other?,
                }
            }
        }

        let max_requested = self
            .chunks
            .mark_received(&id, msg.offset, data_len)
            .map_err(|e| SyncError::StaleEvent(e.to_string()))?;

        if is_last {
            self.complete_transfer(&id, &meta, msg.instance_id)?;
        } else if meta.chunk_size > 0 {
            let next = max_requested + meta.chunk_size;
            if next < meta.object_size {
                self.request_chunk(&meta, &peer, next)?;
            }
        }
        Ok(())
    }

    /// The record must exist with the message's instance id, status
    /// `Getdata`, and an outstanding request for the offset.
    fn check_notification_record(
        &self,
        id: &TransferId,
        instance_id: i64,
        offset: i64,
    ) -> Result<(), SyncError> {
        let Some(record) = self
            .store
            .retrieve_notification_record(&id.object, &id.peer)?
        else {
            tracing::warn!(object = %id.object, "data chunk without a notification record");
            return Err(SyncError::StaleEvent(format!(
                "no notification record for {}",
                id.object
            )));
        };

        if record.instance_id != instance_id || record.status != NotificationStatus::Getdata {
            tracing::warn!(
                object = %id.object,
                status = %record.status,
                recorded_instance = record.instance_id,
                incoming_instance = instance_id,
                "data chunk does not match the pending transfer"
            );
            return Err(SyncError::StaleEvent(format!(
                "chunk for {} does not match the pending transfer",
                id.object
            )));
        }

        let outstanding = self
            .chunks
            .snapshot(id)
            .map(|info| info.chunk_resend_times.contains_key(&offset))
            .unwrap_or(false);
        if !outstanding {
            tracing::warn!(object = %id.object, offset, "chunk at offset was not requested");
            return Err(SyncError::StaleEvent(format!(
                "offset {offset} of {} was not requested",
                id.object
            )));
        }
        Ok(())
    }

    /// Last chunk landed: retire the transfer, mark the object complete,
    /// report `Received` to the origin, and fire webhooks.
    fn complete_transfer(
        &self,
        id: &TransferId,
        meta: &MetaData,
        instance_id: i64,
    ) -> Result<(), SyncError> {
        self.chunks.remove(id);
        self.store
            .update_object_status(&id.object, ObjectStatus::CompletelyReceived)?;

        self.store
            .update_notification_record(&tether_core::model::Notification::new(
                &id.object,
                &id.peer,
                NotificationStatus::Received,
                instance_id,
            ))?;

        self.comms.send_notification(
            NotificationKind::Received,
            &id.peer.peer_type,
            &id.peer.peer_id,
            instance_id,
            Some(meta),
        )?;
        self.webhooks.object_received(meta);
        tracing::info!(object = %id.object, bytes = meta.object_size, "object completely received");
        Ok(())
    }

    /// Serve a chunk request (sender side).
    ///
    /// Ignored unless a record exists for the requesting peer with the
    /// request's instance id and a status showing the update is still
    /// current (`Update`, `Updated`, or `Data`).
    pub fn handle_get_data(
        &self,
        object: &ObjectKey,
        instance_id: i64,
        offset: i64,
        peer: &Peer,
    ) -> Result<(), SyncError> {
        let Some(mut record) = self.store.retrieve_notification_record(object, peer)? else {
            tracing::debug!(object = %object, peer = %peer, "chunk request without a record ignored");
            return Ok(());
        };
        if record.instance_id != instance_id
            || !matches!(
                record.status,
                NotificationStatus::Update | NotificationStatus::Updated | NotificationStatus::Data
            )
        {
            tracing::debug!(
                object = %object,
                peer = %peer,
                status = %record.status,
                "chunk request for a superseded update ignored"
            );
            return Ok(());
        }

        let meta = self
            .store
            .retrieve_object(object)?
            .ok_or_else(|| SyncError::MissingObject(object.to_string()))?;

        let (data, eof) = if let Some(uri) = &meta.source_data_uri {
            self.data_uri
                .get_data_chunk(uri, self.max_data_chunk_size, offset)?
        } else {
            self.store
                .read_object_data(object, self.max_data_chunk_size, offset)?
        };

        let message = wire::encode_data_message(
            &object.org_id,
            &object.object_type,
            &object.object_id,
            offset,
            meta.instance_id,
            &data,
        );
        let chunked = offset != 0 || !eof;
        self.comms.send_data(
            &object.org_id,
            &peer.peer_type,
            &peer.peer_id,
            message,
            chunked,
        )?;

        record.status = NotificationStatus::Data;
        self.store.update_notification_record(&record)?;
        tracing::trace!(object = %object, offset, len = data.len(), chunked, "chunk served");
        Ok(())
    }
}
