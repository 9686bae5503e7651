//! In-memory store — DashMap-backed implementation of the `Store` trait.
//!
//! Backs edge nodes running without persistent storage, the daemon's
//! default wiring, and every test. Payloads live in plain byte buffers;
//! appends patch at the given offset and grow the buffer as needed.

use bytes::Bytes;
use dashmap::DashMap;
use std::collections::HashMap;

use tether_core::model::{
    DeliveryStatus, Destination, MetaData, Notification, NotificationStatus, ObjectKey,
    ObjectStatus, Peer, TransferId, TransportProtocol,
};

use crate::store::{Store, StoreError};

#[derive(Debug, Clone)]
struct StoredObject {
    meta: MetaData,
    status: ObjectStatus,
    data: Option<Vec<u8>>,
    deliveries: HashMap<Peer, DeliveryStatus>,
    remaining_consumers: u32,
}

/// Process-local store. Cheap to clone-by-Arc in the daemon; tests build
/// one per scenario.
#[derive(Default)]
pub struct MemoryStore {
    objects: DashMap<ObjectKey, StoredObject>,
    notifications: DashMap<TransferId, Notification>,
    destinations: DashMap<(String, String, String), Destination>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Test/inspection helper: stored payload bytes, if any.
    pub fn object_data(&self, object: &ObjectKey) -> Option<Vec<u8>> {
        self.objects.get(object).and_then(|o| o.data.clone())
    }

    /// Test/inspection helper: stored object status.
    pub fn object_status(&self, object: &ObjectKey) -> Option<ObjectStatus> {
        self.objects.get(object).map(|o| o.status)
    }

    /// Test/inspection helper: delivery mark recorded for a peer.
    pub fn delivery_status(&self, object: &ObjectKey, peer: &Peer) -> Option<DeliveryStatus> {
        self.objects
            .get(object)
            .and_then(|o| o.deliveries.get(peer).copied())
    }
}

impl Store for MemoryStore {
    fn destination_exists(
        &self,
        org_id: &str,
        dest_type: &str,
        dest_id: &str,
    ) -> Result<bool, StoreError> {
        Ok(self.destinations.contains_key(&(
            org_id.to_string(),
            dest_type.to_string(),
            dest_id.to_string(),
        )))
    }

    fn store_destination(&self, dest: &Destination) -> Result<(), StoreError> {
        self.destinations.insert(
            (
                dest.org_id.clone(),
                dest.dest_type.clone(),
                dest.dest_id.clone(),
            ),
            dest.clone(),
        );
        Ok(())
    }

    fn retrieve_destination_protocol(
        &self,
        org_id: &str,
        peer: &Peer,
    ) -> Result<TransportProtocol, StoreError> {
        self.destinations
            .get(&(
                org_id.to_string(),
                peer.peer_type.clone(),
                peer.peer_id.clone(),
            ))
            .map(|d| d.protocol)
            .ok_or(StoreError::NotFound)
    }

    fn retrieve_objects(
        &self,
        org_id: &str,
        dest_type: &str,
        dest_id: &str,
    ) -> Result<Vec<MetaData>, StoreError> {
        Ok(self
            .objects
            .iter()
            .filter(|entry| {
                let meta = &entry.value().meta;
                !meta.deleted
                    && meta.org_id == org_id
                    && meta.dest_type == dest_type
                    && meta.dest_id == dest_id
            })
            .map(|entry| entry.value().meta.clone())
            .collect())
    }

    fn retrieve_object(&self, object: &ObjectKey) -> Result<Option<MetaData>, StoreError> {
        Ok(self.objects.get(object).map(|o| o.meta.clone()))
    }

    fn store_object(
        &self,
        meta: &MetaData,
        data: Option<&[u8]>,
        status: ObjectStatus,
    ) -> Result<(), StoreError> {
        self.objects.insert(
            meta.object_key(),
            StoredObject {
                meta: meta.clone(),
                status,
                data: data.map(|d| d.to_vec()),
                deliveries: HashMap::new(),
                remaining_consumers: 1,
            },
        );
        Ok(())
    }

    fn update_object_status(
        &self,
        object: &ObjectKey,
        status: ObjectStatus,
    ) -> Result<(), StoreError> {
        let mut stored = self.objects.get_mut(object).ok_or(StoreError::NotFound)?;
        stored.status = status;
        Ok(())
    }

    fn update_object_delivery_status(
        &self,
        status: DeliveryStatus,
        object: &ObjectKey,
        peer: &Peer,
    ) -> Result<(), StoreError> {
        let mut stored = self.objects.get_mut(object).ok_or(StoreError::NotFound)?;
        stored.deliveries.insert(peer.clone(), status);
        Ok(())
    }

    fn mark_object_deleted(&self, object: &ObjectKey) -> Result<(), StoreError> {
        let mut stored = self.objects.get_mut(object).ok_or(StoreError::NotFound)?;
        stored.meta.deleted = true;
        stored.status = ObjectStatus::ObjDeleted;
        Ok(())
    }

    fn delete_stored_object(&self, object: &ObjectKey) -> Result<(), StoreError> {
        self.objects.remove(object);
        Ok(())
    }

    fn delete_stored_data(&self, object: &ObjectKey) -> Result<(), StoreError> {
        let mut stored = self.objects.get_mut(object).ok_or(StoreError::NotFound)?;
        stored.data = None;
        Ok(())
    }

    fn reset_object_remaining_consumers(&self, object: &ObjectKey) -> Result<(), StoreError> {
        let mut stored = self.objects.get_mut(object).ok_or(StoreError::NotFound)?;
        stored.remaining_consumers = 1;
        Ok(())
    }

    fn append_object_data(
        &self,
        object: &ObjectKey,
        data: &[u8],
        offset: i64,
        _total_size: i64,
        _is_first: bool,
        _is_last: bool,
    ) -> Result<(), StoreError> {
        let mut stored = self.objects.get_mut(object).ok_or(StoreError::NotFound)?;
        if stored.meta.deleted {
            return Err(StoreError::Discarded);
        }

        let offset = usize::try_from(offset)
            .map_err(|_| StoreError::Backend(format!("negative offset {offset}")))?;
        let buf = stored.data.get_or_insert_with(Vec::new);
        let end = offset + data.len();
        if buf.len() < end {
            buf.resize(end, 0);
        }
        buf[offset..end].copy_from_slice(data);
        Ok(())
    }

    fn read_object_data(
        &self,
        object: &ObjectKey,
        max_len: usize,
        offset: i64,
    ) -> Result<(Bytes, bool), StoreError> {
        let stored = self.objects.get(object).ok_or(StoreError::NotFound)?;
        let buf = stored.data.as_deref().unwrap_or(&[]);

        let offset = usize::try_from(offset)
            .map_err(|_| StoreError::Backend(format!("negative offset {offset}")))?;
        if offset >= buf.len() {
            return Ok((Bytes::new(), true));
        }
        let end = (offset + max_len).min(buf.len());
        let chunk = Bytes::copy_from_slice(&buf[offset..end]);
        Ok((chunk, end == buf.len()))
    }

    fn retrieve_notification_record(
        &self,
        object: &ObjectKey,
        peer: &Peer,
    ) -> Result<Option<Notification>, StoreError> {
        let id = TransferId {
            object: object.clone(),
            peer: peer.clone(),
        };
        Ok(self.notifications.get(&id).map(|n| n.clone()))
    }

    fn update_notification_record(&self, record: &Notification) -> Result<(), StoreError> {
        self.notifications
            .insert(record.transfer_id(), record.clone());
        Ok(())
    }

    fn delete_notification_records(
        &self,
        object: &ObjectKey,
        peer: Option<&Peer>,
    ) -> Result<(), StoreError> {
        match peer {
            Some(peer) => {
                let id = TransferId {
                    object: object.clone(),
                    peer: peer.clone(),
                };
                self.notifications.remove(&id);
            }
            None => {
                self.notifications.retain(|id, _| id.object != *object);
            }
        }
        Ok(())
    }

    fn retrieve_pending_notifications(&self) -> Result<Vec<Notification>, StoreError> {
        Ok(self
            .notifications
            .iter()
            .filter(|entry| entry.value().status == NotificationStatus::Getdata)
            .map(|entry| entry.value().clone())
            .collect())
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
