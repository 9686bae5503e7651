//! Store interface — the durable object/notification store the engine
//! drives. Backends are external; the engine only sees this trait.
//!
//! Keys everywhere are (org, object type, object id) with an optional peer.
//! Two sentinel error variants are part of the contract: `NotFound` and
//! `Discarded`. Callers match on them structurally, never on messages.

use bytes::Bytes;

use tether_core::model::{
    DeliveryStatus, Destination, MetaData, Notification, ObjectKey, ObjectStatus, Peer,
    TransportProtocol,
};

/// Errors a store backend can return.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StoreError {
    /// The referenced object, record, or destination does not exist.
    #[error("not found")]
    NotFound,

    /// The append was rejected because the stored state is newer than the
    /// incoming data. Treated as success-no-op by the data handler.
    #[error("append discarded by store")]
    Discarded,

    /// Any other backend failure.
    #[error("storage backend: {0}")]
    Backend(String),
}

/// The narrow store surface the notification engine consumes.
pub trait Store: Send + Sync {
    // ── Destinations ──────────────────────────────────────────────────────

    fn destination_exists(
        &self,
        org_id: &str,
        dest_type: &str,
        dest_id: &str,
    ) -> Result<bool, StoreError>;

    fn store_destination(&self, dest: &Destination) -> Result<(), StoreError>;

    fn retrieve_destination_protocol(
        &self,
        org_id: &str,
        peer: &Peer,
    ) -> Result<TransportProtocol, StoreError>;

    // ── Objects ───────────────────────────────────────────────────────────

    /// All non-deleted objects routed to the given destination.
    fn retrieve_objects(
        &self,
        org_id: &str,
        dest_type: &str,
        dest_id: &str,
    ) -> Result<Vec<MetaData>, StoreError>;

    fn retrieve_object(&self, object: &ObjectKey) -> Result<Option<MetaData>, StoreError>;

    /// Create or overwrite an object, optionally with payload bytes.
    fn store_object(
        &self,
        meta: &MetaData,
        data: Option<&[u8]>,
        status: ObjectStatus,
    ) -> Result<(), StoreError>;

    fn update_object_status(
        &self,
        object: &ObjectKey,
        status: ObjectStatus,
    ) -> Result<(), StoreError>;

    fn update_object_delivery_status(
        &self,
        status: DeliveryStatus,
        object: &ObjectKey,
        peer: &Peer,
    ) -> Result<(), StoreError>;

    fn mark_object_deleted(&self, object: &ObjectKey) -> Result<(), StoreError>;

    fn delete_stored_object(&self, object: &ObjectKey) -> Result<(), StoreError>;

    /// Drop payload bytes but keep the object record.
    fn delete_stored_data(&self, object: &ObjectKey) -> Result<(), StoreError>;

    fn reset_object_remaining_consumers(&self, object: &ObjectKey) -> Result<(), StoreError>;

    // ── Payload I/O ───────────────────────────────────────────────────────

    /// Write `data` at `offset` of the object's payload. May signal
    /// `Discarded` or `NotFound`.
    fn append_object_data(
        &self,
        object: &ObjectKey,
        data: &[u8],
        offset: i64,
        total_size: i64,
        is_first: bool,
        is_last: bool,
    ) -> Result<(), StoreError>;

    /// Read up to `max_len` payload bytes at `offset`. The flag reports
    /// whether the read reached end of data.
    fn read_object_data(
        &self,
        object: &ObjectKey,
        max_len: usize,
        offset: i64,
    ) -> Result<(Bytes, bool), StoreError>;

    // ── Notification records ──────────────────────────────────────────────

    fn retrieve_notification_record(
        &self,
        object: &ObjectKey,
        peer: &Peer,
    ) -> Result<Option<Notification>, StoreError>;

    fn update_notification_record(&self, record: &Notification) -> Result<(), StoreError>;

    /// Delete notification records for the object. `None` deletes the
    /// records of every peer.
    fn delete_notification_records(
        &self,
        object: &ObjectKey,
        peer: Option<&Peer>,
    ) -> Result<(), StoreError>;

    /// All records still waiting on chunk data (status `Getdata`).
    /// Consumed by the periodic resend driver.
    fn retrieve_pending_notifications(&self) -> Result<Vec<Notification>, StoreError>;
}
