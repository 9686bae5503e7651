//! The notification engine — one value threading all shared state through
//! the event handlers.
//!
//! The transport layer dispatches each inbound event into a handler on a
//! worker thread and drives the event to completion; handlers block on
//! store and transport I/O. All state mutation for a given object happens
//! under that object's lock slot.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tether_core::config::TetherConfig;
use tether_core::model::{
    MetaData, NodeRole, Notification, NotificationStatus, ObjectKey, Peer, TransferId,
};

use crate::chunks::ChunkTracker;
use crate::comms::Communicator;
use crate::error::SyncError;
use crate::hooks::{AlwaysLeader, DataUriSink, Leader, NoDataUri, NoopWebhooks, Webhooks};
use crate::locks::ObjectLocks;
use crate::store::Store;

pub struct Engine {
    pub(crate) role: NodeRole,
    pub(crate) persistent_storage: bool,
    pub(crate) max_inflight_chunks: usize,
    pub(crate) max_data_chunk_size: usize,

    pub(crate) store: Arc<dyn Store>,
    pub(crate) comms: Arc<dyn Communicator>,
    pub(crate) data_uri: Arc<dyn DataUriSink>,
    pub(crate) leader: Arc<dyn Leader>,
    pub(crate) webhooks: Arc<dyn Webhooks>,

    pub(crate) chunks: ChunkTracker,
    pub(crate) locks: ObjectLocks,

    // One-shot process flags set by ack handlers, read by higher layers.
    // Writes race benignly; Relaxed is enough.
    registered: AtomicBool,
    resend_acked: AtomicBool,
}

impl Engine {
    pub fn new(
        config: &TetherConfig,
        store: Arc<dyn Store>,
        comms: Arc<dyn Communicator>,
    ) -> Self {
        Self {
            role: config.node.role,
            persistent_storage: config.node.persistent_storage,
            max_inflight_chunks: config.sync.max_inflight_chunks.max(1),
            max_data_chunk_size: config.sync.max_data_chunk_size.max(1),
            store,
            comms,
            data_uri: Arc::new(NoDataUri),
            leader: Arc::new(AlwaysLeader),
            webhooks: Arc::new(NoopWebhooks),
            chunks: ChunkTracker::new(config.sync.resend_interval_secs),
            locks: ObjectLocks::new(),
            registered: AtomicBool::new(false),
            resend_acked: AtomicBool::new(false),
        }
    }

    pub fn with_data_uri(mut self, data_uri: Arc<dyn DataUriSink>) -> Self {
        self.data_uri = data_uri;
        self
    }

    pub fn with_leader(mut self, leader: Arc<dyn Leader>) -> Self {
        self.leader = leader;
        self
    }

    pub fn with_webhooks(mut self, webhooks: Arc<dyn Webhooks>) -> Self {
        self.webhooks = webhooks;
        self
    }

    pub fn role(&self) -> NodeRole {
        self.role
    }

    /// Whether a `RegisterAck` has been observed.
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Relaxed)
    }

    /// Whether an `AckResend` has been observed.
    pub fn is_resend_acked(&self) -> bool {
        self.resend_acked.load(Ordering::Relaxed)
    }

    pub(crate) fn set_registered(&self) {
        self.registered.store(true, Ordering::Relaxed);
    }

    pub(crate) fn set_resend_acked(&self) {
        self.resend_acked.store(true, Ordering::Relaxed);
    }

    /// Whether a chunked transfer is currently in flight for (object, peer).
    pub fn has_active_transfer(&self, object: &ObjectKey, peer: &Peer) -> bool {
        self.chunks.contains(&TransferId {
            object: object.clone(),
            peer: peer.clone(),
        })
    }

    /// Arm the in-flight index for a chunk request and upsert the `Getdata`
    /// notification record that marks the transfer as pending in the store.
    pub fn update_get_data_notification(
        &self,
        meta: &MetaData,
        peer: &Peer,
        offset: i64,
    ) -> Result<(), SyncError> {
        let id = TransferId {
            object: meta.object_key(),
            peer: peer.clone(),
        };
        self.chunks.track_request(&id, meta, offset);
        self.store.update_notification_record(&Notification::new(
            &id.object,
            peer,
            NotificationStatus::Getdata,
            meta.instance_id,
        ))?;
        Ok(())
    }

    /// Request one chunk: arm the index, record `Getdata`, and emit the
    /// request to the object's origin.
    pub(crate) fn request_chunk(
        &self,
        meta: &MetaData,
        peer: &Peer,
        offset: i64,
    ) -> Result<(), SyncError> {
        self.update_get_data_notification(meta, peer, offset)?;
        self.comms.get_data(meta, offset)?;
        tracing::trace!(object = %meta.object_key(), offset, "chunk requested");
        Ok(())
    }
}
