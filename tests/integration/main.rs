//! tether integration test harness.
//!
//! Scenario tests drive the notification engine end-to-end over the
//! in-memory store and a recording mock communicator — no transports, no
//! daemons. Each test builds its own node(s), so everything runs in
//! parallel.

mod lifecycle;
mod resend;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use bytes::Bytes;

use tether_core::config::TetherConfig;
use tether_core::model::{Destination, MetaData, NodeRole, Peer, TransportProtocol};
use tether_core::wire;
use tether_sync::hooks::{Leader, Webhooks};
use tether_sync::{Communicator, CommsError, Engine, MemoryStore, NotificationKind};

// ── Recording communicator ────────────────────────────────────────────────────

/// One outbound message, as the engine emitted it.
#[derive(Debug, Clone, PartialEq)]
pub enum Sent {
    RegisterAck {
        dest: String,
    },
    Notification {
        kind: NotificationKind,
        peer: String,
        instance_id: i64,
    },
    Data {
        peer: String,
        message: Bytes,
        chunked: bool,
    },
    GetData {
        object: String,
        offset: i64,
    },
    AckResend {
        dest: String,
    },
}

/// Records every outbound message for assertions.
#[derive(Default)]
pub struct RecordingComms {
    sent: Mutex<Vec<Sent>>,
}

impl RecordingComms {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything sent so far, preserving order.
    pub fn sent(&self) -> Vec<Sent> {
        self.sent.lock().unwrap().clone()
    }

    /// Drain the log; handy for clearing setup noise between phases.
    pub fn take(&self) -> Vec<Sent> {
        std::mem::take(&mut *self.sent.lock().unwrap())
    }

    pub fn get_data_offsets(&self) -> Vec<i64> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::GetData { offset, .. } => Some(offset),
                _ => None,
            })
            .collect()
    }

    pub fn notification_kinds(&self) -> Vec<NotificationKind> {
        self.sent()
            .into_iter()
            .filter_map(|s| match s {
                Sent::Notification { kind, .. } => Some(kind),
                _ => None,
            })
            .collect()
    }
}

impl Communicator for RecordingComms {
    fn register_ack(&self, dest: &Destination) -> Result<(), CommsError> {
        self.sent.lock().unwrap().push(Sent::RegisterAck {
            dest: dest.peer().to_string(),
        });
        Ok(())
    }

    fn send_notification(
        &self,
        kind: NotificationKind,
        peer_type: &str,
        peer_id: &str,
        instance_id: i64,
        _meta: Option<&MetaData>,
    ) -> Result<(), CommsError> {
        self.sent.lock().unwrap().push(Sent::Notification {
            kind,
            peer: format!("{peer_type}/{peer_id}"),
            instance_id,
        });
        Ok(())
    }

    fn send_data(
        &self,
        _org_id: &str,
        peer_type: &str,
        peer_id: &str,
        message: Bytes,
        chunked: bool,
    ) -> Result<(), CommsError> {
        self.sent.lock().unwrap().push(Sent::Data {
            peer: format!("{peer_type}/{peer_id}"),
            message,
            chunked,
        });
        Ok(())
    }

    fn get_data(&self, meta: &MetaData, offset: i64) -> Result<(), CommsError> {
        self.sent.lock().unwrap().push(Sent::GetData {
            object: meta.object_key().to_string(),
            offset,
        });
        Ok(())
    }

    fn send_ack_resend(&self, dest: &Destination) -> Result<(), CommsError> {
        self.sent.lock().unwrap().push(Sent::AckResend {
            dest: dest.peer().to_string(),
        });
        Ok(())
    }
}

// ── Other mock collaborators ──────────────────────────────────────────────────

/// Leader answer pinned to a constant.
pub struct FixedLeader(pub bool);

impl Leader for FixedLeader {
    fn is_leader(&self) -> bool {
        self.0
    }
}

/// Counts completed-object webhook invocations.
#[derive(Default)]
pub struct CountingWebhooks {
    calls: AtomicUsize,
}

impl CountingWebhooks {
    pub fn count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl Webhooks for CountingWebhooks {
    fn object_received(&self, _meta: &MetaData) {
        self.calls.fetch_add(1, Ordering::Relaxed);
    }
}

// ── Node fixture ──────────────────────────────────────────────────────────────

/// One engine with its own store, comms log, and webhook counter.
pub struct Node {
    pub store: Arc<MemoryStore>,
    pub comms: Arc<RecordingComms>,
    pub webhooks: Arc<CountingWebhooks>,
    pub engine: Engine,
}

pub fn node(role: NodeRole, max_inflight: usize) -> Node {
    node_with_leader(role, max_inflight, true)
}

pub fn node_with_leader(role: NodeRole, max_inflight: usize, leader: bool) -> Node {
    let mut config = TetherConfig::default();
    config.node.role = role;
    config.sync.max_inflight_chunks = max_inflight;

    let store = Arc::new(MemoryStore::new());
    let comms = Arc::new(RecordingComms::new());
    let webhooks = Arc::new(CountingWebhooks::default());
    let engine = Engine::new(&config, store.clone(), comms.clone())
        .with_leader(Arc::new(FixedLeader(leader)))
        .with_webhooks(webhooks.clone());

    Node {
        store,
        comms,
        webhooks,
        engine,
    }
}

// ── Fixtures ──────────────────────────────────────────────────────────────────

/// Object originating at hub/hub-1, routed to edge/edge-1, instance 7.
pub fn sample_meta(object_size: i64, chunk_size: i64) -> MetaData {
    MetaData {
        org_id: "acme".into(),
        object_type: "model".into(),
        object_id: "m-1".into(),
        origin_type: "hub".into(),
        origin_id: "hub-1".into(),
        dest_type: "edge".into(),
        dest_id: "edge-1".into(),
        instance_id: 7,
        object_size,
        chunk_size,
        ..Default::default()
    }
}

pub fn origin(meta: &MetaData) -> Peer {
    meta.origin_peer()
}

pub fn edge_destination(protocol: TransportProtocol) -> Destination {
    Destination {
        org_id: "acme".into(),
        dest_type: "edge".into(),
        dest_id: "edge-1".into(),
        protocol,
    }
}

/// Encode a data message for the object as its origin would.
pub fn data_message(meta: &MetaData, offset: i64, data: &[u8]) -> Bytes {
    wire::encode_data_message(
        &meta.org_id,
        &meta.object_type,
        &meta.object_id,
        offset,
        meta.instance_id,
        data,
    )
}
