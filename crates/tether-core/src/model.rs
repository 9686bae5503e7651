//! Protocol data model — object identities, metadata, and notification state.
//!
//! Objects are identified by (organization, type, id) plus a monotonically
//! increasing instance id. Each side of a sync relationship keeps one
//! notification record per (object, peer) pair and drives it through the
//! status machine until a terminal acknowledgement deletes it.

use serde::{Deserialize, Serialize};
use std::fmt;

// ── Node & transport ──────────────────────────────────────────────────────────

/// Which role this node plays in the sync topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeRole {
    /// Central sync service — holds authoritative copies, routes to
    /// destinations, and is subject to leader election for chunked data.
    Css,
    /// Edge sync service — local agent; deletes objects on consumption.
    Ess,
}

impl fmt::Display for NodeRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NodeRole::Css => write!(f, "css"),
            NodeRole::Ess => write!(f, "ess"),
        }
    }
}

/// Transport protocol a destination is reached over.
///
/// MQTT destinations tolerate a full in-flight window of chunk requests;
/// HTTP destinations are polled one request at a time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransportProtocol {
    Mqtt,
    Http,
}

// ── Identities ────────────────────────────────────────────────────────────────

/// Identity of an object: (organization, type, id).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ObjectKey {
    pub org_id: String,
    pub object_type: String,
    pub object_id: String,
}

impl ObjectKey {
    pub fn new(
        org_id: impl Into<String>,
        object_type: impl Into<String>,
        object_id: impl Into<String>,
    ) -> Self {
        Self {
            org_id: org_id.into(),
            object_type: object_type.into(),
            object_id: object_id.into(),
        }
    }
}

impl fmt::Display for ObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.org_id, self.object_type, self.object_id)
    }
}

/// Identity of a sync counterpart: (type, id).
///
/// Which side this names depends on the direction of the event — the origin
/// of an inbound update, or the destination of an outbound notification.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Peer {
    pub peer_type: String,
    pub peer_id: String,
}

impl Peer {
    pub fn new(peer_type: impl Into<String>, peer_id: impl Into<String>) -> Self {
        Self {
            peer_type: peer_type.into(),
            peer_id: peer_id.into(),
        }
    }
}

impl fmt::Display for Peer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.peer_type, self.peer_id)
    }
}

/// Composite notification id — keys the in-flight chunk index.
/// One active data transfer exists per (object, peer) pair at most.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TransferId {
    pub object: ObjectKey,
    pub peer: Peer,
}

impl fmt::Display for TransferId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.object, self.peer)
    }
}

/// A registered destination node and the transport it is reached over.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub org_id: String,
    pub dest_type: String,
    pub dest_id: String,
    pub protocol: TransportProtocol,
}

impl Destination {
    pub fn peer(&self) -> Peer {
        Peer::new(self.dest_type.clone(), self.dest_id.clone())
    }
}

// ── Object metadata ───────────────────────────────────────────────────────────

/// Object metadata as held by the store.
///
/// `instance_id` is monotonic per object and opaque; it is the duplicate
/// filter for the whole protocol. Sizes are signed to match the wire format;
/// a `chunk_size` or `object_size` of zero or below means the payload moves
/// as a single request at offset 0.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetaData {
    pub org_id: String,
    pub object_type: String,
    pub object_id: String,

    /// Node the object originates from.
    pub origin_type: String,
    pub origin_id: String,

    /// Node the object is routed to.
    pub dest_type: String,
    pub dest_id: String,

    pub instance_id: i64,
    pub object_size: i64,
    pub chunk_size: i64,

    /// Payload lives behind an external link; nothing to transfer.
    pub link: bool,
    /// Producer declared the object carries no data.
    pub no_data: bool,
    /// Only the metadata is synchronized.
    pub meta_only: bool,

    pub deleted: bool,

    /// Sender-side URI to stream payload from, when set.
    pub source_data_uri: Option<String>,
    /// Receiver-side URI to stream payload into, when set.
    pub destination_data_uri: Option<String>,
}

impl MetaData {
    pub fn object_key(&self) -> ObjectKey {
        ObjectKey::new(
            self.org_id.clone(),
            self.object_type.clone(),
            self.object_id.clone(),
        )
    }

    pub fn origin_peer(&self) -> Peer {
        Peer::new(self.origin_type.clone(), self.origin_id.clone())
    }

    pub fn dest_peer(&self) -> Peer {
        Peer::new(self.dest_type.clone(), self.dest_id.clone())
    }

    /// True when there is no payload to move: linked, declared no-data, or
    /// meta-only. Such objects skip chunked transfer entirely.
    pub fn has_no_payload(&self) -> bool {
        self.link || self.no_data || self.meta_only
    }
}

// ── Notification records ──────────────────────────────────────────────────────

/// Progress of one logical transfer, per (object, peer) pair.
///
/// Serialized names are the protocol-level status strings and must not
/// change; stores persist them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum NotificationStatus {
    Update,
    UpdatePending,
    Updated,
    Data,
    Getdata,
    Received,
    ReceivedPending,
    ReceivedByDestination,
    AckReceived,
    Consumed,
    ConsumedPending,
    AckConsumed,
    Delete,
    DeletePending,
    AckDelete,
    Deleted,
    DeletedPending,
    AckDeleted,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Update => "update",
            NotificationStatus::UpdatePending => "updatePending",
            NotificationStatus::Updated => "updated",
            NotificationStatus::Data => "data",
            NotificationStatus::Getdata => "getdata",
            NotificationStatus::Received => "received",
            NotificationStatus::ReceivedPending => "receivedPending",
            NotificationStatus::ReceivedByDestination => "receivedByDestination",
            NotificationStatus::AckReceived => "ackReceived",
            NotificationStatus::Consumed => "consumed",
            NotificationStatus::ConsumedPending => "consumedPending",
            NotificationStatus::AckConsumed => "ackConsumed",
            NotificationStatus::Delete => "delete",
            NotificationStatus::DeletePending => "deletePending",
            NotificationStatus::AckDelete => "ackDelete",
            NotificationStatus::Deleted => "deleted",
            NotificationStatus::DeletedPending => "deletedPending",
            NotificationStatus::AckDeleted => "ackDeleted",
        }
    }
}

impl fmt::Display for NotificationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One notification record, keyed by (object, peer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub org_id: String,
    pub object_type: String,
    pub object_id: String,
    pub peer_type: String,
    pub peer_id: String,
    pub status: NotificationStatus,
    pub instance_id: i64,
}

impl Notification {
    pub fn new(
        object: &ObjectKey,
        peer: &Peer,
        status: NotificationStatus,
        instance_id: i64,
    ) -> Self {
        Self {
            org_id: object.org_id.clone(),
            object_type: object.object_type.clone(),
            object_id: object.object_id.clone(),
            peer_type: peer.peer_type.clone(),
            peer_id: peer.peer_id.clone(),
            status,
            instance_id,
        }
    }

    pub fn object_key(&self) -> ObjectKey {
        ObjectKey::new(
            self.org_id.clone(),
            self.object_type.clone(),
            self.object_id.clone(),
        )
    }

    pub fn peer(&self) -> Peer {
        Peer::new(self.peer_type.clone(), self.peer_id.clone())
    }

    pub fn transfer_id(&self) -> TransferId {
        TransferId {
            object: self.object_key(),
            peer: self.peer(),
        }
    }
}

// ── Store-side object state ───────────────────────────────────────────────────

/// Stored object state on the receiving side.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ObjectStatus {
    /// Some chunks are still outstanding.
    PartiallyReceived,
    /// All payload bytes have arrived (or there were none to move).
    CompletelyReceived,
    /// A delete arrived for an object this node never stored.
    ObjDeleted,
}

impl fmt::Display for ObjectStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ObjectStatus::PartiallyReceived => write!(f, "partiallyReceived"),
            ObjectStatus::CompletelyReceived => write!(f, "completelyReceived"),
            ObjectStatus::ObjDeleted => write!(f, "objDeleted"),
        }
    }
}

/// Per-peer delivery marks recorded against a stored object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DeliveryStatus {
    Delivered,
    Consumed,
}

// ── Tests ─────────────────────────────────────────────────────────────────────
