//! Transport interface — outbound messages the engine emits.
//!
//! The transports themselves (MQTT, HTTP) live outside the engine; they
//! dispatch inbound events into the handlers and implement this trait for
//! the outbound direction.

use bytes::Bytes;
use std::fmt;

use tether_core::model::{Destination, MetaData};

/// Kinds of notification messages visible at the transport boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationKind {
    Update,
    Updated,
    Received,
    AckReceived,
    Consumed,
    AckConsumed,
    Getdata,
    Data,
    Delete,
    AckDelete,
    Deleted,
    AckDeleted,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::Update => "update",
            NotificationKind::Updated => "updated",
            NotificationKind::Received => "received",
            NotificationKind::AckReceived => "ackReceived",
            NotificationKind::Consumed => "consumed",
            NotificationKind::AckConsumed => "ackConsumed",
            NotificationKind::Getdata => "getdata",
            NotificationKind::Data => "data",
            NotificationKind::Delete => "delete",
            NotificationKind::AckDelete => "ackDelete",
            NotificationKind::Deleted => "deleted",
            NotificationKind::AckDeleted => "ackDeleted",
        }
    }
}

impl fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed outbound send, as reported by the transport.
#[derive(Debug, Clone, thiserror::Error)]
#[error("transport send failed: {0}")]
pub struct CommsError(pub String);

/// Outbound message surface the engine drives.
pub trait Communicator: Send + Sync {
    /// Acknowledge a destination registration.
    fn register_ack(&self, dest: &Destination) -> Result<(), CommsError>;

    /// Send a notification message of the given kind to a peer. `meta` is
    /// attached when the kind carries object metadata (updates and most
    /// acks); pure acks may omit it.
    fn send_notification(
        &self,
        kind: NotificationKind,
        peer_type: &str,
        peer_id: &str,
        instance_id: i64,
        meta: Option<&MetaData>,
    ) -> Result<(), CommsError>;

    /// Send an encoded data message. `chunked` is set whenever the message
    /// is not a complete object in one piece.
    fn send_data(
        &self,
        org_id: &str,
        peer_type: &str,
        peer_id: &str,
        message: Bytes,
        chunked: bool,
    ) -> Result<(), CommsError>;

    /// Request the chunk at `offset` of the object from its origin.
    fn get_data(&self, meta: &MetaData, offset: i64) -> Result<(), CommsError>;

    /// Acknowledge a resend-objects request.
    fn send_ack_resend(&self, dest: &Destination) -> Result<(), CommsError>;
}
