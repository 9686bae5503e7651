//! Error types produced by the notification engine.

use tether_core::model::NodeRole;
use tether_core::wire::WireError;

use crate::comms::CommsError;
use crate::hooks::DataUriError;
use crate::store::StoreError;

/// Unrecoverable failures surfaced by the event handlers.
///
/// Late or duplicate events are not errors: the instance-id and status
/// filters drop them with a log line and the handler returns Ok. The one
/// exception is `StaleEvent` out of the data handler, which tells the
/// transport the chunk was not consumed.
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    /// Malformed or unrecognized data message.
    #[error(transparent)]
    Wire(#[from] WireError),

    /// Instance id or status mismatch on an event that required one.
    #[error("stale event: {0}")]
    StaleEvent(String),

    /// An ack arrived for a notification record that does not exist.
    #[error("no notification record: {0}")]
    MissingRecord(String),

    /// The store has no object under the referenced key.
    #[error("unknown object {0}")]
    MissingObject(String),

    #[error(transparent)]
    Storage(#[from] StoreError),

    /// A CSS node that is not the elected leader received a mid-stream
    /// chunk. Single-chunk transfers are exempt.
    #[error("only the elected leader may accept mid-stream chunks")]
    NotLeader,

    #[error(transparent)]
    Transport(#[from] CommsError),

    #[error(transparent)]
    DataUri(#[from] DataUriError),

    /// The event is not valid for this node's role.
    #[error("{event} is not handled by an {role} node")]
    WrongRole {
        event: &'static str,
        role: NodeRole,
    },
}
