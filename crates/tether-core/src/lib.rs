//! tether-core — shared data model, wire format, and configuration.
//! All other tether crates depend on this one.

pub mod config;
pub mod model;
pub mod wire;

pub use config::TetherConfig;
pub use model::{
    DeliveryStatus, Destination, MetaData, NodeRole, Notification, NotificationStatus, ObjectKey,
    ObjectStatus, Peer, TransferId, TransportProtocol,
};
