//! Tracing-only communicator — logs outbound messages instead of sending.
//!
//! Real transports (MQTT, HTTP) implement `Communicator` and replace this
//! at the wiring seam in main.rs. Running with this stub still exercises
//! the whole engine, which is useful on a bench.

use bytes::Bytes;

use tether_core::model::{Destination, MetaData};
use tether_sync::{Communicator, CommsError, NotificationKind};

pub struct LogCommunicator;

impl Communicator for LogCommunicator {
    fn register_ack(&self, dest: &Destination) -> Result<(), CommsError> {
        tracing::info!(org = %dest.org_id, dest = %dest.peer(), "outbound registerAck");
        Ok(())
    }

    fn send_notification(
        &self,
        kind: NotificationKind,
        peer_type: &str,
        peer_id: &str,
        instance_id: i64,
        meta: Option<&MetaData>,
    ) -> Result<(), CommsError> {
        match meta {
            Some(meta) => tracing::info!(
                kind = %kind,
                peer_type,
                peer_id,
                instance = instance_id,
                object = %meta.object_key(),
                "outbound notification"
            ),
            None => tracing::info!(
                kind = %kind,
                peer_type,
                peer_id,
                instance = instance_id,
                "outbound notification"
            ),
        }
        Ok(())
    }

    fn send_data(
        &self,
        org_id: &str,
        peer_type: &str,
        peer_id: &str,
        message: Bytes,
        chunked: bool,
    ) -> Result<(), CommsError> {
        tracing::info!(
            org = org_id,
            peer_type,
            peer_id,
            bytes = message.len(),
            chunked,
            "outbound data message"
        );
        Ok(())
    }

    fn get_data(&self, meta: &MetaData, offset: i64) -> Result<(), CommsError> {
        tracing::info!(object = %meta.object_key(), offset, "outbound chunk request");
        Ok(())
    }

    fn send_ack_resend(&self, dest: &Destination) -> Result<(), CommsError> {
        tracing::info!(dest = %dest.peer(), "outbound ackResendObjects");
        Ok(())
    }
}
