//! Notification lifecycle scenarios: the sender-side ack chain,
//! consumption, deletion, and registration.

use crate::*;

use tether_core::model::{
    DeliveryStatus, NodeRole, Notification, NotificationStatus, ObjectStatus, TransportProtocol,
};
use tether_sync::{NotificationKind, Store, SyncError};

/// Seed a hub that already announced `meta` to its destination: object
/// stored with payload, record in the given status.
fn seeded_hub(meta: &tether_core::model::MetaData, status: NotificationStatus) -> Node {
    let n = node(NodeRole::Css, 2);
    n.store
        .store_object(meta, Some(b"0123456789"), ObjectStatus::CompletelyReceived)
        .unwrap();
    n.store
        .update_notification_record(&Notification::new(
            &meta.object_key(),
            &meta.dest_peer(),
            status,
            meta.instance_id,
        ))
        .unwrap();
    n
}

// ── Sender-side ack chain ─────────────────────────────────────────────────────

#[test]
fn object_updated_advances_the_record() {
    let meta = sample_meta(10, 4);
    let n = seeded_hub(&meta, NotificationStatus::Update);
    let key = meta.object_key();
    let dest = meta.dest_peer();

    n.engine.handle_object_updated(&key, 7, &dest).unwrap();
    assert_eq!(
        n.store
            .retrieve_notification_record(&key, &dest)
            .unwrap()
            .unwrap()
            .status,
        NotificationStatus::Updated
    );
}

#[test]
fn get_data_serves_a_chunk_and_moves_to_data() {
    let meta = sample_meta(10, 4);
    let n = seeded_hub(&meta, NotificationStatus::Updated);
    let key = meta.object_key();
    let dest = meta.dest_peer();

    n.engine.handle_get_data(&key, 7, 0, &dest).unwrap();

    let sent = n.comms.sent();
    let Some(Sent::Data {
        message, chunked, ..
    }) = sent.iter().find(|s| matches!(s, Sent::Data { .. }))
    else {
        panic!("no data message sent: {sent:?}");
    };
    // Whole object served from offset 0: not chunked.
    assert!(!*chunked);
    let decoded = tether_core::wire::decode_data_message(message.clone()).unwrap();
    assert_eq!(&decoded.data[..], b"0123456789");
    assert_eq!(decoded.instance_id, 7);

    assert_eq!(
        n.store
            .retrieve_notification_record(&key, &dest)
            .unwrap()
            .unwrap()
            .status,
        NotificationStatus::Data
    );
}

#[test]
fn get_data_mid_object_is_chunked() {
    let meta = sample_meta(10, 4);
    let n = seeded_hub(&meta, NotificationStatus::Data);
    n.engine
        .handle_get_data(&meta.object_key(), 7, 4, &meta.dest_peer())
        .unwrap();

    let sent = n.comms.sent();
    let Some(Sent::Data { chunked, .. }) = sent.iter().find(|s| matches!(s, Sent::Data { .. }))
    else {
        panic!("no data message sent");
    };
    assert!(*chunked);
}

#[test]
fn get_data_for_superseded_instance_is_ignored() {
    let meta = sample_meta(10, 4);
    let n = seeded_hub(&meta, NotificationStatus::Updated);

    n.engine
        .handle_get_data(&meta.object_key(), 3, 0, &meta.dest_peer())
        .unwrap();
    assert!(n.comms.sent().is_empty());
}

#[test]
fn object_received_marks_delivery_and_acks() {
    let meta = sample_meta(10, 4);
    let n = seeded_hub(&meta, NotificationStatus::Data);
    let key = meta.object_key();
    let dest = meta.dest_peer();

    n.engine.handle_object_received(&key, 7, &dest).unwrap();

    assert_eq!(
        n.store
            .retrieve_notification_record(&key, &dest)
            .unwrap()
            .unwrap()
            .status,
        NotificationStatus::ReceivedByDestination
    );
    assert_eq!(
        n.store.delivery_status(&key, &dest),
        Some(DeliveryStatus::Delivered)
    );
    assert_eq!(
        n.comms.notification_kinds(),
        vec![NotificationKind::AckReceived]
    );
}

#[test]
fn ack_object_received_settles_the_receiver() {
    let meta = sample_meta(10, 4);
    let n = node(NodeRole::Ess, 2);
    let key = meta.object_key();
    let peer = origin(&meta);
    n.store
        .update_notification_record(&Notification::new(
            &key,
            &peer,
            NotificationStatus::Received,
            7,
        ))
        .unwrap();

    n.engine.handle_ack_object_received(&key, 7, &peer).unwrap();
    assert_eq!(
        n.store
            .retrieve_notification_record(&key, &peer)
            .unwrap()
            .unwrap()
            .status,
        NotificationStatus::AckReceived
    );
}

#[test]
fn ack_without_a_record_is_an_error() {
    let n = node(NodeRole::Css, 2);
    let meta = sample_meta(10, 4);
    let err = n
        .engine
        .handle_object_updated(&meta.object_key(), 7, &meta.dest_peer())
        .unwrap_err();
    assert!(matches!(err, SyncError::MissingRecord(_)), "got {err:?}");
}

#[test]
fn stale_ack_is_ignored() {
    let meta = sample_meta(10, 4);
    let n = seeded_hub(&meta, NotificationStatus::Update);
    let key = meta.object_key();
    let dest = meta.dest_peer();

    // Wrong instance: dropped without touching the record.
    n.engine.handle_object_updated(&key, 9, &dest).unwrap();
    assert_eq!(
        n.store
            .retrieve_notification_record(&key, &dest)
            .unwrap()
            .unwrap()
            .status,
        NotificationStatus::Update
    );

    // Wrong status for the event: also dropped.
    n.engine.handle_object_received(&key, 7, &dest).unwrap();
    assert_eq!(
        n.store
            .retrieve_notification_record(&key, &dest)
            .unwrap()
            .unwrap()
            .status,
        NotificationStatus::Update
    );
    assert!(n.comms.sent().is_empty());
}

// ── Consumption ───────────────────────────────────────────────────────────────

#[test]
fn hub_records_consumption_per_peer() {
    let meta = sample_meta(10, 4);
    let n = seeded_hub(&meta, NotificationStatus::ReceivedByDestination);
    let key = meta.object_key();
    let dest = meta.dest_peer();

    n.engine.handle_object_consumed(&key, 7, &dest).unwrap();

    // The hub keeps the object; consumption is a per-peer mark.
    assert!(n.store.retrieve_object(&key).unwrap().is_some());
    assert_eq!(
        n.store.delivery_status(&key, &dest),
        Some(DeliveryStatus::Consumed)
    );
    assert_eq!(
        n.store
            .retrieve_notification_record(&key, &dest)
            .unwrap()
            .unwrap()
            .status,
        NotificationStatus::AckConsumed
    );
    assert_eq!(
        n.comms.notification_kinds(),
        vec![NotificationKind::AckConsumed]
    );
}

#[test]
fn edge_deletes_on_consumption() {
    let meta = sample_meta(10, 4);
    let n = node(NodeRole::Ess, 2);
    let key = meta.object_key();
    let peer = origin(&meta);
    n.store
        .store_object(&meta, Some(b"0123456789"), ObjectStatus::CompletelyReceived)
        .unwrap();
    n.store
        .update_notification_record(&Notification::new(&key, &peer, NotificationStatus::Data, 7))
        .unwrap();

    n.engine.handle_object_consumed(&key, 7, &peer).unwrap();

    assert!(n.store.retrieve_object(&key).unwrap().is_none());
    assert!(n
        .store
        .retrieve_notification_record(&key, &peer)
        .unwrap()
        .is_none());
    assert_eq!(
        n.comms.notification_kinds(),
        vec![NotificationKind::AckConsumed]
    );
}

#[test]
fn ack_consumed_finishes_the_consumer() {
    let meta = sample_meta(10, 4);
    let n = node(NodeRole::Ess, 2);
    let key = meta.object_key();
    let peer = origin(&meta);
    n.store
        .store_object(&meta, None, ObjectStatus::CompletelyReceived)
        .unwrap();
    n.store
        .update_notification_record(&Notification::new(
            &key,
            &peer,
            NotificationStatus::Consumed,
            7,
        ))
        .unwrap();

    n.engine.handle_ack_consumed(&key, 7, &peer).unwrap();
    assert!(n.store.retrieve_object(&key).unwrap().is_none());
    assert!(n
        .store
        .retrieve_notification_record(&key, &peer)
        .unwrap()
        .is_none());
}

// ── Deletion ──────────────────────────────────────────────────────────────────

#[test]
fn delete_tears_down_the_object() {
    let meta = sample_meta(10, 4);
    let n = node(NodeRole::Ess, 2);
    let key = meta.object_key();
    let peer = origin(&meta);

    // Mid-transfer state to tear down.
    n.engine.handle_update(&meta).unwrap();
    n.engine
        .handle_data(data_message(&meta, 0, b"aaaa"))
        .unwrap();
    n.comms.take();

    n.engine.handle_delete(&meta).unwrap();

    let stored = n.store.retrieve_object(&key).unwrap().unwrap();
    assert!(stored.deleted);
    assert!(n.store.object_data(&key).is_none());
    assert!(n
        .store
        .retrieve_notification_record(&key, &peer)
        .unwrap()
        .is_none());
    assert!(!n.engine.has_active_transfer(&key, &peer));
    assert_eq!(
        n.comms.notification_kinds(),
        vec![NotificationKind::AckDelete]
    );
}

#[test]
fn edge_records_a_tombstone_for_unknown_deletes() {
    let meta = sample_meta(10, 4);
    let n = node(NodeRole::Ess, 2);
    let key = meta.object_key();

    n.engine.handle_delete(&meta).unwrap();

    let stored = n.store.retrieve_object(&key).unwrap().unwrap();
    assert!(stored.deleted);
    assert_eq!(n.store.object_status(&key), Some(ObjectStatus::ObjDeleted));
    assert_eq!(
        n.comms.notification_kinds(),
        vec![NotificationKind::AckDelete]
    );
}

#[test]
fn hub_forwards_deleted_for_unknown_objects() {
    let meta = sample_meta(10, 4);
    let n = node(NodeRole::Css, 2);
    let key = meta.object_key();
    let peer = origin(&meta);

    n.engine.handle_delete(&meta).unwrap();

    // No tombstone on the hub; the origin is told instead.
    assert!(n.store.retrieve_object(&key).unwrap().is_none());
    assert_eq!(
        n.comms.notification_kinds(),
        vec![NotificationKind::Deleted, NotificationKind::AckDelete]
    );

    // The origin's ack retires the record.
    n.engine.handle_ack_object_deleted(&key, 7, &peer).unwrap();
    assert!(n
        .store
        .retrieve_notification_record(&key, &peer)
        .unwrap()
        .is_none());
}

#[test]
fn ack_delete_drops_the_stored_object() {
    let meta = sample_meta(10, 4);
    let n = seeded_hub(&meta, NotificationStatus::Delete);
    let key = meta.object_key();
    let dest = meta.dest_peer();

    n.engine.handle_ack_delete(&key, 7, &dest).unwrap();
    assert!(n.store.retrieve_object(&key).unwrap().is_none());
}

#[test]
fn object_deleted_retires_the_record_and_acks() {
    let meta = sample_meta(10, 4);
    let n = seeded_hub(&meta, NotificationStatus::AckDelete);
    let key = meta.object_key();
    let dest = meta.dest_peer();

    n.engine.handle_object_deleted(&key, 7, &dest).unwrap();
    assert!(n
        .store
        .retrieve_notification_record(&key, &dest)
        .unwrap()
        .is_none());
    assert_eq!(
        n.comms.notification_kinds(),
        vec![NotificationKind::AckDeleted]
    );
}

// ── Registration & replay ─────────────────────────────────────────────────────

#[test]
fn edge_nodes_reject_registration() {
    let n = node(NodeRole::Ess, 2);
    let err = n
        .engine
        .handle_registration(&edge_destination(TransportProtocol::Mqtt))
        .unwrap_err();
    assert!(matches!(err, SyncError::WrongRole { .. }), "got {err:?}");
}

#[test]
fn fresh_registration_announces_routed_objects() {
    let n = node(NodeRole::Css, 2);
    let dest = edge_destination(TransportProtocol::Mqtt);

    let m1 = sample_meta(10, 4);
    let mut m2 = sample_meta(10, 4);
    m2.object_id = "m-2".into();
    let mut elsewhere = sample_meta(10, 4);
    elsewhere.object_id = "m-3".into();
    elsewhere.dest_id = "edge-other".into();
    for m in [&m1, &m2, &elsewhere] {
        n.store
            .store_object(m, None, ObjectStatus::CompletelyReceived)
            .unwrap();
    }

    n.engine.handle_registration(&dest).unwrap();

    let sent = n.comms.sent();
    assert!(matches!(sent[0], Sent::RegisterAck { .. }));
    let updates: Vec<_> = n
        .comms
        .notification_kinds()
        .into_iter()
        .filter(|k| *k == NotificationKind::Update)
        .collect();
    // Only the two objects routed to this destination.
    assert_eq!(updates.len(), 2);
    assert_eq!(
        n.store
            .retrieve_notification_record(&m1.object_key(), &dest.peer())
            .unwrap()
            .unwrap()
            .status,
        NotificationStatus::Update
    );
}

#[test]
fn reconnect_resends_only_unacknowledged() {
    let n = node(NodeRole::Css, 2);
    let dest = edge_destination(TransportProtocol::Mqtt);
    n.store.store_destination(&dest).unwrap();

    let pending = sample_meta(10, 4);
    let mut settled = sample_meta(10, 4);
    settled.object_id = "m-settled".into();
    let mut acked = sample_meta(10, 4);
    acked.object_id = "m-acked".into();

    for m in [&pending, &settled, &acked] {
        n.store
            .store_object(m, None, ObjectStatus::CompletelyReceived)
            .unwrap();
    }
    n.store
        .update_notification_record(&Notification::new(
            &pending.object_key(),
            &dest.peer(),
            NotificationStatus::Updated,
            7,
        ))
        .unwrap();
    n.store
        .update_notification_record(&Notification::new(
            &acked.object_key(),
            &dest.peer(),
            NotificationStatus::AckReceived,
            7,
        ))
        .unwrap();
    // `settled` has no record at all — fully acknowledged.

    n.engine.handle_registration(&dest).unwrap();

    let updates: Vec<_> = n
        .comms
        .notification_kinds()
        .into_iter()
        .filter(|k| *k == NotificationKind::Update)
        .collect();
    assert_eq!(updates.len(), 1);
}

#[test]
fn resend_request_acks_before_replaying() {
    let n = node(NodeRole::Css, 2);
    let dest = edge_destination(TransportProtocol::Mqtt);
    let meta = sample_meta(10, 4);
    n.store
        .store_object(&meta, None, ObjectStatus::CompletelyReceived)
        .unwrap();

    n.engine.handle_resend_request(&dest).unwrap();

    let sent = n.comms.sent();
    assert!(matches!(sent[0], Sent::AckResend { .. }));
    assert_eq!(
        n.comms.notification_kinds(),
        vec![NotificationKind::Update]
    );
}

#[test]
fn one_shot_flags() {
    let n = node(NodeRole::Ess, 2);
    assert!(!n.engine.is_registered());
    assert!(!n.engine.is_resend_acked());

    n.engine.handle_register_ack();
    n.engine.handle_ack_resend();
    assert!(n.engine.is_registered());
    assert!(n.engine.is_resend_acked());

    // Idempotent.
    n.engine.handle_register_ack();
    assert!(n.engine.is_registered());
}
