//! ACK stream pipeline: per-fragment packets and the resend/ack
//! bookkeeping the external resend loop consumes.

use crate::*;

use ridgeline_core::wire::{AckSliceHeader, MAX_FRAGMENT_PAYLOAD};
use zerocopy::FromBytes;

const ACK_HEADER_SIZE: usize = 29;

fn header_of(item: &SendQueueItem) -> AckSliceHeader {
    AckSliceHeader::read_from_prefix(&item.bytes[..]).expect("short ack packet")
}

#[test]
fn bookkeeping_is_complete_after_a_build() {
    let mut w = world(SenderConfig::default());

    w.builder.build(&OutboundMessage {
        conn_id: CONN,
        stream_id: ACK_STREAM,
        group_id: 42,
        payload: Bytes::from(patterned_payload(3000)),
        ctx: 0xbeef,
    });

    let items = drain_immediate(&mut w.rx);
    assert_eq!(items.len(), 3);
    assert_eq!(w.tracker.record_count(), 3);
    assert_eq!(w.tracker.group_expected((CONN, ACK_STREAM, 42)), Some(3));

    for (i, item) in items.iter().enumerate() {
        let header = header_of(item);
        assert_eq!(header.group_size.get(), 3);
        assert_eq!(header.slice_id.get(), i as u16);

        let key = (CONN, header.packet_id.get());
        // Every fragment starts unacknowledged, with one attempt on
        // the books and the retransmit timer armed.
        assert_eq!(w.tracker.is_acked(key), Some(false));
        let record = w.tracker.record(key).unwrap();
        assert_eq!(record.attempts, 1);
        assert_eq!(record.dest, item.dest);
        assert_eq!(
            record.next_resend_ms,
            record.last_send_ms + SenderConfig::default().resend_interval_ms
        );
        // The resend loop retransmits the exact bytes that went out.
        assert_eq!(record.bytes, item.bytes);

        let ctx = w.tracker.context(key).unwrap();
        assert_eq!(ctx.ctx, 0xbeef);
        assert_eq!(ctx.slice_id, i as u16);
        assert_eq!(ctx.group_id, 42);
    }
}

#[test]
fn ack_payloads_carry_raw_fragments() {
    let mut w = world(SenderConfig::default());
    let payload = patterned_payload(MAX_FRAGMENT_PAYLOAD + 100);
    w.builder
        .build(&message(ACK_STREAM, payload.clone()));

    let items = drain_immediate(&mut w.rx);
    assert_eq!(items.len(), 2);

    // No coding-slot framing on the ack path: header, then the
    // fragment bytes as-is.
    let mut reassembled = Vec::new();
    for item in &items {
        let header = header_of(item);
        let body = &item.bytes[ACK_HEADER_SIZE..];
        assert_eq!(body.len(), header.payload_len.get() as usize);
        reassembled.extend_from_slice(body);
    }
    assert_eq!(reassembled, payload);
}

#[test]
fn big_reliable_message_paces_and_tracks_send_times() {
    let config = SenderConfig {
        pace_packets_per_ms: 4,
        ..SenderConfig::default()
    };
    let mut w = world(config);

    // Thirty fragments, well past the big-message threshold.
    w.builder
        .build(&message(ACK_STREAM, patterned_payload(30 * MAX_FRAGMENT_PAYLOAD)));

    let items = drain_paced(&mut w.rx);
    assert!(drain_immediate(&mut w.rx).is_empty());
    assert_eq!(items.len(), 30);
    assert_eq!(w.tracker.record_count(), 30);

    for item in &items {
        let key = (CONN, header_of(item).packet_id.get());
        // The record's clock matches what the dispatch loop will use.
        assert_eq!(w.tracker.record(key).unwrap().last_send_ms, item.send_time_ms);
    }
}

#[test]
fn mark_acked_flips_only_the_target_slice() {
    let mut w = world(SenderConfig::default());
    w.builder.build(&message(ACK_STREAM, patterned_payload(3000)));
    let items = drain_immediate(&mut w.rx);

    let first = (CONN, header_of(&items[0]).packet_id.get());
    assert!(w.tracker.mark_acked(first));
    assert_eq!(w.tracker.is_acked(first), Some(true));

    for item in &items[1..] {
        let key = (CONN, header_of(item).packet_id.get());
        assert_eq!(w.tracker.is_acked(key), Some(false));
    }
}
