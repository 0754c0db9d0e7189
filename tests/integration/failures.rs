//! Codec failure isolation: a failed encode abandons the right amount
//! of work and nothing else.

use crate::*;

use ridgeline_core::wire::MAX_FRAGMENT_PAYLOAD;

#[test]
fn ack_failure_keeps_bookkeeping_for_sent_fragments_only() {
    // Four fragments; the third encode (index 2) fails.
    let mut w = world_with(SenderConfig::default(), Arc::new(FailingCodec::new(2)), false);

    w.builder.build(&OutboundMessage {
        conn_id: CONN,
        stream_id: ACK_STREAM,
        group_id: 5,
        payload: Bytes::from(patterned_payload(3 * MAX_FRAGMENT_PAYLOAD + 100)),
        ctx: 1,
    });

    // Fragments 0 and 1 went out and are tracked; 2 failed; 3 was
    // never attempted and left no state behind.
    assert_eq!(drain_immediate(&mut w.rx).len(), 2);
    assert_eq!(w.tracker.record_count(), 2);
    assert_eq!(w.tracker.is_acked((CONN, 1)), Some(false));
    assert_eq!(w.tracker.is_acked((CONN, 2)), Some(false));
    assert_eq!(w.tracker.is_acked((CONN, 3)), None);
    assert_eq!(w.tracker.is_acked((CONN, 4)), None);

    // The group entry was installed with the first fragment and still
    // reports the full expected count.
    assert_eq!(w.tracker.group_expected((CONN, ACK_STREAM, 5)), Some(4));
}

#[test]
fn redundancy_failure_keeps_original_packets() {
    // Eight fragments, flat redundancy two. The ninth encode — the
    // first redundancy slice — fails, ending the redundancy pass.
    let mut w = world_with(SenderConfig::default(), Arc::new(FailingCodec::new(8)), false);

    w.builder
        .build(&message(FEC_STREAM, patterned_payload(8 * MAX_FRAGMENT_PAYLOAD)));

    assert_eq!(drain_immediate(&mut w.rx).len(), 8);
    assert!(drain_paced(&mut w.rx).is_empty());
}

#[test]
fn a_failed_build_does_not_poison_the_next() {
    let mut w = world_with(SenderConfig::default(), Arc::new(FailingCodec::new(0)), false);

    // First build dies on its first fragment.
    w.builder.build(&message(ACK_STREAM, patterned_payload(3000)));
    assert!(drain_immediate(&mut w.rx).is_empty());
    assert_eq!(w.tracker.record_count(), 0);

    // The next message builds cleanly through the same builder.
    w.builder.build(&OutboundMessage {
        conn_id: CONN,
        stream_id: ACK_STREAM,
        group_id: 2,
        payload: Bytes::from(patterned_payload(3000)),
        ctx: 0,
    });
    assert_eq!(drain_immediate(&mut w.rx).len(), 3);
    assert_eq!(w.tracker.record_count(), 3);
    assert_eq!(w.tracker.group_expected((CONN, ACK_STREAM, 2)), Some(3));
}
