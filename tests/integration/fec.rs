//! FEC stream pipeline: fragmentation, partition layout, redundancy
//! emission, sealing.

use crate::*;

use ridgeline_core::config::RedundancyPolicy;
use ridgeline_core::wire::{
    FecSliceHeader, CODING_SLOT_SIZE, FLAG_SEALED, FRAGMENT_LEN_PREFIX, MAX_FRAGMENT_PAYLOAD,
};
use ridgeline_sender::NetStatus;
use zerocopy::FromBytes;

const FEC_HEADER_SIZE: usize = 35;

fn header_of(item: &SendQueueItem) -> FecSliceHeader {
    FecSliceHeader::read_from_prefix(&item.bytes[..]).expect("short fec packet")
}

#[test]
fn small_message_end_to_end() {
    let mut w = world(SenderConfig::default());

    // 3000 bytes: fragments of 1400, 1400, 200 in a single partition,
    // and a quarter of three originals rounds down to no redundancy.
    w.builder.build(&message(FEC_STREAM, patterned_payload(3000)));

    let items = drain_immediate(&mut w.rx);
    assert_eq!(items.len(), 3);
    assert!(drain_paced(&mut w.rx).is_empty());

    for (i, item) in items.iter().enumerate() {
        let header = header_of(item);
        assert_eq!(header.conn_id.get(), CONN);
        assert_eq!(header.partition_count.get(), 1);
        assert_eq!(header.partition_index.get(), 0);
        assert_eq!(header.slice_id.get(), i as u16);
        assert_eq!(header.fec_opn.get(), 3);
        assert_eq!(header.fec_pn.get(), 0);
        assert_eq!(header.timeout_secs.get(), TIMEOUT_SECS);
    }
}

#[test]
fn fragments_reassemble_to_the_original_payload() {
    let mut w = world(SenderConfig::default());
    let payload = patterned_payload(3000);
    w.builder.build(&message(FEC_STREAM, payload.clone()));

    let mut reassembled = Vec::new();
    for item in drain_immediate(&mut w.rx) {
        let header = header_of(&item);
        let framed = &item.bytes[FEC_HEADER_SIZE..];
        assert_eq!(framed.len(), header.payload_len.get() as usize);

        let inner_len = u16::from_be_bytes([framed[0], framed[1]]) as usize;
        assert_eq!(inner_len, framed.len() - FRAGMENT_LEN_PREFIX);
        reassembled.extend_from_slice(&framed[FRAGMENT_LEN_PREFIX..]);
    }
    assert_eq!(reassembled, payload);
}

#[test]
fn multi_partition_group_with_tiered_redundancy() -> anyhow::Result<()> {
    let config = SenderConfig {
        redundancy: RedundancyPolicy::Tiered,
        ..SenderConfig::default()
    };
    let mut w = world(config);
    w.state.set_net_status(CONN, NetStatus { packet_loss_rate: 0.1 });

    // Twenty fragments: partitions of 8, 8, and 4 originals. At 10%
    // loss the tiered planner gives small partitions five-fold cover:
    // 8*0.1*5+1 = 5 for the full partitions, 4*0.1*5+1 = 3 for the
    // tail.
    let len = 19 * MAX_FRAGMENT_PAYLOAD + 200;
    w.builder.build(&message(FEC_STREAM, patterned_payload(len)));

    // Past the big-message threshold, everything rides the paced queue.
    let items = drain_paced(&mut w.rx);
    assert!(drain_immediate(&mut w.rx).is_empty());
    assert_eq!(items.len(), 20 + 5 + 5 + 3);

    let expected = [(8u16, 5u16), (8, 5), (4, 3)];
    let mut seen_per_partition = vec![Vec::new(); 3];
    for item in &items {
        let header = header_of(item);
        let pid = header.partition_index.get() as usize;
        let (opn, pn) = expected[pid];
        assert_eq!(header.partition_count.get(), 3);
        assert_eq!(header.fec_opn.get(), opn);
        assert_eq!(header.fec_pn.get(), pn);
        seen_per_partition[pid].push(header.slice_id.get());

        // Redundancy slices are full coding slots.
        if header.slice_id.get() >= opn {
            assert_eq!(header.payload_len.get() as usize, CODING_SLOT_SIZE);
        }
    }

    // Within each partition: originals 0..opn, redundancy opn..opn+pn,
    // each exactly once.
    for (pid, (opn, pn)) in expected.iter().enumerate() {
        let mut ids = seen_per_partition[pid].clone();
        ids.sort_unstable();
        let want: Vec<u16> = (0..opn + pn).collect();
        assert_eq!(ids, want, "partition {pid}");
    }
    Ok(())
}

#[test]
fn sealed_packets_carry_flag_and_tag() {
    let mut w = world_with(
        SenderConfig::default(),
        Arc::new(SealingCodec::new()),
        true,
    );
    w.builder
        .build(&message(FEC_STREAM, patterned_payload(MAX_FRAGMENT_PAYLOAD)));

    let items = drain_immediate(&mut w.rx);
    assert_eq!(items.len(), 1);
    let header = header_of(&items[0]);
    assert_eq!(header.flags & FLAG_SEALED, FLAG_SEALED);
    // Header, framed fragment, Poly1305 tag.
    assert_eq!(
        items[0].bytes.len(),
        FEC_HEADER_SIZE + MAX_FRAGMENT_PAYLOAD + FRAGMENT_LEN_PREFIX + 16
    );
}

#[test]
fn packet_ids_are_monotonic_across_the_group() {
    let mut w = world(SenderConfig::default());
    w.builder
        .build(&message(FEC_STREAM, patterned_payload(9 * MAX_FRAGMENT_PAYLOAD)));

    // Nine fragments over two partitions, flat redundancy 2 + 0.
    let items = drain_immediate(&mut w.rx);
    assert_eq!(items.len(), 11);
    let ids: Vec<u32> = items.iter().map(|i| header_of(i).packet_id.get()).collect();
    let want: Vec<u32> = (1..=11).collect();
    assert_eq!(ids, want);
}
