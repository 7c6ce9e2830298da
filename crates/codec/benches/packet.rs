use std::sync::Arc;

use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use rtp_sender_codec::{
    ExtensionManager, RtpPacket,
    extensions::{AbsoluteSendTime, Mid, TransportSequenceNumber, VideoTiming},
};

fn criterion_benchmark(c: &mut Criterion) {
    let mut manager = ExtensionManager::default();
    manager.register::<AbsoluteSendTime>(2).unwrap();
    manager.register::<TransportSequenceNumber>(3).unwrap();
    manager.register::<VideoTiming>(4).unwrap();
    manager.register::<Mid>(5).unwrap();

    let extensions = Arc::new(manager);
    let payload = [0x55u8; 1100];

    let mut packet = RtpPacket::new(extensions.clone());
    packet.set_extension::<Mid>("video").unwrap();
    packet.set_extension::<TransportSequenceNumber>(1).unwrap();
    packet.set_payload(&payload).unwrap();

    let buffer = packet.to_bytes();

    let mut rtp_criterion = c.benchmark_group("rtp");

    rtp_criterion.throughput(Throughput::Elements(1));
    rtp_criterion.bench_function("build_packet", |bencher| {
        let mut packet = RtpPacket::new(extensions.clone());
        let mut sequence_number = 0u16;

        bencher.iter(|| {
            sequence_number = sequence_number.wrapping_add(1);

            packet.clear();
            packet.set_sequence_number(sequence_number);
            packet.set_extension::<Mid>("video").unwrap();
            packet.set_extension::<TransportSequenceNumber>(sequence_number).unwrap();
            packet.reserve_extension::<AbsoluteSendTime>().unwrap();
            packet.reserve_extension::<VideoTiming>().unwrap();
            packet.set_payload(&payload).unwrap();
        })
    });

    rtp_criterion.bench_function("parse_packet", |bencher| {
        let mut packet = RtpPacket::new(extensions.clone());

        bencher.iter(|| {
            packet.parse(&buffer).unwrap();
        })
    });

    rtp_criterion.bench_function("set_extension_field", |bencher| {
        let mut packet = RtpPacket::new(extensions.clone());
        packet.reserve_extension::<VideoTiming>().unwrap();

        bencher.iter(|| {
            packet
                .set_extension_field::<VideoTiming>(100, VideoTiming::PACER_EXIT_DELTA_OFFSET)
                .unwrap();
        })
    });

    rtp_criterion.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
