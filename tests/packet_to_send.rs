use std::sync::Arc;

use anyhow::Result;
use rtp_sender::{config::Config, prelude::*};

fn session() -> Result<Arc<ExtensionManager>> {
    let config = serde_json5::from_str::<Config>(
        r#"{
            extensions: {
                map: [
                    { id: 2, uri: "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time" },
                    { id: 3, uri: "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01" },
                    { id: 4, uri: "http://www.webrtc.org/experiments/rtp-hdrext/video-timing" },
                    { id: 5, uri: "urn:ietf:params:rtp-hdrext:sdes:mid" },
                ],
            },
        }"#,
    )?;

    Ok(Arc::new(config.extension_manager()?))
}

#[test]
fn test_send_path() -> Result<()> {
    let extensions = session()?;

    // packetizer
    let mut packet = RtpPacketToSend::with_capacity(extensions.clone(), 1200);
    packet.set_payload_type(96);
    packet.set_sequence_number(1000);
    packet.set_timestamp(90_000);
    packet.set_ssrc(0x1234_5678);
    packet.set_marker(true);
    packet.set_capture_time_ms(5_000);
    packet.set_packet_type(Some(RtpPacketMediaType::Video));
    packet.set_allow_retransmission(true);
    packet.set_extension::<Mid>("0")?;
    packet.reserve_extension::<TransportSequenceNumber>()?;
    packet.reserve_extension::<AbsoluteSendTime>()?;
    packet.set_packetization_finish_time_ms(5_004)?;
    packet.set_payload(&[0x42; 1000])?;

    // pacer
    let mut packet = std::mem::take(&mut packet);
    packet.set_extension::<TransportSequenceNumber>(17)?;
    packet.set_extension::<AbsoluteSendTime>(AbsoluteSendTime::ms_to_24bits(5_020))?;
    packet.set_pacer_exit_time_ms(5_020)?;
    packet.set_network_time_ms(5_021)?;

    let mut parsed = RtpPacket::new(extensions);
    parsed.parse(packet.data())?;

    assert!(parsed.marker());
    assert_eq!(parsed.payload_type(), 96);
    assert_eq!(parsed.sequence_number(), 1000);
    assert_eq!(parsed.timestamp(), 90_000);
    assert_eq!(parsed.ssrc(), 0x1234_5678);
    assert_eq!(parsed.payload(), &[0x42; 1000]);
    assert_eq!(parsed.get_extension::<Mid>(), Some("0"));
    assert_eq!(parsed.get_extension::<TransportSequenceNumber>(), Some(17));
    assert_eq!(
        parsed.get_extension::<AbsoluteSendTime>(),
        Some(AbsoluteSendTime::ms_to_24bits(5_020))
    );

    assert_eq!(
        parsed.get_extension::<VideoTiming>(),
        Some(VideoSendTiming {
            packetization_finish_delta_ms: 4,
            pacer_exit_delta_ms: 20,
            network_timestamp_delta_ms: 21,
            ..Default::default()
        })
    );

    Ok(())
}

#[test]
fn test_retransmission_copy() -> Result<()> {
    let extensions = session()?;

    let mut packet = RtpPacketToSend::new(extensions);
    packet.set_sequence_number(300);
    packet.set_capture_time_ms(100);
    packet.set_packet_type(Some(RtpPacketMediaType::Video));
    packet.set_allow_retransmission(true);
    packet.set_application_data(b"frame-7");
    packet.set_extension::<Mid>("v")?;
    packet.set_payload(&[1, 2, 3])?;

    // rtx: a copy on its own sequence number space that points back at the
    // first transmission.
    let mut rtx = packet.clone();
    rtx.set_sequence_number(9);
    rtx.set_packet_type(Some(RtpPacketMediaType::Retransmission));
    rtx.set_retransmitted_sequence_number(Some(packet.sequence_number()));
    rtx.set_allow_retransmission(false);

    assert_eq!(rtx.retransmitted_sequence_number(), Some(300));
    assert_eq!(rtx.sequence_number(), 9);
    assert_eq!(rtx.application_data(), b"frame-7");
    assert_eq!(rtx.capture_time_ms(), 100);
    assert_eq!(rtx.get_extension::<Mid>(), Some("v"));

    assert_eq!(packet.sequence_number(), 300);
    assert_eq!(packet.packet_type(), Some(RtpPacketMediaType::Video));
    assert_eq!(packet.retransmitted_sequence_number(), None);
    assert!(packet.allow_retransmission());
    Ok(())
}

#[test]
fn test_descriptor_from_parsed_packet() -> Result<()> {
    let extensions = session()?;

    let mut source = RtpPacketToSend::new(extensions.clone());
    source.set_sequence_number(55);
    source.set_payload(&[0xee; 16])?;

    let mut packet = RtpPacket::new(extensions);
    packet.parse(source.data())?;

    let packet = RtpPacketToSend::from(packet);
    assert_eq!(packet.sequence_number(), 55);
    assert_eq!(packet.payload(), &[0xee; 16]);
    assert_eq!(packet.packet_type(), None);

    let inner = packet.into_inner();
    assert_eq!(inner.size(), 12 + 16);
    Ok(())
}

#[test]
fn test_descriptor_is_send() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<RtpPacketToSend>();
}
