use std::{
    ops::{Deref, DerefMut},
    sync::Arc,
};

use codec::{
    Error, ExtensionManager, RtpPacket,
    extensions::{VideoSendTiming, VideoTiming},
};

/// What an outbound packet carries, used by the pacer to prioritize and
/// account for it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RtpPacketMediaType {
    Audio,
    Video,
    Retransmission,
    ForwardErrorCorrection,
    Padding,
}

/// An RTP packet on its way out, with the bookkeeping the send path needs.
///
/// The descriptor dereferences to the wire packet, so headers, extensions
/// and payload are written through it directly. The metadata next to it is
/// never serialized, it only lives as long as the packet is in the sender.
///
/// # Test
///
/// ```
/// use std::sync::Arc;
///
/// use rtp_sender::prelude::*;
///
/// let mut manager = ExtensionManager::default();
/// manager.register::<VideoTiming>(4).unwrap();
///
/// let mut packet = RtpPacketToSend::new(Arc::new(manager));
/// packet.set_sequence_number(100);
/// packet.set_packet_type(Some(RtpPacketMediaType::Video));
/// packet.set_capture_time_ms(1000);
/// packet.set_packetization_finish_time_ms(1050).unwrap();
/// packet.set_payload(&[1, 2, 3]).unwrap();
/// packet.set_pacer_exit_time_ms(1200).unwrap();
///
/// let timing = packet.get_extension::<VideoTiming>().unwrap();
/// assert_eq!(timing.packetization_finish_delta_ms, 50);
/// assert_eq!(timing.pacer_exit_delta_ms, 200);
/// assert_eq!(packet.sequence_number(), 100);
/// ```
#[derive(Debug, Clone, Default)]
pub struct RtpPacketToSend {
    packet: RtpPacket,
    capture_time_ms: i64,
    packet_type: Option<RtpPacketMediaType>,
    retransmitted_sequence_number: Option<u16>,
    allow_retransmission: bool,
    application_data: Vec<u8>,
}

impl RtpPacketToSend {
    pub fn new(extensions: Arc<ExtensionManager>) -> Self {
        Self::from(RtpPacket::new(extensions))
    }

    pub fn with_capacity(extensions: Arc<ExtensionManager>, capacity: usize) -> Self {
        Self::from(RtpPacket::with_capacity(extensions, capacity))
    }

    pub fn into_inner(self) -> RtpPacket {
        self.packet
    }

    /// Capture time of the media in the packet, zero when unknown.
    pub fn capture_time_ms(&self) -> i64 {
        self.capture_time_ms
    }

    pub fn set_capture_time_ms(&mut self, time_ms: i64) {
        self.capture_time_ms = time_ms;
    }

    pub fn packet_type(&self) -> Option<RtpPacketMediaType> {
        self.packet_type
    }

    pub fn set_packet_type(&mut self, packet_type: Option<RtpPacketMediaType>) {
        self.packet_type = packet_type;
    }

    /// Sequence number of the packet this one is a retransmission of. With
    /// RTX this differs from the packet's own sequence number.
    pub fn retransmitted_sequence_number(&self) -> Option<u16> {
        self.retransmitted_sequence_number
    }

    pub fn set_retransmitted_sequence_number(&mut self, sequence_number: Option<u16>) {
        self.retransmitted_sequence_number = sequence_number;
    }

    /// Whether the packet may be sent again in response to a NACK.
    pub fn allow_retransmission(&self) -> bool {
        self.allow_retransmission
    }

    pub fn set_allow_retransmission(&mut self, allow: bool) {
        self.allow_retransmission = allow;
    }

    pub fn application_data(&self) -> &[u8] {
        &self.application_data
    }

    /// Replaces the opaque data attached by the application.
    pub fn set_application_data(&mut self, data: &[u8]) {
        self.application_data.clear();
        self.application_data.extend_from_slice(data);
    }

    pub fn set_packetization_finish_time_ms(&mut self, time_ms: i64) -> Result<(), Error> {
        self.set_timing_delta(time_ms, VideoTiming::PACKETIZATION_FINISH_DELTA_OFFSET)
    }

    pub fn set_pacer_exit_time_ms(&mut self, time_ms: i64) -> Result<(), Error> {
        self.set_timing_delta(time_ms, VideoTiming::PACER_EXIT_DELTA_OFFSET)
    }

    pub fn set_network_time_ms(&mut self, time_ms: i64) -> Result<(), Error> {
        self.set_timing_delta(time_ms, VideoTiming::NETWORK_TIMESTAMP_DELTA_OFFSET)
    }

    pub fn set_network2_time_ms(&mut self, time_ms: i64) -> Result<(), Error> {
        self.set_timing_delta(time_ms, VideoTiming::NETWORK2_TIMESTAMP_DELTA_OFFSET)
    }

    // every timestamp is stored relative to the capture time, in the field of
    // the video timing extension reserved for it.
    fn set_timing_delta(&mut self, time_ms: i64, offset: usize) -> Result<(), Error> {
        let delta = VideoSendTiming::delta_capped_ms(self.capture_time_ms, time_ms);
        if time_ms.saturating_sub(self.capture_time_ms) != delta as i64 {
            log::debug!(
                "video timing delta clamped: capture={}, time={}, offset={}, stored={}",
                self.capture_time_ms,
                time_ms,
                offset,
                delta
            );
        }

        self.packet
            .set_extension_field::<VideoTiming>(delta, offset)
    }
}

impl From<RtpPacket> for RtpPacketToSend {
    fn from(packet: RtpPacket) -> Self {
        Self {
            packet,
            capture_time_ms: 0,
            packet_type: None,
            retransmitted_sequence_number: None,
            allow_retransmission: false,
            application_data: Vec::new(),
        }
    }
}

impl Deref for RtpPacketToSend {
    type Target = RtpPacket;

    fn deref(&self) -> &Self::Target {
        &self.packet
    }
}

impl DerefMut for RtpPacketToSend {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.packet
    }
}
