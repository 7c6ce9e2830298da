use super::{Extension, ExtensionField, ExtensionType};
use crate::Error;

/// Timestamps of a video frame on its way through the send pipeline, all
/// stored as millisecond deltas from the frame capture time.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VideoSendTiming {
    pub flags: u8,
    pub encode_start_delta_ms: u16,
    pub encode_finish_delta_ms: u16,
    pub packetization_finish_delta_ms: u16,
    pub pacer_exit_delta_ms: u16,
    pub network_timestamp_delta_ms: u16,
    pub network2_timestamp_delta_ms: u16,
}

impl VideoSendTiming {
    pub const NOT_TRIGGERED: u8 = 0;
    pub const TRIGGERED_BY_TIMER: u8 = 1 << 0;
    pub const TRIGGERED_BY_SIZE: u8 = 1 << 1;
    pub const INVALID: u8 = u8::MAX;

    /// Delta between two millisecond timestamps, clamped to the range of a
    /// delta field instead of wrapping.
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_sender_codec::extensions::VideoSendTiming;
    ///
    /// assert_eq!(VideoSendTiming::delta_capped_ms(1000, 1050), 50);
    /// assert_eq!(VideoSendTiming::delta_capped_ms(1000, 70_000), u16::MAX);
    /// assert_eq!(VideoSendTiming::delta_capped_ms(1000, 900), 0);
    /// ```
    pub fn delta_capped_ms(base_ms: i64, time_ms: i64) -> u16 {
        time_ms
            .saturating_sub(base_ms)
            .clamp(0, u16::MAX as i64) as u16
    }
}

/// Video timing extension, see
/// http://www.webrtc.org/experiments/rtp-hdrext/video-timing
///
/// ```bash
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  ID   | len=12|     flags     |     encode start ms delta     |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |    encode finish ms delta     |  packetizer finish ms delta   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |     pacer exit ms delta       |  network timestamp ms delta   |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  network2 timestamp ms delta  |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// An older form of the extension has no flags byte and is 12 bytes long,
/// it is still accepted when reading.
#[derive(Debug, Clone, Copy)]
pub struct VideoTiming;

impl VideoTiming {
    pub const VALUE_SIZE: usize = 13;
    pub const LEGACY_VALUE_SIZE: usize = 12;

    pub const FLAGS_OFFSET: usize = 0;
    pub const ENCODE_START_DELTA_OFFSET: usize = 1;
    pub const ENCODE_FINISH_DELTA_OFFSET: usize = 3;
    pub const PACKETIZATION_FINISH_DELTA_OFFSET: usize = 5;
    pub const PACER_EXIT_DELTA_OFFSET: usize = 7;
    pub const NETWORK_TIMESTAMP_DELTA_OFFSET: usize = 9;
    pub const NETWORK2_TIMESTAMP_DELTA_OFFSET: usize = 11;

    // maps a delta offset of the current layout onto the data actually present.
    fn locate(bytes: &[u8], offset: usize) -> Result<usize, Error> {
        if offset == Self::FLAGS_OFFSET {
            return Err(Error::InvalidInput);
        }

        let offset = match bytes.len() {
            Self::VALUE_SIZE => offset,
            Self::LEGACY_VALUE_SIZE => offset - 1,
            _ => return Err(Error::InvalidInput),
        };

        if offset + 2 > bytes.len() {
            return Err(Error::InvalidInput);
        }

        Ok(offset)
    }
}

impl<'a> Extension<'a> for VideoTiming {
    type Item = VideoSendTiming;

    const TYPE: ExtensionType = ExtensionType::VideoTiming;
    const FIXED_SIZE: Option<usize> = Some(Self::VALUE_SIZE);

    fn value_size(_: &Self::Item) -> Option<usize> {
        Some(Self::VALUE_SIZE)
    }

    fn serialize(value: &Self::Item, bytes: &mut [u8]) {
        bytes[Self::FLAGS_OFFSET] = value.flags;

        for (offset, delta) in [
            (Self::ENCODE_START_DELTA_OFFSET, value.encode_start_delta_ms),
            (Self::ENCODE_FINISH_DELTA_OFFSET, value.encode_finish_delta_ms),
            (Self::PACKETIZATION_FINISH_DELTA_OFFSET, value.packetization_finish_delta_ms),
            (Self::PACER_EXIT_DELTA_OFFSET, value.pacer_exit_delta_ms),
            (Self::NETWORK_TIMESTAMP_DELTA_OFFSET, value.network_timestamp_delta_ms),
            (Self::NETWORK2_TIMESTAMP_DELTA_OFFSET, value.network2_timestamp_delta_ms),
        ] {
            bytes[offset..offset + 2].copy_from_slice(&delta.to_be_bytes());
        }
    }

    /// # Test
    ///
    /// ```
    /// use rtp_sender_codec::extensions::{Extension, VideoTiming};
    ///
    /// let legacy = [0x00, 0x01, 0x00, 0x02, 0x00, 0x03, 0x00, 0x04, 0x00, 0x05, 0x00, 0x06];
    /// let timing = VideoTiming::deserialize(&legacy).unwrap();
    ///
    /// assert_eq!(timing.flags, 0);
    /// assert_eq!(timing.encode_start_delta_ms, 1);
    /// assert_eq!(timing.network2_timestamp_delta_ms, 6);
    /// ```
    fn deserialize(bytes: &'a [u8]) -> Result<Self::Item, Error> {
        let flags = match bytes.len() {
            Self::VALUE_SIZE => bytes[Self::FLAGS_OFFSET],
            Self::LEGACY_VALUE_SIZE => VideoSendTiming::NOT_TRIGGERED,
            _ => return Err(Error::InvalidInput),
        };

        Ok(VideoSendTiming {
            flags,
            encode_start_delta_ms: Self::read_field(bytes, Self::ENCODE_START_DELTA_OFFSET)?,
            encode_finish_delta_ms: Self::read_field(bytes, Self::ENCODE_FINISH_DELTA_OFFSET)?,
            packetization_finish_delta_ms: Self::read_field(
                bytes,
                Self::PACKETIZATION_FINISH_DELTA_OFFSET,
            )?,
            pacer_exit_delta_ms: Self::read_field(bytes, Self::PACER_EXIT_DELTA_OFFSET)?,
            network_timestamp_delta_ms: Self::read_field(
                bytes,
                Self::NETWORK_TIMESTAMP_DELTA_OFFSET,
            )?,
            network2_timestamp_delta_ms: Self::read_field(
                bytes,
                Self::NETWORK2_TIMESTAMP_DELTA_OFFSET,
            )?,
        })
    }
}

impl<'a> ExtensionField<'a> for VideoTiming {
    type Field = u16;

    fn write_field(bytes: &mut [u8], value: Self::Field, offset: usize) -> Result<(), Error> {
        if bytes.len() != Self::VALUE_SIZE {
            return Err(Error::InvalidInput);
        }

        let offset = Self::locate(bytes, offset)?;
        bytes[offset..offset + 2].copy_from_slice(&value.to_be_bytes());
        Ok(())
    }

    fn read_field(bytes: &[u8], offset: usize) -> Result<Self::Field, Error> {
        let offset = Self::locate(bytes, offset)?;
        Ok(u16::from_be_bytes([bytes[offset], bytes[offset + 1]]))
    }
}
