pub mod manager;
pub mod timing;

pub use self::{
    manager::ExtensionManager,
    timing::{VideoSendTiming, VideoTiming},
};

use crate::Error;

/// RTP Header Extension types known to the sender.
///
/// [RFC5285]: https://tools.ietf.org/html/rfc5285
/// [RFC8285]: https://tools.ietf.org/html/rfc8285
///
/// The local identifier of an extension element is negotiated per session
/// (the `a=extmap` attribute), so the wire carries only an id, and the
/// meaning of that id is looked up in an [`ExtensionManager`].  Every type
/// is announced in signaling by its URI:
///
/// urn:ietf:params:rtp-hdrext:toffset
/// urn:ietf:params:rtp-hdrext:ssrc-audio-level
/// http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time
/// http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01
/// http://www.webrtc.org/experiments/rtp-hdrext/video-timing
/// urn:ietf:params:rtp-hdrext:sdes:rtp-stream-id
/// urn:ietf:params:rtp-hdrext:sdes:repaired-rtp-stream-id
/// urn:ietf:params:rtp-hdrext:sdes:mid
#[repr(u8)]
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub enum ExtensionType {
    TransmissionTimeOffset,
    AudioLevel,
    AbsoluteSendTime,
    TransportSequenceNumber,
    VideoTiming,
    RtpStreamId,
    RepairedRtpStreamId,
    Mid,
}

impl ExtensionType {
    pub const COUNT: usize = 8;

    pub const ALL: [Self; Self::COUNT] = [
        Self::TransmissionTimeOffset,
        Self::AudioLevel,
        Self::AbsoluteSendTime,
        Self::TransportSequenceNumber,
        Self::VideoTiming,
        Self::RtpStreamId,
        Self::RepairedRtpStreamId,
        Self::Mid,
    ];

    pub fn uri(self) -> &'static str {
        match self {
            Self::TransmissionTimeOffset => "urn:ietf:params:rtp-hdrext:toffset",
            Self::AudioLevel => "urn:ietf:params:rtp-hdrext:ssrc-audio-level",
            Self::AbsoluteSendTime => "http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time",
            Self::TransportSequenceNumber => {
                "http://www.ietf.org/id/draft-holmer-rmcat-transport-wide-cc-extensions-01"
            }
            Self::VideoTiming => "http://www.webrtc.org/experiments/rtp-hdrext/video-timing",
            Self::RtpStreamId => "urn:ietf:params:rtp-hdrext:sdes:rtp-stream-id",
            Self::RepairedRtpStreamId => "urn:ietf:params:rtp-hdrext:sdes:repaired-rtp-stream-id",
            Self::Mid => "urn:ietf:params:rtp-hdrext:sdes:mid",
        }
    }

    /// # Test
    ///
    /// ```
    /// use rtp_sender_codec::ExtensionType;
    ///
    /// assert_eq!(
    ///     ExtensionType::from_uri("urn:ietf:params:rtp-hdrext:sdes:mid"),
    ///     Some(ExtensionType::Mid)
    /// );
    ///
    /// assert_eq!(ExtensionType::from_uri("urn:example:unknown"), None);
    /// ```
    pub fn from_uri(uri: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|it| it.uri() == uri)
    }
}

/// typed rtp header extension.
pub trait Extension<'a> {
    /// current extension inner type.
    type Item;

    /// current extension type.
    const TYPE: ExtensionType;

    /// size of the value when it does not depend on the value itself.
    const FIXED_SIZE: Option<usize> = None;

    /// size of the encoded value, `None` if the value cannot be encoded.
    fn value_size(value: &Self::Item) -> Option<usize>;

    /// write the value into a slot of exactly `value_size` bytes.
    fn serialize(value: &Self::Item, bytes: &mut [u8]);

    /// convert the extension element data to the value.
    fn deserialize(bytes: &'a [u8]) -> Result<Self::Item, Error>;
}

/// An extension made of several independently written fields.
///
/// The extension is allocated at its full fixed size and every field lives
/// at its own byte offset, so writing one field leaves the others intact.
pub trait ExtensionField<'a>: Extension<'a> {
    type Field;

    fn write_field(bytes: &mut [u8], value: Self::Field, offset: usize) -> Result<(), Error>;

    fn read_field(bytes: &[u8], offset: usize) -> Result<Self::Field, Error>;
}

/// [RFC5450]: https://tools.ietf.org/html/rfc5450
///
/// The transmission time offset is an integer number of RTP timestamp
/// units, representing the offset between the actual transmission time
/// and the capture time carried in the RTP timestamp.  It is a 24-bit
/// signed value [RFC5450].
///
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  ID   | len=2 |              transmission offset              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, Copy)]
pub struct TransmissionTimeOffset;

impl<'a> Extension<'a> for TransmissionTimeOffset {
    type Item = i32;

    const TYPE: ExtensionType = ExtensionType::TransmissionTimeOffset;
    const FIXED_SIZE: Option<usize> = Some(3);

    fn value_size(value: &Self::Item) -> Option<usize> {
        (-0x80_0000..=0x7F_FFFF).contains(value).then_some(3)
    }

    fn serialize(value: &Self::Item, bytes: &mut [u8]) {
        bytes[..3].copy_from_slice(&(*value as u32).to_be_bytes()[1..]);
    }

    fn deserialize(bytes: &'a [u8]) -> Result<Self::Item, Error> {
        if bytes.len() != 3 {
            return Err(Error::InvalidInput);
        }

        // sign extend the 24 bit value.
        Ok((u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]) << 8) as i32 >> 8)
    }
}

/// [RFC6464]: https://tools.ietf.org/html/rfc6464
///
/// The audio level header extension carries the level of the audio in the
/// RTP payload of the packet it is attached to, expressed in -dBov in the
/// range 0..=127, and an optional voice activity flag [RFC6464].
///
///  0                   1
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  ID   | len=0 |V| level       |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, Copy)]
pub struct AudioLevel;

impl<'a> Extension<'a> for AudioLevel {
    /// (voice activity, level).
    type Item = (bool, u8);

    const TYPE: ExtensionType = ExtensionType::AudioLevel;
    const FIXED_SIZE: Option<usize> = Some(1);

    fn value_size(value: &Self::Item) -> Option<usize> {
        (value.1 <= 0x7F).then_some(1)
    }

    fn serialize(value: &Self::Item, bytes: &mut [u8]) {
        bytes[0] = ((value.0 as u8) << 7) | value.1;
    }

    fn deserialize(bytes: &'a [u8]) -> Result<Self::Item, Error> {
        if bytes.len() != 1 {
            return Err(Error::InvalidInput);
        }

        Ok((bytes[0] & 0x80 != 0, bytes[0] & 0x7F))
    }
}

/// Absolute send time, the 6.18 fixed point representation of the send
/// time in seconds, wrapping every 64 seconds.
///
///  0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  ID   | len=2 |              absolute send time               |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, Copy)]
pub struct AbsoluteSendTime;

impl AbsoluteSendTime {
    /// # Test
    ///
    /// ```
    /// use rtp_sender_codec::extensions::AbsoluteSendTime;
    ///
    /// assert_eq!(AbsoluteSendTime::ms_to_24bits(1000), 0x04_0000);
    /// assert_eq!(AbsoluteSendTime::ms_to_24bits(64_000), 0);
    /// ```
    pub fn ms_to_24bits(time_ms: i64) -> u32 {
        ((((time_ms << 18) + 500) / 1000) & 0x00FF_FFFF) as u32
    }
}

impl<'a> Extension<'a> for AbsoluteSendTime {
    type Item = u32;

    const TYPE: ExtensionType = ExtensionType::AbsoluteSendTime;
    const FIXED_SIZE: Option<usize> = Some(3);

    fn value_size(value: &Self::Item) -> Option<usize> {
        (*value <= 0x00FF_FFFF).then_some(3)
    }

    fn serialize(value: &Self::Item, bytes: &mut [u8]) {
        bytes[..3].copy_from_slice(&value.to_be_bytes()[1..]);
    }

    fn deserialize(bytes: &'a [u8]) -> Result<Self::Item, Error> {
        if bytes.len() != 3 {
            return Err(Error::InvalidInput);
        }

        Ok(u32::from_be_bytes([0, bytes[0], bytes[1], bytes[2]]))
    }
}

/// Transport-wide sequence number, shared by every stream of a transport
/// and used for send-side bandwidth estimation.
///
///  0                   1                   2
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |  ID   | L=1   |transport-wide sequence number |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
#[derive(Debug, Clone, Copy)]
pub struct TransportSequenceNumber;

impl<'a> Extension<'a> for TransportSequenceNumber {
    type Item = u16;

    const TYPE: ExtensionType = ExtensionType::TransportSequenceNumber;
    const FIXED_SIZE: Option<usize> = Some(2);

    fn value_size(_: &Self::Item) -> Option<usize> {
        Some(2)
    }

    fn serialize(value: &Self::Item, bytes: &mut [u8]) {
        bytes[..2].copy_from_slice(&value.to_be_bytes());
    }

    fn deserialize(bytes: &'a [u8]) -> Result<Self::Item, Error> {
        if bytes.len() != 2 {
            return Err(Error::InvalidInput);
        }

        Ok(u16::from_be_bytes([bytes[0], bytes[1]]))
    }
}

const MAX_STRING_SIZE: usize = 16;

fn string_size(value: &str) -> Option<usize> {
    (1..=MAX_STRING_SIZE)
        .contains(&value.len())
        .then_some(value.len())
}

// identifiers may be zero padded on the wire.
fn read_string(bytes: &[u8]) -> Result<&str, Error> {
    if bytes.is_empty() || bytes[0] == 0 {
        return Err(Error::InvalidInput);
    }

    let end = bytes.iter().position(|it| *it == 0).unwrap_or(bytes.len());
    std::str::from_utf8(&bytes[..end]).map_err(|_| Error::InvalidInput)
}

/// [RFC8852]: https://tools.ietf.org/html/rfc8852
///
/// The RtpStreamId header extension carries the RID of the RTP stream,
/// an alphanumeric identifier of at most 16 bytes [RFC8852].
#[derive(Debug, Clone, Copy)]
pub struct RtpStreamId;

impl<'a> Extension<'a> for RtpStreamId {
    type Item = &'a str;

    const TYPE: ExtensionType = ExtensionType::RtpStreamId;

    fn value_size(value: &Self::Item) -> Option<usize> {
        string_size(value)
    }

    fn serialize(value: &Self::Item, bytes: &mut [u8]) {
        bytes.copy_from_slice(value.as_bytes());
    }

    fn deserialize(bytes: &'a [u8]) -> Result<Self::Item, Error> {
        read_string(bytes)
    }
}

/// The RepairedRtpStreamId header extension carries the RID of the stream
/// a redundancy stream (RTX, FEC) repairs [RFC8852].
#[derive(Debug, Clone, Copy)]
pub struct RepairedRtpStreamId;

impl<'a> Extension<'a> for RepairedRtpStreamId {
    type Item = &'a str;

    const TYPE: ExtensionType = ExtensionType::RepairedRtpStreamId;

    fn value_size(value: &Self::Item) -> Option<usize> {
        string_size(value)
    }

    fn serialize(value: &Self::Item, bytes: &mut [u8]) {
        bytes.copy_from_slice(value.as_bytes());
    }

    fn deserialize(bytes: &'a [u8]) -> Result<Self::Item, Error> {
        read_string(bytes)
    }
}

/// [RFC8843]: https://tools.ietf.org/html/rfc8843
///
/// Media identification, binds the packet to the media section of the
/// bundle group it belongs to [RFC8843].
#[derive(Debug, Clone, Copy)]
pub struct Mid;

impl<'a> Extension<'a> for Mid {
    type Item = &'a str;

    const TYPE: ExtensionType = ExtensionType::Mid;

    fn value_size(value: &Self::Item) -> Option<usize> {
        string_size(value)
    }

    fn serialize(value: &Self::Item, bytes: &mut [u8]) {
        bytes.copy_from_slice(value.as_bytes());
    }

    fn deserialize(bytes: &'a [u8]) -> Result<Self::Item, Error> {
        read_string(bytes)
    }
}
