//! ## RTP: A Transport Protocol for Real-Time Applications
//!
//! [RFC3550]: https://tools.ietf.org/html/rfc3550
//! [RFC8285]: https://tools.ietf.org/html/rfc8285
//!
//! RTP provides end-to-end delivery services for data with real-time
//! characteristics, such as interactive audio and video.  Those services
//! include payload type identification, sequence numbering, timestamping
//! and delivery monitoring [RFC3550].
//!
//! This crate holds the sender-side view of an RTP packet: a single
//! contiguous buffer that always contains the serialized packet, with the
//! fixed header, the CSRC list, the header extension block [RFC8285], the
//! payload and the padding.  Header extensions are addressed by type
//! through a shared [`ExtensionManager`], which maps every extension type
//! to the local identifier negotiated for the session.

pub mod extensions;
pub mod packet;

pub use self::{
    extensions::{Extension, ExtensionField, ExtensionManager, ExtensionType},
    packet::RtpPacket,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    InvalidInput,
    UnsupportedVersion,
    ExtensionNotRegistered,
    InvalidExtensionId,
    ExtensionSizeMismatch,
    ExtensionAfterPayload,
    TwoByteHeaderNotAllowed,
    InsufficientCapacity,
    InvalidPadding,
    TooManyCsrcs,
    AlreadyRegistered,
    UnknownUri,
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}
