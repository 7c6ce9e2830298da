pub mod config;
pub mod packet;

pub mod prelude {
    pub use super::codec::{
        extensions::{manager::*, timing::*, *},
        packet::*,
        *,
    };

    pub use super::packet::*;
}

pub use codec;

pub use self::packet::{RtpPacketMediaType, RtpPacketToSend};
