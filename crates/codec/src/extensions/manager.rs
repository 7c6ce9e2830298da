use super::{Extension, ExtensionType};
use crate::Error;

/// The largest id that fits in a one-byte extension element header.
pub const ONE_BYTE_HEADER_MAX_ID: u8 = 14;

/// Maps the extension types to the local ids negotiated for a session.
///
/// A type is bound to at most one id and an id to at most one type. Ids
/// above [`ONE_BYTE_HEADER_MAX_ID`] need the two-byte element header, which
/// a session only accepts when `extmap-allow-mixed` was negotiated.
///
/// The manager is filled once and then shared read only, typically behind
/// an `Arc`, by every packet of the session.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ExtensionManager {
    // zero marks an unregistered type.
    ids: [u8; ExtensionType::COUNT],
    extmap_allow_mixed: bool,
}

impl ExtensionManager {
    pub fn new(extmap_allow_mixed: bool) -> Self {
        Self {
            extmap_allow_mixed,
            ..Default::default()
        }
    }

    pub fn extmap_allow_mixed(&self) -> bool {
        self.extmap_allow_mixed
    }

    /// # Test
    ///
    /// ```
    /// use rtp_sender_codec::extensions::{ExtensionManager, VideoTiming};
    /// use rtp_sender_codec::{Error, ExtensionType};
    ///
    /// let mut manager = ExtensionManager::default();
    ///
    /// assert_eq!(manager.register::<VideoTiming>(5), Ok(()));
    /// assert_eq!(manager.register::<VideoTiming>(5), Ok(()));
    /// assert_eq!(manager.register::<VideoTiming>(6), Err(Error::AlreadyRegistered));
    /// assert_eq!(manager.register::<VideoTiming>(15), Err(Error::TwoByteHeaderNotAllowed));
    /// assert_eq!(manager.id(ExtensionType::VideoTiming), Some(5));
    /// ```
    pub fn register<'a, E: Extension<'a>>(&mut self, id: u8) -> Result<(), Error> {
        self.register_by_type(E::TYPE, id)
    }

    pub fn register_by_type(&mut self, kind: ExtensionType, id: u8) -> Result<(), Error> {
        if id == 0 {
            return Err(Error::InvalidExtensionId);
        }

        if id > ONE_BYTE_HEADER_MAX_ID && !self.extmap_allow_mixed {
            return Err(Error::TwoByteHeaderNotAllowed);
        }

        // registering the same mapping twice is harmless.
        match self.id(kind) {
            Some(it) if it == id => return Ok(()),
            Some(_) => return Err(Error::AlreadyRegistered),
            None => (),
        }

        if self.kind(id).is_some() {
            return Err(Error::AlreadyRegistered);
        }

        self.ids[kind as usize] = id;
        Ok(())
    }

    /// # Test
    ///
    /// ```
    /// use rtp_sender_codec::{Error, ExtensionManager, ExtensionType};
    ///
    /// let mut manager = ExtensionManager::default();
    ///
    /// manager
    ///     .register_by_uri("http://www.webrtc.org/experiments/rtp-hdrext/abs-send-time", 3)
    ///     .unwrap();
    ///
    /// assert_eq!(manager.kind(3), Some(ExtensionType::AbsoluteSendTime));
    /// assert_eq!(manager.register_by_uri("urn:example:unknown", 4), Err(Error::UnknownUri));
    /// ```
    pub fn register_by_uri(&mut self, uri: &str, id: u8) -> Result<(), Error> {
        self.register_by_type(ExtensionType::from_uri(uri).ok_or(Error::UnknownUri)?, id)
    }

    /// Removes the mapping of the type, returns the id it was bound to.
    pub fn deregister(&mut self, kind: ExtensionType) -> Option<u8> {
        let id = self.id(kind)?;
        self.ids[kind as usize] = 0;
        Some(id)
    }

    pub fn is_registered(&self, kind: ExtensionType) -> bool {
        self.id(kind).is_some()
    }

    pub fn id(&self, kind: ExtensionType) -> Option<u8> {
        match self.ids[kind as usize] {
            0 => None,
            id => Some(id),
        }
    }

    pub fn kind(&self, id: u8) -> Option<ExtensionType> {
        if id == 0 {
            return None;
        }

        ExtensionType::ALL
            .into_iter()
            .find(|it| self.ids[*it as usize] == id)
    }

    /// Registered mappings as `(id, type)`, ordered by type.
    pub fn iter(&self) -> impl Iterator<Item = (u8, ExtensionType)> + '_ {
        ExtensionType::ALL
            .into_iter()
            .filter_map(|it| self.id(it).map(|id| (id, it)))
    }
}
