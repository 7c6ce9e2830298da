use std::sync::Arc;

use bytes::{BufMut, Bytes, BytesMut};

use crate::{
    Error,
    extensions::{Extension, ExtensionField, ExtensionManager, ExtensionType, manager::ONE_BYTE_HEADER_MAX_ID},
};

pub const FIXED_HEADER_SIZE: usize = 12;
pub const DEFAULT_CAPACITY: usize = 1500;
pub const MAX_CSRCS: usize = 15;

const VERSION: u8 = 2;
const VERSION_MASK: u8 = 0b11000000;
const PADDING_MASK: u8 = 0b00100000;
const EXTENSION_MASK: u8 = 0b00010000;
const CSRC_COUNT_MASK: u8 = 0b00001111;
const MARKER_MASK: u8 = 0b10000000;
const PAYLOAD_TYPE_MASK: u8 = 0b01111111;

const ONE_BYTE_PROFILE: u16 = 0xBEDE;
const TWO_BYTE_PROFILE: u16 = 0x1000;
const TWO_BYTE_PROFILE_MASK: u16 = 0xFFF0;
const ONE_BYTE_ELEMENT_HEADER_SIZE: usize = 1;
const TWO_BYTE_ELEMENT_HEADER_SIZE: usize = 2;
const ONE_BYTE_MAX_VALUE_SIZE: usize = 16;
const MAX_VALUE_SIZE: usize = 255;
const ONE_BYTE_RESERVED_ID: u8 = 15;

#[derive(Debug, Clone, Copy)]
struct ExtensionEntry {
    id: u8,
    offset: u16,
    length: u8,
}

/// ### RTP Data Transfer Protocol
///
/// ```bash
///   0                   1                   2                   3
///  0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1 2 3 4 5 6 7 8 9 0 1
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |V=2|P|X|  CC   |M|     PT      |       sequence number         |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                           timestamp                           |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |           synchronization source (SSRC) identifier            |
/// +=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+=+
/// |            contributing source (CSRC) identifiers             |
/// |                             ....                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |      defined by profile       |           length              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// |                        header extension                       |
/// |                             ....                              |
/// +-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+-+
/// ```
///
/// The buffer always holds the serialized packet, the header fields are
/// read and written in place.  The packet is built front to back: CSRCs,
/// then header extensions, then payload, then padding.  Extension values
/// that are only known late (send time, pacing timestamps) are allocated
/// before the payload and overwritten in place afterwards.
///
/// `capacity` bounds the serialized size of the packet, the buffer grows
/// on demand up to it.
#[derive(Debug, Clone)]
pub struct RtpPacket {
    extensions: Arc<ExtensionManager>,
    buffer: BytesMut,
    capacity: usize,
    payload_offset: usize,
    payload_size: usize,
    padding_size: usize,
    // bytes used by extension elements, without the block header and the
    // trailing zero padding.
    extensions_size: usize,
    entries: Vec<ExtensionEntry>,
}

impl Default for RtpPacket {
    fn default() -> Self {
        Self::new(Arc::default())
    }
}

impl RtpPacket {
    pub fn new(extensions: Arc<ExtensionManager>) -> Self {
        Self::with_capacity(extensions, DEFAULT_CAPACITY)
    }

    /// # Test
    ///
    /// ```
    /// use rtp_sender_codec::RtpPacket;
    ///
    /// let packet = RtpPacket::with_capacity(Default::default(), 200);
    ///
    /// assert_eq!(packet.capacity(), 200);
    /// assert_eq!(packet.size(), 12);
    /// assert_eq!(packet.data(), &[0x80, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0]);
    /// ```
    pub fn with_capacity(extensions: Arc<ExtensionManager>, capacity: usize) -> Self {
        let capacity = capacity.max(FIXED_HEADER_SIZE);
        let mut packet = Self {
            buffer: BytesMut::with_capacity(capacity),
            payload_offset: FIXED_HEADER_SIZE,
            entries: Vec::new(),
            extensions_size: 0,
            padding_size: 0,
            payload_size: 0,
            extensions,
            capacity,
        };

        packet.clear();
        packet
    }

    /// Resets the packet to an empty header, keeping the extension manager
    /// and the capacity.
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.buffer.put_u8(VERSION << 6);
        self.buffer.put_bytes(0, FIXED_HEADER_SIZE - 1);
        self.payload_offset = FIXED_HEADER_SIZE;
        self.payload_size = 0;
        self.padding_size = 0;
        self.extensions_size = 0;
        self.entries.clear();
    }

    pub fn extension_manager(&self) -> &Arc<ExtensionManager> {
        &self.extensions
    }

    /// Loads a serialized packet, replacing the current content.
    ///
    /// Extension elements with ids unknown to the extension manager are kept
    /// in the buffer but can not be read by type.
    ///
    /// # Test
    ///
    /// ```
    /// use rtp_sender_codec::RtpPacket;
    ///
    /// let buffer = [
    ///     0x90, 0x72, 0x04, 0xf1, 0xf8, 0x87, 0x3f, 0xad, 0x67, 0xfe,
    ///     0x9d, 0xfc, 0xbe, 0xde, 0x00, 0x01, 0x22, 0xaa, 0x36, 0x3f,
    ///     0x01, 0x02, 0x03,
    /// ];
    ///
    /// let mut packet = RtpPacket::default();
    /// packet.parse(&buffer).unwrap();
    ///
    /// assert_eq!(packet.payload_type(), 114);
    /// assert_eq!(packet.sequence_number(), 1265);
    /// assert_eq!(packet.timestamp(), 4169613229);
    /// assert_eq!(packet.ssrc(), 1744739836);
    /// assert_eq!(packet.headers_size(), 20);
    /// assert_eq!(packet.payload(), &[0x01, 0x02, 0x03]);
    /// ```
    pub fn parse(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let result = self.parse_buffer(bytes);
        if result.is_err() {
            self.clear();
        }

        result
    }

    fn parse_buffer(&mut self, bytes: &[u8]) -> Result<(), Error> {
        let size = bytes.len();
        if size < FIXED_HEADER_SIZE {
            return Err(Error::InvalidInput);
        }

        // lock rtp version in rfc 3550
        if (bytes[0] & VERSION_MASK) >> 6 != VERSION {
            return Err(Error::UnsupportedVersion);
        }

        let has_padding = bytes[0] & PADDING_MASK != 0;
        let has_extension = bytes[0] & EXTENSION_MASK != 0;
        let csrc_count = (bytes[0] & CSRC_COUNT_MASK) as usize;

        let mut payload_offset = FIXED_HEADER_SIZE + csrc_count * 4;
        if size < payload_offset {
            return Err(Error::InvalidInput);
        }

        self.entries.clear();
        self.extensions_size = 0;

        if has_extension {
            if size < payload_offset + 4 {
                return Err(Error::InvalidInput);
            }

            let profile = u16::from_be_bytes([bytes[payload_offset], bytes[payload_offset + 1]]);
            let block_size = u16::from_be_bytes([bytes[payload_offset + 2], bytes[payload_offset + 3]])
                as usize
                * 4;

            let extensions_offset = payload_offset + 4;
            if size < extensions_offset + block_size {
                return Err(Error::InvalidInput);
            }

            // other profiles are carried opaquely.
            let header_size = if profile == ONE_BYTE_PROFILE {
                Some(ONE_BYTE_ELEMENT_HEADER_SIZE)
            } else if profile & TWO_BYTE_PROFILE_MASK == TWO_BYTE_PROFILE {
                Some(TWO_BYTE_ELEMENT_HEADER_SIZE)
            } else {
                None
            };

            if let Some(header_size) = header_size {
                while self.extensions_size + header_size < block_size {
                    let index = extensions_offset + self.extensions_size;

                    // padding between elements.
                    if bytes[index] == 0 {
                        self.extensions_size += 1;
                        continue;
                    }

                    let (id, length) = if header_size == ONE_BYTE_ELEMENT_HEADER_SIZE {
                        let id = bytes[index] >> 4;
                        if id == ONE_BYTE_RESERVED_ID {
                            break;
                        }

                        (id, (bytes[index] & 0x0F) as usize + 1)
                    } else {
                        (bytes[index], bytes[index + 1] as usize)
                    };

                    if self.extensions_size + header_size + length > block_size {
                        break;
                    }

                    let offset =
                        u16::try_from(index + header_size).map_err(|_| Error::InvalidInput)?;
                    match self.entries.iter_mut().find(|it| it.id == id) {
                        Some(entry) => {
                            entry.offset = offset;
                            entry.length = length as u8;
                        }
                        None => self.entries.push(ExtensionEntry {
                            length: length as u8,
                            offset,
                            id,
                        }),
                    }

                    self.extensions_size += header_size + length;
                }
            }

            payload_offset = extensions_offset + block_size;
        }

        let padding_size = if has_padding && payload_offset < size {
            match bytes[size - 1] as usize {
                0 => return Err(Error::InvalidPadding),
                it => it,
            }
        } else {
            0
        };

        if payload_offset + padding_size > size {
            return Err(Error::InvalidPadding);
        }

        self.buffer.clear();
        self.buffer.put_slice(bytes);
        self.capacity = self.capacity.max(size);
        self.payload_offset = payload_offset;
        self.padding_size = padding_size;
        self.payload_size = size - payload_offset - padding_size;
        Ok(())
    }

    pub fn marker(&self) -> bool {
        self.buffer[1] & MARKER_MASK != 0
    }

    pub fn payload_type(&self) -> u8 {
        self.buffer[1] & PAYLOAD_TYPE_MASK
    }

    pub fn sequence_number(&self) -> u16 {
        u16::from_be_bytes([self.buffer[2], self.buffer[3]])
    }

    pub fn timestamp(&self) -> u32 {
        u32::from_be_bytes([self.buffer[4], self.buffer[5], self.buffer[6], self.buffer[7]])
    }

    pub fn ssrc(&self) -> u32 {
        u32::from_be_bytes([self.buffer[8], self.buffer[9], self.buffer[10], self.buffer[11]])
    }

    pub fn csrcs(&self) -> Vec<u32> {
        let count = (self.buffer[0] & CSRC_COUNT_MASK) as usize;
        self.buffer[FIXED_HEADER_SIZE..FIXED_HEADER_SIZE + count * 4]
            .chunks_exact(4)
            .map(|it| u32::from_be_bytes([it[0], it[1], it[2], it[3]]))
            .collect()
    }

    pub fn set_marker(&mut self, marker: bool) {
        if marker {
            self.buffer[1] |= MARKER_MASK;
        } else {
            self.buffer[1] &= !MARKER_MASK;
        }
    }

    /// Only the lower 7 bits are used.
    pub fn set_payload_type(&mut self, payload_type: u8) {
        self.buffer[1] = (self.buffer[1] & MARKER_MASK) | (payload_type & PAYLOAD_TYPE_MASK);
    }

    pub fn set_sequence_number(&mut self, sequence_number: u16) {
        self.buffer[2..4].copy_from_slice(&sequence_number.to_be_bytes());
    }

    pub fn set_timestamp(&mut self, timestamp: u32) {
        self.buffer[4..8].copy_from_slice(&timestamp.to_be_bytes());
    }

    pub fn set_ssrc(&mut self, ssrc: u32) {
        self.buffer[8..12].copy_from_slice(&ssrc.to_be_bytes());
    }

    /// CSRCs are part of the fixed layout, they can only be written before
    /// any extension block, payload or padding.
    pub fn set_csrcs(&mut self, csrcs: &[u32]) -> Result<(), Error> {
        if self.has_extension_block() || self.payload_size > 0 || self.padding_size > 0 {
            return Err(Error::InvalidInput);
        }

        if csrcs.len() > MAX_CSRCS {
            return Err(Error::TooManyCsrcs);
        }

        let payload_offset = FIXED_HEADER_SIZE + csrcs.len() * 4;
        if payload_offset > self.capacity {
            return Err(Error::InsufficientCapacity);
        }

        self.buffer[0] = (self.buffer[0] & !CSRC_COUNT_MASK) | csrcs.len() as u8;
        self.buffer.truncate(FIXED_HEADER_SIZE);
        for csrc in csrcs {
            self.buffer.put_u32(*csrc);
        }

        self.payload_offset = payload_offset;
        Ok(())
    }

    pub fn headers_size(&self) -> usize {
        self.payload_offset
    }

    pub fn payload_size(&self) -> usize {
        self.payload_size
    }

    pub fn padding_size(&self) -> usize {
        self.padding_size
    }

    pub fn size(&self) -> usize {
        self.payload_offset + self.payload_size + self.padding_size
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// The serialized packet.
    pub fn data(&self) -> &[u8] {
        &self.buffer[..]
    }

    pub fn to_bytes(&self) -> Bytes {
        Bytes::copy_from_slice(&self.buffer)
    }

    pub fn payload(&self) -> &[u8] {
        &self.buffer[self.payload_offset..self.payload_offset + self.payload_size]
    }

    pub fn has_extension<'a, E: Extension<'a>>(&self) -> bool {
        self.find_extension(E::TYPE).is_some()
    }

    /// # Test
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use rtp_sender_codec::extensions::{ExtensionManager, TransportSequenceNumber};
    /// use rtp_sender_codec::RtpPacket;
    ///
    /// let mut manager = ExtensionManager::default();
    /// manager.register::<TransportSequenceNumber>(1).unwrap();
    ///
    /// let mut packet = RtpPacket::new(Arc::new(manager));
    /// assert_eq!(packet.get_extension::<TransportSequenceNumber>(), None);
    ///
    /// packet.set_extension::<TransportSequenceNumber>(0x1234).unwrap();
    /// assert_eq!(packet.get_extension::<TransportSequenceNumber>(), Some(0x1234));
    /// assert_eq!(&packet.data()[12..], &[0xbe, 0xde, 0x00, 0x01, 0x11, 0x12, 0x34, 0x00]);
    /// ```
    pub fn get_extension<'a, E: Extension<'a>>(&'a self) -> Option<E::Item> {
        E::deserialize(self.find_extension(E::TYPE)?).ok()
    }

    pub fn get_raw_extension<'a, E: Extension<'a>>(&self) -> Option<&[u8]> {
        self.find_extension(E::TYPE)
    }

    pub fn set_extension<'a, E: Extension<'a>>(&mut self, value: E::Item) -> Result<(), Error> {
        let size = E::value_size(&value).ok_or(Error::InvalidInput)?;
        let slot = self.allocate_extension(E::TYPE, size)?;
        E::serialize(&value, slot);
        Ok(())
    }

    /// Allocates a zeroed extension to be written later, for values only
    /// known right before the packet leaves. An extension already present
    /// keeps its value.
    pub fn reserve_extension<'a, E: Extension<'a>>(&mut self) -> Result<(), Error> {
        let size = E::FIXED_SIZE.ok_or(Error::InvalidInput)?;
        self.allocate_extension(E::TYPE, size)?;
        Ok(())
    }

    /// Writes a single field of a multi-field extension.
    ///
    /// The extension is allocated zeroed at its full size the first time,
    /// later writes only touch the bytes of the given field.
    ///
    /// # Test
    ///
    /// ```
    /// use std::sync::Arc;
    ///
    /// use rtp_sender_codec::extensions::{ExtensionManager, VideoTiming};
    /// use rtp_sender_codec::RtpPacket;
    ///
    /// let mut manager = ExtensionManager::default();
    /// manager.register::<VideoTiming>(4).unwrap();
    ///
    /// let mut packet = RtpPacket::new(Arc::new(manager));
    /// packet.set_extension_field::<VideoTiming>(50, VideoTiming::PACKETIZATION_FINISH_DELTA_OFFSET).unwrap();
    /// packet.set_extension_field::<VideoTiming>(200, VideoTiming::PACER_EXIT_DELTA_OFFSET).unwrap();
    ///
    /// let timing = packet.get_extension::<VideoTiming>().unwrap();
    /// assert_eq!(timing.packetization_finish_delta_ms, 50);
    /// assert_eq!(timing.pacer_exit_delta_ms, 200);
    /// assert_eq!(timing.network_timestamp_delta_ms, 0);
    /// ```
    pub fn set_extension_field<'a, E: ExtensionField<'a>>(
        &mut self,
        value: E::Field,
        offset: usize,
    ) -> Result<(), Error> {
        let size = E::FIXED_SIZE.ok_or(Error::InvalidInput)?;
        E::write_field(self.allocate_extension(E::TYPE, size)?, value, offset)
    }

    pub fn get_extension_field<'a, E: ExtensionField<'a>>(&self, offset: usize) -> Option<E::Field> {
        E::read_field(self.find_extension(E::TYPE)?, offset).ok()
    }

    /// Copies the header, CSRCs and header extensions of another packet,
    /// dropping the payload and padding.
    pub fn copy_header_from(&mut self, other: &RtpPacket) {
        self.extensions = other.extensions.clone();
        self.capacity = self.capacity.max(other.payload_offset);
        self.buffer.clear();
        self.buffer.put_slice(&other.buffer[..other.payload_offset]);
        self.buffer[0] &= !PADDING_MASK;
        self.payload_offset = other.payload_offset;
        self.extensions_size = other.extensions_size;
        self.entries.clone_from(&other.entries);
        self.payload_size = 0;
        self.padding_size = 0;
    }

    /// Replaces the payload, dropping any padding.
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<(), Error> {
        self.allocate_payload(payload.len())?
            .copy_from_slice(payload);
        Ok(())
    }

    /// Resizes the payload to `size` zeroed bytes, dropping any padding, and
    /// returns it for writing.
    pub fn allocate_payload(&mut self, size: usize) -> Result<&mut [u8], Error> {
        if self.payload_offset + size > self.capacity {
            return Err(Error::InsufficientCapacity);
        }

        self.buffer[0] &= !PADDING_MASK;
        self.buffer.truncate(self.payload_offset);
        self.buffer.put_bytes(0, size);
        self.padding_size = 0;
        self.payload_size = size;
        Ok(&mut self.buffer[self.payload_offset..])
    }

    /// # Test
    ///
    /// ```
    /// use rtp_sender_codec::RtpPacket;
    ///
    /// let mut packet = RtpPacket::default();
    /// packet.set_payload(&[0xaa]).unwrap();
    /// packet.set_padding(3).unwrap();
    ///
    /// assert_eq!(packet.padding_size(), 3);
    /// assert_eq!(packet.data()[0], 0xa0);
    /// assert_eq!(&packet.data()[12..], &[0xaa, 0x00, 0x00, 0x03]);
    /// ```
    pub fn set_padding(&mut self, size: usize) -> Result<(), Error> {
        if size > u8::MAX as usize {
            return Err(Error::InvalidPadding);
        }

        let padding_offset = self.payload_offset + self.payload_size;
        if padding_offset + size > self.capacity {
            return Err(Error::InsufficientCapacity);
        }

        self.buffer.truncate(padding_offset);
        self.padding_size = size;

        if size > 0 {
            self.buffer.put_bytes(0, size - 1);
            self.buffer.put_u8(size as u8);
            self.buffer[0] |= PADDING_MASK;
        } else {
            self.buffer[0] &= !PADDING_MASK;
        }

        Ok(())
    }

    fn has_extension_block(&self) -> bool {
        self.buffer[0] & EXTENSION_MASK != 0
    }

    fn find_entry(&self, id: u8) -> Option<ExtensionEntry> {
        self.entries.iter().find(|it| it.id == id).copied()
    }

    fn find_extension(&self, kind: ExtensionType) -> Option<&[u8]> {
        let entry = self.find_entry(self.extensions.id(kind)?)?;
        let offset = entry.offset as usize;
        Some(&self.buffer[offset..offset + entry.length as usize])
    }

    fn allocate_extension(&mut self, kind: ExtensionType, length: usize) -> Result<&mut [u8], Error> {
        let id = self
            .extensions
            .id(kind)
            .ok_or(Error::ExtensionNotRegistered)?;

        self.allocate_raw_extension(id, length)
    }

    fn allocate_raw_extension(&mut self, id: u8, length: usize) -> Result<&mut [u8], Error> {
        if id == 0 {
            return Err(Error::InvalidExtensionId);
        }

        if length > MAX_VALUE_SIZE {
            return Err(Error::InvalidInput);
        }

        // already allocated, reuse the slot as long as the size matches.
        if let Some(entry) = self.find_entry(id) {
            if entry.length as usize != length {
                return Err(Error::ExtensionSizeMismatch);
            }

            let offset = entry.offset as usize;
            return Ok(&mut self.buffer[offset..offset + length]);
        }

        if self.payload_size > 0 || self.padding_size > 0 {
            return Err(Error::ExtensionAfterPayload);
        }

        let csrc_count = (self.buffer[0] & CSRC_COUNT_MASK) as usize;
        let extensions_offset = FIXED_HEADER_SIZE + csrc_count * 4 + 4;

        // a parsed block without elements is rewritten, unless its profile
        // is not one of rfc 8285.
        if self.extensions_size == 0 && self.has_extension_block() {
            let profile = u16::from_be_bytes([
                self.buffer[extensions_offset - 4],
                self.buffer[extensions_offset - 3],
            ]);

            if profile != ONE_BYTE_PROFILE && profile & TWO_BYTE_PROFILE_MASK != TWO_BYTE_PROFILE {
                return Err(Error::InvalidInput);
            }
        }

        // a zero length value also needs the two-byte form, see rfc 8285
        // section 4.2 and 4.3.
        let two_byte_required =
            id > ONE_BYTE_HEADER_MAX_ID || length > ONE_BYTE_MAX_VALUE_SIZE || length == 0;
        if two_byte_required && !self.extensions.extmap_allow_mixed() {
            return Err(Error::TwoByteHeaderNotAllowed);
        }

        let mut profile = if self.extensions_size > 0 {
            u16::from_be_bytes([
                self.buffer[extensions_offset - 4],
                self.buffer[extensions_offset - 3],
            ])
        } else if two_byte_required {
            TWO_BYTE_PROFILE
        } else {
            ONE_BYTE_PROFILE
        };

        let promote = profile == ONE_BYTE_PROFILE && two_byte_required && self.extensions_size > 0;
        let header_size = if profile == ONE_BYTE_PROFILE && !promote {
            ONE_BYTE_ELEMENT_HEADER_SIZE
        } else {
            TWO_BYTE_ELEMENT_HEADER_SIZE
        };

        // every element already written grows by one byte when promoted.
        let promoted_size = if promote { self.entries.len() } else { 0 };
        let extensions_size = self.extensions_size + promoted_size + header_size + length;
        if extensions_offset + padded(extensions_size) > self.capacity {
            return Err(Error::InsufficientCapacity);
        }

        // entries address values with 16 bit offsets.
        let offset = u16::try_from(extensions_offset + extensions_size - length)
            .map_err(|_| Error::InvalidInput)?;

        if promote {
            self.promote_to_two_byte_header(extensions_offset);
            profile = TWO_BYTE_PROFILE;
        }

        if self.extensions_size == 0 {
            self.buffer[0] |= EXTENSION_MASK;
            self.buffer.truncate(extensions_offset - 4);
            self.buffer.put_u16(profile);
            self.buffer.put_u16(0);
        }

        // drop the trailing zero padding, it is written again below.
        self.buffer.truncate(extensions_offset + self.extensions_size);
        if profile == ONE_BYTE_PROFILE {
            self.buffer.put_u8((id << 4) | (length as u8 - 1));
        } else {
            self.buffer.put_u8(id);
            self.buffer.put_u8(length as u8);
        }

        self.buffer.put_bytes(0, length);
        self.entries.push(ExtensionEntry {
            length: length as u8,
            offset,
            id,
        });

        self.extensions_size = extensions_size;
        self.payload_offset = extensions_offset + self.write_extensions_length(extensions_offset);

        let offset = offset as usize;
        Ok(&mut self.buffer[offset..offset + length])
    }

    // rewrite the one-byte element headers as two-byte headers, moving the
    // values backwards so that no value overwrites one still to be moved.
    fn promote_to_two_byte_header(&mut self, extensions_offset: usize) {
        self.buffer.truncate(extensions_offset + self.extensions_size);
        self.buffer.put_bytes(0, self.entries.len());
        self.entries.sort_by_key(|it| it.offset);

        let mut delta = self.entries.len();
        for entry in self.entries.iter_mut().rev() {
            let read = entry.offset as usize;
            let write = read + delta;

            self.buffer.copy_within(read..read + entry.length as usize, write);
            self.buffer[write - 1] = entry.length;
            self.buffer[write - 2] = entry.id;
            entry.offset = write as u16;
            delta -= 1;
        }

        // padding between elements may now hold stale header bytes.
        let mut cursor = extensions_offset;
        for entry in &self.entries {
            let header = entry.offset as usize - TWO_BYTE_ELEMENT_HEADER_SIZE;
            self.buffer[cursor..header].fill(0);
            cursor = entry.offset as usize + entry.length as usize;
        }

        self.buffer[extensions_offset - 4..extensions_offset - 2]
            .copy_from_slice(&TWO_BYTE_PROFILE.to_be_bytes());
        self.extensions_size += self.entries.len();
        self.payload_offset = extensions_offset + self.write_extensions_length(extensions_offset);
    }

    // writes the block length in 32 bit words and pads the elements with
    // zeros up to it, the buffer must end right after the last element.
    fn write_extensions_length(&mut self, extensions_offset: usize) -> usize {
        let size = padded(self.extensions_size);
        self.buffer[extensions_offset - 2..extensions_offset]
            .copy_from_slice(&((size / 4) as u16).to_be_bytes());
        self.buffer.put_bytes(0, size - self.extensions_size);
        size
    }
}

fn padded(size: usize) -> usize {
    size.div_ceil(4) * 4
}
