//! Definition of the [PacketWord] and its field layout.
//!
//! Every word starts with a 32 bit word header, offsets are counted from the most significant bit:
//!
//! | Bits    | Field                                                                    |
//! |---------|--------------------------------------------------------------------------|
//! | 0..4    | marker: `0xC` packet header, `0xA` first word of a VMM, `0xB` continuation |
//! | 4..12   | key: `plane << 4 \| vmm` in data words, the region in the packet header  |
//! | 12..24  | index: BCID (horizontal), channel (vertical), pattern + width (header)   |
//! | 24      | parity bit                                                               |
//! | 25..28  | reserved, always 0                                                       |
//! | 28..32  | fill: number of BCID slots in use (vertical)                             |
//! | 32..    | payload                                                                  |
//!
//! The packet header keeps the low 16 bits of its data word count at 32..48 and the upper bits, if the word has room, from bit 48 on.

use crate::bits::{self, ParityScope, PARITY_SCOPE};
use crate::config::{Pattern, WordLayout};
use crate::error::{CodecError, Result};
use crate::words::hit::VmmId;
use byteorder::{BigEndian, ByteOrder};
use std::fmt::{self, Display};

/// Marker of the packet header word.
pub const MARKER_HEADER: u8 = 0xC;
/// Marker of the first word of a VMM block.
pub const MARKER_VMM_START: u8 = 0xA;
/// Marker of a word continuing the current VMM block.
pub const MARKER_VMM_CONT: u8 = 0xB;

/// Offset of the marker nibble.
pub const MARKER_OFFSET: usize = 0;
/// Width of the marker nibble.
pub const MARKER_WIDTH: usize = 4;
/// Offset of the key byte.
pub const KEY_OFFSET: usize = 4;
/// Width of the key byte.
pub const KEY_WIDTH: usize = 8;
/// Offset of the index field.
pub const INDEX_OFFSET: usize = 12;
/// Width of the index field.
pub const INDEX_WIDTH: usize = 12;
/// Offset of the parity bit.
pub const PARITY_OFFSET: usize = 24;
/// Offset of the reserved bits.
pub const RESERVED_OFFSET: usize = 25;
/// Width of the reserved bits.
pub const RESERVED_WIDTH: usize = 3;
/// Offset of the fill nibble.
pub const FILL_OFFSET: usize = 28;
/// Width of the fill nibble.
pub const FILL_WIDTH: usize = 4;
/// Offset of the payload.
pub const PAYLOAD_OFFSET: usize = 32;
/// Width of one BCID slot in a vertical word.
pub const BCID_SLOT_WIDTH: usize = 12;
/// Width of the channel bitmap in a horizontal word.
pub const BITMAP_WIDTH: usize = 64;
/// Width of the low part of the data word count in the packet header.
pub const HEADER_COUNT_WIDTH: usize = 16;
/// Offset of the upper part of the data word count in the packet header.
pub const HEADER_COUNT_EXT_OFFSET: usize = PAYLOAD_OFFSET + HEADER_COUNT_WIDTH;
/// Widest upper part of the data word count.
pub const MAX_HEADER_COUNT_EXT_WIDTH: usize = 32;
/// Words are held in a `u128`.
pub const MAX_WORD_WIDTH: usize = 128;

/// Payload offset of each channel's bit in a horizontal word's bitmap, channel 0 is the least significant bit.
pub const CHANNEL_OFFSETS: [u8; BITMAP_WIDTH] = channel_offset_table();

const fn channel_offset_table() -> [u8; BITMAP_WIDTH] {
    let mut table = [0; BITMAP_WIDTH];
    let mut ch = 0;
    while ch < BITMAP_WIDTH {
        table[ch] = (BITMAP_WIDTH - 1 - ch) as u8;
        ch += 1;
    }
    table
}

/// Bit offset of a channel in a horizontal word, counted from the MSB of the word.
pub fn channel_bit_offset(channel: u8) -> Option<usize> {
    CHANNEL_OFFSETS
        .get(usize::from(channel))
        .map(|offset| PAYLOAD_OFFSET + usize::from(*offset))
}

/// Bit offset of a BCID slot in a vertical word, counted from the MSB of the word.
#[inline]
pub const fn slot_bit_offset(slot: usize) -> usize {
    PAYLOAD_OFFSET + slot * BCID_SLOT_WIDTH
}

/// Width of the upper part of the data word count in a header word of `width` bits.
pub const fn header_count_ext_width(width: usize) -> usize {
    let room = width.saturating_sub(HEADER_COUNT_EXT_OFFSET);
    if room < MAX_HEADER_COUNT_EXT_WIDTH {
        room
    } else {
        MAX_HEADER_COUNT_EXT_WIDTH
    }
}

#[inline]
const fn mask(width: usize) -> u128 {
    if width >= 128 {
        u128::MAX
    } else {
        (1 << width) - 1
    }
}

/// A single word of a GBT packet, up to 128 bits wide.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PacketWord {
    bits: u128,
    width: u8,
}

impl PacketWord {
    /// A word of `width` bits with all bits cleared.
    ///
    /// # Errors
    /// [CodecError::Configuration] if the width is not byte-aligned or exceeds 128 bits.
    pub fn zeroed(width: usize) -> Result<Self> {
        Self::from_value(0, width)
    }

    /// A word of `width` bits holding `value`.
    pub fn from_value(value: u128, width: usize) -> Result<Self> {
        if width == 0 || width % 8 != 0 || width > MAX_WORD_WIDTH {
            return Err(CodecError::Configuration(format!(
                "invalid word width of {width} bits"
            )));
        }
        if value & !mask(width) != 0 {
            return Err(CodecError::Encoding(format!(
                "value {value:#X} does not fit in a {width} bit word"
            )));
        }
        Ok(Self {
            bits: value,
            width: width as u8,
        })
    }

    /// Builds a sealed packet header word.
    ///
    /// # Errors
    /// [CodecError::Configuration] if the header of the layout's width can't count `data_words`.
    pub fn header(layout: WordLayout, region: u8, data_words: usize) -> Result<Self> {
        if data_words > layout.max_data_words() {
            return Err(CodecError::Configuration(format!(
                "{data_words} data words exceed the {} a header of {} bit words can count, use wider words",
                layout.max_data_words(),
                layout.width()
            )));
        }
        let count = data_words as u128;
        let mut word = Self::zeroed(layout.width())?;
        word.set_field(MARKER_OFFSET, MARKER_WIDTH, u128::from(MARKER_HEADER))?;
        word.set_field(KEY_OFFSET, KEY_WIDTH, u128::from(region))?;
        word.set_field(
            INDEX_OFFSET,
            INDEX_WIDTH,
            (u128::from(layout.pattern().nibble()) << 8) | layout.width_bytes() as u128,
        )?;
        word.set_field(
            PAYLOAD_OFFSET,
            HEADER_COUNT_WIDTH,
            count & mask(HEADER_COUNT_WIDTH),
        )?;
        let ext_width = header_count_ext_width(layout.width());
        if ext_width > 0 {
            word.set_field(HEADER_COUNT_EXT_OFFSET, ext_width, count >> HEADER_COUNT_WIDTH)?;
        }
        word.seal();
        Ok(word)
    }

    /// Raw value of the word.
    #[inline]
    pub fn value(&self) -> u128 {
        self.bits
    }

    /// Width of the word in bits.
    #[inline]
    pub fn width(&self) -> usize {
        usize::from(self.width)
    }

    /// Reads a field at an MSB-relative offset.
    ///
    /// Bits outside the word read as zero.
    pub fn field(&self, offset: usize, width: usize) -> u128 {
        if width == 0 || offset + width > self.width() {
            return 0;
        }
        let shift = self.width() - offset - width;
        (self.bits >> shift) & mask(width)
    }

    /// Writes a field at an MSB-relative offset, replacing the previous content of the field.
    ///
    /// # Errors
    /// [CodecError::Alignment] if the field does not fit in the word, [CodecError::Encoding] if the value does not fit in the field.
    pub fn set_field(&mut self, offset: usize, width: usize, value: u128) -> Result<()> {
        if width == 0 || offset + width > self.width() {
            return Err(CodecError::Alignment {
                offset,
                field_width: width,
                word_width: self.width(),
            });
        }
        if value & !mask(width) != 0 {
            return Err(CodecError::Encoding(format!(
                "value {value:#X} does not fit in a {width} bit field"
            )));
        }
        let shift = self.width() - offset - width;
        self.bits = (self.bits & !(mask(width) << shift)) | (value << shift);
        Ok(())
    }

    /// Inverts a single bit, used to inject faults.
    pub fn flip_bit(&mut self, offset: usize) -> Result<()> {
        let current = self.field(offset, 1);
        self.set_field(offset, 1, current ^ 1)
    }

    /// Marker nibble.
    #[inline]
    pub fn marker(&self) -> u8 {
        self.field(MARKER_OFFSET, MARKER_WIDTH) as u8
    }

    /// Key byte.
    #[inline]
    pub fn key(&self) -> u8 {
        self.field(KEY_OFFSET, KEY_WIDTH) as u8
    }

    /// Index field.
    #[inline]
    pub fn index(&self) -> u16 {
        self.field(INDEX_OFFSET, INDEX_WIDTH) as u16
    }

    /// Stored parity bit.
    #[inline]
    pub fn parity_bit(&self) -> bool {
        self.field(PARITY_OFFSET, 1) == 1
    }

    /// Reserved bits, expected to be zero.
    #[inline]
    pub fn reserved(&self) -> u8 {
        self.field(RESERVED_OFFSET, RESERVED_WIDTH) as u8
    }

    /// Fill nibble.
    #[inline]
    pub fn fill(&self) -> u8 {
        self.field(FILL_OFFSET, FILL_WIDTH) as u8
    }

    /// Returns true if this is a packet header word.
    #[inline]
    pub fn is_header(&self) -> bool {
        self.marker() == MARKER_HEADER
    }

    /// Returns true if this word opens a new VMM block.
    #[inline]
    pub fn is_vmm_start(&self) -> bool {
        self.marker() == MARKER_VMM_START
    }

    /// The word's bits, MSB first.
    pub fn to_bits(&self) -> Vec<bool> {
        bits::bits_of(self.bits, self.width())
    }

    /// The bits covered by the parity bit according to [PARITY_SCOPE].
    pub fn parity_input(&self) -> Vec<bool> {
        let mut word_bits = self.to_bits();
        match PARITY_SCOPE {
            ParityScope::WordExceptParityBit => {
                let _ = word_bits.remove(PARITY_OFFSET);
                word_bits
            }
            ParityScope::PayloadOnly => word_bits.split_off(PAYLOAD_OFFSET),
        }
    }

    /// The parity bit the word's content calls for.
    pub fn expected_parity(&self) -> bool {
        bits::find_parity(&self.parity_input())
    }

    /// Returns true if the stored parity bit matches the word's content.
    pub fn parity_ok(&self) -> bool {
        self.expected_parity() == self.parity_bit()
    }

    /// Sets the parity bit from the word's content.
    pub fn seal(&mut self) {
        let parity = u128::from(self.expected_parity());
        let shift = self.width() - PARITY_OFFSET - 1;
        self.bits = (self.bits & !(1 << shift)) | (parity << shift);
    }

    /// Recovers the source VMM of a data word from its marker and key byte.
    ///
    /// # Errors
    /// [CodecError::Identification] if the marker is not a VMM marker or the key names a VMM that doesn't exist.
    pub fn vmm_id(&self) -> Result<VmmId> {
        let marker = self.marker();
        if marker != MARKER_VMM_START && marker != MARKER_VMM_CONT {
            return Err(CodecError::Identification(format!(
                "no VMM marker at bit {MARKER_OFFSET} of word {self}, found {marker:#X}"
            )));
        }
        VmmId::from_key_byte(self.key()).map_err(|e| {
            CodecError::Identification(format!("key byte {:#04X} of word {self}: {e}", self.key()))
        })
    }

    /// The alignment pattern stored in a header word.
    pub fn header_pattern(&self) -> Result<Pattern> {
        Pattern::from_nibble((self.index() >> 8) as u8)
    }

    /// The word width in bytes stored in a header word.
    #[inline]
    pub fn header_width_bytes(&self) -> usize {
        usize::from(self.index() & 0xFF)
    }

    /// The data word count stored in a header word.
    #[inline]
    pub fn header_word_count(&self) -> usize {
        let ext = self.field(
            HEADER_COUNT_EXT_OFFSET,
            header_count_ext_width(self.width()),
        );
        ((ext << HEADER_COUNT_WIDTH) | self.field(PAYLOAD_OFFSET, HEADER_COUNT_WIDTH)) as usize
    }

    /// Upper case hexadecimal representation, one digit per nibble.
    pub fn to_hex(&self) -> String {
        format!("{:0width$X}", self.bits, width = self.width() / 4)
    }

    /// Parses a word from hexadecimal text, the width is 4 bits per digit.
    pub fn from_hex(hex: &str) -> Result<Self> {
        let word_bits = bits::from_hex(hex.trim())?;
        if word_bits.len() > MAX_WORD_WIDTH {
            return Err(CodecError::Decoding(format!(
                "hex word {hex:?} is wider than {MAX_WORD_WIDTH} bits"
            )));
        }
        Self::from_value(bits::value_of(&word_bits), word_bits.len())
            .map_err(|e| CodecError::Decoding(format!("hex word {hex:?}: {e}")))
    }

    /// Big-endian bytes of the word.
    pub fn to_be_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0; self.width() / 8];
        BigEndian::write_uint128(&mut buf, self.bits, self.width() / 8);
        buf
    }

    /// Reads a word from big-endian bytes, the width is 8 bits per byte.
    pub fn from_be_bytes(buf: &[u8]) -> Result<Self> {
        if buf.is_empty() || buf.len() > MAX_WORD_WIDTH / 8 {
            return Err(CodecError::Decoding(format!(
                "cannot read a word from {} bytes",
                buf.len()
            )));
        }
        Self::from_value(BigEndian::read_uint128(buf, buf.len()), buf.len() * 8)
    }
}

impl Display for PacketWord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}
