//! The [Packet]: a header word followed by the data words of one or more VMMs, and its interchange formats.

use super::hit::VmmId;
use super::packet_word::{PacketWord, MARKER_HEADER, MAX_WORD_WIDTH};
use crate::bits;
use crate::config::{Pattern, WordLayout};
use crate::error::{CodecError, Result};
use owo_colors::OwoColorize;
use std::collections::BTreeSet;
use std::fmt::{self, Display};

/// Width of one line in the GBT text format, in bits.
pub const GBT_LINE_BITS: usize = 32;
/// Line closing a packet in the GBT text format.
pub const GBT_FINISH_LINE: &str = "00000001 01";

/// One GBT transmission unit: a header word and the data words of the VMMs it combines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    region: u8,
    layout: WordLayout,
    vmms: BTreeSet<VmmId>,
    header: PacketWord,
    words: Vec<PacketWord>,
}

impl Packet {
    pub(crate) fn new(
        region: u8,
        layout: WordLayout,
        vmms: BTreeSet<VmmId>,
        header: PacketWord,
        words: Vec<PacketWord>,
    ) -> Self {
        Self {
            region,
            layout,
            vmms,
            header,
            words,
        }
    }

    /// Region (fibre) the packet was read out on.
    #[inline]
    pub fn region(&self) -> u8 {
        self.region
    }

    /// Alignment pattern of the data words.
    #[inline]
    pub fn pattern(&self) -> Pattern {
        self.layout.pattern()
    }

    /// Word layout of the packet.
    #[inline]
    pub fn layout(&self) -> WordLayout {
        self.layout
    }

    /// Width of each word in bits.
    #[inline]
    pub fn word_width(&self) -> usize {
        self.layout.width()
    }

    /// The VMMs whose data the packet carries.
    #[inline]
    pub fn vmms(&self) -> &BTreeSet<VmmId> {
        &self.vmms
    }

    /// The header word.
    #[inline]
    pub fn header(&self) -> &PacketWord {
        &self.header
    }

    /// The data words, in on-wire order.
    #[inline]
    pub fn words(&self) -> &[PacketWord] {
        &self.words
    }

    /// Mutable access to a data word, used to inject faults.
    pub fn word_mut(&mut self, index: usize) -> Option<&mut PacketWord> {
        self.words.get_mut(index)
    }

    /// Mutable access to the header word, used to inject faults.
    pub fn header_mut(&mut self) -> &mut PacketWord {
        &mut self.header
    }

    /// All words including the header, in on-wire order.
    pub fn all_words(&self) -> impl Iterator<Item = &PacketWord> {
        std::iter::once(&self.header).chain(self.words.iter())
    }

    /// Total number of words including the header.
    #[inline]
    pub fn len(&self) -> usize {
        self.words.len() + 1
    }

    /// Returns true if the packet has no data words.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Length of the packet in bits, always a whole number of words.
    #[inline]
    pub fn bit_len(&self) -> usize {
        self.len() * self.word_width()
    }

    /// One hexadecimal string per word, header first.
    pub fn to_hex_words(&self) -> Vec<String> {
        self.all_words().map(PacketWord::to_hex).collect()
    }

    /// Parses a packet from one hexadecimal string per word, header first.
    ///
    /// # Errors
    /// [CodecError::Decoding] or [CodecError::Identification] if the header is invalid or the words are inconsistent with it.
    /// Data words are not validated here, that is left to the checker.
    pub fn from_hex_words<S: AsRef<str>>(hex_words: &[S]) -> Result<Self> {
        let words = hex_words
            .iter()
            .map(|hex| PacketWord::from_hex(hex.as_ref()))
            .collect::<Result<Vec<_>>>()?;
        Self::from_words(words)
    }

    /// Big-endian bytes of all words, header first.
    pub fn to_bytes(&self) -> Vec<u8> {
        self.all_words().flat_map(|word| word.to_be_bytes()).collect()
    }

    /// Parses a packet from big-endian bytes.
    ///
    /// The word width is taken from the width field of the header word, found in the third byte.
    pub fn from_bytes(buf: &[u8]) -> Result<Self> {
        let width_bytes = buf.get(2).copied().map(usize::from).unwrap_or_default();
        if width_bytes == 0 || buf.len() % width_bytes != 0 {
            return Err(CodecError::Decoding(format!(
                "packet of {} bytes is not a whole number of {width_bytes} byte words",
                buf.len()
            )));
        }
        let words = buf
            .chunks_exact(width_bytes)
            .map(PacketWord::from_be_bytes)
            .collect::<Result<Vec<_>>>()?;
        Self::from_words(words)
    }

    /// Serialises the packet into the GBT text format: 32 bit lines of 8 hex digits followed by the region, closed by [GBT_FINISH_LINE].
    ///
    /// The final line is zero-padded if the packet is not a whole number of lines.
    ///
    /// # Example
    /// ```
    /// # use vmm_gbt_protocol::words::packet::Packet;
    /// # use vmm_gbt_protocol::test_data::GOLDEN_HORIZONTAL_HEX;
    /// let packet = Packet::from_hex_words(&GOLDEN_HORIZONTAL_HEX).unwrap();
    /// let lines = packet.to_gbt_lines().unwrap();
    /// assert_eq!(lines.first().unwrap(), "C1410C80 20");
    /// assert_eq!(lines.last().unwrap(), "00000001 01");
    /// ```
    pub fn to_gbt_lines(&self) -> Result<Vec<String>> {
        let stream: Vec<bool> = self.all_words().flat_map(PacketWord::to_bits).collect();
        let chunked = bits::chunk(&stream, GBT_LINE_BITS)?;
        if chunked.padding != 0 {
            log::trace!(
                "Last GBT line of region {} padded with {} bits",
                self.region,
                chunked.padding
            );
        }
        let mut lines = chunked
            .chunks
            .iter()
            .map(|line| -> Result<String> {
                Ok(format!("{} {:02}", bits::to_hex(line)?, self.region))
            })
            .collect::<Result<Vec<String>>>()?;
        lines.push(GBT_FINISH_LINE.to_string());
        Ok(lines)
    }

    /// Parses a packet from the GBT text format produced by [Packet::to_gbt_lines].
    ///
    /// Lines after the finish line are ignored. The padding of the final line is stripped using the header's word count.
    pub fn from_gbt_lines<S: AsRef<str>>(lines: &[S]) -> Result<Self> {
        let mut stream: Vec<bool> = Vec::with_capacity(lines.len() * GBT_LINE_BITS);
        let mut region: Option<u8> = None;
        for (line_no, line) in lines.iter().map(AsRef::as_ref).enumerate() {
            let line = line.trim();
            if line == GBT_FINISH_LINE {
                break;
            }
            let (hex, line_region) = line.split_once(' ').ok_or_else(|| {
                CodecError::Decoding(format!("line {line_no}: expected `<hex> <region>`, got {line:?}"))
            })?;
            let line_region: u8 = line_region.trim().parse().map_err(|_| {
                CodecError::Decoding(format!("line {line_no}: invalid region {line_region:?}"))
            })?;
            match region {
                Some(r) if r != line_region => {
                    return Err(CodecError::Decoding(format!(
                        "line {line_no}: region {line_region} differs from region {r} of the packet"
                    )))
                }
                _ => region = Some(line_region),
            }
            if hex.len() * 4 != GBT_LINE_BITS {
                return Err(CodecError::Decoding(format!(
                    "line {line_no}: expected {} hex digits, got {hex:?}",
                    GBT_LINE_BITS / 4
                )));
            }
            stream.extend(bits::from_hex(hex)?);
        }

        // The header's width byte sits in the first line
        let width = bits::value_of(stream.get(16..24).unwrap_or_default()) as usize * 8;
        if width == 0 || width > MAX_WORD_WIDTH || width > stream.len() {
            return Err(CodecError::Decoding(format!(
                "invalid word width of {width} bits in GBT packet header"
            )));
        }
        let header = PacketWord::from_value(bits::value_of(&stream[..width]), width)?;
        let total_bits = (header.header_word_count() + 1) * width;
        if total_bits > stream.len() || stream.len() - total_bits >= GBT_LINE_BITS {
            return Err(CodecError::Decoding(format!(
                "header announces {total_bits} bits but the GBT lines hold {} bits",
                stream.len()
            )));
        }
        if stream[total_bits..].iter().any(|bit| *bit) {
            return Err(CodecError::Decoding(
                "padding of the final GBT line is not zero".to_string(),
            ));
        }
        let words = stream[..total_bits]
            .chunks_exact(width)
            .map(|word_bits| PacketWord::from_value(bits::value_of(word_bits), width))
            .collect::<Result<Vec<_>>>()?;
        let packet = Self::from_words(words)?;
        if region.is_some_and(|r| r != packet.region) {
            return Err(CodecError::Decoding(format!(
                "line region {region:?} differs from header region {}",
                packet.region
            )));
        }
        Ok(packet)
    }

    /// Builds a packet from parsed words, validating the header against them.
    fn from_words(mut words: Vec<PacketWord>) -> Result<Self> {
        if words.is_empty() {
            return Err(CodecError::Decoding("a packet needs at least a header word".into()));
        }
        let header = words.remove(0);
        if header.marker() != MARKER_HEADER {
            return Err(CodecError::Identification(format!(
                "no packet header marker in first word {header}, found {:#X}",
                header.marker()
            )));
        }
        let layout = WordLayout::new(header.header_pattern()?, header.width())
            .map_err(|e| CodecError::Decoding(format!("packet header {header}: {e}")))?;
        if header.header_width_bytes() != layout.width_bytes() {
            return Err(CodecError::Decoding(format!(
                "header announces {} byte words, but words are {} bytes wide",
                header.header_width_bytes(),
                layout.width_bytes()
            )));
        }
        if header.header_word_count() != words.len() {
            return Err(CodecError::Decoding(format!(
                "header announces {} data words, found {}",
                header.header_word_count(),
                words.len()
            )));
        }
        if let Some(odd) = words.iter().find(|w| w.width() != layout.width()) {
            return Err(CodecError::Decoding(format!(
                "data word {odd} is {} bits wide, expected {}",
                odd.width(),
                layout.width()
            )));
        }
        let vmms = words.iter().filter_map(|w| w.vmm_id().ok()).collect();
        Ok(Self::new(header.key(), layout, vmms, header, words))
    }
}

impl Display for Packet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let title = format!(
            "GBT packet region {} | {} pattern | {} bit words | {} data words",
            self.region,
            self.pattern(),
            self.word_width(),
            self.words.len()
        );
        writeln!(f, "{}", title.white().bold())?;
        writeln!(f, "  {:>4}: {}", "hdr".bright_blue(), self.header)?;
        for (idx, word) in self.words.iter().enumerate() {
            match word.vmm_id() {
                Ok(vmm) => writeln!(f, "  {idx:>4}: {word} VMM {vmm}")?,
                Err(_) => writeln!(f, "  {idx:>4}: {word} {}", "unidentified".red())?,
            }
        }
        Ok(())
    }
}
