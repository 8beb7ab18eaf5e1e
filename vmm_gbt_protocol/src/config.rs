//! Configuration of the packet builder.
//!
//! The [BuilderOpt] trait is what the builder reads its options through, so any config struct can drive it.
//! [BuilderConfig] is a plain implementation that can be deserialised from TOML or JSON.

use crate::error::{CodecError, Result};
use crate::words::packet_word::{
    header_count_ext_width, BITMAP_WIDTH, BCID_SLOT_WIDTH, HEADER_COUNT_WIDTH, MAX_WORD_WIDTH,
    PAYLOAD_OFFSET,
};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};

/// Smallest number of BCID slots a vertical word must hold.
const MIN_VERTICAL_SLOTS: usize = 1;
/// The fill nibble can count at most 15 slots.
const MAX_VERTICAL_SLOTS: usize = 15;
/// The header stores at least a 16 bit word count right after the word header.
const HEADER_COUNT_END: usize = PAYLOAD_OFFSET + HEADER_COUNT_WIDTH;

/// How hits of one VMM are laid out in packet words.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Pattern {
    /// One word per bunch crossing, the hit channels spread across a channel bitmap.
    #[default]
    Horizontal,
    /// One word per channel, the channel's BCIDs spread across slots, continuing in sequential words.
    Vertical,
}

impl Pattern {
    /// Value of the pattern nibble in the packet header.
    pub const fn nibble(self) -> u8 {
        match self {
            Pattern::Horizontal => 0x1,
            Pattern::Vertical => 0x2,
        }
    }

    /// Inverse of [Pattern::nibble].
    pub fn from_nibble(nibble: u8) -> Result<Self> {
        match nibble {
            0x1 => Ok(Pattern::Horizontal),
            0x2 => Ok(Pattern::Vertical),
            _ => Err(CodecError::Decoding(format!(
                "invalid pattern nibble {nibble:#X} in packet header"
            ))),
        }
    }

    /// Smallest word width in bits that can carry one unit of this pattern.
    pub const fn min_word_width(self) -> usize {
        let needed = match self {
            Pattern::Horizontal => PAYLOAD_OFFSET + BITMAP_WIDTH,
            Pattern::Vertical => PAYLOAD_OFFSET + MIN_VERTICAL_SLOTS * BCID_SLOT_WIDTH,
        };
        let needed = if needed < HEADER_COUNT_END {
            HEADER_COUNT_END
        } else {
            needed
        };
        // Round up to a whole byte
        (needed + 7) / 8 * 8
    }
}

impl Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Pattern::Horizontal => write!(f, "horizontal"),
            Pattern::Vertical => write!(f, "vertical"),
        }
    }
}

/// A validated combination of pattern and word width.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WordLayout {
    pattern: Pattern,
    width: usize,
}

impl WordLayout {
    /// Validates a word width for a pattern.
    ///
    /// # Errors
    /// [CodecError::Configuration] if the width is not byte-aligned, wider than 128 bits or too narrow for the pattern.
    pub fn new(pattern: Pattern, width: usize) -> Result<Self> {
        if width % 8 != 0 {
            return Err(CodecError::Configuration(format!(
                "word width must be byte-aligned, got {width} bits"
            )));
        }
        if width > MAX_WORD_WIDTH {
            return Err(CodecError::Configuration(format!(
                "word width of {width} bits exceeds the maximum of {MAX_WORD_WIDTH} bits"
            )));
        }
        if width < pattern.min_word_width() {
            return Err(CodecError::Configuration(format!(
                "word width of {width} bits is too narrow for the {pattern} pattern, minimum is {} bits",
                pattern.min_word_width()
            )));
        }
        Ok(Self { pattern, width })
    }

    /// Alignment pattern.
    #[inline]
    pub fn pattern(&self) -> Pattern {
        self.pattern
    }

    /// Word width in bits.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Word width in bytes.
    #[inline]
    pub fn width_bytes(&self) -> usize {
        self.width / 8
    }

    /// Most data words a packet header of this width can count.
    pub fn max_data_words(&self) -> usize {
        let max = (1_u64 << (HEADER_COUNT_WIDTH + header_count_ext_width(self.width))) - 1;
        usize::try_from(max).unwrap_or(usize::MAX)
    }

    /// Number of BCID slots in a vertical word.
    pub fn slots(&self) -> usize {
        ((self.width - PAYLOAD_OFFSET) / BCID_SLOT_WIDTH).min(MAX_VERTICAL_SLOTS)
    }
}

/// Options read by the packet builder.
pub trait BuilderOpt {
    /// Alignment pattern of hits in words.
    fn pattern(&self) -> Pattern;
    /// Width of each packet word in bits.
    fn word_width(&self) -> u16;
    /// Minimum BCID spacing between consecutive hits on one channel.
    fn bc_gap(&self) -> i32;
}

impl<T> BuilderOpt for &T
where
    T: BuilderOpt,
{
    fn pattern(&self) -> Pattern {
        (*self).pattern()
    }
    fn word_width(&self) -> u16 {
        (*self).word_width()
    }
    fn bc_gap(&self) -> i32 {
        (*self).bc_gap()
    }
}

impl<T> BuilderOpt for Box<T>
where
    T: BuilderOpt,
{
    fn pattern(&self) -> Pattern {
        (**self).pattern()
    }
    fn word_width(&self) -> u16 {
        (**self).word_width()
    }
    fn bc_gap(&self) -> i32 {
        (**self).bc_gap()
    }
}

impl<T> BuilderOpt for std::sync::Arc<T>
where
    T: BuilderOpt,
{
    fn pattern(&self) -> Pattern {
        (**self).pattern()
    }
    fn word_width(&self) -> u16 {
        (**self).word_width()
    }
    fn bc_gap(&self) -> i32 {
        (**self).bc_gap()
    }
}

/// Validates builder options, returning the word layout and the BC gap.
///
/// # Errors
/// [CodecError::Configuration] if `bc_gap` is not positive or the word width is invalid for the pattern.
pub fn validate_builder_opt(opt: &impl BuilderOpt) -> Result<(WordLayout, u32)> {
    let bc_gap = opt.bc_gap();
    if bc_gap <= 0 {
        return Err(CodecError::Configuration(format!(
            "bc_gap must be positive, got {bc_gap}"
        )));
    }
    let layout = WordLayout::new(opt.pattern(), usize::from(opt.word_width()))?;
    Ok((layout, bc_gap.unsigned_abs()))
}

/// Plain builder configuration.
///
/// # Example
/// ```
/// # use vmm_gbt_protocol::config::{BuilderConfig, Pattern};
/// let cfg: BuilderConfig = toml::from_str(r#"
///     pattern = "vertical"
///     word_width = 64
///     bc_gap = 5
/// "#).unwrap();
/// assert_eq!(cfg.pattern, Pattern::Vertical);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuilderConfig {
    /// Alignment pattern
    pub pattern: Pattern,
    /// Word width in bits
    pub word_width: u16,
    /// Minimum BCID spacing between hits on one channel
    pub bc_gap: i32,
}

impl Default for BuilderConfig {
    fn default() -> Self {
        Self {
            pattern: Pattern::Horizontal,
            word_width: 128,
            bc_gap: 1,
        }
    }
}

impl BuilderOpt for BuilderConfig {
    fn pattern(&self) -> Pattern {
        self.pattern
    }
    fn word_width(&self) -> u16 {
        self.word_width
    }
    fn bc_gap(&self) -> i32 {
        self.bc_gap
    }
}
