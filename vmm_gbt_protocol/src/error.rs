//! Error types shared by the codec, the builder and packet parsing.

use thiserror::Error;

/// Errors produced while encoding, building or decoding GBT packets.
///
/// Builder-stage variants ([CodecError::Configuration], [CodecError::InvalidHit], [CodecError::MixedRegions], ...) abort the build.
/// Decode-stage variants ([CodecError::Decoding], [CodecError::Identification], [CodecError::Alignment]) are recorded per word by the checker and never abort a check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CodecError {
    /// A bit sequence could not be represented, e.g. its width is not a multiple of 4.
    #[error("encoding error: {0}")]
    Encoding(String),

    /// A field was placed outside the word it is aligned into.
    #[error("alignment error: field of {field_width} bit(s) at offset {offset} does not fit in a {word_width} bit word")]
    Alignment {
        /// Bit offset counted from the MSB of the word
        offset: usize,
        /// Width of the field being placed
        field_width: usize,
        /// Width of the target word
        word_width: usize,
    },

    /// A word is structurally inconsistent with the block it belongs to.
    #[error("alignment error: {0}")]
    Structure(String),

    /// Invalid builder configuration.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Raw data could not be decoded, e.g. a parity failure or an invalid hex digit.
    #[error("decoding error: {0}")]
    Decoding(String),

    /// The source VMM of a word could not be recovered.
    #[error("identification error: {0}")]
    Identification(String),

    /// A hit record with a field outside its valid range.
    #[error("invalid hit: {0}")]
    InvalidHit(String),

    /// Hits from more than one region were given for a single packet.
    #[error("hits span several regions: {0:?}")]
    MixedRegions(Vec<u8>),

    /// No hits were given to build a packet from.
    #[error("cannot build a packet from an empty hit set")]
    EmptyHitSet,

    /// The same VMM appeared twice in the word sets to combine.
    #[error("VMM {0} appears more than once in the word sets to combine")]
    DuplicateVmm(String),
}

impl CodecError {
    /// Returns true for errors that degrade a single word rather than aborting a build.
    pub fn is_word_fault(&self) -> bool {
        matches!(
            self,
            CodecError::Decoding(_)
                | CodecError::Identification(_)
                | CodecError::Alignment { .. }
                | CodecError::Structure(_)
        )
    }
}

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, CodecError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_alignment_error_message() {
        let err = CodecError::Alignment {
            offset: 120,
            field_width: 12,
            word_width: 128,
        };
        assert_eq!(
            err.to_string(),
            "alignment error: field of 12 bit(s) at offset 120 does not fit in a 128 bit word"
        );
        assert!(err.is_word_fault());
    }

    #[test]
    fn test_builder_errors_are_not_word_faults() {
        assert!(!CodecError::Configuration("bc_gap".into()).is_word_fault());
        assert!(!CodecError::EmptyHitSet.is_word_fault());
        assert!(!CodecError::MixedRegions(vec![20, 21]).is_word_fault());
    }
}
