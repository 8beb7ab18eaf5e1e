//! Bit-field primitives: conversion between bit sequences and hexadecimal text, fixed-width chunking and parity.
//!
//! Bit sequences are represented as `&[bool]` in MSB-first order, so `[true, false, true, false]` is `0xA`.
//! All functions are pure and keep no state between calls.

use crate::error::{CodecError, Result};

/// Parity convention applied to every word of a packet.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParityConvention {
    /// The covered bits plus the parity bit hold an even number of ones.
    Even,
    /// The covered bits plus the parity bit hold an odd number of ones.
    Odd,
}

/// Which bits of a word are covered by its parity bit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParityScope {
    /// Every bit of the word except the parity bit itself.
    WordExceptParityBit,
    /// Only the payload bits following the word header.
    PayloadOnly,
}

/// The parity convention of the front-end link.
///
/// The parity bit is set when the covered bits hold an even number of ones, so the total is always odd.
pub const PARITY_CONVENTION: ParityConvention = ParityConvention::Odd;

/// The bits covered by the parity bit.
pub const PARITY_SCOPE: ParityScope = ParityScope::WordExceptParityBit;

/// Converts an MSB-first bit sequence into upper case hexadecimal.
///
/// # Errors
/// Returns [CodecError::Encoding] if the number of bits is not a multiple of 4.
///
/// # Example
/// ```
/// # use vmm_gbt_protocol::bits::to_hex;
/// let bits = [true, false, true, false, true, true, true, true];
/// assert_eq!(to_hex(&bits).unwrap(), "AF");
/// ```
pub fn to_hex(bits: &[bool]) -> Result<String> {
    if bits.len() % 4 != 0 {
        return Err(CodecError::Encoding(format!(
            "cannot convert {} bits to hex, width must be a multiple of 4",
            bits.len()
        )));
    }
    Ok(bits
        .chunks_exact(4)
        .map(|nibble| {
            let val = value_of(nibble) as u32;
            char::from_digit(val, 16)
                .unwrap_or('0')
                .to_ascii_uppercase()
        })
        .collect())
}

/// Converts hexadecimal text into an MSB-first bit sequence, 4 bits per digit.
///
/// # Errors
/// Returns [CodecError::Decoding] on the first character that is not a hex digit.
pub fn from_hex(hex: &str) -> Result<Vec<bool>> {
    let mut bits = Vec::with_capacity(hex.len() * 4);
    for (pos, c) in hex.chars().enumerate() {
        let digit = c.to_digit(16).ok_or_else(|| {
            CodecError::Decoding(format!("invalid hex digit {c:?} at position {pos} in {hex:?}"))
        })?;
        bits.extend(bits_of(u128::from(digit), 4));
    }
    Ok(bits)
}

/// Result of [chunk]: the chunks and how many padding elements were appended to the final one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunked<T> {
    /// All chunks, each exactly `width` long.
    pub chunks: Vec<Vec<T>>,
    /// Number of default elements appended to the final chunk.
    pub padding: usize,
}

impl<T> Chunked<T> {
    /// Number of elements in the final chunk that carry real data.
    pub fn last_chunk_fill(&self, width: usize) -> usize {
        if self.chunks.is_empty() {
            0
        } else {
            width - self.padding
        }
    }
}

/// Splits a sequence into chunks of `width` elements.
///
/// The final chunk is padded with `T::default()` (zero for bits and integers) if it is short, and the padding amount is reported in [Chunked::padding].
///
/// # Errors
/// Returns [CodecError::Encoding] if `width` is zero.
///
/// # Example
/// ```
/// # use vmm_gbt_protocol::bits::chunk;
/// let chunked = chunk(&[1u16, 2, 3, 4, 5], 2).unwrap();
/// assert_eq!(chunked.chunks, vec![vec![1, 2], vec![3, 4], vec![5, 0]]);
/// assert_eq!(chunked.padding, 1);
/// ```
pub fn chunk<T: Clone + Default>(sequence: &[T], width: usize) -> Result<Chunked<T>> {
    if width == 0 {
        return Err(CodecError::Encoding("chunk width cannot be zero".into()));
    }
    let mut chunks: Vec<Vec<T>> = sequence.chunks(width).map(<[T]>::to_vec).collect();
    let mut padding = 0;
    if let Some(last) = chunks.last_mut() {
        padding = width - last.len();
        last.resize(width, T::default());
    }
    Ok(Chunked { chunks, padding })
}

/// Computes the parity bit over `bits` with the link's [PARITY_CONVENTION].
#[inline]
pub fn find_parity(bits: &[bool]) -> bool {
    find_parity_with(bits, PARITY_CONVENTION)
}

/// Computes the parity bit over `bits` with an explicit convention.
pub fn find_parity_with(bits: &[bool], convention: ParityConvention) -> bool {
    let odd_ones = bits.iter().filter(|b| **b).count() % 2 == 1;
    match convention {
        ParityConvention::Even => odd_ones,
        ParityConvention::Odd => !odd_ones,
    }
}

/// Returns the lowest `width` bits of `value`, MSB first.
pub fn bits_of(value: u128, width: usize) -> Vec<bool> {
    debug_assert!(width <= 128);
    (0..width).rev().map(|i| (value >> i) & 1 == 1).collect()
}

/// Interprets an MSB-first bit sequence of at most 128 bits as an unsigned integer.
pub fn value_of(bits: &[bool]) -> u128 {
    debug_assert!(bits.len() <= 128);
    bits.iter().fold(0, |acc, b| (acc << 1) | u128::from(*b))
}
