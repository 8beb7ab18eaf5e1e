#![deny(unused_extern_crates)]
#![deny(missing_docs)]
#![warn(missing_debug_implementations)]
#![warn(missing_copy_implementations)]
#![warn(trivial_casts, trivial_numeric_casts)]
#![warn(unused_results)]
#![warn(unused_import_braces)]
#![warn(variant_size_differences)]
#![warn(
    clippy::option_filter_map,
    clippy::manual_filter_map,
    clippy::if_not_else,
    clippy::nonminimal_bool
)]
// Performance lints
#![warn(
    clippy::needless_pass_by_value,
    clippy::unnecessary_wraps,
    clippy::mutex_integer,
    clippy::mem_forget,
    clippy::maybe_infinite_iter
)]

//! Codec for the packets a GBT link carries from VMM front-end chips.
//!
//! Hits ([HitRecord](words::hit::HitRecord)) are aligned into fixed-width words, one VMM block after the other,
//! each word protected by a parity bit, and prefixed by a header word to form a [Packet](words::packet::Packet).
//! The [builder] module turns hits into packets, the [bits] module holds the bit-level helpers (hex, chunking, parity)
//! and the [synth] module generates synthetic hit streams from straight tracks.
//!
//! # Example
//! Build a packet from a single hit and print it as hex words
//! ```
//! use vmm_gbt_protocol::prelude::*;
//!
//! let hit = HitRecord::new(3, 0, 100, 0, 20).unwrap();
//! let config = BuilderConfig {
//!     pattern: Pattern::Horizontal,
//!     word_width: 96,
//!     bc_gap: 1,
//! };
//! let packet = make_packet(&[hit], &config).unwrap();
//!
//! assert_eq!(packet.to_hex_words(), vec!["C1410C800001000000000000", "A00064800000000000000008"]);
//! ```
//!
//! The same packet in the text format written to GBT link files, 32 bits per line tagged with the region
//! ```
//! # use vmm_gbt_protocol::prelude::*;
//! # let hit = HitRecord::new(3, 0, 100, 0, 20).unwrap();
//! # let config = BuilderConfig { pattern: Pattern::Horizontal, word_width: 96, bc_gap: 1 };
//! # let packet = make_packet(&[hit], &config).unwrap();
//! let lines = packet.to_gbt_lines().unwrap();
//! assert_eq!(lines[0], "C1410C80 20");
//! assert_eq!(lines.last().unwrap(), GBT_FINISH_LINE);
//!
//! let parsed = Packet::from_gbt_lines(&lines).unwrap();
//! assert_eq!(parsed, packet);
//! ```
//!
//! ## Customize the builder with a config
//!
//! Implement [BuilderOpt](config::BuilderOpt) on your own config struct and pass it to the [PacketBuilder](builder::PacketBuilder)
//!
//! ```
//! use vmm_gbt_protocol::config::{BuilderOpt, Pattern};
//! use vmm_gbt_protocol::builder::PacketBuilder;
//!
//! struct MyCfg;
//!
//! impl BuilderOpt for MyCfg {
//!     fn pattern(&self) -> Pattern {
//!         Pattern::Vertical
//!     }
//!
//!     fn word_width(&self) -> u16 {
//!         64
//!     }
//!
//!     fn bc_gap(&self) -> i32 {
//!         2
//!     }
//! }
//!
//! let builder = PacketBuilder::new(&MyCfg).unwrap();
//! assert_eq!(builder.layout().slots(), 2);
//! ```

pub mod bits;
pub mod builder;
pub mod config;
pub mod error;
pub mod prelude;
pub mod synth;
pub mod test_data;
pub mod words;

use prelude::{Packet, GBT_FINISH_LINE};
use std::io::{BufRead, Write};

/// Reads every packet from a GBT text stream.
///
/// Packets are separated by the finish line, blank lines are ignored. Trailing lines without a finish line form a last packet.
///
/// # Errors
/// The first I/O or decoding error encountered.
pub fn read_gbt_packets(reader: impl BufRead) -> error::Result<Vec<Packet>> {
    let mut packets = Vec::new();
    let mut pending: Vec<String> = Vec::new();
    for line in reader.lines() {
        let line = line.map_err(|e| error::CodecError::Decoding(e.to_string()))?;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        pending.push(line.to_owned());
        if line == GBT_FINISH_LINE {
            packets.push(Packet::from_gbt_lines(&pending)?);
            pending.clear();
        }
    }
    if !pending.is_empty() {
        log::warn!(
            "GBT stream ended without a finish line, {} lines pending",
            pending.len()
        );
        packets.push(Packet::from_gbt_lines(&pending)?);
    }
    log::debug!("Read {} packets from GBT stream", packets.len());
    Ok(packets)
}

/// Writes packets to a GBT text stream, one line per 32 bits.
///
/// # Errors
/// The first I/O or encoding error encountered.
pub fn write_gbt_packets<'a>(
    mut writer: impl Write,
    packets: impl IntoIterator<Item = &'a Packet>,
) -> error::Result<()> {
    for packet in packets {
        for line in packet.to_gbt_lines()? {
            writeln!(writer, "{line}").map_err(|e| error::CodecError::Encoding(e.to_string()))?;
        }
    }
    writer
        .flush()
        .map_err(|e| error::CodecError::Encoding(e.to_string()))
}
