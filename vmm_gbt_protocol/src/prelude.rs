//! Includes all the basics for building and parsing VMM/GBT packets.

pub use super::bits::{chunk, find_parity, to_hex, Chunked};
pub use super::builder::{make_packet, PacketBuilder, VmmHits};
pub use super::error::{CodecError, Result};
pub use super::read_gbt_packets;
pub use super::write_gbt_packets;
// Words and records
pub use super::words::hit::pair_of;
pub use super::words::hit::ChannelKey;
pub use super::words::hit::HitRecord;
pub use super::words::hit::VmmId;
pub use super::words::hit::{MAX_BCID, N_CHANNELS, N_PLANES, N_VMMS_PER_PLANE};
pub use super::words::hit_map::HitMap;
pub use super::words::packet::Packet;
pub use super::words::packet::GBT_FINISH_LINE;
pub use super::words::packet_word::PacketWord;

// Builder configuration/options
pub use super::config::BuilderConfig;
pub use super::config::BuilderOpt;
pub use super::config::Pattern;
pub use super::config::WordLayout;
// Synthetic tracks
pub use super::synth::{BcTiming, HorizontalPattern, Section, VerticalPattern};
