//! Words and records of the VMM/GBT readout: hit records, hit maps, packet words and packets.
pub mod hit;
pub mod hit_map;
pub mod packet;
pub mod packet_word;
