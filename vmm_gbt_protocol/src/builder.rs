//! Assembles hit records into [Packet]s.
//!
//! The free functions [align], [align_vmm] and [combine] are the building blocks, [PacketBuilder] chains them with gap suppression
//! behind a validated configuration.

use crate::bits;
use crate::config::{validate_builder_opt, BuilderOpt, Pattern, WordLayout};
use crate::error::{CodecError, Result};
use crate::words::hit::{HitRecord, VmmId};
use crate::words::hit_map::HitMap;
use crate::words::packet::Packet;
use crate::words::packet_word::{
    channel_bit_offset, slot_bit_offset, PacketWord, BCID_SLOT_WIDTH, FILL_OFFSET, FILL_WIDTH,
    INDEX_OFFSET, INDEX_WIDTH, KEY_OFFSET, KEY_WIDTH, MARKER_OFFSET, MARKER_VMM_CONT,
    MARKER_VMM_START, MARKER_WIDTH, PAYLOAD_OFFSET,
};
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};

/// The hits of one VMM: sorted BCIDs per channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VmmHits {
    /// Source VMM
    pub vmm: VmmId,
    /// BCIDs per channel
    pub channels: BTreeMap<u8, Vec<u16>>,
}

impl VmmHits {
    /// Splits a hit map of a single region into per-VMM hit sets, ordered by VMM.
    pub fn from_hit_map(map: &HitMap) -> Vec<Self> {
        map.iter()
            .group_by(|(key, _)| key.vmm)
            .into_iter()
            .map(|(vmm, channels)| VmmHits {
                vmm,
                channels: channels
                    .map(|(key, bcids)| (key.channel, bcids.clone()))
                    .collect(),
            })
            .collect()
    }
}

/// Hits surviving gap suppression and those that were dropped.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GapFiltered {
    /// Surviving hits, sorted
    pub kept: Vec<HitRecord>,
    /// Hits that fell within the BC gap of an earlier hit on the same channel
    pub dropped: Vec<HitRecord>,
}

/// Applies the front-end dead time: on each channel a hit closer than `bc_gap` to the last kept hit is dropped.
///
/// # Example
/// ```
/// # use vmm_gbt_protocol::builder::suppress_gap;
/// # use vmm_gbt_protocol::words::hit::HitRecord;
/// let hits = [
///     HitRecord::new(3, 0, 101, 0, 20).unwrap(),
///     HitRecord::new(3, 0, 100, 0, 20).unwrap(),
/// ];
/// let filtered = suppress_gap(&hits, 5);
/// assert_eq!(filtered.kept, vec![hits[1]]);
/// assert_eq!(filtered.dropped, vec![hits[0]]);
/// ```
pub fn suppress_gap(hits: &[HitRecord], bc_gap: u32) -> GapFiltered {
    let mut sorted = hits.to_vec();
    sorted.sort_unstable();
    let mut filtered = GapFiltered::default();
    let mut last_kept: Option<HitRecord> = None;
    for hit in sorted {
        match last_kept {
            Some(prev)
                if prev.key() == hit.key() && u32::from(hit.bcid() - prev.bcid()) < bc_gap =>
            {
                log::debug!(
                    "Dropping hit on {} at BCID {}, within {bc_gap} BCs of BCID {}",
                    hit.key(),
                    hit.bcid(),
                    prev.bcid()
                );
                filtered.dropped.push(hit);
            }
            _ => {
                last_kept = Some(hit);
                filtered.kept.push(hit);
            }
        }
    }
    filtered
}

/// Places a field at an MSB-relative bit offset of a shared word.
///
/// # Errors
/// [CodecError::Alignment] if the offset puts the field (partly) outside the word.
#[inline]
pub fn align(word: &mut PacketWord, field: u128, field_width: usize, offset: usize) -> Result<()> {
    word.set_field(offset, field_width, field)
}

/// Aligns all hits of one VMM into words of the given layout.
///
/// Markers and parity are left for [combine].
pub fn align_vmm(vmm_hits: &VmmHits, layout: WordLayout) -> Result<Vec<PacketWord>> {
    match layout.pattern() {
        Pattern::Horizontal => align_vmm_horizontal(vmm_hits, layout),
        Pattern::Vertical => align_vmm_vertical(vmm_hits, layout),
    }
}

fn vmm_word(vmm: VmmId, layout: WordLayout) -> Result<PacketWord> {
    let mut word = PacketWord::zeroed(layout.width())?;
    align(&mut word, u128::from(vmm.key_byte()), KEY_WIDTH, KEY_OFFSET)?;
    Ok(word)
}

// One word per bunch crossing, hit channels set in the bitmap
fn align_vmm_horizontal(vmm_hits: &VmmHits, layout: WordLayout) -> Result<Vec<PacketWord>> {
    let mut by_bcid: BTreeMap<u16, Vec<u8>> = BTreeMap::new();
    for (channel, bcids) in &vmm_hits.channels {
        for bcid in bcids {
            by_bcid.entry(*bcid).or_default().push(*channel);
        }
    }

    by_bcid
        .into_iter()
        .map(|(bcid, channels)| -> Result<PacketWord> {
            let mut word = vmm_word(vmm_hits.vmm, layout)?;
            align(&mut word, u128::from(bcid), INDEX_WIDTH, INDEX_OFFSET)?;
            for channel in channels {
                let offset = channel_bit_offset(channel).ok_or(CodecError::Alignment {
                    offset: PAYLOAD_OFFSET + usize::from(channel),
                    field_width: 1,
                    word_width: layout.width(),
                })?;
                align(&mut word, 1, 1, offset)?;
            }
            Ok(word)
        })
        .collect()
}

// One word per channel and group of BCIDs, a channel with more hits than slots continues in the next word
fn align_vmm_vertical(vmm_hits: &VmmHits, layout: WordLayout) -> Result<Vec<PacketWord>> {
    let slots = layout.slots();
    let mut words = Vec::new();
    for (channel, bcids) in &vmm_hits.channels {
        let chunked = bits::chunk(bcids, slots)?;
        let last = chunked.chunks.len().saturating_sub(1);
        for (idx, slot_values) in chunked.chunks.iter().enumerate() {
            let fill = if idx == last {
                chunked.last_chunk_fill(slots)
            } else {
                slots
            };
            let mut word = vmm_word(vmm_hits.vmm, layout)?;
            align(&mut word, u128::from(*channel), INDEX_WIDTH, INDEX_OFFSET)?;
            align(&mut word, fill as u128, FILL_WIDTH, FILL_OFFSET)?;
            for (slot, bcid) in slot_values.iter().take(fill).enumerate() {
                align(
                    &mut word,
                    u128::from(*bcid),
                    BCID_SLOT_WIDTH,
                    slot_bit_offset(slot),
                )?;
            }
            words.push(word);
        }
    }
    Ok(words)
}

/// Merges the aligned words of several VMMs into one packet.
///
/// VMMs are ordered by identifier, so the input order never changes the result. The first word of each VMM gets the
/// [MARKER_VMM_START] marker, the rest [MARKER_VMM_CONT]. Every word is sealed with its parity bit and a header is prepended.
///
/// # Errors
/// [CodecError::DuplicateVmm] if a VMM appears twice, [CodecError::Structure] if a word doesn't match the layout's width.
pub fn combine(
    layout: WordLayout,
    region: u8,
    mut vmm_word_sets: Vec<(VmmId, Vec<PacketWord>)>,
) -> Result<Packet> {
    vmm_word_sets.sort_by_key(|(vmm, _)| *vmm);
    if let Some((vmm, _)) = vmm_word_sets
        .iter()
        .tuple_windows()
        .find(|(a, b)| a.0 == b.0)
        .map(|(a, _)| a)
    {
        return Err(CodecError::DuplicateVmm(vmm.to_string()));
    }

    let mut vmms = BTreeSet::new();
    let mut words = Vec::with_capacity(vmm_word_sets.iter().map(|(_, set)| set.len()).sum());
    for (vmm, set) in vmm_word_sets {
        if set.is_empty() {
            continue;
        }
        let _ = vmms.insert(vmm);
        for (idx, mut word) in set.into_iter().enumerate() {
            if word.width() != layout.width() {
                return Err(CodecError::Structure(format!(
                    "word of VMM {vmm} is {} bits wide, layout expects {}",
                    word.width(),
                    layout.width()
                )));
            }
            let marker = if idx == 0 {
                MARKER_VMM_START
            } else {
                MARKER_VMM_CONT
            };
            align(&mut word, u128::from(marker), MARKER_WIDTH, MARKER_OFFSET)?;
            align(&mut word, u128::from(vmm.key_byte()), KEY_WIDTH, KEY_OFFSET)?;
            word.seal();
            words.push(word);
        }
    }

    let header = PacketWord::header(layout, region, words.len())?;
    log::trace!(
        "Combined {} VMM(s) into {} data words for region {region}",
        vmms.len(),
        words.len()
    );
    Ok(Packet::new(region, layout, vmms, header, words))
}

/// Builds packets from hit records with a validated configuration.
#[derive(Debug, Clone, Copy)]
pub struct PacketBuilder {
    layout: WordLayout,
    bc_gap: u32,
}

impl PacketBuilder {
    /// Validates the configuration and creates a builder.
    ///
    /// # Errors
    /// [CodecError::Configuration] if the BC gap is not positive or the word width is invalid.
    pub fn new(config: &impl BuilderOpt) -> Result<Self> {
        let (layout, bc_gap) = validate_builder_opt(config)?;
        Ok(Self { layout, bc_gap })
    }

    /// Word layout used by the builder.
    pub fn layout(&self) -> WordLayout {
        self.layout
    }

    /// Minimum BC spacing enforced between hits on one channel.
    pub fn bc_gap(&self) -> u32 {
        self.bc_gap
    }

    /// Builds one packet from hits of a single region.
    ///
    /// # Errors
    /// [CodecError::EmptyHitSet] without hits, [CodecError::MixedRegions] if the hits span more than one region.
    /// [CodecError::Configuration] if the packet has more data words than a header of the configured width can count,
    /// which only happens with 48 bit vertical words.
    pub fn make_packet(&self, hits: &[HitRecord]) -> Result<Packet> {
        let regions: BTreeSet<u8> = hits.iter().map(HitRecord::region).collect();
        let region = match regions.len() {
            0 => return Err(CodecError::EmptyHitSet),
            1 => regions.first().copied().unwrap_or_default(),
            _ => return Err(CodecError::MixedRegions(regions.into_iter().collect())),
        };

        let filtered = suppress_gap(hits, self.bc_gap);
        if !filtered.dropped.is_empty() {
            log::debug!(
                "Region {region}: {} of {} hits dropped by BC gap {}",
                filtered.dropped.len(),
                hits.len(),
                self.bc_gap
            );
        }
        let map = HitMap::from_records(&filtered.kept);
        let vmm_word_sets = VmmHits::from_hit_map(&map)
            .iter()
            .map(|vmm_hits| -> Result<(VmmId, Vec<PacketWord>)> {
                Ok((vmm_hits.vmm, align_vmm(vmm_hits, self.layout)?))
            })
            .collect::<Result<Vec<_>>>()?;
        combine(self.layout, region, vmm_word_sets)
    }

    /// Builds one packet per region, in ascending region order.
    pub fn make_packets(&self, hits: &[HitRecord]) -> Result<Vec<Packet>> {
        if hits.is_empty() {
            return Err(CodecError::EmptyHitSet);
        }
        let mut by_region: BTreeMap<u8, Vec<HitRecord>> = BTreeMap::new();
        hits.iter()
            .for_each(|hit| by_region.entry(hit.region()).or_default().push(*hit));
        by_region
            .values()
            .map(|region_hits| self.make_packet(region_hits))
            .collect()
    }
}

/// Builds a packet end-to-end: validates the configuration, suppresses hits within the BC gap, aligns and combines.
///
/// # Example
/// ```
/// # use vmm_gbt_protocol::builder::make_packet;
/// # use vmm_gbt_protocol::config::{BuilderConfig, Pattern};
/// # use vmm_gbt_protocol::words::hit::HitRecord;
/// # use vmm_gbt_protocol::test_data::GOLDEN_HORIZONTAL_HEX;
/// let cfg = BuilderConfig { pattern: Pattern::Horizontal, word_width: 96, bc_gap: 1 };
/// let hits = [HitRecord::new(3, 0, 100, 0, 20).unwrap()];
/// let packet = make_packet(&hits, &cfg).unwrap();
/// assert_eq!(packet.to_hex_words(), GOLDEN_HORIZONTAL_HEX);
/// ```
pub fn make_packet(hits: &[HitRecord], config: &impl BuilderOpt) -> Result<Packet> {
    PacketBuilder::new(config)?.make_packet(hits)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::BuilderConfig;
    use crate::words::hit::ChannelKey;
    use pretty_assertions::assert_eq;

    fn hit(channel: u8, vmm: u8, bcid: u16, plane: u8) -> HitRecord {
        HitRecord::new(channel, vmm, bcid, plane, 20).unwrap()
    }

    fn cfg(pattern: Pattern, word_width: u16, bc_gap: i32) -> BuilderConfig {
        BuilderConfig {
            pattern,
            word_width,
            bc_gap,
        }
    }

    #[test]
    fn test_align_out_of_range() {
        let mut word = PacketWord::zeroed(96).unwrap();
        let err = align(&mut word, 0xFFF, 12, 90).unwrap_err();
        assert_eq!(
            err,
            CodecError::Alignment {
                offset: 90,
                field_width: 12,
                word_width: 96
            }
        );
    }

    #[test]
    fn test_align_vmm_horizontal_groups_by_bcid() {
        let vmm = VmmId::new(1, 3).unwrap();
        let vmm_hits = VmmHits {
            vmm,
            channels: BTreeMap::from([(0, vec![10, 20]), (5, vec![10])]),
        };
        let layout = WordLayout::new(Pattern::Horizontal, 96).unwrap();
        let words = align_vmm(&vmm_hits, layout).unwrap();
        assert_eq!(words.len(), 2);
        assert_eq!(words[0].index(), 10);
        assert_eq!(words[0].field(PAYLOAD_OFFSET, 64), 0b100001);
        assert_eq!(words[1].index(), 20);
        assert_eq!(words[1].field(PAYLOAD_OFFSET, 64), 0b1);
        assert!(words.iter().all(|w| w.key() == 0x13));
    }

    #[test]
    fn test_align_vmm_vertical_spreads_bcids() {
        let vmm_hits = VmmHits {
            vmm: VmmId::new(0, 2).unwrap(),
            channels: BTreeMap::from([(7, vec![1, 2, 3, 4, 5])]),
        };
        // 64 bit words hold 2 slots
        let layout = WordLayout::new(Pattern::Vertical, 64).unwrap();
        let words = align_vmm(&vmm_hits, layout).unwrap();
        assert_eq!(words.len(), 3);
        assert!(words.iter().all(|w| w.index() == 7));
        let fills: Vec<u8> = words.iter().map(PacketWord::fill).collect();
        assert_eq!(fills, vec![2, 2, 1]);
        assert_eq!(words[2].field(slot_bit_offset(0), BCID_SLOT_WIDTH), 5);
        assert_eq!(words[2].field(slot_bit_offset(1), BCID_SLOT_WIDTH), 0);
    }

    #[test]
    fn test_align_vmm_rejects_invalid_channel() {
        let vmm_hits = VmmHits {
            vmm: VmmId::new(0, 0).unwrap(),
            channels: BTreeMap::from([(64, vec![1])]),
        };
        let layout = WordLayout::new(Pattern::Horizontal, 128).unwrap();
        assert!(matches!(
            align_vmm(&vmm_hits, layout),
            Err(CodecError::Alignment { .. })
        ));
    }

    #[test]
    fn test_combine_marks_vmm_boundaries() {
        let layout = WordLayout::new(Pattern::Vertical, 48).unwrap();
        let vmm_a = VmmId::new(0, 1).unwrap();
        let vmm_b = VmmId::new(2, 0).unwrap();
        let set_a = vec![vmm_word(vmm_a, layout).unwrap(); 2];
        let set_b = vec![vmm_word(vmm_b, layout).unwrap()];
        let packet = combine(layout, 21, vec![(vmm_b, set_b), (vmm_a, set_a)]).unwrap();
        let markers: Vec<u8> = packet.words().iter().map(PacketWord::marker).collect();
        assert_eq!(markers, vec![0xA, 0xB, 0xA]);
        assert_eq!(packet.words()[0].vmm_id().unwrap(), vmm_a);
        assert_eq!(packet.words()[2].vmm_id().unwrap(), vmm_b);
        assert!(packet.all_words().all(PacketWord::parity_ok));
        assert_eq!(packet.header().header_word_count(), 3);
    }

    #[test]
    fn test_combine_order_independent() {
        let layout = WordLayout::new(Pattern::Horizontal, 96).unwrap();
        let map = HitMap::from_records(&[hit(1, 0, 5, 0), hit(2, 4, 9, 1), hit(3, 7, 5, 3)]);
        let sets: Vec<(VmmId, Vec<PacketWord>)> = VmmHits::from_hit_map(&map)
            .iter()
            .map(|vh| (vh.vmm, align_vmm(vh, layout).unwrap()))
            .collect();
        let mut reversed = sets.clone();
        reversed.reverse();
        let a = combine(layout, 20, sets).unwrap();
        let b = combine(layout, 20, reversed).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_bytes(), b.to_bytes());
    }

    #[test]
    fn test_combine_duplicate_vmm() {
        let layout = WordLayout::new(Pattern::Horizontal, 96).unwrap();
        let vmm = VmmId::new(0, 0).unwrap();
        let word = vmm_word(vmm, layout).unwrap();
        let err = combine(layout, 20, vec![(vmm, vec![word]), (vmm, vec![word])]).unwrap_err();
        assert_eq!(err, CodecError::DuplicateVmm("0.0".into()));
    }

    #[test]
    fn test_gap_suppression_keeps_earlier_hit() {
        let hits = [hit(3, 0, 100, 0), hit(3, 0, 101, 0)];
        let packet = make_packet(&hits, &cfg(Pattern::Horizontal, 128, 5)).unwrap();
        assert_eq!(packet.words().len(), 1);
        assert_eq!(packet.words()[0].index(), 100);
    }

    #[test]
    fn test_gap_suppression_measures_from_last_kept() {
        // 100 kept, 103 dropped (within 5 of 100), 105 kept (5 after 100), 108 dropped
        let hits = [
            hit(3, 0, 100, 0),
            hit(3, 0, 103, 0),
            hit(3, 0, 105, 0),
            hit(3, 0, 108, 0),
        ];
        let filtered = suppress_gap(&hits, 5);
        let kept: Vec<u16> = filtered.kept.iter().map(HitRecord::bcid).collect();
        let dropped: Vec<u16> = filtered.dropped.iter().map(HitRecord::bcid).collect();
        assert_eq!(kept, vec![100, 105]);
        assert_eq!(dropped, vec![103, 108]);
    }

    #[test]
    fn test_gap_suppression_is_per_channel() {
        let hits = [hit(3, 0, 100, 0), hit(4, 0, 101, 0), hit(3, 0, 101, 1)];
        let filtered = suppress_gap(&hits, 5);
        assert_eq!(filtered.kept.len(), 3);
        assert!(filtered.dropped.is_empty());
    }

    #[test]
    fn test_make_packet_errors() {
        let good = cfg(Pattern::Horizontal, 128, 1);
        assert_eq!(make_packet(&[], &good).unwrap_err(), CodecError::EmptyHitSet);
        let mixed = [hit(1, 0, 1, 0), HitRecord::new(1, 0, 1, 0, 21).unwrap()];
        assert_eq!(
            make_packet(&mixed, &good).unwrap_err(),
            CodecError::MixedRegions(vec![20, 21])
        );
        let bad_gap = cfg(Pattern::Horizontal, 128, 0);
        assert!(matches!(
            make_packet(&[hit(1, 0, 1, 0)], &bad_gap),
            Err(CodecError::Configuration(_))
        ));
        let bad_width = cfg(Pattern::Vertical, 60, 1);
        assert!(matches!(
            make_packet(&[hit(1, 0, 1, 0)], &bad_width),
            Err(CodecError::Configuration(_))
        ));
    }

    #[test]
    fn test_make_packet_full_region() {
        // Every VMM of the region fires on every bunch crossing
        let hits: Vec<HitRecord> = (0..4)
            .flat_map(|plane| (0..8).map(move |vmm| (plane, vmm)))
            .flat_map(|(plane, vmm)| (0..4096).map(move |bcid| hit(0, vmm, bcid, plane)))
            .collect();
        let packet = make_packet(&hits, &cfg(Pattern::Horizontal, 96, 1)).unwrap();
        assert_eq!(packet.words().len(), 32 * 4096);
        assert_eq!(packet.header().header_word_count(), 32 * 4096);
        assert_eq!(Packet::from_bytes(&packet.to_bytes()).unwrap(), packet);
    }

    #[test]
    fn test_make_packet_too_many_words_for_narrow_header() {
        // One BCID slot per 48 bit word, 64 * 1025 words
        let hits: Vec<HitRecord> = (0..64)
            .flat_map(|channel| (0..1025).map(move |bcid| hit(channel, 0, bcid, 0)))
            .collect();
        assert!(matches!(
            make_packet(&hits, &cfg(Pattern::Vertical, 48, 1)),
            Err(CodecError::Configuration(_))
        ));
        let packet = make_packet(&hits, &cfg(Pattern::Vertical, 56, 1)).unwrap();
        // Two slots per 56 bit word, 513 words per channel
        assert_eq!(packet.header().header_word_count(), 64 * 513);
    }

    #[test]
    fn test_make_packets_per_region() {
        let hits = [
            HitRecord::new(1, 0, 1, 0, 23).unwrap(),
            HitRecord::new(1, 0, 1, 0, 20).unwrap(),
            HitRecord::new(2, 0, 1, 0, 23).unwrap(),
        ];
        let builder = PacketBuilder::new(&BuilderConfig::default()).unwrap();
        let packets = builder.make_packets(&hits).unwrap();
        let regions: Vec<u8> = packets.iter().map(Packet::region).collect();
        assert_eq!(regions, vec![20, 23]);
        // Both channels of region 23 share the bunch crossing
        assert_eq!(packets[1].words().len(), 1);
    }

    #[test]
    fn test_vmm_hits_from_hit_map() {
        let map = HitMap::from_records(&[hit(1, 2, 5, 0), hit(9, 2, 7, 0), hit(3, 0, 5, 1)]);
        let sets = VmmHits::from_hit_map(&map);
        assert_eq!(sets.len(), 2);
        assert_eq!(sets[0].vmm, VmmId::new(0, 2).unwrap());
        assert_eq!(sets[0].channels.len(), 2);
        assert_eq!(sets[1].channels.get(&3), Some(&vec![5]));
        let key = ChannelKey::new(20, sets[1].vmm, 3);
        assert_eq!(map.get(&key), Some([5].as_slice()));
    }
}
