//! Decodes packets back into hit maps and compares them against the hits they were built from.
//!
//! Decoding never stops at a faulty word: every fault is recorded and the hits that can still be read are kept,
//! marked as tainted so they can never count as a match.

use crate::util::*;

/// Everything recovered from one packet.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    /// Region of the packet
    pub region: u8,
    /// Decoded hits
    pub hit_map: HitMap,
    /// Channels with at least one hit read from a faulty word
    pub tainted: BTreeSet<ChannelKey>,
    /// Faults found while decoding
    pub faults: Vec<WordFault>,
    /// Whether the header word passed its parity check
    pub header_ok: bool,
}

impl Extraction {
    /// Number of data words whose VMM could not be identified.
    pub fn unidentified_words(&self) -> usize {
        self.faults
            .iter()
            .filter(|f| matches!(f.error, CodecError::Identification(_)))
            .count()
    }
}

/// Recovers the VMM a data word belongs to from its marker and key byte.
///
/// # Errors
/// [CodecError::Identification] if the marker isn't a VMM marker or the key byte names a VMM that doesn't exist.
#[inline]
pub fn identify_vmm(word: &PacketWord) -> Result<VmmId, CodecError> {
    word.vmm_id()
}

/// Decodes a packet into a hit map, recording every faulty word.
pub fn extract(packet: &Packet) -> Extraction {
    let region = packet.region();
    let mut extraction = Extraction {
        region,
        header_ok: packet.header().parity_ok(),
        ..Default::default()
    };
    if !extraction.header_ok {
        log::warn!("Region {region}: header parity error, all hits of the packet are tainted");
        extraction.faults.push(WordFault {
            region,
            word_index: None,
            error: CodecError::Decoding(format!("parity error in header word {}", packet.header())),
        });
    }

    let mut open_block: Option<VmmId> = None;
    for (idx, word) in packet.words().iter().enumerate() {
        let mut fault = |error: CodecError| {
            log::debug!("Region {region} word {idx}: {error}");
            extraction.faults.push(WordFault {
                region,
                word_index: Some(idx),
                error,
            });
        };

        let parity_ok = word.parity_ok();
        if !parity_ok {
            fault(CodecError::Decoding(format!("parity error in word {word}")));
        }

        let vmm = match identify_vmm(word) {
            Ok(vmm) => vmm,
            Err(e) => {
                fault(e);
                open_block = None;
                continue;
            }
        };

        let mut tainted = !parity_ok || !extraction.header_ok;
        if word.marker() == MARKER_VMM_START {
            open_block = Some(vmm);
        } else if open_block != Some(vmm) {
            fault(CodecError::Structure(format!(
                "continuation word of VMM {vmm} outside of its block"
            )));
            tainted = true;
            open_block = Some(vmm);
        }
        if word.reserved() != 0 {
            fault(CodecError::Structure(format!(
                "reserved bits set to {:#X}",
                word.reserved()
            )));
            tainted = true;
        }

        let entries = match decode_entries(word, packet.layout().slots(), packet.pattern()) {
            Ok(entries) => entries,
            Err((entries, e)) => {
                fault(e);
                tainted = true;
                entries
            }
        };
        for (channel, bcid) in entries {
            let key = ChannelKey::new(region, vmm, channel);
            extraction.hit_map.insert(key, bcid);
            if tainted {
                let _ = extraction.tainted.insert(key);
            }
        }
    }
    log::trace!(
        "Region {region}: extracted {} hits on {} channels, {} faults",
        extraction.hit_map.hit_count(),
        extraction.hit_map.len(),
        extraction.faults.len()
    );
    extraction
}

type Entries = Vec<(u8, u16)>;

/// Reads the `(channel, BCID)` entries of a data word. On a malformed word the readable entries are returned with the error.
fn decode_entries(
    word: &PacketWord,
    slots: usize,
    pattern: Pattern,
) -> Result<Entries, (Entries, CodecError)> {
    match pattern {
        Pattern::Horizontal => {
            let bcid = word.index();
            let entries: Entries = (0..BITMAP_WIDTH as u8)
                .filter(|ch| channel_bit_offset(*ch).is_some_and(|offset| word.field(offset, 1) == 1))
                .map(|ch| (ch, bcid))
                .collect();
            if word.fill() != 0 {
                return Err((
                    entries,
                    CodecError::Structure(format!(
                        "fill nibble {} set in a horizontal word",
                        word.fill()
                    )),
                ));
            }
            Ok(entries)
        }
        Pattern::Vertical => {
            if usize::from(word.index()) >= BITMAP_WIDTH {
                return Err((
                    Vec::new(),
                    CodecError::Structure(format!("channel {} out of range", word.index())),
                ));
            }
            let channel = word.index() as u8;
            let fill = usize::from(word.fill());
            let readable = fill.min(slots);
            let entries: Entries = (0..readable)
                .map(|slot| {
                    (
                        channel,
                        word.field(slot_bit_offset(slot), BCID_SLOT_WIDTH) as u16,
                    )
                })
                .collect();
            if fill == 0 || fill > slots {
                return Err((
                    entries,
                    CodecError::Structure(format!(
                        "fill nibble {fill} invalid for {slots} BCID slots"
                    )),
                ));
            }
            Ok(entries)
        }
    }
}

/// Compares the hits extracted from a packet with the truth of the packet's region.
pub fn check_extraction(extraction: Extraction, truth: &HitMap) -> CheckResult {
    let truth = truth.for_region(extraction.region);
    let unidentified = extraction.unidentified_words() > 0;
    let channels: BTreeMap<ChannelKey, ChannelVerdict> = truth
        .iter()
        .map(|(key, expected)| {
            (
                *key,
                ChannelVerdict::compare(
                    *key,
                    expected,
                    extraction.hit_map.get(key),
                    extraction.tainted.contains(key),
                    unidentified,
                ),
            )
        })
        .collect();
    let unexpected: Vec<UnexpectedChannel> = extraction
        .hit_map
        .iter()
        .filter(|(key, _)| !truth.contains(key))
        .map(|(key, bcids)| UnexpectedChannel {
            key: *key,
            bcids: bcids.clone(),
        })
        .collect();
    if !unexpected.is_empty() {
        log::debug!(
            "Region {}: {} decoded channels not in the truth",
            extraction.region,
            unexpected.len()
        );
    }
    CheckResult::new(channels, extraction.faults, unexpected)
}

/// Decodes a packet and compares it against the truth hit map.
///
/// Only the truth channels of the packet's region are considered.
pub fn check(packet: &Packet, truth: &HitMap) -> CheckResult {
    check_extraction(extract(packet), truth)
}

/// True only if the plane has at least one channel in the pair and every one of them matches.
pub fn track_plane_hit(result: &CheckResult, plane: u8, pair: u8) -> bool {
    result
        .pair_plane_counts()
        .get(&(pair, plane))
        .is_some_and(PlaneCounts::all_matched)
}

/// Planes of a pair on which more than one VMM delivered hits, with the number of VMMs.
pub fn track_multi_hit_planes(result: &CheckResult, pair: u8) -> BTreeMap<u8, usize> {
    let decoded_vmms: BTreeSet<VmmId> = result
        .channels()
        .filter(|c| !c.decoded.is_empty())
        .map(|c| c.key)
        .chain(result.unexpected().iter().map(|u| u.key))
        .filter(|key| key.pair() == pair)
        .map(|key| key.vmm)
        .collect();
    decoded_vmms
        .into_iter()
        .counts_by(|vmm| vmm.plane())
        .into_iter()
        .filter(|(_, count)| *count > 1)
        .collect()
}
