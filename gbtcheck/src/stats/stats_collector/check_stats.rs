//! Contains the [CheckStats] struct which stores the outcome of checking packets and the timing analysis
use crate::util::*;

/// Verdict counts of one plane over all checked packets.
#[derive(Default, Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaneTally {
    /// The plane
    pub plane: u8,
    /// Matching channels
    pub matched: u32,
    /// Mismatching channels
    pub mismatched: u32,
    /// Missing channels
    pub missing: u32,
}

/// BCID slope of one plane.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PlaneSlope {
    /// The plane
    pub plane: u8,
    /// BC per pair of regions
    pub slope: f64,
}

/// Two planes of a region with possibly swapped fibres.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SwapRecord {
    /// Region of the planes
    pub region: u8,
    /// First plane
    pub plane_a: u8,
    /// Second plane
    pub plane_b: u8,
    /// Channels affected
    pub channels: u32,
}

/// Stores stats of the checked packets
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckStats {
    packets_checked: u32,
    words_checked: u64,
    hits_suppressed: u32,
    unexpected_channels: u32,
    regions_seen: Vec<u8>,
    plane_tallies: Vec<PlaneTally>,
    slopes: Vec<PlaneSlope>,
    swap_candidates: Vec<SwapRecord>,
}

impl CheckStats {
    pub(super) fn record_packet(&mut self, region: u8, words: usize) {
        self.packets_checked += 1;
        self.words_checked += words as u64;
        if !self.regions_seen.contains(&region) {
            self.regions_seen.push(region);
        }
    }

    pub(super) fn add_hits_suppressed(&mut self, n: u32) {
        self.hits_suppressed += n;
    }

    pub(super) fn add_unexpected_channels(&mut self, n: u32) {
        self.unexpected_channels += n;
    }

    pub(super) fn add_plane_verdicts(&mut self, plane: u8, counts: PlaneCounts) {
        let idx = match self.plane_tallies.iter().position(|t| t.plane == plane) {
            Some(idx) => idx,
            None => {
                self.plane_tallies.push(PlaneTally {
                    plane,
                    ..Default::default()
                });
                self.plane_tallies.len() - 1
            }
        };
        let tally = &mut self.plane_tallies[idx];
        tally.matched += counts.matched;
        tally.mismatched += counts.mismatched;
        tally.missing += counts.missing;
    }

    pub(super) fn record_slope(&mut self, plane: u8, slope: f64) {
        match self.slopes.iter_mut().find(|s| s.plane == plane) {
            Some(s) => s.slope = slope,
            None => self.slopes.push(PlaneSlope { plane, slope }),
        }
    }

    pub(super) fn record_swap_candidate(&mut self, candidate: SwapCandidate) {
        self.swap_candidates.push(SwapRecord {
            region: candidate.region,
            plane_a: candidate.planes.0,
            plane_b: candidate.planes.1,
            channels: candidate.channels as u32,
        });
    }

    /// Sorts the recorded values, no more stats are expected afterwards.
    pub(super) fn finalize(&mut self) {
        self.regions_seen.sort_unstable();
        self.plane_tallies.sort_unstable_by_key(|t| t.plane);
        self.slopes.sort_unstable_by_key(|s| s.plane);
        self.swap_candidates
            .sort_unstable_by_key(|s| (s.region, s.plane_a, s.plane_b));
    }

    /// Number of packets checked.
    pub fn packets_checked(&self) -> u32 {
        self.packets_checked
    }

    /// Number of data words in the checked packets.
    pub fn words_checked(&self) -> u64 {
        self.words_checked
    }

    /// Hits dropped by gap suppression.
    pub fn hits_suppressed(&self) -> u32 {
        self.hits_suppressed
    }

    /// Decoded channels that were not in the truth.
    pub fn unexpected_channels(&self) -> u32 {
        self.unexpected_channels
    }

    /// Regions of the checked packets.
    pub fn regions_seen(&self) -> &[u8] {
        &self.regions_seen
    }

    /// Verdict counts per plane.
    pub fn plane_tallies(&self) -> &[PlaneTally] {
        &self.plane_tallies
    }

    /// Total verdict counts over all planes.
    pub fn total_counts(&self) -> PlaneCounts {
        let mut total = PlaneCounts::default();
        self.plane_tallies.iter().for_each(|t| {
            total += PlaneCounts {
                matched: t.matched,
                mismatched: t.mismatched,
                missing: t.missing,
            }
        });
        total
    }

    /// Slopes of the planes where one could be computed.
    pub fn slopes(&self) -> &[PlaneSlope] {
        &self.slopes
    }

    /// Recorded swap candidates.
    pub fn swap_candidates(&self) -> &[SwapRecord] {
        &self.swap_candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn collected() -> CheckStats {
        let mut stats = CheckStats::default();
        stats.record_packet(21, 4);
        stats.record_packet(20, 2);
        stats.record_packet(21, 1);
        stats.add_plane_verdicts(
            2,
            PlaneCounts {
                matched: 2,
                mismatched: 1,
                missing: 0,
            },
        );
        stats.add_plane_verdicts(
            0,
            PlaneCounts {
                matched: 1,
                mismatched: 0,
                missing: 3,
            },
        );
        stats.add_plane_verdicts(
            2,
            PlaneCounts {
                matched: 1,
                mismatched: 0,
                missing: 0,
            },
        );
        stats.record_slope(1, 10.0);
        stats.record_swap_candidate(SwapCandidate {
            region: 20,
            planes: (1, 2),
            channels: 2,
        });
        stats.finalize();
        stats
    }

    #[test]
    fn test_tallies() {
        let stats = collected();
        assert_eq!(stats.packets_checked(), 3);
        assert_eq!(stats.words_checked(), 7);
        assert_eq!(stats.regions_seen(), [20, 21]);
        assert_eq!(
            stats.plane_tallies(),
            [
                PlaneTally {
                    plane: 0,
                    matched: 1,
                    mismatched: 0,
                    missing: 3
                },
                PlaneTally {
                    plane: 2,
                    matched: 3,
                    mismatched: 1,
                    missing: 0
                },
            ]
        );
        assert_eq!(stats.total_counts().total(), 8);
    }

    #[test]
    fn test_serde() {
        let stats = collected();
        let json = serde_json::to_string(&stats).unwrap();
        assert_eq!(stats, serde_json::from_str::<CheckStats>(&json).unwrap());
        let toml = toml::to_string(&stats).unwrap();
        println!("{toml}");
        assert_eq!(stats, toml::from_str::<CheckStats>(&toml).unwrap());
    }
}
