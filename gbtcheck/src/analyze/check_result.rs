//! Contains the [CheckResult] of comparing a decoded packet against its truth, and its building blocks.

use crate::util::*;

/// Verdict on one truth channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Verdict {
    /// Decoded BCIDs equal the truth and none of them came from a faulty word
    Match,
    /// Something was decoded, but not exactly the truth
    Mismatch,
    /// Nothing was decoded for the channel
    Missing,
}

impl fmt::Display for Verdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Verdict::Match => write!(f, "match"),
            Verdict::Mismatch => write!(f, "mismatch"),
            Verdict::Missing => write!(f, "missing"),
        }
    }
}

/// Verdict on one BCID of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BcidVerdict {
    /// Expected and decoded
    Match,
    /// Decoded but not expected
    Mismatch,
    /// Expected but not decoded
    Missing,
}

/// Per-BCID detail of a channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcidCheck {
    /// The BCID
    pub bcid: u16,
    /// Its verdict
    pub verdict: BcidVerdict,
}

/// Comparison of one truth channel with what was decoded for it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelVerdict {
    /// Channel compared
    pub key: ChannelKey,
    /// Overall verdict
    pub verdict: Verdict,
    /// BCIDs in the truth
    pub expected: Vec<u16>,
    /// BCIDs decoded from the packet
    pub decoded: Vec<u16>,
    /// Whether any decoded BCID came from a word with a fault
    pub tainted: bool,
    /// Per-BCID detail, expected BCIDs first, then unexpected ones
    pub bcids: Vec<BcidCheck>,
}

impl ChannelVerdict {
    /// Compares the expected and decoded BCIDs of a channel.
    ///
    /// `unidentified_words` degrades a missing channel to a mismatch, as the hits may sit in a word that couldn't be attributed.
    pub fn compare(
        key: ChannelKey,
        expected: &[u16],
        decoded: Option<&[u16]>,
        tainted: bool,
        unidentified_words: bool,
    ) -> Self {
        let decoded = decoded.unwrap_or_default();
        let verdict = if decoded.is_empty() {
            if unidentified_words {
                Verdict::Mismatch
            } else {
                Verdict::Missing
            }
        } else if decoded == expected && !tainted {
            Verdict::Match
        } else {
            Verdict::Mismatch
        };

        let bcids = expected
            .iter()
            .map(|bcid| BcidCheck {
                bcid: *bcid,
                verdict: if decoded.contains(bcid) {
                    BcidVerdict::Match
                } else {
                    BcidVerdict::Missing
                },
            })
            .chain(
                decoded
                    .iter()
                    .filter(|bcid| !expected.contains(bcid))
                    .map(|bcid| BcidCheck {
                        bcid: *bcid,
                        verdict: BcidVerdict::Mismatch,
                    }),
            )
            .collect();

        Self {
            key,
            verdict,
            expected: expected.to_vec(),
            decoded: decoded.to_vec(),
            tainted,
            bcids,
        }
    }

    /// BCIDs that were both expected and decoded.
    pub fn matched_bcids(&self) -> impl Iterator<Item = u16> + '_ {
        self.bcids
            .iter()
            .filter(|b| b.verdict == BcidVerdict::Match)
            .map(|b| b.bcid)
    }
}

/// A word that could not be decoded cleanly.
#[derive(Debug, Clone, PartialEq)]
pub struct WordFault {
    /// Region of the packet
    pub region: u8,
    /// Index of the data word, `None` for the header
    pub word_index: Option<usize>,
    /// What went wrong
    pub error: CodecError,
}

impl WordFault {
    /// The error code used when reporting the fault.
    pub fn code(&self) -> &'static str {
        match self.error {
            CodecError::Identification(_) => "E11",
            CodecError::Alignment { .. } | CodecError::Structure(_) => "E12",
            _ => "E10",
        }
    }
}

impl fmt::Display for WordFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.word_index {
            Some(idx) => write!(
                f,
                "R{:02} word {idx}: [{}] {}",
                self.region,
                self.code(),
                self.error
            ),
            None => write!(
                f,
                "R{:02} header: [{}] {}",
                self.region,
                self.code(),
                self.error
            ),
        }
    }
}

/// A decoded channel that isn't in the truth.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnexpectedChannel {
    /// Channel decoded
    pub key: ChannelKey,
    /// BCIDs decoded for it
    pub bcids: Vec<u16>,
}

/// Channel verdict counts of a plane.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaneCounts {
    /// Channels matching
    pub matched: u32,
    /// Channels mismatching
    pub mismatched: u32,
    /// Channels missing
    pub missing: u32,
}

impl PlaneCounts {
    fn count(&mut self, verdict: Verdict) {
        match verdict {
            Verdict::Match => self.matched += 1,
            Verdict::Mismatch => self.mismatched += 1,
            Verdict::Missing => self.missing += 1,
        }
    }

    /// Number of channels counted.
    pub fn total(&self) -> u32 {
        self.matched + self.mismatched + self.missing
    }

    /// True if there's at least one channel and all of them match.
    pub fn all_matched(&self) -> bool {
        self.matched > 0 && self.matched == self.total()
    }
}

impl std::ops::AddAssign for PlaneCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.matched += rhs.matched;
        self.mismatched += rhs.mismatched;
        self.missing += rhs.missing;
    }
}

/// Outcome of checking one or more packets against their truth.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CheckResult {
    channels: BTreeMap<ChannelKey, ChannelVerdict>,
    faults: Vec<WordFault>,
    unexpected: Vec<UnexpectedChannel>,
}

impl CheckResult {
    pub(crate) fn new(
        channels: BTreeMap<ChannelKey, ChannelVerdict>,
        faults: Vec<WordFault>,
        unexpected: Vec<UnexpectedChannel>,
    ) -> Self {
        Self {
            channels,
            faults,
            unexpected,
        }
    }

    /// Verdicts of all truth channels, ordered by channel.
    pub fn channels(&self) -> impl Iterator<Item = &ChannelVerdict> {
        self.channels.values()
    }

    /// The verdict record of a channel, if it is in the truth.
    pub fn channel(&self, key: &ChannelKey) -> Option<&ChannelVerdict> {
        self.channels.get(key)
    }

    /// The verdict of a channel, if it is in the truth.
    pub fn verdict(&self, key: &ChannelKey) -> Option<Verdict> {
        self.channels.get(key).map(|c| c.verdict)
    }

    /// Faults found while decoding.
    pub fn faults(&self) -> &[WordFault] {
        &self.faults
    }

    /// Decoded channels absent from the truth.
    pub fn unexpected(&self) -> &[UnexpectedChannel] {
        &self.unexpected
    }

    /// Number of truth channels.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// True if no truth channel was checked.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// True if every channel matched, nothing unexpected was decoded, and no word was faulty.
    pub fn is_clean(&self) -> bool {
        self.faults.is_empty()
            && self.unexpected.is_empty()
            && self.channels.values().all(|c| c.verdict == Verdict::Match)
    }

    /// Verdict counts over all planes.
    pub fn counts(&self) -> PlaneCounts {
        let mut counts = PlaneCounts::default();
        self.channels.values().for_each(|c| counts.count(c.verdict));
        counts
    }

    /// Verdict counts per plane.
    pub fn plane_counts(&self) -> BTreeMap<u8, PlaneCounts> {
        let mut counts: BTreeMap<u8, PlaneCounts> = BTreeMap::new();
        for c in self.channels.values() {
            counts.entry(c.key.plane()).or_default().count(c.verdict);
        }
        counts
    }

    /// Verdict counts per `(pair, plane)`.
    pub fn pair_plane_counts(&self) -> BTreeMap<(u8, u8), PlaneCounts> {
        let mut counts: BTreeMap<(u8, u8), PlaneCounts> = BTreeMap::new();
        for c in self.channels.values() {
            counts
                .entry((c.key.pair(), c.key.plane()))
                .or_default()
                .count(c.verdict);
        }
        counts
    }

    /// Adds the channels, faults and unexpected channels of another result, e.g. of another region.
    ///
    /// A channel present in both keeps the verdict of `other`.
    pub fn merge(&mut self, other: CheckResult) {
        self.channels.extend(other.channels);
        self.faults.extend(other.faults);
        self.unexpected.extend(other.unexpected);
        self.unexpected.sort_by_key(|u| u.key);
    }

    /// Error messages for every fault, mismatching and missing channel, tagged with error codes.
    pub fn error_messages(&self) -> Vec<String> {
        let faults = self.faults.iter().map(ToString::to_string);
        let channels = self
            .channels
            .values()
            .filter_map(|c| match c.verdict {
                Verdict::Match => None,
                Verdict::Mismatch => Some(format!(
                    "R{:02} VMM {} ch {}: [E20] channel mismatch, expected BCIDs {:?} decoded {:?}{}",
                    c.key.region,
                    c.key.vmm,
                    c.key.channel,
                    c.expected,
                    c.decoded,
                    if c.tainted { " (from faulty word)" } else { "" }
                )),
                Verdict::Missing => Some(format!(
                    "R{:02} VMM {} ch {}: [E21] channel missing, expected BCIDs {:?}",
                    c.key.region, c.key.vmm, c.key.channel, c.expected
                )),
            });
        faults.chain(channels).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn key(plane: u8, channel: u8) -> ChannelKey {
        ChannelKey::new(20, VmmId::new(plane, 0).unwrap(), channel)
    }

    #[test]
    fn test_compare_match() {
        let v = ChannelVerdict::compare(key(0, 3), &[100, 200], Some(&[100, 200]), false, false);
        assert_eq!(v.verdict, Verdict::Match);
        assert_eq!(v.matched_bcids().collect::<Vec<_>>(), vec![100, 200]);
    }

    #[test]
    fn test_compare_tainted_is_mismatch() {
        let v = ChannelVerdict::compare(key(0, 3), &[100], Some(&[100]), true, false);
        assert_eq!(v.verdict, Verdict::Mismatch);
        assert_eq!(v.bcids[0].verdict, BcidVerdict::Match);
    }

    #[test]
    fn test_compare_missing_and_degraded() {
        let v = ChannelVerdict::compare(key(0, 3), &[100], None, false, false);
        assert_eq!(v.verdict, Verdict::Missing);
        assert_eq!(v.bcids[0].verdict, BcidVerdict::Missing);
        let v = ChannelVerdict::compare(key(0, 3), &[100], None, false, true);
        assert_eq!(v.verdict, Verdict::Mismatch);
    }

    #[test]
    fn test_compare_bcid_detail() {
        let v = ChannelVerdict::compare(key(1, 7), &[100, 101], Some(&[100, 105]), false, false);
        assert_eq!(v.verdict, Verdict::Mismatch);
        assert_eq!(
            v.bcids,
            vec![
                BcidCheck {
                    bcid: 100,
                    verdict: BcidVerdict::Match
                },
                BcidCheck {
                    bcid: 101,
                    verdict: BcidVerdict::Missing
                },
                BcidCheck {
                    bcid: 105,
                    verdict: BcidVerdict::Mismatch
                },
            ]
        );
    }

    #[test]
    fn test_counts_and_merge() {
        let mut a = CheckResult::new(
            BTreeMap::from([(
                key(0, 1),
                ChannelVerdict::compare(key(0, 1), &[10], Some(&[10]), false, false),
            )]),
            Vec::new(),
            Vec::new(),
        );
        let b = CheckResult::new(
            BTreeMap::from([(
                key(2, 1),
                ChannelVerdict::compare(key(2, 1), &[10], None, false, false),
            )]),
            Vec::new(),
            Vec::new(),
        );
        assert!(a.is_clean());
        a.merge(b);
        assert!(!a.is_clean());
        assert_eq!(a.len(), 2);
        let counts = a.plane_counts();
        assert!(counts[&0].all_matched());
        assert_eq!(counts[&2].missing, 1);
        assert_eq!(a.pair_plane_counts()[&(10, 2)].total(), 1);
        assert_eq!(a.counts().total(), 2);
    }

    #[test]
    fn test_error_messages_carry_codes() {
        let result = CheckResult::new(
            BTreeMap::from([(
                key(0, 1),
                ChannelVerdict::compare(key(0, 1), &[10], None, false, false),
            )]),
            vec![WordFault {
                region: 20,
                word_index: Some(2),
                error: CodecError::Decoding("parity".into()),
            }],
            Vec::new(),
        );
        let msgs = result.error_messages();
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].starts_with("R20 word 2: [E10]"));
        assert!(msgs[1].contains("[E21]"));
    }

    #[test]
    fn test_plane_counts_all_matched_needs_channels() {
        assert!(!PlaneCounts::default().all_matched());
    }
}
