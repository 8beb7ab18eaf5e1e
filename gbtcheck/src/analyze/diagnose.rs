//! Diagnoses misconnected fibres: hits expected on one plane that show up, unchanged, on another plane.

use crate::util::*;

/// Labels of the planes in an even region.
const EVEN_REGION_PLANES: [&str; 4] = ["x0", "x1", "u0", "v0"];
/// Labels of the planes in an odd region.
const ODD_REGION_PLANES: [&str; 4] = ["u1", "v1", "x0", "x2"];

/// Detector label of a plane as mapped in the given region.
pub fn plane_label(region: u8, plane: u8) -> &'static str {
    let labels = if region % 2 == 0 {
        &EVEN_REGION_PLANES
    } else {
        &ODD_REGION_PLANES
    };
    labels.get(usize::from(plane)).copied().unwrap_or("??")
}

/// Two planes of a region whose fibres are possibly swapped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SwapCandidate {
    /// Region of the planes
    pub region: u8,
    /// The two planes, lowest first
    pub planes: (u8, u8),
    /// Number of channels whose hits moved between the two planes
    pub channels: usize,
}

impl fmt::Display for SwapCandidate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (a, b) = self.planes;
        write!(
            f,
            "R{:02}: planes {} ({a}) and {} ({b}) are possible candidates of swapped fibres, {} channels affected",
            self.region,
            plane_label(self.region, a),
            plane_label(self.region, b),
            self.channels
        )
    }
}

/// Finds plane pairs whose hits appear exchanged.
///
/// A truth channel that didn't match is attributed to a swap if its expected BCIDs were decoded, with the same VMM number and
/// channel, on another plane of the same region where they don't match either.
pub fn diagnose_swaps(result: &CheckResult) -> Vec<SwapCandidate> {
    let decoded: Vec<(ChannelKey, &[u16])> = result
        .channels()
        .filter(|c| c.verdict != Verdict::Match && !c.decoded.is_empty())
        .map(|c| (c.key, c.decoded.as_slice()))
        .chain(
            result
                .unexpected()
                .iter()
                .map(|u| (u.key, u.bcids.as_slice())),
        )
        .collect();

    let mut moved: BTreeMap<(u8, (u8, u8)), usize> = BTreeMap::new();
    for lost in result.channels().filter(|c| c.verdict != Verdict::Match) {
        let found = decoded.iter().find(|(key, bcids)| {
            key.region == lost.key.region
                && key.vmm.vmm() == lost.key.vmm.vmm()
                && key.channel == lost.key.channel
                && key.plane() != lost.key.plane()
                && *bcids == lost.expected.as_slice()
        });
        if let Some((key, _)) = found {
            let (a, b) = (lost.key.plane(), key.plane());
            *moved
                .entry((lost.key.region, (a.min(b), a.max(b))))
                .or_default() += 1;
        }
    }

    let candidates: Vec<SwapCandidate> = moved
        .into_iter()
        .map(|((region, planes), channels)| SwapCandidate {
            region,
            planes,
            channels,
        })
        .collect();
    candidates.iter().for_each(|c| log::info!("{c}"));
    candidates
}
