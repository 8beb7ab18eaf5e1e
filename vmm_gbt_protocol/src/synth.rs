//! Synthetic hit streams simulating straight tracks through the detector.
//!
//! Channels are hit in a regular comb: `offset + 8 * i` for `i` in `0..8`. The lower section uses offsets 0 to 3, the upper section 4 to 7.
//! The BCID advances by `bc_gap_track` after every track, every second region (one pair) the start BCID is shifted by `bc_gap_region`,
//! and with a non-zero `bc_gap_plane` each plane is hit `plane * bc_gap_plane` BCs after plane 0.

use crate::error::{CodecError, Result};
use crate::words::hit::{HitRecord, MAX_BCID, N_PLANES, N_VMMS_PER_PLANE, STRIPS_PER_PLANE};

/// Spacing of the channel comb.
const COMB_INTERVAL: u16 = 8;
/// Number of channels in the comb.
const COMB_TEETH: u16 = 8;
/// Default BCID spacing between tracks.
pub const DEFAULT_BC_GAP_TRACK: u32 = 32;

/// Which half of the channel comb a pattern is drawn on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Section {
    /// Offsets 0 to 3
    Lower,
    /// Offsets 4 to 7
    Upper,
}

impl Section {
    fn validate_offset(self, offset: u8) -> Result<()> {
        let valid = match self {
            Section::Lower => offset <= 3,
            Section::Upper => (4..=7).contains(&offset),
        };
        if valid {
            Ok(())
        } else {
            Err(CodecError::Configuration(format!(
                "offset {offset} does not belong to the {self:?} section"
            )))
        }
    }
}

/// BCID counters wrap at 4096.
#[inline]
fn wrap_bcid(bc: u32) -> u16 {
    (bc % (u32::from(MAX_BCID) + 1)) as u16
}

fn comb(offset: u8) -> Vec<u16> {
    (0..COMB_TEETH)
        .map(|i| u16::from(offset) + COMB_INTERVAL * i)
        .collect()
}

/// BC timing shared by the patterns.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BcTiming {
    /// BCID spacing between tracks in one region
    pub bc_gap_track: u32,
    /// BCID shift applied after each pair of regions
    pub bc_gap_region: u32,
    /// BCID spacing between planes of one track, 0 hits all planes at once
    pub bc_gap_plane: u32,
}

impl Default for BcTiming {
    fn default() -> Self {
        Self {
            bc_gap_track: DEFAULT_BC_GAP_TRACK,
            bc_gap_region: 0,
            bc_gap_plane: 0,
        }
    }
}

impl BcTiming {
    fn start_bc(&self, shift: u32) -> u32 {
        self.bc_gap_track + shift
    }

    fn plane_bc(&self, bc: u32, plane: u8) -> u16 {
        wrap_bcid(bc + u32::from(plane) * self.bc_gap_plane)
    }
}

/// Tracks perpendicular to the strips: every VMM of every plane hit on the same channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerticalPattern {
    /// Half of the comb the offset belongs to
    pub section: Section,
    /// Regions (fibres) to generate hits for
    pub regions: Vec<u8>,
    /// Offset of the first comb channel
    pub offset: u8,
    /// BC timing
    pub timing: BcTiming,
}

impl VerticalPattern {
    /// A pattern with default timing.
    pub fn new(section: Section, regions: Vec<u8>, offset: u8) -> Self {
        Self {
            section,
            regions,
            offset,
            timing: BcTiming::default(),
        }
    }

    /// Generates the hits, one track per comb channel and VMM in every region.
    ///
    /// # Errors
    /// [CodecError::Configuration] if the offset doesn't belong to the section.
    pub fn hits(&self) -> Result<Vec<HitRecord>> {
        self.section.validate_offset(self.offset)?;
        let channels = comb(self.offset);
        let mut hits = Vec::new();
        let mut shift = 0;
        for (idx, region) in self.regions.iter().enumerate() {
            let mut bc = self.timing.start_bc(shift);
            for channel in &channels {
                for vmm in 0..N_VMMS_PER_PLANE {
                    for plane in 0..N_PLANES {
                        hits.push(HitRecord::new(
                            *channel as u8,
                            vmm,
                            self.timing.plane_bc(bc, plane),
                            plane,
                            *region,
                        )?);
                    }
                    bc += self.timing.bc_gap_track;
                }
            }
            if idx % 2 == 1 {
                shift += self.timing.bc_gap_region;
            }
        }
        log::debug!(
            "Vertical pattern generated {} hits over {} regions",
            hits.len(),
            self.regions.len()
        );
        Ok(hits)
    }
}

/// Tracks along the strips: a fixed strip on the two x planes while the stereo (u and v) strips sweep across.
///
/// Even regions map the planes as `[x0, x1, u, v]`, odd regions as `[u, v, x0, x1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HorizontalPattern {
    /// Half of the comb the offset belongs to
    pub section: Section,
    /// Regions (fibres) to generate hits for
    pub regions: Vec<u8>,
    /// Offset of the first comb channel
    pub offset: u8,
    /// VMM of the x strip
    pub x_vmm: u8,
    /// Index into the comb of the x strip
    pub x_channel_idx: u8,
    /// Shift of the stereo strips relative to the x strip, negative shifts to the right
    pub uv_offset: i32,
    /// BC timing
    pub timing: BcTiming,
}

impl HorizontalPattern {
    /// The x strip the pattern is centred on.
    pub fn x_strip(&self) -> Result<u16> {
        self.section.validate_offset(self.offset)?;
        if self.x_vmm >= N_VMMS_PER_PLANE {
            return Err(CodecError::Configuration(format!(
                "x VMM {} out of range, must be below {N_VMMS_PER_PLANE}",
                self.x_vmm
            )));
        }
        let channel = comb(self.offset)
            .get(usize::from(self.x_channel_idx))
            .copied()
            .ok_or_else(|| {
                CodecError::Configuration(format!(
                    "x channel index {} out of range, must be below {COMB_TEETH}",
                    self.x_channel_idx
                ))
            })?;
        Ok(u16::from(self.x_vmm) * 64 + channel)
    }

    /// The stereo strips of each track in sweep order, as `(u, v)` pairs. Strips may fall outside the plane.
    pub fn stereo_strips(&self) -> Result<Vec<(i32, i32)>> {
        let x = i32::from(self.x_strip()?);
        let interval = i32::from(COMB_INTERVAL);
        let half = i32::from(STRIPS_PER_PLANE) / 2;
        let steps = if x < half {
            x / interval + 1
        } else {
            (i32::from(STRIPS_PER_PLANE) - x) / interval + 1
        };
        let u_centre = x - self.uv_offset;
        let u: Vec<i32> = (0..steps)
            .rev()
            .map(|i| u_centre - interval * i)
            .chain((1..steps).map(|i| u_centre + interval * i))
            .collect();
        let v = u.iter().rev().map(|s| s + 2 * self.uv_offset);
        Ok(u.iter().copied().zip(v).collect())
    }

    /// Generates the hits. Strips that fall outside the plane are skipped.
    ///
    /// # Errors
    /// [CodecError::Configuration] on an invalid offset, x VMM or x channel index.
    pub fn hits(&self) -> Result<Vec<HitRecord>> {
        let x = i32::from(self.x_strip()?);
        let stereo = self.stereo_strips()?;
        let mut hits = Vec::new();
        let mut shift = 0;
        for (idx, region) in self.regions.iter().enumerate() {
            let mut bc = self.timing.start_bc(shift);
            for (u, v) in &stereo {
                let strips = if region % 2 == 0 {
                    [x, x, *u, *v]
                } else {
                    [*u, *v, x, x]
                };
                for (plane, strip) in (0..N_PLANES).zip(strips) {
                    let Ok(strip) = u16::try_from(strip) else {
                        continue;
                    };
                    if strip >= STRIPS_PER_PLANE {
                        continue;
                    }
                    hits.push(HitRecord::from_strip(
                        strip,
                        self.timing.plane_bc(bc, plane),
                        plane,
                        *region,
                    )?);
                }
                bc += self.timing.bc_gap_track;
            }
            if idx % 2 == 1 {
                shift += self.timing.bc_gap_region;
            }
        }
        log::debug!(
            "Horizontal pattern around x strip {x} generated {} hits over {} regions",
            hits.len(),
            self.regions.len()
        );
        Ok(hits)
    }
}
