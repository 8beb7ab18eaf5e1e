//! Hit records produced by the VMM front-end chips and the identifiers used to key them.

use crate::error::{CodecError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display};
use std::str::FromStr;

/// Number of detector planes read out over one fibre.
pub const N_PLANES: u8 = 4;
/// Number of VMM chips per plane.
pub const N_VMMS_PER_PLANE: u8 = 8;
/// Number of channels per VMM.
pub const N_CHANNELS: u8 = 64;
/// The BCID counter is 12 bits wide.
pub const MAX_BCID: u16 = 0xFFF;
/// Number of strips on one plane, all VMMs of the plane side by side.
pub const STRIPS_PER_PLANE: u16 = N_VMMS_PER_PLANE as u16 * N_CHANNELS as u16;

/// Two consecutive regions (fibres) form one pair.
///
/// # Example
/// ```
/// # use vmm_gbt_protocol::words::hit::pair_of;
/// assert_eq!(pair_of(20), 10);
/// assert_eq!(pair_of(21), 10);
/// assert_eq!(pair_of(22), 11);
/// ```
#[inline]
pub const fn pair_of(region: u8) -> u8 {
    region / 2
}

/// Identifies one VMM chip by its plane and its position on the plane.
///
/// Orders by plane first, so the ordering matches the `plane.vmm` notation used in truth files, e.g. `0.7 < 1.0 < 1.2`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct VmmId {
    plane: u8,
    vmm: u8,
}

impl VmmId {
    /// Creates a VMM identifier, validating both parts.
    pub fn new(plane: u8, vmm: u8) -> Result<Self> {
        if plane >= N_PLANES {
            return Err(CodecError::InvalidHit(format!(
                "plane {plane} out of range, must be below {N_PLANES}"
            )));
        }
        if vmm >= N_VMMS_PER_PLANE {
            return Err(CodecError::InvalidHit(format!(
                "VMM {vmm} out of range, must be below {N_VMMS_PER_PLANE}"
            )));
        }
        Ok(Self { plane, vmm })
    }

    /// Plane the VMM is mounted on.
    #[inline]
    pub fn plane(&self) -> u8 {
        self.plane
    }

    /// Position of the VMM on its plane.
    #[inline]
    pub fn vmm(&self) -> u8 {
        self.vmm
    }

    /// The byte written into the key field of a data word: plane in the high nibble, VMM in the low nibble.
    #[inline]
    pub fn key_byte(&self) -> u8 {
        (self.plane << 4) | self.vmm
    }

    /// Inverse of [VmmId::key_byte].
    pub fn from_key_byte(key: u8) -> Result<Self> {
        Self::new(key >> 4, key & 0xF)
    }
}

impl Display for VmmId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.plane, self.vmm)
    }
}

impl FromStr for VmmId {
    type Err = CodecError;

    /// Parses the `plane.vmm` notation, e.g. `"2.5"`.
    fn from_str(s: &str) -> Result<Self> {
        let invalid = || CodecError::InvalidHit(format!("invalid VMM identifier {s:?}, expected <plane>.<vmm>"));
        let (plane, vmm) = s.trim().split_once('.').ok_or_else(invalid)?;
        let plane = plane.parse::<u8>().map_err(|_| invalid())?;
        let vmm = vmm.parse::<u8>().map_err(|_| invalid())?;
        Self::new(plane, vmm)
    }
}

impl TryFrom<String> for VmmId {
    type Error = CodecError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<VmmId> for String {
    fn from(value: VmmId) -> Self {
        value.to_string()
    }
}

/// Key of one readout channel across all packets: the region (fibre), the VMM and the channel on the VMM.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct ChannelKey {
    /// Region (fibre) the channel is read out on
    pub region: u8,
    /// VMM the channel belongs to
    pub vmm: VmmId,
    /// Channel number on the VMM
    pub channel: u8,
}

impl ChannelKey {
    /// Creates a new channel key.
    pub const fn new(region: u8, vmm: VmmId, channel: u8) -> Self {
        Self {
            region,
            vmm,
            channel,
        }
    }

    /// Plane of the channel.
    #[inline]
    pub fn plane(&self) -> u8 {
        self.vmm.plane()
    }

    /// Pair the channel's region belongs to.
    #[inline]
    pub fn pair(&self) -> u8 {
        pair_of(self.region)
    }

    /// Strip number on the plane.
    #[inline]
    pub fn strip(&self) -> u16 {
        u16::from(self.vmm.vmm()) * u16::from(N_CHANNELS) + u16::from(self.channel)
    }
}

impl Display for ChannelKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "region {} VMM {} ch {}", self.region, self.vmm, self.channel)
    }
}

/// A single hit on one channel of a VMM at one bunch crossing.
///
/// Immutable once created, all fields are validated by [HitRecord::new].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "UncheckedHitRecord")]
pub struct HitRecord {
    region: u8,
    vmm: VmmId,
    channel: u8,
    bcid: u16,
}

impl HitRecord {
    /// Creates a hit record.
    ///
    /// # Errors
    /// [CodecError::InvalidHit] if the channel, VMM, BCID or plane is out of range.
    ///
    /// # Example
    /// ```
    /// # use vmm_gbt_protocol::words::hit::HitRecord;
    /// let hit = HitRecord::new(3, 0, 100, 2, 20).unwrap();
    /// assert_eq!(hit.vmm().to_string(), "2.0");
    /// assert!(HitRecord::new(64, 0, 100, 2, 20).is_err());
    /// ```
    pub fn new(channel: u8, vmm: u8, bcid: u16, plane: u8, region: u8) -> Result<Self> {
        let vmm = VmmId::new(plane, vmm)?;
        if channel >= N_CHANNELS {
            return Err(CodecError::InvalidHit(format!(
                "channel {channel} out of range, must be below {N_CHANNELS}"
            )));
        }
        if bcid > MAX_BCID {
            return Err(CodecError::InvalidHit(format!(
                "BCID {bcid} out of range, maximum is {MAX_BCID}"
            )));
        }
        Ok(Self {
            region,
            vmm,
            channel,
            bcid,
        })
    }

    /// Creates a hit record from a strip number on a plane, as used by the track pattern generators.
    pub fn from_strip(strip: u16, bcid: u16, plane: u8, region: u8) -> Result<Self> {
        if strip >= STRIPS_PER_PLANE {
            return Err(CodecError::InvalidHit(format!(
                "strip {strip} out of range, must be below {STRIPS_PER_PLANE}"
            )));
        }
        let n_channels = u16::from(N_CHANNELS);
        Self::new(
            (strip % n_channels) as u8,
            (strip / n_channels) as u8,
            bcid,
            plane,
            region,
        )
    }

    /// Creates a hit record from a channel key and a BCID.
    pub fn from_key(key: ChannelKey, bcid: u16) -> Result<Self> {
        Self::new(
            key.channel,
            key.vmm.vmm(),
            bcid,
            key.vmm.plane(),
            key.region,
        )
    }

    /// Channel number on the VMM.
    #[inline]
    pub fn channel(&self) -> u8 {
        self.channel
    }

    /// The VMM that recorded the hit.
    #[inline]
    pub fn vmm(&self) -> VmmId {
        self.vmm
    }

    /// Bunch crossing identifier of the hit.
    #[inline]
    pub fn bcid(&self) -> u16 {
        self.bcid
    }

    /// Plane the hit was recorded on.
    #[inline]
    pub fn plane(&self) -> u8 {
        self.vmm.plane()
    }

    /// Region (fibre) the hit is read out on.
    #[inline]
    pub fn region(&self) -> u8 {
        self.region
    }

    /// The channel the hit belongs to.
    #[inline]
    pub fn key(&self) -> ChannelKey {
        ChannelKey::new(self.region, self.vmm, self.channel)
    }

    /// Strip number on the plane.
    #[inline]
    pub fn strip(&self) -> u16 {
        self.key().strip()
    }
}

impl Display for HitRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} bcid {}", self.key(), self.bcid)
    }
}

#[derive(Deserialize)]
struct UncheckedHitRecord {
    region: u8,
    vmm: VmmId,
    channel: u8,
    bcid: u16,
}

impl TryFrom<UncheckedHitRecord> for HitRecord {
    type Error = CodecError;

    fn try_from(raw: UncheckedHitRecord) -> Result<Self> {
        Self::new(raw.channel, raw.vmm.vmm(), raw.bcid, raw.vmm.plane(), raw.region)
    }
}
