//! The [HitMap]: BCIDs recorded per channel, used both as the truth a packet is checked against and as the result of decoding one.

use super::hit::{ChannelKey, HitRecord, VmmId, MAX_BCID, N_CHANNELS};
use crate::error::{CodecError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{btree_map, BTreeMap, BTreeSet};

/// Sorted, de-duplicated BCIDs per channel.
///
/// Serialises as a list of [ChannelHits] under a `channels` key, so the map can be stored as TOML or JSON next to simulated data.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "HitMapRepr", into = "HitMapRepr")]
pub struct HitMap {
    channels: BTreeMap<ChannelKey, Vec<u16>>,
}

impl HitMap {
    /// Creates an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a map from hit records.
    pub fn from_records<'a>(records: impl IntoIterator<Item = &'a HitRecord>) -> Self {
        let mut map = Self::new();
        records
            .into_iter()
            .for_each(|hit| map.insert(hit.key(), hit.bcid()));
        map
    }

    /// Adds a BCID to a channel, keeping the BCID list sorted and free of duplicates.
    pub fn insert(&mut self, key: ChannelKey, bcid: u16) {
        let bcids = self.channels.entry(key).or_default();
        if let Err(pos) = bcids.binary_search(&bcid) {
            bcids.insert(pos, bcid);
        }
    }

    /// BCIDs recorded on a channel.
    pub fn get(&self, key: &ChannelKey) -> Option<&[u16]> {
        self.channels.get(key).map(Vec::as_slice)
    }

    /// Returns true if the channel has at least one BCID.
    pub fn contains(&self, key: &ChannelKey) -> bool {
        self.channels.contains_key(key)
    }

    /// Iterates over channels in ascending key order.
    pub fn iter(&self) -> btree_map::Iter<'_, ChannelKey, Vec<u16>> {
        self.channels.iter()
    }

    /// Iterates over the channel keys in ascending order.
    pub fn keys(&self) -> btree_map::Keys<'_, ChannelKey, Vec<u16>> {
        self.channels.keys()
    }

    /// Number of channels in the map.
    pub fn len(&self) -> usize {
        self.channels.len()
    }

    /// Returns true if no channel has any BCID.
    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// Total number of hits across all channels.
    pub fn hit_count(&self) -> usize {
        self.channels.values().map(Vec::len).sum()
    }

    /// All regions present in the map.
    pub fn regions(&self) -> BTreeSet<u8> {
        self.channels.keys().map(|key| key.region).collect()
    }

    /// A copy of the map restricted to one region.
    pub fn for_region(&self, region: u8) -> Self {
        Self {
            channels: self
                .channels
                .iter()
                .filter(|(key, _)| key.region == region)
                .map(|(key, bcids)| (*key, bcids.clone()))
                .collect(),
        }
    }

    /// Adds every channel of `other` to this map.
    pub fn extend(&mut self, other: &HitMap) {
        other.iter().for_each(|(key, bcids)| {
            bcids.iter().for_each(|bcid| self.insert(*key, *bcid));
        });
    }

    /// Converts the map back into hit records, ordered by channel then BCID.
    pub fn records(&self) -> Vec<HitRecord> {
        self.channels
            .iter()
            .flat_map(|(key, bcids)| {
                bcids
                    .iter()
                    .filter_map(move |bcid| HitRecord::from_key(*key, *bcid).ok())
            })
            .collect()
    }
}

impl<'a> IntoIterator for &'a HitMap {
    type Item = (&'a ChannelKey, &'a Vec<u16>);
    type IntoIter = btree_map::Iter<'a, ChannelKey, Vec<u16>>;

    fn into_iter(self) -> Self::IntoIter {
        self.channels.iter()
    }
}

/// One channel of a serialised [HitMap].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelHits {
    /// Region (fibre)
    pub region: u8,
    /// VMM in `plane.vmm` notation
    pub vmm: VmmId,
    /// Channel on the VMM
    pub channel: u8,
    /// BCIDs recorded on the channel
    pub bcids: Vec<u16>,
}

#[derive(Serialize, Deserialize)]
struct HitMapRepr {
    #[serde(default)]
    channels: Vec<ChannelHits>,
}

impl From<HitMap> for HitMapRepr {
    fn from(map: HitMap) -> Self {
        Self {
            channels: map
                .channels
                .into_iter()
                .map(|(key, bcids)| ChannelHits {
                    region: key.region,
                    vmm: key.vmm,
                    channel: key.channel,
                    bcids,
                })
                .collect(),
        }
    }
}

impl TryFrom<HitMapRepr> for HitMap {
    type Error = CodecError;

    fn try_from(repr: HitMapRepr) -> Result<Self> {
        let mut map = HitMap::new();
        for entry in repr.channels {
            if entry.channel >= N_CHANNELS {
                return Err(CodecError::InvalidHit(format!(
                    "channel {} out of range in hit map",
                    entry.channel
                )));
            }
            let key = ChannelKey::new(entry.region, entry.vmm, entry.channel);
            for bcid in entry.bcids {
                if bcid > MAX_BCID {
                    return Err(CodecError::InvalidHit(format!(
                        "BCID {bcid} out of range in hit map for {key}"
                    )));
                }
                map.insert(key, bcid);
            }
        }
        Ok(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn hit(channel: u8, vmm: u8, bcid: u16, plane: u8) -> HitRecord {
        HitRecord::new(channel, vmm, bcid, plane, 20).unwrap()
    }

    #[test]
    fn test_from_records_sorts_and_dedups() {
        let hits = [hit(3, 0, 101, 0), hit(3, 0, 100, 0), hit(3, 0, 101, 0)];
        let map = HitMap::from_records(&hits);
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&hits[0].key()), Some([100, 101].as_slice()));
        assert_eq!(map.hit_count(), 2);
    }

    #[test]
    fn test_records_roundtrip() {
        let hits = vec![hit(1, 2, 7, 3), hit(3, 0, 100, 0), hit(3, 0, 140, 0)];
        let map = HitMap::from_records(&hits);
        let mut expected = hits.clone();
        expected.sort();
        assert_eq!(map.records(), expected);
    }

    #[test]
    fn test_for_region() {
        let mut map = HitMap::from_records(&[hit(1, 0, 7, 0)]);
        let other = HitRecord::new(1, 0, 7, 0, 21).unwrap();
        map.insert(other.key(), other.bcid());
        assert_eq!(map.regions(), BTreeSet::from([20, 21]));
        let only_21 = map.for_region(21);
        assert_eq!(only_21.len(), 1);
        assert!(only_21.contains(&other.key()));
    }

    #[test]
    fn test_serde_consistency() {
        let map = HitMap::from_records(&[hit(3, 0, 100, 0), hit(9, 7, 4095, 3)]);

        let map_ser_json = serde_json::to_string(&map).unwrap();
        let map_de_json: HitMap = serde_json::from_str(&map_ser_json).unwrap();
        assert_eq!(map, map_de_json);

        let map_ser_toml = toml::to_string(&map).unwrap();
        let map_de_toml: HitMap = toml::from_str(&map_ser_toml).unwrap();
        assert_eq!(map, map_de_toml);
        println!("{map_ser_toml}");
    }

    #[test]
    fn test_deserialize_truth_toml() {
        let truth = r#"
            [[channels]]
            region = 20
            vmm = "2.5"
            channel = 33
            bcids = [64, 32]
        "#;
        let map: HitMap = toml::from_str(truth).unwrap();
        let key = ChannelKey::new(20, VmmId::new(2, 5).unwrap(), 33);
        assert_eq!(map.get(&key), Some([32, 64].as_slice()));
    }

    #[test]
    fn test_deserialize_rejects_out_of_range_bcid() {
        let truth = r#"{"channels":[{"region":20,"vmm":"0.0","channel":1,"bcids":[4096]}]}"#;
        assert!(serde_json::from_str::<HitMap>(truth).is_err());
    }
}
