//! Timing analysis of matched hits: the BCID of a track as it crosses pairs of regions, and the slope of that progression.

use crate::util::*;

/// Errors of the timing analysis.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TimingError {
    /// Fewer than two points to fit
    #[error("[E30] insufficient data: {points} point(s) on plane {plane}, at least 2 are needed")]
    InsufficientData {
        /// Plane of the series
        plane: u8,
        /// Number of points found
        points: usize,
    },
    /// A series breaking its one-point-per-pair invariant
    #[error("[E31] invariant violation on plane {plane}: {reason}")]
    InvariantViolation {
        /// Plane of the series
        plane: u8,
        /// What was violated
        reason: String,
    },
}

/// One point of a [BcidSeries].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct BcidPoint {
    /// Plane the hit was on
    pub plane: u8,
    /// Pair of regions the hit was in
    pub pair_id: u8,
    /// BCID of the hit
    pub bcid: u16,
}

/// BCIDs of a plane ordered by pair. Points can only be appended.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BcidSeries {
    plane: u8,
    points: Vec<BcidPoint>,
}

impl BcidSeries {
    /// An empty series for a plane.
    pub fn new(plane: u8) -> Self {
        Self {
            plane,
            points: Vec::new(),
        }
    }

    /// Plane of the series.
    pub fn plane(&self) -> u8 {
        self.plane
    }

    /// Appends a point.
    pub fn push(&mut self, pair_id: u8, bcid: u16) {
        self.points.push(BcidPoint {
            plane: self.plane,
            pair_id,
            bcid,
        });
    }

    /// The points in insertion order.
    pub fn points(&self) -> &[BcidPoint] {
        &self.points
    }

    /// Number of points.
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// True without points.
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }
}

/// Selects the matched BCIDs of a plane into a series, one point per pair.
///
/// The point of a pair is its earliest matched BCID. Points are ordered by pair.
pub fn select_series(result: &CheckResult, plane: u8) -> BcidSeries {
    let mut earliest: BTreeMap<u8, u16> = BTreeMap::new();
    for channel in result
        .channels()
        .filter(|c| c.key.plane() == plane && c.verdict == Verdict::Match)
    {
        for bcid in channel.matched_bcids() {
            let _ = earliest
                .entry(channel.key.pair())
                .and_modify(|e| *e = (*e).min(bcid))
                .or_insert(bcid);
        }
    }
    let mut series = BcidSeries::new(plane);
    earliest
        .into_iter()
        .for_each(|(pair_id, bcid)| series.push(pair_id, bcid));
    series
}

/// Least squares slope of BCID over pair id.
///
/// # Errors
/// [TimingError::InsufficientData] with fewer than two points, [TimingError::InvariantViolation] if a pair id repeats.
pub fn compute_slope(series: &BcidSeries) -> Result<f64, TimingError> {
    let plane = series.plane();
    if series.len() < 2 {
        return Err(TimingError::InsufficientData {
            plane,
            points: series.len(),
        });
    }
    if let Some(dup) = series
        .points()
        .iter()
        .map(|p| p.pair_id)
        .duplicates()
        .next()
    {
        return Err(TimingError::InvariantViolation {
            plane,
            reason: format!("pair {dup} appears more than once"),
        });
    }

    let n = series.len() as f64;
    let (sum_x, sum_y) = series
        .points()
        .iter()
        .fold((0.0, 0.0), |(sx, sy), p| {
            (sx + f64::from(p.pair_id), sy + f64::from(p.bcid))
        });
    let (mean_x, mean_y) = (sum_x / n, sum_y / n);
    let (cov, var) = series.points().iter().fold((0.0, 0.0), |(cov, var), p| {
        let dx = f64::from(p.pair_id) - mean_x;
        (cov + dx * (f64::from(p.bcid) - mean_y), var + dx * dx)
    });
    let slope = cov / var;
    log::debug!("Plane {plane}: slope {slope:.3} BC per pair from {} points", series.len());
    Ok(slope)
}

/// Slope of every plane, errors are kept per plane.
pub fn slopes_per_plane(result: &CheckResult) -> BTreeMap<u8, Result<f64, TimingError>> {
    (0..N_PLANES)
        .map(|plane| (plane, compute_slope(&select_series(result, plane))))
        .collect()
}

/// Number of matched hits per BCID on a plane.
pub fn bcid_histogram(result: &CheckResult, plane: u8) -> BTreeMap<u16, usize> {
    let mut histogram: BTreeMap<u16, usize> = BTreeMap::new();
    result
        .channels()
        .filter(|c| c.key.plane() == plane)
        .flat_map(ChannelVerdict::matched_bcids)
        .for_each(|bcid| *histogram.entry(bcid).or_default() += 1);
    histogram
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyze::checker::check;
    use pretty_assertions::assert_eq;

    fn series(points: &[(u8, u16)]) -> BcidSeries {
        let mut s = BcidSeries::new(1);
        points.iter().for_each(|(pair, bcid)| s.push(*pair, *bcid));
        s
    }

    #[test]
    fn test_slope_of_ten() {
        let s = series(&[(10, 100), (11, 110), (12, 120)]);
        assert_eq!(compute_slope(&s).unwrap(), 10.0);
    }

    #[test]
    fn test_slope_least_squares() {
        let s = series(&[(0, 0), (1, 1), (2, 5)]);
        assert_eq!(compute_slope(&s).unwrap(), 2.5);
    }

    #[test]
    fn test_single_point_insufficient() {
        let s = series(&[(10, 100)]);
        assert_eq!(
            compute_slope(&s),
            Err(TimingError::InsufficientData {
                plane: 1,
                points: 1
            })
        );
        assert!(compute_slope(&BcidSeries::new(0)).is_err());
    }

    #[test]
    fn test_repeated_pair_violation() {
        let s = series(&[(10, 100), (10, 101)]);
        let err = compute_slope(&s).unwrap_err();
        assert!(matches!(err, TimingError::InvariantViolation { plane: 1, .. }));
        assert!(err.to_string().starts_with("[E31]"));
    }

    fn result_for(hits: &[HitRecord]) -> CheckResult {
        let builder = PacketBuilder::new(&BuilderConfig::default()).unwrap();
        let truth = HitMap::from_records(hits);
        let mut result = CheckResult::default();
        builder
            .make_packets(hits)
            .unwrap()
            .iter()
            .for_each(|packet| result.merge(check(packet, &truth)));
        result
    }

    #[test]
    fn test_select_series_earliest_per_pair() {
        let hits = [
            HitRecord::new(1, 0, 105, 2, 20).unwrap(),
            HitRecord::new(2, 0, 100, 2, 21).unwrap(),
            HitRecord::new(1, 0, 110, 2, 22).unwrap(),
            HitRecord::new(1, 0, 90, 0, 22).unwrap(),
        ];
        let result = result_for(&hits);
        let s = select_series(&result, 2);
        assert_eq!(
            s.points(),
            &[
                BcidPoint {
                    plane: 2,
                    pair_id: 10,
                    bcid: 100
                },
                BcidPoint {
                    plane: 2,
                    pair_id: 11,
                    bcid: 110
                },
            ]
        );
        assert_eq!(compute_slope(&s).unwrap(), 10.0);
    }

    #[test]
    fn test_slopes_per_plane_isolates_errors() {
        let hits = [
            HitRecord::new(1, 0, 100, 0, 20).unwrap(),
            HitRecord::new(1, 0, 120, 0, 22).unwrap(),
            HitRecord::new(1, 0, 100, 1, 20).unwrap(),
        ];
        let slopes = slopes_per_plane(&result_for(&hits));
        assert_eq!(slopes.len(), 4);
        assert_eq!(slopes[&0], Ok(20.0));
        assert!(matches!(
            slopes[&1],
            Err(TimingError::InsufficientData { points: 1, .. })
        ));
        assert!(matches!(
            slopes[&3],
            Err(TimingError::InsufficientData { points: 0, .. })
        ));
    }

    #[test]
    fn test_bcid_histogram() {
        let hits = [
            HitRecord::new(1, 0, 100, 0, 20).unwrap(),
            HitRecord::new(2, 0, 100, 0, 20).unwrap(),
            HitRecord::new(2, 1, 130, 0, 20).unwrap(),
            HitRecord::new(2, 1, 130, 1, 20).unwrap(),
        ];
        let histogram = bcid_histogram(&result_for(&hits), 0);
        assert_eq!(histogram, BTreeMap::from([(100, 2), (130, 1)]));
    }
}
