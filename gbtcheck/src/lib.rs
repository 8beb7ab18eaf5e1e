#![warn(unused_extern_crates)]
#![warn(missing_docs)]
#![warn(missing_copy_implementations)]
// Readability lints
#![warn(
    clippy::option_filter_map,
    clippy::manual_filter_map,
    clippy::if_not_else,
    clippy::nonminimal_bool,
    clippy::single_match_else,
    clippy::range_plus_one,
    clippy::int_plus_one,
    clippy::needless_range_loop,
    clippy::needless_continue,
    clippy::shadow_same,
    clippy::shadow_unrelated
)]
// Performance lints
#![warn(variant_size_differences)]
#![warn(
    clippy::needless_pass_by_value,
    clippy::unnecessary_wraps,
    clippy::mutex_integer,
    clippy::mem_forget,
    clippy::maybe_infinite_iter
)]
// Safety lints
#![warn(unused_results)]
#![warn(unused_import_braces)]
#![warn(trivial_casts, trivial_numeric_casts)]
// Unhandled results (allow unwrap and expect as there are many cases where the unwrap is totally safe)
#![warn(clippy::map_unwrap_or)]

//! Validation and timing analysis of GBT packets built from VMM hit data.
//!
//! Hits are encoded into packets by [vmm_gbt_protocol], one packet per region. `gbtcheck` decodes the packets again,
//! compares them channel by channel against the hits they were built from, and derives the BCID slope of tracks crossing the planes.
//!
//! # Usage
//!
//! ## Checking hits end to end
//! ```
//! use gbtcheck::config::test_util::MockConfig;
//! use vmm_gbt_protocol::prelude::HitRecord;
//! use std::sync::OnceLock;
//!
//! static CONFIG: OnceLock<MockConfig> = OnceLock::new();
//! let config = CONFIG.get_or_init(|| MockConfig {
//!     timing_analysis: true,
//!     ..Default::default()
//! });
//!
//! // A track crossing plane 0 of two pairs, 10 BC apart
//! let hits = [
//!     HitRecord::new(3, 0, 100, 0, 20).unwrap(),
//!     HitRecord::new(3, 0, 110, 0, 22).unwrap(),
//! ];
//! let summary = gbtcheck::run_checks(config, &hits).unwrap();
//!
//! assert!(summary.result.is_clean());
//! assert_eq!(summary.slopes[&0], Ok(10.0));
//! ```
//!
//! ## Checking a packet against its truth
//! ```
//! use gbtcheck::analyze::{check_result::Verdict, checker};
//! use vmm_gbt_protocol::prelude::*;
//!
//! let hits = [HitRecord::new(3, 0, 100, 0, 20).unwrap()];
//! let packet = PacketBuilder::new(&BuilderConfig::default())
//!     .unwrap()
//!     .make_packet(&hits)
//!     .unwrap();
//! let truth = HitMap::from_records(&hits);
//!
//! let result = checker::check(&packet, &truth);
//! assert_eq!(result.verdict(&hits[0].key()), Some(Verdict::Match));
//! ```

use crate::util::*;

/// Write an error message to stderr.
/// All error messages should be written through this function to ensure consistency.
#[inline]
pub fn display_error(err_msg: &str) {
    log::error!("{}", owo_colors::OwoColorize::red(&err_msg));
}

pub mod analyze;
pub mod config;
pub mod stats;
pub mod util;

pub use analyze::dispatcher::check_units;

/// Everything a run of [run_checks] produced.
#[derive(Debug)]
pub struct RunSummary {
    /// Check results of every region merged
    pub result: CheckResult,
    /// Slope per plane, empty if timing analysis is disabled
    pub slopes: BTreeMap<u8, Result<f64, TimingError>>,
    /// Possibly swapped planes, empty if swap diagnosis is disabled
    pub swaps: Vec<SwapCandidate>,
    /// Stats collected by the controller
    pub stats: StatsCollector,
    /// Set if any errors were reported
    pub any_errors: bool,
    /// Set if some packets were never checked because processing was stopped
    pub stopped_early: bool,
}

/// Builds a packet per region from the hits, checks every packet against the hits it was built from and analyzes the outcome.
///
/// Follows these steps:
/// 1. Start the stats controller with [stats::init_stats_controller].
/// 2. Build the packets with [dispatcher::build_units].
/// 3. Check the packets on worker threads with [check_units] and merge the results.
/// 4. Depending on [Config], compute the slope of every plane and diagnose fibre swaps.
/// 5. Join the stats controller, which prints the errors, the report and writes the stats as configured.
///
/// # Errors
/// If the config is invalid, the hits can't be built into packets, or a thread can't be spawned or joined.
pub fn run_checks<C: Config + 'static>(config: &'static C, hits: &[HitRecord]) -> io::Result<RunSummary> {
    config
        .validate_args()
        .map_err(|e| io::Error::new(io::ErrorKind::InvalidInput, e))?;
    let (stats_handle, stats_send, stop_flag, any_errors_flag) =
        stats::init_stats_controller(config)?;

    let units = match dispatcher::build_units(config, hits, &stats_send) {
        Ok(units) => units,
        Err(e) => {
            dispatcher::send_stat(&stats_send, StatType::Fatal(e.to_string().into()));
            drop(stats_send);
            let _stats = join_stats_controller(stats_handle)?;
            return Err(io::Error::new(io::ErrorKind::InvalidInput, e));
        }
    };
    log::info!("Checking {} packets", units.len());

    let results = check_units(config, units, &stats_send, &stop_flag)?;
    let stopped_early = results.iter().any(Option::is_none);
    if stopped_early {
        log::warn!("Processing stopped early, some packets were not checked");
    }
    let mut result = CheckResult::default();
    results
        .into_iter()
        .flatten()
        .for_each(|region_result| result.merge(region_result));

    let slopes = if config.timing_analysis() {
        analyze_timing(&result, &stats_send)
    } else {
        BTreeMap::new()
    };

    let swaps = if config.diagnose_swaps() {
        let candidates = diagnose::diagnose_swaps(&result);
        candidates.iter().for_each(|candidate| {
            dispatcher::send_stat(&stats_send, StatType::SwapCandidate(*candidate));
        });
        candidates
    } else {
        Vec::new()
    };

    drop(stats_send);
    let stats = join_stats_controller(stats_handle)?;

    Ok(RunSummary {
        result,
        slopes,
        swaps,
        stats,
        any_errors: any_errors_flag.load(Ordering::SeqCst),
        stopped_early,
    })
}

// Slope errors are only reported for planes that had hits to fit
fn analyze_timing(
    result: &CheckResult,
    stats_send: &flume::Sender<StatType>,
) -> BTreeMap<u8, Result<f64, TimingError>> {
    let planes_with_hits = result.plane_counts();
    let slopes = timing::slopes_per_plane(result);
    slopes.iter().for_each(|(&plane, slope)| match slope {
        Ok(slope) => dispatcher::send_stat(stats_send, StatType::Slope { plane, slope: *slope }),
        Err(e) if planes_with_hits.contains_key(&plane) => {
            dispatcher::send_stat(stats_send, StatType::Error(format!("Plane {plane}: {e}").into()));
        }
        Err(e) => log::debug!("Plane {plane} skipped: {e}"),
    });
    slopes
}

fn join_stats_controller(handle: JoinHandle<StatsCollector>) -> io::Result<StatsCollector> {
    handle
        .join()
        .map_err(|_| io::Error::other("Stats controller thread panicked"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn track_hits() -> Vec<HitRecord> {
        // BCID advances 10 per pair on plane 0
        [(20, 100), (22, 110), (24, 120)]
            .into_iter()
            .map(|(region, bcid)| HitRecord::new(3, 0, bcid, 0, region).unwrap())
            .collect()
    }

    static CFG_TEST_RUN_CHECKS: OnceLock<MockConfig> = OnceLock::new();

    #[test]
    fn test_run_checks() {
        let cfg = CFG_TEST_RUN_CHECKS.get_or_init(|| MockConfig {
            timing_analysis: true,
            diagnose_swaps: true,
            ..Default::default()
        });

        let summary = run_checks(cfg, &track_hits()).unwrap();

        assert!(summary.result.is_clean());
        assert!(!summary.any_errors);
        assert!(!summary.stopped_early);
        assert_eq!(summary.slopes[&0], Ok(10.0));
        assert!(summary.swaps.is_empty());
        assert_eq!(summary.stats.check_stats().packets_checked(), 3);
        assert_eq!(summary.stats.check_stats().slopes().len(), 1);
        // Planes without hits don't count as errors
        assert_eq!(summary.stats.err_count(), 0);
    }

    static CFG_TEST_RUN_CHECKS_NO_TIMING: OnceLock<MockConfig> = OnceLock::new();

    #[test]
    fn test_run_checks_timing_disabled() {
        let cfg = CFG_TEST_RUN_CHECKS_NO_TIMING.get_or_init(MockConfig::default);

        let summary = run_checks(cfg, &track_hits()).unwrap();

        assert!(summary.slopes.is_empty());
        assert!(summary.stats.check_stats().slopes().is_empty());
    }

    static CFG_TEST_RUN_CHECKS_SINGLE_POINT: OnceLock<MockConfig> = OnceLock::new();

    #[test]
    fn test_run_checks_single_point_slope_error() {
        let cfg = CFG_TEST_RUN_CHECKS_SINGLE_POINT.get_or_init(|| MockConfig {
            timing_analysis: true,
            mute_errors: true,
            ..Default::default()
        });

        let summary = run_checks(cfg, &track_hits()[..1]).unwrap();

        assert!(matches!(
            summary.slopes[&0],
            Err(TimingError::InsufficientData { plane: 0, points: 1 })
        ));
        assert!(summary.any_errors);
        assert_eq!(summary.stats.unique_error_codes_as_slice(), ["30"]);
    }

    static CFG_TEST_RUN_CHECKS_EMPTY: OnceLock<MockConfig> = OnceLock::new();

    #[test]
    fn test_run_checks_invalid_config() {
        let cfg = CFG_TEST_RUN_CHECKS_EMPTY.get_or_init(|| MockConfig {
            bc_gap: 0,
            mute_errors: true,
            ..Default::default()
        });

        let err = run_checks(cfg, &track_hits()).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
    }
}
