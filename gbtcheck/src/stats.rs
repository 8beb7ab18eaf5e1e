//! All stat collecting functionality, and the controller that can stop processing based on the collected stats.
//!
//! Contains the [init_stats_controller] function, which spawns a thread with the [Controller](controller::Controller) running, and returns the thread handle, the channel to send stats to, and the flags it controls.

use crate::util::*;

pub mod controller;
pub mod err_printer;
pub mod stats_collector;
pub mod stats_report;

#[derive(Debug, Clone, PartialEq)]
/// Possible stats that can be sent to the [Controller](controller::Controller).
pub enum StatType {
    /// Fatal error, stop processing.
    Fatal(Box<str>),
    /// Non-fatal error, reported but processing continues.
    Error(Box<str>),
    /// A packet was checked.
    PacketChecked {
        /// Region of the packet
        region: u8,
        /// Number of data words in the packet
        words: usize,
    },
    /// Hits dropped by gap suppression before building.
    HitsSuppressed(u32),
    /// Channel verdicts of one plane in one packet.
    PlaneVerdicts {
        /// The plane
        plane: u8,
        /// Verdict counts
        counts: PlaneCounts,
    },
    /// Decoded channels that were not in the truth.
    UnexpectedChannels(u32),
    /// BCID slope of a plane.
    Slope {
        /// The plane
        plane: u8,
        /// BC per pair
        slope: f64,
    },
    /// Two planes with possibly swapped fibres.
    SwapCandidate(SwapCandidate),
}

impl fmt::Display for StatType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatType::Fatal(e) => write!(f, "Fatal error: {e}"),
            StatType::Error(e) => write!(f, "Error: {e}"),
            StatType::PacketChecked { region, words } => {
                write!(f, "Packet of region {region} checked: {words} words")
            }
            StatType::HitsSuppressed(n) => write!(f, "{n} hits suppressed"),
            StatType::PlaneVerdicts { plane, counts } => write!(
                f,
                "Plane {plane}: {} matched, {} mismatched, {} missing",
                counts.matched, counts.mismatched, counts.missing
            ),
            StatType::UnexpectedChannels(n) => write!(f, "{n} unexpected channels"),
            StatType::Slope { plane, slope } => write!(f, "Plane {plane} slope: {slope:.3}"),
            StatType::SwapCandidate(candidate) => write!(f, "Swap candidate: {candidate}"),
        }
    }
}

/// Handles returned by [init_stats_controller].
pub type StatsControllerHandles = (
    JoinHandle<StatsCollector>,
    flume::Sender<StatType>,
    Arc<AtomicBool>,
    Arc<AtomicBool>,
);

/// Spawns a thread with the [Controller](controller::Controller) running, and returns the thread handle, the channel to send stats to, the stop flag and the any-errors flag.
///
/// The thread returns the [StatsCollector] once every sender is dropped.
pub fn init_stats_controller<C: Config + 'static>(
    config: &'static C,
) -> io::Result<StatsControllerHandles> {
    log::trace!("Initializing stats controller");
    let mut stats = controller::Controller::new(config);
    let send_stats_channel = stats
        .send_channel()
        .ok_or_else(|| io::Error::other("Stats controller does not accept new producers"))?;
    let thread_stop_flag = stats.end_processing_flag();
    let any_errors_flag = stats.any_errors_flag();

    let stats_thread = thread::Builder::new()
        .name("stats_thread".to_string())
        .spawn(move || {
            stats.run();
            stats.into_stats_collector()
        })?;
    Ok((
        stats_thread,
        send_stats_channel,
        thread_stop_flag,
        any_errors_flag,
    ))
}
