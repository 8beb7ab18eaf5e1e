//! Contains the [StatsCollector] that collects stats from checking packets.
pub mod check_stats;
pub(super) mod error_stats;

use super::StatType;
use crate::util::*;
use error_stats::ErrorStats;

/// Collects stats from analysis.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsCollector {
    is_finalized: bool,
    check_stats: CheckStats,
    error_stats: ErrorStats,
}

impl StatsCollector {
    /// Record a stat.
    pub fn collect(&mut self, stat: StatType) {
        match stat {
            StatType::Fatal(m) => self.error_stats.add_fatal_err(m),
            StatType::Error(m) => self.error_stats.add_err(m),
            StatType::PacketChecked { region, words } => {
                self.check_stats.record_packet(region, words)
            }
            StatType::HitsSuppressed(n) => self.check_stats.add_hits_suppressed(n),
            StatType::PlaneVerdicts { plane, counts } => {
                self.check_stats.add_plane_verdicts(plane, counts)
            }
            StatType::UnexpectedChannels(n) => self.check_stats.add_unexpected_channels(n),
            StatType::Slope { plane, slope } => self.check_stats.record_slope(plane, slope),
            StatType::SwapCandidate(c) => self.check_stats.record_swap_candidate(c),
        }
    }

    /// Finalize stats collection. Meaning no more stats can be collected.
    ///
    /// Sorts the collected stats and extracts the unique error codes.
    /// Does nothing if already finalized.
    pub fn finalize(&mut self, mute_errors: bool) {
        if self.is_finalized {
            return;
        }
        self.error_stats.finalize_stats(mute_errors);
        self.check_stats.finalize();
        self.is_finalized = true;
    }

    /// Returns a reference to the [CheckStats].
    pub fn check_stats(&self) -> &CheckStats {
        &self.check_stats
    }

    /// Returns the number of errors reported.
    pub fn err_count(&self) -> u64 {
        self.error_stats.err_count()
    }

    /// Return if any errors were reported.
    pub fn any_errors(&self) -> bool {
        self.error_stats.err_count() > 0
    }

    /// Returns if any fatal errors were reported.
    pub fn fatal_err(&self) -> bool {
        self.error_stats.any_fatal_err()
    }

    /// Returns an iterator over the reported error messages.
    pub fn errors(&self) -> impl Iterator<Item = &Box<str>> {
        self.error_stats.errors_as_slice_iter()
    }

    /// Takes the reported errors and returns them as a vector of owned read-only strings.
    pub fn consume_reported_errors(&mut self) -> Vec<Box<str>> {
        self.error_stats.consume_reported_errors()
    }

    /// Takes the reported fatal error.
    pub fn take_fatal_err(&mut self) -> Option<Box<str>> {
        self.error_stats.take_fatal_err()
    }

    /// Returns a slice of the unique error codes of reported errors.
    pub fn unique_error_codes_as_slice(&self) -> &[String] {
        self.error_stats.unique_error_codes_as_slice()
    }

    /// Serializes the stats in the given format.
    pub fn to_string_format(&self, format: StatsOutputFormat) -> Result<String, String> {
        match format {
            StatsOutputFormat::JSON => serde_json::to_string_pretty(&self)
                .map_err(|e| format!("Failed to serialize stats to JSON: {e}")),
            StatsOutputFormat::TOML => toml::to_string_pretty(&self)
                .map_err(|e| format!("Failed to serialize stats to TOML: {e}")),
        }
    }

    /// Writes the stats to the given output in the given format.
    pub fn write_stats(
        &self,
        mode: &StatsOutputMode,
        format: StatsOutputFormat,
    ) -> Result<(), String> {
        if *mode == StatsOutputMode::None {
            return Ok(());
        }
        let stats_str = self.to_string_format(format)?;
        match mode {
            StatsOutputMode::File(path) => fs::write(path, stats_str)
                .map_err(|e| format!("Failed writing stats output file: {e}")),
            StatsOutputMode::Stdout => {
                use std::io::Write as _;
                writeln!(io::stdout().lock(), "{stats_str}")
                    .map_err(|e| format!("Failed writing stats to stdout: {e}"))
            }
            StatsOutputMode::None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_serde() {
        // Test serialization and deserialization of StatsCollector to JSON and TOML.
        let mut stats_collector = StatsCollector::default();
        stats_collector.collect(StatType::Fatal("fatal error".into()));
        stats_collector.collect(StatType::Error("R20 word 0: [E11] error".into()));
        stats_collector.collect(StatType::PacketChecked {
            region: 20,
            words: 5,
        });
        stats_collector.collect(StatType::HitsSuppressed(1));
        stats_collector.collect(StatType::PlaneVerdicts {
            plane: 3,
            counts: PlaneCounts {
                matched: 4,
                mismatched: 0,
                missing: 1,
            },
        });
        stats_collector.collect(StatType::UnexpectedChannels(2));
        stats_collector.collect(StatType::Slope {
            plane: 3,
            slope: -1.5,
        });
        stats_collector.collect(StatType::SwapCandidate(SwapCandidate {
            region: 21,
            planes: (0, 3),
            channels: 1,
        }));
        stats_collector.finalize(false);

        let json = serde_json::to_string(&stats_collector).unwrap();
        let from_json = serde_json::from_str::<StatsCollector>(&json).unwrap();
        println!("{}", stats_collector.to_string_format(StatsOutputFormat::JSON).unwrap());
        assert_eq!(stats_collector, from_json);

        let toml = toml::to_string(&stats_collector).unwrap();
        let from_toml = toml::from_str::<StatsCollector>(&toml).unwrap();
        println!("{toml}");
        assert_eq!(stats_collector, from_toml);
    }

    #[test]
    fn test_write_stats_to_file() {
        let dir = temp_dir::TempDir::new().unwrap();
        let path = dir.child("stats.toml");
        let mut stats_collector = StatsCollector::default();
        stats_collector.collect(StatType::PacketChecked {
            region: 22,
            words: 1,
        });
        stats_collector.finalize(false);
        stats_collector
            .write_stats(
                &StatsOutputMode::File(path.clone().into_boxed_path()),
                StatsOutputFormat::TOML,
            )
            .unwrap();
        let read_back: StatsCollector =
            toml::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(read_back, stats_collector);
    }
}
