pub mod report;
pub(crate) mod stat_format_utils;
mod table_formatter_utils;

use self::{
    report::{PlaneSlopeRow, PlaneVerdictRow},
    stat_format_utils::{format_error_codes, format_regions, format_slope},
};
use crate::util::*;

/// Helper function that makes the report
pub fn make_report(processing_time: Duration, stats_collector: &mut StatsCollector) -> Report {
    let mut report = Report::new(processing_time);

    if let Some(fatal_error) = stats_collector.take_fatal_err() {
        report.add_fatal_error(fatal_error.into_string());
    }

    add_global_stats_to_report(&mut report, stats_collector);

    let check_stats = stats_collector.check_stats();
    if !check_stats.plane_tallies().is_empty() {
        report.add_verdict_stats(
            check_stats
                .plane_tallies()
                .iter()
                .map(|t| PlaneVerdictRow {
                    plane: t.plane,
                    matched: t.matched,
                    mismatched: t.mismatched,
                    missing: t.missing,
                })
                .collect(),
        );
    }
    if !check_stats.slopes().is_empty() {
        report.add_timing_stats(
            check_stats
                .slopes()
                .iter()
                .map(|s| PlaneSlopeRow {
                    plane: s.plane,
                    slope: format_slope(s.slope),
                })
                .collect(),
        );
    }
    if !check_stats.swap_candidates().is_empty() {
        report.add_swap_candidates(
            check_stats
                .swap_candidates()
                .iter()
                .map(|s| {
                    StatSummary::new(
                        format!("R{:02}", s.region),
                        format!(
                            "{} / {}",
                            diagnose::plane_label(s.region, s.plane_a),
                            diagnose::plane_label(s.region, s.plane_b)
                        ),
                        Some(format!("{} channels", s.channels)),
                    )
                })
                .collect(),
        );
    }

    report
}

fn add_global_stats_to_report(report: &mut Report, stats_collector: &StatsCollector) {
    if stats_collector.err_count() == 0 {
        report.add_stat(StatSummary::new(
            "Total Errors".green().to_string(),
            stats_collector.err_count().green().to_string(),
            None,
        ));
    } else {
        report.add_stat(StatSummary::new(
            "Total Errors".red().to_string(),
            stats_collector.err_count().red().to_string(),
            Some(format_error_codes(
                stats_collector.unique_error_codes_as_slice(),
            )),
        ));
    }

    let check_stats = stats_collector.check_stats();
    report.add_stat(StatSummary::new(
        "Packets checked".to_string(),
        check_stats.packets_checked().to_string(),
        None,
    ));
    report.add_stat(StatSummary::new(
        "Data words".to_string(),
        check_stats.words_checked().to_string(),
        None,
    ));
    report.add_stat(StatSummary::new(
        "Regions".to_string(),
        format_regions(check_stats.regions_seen()),
        None,
    ));

    let counts = check_stats.total_counts();
    let notes = (counts.total() > 0).then(|| {
        format!(
            "{} mismatched, {} missing",
            counts.mismatched, counts.missing
        )
    });
    report.add_stat(StatSummary::new(
        "Channels matched".to_string(),
        format!("{}/{}", counts.matched, counts.total()),
        notes,
    ));
    if check_stats.unexpected_channels() > 0 {
        report.add_stat(StatSummary::new(
            "Unexpected channels".to_string(),
            check_stats.unexpected_channels().to_string(),
            None,
        ));
    }
    if check_stats.hits_suppressed() > 0 {
        report.add_stat(StatSummary::new(
            "Hits suppressed".to_string(),
            check_stats.hits_suppressed().to_string(),
            Some("closer than bc_gap".to_string()),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_make_report() {
        let mut collector = StatsCollector::default();
        collector.collect(StatType::Error("R20 VMM 0.1 ch 3: [E20] mismatch".into()));
        collector.collect(StatType::PacketChecked {
            region: 20,
            words: 4,
        });
        collector.collect(StatType::PlaneVerdicts {
            plane: 0,
            counts: PlaneCounts {
                matched: 3,
                mismatched: 1,
                missing: 0,
            },
        });
        collector.collect(StatType::Slope {
            plane: 0,
            slope: 10.0,
        });
        collector.finalize(false);

        let mut report = make_report(Duration::from_millis(3), &mut collector);
        assert_eq!(report.stats.len(), 5);
        assert_eq!(report.stats[4].value, "3/4");
        let table = report.build().to_string();
        assert!(table.contains("E20"));
        assert!(table.contains("10.000 BC/pair"));
    }
}
