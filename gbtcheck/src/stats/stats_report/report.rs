//! The [Report] struct is used by the stats controller to structure the report printed at the end of execution
//!
//! [Report] contains several [StatSummary] structs that are used to generate the report table
use tabled::{
    settings::{object::Rows, Alignment, Format, Modify, Panel, Style},
    Table, Tabled,
};

use super::table_formatter_utils::{
    format_global_stats_sub_table, format_sub_table, format_super_table, SubtableColor,
};
use owo_colors::OwoColorize;

/// Describes the columns of the report table
#[derive(Tabled, Default, Debug, Clone, PartialEq)]
pub struct StatSummary {
    /// Name of the statistic
    pub statistic: String,
    /// Its value
    pub value: String,
    /// Notes, e.g. the error codes seen
    pub notes: String,
}

impl StatSummary {
    /// Create a summary line, notes are empty if `None`
    pub fn new(statistic: String, value: String, notes: Option<String>) -> Self {
        Self {
            statistic,
            value,
            notes: notes.unwrap_or_default(),
        }
    }
}

/// Verdict counts of a plane as a row of the report
#[derive(Tabled)]
pub(crate) struct PlaneVerdictRow {
    pub(crate) plane: u8,
    pub(crate) matched: u32,
    pub(crate) mismatched: u32,
    pub(crate) missing: u32,
}

/// Slope of a plane as a row of the report
#[derive(Tabled)]
pub(crate) struct PlaneSlopeRow {
    pub(crate) plane: u8,
    pub(crate) slope: String,
}

/// The Report struct is used by the stats controller to structure the report printed at the end of execution
///
/// Contains convenience methods to add stats to the report, and to generate the report table
pub struct Report {
    pub(crate) stats: Vec<StatSummary>,
    verdict_table: Option<Table>,
    timing_table: Option<Table>,
    swap_table: Option<Table>,
    processing_time: std::time::Duration,
    fatal_error: Option<String>,
    report_table: Option<Table>,
}

impl Report {
    /// New empty report
    pub fn new(processing_time: std::time::Duration) -> Self {
        Self {
            stats: Vec::new(),
            verdict_table: None,
            timing_table: None,
            swap_table: None,
            processing_time,
            fatal_error: None,
            report_table: None,
        }
    }

    /// Add a line to the global stats
    pub fn add_stat(&mut self, stat: StatSummary) {
        self.stats.push(stat);
    }

    pub(crate) fn add_verdict_stats(&mut self, rows: Vec<PlaneVerdictRow>) {
        self.verdict_table = Some(Table::new(rows));
    }

    pub(crate) fn add_timing_stats(&mut self, rows: Vec<PlaneSlopeRow>) {
        self.timing_table = Some(Table::new(rows));
    }

    /// Add the swap candidates, one line each
    pub fn add_swap_candidates(&mut self, candidates: Vec<StatSummary>) {
        self.swap_table = Some(Table::new(candidates));
    }

    /// Mark the report as terminated early by a fatal error
    pub fn add_fatal_error(&mut self, error: String) {
        self.fatal_error = Some(error);
    }

    /// Builds the report table
    pub fn build(&mut self) -> &Table {
        let mut global_stats_table = Table::new(&self.stats);
        format_global_stats_sub_table(&mut global_stats_table);

        let sub_tables: Vec<String> = [
            self.verdict_table
                .take()
                .map(|t| format_sub_table(t, "Channel Verdicts", SubtableColor::Green)),
            self.timing_table
                .take()
                .map(|t| format_sub_table(t, "Timing", SubtableColor::Yellow)),
            self.swap_table
                .take()
                .map(|t| format_sub_table(t, "Swap Candidates", SubtableColor::Purple)),
        ]
        .into_iter()
        .flatten()
        .map(|t| t.to_string())
        .collect();

        let mut rows = vec![vec![global_stats_table.to_string()]];
        if !sub_tables.is_empty() {
            let mut sub_tables_row = Table::from_iter([sub_tables]);
            let _ = sub_tables_row.with(Style::blank());
            rows.push(vec![sub_tables_row.to_string()]);
        }
        let mut multi_table = Table::from_iter(rows);
        let _ = multi_table.with(Style::rounded());
        let mut report_table = format_super_table(&multi_table, self.processing_time);

        if let Some(fatal_error) = &self.fatal_error {
            let _ = report_table
                .with(Panel::header(format!(
                    "FATAL ERROR - EARLY TERMINATION: {fatal_error}"
                )))
                .with(
                    Modify::new(Rows::single(0))
                        .with(Alignment::center())
                        .with(Format::content(|x| x.to_uppercase().red().to_string())),
                );
        }
        self.report_table.insert(report_table)
    }

    /// Builds and prints the report table
    pub fn print(&mut self) {
        use std::io::Write as _;
        let final_report = self.build().to_string();
        if let Err(e) = writeln!(std::io::stdout().lock(), "{final_report}") {
            log::error!("Failed printing report: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    macro_rules! assert_stdout_contains {
        ($test:expr, $expected:literal) => {{
            use gag::BufferRedirect;
            use std::io::Read;

            let mut buf = BufferRedirect::stdout().unwrap();

            $test;

            let mut output = String::new();
            let _ = buf.read_to_string(&mut output).unwrap();
            drop(buf);

            assert!(output.contains($expected));
        }};
    }

    fn report() -> Report {
        let processing_time = std::time::Instant::now();
        let mut report = Report::new(processing_time.elapsed());
        report.add_stat(StatSummary::new(
            "Total Errors".to_string(),
            "0".to_string(),
            None,
        ));
        report.add_stat(StatSummary::new(
            "Packets checked".to_string(),
            "725".to_string(),
            None,
        ));
        report
    }

    #[test]
    fn test_report_contains_global_stats() {
        let mut report = report();
        let table = report.build().to_string();
        assert!(table.contains("725"));
        assert!(table.contains("REPORT"));
        assert!(table.contains("Processed in"));
    }

    #[test]
    fn test_report_contains_subtables() {
        let mut report = report();
        report.add_verdict_stats(vec![PlaneVerdictRow {
            plane: 2,
            matched: 40,
            mismatched: 1,
            missing: 0,
        }]);
        report.add_timing_stats(vec![PlaneSlopeRow {
            plane: 2,
            slope: "10.000 BC/pair".to_string(),
        }]);
        let table = report.build().to_string();
        assert!(table.contains("CHANNEL VERDICTS"));
        assert!(table.contains("10.000 BC/pair"));
    }

    #[test]
    fn test_print_report() {
        let mut report = report();
        assert_stdout_contains!(report.print(), "Packets checked");
    }

    #[test]
    fn test_fatal_error_report() {
        let mut report = report();
        report.add_fatal_error("Fatal Error happened".to_string());
        assert!(report.build().to_string().contains("FATAL ERROR"));
    }

    #[test]
    fn stats_summary_default() {
        let stats_summary = StatSummary::default();

        assert_eq!(stats_summary.statistic, "");
        assert_eq!(stats_summary.value, "");
        assert_eq!(stats_summary.notes, "");
    }
}
