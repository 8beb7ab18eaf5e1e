#![allow(missing_docs)]

use crate::util::*;

#[derive(Debug, Clone)]
/// Complete configurable Mock config for testing
pub struct MockConfig {
    pub pattern: Pattern,
    pub word_width: u16,
    pub bc_gap: i32,
    pub verbosity: u8,
    pub max_tolerate_errors: u32,
    pub exit_code_any_errors: Option<u8>,
    pub mute_errors: bool,
    pub show_error_codes: Vec<String>,
    pub worker_threads: usize,
    pub timing_analysis: bool,
    pub diagnose_swaps: bool,
    pub print_report: bool,
    pub stats_output_mode: StatsOutputMode,
    pub stats_output_format: Option<StatsOutputFormat>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl MockConfig {
    pub fn new() -> Self {
        Self {
            pattern: Pattern::Horizontal,
            word_width: 128,
            bc_gap: 1,
            verbosity: 0,
            max_tolerate_errors: 0,
            exit_code_any_errors: None,
            mute_errors: false,
            show_error_codes: Vec::new(),
            worker_threads: 2,
            timing_analysis: false,
            diagnose_swaps: false,
            print_report: false,
            stats_output_mode: StatsOutputMode::None,
            stats_output_format: None,
        }
    }

    pub fn new_vertical(word_width: u16) -> Self {
        Self {
            pattern: Pattern::Vertical,
            word_width,
            ..Default::default()
        }
    }
}

impl Config for MockConfig {}

impl BuilderOpt for MockConfig {
    fn pattern(&self) -> Pattern {
        self.pattern
    }
    fn word_width(&self) -> u16 {
        self.word_width
    }
    fn bc_gap(&self) -> i32 {
        self.bc_gap
    }
}

impl CheckOpt for MockConfig {
    fn worker_threads(&self) -> usize {
        self.worker_threads
    }
    fn timing_analysis(&self) -> bool {
        self.timing_analysis
    }
    fn diagnose_swaps(&self) -> bool {
        self.diagnose_swaps
    }
    fn print_report(&self) -> bool {
        self.print_report
    }
}

impl UtilOpt for MockConfig {
    fn verbosity(&self) -> u8 {
        self.verbosity
    }

    fn max_tolerate_errors(&self) -> u32 {
        self.max_tolerate_errors
    }

    fn any_errors_exit_code(&self) -> Option<u8> {
        self.exit_code_any_errors
    }

    fn mute_errors(&self) -> bool {
        self.mute_errors
    }

    fn error_code_filter(&self) -> Option<&[String]> {
        if self.show_error_codes.is_empty() {
            None
        } else {
            Some(&self.show_error_codes)
        }
    }
}

impl StatsOutputOpt for MockConfig {
    fn stats_output_mode(&self) -> StatsOutputMode {
        self.stats_output_mode.clone()
    }

    fn stats_output_format(&self) -> Option<StatsOutputFormat> {
        self.stats_output_format
    }
}
