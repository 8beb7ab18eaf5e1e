//! Contains the [CheckConfig] struct that is loaded from TOML and stores the options of a build-and-check run
//!
//! [CheckConfig] implements the [Config] super trait and all its sub traits, every field has a default so a TOML file only needs the options that differ.
//! The sub traits are what the rest of the crate depends on, so any other config type (e.g. [MockConfig] in tests) can be used instead.

use crate::util::*;
use std::str::FromStr;

pub mod check;
pub mod lib;
pub mod output;
pub mod prelude;
pub mod test_util;
pub mod util;

/// The [CONFIG] static variable stores the [CheckConfig] of the run once it is validated.
pub static CONFIG: OnceLock<CheckConfig> = OnceLock::new();

/// Options of a build-and-check run.
///
/// # Example
/// ```
/// # use gbtcheck::config::CheckConfig;
/// let cfg = CheckConfig::from_toml_str(r#"
///     pattern = "vertical"
///     word_width = 64
///     bc_gap = 2
///     timing_analysis = true
/// "#).unwrap();
/// assert_eq!(cfg.word_width, 64);
/// assert_eq!(cfg.worker_threads, 4);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CheckConfig {
    /// Alignment pattern of hits in words
    pub pattern: Pattern,
    /// Width of each packet word in bits
    pub word_width: u16,
    /// Minimum BCID spacing between consecutive hits on one channel
    pub bc_gap: i32,
    /// Verbosity level of the logger
    pub verbosity: u8,
    /// Maximum number of errors before stopping, 0 is unlimited
    pub max_tolerate_errors: u32,
    /// Exit code if any errors were found
    pub any_errors_exit_code: Option<u8>,
    /// Don't display error messages
    pub mute_errors: bool,
    /// Only display errors with these codes
    pub show_error_codes: Vec<String>,
    /// Threads checking packets in parallel
    pub worker_threads: usize,
    /// Compute BCID slopes per plane
    pub timing_analysis: bool,
    /// Look for swapped fibres
    pub diagnose_swaps: bool,
    /// Print the report table at the end
    pub print_report: bool,
    /// Where to write stats: a path, `stdout` or `none`
    pub stats_output: Option<String>,
    /// Stats format: `json` or `toml`
    pub stats_format: Option<String>,
}

impl Default for CheckConfig {
    fn default() -> Self {
        let builder = BuilderConfig::default();
        Self {
            pattern: builder.pattern,
            word_width: builder.word_width,
            bc_gap: builder.bc_gap,
            verbosity: 1,
            max_tolerate_errors: 0,
            any_errors_exit_code: None,
            mute_errors: false,
            show_error_codes: Vec::new(),
            worker_threads: 4,
            timing_analysis: false,
            diagnose_swaps: false,
            print_report: true,
            stats_output: None,
            stats_format: None,
        }
    }
}

impl CheckConfig {
    /// Parse a config from a TOML string and validate it.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, String> {
        let cfg: Self =
            toml::from_str(toml_str).map_err(|e| format!("Failed parsing config TOML: {e}"))?;
        if let Some(format) = &cfg.stats_format {
            StatsOutputFormat::from_str(format).map_err(|e| format!("Invalid config: {e}"))?;
        }
        cfg.validate_args()?;
        Ok(cfg)
    }

    /// Read a config from a TOML file and validate it.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, String> {
        let path = path.as_ref();
        let toml_str = fs::read_to_string(path)
            .map_err(|e| format!("Failed reading config file {}: {e}", path.display()))?;
        Self::from_toml_str(&toml_str)
    }

    /// Serialize the config to TOML, e.g. to generate a template file.
    pub fn to_toml_string(&self) -> Result<String, String> {
        toml::to_string_pretty(self).map_err(|e| format!("Failed serializing config: {e}"))
    }

    /// Validate the config and store it in [CONFIG], returning the static reference.
    pub fn init_global(self) -> Result<&'static Self, String> {
        self.validate_args()?;
        CONFIG
            .set(self)
            .map_err(|_| "Config is already initialized".to_string())?;
        CONFIG
            .get()
            .ok_or_else(|| "Config is not initialized".to_string())
    }

    /// Get a reference to the global config, if it is initialized
    pub fn global() -> Option<&'static Self> {
        CONFIG.get()
    }
}

/// Implementing the config super trait requires implementing all the sub traits
impl Config for CheckConfig {}

impl BuilderOpt for CheckConfig {
    #[inline]
    fn pattern(&self) -> Pattern {
        self.pattern
    }
    #[inline]
    fn word_width(&self) -> u16 {
        self.word_width
    }
    #[inline]
    fn bc_gap(&self) -> i32 {
        self.bc_gap
    }
}

impl CheckOpt for CheckConfig {
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

impl UtilOpt for CheckConfig {
    #[inline]
    fn verbosity(&self) -> u8 {
        self.verbosity
    }
    #[inline]
    fn max_tolerate_errors(&self) -> u32 {
        self.max_tolerate_errors
    }
    fn any_errors_exit_code(&self) -> Option<u8> {
        self.any_errors_exit_code
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

impl StatsOutputOpt for CheckConfig {
    fn stats_output_mode(&self) -> StatsOutputMode {
        match &self.stats_output {
            // Parsing the mode never fails, unknown strings are file paths
            Some(s) => StatsOutputMode::from_str(s).unwrap_or(StatsOutputMode::None),
            None => StatsOutputMode::None,
        }
    }

    fn stats_output_format(&self) -> Option<StatsOutputFormat> {
        self.stats_format
            .as_deref()
            .and_then(|f| StatsOutputFormat::from_str(f).ok())
    }
}
