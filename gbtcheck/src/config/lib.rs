//! Contains the [Config] super trait, and all the sub traits required by it
//!
//! Implementing the [Config] super trait is required by configs passed to the checker, the dispatcher and the stats controller.

use super::{check::CheckOpt, output::StatsOutputOpt, util::UtilOpt};
use vmm_gbt_protocol::config::{validate_builder_opt, BuilderOpt};

/// Super trait for all the traits that needed to be implemented by the config struct
pub trait Config: Send + Sync + std::marker::Sized
where
    // Subtraits that group together related configuration options
    Self: BuilderOpt + CheckOpt + UtilOpt + StatsOutputOpt,
{
    /// Validate the arguments of the config
    fn validate_args(&self) -> Result<(), String> {
        if let Err(e) = validate_builder_opt(self) {
            return Err(format!("Invalid config: {e}"));
        }
        if self.worker_threads() == 0 {
            return Err("Invalid config: At least 1 worker thread is needed".to_string());
        }
        if self.any_errors_exit_code().is_some_and(|val| val == 0) {
            return Err("Invalid config: Exit code for any errors cannot be 0".to_string());
        }
        if let Some(filter) = self.error_code_filter() {
            if let Some(bad_code) = filter
                .iter()
                .find(|code| code.is_empty() || !code.chars().all(|c| c.is_ascii_digit()))
            {
                return Err(format!(
                    "Invalid config: Error codes in the filter should be digits, e.g. \"10\" (got: {bad_code:?})"
                ));
            }
        }
        if self.stats_output_format().is_none()
            && !matches!(
                self.stats_output_mode(),
                super::output::StatsOutputMode::None
            )
        {
            return Err(
                "Invalid config: Writing stats requires a stats output format (JSON or TOML)"
                    .to_string(),
            );
        }
        Ok(())
    }
}

impl<T> Config for &T
where
    T: Config,
{
    fn validate_args(&self) -> Result<(), String> {
        (*self).validate_args()
    }
}

impl<T> Config for Box<T>
where
    T: Config,
{
    fn validate_args(&self) -> Result<(), String> {
        (**self).validate_args()
    }
}

impl<T> Config for std::sync::Arc<T>
where
    T: Config,
{
    fn validate_args(&self) -> Result<(), String> {
        (**self).validate_args()
    }
}
