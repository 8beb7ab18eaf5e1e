//! Miscellaneous utility functions

use crate::util::*;

/// Start the [stderrlog] instance with the configured verbosity.
///
/// # Errors
/// If a logger is already set.
pub fn init_error_logger(cfg: &(impl UtilOpt + BuilderOpt)) -> Result<(), log::SetLoggerError> {
    stderrlog::new()
        .module("gbtcheck")
        .module("vmm_gbt_protocol")
        .verbosity(cfg.verbosity() as usize)
        .init()?;
    log::trace!(
        "Logger initialized: {} pattern, {} bit words, BC gap {}",
        cfg.pattern(),
        cfg.word_width(),
        cfg.bc_gap()
    );
    Ok(())
}

/// Exit code for the end of processing
///
/// Non-zero `exit_code` is returned as is. Otherwise the configured any-errors exit code is used if errors were found.
pub fn exit(
    exit_code: u8,
    any_errors_flag: &AtomicBool,
    cfg: &impl UtilOpt,
) -> std::process::ExitCode {
    if exit_code == 0 {
        log::debug!("Exit successful from processing");
        match cfg.any_errors_exit_code() {
            Some(code) if any_errors_flag.load(Ordering::Relaxed) => {
                std::process::ExitCode::from(code)
            }
            _ => std::process::ExitCode::SUCCESS,
        }
    } else {
        std::process::ExitCode::from(exit_code)
    }
}
