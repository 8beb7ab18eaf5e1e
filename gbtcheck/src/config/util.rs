//! Contains the [UtilOpt] Trait for small utility options that are not specific to building or checking packets.

/// Trait for all small utility options that are not specific to any other trait
pub trait UtilOpt {
    /// Verbosity level of the logger: 0 = error, 1 = warn, 2 = info, 3 = debug, 4 = trace
    fn verbosity(&self) -> u8;
    /// Maximum number of errors to tolerate before stopping, 0 means no limit
    fn max_tolerate_errors(&self) -> u32;
    /// Exit code to report if any errors were detected in the checked packets
    fn any_errors_exit_code(&self) -> Option<u8>;
    /// If set, error messages are not displayed
    fn mute_errors(&self) -> bool;
    /// Error codes to display, e.g. `["10", "20"]`. All errors are displayed if `None`
    fn error_code_filter(&self) -> Option<&[String]>;
}

impl<T> UtilOpt for &T
where
    T: UtilOpt,
{
    fn verbosity(&self) -> u8 {
        (*self).verbosity()
    }
    fn max_tolerate_errors(&self) -> u32 {
        (*self).max_tolerate_errors()
    }
    fn any_errors_exit_code(&self) -> Option<u8> {
        (*self).any_errors_exit_code()
    }
    fn mute_errors(&self) -> bool {
        (*self).mute_errors()
    }
    fn error_code_filter(&self) -> Option<&[String]> {
        (*self).error_code_filter()
    }
}

impl<T> UtilOpt for Box<T>
where
    T: UtilOpt,
{
    fn verbosity(&self) -> u8 {
        (**self).verbosity()
    }
    fn max_tolerate_errors(&self) -> u32 {
        (**self).max_tolerate_errors()
    }
    fn any_errors_exit_code(&self) -> Option<u8> {
        (**self).any_errors_exit_code()
    }
    fn mute_errors(&self) -> bool {
        (**self).mute_errors()
    }
    fn error_code_filter(&self) -> Option<&[String]> {
        (**self).error_code_filter()
    }
}

impl<T> UtilOpt for std::sync::Arc<T>
where
    T: UtilOpt,
{
    fn verbosity(&self) -> u8 {
        (**self).verbosity()
    }
    fn max_tolerate_errors(&self) -> u32 {
        (**self).max_tolerate_errors()
    }
    fn any_errors_exit_code(&self) -> Option<u8> {
        (**self).any_errors_exit_code()
    }
    fn mute_errors(&self) -> bool {
        (**self).mute_errors()
    }
    fn error_code_filter(&self) -> Option<&[String]> {
        (**self).error_code_filter()
    }
}
