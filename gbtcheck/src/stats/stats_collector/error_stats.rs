//! Contains the [ErrorStats] struct which stores error messages reported while checking packets
use crate::util::*;

/// Stores error messages observed during analysis
#[derive(Default, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorStats {
    fatal_error: Option<Box<str>>,
    reported_errors: Vec<Box<str>>,
    total_errors: u64,
    unique_error_codes: Option<Vec<String>>,
}

impl ErrorStats {
    /// If data processing is done, sort error messages, extract unique error codes etc.
    pub(super) fn finalize_stats(&mut self, mute_errors: bool) {
        if !mute_errors {
            // Sort stats by the region they were found in before consuming them
            self.sort_error_msgs_by_region();
        }
        self.process_unique_error_codes();
    }

    /// Stable sort on the `R<region>` prefix, errors without one go last.
    pub(super) fn sort_error_msgs_by_region(&mut self) {
        let re = region_prefix_regex();
        self.reported_errors.sort_by_key(|e| {
            re.captures(e)
                .and_then(|c| c["region"].parse::<u16>().ok())
                .unwrap_or(u16::MAX)
        });
    }

    pub(super) fn process_unique_error_codes(&mut self) {
        if !self.reported_errors.is_empty() {
            self.unique_error_codes = Some(extract_unique_error_codes(&self.reported_errors));
        }
    }

    pub(super) fn err_count(&self) -> u64 {
        self.total_errors
    }

    pub(super) fn add_err(&mut self, error_msg: Box<str>) {
        self.total_errors += 1;
        self.reported_errors.push(error_msg);
    }

    pub(super) fn add_fatal_err(&mut self, error_msg: Box<str>) {
        self.fatal_error = Some(error_msg);
    }

    pub(super) fn any_fatal_err(&self) -> bool {
        self.fatal_error.is_some()
    }

    pub(super) fn take_fatal_err(&mut self) -> Option<Box<str>> {
        self.fatal_error.take()
    }

    /// Unique error codes in order of first appearance, empty until finalized or without errors
    pub(super) fn unique_error_codes_as_slice(&self) -> &[String] {
        self.unique_error_codes.as_deref().unwrap_or_default()
    }

    /// Return an iterator over the reported error messages
    pub fn errors_as_slice_iter(&self) -> impl Iterator<Item = &Box<str>> {
        self.reported_errors.iter()
    }

    pub(super) fn consume_reported_errors(&mut self) -> Vec<Box<str>> {
        std::mem::take(&mut self.reported_errors)
    }
}

fn region_prefix_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        // Literal pattern, compiling it cannot fail
        Regex::new(r"^R(?P<region>[0-9]+)").unwrap()
    })
}

fn error_code_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\[E(?P<err_code>[0-9]{2,4})\]").unwrap())
}

/// Extracts the unique error codes (without the `E`) from error messages like `R20 word 1: [E10] ...`
pub(crate) fn extract_unique_error_codes(error_messages: &[Box<str>]) -> Vec<String> {
    let mut error_codes: Vec<String> = Vec::new();
    error_messages.iter().for_each(|err_msg| {
        error_code_regex()
            .captures_iter(err_msg)
            .filter_map(|m| m.name("err_code"))
            .for_each(|err_code| {
                if !error_codes.iter().any(|c| c == err_code.as_str()) {
                    error_codes.push(err_code.as_str().to_string());
                }
            });
    });
    error_codes
}
