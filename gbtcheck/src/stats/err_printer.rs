//! Contains the [ErrPrinter] that prints error messages in accordance to a given configuration

use crate::util::*;

/// Prints error messages in accordance to a given configuration
#[derive(Debug, Default)]
pub struct ErrPrinter<'a> {
    max_errors: Option<u32>,
    error_code_filter: Option<&'a [String]>,
}

impl<'a> ErrPrinter<'a> {
    /// Create a new [ErrPrinter] with the given configuration
    pub fn new(max_errors: Option<u32>, error_code_filter: Option<&'a [String]>) -> Self {
        Self {
            max_errors,
            error_code_filter,
        }
    }

    /// Print the error messages in accordance to the configuration
    ///
    /// If an error code filter is supplied, only errors matching the filter are displayed
    /// If the max errors is set, only the first `max_errors` are displayed
    pub fn print<'b, E: Iterator<Item = &'b Box<str>> + 'b>(
        &self,
        err_msgs: E,
        unique_error_codes: &[String],
    ) {
        self.selected(err_msgs, unique_error_codes)
            .for_each(|err_msg| crate::display_error(err_msg));
    }

    /// The error messages that [ErrPrinter::print] would display.
    pub fn selected<'b, E: Iterator<Item = &'b Box<str>> + 'b>(
        &self,
        err_msgs: E,
        unique_error_codes: &[String],
    ) -> impl Iterator<Item = &'b Box<str>> + 'b {
        let filter: Option<Vec<String>> = self
            .error_code_filter
            .map(|filter| minify_filter(filter, unique_error_codes));
        err_msgs
            .filter(move |err_msg| match &filter {
                Some(filter) => filter.iter().any(|code| has_error_code(err_msg, code)),
                None => true,
            })
            .take(self.max_errors.unwrap_or(u32::MAX) as usize)
    }
}

/// Reduce the error code filter to codes that were actually seen in the error messages
fn minify_filter(error_code_filter: &[String], unique_error_codes: &[String]) -> Vec<String> {
    error_code_filter
        .iter()
        .filter(|ec| unique_error_codes.contains(ec))
        .map_into()
        .collect()
}

fn has_error_code(err_msg: &str, code: &str) -> bool {
    err_msg.contains(&format!("[E{code}]"))
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn test_minify_filter() {
        let err_code_filter = vec!["10".into(), "11".into(), "20".into()];
        let unique_error_codes: Vec<String> = vec!["10".into(), "20".into(), "30".into()];

        let minified_filter = minify_filter(&err_code_filter, &unique_error_codes);

        assert_eq!(minified_filter, vec!["10", "20"]);
    }

    fn msgs() -> Vec<Box<str>> {
        vec![
            "R20 word 1: [E10] parity".into(),
            "R20 VMM 0.1 ch 3: [E20] mismatch".into(),
            "R21 word 2: [E10] parity".into(),
            "R21 VMM 2.0 ch 1: [E21] missing".into(),
        ]
    }

    #[test]
    fn test_select_with_filter() {
        let msgs = msgs();
        let filter = vec!["10".to_string()];
        let printer = ErrPrinter::new(None, Some(&filter));
        let codes = vec!["10".to_string(), "20".to_string(), "21".to_string()];
        let selected: Vec<&Box<str>> = printer.selected(msgs.iter(), &codes).collect();
        assert_eq!(selected.len(), 2);
        assert!(selected.iter().all(|m| m.contains("[E10]")));
    }

    #[test]
    fn test_select_with_max_errors() {
        let msgs = msgs();
        let printer = ErrPrinter::new(Some(3), None);
        assert_eq!(printer.selected(msgs.iter(), &[]).count(), 3);
    }

    #[test]
    fn test_filter_code_not_seen() {
        let msgs = msgs();
        let filter = vec!["1".to_string()];
        let printer = ErrPrinter::new(None, Some(&filter));
        let codes = vec!["10".to_string()];
        assert_eq!(printer.selected(msgs.iter(), &codes).count(), 0);
    }
}
