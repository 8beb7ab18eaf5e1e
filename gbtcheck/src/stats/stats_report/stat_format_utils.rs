use owo_colors::OwoColorize;

/// Used for formatting fields that potentially produces many values.
const MAX_LINE_WIDTH: u16 = 60;

/// Formats error codes as `E10 E20 ...`, five codes per line.
pub(crate) fn format_error_codes(error_codes: &[String]) -> String {
    error_codes
        .iter()
        .enumerate()
        .map(|(i, code)| {
            if i > 0 && i % 5 == 0 {
                format!("\nE{code} ")
            } else {
                format!("E{code} ")
            }
        })
        .collect::<String>()
        .trim_end()
        .to_string()
}

/// Formats the regions seen, in red if there are none.
pub(crate) fn format_regions(regions: &[u8]) -> String {
    if regions.is_empty() {
        return "none".red().to_string();
    }
    let regions: Vec<u16> = regions.iter().copied().map(u16::from).collect();
    format_nums_max_lines_width(MAX_LINE_WIDTH, Some(5), &regions)
}

/// Format a slope in BC per pair of regions.
pub(crate) fn format_slope(slope: f64) -> String {
    format!("{slope:.3} BC/pair")
}

/// Generic function to format a list of numbers into a string with a max width and optional max lines.
pub(crate) fn format_nums_max_lines_width(
    max_width: u16,
    max_lines: Option<u16>,
    nums: &[u16],
) -> String {
    let mut result = String::new();
    let mut num_chars = 0;
    let mut line_count = 0;
    for (i, id) in nums.iter().enumerate() {
        if max_lines.is_some_and(|max_lines| line_count >= max_lines) {
            result.push_str(&format!("... {} more", nums.len() - i).yellow().to_string());
            break;
        }
        // Digits plus the whitespace
        let tmp_num_chars: u16 = id.checked_ilog10().unwrap_or(0) as u16 + 2;
        if num_chars + tmp_num_chars > max_width {
            if result.ends_with(' ') {
                let _ = result.pop();
            }
            result.push('\n');
            num_chars = 0;
            line_count += 1;
            if max_lines.is_some_and(|max_lines| line_count >= max_lines) {
                result.push_str(&format!("... {} more", nums.len() - i).yellow().to_string());
                break;
            }
        }
        result.push_str(&format!("{id} "));
        num_chars += tmp_num_chars;
    }
    result.trim_end().to_string()
}
