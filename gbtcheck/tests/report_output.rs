use crate::util::*;
use crate::util::assert_eq;
use gag::BufferRedirect;
use std::io::Read;
mod util;

/// Captures everything written to stdout while `f` runs
fn capture_stdout<T>(f: impl FnOnce() -> T) -> (T, String) {
    let mut buf = BufferRedirect::stdout().unwrap();
    let res = f();
    let mut output = String::new();
    let _ = buf.read_to_string(&mut output).unwrap();
    drop(buf);
    (res, output)
}

// Redirecting stdout is process wide, so all stdout assertions share one test
#[test]
fn report_and_stats_written_to_stdout() {
    let report_config = leak_config(MockConfig {
        timing_analysis: true,
        print_report: true,
        mute_errors: true,
        ..Default::default()
    });
    let mut hits = track(20, 100, 4, 1);
    hits.extend(track(22, 120, 4, 1));
    hits.push(hit(9, 0, 500, 2, 22));
    hits.push(hit(9, 0, 502, 2, 22));

    let (summary, output) = capture_stdout(|| gbtcheck::run_checks(report_config, &hits).unwrap());
    assert_eq!(summary.slopes[&0], Ok(20.0));
    assert_match_count(&output, "REPORT", 1);
    assert_match_count(&output, "Packets checked.*2", 1);
    assert_match_count(&output, "Channels matched.*9/9", 1);
    assert_match_count(&output, "CHANNEL VERDICTS", 1);
    assert_match_count(&output, "20\\.000 BC/pair", 4);

    let stats_config = leak_config(MockConfig {
        bc_gap: 3,
        mute_errors: true,
        stats_output_mode: StatsOutputMode::Stdout,
        stats_output_format: Some(StatsOutputFormat::TOML),
        print_report: true,
        ..Default::default()
    });
    let (_summary, output) = capture_stdout(|| gbtcheck::run_checks(stats_config, &hits).unwrap());
    // The report is left out when the stats go to stdout
    assert_match_count(&output, "REPORT", 0);
    let stats: toml::Value = toml::from_str(&output).unwrap();
    assert_eq!(stats["check_stats"]["hits_suppressed"].as_integer(), Some(1));
    assert_eq!(stats["check_stats"]["packets_checked"].as_integer(), Some(2));
}
