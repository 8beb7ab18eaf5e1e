use crate::util::*;
use crate::util::assert_eq;
use gbtcheck::stats::stats_collector::StatsCollector;
use std::sync::atomic::AtomicBool;
mod util;

fn tracks(regions: &[u8]) -> Vec<HitRecord> {
    regions
        .iter()
        .enumerate()
        .flat_map(|(idx, region)| track(*region, 200 + 10 * (idx as u16 / 2), 30, 5))
        .collect()
}

#[test]
fn config_from_toml_file_and_stats_to_json() {
    let tmp_d = temp_dir::TempDir::new().unwrap();
    let stats_file = tmp_d.child("stats.json");
    let config_file = tmp_d.child("gbtcheck.toml");
    std::fs::write(
        &config_file,
        format!(
            r#"
pattern = "vertical"
word_width = 64
worker_threads = 3
timing_analysis = true
print_report = false
mute_errors = true
stats_output = '{}'
stats_format = "json"
"#,
            stats_file.display()
        ),
    )
    .unwrap();

    let config = leak_config(CheckConfig::from_toml_file(&config_file).unwrap());
    assert_eq!(config.pattern(), Pattern::Vertical);
    assert_eq!(config.worker_threads(), 3);

    let summary = gbtcheck::run_checks(config, &tracks(&[20, 21, 22, 23])).unwrap();
    assert!(summary.result.is_clean());
    assert!(!summary.any_errors);
    assert_eq!(summary.slopes[&2], Ok(10.0));

    let stats_json = std::fs::read_to_string(&stats_file).unwrap();
    let from_file: StatsCollector = serde_json::from_str(&stats_json).unwrap();
    assert_eq!(from_file.check_stats().packets_checked(), 4);
    assert_eq!(from_file.check_stats().regions_seen(), [20, 21, 22, 23]);
    assert_eq!(from_file.check_stats().slopes().len(), 4);
    assert_eq!(from_file.err_count(), 0);
}

#[test]
fn suppressed_hits_counted_and_reported() {
    let config = leak_config(MockConfig {
        bc_gap: 5,
        mute_errors: true,
        exit_code_any_errors: Some(2),
        ..Default::default()
    });
    let hits = [hit(7, 2, 100, 1, 20), hit(7, 2, 101, 1, 20), hit(8, 2, 300, 1, 20)];

    let summary = gbtcheck::run_checks(config, &hits).unwrap();

    assert!(summary.any_errors);
    assert_eq!(summary.result.counts().matched, 1);
    assert_eq!(summary.result.counts().mismatched, 1);
    assert_eq!(summary.stats.check_stats().hits_suppressed(), 1);
    assert_eq!(summary.stats.unique_error_codes_as_slice(), ["20"]);
    assert_eq!(
        gbtcheck::util::lib::exit(0, &AtomicBool::new(summary.any_errors), config),
        std::process::ExitCode::from(2)
    );
}

#[test]
fn swap_diagnosis_needs_swapped_hits() {
    let config = leak_config(MockConfig {
        diagnose_swaps: true,
        ..Default::default()
    });

    let summary = gbtcheck::run_checks(config, &tracks(&[20, 21])).unwrap();

    // Packets built from the truth itself never show a swap
    assert!(summary.swaps.is_empty());
    assert!(summary.stats.check_stats().swap_candidates().is_empty());
}

#[test]
fn empty_input_rejected() {
    let config = leak_config(MockConfig {
        mute_errors: true,
        ..Default::default()
    });
    let err = gbtcheck::run_checks(config, &[]).unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::InvalidInput);
}

#[test]
fn global_config_initialized_once() {
    let config = CheckConfig::from_toml_str("print_report = false\nworker_threads = 2")
        .unwrap()
        .init_global()
        .unwrap();
    assert!(CheckConfig::global().is_some());
    assert!(CheckConfig::default().init_global().is_err());

    let summary = gbtcheck::run_checks(config, &tracks(&[24])).unwrap();
    assert!(summary.result.is_clean());
    assert_eq!(summary.stats.check_stats().packets_checked(), 1);
}

#[test]
fn error_logger_set_once_with_configured_verbosity() {
    let cfg = MockConfig {
        verbosity: 2,
        ..Default::default()
    };
    gbtcheck::util::lib::init_error_logger(&cfg).unwrap();
    assert_eq!(log::max_level(), log::LevelFilter::Info);

    // A second logger is refused
    assert!(gbtcheck::util::lib::init_error_logger(&cfg).is_err());
}
