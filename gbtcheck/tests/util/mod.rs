#![allow(dead_code)]
/// Re-export some common utilities for the integration tests
pub use gbtcheck::analyze::{
    check_result::{BcidVerdict, CheckResult, Verdict},
    checker, diagnose, timing,
};
pub use gbtcheck::config::{prelude::*, CheckConfig};
pub use pretty_assertions::assert_eq;
pub use std::sync::OnceLock;
pub use vmm_gbt_protocol::prelude::*;
pub use vmm_gbt_protocol::words::packet_word::PAYLOAD_OFFSET;

/// Builder with the given options, panics on an invalid configuration
pub fn builder(pattern: Pattern, word_width: u16, bc_gap: i32) -> PacketBuilder {
    PacketBuilder::new(&BuilderConfig {
        pattern,
        word_width,
        bc_gap,
    })
    .unwrap()
}

/// Shorthand for a valid hit
pub fn hit(channel: u8, vmm: u8, bcid: u16, plane: u8, region: u8) -> HitRecord {
    HitRecord::new(channel, vmm, bcid, plane, region).unwrap()
}

/// A track crossing all four planes of a region at the same BCID, on one channel of one VMM per plane
pub fn track(region: u8, bcid: u16, channel: u8, vmm: u8) -> Vec<HitRecord> {
    (0..N_PLANES)
        .map(|plane| hit(channel, vmm, bcid, plane, region))
        .collect()
}

/// Hits spread over several VMMs, planes and BCIDs of one region
pub fn busy_region(region: u8) -> Vec<HitRecord> {
    let mut hits = Vec::new();
    for plane in 0..N_PLANES {
        for vmm in [0, 3, 7] {
            for (idx, channel) in [0u8, 1, 31, 32, 63].into_iter().enumerate() {
                hits.push(hit(channel, vmm, 40 + 7 * idx as u16 + u16::from(plane), plane, region));
                hits.push(hit(channel, vmm, 900 + 11 * idx as u16, plane, region));
            }
        }
    }
    hits
}

/// Helper function to count the matches of a pattern in some output
pub fn match_count(output: &str, re_str: &str) -> usize {
    let re = regex::Regex::new(re_str).unwrap();
    re.find_iter(output).count()
}

/// Asserts that a pattern matches some output a fixed number of times
pub fn assert_match_count(output: &str, re_str: &str, expected: usize) {
    let count = match_count(output, re_str);
    assert!(
        count == expected,
        "regex: {re_str} - expected match count: {expected}, got {count} in:\n{output}"
    );
}

/// Get a static reference to a config for the duration of a test binary
pub fn leak_config<C: Config + 'static>(config: C) -> &'static C {
    Box::leak(Box::new(config))
}
