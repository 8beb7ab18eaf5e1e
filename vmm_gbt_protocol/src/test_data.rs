//! Known-good packets for tests and documentation examples.

/// A horizontal packet with 96 bit words, region 20, one hit: plane 0, VMM 0, channel 3, BCID 100.
pub const GOLDEN_HORIZONTAL_HEX: [&str; 2] = ["C1410C800001000000000000", "A00064800000000000000008"];

/// [GOLDEN_HORIZONTAL_HEX] in the GBT text format.
pub const GOLDEN_HORIZONTAL_GBT_LINES: [&str; 7] = [
    "C1410C80 20",
    "00010000 20",
    "00000000 20",
    "A0006480 20",
    "00000000 20",
    "00000008 20",
    "00000001 01",
];
