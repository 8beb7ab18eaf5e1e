//! Miscellaneous utility functions
pub mod lib;

pub(crate) use {
    crate::{
        analyze::{
            check_result::{
                BcidCheck, BcidVerdict, ChannelVerdict, CheckResult, PlaneCounts,
                UnexpectedChannel, Verdict, WordFault,
            },
            checker::{self, Extraction},
            diagnose::{self, SwapCandidate},
            dispatcher::{self, CheckUnit},
            timing::{self, BcidPoint, BcidSeries, TimingError},
        },
        config::{prelude::*, CheckConfig},
        stats::{
            self,
            stats_collector::{check_stats::CheckStats, StatsCollector},
            stats_report::report::{Report, StatSummary},
            StatType,
        },
    },
    itertools::Itertools,
    owo_colors::OwoColorize,
    regex::Regex,
    serde::{Deserialize, Serialize},
    std::{
        collections::{BTreeMap, BTreeSet},
        fmt, fs, io,
        path::Path,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, OnceLock,
        },
        thread::{self, JoinHandle},
        time::{Duration, Instant},
    },
    vmm_gbt_protocol::{
        builder::{suppress_gap, PacketBuilder},
        config::{BuilderConfig, BuilderOpt, Pattern},
        error::CodecError,
        words::{
            hit::{ChannelKey, HitRecord, VmmId, N_PLANES},
            hit_map::HitMap,
            packet::Packet,
            packet_word::{
                channel_bit_offset, slot_bit_offset, PacketWord, BCID_SLOT_WIDTH, BITMAP_WIDTH,
                MARKER_VMM_START, PAYLOAD_OFFSET,
            },
        },
    },
};
