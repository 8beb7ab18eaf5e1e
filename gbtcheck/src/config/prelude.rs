//! Re-exports

pub use super::check::CheckOpt;
pub use super::lib::Config;
pub use super::output::StatsOutputFormat;
pub use super::output::StatsOutputMode;
pub use super::output::StatsOutputOpt;
pub use super::test_util::MockConfig;
pub use super::util::UtilOpt;
