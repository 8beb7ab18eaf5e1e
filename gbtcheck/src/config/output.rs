//! Contains the [StatsOutputOpt] Trait for options on where and how the collected stats are written.

use crate::util::*;
use std::str::FromStr;

/// Stats output options set by a user
pub trait StatsOutputOpt {
    /// Where to write the collected stats (file, stdout, none)
    fn stats_output_mode(&self) -> StatsOutputMode;
    /// Serialization format of the collected stats (JSON, TOML)
    fn stats_output_format(&self) -> Option<StatsOutputFormat>;
}

impl<T> StatsOutputOpt for &T
where
    T: StatsOutputOpt,
{
    fn stats_output_mode(&self) -> StatsOutputMode {
        (*self).stats_output_mode()
    }
    fn stats_output_format(&self) -> Option<StatsOutputFormat> {
        (*self).stats_output_format()
    }
}

impl<T> StatsOutputOpt for Box<T>
where
    T: StatsOutputOpt,
{
    fn stats_output_mode(&self) -> StatsOutputMode {
        (**self).stats_output_mode()
    }
    fn stats_output_format(&self) -> Option<StatsOutputFormat> {
        (**self).stats_output_format()
    }
}

impl<T> StatsOutputOpt for Arc<T>
where
    T: StatsOutputOpt,
{
    fn stats_output_mode(&self) -> StatsOutputMode {
        (**self).stats_output_mode()
    }
    fn stats_output_format(&self) -> Option<StatsOutputFormat> {
        (**self).stats_output_format()
    }
}

/// Where stats are written.
#[derive(PartialEq, Debug, Clone)]
pub enum StatsOutputMode {
    /// Write to a file.
    File(Box<Path>),
    /// Write to stdout.
    Stdout,
    /// Do not write stats out.
    None,
}

impl fmt::Display for StatsOutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsOutputMode::File(p) => write!(f, "File({})", p.display()),
            StatsOutputMode::Stdout => write!(f, "Stdout"),
            StatsOutputMode::None => write!(f, "None"),
        }
    }
}

impl FromStr for StatsOutputMode {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "STDOUT" => Ok(StatsOutputMode::Stdout),
            "NONE" | "" => Ok(StatsOutputMode::None),
            _ => Ok(StatsOutputMode::File(Path::new(s).into())),
        }
    }
}

/// Serialization formats of the collected stats.
#[allow(clippy::upper_case_acronyms)]
#[derive(PartialEq, Debug, Clone, Copy)]
pub enum StatsOutputFormat {
    /// JSON format.
    JSON,
    /// TOML format.
    TOML,
}

impl fmt::Display for StatsOutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StatsOutputFormat::JSON => write!(f, "JSON"),
            StatsOutputFormat::TOML => write!(f, "TOML"),
        }
    }
}

impl FromStr for StatsOutputFormat {
    type Err = io::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "JSON" => Ok(StatsOutputFormat::JSON),
            "TOML" => Ok(StatsOutputFormat::TOML),
            _ => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid stats output format: {s}"),
            )),
        }
    }
}
