//! Severity levels and level filters
//!
//! `Level` is the ordered severity of a single record; `Levels` is the
//! bitmask a destination uses to select which severities it accepts.

use std::str::FromStr;

use crate::error::Error;

/// Severity of a log record, ordered from least to most severe
///
/// The ordering is total: `Level::Debug < Level::Info < ... < Level::Emergency`.
/// The numeric value doubles as the bit position in a [`Levels`] mask.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[repr(u8)]
pub enum Level {
    /// Diagnostic output for developers
    Debug = 0,
    /// Routine informational messages
    Info = 1,
    /// Normal but noteworthy conditions
    Notice = 2,
    /// Abnormal conditions that are not errors yet
    Warning = 3,
    /// Operation failed; the process continues
    Error = 4,
    /// Failure in a primary component
    Critical = 5,
    /// Action must be taken immediately
    Alert = 6,
    /// The process is unusable
    Emergency = 7,
}

impl Level {
    /// All levels, least severe first
    pub const ALL: [Level; 8] = [
        Level::Debug,
        Level::Info,
        Level::Notice,
        Level::Warning,
        Level::Error,
        Level::Critical,
        Level::Alert,
        Level::Emergency,
    ];

    /// Get the string name of this level
    #[inline]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Notice => "notice",
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
            Self::Alert => "alert",
            Self::Emergency => "emergency",
        }
    }

    /// Convert to raw byte value
    #[inline]
    pub const fn as_u8(self) -> u8 {
        self as u8
    }

    /// Parse a level from its raw byte value
    #[inline]
    pub const fn from_u8(value: u8) -> Option<Self> {
        match value {
            0 => Some(Self::Debug),
            1 => Some(Self::Info),
            2 => Some(Self::Notice),
            3 => Some(Self::Warning),
            4 => Some(Self::Error),
            5 => Some(Self::Critical),
            6 => Some(Self::Alert),
            7 => Some(Self::Emergency),
            _ => None,
        }
    }
}

impl std::fmt::Display for Level {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Level {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "debug" => Ok(Self::Debug),
            "info" => Ok(Self::Info),
            "notice" => Ok(Self::Notice),
            "warning" | "warn" => Ok(Self::Warning),
            "error" | "err" => Ok(Self::Error),
            "critical" | "crit" => Ok(Self::Critical),
            "alert" => Ok(Self::Alert),
            "emergency" | "emerg" => Ok(Self::Emergency),
            other => Err(Error::invalid_config(
                "level",
                format!("unknown level name: {other:?}"),
            )),
        }
    }
}

bitflags::bitflags! {
    /// Bitmask of enabled severity levels for one destination
    ///
    /// Bit `n` corresponds to `Level` with numeric value `n`, so the mask
    /// fits in a `u8` and `Levels::all()` enables every severity.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct Levels: u8 {
        const DEBUG = 1 << 0;
        const INFO = 1 << 1;
        const NOTICE = 1 << 2;
        const WARNING = 1 << 3;
        const ERROR = 1 << 4;
        const CRITICAL = 1 << 5;
        const ALERT = 1 << 6;
        const EMERGENCY = 1 << 7;
    }
}

impl Levels {
    /// Mask containing exactly one level
    #[inline]
    pub const fn only(level: Level) -> Self {
        Self::from_bits_truncate(1 << level.as_u8())
    }

    /// Mask containing the given level and everything more severe
    #[inline]
    pub const fn at_or_above(level: Level) -> Self {
        Self::from_bits_truncate(0xffu8 << level.as_u8())
    }

    /// Mask containing everything less severe than the given level
    #[inline]
    pub const fn below(level: Level) -> Self {
        Self::from_bits_truncate(!Self::at_or_above(level).bits())
    }

    /// Whether records at `level` pass this filter
    #[inline]
    pub const fn allows(self, level: Level) -> bool {
        self.bits() & (1 << level.as_u8()) != 0
    }
}

impl Default for Levels {
    /// Everything at or above `Info`; debug is opt-in
    fn default() -> Self {
        Self::at_or_above(Level::Info)
    }
}

impl From<Level> for Levels {
    fn from(level: Level) -> Self {
        Self::only(level)
    }
}
