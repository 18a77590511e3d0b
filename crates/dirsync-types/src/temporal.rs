use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime, TimeZone, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::TypeError;

/// Wall-clock timestamp with one-second resolution.
///
/// Serialized as `YYYY-MM-DD HH:MM:SS` in local time, which is the format
/// every `last_updated` field in a directory file uses.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(NaiveDateTime);

impl Timestamp {
    /// The canonical textual format.
    pub const FORMAT: &'static str = "%Y-%m-%d %H:%M:%S";

    /// Current local time, truncated to whole seconds.
    pub fn now() -> Self {
        Self::from_naive(Local::now().naive_local())
    }

    /// Wrap an explicit datetime, dropping sub-second precision.
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self(dt.with_nanosecond(0).unwrap_or(dt))
    }

    /// Parse the canonical `YYYY-MM-DD HH:MM:SS` form.
    pub fn parse(value: &str) -> Result<Self, TypeError> {
        NaiveDateTime::parse_from_str(value.trim(), Self::FORMAT)
            .map(Self)
            .map_err(|_| TypeError::InvalidTimestamp {
                value: value.to_string(),
            })
    }

    /// The underlying naive datetime.
    pub fn as_naive(&self) -> NaiveDateTime {
        self.0
    }

    /// Seconds since the Unix epoch, reading the timestamp as local time.
    ///
    /// An ambiguous local time (DST fold) resolves to the earlier instant; a
    /// nonexistent one (DST gap) is read as UTC.
    pub fn unix_seconds(&self) -> i64 {
        Local
            .from_local_datetime(&self.0)
            .earliest()
            .map(|dt| dt.timestamp())
            .unwrap_or_else(|| self.0.and_utc().timestamp())
    }

    /// Format with an arbitrary `strftime` pattern.
    pub fn format_with(&self, pattern: &str) -> String {
        self.0.format(pattern).to_string()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl fmt::Debug for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Timestamp({self})")
    }
}

impl FromStr for Timestamp {
    type Err = TypeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Timestamp {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Timestamp {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Source of the current time.
///
/// The engine stamps entries and data sets through a `Clock` so that a
/// whole cycle shares one notion of "now" and tests can fix it.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// The local system clock.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        Timestamp::now()
    }
}

/// A clock frozen at a single instant.
#[derive(Clone, Copy, Debug)]
pub struct FixedClock(pub Timestamp);

impl Clock for FixedClock {
    fn now(&self) -> Timestamp {
        self.0
    }
}
