// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::TimeoutDurationParseError;
use regex::Regex;
use std::{fmt, num::NonZeroU64, str::FromStr, sync::LazyLock, time::Duration};

static DURATION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^([1-9][0-9]*) ?(ns|[μµu]s|ms|s|m|h|d)$")
        .expect("duration pattern is a valid regex")
});

/// The unit of a [`TimeoutDuration`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(test_strategy::Arbitrary))]
pub enum TimeUnit {
    /// Nanoseconds (`ns`).
    Nanoseconds,
    /// Microseconds (`μs` or `us`).
    Microseconds,
    /// Milliseconds (`ms`).
    Milliseconds,
    /// Seconds (`s`).
    Seconds,
    /// Minutes (`m`).
    Minutes,
    /// Hours (`h`).
    Hours,
    /// Days (`d`).
    Days,
}

impl TimeUnit {
    fn from_token(token: &str) -> Option<Self> {
        match token.to_lowercase().as_str() {
            "ns" => Some(Self::Nanoseconds),
            "μs" | "µs" | "us" => Some(Self::Microseconds),
            "ms" => Some(Self::Milliseconds),
            "s" => Some(Self::Seconds),
            "m" => Some(Self::Minutes),
            "h" => Some(Self::Hours),
            "d" => Some(Self::Days),
            _ => None,
        }
    }

    /// The canonical token for this unit.
    pub fn token(self) -> &'static str {
        match self {
            Self::Nanoseconds => "ns",
            Self::Microseconds => "μs",
            Self::Milliseconds => "ms",
            Self::Seconds => "s",
            Self::Minutes => "m",
            Self::Hours => "h",
            Self::Days => "d",
        }
    }

    fn name(self, plural: bool) -> &'static str {
        match (self, plural) {
            (Self::Nanoseconds, false) => "nanosecond",
            (Self::Nanoseconds, true) => "nanoseconds",
            (Self::Microseconds, false) => "microsecond",
            (Self::Microseconds, true) => "microseconds",
            (Self::Milliseconds, false) => "millisecond",
            (Self::Milliseconds, true) => "milliseconds",
            (Self::Seconds, false) => "second",
            (Self::Seconds, true) => "seconds",
            (Self::Minutes, false) => "minute",
            (Self::Minutes, true) => "minutes",
            (Self::Hours, false) => "hour",
            (Self::Hours, true) => "hours",
            (Self::Days, false) => "day",
            (Self::Days, true) => "days",
        }
    }
}

/// A positive deadline expressed as a magnitude and a unit, for example `10s`.
///
/// The grammar is `<magnitude>[ ]<unit>`: the magnitude is a positive integer without a leading
/// zero and the unit is one of `ns`, `μs` (or `us`), `ms`, `s`, `m`, `h` and `d`, matched
/// case-insensitively.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct TimeoutDuration {
    value: NonZeroU64,
    unit: TimeUnit,
}

impl TimeoutDuration {
    /// Creates a new duration. Returns `None` if `value` is zero.
    pub fn new(value: u64, unit: TimeUnit) -> Option<Self> {
        NonZeroU64::new(value).map(|value| Self { value, unit })
    }

    /// The magnitude.
    pub fn value(&self) -> u64 {
        self.value.get()
    }

    /// The unit.
    pub fn unit(&self) -> TimeUnit {
        self.unit
    }

    /// Converts to a [`Duration`], saturating on overflow.
    pub fn to_duration(&self) -> Duration {
        let value = self.value.get();
        match self.unit {
            TimeUnit::Nanoseconds => Duration::from_nanos(value),
            TimeUnit::Microseconds => Duration::from_micros(value),
            TimeUnit::Milliseconds => Duration::from_millis(value),
            TimeUnit::Seconds => Duration::from_secs(value),
            TimeUnit::Minutes => Duration::from_secs(value.saturating_mul(60)),
            TimeUnit::Hours => Duration::from_secs(value.saturating_mul(60 * 60)),
            TimeUnit::Days => Duration::from_secs(value.saturating_mul(24 * 60 * 60)),
        }
    }
}

impl FromStr for TimeoutDuration {
    type Err = TimeoutDurationParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let invalid = || TimeoutDurationParseError::InvalidFormat {
            input: input.to_owned(),
        };

        let captures = DURATION_PATTERN.captures(input.trim()).ok_or_else(invalid)?;
        let value: u64 = captures[1]
            .parse()
            .map_err(|_| TimeoutDurationParseError::Overflow {
                input: input.to_owned(),
            })?;
        let unit = TimeUnit::from_token(&captures[2]).ok_or_else(invalid)?;

        // The pattern only admits magnitudes starting with 1-9.
        Self::new(value, unit).ok_or_else(invalid)
    }
}

impl fmt::Display for TimeoutDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let value = self.value.get();
        write!(f, "{value} {}", self.unit.name(value != 1))
    }
}
