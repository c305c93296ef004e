// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::errors::{ThreadModeParseError, TimeoutModeParseError};
use std::{fmt, str::FromStr};

/// Normalizes an enum-like configuration value: surrounding whitespace is ignored, matching is
/// case-insensitive and `-` is accepted in place of `_`.
fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase().replace('-', "_")
}

/// Whether timeouts are applied at all.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TimeoutMode {
    /// Timeouts are applied.
    Enabled,

    /// Timeouts are never applied.
    Disabled,

    /// Timeouts are applied unless a debugger is attached to the process.
    DisabledOnDebug,
}

impl TimeoutMode {
    /// String representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["enabled", "disabled", "disabled_on_debug"]
    }

    /// Returns true if timeouts should be skipped. `debugger_attached` is only consulted for
    /// [`DisabledOnDebug`](Self::DisabledOnDebug).
    pub fn is_timeout_disabled(self, debugger_attached: impl FnOnce() -> bool) -> bool {
        match self {
            Self::Enabled => false,
            Self::Disabled => true,
            Self::DisabledOnDebug => debugger_attached(),
        }
    }
}

impl FromStr for TimeoutMode {
    type Err = TimeoutModeParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match normalize(input).as_str() {
            "enabled" => Ok(Self::Enabled),
            "disabled" => Ok(Self::Disabled),
            "disabled_on_debug" => Ok(Self::DisabledOnDebug),
            _ => Err(TimeoutModeParseError::new(input)),
        }
    }
}

/// Where an invocation under a timeout runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ThreadMode {
    /// Use the configured default thread mode, or [`SameThread`](Self::SameThread) if none is
    /// configured. Only meaningful on a declared timeout.
    Inferred,

    /// Run on the caller's thread. An overrun is detected once the invocation returns but cannot
    /// be preempted.
    SameThread,

    /// Run on a dedicated worker thread that is abandoned and interrupted at the deadline.
    SeparateThread,
}

impl ThreadMode {
    /// String representations of all known variants.
    pub fn variants() -> &'static [&'static str] {
        &["inferred", "same_thread", "separate_thread"]
    }

    /// The string representation of this mode.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Inferred => "inferred",
            Self::SameThread => "same_thread",
            Self::SeparateThread => "separate_thread",
        }
    }
}

impl FromStr for ThreadMode {
    type Err = ThreadModeParseError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match normalize(input).as_str() {
            "inferred" => Ok(Self::Inferred),
            "same_thread" => Ok(Self::SameThread),
            "separate_thread" => Ok(Self::SeparateThread),
            _ => Err(ThreadModeParseError::new(input)),
        }
    }
}

impl fmt::Display for ThreadMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
