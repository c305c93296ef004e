// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Timing for invocation reports.
//!
//! A report says when an invocation started and how long it ran. The start time is wall-clock
//! time so it can be matched against log timestamps. The duration is measured on the monotonic
//! clock, the same clock deadlines are enforced on, so a reported duration is comparable with the
//! timeout that applied even if the system clock is adjusted mid-invocation.

use chrono::{DateTime, Local};
use std::time::{Duration, Instant};

pub(crate) fn stopwatch() -> StopwatchStart {
    StopwatchStart::new()
}

/// Taken just before an invocation's first callback or argument resolution.
#[derive(Clone, Debug)]
pub(crate) struct StopwatchStart {
    start_time: DateTime<Local>,
    instant: Instant,
}

impl StopwatchStart {
    fn new() -> Self {
        Self {
            // Read back to back; the skew between the two clocks is not observable in reports.
            start_time: Local::now(),
            instant: Instant::now(),
        }
    }

    pub(crate) fn snapshot(&self) -> StopwatchSnapshot {
        StopwatchSnapshot {
            start_time: self.start_time,
            duration: self.instant.elapsed(),
        }
    }
}

/// The start time and elapsed duration, copied into an
/// [`InvocationReport`](crate::reporter::InvocationReport).
#[derive(Clone, Debug)]
pub(crate) struct StopwatchSnapshot {
    pub(crate) start_time: DateTime<Local>,
    pub(crate) duration: Duration,
}
