// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Internal helpers.

use std::any::Any;

/// Returns true if a debugger is attached to this process.
#[cfg(target_os = "linux")]
pub(crate) fn debugger_attached() -> bool {
    match fs_err::read_to_string("/proc/self/status") {
        Ok(status) => tracer_pid(&status).is_some_and(|pid| pid != 0),
        Err(error) => {
            tracing::debug!("unable to read process status: {error}");
            false
        }
    }
}

/// Returns true if a debugger is attached to this process.
#[cfg(not(target_os = "linux"))]
pub(crate) fn debugger_attached() -> bool {
    false
}

#[cfg_attr(not(target_os = "linux"), allow(dead_code))]
fn tracer_pid(status: &str) -> Option<u32> {
    status
        .lines()
        .find_map(|line| line.strip_prefix("TracerPid:"))
        .and_then(|pid| pid.trim().parse().ok())
}

/// Extracts a message from a panic payload, if it has one.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> Option<&str> {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        Some(message)
    } else {
        payload.downcast_ref::<String>().map(String::as_str)
    }
}
