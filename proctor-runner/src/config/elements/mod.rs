// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Individual configuration elements.

mod invocation_kind;
mod modes;
mod timeout_duration;

pub use invocation_kind::*;
pub use modes::*;
pub use timeout_duration::*;
