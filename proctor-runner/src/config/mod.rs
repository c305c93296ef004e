// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for proctor.
//!
//! Configuration is read through the narrow [`ConfigurationParameters`] interface: a string value
//! per property name. [`LayeredConfigurationParameters`] builds such a source out of a TOML file,
//! `PROCTOR_*` environment variables and explicit overrides.
//!
//! Timeout settings are read lazily through [`TimeoutConfiguration`], which parses and caches each
//! property the first time it is consulted.

mod elements;
mod parameters;
pub mod properties;
mod timeout;

pub use elements::*;
pub use parameters::*;
pub use timeout::*;
