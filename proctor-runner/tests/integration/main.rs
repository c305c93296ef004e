// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

mod config;
mod fixtures;
mod invocation;
mod resolution;
mod store;
