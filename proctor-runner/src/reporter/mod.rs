// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Report the results of invocations.
//!
//! Every invocation run through an [`Invoker`](crate::runner::Invoker) ends in exactly one
//! [`InvocationOutcome`], wrapped in an [`InvocationReport`] that also records when the invocation
//! started and how long it took.

mod events;

pub use events::*;
