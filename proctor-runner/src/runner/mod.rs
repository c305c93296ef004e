// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Running invocations under a deadline.
//!
//! The main structure in this module is [`Invoker`], which resolves arguments and hands the
//! invocation to a [`TimeoutEnforcer`].

mod cancel;
mod enforcer;
mod invoker;

pub use cancel::*;
pub use enforcer::*;
pub use invoker::*;
