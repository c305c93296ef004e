// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! The invocation core of a test execution engine.
//!
//! Given a declared [executable](executable::Executable) belonging to a test unit, this crate:
//!
//! * supplies the arguments the executable needs by consulting the
//!   [parameter resolvers](extension::ParameterResolver) registered in an
//!   [`ExecutionScope`](scope::ExecutionScope) and its ancestors, and
//! * runs the invocation under a deadline taken from the layered timeout configuration, either
//!   on the caller's thread or on a dedicated worker thread.
//!
//! The end-to-end path is [`Invoker::invoke`](runner::Invoker::invoke), which classifies every
//! invocation as exactly one [`InvocationOutcome`](reporter::InvocationOutcome).

pub mod config;
pub mod errors;
pub mod executable;
pub mod extension;
mod helpers;
pub mod output;
pub mod reporter;
pub mod resolution;
pub mod runner;
pub mod scope;
pub mod signal;
pub mod store;
mod time;
pub mod value;
