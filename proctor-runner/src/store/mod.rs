// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Hierarchical, namespaced storage attached to execution scopes.
//!
//! Every [`ExecutionScope`](crate::scope::ExecutionScope) owns a [`ContextStore`]. Lookups fall
//! back to the stores of enclosing scopes; writes always land in the local store. Values may carry
//! a cleanup action, which runs exactly once when the owning store is closed.

mod imp;

pub use imp::*;

use crate::errors::BoxError;
use itertools::Itertools;
use smol_str::SmolStr;
use std::fmt;

/// A partition of a [`ContextStore`], isolating unrelated values that might share a key.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Namespace {
    parts: Vec<SmolStr>,
}

impl Namespace {
    /// The namespace with no parts.
    pub const GLOBAL: Namespace = Namespace { parts: Vec::new() };

    /// Creates a namespace out of the given parts.
    pub fn new<I>(parts: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<SmolStr>,
    {
        Self {
            parts: parts.into_iter().map(Into::into).collect(),
        }
    }

    /// Returns a new namespace with `part` appended.
    pub fn append(&self, part: impl Into<SmolStr>) -> Self {
        let mut parts = self.parts.clone();
        parts.push(part.into());
        Self { parts }
    }

    /// The parts of this namespace.
    pub fn parts(&self) -> &[SmolStr] {
        &self.parts
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.parts.is_empty() {
            write!(f, "global namespace")
        } else {
            write!(f, "namespace `{}`", self.parts.iter().join("/"))
        }
    }
}

/// A value that must be released when the store holding it is closed.
pub trait CloseableResource: Send + Sync {
    /// Releases the resource. Called at most once.
    fn close(&self) -> Result<(), BoxError>;
}
