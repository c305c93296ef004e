// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Extensions and the registry they are looked up in.
//!
//! An [`Extension`] bundles one or more capability implementations under a single identity. The
//! set of capabilities is computed once, when the extension is built, and recorded as
//! [`Capabilities`] flags, so looking up every parameter resolver in an [`ExtensionRegistry`] is a
//! flag test per registered extension.

mod registry;

pub use registry::*;

use crate::{errors::BoxError, resolution::ParameterContext, scope::ExecutionScope, value::Value};
use bitflags::bitflags;
use smol_str::SmolStr;
use std::{
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
};

bitflags! {
    /// The capabilities an [`Extension`] implements.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct Capabilities: u8 {
        /// Supplies values for executable parameters.
        const PARAMETER_RESOLVER = 1 << 0;
        /// Runs before each test invocation.
        const BEFORE_EACH_CALLBACK = 1 << 1;
        /// Runs after each test invocation.
        const AFTER_EACH_CALLBACK = 1 << 2;
    }
}

/// Supplies values for parameters of executables.
///
/// Both operations may fail. Returning a [`ParameterResolutionError`] passes it through to the
/// caller unchanged; any other error is wrapped.
///
/// [`ParameterResolutionError`]: crate::errors::ParameterResolutionError
pub trait ParameterResolver: Send + Sync {
    /// Returns true if this resolver can supply a value for the parameter.
    fn supports_parameter(
        &self,
        pcx: &ParameterContext<'_>,
        scope: &ExecutionScope,
    ) -> Result<bool, BoxError>;

    /// Produces the value for the parameter. `None` means absence, which is only accepted for
    /// non-primitive parameters.
    ///
    /// Only called if [`supports_parameter`](Self::supports_parameter) returned true, and only
    /// once per parameter per invocation.
    fn resolve_parameter(
        &self,
        pcx: &ParameterContext<'_>,
        scope: &ExecutionScope,
    ) -> Result<Option<Value>, BoxError>;
}

/// Runs before each test invocation.
pub trait BeforeEachCallback: Send + Sync {
    /// Called with the scope of the test about to run.
    fn before_each(&self, scope: &ExecutionScope) -> Result<(), BoxError>;
}

/// Runs after each test invocation, whether or not it succeeded.
pub trait AfterEachCallback: Send + Sync {
    /// Called with the scope of the test that just ran.
    fn after_each(&self, scope: &ExecutionScope) -> Result<(), BoxError>;
}

/// A process-unique identifier for an [`Extension`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ExtensionId(u64);

impl ExtensionId {
    fn next() -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);
        Self(NEXT_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl fmt::Display for ExtensionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A registered plugin instance.
///
/// Cloning an extension produces a handle with the same identity. Registering the same extension
/// twice makes it appear twice.
#[derive(Clone)]
pub struct Extension {
    id: ExtensionId,
    name: SmolStr,
    capabilities: Capabilities,
    resolver: Option<Arc<dyn ParameterResolver>>,
    before_each: Option<Arc<dyn BeforeEachCallback>>,
    after_each: Option<Arc<dyn AfterEachCallback>>,
}

impl Extension {
    /// Returns a builder for an extension called `name`.
    pub fn builder(name: impl Into<SmolStr>) -> ExtensionBuilder {
        ExtensionBuilder {
            name: name.into(),
            resolver: None,
            before_each: None,
            after_each: None,
        }
    }

    /// Creates an extension that only resolves parameters.
    pub fn parameter_resolver(
        name: impl Into<SmolStr>,
        resolver: impl ParameterResolver + 'static,
    ) -> Self {
        Self::builder(name).with_parameter_resolver(resolver).build()
    }

    /// The unique identity of this extension.
    pub fn id(&self) -> ExtensionId {
        self.id
    }

    /// The human-readable name of this extension.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The capabilities this extension implements.
    pub fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    /// The parameter resolver, if this extension is one.
    pub fn as_parameter_resolver(&self) -> Option<&dyn ParameterResolver> {
        self.resolver.as_deref()
    }

    /// The before-each callback, if this extension has one.
    pub fn as_before_each_callback(&self) -> Option<&dyn BeforeEachCallback> {
        self.before_each.as_deref()
    }

    /// The after-each callback, if this extension has one.
    pub fn as_after_each_callback(&self) -> Option<&dyn AfterEachCallback> {
        self.after_each.as_deref()
    }
}

impl fmt::Debug for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extension")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("capabilities", &self.capabilities)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for Extension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.name, self.id)
    }
}

/// Builds an [`Extension`] out of capability implementations.
#[must_use]
pub struct ExtensionBuilder {
    name: SmolStr,
    resolver: Option<Arc<dyn ParameterResolver>>,
    before_each: Option<Arc<dyn BeforeEachCallback>>,
    after_each: Option<Arc<dyn AfterEachCallback>>,
}

impl ExtensionBuilder {
    /// Adds the parameter resolver capability.
    pub fn with_parameter_resolver(mut self, resolver: impl ParameterResolver + 'static) -> Self {
        self.resolver = Some(Arc::new(resolver));
        self
    }

    /// Adds the before-each callback capability.
    pub fn with_before_each(mut self, callback: impl BeforeEachCallback + 'static) -> Self {
        self.before_each = Some(Arc::new(callback));
        self
    }

    /// Adds the after-each callback capability.
    pub fn with_after_each(mut self, callback: impl AfterEachCallback + 'static) -> Self {
        self.after_each = Some(Arc::new(callback));
        self
    }

    /// Assigns an identity and records the capabilities.
    pub fn build(self) -> Extension {
        let mut capabilities = Capabilities::empty();
        capabilities.set(Capabilities::PARAMETER_RESOLVER, self.resolver.is_some());
        capabilities.set(Capabilities::BEFORE_EACH_CALLBACK, self.before_each.is_some());
        capabilities.set(Capabilities::AFTER_EACH_CALLBACK, self.after_each.is_some());

        Extension {
            id: ExtensionId::next(),
            name: self.name,
            capabilities,
            resolver: self.resolver,
            before_each: self.before_each,
            after_each: self.after_each,
        }
    }
}

impl<F> BeforeEachCallback for F
where
    F: Fn(&ExecutionScope) -> Result<(), BoxError> + Send + Sync,
{
    fn before_each(&self, scope: &ExecutionScope) -> Result<(), BoxError> {
        self(scope)
    }
}

impl<F> AfterEachCallback for F
where
    F: Fn(&ExecutionScope) -> Result<(), BoxError> + Send + Sync,
{
    fn after_each(&self, scope: &ExecutionScope) -> Result<(), BoxError> {
        self(scope)
    }
}
