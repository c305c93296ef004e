// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{AfterEachCallback, BeforeEachCallback, Capabilities, Extension, ParameterResolver};
use smallvec::SmallVec;
use std::sync::Arc;

/// The extensions registered at one scope level, plus a link to the enclosing level.
///
/// Registration requires `&mut self`, so a registry is only mutable until it is shared with child
/// registries or scopes. Lookups never take locks.
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    parent: Option<Arc<ExtensionRegistry>>,
    local: Vec<Extension>,
}

impl ExtensionRegistry {
    /// Creates a registry with no parent.
    pub fn new_root() -> Self {
        Self::default()
    }

    /// Creates a registry that inherits every extension visible from `parent`.
    pub fn new_child(parent: Arc<ExtensionRegistry>) -> Self {
        Self {
            parent: Some(parent),
            local: Vec::new(),
        }
    }

    /// The enclosing registry, if any.
    pub fn parent(&self) -> Option<&Arc<ExtensionRegistry>> {
        self.parent.as_ref()
    }

    /// Appends `extension` to this level. Duplicates are kept.
    pub fn register(&mut self, extension: Extension) {
        self.local.push(extension);
    }

    /// The extensions registered at this level, in registration order.
    pub fn local_extensions(&self) -> &[Extension] {
        &self.local
    }

    /// Every visible extension implementing `capability`: the root level's extensions first,
    /// then each descendant level's down to this one, each in registration order.
    pub fn stream(
        &self,
        capability: Capabilities,
    ) -> impl DoubleEndedIterator<Item = &Extension> + '_ {
        let mut chain: SmallVec<[&ExtensionRegistry; 8]> = SmallVec::new();
        let mut current = Some(self);
        while let Some(registry) = current {
            chain.push(registry);
            current = registry.parent.as_deref();
        }

        chain
            .into_iter()
            .rev()
            .flat_map(|registry| registry.local.iter())
            .filter(move |extension| extension.capabilities().contains(capability))
    }

    /// Every visible parameter resolver, outermost first.
    pub fn parameter_resolvers(
        &self,
    ) -> impl DoubleEndedIterator<Item = (&Extension, &dyn ParameterResolver)> + '_ {
        self.stream(Capabilities::PARAMETER_RESOLVER)
            .filter_map(|extension| Some((extension, extension.as_parameter_resolver()?)))
    }

    /// Every visible before-each callback, outermost first.
    pub fn before_each_callbacks(
        &self,
    ) -> impl DoubleEndedIterator<Item = (&Extension, &dyn BeforeEachCallback)> + '_ {
        self.stream(Capabilities::BEFORE_EACH_CALLBACK)
            .filter_map(|extension| Some((extension, extension.as_before_each_callback()?)))
    }

    /// Every visible after-each callback, outermost first.
    pub fn after_each_callbacks(
        &self,
    ) -> impl DoubleEndedIterator<Item = (&Extension, &dyn AfterEachCallback)> + '_ {
        self.stream(Capabilities::AFTER_EACH_CALLBACK)
            .filter_map(|extension| Some((extension, extension.as_after_each_callback()?)))
    }
}
