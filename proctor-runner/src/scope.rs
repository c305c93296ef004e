// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Execution scopes: the nodes of the execution hierarchy.
//!
//! A scope owns an [`ExtensionRegistry`] and a [`ContextStore`], both linked to the scope's
//! parent. Scopes are created with a builder so that extensions can be registered before the
//! registry becomes shared, and they are torn down by [closing](ExecutionScope::close) them,
//! deepest scope first.

use crate::{
    config::{ConfigurationParameters, TimeoutConfiguration},
    errors::{StoreCloseError, StoreError},
    extension::{Extension, ExtensionRegistry},
    store::{ContextStore, Namespace},
};
use smol_str::SmolStr;
use std::sync::Arc;
use tracing::debug;

/// One node in the execution hierarchy, for example a test class or a single test.
#[derive(Debug)]
pub struct ExecutionScope {
    unique_id: String,
    display_name: SmolStr,
    parent: Option<Arc<ExecutionScope>>,
    registry: Arc<ExtensionRegistry>,
    store: Arc<ContextStore>,
    parameters: Arc<dyn ConfigurationParameters>,
}

impl ExecutionScope {
    /// Returns a builder for a root scope reading configuration from `parameters`.
    pub fn root(
        unique_id: impl Into<String>,
        parameters: Arc<dyn ConfigurationParameters>,
    ) -> ExecutionScopeBuilder {
        let unique_id = unique_id.into();
        ExecutionScopeBuilder {
            display_name: SmolStr::new(&unique_id),
            unique_id,
            parent: None,
            registry: ExtensionRegistry::new_root(),
            parameters,
        }
    }

    /// Returns a builder for a scope nested in `parent`. The child's unique id is the parent's
    /// followed by `/` and `segment`.
    pub fn child(parent: &Arc<ExecutionScope>, segment: &str) -> ExecutionScopeBuilder {
        ExecutionScopeBuilder {
            unique_id: format!("{}/{segment}", parent.unique_id),
            display_name: SmolStr::new(segment),
            parent: Some(Arc::clone(parent)),
            registry: ExtensionRegistry::new_child(Arc::clone(&parent.registry)),
            parameters: Arc::clone(&parent.parameters),
        }
    }

    /// A string uniquely identifying this scope within its tree.
    pub fn unique_id(&self) -> &str {
        &self.unique_id
    }

    /// The human-readable label of this scope.
    pub fn display_name(&self) -> &str {
        &self.display_name
    }

    /// The enclosing scope, if any.
    pub fn parent(&self) -> Option<&Arc<ExecutionScope>> {
        self.parent.as_ref()
    }

    /// The outermost enclosing scope, or `self` for a root scope.
    pub fn root_scope(&self) -> &ExecutionScope {
        let mut scope = self;
        while let Some(parent) = scope.parent.as_deref() {
            scope = parent;
        }
        scope
    }

    /// The extensions visible from this scope.
    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// This scope's store.
    pub fn store(&self) -> &ContextStore {
        &self.store
    }

    /// Reads a configuration parameter.
    pub fn configuration_parameter(&self, key: &str) -> Option<String> {
        self.parameters.get(key)
    }

    /// The timeout configuration shared by every scope in this tree.
    ///
    /// It is created on first use and cached in the root scope's store, so every property is
    /// parsed at most once per tree.
    pub fn timeout_configuration(&self) -> Result<Arc<TimeoutConfiguration>, StoreError> {
        let root = self.root_scope();
        root.store.get_or_compute(
            &Namespace::new(["proctor", "timeout"]),
            "configuration",
            || TimeoutConfiguration::new(Arc::clone(&root.parameters)),
        )
    }

    /// Runs the cleanup actions of this scope's store.
    ///
    /// Enclosing scopes are not closed; close child scopes before their parents.
    pub fn close(&self) -> Result<(), StoreCloseError> {
        debug!(scope = %self.unique_id, "closing execution scope");
        self.store.close()
    }
}

/// Builder for an [`ExecutionScope`].
#[derive(Debug)]
pub struct ExecutionScopeBuilder {
    unique_id: String,
    display_name: SmolStr,
    parent: Option<Arc<ExecutionScope>>,
    registry: ExtensionRegistry,
    parameters: Arc<dyn ConfigurationParameters>,
}

impl ExecutionScopeBuilder {
    /// Sets the human-readable label. Defaults to the last segment of the unique id.
    pub fn set_display_name(&mut self, display_name: impl Into<SmolStr>) -> &mut Self {
        self.display_name = display_name.into();
        self
    }

    /// Registers an extension at this scope.
    pub fn register(&mut self, extension: Extension) -> &mut Self {
        self.registry.register(extension);
        self
    }

    /// Registers several extensions at this scope, in order.
    pub fn register_all(&mut self, extensions: impl IntoIterator<Item = Extension>) -> &mut Self {
        for extension in extensions {
            self.registry.register(extension);
        }
        self
    }

    /// Creates the scope together with its store.
    pub fn build(self) -> Arc<ExecutionScope> {
        let store = match &self.parent {
            Some(parent) => ContextStore::new_child(Arc::clone(&parent.store)),
            None => ContextStore::new_root(),
        };
        Arc::new(ExecutionScope {
            unique_id: self.unique_id,
            display_name: self.display_name,
            parent: self.parent,
            registry: Arc::new(self.registry),
            store: Arc::new(store),
            parameters: self.parameters,
        })
    }
}
