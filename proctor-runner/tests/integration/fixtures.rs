// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use proctor_runner::{
    config::{ConfigurationParameters, MapConfigurationParameters},
    errors::BoxError,
    extension::{Extension, ParameterResolver},
    resolution::ParameterContext,
    runner::{Invoker, TimeoutEnforcer},
    scope::ExecutionScope,
    signal::SignalHandlerKind,
    value::Value,
};
use std::{
    any::Any,
    sync::{
        Arc, Once,
        atomic::{AtomicUsize, Ordering},
    },
};

static INIT: Once = Once::new();

pub(crate) fn test_init() {
    INIT.call_once(|| {
        // Ignore the error: another test binary may have installed the hook already.
        let _ = color_eyre::install();
        proctor_runner::output::init_logging();
    });
}

/// Supplies a clone of `value` to every parameter declared as a `T`, counting how often it is
/// asked to resolve.
pub(crate) struct TypedResolver<T> {
    value: T,
    resolutions: Arc<AtomicUsize>,
}

impl<T: Clone + Any + Send + Sync> TypedResolver<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            value,
            resolutions: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub(crate) fn counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.resolutions)
    }
}

impl<T: Clone + Any + Send + Sync> ParameterResolver for TypedResolver<T> {
    fn supports_parameter(
        &self,
        pcx: &ParameterContext<'_>,
        _scope: &ExecutionScope,
    ) -> Result<bool, BoxError> {
        Ok(pcx.parameter().ty().is::<T>())
    }

    fn resolve_parameter(
        &self,
        _pcx: &ParameterContext<'_>,
        _scope: &ExecutionScope,
    ) -> Result<Option<Value>, BoxError> {
        self.resolutions.fetch_add(1, Ordering::SeqCst);
        Ok(Some(Value::new(self.value.clone())))
    }
}

pub(crate) fn supplying<T: Clone + Any + Send + Sync>(name: &str, value: T) -> Extension {
    Extension::parameter_resolver(name, TypedResolver::new(value))
}

pub(crate) fn parameters(values: &[(&str, &str)]) -> Arc<dyn ConfigurationParameters> {
    Arc::new(
        values
            .iter()
            .copied()
            .collect::<MapConfigurationParameters>(),
    )
}

pub(crate) fn invoker() -> Invoker {
    Invoker::new(
        TimeoutEnforcer::builder()
            .build(SignalHandlerKind::Noop)
            .expect("timeout enforcer builds"),
    )
}
