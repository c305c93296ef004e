// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Resolution of the arguments an executable is invoked with.
//!
//! Each parameter is offered to every visible [`ParameterResolver`], outermost scope first. Exactly
//! one resolver must claim the parameter; its value is then checked against the declared type.

use crate::{
    errors::{BoxError, ParameterResolutionError, ParameterSummary},
    executable::{Executable, Parameter},
    extension::{Extension, ParameterResolver},
    scope::ExecutionScope,
    value::Value,
};
use smallvec::SmallVec;
use std::{any::Any, sync::Arc};
use tracing::trace;

/// The parameter being resolved, passed to every [`ParameterResolver`] operation.
#[derive(Clone, Copy, Debug)]
pub struct ParameterContext<'a> {
    executable: &'a Executable,
    parameter: &'a Parameter,
    index: usize,
    target: Option<&'a Value>,
}

impl<'a> ParameterContext<'a> {
    /// The executable declaring the parameter.
    pub fn executable(&self) -> &'a Executable {
        self.executable
    }

    /// The parameter.
    pub fn parameter(&self) -> &'a Parameter {
        self.parameter
    }

    /// The zero-based position of the parameter.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The instance the executable is invoked on, if any.
    pub fn target(&self) -> Option<&'a Value> {
        self.target
    }

    /// Shorthand for checking whether the parameter carries `annotation`.
    pub fn is_annotated(&self, annotation: &str) -> bool {
        self.parameter.is_annotated(annotation)
    }
}

/// The resolved arguments of an executable, one per declared parameter, in declaration order.
///
/// `None` is an absent value, which only non-primitive parameters can receive.
#[derive(Clone, Debug, Default)]
pub struct Arguments(Vec<Option<Value>>);

impl Arguments {
    /// Creates arguments out of already resolved values.
    pub fn new(values: Vec<Option<Value>>) -> Self {
        Self(values)
    }

    /// The number of arguments.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true if the executable takes no arguments.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// The argument at `index`, if it is present.
    pub fn value(&self, index: usize) -> Option<&Value> {
        self.0.get(index)?.as_ref()
    }

    /// The argument at `index`, if it is present and a `T`.
    pub fn get<T: Any + Send + Sync>(&self, index: usize) -> Option<Arc<T>> {
        self.value(index)?.downcast()
    }

    /// Iterates over the arguments.
    pub fn iter(&self) -> impl Iterator<Item = Option<&Value>> + '_ {
        self.0.iter().map(Option::as_ref)
    }

    /// Returns the underlying values.
    pub fn into_inner(self) -> Vec<Option<Value>> {
        self.0
    }
}

/// Resolves every argument of `executable`.
///
/// If `outer_instance` is provided, it fills the first parameter and resolvers are consulted from
/// the second parameter onwards. `target` is the instance the executable is invoked on, exposed to
/// resolvers through [`ParameterContext::target`].
///
/// Either every argument is resolved or an error is returned. Panics in resolvers are not caught.
pub fn resolve_arguments(
    executable: &Executable,
    target: Option<&Value>,
    outer_instance: Option<Value>,
    scope: &ExecutionScope,
) -> Result<Arguments, ParameterResolutionError> {
    let parameters = executable.parameters();
    let mut values = Vec::with_capacity(parameters.len());

    let mut start = 0;
    if let Some(outer_instance) = outer_instance {
        if !parameters.is_empty() {
            values.push(Some(outer_instance));
            start = 1;
        }
    }

    for (index, parameter) in parameters.iter().enumerate().skip(start) {
        let pcx = ParameterContext {
            executable,
            parameter,
            index,
            target,
        };
        values.push(resolve_parameter(&pcx, scope)?);
    }

    Ok(Arguments(values))
}

fn resolve_parameter(
    pcx: &ParameterContext<'_>,
    scope: &ExecutionScope,
) -> Result<Option<Value>, ParameterResolutionError> {
    let mut candidates: SmallVec<[(&Extension, &dyn ParameterResolver); 2]> = SmallVec::new();
    for (extension, resolver) in scope.registry().parameter_resolvers() {
        if resolver
            .supports_parameter(pcx, scope)
            .map_err(|error| wrap_error(pcx, error))?
        {
            candidates.push((extension, resolver));
        }
    }

    let (extension, resolver) = match candidates.as_slice() {
        [] => {
            return Err(ParameterResolutionError::NoResolver {
                target: ParameterSummary::new(pcx),
            });
        }
        [candidate] => *candidate,
        _ => {
            return Err(ParameterResolutionError::AmbiguousResolvers {
                target: ParameterSummary::new(pcx),
                resolvers: candidates
                    .iter()
                    .map(|(extension, _)| extension.to_string())
                    .collect(),
            });
        }
    };

    let value = resolver
        .resolve_parameter(pcx, scope)
        .map_err(|error| wrap_error(pcx, error))?;

    let declared = pcx.parameter().ty();
    if !declared.accepts(value.as_ref()) {
        let target = ParameterSummary::new(pcx);
        return Err(match &value {
            None => ParameterResolutionError::PrimitiveNull {
                resolver: extension.to_string(),
                target,
            },
            Some(value) => ParameterResolutionError::TypeMismatch {
                resolver: extension.to_string(),
                actual_type: value.type_info().name(),
                target,
            },
        });
    }

    trace!(
        resolver = %extension,
        value_type = value.as_ref().map_or("(absent)", |value| value.type_info().name()),
        parameter = %pcx.parameter(),
        executable = %pcx.executable(),
        "resolved parameter",
    );
    Ok(value)
}

fn wrap_error(pcx: &ParameterContext<'_>, error: BoxError) -> ParameterResolutionError {
    match error.downcast::<ParameterResolutionError>() {
        Ok(error) => *error,
        Err(error) => ParameterResolutionError::resolver_failed(pcx, error),
    }
}
