// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{CancellationToken, TimeoutEnforcer};
use crate::{
    config::{DeclaredTimeout, InvocationCategory, InvocationKind},
    errors::{BoxError, CancelledError, InvocationError},
    executable::Executable,
    reporter::{InvocationOutcome, InvocationReport},
    resolution::{Arguments, resolve_arguments},
    scope::ExecutionScope,
    time::stopwatch,
    value::Value,
};
use smol_str::SmolStr;
use tracing::{debug, warn};

/// A request to invoke an executable, as produced by a discoverer.
#[derive(Clone, Debug)]
pub struct InvocationRequest<'a> {
    executable: &'a Executable,
    target: Option<Value>,
    outer_instance: Option<Value>,
    kind: InvocationKind,
    declared_timeout: Option<DeclaredTimeout>,
}

impl<'a> InvocationRequest<'a> {
    /// Creates a request to invoke `executable` as an invocation of `kind`.
    pub fn new(executable: &'a Executable, kind: InvocationKind) -> Self {
        Self {
            executable,
            target: None,
            outer_instance: None,
            kind,
            declared_timeout: None,
        }
    }

    /// Sets the instance the executable is invoked on.
    pub fn with_target(mut self, target: Value) -> Self {
        self.target = Some(target);
        self
    }

    /// Sets the enclosing instance passed as the first argument of an inner type's constructor.
    pub fn with_outer_instance(mut self, outer_instance: Value) -> Self {
        self.outer_instance = Some(outer_instance);
        self
    }

    /// Sets a timeout declared on the executable itself, which takes precedence over configured
    /// defaults.
    pub fn with_declared_timeout(mut self, declared_timeout: DeclaredTimeout) -> Self {
        self.declared_timeout = Some(declared_timeout);
        self
    }

    /// The executable to invoke.
    pub fn executable(&self) -> &'a Executable {
        self.executable
    }

    /// The kind of invocation.
    pub fn kind(&self) -> InvocationKind {
        self.kind
    }
}

/// Resolves arguments for executables and runs them under their effective timeout.
#[derive(Debug)]
pub struct Invoker {
    enforcer: TimeoutEnforcer,
}

impl Invoker {
    /// Creates a new invoker running actions through `enforcer`.
    pub fn new(enforcer: TimeoutEnforcer) -> Self {
        Self { enforcer }
    }

    /// The enforcer used by this invoker.
    pub fn enforcer(&self) -> &TimeoutEnforcer {
        &self.enforcer
    }

    /// Invokes the executable described by `request` within `scope`.
    ///
    /// `body` receives the resolved arguments and the invocation's cancellation token. For
    /// testable invocations, the before-each callbacks visible from `scope` run first, outermost
    /// first, and the after-each callbacks run afterwards, innermost first. After-each callbacks
    /// run even if a before-each callback or the body failed.
    ///
    /// This must not be called from within an async context.
    pub fn invoke<T, F>(
        &self,
        scope: &ExecutionScope,
        request: InvocationRequest<'_>,
        body: F,
    ) -> InvocationReport<T>
    where
        T: Send + 'static,
        F: FnOnce(Arguments, &CancellationToken) -> Result<T, BoxError> + Send + 'static,
    {
        let kind = request.kind;
        let executable = request.executable.signature();
        let stopwatch = stopwatch();

        let result: Result<T, InvocationError> = if self.enforcer.stop_token().is_cancelled() {
            Err(CancelledError::new(kind).into())
        } else if kind.category() == InvocationCategory::Testable {
            let result =
                run_before_each(scope).and_then(|()| self.run_body(scope, request, body));
            run_after_each(scope, result)
        } else {
            self.run_body(scope, request, body)
        };

        let snapshot = stopwatch.snapshot();
        let outcome = InvocationOutcome::from(result);
        debug!(
            %kind,
            scope = scope.unique_id(),
            %executable,
            outcome = %outcome.kind(),
            duration = ?snapshot.duration,
            "invocation finished",
        );
        InvocationReport {
            kind,
            executable,
            start_time: snapshot.start_time,
            duration: snapshot.duration,
            outcome,
        }
    }

    fn run_body<T, F>(
        &self,
        scope: &ExecutionScope,
        request: InvocationRequest<'_>,
        body: F,
    ) -> Result<T, InvocationError>
    where
        T: Send + 'static,
        F: FnOnce(Arguments, &CancellationToken) -> Result<T, BoxError> + Send + 'static,
    {
        let arguments = resolve_arguments(
            request.executable,
            request.target.as_ref(),
            request.outer_instance,
            scope,
        )?;

        let configuration = scope.timeout_configuration()?;
        let timeout = if configuration.is_timeout_disabled() {
            None
        } else {
            configuration.resolve(request.kind, request.declared_timeout)
        };

        self.enforcer
            .run_with_timeout(request.kind, timeout, move |token| body(arguments, token))
    }
}

fn run_before_each(scope: &ExecutionScope) -> Result<(), InvocationError> {
    for (extension, callback) in scope.registry().before_each_callbacks() {
        callback
            .before_each(scope)
            .map_err(|error| InvocationError::Callback {
                callback: "before-each",
                extension: SmolStr::new(extension.name()),
                error,
            })?;
    }
    Ok(())
}

fn run_after_each<T>(
    scope: &ExecutionScope,
    result: Result<T, InvocationError>,
) -> Result<T, InvocationError> {
    let mut first_error = None;
    for (extension, callback) in scope.registry().after_each_callbacks().rev() {
        let Err(error) = callback.after_each(scope) else {
            continue;
        };
        let error = InvocationError::Callback {
            callback: "after-each",
            extension: SmolStr::new(extension.name()),
            error,
        };
        if first_error.is_none() {
            first_error = Some(error);
        } else {
            warn!(scope = scope.unique_id(), %extension, %error, "additional after-each failure");
        }
    }

    match (result, first_error) {
        (Ok(_), Some(error)) => Err(error),
        (Err(invocation_error), Some(error)) => {
            warn!(
                scope = scope.unique_id(),
                %error,
                "after-each callback failed after the invocation had already failed",
            );
            Err(invocation_error)
        }
        (result, None) => result,
    }
}
