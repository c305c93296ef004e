// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by proctor.

use crate::{
    config::{InvocationKind, ThreadMode, TimeoutDuration, TimeoutMode},
    executable::ExecutableKind,
    resolution::ParameterContext,
    store::Namespace,
};
use camino::Utf8PathBuf;
use config::ConfigError;
use smol_str::SmolStr;
use std::{fmt, time::Duration};
use thiserror::Error;

/// A type-erased error returned by extensions and invoked actions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// An error that occurred while reading layered configuration.
#[derive(Debug, Error)]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Option<Utf8PathBuf>,
    #[source]
    err: ConfigError,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: Option<Utf8PathBuf>, err: ConfigError) -> Self {
        Self { config_file, err }
    }

    /// The config file that was being read, if the error is attributable to one.
    pub fn config_file(&self) -> Option<&Utf8PathBuf> {
        self.config_file.as_ref()
    }
}

impl fmt::Display for ConfigParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.config_file {
            Some(config_file) => write!(f, "failed to parse proctor config at `{config_file}`"),
            None => write!(f, "failed to build proctor config"),
        }
    }
}

/// An error returned while parsing a [`TimeoutDuration`] from a string.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum TimeoutDurationParseError {
    /// The input did not match `<positive integer>[ ]<unit>`.
    #[error(
        "invalid timeout duration `{input}`: expected a positive integer followed by a unit \
         (ns, μs, ms, s, m, h, d)"
    )]
    InvalidFormat {
        /// The input that failed to parse.
        input: String,
    },

    /// The magnitude does not fit in 64 bits.
    #[error("invalid timeout duration `{input}`: magnitude is too large")]
    Overflow {
        /// The input that failed to parse.
        input: String,
    },
}

/// Error returned while parsing a [`TimeoutMode`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for timeout mode: {input}\n(known values: {})",
    TimeoutMode::variants().join(", "),
)]
pub struct TimeoutModeParseError {
    input: String,
}

impl TimeoutModeParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// Error returned while parsing a [`ThreadMode`] value from a string.
#[derive(Clone, Debug, Error)]
#[error(
    "unrecognized value for timeout thread mode: {input}\n(known values: {})",
    ThreadMode::variants().join(", "),
)]
pub struct ThreadModeParseError {
    input: String,
}

impl ThreadModeParseError {
    pub(crate) fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
        }
    }
}

/// The parameter a [`ParameterResolutionError`] is about.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterSummary {
    name: SmolStr,
    parameter: String,
    index: usize,
    declared_type: &'static str,
    executable_kind: ExecutableKind,
    executable: String,
}

impl ParameterSummary {
    pub(crate) fn new(pcx: &ParameterContext<'_>) -> Self {
        Self {
            name: pcx.parameter().name().into(),
            parameter: pcx.parameter().to_string(),
            index: pcx.index(),
            declared_type: pcx.parameter().ty().name(),
            executable_kind: pcx.executable().kind(),
            executable: pcx.executable().signature(),
        }
    }

    /// The parameter's declared name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The parameter, rendered as `name: type`.
    pub fn parameter(&self) -> &str {
        &self.parameter
    }

    /// The zero-based position of the parameter.
    pub fn index(&self) -> usize {
        self.index
    }

    /// The declared type's name.
    pub fn declared_type(&self) -> &'static str {
        self.declared_type
    }

    /// Whether the owner is a method or a constructor.
    pub fn executable_kind(&self) -> ExecutableKind {
        self.executable_kind
    }

    /// The owning executable's signature.
    pub fn executable(&self) -> &str {
        &self.executable
    }
}

impl fmt::Display for ParameterSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "parameter [{}] at index {} in {} [{}]",
            self.parameter, self.index, self.executable_kind, self.executable
        )
    }
}

/// The taxonomy code of a [`ParameterResolutionError`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ResolutionErrorKind {
    /// No resolver supports the parameter.
    NoResolver,

    /// More than one resolver supports the parameter.
    AmbiguousResolver,

    /// A primitive parameter resolved to absence.
    PrimitiveNull,

    /// The resolved value is not assignable to the declared type.
    TypeMismatch,

    /// A resolver returned an unexpected error.
    ResolutionFailure,
}

impl ResolutionErrorKind {
    /// The code reported for this kind.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoResolver => "no-resolver",
            Self::AmbiguousResolver => "ambiguous-resolver",
            Self::PrimitiveNull => "primitive-null",
            Self::TypeMismatch => "type-mismatch",
            Self::ResolutionFailure => "resolution-failure",
        }
    }
}

impl fmt::Display for ResolutionErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An error that occurred while resolving the arguments of an executable.
///
/// Resolver implementations may return this error from their own operations; it is then passed
/// through unchanged rather than wrapped in [`ResolverFailed`](Self::ResolverFailed).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ParameterResolutionError {
    /// No registered resolver supports the parameter.
    #[error("no parameter resolver registered for {target}")]
    NoResolver {
        /// The parameter being resolved.
        target: ParameterSummary,
    },

    /// More than one registered resolver supports the parameter.
    #[error(
        "discovered multiple competing parameter resolvers for {target}: {}",
        .resolvers.join(", "),
    )]
    AmbiguousResolvers {
        /// The parameter being resolved.
        target: ParameterSummary,

        /// Every competing resolver, in registry order.
        resolvers: Vec<String>,
    },

    /// A resolver produced absence for a primitive parameter.
    #[error(
        "parameter resolver `{resolver}` resolved no value for {target}, \
         but a primitive of type `{}` is required",
        .target.declared_type,
    )]
    PrimitiveNull {
        /// The resolver that produced absence.
        resolver: String,

        /// The parameter being resolved.
        target: ParameterSummary,
    },

    /// A resolver produced a value whose type is incompatible with the declared type.
    #[error(
        "parameter resolver `{resolver}` resolved a value of type `{actual_type}` for {target}, \
         but a value assignment compatible with `{}` is required",
        .target.declared_type,
    )]
    TypeMismatch {
        /// The resolver that produced the value.
        resolver: String,

        /// The concrete type of the produced value.
        actual_type: &'static str,

        /// The parameter being resolved.
        target: ParameterSummary,
    },

    /// A resolver's predicate or resolve operation returned an error.
    #[error("{message}")]
    ResolverFailed {
        /// The parameter being resolved.
        target: ParameterSummary,

        /// The full message, including the cause's message if it has one.
        message: String,

        /// The underlying error.
        #[source]
        error: BoxError,
    },
}

impl ParameterResolutionError {
    pub(crate) fn resolver_failed(pcx: &ParameterContext<'_>, error: BoxError) -> Self {
        let target = ParameterSummary::new(pcx);
        let mut message = format!("failed to resolve {target}");
        let cause = error.to_string();
        if !cause.trim().is_empty() {
            message.push_str(": ");
            message.push_str(&cause);
        }
        Self::ResolverFailed {
            target,
            message,
            error,
        }
    }

    /// The taxonomy code of this error.
    pub fn kind(&self) -> ResolutionErrorKind {
        match self {
            Self::NoResolver { .. } => ResolutionErrorKind::NoResolver,
            Self::AmbiguousResolvers { .. } => ResolutionErrorKind::AmbiguousResolver,
            Self::PrimitiveNull { .. } => ResolutionErrorKind::PrimitiveNull,
            Self::TypeMismatch { .. } => ResolutionErrorKind::TypeMismatch,
            Self::ResolverFailed { .. } => ResolutionErrorKind::ResolutionFailure,
        }
    }

    /// The parameter this error is about.
    pub fn target(&self) -> &ParameterSummary {
        match self {
            Self::NoResolver { target }
            | Self::AmbiguousResolvers { target, .. }
            | Self::PrimitiveNull { target, .. }
            | Self::TypeMismatch { target, .. }
            | Self::ResolverFailed { target, .. } => target,
        }
    }
}

/// An error accessing a [`ContextStore`](crate::store::ContextStore).
#[derive(Debug, Error)]
pub enum StoreError {
    /// The store has already been closed.
    #[error("store is closed: cannot access `{key}` in {namespace}")]
    Closed {
        /// The namespace being accessed.
        namespace: Namespace,

        /// The key being accessed.
        key: SmolStr,
    },

    /// The stored value has a different type than the one requested.
    #[error(
        "value for `{key}` in {namespace} has type `{actual}`, but `{expected}` was requested"
    )]
    TypeMismatch {
        /// The namespace being accessed.
        namespace: Namespace,

        /// The key being accessed.
        key: SmolStr,

        /// The requested type.
        expected: &'static str,

        /// The stored type.
        actual: &'static str,
    },
}

/// A cleanup action that failed while closing a store.
#[derive(Debug, Error)]
#[error("cleanup for `{key}` in {namespace} failed")]
pub struct CleanupError {
    namespace: Namespace,
    key: SmolStr,
    #[source]
    error: BoxError,
}

impl CleanupError {
    pub(crate) fn new(namespace: Namespace, key: SmolStr, error: BoxError) -> Self {
        Self {
            namespace,
            key,
            error,
        }
    }

    /// The namespace of the entry whose cleanup failed.
    pub fn namespace(&self) -> &Namespace {
        &self.namespace
    }

    /// The key of the entry whose cleanup failed.
    pub fn key(&self) -> &str {
        &self.key
    }
}

/// Every cleanup failure that occurred while closing a store.
///
/// Closing continues past failed cleanups, so this may contain more than one error.
#[derive(Debug)]
pub struct StoreCloseError {
    errors: Vec<CleanupError>,
}

impl StoreCloseError {
    pub(crate) fn new(errors: Vec<CleanupError>) -> Self {
        debug_assert!(!errors.is_empty(), "at least one cleanup must have failed");
        Self { errors }
    }

    /// The individual failures, in the order the cleanups ran.
    pub fn errors(&self) -> &[CleanupError] {
        &self.errors
    }
}

impl fmt::Display for StoreCloseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let [error] = self.errors.as_slice() {
            return write!(f, "{error}");
        }
        write!(
            f,
            "{} cleanup actions failed while closing store:",
            self.errors.len()
        )?;
        for error in &self.errors {
            write!(f, "\n  * {error}")?;
            let mut source = std::error::Error::source(error);
            while let Some(err) = source {
                write!(f, "\n      caused by: {err}")?;
                source = err.source();
            }
        }
        Ok(())
    }
}

impl std::error::Error for StoreCloseError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self.errors.as_slice() {
            [error] => Some(error),
            _ => None,
        }
    }
}

/// An invocation ran past its deadline.
#[derive(Debug, Error)]
#[error("{kind} invocation timed out after {duration}")]
pub struct TimeoutError {
    kind: InvocationKind,
    duration: TimeoutDuration,
    elapsed: Duration,
    thread_mode: ThreadMode,
    #[source]
    action_error: Option<BoxError>,
}

impl TimeoutError {
    pub(crate) fn new(
        kind: InvocationKind,
        duration: TimeoutDuration,
        elapsed: Duration,
        thread_mode: ThreadMode,
        action_error: Option<BoxError>,
    ) -> Self {
        Self {
            kind,
            duration,
            elapsed,
            thread_mode,
            action_error,
        }
    }

    /// The kind of invocation that timed out.
    pub fn kind(&self) -> InvocationKind {
        self.kind
    }

    /// The configured deadline.
    pub fn duration(&self) -> TimeoutDuration {
        self.duration
    }

    /// How long the caller waited before the timeout was reported.
    pub fn elapsed(&self) -> Duration {
        self.elapsed
    }

    /// The thread mode the invocation ran under.
    pub fn thread_mode(&self) -> ThreadMode {
        self.thread_mode
    }

    /// The error the action itself returned, for same-thread overruns that also failed.
    pub fn action_error(&self) -> Option<&BoxError> {
        self.action_error.as_ref()
    }
}

/// An invocation was abandoned because a global stop was requested.
#[derive(Clone, Debug, Error)]
#[error("{kind} invocation was cancelled by a stop request")]
pub struct CancelledError {
    kind: InvocationKind,
}

impl CancelledError {
    pub(crate) fn new(kind: InvocationKind) -> Self {
        Self { kind }
    }

    /// The kind of invocation that was cancelled.
    pub fn kind(&self) -> InvocationKind {
        self.kind
    }
}

/// An error that occurred while invoking an executable.
#[derive(Debug, Error)]
pub enum InvocationError {
    /// Arguments could not be resolved.
    #[error(transparent)]
    Resolution(#[from] ParameterResolutionError),

    /// The invocation overran its deadline.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// A global stop was requested.
    #[error(transparent)]
    Cancelled(#[from] CancelledError),

    /// The scope's store could not be accessed.
    #[error("error accessing scope store")]
    Store(#[from] StoreError),

    /// The worker thread for a separate-thread invocation could not be spawned.
    #[error("failed to spawn timeout worker thread")]
    WorkerSpawn(#[source] std::io::Error),

    /// A lifecycle callback failed.
    #[error("{callback} callback `{extension}` failed")]
    Callback {
        /// The kind of callback.
        callback: &'static str,

        /// The extension whose callback failed.
        extension: SmolStr,

        /// The error returned by the callback.
        #[source]
        error: BoxError,
    },

    /// The invoked action returned an error.
    #[error("invocation failed")]
    Action(#[source] BoxError),
}

/// An error setting up the signal handler.
#[derive(Debug, Error)]
#[error("error setting up signal handler")]
pub struct SignalHandlerSetupError(#[from] std::io::Error);

/// An error building a [`TimeoutEnforcer`](crate::runner::TimeoutEnforcer).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum EnforcerBuildError {
    /// An error occurred while creating the Tokio runtime.
    #[error("error creating Tokio runtime")]
    TokioRuntimeCreate(#[source] std::io::Error),

    /// An error occurred while setting up signals.
    #[error("error setting up signals")]
    SignalHandlerSetupError(#[from] SignalHandlerSetupError),
}
