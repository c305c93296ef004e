// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    config::InvocationKind,
    errors::{
        CancelledError, InvocationError, ParameterResolutionError, ResolutionErrorKind,
        TimeoutError,
    },
};
use chrono::{DateTime, Local};
use std::{fmt, time::Duration};

/// How an invocation ended.
///
/// Produced by [`Invoker::invoke`](crate::runner::Invoker::invoke). Each invocation is classified
/// as exactly one variant.
#[derive(Debug)]
pub enum InvocationOutcome<T> {
    /// The invocation completed and returned a value.
    Success(T),

    /// The invocation never started because its arguments could not be resolved.
    ResolutionFailed(ParameterResolutionError),

    /// The invocation overran its deadline.
    TimedOut(TimeoutError),

    /// A global stop was requested before the invocation completed.
    Cancelled(CancelledError),

    /// The invocation, or a callback around it, failed.
    Failed(InvocationError),
}

impl<T> InvocationOutcome<T> {
    /// The classification of this outcome.
    pub fn kind(&self) -> OutcomeKind {
        match self {
            Self::Success(_) => OutcomeKind::Success,
            Self::ResolutionFailed(error) => OutcomeKind::ResolutionFailed(error.kind()),
            Self::TimedOut(_) => OutcomeKind::TimedOut,
            Self::Cancelled(_) => OutcomeKind::Cancelled,
            Self::Failed(_) => OutcomeKind::Failed,
        }
    }

    /// Returns true if the invocation succeeded.
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    /// Converts this outcome back into a `Result`.
    pub fn into_result(self) -> Result<T, InvocationError> {
        match self {
            Self::Success(value) => Ok(value),
            Self::ResolutionFailed(error) => Err(error.into()),
            Self::TimedOut(error) => Err(error.into()),
            Self::Cancelled(error) => Err(error.into()),
            Self::Failed(error) => Err(error),
        }
    }
}

impl<T> From<Result<T, InvocationError>> for InvocationOutcome<T> {
    fn from(result: Result<T, InvocationError>) -> Self {
        match result {
            Ok(value) => Self::Success(value),
            Err(InvocationError::Resolution(error)) => Self::ResolutionFailed(error),
            Err(InvocationError::Timeout(error)) => Self::TimedOut(error),
            Err(InvocationError::Cancelled(error)) => Self::Cancelled(error),
            Err(error) => Self::Failed(error),
        }
    }
}

/// The classification of an [`InvocationOutcome`], without its payload.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OutcomeKind {
    /// See [`InvocationOutcome::Success`].
    Success,
    /// See [`InvocationOutcome::ResolutionFailed`].
    ResolutionFailed(ResolutionErrorKind),
    /// See [`InvocationOutcome::TimedOut`].
    TimedOut,
    /// See [`InvocationOutcome::Cancelled`].
    Cancelled,
    /// See [`InvocationOutcome::Failed`].
    Failed,
}

impl fmt::Display for OutcomeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Success => f.write_str("succeeded"),
            Self::ResolutionFailed(kind) => write!(f, "resolution failed ({kind})"),
            Self::TimedOut => f.write_str("timed out"),
            Self::Cancelled => f.write_str("cancelled"),
            Self::Failed => f.write_str("failed"),
        }
    }
}

/// A finished invocation.
#[derive(Debug)]
pub struct InvocationReport<T> {
    /// The kind of invocation.
    pub kind: InvocationKind,

    /// The signature of the invoked executable.
    pub executable: String,

    /// The time at which the invocation started.
    pub start_time: DateTime<Local>,

    /// How long the invocation took, including argument resolution and callbacks.
    pub duration: Duration,

    /// How the invocation ended.
    pub outcome: InvocationOutcome<T>,
}

impl<T> InvocationReport<T> {
    /// Converts the outcome into a `Result`, discarding timing information.
    pub fn into_result(self) -> Result<T, InvocationError> {
        self.outcome.into_result()
    }
}

impl<T> fmt::Display for InvocationReport<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Sub-millisecond precision only adds noise to the output.
        let millis = self.duration.as_millis().try_into().unwrap_or(u64::MAX);
        let duration = Duration::from_millis(millis);
        write!(
            f,
            "{} [{}] {} in {}",
            self.kind,
            self.executable,
            self.outcome.kind(),
            humantime::format_duration(duration),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        config::{ThreadMode, TimeUnit, TimeoutDuration},
        errors::BoxError,
    };

    fn timeout_error() -> TimeoutError {
        TimeoutError::new(
            InvocationKind::Test,
            TimeoutDuration::new(1, TimeUnit::Seconds).unwrap(),
            Duration::from_millis(1500),
            ThreadMode::SeparateThread,
            None,
        )
    }

    fn outcome(result: Result<u8, InvocationError>) -> InvocationOutcome<u8> {
        result.into()
    }

    #[test]
    fn results_are_classified() {
        let success = outcome(Ok(1));
        assert_eq!(success.kind(), OutcomeKind::Success);
        assert!(success.is_success());

        let timed_out = outcome(Err(timeout_error().into()));
        assert_eq!(timed_out.kind(), OutcomeKind::TimedOut);

        let cancelled = outcome(Err(CancelledError::new(InvocationKind::AfterAll).into()));
        assert_eq!(cancelled.kind(), OutcomeKind::Cancelled);

        let failed = outcome(Err(InvocationError::Action(BoxError::from("boom"))));
        assert_eq!(failed.kind(), OutcomeKind::Failed);
        assert!(!failed.is_success());
        assert!(matches!(failed.into_result(), Err(InvocationError::Action(_))));
    }

    #[test]
    fn report_display() {
        let report = InvocationReport {
            kind: InvocationKind::Test,
            executable: "Calculator::add(a: i32, b: i32)".to_owned(),
            start_time: Local::now(),
            duration: Duration::from_micros(1_250_300),
            outcome: InvocationOutcome::<()>::TimedOut(timeout_error()),
        };
        assert_eq!(
            report.to_string(),
            "test [Calculator::add(a: i32, b: i32)] timed out in 1s 250ms"
        );
        assert_eq!(OutcomeKind::Success.to_string(), "succeeded");
        assert_eq!(
            OutcomeKind::ResolutionFailed(ResolutionErrorKind::NoResolver).to_string(),
            "resolution failed (no-resolver)"
        );
    }
}
