// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::CancellationToken;
use crate::{
    config::{EffectiveTimeout, InvocationKind, ThreadMode, TimeoutDuration},
    errors::{BoxError, CancelledError, EnforcerBuildError, InvocationError, TimeoutError},
    signal::SignalHandlerKind,
    time::stopwatch,
};
use std::{
    panic::{AssertUnwindSafe, catch_unwind, resume_unwind},
    sync::atomic::{AtomicUsize, Ordering},
    thread,
};
use tokio::{
    runtime::{Handle, Runtime},
    sync::oneshot,
};
use tracing::debug;

/// Builder for a [`TimeoutEnforcer`].
#[derive(Debug, Default)]
pub struct TimeoutEnforcerBuilder {
    stop: Option<CancellationToken>,
}

impl TimeoutEnforcerBuilder {
    /// Uses `stop` as the global stop request. Defaults to a fresh token.
    pub fn set_stop_token(&mut self, stop: CancellationToken) -> &mut Self {
        self.stop = Some(stop);
        self
    }

    /// Creates the enforcer and its timer runtime.
    ///
    /// With [`SignalHandlerKind::Standard`], interrupt and termination signals cancel the stop
    /// token.
    pub fn build(
        self,
        signal_handler: SignalHandlerKind,
    ) -> Result<TimeoutEnforcer, EnforcerBuildError> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .enable_all()
            .thread_name("proctor-timeout-watchdog")
            .build()
            .map_err(EnforcerBuildError::TokioRuntimeCreate)?;
        let stop = self.stop.unwrap_or_default();

        {
            let _guard = runtime.enter();
            // signal_handler.build() must be called from within the guard.
            let signal_handler = signal_handler.build()?;
            runtime.spawn(signal_handler.forward_to(stop.clone()));
        }

        Ok(TimeoutEnforcer {
            handle: runtime.handle().clone(),
            runtime: Some(runtime),
            stop,
            worker_count: AtomicUsize::new(0),
        })
    }
}

/// Runs actions under a deadline.
///
/// Created using [`TimeoutEnforcerBuilder::build`]. The enforcer owns a small runtime that drives
/// deadlines and signal handling; the blocking entry points must not be called from within an
/// async context.
#[derive(Debug)]
pub struct TimeoutEnforcer {
    handle: Handle,
    runtime: Option<Runtime>,
    stop: CancellationToken,
    worker_count: AtomicUsize,
}

enum WaitResult<T> {
    Finished(Result<thread::Result<Result<T, BoxError>>, oneshot::error::RecvError>),
    Stopped,
    TimedOut,
}

impl TimeoutEnforcer {
    /// Returns a builder.
    pub fn builder() -> TimeoutEnforcerBuilder {
        TimeoutEnforcerBuilder::default()
    }

    /// The global stop request. Cancelling it aborts separate-thread waits.
    pub fn stop_token(&self) -> &CancellationToken {
        &self.stop
    }

    /// Runs `action` exactly once under `timeout`.
    ///
    /// * Without a timeout, `action` runs on the calling thread without a bound.
    /// * With [`ThreadMode::SameThread`], `action` runs on the calling thread. Its token is
    ///   cancelled at the deadline, but `action` can't be preempted: an overrun is reported once it
    ///   returns.
    /// * With [`ThreadMode::SeparateThread`], `action` runs on a new worker thread. The caller is
    ///   released at the deadline, or as soon as the stop token is cancelled, and the worker's
    ///   token is cancelled. The worker is never joined. A panic on the worker is resumed on the
    ///   calling thread.
    pub fn run_with_timeout<T, F>(
        &self,
        kind: InvocationKind,
        timeout: Option<EffectiveTimeout>,
        action: F,
    ) -> Result<T, InvocationError>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> Result<T, BoxError> + Send + 'static,
    {
        let Some(timeout) = timeout else {
            debug!(%kind, "running without a timeout");
            return action(&CancellationToken::new()).map_err(InvocationError::Action);
        };

        debug!(
            %kind,
            duration = %timeout.duration,
            thread_mode = %timeout.thread_mode,
            "running with a timeout",
        );
        match timeout.thread_mode {
            ThreadMode::SeparateThread => self.run_on_worker(kind, timeout.duration, action),
            ThreadMode::SameThread | ThreadMode::Inferred => {
                self.run_on_caller(kind, timeout.duration, action)
            }
        }
    }

    fn run_on_caller<T, F>(
        &self,
        kind: InvocationKind,
        duration: TimeoutDuration,
        action: F,
    ) -> Result<T, InvocationError>
    where
        F: FnOnce(&CancellationToken) -> Result<T, BoxError>,
    {
        let deadline = duration.to_duration();
        let token = CancellationToken::new();
        let (done_sender, done_receiver) = oneshot::channel::<()>();
        let watchdog_token = token.clone();
        self.handle.spawn(async move {
            tokio::select! {
                () = tokio::time::sleep(deadline) => watchdog_token.cancel(),
                // Also completes if the action panics and the sender is dropped.
                _ = done_receiver => {}
            }
        });

        let stopwatch = stopwatch();
        let result = action(&token);
        let _ = done_sender.send(());
        let elapsed = stopwatch.snapshot().duration;

        if token.is_cancelled() || elapsed > deadline {
            debug!(%kind, ?elapsed, "same-thread invocation overran its deadline");
            return Err(TimeoutError::new(
                kind,
                duration,
                elapsed,
                ThreadMode::SameThread,
                result.err(),
            )
            .into());
        }
        result.map_err(InvocationError::Action)
    }

    fn run_on_worker<T, F>(
        &self,
        kind: InvocationKind,
        duration: TimeoutDuration,
        action: F,
    ) -> Result<T, InvocationError>
    where
        T: Send + 'static,
        F: FnOnce(&CancellationToken) -> Result<T, BoxError> + Send + 'static,
    {
        let token = CancellationToken::new();
        let worker_token = token.clone();
        let (sender, receiver) = oneshot::channel();
        let worker_id = self.worker_count.fetch_add(1, Ordering::Relaxed);

        let stopwatch = stopwatch();
        // The join handle is dropped immediately: workers are never joined.
        thread::Builder::new()
            .name(format!("proctor-timeout-worker-{worker_id}"))
            .spawn(move || {
                let result = catch_unwind(AssertUnwindSafe(|| action(&worker_token)));
                // The caller may have stopped waiting.
                let _ = sender.send(result);
            })
            .map_err(InvocationError::WorkerSpawn)?;

        let deadline = duration.to_duration();
        let stop = self.stop.clone();
        let waited = self.handle.block_on(async move {
            tokio::select! {
                biased;

                result = receiver => WaitResult::Finished(result),
                () = stop.cancelled() => WaitResult::Stopped,
                () = tokio::time::sleep(deadline) => WaitResult::TimedOut,
            }
        });
        let elapsed = stopwatch.snapshot().duration;

        match waited {
            WaitResult::Finished(Ok(Ok(result))) => result.map_err(InvocationError::Action),
            WaitResult::Finished(Ok(Err(payload))) => resume_unwind(payload),
            WaitResult::Finished(Err(_)) => Err(InvocationError::Action(
                "timeout worker exited without reporting a result".into(),
            )),
            WaitResult::Stopped => {
                debug!(%kind, worker_id, "stop requested, abandoning timeout worker");
                token.cancel();
                Err(CancelledError::new(kind).into())
            }
            WaitResult::TimedOut => {
                debug!(%kind, worker_id, ?elapsed, "deadline elapsed, abandoning timeout worker");
                token.cancel();
                Err(TimeoutError::new(
                    kind,
                    duration,
                    elapsed,
                    ThreadMode::SeparateThread,
                    None,
                )
                .into())
            }
        }
    }
}

impl Drop for TimeoutEnforcer {
    fn drop(&mut self) {
        // Abandoned workers and watchdogs must not hold up teardown.
        if let Some(runtime) = self.runtime.take() {
            runtime.shutdown_background();
        }
    }
}
