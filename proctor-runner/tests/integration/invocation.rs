// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use proctor_runner::{
    config::{DeclaredTimeout, InvocationKind, ThreadMode, TimeUnit, TimeoutDuration, properties},
    errors::BoxError,
    executable::{Executable, ParamType},
    reporter::{InvocationOutcome, OutcomeKind},
    runner::{CancellationToken, InvocationRequest, Invoker, TimeoutEnforcer},
    scope::ExecutionScope,
    signal::SignalHandlerKind,
};
use std::{
    sync::mpsc,
    thread,
    time::{Duration, Instant},
};
use test_case::test_case;

fn wait_for_interrupt(token: &CancellationToken) -> Result<bool, BoxError> {
    Ok(token.wait_timeout(Duration::from_secs(30)))
}

#[test_case(ThreadMode::SameThread ; "same thread")]
#[test_case(ThreadMode::SeparateThread ; "separate thread")]
fn cooperative_invocations_observe_the_deadline(thread_mode: ThreadMode) {
    test_init();

    let root = ExecutionScope::root("engine", parameters(&[])).build();
    let executable = Executable::method("Cooperative", "waits");
    let duration = TimeoutDuration::new(50, TimeUnit::Milliseconds).expect("non-zero");
    let declared = DeclaredTimeout::new(duration).with_thread_mode(thread_mode);

    let start = Instant::now();
    let report = invoker().invoke(
        &root,
        InvocationRequest::new(&executable, InvocationKind::Test).with_declared_timeout(declared),
        |_, token| wait_for_interrupt(token),
    );
    assert!(start.elapsed() < Duration::from_secs(10), "the invocation was interrupted");

    let InvocationOutcome::TimedOut(error) = report.outcome else {
        panic!("expected a timeout, found {:?}", report.outcome);
    };
    assert_eq!(error.thread_mode(), thread_mode);
    assert_eq!(error.duration().to_duration(), Duration::from_millis(50));
}

#[test]
fn global_stop_cancels_a_separate_thread_wait() -> Result<()> {
    test_init();

    let stop = CancellationToken::new();
    let mut builder = TimeoutEnforcer::builder();
    builder.set_stop_token(stop.clone());
    let invoker = Invoker::new(builder.build(SignalHandlerKind::Noop)?);

    let root = ExecutionScope::root(
        "engine",
        parameters(&[
            (properties::DEFAULT_TIMEOUT, "1m"),
            (properties::DEFAULT_TIMEOUT_THREAD_MODE, "separate_thread"),
        ]),
    )
    .build();
    let executable = Executable::method("Cooperative", "waits");

    let (started_sender, started_receiver) = mpsc::channel();
    let stopper = thread::spawn(move || {
        // Stop once the worker is running.
        if started_receiver.recv_timeout(Duration::from_secs(10)).is_ok() {
            stop.cancel();
        }
    });
    let report = invoker.invoke(
        &root,
        InvocationRequest::new(&executable, InvocationKind::AfterEach),
        move |_, token| {
            let _ = started_sender.send(());
            wait_for_interrupt(token)
        },
    );
    stopper.join().expect("stopper thread doesn't panic");

    assert_eq!(report.outcome.kind(), OutcomeKind::Cancelled);

    // Later invocations are refused outright.
    let report = invoker.invoke(
        &root,
        InvocationRequest::new(&executable, InvocationKind::AfterAll),
        |_, _| Ok(()),
    );
    assert_eq!(report.outcome.kind(), OutcomeKind::Cancelled);
    Ok(())
}

#[test]
fn reports_record_timing() -> Result<()> {
    test_init();

    let mut root = ExecutionScope::root("engine", parameters(&[]));
    root.register(supplying("numbers", 21_i32));
    let root = root.build();
    let executable =
        Executable::method("Math", "double").with_parameter("n", ParamType::primitive::<i32>());

    let report = invoker().invoke(
        &root,
        InvocationRequest::new(&executable, InvocationKind::TestTemplate),
        |arguments, _| {
            thread::sleep(Duration::from_millis(20));
            Ok(*arguments.get::<i32>(0).ok_or("missing n")? * 2)
        },
    );
    ensure!(report.duration >= Duration::from_millis(20), "duration: {:?}", report.duration);
    let display = report.to_string();
    ensure!(
        display.starts_with("test-template [Math::double(n: i32)] succeeded in "),
        "unexpected display: {display}"
    );
    assert_eq!(report.into_result()?, 42);
    Ok(())
}
