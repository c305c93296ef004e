// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use camino_tempfile::Utf8TempDir;
use color_eyre::eyre::{Result, ensure};
use indoc::indoc;
use maplit::btreemap;
use pretty_assertions::assert_eq;
use proctor_runner::{
    config::{
        InvocationKind, LayeredConfigurationParameters, ThreadMode, TimeUnit, TimeoutDuration,
        properties,
    },
    executable::Executable,
    reporter::{InvocationOutcome, OutcomeKind},
    runner::InvocationRequest,
    scope::ExecutionScope,
};
use std::{
    sync::Arc,
    thread,
    time::{Duration, Instant},
};

const WORKSPACE_CONFIG: &str = indoc! {r#"
    [proctor.execution.timeout]
    default = "1h"

    [proctor.execution.timeout.lifecycle.method]
    default = "2m"

    [proctor.execution.timeout.test.method]
    default = "100ms"

    [proctor.execution.timeout.thread.mode]
    default = "separate_thread"
"#};

fn workspace() -> Result<Utf8TempDir> {
    let dir = Utf8TempDir::new()?;
    fs_err::create_dir_all(dir.path().join(".config"))?;
    fs_err::write(
        dir.path().join(LayeredConfigurationParameters::CONFIG_PATH),
        WORKSPACE_CONFIG,
    )?;
    Ok(dir)
}

#[test]
fn workspace_config_drives_timeouts() -> Result<()> {
    test_init();

    let workspace = workspace()?;
    let parameters = LayeredConfigurationParameters::builder()
        .set_workspace_root(workspace.path())
        .build()?;
    let root = ExecutionScope::root("engine", Arc::new(parameters)).build();
    let configuration = root.timeout_configuration()?;

    assert_eq!(
        configuration.timeout_for(InvocationKind::Test),
        TimeoutDuration::new(100, TimeUnit::Milliseconds),
        "the kind-specific property wins"
    );
    assert_eq!(
        configuration.timeout_for(InvocationKind::BeforeEach),
        TimeoutDuration::new(2, TimeUnit::Minutes),
        "the category default applies to lifecycle kinds"
    );
    assert_eq!(
        configuration.timeout_for(InvocationKind::TestFactory),
        TimeoutDuration::new(1, TimeUnit::Hours),
        "the global default applies last"
    );
    assert_eq!(configuration.default_thread_mode(), Some(ThreadMode::SeparateThread));

    let executable = Executable::method("Slow", "test");
    let start = Instant::now();
    let report = invoker().invoke(
        &root,
        InvocationRequest::new(&executable, InvocationKind::Test),
        |_, _| {
            thread::sleep(Duration::from_secs(3));
            Ok(())
        },
    );
    ensure!(start.elapsed() < Duration::from_secs(2), "the caller was released early");
    let InvocationOutcome::TimedOut(error) = report.outcome else {
        panic!("expected a timeout, found {:?}", report.outcome);
    };
    assert_eq!(
        error.to_string(),
        "test invocation timed out after 100 milliseconds"
    );
    Ok(())
}

#[test]
fn environment_and_overrides_take_precedence() -> Result<()> {
    test_init();

    let workspace = workspace()?;
    let parameters = LayeredConfigurationParameters::builder()
        .set_workspace_root(workspace.path())
        .set_environment_map(btreemap! {
            "PROCTOR_EXECUTION_TIMEOUT_TEST_METHOD_DEFAULT" => "5s",
        })
        .set_override(properties::TIMEOUT_MODE, "disabled")
        .build()?;
    let root = ExecutionScope::root("engine", Arc::new(parameters)).build();
    let configuration = root.timeout_configuration()?;

    assert_eq!(
        configuration.timeout_for(InvocationKind::Test),
        TimeoutDuration::new(5, TimeUnit::Seconds)
    );
    ensure!(configuration.is_timeout_disabled(), "the override disables timeouts");

    let executable = Executable::method("Slow", "test");
    let report = invoker().invoke(
        &root,
        InvocationRequest::new(&executable, InvocationKind::Test),
        |_, token| Ok(token.is_cancelled()),
    );
    assert_eq!(report.outcome.kind(), OutcomeKind::Success);
    Ok(())
}

#[test]
fn malformed_values_degrade_to_unconfigured() -> Result<()> {
    test_init();

    let root = ExecutionScope::root(
        "engine",
        parameters(&[
            (properties::DEFAULT_TEST_METHOD_TIMEOUT, "soon"),
            (properties::DEFAULT_TESTABLE_METHOD_TIMEOUT, "250ms"),
            (properties::DEFAULT_TIMEOUT_THREAD_MODE, "sideways"),
        ]),
    )
    .build();
    let configuration = root.timeout_configuration()?;

    assert_eq!(
        configuration.timeout_for(InvocationKind::Test),
        TimeoutDuration::new(250, TimeUnit::Milliseconds),
        "an unparseable property falls through to the next in the chain"
    );
    assert_eq!(configuration.default_thread_mode(), None);
    Ok(())
}
