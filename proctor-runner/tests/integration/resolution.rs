// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use proctor_runner::{
    config::InvocationKind,
    errors::{BoxError, InvocationError, ParameterResolutionError, ResolutionErrorKind},
    executable::{Executable, ExecutableKind, ParamType},
    extension::Extension,
    reporter::{InvocationOutcome, OutcomeKind},
    resolution::resolve_arguments,
    runner::InvocationRequest,
    scope::ExecutionScope,
    value::Value,
};
use std::sync::atomic::Ordering;

fn format_pair() -> Executable {
    Executable::method("Formatter", "format")
        .with_parameter("a", ParamType::reference::<String>())
        .with_parameter("b", ParamType::primitive::<i32>())
}

#[test]
fn arguments_are_supplied_in_declaration_order() -> Result<()> {
    test_init();

    let mut root = ExecutionScope::root("engine", parameters(&[]));
    root.register(supplying("strings", "x".to_owned()));
    let root = root.build();
    let mut method = ExecutionScope::child(&root, "method:format");
    method.register(supplying("numbers", 7_i32));
    let method = method.build();

    let executable = format_pair();
    let arguments = resolve_arguments(&executable, None, None, &method)?;
    assert_eq!(arguments.len(), 2);
    assert_eq!(arguments.get::<String>(0).as_deref(), Some(&"x".to_owned()));
    assert_eq!(arguments.get::<i32>(1).as_deref(), Some(&7));

    // The same resolution runs when the executable is invoked.
    let report = invoker().invoke(
        &method,
        InvocationRequest::new(&executable, InvocationKind::Test),
        |arguments, _| {
            let a = arguments.get::<String>(0).ok_or("missing a")?;
            let b = arguments.get::<i32>(1).ok_or("missing b")?;
            Ok(format!("{a}{b}"))
        },
    );
    assert_eq!(report.into_result()?, "x7");
    Ok(())
}

#[test]
fn missing_resolver_names_the_parameter() -> Result<()> {
    test_init();

    let mut root = ExecutionScope::root("engine", parameters(&[]));
    root.register(supplying("strings", "x".to_owned()));
    let root = root.build();

    let executable = format_pair();
    let report = invoker().invoke(
        &root,
        InvocationRequest::new(&executable, InvocationKind::Test),
        |_, _| Ok(()),
    );
    assert_eq!(
        report.outcome.kind(),
        OutcomeKind::ResolutionFailed(ResolutionErrorKind::NoResolver)
    );

    let InvocationOutcome::ResolutionFailed(error) = report.outcome else {
        unreachable!("checked above");
    };
    assert_eq!(error.target().name(), "b");
    assert_eq!(error.target().parameter(), "b: i32");
    assert_eq!(error.target().index(), 1);
    assert_eq!(error.target().executable_kind(), ExecutableKind::Method);
    let message = error.to_string();
    ensure!(
        message.starts_with(
            "no parameter resolver registered for parameter [b: i32] at index 1 in method \
             [Formatter::format("
        ),
        "unexpected message: {message}"
    );
    Ok(())
}

#[test]
fn sibling_resolvers_are_invisible() -> Result<()> {
    test_init();

    let root = ExecutionScope::root("engine", parameters(&[])).build();
    let mut left = ExecutionScope::child(&root, "left");
    left.register(supplying("numbers", 1_i32));
    let _left = left.build();
    let right = ExecutionScope::child(&root, "right").build();

    let executable =
        Executable::method("T", "f").with_parameter("n", ParamType::primitive::<i32>());
    let error = resolve_arguments(&executable, None, None, &right).unwrap_err();
    assert_eq!(error.kind(), ResolutionErrorKind::NoResolver);
    Ok(())
}

#[test]
fn competing_resolvers_are_ambiguous() -> Result<()> {
    test_init();

    let mut root = ExecutionScope::root("engine", parameters(&[]));
    root.register(supplying("outer-numbers", 1_i32));
    let root = root.build();
    let mut child = ExecutionScope::child(&root, "child");
    child.register(supplying("inner-numbers", 2_i32));
    let child = child.build();

    let executable =
        Executable::method("T", "f").with_parameter("n", ParamType::primitive::<i32>());
    let error = resolve_arguments(&executable, None, None, &child).unwrap_err();
    let ParameterResolutionError::AmbiguousResolvers { resolvers, .. } = &error else {
        panic!("expected ambiguity, found {error:?}");
    };
    ensure!(resolvers.len() == 2, "both resolvers are listed: {resolvers:?}");
    ensure!(
        resolvers[0].starts_with("outer-numbers#") && resolvers[1].starts_with("inner-numbers#"),
        "outermost resolver comes first: {resolvers:?}"
    );
    Ok(())
}

#[test]
fn inner_constructor_receives_its_outer_instance() -> Result<()> {
    test_init();

    struct Outer;

    let resolver = TypedResolver::new(3_i32);
    let resolutions = resolver.counter();
    let mut root = ExecutionScope::root("engine", parameters(&[]));
    root.register(Extension::parameter_resolver("numbers", resolver));
    let root = root.build();

    let executable = Executable::constructor("Outer::Inner")
        .with_parameter("this", ParamType::reference::<Outer>())
        .with_parameter("n", ParamType::primitive::<i32>());
    let outer = Value::new(Outer);
    let arguments = resolve_arguments(&executable, None, Some(outer.clone()), &root)?;

    let first = arguments.value(0).expect("outer instance is present");
    ensure!(first.ptr_eq(&outer), "the outer instance is passed through unchanged");
    assert_eq!(arguments.get::<i32>(1).as_deref(), Some(&3));
    assert_eq!(resolutions.load(Ordering::SeqCst), 1, "only `n` was resolved");
    Ok(())
}

#[test]
fn resolution_errors_never_reach_the_body() -> Result<()> {
    test_init();

    let root = ExecutionScope::root("engine", parameters(&[])).build();
    let executable =
        Executable::method("T", "f").with_parameter("flag", ParamType::primitive::<bool>());
    let result = invoker()
        .invoke(
            &root,
            InvocationRequest::new(&executable, InvocationKind::BeforeAll),
            |_, _| -> Result<(), BoxError> {
                panic!("the body must not run")
            },
        )
        .into_result();
    ensure!(
        matches!(result, Err(InvocationError::Resolution(_))),
        "unexpected result: {result:?}"
    );
    Ok(())
}
