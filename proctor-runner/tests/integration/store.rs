// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::fixtures::*;
use color_eyre::eyre::{Result, ensure};
use pretty_assertions::assert_eq;
use proctor_runner::{
    config::InvocationKind,
    errors::BoxError,
    executable::{Executable, ParamType},
    extension::{Extension, ParameterResolver},
    resolution::ParameterContext,
    runner::InvocationRequest,
    scope::ExecutionScope,
    store::{CloseableResource, Namespace},
    value::Value,
};
use std::sync::{
    Arc, Mutex,
    atomic::{AtomicUsize, Ordering},
};

/// A shared resource opened on first use and closed with the scope that owns it.
#[derive(Debug)]
struct Connection {
    id: usize,
    closed: Arc<AtomicUsize>,
}

impl CloseableResource for Connection {
    fn close(&self) -> Result<(), BoxError> {
        self.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Supplies a [`Connection`] cached in the root scope's store.
struct ConnectionResolver {
    opened: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl ParameterResolver for ConnectionResolver {
    fn supports_parameter(
        &self,
        pcx: &ParameterContext<'_>,
        _scope: &ExecutionScope,
    ) -> Result<bool, BoxError> {
        Ok(pcx.parameter().ty().is::<Connection>())
    }

    fn resolve_parameter(
        &self,
        _pcx: &ParameterContext<'_>,
        scope: &ExecutionScope,
    ) -> Result<Option<Value>, BoxError> {
        let connection = scope.root_scope().store().get_or_compute_closeable(
            &Namespace::new(["connections"]),
            "primary",
            || Connection {
                id: self.opened.fetch_add(1, Ordering::SeqCst),
                closed: Arc::clone(&self.closed),
            },
        )?;
        Ok(Some(Value::from_arc(connection)))
    }
}

#[test]
fn resolver_state_lives_in_the_root_store() -> Result<()> {
    test_init();

    let opened = Arc::new(AtomicUsize::new(0));
    let closed = Arc::new(AtomicUsize::new(0));
    let mut root = ExecutionScope::root("engine", parameters(&[]));
    root.register(Extension::parameter_resolver(
        "connections",
        ConnectionResolver {
            opened: Arc::clone(&opened),
            closed: Arc::clone(&closed),
        },
    ));
    let root = root.build();

    let executable = Executable::method("Repository", "query")
        .with_parameter("connection", ParamType::reference::<Connection>());
    let invoker = invoker();
    for test in ["first", "second"] {
        let scope = ExecutionScope::child(&root, test).build();
        let report = invoker.invoke(
            &scope,
            InvocationRequest::new(&executable, InvocationKind::Test),
            |arguments, _| {
                let connection = arguments.get::<Connection>(0).ok_or("missing connection")?;
                Ok(connection.id)
            },
        );
        assert_eq!(report.into_result()?, 0, "{test} shares the first connection");
        scope.close()?;
    }

    assert_eq!(opened.load(Ordering::SeqCst), 1);
    assert_eq!(closed.load(Ordering::SeqCst), 0, "closing children leaves the root intact");
    root.close()?;
    root.close()?;
    assert_eq!(closed.load(Ordering::SeqCst), 1, "closed exactly once");
    Ok(())
}

#[test]
fn teardown_runs_deepest_scope_first() -> Result<()> {
    test_init();

    let journal = Arc::new(Mutex::new(Vec::<String>::new()));
    let ns = Namespace::new(["teardown"]);
    let root = ExecutionScope::root("engine", parameters(&[])).build();
    let class = ExecutionScope::child(&root, "class").build();
    let method = ExecutionScope::child(&class, "method").build();

    for (scope, names) in [
        (&root, ["root-1", "root-2"]),
        (&class, ["class-1", "class-2"]),
        (&method, ["method-1", "method-2"]),
    ] {
        for name in names {
            let journal = Arc::clone(&journal);
            scope
                .store()
                .put_with_cleanup(&ns, name, name.to_owned(), move |name: &String| {
                    journal.lock().unwrap().push(name.clone());
                    Ok(())
                })?;
        }
    }

    for scope in [&method, &class, &root] {
        scope.close()?;
    }
    assert_eq!(
        *journal.lock().unwrap(),
        ["method-2", "method-1", "class-2", "class-1", "root-2", "root-1"]
    );

    let error = method.store().get::<String>(&ns, "method-1").unwrap_err();
    ensure!(
        error.to_string().starts_with("store is closed"),
        "unexpected error: {error}"
    );
    Ok(())
}
