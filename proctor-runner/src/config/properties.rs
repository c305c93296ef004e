// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Names of the configuration properties read by proctor.

/// Whether timeouts are applied: `enabled`, `disabled` or `disabled_on_debug`.
pub const TIMEOUT_MODE: &str = "proctor.execution.timeout.mode";

/// The thread mode used when an invocation doesn't declare one: `same_thread` or
/// `separate_thread`.
pub const DEFAULT_TIMEOUT_THREAD_MODE: &str = "proctor.execution.timeout.thread.mode.default";

/// The timeout for every invocation kind that isn't configured more specifically.
pub const DEFAULT_TIMEOUT: &str = "proctor.execution.timeout.default";

/// The default timeout for test, test template and test factory invocations.
pub const DEFAULT_TESTABLE_METHOD_TIMEOUT: &str =
    "proctor.execution.timeout.testable.method.default";

/// The default timeout for test invocations.
pub const DEFAULT_TEST_METHOD_TIMEOUT: &str = "proctor.execution.timeout.test.method.default";

/// The default timeout for test template invocations.
pub const DEFAULT_TEST_TEMPLATE_METHOD_TIMEOUT: &str =
    "proctor.execution.timeout.testtemplate.method.default";

/// The default timeout for test factory invocations.
pub const DEFAULT_TEST_FACTORY_METHOD_TIMEOUT: &str =
    "proctor.execution.timeout.testfactory.method.default";

/// The default timeout for every lifecycle invocation.
pub const DEFAULT_LIFECYCLE_METHOD_TIMEOUT: &str =
    "proctor.execution.timeout.lifecycle.method.default";

/// The default timeout for before-all invocations.
pub const DEFAULT_BEFORE_ALL_METHOD_TIMEOUT: &str =
    "proctor.execution.timeout.beforeall.method.default";

/// The default timeout for before-each invocations.
pub const DEFAULT_BEFORE_EACH_METHOD_TIMEOUT: &str =
    "proctor.execution.timeout.beforeeach.method.default";

/// The default timeout for after-each invocations.
pub const DEFAULT_AFTER_EACH_METHOD_TIMEOUT: &str =
    "proctor.execution.timeout.aftereach.method.default";

/// The default timeout for after-all invocations.
pub const DEFAULT_AFTER_ALL_METHOD_TIMEOUT: &str =
    "proctor.execution.timeout.afterall.method.default";
