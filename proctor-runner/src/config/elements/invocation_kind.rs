// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::config::properties;
use std::fmt;

/// The category of call site being invoked, used to select timeout configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum InvocationKind {
    /// Runs once before all tests of a unit.
    BeforeAll,
    /// Runs before each test.
    BeforeEach,
    /// A test body.
    Test,
    /// A test template body, invoked once per generated invocation.
    TestTemplate,
    /// A test factory, which produces dynamic tests.
    TestFactory,
    /// Runs after each test.
    AfterEach,
    /// Runs once after all tests of a unit.
    AfterAll,
}

/// Groups of invocation kinds that share a default timeout.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum InvocationCategory {
    /// Before and after callbacks.
    Lifecycle,
    /// Tests, test templates and test factories.
    Testable,
}

impl InvocationCategory {
    /// The property holding the default timeout for this category.
    pub fn property_name(self) -> &'static str {
        match self {
            Self::Lifecycle => properties::DEFAULT_LIFECYCLE_METHOD_TIMEOUT,
            Self::Testable => properties::DEFAULT_TESTABLE_METHOD_TIMEOUT,
        }
    }
}

impl InvocationKind {
    /// Every invocation kind, in execution order.
    pub const ALL: [Self; 7] = [
        Self::BeforeAll,
        Self::BeforeEach,
        Self::Test,
        Self::TestTemplate,
        Self::TestFactory,
        Self::AfterEach,
        Self::AfterAll,
    ];

    /// The category this kind belongs to.
    pub fn category(self) -> InvocationCategory {
        match self {
            Self::Test | Self::TestTemplate | Self::TestFactory => InvocationCategory::Testable,
            Self::BeforeAll | Self::BeforeEach | Self::AfterEach | Self::AfterAll => {
                InvocationCategory::Lifecycle
            }
        }
    }

    /// The property holding the timeout specific to this kind.
    pub fn property_name(self) -> &'static str {
        match self {
            Self::BeforeAll => properties::DEFAULT_BEFORE_ALL_METHOD_TIMEOUT,
            Self::BeforeEach => properties::DEFAULT_BEFORE_EACH_METHOD_TIMEOUT,
            Self::Test => properties::DEFAULT_TEST_METHOD_TIMEOUT,
            Self::TestTemplate => properties::DEFAULT_TEST_TEMPLATE_METHOD_TIMEOUT,
            Self::TestFactory => properties::DEFAULT_TEST_FACTORY_METHOD_TIMEOUT,
            Self::AfterEach => properties::DEFAULT_AFTER_EACH_METHOD_TIMEOUT,
            Self::AfterAll => properties::DEFAULT_AFTER_ALL_METHOD_TIMEOUT,
        }
    }

    /// The properties consulted for this kind's timeout, most specific first.
    pub fn property_chain(self) -> [&'static str; 3] {
        [
            self.property_name(),
            self.category().property_name(),
            properties::DEFAULT_TIMEOUT,
        ]
    }

    /// A short name for diagnostics.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::BeforeAll => "before-all",
            Self::BeforeEach => "before-each",
            Self::Test => "test",
            Self::TestTemplate => "test-template",
            Self::TestFactory => "test-factory",
            Self::AfterEach => "after-each",
            Self::AfterAll => "after-all",
        }
    }
}

impl fmt::Display for InvocationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
