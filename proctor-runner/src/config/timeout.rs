// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{
    ConfigurationParameters, InvocationKind, ThreadMode, TimeoutDuration, TimeoutMode, properties,
};
use crate::helpers;
use std::{
    collections::HashMap,
    sync::{Arc, Mutex, OnceLock, PoisonError},
};
use tracing::{debug, warn};

/// A timeout declared directly on an executable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DeclaredTimeout {
    /// The deadline.
    pub duration: TimeoutDuration,

    /// Where to run the invocation. [`ThreadMode::Inferred`] uses the configured default.
    pub thread_mode: ThreadMode,
}

impl DeclaredTimeout {
    /// Declares a timeout whose thread mode is inferred from configuration.
    pub fn new(duration: TimeoutDuration) -> Self {
        Self {
            duration,
            thread_mode: ThreadMode::Inferred,
        }
    }

    /// Sets the thread mode.
    pub fn with_thread_mode(mut self, thread_mode: ThreadMode) -> Self {
        self.thread_mode = thread_mode;
        self
    }
}

/// The deadline and thread mode an invocation actually runs under.
///
/// `thread_mode` is never [`ThreadMode::Inferred`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EffectiveTimeout {
    /// The deadline.
    pub duration: TimeoutDuration,

    /// Where the invocation runs.
    pub thread_mode: ThreadMode,
}

/// Timeout settings read from [`ConfigurationParameters`].
///
/// The timeout mode is read when the configuration is created. Every other property is parsed the
/// first time it is needed and cached for the lifetime of this object, so later changes to the
/// underlying parameters are not observed.
#[derive(Debug)]
pub struct TimeoutConfiguration {
    parameters: Arc<dyn ConfigurationParameters>,
    timeout_disabled: bool,
    durations: Mutex<HashMap<&'static str, Option<TimeoutDuration>>>,
    thread_mode: OnceLock<Option<ThreadMode>>,
}

impl TimeoutConfiguration {
    /// Reads timeout settings from `parameters`.
    pub fn new(parameters: Arc<dyn ConfigurationParameters>) -> Self {
        Self::with_debugger_probe(parameters, helpers::debugger_attached)
    }

    /// Reads timeout settings from `parameters`, using `debugger_attached` to decide whether
    /// `disabled_on_debug` disables timeouts.
    pub fn with_debugger_probe(
        parameters: Arc<dyn ConfigurationParameters>,
        debugger_attached: impl FnOnce() -> bool,
    ) -> Self {
        let mode = match parameters.get(properties::TIMEOUT_MODE) {
            Some(value) => match value.parse::<TimeoutMode>() {
                Ok(mode) => mode,
                Err(error) => {
                    warn!(
                        property = properties::TIMEOUT_MODE,
                        "ignoring invalid timeout mode: {error}"
                    );
                    TimeoutMode::Enabled
                }
            },
            None => TimeoutMode::Enabled,
        };
        let timeout_disabled = mode.is_timeout_disabled(debugger_attached);
        debug!(?mode, timeout_disabled, "read timeout mode");

        Self {
            parameters,
            timeout_disabled,
            durations: Mutex::new(HashMap::new()),
            thread_mode: OnceLock::new(),
        }
    }

    /// Returns true if timeouts are not applied at all.
    pub fn is_timeout_disabled(&self) -> bool {
        self.timeout_disabled
    }

    /// The configured timeout for `kind`, following the fallback chain from the kind-specific
    /// property through the category default to the global default.
    pub fn timeout_for(&self, kind: InvocationKind) -> Option<TimeoutDuration> {
        kind.property_chain()
            .into_iter()
            .find_map(|property| self.duration_property(property))
    }

    /// The thread mode used by invocations that don't declare one.
    pub fn default_thread_mode(&self) -> Option<ThreadMode> {
        *self.thread_mode.get_or_init(|| {
            let value = self.parameters.get(properties::DEFAULT_TIMEOUT_THREAD_MODE)?;
            match value.parse::<ThreadMode>() {
                Ok(ThreadMode::Inferred) => {
                    warn!(
                        property = properties::DEFAULT_TIMEOUT_THREAD_MODE,
                        "`inferred` is not a valid default thread mode, ignoring it"
                    );
                    None
                }
                Ok(mode) => Some(mode),
                Err(error) => {
                    warn!(
                        property = properties::DEFAULT_TIMEOUT_THREAD_MODE,
                        "ignoring invalid thread mode: {error}"
                    );
                    None
                }
            }
        })
    }

    /// Combines a timeout declared on the executable, if any, with the configured defaults.
    ///
    /// Returns `None` if the invocation is unbounded. Callers are expected to check
    /// [`is_timeout_disabled`](Self::is_timeout_disabled) first.
    pub fn resolve(
        &self,
        kind: InvocationKind,
        declared: Option<DeclaredTimeout>,
    ) -> Option<EffectiveTimeout> {
        let (duration, declared_mode) = match declared {
            Some(declared) => (declared.duration, declared.thread_mode),
            None => (self.timeout_for(kind)?, ThreadMode::Inferred),
        };
        let thread_mode = match declared_mode {
            ThreadMode::Inferred => self.default_thread_mode().unwrap_or(ThreadMode::SameThread),
            mode => mode,
        };
        Some(EffectiveTimeout {
            duration,
            thread_mode,
        })
    }

    fn duration_property(&self, property: &'static str) -> Option<TimeoutDuration> {
        // The lock is held while parsing so each property is parsed and warned about once.
        let mut durations = self
            .durations
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        *durations.entry(property).or_insert_with(|| {
            let value = self.parameters.get(property)?;
            match value.parse::<TimeoutDuration>() {
                Ok(duration) => Some(duration),
                Err(error) => {
                    warn!(property, "ignoring invalid timeout: {error}");
                    None
                }
            }
        })
    }
}
