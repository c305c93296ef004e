// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use super::{CloseableResource, Namespace};
use crate::{
    errors::{BoxError, CleanupError, StoreCloseError, StoreError},
    helpers::panic_message,
    value::{TypeInfo, Value},
};
use debug_ignore::DebugIgnore;
use indexmap::IndexMap;
use smol_str::SmolStr;
use std::{
    any::Any,
    panic::{AssertUnwindSafe, catch_unwind},
    sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError},
};
use tracing::{debug, warn};

type Cleanup = Box<dyn FnOnce() -> Result<(), BoxError> + Send>;

#[derive(Clone, Debug, PartialEq, Eq, Hash)]
struct StoreKey {
    namespace: Namespace,
    key: SmolStr,
}

#[derive(Debug)]
struct StoredValue {
    value: Value,
    cleanup: Mutex<Option<DebugIgnore<Cleanup>>>,
}

impl StoredValue {
    fn new(value: Value, cleanup: Option<Cleanup>) -> Self {
        Self {
            value,
            cleanup: Mutex::new(cleanup.map(DebugIgnore)),
        }
    }

    fn take_cleanup(&self) -> Option<Cleanup> {
        self.cleanup
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .map(|cleanup| cleanup.0)
    }
}

/// A slot for one key. The slot is inserted into the map before its value is computed, so that
/// concurrent callers for the same key wait on the same [`OnceLock`].
#[derive(Debug, Default)]
struct Slot {
    value: OnceLock<StoredValue>,
}

impl Slot {
    fn initialized(value: StoredValue) -> Arc<Self> {
        let slot = Self::default();
        // A fresh OnceLock is always empty.
        let _ = slot.value.set(value);
        Arc::new(slot)
    }
}

#[derive(Debug, Default)]
struct StoreState {
    closed: bool,
    entries: IndexMap<StoreKey, Arc<Slot>>,
}

/// A key-value store attached to one execution scope.
///
/// See the [module documentation](super) for an overview.
#[derive(Debug, Default)]
pub struct ContextStore {
    parent: Option<Arc<ContextStore>>,
    state: Mutex<StoreState>,
}

impl ContextStore {
    /// Creates a store with no parent.
    pub fn new_root() -> Self {
        Self::default()
    }

    /// Creates a store whose lookups fall back to `parent`.
    pub fn new_child(parent: Arc<ContextStore>) -> Self {
        Self {
            parent: Some(parent),
            state: Mutex::default(),
        }
    }

    /// Returns true if [`close`](Self::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.lock().closed
    }

    /// Looks up `key` in this store, then in each ancestor.
    ///
    /// Returns `Ok(None)` if no store in the chain holds the key.
    pub fn get<T: Any + Send + Sync>(
        &self,
        namespace: &Namespace,
        key: &str,
    ) -> Result<Option<Arc<T>>, StoreError> {
        let key = StoreKey {
            namespace: namespace.clone(),
            key: key.into(),
        };
        let value = {
            let state = self.lock();
            if state.closed {
                return Err(closed_error(key));
            }
            self.lookup(&state, &key)
        };
        value.map(|value| downcast(key, &value)).transpose()
    }

    /// Returns the value for `key` from this store or an ancestor, computing and storing it
    /// locally if no store in the chain holds it.
    ///
    /// Concurrent calls for the same key on the same store run `factory` at most once; the other
    /// callers wait for it and observe the same value.
    pub fn get_or_compute<T, F>(
        &self,
        namespace: &Namespace,
        key: &str,
        factory: F,
    ) -> Result<Arc<T>, StoreError>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        self.get_or_compute_with(namespace, key, || {
            let value = Arc::new(factory());
            StoredValue::new(Value::from_arc(value), None)
        })
    }

    /// Like [`get_or_compute`](Self::get_or_compute), but a newly computed value is closed when
    /// this store is closed.
    pub fn get_or_compute_closeable<T, F>(
        &self,
        namespace: &Namespace,
        key: &str,
        factory: F,
    ) -> Result<Arc<T>, StoreError>
    where
        T: CloseableResource + Any,
        F: FnOnce() -> T,
    {
        self.get_or_compute_with(namespace, key, || {
            let value = Arc::new(factory());
            let resource = Arc::clone(&value);
            StoredValue::new(
                Value::from_arc(value),
                Some(Box::new(move || resource.close())),
            )
        })
    }

    /// Stores `value` locally, shadowing any ancestor's value for the same key.
    ///
    /// Returns the value previously stored locally, if any. Its cleanup action is discarded
    /// without being run.
    pub fn put<T: Any + Send + Sync>(
        &self,
        namespace: &Namespace,
        key: &str,
        value: T,
    ) -> Result<Option<Value>, StoreError> {
        self.insert(namespace, key, StoredValue::new(Value::new(value), None))
    }

    /// Like [`put`](Self::put), but `cleanup` is called with the value when this store is
    /// closed.
    pub fn put_with_cleanup<T, F>(
        &self,
        namespace: &Namespace,
        key: &str,
        value: T,
        cleanup: F,
    ) -> Result<Option<Value>, StoreError>
    where
        T: Any + Send + Sync,
        F: FnOnce(&T) -> Result<(), BoxError> + Send + 'static,
    {
        let value = Arc::new(value);
        let for_cleanup = Arc::clone(&value);
        self.insert(
            namespace,
            key,
            StoredValue::new(
                Value::from_arc(value),
                Some(Box::new(move || cleanup(&for_cleanup))),
            ),
        )
    }

    /// Removes `key` from this store and returns its value. Its cleanup action is discarded
    /// without being run.
    ///
    /// Ancestor stores are not affected. If the stored value is not a `T`, nothing is removed.
    pub fn remove<T: Any + Send + Sync>(
        &self,
        namespace: &Namespace,
        key: &str,
    ) -> Result<Option<Arc<T>>, StoreError> {
        let key = StoreKey {
            namespace: namespace.clone(),
            key: key.into(),
        };
        let mut state = self.lock();
        if state.closed {
            return Err(closed_error(key));
        }
        let Some(stored) = state.entries.get(&key).and_then(|slot| slot.value.get()) else {
            return Ok(None);
        };
        let value = downcast(key.clone(), &stored.value)?;
        state.entries.shift_remove(&key);
        Ok(Some(value))
    }

    /// Runs every local cleanup action, most recently inserted first.
    ///
    /// Every cleanup runs even if an earlier one fails or panics; all failures are returned
    /// together. Closing an already closed store does nothing. Ancestor stores are not closed.
    ///
    /// A value still being computed when the store closes is cleaned up by the caller computing
    /// it, which then gets [`StoreError::Closed`].
    pub fn close(&self) -> Result<(), StoreCloseError> {
        let entries = {
            let mut state = self.lock();
            if state.closed {
                return Ok(());
            }
            state.closed = true;
            std::mem::take(&mut state.entries)
        };
        debug!(entries = entries.len(), "closing context store");

        let mut errors = Vec::new();
        for (key, slot) in entries.into_iter().rev() {
            // Slots still being computed are cleaned up by their computing caller.
            let Some(cleanup) = slot.value.get().and_then(StoredValue::take_cleanup) else {
                continue;
            };
            if let Err(error) = run_cleanup(key, cleanup) {
                errors.push(error);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(StoreCloseError::new(errors))
        }
    }

    fn get_or_compute_with<T: Any + Send + Sync>(
        &self,
        namespace: &Namespace,
        key: &str,
        init: impl FnOnce() -> StoredValue,
    ) -> Result<Arc<T>, StoreError> {
        let key = StoreKey {
            namespace: namespace.clone(),
            key: key.into(),
        };
        let slot = {
            let mut state = self.lock();
            if state.closed {
                return Err(closed_error(key));
            }
            match state.entries.get(&key) {
                Some(slot) => Arc::clone(slot),
                None => {
                    if let Some(value) = self.parent_lookup(&key) {
                        return downcast(key, &value);
                    }
                    let slot = Arc::new(Slot::default());
                    state.entries.insert(key.clone(), Arc::clone(&slot));
                    slot
                }
            }
        };

        // The map lock is released here, so computing one key never blocks other keys.
        let stored = slot.value.get_or_init(init);

        // If the store was closed while the value was computed, `close` may have skipped this
        // slot. Whoever takes the cleanup first runs it.
        if self.lock().closed {
            if let Some(cleanup) = stored.take_cleanup() {
                if let Err(error) = run_cleanup(key.clone(), cleanup) {
                    let cause = std::error::Error::source(&error)
                        .map(ToString::to_string)
                        .unwrap_or_default();
                    warn!(
                        %error,
                        %cause,
                        "value computed while the store closed could not be cleaned up",
                    );
                }
            }
            return Err(closed_error(key));
        }
        downcast(key, &stored.value)
    }

    fn insert(
        &self,
        namespace: &Namespace,
        key: &str,
        value: StoredValue,
    ) -> Result<Option<Value>, StoreError> {
        let key = StoreKey {
            namespace: namespace.clone(),
            key: key.into(),
        };
        let mut state = self.lock();
        if state.closed {
            return Err(closed_error(key));
        }
        let previous = state.entries.shift_remove(&key);
        state.entries.insert(key, Slot::initialized(value));
        Ok(previous.and_then(|slot| slot.value.get().map(|stored| stored.value.clone())))
    }

    /// Lock order is always child before parent.
    fn lookup(&self, state: &StoreState, key: &StoreKey) -> Option<Value> {
        match state.entries.get(key).and_then(|slot| slot.value.get()) {
            Some(stored) => Some(stored.value.clone()),
            None => self.parent_lookup(key),
        }
    }

    fn parent_lookup(&self, key: &StoreKey) -> Option<Value> {
        let parent = self.parent.as_deref()?;
        let state = parent.lock();
        parent.lookup(&state, key)
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn run_cleanup(key: StoreKey, cleanup: Cleanup) -> Result<(), CleanupError> {
    let result = match catch_unwind(AssertUnwindSafe(cleanup)) {
        Ok(result) => result,
        Err(payload) => Err(format!(
            "cleanup panicked: {}",
            panic_message(&*payload).unwrap_or("(non-string payload)")
        )
        .into()),
    };
    result.map_err(|error| CleanupError::new(key.namespace, key.key, error))
}

fn closed_error(key: StoreKey) -> StoreError {
    StoreError::Closed {
        namespace: key.namespace,
        key: key.key,
    }
}

fn downcast<T: Any + Send + Sync>(key: StoreKey, value: &Value) -> Result<Arc<T>, StoreError> {
    value.downcast().ok_or_else(|| StoreError::TypeMismatch {
        namespace: key.namespace,
        key: key.key,
        expected: TypeInfo::of::<T>().name(),
        actual: value.type_info().name(),
    })
}
