// Copyright (c) The nextest Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use std::{
    sync::{Arc, Condvar, Mutex, PoisonError},
    time::Duration,
};
use tokio::sync::watch;

/// A cooperative cancellation signal.
///
/// Clones share state: cancelling one clone cancels all of them. Cancellation is permanent.
///
/// Invoked actions receive a token and are expected to check it, or block on it, at convenient
/// points. Nothing forces an action to stop.
#[derive(Clone, Debug)]
pub struct CancellationToken {
    inner: Arc<Inner>,
}

#[derive(Debug)]
struct Inner {
    cancelled: Mutex<bool>,
    condvar: Condvar,
    // Wakes async waiters; the condvar wakes blocking ones.
    sender: watch::Sender<bool>,
}

impl CancellationToken {
    /// Creates a token that is not cancelled.
    pub fn new() -> Self {
        let (sender, _) = watch::channel(false);
        Self {
            inner: Arc::new(Inner {
                cancelled: Mutex::new(false),
                condvar: Condvar::new(),
                sender,
            }),
        }
    }

    /// Cancels the token, waking everything waiting on it.
    pub fn cancel(&self) {
        {
            let mut cancelled = self.lock();
            if *cancelled {
                return;
            }
            *cancelled = true;
        }
        self.inner.condvar.notify_all();
        self.inner.sender.send_replace(true);
    }

    /// Returns true if the token has been cancelled.
    pub fn is_cancelled(&self) -> bool {
        *self.lock()
    }

    /// Blocks the current thread until the token is cancelled or `timeout` elapses.
    ///
    /// Returns true if the token was cancelled.
    pub fn wait_timeout(&self, timeout: Duration) -> bool {
        let guard = self.lock();
        let (cancelled, _) = self
            .inner
            .condvar
            .wait_timeout_while(guard, timeout, |cancelled| !*cancelled)
            .unwrap_or_else(PoisonError::into_inner);
        *cancelled
    }

    /// Completes once the token is cancelled.
    pub async fn cancelled(&self) {
        let mut receiver = self.inner.sender.subscribe();
        // The sender lives as long as `self`, so this can't fail.
        let _ = receiver.wait_for(|cancelled| *cancelled).await;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, bool> {
        self.inner
            .cancelled
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for CancellationToken {
    fn default() -> Self {
        Self::new()
    }
}
