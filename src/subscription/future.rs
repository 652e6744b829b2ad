/******************************************************************************
   Author: Joaquín Béjar García
   Email: jb@taunais.com
   Date: 14/10/26
******************************************************************************/

//! Blocking, cancelable handle on the lifetime of one subscription.
//!
//! A future is `Pending` until the manager closes, then `Completed` with success (graceful
//! close), failure (the close reason) or cancellation. Terminal states are absorbing.
//! Independently of that, the first reply envelope resolves the "initial reply" slot, so
//! callers can confirm that the server accepted the subscription.

use std::fmt;
use std::mem;
use std::sync::{Arc, Condvar, Mutex, MutexGuard};
use std::time::Duration;

use tracing::debug;

use crate::connection::{Reply, WebSocketSubscriptionManager};
use crate::utils::{YamcsError, lock};

/// Called once with the terminal outcome of a future.
pub type DoneCallback = Box<dyn FnOnce(&Result<(), YamcsError>) + Send>;

#[derive(Default)]
struct FutureState {
    outcome: Option<Result<(), YamcsError>>,
    cancelled: bool,
    reply: Option<Result<Reply, YamcsError>>,
    done_callbacks: Vec<DoneCallback>,
}

#[derive(Default)]
struct Shared {
    state: Mutex<FutureState>,
    changed: Condvar,
}

impl Shared {
    fn wait_until<F>(
        &self,
        timeout: Option<Duration>,
        ready: F,
    ) -> Result<MutexGuard<'_, FutureState>, YamcsError>
    where
        F: Fn(&FutureState) -> bool,
    {
        let guard = lock(&self.state);
        match timeout {
            None => Ok(self
                .changed
                .wait_while(guard, |s| !ready(s))
                .unwrap_or_else(|poisoned| poisoned.into_inner())),
            Some(timeout) => {
                let (guard, _) = self
                    .changed
                    .wait_timeout_while(guard, timeout, |s| !ready(s))
                    .unwrap_or_else(|poisoned| poisoned.into_inner());
                if ready(&guard) {
                    Ok(guard)
                } else {
                    Err(YamcsError::Timeout)
                }
            }
        }
    }

    fn set_reply(&self, reply: &Result<Reply, YamcsError>) {
        let mut state = lock(&self.state);
        if state.reply.is_none() {
            state.reply = Some(reply.clone());
            self.changed.notify_all();
        }
    }

    /// Moves to a terminal state. Returns `false` without changing anything if the
    /// future is already terminal and `strict` is off.
    fn complete(&self, outcome: Result<(), YamcsError>, cancelled: bool, strict: bool) -> bool {
        let callbacks = {
            let mut state = lock(&self.state);
            if state.outcome.is_some() {
                drop(state);
                assert!(!strict, "subscription future is already completed");
                return false;
            }
            state.outcome = Some(outcome.clone());
            state.cancelled = cancelled;
            self.changed.notify_all();
            mem::take(&mut state.done_callbacks)
        };
        for callback in callbacks {
            callback(&outcome);
        }
        true
    }
}

/// Handle to await, inspect or cancel a subscription.
///
/// Cloning yields another handle to the same future.
#[derive(Clone)]
pub struct SubscriptionFuture {
    shared: Arc<Shared>,
    manager: WebSocketSubscriptionManager,
}

impl fmt::Debug for SubscriptionFuture {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = lock(&self.shared.state);
        f.debug_struct("SubscriptionFuture")
            .field("topic", &self.manager.topic())
            .field("done", &state.outcome.is_some())
            .field("cancelled", &state.cancelled)
            .field("replied", &state.reply.is_some())
            .finish()
    }
}

impl SubscriptionFuture {
    /// Creates a future tracking `manager`. Call before opening the manager so that
    /// no reply or close can be missed.
    pub fn new(manager: WebSocketSubscriptionManager) -> Self {
        let shared = Arc::new(Shared::default());

        let on_reply = Arc::clone(&shared);
        manager.add_response_callback(Arc::new(move |reply| on_reply.set_reply(reply)));

        let on_close = Arc::clone(&shared);
        manager.add_close_callback(Box::new(move |reason| {
            let outcome = match reason {
                Some(err) => Err(err),
                None => Ok(()),
            };
            if !on_close.complete(outcome, false, false) {
                debug!("Subscription future already completed before close");
            }
        }));

        Self { shared, manager }
    }

    /// The manager behind this future.
    pub fn manager(&self) -> &WebSocketSubscriptionManager {
        &self.manager
    }

    /// Waits for the first reply and returns it, or the error the server reported.
    ///
    /// # Errors
    ///
    /// Returns the server's error for a rejected subscription, [`YamcsError::Timeout`]
    /// when `timeout` elapses first, or the close reason if the connection ended before
    /// any reply arrived.
    pub fn reply(&self, timeout: Option<Duration>) -> Result<Reply, YamcsError> {
        let state = self
            .shared
            .wait_until(timeout, |s| s.reply.is_some() || s.outcome.is_some())?;
        if let Some(reply) = &state.reply {
            return reply.clone();
        }
        match &state.outcome {
            Some(Err(err)) => Err(err.clone()),
            _ => Err(YamcsError::ConnectionFailure(
                "Connection closed before the subscription was confirmed".to_string(),
            )),
        }
    }

    /// Waits until the subscription ends.
    ///
    /// # Errors
    ///
    /// Returns the failure the subscription ended with, [`YamcsError::Cancelled`] after
    /// [`cancel`](Self::cancel), or [`YamcsError::Timeout`]. A timeout leaves the
    /// subscription running.
    pub fn result(&self, timeout: Option<Duration>) -> Result<(), YamcsError> {
        let state = self.shared.wait_until(timeout, |s| s.outcome.is_some())?;
        match &state.outcome {
            Some(outcome) => outcome.clone(),
            None => Err(YamcsError::Timeout),
        }
    }

    /// Waits until the subscription ends and returns its failure, if any.
    ///
    /// # Errors
    ///
    /// Returns [`YamcsError::Cancelled`] for a cancelled subscription and
    /// [`YamcsError::Timeout`] when `timeout` elapses first.
    pub fn exception(&self, timeout: Option<Duration>) -> Result<Option<YamcsError>, YamcsError> {
        match self.result(timeout) {
            Ok(()) => Ok(None),
            Err(YamcsError::Cancelled) => Err(YamcsError::Cancelled),
            Err(YamcsError::Timeout) if !self.done() => Err(YamcsError::Timeout),
            Err(err) => Ok(Some(err)),
        }
    }

    /// Cancels the subscription and closes its connection.
    ///
    /// Returns `false` if the future had already completed; the manager is closed
    /// either way. When this returns no further data callback will start.
    pub fn cancel(&self) -> bool {
        let cancelled = self.shared.complete(Err(YamcsError::Cancelled), true, false);
        self.manager.close(None);
        cancelled
    }

    /// Whether the subscription was cancelled.
    pub fn cancelled(&self) -> bool {
        lock(&self.shared.state).cancelled
    }

    /// Whether the subscription ended, in any way.
    pub fn done(&self) -> bool {
        lock(&self.shared.state).outcome.is_some()
    }

    /// Whether the subscription is still running.
    pub fn running(&self) -> bool {
        !self.done()
    }

    /// Runs `callback` with the outcome once the future completes: immediately, on this
    /// thread, if it already has; otherwise on the thread that completes it, in
    /// registration order.
    pub fn add_done_callback(&self, callback: DoneCallback) {
        let mut state = lock(&self.shared.state);
        match state.outcome.clone() {
            Some(outcome) => {
                drop(state);
                callback(&outcome);
            }
            None => state.done_callbacks.push(callback),
        }
    }

    /// Completes the future successfully.
    ///
    /// # Panics
    ///
    /// Panics if the future is already completed.
    pub(crate) fn set_result(&self) {
        self.shared.complete(Ok(()), false, true);
    }

    /// Completes the future with a failure.
    ///
    /// # Panics
    ///
    /// Panics if the future is already completed.
    pub(crate) fn set_exception(&self, err: YamcsError) {
        self.shared.complete(Err(err), false, true);
    }
}
