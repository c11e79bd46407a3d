//! Running work on a background thread and settling a promise with its result.

use std::{
    panic::{self, AssertUnwindSafe},
    thread,
};

use crate::{Future, Promise};

/// Cooperative cancellation handle given to tasks started with
/// [`start_cancellable`].
pub struct Canceller<T, E> {
    promise: Promise<T, E>,
}

impl<T, E> Canceller<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Whether a consumer asked for the task to stop.
    pub fn is_cancel_requested(&self) -> bool {
        self.promise.future().is_cancel_requested()
    }

    /// Honors a cancellation request by settling the future as cancelled.
    pub fn cancel(&self) -> bool {
        self.promise.cancel()
    }
}

/// Runs `task` on a new thread and returns a future for its result.
pub fn start<T, E, F>(task: F) -> Future<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce() -> Result<T, E> + Send + 'static,
{
    start_cancellable(move |_| task())
}

/// Like [`start`], but hands the task a [`Canceller`] to poll.
///
/// If the task already cancelled through the canceller, its return value is
/// ignored. A panicking task settles the future as cancelled.
pub fn start_cancellable<T, E, F>(task: F) -> Future<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    F: FnOnce(Canceller<T, E>) -> Result<T, E> + Send + 'static,
{
    let promise = Promise::new();
    let future = promise.future();
    let canceller = Canceller {
        promise: promise.clone(),
    };
    thread::spawn(move || {
        match panic::catch_unwind(AssertUnwindSafe(move || task(canceller))) {
            Ok(result) => {
                promise.complete(result);
            }
            Err(_) => {
                log::error!("future {}: task panicked, cancelling", promise.future().id());
                promise.cancel();
            }
        }
    });
    future
}
