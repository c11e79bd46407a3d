use std::{
    fmt,
    sync::{atomic::Ordering, Arc},
};

use crate::dispatch;
use crate::future::CANCEL_DONE;
use crate::snapshot::Snapshot;
use crate::{Future, Outcome, OutcomeKind};

/// The write side of a [`Future`].
///
/// Only the first settle call on a promise takes effect; later calls are
/// ignored and return `false`.
///
/// # Examples
///
/// ```
/// use promise_cas::Promise;
/// use std::thread;
///
/// let promise = Promise::<String, String>::new();
/// let future = promise.future();
/// let task = thread::spawn(move || {
///     promise.resolve("🍓".into());
/// });
/// assert_eq!(future.get(), Ok("🍓".to_string()));
/// task.join().expect("The task thread has panicked");
/// ```
pub struct Promise<T, E> {
    future: Future<T, E>,
}

impl<T, E> Clone for Promise<T, E> {
    fn clone(&self) -> Self {
        Promise {
            future: self.future.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise").field("future", &self.future).finish()
    }
}

impl<T, E> Default for Promise<T, E> {
    fn default() -> Self {
        Promise {
            future: Future::pending(),
        }
    }
}

impl<T, E> Promise<T, E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// A handle to the future this promise settles.
    pub fn future(&self) -> Future<T, E> {
        self.future.clone()
    }
}

impl<T, E> Promise<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// Settles the future with `value`.
    pub fn resolve(&self, value: T) -> bool {
        self.settle(Outcome::Success(value))
    }

    /// Settles the future with `err`.
    pub fn reject(&self, err: E) -> bool {
        self.settle(Outcome::Failure(err))
    }

    /// Settles the future as cancelled.
    pub fn cancel(&self) -> bool {
        self.settle(Outcome::Cancelled)
    }

    /// Settles with `Ok`/`Err` of `result`.
    pub fn complete(&self, result: Result<T, E>) -> bool {
        self.settle(result.into())
    }

    /// Installs a terminal snapshot, then wakes waiters and drains the
    /// callbacks and pipes of the snapshot it replaced.
    ///
    /// When called from inside a callback, the drain is queued behind the
    /// one already running on this thread. A callback panic is resumed by
    /// the outermost settle once every queued callback has run.
    pub(crate) fn settle(&self, outcome: Outcome<T, E>) -> bool {
        let inner = &self.future.inner;
        let kind = outcome.kind();
        let terminal = Arc::new(Snapshot::settled(outcome));
        loop {
            let current = inner.snapshot.load_full();
            if current.outcome().is_some() {
                log::debug!(
                    "future {}: already settled, ignoring {:?}",
                    inner.id,
                    kind
                );
                return false;
            }
            let prev = inner.snapshot.compare_and_swap(&current, terminal.clone());
            if !Arc::ptr_eq(&*prev, &current) {
                continue;
            }
            drop(prev);
            log::trace!(
                "future {}: settled as {:?}, draining {} pending entries",
                inner.id,
                kind,
                current.pending_count()
            );
            if kind == OutcomeKind::Cancelled {
                inner.cancel_status.store(CANCEL_DONE, Ordering::Release);
            }
            drop(inner.end_tx.swap(None));
            let id = inner.id;
            dispatch::run(Box::new(move || {
                if let Some(outcome) = terminal.outcome() {
                    current.dispatch(id, outcome);
                }
            }));
            return true;
        }
    }
}
