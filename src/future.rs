//! The read side of a promise.
//!
//! All state lives in an immutable [`Snapshot`] behind an atomically swapped
//! pointer. Subscribing copies the current snapshot with the new entry
//! appended and compare-and-swaps it in, retrying on contention. Once the
//! owning [`Promise`] installs a terminal snapshot no append can land, so a
//! late subscriber is served inline instead.

use std::{
    fmt,
    sync::{
        atomic::{AtomicU64, AtomicU8, Ordering},
        Arc,
    },
    time::Duration,
};

use arc_swap::{ArcSwap, ArcSwapOption};
use crossbeam_channel::{after, bounded, select, Receiver, Sender};

use crate::pipe::{forward, FailureContinuation, Pipe, SuccessContinuation};
use crate::snapshot::{Callback, Snapshot};
use crate::{Error, Outcome, Promise};

/// Wait used by [`Future::get_or_timeout`] when handed a zero duration.
pub const MIN_WAIT: Duration = Duration::from_nanos(10);

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

pub(crate) const CANCEL_NOT_REQUESTED: u8 = 0;
pub(crate) const CANCEL_REQUESTED: u8 = 1;
pub(crate) const CANCEL_DONE: u8 = 2;

pub(crate) struct Inner<T, E> {
    pub(crate) id: u64,
    pub(crate) snapshot: ArcSwap<Snapshot<T, E>>,
    pub(crate) cancel_status: AtomicU8,
    /// Dropped on settlement, which disconnects every receiver of `end_rx`.
    pub(crate) end_tx: ArcSwapOption<Sender<()>>,
    end_rx: Receiver<()>,
}

/// A shared, read-only handle to a value that a [`Promise`] settles later.
///
/// Cloning is cheap; every clone observes the same settlement.
pub struct Future<T, E> {
    pub(crate) inner: Arc<Inner<T, E>>,
}

impl<T, E> Clone for Future<T, E> {
    fn clone(&self) -> Self {
        Future {
            inner: self.inner.clone(),
        }
    }
}

impl<T, E> fmt::Debug for Future<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snapshot = self.inner.snapshot.load();
        f.debug_struct("Future")
            .field("id", &self.inner.id)
            .field("settled", &snapshot.outcome().map(|o| o.kind()))
            .field("pending_callbacks", &snapshot.pending_count())
            .field("cancel_status", &self.inner.cancel_status.load(Ordering::Acquire))
            .finish()
    }
}

impl<T, E> Future<T, E> {
    pub(crate) fn pending() -> Self {
        let (end_tx, end_rx) = bounded(0);
        Future {
            inner: Arc::new(Inner {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                snapshot: ArcSwap::from_pointee(Snapshot::pending()),
                cancel_status: AtomicU8::new(CANCEL_NOT_REQUESTED),
                end_tx: ArcSwapOption::from_pointee(end_tx),
                end_rx,
            }),
        }
    }

    /// Identity for correlation in logs and debugging.
    pub fn id(&self) -> u64 {
        self.inner.id
    }

    /// Asks whoever feeds the promise to stop. Returns `true` only for the
    /// call that moved the flag out of its initial state.
    ///
    /// This never settles the future by itself.
    pub fn request_cancel(&self) -> bool {
        let won = self
            .inner
            .cancel_status
            .compare_exchange(
                CANCEL_NOT_REQUESTED,
                CANCEL_REQUESTED,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .is_ok();
        if won {
            log::debug!("future {}: cancellation requested", self.inner.id);
        }
        won
    }

    /// Whether cancellation has been requested (or the future was cancelled).
    pub fn is_cancel_requested(&self) -> bool {
        self.inner.cancel_status.load(Ordering::Acquire) != CANCEL_NOT_REQUESTED
    }

    /// True iff the future settled as cancelled.
    pub fn is_cancelled(&self) -> bool {
        self.inner
            .snapshot
            .load()
            .outcome()
            .map_or(false, Outcome::is_cancelled)
    }

    pub fn is_settled(&self) -> bool {
        self.inner.snapshot.load().outcome().is_some()
    }

    /// A receiver that disconnects when the future settles. Usable in
    /// `crossbeam_channel::select!` next to timers or other futures.
    pub fn completion(&self) -> Receiver<()> {
        self.inner.end_rx.clone()
    }
}

impl<T, E> Future<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    /// A future already resolved with `value`.
    pub fn resolved(value: T) -> Self {
        let promise = Promise::new();
        promise.resolve(value);
        promise.future()
    }

    /// A future already rejected with `err`.
    pub fn rejected(err: E) -> Self {
        let promise = Promise::new();
        promise.reject(err);
        promise.future()
    }

    pub fn cancelled() -> Self {
        let promise = Promise::new();
        promise.cancel();
        promise.future()
    }

    /// Non-blocking peek at the terminal outcome.
    pub fn outcome(&self) -> Option<Outcome<T, E>> {
        self.inner.snapshot.load().outcome().cloned()
    }

    /// Blocks until the future settles.
    pub fn get(&self) -> Result<T, Error<E>> {
        loop {
            if let Some(outcome) = self.outcome() {
                return outcome.into_result();
            }
            // Nothing is ever sent; `recv` returns once settlement drops the sender.
            while self.inner.end_rx.recv().is_ok() {}
        }
    }

    /// Like [`get`](Future::get) but gives up after `timeout`, returning `None`.
    /// The future stays gettable afterwards. A zero timeout waits [`MIN_WAIT`].
    pub fn get_or_timeout(&self, timeout: Duration) -> Option<Result<T, Error<E>>> {
        if let Some(outcome) = self.outcome() {
            return Some(outcome.into_result());
        }
        let timeout = if timeout.is_zero() { MIN_WAIT } else { timeout };
        let timer = after(timeout);
        select! {
            recv(self.inner.end_rx) -> _ => self.outcome().map(Outcome::into_result),
            recv(timer) -> _ => None,
        }
    }

    /// Runs `callback` with the value once resolved.
    pub fn on_success<F>(&self, callback: F) -> &Self
    where
        F: Fn(&T) + Send + Sync + 'static,
    {
        self.add_callback(Callback::Success(Arc::new(callback)));
        self
    }

    /// Runs `callback` with the error once rejected.
    pub fn on_failure<F>(&self, callback: F) -> &Self
    where
        F: Fn(&E) + Send + Sync + 'static,
    {
        self.add_callback(Callback::Failure(Arc::new(callback)));
        self
    }

    /// Runs `callback` once resolved or rejected. Never runs on cancellation.
    pub fn on_complete<F>(&self, callback: F) -> &Self
    where
        F: Fn(Result<&T, &E>) + Send + Sync + 'static,
    {
        self.add_callback(Callback::Always(Arc::new(callback)));
        self
    }

    /// Runs `callback` once cancelled.
    pub fn on_cancel<F>(&self, callback: F) -> &Self
    where
        F: Fn() + Send + Sync + 'static,
    {
        self.add_callback(Callback::Cancel(Arc::new(callback)));
        self
    }

    /// Chains continuations onto this future.
    ///
    /// The returned future settles with whatever the matching continuation's
    /// future settles with. With no continuation at all this future is
    /// returned as is. If this future is already settled the matching
    /// continuation runs inline; if there is none (or the outcome is
    /// cancelled) this future is returned.
    ///
    /// A continuation that does not match the eventual outcome never fires,
    /// which leaves the returned future pending.
    pub fn pipe<F, G>(&self, on_success: Option<F>, on_failure: Option<G>) -> Future<T, E>
    where
        F: Fn(&T) -> Future<T, E> + Send + Sync + 'static,
        G: Fn(&E) -> Future<T, E> + Send + Sync + 'static,
    {
        self.chain(
            on_success.map(|f| Arc::new(f) as SuccessContinuation<T, E>),
            on_failure.map(|g| Arc::new(g) as FailureContinuation<T, E>),
        )
    }

    /// Success-only [`pipe`](Future::pipe).
    pub fn and_then<F>(&self, on_success: F) -> Future<T, E>
    where
        F: Fn(&T) -> Future<T, E> + Send + Sync + 'static,
    {
        self.chain(Some(Arc::new(on_success)), None)
    }

    /// Failure-only [`pipe`](Future::pipe).
    pub fn or_else<G>(&self, on_failure: G) -> Future<T, E>
    where
        G: Fn(&E) -> Future<T, E> + Send + Sync + 'static,
    {
        self.chain(None, Some(Arc::new(on_failure)))
    }

    /// Chains a continuation that may change the value type.
    ///
    /// Unlike [`pipe`](Future::pipe), a failure or cancellation of this
    /// future is passed straight on to the returned future, so it never
    /// stays pending once this one settles.
    pub fn then<U, F>(&self, on_success: F) -> Future<U, E>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(&T) -> Future<U, E> + Send + Sync + 'static,
    {
        let promise = Promise::<U, E>::new();
        let (on_value, on_error, on_cancel) = (promise.clone(), promise.clone(), promise.clone());
        self.on_success(move |value| forward(&on_success(value), &on_value))
            .on_failure(move |err| {
                on_error.reject(err.clone());
            })
            .on_cancel(move || {
                on_cancel.cancel();
            });
        promise.future()
    }

    fn chain(
        &self,
        on_success: Option<SuccessContinuation<T, E>>,
        on_failure: Option<FailureContinuation<T, E>>,
    ) -> Future<T, E> {
        if on_success.is_none() && on_failure.is_none() {
            return self.clone();
        }
        let mut pipe = None;
        loop {
            let current = self.inner.snapshot.load_full();
            if let Some(outcome) = current.outcome() {
                let next = match outcome {
                    Outcome::Success(value) => on_success.as_ref().map(|f| f(value)),
                    Outcome::Failure(err) => on_failure.as_ref().map(|f| f(err)),
                    Outcome::Cancelled => None,
                };
                return next.unwrap_or_else(|| self.clone());
            }
            let pipe = pipe
                .get_or_insert_with(|| Arc::new(Pipe::new(on_success.clone(), on_failure.clone())))
                .clone();
            let downstream = pipe.downstream();
            let next = Arc::new(current.with_pipe(pipe));
            let prev = self.inner.snapshot.compare_and_swap(&current, next);
            if Arc::ptr_eq(&*prev, &current) {
                log::trace!(
                    "future {}: piped into future {}",
                    self.inner.id,
                    downstream.id()
                );
                return downstream;
            }
        }
    }

    fn add_callback(&self, callback: Callback<T, E>) {
        loop {
            let current = self.inner.snapshot.load_full();
            if let Some(outcome) = current.outcome() {
                callback.fire(outcome);
                return;
            }
            let next = Arc::new(current.with_callback(callback.clone()));
            let prev = self.inner.snapshot.compare_and_swap(&current, next);
            if Arc::ptr_eq(&*prev, &current) {
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Future, Outcome, Promise};
    use std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        thread,
        time::Duration,
    };

    #[test]
    fn test_request_cancel_once() {
        let promise: Promise<i32, String> = Promise::new();
        let future = promise.future();
        assert!(future.request_cancel());
        assert!(!future.request_cancel());
        assert!(future.is_cancel_requested());
        assert!(!future.is_cancelled());
        promise.cancel();
        assert!(future.is_cancelled());
        assert_eq!(future.get(), Err(Error::Cancelled));
    }

    #[test]
    fn test_late_subscriber_runs_inline() {
        let future: Future<i32, String> = Future::resolved(7);
        let seen = Arc::new(AtomicUsize::new(0));
        let s = seen.clone();
        future.on_success(move |v| {
            s.store(*v as usize, Ordering::SeqCst);
        });
        assert_eq!(seen.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn test_wrong_kind_late_subscriber_is_skipped() {
        let future: Future<i32, String> = Future::rejected("no".into());
        let hits = Arc::new(AtomicUsize::new(0));
        let (a, b, c) = (hits.clone(), hits.clone(), hits.clone());
        future
            .on_success(move |_| {
                a.fetch_add(1, Ordering::SeqCst);
            })
            .on_cancel(move || {
                b.fetch_add(1, Ordering::SeqCst);
            })
            .on_complete(move |r| {
                assert_eq!(r, Err(&"no".to_string()));
                c.fetch_add(10, Ordering::SeqCst);
            });
        assert_eq!(hits.load(Ordering::SeqCst), 10);
    }

    #[test]
    fn test_get_or_timeout_then_get() {
        let promise: Promise<i32, String> = Promise::new();
        let future = promise.future();
        let task = thread::spawn(move || {
            thread::sleep(Duration::from_millis(50));
            promise.resolve(1);
        });
        assert_eq!(future.get_or_timeout(Duration::from_millis(1)), None);
        assert_eq!(future.get(), Ok(1));
        assert_eq!(future.get_or_timeout(Duration::ZERO), Some(Ok(1)));
        task.join().expect("The resolver thread has panicked");
    }

    #[test]
    fn test_zero_timeout_on_pending_times_out() {
        let promise: Promise<i32, String> = Promise::new();
        assert_eq!(promise.future().get_or_timeout(Duration::ZERO), None);
    }

    #[test]
    fn test_pipe_passthrough() {
        let promise: Promise<i32, String> = Promise::new();
        let future = promise.future();
        let piped = future.pipe(
            None::<fn(&i32) -> Future<i32, String>>,
            None::<fn(&String) -> Future<i32, String>>,
        );
        assert_eq!(piped.id(), future.id());
    }

    #[test]
    fn test_pipe_on_settled_future_runs_inline() {
        let future: Future<i32, String> = Future::resolved(5);
        let piped = future.and_then(|v| Future::resolved(v * 2));
        assert_eq!(piped.outcome(), Some(Outcome::Success(10)));

        let cancelled: Future<i32, String> = Future::cancelled();
        let same = cancelled.and_then(|v| Future::resolved(*v));
        assert_eq!(same.id(), cancelled.id());

        let missing = future.or_else(|_| Future::resolved(0));
        assert_eq!(missing.id(), future.id());
    }

    #[test]
    fn test_or_else_recovers() {
        let promise: Promise<i32, String> = Promise::new();
        let recovered = promise.future().or_else(|e| Future::resolved(e.len() as i32));
        assert!(!recovered.is_settled());
        promise.reject("four".into());
        assert_eq!(recovered.get(), Ok(4));
    }

    #[test]
    fn test_then_changes_value_type() {
        let promise: Promise<i32, String> = Promise::new();
        let text = promise
            .future()
            .then(|v| Future::resolved(format!("#{}", v)))
            .then(|s| Future::resolved(s.len()));
        promise.resolve(42);
        assert_eq!(text.get(), Ok(3));
    }

    #[test]
    fn test_then_passes_failure_and_cancel_on() {
        let failed: Future<i32, String> = Future::rejected("bad".into());
        let mapped = failed.then(|v| Future::<String, String>::resolved(v.to_string()));
        assert_eq!(mapped.get(), Err(Error::Rejected("bad".to_string())));

        let promise: Promise<i32, String> = Promise::new();
        let mapped = promise.future().then(|v| Future::<u8, String>::resolved(*v as u8));
        promise.cancel();
        assert!(mapped.is_cancelled());
    }

    #[test]
    fn test_completion_channel_disconnects() {
        let promise: Promise<(), ()> = Promise::new();
        let done = promise.future().completion();
        assert!(done.try_recv().is_err());
        promise.resolve(());
        assert!(done.recv().is_err());
    }
}
