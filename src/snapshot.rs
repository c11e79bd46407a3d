//! Immutable bookkeeping record behind every [`Future`](crate::Future).
//!
//! A snapshot is never mutated once published. Registering a callback builds
//! a copy with the callback appended; settling replaces the pending snapshot
//! with a terminal one and drains the lists of the snapshot it displaced.

use std::sync::Arc;

use crate::dispatch::guarded;
use crate::pipe::Pipe;
use crate::Outcome;

pub(crate) type SuccessFn<T> = Arc<dyn Fn(&T) + Send + Sync>;
pub(crate) type FailureFn<E> = Arc<dyn Fn(&E) + Send + Sync>;
pub(crate) type AlwaysFn<T, E> = Arc<dyn Fn(Result<&T, &E>) + Send + Sync>;
pub(crate) type CancelFn = Arc<dyn Fn() + Send + Sync>;

pub(crate) enum Callback<T, E> {
    Success(SuccessFn<T>),
    Failure(FailureFn<E>),
    Always(AlwaysFn<T, E>),
    Cancel(CancelFn),
}

impl<T, E> Clone for Callback<T, E> {
    fn clone(&self) -> Self {
        match self {
            Callback::Success(cb) => Callback::Success(cb.clone()),
            Callback::Failure(cb) => Callback::Failure(cb.clone()),
            Callback::Always(cb) => Callback::Always(cb.clone()),
            Callback::Cancel(cb) => Callback::Cancel(cb.clone()),
        }
    }
}

impl<T, E> Callback<T, E> {
    /// Invokes the callback if it matches the outcome's kind.
    pub(crate) fn fire(&self, outcome: &Outcome<T, E>) {
        match (self, outcome) {
            (Callback::Success(cb), Outcome::Success(value)) => cb(value),
            (Callback::Failure(cb), Outcome::Failure(err)) => cb(err),
            (Callback::Always(cb), Outcome::Success(value)) => cb(Ok(value)),
            (Callback::Always(cb), Outcome::Failure(err)) => cb(Err(err)),
            (Callback::Cancel(cb), Outcome::Cancelled) => cb(),
            _ => {}
        }
    }
}

pub(crate) struct Snapshot<T, E> {
    successes: Vec<SuccessFn<T>>,
    failures: Vec<FailureFn<E>>,
    always: Vec<AlwaysFn<T, E>>,
    cancels: Vec<CancelFn>,
    pipes: Vec<Arc<Pipe<T, E>>>,
    outcome: Option<Outcome<T, E>>,
}

impl<T, E> Snapshot<T, E> {
    pub(crate) fn pending() -> Self {
        Snapshot {
            successes: Vec::new(),
            failures: Vec::new(),
            always: Vec::new(),
            cancels: Vec::new(),
            pipes: Vec::new(),
            outcome: None,
        }
    }

    pub(crate) fn settled(outcome: Outcome<T, E>) -> Self {
        Snapshot {
            outcome: Some(outcome),
            ..Snapshot::pending()
        }
    }

    pub(crate) fn outcome(&self) -> Option<&Outcome<T, E>> {
        self.outcome.as_ref()
    }

    /// Copy of this pending snapshot's lists; the copy is always pending.
    fn copy_pending(&self) -> Self {
        debug_assert!(self.outcome.is_none(), "appending to a settled snapshot");
        Snapshot {
            successes: self.successes.clone(),
            failures: self.failures.clone(),
            always: self.always.clone(),
            cancels: self.cancels.clone(),
            pipes: self.pipes.clone(),
            outcome: None,
        }
    }

    pub(crate) fn with_callback(&self, callback: Callback<T, E>) -> Self {
        let mut next = self.copy_pending();
        match callback {
            Callback::Success(cb) => next.successes.push(cb),
            Callback::Failure(cb) => next.failures.push(cb),
            Callback::Always(cb) => next.always.push(cb),
            Callback::Cancel(cb) => next.cancels.push(cb),
        }
        next
    }

    pub(crate) fn with_pipe(&self, pipe: Arc<Pipe<T, E>>) -> Self {
        let mut next = self.copy_pending();
        next.pipes.push(pipe);
        next
    }

    pub(crate) fn pending_count(&self) -> usize {
        self.successes.len()
            + self.failures.len()
            + self.always.len()
            + self.cancels.len()
            + self.pipes.len()
    }

    /// Fires every callback and pipe captured here that matches `outcome`,
    /// in registration order. A panicking entry does not stop the rest.
    pub(crate) fn dispatch(&self, id: u64, outcome: &Outcome<T, E>)
    where
        T: Clone + Send + Sync + 'static,
        E: Clone + Send + Sync + 'static,
    {
        match outcome {
            Outcome::Success(value) => {
                for cb in &self.successes {
                    guarded(id, || cb(value));
                }
                for cb in &self.always {
                    guarded(id, || cb(Ok(value)));
                }
            }
            Outcome::Failure(err) => {
                for cb in &self.failures {
                    guarded(id, || cb(err));
                }
                for cb in &self.always {
                    guarded(id, || cb(Err(err)));
                }
            }
            Outcome::Cancelled => {
                for cb in &self.cancels {
                    guarded(id, || cb());
                }
            }
        }
        for pipe in &self.pipes {
            guarded(id, || pipe.fire(outcome));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Callback, Snapshot};
    use crate::{dispatch, Outcome};
    use std::{
        panic::{self, AssertUnwindSafe},
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc, Mutex,
        },
    };

    #[test]
    fn test_append_leaves_original_untouched() {
        let base: Snapshot<i32, String> = Snapshot::pending();
        let next = base.with_callback(Callback::Cancel(Arc::new(|| {})));
        assert_eq!(base.pending_count(), 0);
        assert_eq!(next.pending_count(), 1);
        assert!(next.outcome().is_none());
    }

    #[test]
    fn test_dispatch_order_and_matching() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let (a, b, c, d) = (log.clone(), log.clone(), log.clone(), log.clone());
        let snap: Snapshot<i32, String> = Snapshot::pending()
            .with_callback(Callback::Always(Arc::new(move |r: Result<&i32, &String>| {
                a.lock().unwrap().push(format!("always {:?}", r))
            })))
            .with_callback(Callback::Success(Arc::new(move |v: &i32| {
                b.lock().unwrap().push(format!("success {}", v))
            })))
            .with_callback(Callback::Failure(Arc::new(move |e: &String| {
                c.lock().unwrap().push(format!("failure {}", e))
            })))
            .with_callback(Callback::Cancel(Arc::new(move || {
                d.lock().unwrap().push("cancel".to_string())
            })));

        snap.dispatch(0, &Outcome::Success(4));
        assert_eq!(
            *log.lock().unwrap(),
            vec!["success 4".to_string(), "always Ok(4)".to_string()]
        );
    }

    #[test]
    fn test_dispatch_continues_past_panicking_callback() {
        let hits = Arc::new(AtomicUsize::new(0));
        let (a, b) = (hits.clone(), hits.clone());
        let snap: Snapshot<i32, String> = Snapshot::pending()
            .with_callback(Callback::Failure(Arc::new(|e: &String| panic!("{}", e))))
            .with_callback(Callback::Failure(Arc::new(move |_: &String| {
                a.fetch_add(1, Ordering::SeqCst);
            })))
            .with_callback(Callback::Always(Arc::new(move |_: Result<&i32, &String>| {
                b.fetch_add(1, Ordering::SeqCst);
            })));

        let resumed = panic::catch_unwind(AssertUnwindSafe(|| {
            dispatch::run(Box::new(move || {
                snap.dispatch(0, &Outcome::Failure("boom".into()))
            }))
        }));
        assert!(resumed.is_err());
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_callback_fire_ignores_other_kinds() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let cb: Callback<i32, i32> = Callback::Cancel(Arc::new(move || {
            h.fetch_add(1, Ordering::SeqCst);
        }));
        cb.fire(&Outcome::Success(1));
        cb.fire(&Outcome::Failure(1));
        assert_eq!(hits.load(Ordering::SeqCst), 0);
        cb.fire(&Outcome::Cancelled);
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
