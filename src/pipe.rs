use std::sync::Arc;

use crate::{Future, Outcome, Promise};

pub(crate) type SuccessContinuation<T, E> = Arc<dyn Fn(&T) -> Future<T, E> + Send + Sync>;
pub(crate) type FailureContinuation<T, E> = Arc<dyn Fn(&E) -> Future<T, E> + Send + Sync>;

/// A deferred continuation waiting for its upstream future to settle.
pub(crate) struct Pipe<T, E> {
    on_success: Option<SuccessContinuation<T, E>>,
    on_failure: Option<FailureContinuation<T, E>>,
    downstream: Promise<T, E>,
}

impl<T, E> Pipe<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub(crate) fn new(
        on_success: Option<SuccessContinuation<T, E>>,
        on_failure: Option<FailureContinuation<T, E>>,
    ) -> Self {
        Pipe {
            on_success,
            on_failure,
            downstream: Promise::new(),
        }
    }

    pub(crate) fn downstream(&self) -> Future<T, E> {
        self.downstream.future()
    }

    /// Runs the continuation matching `outcome` and settles the downstream
    /// promise once the continuation's future settles. Without a matching
    /// continuation the downstream stays pending.
    pub(crate) fn fire(&self, outcome: &Outcome<T, E>) {
        let next = match outcome {
            Outcome::Success(value) => self.on_success.as_ref().map(|f| f(value)),
            Outcome::Failure(err) => self.on_failure.as_ref().map(|f| f(err)),
            Outcome::Cancelled => None,
        };
        match next {
            Some(next) => {
                log::trace!(
                    "pipe: future {} feeds downstream future {}",
                    next.id(),
                    self.downstream.future().id()
                );
                forward(&next, &self.downstream);
            }
            None => log::trace!(
                "pipe: no continuation for {:?}, downstream future {} left pending",
                outcome.kind(),
                self.downstream.future().id()
            ),
        }
    }
}

/// Settles `target` with whatever `source` eventually settles with.
pub(crate) fn forward<T, E>(source: &Future<T, E>, target: &Promise<T, E>)
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    let (on_value, on_error, on_cancel) = (target.clone(), target.clone(), target.clone());
    source
        .on_success(move |value| {
            on_value.resolve(value.clone());
        })
        .on_failure(move |err| {
            on_error.reject(err.clone());
        })
        .on_cancel(move || {
            on_cancel.cancel();
        });
}
