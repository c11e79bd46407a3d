//! Waiting on several futures at once.
//!
//! These only use the public [`Future`] surface.

use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc, OnceLock,
};

use crate::{Future, Promise};

fn cancel_others<T, E>(futures: &[Future<T, E>], except: usize) {
    for (i, future) in futures.iter().enumerate() {
        if i != except {
            future.request_cancel();
        }
    }
}

/// Resolves with every value, in input order, once all inputs resolve.
///
/// The first failure (or cancellation) settles the result and requests
/// cancellation of the remaining inputs.
pub fn when_all<T, E, I>(futures: I) -> Future<Vec<T>, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Future<T, E>>,
{
    let futures: Arc<Vec<Future<T, E>>> = Arc::new(futures.into_iter().collect());
    let promise = Promise::new();
    if futures.is_empty() {
        promise.resolve(Vec::new());
        return promise.future();
    }

    let slots: Arc<Vec<OnceLock<T>>> = Arc::new(futures.iter().map(|_| OnceLock::new()).collect());
    let remaining = Arc::new(AtomicUsize::new(futures.len()));
    for (i, future) in futures.iter().enumerate() {
        let (on_value, on_error, on_cancel) = (promise.clone(), promise.clone(), promise.clone());
        let (slots, remaining) = (slots.clone(), remaining.clone());
        let (others, others_cancel) = (futures.clone(), futures.clone());
        future
            .on_success(move |value| {
                let _ = slots[i].set(value.clone());
                if remaining.fetch_sub(1, Ordering::AcqRel) == 1 {
                    let values = slots.iter().filter_map(|slot| slot.get().cloned()).collect();
                    on_value.resolve(values);
                }
            })
            .on_failure(move |err| {
                if on_error.reject(err.clone()) {
                    cancel_others(&others, i);
                }
            })
            .on_cancel(move || {
                if on_cancel.cancel() {
                    cancel_others(&others_cancel, i);
                }
            });
    }
    promise.future()
}

/// Resolves with the first value any input resolves with and requests
/// cancellation of the others.
///
/// Rejects with the failures in input order once no input can succeed any
/// more; cancelled if every input was cancelled.
pub fn when_any<T, E, I>(futures: I) -> Future<T, Vec<E>>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    I: IntoIterator<Item = Future<T, E>>,
{
    let futures: Arc<Vec<Future<T, E>>> = Arc::new(futures.into_iter().collect());
    let promise = Promise::new();
    if futures.is_empty() {
        promise.reject(Vec::new());
        return promise.future();
    }

    let errors: Arc<Vec<OnceLock<E>>> = Arc::new(futures.iter().map(|_| OnceLock::new()).collect());
    let remaining = Arc::new(AtomicUsize::new(futures.len()));
    let finish = {
        let promise = promise.clone();
        move |errors: &[OnceLock<E>]| {
            let errors: Vec<E> = errors.iter().filter_map(|slot| slot.get().cloned()).collect();
            if errors.is_empty() {
                promise.cancel();
            } else {
                promise.reject(errors);
            }
        }
    };
    let finish = Arc::new(finish);
    for (i, future) in futures.iter().enumerate() {
        let on_value = promise.clone();
        let others = futures.clone();
        let (errors_f, remaining_f, finish_f) = (errors.clone(), remaining.clone(), finish.clone());
        let (errors_c, remaining_c, finish_c) = (errors.clone(), remaining.clone(), finish.clone());
        future
            .on_success(move |value| {
                if on_value.resolve(value.clone()) {
                    cancel_others(&others, i);
                }
            })
            .on_failure(move |err| {
                let _ = errors_f[i].set(err.clone());
                if remaining_f.fetch_sub(1, Ordering::AcqRel) == 1 {
                    finish_f(errors_f.as_slice());
                }
            })
            .on_cancel(move || {
                if remaining_c.fetch_sub(1, Ordering::AcqRel) == 1 {
                    finish_c(errors_c.as_slice());
                }
            });
    }
    promise.future()
}
