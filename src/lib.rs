//! # promise_cas
//!
//! A write-once result container: a [`Promise`] settles its [`Future`] exactly
//! once with a value, an error, or cancellation. Consumers can block on the
//! future, await it, register callbacks, or chain continuations.
//!
//! State changes never take a lock. Each future holds an atomically swapped
//! pointer to an immutable snapshot of its pending callbacks and chained
//! continuations; writers build a new snapshot and compare-and-swap it in.
//!
//! # Examples
//!
//! ```
//! use std::thread;
//!
//! let (promise, future) = promise_cas::pair::<i32, String>();
//! let doubled = future.and_then(|v| promise_cas::Future::resolved(v * 2));
//!
//! let task = thread::spawn(move || {
//!     promise.resolve(21);
//! });
//! assert_eq!(doubled.get(), Ok(42));
//! task.join().expect("The task thread has panicked");
//! ```

mod combinators;
mod dispatch;
mod error;
mod future;
mod outcome;
mod pipe;
mod promise;
mod snapshot;
mod task;
mod wait;

pub use combinators::{when_all, when_any};
pub use error::Error;
pub use future::{Future, MIN_WAIT};
pub use outcome::{Outcome, OutcomeKind};
pub use promise::Promise;
pub use task::{start, start_cancellable, Canceller};
pub use wait::Wait;

/// Creates a pending promise together with its future.
pub fn pair<T, E>() -> (Promise<T, E>, Future<T, E>) {
    let promise = Promise::new();
    let future = promise.future();
    (promise, future)
}
