//! `async`/`.await` support for [`Future`].
//!
//! ```
//! use promise_cas::Promise;
//! use futures::executor::block_on;
//! use std::thread;
//!
//! let promise = Promise::<String, ()>::new();
//! let future = promise.future();
//! let task = thread::spawn(move || block_on(async { future.await }));
//! promise.resolve("Hi".into());
//! assert_eq!(task.join().expect("The task thread has panicked"), Ok("Hi".to_string()));
//! ```

use std::{
    future::{Future as StdFuture, IntoFuture},
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use futures::task::AtomicWaker;

use crate::{Error, Future};

/// Polls a [`Future`] from an async executor.
pub struct Wait<T, E> {
    future: Future<T, E>,
    waker: Arc<AtomicWaker>,
    subscribed: bool,
}

impl<T, E> StdFuture for Wait<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = Result<T, Error<E>>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(outcome) = self.future.outcome() {
            return Poll::Ready(outcome.into_result());
        }
        self.waker.register(cx.waker());
        if !self.subscribed {
            self.subscribed = true;
            let (on_done, on_cancel) = (self.waker.clone(), self.waker.clone());
            self.future
                .on_complete(move |_| on_done.wake())
                .on_cancel(move || on_cancel.wake());
        }
        // The future may have settled between the first check and registration.
        match self.future.outcome() {
            Some(outcome) => Poll::Ready(outcome.into_result()),
            None => Poll::Pending,
        }
    }
}

impl<T, E> IntoFuture for Future<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    type Output = Result<T, Error<E>>;
    type IntoFuture = Wait<T, E>;

    fn into_future(self) -> Self::IntoFuture {
        Wait {
            future: self,
            waker: Arc::new(AtomicWaker::new()),
            subscribed: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::{Error, Promise};
    use futures::executor::block_on;
    use std::thread;

    #[test]
    fn test_await_resolve() {
        let (op, op_a) = crate::pair::<String, ()>();
        let task1 = thread::spawn(move || block_on(async { op_a.await }));
        let task2 = thread::spawn(move || {
            op.resolve(String::from("🍓"));
        });
        task2.join().expect("The task2 thread has panicked");
        assert_eq!(
            task1.join().expect("The task1 thread has panicked"),
            Ok("🍓".to_string())
        );
    }

    #[test]
    fn test_two_waiters_await() {
        let op = Promise::<String, ()>::new();
        let (op_a, op_b) = (op.future(), op.future());
        let task1 = thread::spawn(move || block_on(async { op_a.await }));
        let task2 = thread::spawn(move || block_on(async { op_b.await }));
        op.resolve("hi".into());
        assert_eq!(task1.join().expect("The task1 thread has panicked"), Ok("hi".to_string()));
        assert_eq!(task2.join().expect("The task2 thread has panicked"), Ok("hi".to_string()));
    }

    #[test]
    fn test_await_cancelled() {
        let op = Promise::<(), String>::new();
        let op_a = op.future();
        let task = thread::spawn(move || block_on(async { op_a.await }));
        op.cancel();
        assert_eq!(task.join().expect("The task thread has panicked"), Err(Error::Cancelled));
    }
}
