//! Per-thread queue that runs settlement dispatches one after another.
//!
//! Settling a promise from inside a callback (which is what every pipe does)
//! only enqueues the nested dispatch; the outermost settle on the thread
//! drains the queue in a loop. Chains of any length therefore settle without
//! growing the stack.
//!
//! Every callback runs under `catch_unwind`. A panic is logged, the drain
//! keeps going, and the first panic is resumed once the queue is empty.

use std::{
    any::Any,
    cell::RefCell,
    collections::VecDeque,
    mem,
    panic::{self, AssertUnwindSafe},
};

type Job = Box<dyn FnOnce()>;
type Payload = Box<dyn Any + Send>;

#[derive(Default)]
struct Queue {
    jobs: VecDeque<Job>,
    draining: bool,
    panic: Option<Payload>,
}

thread_local!(static QUEUE: RefCell<Queue> = RefCell::new(Queue::default()));

/// Runs `job` now if no drain is in progress on this thread, otherwise after
/// the jobs already queued.
pub(crate) fn run(job: Job) {
    let mut job = Some(job);
    let owner = QUEUE.try_with(|queue| {
        let mut queue = queue.borrow_mut();
        queue.jobs.extend(job.take());
        !mem::replace(&mut queue.draining, true)
    });
    match (owner, job) {
        (Ok(true), _) => drain(),
        (Ok(false), _) => {}
        // Thread-local storage is being torn down; run in place.
        (Err(_), Some(job)) => job(),
        (Err(_), None) => {}
    }
}

/// Resets the draining flag even if a job unwinds.
struct Draining;

impl Drop for Draining {
    fn drop(&mut self) {
        let _ = QUEUE.try_with(|queue| queue.borrow_mut().draining = false);
    }
}

fn drain() {
    let reset = Draining;
    while let Some(job) = QUEUE.with(|queue| queue.borrow_mut().jobs.pop_front()) {
        job();
    }
    let first_panic = QUEUE.with(|queue| queue.borrow_mut().panic.take());
    drop(reset);
    if let Some(payload) = first_panic {
        panic::resume_unwind(payload);
    }
}

/// Runs a callback of future `id`, containing any panic it raises.
pub(crate) fn guarded<F: FnOnce()>(id: u64, f: F) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(f)) {
        log::error!("future {}: callback panicked: {}", id, message(&payload));
        let stashed = QUEUE.try_with(|queue| {
            let mut queue = queue.borrow_mut();
            if queue.panic.is_none() {
                queue.panic = Some(payload);
            }
        });
        if stashed.is_err() {
            log::error!("future {}: panic dropped during thread teardown", id);
        }
    }
}

fn message(payload: &Payload) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "<non-string panic payload>"
    }
}
