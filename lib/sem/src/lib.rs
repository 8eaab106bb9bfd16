//! A blocking counting semaphore (C2), built directly on the same
//! [`Scheduler`] contract the thread-private storage engine's gate uses.
//!
//! `down`/`up` are a near-literal translation of the original library's
//! `sem_down`/`sem_up`: enter the gate, adjust `count`, and either block
//! the caller or unblock the head of a FIFO wait queue, all under the one
//! process-wide critical section. The difference from a textbook
//! semaphore is `getvalue`: when no thread is waiting it reports `count`,
//! and when threads are queued it reports the negated queue length, which
//! is what lets a caller distinguish "3 permits free" from "3 threads
//! waiting" through a single signed integer.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use abi::{Scheduler, ThreadId};

#[derive(Debug)]
pub enum Error {
    /// `destroy` was called while threads were still queued.
    Busy,
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Busy => write!(f, "semaphore destroyed with waiters still queued"),
        }
    }
}

impl std::error::Error for Error {}

struct Inner {
    count: usize,
    wait_queue: VecDeque<ThreadId>,
}

/// A counting semaphore shared by threads that all use the same
/// [`Scheduler`].
pub struct Semaphore {
    scheduler: Arc<dyn Scheduler>,
    inner: Mutex<Inner>,
}

impl Semaphore {
    /// Creates a semaphore with the given initial count.
    pub fn new(scheduler: Arc<dyn Scheduler>, count: usize) -> Self {
        Self {
            scheduler,
            inner: Mutex::new(Inner {
                count,
                wait_queue: VecDeque::new(),
            }),
        }
    }

    /// Consumes the semaphore, failing if any thread is still queued on
    /// it. Mirrors `sem_destroy`'s refusal to free a semaphore with a
    /// non-empty wait queue.
    pub fn destroy(self) -> Result<(), Error> {
        if self.inner.lock().unwrap().wait_queue.is_empty() {
            Ok(())
        } else {
            Err(Error::Busy)
        }
    }

    /// Decrements the count, blocking the caller first if it is already
    /// zero.
    pub fn down(&self) {
        self.scheduler.enter_critical_section();
        let tid = self.scheduler.self_id();

        let mut inner = self.inner.lock().unwrap();
        if inner.count == 0 {
            inner.wait_queue.push_back(tid);
            drop(inner);
            log::trace!("{tid} waiting on semaphore");
            self.scheduler.block(tid);
            inner = self.inner.lock().unwrap();
        }
        inner.count -= 1;
        drop(inner);

        self.scheduler.exit_critical_section();
    }

    /// Increments the count and wakes the longest-waiting blocked thread,
    /// if any.
    pub fn up(&self) {
        self.scheduler.enter_critical_section();

        let mut inner = self.inner.lock().unwrap();
        inner.count += 1;
        let next = inner.wait_queue.pop_front();
        drop(inner);

        if let Some(tid) = next {
            log::trace!("waking {tid} from semaphore");
            self.scheduler.unblock(tid);
        }

        self.scheduler.exit_critical_section();
    }

    /// Returns `count` if no thread is waiting, or the negated number of
    /// waiting threads otherwise.
    pub fn getvalue(&self) -> isize {
        let inner = self.inner.lock().unwrap();
        if inner.count > 0 {
            inner.count as isize
        } else {
            -(inner.wait_queue.len() as isize)
        }
    }
}
