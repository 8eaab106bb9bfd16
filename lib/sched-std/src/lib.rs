//! A [`Scheduler`] implementation backed by real OS threads.
//!
//! This is the one scheduler backend shipped in this crate: the engine is
//! written against the `Scheduler` trait and doesn't know (or care) that
//! `enter_critical_section`/`block`/`unblock` happen to be implemented with a
//! hand-rolled monitor over `std::sync::{Mutex, Condvar}` rather than a
//! cooperative user-level scheduler's native primitives.
//!
//! The gate itself can't be a literal `Mutex` guard held across separate
//! `enter_critical_section`/`exit_critical_section` calls, since the guard's
//! lifetime can't cross a Rust function boundary that way. Instead we
//! implement the textbook "monitor" pattern: a `Mutex<Inner>` protecting a
//! `locked` flag, with a `Condvar` used to wait for it to clear. `block` and
//! `unblock` share the same `Inner` and a second `Condvar`, so that `block`
//! can release the logical gate, sleep until woken, and reacquire the gate
//! before returning -- mirroring what `Condvar::wait` does for a single
//! `Mutex`.

use std::cell::OnceCell;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Condvar, Mutex};

use abi::{Scheduler, ThreadId};

struct Inner {
    locked: bool,
    woken: HashSet<ThreadId>,
}

/// Scheduler backend that maps the engine's gate and block/unblock contract
/// onto real OS threads.
pub struct StdScheduler {
    inner: Mutex<Inner>,
    gate_cv: Condvar,
    wake_cv: Condvar,
}

impl Default for StdScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl StdScheduler {
    pub fn new() -> Self {
        Self {
            inner: Mutex::new(Inner {
                locked: false,
                woken: HashSet::new(),
            }),
            gate_cv: Condvar::new(),
            wake_cv: Condvar::new(),
        }
    }
}

thread_local! {
    static LOCAL_ID: OnceCell<ThreadId> = const { OnceCell::new() };
}
static NEXT_ID: AtomicU64 = AtomicU64::new(1);

impl Scheduler for StdScheduler {
    fn self_id(&self) -> ThreadId {
        LOCAL_ID.with(|cell| {
            *cell.get_or_init(|| ThreadId::from_raw(NEXT_ID.fetch_add(1, Ordering::Relaxed)))
        })
    }

    fn enter_critical_section(&self) {
        let mut inner = self.inner.lock().unwrap();
        while inner.locked {
            inner = self.gate_cv.wait(inner).unwrap();
        }
        inner.locked = true;
        log::trace!("{} entered the gate", self.self_id());
    }

    fn exit_critical_section(&self) {
        let mut inner = self.inner.lock().unwrap();
        inner.locked = false;
        drop(inner);
        self.gate_cv.notify_one();
        log::trace!("{} exited the gate", self.self_id());
    }

    fn block(&self, tid: ThreadId) {
        let mut inner = self.inner.lock().unwrap();
        debug_assert!(inner.locked, "block() called outside the gate");

        // Release the logical gate so the thread that will eventually call
        // `unblock` (or `up`) can make progress, the same way `Condvar::wait`
        // releases a `Mutex` for the duration of the wait.
        inner.locked = false;
        inner.woken.remove(&tid);
        drop(inner);
        self.gate_cv.notify_one();
        log::debug!("{tid} blocking");

        let mut inner = self.inner.lock().unwrap();
        while !inner.woken.remove(&tid) {
            inner = self.wake_cv.wait(inner).unwrap();
        }

        // Reacquire the gate before returning to the caller.
        while inner.locked {
            inner = self.gate_cv.wait(inner).unwrap();
        }
        inner.locked = true;
        log::debug!("{tid} resumed");
    }

    fn unblock(&self, tid: ThreadId) {
        let mut inner = self.inner.lock().unwrap();
        inner.woken.insert(tid);
        drop(inner);
        self.wake_cv.notify_all();
        log::trace!("{tid} marked runnable");
    }
}
