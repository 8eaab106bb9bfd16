//! Shared definitions between the thread-private storage engine and its
//! scheduler backends.
//!
//! The engine (`tps-engine`) programs against [`Scheduler`] and [`ThreadId`]
//! only; it never assumes OS threads specifically. `tps-sched-std` provides
//! the one concrete scheduler shipped here, backed by real OS threads and
//! condition variables.

use std::fmt;
use std::sync::OnceLock;

/// Opaque, equality-comparable handle identifying a thread to the engine.
///
/// The engine never assumes this is numeric or that it corresponds to any
/// particular OS concept; it is simply a key into the registry and the
/// semaphore's wait queues. Scheduler backends are responsible for handing
/// out a stable `ThreadId` per live thread and are free to choose how raw
/// values are allocated.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub struct ThreadId(u64);

impl ThreadId {
    /// Wraps a raw identifier assigned by a scheduler backend.
    pub const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw identifier, for backends that need to log or index by
    /// it. Not meaningful across different `Scheduler` implementations.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "thread#{}", self.0)
    }
}

/// The scheduler contract the engine is written against.
///
/// A `Scheduler` supplies the process-wide mutual exclusion the gate (§4.1 of
/// the design) relies on, and the block/unblock primitives the semaphore uses
/// to suspend and resume waiters. Implementations must guarantee that
/// `enter_critical_section`/`exit_critical_section` calls nest correctly
/// no more than one level deep per thread (the engine never re-enters) and
/// that `unblock` is idempotent when the named thread is not blocked.
///
/// `block`/`unblock` are handed a [`ThreadId`] rather than operating purely on
/// "the current thread", because `up` must be able to wake a thread other
/// than itself.
pub trait Scheduler: Send + Sync {
    /// Returns the identifier the scheduler has assigned to the calling
    /// thread.
    fn self_id(&self) -> ThreadId;

    /// Acquires the process-wide gate. Blocks until no other thread holds it.
    fn enter_critical_section(&self);

    /// Releases the process-wide gate.
    fn exit_critical_section(&self);

    /// Suspends the calling thread until a matching `unblock(self_id())` is
    /// observed. Called only while the gate is held; implementations must
    /// release the gate for the duration of the wait and reacquire it before
    /// returning, the same way `Condvar::wait` releases and reacquires a
    /// `Mutex`.
    fn block(&self, tid: ThreadId);

    /// Marks `tid` runnable. A no-op if `tid` is not currently blocked. Wakes
    /// at most the one named thread.
    fn unblock(&self, tid: ThreadId);
}

/// Returns the OS virtual-memory page size in bytes, queried once and cached
/// for the remainder of the process's life.
///
/// This stands in for the specification's `PAGE_BYTES` constant: the value is
/// fixed for a given process (the OS page size does not change at runtime)
/// but isn't a compile-time constant because it varies across architectures
/// (4 KiB on most x86_64/arm platforms, sometimes 16 KiB on others).
pub fn page_bytes() -> usize {
    static PAGE_BYTES: OnceLock<usize> = OnceLock::new();
    *PAGE_BYTES.get_or_init(|| {
        // Safety: `sysconf` has no preconditions; a negative return means
        // the value is unsupported on this platform, handled below.
        let queried = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
        if queried > 0 {
            queried as usize
        } else {
            4096
        }
    })
}
