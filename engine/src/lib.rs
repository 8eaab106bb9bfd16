//! Thread-private storage: one page-sized, protected memory region per
//! thread, shareable by reference via [`clone`] and copy-on-write on the
//! first write after a clone.
//!
//! The public surface here mirrors the original library's free-function
//! API (`init`/`create`/`destroy`/`read`/`write`/`clone`) rather than a
//! handle-returning Rust API, since there is exactly one thread-private
//! storage subsystem per process, addressed implicitly by "the calling
//! thread" -- the same way the C library it's modeled on works.
//!
//! # Example
//! ```no_run
//! use std::sync::Arc;
//! use tps_sched_std::StdScheduler;
//!
//! tps_engine::init(Arc::new(StdScheduler::new()), true).unwrap();
//! tps_engine::create().unwrap();
//! tps_engine::write(0, b"hello").unwrap();
//! let mut buf = [0u8; 5];
//! tps_engine::read(0, &mut buf).unwrap();
//! assert_eq!(&buf, b"hello");
//! tps_engine::destroy().unwrap();
//! ```

mod err;
mod fault;
mod gate;
mod page;
mod registry;

pub use abi::{Scheduler, ThreadId};
pub use err::{to_sentinel, Error, Result};

use std::sync::{Arc, Mutex, OnceLock};

use gate::Gate;
use registry::Registry;

struct Engine {
    gate: Gate,
    registry: Mutex<Registry>,
    page_bytes: usize,
}

static ENGINE: OnceLock<Engine> = OnceLock::new();

fn engine() -> Result<&'static Engine> {
    ENGINE.get().ok_or(Error::NotInitialized)
}

/// Initializes thread-private storage for the process.
///
/// `scheduler` supplies the process-wide gate and the block/unblock
/// primitives other thread-private-storage-adjacent facilities (such as
/// [`tps_sem`](https://docs.rs/tps-sem)) build on. `install_handlers`
/// mirrors the original API's `segv` flag: when true, SIGSEGV and SIGBUS
/// handlers are installed to diagnose the protection violations `read`
/// and `write` rely on.
///
/// Calling this a second time returns [`Error::AlreadyInitialized`].
pub fn init(scheduler: Arc<dyn Scheduler>, install_handlers: bool) -> Result<()> {
    if ENGINE.get().is_some() {
        return Err(Error::AlreadyInitialized);
    }
    let page_bytes = abi::page_bytes();
    if install_handlers {
        fault::install(page_bytes)?;
    }
    let engine = Engine {
        gate: Gate::new(scheduler),
        registry: Mutex::new(Registry::new()),
        page_bytes,
    };
    ENGINE
        .set(engine)
        .map_err(|_| Error::AlreadyInitialized)?;
    Ok(())
}

/// Returns the identifier the scheduler assigned to the calling thread.
pub fn current_thread() -> Result<ThreadId> {
    Ok(engine()?.gate.scheduler().self_id())
}

/// Creates a new thread-private storage region for the calling thread.
pub fn create() -> Result<()> {
    let engine = engine()?;
    let _gate = engine.gate.enter();
    let tid = engine.gate.scheduler().self_id();
    engine.registry.lock().unwrap().create(tid, engine.page_bytes)
}

/// Destroys the calling thread's region. If the backing page is shared
/// with other threads (via [`clone`]), only this thread's share is
/// released; the page itself is unmapped once the last sharer destroys
/// its region.
pub fn destroy() -> Result<()> {
    let engine = engine()?;
    let _gate = engine.gate.enter();
    let tid = engine.gate.scheduler().self_id();
    engine.registry.lock().unwrap().destroy(tid, engine.page_bytes)
}

/// Reads `buf.len()` bytes starting at `offset` from the calling thread's
/// region into `buf`.
pub fn read(offset: usize, buf: &mut [u8]) -> Result<()> {
    let engine = engine()?;
    validate_range(offset, buf.len(), engine.page_bytes)?;
    let _gate = engine.gate.enter();
    let tid = engine.gate.scheduler().self_id();
    engine
        .registry
        .lock()
        .unwrap()
        .read(tid, offset, buf, engine.page_bytes)
}

/// Writes `buf` into the calling thread's region starting at `offset`.
/// Transparently performs copy-on-write if the region is currently shared.
pub fn write(offset: usize, buf: &[u8]) -> Result<()> {
    let engine = engine()?;
    validate_range(offset, buf.len(), engine.page_bytes)?;
    let _gate = engine.gate.enter();
    let tid = engine.gate.scheduler().self_id();
    engine
        .registry
        .lock()
        .unwrap()
        .write(tid, offset, buf, engine.page_bytes)
}

/// Makes the calling thread a new sharer of `source`'s region. The two
/// threads observe the same contents until either writes, at which point
/// the writer transparently gets its own private copy.
pub fn clone(source: ThreadId) -> Result<()> {
    let engine = engine()?;
    let _gate = engine.gate.enter();
    let tid = engine.gate.scheduler().self_id();
    engine.registry.lock().unwrap().clone_from(tid, source)
}

/// Returns the base address of the calling thread's page.
///
/// This intentionally bypasses the read/write API and exists only so
/// tests and demos can dereference a thread-private storage page directly
/// to exercise the fault interceptor -- the same role the original test
/// suite's `mmap` wrapper played in the C implementation. Production code
/// has no legitimate use for this.
pub fn debug_region_base() -> Result<usize> {
    let engine = engine()?;
    let _gate = engine.gate.enter();
    let tid = engine.gate.scheduler().self_id();
    engine.registry.lock().unwrap().region_base(tid)
}

fn validate_range(offset: usize, len: usize, page_bytes: usize) -> Result<()> {
    if offset >= page_bytes {
        return Err(Error::Invalid);
    }
    let end = offset.checked_add(len).ok_or(Error::Invalid)?;
    if end > page_bytes {
        return Err(Error::Invalid);
    }
    Ok(())
}
