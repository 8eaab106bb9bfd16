//! The fault interceptor: the signal-driven half of C4.
//!
//! Reverse-maps a faulting address to a thread-private storage page and
//! emits a diagnostic before letting the process crash as it normally
//! would. Everything the handler itself touches must be async-signal-safe
//! -- no allocation, no locking, a single raw `write(2)` -- which is why
//! the live-page-base lookup below is a lock-free snapshot rather than a
//! walk over the gated registry.

use std::ffi::c_void;
use std::os::raw::c_int;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use arc_swap::ArcSwap;
use nix::sys::signal::{self, SaFlags, SigAction, SigHandler, SigSet, Signal};

use crate::err::Result;

static PAGE_BASES: OnceLock<ArcSwap<Vec<usize>>> = OnceLock::new();
static PAGE_BYTES: AtomicUsize = AtomicUsize::new(4096);

fn page_bases() -> &'static ArcSwap<Vec<usize>> {
    PAGE_BASES.get_or_init(|| ArcSwap::new(Arc::new(Vec::new())))
}

/// Publishes the current set of live page base addresses for the signal
/// handler to consult. Called by the registry after every gated mutation
/// that changes which pages are live. `bases` must already be sorted.
pub(crate) fn publish(bases: Vec<usize>) {
    page_bases().store(Arc::new(bases));
}

fn is_live_page_base(addr: usize) -> bool {
    page_bases().load().binary_search(&addr).is_ok()
}

/// Installs the SIGSEGV/SIGBUS handler. Called once, from `init`.
pub(crate) fn install(page_bytes: usize) -> Result<()> {
    PAGE_BYTES.store(page_bytes, Ordering::Relaxed);
    let action = SigAction::new(
        SigHandler::SigAction(handle_fault),
        SaFlags::SA_SIGINFO,
        SigSet::empty(),
    );
    // Safety: `handle_fault` only touches async-signal-safe state.
    unsafe {
        signal::sigaction(Signal::SIGSEGV, &action)?;
        signal::sigaction(Signal::SIGBUS, &action)?;
    }
    Ok(())
}

extern "C" fn handle_fault(sig: c_int, info: *mut libc::siginfo_t, _ctx: *mut c_void) {
    let page_bytes = PAGE_BYTES.load(Ordering::Relaxed);
    // Safety: `info` is valid for the duration of signal delivery.
    let fault_addr = unsafe { (*info).si_addr() as usize };
    let page_base = fault_addr & !(page_bytes - 1);

    if is_live_page_base(page_base) {
        const MSG: &[u8] = b"TPS protection error!\n";
        // Safety: `write` to a fixed fd with a static buffer is
        // async-signal-safe.
        unsafe {
            libc::write(2, MSG.as_ptr() as *const c_void, MSG.len());
        }
    }

    // Restore default dispositions and re-raise so the process terminates
    // the way it would have without this handler installed. The handler
    // never resumes user code.
    let default = SigAction::new(SigHandler::SigDfl, SaFlags::empty(), SigSet::empty());
    unsafe {
        let _ = signal::sigaction(Signal::SIGSEGV, &default);
        let _ = signal::sigaction(Signal::SIGBUS, &default);
        libc::raise(sig);
    }
}
