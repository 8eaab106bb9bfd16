//! Error taxonomy for the thread-private storage engine.
//!
//! Every fallible operation here is a thin wrapper over a handful of OS
//! calls and two in-process maps, so a hand-rolled enum plus manual
//! `Display`/`Error` impls carries its weight without reaching for a derive
//! macro crate.

use std::fmt;

#[derive(Debug)]
pub enum Error {
    /// A bad argument: typically an offset/length pair that doesn't fit
    /// within a single page.
    Invalid,
    /// The calling thread already owns a region.
    Exists,
    /// The calling thread (or the thread named by `clone`'s source
    /// argument) has no region. Corresponds to the original library's
    /// `ERR_NONE`.
    NoRegion,
    /// `init` was called a second time.
    AlreadyInitialized,
    /// An operation was attempted before `init` was ever called.
    NotInitialized,
    /// An underlying `mmap`/`mprotect`/`munmap`/`sigaction` call failed.
    Os(nix::errno::Errno),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Invalid => write!(f, "invalid argument"),
            Error::Exists => write!(f, "thread already owns a thread-private storage region"),
            Error::NoRegion => write!(f, "thread has no thread-private storage region"),
            Error::AlreadyInitialized => write!(f, "thread-private storage is already initialized"),
            Error::NotInitialized => write!(f, "thread-private storage was never initialized"),
            Error::Os(errno) => write!(f, "memory operation failed: {errno}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Os(errno) => Some(errno),
            _ => None,
        }
    }
}

impl From<nix::errno::Errno> for Error {
    fn from(errno: nix::errno::Errno) -> Self {
        Error::Os(errno)
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// Collapses any engine result down to the `0`/`-1` sentinel the original
/// C API returns, for callers at a C-ABI-shaped boundary.
pub fn to_sentinel<T>(result: &Result<T>) -> i32 {
    if result.is_ok() {
        0
    } else {
        -1
    }
}
