//! Host `errno` access and the saved-errno contract.
//!
//! Every `mio_*` entry point captures `errno` on entry and puts it back on
//! its success paths, so retries absorbed inside the call leave no trace.

use std::ffi::c_int;

use mio_core::IoError;

#[inline]
fn errno_location() -> *mut c_int {
    // SAFETY: these accessors return the calling thread's errno slot and
    // have no preconditions.
    #[cfg(any(target_os = "linux", target_os = "emscripten", target_os = "redox"))]
    unsafe {
        libc::__errno_location()
    }
    #[cfg(any(target_os = "android", target_os = "netbsd", target_os = "openbsd"))]
    unsafe {
        libc::__errno()
    }
    #[cfg(any(target_vendor = "apple", target_os = "freebsd", target_os = "dragonfly"))]
    unsafe {
        libc::__error()
    }
}

/// Current thread's `errno`.
#[inline]
pub fn get_errno() -> c_int {
    // SAFETY: errno_location always returns a valid thread-local slot.
    unsafe { *errno_location() }
}

/// Sets the current thread's `errno`.
#[inline]
pub fn set_errno(value: c_int) {
    // SAFETY: errno_location always returns a valid thread-local slot.
    unsafe { *errno_location() = value };
}

/// The error described by the current `errno`.
///
/// A failure that left `errno` at zero reads as `EIO`.
#[inline]
pub fn last_error() -> IoError {
    match get_errno() {
        0 => IoError::Os(libc::EIO),
        errnum => IoError::from_errno(errnum),
    }
}

/// `errno` value captured at entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[must_use = "a captured errno must be restored or reported"]
pub struct SavedErrno(c_int);

impl SavedErrno {
    #[inline]
    pub fn capture() -> Self {
        Self(get_errno())
    }

    pub fn value(self) -> c_int {
        self.0
    }

    /// Puts the captured value back.
    #[inline]
    pub fn restore(self) {
        set_errno(self.0);
    }

    /// Restores on `Ok`, publishes the error on `Err`.
    #[inline]
    pub(crate) fn settle<T>(self, result: Result<T, IoError>) -> Option<T> {
        match result {
            Ok(value) => {
                self.restore();
                Some(value)
            }
            Err(err) => {
                set_errno(err.errno());
                None
            }
        }
    }
}
