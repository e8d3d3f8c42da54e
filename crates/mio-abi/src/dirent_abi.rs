//! ABI layer for interruption-safe `readdir`.
//!
//! `readdir` reports end of stream and failure the same way (a null entry),
//! so `errno` is cleared before each attempt to tell them apart.

use std::ffi::c_int;
use std::ptr::{self, NonNull};

use libc::{DIR, dirent};
use mio_core::IoError;
use mio_core::errno::{EBADF, EINVAL};
use mio_core::retry_on_eintr;

use crate::errno_abi::{SavedErrno, get_errno, set_errno};

/// Next entry of `dir`, or `None` at end of stream.
///
/// The entry points into storage owned by `dir` and is valid until the next
/// read or `closedir`.
///
/// # Safety
///
/// `dir` must be an open directory stream.
pub unsafe fn dir_read_entry(dir: NonNull<DIR>) -> Result<Option<NonNull<dirent>>, IoError> {
    retry_on_eintr("readdir", || {
        set_errno(0);
        // SAFETY: caller passes an open directory stream.
        let entry = unsafe { libc::readdir(dir.as_ptr()) };
        match (NonNull::new(entry), get_errno()) {
            (Some(entry), _) => Ok(Some(entry)),
            (None, 0) => Ok(None),
            (None, errnum) => Err(IoError::from_errno(errnum)),
        }
    })
}

/// Interruption-safe `readdir`.
///
/// Stores the next entry (or NULL at end of stream) in `*entry` and returns
/// `0`, leaving `errno` as it was. On failure returns the error code itself
/// (as `readdir_r` does); `errno` holds the same value.
///
/// # Safety
///
/// `dir` must be null or an open directory stream; `entry` must be null or
/// valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_readdir(dir: *mut DIR, entry: *mut *mut dirent) -> c_int {
    let saved = SavedErrno::capture();
    if entry.is_null() {
        set_errno(EINVAL);
        return EINVAL;
    }
    let Some(dir) = NonNull::new(dir) else {
        set_errno(EBADF);
        return EBADF;
    };
    // SAFETY: caller passes an open directory stream.
    match unsafe { dir_read_entry(dir) } {
        Ok(next) => {
            saved.restore();
            // SAFETY: checked non-null; writable per contract.
            unsafe { *entry = next.map_or(ptr::null_mut(), NonNull::as_ptr) };
            0
        }
        Err(err) => {
            set_errno(err.errno());
            err.errno()
        }
    }
}
