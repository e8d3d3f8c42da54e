//! ABI layer for interruption-safe `select` / `pselect`.
//!
//! An interrupted wait is re-issued with the caller's timeout and
//! descriptor sets as they stand; callers that need an absolute deadline
//! keep track of it themselves.

use std::ffi::c_int;
use std::ptr;

use libc::{fd_set, sigset_t, timespec, timeval};
use mio_core::{IoError, retry_on_eintr};

use crate::errno_abi::{SavedErrno, last_error};

fn set_ptr(set: Option<&mut fd_set>) -> *mut fd_set {
    set.map_or(ptr::null_mut(), |s| s as *mut fd_set)
}

fn ready_count(rc: c_int) -> Result<usize, IoError> {
    if rc < 0 { Err(last_error()) } else { Ok(rc as usize) }
}

/// `select(2)`, retried while interrupted. Returns the ready count.
///
/// Linux may rewrite `timeout` with the time left; a retry uses whatever it
/// holds at that point.
pub fn wait_ready(
    nfds: c_int,
    read: Option<&mut fd_set>,
    write: Option<&mut fd_set>,
    except: Option<&mut fd_set>,
    timeout: Option<&mut timeval>,
) -> Result<usize, IoError> {
    let (read, write, except) = (set_ptr(read), set_ptr(write), set_ptr(except));
    let timeout = timeout.map_or(ptr::null_mut(), |t| t as *mut timeval);
    retry_on_eintr("select", || {
        // SAFETY: every pointer is null or derived from a live exclusive
        // borrow held for the duration of this call.
        ready_count(unsafe { libc::select(nfds, read, write, except, timeout) })
    })
}

/// `pselect(2)`, retried while interrupted.
pub fn wait_ready_masked(
    nfds: c_int,
    read: Option<&mut fd_set>,
    write: Option<&mut fd_set>,
    except: Option<&mut fd_set>,
    timeout: Option<&timespec>,
    sigmask: Option<&sigset_t>,
) -> Result<usize, IoError> {
    let (read, write, except) = (set_ptr(read), set_ptr(write), set_ptr(except));
    let timeout = timeout.map_or(ptr::null(), |t| t as *const timespec);
    let sigmask = sigmask.map_or(ptr::null(), |m| m as *const sigset_t);
    retry_on_eintr("pselect", || {
        // SAFETY: as in `wait_ready`; timeout and mask are only read.
        ready_count(unsafe { libc::pselect(nfds, read, write, except, timeout, sigmask) })
    })
}

/// Interruption-safe `select`.
///
/// # Safety
///
/// Every pointer must be null or valid for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_select(
    nfds: c_int,
    readfds: *mut fd_set,
    writefds: *mut fd_set,
    exceptfds: *mut fd_set,
    timeout: *mut timeval,
) -> c_int {
    let saved = SavedErrno::capture();
    // SAFETY: caller guarantees each pointer is null or valid.
    let result = unsafe {
        wait_ready(
            nfds,
            readfds.as_mut(),
            writefds.as_mut(),
            exceptfds.as_mut(),
            timeout.as_mut(),
        )
    };
    saved.settle(result).map_or(-1, |n| n as c_int)
}

/// Interruption-safe `pselect`.
///
/// # Safety
///
/// Every pointer must be null or valid for the duration of the call.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_pselect(
    nfds: c_int,
    readfds: *mut fd_set,
    writefds: *mut fd_set,
    exceptfds: *mut fd_set,
    timeout: *const timespec,
    sigmask: *const sigset_t,
) -> c_int {
    let saved = SavedErrno::capture();
    // SAFETY: caller guarantees each pointer is null or valid.
    let result = unsafe {
        wait_ready_masked(
            nfds,
            readfds.as_mut(),
            writefds.as_mut(),
            exceptfds.as_mut(),
            timeout.as_ref(),
            sigmask.as_ref(),
        )
    };
    saved.settle(result).map_or(-1, |n| n as c_int)
}
