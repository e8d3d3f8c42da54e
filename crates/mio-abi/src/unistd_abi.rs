//! ABI layer for interruption-safe `read(2)` and `open(2)` / `openat(2)`.
//!
//! `mio_read` reads "up to N bytes, no more than is available now": short
//! reads end the call, interruptions do not, and a hard error reports zero
//! with `errno` describing it. The open family takes the mode
//! as an explicit argument that is consulted only when the flags create a
//! file.

use std::ffi::{CStr, c_char, c_int, c_void};
use std::os::fd::{FromRawFd, IntoRawFd, OwnedFd, RawFd};

use libc::mode_t;
use mio_core::errno::EINVAL;
use mio_core::unistd::{MAX_READ_CHUNK, read_available_chunked, requires_mode};
use mio_core::{IoError, retry_on_eintr};

use crate::errno_abi::{SavedErrno, last_error, set_errno};

/// Reads into `buf` from `fd` until a short read, retrying interruptions.
pub fn read_bytes(fd: RawFd, buf: &mut [u8]) -> Result<usize, IoError> {
    read_bytes_chunked(fd, buf, MAX_READ_CHUNK)
}

fn read_bytes_chunked(fd: RawFd, buf: &mut [u8], max_chunk: usize) -> Result<usize, IoError> {
    read_available_chunked(buf, max_chunk, |chunk| {
        // SAFETY: `chunk` is a live, writable slice of its own length.
        let rc = unsafe { libc::read(fd, chunk.as_mut_ptr().cast(), chunk.len()) };
        if rc < 0 { Err(last_error()) } else { Ok(rc as usize) }
    })
}

/// `openat(2)`, retried while interrupted.
///
/// `mode` is passed through only when `flags` create a file; otherwise it
/// is ignored.
pub fn open_at(
    dirfd: RawFd,
    path: &CStr,
    flags: c_int,
    mode: Option<mode_t>,
) -> Result<OwnedFd, IoError> {
    let mode = if requires_mode(flags) {
        mode.unwrap_or(0)
    } else {
        0
    };
    let fd = retry_on_eintr("openat", || {
        // SAFETY: `path` is NUL-terminated; the variadic mode is promoted
        // to an unsigned int as the C calling convention requires.
        let fd = unsafe { libc::openat(dirfd, path.as_ptr(), flags, mode as libc::c_uint) };
        if fd < 0 { Err(last_error()) } else { Ok(fd) }
    })?;
    // SAFETY: `fd` was just returned by openat and is owned by nobody else.
    Ok(unsafe { OwnedFd::from_raw_fd(fd) })
}

/// [`open_at`] relative to the current directory.
pub fn open(path: &CStr, flags: c_int, mode: Option<mode_t>) -> Result<OwnedFd, IoError> {
    open_at(libc::AT_FDCWD, path, flags, mode)
}

// ---------------------------------------------------------------------------
// mio_read
// ---------------------------------------------------------------------------

/// Interruption-safe `read`.
///
/// Returns the number of bytes read. `0` is both end of input (with `errno`
/// untouched) and failure (with `errno` set), so callers that need to tell
/// them apart clear `errno` first. Bytes read before a failure are left in
/// `buf` but not counted.
///
/// # Safety
///
/// `buf` must be valid for writes of `count` bytes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_read(fd: c_int, buf: *mut c_void, count: usize) -> usize {
    let saved = SavedErrno::capture();
    if count == 0 {
        return 0;
    }
    if buf.is_null() {
        set_errno(libc::EFAULT);
        return 0;
    }
    let len = count.min(MAX_READ_CHUNK);
    // SAFETY: caller guarantees `count` writable bytes at `buf`.
    let dst = unsafe { std::slice::from_raw_parts_mut(buf.cast::<u8>(), len) };
    read_outcome(saved, read_bytes(fd, dst))
}

fn read_outcome(saved: SavedErrno, result: Result<usize, IoError>) -> usize {
    saved.settle(result).unwrap_or(0)
}

// ---------------------------------------------------------------------------
// mio_openat / mio_open
// ---------------------------------------------------------------------------

fn fd_outcome(saved: SavedErrno, result: Result<OwnedFd, IoError>) -> c_int {
    saved.settle(result).map_or(-1, IntoRawFd::into_raw_fd)
}

/// Interruption-safe `openat`. `mode` is read only when `flags` create a
/// file.
///
/// # Safety
///
/// `path` must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_openat(
    dirfd: c_int,
    path: *const c_char,
    flags: c_int,
    mode: mode_t,
) -> c_int {
    let saved = SavedErrno::capture();
    if path.is_null() {
        set_errno(EINVAL);
        return -1;
    }
    // SAFETY: checked non-null; NUL-terminated per contract.
    let path = unsafe { CStr::from_ptr(path) };
    fd_outcome(saved, open_at(dirfd, path, flags, Some(mode)))
}

/// Interruption-safe `open`.
///
/// # Safety
///
/// `path` must be null or NUL-terminated.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_open(path: *const c_char, flags: c_int, mode: mode_t) -> c_int {
    // SAFETY: forwarded caller guarantee.
    unsafe { mio_openat(libc::AT_FDCWD, path, flags, mode) }
}

#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::errno_abi::get_errno;

    #[test]
    fn error_after_full_chunk_reports_zero() {
        let mut fds = [0; 2];
        // SAFETY: `fds` has room for two descriptors.
        assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
        let [rfd, wfd] = fds;
        // SAFETY: both ends are open; the read end becomes nonblocking.
        unsafe {
            let fl = libc::fcntl(rfd, libc::F_GETFL);
            assert_eq!(libc::fcntl(rfd, libc::F_SETFL, fl | libc::O_NONBLOCK), 0);
            assert_eq!(libc::write(wfd, b"abcd".as_ptr().cast(), 4), 4);
        }

        let mut buf = [0u8; 8];
        set_errno(libc::ERANGE);
        let n = read_outcome(SavedErrno::capture(), read_bytes_chunked(rfd, &mut buf, 4));
        assert_eq!(n, 0);
        assert_eq!(get_errno(), libc::EAGAIN);
        assert_eq!(&buf[..4], b"abcd");

        // SAFETY: both ends were opened above.
        unsafe {
            libc::close(rfd);
            libc::close(wfd);
        }
    }
}
