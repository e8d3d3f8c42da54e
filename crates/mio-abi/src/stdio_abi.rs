//! ABI layer for interruption-safe `<stdio.h>` reads and stream opens.
//!
//! Provides `mio_getc`, `mio_getc_unlocked`, `mio_fgets`, `mio_getdelim`,
//! `mio_getline`, `mio_fopen`, `mio_fdopen`, `mio_freopen` and `mio_fopenat`
//! over the host C library's `FILE*` streams.
//!
//! Architecture: the host stream is exposed to mio-core as a `ByteSource`
//! (`UnlockedStream`, or `StreamLock` which also holds the stream lock for
//! its lifetime), and caller-owned `malloc` buffers as a `GrowableBuffer`
//! (`MallocBuffer`). The reading logic itself lives in `mio_core::stdio`.
//! Each entry point has a safe `Result`-returning counterpart used by Rust
//! callers and by the entry point itself.

use std::ffi::{CStr, c_char, c_int};
use std::os::fd::{AsRawFd, IntoRawFd, RawFd};
use std::ptr::{self, NonNull};

use libc::FILE;
use mio_core::errno::{EBADF, EINTR, EINVAL, EIO};
use mio_core::stdio::{self as stdio_core, ByteSource, GrowableBuffer};
use mio_core::unistd::{DEFAULT_CREATE_MODE, MAX_READ_CHUNK};
use mio_core::{IoError, config, retry_on_eintr};

use crate::errno_abi::{SavedErrno, get_errno, last_error, set_errno};
use crate::unistd_abi::open_at;

unsafe extern "C" {
    fn flockfile(stream: *mut FILE);
    fn funlockfile(stream: *mut FILE);
    fn getc_unlocked(stream: *mut FILE) -> c_int;
    fn clearerr(stream: *mut FILE);
}

// ---------------------------------------------------------------------------
// Host stream adapters
// ---------------------------------------------------------------------------

/// Byte source over a stream whose lock the calling thread already holds.
#[derive(Debug)]
pub struct UnlockedStream {
    stream: NonNull<FILE>,
}

impl UnlockedStream {
    /// # Safety
    ///
    /// `stream` must be open for reading for the lifetime of the source, and
    /// the calling thread must hold its lock (or be its only user).
    pub unsafe fn new(stream: NonNull<FILE>) -> Self {
        Self { stream }
    }

    pub fn as_ptr(&self) -> *mut FILE {
        self.stream.as_ptr()
    }
}

impl ByteSource for UnlockedStream {
    fn next_byte(&mut self) -> Result<Option<u8>, IoError> {
        let stream = self.stream.as_ptr();
        // SAFETY: `new` guarantees an open stream owned by this thread.
        let had_error = unsafe { libc::ferror(stream) } != 0;
        set_errno(0);
        // SAFETY: as above.
        let c = unsafe { getc_unlocked(stream) };
        if c != libc::EOF {
            return Ok(Some(c as u8));
        }

        let errnum = get_errno();
        if errnum == EINTR {
            // The host flags the stream as failed on EINTR. The retried read
            // must not leave that flag behind.
            if !had_error {
                // SAFETY: as above.
                unsafe { clearerr(stream) };
            }
            return Err(IoError::Os(EINTR));
        }
        // SAFETY: as above.
        if unsafe { libc::feof(stream) } != 0 {
            return Ok(None);
        }
        match errnum {
            // SAFETY: as above.
            0 if unsafe { libc::ferror(stream) } != 0 => Err(IoError::Os(EIO)),
            0 => Ok(None),
            other => Err(IoError::from_errno(other)),
        }
    }
}

/// Holds a stream's lock; released on drop, early returns included.
#[derive(Debug)]
pub struct StreamLock {
    inner: UnlockedStream,
}

impl StreamLock {
    /// # Safety
    ///
    /// `stream` must be open for reading and outlive the guard.
    pub unsafe fn acquire(stream: NonNull<FILE>) -> Self {
        // SAFETY: caller guarantees an open stream.
        unsafe { flockfile(stream.as_ptr()) };
        Self {
            // SAFETY: the lock is now held by this thread.
            inner: unsafe { UnlockedStream::new(stream) },
        }
    }
}

impl Drop for StreamLock {
    fn drop(&mut self) {
        // SAFETY: acquired in `acquire` on this thread.
        unsafe { funlockfile(self.inner.as_ptr()) };
    }
}

impl ByteSource for StreamLock {
    fn next_byte(&mut self) -> Result<Option<u8>, IoError> {
        self.inner.next_byte()
    }
}

/// Caller-owned `malloc` buffer described by a `char **` / `size_t *` pair.
///
/// Growth goes through `realloc` and is written back through both
/// pointers immediately, so a failed read leaves the caller with a valid
/// allocation to free.
#[derive(Debug)]
pub struct MallocBuffer<'a> {
    ptr: &'a mut *mut c_char,
    capacity: &'a mut usize,
    limit: usize,
}

impl<'a> MallocBuffer<'a> {
    /// A null `*ptr` resets `*capacity` to zero.
    ///
    /// # Safety
    ///
    /// `*ptr` must be null or a live `malloc`-family allocation of at least
    /// `*capacity` bytes.
    pub unsafe fn new(ptr: &'a mut *mut c_char, capacity: &'a mut usize, limit: usize) -> Self {
        if (*ptr).is_null() {
            *capacity = 0;
        }
        Self {
            ptr,
            capacity,
            limit,
        }
    }

    pub fn as_ptr(&self) -> *mut c_char {
        *self.ptr
    }
}

impl GrowableBuffer for MallocBuffer<'_> {
    fn capacity(&self) -> usize {
        *self.capacity
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn grow_to(&mut self, capacity: usize) -> Result<(), IoError> {
        // SAFETY: `new` requires a null or realloc-compatible pointer.
        let grown = unsafe { libc::realloc((*self.ptr).cast(), capacity) };
        if grown.is_null() {
            return Err(IoError::OutOfMemory);
        }
        *self.ptr = grown.cast();
        *self.capacity = capacity;
        Ok(())
    }

    fn put(&mut self, index: usize, byte: u8) {
        debug_assert!(index < *self.capacity);
        // SAFETY: readers stay below capacity, which `grow_to` allocated.
        unsafe { *(*self.ptr).add(index) = byte as c_char };
    }
}

// ---------------------------------------------------------------------------
// Safe Rust surface
// ---------------------------------------------------------------------------

/// Reads one byte, holding the stream lock for the call.
///
/// # Safety
///
/// `stream` must be an open, readable stream.
pub unsafe fn read_char(stream: NonNull<FILE>) -> Result<Option<u8>, IoError> {
    // SAFETY: forwarded caller guarantee.
    let mut lock = unsafe { StreamLock::acquire(stream) };
    stdio_core::read_char(&mut lock)
}

/// Reads one byte from a stream the caller has already locked.
///
/// # Safety
///
/// `stream` must be an open, readable stream locked by this thread.
pub unsafe fn read_char_locked(stream: NonNull<FILE>) -> Result<Option<u8>, IoError> {
    // SAFETY: forwarded caller guarantee.
    let mut source = unsafe { UnlockedStream::new(stream) };
    stdio_core::read_char(&mut source)
}

/// Bounded line read; see [`mio_core::stdio::read_line_bounded`].
///
/// # Safety
///
/// `stream` must be an open, readable stream.
pub unsafe fn read_line_bounded(
    buf: &mut [u8],
    stream: NonNull<FILE>,
) -> Result<Option<usize>, IoError> {
    // SAFETY: forwarded caller guarantee.
    let mut lock = unsafe { StreamLock::acquire(stream) };
    stdio_core::read_line_bounded(buf, &mut lock)
}

/// Delimiter read; see [`mio_core::stdio::read_until_delimiter`].
///
/// # Safety
///
/// `stream` must be an open, readable stream.
pub unsafe fn read_until_delimiter<B: GrowableBuffer + ?Sized>(
    buf: &mut B,
    delim: u8,
    stream: NonNull<FILE>,
) -> Result<usize, IoError> {
    // SAFETY: forwarded caller guarantee.
    let mut lock = unsafe { StreamLock::acquire(stream) };
    stdio_core::read_until_delimiter(buf, delim, &mut lock)
}

/// [`read_until_delimiter`] with `\n`.
///
/// # Safety
///
/// `stream` must be an open, readable stream.
pub unsafe fn read_line_dynamic<B: GrowableBuffer + ?Sized>(
    buf: &mut B,
    stream: NonNull<FILE>,
) -> Result<usize, IoError> {
    // SAFETY: forwarded caller guarantee.
    unsafe { read_until_delimiter(buf, b'\n', stream) }
}

fn stream_result(stream: *mut FILE) -> Result<NonNull<FILE>, IoError> {
    NonNull::new(stream).ok_or_else(last_error)
}

/// `fopen`, retried while interrupted.
pub fn stream_open(path: &CStr, mode: &CStr) -> Result<NonNull<FILE>, IoError> {
    retry_on_eintr("fopen", || {
        set_errno(0);
        // SAFETY: both arguments are NUL-terminated.
        stream_result(unsafe { libc::fopen(path.as_ptr(), mode.as_ptr()) })
    })
}

/// `fdopen`, retried while interrupted.
///
/// # Safety
///
/// On success the returned stream owns `fd`; the caller must not close it
/// separately.
pub unsafe fn stream_open_fd(fd: RawFd, mode: &CStr) -> Result<NonNull<FILE>, IoError> {
    retry_on_eintr("fdopen", || {
        set_errno(0);
        // SAFETY: `mode` is NUL-terminated; ownership per caller contract.
        stream_result(unsafe { libc::fdopen(fd, mode.as_ptr()) })
    })
}

/// `freopen`, retried while interrupted. `None` changes only the mode.
///
/// # Safety
///
/// `stream` must be an open stream. On failure it is closed, as with
/// `freopen`.
pub unsafe fn stream_reopen(
    path: Option<&CStr>,
    mode: &CStr,
    stream: NonNull<FILE>,
) -> Result<NonNull<FILE>, IoError> {
    let path = path.map_or(ptr::null(), CStr::as_ptr);
    retry_on_eintr("freopen", || {
        set_errno(0);
        // SAFETY: strings are NUL-terminated (or null path); stream per caller.
        stream_result(unsafe { libc::freopen(path, mode.as_ptr(), stream.as_ptr()) })
    })
}

/// Opens `path` relative to `dirfd` with an `fopen` mode string.
///
/// The descriptor is closed again if no stream can be attached to it.
pub fn stream_open_at(dirfd: RawFd, path: &CStr, mode: &CStr) -> Result<NonNull<FILE>, IoError> {
    stream_open_at_with(dirfd, path, mode, |fd, mode| {
        // SAFETY: `fd` was opened by this call and is handed over only on
        // success.
        unsafe { stream_open_fd(fd, mode) }
    })
}

fn stream_open_at_with<F>(
    dirfd: RawFd,
    path: &CStr,
    mode: &CStr,
    associate: F,
) -> Result<NonNull<FILE>, IoError>
where
    F: FnOnce(RawFd, &CStr) -> Result<NonNull<FILE>, IoError>,
{
    let flags = stdio_core::parse_mode(mode.to_bytes()).ok_or(IoError::InvalidArgument)?;
    let fd = open_at(
        dirfd,
        path,
        stdio_core::flags_to_oflags(&flags),
        Some(DEFAULT_CREATE_MODE),
    )?;

    match associate(fd.as_raw_fd(), mode) {
        Ok(stream) => {
            let _ = fd.into_raw_fd();
            Ok(stream)
        }
        Err(err) => {
            tracing::debug!(
                fd = fd.as_raw_fd(),
                errno = err.errno(),
                "closing descriptor after failed stream association"
            );
            drop(fd);
            Err(err)
        }
    }
}

// ---------------------------------------------------------------------------
// mio_getc / mio_getc_unlocked
// ---------------------------------------------------------------------------

fn char_outcome(saved: SavedErrno, result: Result<Option<u8>, IoError>) -> c_int {
    match saved.settle(result) {
        Some(Some(byte)) => c_int::from(byte),
        _ => libc::EOF,
    }
}

/// Interruption-safe `fgetc`.
///
/// # Safety
///
/// `stream` must be null or an open, readable stream.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_getc(stream: *mut FILE) -> c_int {
    let saved = SavedErrno::capture();
    let Some(stream) = NonNull::new(stream) else {
        set_errno(EBADF);
        return libc::EOF;
    };
    // SAFETY: caller passes an open stream.
    char_outcome(saved, unsafe { read_char(stream) })
}

/// Interruption-safe `getc_unlocked`, for callers already holding the lock.
///
/// # Safety
///
/// `stream` must be null or an open, readable stream locked by this thread.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_getc_unlocked(stream: *mut FILE) -> c_int {
    let saved = SavedErrno::capture();
    let Some(stream) = NonNull::new(stream) else {
        set_errno(EBADF);
        return libc::EOF;
    };
    // SAFETY: caller passes an open stream it has locked.
    char_outcome(saved, unsafe { read_char_locked(stream) })
}

// ---------------------------------------------------------------------------
// mio_fgets
// ---------------------------------------------------------------------------

/// Interruption-safe `fgets`.
///
/// # Safety
///
/// `buf` must be valid for writes of `size` bytes; `stream` must be null or
/// an open, readable stream.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_fgets(buf: *mut c_char, size: usize, stream: *mut FILE) -> *mut c_char {
    let saved = SavedErrno::capture();
    if buf.is_null() || size == 0 {
        set_errno(EINVAL);
        return ptr::null_mut();
    }
    if size == 1 {
        // SAFETY: `buf` holds at least one byte.
        unsafe { *buf = 0 };
        return buf;
    }
    let Some(stream) = NonNull::new(stream) else {
        set_errno(EBADF);
        return ptr::null_mut();
    };

    // No real allocation exceeds isize::MAX bytes.
    let len = size.min(MAX_READ_CHUNK);
    // SAFETY: caller guarantees `size` writable bytes at `buf`.
    let dst = unsafe { std::slice::from_raw_parts_mut(buf.cast::<u8>(), len) };
    // SAFETY: caller passes an open stream.
    match saved.settle(unsafe { read_line_bounded(dst, stream) }) {
        Some(Some(_)) => buf,
        _ => ptr::null_mut(),
    }
}

// ---------------------------------------------------------------------------
// mio_getdelim / mio_getline
// ---------------------------------------------------------------------------

/// Interruption-safe `getdelim`.
///
/// Returns a pointer to the terminating NUL inside `*lineptr`; the number of
/// bytes read is that pointer minus `*lineptr`. Returns NULL with `errno`
/// set on failure, leaving any partial data in `*lineptr` for the caller to
/// free.
///
/// # Safety
///
/// `lineptr` and `n` must be null or valid; `*lineptr` must be null or a
/// `malloc`-family allocation of `*n` bytes; `stream` must be null or an
/// open, readable stream.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_getdelim(
    lineptr: *mut *mut c_char,
    n: *mut usize,
    delim: c_int,
    stream: *mut FILE,
) -> *mut c_char {
    let saved = SavedErrno::capture();
    if lineptr.is_null() || n.is_null() {
        set_errno(EINVAL);
        return ptr::null_mut();
    }
    let Some(stream) = NonNull::new(stream) else {
        set_errno(EBADF);
        return ptr::null_mut();
    };

    // SAFETY: both pointers were checked non-null; allocation per contract.
    let mut buf = unsafe { MallocBuffer::new(&mut *lineptr, &mut *n, config::line_limit()) };
    // SAFETY: caller passes an open stream.
    let result = unsafe { read_until_delimiter(&mut buf, delim as u8, stream) };
    let base = buf.as_ptr();
    match saved.settle(result) {
        // SAFETY: `written < capacity`, inside the allocation.
        Some(written) => unsafe { base.add(written) },
        None => ptr::null_mut(),
    }
}

/// Interruption-safe `getline`.
///
/// # Safety
///
/// Same as [`mio_getdelim`].
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_getline(
    lineptr: *mut *mut c_char,
    n: *mut usize,
    stream: *mut FILE,
) -> *mut c_char {
    // SAFETY: forwarded caller guarantee.
    unsafe { mio_getdelim(lineptr, n, c_int::from(b'\n'), stream) }
}

// ---------------------------------------------------------------------------
// mio_fopen / mio_fdopen / mio_freopen / mio_fopenat
// ---------------------------------------------------------------------------

fn stream_outcome(saved: SavedErrno, result: Result<NonNull<FILE>, IoError>) -> *mut FILE {
    saved.settle(result).map_or(ptr::null_mut(), NonNull::as_ptr)
}

/// Interruption-safe `fopen`.
///
/// # Safety
///
/// `path` and `mode` must be null or NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_fopen(path: *const c_char, mode: *const c_char) -> *mut FILE {
    let saved = SavedErrno::capture();
    if path.is_null() || mode.is_null() {
        set_errno(EINVAL);
        return ptr::null_mut();
    }
    // SAFETY: checked non-null; NUL-terminated per contract.
    let (path, mode) = unsafe { (CStr::from_ptr(path), CStr::from_ptr(mode)) };
    stream_outcome(saved, stream_open(path, mode))
}

/// Interruption-safe `fdopen`.
///
/// # Safety
///
/// `mode` must be null or NUL-terminated. On success the stream owns `fd`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_fdopen(fd: c_int, mode: *const c_char) -> *mut FILE {
    let saved = SavedErrno::capture();
    if mode.is_null() {
        set_errno(EINVAL);
        return ptr::null_mut();
    }
    // SAFETY: checked non-null; NUL-terminated per contract.
    let mode = unsafe { CStr::from_ptr(mode) };
    // SAFETY: ownership transfer per contract.
    stream_outcome(saved, unsafe { stream_open_fd(fd, mode) })
}

/// Interruption-safe `freopen`.
///
/// # Safety
///
/// `path` must be null or NUL-terminated, `mode` NUL-terminated, `stream`
/// null or open.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_freopen(
    path: *const c_char,
    mode: *const c_char,
    stream: *mut FILE,
) -> *mut FILE {
    let saved = SavedErrno::capture();
    if mode.is_null() {
        set_errno(EINVAL);
        return ptr::null_mut();
    }
    let Some(stream) = NonNull::new(stream) else {
        set_errno(EBADF);
        return ptr::null_mut();
    };
    // SAFETY: NUL-terminated per contract.
    let path = (!path.is_null()).then(|| unsafe { CStr::from_ptr(path) });
    // SAFETY: NUL-terminated per contract.
    let mode = unsafe { CStr::from_ptr(mode) };
    // SAFETY: caller passes an open stream.
    stream_outcome(saved, unsafe { stream_reopen(path, mode, stream) })
}

/// Opens `path` relative to `dirfd` and returns a stream for it.
///
/// # Safety
///
/// `path` and `mode` must be null or NUL-terminated strings.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn mio_fopenat(
    dirfd: c_int,
    path: *const c_char,
    mode: *const c_char,
) -> *mut FILE {
    let saved = SavedErrno::capture();
    if path.is_null() || mode.is_null() {
        set_errno(EINVAL);
        return ptr::null_mut();
    }
    // SAFETY: checked non-null; NUL-terminated per contract.
    let (path, mode) = unsafe { (CStr::from_ptr(path), CStr::from_ptr(mode)) };
    stream_outcome(saved, stream_open_at(dirfd, path, mode))
}
