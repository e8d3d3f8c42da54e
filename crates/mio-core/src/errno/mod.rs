//! Error numbers and the typed error returned by every wrapper.
//!
//! Constants mirror the host `<errno.h>` values so that codes read back from
//! the C library compare equal. [`IoError`] is the `Result` error type of
//! the safe API; the C entry points translate it back into `errno`.

/// Well-known errno constants.
pub const EPERM: i32 = libc::EPERM;
pub const ENOENT: i32 = libc::ENOENT;
pub const EINTR: i32 = libc::EINTR;
pub const EIO: i32 = libc::EIO;
pub const EBADF: i32 = libc::EBADF;
pub const EAGAIN: i32 = libc::EAGAIN;
pub const ENOMEM: i32 = libc::ENOMEM;
pub const EACCES: i32 = libc::EACCES;
pub const EFAULT: i32 = libc::EFAULT;
pub const EEXIST: i32 = libc::EEXIST;
pub const ENOTDIR: i32 = libc::ENOTDIR;
pub const EISDIR: i32 = libc::EISDIR;
pub const EINVAL: i32 = libc::EINVAL;
pub const ENFILE: i32 = libc::ENFILE;
pub const EMFILE: i32 = libc::EMFILE;
pub const ENOSPC: i32 = libc::ENOSPC;
pub const EPIPE: i32 = libc::EPIPE;
pub const ENAMETOOLONG: i32 = libc::ENAMETOOLONG;
pub const ELOOP: i32 = libc::ELOOP;
pub const EOVERFLOW: i32 = libc::EOVERFLOW;

/// Returns the error message string for the given errno value.
///
/// Static table covering the codes the wrappers can produce; anything else
/// maps to a generic message.
pub fn strerror_message(errnum: i32) -> &'static str {
    match errnum {
        0 => "Success",
        EPERM => "Operation not permitted",
        ENOENT => "No such file or directory",
        EINTR => "Interrupted system call",
        EIO => "Input/output error",
        EBADF => "Bad file descriptor",
        EAGAIN => "Resource temporarily unavailable",
        ENOMEM => "Cannot allocate memory",
        EACCES => "Permission denied",
        EFAULT => "Bad address",
        EEXIST => "File exists",
        ENOTDIR => "Not a directory",
        EISDIR => "Is a directory",
        EINVAL => "Invalid argument",
        ENFILE => "Too many open files in system",
        EMFILE => "Too many open files",
        ENOSPC => "No space left on device",
        EPIPE => "Broken pipe",
        ENAMETOOLONG => "File name too long",
        ELOOP => "Too many levels of symbolic links",
        EOVERFLOW => "Value too large for defined data type",
        _ => "Unknown error",
    }
}

fn os_message(errnum: &i32) -> &'static str {
    strerror_message(*errnum)
}

/// Failure of a wrapped I/O operation.
///
/// Pure interruptions never reach the caller as an `IoError`: the retry loop
/// absorbs `Os(EINTR)` before it gets that far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IoError {
    /// Null required pointer, malformed mode string, zero-sized buffer.
    #[error("invalid argument")]
    InvalidArgument,
    /// Buffer growth would pass the configured limit, or allocation failed.
    #[error("cannot allocate memory")]
    OutOfMemory,
    /// Any other code reported by the underlying primitive.
    #[error("{} (os error {})", os_message(.0), .0)]
    Os(i32),
}

impl IoError {
    /// Builds an error from a raw errno value.
    ///
    /// `EINVAL` and `ENOMEM` fold into their dedicated variants so that
    /// errors from the host and errors raised locally compare equal.
    pub fn from_errno(errnum: i32) -> Self {
        match errnum {
            EINVAL => Self::InvalidArgument,
            ENOMEM => Self::OutOfMemory,
            other => Self::Os(other),
        }
    }

    /// The errno value a C caller observes for this error.
    pub fn errno(self) -> i32 {
        match self {
            Self::InvalidArgument => EINVAL,
            Self::OutOfMemory => ENOMEM,
            Self::Os(errnum) => errnum,
        }
    }

    /// True for the transient "interrupted before any progress" outcome.
    pub fn is_interrupted(self) -> bool {
        self == Self::Os(EINTR)
    }
}

impl From<IoError> for std::io::Error {
    fn from(err: IoError) -> Self {
        std::io::Error::from_raw_os_error(err.errno())
    }
}

impl From<std::io::Error> for IoError {
    fn from(err: std::io::Error) -> Self {
        match err.raw_os_error() {
            Some(errnum) => Self::from_errno(errnum),
            None if err.kind() == std::io::ErrorKind::Interrupted => Self::Os(EINTR),
            None if err.kind() == std::io::ErrorKind::OutOfMemory => Self::OutOfMemory,
            None if err.kind() == std::io::ErrorKind::InvalidInput => Self::InvalidArgument,
            None => Self::Os(EIO),
        }
    }
}
