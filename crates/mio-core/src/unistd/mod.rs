//! Descriptor-level helpers: the bounded raw read loop and `open` flag rules.

use crate::errno::IoError;
use crate::retry::retry_on_eintr;

/// Largest count handed to a single `read(2)`.
///
/// Keeps the request representable as `ssize_t`.
pub const MAX_READ_CHUNK: usize = isize::MAX as usize;

/// Permission bits used when a mode string creates a file.
pub const DEFAULT_CREATE_MODE: libc::mode_t = 0o666;

/// Reads up to `buf.len()` bytes through `read`.
///
/// Interrupted reads are retried. The loop keeps reading while every read
/// fills its request and stops at the first short read: "at most N, but no
/// more than is available now". A real error fails the whole call, even
/// after earlier reads transferred data.
pub fn read_available<F>(buf: &mut [u8], read: F) -> Result<usize, IoError>
where
    F: FnMut(&mut [u8]) -> Result<usize, IoError>,
{
    read_available_chunked(buf, MAX_READ_CHUNK, read)
}

/// [`read_available`] with requests capped at `max_chunk` bytes.
pub fn read_available_chunked<F>(
    buf: &mut [u8],
    max_chunk: usize,
    mut read: F,
) -> Result<usize, IoError>
where
    F: FnMut(&mut [u8]) -> Result<usize, IoError>,
{
    let max_chunk = max_chunk.max(1);
    let mut total = 0usize;
    while total < buf.len() {
        let want = (buf.len() - total).min(max_chunk);
        let chunk = &mut buf[total..total + want];
        let got = retry_on_eintr("read", || read(&mut *chunk))?.min(want);
        total += got;
        if got < want {
            break;
        }
    }
    Ok(total)
}

/// Whether `open(2)` consumes its mode argument for these flags.
pub fn requires_mode(flags: i32) -> bool {
    if flags & libc::O_CREAT != 0 {
        return true;
    }
    #[cfg(any(target_os = "linux", target_os = "android"))]
    if flags & libc::O_TMPFILE == libc::O_TMPFILE {
        return true;
    }
    false
}
