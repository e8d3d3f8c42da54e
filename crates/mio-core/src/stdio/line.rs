//! Character, bounded-line and delimiter readers over a [`ByteSource`].
//!
//! All three absorb interruptions one byte at a time, so an interrupted
//! read never loses or duplicates input.

use super::ByteSource;
use super::buffer::{GrowableBuffer, next_capacity};
use crate::errno::IoError;
use crate::retry::retry_on_eintr;

/// Reads one byte, retrying interrupted reads.
///
/// `Ok(None)` is genuine end of input.
pub fn read_char<S: ByteSource + ?Sized>(source: &mut S) -> Result<Option<u8>, IoError> {
    retry_on_eintr("getc", || source.next_byte())
}

/// `fgets` semantics over a fixed buffer.
///
/// Stores at most `buf.len() - 1` bytes, stopping after a newline or at end
/// of input, and NUL-terminates. Returns the number of data bytes stored.
///
/// - `buf.len() == 0` → `Err(InvalidArgument)`.
/// - `buf.len() == 1` → empty string, nothing read.
/// - End of input before any byte → `Ok(None)`.
/// - A real error ends the read with `Err`, even after partial progress; the
///   stored bytes are left unterminated.
pub fn read_line_bounded<S: ByteSource + ?Sized>(
    buf: &mut [u8],
    source: &mut S,
) -> Result<Option<usize>, IoError> {
    let Some(max) = buf.len().checked_sub(1) else {
        return Err(IoError::InvalidArgument);
    };

    let mut stored = 0usize;
    while stored < max {
        let Some(byte) = read_char(source)? else {
            break;
        };
        buf[stored] = byte;
        stored += 1;
        if byte == b'\n' {
            break;
        }
    }

    if stored == 0 && max > 0 {
        return Ok(None);
    }
    buf[stored] = 0;
    Ok(Some(stored))
}

/// `getdelim` semantics over a growable buffer.
///
/// Appends bytes until `delim` has been stored or input ends, growing `buf`
/// with [`next_capacity`] so one byte always stays free for the terminator.
/// Returns the number of data bytes written; `0` means input was already
/// exhausted.
///
/// On error the buffer keeps whatever was appended and stays owned by the
/// caller; it is not terminated.
pub fn read_until_delimiter<B, S>(buf: &mut B, delim: u8, source: &mut S) -> Result<usize, IoError>
where
    B: GrowableBuffer + ?Sized,
    S: ByteSource + ?Sized,
{
    let mut written = 0usize;
    loop {
        if written + 1 >= buf.capacity() {
            let grown = next_capacity(buf.capacity(), buf.limit())?;
            buf.grow_to(grown)?;
        }

        let Some(byte) = read_char(source)? else {
            break;
        };
        buf.put(written, byte);
        written += 1;
        if byte == delim {
            break;
        }
    }

    buf.terminate(written);
    Ok(written)
}

/// [`read_until_delimiter`] with `\n` as the delimiter.
pub fn read_line_dynamic<B, S>(buf: &mut B, source: &mut S) -> Result<usize, IoError>
where
    B: GrowableBuffer + ?Sized,
    S: ByteSource + ?Sized,
{
    read_until_delimiter(buf, b'\n', source)
}
