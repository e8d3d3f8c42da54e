//! Stream-level reading: single characters, bounded lines, delimiter reads.
//!
//! Architecture:
//! - `ByteSource`: one-byte-at-a-time input with distinct end-of-input,
//!   interruption and error outcomes (host `FILE*` in mio-abi, any
//!   `std::io::Read` through [`ReadSource`])
//! - `buffer`: growth policy and the growable line buffer
//! - `line`: character, bounded-line and delimiter readers
//! - `mode`: `fopen` mode-string parsing

pub mod buffer;
pub mod line;
pub mod mode;

pub use buffer::{GrowableBuffer, LINEAR_STEP, LineBuffer, PLATFORM_LIMIT, next_capacity};
pub use line::{read_char, read_line_bounded, read_line_dynamic, read_until_delimiter};
pub use mode::{OpenFlags, flags_to_oflags, parse_mode};

use std::io::{ErrorKind, Read};

use crate::errno::{EINTR, IoError};

/// One-byte-at-a-time input.
pub trait ByteSource {
    /// Reads the next byte.
    ///
    /// `Ok(None)` is genuine end of input. `Err(IoError::Os(EINTR))` means
    /// the read was interrupted before consuming anything and may be
    /// repeated. Any other error is a real failure.
    fn next_byte(&mut self) -> Result<Option<u8>, IoError>;
}

impl<S: ByteSource + ?Sized> ByteSource for &mut S {
    fn next_byte(&mut self) -> Result<Option<u8>, IoError> {
        (**self).next_byte()
    }
}

/// Adapts any [`Read`] implementation into a [`ByteSource`].
///
/// Wrap the reader in a `BufReader` first; every byte is a separate `read`.
#[derive(Debug)]
pub struct ReadSource<R> {
    inner: R,
}

impl<R: Read> ReadSource<R> {
    pub fn new(inner: R) -> Self {
        Self { inner }
    }

    pub fn get_ref(&self) -> &R {
        &self.inner
    }

    pub fn into_inner(self) -> R {
        self.inner
    }
}

impl<R: Read> ByteSource for ReadSource<R> {
    fn next_byte(&mut self) -> Result<Option<u8>, IoError> {
        let mut byte = [0u8; 1];
        match self.inner.read(&mut byte) {
            Ok(0) => Ok(None),
            Ok(_) => Ok(Some(byte[0])),
            Err(err) if err.kind() == ErrorKind::Interrupted => Err(IoError::Os(EINTR)),
            Err(err) => Err(err.into()),
        }
    }
}
