//! Growable line buffer and its growth policy.
//!
//! Capacity doubles while small, then grows by [`LINEAR_STEP`] once doubling
//! would pass a quarter of the limit, and finally saturates at the limit.
//! Growth past `limit - 2` is refused with [`IoError::OutOfMemory`].

use crate::errno::IoError;

/// Largest capacity the platform could ever hand out.
pub const PLATFORM_LIMIT: usize = usize::MAX;

/// Increment used once doubling is no longer affordable.
pub const LINEAR_STEP: usize = 64;

/// Capacity of the first allocation.
const INITIAL_CAPACITY: usize = 2;

/// Returns the capacity to grow to from `current` under `limit`.
pub fn next_capacity(current: usize, limit: usize) -> Result<usize, IoError> {
    if current >= limit.saturating_sub(2) {
        tracing::debug!(current, limit, "line buffer growth refused");
        return Err(IoError::OutOfMemory);
    }
    let next = if current == 0 {
        INITIAL_CAPACITY
    } else if current < limit / 4 {
        current * 2
    } else if current < limit.saturating_sub(LINEAR_STEP) {
        current + LINEAR_STEP
    } else {
        limit
    };
    if current >= limit / 4 {
        tracing::debug!(current, next, limit, "line buffer growing past doubling regime");
    }
    Ok(next)
}

/// Storage a delimiter read can append into.
///
/// Capacity counts every addressable byte, including the slot reserved for
/// the terminating NUL.
pub trait GrowableBuffer {
    fn capacity(&self) -> usize;

    /// Upper bound on [`capacity`](Self::capacity).
    fn limit(&self) -> usize {
        PLATFORM_LIMIT
    }

    /// Resizes to exactly `capacity` bytes, keeping existing contents.
    fn grow_to(&mut self, capacity: usize) -> Result<(), IoError>;

    /// Stores `byte` at `index`; `index < capacity()`.
    fn put(&mut self, index: usize, byte: u8);

    /// Writes the terminator after `len` data bytes.
    fn terminate(&mut self, len: usize) {
        self.put(len, 0);
    }
}

/// Heap line buffer owned by Rust callers.
///
/// Reusing one buffer across reads keeps its capacity, the way a C caller
/// keeps passing the same `char *` to `getline`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineBuffer {
    bytes: Vec<u8>,
    len: usize,
    limit: usize,
}

impl Default for LineBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl LineBuffer {
    pub fn new() -> Self {
        Self::with_limit(PLATFORM_LIMIT)
    }

    /// Buffer whose capacity never exceeds `limit`.
    pub fn with_limit(limit: usize) -> Self {
        Self {
            bytes: Vec::new(),
            len: 0,
            limit,
        }
    }

    /// Data bytes of the last successful read, without the terminator.
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..self.len]
    }

    /// Data bytes plus the terminating NUL, once anything was allocated.
    pub fn as_bytes_with_nul(&self) -> &[u8] {
        let end = (self.len + 1).min(self.bytes.len());
        &self.bytes[..end]
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn clear(&mut self) {
        self.len = 0;
    }

    pub fn into_vec(mut self) -> Vec<u8> {
        self.bytes.truncate(self.len);
        self.bytes
    }
}

impl GrowableBuffer for LineBuffer {
    fn capacity(&self) -> usize {
        self.bytes.len()
    }

    fn limit(&self) -> usize {
        self.limit
    }

    fn grow_to(&mut self, capacity: usize) -> Result<(), IoError> {
        let additional = capacity.saturating_sub(self.bytes.len());
        self.bytes
            .try_reserve_exact(additional)
            .map_err(|_| IoError::OutOfMemory)?;
        self.bytes.resize(capacity, 0);
        Ok(())
    }

    fn put(&mut self, index: usize, byte: u8) {
        self.bytes[index] = byte;
    }

    fn terminate(&mut self, len: usize) {
        self.bytes[len] = 0;
        self.len = len;
    }
}
