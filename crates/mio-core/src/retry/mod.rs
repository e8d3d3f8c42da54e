//! The retry loop every wrapper runs its primitive through.
//!
//! A primitive reports "interrupted before any progress" as
//! `Err(IoError::Os(EINTR))`. That outcome is discarded and the primitive is
//! invoked again; every other outcome is returned unchanged.

use crate::errno::{EINTR, IoError};

/// Call `f` until it no longer fails with `EINTR`.
///
/// `op` names the wrapped primitive in trace events.
#[inline]
pub fn retry_on_eintr<T, F>(op: &'static str, mut f: F) -> Result<T, IoError>
where
    F: FnMut() -> Result<T, IoError>,
{
    let mut interruptions: u64 = 0;
    loop {
        match f() {
            Err(IoError::Os(EINTR)) => {
                interruptions = interruptions.saturating_add(1);
                tracing::trace!(op, interruptions, "interrupted before progress, retrying");
            }
            result => return result,
        }
    }
}
