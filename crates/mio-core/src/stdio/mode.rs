//! `fopen` mode strings.
//!
//! The leading character selects the access pattern (`r`, `w`, `a`); the
//! modifiers that follow are `+` (read and write), `b` (no-op), `e`
//! (close-on-exec) and `x` (exclusive create). Other trailing characters are
//! ignored, as host C libraries do.

/// Decoded mode string.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct OpenFlags {
    pub readable: bool,
    pub writable: bool,
    pub append: bool,
    pub truncate: bool,
    pub create: bool,
    pub exclusive: bool,
    pub cloexec: bool,
}

/// Parses an `fopen` mode string.
///
/// Returns `None` when the leading character is not `r`, `w` or `a`.
pub fn parse_mode(mode: &[u8]) -> Option<OpenFlags> {
    let (&first, modifiers) = mode.split_first()?;
    let mut flags = match first {
        b'r' => OpenFlags {
            readable: true,
            ..Default::default()
        },
        b'w' => OpenFlags {
            writable: true,
            truncate: true,
            create: true,
            ..Default::default()
        },
        b'a' => OpenFlags {
            writable: true,
            append: true,
            create: true,
            ..Default::default()
        },
        _ => return None,
    };

    for &modifier in modifiers {
        match modifier {
            b'+' => {
                flags.readable = true;
                flags.writable = true;
            }
            b'e' => flags.cloexec = true,
            b'x' => flags.exclusive = true,
            // `,ccs=` and everything after it belong to the host's wide
            // orientation handling.
            b',' => break,
            _ => {}
        }
    }
    Some(flags)
}

/// Converts decoded flags to `open(2)` flags.
pub fn flags_to_oflags(flags: &OpenFlags) -> i32 {
    let mut oflags = match (flags.readable, flags.writable) {
        (true, true) => libc::O_RDWR,
        (false, true) => libc::O_WRONLY,
        _ => libc::O_RDONLY,
    };
    if flags.create {
        oflags |= libc::O_CREAT;
        if flags.exclusive {
            oflags |= libc::O_EXCL;
        }
    }
    if flags.truncate {
        oflags |= libc::O_TRUNC;
    }
    if flags.append {
        oflags |= libc::O_APPEND;
    }
    if flags.cloexec {
        oflags |= libc::O_CLOEXEC;
    }
    oflags
}
