//! Environment-driven configuration.
//!
//! Resolved once per process on first use and cached. Unset or unusable
//! values fall back to the defaults; configuration never makes a call fail.
//!
//! | Variable         | Meaning |
//! |------------------|---------|
//! | `MIO_LINE_LIMIT` | Upper bound in bytes on the buffer grown by `mio_getdelim` / `mio_getline`. Accepts decimal, `0x` hex, and `k`/`m`/`g` suffixes. `0` means no bound beyond the platform's. |

use std::sync::OnceLock;

use crate::stdio::buffer::PLATFORM_LIMIT;

/// Name of the line-limit variable.
pub const LINE_LIMIT_ENV: &str = "MIO_LINE_LIMIT";

/// Resolved configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IoConfig {
    /// Capacity ceiling for growable line buffers.
    pub line_limit: usize,
}

impl Default for IoConfig {
    fn default() -> Self {
        Self {
            line_limit: PLATFORM_LIMIT,
        }
    }
}

impl IoConfig {
    /// Reads the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolves configuration through an arbitrary lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        if let Some(raw) = lookup(LINE_LIMIT_ENV) {
            match parse_size(&raw) {
                Some(0) => {}
                Some(limit) => config.line_limit = limit,
                None => {
                    tracing::debug!(value = %raw, "ignoring unparsable {LINE_LIMIT_ENV}");
                }
            }
        }
        config
    }
}

/// Parses a byte size such as `4096`, `0x1000`, `64k` or `2M`.
pub fn parse_size(raw: &str) -> Option<usize> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }
    if let Some(hex) = trimmed
        .strip_prefix("0x")
        .or_else(|| trimmed.strip_prefix("0X"))
    {
        return usize::from_str_radix(hex, 16).ok();
    }

    let (digits, shift) = match trimmed.as_bytes()[trimmed.len() - 1].to_ascii_lowercase() {
        b'k' => (&trimmed[..trimmed.len() - 1], 10),
        b'm' => (&trimmed[..trimmed.len() - 1], 20),
        b'g' => (&trimmed[..trimmed.len() - 1], 30),
        _ => (trimmed, 0),
    };
    let value: usize = digits.parse().ok()?;
    value.checked_mul(1usize.checked_shl(shift)?)
}

/// Process-wide configuration, resolved on first call.
pub fn current() -> &'static IoConfig {
    static CONFIG: OnceLock<IoConfig> = OnceLock::new();
    CONFIG.get_or_init(|| {
        let config = IoConfig::from_env();
        tracing::debug!(line_limit = config.line_limit, "mio configuration resolved");
        config
    })
}

/// Shorthand for `current().line_limit`.
pub fn line_limit() -> usize {
    current().line_limit
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with(value: &str) -> IoConfig {
        IoConfig::from_lookup(|key| (key == LINE_LIMIT_ENV).then(|| value.to_string()))
    }

    #[test]
    fn parse_plain_and_suffixed_sizes() {
        assert_eq!(parse_size("4096"), Some(4096));
        assert_eq!(parse_size(" 12 "), Some(12));
        assert_eq!(parse_size("0x100"), Some(256));
        assert_eq!(parse_size("64k"), Some(64 * 1024));
        assert_eq!(parse_size("2M"), Some(2 * 1024 * 1024));
        assert_eq!(parse_size("1g"), Some(1 << 30));
    }

    #[test]
    fn parse_rejects_garbage() {
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("k"), None);
        assert_eq!(parse_size("-5"), None);
        assert_eq!(parse_size("12q"), None);
        assert_eq!(parse_size("0xzz"), None);
        assert_eq!(parse_size(&format!("{}g", usize::MAX)), None);
    }

    #[test]
    fn defaults_when_unset_or_invalid() {
        assert_eq!(IoConfig::from_lookup(|_| None), IoConfig::default());
        assert_eq!(with("nonsense").line_limit, PLATFORM_LIMIT);
        assert_eq!(with("0").line_limit, PLATFORM_LIMIT);
    }

    #[test]
    fn explicit_limit_is_used() {
        assert_eq!(with("1m").line_limit, 1 << 20);
    }
}
