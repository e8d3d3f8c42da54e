//! # mio-core
//!
//! Safe Rust logic behind the `mio_*` interruption-safe I/O wrappers.
//!
//! Every wrapper runs its primitive through [`retry_on_eintr`]: an
//! interrupted call that transferred nothing is repeated, every other outcome
//! is returned unchanged. This crate holds the parts that need no OS access:
//! the retry loop, the line readers over a [`stdio::ByteSource`], the
//! growable line buffer and its growth policy, the raw read loop, mode-string
//! parsing and configuration. No `unsafe` code is permitted at the crate
//! level; the host bindings live in `mio-abi`.

#![deny(unsafe_code)]

pub mod config;
pub mod errno;
pub mod retry;
pub mod stdio;
pub mod unistd;

pub use errno::IoError;
pub use retry::retry_on_eintr;
