//! # mio-abi
//!
//! `extern "C"` surface of the interruption-safe I/O wrappers.
//!
//! Each `mio_*` symbol mirrors a C library call and behaves like it, except
//! that an interruption by a signal handler (`EINTR`) before any progress is
//! retried transparently. On success `errno` is left as the caller had it;
//! on failure it describes the failure.
//!
//! Every symbol also has a safe (or narrowly `unsafe`) Rust counterpart in
//! its module returning `Result<_, mio_core::IoError>`.
//!
//! # Modules
//!
//! - `stdio_abi`: `mio_getc`, `mio_getc_unlocked`, `mio_fgets`,
//!   `mio_getdelim`, `mio_getline`, `mio_fopen`, `mio_fdopen`,
//!   `mio_freopen`, `mio_fopenat`
//! - `unistd_abi`: `mio_read`, `mio_openat`, `mio_open`
//! - `poll_abi`: `mio_select`, `mio_pselect`
//! - `dirent_abi`: `mio_readdir`
//! - `errno_abi`: `errno` access and the save/restore contract

pub mod dirent_abi;
pub mod errno_abi;
pub mod poll_abi;
pub mod stdio_abi;
pub mod unistd_abi;

pub use errno_abi::{get_errno, set_errno};
