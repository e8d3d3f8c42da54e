#![cfg(target_os = "linux")]

//! Integration tests for the `<stdio.h>` wrappers.

use std::ffi::{CStr, CString, c_char};
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::ptr::{self, NonNull};
use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::Duration;

use mio_abi::stdio_abi::{
    StreamLock, mio_fdopen, mio_fgets, mio_fopen, mio_fopenat, mio_freopen, mio_getc,
    mio_getc_unlocked, mio_getdelim, mio_getline, read_line_dynamic,
};
use mio_abi::unistd_abi::mio_open;
use mio_abi::{get_errno, set_errno};
use mio_core::stdio::LineBuffer;

static NEXT_TMP_ID: AtomicU64 = AtomicU64::new(0);
static SIGNAL_GUARD: Mutex<()> = Mutex::new(());
static SIGNALS_SEEN: AtomicUsize = AtomicUsize::new(0);

fn temp_path(tag: &str) -> PathBuf {
    let id = NEXT_TMP_ID.fetch_add(1, Ordering::Relaxed);
    let mut path = std::env::temp_dir();
    path.push(format!(
        "mio_stdio_{}_{}_{}.tmp",
        tag,
        std::process::id(),
        id
    ));
    path
}

fn path_cstring(path: &Path) -> CString {
    CString::new(path.as_os_str().as_bytes()).expect("temp path must not contain interior NUL")
}

fn file_with(tag: &str, contents: &[u8]) -> (PathBuf, CString) {
    let path = temp_path(tag);
    fs::write(&path, contents).expect("fixture write should succeed");
    let path_c = path_cstring(&path);
    (path, path_c)
}

fn open_read(path_c: &CStr) -> *mut libc::FILE {
    // SAFETY: pointers are valid C strings for this call.
    let stream = unsafe { mio_fopen(path_c.as_ptr(), c"r".as_ptr()) };
    assert!(!stream.is_null(), "fixture must open");
    stream
}

fn close(stream: *mut libc::FILE) {
    // SAFETY: `stream` was opened by this test and is closed once.
    assert_eq!(unsafe { libc::fclose(stream) }, 0);
}

fn fgets_string(buf: &mut [u8], stream: *mut libc::FILE) -> Option<Vec<u8>> {
    // SAFETY: `buf` is writable for its whole length; stream is open.
    let out = unsafe { mio_fgets(buf.as_mut_ptr().cast(), buf.len(), stream) };
    if out.is_null() {
        return None;
    }
    // SAFETY: a non-null result is the NUL-terminated contents of `buf`.
    Some(unsafe { CStr::from_ptr(out) }.to_bytes().to_vec())
}

/// Reads one `getdelim` record; returns its bytes, or `None` on failure.
fn getdelim_record(
    line: &mut *mut c_char,
    cap: &mut usize,
    delim: u8,
    stream: *mut libc::FILE,
) -> Option<Vec<u8>> {
    // SAFETY: `line`/`cap` describe a null or malloc'd buffer; stream is open.
    let end = unsafe { mio_getdelim(line, cap, delim.into(), stream) };
    if end.is_null() {
        return None;
    }
    // SAFETY: `end` points into the same allocation as `*line`.
    let len = unsafe { end.offset_from(*line) } as usize;
    // SAFETY: `len` bytes plus terminator were written.
    assert_eq!(unsafe { *end }, 0, "record must be NUL-terminated");
    Some(unsafe { std::slice::from_raw_parts((*line).cast::<u8>(), len) }.to_vec())
}

extern "C" fn count_signal(_: libc::c_int) {
    SIGNALS_SEEN.fetch_add(1, Ordering::SeqCst);
}

/// Installs a SIGUSR1 handler without `SA_RESTART`, so blocking calls fail
/// with `EINTR` when it runs.
fn install_interrupting_handler() {
    // SAFETY: a zeroed sigaction with an explicit handler and empty mask is
    // well-formed.
    unsafe {
        let mut action: libc::sigaction = std::mem::zeroed();
        action.sa_sigaction = count_signal as extern "C" fn(libc::c_int) as libc::sighandler_t;
        action.sa_flags = 0;
        libc::sigemptyset(&mut action.sa_mask);
        assert_eq!(
            libc::sigaction(libc::SIGUSR1, &action, ptr::null_mut()),
            0,
            "sigaction(SIGUSR1) must succeed"
        );
    }
}

/// Signals the calling thread after a delay, then runs `after` on a helper
/// thread.
fn interrupt_then<F>(after: F) -> std::thread::JoinHandle<()>
where
    F: FnOnce() + Send + 'static,
{
    // SAFETY: pthread_self has no preconditions.
    let target = unsafe { libc::pthread_self() };
    std::thread::spawn(move || {
        std::thread::sleep(Duration::from_millis(50));
        // SAFETY: the target thread outlives this helper (it joins it).
        unsafe { libc::pthread_kill(target, libc::SIGUSR1) };
        std::thread::sleep(Duration::from_millis(50));
        after();
    })
}

#[test]
fn fgets_reads_line_by_line_and_reports_eof() {
    let (path, path_c) = file_with("lines", b"alpha\nbeta\ngamma");
    let stream = open_read(&path_c);
    let mut buf = [0u8; 64];

    assert_eq!(fgets_string(&mut buf, stream).as_deref(), Some(&b"alpha\n"[..]));
    assert_eq!(fgets_string(&mut buf, stream).as_deref(), Some(&b"beta\n"[..]));
    assert_eq!(fgets_string(&mut buf, stream).as_deref(), Some(&b"gamma"[..]));

    set_errno(libc::ERANGE);
    assert_eq!(fgets_string(&mut buf, stream), None);
    assert_eq!(get_errno(), libc::ERANGE, "EOF must not disturb errno");

    close(stream);
    let _ = fs::remove_file(path);
}

#[test]
fn fgets_splits_lines_longer_than_buffer() {
    let (path, path_c) = file_with("split", b"abcdef\n");
    let stream = open_read(&path_c);
    let mut buf = [0xAAu8; 4];

    assert_eq!(fgets_string(&mut buf, stream).as_deref(), Some(&b"abc"[..]));
    assert_eq!(fgets_string(&mut buf, stream).as_deref(), Some(&b"def"[..]));
    assert_eq!(fgets_string(&mut buf, stream).as_deref(), Some(&b"\n"[..]));
    assert_eq!(fgets_string(&mut buf, stream), None);

    close(stream);
    let _ = fs::remove_file(path);
}

#[test]
fn fgets_size_one_stores_empty_string_without_reading() {
    let (path, path_c) = file_with("size1", b"xyz\n");
    let stream = open_read(&path_c);
    let mut buf = [b'!'; 1];

    assert_eq!(fgets_string(&mut buf, stream).as_deref(), Some(&b""[..]));
    assert_eq!(buf[0], 0);
    // SAFETY: stream is open.
    assert_eq!(unsafe { mio_getc(stream) }, i32::from(b'x'), "nothing consumed");

    close(stream);
    let _ = fs::remove_file(path);
}

#[test]
fn fgets_size_zero_is_invalid() {
    let (path, path_c) = file_with("size0", b"xyz\n");
    let stream = open_read(&path_c);
    let mut buf = [0u8; 4];

    set_errno(0);
    // SAFETY: zero-size request never touches `buf`.
    let out = unsafe { mio_fgets(buf.as_mut_ptr().cast(), 0, stream) };
    assert!(out.is_null());
    assert_eq!(get_errno(), libc::EINVAL);

    close(stream);
    let _ = fs::remove_file(path);
}

#[test]
fn getline_grows_from_null_buffer() {
    let mut contents = vec![b'x'; 1000];
    contents.extend_from_slice(b"\ntail");
    let (path, path_c) = file_with("getline", &contents);
    let stream = open_read(&path_c);

    let mut line: *mut c_char = ptr::null_mut();
    let mut cap = 0usize;

    let first = getdelim_record(&mut line, &mut cap, b'\n', stream).expect("first line");
    assert_eq!(first.len(), 1001);
    assert_eq!(&first[..1000], &contents[..1000]);
    assert_eq!(first[1000], b'\n');
    assert!(cap >= 1002, "capacity {cap} too small");

    let second = getdelim_record(&mut line, &mut cap, b'\n', stream).expect("second line");
    assert_eq!(second, b"tail");

    set_errno(libc::ERANGE);
    let third = getdelim_record(&mut line, &mut cap, b'\n', stream).expect("eof record");
    assert!(third.is_empty());
    assert_eq!(get_errno(), libc::ERANGE);

    // SAFETY: `line` was allocated by realloc inside mio_getdelim.
    unsafe { libc::free(line.cast()) };
    close(stream);
    let _ = fs::remove_file(path);
}

#[test]
fn getline_entry_point_matches_newline_getdelim() {
    let (path, path_c) = file_with("getline_sym", b"one\ntwo\n");
    let stream = open_read(&path_c);
    let mut line: *mut c_char = ptr::null_mut();
    let mut cap = 0usize;

    // SAFETY: null buffer with zero capacity; stream is open.
    let end = unsafe { mio_getline(&mut line, &mut cap, stream) };
    assert!(!end.is_null());
    // SAFETY: `end` points into `line`.
    assert_eq!(unsafe { end.offset_from(line) }, 4);
    // SAFETY: `line` is NUL-terminated.
    assert_eq!(unsafe { CStr::from_ptr(line) }.to_bytes(), b"one\n");

    // SAFETY: allocated by mio_getline.
    unsafe { libc::free(line.cast()) };
    close(stream);
    let _ = fs::remove_file(path);
}

#[test]
fn getdelim_honours_custom_delimiter() {
    let (path, path_c) = file_with("delim", b"a,bb,ccc");
    let stream = open_read(&path_c);
    let mut line: *mut c_char = ptr::null_mut();
    let mut cap = 0usize;

    let records: Vec<Vec<u8>> = (0..3)
        .map(|_| getdelim_record(&mut line, &mut cap, b',', stream).expect("record"))
        .collect();
    assert_eq!(records, vec![b"a,".to_vec(), b"bb,".to_vec(), b"ccc".to_vec()]);

    // SAFETY: allocated by mio_getdelim.
    unsafe { libc::free(line.cast()) };
    close(stream);
    let _ = fs::remove_file(path);
}

#[test]
fn getdelim_reuses_large_enough_caller_buffer() {
    let (path, path_c) = file_with("reuse", b"short\n");
    let stream = open_read(&path_c);
    // SAFETY: plain allocation handed to mio_getdelim.
    let original = unsafe { libc::malloc(128) }.cast::<c_char>();
    assert!(!original.is_null());
    let mut line = original;
    let mut cap = 128usize;

    let record = getdelim_record(&mut line, &mut cap, b'\n', stream).expect("record");
    assert_eq!(record, b"short\n");
    assert_eq!(line, original, "no reallocation expected");
    assert_eq!(cap, 128);

    // SAFETY: still the allocation from malloc above.
    unsafe { libc::free(line.cast()) };
    close(stream);
    let _ = fs::remove_file(path);
}

#[test]
fn getdelim_rejects_missing_arguments() {
    let (path, path_c) = file_with("nullargs", b"x\n");
    let stream = open_read(&path_c);
    let mut cap = 0usize;
    let mut line: *mut c_char = ptr::null_mut();

    set_errno(0);
    // SAFETY: null lineptr is rejected before any access.
    let out = unsafe { mio_getdelim(ptr::null_mut(), &mut cap, b'\n'.into(), stream) };
    assert!(out.is_null());
    assert_eq!(get_errno(), libc::EINVAL);

    set_errno(0);
    // SAFETY: null size pointer is rejected before any access.
    let out = unsafe { mio_getdelim(&mut line, ptr::null_mut(), b'\n'.into(), stream) };
    assert!(out.is_null());
    assert_eq!(get_errno(), libc::EINVAL);
    assert!(line.is_null());

    close(stream);
    let _ = fs::remove_file(path);
}

#[test]
fn getc_returns_bytes_then_eof_preserving_errno() {
    let (path, path_c) = file_with("getc", b"hi");
    let stream = open_read(&path_c);

    set_errno(libc::ENOTTY);
    // SAFETY: stream is open for the rest of the test.
    unsafe {
        assert_eq!(mio_getc(stream), i32::from(b'h'));
        assert_eq!(mio_getc(stream), i32::from(b'i'));
        assert_eq!(mio_getc(stream), libc::EOF);
        assert_ne!(libc::feof(stream), 0);
        assert_eq!(libc::ferror(stream), 0);
    }
    assert_eq!(get_errno(), libc::ENOTTY);

    close(stream);
    let _ = fs::remove_file(path);
}

#[test]
fn getc_unlocked_reads_under_caller_lock() {
    let (path, path_c) = file_with("unlocked", b"abc");
    let stream = open_read(&path_c);
    let mut seen = Vec::new();
    {
        // SAFETY: stream is open and outlives the guard.
        let _lock = unsafe { StreamLock::acquire(NonNull::new(stream).expect("non-null")) };
        loop {
            // SAFETY: this thread holds the stream lock.
            let c = unsafe { mio_getc_unlocked(stream) };
            if c == libc::EOF {
                break;
            }
            seen.push(c as u8);
        }
    }
    assert_eq!(seen, b"abc");

    close(stream);
    let _ = fs::remove_file(path);
}

#[test]
fn safe_line_reader_fills_line_buffer() {
    let (path, path_c) = file_with("safe", b"first\nsecond\n");
    let stream = NonNull::new(open_read(&path_c)).expect("non-null");
    let mut buf = LineBuffer::new();

    // SAFETY: stream is open.
    assert_eq!(unsafe { read_line_dynamic(&mut buf, stream) }, Ok(6));
    assert_eq!(buf.as_bytes(), b"first\n");
    // SAFETY: stream is open.
    assert_eq!(unsafe { read_line_dynamic(&mut buf, stream) }, Ok(7));
    assert_eq!(buf.as_bytes(), b"second\n");
    // SAFETY: stream is open.
    assert_eq!(unsafe { read_line_dynamic(&mut buf, stream) }, Ok(0));
    assert!(buf.is_empty());

    close(stream.as_ptr());
    let _ = fs::remove_file(path);
}

#[test]
fn fopen_missing_file_reports_enoent() {
    let path = temp_path("missing");
    let _ = fs::remove_file(&path);
    let path_c = path_cstring(&path);

    // SAFETY: pointers are valid C strings.
    let stream = unsafe { mio_fopen(path_c.as_ptr(), c"r".as_ptr()) };
    assert!(stream.is_null());
    assert_eq!(get_errno(), libc::ENOENT);
}

#[test]
fn fdopen_attaches_stream_to_descriptor() {
    let (path, path_c) = file_with("fdopen", b"via fd\n");
    // SAFETY: valid C string; mode unused without O_CREAT.
    let fd = unsafe { mio_open(path_c.as_ptr(), libc::O_RDONLY, 0) };
    assert!(fd >= 0);

    // SAFETY: `fd` is open and handed to the stream.
    let stream = unsafe { mio_fdopen(fd, c"r".as_ptr()) };
    assert!(!stream.is_null());
    // SAFETY: stream is open.
    assert_eq!(unsafe { libc::fileno(stream) }, fd);

    let mut buf = [0u8; 32];
    assert_eq!(fgets_string(&mut buf, stream).as_deref(), Some(&b"via fd\n"[..]));

    close(stream);
    let _ = fs::remove_file(path);
}

#[test]
fn freopen_switches_underlying_file() {
    let (first, first_c) = file_with("reopen_a", b"first\n");
    let (second, second_c) = file_with("reopen_b", b"second\n");
    let stream = open_read(&first_c);

    // SAFETY: stream is open; strings are valid.
    let reopened = unsafe { mio_freopen(second_c.as_ptr(), c"r".as_ptr(), stream) };
    assert!(!reopened.is_null());

    let mut buf = [0u8; 32];
    assert_eq!(fgets_string(&mut buf, reopened).as_deref(), Some(&b"second\n"[..]));

    close(reopened);
    let _ = fs::remove_file(first);
    let _ = fs::remove_file(second);
}

fn temp_dir_fd(tag: &str) -> (PathBuf, libc::c_int) {
    let dir = temp_path(tag);
    fs::create_dir_all(&dir).expect("temp dir");
    let dir_c = path_cstring(&dir);
    // SAFETY: valid C string.
    let fd = unsafe { libc::open(dir_c.as_ptr(), libc::O_RDONLY | libc::O_DIRECTORY) };
    assert!(fd >= 0, "directory must open");
    (dir, fd)
}

fn write_all(stream: *mut libc::FILE, text: &CStr) {
    // SAFETY: stream is open for writing; text is NUL-terminated.
    assert!(unsafe { libc::fputs(text.as_ptr(), stream) } >= 0);
}

#[test]
fn fopenat_write_read_append_cycle() {
    let (dir, dirfd) = temp_dir_fd("fopenat");

    // SAFETY: dirfd is open; strings are valid.
    let out = unsafe { mio_fopenat(dirfd, c"data.txt".as_ptr(), c"w".as_ptr()) };
    assert!(!out.is_null());
    write_all(out, c"one\n");
    close(out);

    // SAFETY: as above.
    let app = unsafe { mio_fopenat(dirfd, c"data.txt".as_ptr(), c"a+".as_ptr()) };
    assert!(!app.is_null());
    write_all(app, c"two\n");
    close(app);

    assert_eq!(fs::read(dir.join("data.txt")).expect("read back"), b"one\ntwo\n");

    // SAFETY: as above.
    let input = unsafe { mio_fopenat(dirfd, c"data.txt".as_ptr(), c"r".as_ptr()) };
    assert!(!input.is_null());
    let mut buf = [0u8; 16];
    assert_eq!(fgets_string(&mut buf, input).as_deref(), Some(&b"one\n"[..]));
    close(input);

    // SAFETY: dirfd was opened above.
    unsafe { libc::close(dirfd) };
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn fopenat_exclusive_and_cloexec_flags() {
    let (dir, dirfd) = temp_dir_fd("fopenat_flags");

    // SAFETY: dirfd is open; strings are valid.
    let first = unsafe { mio_fopenat(dirfd, c"excl.txt".as_ptr(), c"wx".as_ptr()) };
    assert!(!first.is_null());
    close(first);

    // SAFETY: as above.
    let again = unsafe { mio_fopenat(dirfd, c"excl.txt".as_ptr(), c"wx".as_ptr()) };
    assert!(again.is_null());
    assert_eq!(get_errno(), libc::EEXIST);

    // SAFETY: as above.
    let cloexec = unsafe { mio_fopenat(dirfd, c"excl.txt".as_ptr(), c"re".as_ptr()) };
    assert!(!cloexec.is_null());
    // SAFETY: stream is open.
    let fd_flags = unsafe { libc::fcntl(libc::fileno(cloexec), libc::F_GETFD) };
    assert_ne!(fd_flags & libc::FD_CLOEXEC, 0);
    close(cloexec);

    // SAFETY: dirfd was opened above.
    unsafe { libc::close(dirfd) };
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn fopenat_rejects_bad_mode_and_missing_file() {
    let (dir, dirfd) = temp_dir_fd("fopenat_err");

    // SAFETY: dirfd is open; strings are valid.
    let bad = unsafe { mio_fopenat(dirfd, c"never.txt".as_ptr(), c"q".as_ptr()) };
    assert!(bad.is_null());
    assert_eq!(get_errno(), libc::EINVAL);
    assert!(!dir.join("never.txt").exists());

    // SAFETY: as above.
    let missing = unsafe { mio_fopenat(dirfd, c"absent.txt".as_ptr(), c"r".as_ptr()) };
    assert!(missing.is_null());
    assert_eq!(get_errno(), libc::ENOENT);

    // SAFETY: dirfd was opened above.
    unsafe { libc::close(dirfd) };
    let _ = fs::remove_dir_all(dir);
}

#[test]
fn fgets_retries_after_signal_on_blocking_pipe() {
    let _guard = SIGNAL_GUARD.lock().expect("signal guard lock should succeed");
    install_interrupting_handler();

    let mut fds = [0; 2];
    // SAFETY: `fds` has room for two descriptors.
    assert_eq!(unsafe { libc::pipe(fds.as_mut_ptr()) }, 0);
    let [read_fd, write_fd] = fds;
    // SAFETY: read end is open and handed to the stream.
    let stream = unsafe { mio_fdopen(read_fd, c"r".as_ptr()) };
    assert!(!stream.is_null());

    let before = SIGNALS_SEEN.load(Ordering::SeqCst);
    let helper = interrupt_then(move || {
        // SAFETY: write end stays open until closed here.
        unsafe {
            libc::write(write_fd, b"late line\n".as_ptr().cast(), 10);
            libc::close(write_fd);
        }
    });

    set_errno(libc::ERANGE);
    let mut buf = [0u8; 64];
    let line = fgets_string(&mut buf, stream);
    helper.join().expect("helper thread");

    assert_eq!(line.as_deref(), Some(&b"late line\n"[..]));
    assert_eq!(get_errno(), libc::ERANGE, "absorbed EINTR must not leak");
    assert!(SIGNALS_SEEN.load(Ordering::SeqCst) > before);
    // SAFETY: stream is open.
    assert_eq!(unsafe { libc::ferror(stream) }, 0, "no spurious error flag");

    close(stream);
}
