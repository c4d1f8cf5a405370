//! `FILE*` accessors for the three standard streams (spec.md §6).
//!
//! Compiled code links directly against libc for `printf`/`puts`/etc, so
//! the only thing this module needs to supply is a way to get at libc's
//! own `stdout`/`stderr`/`stdin` globals -- glibc exports them as plain
//! symbols, not just macros, so a direct `extern "C"` binding is enough
//! and no `libc` crate dependency is pulled in for it.

/// Opaque `FILE` struct. Compiled code never looks inside it -- it only
/// ever holds the pointer and threads it through to libc calls.
#[repr(C)]
pub struct FILE {
    _private: [u8; 0],
}

extern "C" {
    #[link_name = "stdout"]
    static mut STDOUT: *mut FILE;
    #[link_name = "stderr"]
    static mut STDERR: *mut FILE;
    #[link_name = "stdin"]
    static mut STDIN: *mut FILE;
}

#[no_mangle]
pub extern "C" fn get_stdout() -> *mut FILE {
    unsafe { STDOUT }
}

#[no_mangle]
pub extern "C" fn get_stderr() -> *mut FILE {
    unsafe { STDERR }
}

#[no_mangle]
pub extern "C" fn get_stdin() -> *mut FILE {
    unsafe { STDIN }
}
