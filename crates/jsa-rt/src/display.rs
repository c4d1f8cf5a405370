//! `display_*` runtime symbols (spec.md §6): one per scalar kind, each
//! taking the value plus a `Formatter*` naming the destination stream.
//!
//! These exist because generated IR only links libc's `printf`, which
//! always targets stdout -- printing to an arbitrary stream (stderr, or
//! whatever `@io` hands it) needs `fprintf`, which isn't among the
//! fixed libc set generated code calls directly. Keeping that call here
//! means compiled code never has to know `fprintf` exists.

use crate::io::FILE;
use std::ffi::CString;
use std::os::raw::{c_char, c_int};

extern "C" {
    fn fprintf(stream: *mut FILE, fmt: *const c_char, ...) -> c_int;
}

/// Field 0 is the destination stream; that's the only field compiled
/// code (or this module) ever reads.
#[repr(C)]
pub struct Formatter {
    pub stream: *mut FILE,
}

// C varargs promotes anything smaller than `int` to `int`, so the
// narrower variants cast up before calling -- passing an `i8` straight
// through would leave the callee reading past it on the stack/register.
macro_rules! display_int {
    ($name:ident, $ty:ty, $promoted:ty, $fmt:literal) => {
        #[no_mangle]
        pub extern "C" fn $name(value: $ty, fmt: *mut Formatter) {
            unsafe {
                fprintf((*fmt).stream, concat!($fmt, "\0").as_ptr() as *const c_char, value as $promoted);
            }
        }
    };
}

display_int!(display_i8, i8, c_int, "%hhd");
display_int!(display_i16, i16, c_int, "%hd");
display_int!(display_i32, i32, c_int, "%d");
display_int!(display_i64, i64, i64, "%lld");
display_int!(display_u8, u8, std::os::raw::c_uint, "%hhu");
display_int!(display_u16, u16, std::os::raw::c_uint, "%hu");
display_int!(display_u32, u32, std::os::raw::c_uint, "%u");
display_int!(display_u64, u64, u64, "%llu");

#[no_mangle]
pub extern "C" fn display_f64(value: f64, fmt: *mut Formatter) {
    unsafe {
        fprintf((*fmt).stream, "%g\0".as_ptr() as *const c_char, value);
    }
}

#[no_mangle]
pub extern "C" fn display_bool(value: bool, fmt: *mut Formatter) {
    let text = if value { "true\0" } else { "false\0" };
    unsafe {
        fprintf((*fmt).stream, "%s\0".as_ptr() as *const c_char, text.as_ptr() as *const c_char);
    }
}

/// `Str` isn't nul-terminated, so this can't hand its `data` pointer
/// straight to `%s` -- it copies through a `CString` first.
#[no_mangle]
pub extern "C" fn display_string(value: crate::string::Str, fmt: *mut Formatter) {
    unsafe {
        let bytes = std::slice::from_raw_parts(value.data, value.length as usize);
        let owned = CString::new(bytes).unwrap_or_else(|_| CString::new("<invalid string>").unwrap());
        fprintf((*fmt).stream, "%s\0".as_ptr() as *const c_char, owned.as_ptr());
    }
}
