//! Runtime support library linked into every compiled program.
//!
//! Covers exactly the symbols spec.md §6 reserves for the runtime rather
//! than libc: the allocator behind `new`/`delete`, the `Str` constructor
//! behind string concatenation, `display_*` formatting, and the
//! `get_std*` stream accessors `@io` calls into. Everything else
//! (`printf`, `puts`, `memcpy`, `memcmp`, ...) is linked straight from
//! the system's libc and this crate never touches it.

pub mod alloc;
pub mod display;
pub mod io;
pub mod string;

pub use alloc::{alloc as jsa_alloc, free as jsa_free};
pub use display::{
    display_bool, display_f64, display_i16, display_i32, display_i64, display_i8, display_string, display_u16,
    display_u32, display_u64, display_u8, Formatter,
};
pub use io::{get_stderr, get_stdin, get_stdout, FILE};
pub use string::{alloc_string, Str};
