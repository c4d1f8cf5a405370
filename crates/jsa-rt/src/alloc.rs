//! Heap allocation entry points for compiled programs.
//!
//! Every allocation prepends an 8-byte header recording the requested size,
//! so `free` knows how much memory to release without the caller tracking
//! it separately. The returned pointer is always the user-visible data
//! pointer (past the header) -- callers never see the header.

use std::alloc::{alloc as sys_alloc, dealloc, Layout};

/// Size of the header prepended to every allocation.
const HEADER_SIZE: usize = std::mem::size_of::<u64>();

/// Alignment used for every allocation. Wide enough for any scalar or
/// pointer field a compiled program's structs can contain.
const ALIGN: usize = 8;

unsafe fn layout_for(total: usize) -> Layout {
    Layout::from_size_align(total, ALIGN).expect("allocation size overflowed isize::MAX")
}

/// Allocate `size` bytes, returning a pointer to zeroed memory.
///
/// # Safety
///
/// The returned pointer must eventually be passed to [`free`] exactly
/// once, or leaked. Passing it to the system allocator directly is
/// undefined behavior since the real allocation starts `HEADER_SIZE`
/// bytes earlier.
#[no_mangle]
pub extern "C" fn alloc(size: u64) -> *mut u8 {
    unsafe {
        let total = HEADER_SIZE + size as usize;
        let base = sys_alloc(layout_for(total));
        if base.is_null() {
            std::alloc::handle_alloc_error(layout_for(total));
        }
        std::ptr::write_bytes(base, 0, total);
        (base as *mut u64).write(size);
        base.add(HEADER_SIZE)
    }
}

/// Free a pointer previously returned by [`alloc`] or [`alloc_string`]'s
/// data pointer.
///
/// # Safety
///
/// `ptr` must be a pointer this module allocated, and must not be used
/// again afterward. Freeing a null pointer is a no-op.
#[no_mangle]
pub extern "C" fn free(ptr: *mut u8) {
    if ptr.is_null() {
        return;
    }
    unsafe {
        let base = ptr.sub(HEADER_SIZE);
        let size = (base as *const u64).read();
        let total = HEADER_SIZE + size as usize;
        dealloc(base, layout_for(total));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_returns_zeroed_memory() {
        let ptr = alloc(32);
        assert!(!ptr.is_null());
        let bytes = unsafe { std::slice::from_raw_parts(ptr, 32) };
        assert!(bytes.iter().all(|&b| b == 0));
        free(ptr);
    }

    #[test]
    fn alloc_is_writable_and_round_trips() {
        let ptr = alloc(8) as *mut u64;
        unsafe {
            ptr.write(0xDEAD_BEEF);
            assert_eq!(ptr.read(), 0xDEAD_BEEF);
        }
        free(ptr as *mut u8);
    }

    #[test]
    fn free_of_null_is_a_no_op() {
        free(std::ptr::null_mut());
    }
}
