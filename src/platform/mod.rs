// pico-retro/src/platform/mod.rs

//! Memory the engine's dynamic recompilers map for themselves.
//!
//! The engine calls back into the adapter (`plat_mmap` and friends) whenever it
//! needs a block of RAM it may later turn executable. Each OS family gets one
//! [`ExecMemory`] implementation; [`NativeMemory`] is the one picked for the
//! build target.

use std::ffi::{c_int, c_ulong, c_void};
use std::io;
use std::ptr::{self, NonNull};

use cfg_if::cfg_if;
use log::{error, warn};
use thiserror::Error;

pub mod heap;
#[cfg(unix)]
pub mod posix;
#[cfg(windows)]
pub mod windows;

cfg_if! {
    if #[cfg(feature = "no-mmap")] {
        pub type NativeMemory = heap::HeapMemory;
    } else if #[cfg(windows)] {
        pub type NativeMemory = windows::WindowsMemory;
    } else if #[cfg(unix)] {
        pub type NativeMemory = posix::PosixMemory;
    } else {
        pub type NativeMemory = heap::HeapMemory;
    }
}

#[derive(Debug, Error)]
pub enum MemMapError {
    #[error("mmap({addr:08x}, {size}) failed: {source}")]
    Map {
        addr: usize,
        size: usize,
        source: io::Error,
    },
    #[error("mmap({addr:08x}, {size}) returned {got:#x}")]
    Misplaced { addr: usize, size: usize, got: usize },
    #[error("mremap({old_size} -> {new_size}) failed: {source}")]
    Remap {
        old_size: usize,
        new_size: usize,
        source: io::Error,
    },
    #[error("mprotect({addr:#x}, {size}) failed: {source}")]
    Protect {
        addr: usize,
        size: usize,
        source: io::Error,
    },
    #[error("bad mapping size {0}")]
    BadSize(usize),
}

/// Anonymous read/write memory that can be made executable afterwards.
///
/// `addr` is a placement hint; with `is_fixed` anything but that exact address
/// is an error. Blocks must be released with [`ExecMemory::unmap`] on the same
/// implementation, with the size they currently have.
pub trait ExecMemory {
    fn map(
        &self,
        addr: usize,
        size: usize,
        need_exec: bool,
        is_fixed: bool,
    ) -> Result<NonNull<u8>, MemMapError>;

    /// Resize a block, possibly moving it. The first `min(old, new)` bytes are kept.
    ///
    /// # Safety
    /// `ptr` must come from `map`/`remap` on `self` and span `old_size` bytes.
    unsafe fn remap(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, MemMapError>;

    /// # Safety
    /// `ptr` must come from `map`/`remap` on `self` and span `size` bytes.
    unsafe fn unmap(&self, ptr: NonNull<u8>, size: usize);

    /// # Safety
    /// `ptr` must lie in a block from `map`/`remap` on `self`.
    unsafe fn set_exec(&self, ptr: NonNull<u8>, size: usize) -> Result<(), MemMapError>;

    /// Dedicated translation cache, when the platform reserves one.
    fn mem_for_drc(&self, _size: usize) -> Option<NonNull<u8>> {
        None
    }
}

/// Make freshly written code in `[start, end)` visible to instruction fetch.
///
/// # Safety
/// The range must be mapped memory.
#[allow(unused_variables)]
pub unsafe fn cache_flush(start: *mut u8, end: *mut u8) {
    #[cfg(target_arch = "arm")]
    {
        extern "C" {
            fn __clear_cache(start: *mut std::ffi::c_char, end: *mut std::ffi::c_char);
        }
        __clear_cache(start.cast(), end.cast());
    }
}

// -- engine hooks --
//
// C-shaped versions of the trait over `NativeMemory`, wrapped as
// `#[no_mangle]` symbols by `libretro_core!`. Failures log and return null.

pub fn plat_mmap(addr: c_ulong, size: usize, need_exec: c_int, is_fixed: c_int) -> *mut c_void {
    match NativeMemory::default().map(addr as usize, size, need_exec != 0, is_fixed != 0) {
        Ok(ptr) => ptr.as_ptr().cast(),
        Err(e @ MemMapError::Misplaced { .. }) => {
            warn!("{}", e);
            ptr::null_mut()
        }
        Err(e) => {
            error!("{}", e);
            ptr::null_mut()
        }
    }
}

/// # Safety
/// `ptr` must come from [`plat_mmap`]/[`plat_mremap`] and span `old_size` bytes.
pub unsafe fn plat_mremap(ptr: *mut c_void, old_size: usize, new_size: usize) -> *mut c_void {
    let Some(ptr) = NonNull::new(ptr.cast::<u8>()) else {
        return ptr::null_mut();
    };
    match NativeMemory::default().remap(ptr, old_size, new_size) {
        Ok(ptr) => ptr.as_ptr().cast(),
        Err(e) => {
            error!("{}", e);
            ptr::null_mut()
        }
    }
}

/// # Safety
/// `ptr` must be null or come from [`plat_mmap`]/[`plat_mremap`] and span `size` bytes.
pub unsafe fn plat_munmap(ptr: *mut c_void, size: usize) {
    if let Some(ptr) = NonNull::new(ptr.cast::<u8>()) {
        NativeMemory::default().unmap(ptr, size);
    }
}

pub fn plat_mem_get_for_drc(size: usize) -> *mut c_void {
    NativeMemory::default()
        .mem_for_drc(size)
        .map_or(ptr::null_mut(), |ptr| ptr.as_ptr().cast())
}

/// Returns 0 on success, -1 on failure.
///
/// # Safety
/// `ptr` must lie in a block from [`plat_mmap`]/[`plat_mremap`].
pub unsafe fn plat_mem_set_exec(ptr: *mut c_void, size: usize) -> c_int {
    let Some(ptr) = NonNull::new(ptr.cast::<u8>()) else {
        return -1;
    };
    match NativeMemory::default().set_exec(ptr, size) {
        Ok(()) => 0,
        Err(e) => {
            error!("{}", e);
            -1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAGE: usize = 4096;

    #[test]
    fn test_map_write_unmap() {
        let ptr = plat_mmap(0, PAGE * 2, 0, 0);
        assert!(!ptr.is_null());
        unsafe {
            let bytes = std::slice::from_raw_parts_mut(ptr.cast::<u8>(), PAGE * 2);
            assert!(bytes.iter().all(|&b| b == 0));
            bytes[PAGE * 2 - 1] = 0x5A;
            plat_munmap(ptr, PAGE * 2);
        }
    }

    #[test]
    fn test_remap_keeps_contents() {
        let ptr = plat_mmap(0, PAGE, 0, 0);
        assert!(!ptr.is_null());
        unsafe {
            std::slice::from_raw_parts_mut(ptr.cast::<u8>(), PAGE).fill(0xA5);
            // grow may fail in place on Linux, shrink may not
            let small = plat_mremap(ptr, PAGE, PAGE / 2);
            assert!(!small.is_null());
            let bytes = std::slice::from_raw_parts(small.cast::<u8>(), PAGE / 2);
            assert!(bytes.iter().all(|&b| b == 0xA5));
            plat_munmap(small, PAGE / 2);
        }
    }

    #[test]
    fn test_set_exec() {
        let ptr = plat_mmap(0, PAGE, 1, 0);
        assert!(!ptr.is_null());
        unsafe {
            assert_eq!(plat_mem_set_exec(ptr, PAGE), 0);
            cache_flush(ptr.cast(), ptr.cast::<u8>().add(PAGE));
            plat_munmap(ptr, PAGE);
            assert_eq!(plat_mem_set_exec(ptr::null_mut(), PAGE), -1);
        }
    }

    #[test]
    fn test_null_and_drc() {
        unsafe {
            plat_munmap(ptr::null_mut(), PAGE);
            assert!(plat_mremap(ptr::null_mut(), PAGE, PAGE * 2).is_null());
        }
        assert!(plat_mem_get_for_drc(PAGE).is_null());
    }
}
