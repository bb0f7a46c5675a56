// pico-retro/src/platform/heap.rs

//! Fallback for targets without a usable `mmap`. Blocks come from the global
//! allocator and are never executable, so the recompilers must stay off there.

use std::alloc::{self, Layout};
use std::ptr::NonNull;

use super::{ExecMemory, MemMapError};

const ALIGN: usize = 4096;

#[derive(Debug, Clone, Copy, Default)]
pub struct HeapMemory;

fn layout(size: usize) -> Result<Layout, MemMapError> {
    if size == 0 {
        return Err(MemMapError::BadSize(size));
    }
    Layout::from_size_align(size, ALIGN).map_err(|_| MemMapError::BadSize(size))
}

impl ExecMemory for HeapMemory {
    fn map(
        &self,
        addr: usize,
        size: usize,
        _need_exec: bool,
        is_fixed: bool,
    ) -> Result<NonNull<u8>, MemMapError> {
        let layout = layout(size)?;
        let ptr = NonNull::new(unsafe { alloc::alloc_zeroed(layout) }).ok_or_else(|| {
            MemMapError::Map {
                addr,
                size,
                source: std::io::ErrorKind::OutOfMemory.into(),
            }
        })?;

        if is_fixed && addr != 0 && ptr.as_ptr() as usize != addr {
            unsafe { alloc::dealloc(ptr.as_ptr(), layout) };
            return Err(MemMapError::Misplaced {
                addr,
                size,
                got: ptr.as_ptr() as usize,
            });
        }
        Ok(ptr)
    }

    unsafe fn remap(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, MemMapError> {
        let old = layout(old_size)?;
        layout(new_size)?;
        NonNull::new(alloc::realloc(ptr.as_ptr(), old, new_size)).ok_or_else(|| {
            MemMapError::Remap {
                old_size,
                new_size,
                source: std::io::ErrorKind::OutOfMemory.into(),
            }
        })
    }

    unsafe fn unmap(&self, ptr: NonNull<u8>, size: usize) {
        if let Ok(layout) = layout(size) {
            alloc::dealloc(ptr.as_ptr(), layout);
        }
    }

    unsafe fn set_exec(&self, _ptr: NonNull<u8>, _size: usize) -> Result<(), MemMapError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heap_blocks() {
        let mem = HeapMemory;
        assert!(mem.map(0, 0, false, false).is_err());

        let ptr = mem.map(0, 100, false, false).unwrap();
        assert_eq!(ptr.as_ptr() as usize % ALIGN, 0);
        unsafe {
            ptr.as_ptr().write_bytes(7, 100);
            let ptr = mem.remap(ptr, 100, 300).unwrap();
            let bytes = std::slice::from_raw_parts(ptr.as_ptr(), 100);
            assert!(bytes.iter().all(|&b| b == 7));
            assert!(mem.set_exec(ptr, 300).is_ok());
            mem.unmap(ptr, 300);
        }
    }

    #[test]
    fn test_heap_cannot_place() {
        assert!(matches!(
            HeapMemory.map(0x1000, 0x1000, false, true),
            Err(MemMapError::Misplaced { .. })
        ));
    }
}
