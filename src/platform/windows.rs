// pico-retro/src/platform/windows.rs

use std::io;
use std::ptr::{self, NonNull};

use log::warn;
use windows_sys::Win32::System::Memory::{
    VirtualAlloc, VirtualFree, VirtualProtect, MEM_COMMIT, MEM_RELEASE, MEM_RESERVE,
    PAGE_EXECUTE_READWRITE, PAGE_PROTECTION_FLAGS, PAGE_READWRITE,
};

use super::{ExecMemory, MemMapError};

/// `VirtualAlloc`-backed blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowsMemory;

impl ExecMemory for WindowsMemory {
    fn map(
        &self,
        addr: usize,
        size: usize,
        _need_exec: bool,
        is_fixed: bool,
    ) -> Result<NonNull<u8>, MemMapError> {
        if size == 0 {
            return Err(MemMapError::BadSize(size));
        }

        let alloc = |hint: usize| unsafe {
            VirtualAlloc(hint as *const _, size, MEM_RESERVE | MEM_COMMIT, PAGE_READWRITE)
        };

        let mut ret = alloc(addr);
        if ret.is_null() && addr != 0 && !is_fixed {
            // the hint is taken, any address will do
            ret = alloc(0);
        }
        if ret.is_null() {
            return Err(MemMapError::Map {
                addr,
                size,
                source: io::Error::last_os_error(),
            });
        }

        if addr != 0 && ret as usize != addr {
            if is_fixed {
                unsafe { VirtualFree(ret, 0, MEM_RELEASE) };
                return Err(MemMapError::Misplaced { addr, size, got: ret as usize });
            }
            warn!("mmap: wanted to map @{:08x}, got {:p}", addr, ret);
        }

        NonNull::new(ret.cast::<u8>()).ok_or(MemMapError::BadSize(size))
    }

    unsafe fn remap(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, MemMapError> {
        let ret = self.map(0, new_size, false, false).map_err(|e| MemMapError::Remap {
            old_size,
            new_size,
            source: io::Error::new(io::ErrorKind::Other, e.to_string()),
        })?;

        ptr::copy_nonoverlapping(ptr.as_ptr(), ret.as_ptr(), old_size.min(new_size));
        self.unmap(ptr, old_size);
        Ok(ret)
    }

    unsafe fn unmap(&self, ptr: NonNull<u8>, _size: usize) {
        VirtualFree(ptr.as_ptr().cast(), 0, MEM_RELEASE);
    }

    unsafe fn set_exec(&self, ptr: NonNull<u8>, size: usize) -> Result<(), MemMapError> {
        let mut old: PAGE_PROTECTION_FLAGS = 0;
        let ok = VirtualProtect(ptr.as_ptr().cast(), size, PAGE_EXECUTE_READWRITE, &mut old);
        if ok == 0 {
            return Err(MemMapError::Protect {
                addr: ptr.as_ptr() as usize,
                size,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remap_grows() {
        let mem = WindowsMemory;
        let ptr = mem.map(0, 0x1000, false, false).unwrap();
        unsafe {
            ptr.as_ptr().write_bytes(0x11, 0x1000);
            let big = mem.remap(ptr, 0x1000, 0x4000).unwrap();
            let bytes = std::slice::from_raw_parts(big.as_ptr(), 0x4000);
            assert!(bytes[..0x1000].iter().all(|&b| b == 0x11));
            assert!(bytes[0x1000..].iter().all(|&b| b == 0));
            mem.unmap(big, 0x4000);
        }
    }
}
