// pico-retro/src/platform/posix.rs

use std::io;
use std::ptr::NonNull;

use log::warn;

use super::{ExecMemory, MemMapError};

/// `mmap`-backed blocks.
#[derive(Debug, Clone, Copy, Default)]
pub struct PosixMemory;

impl ExecMemory for PosixMemory {
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

        let ret = unsafe {
            libc::mmap(
                addr as *mut libc::c_void,
                size,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANONYMOUS,
                -1,
                0,
            )
        };
        if ret == libc::MAP_FAILED {
            return Err(MemMapError::Map {
                addr,
                size,
                source: io::Error::last_os_error(),
            });
        }

        if addr != 0 && ret as usize != addr {
            if is_fixed {
                unsafe { libc::munmap(ret, size) };
                return Err(MemMapError::Misplaced { addr, size, got: ret as usize });
            }
            warn!("mmap: wanted to map @{:08x}, got {:p}", addr, ret);
        }

        NonNull::new(ret.cast::<u8>()).ok_or(MemMapError::BadSize(size))
    }

    #[cfg(any(target_os = "linux", target_os = "android"))]
    unsafe fn remap(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, MemMapError> {
        // no MREMAP_MAYMOVE: recompiler blocks keep their address
        let ret = libc::mremap(ptr.as_ptr().cast(), old_size, new_size, 0);
        if ret == libc::MAP_FAILED {
            return Err(MemMapError::Remap {
                old_size,
                new_size,
                source: io::Error::last_os_error(),
            });
        }
        NonNull::new(ret.cast::<u8>()).ok_or(MemMapError::BadSize(new_size))
    }

    #[cfg(not(any(target_os = "linux", target_os = "android")))]
    unsafe fn remap(
        &self,
        ptr: NonNull<u8>,
        old_size: usize,
        new_size: usize,
    ) -> Result<NonNull<u8>, MemMapError> {
        let keep = old_size.min(new_size);
        let saved = std::slice::from_raw_parts(ptr.as_ptr(), keep).to_vec();

        self.unmap(ptr, old_size);
        let ret = self
            .map(ptr.as_ptr() as usize, new_size, false, false)
            .map_err(|e| MemMapError::Remap {
                old_size,
                new_size,
                source: io::Error::new(io::ErrorKind::Other, e.to_string()),
            })?;

        std::ptr::copy_nonoverlapping(saved.as_ptr(), ret.as_ptr(), keep);
        Ok(ret)
    }

    unsafe fn unmap(&self, ptr: NonNull<u8>, size: usize) {
        libc::munmap(ptr.as_ptr().cast(), size);
    }

    unsafe fn set_exec(&self, ptr: NonNull<u8>, size: usize) -> Result<(), MemMapError> {
        // mprotect wants a page aligned start
        let page = page_size();
        let addr = ptr.as_ptr() as usize;
        let start = addr & !(page - 1);
        let len = size + (addr - start);

        let ret = libc::mprotect(
            start as *mut libc::c_void,
            len,
            libc::PROT_READ | libc::PROT_WRITE | libc::PROT_EXEC,
        );
        if ret != 0 {
            return Err(MemMapError::Protect {
                addr,
                size,
                source: io::Error::last_os_error(),
            });
        }
        Ok(())
    }
}

fn page_size() -> usize {
    match unsafe { libc::sysconf(libc::_SC_PAGESIZE) } {
        n if n > 0 => n as usize,
        _ => 4096,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_size_rejected() {
        assert!(matches!(PosixMemory.map(0, 0, false, false), Err(MemMapError::BadSize(0))));
    }

    #[test]
    fn test_fixed_placement() {
        let mem = PosixMemory;
        let size = page_size() * 4;
        let first = mem.map(0, size, false, false).unwrap();
        let addr = first.as_ptr() as usize;
        unsafe { mem.unmap(first, size) };

        // the range just released is free again, ask for it back
        match mem.map(addr, size, false, true) {
            Ok(ptr) => {
                assert_eq!(ptr.as_ptr() as usize, addr);
                unsafe { mem.unmap(ptr, size) };
            }
            Err(e) => assert!(matches!(e, MemMapError::Misplaced { .. }), "{e}"),
        }
    }

    #[test]
    fn test_set_exec_unaligned() {
        let mem = PosixMemory;
        let size = page_size() * 2;
        let ptr = mem.map(0, size, true, false).unwrap();
        unsafe {
            let inner = NonNull::new(ptr.as_ptr().add(100)).unwrap();
            assert!(mem.set_exec(inner, 64).is_ok());
            mem.unmap(ptr, size);
        }
    }
}
