//! Executable memory for the native backend.
//!
//! This is the only place that touches raw pages. A buffer is mapped
//! read-write, filled once, then switched to read-execute and never written
//! again.

use std::io;
use std::ptr::{self, NonNull};

use log::debug;

pub(crate) struct ExecutableBuffer {
    ptr: NonNull<u8>,
    len: usize,
}

// SAFETY: the mapping is immutable after construction and owned exclusively
// by this value; executing it from several threads only reads it.
unsafe impl Send for ExecutableBuffer {}
unsafe impl Sync for ExecutableBuffer {}

impl ExecutableBuffer {
    /// Maps fresh pages, copies `code` in and makes them executable.
    pub(crate) fn new(code: &[u8]) -> io::Result<Self> {
        let page = page_size();
        let len = code.len().max(1).div_ceil(page) * page;
        // SAFETY: anonymous private mapping with no address hint.
        let addr = unsafe {
            libc::mmap(
                ptr::null_mut(),
                len,
                libc::PROT_READ | libc::PROT_WRITE,
                libc::MAP_PRIVATE | libc::MAP_ANON,
                -1,
                0,
            )
        };
        if addr == libc::MAP_FAILED {
            return Err(io::Error::last_os_error());
        }
        let ptr = NonNull::new(addr.cast::<u8>())
            .ok_or_else(|| io::Error::other("mmap returned a null mapping"))?;
        let buffer = Self { ptr, len };

        // SAFETY: the mapping is at least `code.len()` bytes and writable.
        unsafe { ptr::copy_nonoverlapping(code.as_ptr(), buffer.ptr.as_ptr(), code.len()) };
        // SAFETY: `addr..addr + len` is exactly the mapping created above.
        if unsafe { libc::mprotect(addr, len, libc::PROT_READ | libc::PROT_EXEC) } != 0 {
            return Err(io::Error::last_os_error());
        }
        debug!("mapped {} code bytes into {} executable bytes", code.len(), len);
        Ok(buffer)
    }

    pub(crate) fn as_ptr(&self) -> *const u8 {
        self.ptr.as_ptr()
    }
}

impl Drop for ExecutableBuffer {
    fn drop(&mut self) {
        // SAFETY: unmaps exactly the region mapped in `new`; no function
        // pointer into it outlives the owning `JitFunction`.
        unsafe {
            libc::munmap(self.ptr.as_ptr().cast(), self.len);
        }
    }
}

fn page_size() -> usize {
    // SAFETY: sysconf has no preconditions.
    let n = unsafe { libc::sysconf(libc::_SC_PAGESIZE) };
    if n > 0 { n as usize } else { 4096 }
}
