use crate::{
    Result, io_error, map_error,
    mmap::{MapFlags, Mmap, ProtFlags},
};
use std::{
    ffi::{CString, c_void},
    ptr::NonNull,
    str::FromStr,
};

/// The libc-backed implementation of the [`Mmap`] trait.
pub struct DefaultMmap;

impl Mmap for DefaultMmap {
    unsafe fn mmap(
        len: usize,
        prot: ProtFlags,
        flags: MapFlags,
        fd: isize,
    ) -> Result<NonNull<c_void>> {
        let ptr = unsafe {
            libc::mmap(
                core::ptr::null_mut(),
                len,
                prot.bits(),
                flags.bits(),
                fd as i32,
                0,
            )
        };
        if core::ptr::eq(ptr, libc::MAP_FAILED) {
            return Err(map_error("mmap failed"));
        }
        Ok(unsafe { NonNull::new_unchecked(ptr) })
    }

    unsafe fn mremap(
        addr: NonNull<c_void>,
        old_len: usize,
        new_len: usize,
    ) -> Result<NonNull<c_void>> {
        let ptr = unsafe { libc::mremap(addr.as_ptr(), old_len, new_len, libc::MREMAP_MAYMOVE) };
        if core::ptr::eq(ptr, libc::MAP_FAILED) {
            return Err(map_error("mremap failed"));
        }
        Ok(unsafe { NonNull::new_unchecked(ptr) })
    }

    unsafe fn munmap(addr: NonNull<c_void>, len: usize) -> Result<()> {
        let res = unsafe { libc::munmap(addr.as_ptr(), len) };
        if res != 0 {
            return Err(map_error("munmap failed"));
        }
        Ok(())
    }
}

/// A read-only file handle that closes its descriptor on drop.
pub(crate) struct RawFile {
    fd: isize,
}

impl Drop for RawFile {
    fn drop(&mut self) {
        unsafe { libc::close(self.fd as i32) };
    }
}

impl RawFile {
    pub(crate) fn from_path(path: &str) -> Result<Self> {
        let name = CString::from_str(path).map_err(|_| io_error("path contains a nul byte"))?;
        let fd = unsafe { libc::open(name.as_ptr(), libc::O_RDONLY) };
        if fd == -1 {
            return Err(io_error("open failed"));
        }
        Ok(Self { fd: fd as isize })
    }

    pub(crate) fn as_fd(&self) -> isize {
        self.fd
    }

    /// Returns the file's size in bytes.
    pub(crate) fn len(&self) -> Result<usize> {
        let mut stat = unsafe { core::mem::zeroed::<libc::stat>() };
        if unsafe { libc::fstat(self.fd as i32, &mut stat) } != 0 {
            return Err(io_error("fstat failed"));
        }
        Ok(stat.st_size as usize)
    }
}

/// Resolves a symlink (eg `/proc/self/exe`) to its canonical target.
///
/// Returns `None` if the path is not a symlink or the target is not valid
/// UTF-8; callers fall back to the literal input path.
pub(crate) fn canonical_path(path: &str) -> Option<String> {
    let name = CString::from_str(path).ok()?;
    let mut buf = vec![0u8; libc::PATH_MAX as usize];
    let ret = unsafe {
        libc::readlink(
            name.as_ptr(),
            buf.as_mut_ptr().cast(),
            buf.len() - 1,
        )
    };
    if ret == -1 {
        return None;
    }
    buf.truncate(ret as usize);
    String::from_utf8(buf).ok()
}
