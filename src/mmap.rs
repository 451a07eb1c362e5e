//! Memory mapping operations for reading the executable image.
//!
//! This module provides the trait and flag types for the memory mapping
//! backend used by the static binary parser. The parser maps only a prefix
//! of the executable and grows the mapping as deeper structures (program
//! headers, section headers, individual sections) are reached, so the
//! backend must support growing an existing mapping in place or by moving
//! it.
//!
//! # Safety
//! Memory mapping manipulates the process's address space directly.
//! Implementors must ensure the returned regions are valid for the
//! requested length and remain valid until unmapped.

pub use crate::os::DefaultMmap;

use crate::Result;
use bitflags::bitflags;
use std::{
    ffi::{c_int, c_void},
    ptr::NonNull,
};

bitflags! {
    #[derive(Clone, Copy, Debug, Default)]
    /// Memory protection flags for controlling access permissions.
    pub struct ProtFlags: c_int {
        /// No access allowed.
        const PROT_NONE = 0;

        /// Allow reading from the memory region.
        const PROT_READ = 1;

        /// Allow writing to the memory region.
        const PROT_WRITE = 2;

        /// Allow executing code in the memory region.
        const PROT_EXEC = 4;
    }
}

bitflags! {
    #[derive(Clone, Copy)]
    /// Memory mapping configuration flags.
    pub struct MapFlags: c_int {
        /// Share the mapping with other mappings of the same file.
        const MAP_SHARED = 1;

        /// Create a private copy-on-write mapping.
        const MAP_PRIVATE = 2;
    }
}

/// A trait for the low-level mapping operations the parser needs.
///
/// The default implementation, [`DefaultMmap`], wraps the libc calls. The
/// parser is generic over this trait so an alternative backend can be
/// substituted on systems where the libc one is unsuitable.
///
/// # Safety
/// All methods manipulate the process's virtual address space. Improper use
/// can cause memory corruption or crashes.
pub trait Mmap {
    /// Maps `len` bytes of the file `fd` into memory, starting at file
    /// offset 0, with the given protection and sharing flags.
    ///
    /// # Safety
    /// `fd` must be a valid open file descriptor and `len` must not exceed
    /// the file's size (reading a mapped page past the end of the backing
    /// file raises a signal rather than an error).
    unsafe fn mmap(
        len: usize,
        prot: ProtFlags,
        flags: MapFlags,
        fd: isize,
    ) -> Result<NonNull<c_void>>;

    /// Grows the mapping at `addr` from `old_len` to `new_len` bytes,
    /// relocating it if the adjacent address space is unavailable.
    ///
    /// Returns the (possibly moved) base of the grown mapping. Every
    /// pointer derived from the old base is invalid after this call.
    ///
    /// # Safety
    /// `addr` and `old_len` must describe an existing mapping produced by
    /// [`Mmap::mmap`], and `new_len` must not exceed the backing file's
    /// size.
    unsafe fn mremap(
        addr: NonNull<c_void>,
        old_len: usize,
        new_len: usize,
    ) -> Result<NonNull<c_void>>;

    /// Unmaps a region, releasing the associated resources.
    ///
    /// # Safety
    /// `addr` and `len` must match an existing mapping. The region must not
    /// be accessed after unmapping.
    unsafe fn munmap(addr: NonNull<c_void>, len: usize) -> Result<()>;
}
