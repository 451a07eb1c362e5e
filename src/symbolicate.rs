//! Address-to-symbol resolution for the current process.
//!
//! Two paths answer the same question. On a dynamically linked process the
//! loader already tracks every image, and `dladdr` answers directly. On a
//! statically linked process there is no loader to ask, so a process-wide
//! [`StaticBinaryElf`] over `/proc/self/exe` answers instead. Callers use
//! [`lookup_symbol`] and never need to know which path replied.

use crate::static_binary::StaticBinaryElf;
use std::{
    ffi::{CStr, c_void},
    sync::OnceLock,
};

/// The answer to one address query.
///
/// Mirrors the shape of `Dl_info`: the containing image's path, the base
/// address the image's code is loaded at, and the enclosing function symbol
/// if one is known. Every field other than the path is optional; a query
/// never fails outright.
#[derive(Clone, Copy, Debug)]
pub struct SymbolInfo<'a> {
    /// Path of the image containing the address.
    pub image_path: &'a str,
    /// Load base of the segment containing the address, if any.
    pub image_base: Option<usize>,
    /// Name of the function symbol containing the address, if known.
    pub symbol_name: Option<&'a CStr>,
    /// Start address of that symbol.
    pub symbol_addr: Option<usize>,
}

/// The one parser over the running executable.
///
/// Query answers borrow the mmap'd file, so the instance lives for the
/// whole process once constructed. Constructing it on a dynamically linked
/// executable yields a disabled parser that answers `None` everywhere.
fn static_binary() -> &'static StaticBinaryElf {
    static BINARY: OnceLock<StaticBinaryElf> = OnceLock::new();
    BINARY.get_or_init(|| StaticBinaryElf::open("/proc/self/exe"))
}

/// Resolves `addr` against the running executable's own ELF structure.
///
/// Always answers with the executable's path; the remaining fields are
/// filled in as far as the binary's program headers and symbol table allow.
pub fn resolve(addr: usize) -> SymbolInfo<'static> {
    let binary = static_binary();
    let symbol = binary.find_symbol(addr);
    SymbolInfo {
        image_path: binary.path(),
        image_base: binary.load_segment_containing(addr),
        symbol_name: symbol.and_then(|sym| binary.symbol_name(sym)),
        symbol_addr: symbol.map(|sym| sym.st_value as usize),
    }
}

/// Resolves `addr` through the dynamic loader, or `None` if the loader does
/// not know the address (always the case in a statically linked process).
pub fn loader_symbol(addr: usize) -> Option<SymbolInfo<'static>> {
    let mut info = unsafe { core::mem::zeroed::<libc::Dl_info>() };
    if unsafe { libc::dladdr(addr as *const c_void, &mut info) } == 0 {
        return None;
    }
    // The loader's strings live as long as the image stays mapped, which
    // for the queried image is the rest of the process.
    let image_path = unsafe { info.dli_fname.as_ref() }
        .and_then(|name| unsafe { CStr::from_ptr(name) }.to_str().ok())?;
    Some(SymbolInfo {
        image_path,
        image_base: (!info.dli_fbase.is_null()).then_some(info.dli_fbase as usize),
        symbol_name: unsafe { info.dli_sname.as_ref() }.map(|name| unsafe { CStr::from_ptr(name) }),
        symbol_addr: (!info.dli_saddr.is_null()).then_some(info.dli_saddr as usize),
    })
}

/// Resolves `addr` to its symbol and containing image.
///
/// Prefers the loader's answer and falls back to parsing the static
/// executable when the loader has none.
pub fn lookup_symbol(addr: usize) -> SymbolInfo<'static> {
    loader_symbol(addr).unwrap_or_else(|| resolve(addr))
}
