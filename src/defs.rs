//! ELF type definitions for the host's pointer width.
//!
//! The executable is parsed with the raw header structs from the `elf`
//! crate, selected to match the bit class of the running process. A binary
//! of the other class is rejected during header validation, so the parser
//! only ever dereferences structs of the host's own layout.

cfg_if::cfg_if! {
    if #[cfg(target_pointer_width = "64")] {
        pub(crate) const E_CLASS: u8 = elf::abi::ELFCLASS64;
        pub(crate) type Ehdr = elf::file::Elf64_Ehdr;
        pub(crate) type Phdr = elf::segment::Elf64_Phdr;
        pub(crate) type Shdr = elf::section::Elf64_Shdr;
        pub type Sym = elf::symbol::Elf64_Sym;
        pub(crate) const EHDR_SIZE: usize = size_of::<Ehdr>();
    } else {
        pub(crate) const E_CLASS: u8 = elf::abi::ELFCLASS32;
        pub(crate) type Ehdr = elf::file::Elf32_Ehdr;
        pub(crate) type Phdr = elf::segment::Elf32_Phdr;
        pub(crate) type Shdr = elf::section::Elf32_Shdr;
        pub type Sym = Elf32Sym;
        pub(crate) const EHDR_SIZE: usize = size_of::<Ehdr>();
    }
}

/// 32-bit ELF symbol table entry.
///
/// The `elf` crate only ships the 64-bit layout as a plain struct; the
/// native 32-bit layout orders its fields differently, so it is defined
/// here for 32-bit targets.
#[cfg(not(target_pointer_width = "64"))]
#[repr(C)]
pub struct Elf32Sym {
    pub st_name: u32,
    pub st_value: u32,
    pub st_size: u32,
    pub st_info: u8,
    pub st_other: u8,
    pub st_shndx: u16,
}

/// Extracts the type nibble from a symbol's `st_info` field.
#[inline]
pub(crate) fn st_type(st_info: u8) -> u8 {
    st_info & 0xf
}
