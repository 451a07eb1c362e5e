//! Parsing of the running static executable's own ELF structure.
//!
//! A statically linked executable has no dynamic loader, so there is no
//! loader introspection API to answer "which symbol contains this address".
//! This module parses the raw ELF structure of the executable file instead,
//! memory-mapping only the prefix of the file that has been examined so far
//! and growing the mapping as deeper structures are reached.
//!
//! Parsing is strictly best-effort: any structural violation, or any OS
//! failure while opening or mapping the file, leaves the parser disabled
//! and every query answering `None`. Symbolication is a diagnostic path;
//! nothing here is allowed to fail loudly.

use crate::{
    Result,
    defs::{E_CLASS, EHDR_SIZE, Ehdr, Phdr, Shdr, Sym, st_type},
    io_error, map_error,
    mmap::{MapFlags, Mmap, ProtFlags},
    os::{DefaultMmap, RawFile, canonical_path},
    parse_ehdr_error, parse_phdr_error, parse_shdr_error,
};
use elf::abi::{
    EI_CLASS, ELFMAGIC, ET_EXEC, EV_CURRENT, PT_INTERP, PT_LOAD, SHT_STRTAB, SHT_SYMTAB, STT_FUNC,
};
use std::{
    ffi::{CStr, c_void},
    marker::PhantomData,
    ptr::NonNull,
};

/// A read-only mapping of a growable prefix of the executable file.
///
/// The mapping starts at the size of the ELF header and grows as parsing
/// reaches the program header table, the section header table, and the
/// bytes of individual sections. It never exceeds the file's measured size:
/// mapped pages past the end of a file raise `SIGBUS` on access, so the
/// bound is a safety requirement, not a courtesy.
struct ElfMapping<M: Mmap> {
    base: NonNull<c_void>,
    len: usize,
    file_size: usize,
    _marker: PhantomData<M>,
}

impl<M: Mmap> ElfMapping<M> {
    /// Maps the fixed-size ELF header of `file`.
    fn map_header(file: &RawFile) -> Result<Self> {
        let file_size = file.len()?;
        if file_size < EHDR_SIZE {
            return Err(io_error("file is smaller than an ELF header"));
        }
        let base = unsafe {
            M::mmap(
                EHDR_SIZE,
                ProtFlags::PROT_READ,
                MapFlags::MAP_SHARED,
                file.as_fd(),
            )?
        };
        Ok(Self {
            base,
            len: EHDR_SIZE,
            file_size,
            _marker: PhantomData,
        })
    }

    /// Grows the mapping to cover at least `new_len` bytes of the file.
    ///
    /// The backing mapping may move; every view previously taken from
    /// [`ElfMapping::bytes`] is invalid after a successful grow and must be
    /// re-derived. A failed grow leaves the existing mapping untouched.
    fn grow(&mut self, new_len: usize) -> Result<()> {
        if new_len > self.file_size {
            return Err(map_error(
                "mapping would extend past the end of the file",
            ));
        }
        if new_len > self.len {
            self.base = unsafe { M::mremap(self.base, self.len, new_len)? };
            self.len = new_len;
        }
        Ok(())
    }

    fn bytes(&self) -> &[u8] {
        unsafe { core::slice::from_raw_parts(self.base.as_ptr().cast(), self.len) }
    }
}

impl<M: Mmap> Drop for ElfMapping<M> {
    fn drop(&mut self) {
        let _ = unsafe { M::munmap(self.base, self.len) };
    }
}

/// Returns a typed view of the struct at `offset`, or `None` if the range
/// is out of bounds or misaligned for `T`.
fn view<T>(bytes: &[u8], offset: usize) -> Option<&T> {
    let end = offset.checked_add(size_of::<T>())?;
    if end > bytes.len() || offset % align_of::<T>() != 0 {
        return None;
    }
    Some(unsafe { &*bytes.as_ptr().add(offset).cast() })
}

/// Returns a typed view of the `count`-entry table at `offset`, with the
/// same bounds and alignment checks as [`view`].
fn table<T>(bytes: &[u8], offset: usize, count: usize) -> Option<&[T]> {
    let len = size_of::<T>().checked_mul(count)?;
    let end = offset.checked_add(len)?;
    if end > bytes.len() || offset % align_of::<T>() != 0 {
        return None;
    }
    Some(unsafe { core::slice::from_raw_parts(bytes.as_ptr().add(offset).cast(), count) })
}

/// Scalar fields copied out of the validated ELF header.
///
/// Copies survive mapping relocation, unlike views into the mapped bytes.
/// The entry strides are validated against the host struct sizes up front,
/// so they are not carried here.
#[derive(Clone, Copy)]
struct HeaderInfo {
    phoff: usize,
    phnum: usize,
    shoff: usize,
    shnum: usize,
    shstrndx: usize,
}

/// The file location of a located section, copied out of its header.
#[derive(Clone, Copy)]
struct SectionRef {
    offset: usize,
    size: usize,
    entsize: usize,
}

/// Parser over the ELF structure of a statically linked executable.
///
/// Constructed once with [`StaticBinaryElf::open`]; construction never
/// fails, but a file that is not a well-formed static executable of the
/// host's bit class leaves the parser disabled. Queries are read-only and
/// may run concurrently once construction completes.
pub struct StaticBinaryElf<M: Mmap = DefaultMmap> {
    path: String,
    mapping: Option<ElfMapping<M>>,
    header: Option<HeaderInfo>,
    symtab: Option<SectionRef>,
    strtab: Option<SectionRef>,
}

// Construction is the only mutation; all queries borrow immutably, so
// sharing a constructed parser across threads is sound.
unsafe impl<M: Mmap> Send for StaticBinaryElf<M> {}
unsafe impl<M: Mmap> Sync for StaticBinaryElf<M> {}

impl<M: Mmap> StaticBinaryElf<M> {
    /// Opens and parses the executable at `path`.
    ///
    /// `path` may be a symlink such as `/proc/self/exe`; the canonical
    /// target is resolved best-effort and reported by
    /// [`StaticBinaryElf::path`]. Every parse or OS failure is logged at
    /// debug level and degrades to the disabled state.
    pub fn open(path: &str) -> Self {
        let mut binary = Self {
            path: canonical_path(path).unwrap_or_else(|| path.to_string()),
            mapping: None,
            header: None,
            symtab: None,
            strtab: None,
        };
        if let Err(err) = binary.parse(path) {
            log::debug!("static binary {path}: {err}");
            binary.mapping = None;
            binary.header = None;
            binary.symtab = None;
            binary.strtab = None;
        }
        binary
    }

    fn parse(&mut self, path: &str) -> Result<()> {
        let file = RawFile::from_path(path)?;
        let mut mapping = ElfMapping::<M>::map_header(&file)?;
        // The mapping keeps the file contents alive; the descriptor can go.
        drop(file);

        let header = Self::validate_header(&mapping)?;
        Self::reject_dynamic(&mut mapping, &header)?;

        let shdr_len = header
            .shnum
            .checked_mul(size_of::<Shdr>())
            .and_then(|len| header.shoff.checked_add(len))
            .ok_or_else(|| parse_shdr_error("section header table out of range"))?;
        mapping.grow(shdr_len)?;

        self.symtab = Self::find_section(&mut mapping, &header, SHT_SYMTAB);
        self.strtab = Self::find_section(&mut mapping, &header, SHT_STRTAB);
        self.header = Some(header);
        self.mapping = Some(mapping);
        Ok(())
    }

    /// Validates the ELF header and copies out the scalar fields needed for
    /// the rest of parsing and for queries.
    fn validate_header(mapping: &ElfMapping<M>) -> Result<HeaderInfo> {
        let ehdr: &Ehdr = view(mapping.bytes(), 0)
            .ok_or_else(|| parse_ehdr_error("header does not fit in the mapping"))?;
        if ehdr.e_ident[0..4] != ELFMAGIC {
            return Err(parse_ehdr_error("invalid ELF magic"));
        }
        if ehdr.e_ident[EI_CLASS] != E_CLASS {
            return Err(parse_ehdr_error("file class mismatch"));
        }
        if ehdr.e_type != ET_EXEC {
            return Err(parse_ehdr_error("not an executable image"));
        }
        if ehdr.e_version != EV_CURRENT as u32 {
            return Err(parse_ehdr_error("invalid ELF version"));
        }
        if ehdr.e_ehsize as usize != EHDR_SIZE {
            return Err(parse_ehdr_error("header size mismatch"));
        }
        // The tables are walked with host struct strides, so a foreign
        // stride makes them unusable.
        if ehdr.e_phnum != 0 && ehdr.e_phentsize as usize != size_of::<Phdr>() {
            return Err(parse_phdr_error("program header entry size mismatch"));
        }
        if ehdr.e_shnum != 0 && ehdr.e_shentsize as usize != size_of::<Shdr>() {
            return Err(parse_shdr_error("section header entry size mismatch"));
        }
        Ok(HeaderInfo {
            phoff: ehdr.e_phoff as usize,
            phnum: ehdr.e_phnum as usize,
            shoff: ehdr.e_shoff as usize,
            shnum: ehdr.e_shnum as usize,
            shstrndx: ehdr.e_shstrndx as usize,
        })
    }

    /// Maps the program header table and rejects the binary if an
    /// interpreter entry is present: an interpreter means the binary is
    /// dynamically linked and the loader API should answer instead.
    fn reject_dynamic(mapping: &mut ElfMapping<M>, header: &HeaderInfo) -> Result<()> {
        let phdr_len = header
            .phnum
            .checked_mul(size_of::<Phdr>())
            .and_then(|len| header.phoff.checked_add(len))
            .ok_or_else(|| parse_phdr_error("program header table out of range"))?;
        mapping.grow(phdr_len)?;
        let phdrs: &[Phdr] = table(mapping.bytes(), header.phoff, header.phnum)
            .ok_or_else(|| parse_phdr_error("program header table out of range"))?;
        if phdrs.iter().any(|phdr| phdr.p_type == PT_INTERP) {
            return Err(parse_phdr_error("image is dynamically linked"));
        }
        Ok(())
    }

    /// Finds the first section of `section_type`, growing the mapping to
    /// cover its bytes.
    ///
    /// The section-name string table (`e_shstrndx`) is never considered. A
    /// section whose size is not a multiple of its nonzero entry size, or
    /// whose bytes lie past the end of the file, is skipped and the scan
    /// continues with later sections.
    fn find_section(
        mapping: &mut ElfMapping<M>,
        header: &HeaderInfo,
        section_type: u32,
    ) -> Option<SectionRef> {
        for idx in 0..header.shnum {
            if idx == header.shstrndx {
                continue;
            }
            // Growing relocates the mapping, so the header view is
            // re-derived on every iteration.
            let shdr: &Shdr = view(mapping.bytes(), header.shoff + idx * size_of::<Shdr>())?;
            if shdr.sh_type != section_type {
                continue;
            }
            let section = SectionRef {
                offset: shdr.sh_offset as usize,
                size: shdr.sh_size as usize,
                entsize: shdr.sh_entsize as usize,
            };
            if section.entsize > 0 && !section.size.is_multiple_of(section.entsize) {
                log::warn!(
                    "section size is not a multiple of entry size ({}/{})",
                    section.size,
                    section.entsize
                );
                continue;
            }
            let Some(end) = section.offset.checked_add(section.size) else {
                continue;
            };
            if mapping.grow(end).is_err() {
                log::debug!("section bytes lie past the end of the file, skipping");
                continue;
            }
            return Some(section);
        }
        None
    }

    /// Returns the canonical path of the executable.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Returns the virtual base address of the `PT_LOAD` segment whose
    /// address range contains `addr`, or `None` if no segment does (or the
    /// parser is disabled).
    ///
    /// There is no loader-maintained base address for a static binary, so
    /// the program headers are the authority on what is mapped where.
    pub fn load_segment_containing(&self, addr: usize) -> Option<usize> {
        let header = self.header.as_ref()?;
        let bytes = self.mapping.as_ref()?.bytes();
        let phdrs: &[Phdr] = table(bytes, header.phoff, header.phnum)?;
        phdrs
            .iter()
            .find(|phdr| {
                phdr.p_type == PT_LOAD
                    && addr >= phdr.p_vaddr as usize
                    && addr - phdr.p_vaddr as usize <= phdr.p_memsz as usize
            })
            .map(|phdr| phdr.p_vaddr as usize)
    }

    /// Looks up the function symbol whose `[st_value, st_value + st_size)`
    /// range contains `addr`.
    ///
    /// The scan is a linear walk of the symbol table; static binaries keep
    /// small tables and this only runs on diagnostic paths. The first match
    /// in table order wins.
    pub fn find_symbol(&self, addr: usize) -> Option<&Sym> {
        let symtab = self.symtab?;
        if symtab.entsize != size_of::<Sym>() {
            return None;
        }
        let bytes = self.mapping.as_ref()?.bytes();
        let symbols: &[Sym] = table(bytes, symtab.offset, symtab.size / symtab.entsize)?;
        symbols.iter().find(|sym| {
            st_type(sym.st_info) == STT_FUNC
                && addr >= sym.st_value as usize
                && addr - (sym.st_value as usize) < sym.st_size as usize
        })
    }

    /// Returns the null-terminated name of `symbol` from the string table,
    /// or `None` if the string table is absent or the name offset is out of
    /// range.
    pub fn symbol_name(&self, symbol: &Sym) -> Option<&CStr> {
        let strtab = self.strtab?;
        let bytes = self.mapping.as_ref()?.bytes();
        let name_offset = symbol.st_name as usize;
        if name_offset >= strtab.size {
            return None;
        }
        let strings = bytes.get(strtab.offset..strtab.offset + strtab.size)?;
        CStr::from_bytes_until_nul(&strings[name_offset..]).ok()
    }
}
