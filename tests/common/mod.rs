//! Builds synthetic 64-bit static ELF executables for parser tests.
//!
//! The canonical fixture is a little-endian `ET_EXEC` image with one
//! `PT_LOAD` segment covering `[0x0, 0x2000]` and a symbol table holding a
//! function symbol `f` spanning `[0x1000, 0x1020)`. Knobs on [`TestElf`]
//! corrupt individual structures to exercise each rejection and skip path.

#![allow(dead_code)]

use std::path::PathBuf;

const EHDR_SIZE: u64 = 64;
const PHDR_SIZE: u64 = 56;
const SHDR_SIZE: u64 = 64;
const SYM_SIZE: u64 = 24;

const ET_EXEC: u16 = 2;
const ET_DYN: u16 = 3;
const PT_LOAD: u32 = 1;
const PT_INTERP: u32 = 3;
const SHT_SYMTAB: u32 = 2;
const SHT_STRTAB: u32 = 3;

/// Configuration for one synthetic executable.
pub struct TestElf {
    pub magic: [u8; 4],
    pub class: u8,
    pub e_type: u16,
    pub version: u32,
    pub ehsize: u16,
    /// Add a `PT_INTERP` program header, marking the binary dynamic.
    pub with_interp: bool,
    /// Give the symbol table a size that is not a multiple of its entry
    /// size.
    pub corrupt_symtab: bool,
    /// Add a second, well-formed symbol table section after the first.
    pub duplicate_symtab: bool,
    /// Point the symbol table's bytes past the end of the file.
    pub symtab_past_eof: bool,
}

impl Default for TestElf {
    fn default() -> Self {
        Self {
            magic: *b"\x7fELF",
            class: 2,
            e_type: ET_EXEC,
            version: 1,
            ehsize: EHDR_SIZE as u16,
            with_interp: false,
            corrupt_symtab: false,
            duplicate_symtab: false,
            symtab_past_eof: false,
        }
    }
}

struct Out(Vec<u8>);

impl Out {
    fn u16(&mut self, v: u16) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }
    fn u32(&mut self, v: u32) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }
    fn u64(&mut self, v: u64) {
        self.0.extend_from_slice(&v.to_le_bytes());
    }
    fn bytes(&mut self, v: &[u8]) {
        self.0.extend_from_slice(v);
    }
    fn pad_to(&mut self, offset: u64) {
        assert!(self.0.len() as u64 <= offset);
        self.0.resize(offset as usize, 0);
    }
}

struct Shdr {
    sh_type: u32,
    offset: u64,
    size: u64,
    entsize: u64,
}

fn write_sym(out: &mut Out, name: u32, info: u8, value: u64, size: u64) {
    out.u32(name);
    out.bytes(&[info, 0]);
    out.u16(1); // st_shndx
    out.u64(value);
    out.u64(size);
}

impl TestElf {
    pub fn build(&self) -> Vec<u8> {
        let phnum: u64 = if self.with_interp { 2 } else { 1 };
        let phoff = EHDR_SIZE;

        // Three entries: the null symbol, `f`, and `g` whose name offset
        // lies outside the string table.
        let symtab_off = phoff + PHDR_SIZE * phnum;
        let symtab_size = 3 * SYM_SIZE;
        let dup_off = symtab_off + symtab_size;
        let strtab_off = dup_off + if self.duplicate_symtab { symtab_size } else { 0 };
        let strtab = b"\0f\0";
        let shstr_off = strtab_off + strtab.len() as u64;
        let shoff = (shstr_off + 1).next_multiple_of(8);

        let mut sections = vec![
            Shdr {
                sh_type: 0,
                offset: 0,
                size: 0,
                entsize: 0,
            },
            // Section-name string table; e_shstrndx points here and the
            // parser must never pick it as the symbol string table.
            Shdr {
                sh_type: SHT_STRTAB,
                offset: shstr_off,
                size: 1,
                entsize: 0,
            },
            Shdr {
                sh_type: SHT_SYMTAB,
                offset: if self.symtab_past_eof {
                    0x10000
                } else {
                    symtab_off
                },
                size: if self.corrupt_symtab {
                    symtab_size - 2
                } else {
                    symtab_size
                },
                entsize: SYM_SIZE,
            },
            Shdr {
                sh_type: SHT_STRTAB,
                offset: strtab_off,
                size: strtab.len() as u64,
                entsize: 0,
            },
        ];
        if self.duplicate_symtab {
            sections.push(Shdr {
                sh_type: SHT_SYMTAB,
                offset: dup_off,
                size: symtab_size,
                entsize: SYM_SIZE,
            });
        }

        let mut out = Out(Vec::new());

        // ELF header
        let mut ident = [0u8; 16];
        ident[0..4].copy_from_slice(&self.magic);
        ident[4] = self.class;
        ident[5] = 1; // little-endian
        ident[6] = 1; // EV_CURRENT
        out.bytes(&ident);
        out.u16(self.e_type);
        out.u16(62); // EM_X86_64
        out.u32(self.version);
        out.u64(0x1000); // e_entry
        out.u64(phoff);
        out.u64(shoff);
        out.u32(0); // e_flags
        out.u16(self.ehsize);
        out.u16(PHDR_SIZE as u16);
        out.u16(phnum as u16);
        out.u16(SHDR_SIZE as u16);
        out.u16(sections.len() as u16);
        out.u16(1); // e_shstrndx

        // Program headers: one PT_LOAD over [0x0, 0x2000].
        out.u32(PT_LOAD);
        out.u32(5); // R+X
        out.u64(0); // p_offset
        out.u64(0); // p_vaddr
        out.u64(0); // p_paddr
        out.u64(0); // p_filesz
        out.u64(0x2000); // p_memsz
        out.u64(0x1000); // p_align
        if self.with_interp {
            out.u32(PT_INTERP);
            out.u32(4);
            for _ in 0..6 {
                out.u64(0);
            }
        }

        // Symbol table: null, f at [0x1000, 0x1020), g with a name offset
        // past the end of the string table.
        assert_eq!(out.0.len() as u64, symtab_off);
        let write_symtab = |out: &mut Out| {
            write_sym(out, 0, 0, 0, 0);
            write_sym(out, 1, 0x12, 0x1000, 0x20); // GLOBAL | FUNC
            write_sym(out, 0x9999, 0x12, 0x1800, 0x10);
        };
        write_symtab(&mut out);
        if self.duplicate_symtab {
            write_symtab(&mut out);
        }

        out.bytes(strtab);
        out.bytes(b"\0"); // section-name string table

        out.pad_to(shoff);
        for shdr in &sections {
            out.u32(0); // sh_name
            out.u32(shdr.sh_type);
            out.u64(0); // sh_flags
            out.u64(0); // sh_addr
            out.u64(shdr.offset);
            out.u64(shdr.size);
            out.u32(0); // sh_link
            out.u32(0); // sh_info
            out.u64(8); // sh_addralign
            out.u64(shdr.entsize);
        }

        out.0
    }

    /// Writes the image to a uniquely named file in the temp directory and
    /// returns its path.
    pub fn write(&self, name: &str) -> PathBuf {
        write_fixture(name, &self.build())
    }
}

pub fn write_fixture(name: &str, bytes: &[u8]) -> PathBuf {
    let path = std::env::temp_dir().join(format!("image_inspect_{}_{}", name, std::process::id()));
    std::fs::write(&path, bytes).unwrap();
    path
}
