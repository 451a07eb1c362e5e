//! # image-inspect
//! Runtime discovery of compiler-emitted metadata in loaded ELF images, and
//! address-to-symbol resolution that works even without a dynamic loader.
//!
//! Two subsystems:
//! - [`registry`]: per-kind registries that collect `(pointer, size)`
//!   metadata section blocks from images as they load, buffer them until
//!   the consuming lookup tables activate, and then forward every block in
//!   contribution order.
//! - [`static_binary`] / [`symbolicate`]: a parser over the running
//!   statically linked executable's raw ELF structure, and a process-wide
//!   symbolicator built on it, answering "which symbol and which image
//!   contains this address" when there is no loader to ask.
//!
//! ## Example
//! ```no_run
//! let info = image_inspect::lookup_symbol(image_inspect::lookup_symbol as usize);
//! println!("{} in {}", info.symbol_name.map(|n| n.to_string_lossy()).unwrap_or_default(), info.image_path);
//! ```

#[cfg(not(any(target_pointer_width = "64", target_pointer_width = "32")))]
compile_error!("unsupported pointer width");

mod defs;
mod error;
pub mod mmap;
mod os;
pub mod registry;
pub mod static_binary;
pub mod symbolicate;

pub use defs::Sym;
pub use error::Error;
pub(crate) use error::{io_error, map_error, parse_ehdr_error, parse_phdr_error, parse_shdr_error};
pub use registry::{
    SectionInfo, SectionRegistry, add_protocol_conformance_block, add_type_metadata_block,
    initialize_protocol_conformance_lookup, initialize_type_metadata_lookup,
};
pub use static_binary::StaticBinaryElf;
pub use symbolicate::{SymbolInfo, lookup_symbol, resolve};

pub type Result<T> = core::result::Result<T, Error>;
