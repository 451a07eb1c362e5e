use std::borrow::Cow;
use std::fmt::Display;

/// Error types used internally while inspecting a binary image.
///
/// None of these errors ever reach a caller of the public API: a failure
/// while parsing the executable degrades the parser to a disabled state in
/// which every query answers "not found". The variants exist so each failure
/// site can name its cause once before being swallowed.
#[derive(Debug)]
pub enum Error {
    /// An error occurred while opening or measuring the executable file.
    Io {
        /// A descriptive message about the I/O error.
        msg: Cow<'static, str>,
    },

    /// An error occurred while mapping, growing, or unmapping the file.
    Mmap {
        /// A descriptive message about the memory mapping error.
        msg: Cow<'static, str>,
    },

    /// The ELF header failed validation.
    ///
    /// Covers bad magic bytes, a class that does not match the host pointer
    /// width, a type other than `ET_EXEC`, a stale version, or a header size
    /// that does not match the host header layout.
    ParseEhdr {
        /// A descriptive message about the ELF header parsing error.
        msg: Cow<'static, str>,
    },

    /// The program header table could not be used.
    ///
    /// Covers an out-of-range table, an entry stride that does not match the
    /// host layout, and the presence of `PT_INTERP` (a dynamically linked
    /// executable, which this parser does not handle).
    ParsePhdr {
        /// A descriptive message about the program header parsing error.
        msg: Cow<'static, str>,
    },

    /// The section header table could not be used.
    ParseShdr {
        /// A descriptive message about the section header parsing error.
        msg: Cow<'static, str>,
    },
}

impl Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io { msg } => write!(f, "I/O error: {msg}"),
            Error::Mmap { msg } => write!(f, "Memory mapping error: {msg}"),
            Error::ParseEhdr { msg } => write!(f, "ELF header parsing error: {msg}"),
            Error::ParsePhdr { msg } => write!(f, "Program header parsing error: {msg}"),
            Error::ParseShdr { msg } => write!(f, "Section header parsing error: {msg}"),
        }
    }
}

impl std::error::Error for Error {}

/// Creates an I/O error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn io_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Io { msg: msg.into() }
}

/// Creates a memory mapping error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn map_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::Mmap { msg: msg.into() }
}

/// Creates an ELF header parsing error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn parse_ehdr_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParseEhdr { msg: msg.into() }
}

/// Creates a program header parsing error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn parse_phdr_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParsePhdr { msg: msg.into() }
}

/// Creates a section header parsing error with the specified message.
#[cold]
#[inline(never)]
pub(crate) fn parse_shdr_error(msg: impl Into<Cow<'static, str>>) -> Error {
    Error::ParseShdr { msg: msg.into() }
}
