//! Format error taxonomy.
//!
//! Everything here is a recoverable parse failure reported to the caller;
//! no partially-built `Module` ever escapes alongside one of these.
//! Contract violations (e.g. an unclosed subsection at `finalize`) are
//! panics, not variants of this enum.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FormatError {
    /// A section type tag above the last known section type.
    #[error("invalid section type {0:#04x}")]
    InvalidSectionType(u8),

    /// A reloc.* custom section naming a target section that does not
    /// exist (yet) in the module.
    #[error("relocation target index {index} is out of range ({section_count} sections parsed)")]
    RelocationTargetOutOfRange { index: u32, section_count: usize },

    /// The input does not start with `\0asm`.
    #[error("not a wasm module: bad magic")]
    BadMagic,

    /// Ran out of input bytes mid-structure.
    #[error("unexpected end of input while reading {0}")]
    UnexpectedEof(&'static str),

    /// A varint with continuation bits running past its maximum width.
    #[error("malformed varint")]
    MalformedVarint,

    /// A varint that decodes fine but exceeds the 32-bit range the
    /// surrounding field allows.
    #[error("varint is outside 32-bit bounds")]
    VarintOutOfRange,

    /// A name field that is not valid UTF-8.
    #[error("name is not valid UTF-8")]
    InvalidName,

    /// A linking section whose metadata version we do not understand.
    #[error("unsupported linking metadata version {0}")]
    UnsupportedMetadataVersion(u32),

    /// A symbol table entry with an unknown kind tag.
    #[error("unknown symbol kind {0}")]
    UnknownSymbolKind(u32),
}
