//! Symbol table representation.
//!
//! Symbols come out of the linking section's symbol table. The payload is
//! a sum type over the five symbol kinds so that an unhandled kind is a
//! compile-time exhaustiveness error rather than a runtime check.

/// Symbol kind tags as encoded in the symbol table.
pub const SYMTAB_FUNCTION: u32 = 0;
pub const SYMTAB_DATA: u32 = 1;
pub const SYMTAB_GLOBAL: u32 = 2;
pub const SYMTAB_SECTION: u32 = 3;
pub const SYMTAB_TAG: u32 = 4;
pub const SYMTAB_TABLE: u32 = 5;

/// Symbol flag bits.
pub const SYMBOL_BINDING_WEAK: u32 = 0x01;
pub const SYMBOL_BINDING_LOCAL: u32 = 0x02;
pub const SYMBOL_VISIBILITY_HIDDEN: u32 = 0x04;
pub const SYMBOL_UNDEFINED: u32 = 0x10;
pub const SYMBOL_EXPORTED: u32 = 0x20;
pub const SYMBOL_EXPLICIT_NAME: u32 = 0x40;
pub const SYMBOL_NO_STRIP: u32 = 0x80;

/// Location of a defined data symbol within its segment.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DataRef {
    /// Index into the module's data segment list.
    pub segment_index: u32,
    /// Byte offset within the surviving binary layout; patched when
    /// sections positioned before the segment are removed.
    pub offset: u64,
    pub size: u64,
}

/// Kind-dependent symbol payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolPayload {
    Function { element_index: u32 },
    Global { element_index: u32 },
    Tag { element_index: u32 },
    Table { element_index: u32 },
    /// `data_ref` is `None` exactly when the symbol is undefined.
    Data { data_ref: Option<DataRef> },
    /// `section_index` refers into the module's section list.
    Section { section_index: u32 },
}

/// One entry of the module symbol table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub flags: u32,
    pub name: String,
    pub payload: SymbolPayload,
}

impl Symbol {
    /// The wire tag for this symbol's kind.
    pub fn kind(&self) -> u32 {
        match self.payload {
            SymbolPayload::Function { .. } => SYMTAB_FUNCTION,
            SymbolPayload::Data { .. } => SYMTAB_DATA,
            SymbolPayload::Global { .. } => SYMTAB_GLOBAL,
            SymbolPayload::Section { .. } => SYMTAB_SECTION,
            SymbolPayload::Tag { .. } => SYMTAB_TAG,
            SymbolPayload::Table { .. } => SYMTAB_TABLE,
        }
    }

    pub fn is_undefined(&self) -> bool {
        self.flags & SYMBOL_UNDEFINED != 0
    }

    pub fn has_explicit_name(&self) -> bool {
        self.flags & SYMBOL_EXPLICIT_NAME != 0
    }
}
