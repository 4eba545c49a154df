//! The in-memory object model.
//!
//! A `Module` holds everything an edit session needs: the header, the
//! ordered section list, the symbol table, data segment metadata, and the
//! decoded linking data. Sections and data segments are identified purely
//! by their position in their sequence; every structural edit must keep
//! all positional references consistent (see `remover`).

use std::borrow::Cow;

use crate::symbol::Symbol;

/// Magic bytes at the start of every wasm binary.
pub const WASM_MAGIC: [u8; 4] = [0x00, 0x61, 0x73, 0x6d];

/// Known section type tags.
pub const SEC_CUSTOM: u8 = 0;
pub const SEC_TYPE: u8 = 1;
pub const SEC_IMPORT: u8 = 2;
pub const SEC_FUNCTION: u8 = 3;
pub const SEC_TABLE: u8 = 4;
pub const SEC_MEMORY: u8 = 5;
pub const SEC_GLOBAL: u8 = 6;
pub const SEC_EXPORT: u8 = 7;
pub const SEC_START: u8 = 8;
pub const SEC_ELEM: u8 = 9;
pub const SEC_CODE: u8 = 10;
pub const SEC_DATA: u8 = 11;
pub const SEC_DATACOUNT: u8 = 12;
pub const SEC_TAG: u8 = 13;
pub const SEC_LAST_KNOWN: u8 = SEC_TAG;

/// Name of the linking metadata custom section.
pub const LINKING_SECTION_NAME: &str = "linking";

/// Name prefix shared by all relocation custom sections.
pub const RELOC_SECTION_PREFIX: &str = "reloc.";

/// Standard name for a known (non-custom) section type tag.
///
/// Custom sections keep whatever name they carry in the binary; known
/// sections are given these names so they can be selected by name.
pub fn section_type_name(section_type: u8) -> &'static str {
    match section_type {
        SEC_CUSTOM => "CUSTOM",
        SEC_TYPE => "TYPE",
        SEC_IMPORT => "IMPORT",
        SEC_FUNCTION => "FUNCTION",
        SEC_TABLE => "TABLE",
        SEC_MEMORY => "MEMORY",
        SEC_GLOBAL => "GLOBAL",
        SEC_EXPORT => "EXPORT",
        SEC_START => "START",
        SEC_ELEM => "ELEM",
        SEC_CODE => "CODE",
        SEC_DATA => "DATA",
        SEC_DATACOUNT => "DATACOUNT",
        SEC_TAG => "TAG",
        _ => unreachable!("section type {} was validated at read time", section_type),
    }
}

/// The module header, round-tripped but otherwise opaque to this crate.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModuleHeader {
    pub version: u32,
}

/// One section of the module.
///
/// Each section is an opaque binary blob; this crate never decodes the
/// payload beyond what the reader needs (a reloc section's leading target
/// index). `contents` borrows from the input buffer for sections read
/// from the original binary, and owns its bytes for sections added later.
#[derive(Debug, Clone)]
pub struct Section<'a> {
    pub section_type: u8,
    /// Width in bytes of this section's encoded size field, when known.
    /// Needed to compute byte offsets relative to the payload start.
    pub header_size_len: Option<u8>,
    pub name: String,
    pub contents: Cow<'a, [u8]>,
    /// Index of the reloc.* section targeting this section, if any.
    pub relocation_section_index: Option<usize>,
}

impl<'a> Section<'a> {
    /// Size of this section's payload as encoded in the binary stream:
    /// total content length minus the size-field width (5 when unknown).
    pub fn encoded_payload_size(&self) -> u64 {
        let header_size = u64::from(self.header_size_len.unwrap_or(5));
        (self.contents.len() as u64).saturating_sub(header_size)
    }

    /// Whether this is a custom section.
    pub fn is_custom(&self) -> bool {
        self.section_type == SEC_CUSTOM
    }
}

/// Metadata for one data segment; the segment index is the position in
/// `Module::data_segments`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataSegment {
    pub name: String,
    pub alignment: u32,
    pub linking_flags: u32,
}

/// An entry in the init-function list: `symbol_index` refers into the
/// module symbol table, not the function index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InitFunction {
    pub priority: u32,
    pub symbol_index: u32,
}

/// One member of a comdat group.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComdatEntry {
    pub kind: u32,
    pub index: u32,
}

/// A named group of linkable entities deduplicated as a unit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Comdat {
    pub name: String,
    pub entries: Vec<ComdatEntry>,
}

/// Linking metadata that lives outside the symbol table and segment info.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkingData {
    pub init_functions: Vec<InitFunction>,
    pub comdats: Vec<Comdat>,
}

/// A whole wasm object module, exclusively owned for one edit session.
///
/// Built once by `reader`, mutated in place zero or more times by
/// `remover`, and read (never mutated) by `linking::finalize_linking`.
#[derive(Debug, Default)]
pub struct Module<'a> {
    pub header: ModuleHeader,
    /// Section index == position in this vector. This positional identity
    /// is the central invariant section removal must maintain.
    pub sections: Vec<Section<'a>>,
    pub symbols: Vec<Symbol>,
    pub data_segments: Vec<DataSegment>,
    pub linking_data: LinkingData,
    /// Index of the "linking" custom section, if the module has one.
    pub linking_section_index: Option<usize>,
}

impl<'a> Module<'a> {
    /// Append a section whose contents this module owns (as opposed to
    /// sections read from the binary, which borrow the input buffer).
    pub fn add_section_with_owned_contents(
        &mut self,
        section_type: u8,
        name: impl Into<String>,
        contents: Vec<u8>,
    ) {
        self.sections.push(Section {
            section_type,
            header_size_len: None,
            name: name.into(),
            contents: Cow::Owned(contents),
            relocation_section_index: None,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn encoded_payload_size_defaults_header_width_to_five() {
        let sec = Section {
            section_type: SEC_CUSTOM,
            header_size_len: None,
            name: "blob".to_string(),
            contents: Cow::Owned(vec![0u8; 45]),
            relocation_section_index: None,
        };
        assert_eq!(sec.encoded_payload_size(), 40);

        let sec = Section {
            header_size_len: Some(1),
            ..sec
        };
        assert_eq!(sec.encoded_payload_size(), 44);
    }

    #[test]
    fn added_sections_own_their_contents() {
        let mut module = Module::default();
        module.add_section_with_owned_contents(SEC_CUSTOM, "producers", vec![1, 2, 3]);
        assert_eq!(module.sections.len(), 1);
        assert!(matches!(module.sections[0].contents, Cow::Owned(_)));
        assert_eq!(module.sections[0].name, "producers");
    }
}
