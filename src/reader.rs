//! Conversion of a parsed module view into the object model.
//!
//! The decoder hands over a `ParsedModule`: the header, a flat list of
//! sections with their raw payloads, and the pre-decoded linking metadata.
//! `into_module` validates section types, wires up relocation-section
//! back-references, recognizes the "linking" section, and assembles the
//! final `Module`. On failure no partial `Module` is ever returned.

use std::borrow::Cow;

use crate::decode;
use crate::error::FormatError;
use crate::module::{
    section_type_name, DataSegment, LinkingData, Module, ModuleHeader, Section,
    LINKING_SECTION_NAME, RELOC_SECTION_PREFIX, SEC_CUSTOM, SEC_LAST_KNOWN,
};
use crate::symbol::Symbol;

/// One section as the decoder saw it: type tag, size-field width, name
/// (empty for non-custom sections), and the payload after the name.
#[derive(Debug)]
pub struct ParsedSection<'a> {
    pub section_type: u8,
    pub header_size_len: Option<u8>,
    pub name: String,
    pub contents: &'a [u8],
}

/// The decoder's whole-module view, consumed to build a `Module`.
#[derive(Debug, Default)]
pub struct ParsedModule<'a> {
    pub header: ModuleHeader,
    pub sections: Vec<ParsedSection<'a>>,
    pub symbols: Vec<Symbol>,
    pub data_segments: Vec<DataSegment>,
    pub linking_data: LinkingData,
}

impl<'a> ParsedModule<'a> {
    /// Assemble the object model from this parsed view.
    pub fn into_module(self) -> Result<Module<'a>, FormatError> {
        let ParsedModule {
            header,
            sections,
            symbols,
            data_segments,
            linking_data,
        } = self;

        let mut module = Module {
            header,
            symbols,
            data_segments,
            ..Module::default()
        };

        for parsed in sections {
            if parsed.section_type > SEC_LAST_KNOWN {
                return Err(FormatError::InvalidSectionType(parsed.section_type));
            }

            let is_custom = parsed.section_type == SEC_CUSTOM;

            if is_custom && parsed.name.starts_with(RELOC_SECTION_PREFIX) {
                let (target, _) = decode::read_varuint32(parsed.contents)?;
                if target as usize >= module.sections.len() {
                    return Err(FormatError::RelocationTargetOutOfRange {
                        index: target,
                        section_count: module.sections.len(),
                    });
                }
                // The reloc section will occupy the next index.
                module.sections[target as usize].relocation_section_index =
                    Some(module.sections.len());
            }

            let index = module.sections.len();
            if is_custom && parsed.name == LINKING_SECTION_NAME {
                module.linking_section_index = Some(index);
                module.linking_data = linking_data.clone();
            }

            // Known sections get standard names so they can be selected;
            // custom sections keep their decoded names.
            let name = if is_custom {
                parsed.name
            } else {
                section_type_name(parsed.section_type).to_string()
            };

            module.sections.push(Section {
                section_type: parsed.section_type,
                header_size_len: parsed.header_size_len,
                name,
                contents: Cow::Borrowed(parsed.contents),
                relocation_section_index: None,
            });
        }

        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::module::{InitFunction, SEC_CODE, SEC_TYPE};

    fn custom(name: &str, contents: &'static [u8]) -> ParsedSection<'static> {
        ParsedSection {
            section_type: SEC_CUSTOM,
            header_size_len: Some(5),
            name: name.to_string(),
            contents,
        }
    }

    fn known(section_type: u8) -> ParsedSection<'static> {
        ParsedSection {
            section_type,
            header_size_len: Some(5),
            name: String::new(),
            contents: &[],
        }
    }

    #[test]
    fn known_sections_get_standard_names() {
        let parsed = ParsedModule {
            sections: vec![known(SEC_TYPE), known(SEC_CODE)],
            ..ParsedModule::default()
        };
        let module = parsed.into_module().unwrap();
        assert_eq!(module.sections[0].name, "TYPE");
        assert_eq!(module.sections[1].name, "CODE");
    }

    #[test]
    fn section_types_beyond_the_last_known_are_rejected() {
        let parsed = ParsedModule {
            sections: vec![ParsedSection {
                section_type: SEC_LAST_KNOWN + 1,
                header_size_len: Some(5),
                name: String::new(),
                contents: &[],
            }],
            ..ParsedModule::default()
        };
        assert_eq!(
            parsed.into_module().unwrap_err(),
            FormatError::InvalidSectionType(SEC_LAST_KNOWN + 1)
        );
    }

    #[test]
    fn reloc_sections_set_their_target_back_reference() {
        let parsed = ParsedModule {
            // reloc payload starts with varint target index 1
            sections: vec![known(SEC_TYPE), known(SEC_CODE), custom("reloc.CODE", &[0x01])],
            ..ParsedModule::default()
        };
        let module = parsed.into_module().unwrap();
        assert_eq!(module.sections[1].relocation_section_index, Some(2));
        assert_eq!(module.sections[0].relocation_section_index, None);
        assert_eq!(module.sections[2].relocation_section_index, None);
    }

    #[test]
    fn reloc_targets_must_already_have_been_parsed() {
        let parsed = ParsedModule {
            // Target index 5 with only one section parsed so far.
            sections: vec![known(SEC_TYPE), custom("reloc.CODE", &[0x05])],
            ..ParsedModule::default()
        };
        assert_eq!(
            parsed.into_module().unwrap_err(),
            FormatError::RelocationTargetOutOfRange {
                index: 5,
                section_count: 1
            }
        );
    }

    #[test]
    fn the_linking_section_is_recognized_and_its_metadata_copied() {
        let linking_data = LinkingData {
            init_functions: vec![InitFunction {
                priority: 1,
                symbol_index: 0,
            }],
            comdats: Vec::new(),
        };
        let parsed = ParsedModule {
            sections: vec![known(SEC_TYPE), custom("linking", &[])],
            linking_data: linking_data.clone(),
            ..ParsedModule::default()
        };
        let module = parsed.into_module().unwrap();
        assert_eq!(module.linking_section_index, Some(1));
        assert_eq!(module.linking_data, linking_data);
    }
}
