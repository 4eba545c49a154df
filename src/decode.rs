//! Byte-level decoding of a wasm object file.
//!
//! This is the front door of the tool: it parses the raw binary into the
//! `ParsedModule` view the reader consumes. Sections are split at their
//! framing (id byte, size varint, payload) without decoding the payloads,
//! except for the "linking" custom section whose subsections (symbol
//! table, segment info, init functions, comdat info) are decoded into the
//! structured metadata types.

use tracing::warn;

use crate::error::FormatError;
use crate::linking::{
    LINKING_METADATA_VERSION, SUBSEC_COMDAT_INFO, SUBSEC_INIT_FUNCS, SUBSEC_SEGMENT_INFO,
    SUBSEC_SYMBOL_TABLE,
};
use crate::module::{
    Comdat, ComdatEntry, DataSegment, InitFunction, LinkingData, ModuleHeader,
    LINKING_SECTION_NAME, SEC_CUSTOM, WASM_MAGIC,
};
use crate::reader::{ParsedModule, ParsedSection};
use crate::symbol::{
    DataRef, Symbol, SymbolPayload, SYMBOL_EXPLICIT_NAME, SYMBOL_UNDEFINED, SYMTAB_DATA,
    SYMTAB_FUNCTION, SYMTAB_GLOBAL, SYMTAB_SECTION, SYMTAB_TABLE, SYMTAB_TAG,
};

/// Bounds-checked forward reader over a byte slice.
struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.data.len()
    }

    fn position(&self) -> usize {
        self.pos
    }

    fn byte(&mut self, what: &'static str) -> Result<u8, FormatError> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or(FormatError::UnexpectedEof(what))?;
        self.pos += 1;
        Ok(byte)
    }

    fn take(&mut self, len: usize, what: &'static str) -> Result<&'a [u8], FormatError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or(FormatError::UnexpectedEof(what))?;
        let bytes = &self.data[self.pos..end];
        self.pos = end;
        Ok(bytes)
    }

    fn uleb128(&mut self, what: &'static str) -> Result<u64, FormatError> {
        let mut result: u64 = 0;
        let mut shift = 0;
        loop {
            let byte = self.byte(what)?;
            if shift >= 64 {
                return Err(FormatError::MalformedVarint);
            }
            result |= u64::from(byte & 0x7f) << shift;
            shift += 7;
            if byte & 0x80 == 0 {
                return Ok(result);
            }
        }
    }

    fn varuint32(&mut self, what: &'static str) -> Result<u32, FormatError> {
        u32::try_from(self.uleb128(what)?).map_err(|_| FormatError::VarintOutOfRange)
    }

    /// A length-prefixed UTF-8 name.
    fn name(&mut self, what: &'static str) -> Result<String, FormatError> {
        let len = self.varuint32(what)?;
        let bytes = self.take(len as usize, what)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| FormatError::InvalidName)
    }
}

/// Decode a single unsigned 32-bit varint from the front of `bytes`,
/// returning the value and the number of bytes it occupied.
pub fn read_varuint32(bytes: &[u8]) -> Result<(u32, usize), FormatError> {
    let mut cursor = Cursor::new(bytes);
    let value = cursor.varuint32("varint")?;
    Ok((value, cursor.position()))
}

/// Parse a wasm object binary into the `ParsedModule` view.
///
/// Section payloads stay borrowed slices of `data`; nothing is copied
/// except names and the linking metadata.
pub fn parse_module(data: &[u8]) -> Result<ParsedModule<'_>, FormatError> {
    let mut cursor = Cursor::new(data);

    if cursor.take(4, "magic")? != WASM_MAGIC {
        return Err(FormatError::BadMagic);
    }
    let version = u32::from_le_bytes(cursor.take(4, "version")?.try_into().unwrap());

    let mut sections = Vec::new();
    let mut linking_payload: Option<&[u8]> = None;

    while !cursor.is_empty() {
        let section_type = cursor.byte("section id")?;
        let size_start = cursor.position();
        let size = cursor.varuint32("section size")?;
        let header_size_len = (cursor.position() - size_start) as u8;
        let payload = cursor.take(size as usize, "section payload")?;

        // Custom section payloads start with the section name; the
        // contents we keep begin right after it, so a reloc section's
        // contents lead with its target-section index.
        let (name, contents) = if section_type == SEC_CUSTOM {
            let mut payload_cursor = Cursor::new(payload);
            let name = payload_cursor.name("custom section name")?;
            (name, &payload[payload_cursor.position()..])
        } else {
            (String::new(), payload)
        };

        if section_type == SEC_CUSTOM && name == LINKING_SECTION_NAME {
            linking_payload = Some(contents);
        }

        sections.push(ParsedSection {
            section_type,
            header_size_len: Some(header_size_len),
            name,
            contents,
        });
    }

    let (symbols, data_segments, linking_data) = match linking_payload {
        Some(payload) => decode_linking(payload)?,
        None => (Vec::new(), Vec::new(), LinkingData::default()),
    };

    Ok(ParsedModule {
        header: ModuleHeader { version },
        sections,
        symbols,
        data_segments,
        linking_data,
    })
}

/// Decode the linking section payload: version varint, then tagged
/// length-prefixed subsections.
pub(crate) fn decode_linking(
    payload: &[u8],
) -> Result<(Vec<Symbol>, Vec<DataSegment>, LinkingData), FormatError> {
    let mut cursor = Cursor::new(payload);

    let version = cursor.varuint32("linking metadata version")?;
    if version != LINKING_METADATA_VERSION {
        return Err(FormatError::UnsupportedMetadataVersion(version));
    }

    let mut symbols = Vec::new();
    let mut data_segments = Vec::new();
    let mut linking_data = LinkingData::default();

    while !cursor.is_empty() {
        let tag = cursor.byte("subsection tag")?;
        let len = cursor.varuint32("subsection length")?;
        let body = cursor.take(len as usize, "subsection payload")?;
        let mut sub = Cursor::new(body);

        match tag {
            SUBSEC_SYMBOL_TABLE => {
                let count = sub.varuint32("symbol count")?;
                symbols.reserve(count as usize);
                for _ in 0..count {
                    symbols.push(decode_symbol(&mut sub)?);
                }
            }
            SUBSEC_SEGMENT_INFO => {
                let count = sub.varuint32("segment count")?;
                for _ in 0..count {
                    data_segments.push(DataSegment {
                        name: sub.name("segment name")?,
                        alignment: sub.varuint32("segment alignment")?,
                        linking_flags: sub.varuint32("segment flags")?,
                    });
                }
            }
            SUBSEC_INIT_FUNCS => {
                let count = sub.varuint32("init function count")?;
                for _ in 0..count {
                    linking_data.init_functions.push(InitFunction {
                        priority: sub.varuint32("init function priority")?,
                        symbol_index: sub.varuint32("init function symbol")?,
                    });
                }
            }
            SUBSEC_COMDAT_INFO => {
                let count = sub.varuint32("comdat count")?;
                for _ in 0..count {
                    let name = sub.name("comdat name")?;
                    let _flags = sub.varuint32("comdat flags")?;
                    let entry_count = sub.varuint32("comdat entry count")?;
                    let mut entries = Vec::with_capacity(entry_count as usize);
                    for _ in 0..entry_count {
                        entries.push(ComdatEntry {
                            kind: sub.varuint32("comdat entry kind")?,
                            index: sub.varuint32("comdat entry index")?,
                        });
                    }
                    linking_data.comdats.push(Comdat { name, entries });
                }
            }
            _ => {
                warn!(tag, "skipping unknown linking subsection");
            }
        }
    }

    Ok((symbols, data_segments, linking_data))
}

fn decode_symbol(cursor: &mut Cursor) -> Result<Symbol, FormatError> {
    let kind = cursor.varuint32("symbol kind")?;
    let flags = cursor.varuint32("symbol flags")?;

    match kind {
        SYMTAB_FUNCTION | SYMTAB_GLOBAL | SYMTAB_TAG | SYMTAB_TABLE => {
            let element_index = cursor.varuint32("element index")?;
            let undefined = flags & SYMBOL_UNDEFINED != 0;
            let explicit_name = flags & SYMBOL_EXPLICIT_NAME != 0;
            // Imported symbols without an explicit name take their name
            // from the import entry, which this decoder does not walk.
            // Such names are never re-emitted, so leave them empty.
            let name = if !undefined || explicit_name {
                cursor.name("symbol name")?
            } else {
                String::new()
            };
            let payload = match kind {
                SYMTAB_FUNCTION => SymbolPayload::Function { element_index },
                SYMTAB_GLOBAL => SymbolPayload::Global { element_index },
                SYMTAB_TAG => SymbolPayload::Tag { element_index },
                _ => SymbolPayload::Table { element_index },
            };
            Ok(Symbol {
                flags,
                name,
                payload,
            })
        }
        SYMTAB_DATA => {
            let name = cursor.name("symbol name")?;
            let data_ref = if flags & SYMBOL_UNDEFINED == 0 {
                Some(DataRef {
                    segment_index: cursor.varuint32("data segment index")?,
                    offset: cursor.uleb128("data offset")?,
                    size: cursor.uleb128("data size")?,
                })
            } else {
                None
            };
            Ok(Symbol {
                flags,
                name,
                payload: SymbolPayload::Data { data_ref },
            })
        }
        SYMTAB_SECTION => {
            let section_index = cursor.varuint32("section index")?;
            Ok(Symbol {
                flags,
                name: String::new(),
                payload: SymbolPayload::Section { section_index },
            })
        }
        other => Err(FormatError::UnknownSymbolKind(other)),
    }
}
