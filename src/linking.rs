//! Re-serialization of the "linking" custom section.
//!
//! `finalize_linking` is a pure function of the module's current symbol
//! table, data segments, and linking data. It produces the replacement
//! payload for the linking section; the emitter substitutes it for the
//! old payload when the module is written back out.

use tracing::debug;

use crate::module::Module;
use crate::symbol::SymbolPayload;
use crate::writer::SectionWriter;

/// Version of the linking metadata format this crate understands.
pub const LINKING_METADATA_VERSION: u32 = 2;

/// Subsection tags within the linking section payload.
pub const SUBSEC_SEGMENT_INFO: u8 = 5;
pub const SUBSEC_INIT_FUNCS: u8 = 6;
pub const SUBSEC_COMDAT_INFO: u8 = 7;
pub const SUBSEC_SYMBOL_TABLE: u8 = 8;

fn write_name(writer: &mut SectionWriter, name: &str) {
    writer.write_unsigned_varint(name.len() as u64);
    writer.write_string(name);
}

impl<'a> Module<'a> {
    /// Serialize the linking metadata into a fresh byte buffer.
    ///
    /// Each subsection is emitted only when it has elements; a module
    /// with no symbols, segments, init functions, or comdats serializes
    /// to nothing but the version varint.
    pub fn finalize_linking(&self) -> Vec<u8> {
        let mut writer = SectionWriter::new();
        writer.write_unsigned_varint(u64::from(LINKING_METADATA_VERSION));

        if !self.symbols.is_empty() {
            writer.start_subsection(SUBSEC_SYMBOL_TABLE);
            writer.write_unsigned_varint(self.symbols.len() as u64);
            for symbol in &self.symbols {
                writer.write_unsigned_varint(u64::from(symbol.kind()));
                writer.write_unsigned_varint(u64::from(symbol.flags));
                match &symbol.payload {
                    SymbolPayload::Function { element_index }
                    | SymbolPayload::Global { element_index }
                    | SymbolPayload::Tag { element_index }
                    | SymbolPayload::Table { element_index } => {
                        writer.write_unsigned_varint(u64::from(*element_index));
                        // Imported symbols take their name from the
                        // import entry unless an explicit name overrides.
                        if !symbol.is_undefined() || symbol.has_explicit_name() {
                            write_name(&mut writer, &symbol.name);
                        }
                    }
                    SymbolPayload::Data { data_ref } => {
                        write_name(&mut writer, &symbol.name);
                        if let Some(data_ref) = data_ref {
                            writer.write_unsigned_varint(u64::from(data_ref.segment_index));
                            writer.write_unsigned_varint(data_ref.offset);
                            writer.write_unsigned_varint(data_ref.size);
                        }
                    }
                    SymbolPayload::Section { section_index } => {
                        writer.write_unsigned_varint(u64::from(*section_index));
                    }
                }
            }
            let len = writer.end_subsection();
            debug!(len, count = self.symbols.len(), "wrote symbol table");
        }

        if !self.data_segments.is_empty() {
            writer.start_subsection(SUBSEC_SEGMENT_INFO);
            writer.write_unsigned_varint(self.data_segments.len() as u64);
            for segment in &self.data_segments {
                write_name(&mut writer, &segment.name);
                writer.write_unsigned_varint(u64::from(segment.alignment));
                writer.write_unsigned_varint(u64::from(segment.linking_flags));
            }
            let len = writer.end_subsection();
            debug!(len, count = self.data_segments.len(), "wrote segment info");
        }

        if !self.linking_data.init_functions.is_empty() {
            writer.start_subsection(SUBSEC_INIT_FUNCS);
            writer.write_unsigned_varint(self.linking_data.init_functions.len() as u64);
            for init in &self.linking_data.init_functions {
                writer.write_unsigned_varint(u64::from(init.priority));
                writer.write_unsigned_varint(u64::from(init.symbol_index));
            }
            let len = writer.end_subsection();
            debug!(len, "wrote init functions");
        }

        if !self.linking_data.comdats.is_empty() {
            writer.start_subsection(SUBSEC_COMDAT_INFO);
            writer.write_unsigned_varint(self.linking_data.comdats.len() as u64);
            for comdat in &self.linking_data.comdats {
                write_name(&mut writer, &comdat.name);
                writer.write_unsigned_varint(0); // flags, reserved
                writer.write_unsigned_varint(comdat.entries.len() as u64);
                for entry in &comdat.entries {
                    writer.write_unsigned_varint(u64::from(entry.kind));
                    writer.write_unsigned_varint(u64::from(entry.index));
                }
            }
            let len = writer.end_subsection();
            debug!(len, "wrote comdat info");
        }

        writer.finalize()
    }
}
