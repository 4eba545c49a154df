//! In-place section removal.
//!
//! Removing a section invalidates every positional reference into the
//! section list and every byte offset computed relative to the removed
//! bytes. The removal is done in three phases over the full marked set:
//! mark (predicate matches plus their reloc partners), patch (symbol and
//! section references, against the complete sorted mark list), and only
//! then physically delete. Interleaving mutation with patching would use
//! indices that have already shifted.

use tracing::{debug, trace};

use crate::module::{Module, Section};
use crate::symbol::SymbolPayload;

impl<'a> Module<'a> {
    /// Remove every section matching `to_remove`, along with its
    /// associated relocation section, and patch all surviving references.
    ///
    /// Calling this again with a predicate that matches nothing remaining
    /// is a no-op: neither `sections` nor `symbols` is touched.
    pub fn remove_sections<F>(&mut self, to_remove: F)
    where
        F: Fn(&Section<'a>) -> bool,
    {
        let mut marked: Vec<usize> = Vec::with_capacity(self.sections.len());
        for (index, section) in self.sections.iter().enumerate() {
            if to_remove(section) {
                marked.push(index);
                // Relocation data is meaningless without its target.
                if let Some(reloc) = section.relocation_section_index {
                    marked.push(reloc);
                }
            }
        }
        marked.sort_unstable();
        marked.dedup();

        if marked.is_empty() {
            return;
        }

        for &index in &marked {
            debug!(index, name = %self.sections[index].name, "removing section");
        }

        // Encoded payload sizes of the marked sections, captured before
        // anything moves.
        let marked_sizes: Vec<u64> = marked
            .iter()
            .map(|&index| self.sections[index].encoded_payload_size())
            .collect();

        // Patch every symbol against the full marked set. Section symbols
        // naming a marked section are recorded for removal instead of
        // being patched; their element index must stay pre-shift until
        // the removal pass below.
        let mut doomed_symbols: Vec<usize> = Vec::new();
        for (sym_index, symbol) in self.symbols.iter_mut().enumerate() {
            match &mut symbol.payload {
                SymbolPayload::Function { element_index }
                | SymbolPayload::Global { element_index }
                | SymbolPayload::Tag { element_index }
                | SymbolPayload::Table { element_index } => {
                    let shift = marked.partition_point(|&m| m <= *element_index as usize);
                    *element_index = element_index.saturating_sub(shift as u32);
                }
                SymbolPayload::Data { data_ref } => {
                    // Undefined data symbols carry no resolvable offset.
                    if let Some(data_ref) = data_ref {
                        let removed_bytes: u64 = marked
                            .iter()
                            .zip(&marked_sizes)
                            .take_while(|(&m, _)| m <= data_ref.segment_index as usize)
                            .map(|(_, &size)| size)
                            .sum();
                        data_ref.offset = data_ref.offset.saturating_sub(removed_bytes);
                        trace!(sym_index, removed_bytes, "patched data symbol offset");
                    }
                }
                SymbolPayload::Section { section_index } => {
                    if marked.binary_search(&(*section_index as usize)).is_ok() {
                        doomed_symbols.push(sym_index);
                        continue;
                    }
                    let shift = marked.partition_point(|&m| m <= *section_index as usize);
                    *section_index -= shift as u32;
                }
            }
        }

        // Surviving sections must not point at a removed reloc partner.
        for section in &mut self.sections {
            if let Some(reloc) = section.relocation_section_index {
                if marked.binary_search(&reloc).is_ok() {
                    section.relocation_section_index = None;
                } else {
                    let shift = marked.partition_point(|&m| m < reloc);
                    section.relocation_section_index = Some(reloc - shift);
                }
            }
        }

        // Removing the linking section drops the back-reference; the
        // decoded symbols and linking data stay in the model so they can
        // still be re-emitted if the caller wants them.
        if let Some(linking) = self.linking_section_index {
            if marked.binary_search(&linking).is_ok() {
                debug!("linking section removed; clearing its back-reference");
                self.linking_section_index = None;
            } else {
                let shift = marked.partition_point(|&m| m < linking);
                self.linking_section_index = Some(linking - shift);
            }
        }

        // Physically delete, highest index first so earlier removals do
        // not invalidate later positions.
        for &index in marked.iter().rev() {
            self.sections.remove(index);
        }

        // Section symbols that named a deleted section are meaningless.
        for &index in doomed_symbols.iter().rev() {
            let symbol = self.symbols.remove(index);
            debug!(name = %symbol.name, "removing symbol for deleted section");
        }
    }
}
