//! Minimal objcopy library for WebAssembly object files.
//!
//! This library provides the core components for the `wobjcopy` tool.
//! It is organized into several modules:
//! - `config`: CLI configuration.
//! - `module`: The in-memory object model (sections, segments, linking data).
//! - `symbol`: Symbol table representation.
//! - `reader`: Conversion of a parsed module view into the object model.
//! - `remover`: In-place section removal with index/offset patching.
//! - `writer`: Append-only byte writer with varint and subsection framing.
//! - `linking`: Re-serialization of the "linking" custom section.
//! - `decode`: Byte-level decoding of a wasm object file.
//! - `emit`: Re-serialization of the whole module binary.

pub mod config;
pub mod decode;
pub mod emit;
pub mod error;
pub mod linking;
pub mod module;
pub mod reader;
pub mod remover;
pub mod symbol;
pub mod writer;

pub use error::FormatError;
pub use module::Module;
