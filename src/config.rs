//! Configuration module.
//!
//! This module defines the command-line interface (CLI) for the tool using `clap`.
//! It handles parsing arguments like the input file, the output path, and the
//! set of sections to remove.

use clap::Parser;
use std::path::PathBuf;

/// A minimal objcopy for WebAssembly object files.
///
/// Removes whole sections from a wasm object file and rebuilds the
/// "linking" metadata section so that the surviving symbol table, data
/// segment info, and init function list stay consistent.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Config {
    /// Input wasm object file
    pub input: PathBuf,

    /// Output file
    #[arg(short, long, default_value = "a.wasm", help = "Path to the output file")]
    pub output: PathBuf,

    /// Section to remove, by name; repeatable. Known sections use their
    /// standard upper-case names (TYPE, CODE, DATA, ...), custom sections
    /// their own names.
    #[arg(long = "remove-section", value_name = "NAME")]
    pub remove_sections: Vec<String>,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", help = "Set the logging level")]
    pub log_level: String,
}
