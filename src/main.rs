//! Entry point for the wobjcopy tool.
//!
//! This file handles high-level application flow:
//! 1. Parse command-line arguments using `clap`.
//! 2. Map the input file into memory and decode it into the object model.
//! 3. Remove the requested sections, patching every surviving reference.
//! 4. Rebuild the linking section and write the output binary.
//!
//! Error handling is done via `anyhow`.

use anyhow::{Context, Result};
use clap::Parser;
use memmap2::Mmap;
use std::fs::File;

use wobjcopy::config::Config;
use wobjcopy::{decode, emit};

fn main() -> Result<()> {
    let config = Config::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_new(&config.log_level)
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let file = File::open(&config.input)
        .with_context(|| format!("failed to open {}", config.input.display()))?;
    let mmap = unsafe { Mmap::map(&file)? };

    let parsed = decode::parse_module(&mmap)
        .with_context(|| format!("failed to parse {}", config.input.display()))?;
    let mut module = parsed
        .into_module()
        .context("failed to build the object model")?;

    if !config.remove_sections.is_empty() {
        module.remove_sections(|section| {
            config
                .remove_sections
                .iter()
                .any(|name| name == &section.name)
        });
    }

    let output = emit::write_module(&module);
    std::fs::write(&config.output, &output)
        .with_context(|| format!("failed to write {}", config.output.display()))?;

    println!("Wrote {}", config.output.display());
    Ok(())
}
