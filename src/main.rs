//! PDF Decompressor CLI
//!
//! Command-line interface for rewriting PDFs with decoded, ASCII-safe streams.

use anyhow::Context;
use clap::Parser;
use decompress_pdf::{file_ops::decompress_pdf_file, DecompressOptions};
use env_logger::Env;
use log::warn;
use std::collections::HashSet;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Rebuild PDFs with ASCII-hex streams and a fresh cross-reference table
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input PDF file paths
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for rewritten files (default: concatenate to stdout)
    #[arg(short, long)]
    output_dir: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long)]
    verbose: bool,
}

fn output_path(dir: &Path, input: &Path) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output".to_string());
    dir.join(format!("{}.pdf", stem))
}

fn process(
    input: &Path,
    args: &Args,
    options: &DecompressOptions,
    written: &mut HashSet<PathBuf>,
) -> anyhow::Result<()> {
    let (bytes, result) = decompress_pdf_file(input, options)?;

    match &args.output_dir {
        Some(dir) => {
            let path = output_path(dir, input);
            if !written.insert(path.clone()) {
                warn!(
                    "{:?} was already written in this run, overwriting it with {:?}",
                    path, input
                );
            }
            fs::write(&path, &bytes).with_context(|| format!("cannot write {:?}", path))?;
            if args.verbose {
                eprintln!("Output saved to: {:?}", path);
            }
        }
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(&bytes)?;
            stdout.flush()?;
        }
    }

    if args.verbose {
        eprintln!(
            "{:?}: {} objects, {} indirect, {} streams hex-encoded, {} kept as text",
            input,
            result.total_objects,
            result.indirect_objects,
            result.hex_streams,
            result.text_streams
        );
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_filter = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    if let Some(dir) = &args.output_dir {
        fs::create_dir_all(dir).with_context(|| format!("cannot create {:?}", dir))?;
    }

    let options = DecompressOptions {
        verbose: args.verbose,
    };

    let mut written = HashSet::new();
    for input in &args.inputs {
        if let Err(e) = process(input, &args, &options, &mut written) {
            eprintln!("{} -> {}", e, input.display());
        }
    }

    Ok(())
}
