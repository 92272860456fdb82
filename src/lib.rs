//! PDF Decompressor Library
//!
//! Core logic for rebuilding a PDF's object graph and writing it back out as a
//! plain, inspectable file. Shared between CLI and WASM targets.
//!
//! The loaded document is walked from its catalog and info dictionaries into a
//! deduplicated object list, every shared object, dictionary and stream is
//! renumbered as an indirect object, binary stream payloads are re-encoded as
//! ASCII-hex, and a fresh cross-reference table and trailer are written.

#[cfg(target_arch = "wasm32")]
pub mod wasm;

pub mod builder;
pub mod encoder;
pub mod error;
pub mod indirection;
pub mod lopdf_source;
pub mod object;
pub mod source;
pub mod writer;

pub use builder::{build_graph, GraphBuilder};
pub use error::{DecompressError, Result};
pub use lopdf_source::LopdfSource;
pub use object::{ObjRef, Object, ObjectGraph, ObjectList, Value};
pub use source::SourceDocument;
pub use writer::{serialize, WriteSummary};

use log::info;
use lopdf::Document;
use std::io::Write;

/// Options for PDF decompression
#[derive(Debug, Clone, Default)]
pub struct DecompressOptions {
    /// Verbose output
    pub verbose: bool,
}

/// Result of a PDF decompression
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressResult {
    /// Objects constructed from the source graph
    pub total_objects: usize,
    /// Objects written as numbered indirect objects
    pub indirect_objects: usize,
    /// Streams re-encoded as ASCII-hex
    pub hex_streams: usize,
    /// Streams written with their payload untouched
    pub text_streams: usize,
    /// Size of the produced file
    pub bytes_written: u64,
}

/// Decompress an already loaded document into `sink`
pub fn decompress_document<W: Write>(
    doc: &Document,
    sink: W,
    options: &DecompressOptions,
) -> Result<(W, DecompressResult)> {
    if doc.trailer.get(b"Encrypt").is_ok() {
        return Err(DecompressError::Encrypted);
    }

    let source = LopdfSource::new(doc);
    let mut graph = build_graph(&source)?;
    let total_objects = graph.objects.len();
    let (sink, summary) = serialize(&mut graph, sink)?;

    let result = DecompressResult {
        total_objects,
        indirect_objects: summary.indirect_objects,
        hex_streams: summary.hex_streams,
        text_streams: summary.text_streams,
        bytes_written: summary.bytes_written,
    };
    if options.verbose {
        info!(
            "[Write] {} objects, {} indirect, {} hex streams, {} text streams, {} bytes",
            result.total_objects,
            result.indirect_objects,
            result.hex_streams,
            result.text_streams,
            result.bytes_written
        );
    }
    Ok((sink, result))
}

/// Decompress PDF from bytes and return the rewritten PDF bytes
pub fn decompress_pdf_bytes(
    input_bytes: &[u8],
    options: &DecompressOptions,
) -> Result<(Vec<u8>, DecompressResult)> {
    let doc = Document::load_mem(input_bytes).map_err(|e| DecompressError::Load(e.to_string()))?;
    decompress_document(&doc, Vec::new(), options)
}

#[cfg(not(target_arch = "wasm32"))]
pub mod file_ops {
    use super::*;
    use std::path::Path;

    /// Decompress a PDF file into memory.
    ///
    /// The whole output is rendered before it is returned, so a failure never
    /// leaves a truncated file behind.
    pub fn decompress_pdf_file(
        input_path: &Path,
        options: &DecompressOptions,
    ) -> Result<(Vec<u8>, DecompressResult)> {
        let doc = Document::load(input_path)
            .map_err(|e| DecompressError::Load(format!("{:?}: {}", input_path, e)))?;
        decompress_document(&doc, Vec::new(), options)
    }
}
