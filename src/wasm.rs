//! WebAssembly bindings for PDF Decompressor

use crate::{decompress_pdf_bytes, DecompressOptions};
use wasm_bindgen::prelude::*;

/// Initialize panic hook for better error messages in browser console
#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

/// Rewrite a PDF with decoded, ASCII-hex streams
///
/// # Arguments
/// * `pdf_bytes` - The input PDF file as a byte array
///
/// # Returns
/// The rewritten PDF as a byte array, or throws an error
#[wasm_bindgen]
pub fn decompress_pdf(pdf_bytes: &[u8]) -> Result<Vec<u8>, JsError> {
    let (output_bytes, _result) = decompress_pdf_bytes(pdf_bytes, &DecompressOptions::default())
        .map_err(|e| JsError::new(&e.to_string()))?;

    Ok(output_bytes)
}

/// Rewrite a PDF and report what was written
#[wasm_bindgen]
pub fn decompress_pdf_with_info(pdf_bytes: &[u8]) -> Result<DecompressResultJs, JsError> {
    let (output_bytes, result) = decompress_pdf_bytes(pdf_bytes, &DecompressOptions::default())
        .map_err(|e| JsError::new(&e.to_string()))?;

    let info_json = serde_json::json!({
        "totalObjects": result.total_objects,
        "indirectObjects": result.indirect_objects,
        "hexStreams": result.hex_streams,
        "textStreams": result.text_streams,
        "bytesWritten": result.bytes_written,
    })
    .to_string();

    Ok(DecompressResultJs {
        pdf_bytes: output_bytes,
        indirect_objects: result.indirect_objects,
        hex_streams: result.hex_streams,
        text_streams: result.text_streams,
        info_json,
    })
}

/// Result of a PDF rewrite with statistics
#[wasm_bindgen]
pub struct DecompressResultJs {
    pdf_bytes: Vec<u8>,
    indirect_objects: usize,
    hex_streams: usize,
    text_streams: usize,
    info_json: String,
}

#[wasm_bindgen]
impl DecompressResultJs {
    /// Get the rewritten PDF bytes
    #[wasm_bindgen(getter)]
    pub fn pdf_bytes(&self) -> Vec<u8> {
        self.pdf_bytes.clone()
    }

    /// Get the number of indirect objects written
    #[wasm_bindgen(getter)]
    pub fn indirect_objects(&self) -> usize {
        self.indirect_objects
    }

    /// Get the number of streams re-encoded as ASCII-hex
    #[wasm_bindgen(getter)]
    pub fn hex_streams(&self) -> usize {
        self.hex_streams
    }

    /// Get the number of streams written unmodified
    #[wasm_bindgen(getter)]
    pub fn text_streams(&self) -> usize {
        self.text_streams
    }

    /// Get the statistics as a JSON string
    #[wasm_bindgen(getter)]
    pub fn info_json(&self) -> String {
        self.info_json.clone()
    }
}
