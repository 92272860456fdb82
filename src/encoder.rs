//! Stream payload encoding

use crate::object::{ObjRef, ObjectList, PayloadFormat, Stream, Value};
use std::borrow::Cow;

/// Source bytes per line of ASCII-hex output (two digits each)
pub const HEX_LINE_BYTES: usize = 20;

const HEX_DIGITS: &[u8; 16] = b"0123456789ABCDEF";

/// Payload as it will appear between `stream` and `endstream`
#[derive(Debug, Clone, PartialEq)]
pub struct EncodedStream<'a> {
    pub bytes: Cow<'a, [u8]>,
    /// Filter chain to declare, outermost first
    pub filters: Vec<Vec<u8>>,
    pub hex: bool,
    pub decode_parms: DecodeParms,
}

/// How the `DecodeParms` entry is written for the encoded payload
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeParms {
    Absent,
    /// The stream's own entry, which still lines up with `filters`
    Declared(ObjRef),
    /// One slot per entry of `filters`; `None` is written as `null`
    PerFilter(Vec<Option<ObjRef>>),
}

impl EncodedStream<'_> {
    /// Value of the written `Length` entry
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Encode a stream payload.
///
/// Metadata streams and streams marked as text keep their bytes; everything
/// else becomes uppercase ASCII-hex behind an `ASCIIHexDecode` filter.
pub fn encode<'a>(objects: &ObjectList, stream: &'a Stream, as_text: bool) -> EncodedStream<'a> {
    let is_metadata = stream
        .dict
        .get(b"Type")
        .and_then(|t| objects.value(t).as_name())
        == Some(b"Metadata".as_slice());

    let mut filters = match stream.format {
        PayloadFormat::Raw => Vec::new(),
        PayloadFormat::Jpeg => vec![b"DCTDecode".to_vec()],
        PayloadFormat::Jpeg2000 => vec![b"JPXDecode".to_vec()],
        PayloadFormat::Undecoded => declared_filters(objects, stream),
    };
    let parms = match stream.format {
        PayloadFormat::Raw => None,
        _ => stream.dict.get(b"DecodeParms"),
    };

    if is_metadata || as_text {
        return EncodedStream {
            bytes: Cow::Borrowed(&stream.content),
            filters,
            hex: false,
            decode_parms: parms.map_or(DecodeParms::Absent, DecodeParms::Declared),
        };
    }

    filters.insert(0, b"ASCIIHexDecode".to_vec());
    EncodedStream {
        bytes: Cow::Owned(hex_lines(&stream.content)),
        filters,
        hex: true,
        decode_parms: parms.map_or(DecodeParms::Absent, |p| behind_hex_stage(objects, p)),
    }
}

/// Shift the declared parameters one slot right, past `ASCIIHexDecode`
fn behind_hex_stage(objects: &ObjectList, parms: ObjRef) -> DecodeParms {
    let stages = match objects.value(parms) {
        Value::Array(items) => items.clone(),
        _ => vec![parms],
    };
    let slots: Vec<Option<ObjRef>> = std::iter::once(None)
        .chain(
            stages
                .into_iter()
                .map(|p| (!matches!(objects.value(p), Value::Null)).then_some(p)),
        )
        .collect();
    if slots.iter().all(Option::is_none) {
        DecodeParms::Absent
    } else {
        DecodeParms::PerFilter(slots)
    }
}

/// Filter names the stream dictionary declares
fn declared_filters(objects: &ObjectList, stream: &Stream) -> Vec<Vec<u8>> {
    let Some(filter) = stream.dict.get(b"Filter") else {
        return Vec::new();
    };
    match objects.value(filter) {
        Value::Name(n) => vec![n.clone()],
        Value::Array(items) => items
            .iter()
            .filter_map(|&f| objects.value(f).as_name().map(<[u8]>::to_vec))
            .collect(),
        _ => Vec::new(),
    }
}

/// Uppercase hex, [`HEX_LINE_BYTES`] source bytes per line, newline terminated
pub fn hex_lines(data: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(data.len() * 2 + data.len() / HEX_LINE_BYTES + 1);
    for (i, chunk) in data.chunks(HEX_LINE_BYTES).enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        for &byte in chunk {
            out.push(HEX_DIGITS[usize::from(byte >> 4)]);
            out.push(HEX_DIGITS[usize::from(byte & 0x0F)]);
        }
    }
    out.push(b'\n');
    out
}
