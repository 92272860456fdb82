//! PDF serializer
//!
//! A single forward pass over the sink: header, every indirect object in
//! construction order, the cross-reference table, then the trailer. Offsets
//! are recorded on the way and only referenced afterwards, never patched.

use crate::encoder::{encode, DecodeParms};
use crate::error::{DecompressError, Result};
use crate::indirection::{assign_serials, classify, Classification};
use crate::object::{Number, ObjRef, ObjectGraph, ObjectList, Stream, Value};
use log::debug;
use std::collections::BTreeMap;
use std::io::{self, Write};

/// Comment line following the version banner; high-bit bytes flag binary content
pub const BINARY_MARKER: &[u8] = b"%\xE2\xE3\xCF\xD3\n";

/// Entry 0 of the cross-reference table
const XREF_ZERO_ENTRY: &[u8] = b"0000000000 00000 n \n";

/// Counts bytes passed through to the inner sink
struct CountingWriter<W> {
    inner: W,
    written: u64,
}

impl<W: Write> Write for CountingWriter<W> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let n = self.inner.write(buf)?;
        self.written += n as u64;
        Ok(n)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// Section the writer is about to produce
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriterState {
    Header,
    Body,
    Xref,
    Trailer,
    Done,
}

impl WriterState {
    fn name(self) -> &'static str {
        match self {
            WriterState::Header => "header",
            WriterState::Body => "body",
            WriterState::Xref => "xref",
            WriterState::Trailer => "trailer",
            WriterState::Done => "done",
        }
    }
}

/// What a finished write produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteSummary {
    pub indirect_objects: usize,
    pub hex_streams: usize,
    pub text_streams: usize,
    pub bytes_written: u64,
}

/// Streaming PDF writer over a prepared object list.
///
/// Serial numbers must already be assigned; see [`serialize`] for the whole
/// pipeline.
pub struct PdfWriter<'g, W: Write> {
    sink: CountingWriter<W>,
    objects: &'g ObjectList,
    classification: &'g Classification,
    max_serial: u32,
    state: WriterState,
    origin: u64,
    offsets: BTreeMap<u32, u64>,
    startxref: u64,
    summary: WriteSummary,
}

impl<'g, W: Write> PdfWriter<'g, W> {
    pub fn new(
        sink: W,
        objects: &'g ObjectList,
        classification: &'g Classification,
        max_serial: u32,
    ) -> Self {
        PdfWriter {
            sink: CountingWriter {
                inner: sink,
                written: 0,
            },
            objects,
            classification,
            max_serial,
            state: WriterState::Header,
            origin: 0,
            offsets: BTreeMap::new(),
            startxref: 0,
            summary: WriteSummary::default(),
        }
    }

    pub fn state(&self) -> WriterState {
        self.state
    }

    fn expect(&self, expected: WriterState) -> Result<()> {
        if self.state == expected {
            Ok(())
        } else {
            Err(DecompressError::WriterState {
                expected: expected.name(),
                found: self.state.name(),
            })
        }
    }

    fn position(&self) -> u64 {
        self.sink.written - self.origin
    }

    pub fn write_header(&mut self, version: (u8, u8)) -> Result<()> {
        self.expect(WriterState::Header)?;
        self.origin = self.sink.written;
        writeln!(self.sink, "%PDF-{}.{}", version.0, version.1)?;
        self.sink.write_all(BINARY_MARKER)?;
        self.state = WriterState::Body;
        Ok(())
    }

    /// Write every object that carries a serial number
    pub fn write_body(&mut self) -> Result<()> {
        self.expect(WriterState::Body)?;
        let objects = self.objects;
        for (r, object) in objects.iter() {
            if object.serial() != 0 {
                self.write_object(r)?;
            }
        }
        Ok(())
    }

    /// Write one indirect object and record its offset
    pub fn write_object(&mut self, r: ObjRef) -> Result<()> {
        self.expect(WriterState::Body)?;
        let serial = self.objects.get(r).serial();
        if serial == 0 {
            return Err(DecompressError::offset_table(format!(
                "object #{} has no serial number",
                r.index()
            )));
        }
        let offset = self.position();
        if self.offsets.insert(serial, offset).is_some() {
            return Err(DecompressError::offset_table(format!(
                "serial {} written twice",
                serial
            )));
        }

        write!(self.sink, "{} 0 obj\n", serial)?;
        self.write_value(r)?;
        self.sink.write_all(b"\nendobj\n")?;
        self.summary.indirect_objects += 1;
        Ok(())
    }

    pub fn write_xref(&mut self) -> Result<()> {
        self.expect(WriterState::Body)?;
        self.state = WriterState::Xref;

        if self.offsets.len() != self.max_serial as usize {
            return Err(DecompressError::offset_table(format!(
                "{} offsets recorded for {} serial numbers",
                self.offsets.len(),
                self.max_serial
            )));
        }

        self.startxref = self.position();
        let size = self.max_serial + 1;
        write!(self.sink, "xref\n0 {}\n", size)?;
        self.sink.write_all(XREF_ZERO_ENTRY)?;
        for serial in 1..=self.max_serial {
            let offset = self.offsets.get(&serial).ok_or_else(|| {
                DecompressError::offset_table(format!("no offset recorded for serial {}", serial))
            })?;
            write!(self.sink, "{:010} 00000 n \n", offset)?;
        }

        self.state = WriterState::Trailer;
        Ok(())
    }

    pub fn write_trailer(&mut self, root: ObjRef, info: Option<ObjRef>) -> Result<()> {
        self.expect(WriterState::Trailer)?;
        let root = self.indirect_serial(root, "Root")?;
        let info = info
            .map(|info| self.indirect_serial(info, "Info"))
            .transpose()?;

        write!(self.sink, "trailer\n<< /Size {} /Root {} 0 R", self.max_serial + 1, root)?;
        if let Some(info) = info {
            write!(self.sink, " /Info {} 0 R", info)?;
        }
        write!(self.sink, " >>\nstartxref\n{}\n%%EOF\n", self.startxref)?;
        self.sink.flush()?;

        self.state = WriterState::Done;
        Ok(())
    }

    /// Hand back the sink together with what was written
    pub fn finish(self) -> Result<(W, WriteSummary)> {
        self.expect(WriterState::Done)?;
        let mut summary = self.summary;
        summary.bytes_written = self.sink.written - self.origin;
        Ok((self.sink.inner, summary))
    }

    fn indirect_serial(&self, r: ObjRef, role: &str) -> Result<u32> {
        match self.objects.get(r).serial() {
            0 => Err(DecompressError::offset_table(format!(
                "{} object is not indirect",
                role
            ))),
            serial => Ok(serial),
        }
    }

    /// Write a child either as `n 0 R` or in place
    fn write_reference(&mut self, r: ObjRef) -> Result<()> {
        let objects = self.objects;
        let object = objects.get(r);
        if object.is_indirection_required() {
            if object.serial() == 0 {
                return Err(DecompressError::offset_table(format!(
                    "object #{} needs indirection but has no serial number",
                    r.index()
                )));
            }
            write!(self.sink, "{} 0 R", object.serial())?;
            Ok(())
        } else {
            self.write_value(r)
        }
    }

    fn write_value(&mut self, r: ObjRef) -> Result<()> {
        let objects = self.objects;
        match objects.value(r) {
            Value::Null => self.sink.write_all(b"null")?,
            Value::Boolean(b) => write!(self.sink, "{}", b)?,
            Value::Number(n) => self.sink.write_all(format_number(*n).as_bytes())?,
            Value::String(s) => self.sink.write_all(&literal_string(s))?,
            Value::Name(n) => {
                self.sink.write_all(b"/")?;
                self.sink.write_all(&escape_name(n))?;
            }
            Value::Array(items) => {
                self.sink.write_all(b"[")?;
                for (i, &item) in items.iter().enumerate() {
                    if i > 0 {
                        self.sink.write_all(b" ")?;
                    }
                    self.write_reference(item)?;
                }
                self.sink.write_all(b"]")?;
            }
            Value::Dictionary(dict) => {
                self.sink.write_all(b"<<\n")?;
                for (key, value) in dict.iter() {
                    self.write_key(key)?;
                    self.write_reference(value)?;
                    self.sink.write_all(b"\n")?;
                }
                self.sink.write_all(b">>")?;
            }
            Value::Stream(stream) => self.write_stream(r, stream)?,
        }
        Ok(())
    }

    fn write_key(&mut self, key: &[u8]) -> Result<()> {
        self.sink.write_all(b"/")?;
        self.sink.write_all(&escape_name(key))?;
        self.sink.write_all(b" ")?;
        Ok(())
    }

    fn write_stream(&mut self, r: ObjRef, stream: &Stream) -> Result<()> {
        let encoded = encode(self.objects, stream, self.classification.renders_as_text(r));
        if encoded.hex {
            self.summary.hex_streams += 1;
        } else {
            self.summary.text_streams += 1;
        }

        self.sink.write_all(b"<<\n")?;
        match encoded.filters.as_slice() {
            [] => {}
            [single] => {
                self.write_key(b"Filter")?;
                write!(self.sink, "/{}\n", String::from_utf8_lossy(&escape_name(single)))?;
            }
            chain => {
                self.write_key(b"Filter")?;
                let names: Vec<String> = chain
                    .iter()
                    .map(|f| format!("/{}", String::from_utf8_lossy(&escape_name(f))))
                    .collect();
                write!(self.sink, "[{}]\n", names.join(" "))?;
            }
        }

        let mut wrote_length = false;
        for (key, value) in stream.dict.iter() {
            match key {
                b"Filter" => {}
                b"DecodeParms" => self.write_decode_parms(&encoded.decode_parms)?,
                b"Length" => {
                    write!(self.sink, "/Length {}\n", encoded.len())?;
                    wrote_length = true;
                }
                _ => {
                    self.write_key(key)?;
                    self.write_reference(value)?;
                    self.sink.write_all(b"\n")?;
                }
            }
        }
        if !wrote_length {
            write!(self.sink, "/Length {}\n", encoded.len())?;
        }

        self.sink.write_all(b">>\nstream\n")?;
        self.sink.write_all(&encoded.bytes)?;
        self.sink.write_all(b"\nendstream")?;
        Ok(())
    }

    fn write_decode_parms(&mut self, parms: &DecodeParms) -> Result<()> {
        match parms {
            DecodeParms::Absent => return Ok(()),
            DecodeParms::Declared(r) => {
                self.write_key(b"DecodeParms")?;
                self.write_reference(*r)?;
            }
            DecodeParms::PerFilter(slots) => {
                self.write_key(b"DecodeParms")?;
                self.sink.write_all(b"[")?;
                for (i, slot) in slots.iter().enumerate() {
                    if i > 0 {
                        self.sink.write_all(b" ")?;
                    }
                    match slot {
                        Some(r) => self.write_reference(*r)?,
                        None => self.sink.write_all(b"null")?,
                    }
                }
                self.sink.write_all(b"]")?;
            }
        }
        self.sink.write_all(b"\n")?;
        Ok(())
    }
}

/// Numbers in plain decimal form; PDF has no exponent syntax
pub fn format_number(n: Number) -> String {
    match n {
        Number::Integer(i) => i.to_string(),
        Number::Real(f) if f.is_finite() => f.to_string(),
        Number::Real(_) => "0".to_string(),
    }
}

/// Literal string with delimiters escaped and non-printable bytes as octal
pub fn literal_string(bytes: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(bytes.len() + 2);
    out.push(b'(');
    for &b in bytes {
        match b {
            b'(' | b')' | b'\\' => out.extend_from_slice(&[b'\\', b]),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0C => out.extend_from_slice(b"\\f"),
            0x20..=0x7E => out.push(b),
            _ => out.extend_from_slice(format!("\\{:03o}", b).as_bytes()),
        }
    }
    out.push(b')');
    out
}

fn is_name_regular(b: u8) -> bool {
    matches!(b, b'!'..=b'~')
        && !matches!(
            b,
            b'#' | b'(' | b')' | b'<' | b'>' | b'[' | b']' | b'{' | b'}' | b'/' | b'%'
        )
}

/// `#XX`-escape a name body; a space becomes `#20`
pub fn escape_name(name: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len());
    for &b in name {
        if is_name_regular(b) {
            out.push(b);
        } else {
            out.extend_from_slice(format!("#{:02X}", b).as_bytes());
        }
    }
    out
}

/// Inverse of [`escape_name`]; malformed escapes are kept literally
pub fn unescape_name(name: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(name.len());
    let mut i = 0;
    while i < name.len() {
        if name[i] == b'#' {
            if let Some(b) = name.get(i + 1..i + 3).and_then(hex_byte) {
                out.push(b);
                i += 3;
                continue;
            }
        }
        out.push(name[i]);
        i += 1;
    }
    out
}

fn hex_byte(pair: &[u8]) -> Option<u8> {
    let hi = char::from(pair[0]).to_digit(16)?;
    let lo = char::from(pair[1]).to_digit(16)?;
    Some((hi * 16 + lo) as u8)
}

/// Run the indirection and classification passes, then write the document
pub fn serialize<W: Write>(graph: &mut ObjectGraph, sink: W) -> Result<(W, WriteSummary)> {
    let max_serial = assign_serials(&mut graph.objects);
    let classification = classify(&graph.objects);
    debug!(
        "{} of {} objects are indirect, {} streams stay text",
        max_serial,
        graph.objects.len(),
        classification.len()
    );

    let mut writer = PdfWriter::new(sink, &graph.objects, &classification, max_serial);
    writer.write_header(graph.version)?;
    writer.write_body()?;
    writer.write_xref()?;
    writer.write_trailer(graph.root, graph.info)?;
    writer.finish()
}
