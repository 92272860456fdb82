//! Reader collaborator backed by a loaded `lopdf::Document`

use crate::error::{DecompressError, Result};
use crate::object::PayloadFormat;
use crate::source::{NodeKind, Scalar, SourceDocument};
use flate2::read::ZlibDecoder;
use log::{debug, warn};
use lopdf::{Dictionary, Document, Object, ObjectId};
use std::io::Read;

/// Longest `n g R` chain followed before giving up on a value
const MAX_REFERENCE_CHAIN: usize = 32;

/// Version assumed when the document's version string is unreadable
const FALLBACK_VERSION: (u8, u8) = (1, 4);

/// Filters lopdf can undo on its own
const DECODABLE_FILTERS: [&[u8]; 3] = [b"FlateDecode", b"LZWDecode", b"ASCII85Decode"];

/// Position of a direct object inside its parent
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Slot {
    Key(Vec<u8>),
    Index(usize),
    StreamDict,
}

/// Identity of a source node.
///
/// Indirect objects are keyed by object id. Direct objects only have an
/// identity relative to the container holding them.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum NodeKey {
    Trailer,
    Indirect(ObjectId),
    Inline(Box<NodeKey>, Slot),
}

#[derive(Debug, Clone, Copy)]
enum View<'a> {
    Object(&'a Object),
    StreamDict(&'a Dictionary),
}

/// Handle to one node of a lopdf document
#[derive(Debug, Clone)]
pub struct LopdfNode<'a> {
    key: NodeKey,
    view: View<'a>,
}

impl<'a> LopdfNode<'a> {
    pub fn key(&self) -> &NodeKey {
        &self.key
    }

    fn dict(&self) -> Option<&'a Dictionary> {
        match self.view {
            View::Object(Object::Dictionary(d)) => Some(d),
            View::Object(Object::Stream(s)) => Some(&s.dict),
            View::StreamDict(d) => Some(d),
            View::Object(_) => None,
        }
    }

    fn array(&self) -> Option<&'a [Object]> {
        match self.view {
            View::Object(Object::Array(items)) => Some(items),
            _ => None,
        }
    }
}

/// Exposes a `lopdf::Document` through [`SourceDocument`]
pub struct LopdfSource<'a> {
    doc: &'a Document,
    version: (u8, u8),
}

impl<'a> LopdfSource<'a> {
    pub fn new(doc: &'a Document) -> Self {
        let version = parse_version(&doc.version).unwrap_or_else(|| {
            warn!(
                "Unreadable PDF version {:?}, assuming {}.{}",
                doc.version, FALLBACK_VERSION.0, FALLBACK_VERSION.1
            );
            FALLBACK_VERSION
        });
        LopdfSource { doc, version }
    }

    /// Wrap `object`, found at `slot` of `parent`, following references
    fn child(&self, parent: &NodeKey, slot: Slot, object: &'a Object) -> Option<LopdfNode<'a>> {
        let mut key = NodeKey::Inline(Box::new(parent.clone()), slot);
        let mut current = object;
        for _ in 0..MAX_REFERENCE_CHAIN {
            match current {
                Object::Reference(id) => match self.doc.get_object(*id) {
                    Ok(target) => {
                        key = NodeKey::Indirect(*id);
                        current = target;
                    }
                    Err(e) => {
                        debug!("Skipping unresolved reference {} {} R: {}", id.0, id.1, e);
                        return None;
                    }
                },
                _ => {
                    return Some(LopdfNode {
                        key,
                        view: View::Object(current),
                    })
                }
            }
        }
        warn!("Reference chain at {:?} exceeds {} links", key, MAX_REFERENCE_CHAIN);
        None
    }

    fn trailer_entry(&self, key: &[u8]) -> Option<LopdfNode<'a>> {
        let object = self.doc.trailer.get(key).ok()?;
        self.child(&NodeKey::Trailer, Slot::Key(key.to_vec()), object)
    }

    fn deref(&self, object: &'a Object) -> &'a Object {
        match object {
            Object::Reference(id) => self.doc.get_object(*id).unwrap_or(object),
            _ => object,
        }
    }

    /// Filter names declared by a stream dictionary, in application order
    fn filter_names(&self, dict: &'a Dictionary) -> Vec<Vec<u8>> {
        match dict.get(b"Filter").ok().map(|f| self.deref(f)) {
            Some(Object::Name(n)) => vec![n.clone()],
            Some(Object::Array(arr)) => arr
                .iter()
                .filter_map(|f| match self.deref(f) {
                    Object::Name(n) => Some(n.clone()),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Decode a whole filter chain, or keep the bytes as they are
    fn decode_all(
        &self,
        node: &LopdfNode<'a>,
        stream: &'a lopdf::Stream,
        filters: &[Vec<u8>],
    ) -> (Vec<u8>, PayloadFormat) {
        if stream.dict.get(b"DecodeParms").is_err() {
            if let Some(data) = inflate_all(&stream.content, filters) {
                return (data, PayloadFormat::Raw);
            }
        }
        if let Some(unknown) = filters
            .iter()
            .find(|f| !DECODABLE_FILTERS.contains(&f.as_slice()))
        {
            debug!(
                "Keeping {:?} encoded: no decoder for {}",
                node.key,
                String::from_utf8_lossy(unknown)
            );
            return (stream.content.clone(), PayloadFormat::Undecoded);
        }
        match stream.decompressed_content() {
            Ok(data) => (data, PayloadFormat::Raw),
            Err(e) => {
                debug!("Keeping {:?} encoded: {}", node.key, e);
                (stream.content.clone(), PayloadFormat::Undecoded)
            }
        }
    }
}

fn parse_version(version: &str) -> Option<(u8, u8)> {
    let (major, minor) = version.trim().split_once('.')?;
    Some((major.parse().ok()?, minor.parse().ok()?))
}

/// Undo a run of FlateDecode stages; any other filter gives up
fn inflate_all(content: &[u8], filters: &[Vec<u8>]) -> Option<Vec<u8>> {
    let mut data = content.to_vec();
    for filter in filters {
        if filter.as_slice() != b"FlateDecode" {
            return None;
        }
        let mut decoder = ZlibDecoder::new(&data[..]);
        let mut decoded = Vec::new();
        decoder.read_to_end(&mut decoded).ok()?;
        data = decoded;
    }
    Some(data)
}

impl<'a> SourceDocument for LopdfSource<'a> {
    type Node = LopdfNode<'a>;
    type Identity = NodeKey;

    fn version(&self) -> (u8, u8) {
        self.version
    }

    fn catalog(&self) -> Option<Self::Node> {
        self.trailer_entry(b"Root")
    }

    fn info(&self) -> Option<Self::Node> {
        self.trailer_entry(b"Info")
    }

    fn identity(&self, node: &Self::Node) -> NodeKey {
        node.key.clone()
    }

    fn classify(&self, node: &Self::Node) -> Result<NodeKind> {
        let object = match node.view {
            View::StreamDict(_) => return Ok(NodeKind::Dictionary),
            View::Object(object) => object,
        };
        Ok(match object {
            Object::Null => NodeKind::Null,
            Object::Boolean(_) => NodeKind::Boolean,
            Object::Integer(_) => NodeKind::Integer,
            Object::Real(_) => NodeKind::Real,
            Object::Name(_) => NodeKind::Name,
            Object::String(..) => NodeKind::String,
            Object::Array(_) => NodeKind::Array,
            Object::Dictionary(_) => NodeKind::Dictionary,
            Object::Stream(_) => NodeKind::Stream,
            Object::Reference(id) => {
                return Err(DecompressError::UnexpectedKind(format!(
                    "unresolved reference {} {} R at {:?}",
                    id.0, id.1, node.key
                )))
            }
        })
    }

    fn read_scalar(&self, node: &Self::Node) -> Result<Scalar> {
        match node.view {
            View::Object(Object::Null) => Ok(Scalar::Null),
            View::Object(Object::Boolean(b)) => Ok(Scalar::Boolean(*b)),
            View::Object(Object::Integer(i)) => Ok(Scalar::Integer(*i)),
            View::Object(Object::Real(r)) => Ok(Scalar::Real(*r as f64)),
            View::Object(Object::Name(n)) => Ok(Scalar::Name(n.clone())),
            View::Object(Object::String(s, _)) => Ok(Scalar::String(s.clone())),
            _ => Err(DecompressError::UnexpectedKind(format!(
                "scalar requested from container at {:?}",
                node.key
            ))),
        }
    }

    fn dictionary_keys(&self, node: &Self::Node) -> Vec<Vec<u8>> {
        node.dict()
            .map(|d| d.iter().map(|(k, _)| k.clone()).collect())
            .unwrap_or_default()
    }

    fn dictionary_get(&self, node: &Self::Node, key: &[u8]) -> Option<Self::Node> {
        let object = node.dict()?.get(key).ok()?;
        self.child(&node.key, Slot::Key(key.to_vec()), object)
    }

    fn array_len(&self, node: &Self::Node) -> usize {
        node.array().map_or(0, <[Object]>::len)
    }

    fn array_get(&self, node: &Self::Node, index: usize) -> Option<Self::Node> {
        let object = node.array()?.get(index)?;
        self.child(&node.key, Slot::Index(index), object)
    }

    fn stream_dictionary(&self, node: &Self::Node) -> Option<Self::Node> {
        match node.view {
            View::Object(Object::Stream(s)) => Some(LopdfNode {
                key: NodeKey::Inline(Box::new(node.key.clone()), Slot::StreamDict),
                view: View::StreamDict(&s.dict),
            }),
            _ => None,
        }
    }

    fn stream_payload(&self, node: &Self::Node) -> Result<(Vec<u8>, PayloadFormat)> {
        let stream = match node.view {
            View::Object(Object::Stream(s)) => s,
            _ => {
                return Err(DecompressError::UnexpectedKind(format!(
                    "stream payload requested from non-stream at {:?}",
                    node.key
                )))
            }
        };

        let filters = self.filter_names(&stream.dict);
        let format = match filters.last().map(Vec::as_slice) {
            None => return Ok((stream.content.clone(), PayloadFormat::Raw)),
            Some(b"DCTDecode") => PayloadFormat::Jpeg,
            Some(b"JPXDecode") => PayloadFormat::Jpeg2000,
            Some(_) => return Ok(self.decode_all(node, stream, &filters)),
        };

        match inflate_all(&stream.content, &filters[..filters.len() - 1]) {
            Some(data) => Ok((data, format)),
            None => {
                debug!("Keeping image {:?} encoded: unsupported leading filter", node.key);
                Ok((stream.content.clone(), PayloadFormat::Undecoded))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use lopdf::{dictionary, Stream};
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn test_parse_version() {
        assert_eq!(parse_version("1.7"), Some((1, 7)));
        assert_eq!(parse_version(" 2.0 "), Some((2, 0)));
        assert_eq!(parse_version("garbage"), None);
    }

    #[test]
    fn test_references_share_identity() {
        let mut doc = Document::with_version("1.5");
        let shared = doc.add_object(dictionary! { "K" => 1 });
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "A" => shared,
            "B" => shared,
            "Inline" => dictionary! { "X" => 2 },
        });
        doc.trailer.set("Root", catalog);

        let source = LopdfSource::new(&doc);
        assert_eq!(source.version(), (1, 5));
        let root = source.catalog().unwrap();
        assert_eq!(source.identity(&root), NodeKey::Indirect(catalog));

        let a = source.dictionary_get(&root, b"A").unwrap();
        let b = source.dictionary_get(&root, b"B").unwrap();
        assert_eq!(source.identity(&a), source.identity(&b));

        let inline = source.dictionary_get(&root, b"Inline").unwrap();
        assert_eq!(source.classify(&inline).unwrap(), NodeKind::Dictionary);
        assert_eq!(
            source.identity(&inline),
            NodeKey::Inline(Box::new(NodeKey::Indirect(catalog)), Slot::Key(b"Inline".to_vec()))
        );
        assert!(source.info().is_none());
    }

    #[test]
    fn test_dangling_reference_is_missing() {
        let mut doc = Document::with_version("1.4");
        let catalog = doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Gone" => Object::Reference((99, 0)),
        });
        doc.trailer.set("Root", catalog);

        let source = LopdfSource::new(&doc);
        let root = source.catalog().unwrap();
        assert_eq!(source.dictionary_keys(&root).len(), 2);
        assert!(source.dictionary_get(&root, b"Gone").is_none());
    }

    #[test]
    fn test_stream_payload_formats() {
        let mut doc = Document::with_version("1.4");
        let plain = doc.add_object(Stream::new(dictionary! {}, b"BT ET".to_vec()));
        let flated = doc.add_object(Stream::new(
            dictionary! { "Filter" => "FlateDecode" },
            zlib(b"0 0 m 10 10 l S"),
        ));
        let jpeg = doc.add_object(Stream::new(
            dictionary! { "Filter" => "DCTDecode" },
            vec![0xFF, 0xD8, 0xFF, 0xD9],
        ));
        let flate_jpx = doc.add_object(Stream::new(
            dictionary! { "Filter" => vec![Object::from("FlateDecode"), Object::from("JPXDecode")] },
            zlib(&[0, 0, 0, 12]),
        ));
        let ccitt = doc.add_object(Stream::new(
            dictionary! { "Filter" => "CCITTFaxDecode" },
            vec![1, 2, 3],
        ));

        let source = LopdfSource::new(&doc);
        let payload = |id: ObjectId| {
            let node = source
                .child(&NodeKey::Trailer, Slot::Index(0), doc.objects.get(&id).unwrap())
                .unwrap();
            source.stream_payload(&node).unwrap()
        };

        assert_eq!(payload(plain), (b"BT ET".to_vec(), PayloadFormat::Raw));
        assert_eq!(payload(flated), (b"0 0 m 10 10 l S".to_vec(), PayloadFormat::Raw));
        assert_eq!(payload(jpeg), (vec![0xFF, 0xD8, 0xFF, 0xD9], PayloadFormat::Jpeg));
        assert_eq!(payload(flate_jpx), (vec![0, 0, 0, 12], PayloadFormat::Jpeg2000));
        assert_eq!(payload(ccitt), (vec![1, 2, 3], PayloadFormat::Undecoded));
    }
}
