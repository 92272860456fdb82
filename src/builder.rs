//! Graph builder: walks a [`SourceDocument`] and constructs the flat object list

use crate::error::{DecompressError, Result};
use crate::object::{
    Dictionary, Number, ObjRef, ObjectGraph, ObjectList, PayloadFormat, Stream, Value,
};
use crate::source::{NodeKind, Scalar, SourceDocument};
use log::{debug, warn};
use std::collections::HashMap;

/// Where a child lands in its parent container
enum Slot {
    Element,
    Entry(Vec<u8>),
    StreamEntry(Vec<u8>),
}

/// Memoizing visitor over a source graph.
///
/// A node is registered in the memo before its children are expanded, so a
/// container that reaches itself resolves to the node under construction.
pub struct GraphBuilder<'s, S: SourceDocument> {
    source: &'s S,
    objects: ObjectList,
    visited: HashMap<S::Identity, ObjRef>,
}

impl<'s, S: SourceDocument> GraphBuilder<'s, S> {
    pub fn new(source: &'s S) -> Self {
        GraphBuilder {
            source,
            objects: ObjectList::new(),
            visited: HashMap::new(),
        }
    }

    /// Visit a root node and everything reachable from it
    pub fn visit_root(&mut self, node: &S::Node) -> Result<ObjRef> {
        self.visit(node)
    }

    pub fn objects(&self) -> &ObjectList {
        &self.objects
    }

    pub fn finish(self) -> ObjectList {
        self.objects
    }

    fn visit(&mut self, node: &S::Node) -> Result<ObjRef> {
        let identity = self.source.identity(node);
        if let Some(&existing) = self.visited.get(&identity) {
            self.objects.get_mut(existing).record_reference();
            return Ok(existing);
        }

        match self.source.classify(node)? {
            NodeKind::Array => {
                let array = self.objects.push(Value::Array(Vec::new()));
                self.visited.insert(identity, array);
                for index in 0..self.source.array_len(node) {
                    match self.source.array_get(node, index) {
                        Some(child) => {
                            let child = self.visit(&child)?;
                            self.attach(array, Slot::Element, child);
                        }
                        None => debug!("Skipping unresolved array element {}", index),
                    }
                }
                Ok(array)
            }
            NodeKind::Dictionary => {
                let dict = self.objects.push(Value::Dictionary(Dictionary::new()));
                self.visited.insert(identity, dict);
                self.expand_dictionary(dict, node, None)?;
                Ok(dict)
            }
            NodeKind::Stream => {
                let (content, format) = self.source.stream_payload(node)?;
                let stream = self
                    .objects
                    .push(Value::Stream(Stream::new(Dictionary::new(), content, format)));
                self.visited.insert(identity, stream);
                match self.source.stream_dictionary(node) {
                    Some(dict) => self.expand_dictionary(stream, &dict, Some(format))?,
                    None => warn!("Stream without dictionary"),
                }
                Ok(stream)
            }
            _ => {
                let value = scalar_value(self.source.read_scalar(node)?);
                let scalar = self.objects.push(value);
                self.visited.insert(identity, scalar);
                Ok(scalar)
            }
        }
    }

    /// Expand the entries of a dictionary, or of a stream's dictionary when
    /// `payload` carries the stream's format
    fn expand_dictionary(
        &mut self,
        parent: ObjRef,
        dict: &S::Node,
        payload: Option<PayloadFormat>,
    ) -> Result<()> {
        for key in self.source.dictionary_keys(dict) {
            let child = match (self.source.dictionary_get(dict, &key), payload) {
                (Some(parms), Some(format)) if key == b"DecodeParms" => {
                    self.remaining_decode_parms(parms, format)?
                }
                (child, _) => child,
            };
            match child {
                Some(child) => {
                    let child = self.visit(&child)?;
                    let slot = match payload {
                        Some(_) => Slot::StreamEntry(key),
                        None => Slot::Entry(key),
                    };
                    self.attach(parent, slot, child);
                }
                None => debug!(
                    "Skipping dictionary entry /{}",
                    String::from_utf8_lossy(&key)
                ),
            }
        }
        Ok(())
    }

    /// Parameters of the filter stages the reader left in place.
    ///
    /// Decoded payloads keep none. Image payloads keep the last stage only,
    /// the one belonging to `DCTDecode`/`JPXDecode`.
    fn remaining_decode_parms(
        &self,
        parms: S::Node,
        format: PayloadFormat,
    ) -> Result<Option<S::Node>> {
        match format {
            PayloadFormat::Raw => {
                debug!("Dropping DecodeParms of a decoded stream");
                Ok(None)
            }
            PayloadFormat::Undecoded => Ok(Some(parms)),
            PayloadFormat::Jpeg | PayloadFormat::Jpeg2000 => {
                if self.source.classify(&parms)? != NodeKind::Array {
                    return Ok(Some(parms));
                }
                match self.source.array_len(&parms) {
                    0 => Ok(None),
                    len => Ok(self.source.array_get(&parms, len - 1)),
                }
            }
        }
    }

    fn attach(&mut self, parent: ObjRef, slot: Slot, child: ObjRef) {
        match (self.objects.get_mut(parent).value_mut(), slot) {
            (Value::Array(items), Slot::Element) => items.push(child),
            (Value::Dictionary(dict), Slot::Entry(key)) => dict.set(key, child),
            (Value::Stream(stream), Slot::StreamEntry(key)) => stream.dict.set(key, child),
            (value, _) => unreachable!("cannot attach a child to {}", value.type_name()),
        }
    }
}

fn scalar_value(scalar: Scalar) -> Value {
    match scalar {
        Scalar::Null => Value::Null,
        Scalar::Boolean(b) => Value::Boolean(b),
        Scalar::Integer(i) => Value::Number(Number::from_i64(i)),
        Scalar::Real(r) => Value::Number(Number::Real(r as f32)),
        Scalar::Name(n) => Value::Name(n),
        Scalar::String(s) => Value::String(s),
    }
}

/// Build the object graph reachable from the catalog and the info dictionary
pub fn build_graph<S: SourceDocument>(source: &S) -> Result<ObjectGraph> {
    let catalog = source.catalog().ok_or(DecompressError::MissingCatalog)?;

    let mut builder = GraphBuilder::new(source);
    let root = builder.visit_root(&catalog)?;
    let found = builder.objects().value(root);
    if !matches!(found, Value::Dictionary(_)) {
        return Err(DecompressError::InvalidCatalog(found.type_name()));
    }

    let info = match source.info() {
        Some(node) => {
            let info = builder.visit_root(&node)?;
            match builder.objects().value(info) {
                Value::Dictionary(_) => Some(info),
                other => {
                    warn!("Ignoring Info entry of type {}", other.type_name());
                    None
                }
            }
        }
        None => None,
    };

    let objects = builder.finish();
    debug!("Built {} objects", objects.len());
    Ok(ObjectGraph {
        version: source.version(),
        objects,
        root,
        info,
    })
}
