//! In-memory source graph for exercising the builder without a parser.

#![allow(dead_code)]

use decompress_pdf::object::PayloadFormat;
use decompress_pdf::source::{NodeKind, Scalar, SourceDocument};
use decompress_pdf::{DecompressError, Result};
use std::collections::HashMap;

/// Handle bit marking "the dictionary of stream N"
const STREAM_DICT: u32 = 1 << 31;

#[derive(Debug, Clone)]
pub enum MemNode {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(&'static str),
    String(&'static [u8]),
    Array(Vec<u32>),
    Dict(Vec<(&'static str, u32)>),
    Stream(Vec<(&'static str, u32)>, Vec<u8>, PayloadFormat),
    /// A kind the builder has no variant for
    Unknown,
}

/// Nodes keyed by id; ids that are not present act as dangling references
#[derive(Debug, Default)]
pub struct MemorySource {
    nodes: HashMap<u32, MemNode>,
    pub catalog: Option<u32>,
    pub info: Option<u32>,
}

impl MemorySource {
    pub fn new(catalog: u32) -> Self {
        MemorySource {
            catalog: Some(catalog),
            ..Default::default()
        }
    }

    pub fn with(mut self, id: u32, node: MemNode) -> Self {
        self.nodes.insert(id, node);
        self
    }

    fn entries(&self, id: u32) -> Option<&[(&'static str, u32)]> {
        match self.nodes.get(&(id & !STREAM_DICT))? {
            MemNode::Dict(entries) if id & STREAM_DICT == 0 => Some(entries),
            MemNode::Stream(entries, ..) if id & STREAM_DICT != 0 => Some(entries),
            _ => None,
        }
    }

    fn resolve(&self, id: u32) -> Option<u32> {
        self.nodes.contains_key(&id).then_some(id)
    }
}

impl SourceDocument for MemorySource {
    type Node = u32;
    type Identity = u32;

    fn version(&self) -> (u8, u8) {
        (1, 6)
    }

    fn catalog(&self) -> Option<u32> {
        self.catalog.and_then(|id| self.resolve(id))
    }

    fn info(&self) -> Option<u32> {
        self.info.and_then(|id| self.resolve(id))
    }

    fn identity(&self, node: &u32) -> u32 {
        *node
    }

    fn classify(&self, node: &u32) -> Result<NodeKind> {
        if node & STREAM_DICT != 0 {
            return Ok(NodeKind::Dictionary);
        }
        match self.nodes.get(node) {
            Some(MemNode::Null) => Ok(NodeKind::Null),
            Some(MemNode::Boolean(_)) => Ok(NodeKind::Boolean),
            Some(MemNode::Integer(_)) => Ok(NodeKind::Integer),
            Some(MemNode::Real(_)) => Ok(NodeKind::Real),
            Some(MemNode::Name(_)) => Ok(NodeKind::Name),
            Some(MemNode::String(_)) => Ok(NodeKind::String),
            Some(MemNode::Array(_)) => Ok(NodeKind::Array),
            Some(MemNode::Dict(_)) => Ok(NodeKind::Dictionary),
            Some(MemNode::Stream(..)) => Ok(NodeKind::Stream),
            Some(MemNode::Unknown) | None => {
                Err(DecompressError::UnexpectedKind(format!("node {}", node)))
            }
        }
    }

    fn read_scalar(&self, node: &u32) -> Result<Scalar> {
        match self.nodes.get(node) {
            Some(MemNode::Null) => Ok(Scalar::Null),
            Some(MemNode::Boolean(b)) => Ok(Scalar::Boolean(*b)),
            Some(MemNode::Integer(i)) => Ok(Scalar::Integer(*i)),
            Some(MemNode::Real(r)) => Ok(Scalar::Real(*r)),
            Some(MemNode::Name(n)) => Ok(Scalar::Name(n.as_bytes().to_vec())),
            Some(MemNode::String(s)) => Ok(Scalar::String(s.to_vec())),
            _ => Err(DecompressError::UnexpectedKind(format!("node {}", node))),
        }
    }

    fn dictionary_keys(&self, node: &u32) -> Vec<Vec<u8>> {
        self.entries(*node)
            .map(|entries| entries.iter().map(|(k, _)| k.as_bytes().to_vec()).collect())
            .unwrap_or_default()
    }

    fn dictionary_get(&self, node: &u32, key: &[u8]) -> Option<u32> {
        let (_, id) = self
            .entries(*node)?
            .iter()
            .find(|(k, _)| k.as_bytes() == key)?;
        self.resolve(*id)
    }

    fn array_len(&self, node: &u32) -> usize {
        match self.nodes.get(node) {
            Some(MemNode::Array(items)) => items.len(),
            _ => 0,
        }
    }

    fn array_get(&self, node: &u32, index: usize) -> Option<u32> {
        match self.nodes.get(node) {
            Some(MemNode::Array(items)) => self.resolve(*items.get(index)?),
            _ => None,
        }
    }

    fn stream_dictionary(&self, node: &u32) -> Option<u32> {
        match self.nodes.get(node) {
            Some(MemNode::Stream(..)) => Some(node | STREAM_DICT),
            _ => None,
        }
    }

    fn stream_payload(&self, node: &u32) -> Result<(Vec<u8>, PayloadFormat)> {
        match self.nodes.get(node) {
            Some(MemNode::Stream(_, data, format)) => Ok((data.clone(), *format)),
            _ => Err(DecompressError::UnexpectedKind(format!("node {}", node))),
        }
    }
}
