//! Pull interface onto an already-parsed PDF document

use crate::error::Result;
use crate::object::PayloadFormat;
use std::hash::Hash;

/// Node kinds a reader may report
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Null,
    Boolean,
    Integer,
    Real,
    Name,
    String,
    Array,
    Dictionary,
    Stream,
}

/// Primitive value read from a scalar node
#[derive(Debug, Clone, PartialEq)]
pub enum Scalar {
    Null,
    Boolean(bool),
    Integer(i64),
    Real(f64),
    Name(Vec<u8>),
    String(Vec<u8>),
}

/// A source document exposed as a graph of identity-carrying nodes.
///
/// Lookups that cannot be resolved return `None` and the caller drops the
/// entry. `classify` fails only when the reader holds a node kind it cannot
/// describe, which is a broken contract rather than bad input.
pub trait SourceDocument {
    type Node;
    type Identity: Hash + Eq;

    fn version(&self) -> (u8, u8);
    fn catalog(&self) -> Option<Self::Node>;
    fn info(&self) -> Option<Self::Node>;

    /// Stable key for a node; equal keys mean the same source node
    fn identity(&self, node: &Self::Node) -> Self::Identity;
    fn classify(&self, node: &Self::Node) -> Result<NodeKind>;
    fn read_scalar(&self, node: &Self::Node) -> Result<Scalar>;

    fn dictionary_keys(&self, node: &Self::Node) -> Vec<Vec<u8>>;
    fn dictionary_get(&self, node: &Self::Node, key: &[u8]) -> Option<Self::Node>;

    fn array_len(&self, node: &Self::Node) -> usize;
    fn array_get(&self, node: &Self::Node, index: usize) -> Option<Self::Node>;

    fn stream_dictionary(&self, node: &Self::Node) -> Option<Self::Node>;
    fn stream_payload(&self, node: &Self::Node) -> Result<(Vec<u8>, PayloadFormat)>;
}
