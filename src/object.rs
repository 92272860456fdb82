//! In-memory object model
//!
//! Every constructed node lives in a single [`ObjectList`]. Containers refer to
//! their children through [`ObjRef`] handles into that list, so a node shared by
//! several parents exists exactly once.

/// Handle to an object in the flat object list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjRef(usize);

impl ObjRef {
    /// Position of the object in construction order
    pub fn index(self) -> usize {
        self.0
    }
}

/// Integer or real number
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Number {
    Integer(i32),
    Real(f32),
}

impl Number {
    /// Build from a reader integer, degrading to a real outside the i32 range
    pub fn from_i64(value: i64) -> Self {
        match i32::try_from(value) {
            Ok(n) => Number::Integer(n),
            Err(_) => Number::Real(value as f32),
        }
    }

    pub fn is_integer(&self) -> bool {
        matches!(self, Number::Integer(_))
    }

    /// Integer view; reals truncate toward zero
    pub fn as_i32(&self) -> i32 {
        match *self {
            Number::Integer(n) => n,
            Number::Real(f) => f as i32,
        }
    }

    pub fn as_f32(&self) -> f32 {
        match *self {
            Number::Integer(n) => n as f32,
            Number::Real(f) => f,
        }
    }
}

/// Original encoding of a stream payload as reported by the reader
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PayloadFormat {
    /// Fully decoded bytes
    #[default]
    Raw,
    /// Bytes are a DCT (JPEG) image
    Jpeg,
    /// Bytes are a JPEG2000 image
    Jpeg2000,
    /// Bytes still carry the filter chain declared in the stream dictionary
    Undecoded,
}

/// Dictionary with insertion-ordered, unique keys
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dictionary {
    entries: Vec<(Vec<u8>, ObjRef)>,
}

impl Dictionary {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Value stored under `key`, or `None` when absent
    pub fn get(&self, key: &[u8]) -> Option<ObjRef> {
        self.entries
            .iter()
            .find(|(k, _)| k.as_slice() == key)
            .map(|(_, v)| *v)
    }

    /// Key and value at `index` in insertion order
    pub fn entry(&self, index: usize) -> Option<(&[u8], ObjRef)> {
        self.entries.get(index).map(|(k, v)| (k.as_slice(), *v))
    }

    /// Insert a value; an existing key keeps its position and takes the new value
    pub fn set(&mut self, key: impl Into<Vec<u8>>, value: ObjRef) {
        let key = key.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (&[u8], ObjRef)> {
        self.entries.iter().map(|(k, v)| (k.as_slice(), *v))
    }
}

/// Stream: dictionary plus payload bytes
#[derive(Debug, Clone, PartialEq)]
pub struct Stream {
    pub dict: Dictionary,
    pub content: Vec<u8>,
    pub format: PayloadFormat,
}

impl Stream {
    pub fn new(dict: Dictionary, content: Vec<u8>, format: PayloadFormat) -> Self {
        Stream {
            dict,
            content,
            format,
        }
    }
}

/// The variant part of an object
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Boolean(bool),
    Number(Number),
    String(Vec<u8>),
    Name(Vec<u8>),
    Array(Vec<ObjRef>),
    Dictionary(Dictionary),
    Stream(Stream),
}

impl Value {
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "null",
            Value::Boolean(_) => "boolean",
            Value::Number(_) => "number",
            Value::String(_) => "string",
            Value::Name(_) => "name",
            Value::Array(_) => "array",
            Value::Dictionary(_) => "dictionary",
            Value::Stream(_) => "stream",
        }
    }

    pub fn as_name(&self) -> Option<&[u8]> {
        match self {
            Value::Name(n) => Some(n),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<Number> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&[ObjRef]> {
        match self {
            Value::Array(items) => Some(items),
            _ => None,
        }
    }

    pub fn as_dict(&self) -> Option<&Dictionary> {
        match self {
            Value::Dictionary(d) => Some(d),
            _ => None,
        }
    }

    pub fn as_stream(&self) -> Option<&Stream> {
        match self {
            Value::Stream(s) => Some(s),
            _ => None,
        }
    }
}

/// A constructed node with its sharing counter and indirect serial number
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    value: Value,
    references: usize,
    serial: u32,
}

impl Object {
    pub fn new(value: Value) -> Self {
        Object {
            value,
            references: 1,
            serial: 0,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub(crate) fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    /// Count one more reference site pointing at this object
    pub fn record_reference(&mut self) {
        self.references += 1;
    }

    pub fn references(&self) -> usize {
        self.references
    }

    /// Shared objects, dictionaries and streams are written as indirect objects
    pub fn is_indirection_required(&self) -> bool {
        self.references > 1 || matches!(self.value, Value::Stream(_) | Value::Dictionary(_))
    }

    /// Indirect serial number, 0 when written inline
    pub fn serial(&self) -> u32 {
        self.serial
    }

    pub(crate) fn set_serial(&mut self, serial: u32) {
        self.serial = serial;
    }
}

/// Owner of every constructed object, in construction order
#[derive(Debug, Clone, Default)]
pub struct ObjectList {
    objects: Vec<Object>,
}

impl ObjectList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a freshly constructed object
    pub fn push(&mut self, value: Value) -> ObjRef {
        self.objects.push(Object::new(value));
        ObjRef(self.objects.len() - 1)
    }

    pub fn get(&self, r: ObjRef) -> &Object {
        &self.objects[r.0]
    }

    pub fn get_mut(&mut self, r: ObjRef) -> &mut Object {
        &mut self.objects[r.0]
    }

    pub fn value(&self, r: ObjRef) -> &Value {
        self.objects[r.0].value()
    }

    pub fn len(&self) -> usize {
        self.objects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (ObjRef, &Object)> {
        self.objects.iter().enumerate().map(|(i, o)| (ObjRef(i), o))
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut Object> {
        self.objects.iter_mut()
    }

    /// Look up `key` in a dictionary or in a stream's dictionary
    pub fn dict_lookup(&self, r: ObjRef, key: &[u8]) -> Option<&Value> {
        let dict = match self.value(r) {
            Value::Dictionary(d) => d,
            Value::Stream(s) => &s.dict,
            _ => return None,
        };
        dict.get(key).map(|v| self.value(v))
    }
}

/// A fully built document graph ready for serialization
#[derive(Debug, Clone)]
pub struct ObjectGraph {
    pub version: (u8, u8),
    pub objects: ObjectList,
    pub root: ObjRef,
    pub info: Option<ObjRef>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_indirection_rules() {
        let mut list = ObjectList::new();
        let n = list.push(Value::Number(Number::Integer(3)));
        let d = list.push(Value::Dictionary(Dictionary::new()));
        let s = list.push(Value::Stream(Stream::new(
            Dictionary::new(),
            vec![1, 2],
            PayloadFormat::Raw,
        )));
        let a = list.push(Value::Array(vec![n]));

        assert!(!list.get(n).is_indirection_required());
        assert!(list.get(d).is_indirection_required());
        assert!(list.get(s).is_indirection_required());
        assert!(!list.get(a).is_indirection_required());

        list.get_mut(a).record_reference();
        assert_eq!(list.get(a).references(), 2);
        assert!(list.get(a).is_indirection_required());
    }

    #[test]
    fn test_dictionary_order_and_lookup() {
        let mut list = ObjectList::new();
        let one = list.push(Value::Number(Number::Integer(1)));
        let two = list.push(Value::Number(Number::Integer(2)));

        let mut dict = Dictionary::new();
        dict.set("Zeta", one);
        dict.set("Alpha", two);
        dict.set("Zeta", two);

        assert_eq!(dict.len(), 2);
        assert_eq!(dict.entry(0), Some((&b"Zeta"[..], two)));
        assert_eq!(dict.entry(1), Some((&b"Alpha"[..], two)));
        assert_eq!(dict.entry(2), None);
        assert_eq!(dict.get(b"Missing"), None);
    }

    #[test]
    fn test_number_coercions() {
        assert_eq!(Number::from_i64(42), Number::Integer(42));
        assert!(!Number::from_i64(i64::from(i32::MAX) + 1).is_integer());
        assert_eq!(Number::Real(4.9).as_i32(), 4);
        assert_eq!(Number::Integer(-7).as_f32(), -7.0);
    }
}
