//! Indirection policy and structural classification
//!
//! Both run over the finished object list, after every sharing count is final
//! and before any byte is written.

use crate::object::{ObjRef, ObjectList, Value};
use std::collections::HashSet;

/// Streams whose payload must be written unmodified
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Classification {
    text_streams: HashSet<ObjRef>,
}

impl Classification {
    pub fn renders_as_text(&self, stream: ObjRef) -> bool {
        self.text_streams.contains(&stream)
    }

    pub fn len(&self) -> usize {
        self.text_streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text_streams.is_empty()
    }

    fn mark(&mut self, objects: &ObjectList, r: ObjRef) {
        if matches!(objects.value(r), Value::Stream(_)) {
            self.text_streams.insert(r);
        }
    }
}

/// Number every object that needs indirection, 1.. in construction order.
///
/// Returns the highest serial handed out. Objects written inline get 0, so
/// running the pass again yields the same numbering.
pub fn assign_serials(objects: &mut ObjectList) -> u32 {
    let mut serial = 0;
    for object in objects.iter_mut() {
        if object.is_indirection_required() {
            serial += 1;
            object.set_serial(serial);
        } else {
            object.set_serial(0);
        }
    }
    serial
}

/// Find page content streams and type 4 function streams
pub fn classify(objects: &ObjectList) -> Classification {
    let mut classification = Classification::default();
    for (r, object) in objects.iter() {
        match object.value() {
            Value::Dictionary(dict) => {
                let is_page = dict
                    .get(b"Type")
                    .and_then(|t| objects.value(t).as_name())
                    == Some(b"Page".as_slice());
                if !is_page {
                    continue;
                }
                if let Some(contents) = dict.get(b"Contents") {
                    match objects.value(contents) {
                        Value::Array(parts) => {
                            for &part in parts {
                                classification.mark(objects, part);
                            }
                        }
                        _ => classification.mark(objects, contents),
                    }
                }
            }
            Value::Stream(stream) => {
                let function_type = stream
                    .dict
                    .get(b"FunctionType")
                    .and_then(|f| objects.value(f).as_number());
                if function_type.map(|n| n.as_i32()) == Some(4) {
                    classification.mark(objects, r);
                }
            }
            _ => {}
        }
    }
    classification
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::{Dictionary, Number, PayloadFormat, Stream};

    fn stream(objects: &mut ObjectList, dict: Dictionary) -> ObjRef {
        objects.push(Value::Stream(Stream::new(dict, vec![0x00, 0xFF], PayloadFormat::Raw)))
    }

    #[test]
    fn test_serials_follow_construction_order() {
        let mut objects = ObjectList::new();
        let leaf = objects.push(Value::Number(Number::Integer(1)));
        let first = objects.push(Value::Dictionary(Dictionary::new()));
        let shared = objects.push(Value::Array(vec![leaf]));
        objects.get_mut(shared).record_reference();
        let second = objects.push(Value::Dictionary(Dictionary::new()));

        assert_eq!(assign_serials(&mut objects), 3);
        assert_eq!(objects.get(leaf).serial(), 0);
        assert_eq!(objects.get(first).serial(), 1);
        assert_eq!(objects.get(shared).serial(), 2);
        assert_eq!(objects.get(second).serial(), 3);

        assert_eq!(assign_serials(&mut objects), 3);
        assert_eq!(objects.get(second).serial(), 3);
    }

    #[test]
    fn test_page_contents_are_text() {
        let mut objects = ObjectList::new();
        let page_name = objects.push(Value::Name(b"Page".to_vec()));
        let content = stream(&mut objects, Dictionary::new());
        let other = stream(&mut objects, Dictionary::new());

        let mut page = Dictionary::new();
        page.set("Type", page_name);
        page.set("Contents", content);
        objects.push(Value::Dictionary(page));

        let classification = classify(&objects);
        assert!(classification.renders_as_text(content));
        assert!(!classification.renders_as_text(other));
    }

    #[test]
    fn test_page_contents_array() {
        let mut objects = ObjectList::new();
        let page_name = objects.push(Value::Name(b"Page".to_vec()));
        let a = stream(&mut objects, Dictionary::new());
        let b = stream(&mut objects, Dictionary::new());
        let parts = objects.push(Value::Array(vec![a, b]));

        let mut page = Dictionary::new();
        page.set("Type", page_name);
        page.set("Contents", parts);
        objects.push(Value::Dictionary(page));

        let classification = classify(&objects);
        assert_eq!(classification.len(), 2);
        assert!(classification.renders_as_text(a));
        assert!(classification.renders_as_text(b));
    }

    #[test]
    fn test_type4_function_is_text() {
        let mut objects = ObjectList::new();
        let four = objects.push(Value::Number(Number::Integer(4)));
        let two = objects.push(Value::Number(Number::Integer(2)));

        let mut calculator = Dictionary::new();
        calculator.set("FunctionType", four);
        let calculator = stream(&mut objects, calculator);

        let mut sampled = Dictionary::new();
        sampled.set("FunctionType", two);
        let sampled = stream(&mut objects, sampled);

        let classification = classify(&objects);
        assert!(classification.renders_as_text(calculator));
        assert!(!classification.renders_as_text(sampled));
    }

    #[test]
    fn test_non_page_dictionary_ignored() {
        let mut objects = ObjectList::new();
        let pages_name = objects.push(Value::Name(b"Pages".to_vec()));
        let content = stream(&mut objects, Dictionary::new());

        let mut pages = Dictionary::new();
        pages.set("Type", pages_name);
        pages.set("Contents", content);
        objects.push(Value::Dictionary(pages));

        assert!(classify(&objects).is_empty());
    }
}
