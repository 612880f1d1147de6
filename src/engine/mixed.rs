//! Mixed-Content Conversion
//!
//! Mixed content is an ordered list of text and element nodes. On the
//! object side the list keeps the fragment shape (`Text` items and
//! single-key `Map` items), so conversion is about normalizing the odd
//! shapes the external parser produces.

use crate::fragment::{keys, Fragment, FragmentEntry, Value};

/// A mixed array that is really a single CDATA node unwraps to text
pub fn sole_cdata(items: &[Value]) -> Option<Value> {
    if items.len() != 1 {
        return None;
    }
    let map = items[0].as_map()?;
    if map.len() == 1 {
        map.get(keys::CDATA).cloned()
    } else {
        None
    }
}

/// Synthesize a mixed-content array from a plain object
///
/// Each non-attribute key becomes an embedded element node; `#text`
/// contributes a text node in place.
pub fn synthesize_mixed(map: &Fragment) -> Vec<Value> {
    let mut items = Vec::new();
    for entry in map.entries() {
        match entry {
            FragmentEntry::Text(value) | FragmentEntry::Cdata(value) => items.push(value.clone()),
            FragmentEntry::Child { name, value } => {
                for item in value.as_slice() {
                    let mut element = Fragment::new();
                    element.insert(name, item.clone());
                    items.push(Value::Map(element));
                }
            }
            _ => {}
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sole_cdata_unwraps() {
        let mut node = Fragment::new();
        node.insert(keys::CDATA, "raw text");
        let items = vec![Value::Map(node)];
        assert_eq!(sole_cdata(&items), Some(Value::Text("raw text".into())));
    }

    #[test]
    fn test_sole_cdata_rejects_multiple() {
        let mut node = Fragment::new();
        node.insert(keys::CDATA, "raw");
        let items = vec![Value::Map(node), Value::Text("more".into())];
        assert_eq!(sole_cdata(&items), None);
    }

    #[test]
    fn test_synthesize_from_plain_object() {
        let mut map = Fragment::new();
        map.insert("@_id", "1");
        map.insert(keys::TEXT, "lead ");
        let mut bold = Fragment::new();
        bold.insert(keys::TEXT, "emphasis");
        map.insert("b", bold);

        let items = synthesize_mixed(&map);
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], Value::Text("lead ".into()));
        assert!(items[1].as_map().is_some_and(|m| m.contains_key("b")));
    }
}
