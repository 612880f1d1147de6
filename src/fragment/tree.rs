//! Fragment Storage
//!
//! An insertion-ordered string-keyed map. Order matters: namespace
//! declarations, comment adjacency and mixed content all depend on the
//! sequence entries were written in, so a plain `HashMap` is not enough.

use super::keys;
use super::value::Value;

/// An untyped tree node exchanged with the external parser/serializer
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Fragment {
    entries: Vec<(String, Value)>,
}

/// A classified view of one fragment entry
///
/// Lets engine code match exhaustively instead of re-inspecting key
/// prefixes at every call site.
#[derive(Debug, Clone, PartialEq)]
pub enum FragmentEntry<'a> {
    /// `@_name` attribute
    Attribute { name: &'a str, value: &'a Value },
    /// `#text` content
    Text(&'a Value),
    /// `__cdata` content
    Cdata(&'a Value),
    /// `#mixed` ordered content
    Mixed(&'a Value),
    /// `?_tag` comment preceding `target`
    Comment { target: &'a str, value: &'a Value },
    /// Child element (single fragment or list of fragments)
    Child { name: &'a str, value: &'a Value },
}

impl Fragment {
    /// Create an empty fragment
    pub fn new() -> Self {
        Fragment {
            entries: Vec::new(),
        }
    }

    /// Create an empty fragment with room for `cap` entries
    pub fn with_capacity(cap: usize) -> Self {
        Fragment {
            entries: Vec::with_capacity(cap),
        }
    }

    /// Number of entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Check for emptiness
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look up a value by key
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    /// Look up a value by key, mutably
    pub fn get_mut(&mut self, key: &str) -> Option<&mut Value> {
        self.entries
            .iter_mut()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Check key membership
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.iter().any(|(k, _)| k == key)
    }

    /// Insert a value, replacing in place if the key already exists
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
    }

    /// Remove and return a value by key
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        let pos = self.entries.iter().position(|(k, _)| k == key)?;
        Some(self.entries.remove(pos).1)
    }

    /// Iterate over keys in insertion order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    /// Iterate over `(key, value)` pairs in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Iterate over classified entries in insertion order
    pub fn entries(&self) -> impl Iterator<Item = FragmentEntry<'_>> {
        self.entries.iter().map(|(k, v)| classify(k, v))
    }

    /// Text content, preferring CDATA over plain text
    pub fn text_value(&self) -> Option<&Value> {
        self.get(keys::CDATA).or_else(|| self.get(keys::TEXT))
    }

    /// Check whether this fragment holds only a `#text` entry
    pub fn is_text_singleton(&self) -> bool {
        self.entries.len() == 1 && self.entries[0].0 == keys::TEXT
    }

    /// Check whether this fragment carries any child element keys
    pub fn has_child_elements(&self) -> bool {
        self.entries.iter().any(|(k, _)| !keys::is_reserved(k))
    }
}

fn classify<'a>(key: &'a str, value: &'a Value) -> FragmentEntry<'a> {
    if let Some(name) = key.strip_prefix(keys::ATTR_PREFIX) {
        FragmentEntry::Attribute { name, value }
    } else if key == keys::TEXT {
        FragmentEntry::Text(value)
    } else if key == keys::CDATA {
        FragmentEntry::Cdata(value)
    } else if key == keys::MIXED {
        FragmentEntry::Mixed(value)
    } else if let Some(target) = key.strip_prefix(keys::COMMENT_PREFIX) {
        FragmentEntry::Comment { target, value }
    } else {
        FragmentEntry::Child { name: key, value }
    }
}

impl FromIterator<(String, Value)> for Fragment {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        let mut frag = Fragment::new();
        for (k, v) in iter {
            frag.insert(k, v);
        }
        frag
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insert_and_get() {
        let mut frag = Fragment::new();
        frag.insert("name", "widget");
        assert_eq!(frag.get("name"), Some(&Value::Text("widget".into())));
        assert!(frag.get("missing").is_none());
    }

    #[test]
    fn test_insert_replaces_in_place() {
        let mut frag = Fragment::new();
        frag.insert("a", "1");
        frag.insert("b", "2");
        frag.insert("a", "3");
        assert_eq!(frag.len(), 2);
        let keys: Vec<_> = frag.keys().collect();
        assert_eq!(keys, vec!["a", "b"]);
        assert_eq!(frag.get("a"), Some(&Value::Text("3".into())));
    }

    #[test]
    fn test_preserves_insertion_order() {
        let mut frag = Fragment::new();
        frag.insert("z", "1");
        frag.insert("a", "2");
        frag.insert("m", "3");
        let keys: Vec<_> = frag.keys().collect();
        assert_eq!(keys, vec!["z", "a", "m"]);
    }

    #[test]
    fn test_classified_entries() {
        let mut frag = Fragment::new();
        frag.insert("@_id", "42");
        frag.insert("#text", "hello");
        frag.insert("?_child", "a comment");
        frag.insert("child", Fragment::new());

        let entries: Vec<_> = frag.entries().collect();
        assert!(matches!(
            entries[0],
            FragmentEntry::Attribute { name: "id", .. }
        ));
        assert!(matches!(entries[1], FragmentEntry::Text(_)));
        assert!(matches!(
            entries[2],
            FragmentEntry::Comment { target: "child", .. }
        ));
        assert!(matches!(
            entries[3],
            FragmentEntry::Child { name: "child", .. }
        ));
    }

    #[test]
    fn test_text_prefers_cdata() {
        let mut frag = Fragment::new();
        frag.insert("#text", "plain");
        frag.insert("__cdata", "raw");
        assert_eq!(frag.text_value(), Some(&Value::Text("raw".into())));
    }
}
