//! Namespace Resolution
//!
//! Qualified element/attribute naming, per-type namespace collection,
//! and XSI auto-detection. Qualified names are memoized process-wide:
//! the set of distinct bindings is small and static, so the cache is
//! write-once-per-key and read-mostly.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;

use crate::fragment::{keys, Fragment, Value};
use crate::meta::{Namespace, TypeMetadata};

/// Well-known namespace constants
pub mod ns {
    /// XML Schema instance prefix
    pub const XSI_PREFIX: &str = "xsi";
    /// XML Schema instance URI
    pub const XSI_URI: &str = "http://www.w3.org/2001/XMLSchema-instance";
    /// Attribute key prefix marking XSI attributes inside a fragment
    pub const XSI_ATTR_PREFIX: &str = "@_xsi:";
    /// The `xml:space` attribute key
    pub const XML_SPACE_ATTR: &str = "@_xml:space";
}

type NameKey = (String, Option<String>, bool);

static NAME_CACHE: Lazy<RwLock<HashMap<NameKey, String>>> =
    Lazy::new(|| RwLock::new(HashMap::new()));

fn cached_name(name: &str, prefix: Option<&str>, qualify: bool) -> String {
    let key: NameKey = (name.to_string(), prefix.map(str::to_string), qualify);
    {
        let cache = NAME_CACHE.read().expect("name cache poisoned");
        if let Some(hit) = cache.get(&key) {
            return hit.clone();
        }
    }
    let built = match (prefix, qualify) {
        (Some(p), true) => format!("{p}:{name}"),
        _ => name.to_string(),
    };
    NAME_CACHE
        .write()
        .expect("name cache poisoned")
        .insert(key, built.clone());
    built
}

/// Qualified element name for a binding's primary namespace
///
/// `prefix:name` when the namespace carries a prefix and is not the
/// default; plain `name` otherwise.
pub fn qualified_element_name(name: &str, namespace: Option<&Namespace>) -> String {
    match namespace {
        Some(ns) if !ns.is_default() => {
            cached_name(name, ns.prefix.as_deref(), true)
        }
        _ => cached_name(name, None, false),
    }
}

/// Qualified attribute name
///
/// An attribute is never emitted with the default (prefixless)
/// namespace; only a genuine prefix qualifies it.
pub fn qualified_attribute_name(name: &str, namespace: Option<&Namespace>) -> String {
    match namespace.and_then(|ns| ns.prefix.as_deref()) {
        Some(prefix) => cached_name(name, Some(prefix), true),
        None => cached_name(name, None, false),
    }
}

/// Collect the namespace declarations a subtree root needs
///
/// Gathers from the root binding, every attribute binding, every array
/// binding and every field-element binding of the instance's own type
/// only: nested instances declare their own namespaces on their own
/// subtree root. Ordered, first declaration wins per key.
pub fn collect_namespaces(meta: &TypeMetadata) -> Vec<(String, String)> {
    let mut out: Vec<(String, String)> = Vec::new();
    let mut push = |ns: &Namespace| {
        let key = ns.declaration_key();
        if !out.iter().any(|(k, _)| k == key) {
            out.push((key.to_string(), ns.uri.clone()));
        }
    };

    if let Some(root) = &meta.root {
        if let Some(ns) = &root.namespace {
            push(ns);
        }
    }
    for binding in meta.attributes.values() {
        if let Some(ns) = &binding.namespace {
            push(ns);
        }
    }
    for bindings in meta.arrays.values() {
        for binding in bindings {
            if let Some(ns) = &binding.namespace {
                push(ns);
            }
        }
    }
    for binding in meta.field_elements.values() {
        for ns in &binding.namespaces {
            push(ns);
        }
    }
    out
}

/// Check whether a constructed fragment uses any XSI attribute
///
/// The fragment model is an owned tree, so plain recursion suffices.
pub fn needs_xsi_namespace(fragment: &Fragment) -> bool {
    for (key, value) in fragment.iter() {
        if key.starts_with(ns::XSI_ATTR_PREFIX) {
            return true;
        }
        match value {
            Value::Map(inner) => {
                if needs_xsi_namespace(inner) {
                    return true;
                }
            }
            Value::List(items) => {
                for item in items {
                    if let Value::Map(inner) = item {
                        if needs_xsi_namespace(inner) {
                            return true;
                        }
                    }
                }
            }
            _ => {}
        }
    }
    false
}

/// Write namespace declarations into the fragment at `root_name`
///
/// The `"default"` key becomes the unprefixed `xmlns`; any other key
/// becomes `xmlns:<prefix>`. The XSI declaration is appended
/// automatically when the subtree uses XSI attributes and `xsi` was not
/// already declared.
pub fn add_namespace_declarations(
    fragment: &mut Fragment,
    root_name: &str,
    namespaces: &[(String, String)],
) {
    let needs_xsi = fragment
        .get(root_name)
        .and_then(Value::as_map)
        .is_some_and(needs_xsi_namespace);

    let Some(Value::Map(root)) = fragment.get_mut(root_name) else {
        return;
    };

    for (key, uri) in namespaces {
        if key == "default" {
            root.insert(keys::attr(keys::XMLNS), uri.as_str());
        } else {
            root.insert(keys::attr(&format!("{}{key}", keys::XMLNS_PREFIX)), uri.as_str());
        }
    }

    let xsi_declared = namespaces.iter().any(|(k, _)| k == ns::XSI_PREFIX);
    if needs_xsi && !xsi_declared {
        root.insert(
            keys::attr(&format!("{}{}", keys::XMLNS_PREFIX, ns::XSI_PREFIX)),
            ns::XSI_URI,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::meta::{ArrayBinding, AttributeBinding, ElementBinding, TypeMetadata};

    #[test]
    fn test_qualified_element_name() {
        let prefixed = Namespace::prefixed("svg", "http://www.w3.org/2000/svg");
        assert_eq!(qualified_element_name("rect", Some(&prefixed)), "svg:rect");

        let default = Namespace::default_ns("http://example.com");
        assert_eq!(qualified_element_name("rect", Some(&default)), "rect");
        assert_eq!(qualified_element_name("rect", None), "rect");
    }

    #[test]
    fn test_qualified_name_is_pure() {
        let ns = Namespace::prefixed("a", "http://example.com/a");
        let first = qualified_element_name("node", Some(&ns));
        let second = qualified_element_name("node", Some(&ns));
        assert_eq!(first, second);
        assert_eq!(first, "a:node");
    }

    #[test]
    fn test_attribute_never_uses_default_ns() {
        let default = Namespace::default_ns("http://example.com");
        assert_eq!(qualified_attribute_name("id", Some(&default)), "id");

        let prefixed = Namespace::prefixed("x", "http://example.com/x");
        assert_eq!(qualified_attribute_name("id", Some(&prefixed)), "x:id");
    }

    #[test]
    fn test_collect_namespaces_first_wins() {
        let meta = TypeMetadata::builder()
            .root_ns("Root", Namespace::prefixed("a", "http://example.com/one"))
            .attribute(
                "id",
                AttributeBinding::new("id").ns(Namespace::prefixed("a", "http://example.com/two")),
            )
            .element(
                "name",
                ElementBinding::new("Name").ns(Namespace::default_ns("http://example.com/d")),
            )
            .array(
                "items",
                ArrayBinding::new("item").ns(Namespace::prefixed("b", "http://example.com/b")),
            )
            .build();

        let collected = collect_namespaces(&meta);
        assert_eq!(collected[0], ("a".to_string(), "http://example.com/one".to_string()));
        assert!(collected.contains(&("b".to_string(), "http://example.com/b".to_string())));
        assert!(collected.contains(&("default".to_string(), "http://example.com/d".to_string())));
        // The attribute's conflicting "a" declaration lost
        assert_eq!(collected.iter().filter(|(k, _)| k == "a").count(), 1);
    }

    #[test]
    fn test_xsi_detection_and_auto_declaration() {
        let mut inner = Fragment::new();
        let mut nil_holder = Fragment::new();
        nil_holder.insert("@_xsi:nil", "true");
        inner.insert("child", nil_holder);

        assert!(needs_xsi_namespace(&inner));

        let mut wrapper = Fragment::new();
        wrapper.insert("Root", inner);
        add_namespace_declarations(&mut wrapper, "Root", &[]);

        let root = wrapper.get("Root").and_then(Value::as_map).unwrap();
        assert_eq!(
            root.get("@_xmlns:xsi"),
            Some(&Value::Text(ns::XSI_URI.into()))
        );
    }

    #[test]
    fn test_declarations_written_at_root() {
        let mut wrapper = Fragment::new();
        wrapper.insert("Root", Fragment::new());
        add_namespace_declarations(
            &mut wrapper,
            "Root",
            &[
                ("default".to_string(), "http://example.com/d".to_string()),
                ("p".to_string(), "http://example.com/p".to_string()),
            ],
        );

        let root = wrapper.get("Root").and_then(Value::as_map).unwrap();
        assert_eq!(root.get("@_xmlns"), Some(&Value::Text("http://example.com/d".into())));
        assert_eq!(root.get("@_xmlns:p"), Some(&Value::Text("http://example.com/p".into())));
    }
}
