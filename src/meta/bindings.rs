//! Binding Descriptors
//!
//! The declarative rules associating a type's properties with XML tags,
//! attributes, namespaces and coercion/validation behavior. Everything
//! here must stay `Send + Sync`: metadata is shared process-wide.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use crate::convert::UnionCandidate;
use crate::dynamic::DynamicOptions;
use crate::fragment::{Scalar, Value};

/// A namespace attached to a binding
#[derive(Debug, Clone, PartialEq)]
pub struct Namespace {
    /// Prefix, or None for the default (unprefixed) namespace
    pub prefix: Option<String>,
    /// Namespace URI
    pub uri: String,
}

impl Namespace {
    /// A prefixed namespace
    pub fn prefixed(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Namespace {
            prefix: Some(prefix.into()),
            uri: uri.into(),
        }
    }

    /// The default (unprefixed) namespace
    pub fn default_ns(uri: impl Into<String>) -> Self {
        Namespace {
            prefix: None,
            uri: uri.into(),
        }
    }

    /// Check whether this is the default namespace
    pub fn is_default(&self) -> bool {
        self.prefix.is_none()
    }

    /// Declaration key: the prefix, or `"default"`
    pub fn declaration_key(&self) -> &str {
        self.prefix.as_deref().unwrap_or("default")
    }
}

/// A value hook usable from any thread
pub type ConvertFn = Arc<dyn Fn(&Value) -> Value + Send + Sync>;

/// Paired serialize/deserialize hooks
///
/// Used both for attribute/text converters and element transforms; a
/// missing hook means identity.
#[derive(Clone, Default)]
pub struct Converter {
    pub serialize: Option<ConvertFn>,
    pub deserialize: Option<ConvertFn>,
}

impl Converter {
    /// Hook applied when writing out
    pub fn on_serialize(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Converter {
            serialize: Some(Arc::new(f)),
            deserialize: None,
        }
    }

    /// Hook applied when reading in
    pub fn on_deserialize(f: impl Fn(&Value) -> Value + Send + Sync + 'static) -> Self {
        Converter {
            serialize: None,
            deserialize: Some(Arc::new(f)),
        }
    }

    /// Both hooks
    pub fn pair(
        ser: impl Fn(&Value) -> Value + Send + Sync + 'static,
        de: impl Fn(&Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        Converter {
            serialize: Some(Arc::new(ser)),
            deserialize: Some(Arc::new(de)),
        }
    }
}

impl std::fmt::Debug for Converter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Converter")
            .field("serialize", &self.serialize.is_some())
            .field("deserialize", &self.deserialize.is_some())
            .finish()
    }
}

/// Field-to-attribute binding
#[derive(Debug, Clone, Default)]
pub struct AttributeBinding {
    pub name: String,
    pub namespace: Option<Namespace>,
    pub required: bool,
    pub default_value: Option<Scalar>,
    pub pattern: Option<String>,
    pub enum_values: Option<Vec<String>>,
    pub converter: Option<Converter>,
}

impl AttributeBinding {
    pub fn new(name: impl Into<String>) -> Self {
        AttributeBinding {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn ns(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Scalar>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn enum_values(mut self, values: &[&str]) -> Self {
        self.enum_values = Some(values.iter().map(|s| s.to_string()).collect());
        self
    }

    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }
}

/// Field-to-element binding
#[derive(Debug, Clone, Default)]
pub struct ElementBinding {
    pub name: String,
    /// Namespaces; the first entry is the primary one for naming
    pub namespaces: Vec<Namespace>,
    pub required: bool,
    pub default_value: Option<Scalar>,
    /// Registered name of the nested type, when declared
    pub nested_type: Option<&'static str>,
    pub mixed_content: bool,
    pub nullable: bool,
    pub use_cdata: bool,
    pub xml_space: Option<String>,
    pub transform: Option<Converter>,
    pub union_types: Vec<UnionCandidate>,
}

impl ElementBinding {
    pub fn new(name: impl Into<String>) -> Self {
        ElementBinding {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn ns(mut self, namespace: Namespace) -> Self {
        self.namespaces.push(namespace);
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn default_value(mut self, value: impl Into<Scalar>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn nested(mut self, type_name: &'static str) -> Self {
        self.nested_type = Some(type_name);
        self
    }

    pub fn mixed(mut self) -> Self {
        self.mixed_content = true;
        self
    }

    pub fn nullable(mut self) -> Self {
        self.nullable = true;
        self
    }

    pub fn cdata(mut self) -> Self {
        self.use_cdata = true;
        self
    }

    pub fn xml_space(mut self, value: impl Into<String>) -> Self {
        self.xml_space = Some(value.into());
        self
    }

    pub fn transform(mut self, transform: Converter) -> Self {
        self.transform = Some(transform);
        self
    }

    pub fn union(mut self, candidates: &[UnionCandidate]) -> Self {
        self.union_types = candidates.to_vec();
        self
    }

    /// The primary namespace used for qualified naming
    pub fn primary_ns(&self) -> Option<&Namespace> {
        self.namespaces.first()
    }
}

/// Field-to-repeated-element binding
#[derive(Debug, Clone)]
pub struct ArrayBinding {
    /// Tag of each repeated item
    pub item_name: String,
    /// Enclosing container tag; None means unwrapped items
    pub container_name: Option<String>,
    /// Registered name of the item type, when declared
    pub item_type: Option<&'static str>,
    pub namespace: Option<Namespace>,
}

impl ArrayBinding {
    pub fn new(item_name: impl Into<String>) -> Self {
        ArrayBinding {
            item_name: item_name.into(),
            container_name: None,
            item_type: None,
            namespace: None,
        }
    }

    pub fn container(mut self, name: impl Into<String>) -> Self {
        self.container_name = Some(name.into());
        self
    }

    pub fn item_type(mut self, type_name: &'static str) -> Self {
        self.item_type = Some(type_name);
        self
    }

    pub fn ns(mut self, namespace: Namespace) -> Self {
        self.namespace = Some(namespace);
        self
    }

    /// Items appear directly under the parent, with no container tag
    pub fn is_unwrapped(&self) -> bool {
        self.container_name.is_none()
    }
}

/// Text-content binding
#[derive(Debug, Clone, Default)]
pub struct TextBinding {
    pub required: bool,
    pub converter: Option<Converter>,
    pub use_cdata: bool,
}

impl TextBinding {
    pub fn new() -> Self {
        TextBinding::default()
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn converter(mut self, converter: Converter) -> Self {
        self.converter = Some(converter);
        self
    }

    pub fn cdata(mut self) -> Self {
        self.use_cdata = true;
        self
    }
}

/// Comment binding: the comment precedes the target property's element
#[derive(Debug, Clone)]
pub struct CommentBinding {
    /// Property receiving the comment text
    pub property: String,
    /// Property whose element the comment precedes
    pub target_property: String,
    pub required: bool,
}

/// Root element binding (top-level types only)
#[derive(Debug, Clone)]
pub struct RootBinding {
    pub name: String,
    pub namespace: Option<Namespace>,
}

/// Dynamic/queryable property descriptor
#[derive(Debug, Clone)]
pub struct DynamicBinding {
    /// Property receiving the dynamic view
    pub property: String,
    /// Element-bound property whose sub-tree is viewed; None views the
    /// whole instance fragment
    pub target_property: Option<String>,
    pub required: bool,
    pub options: DynamicOptions,
}

impl DynamicBinding {
    pub fn new(property: impl Into<String>) -> Self {
        DynamicBinding {
            property: property.into(),
            target_property: None,
            required: false,
            options: DynamicOptions::default(),
        }
    }

    pub fn target(mut self, property: impl Into<String>) -> Self {
        self.target_property = Some(property.into());
        self
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn eager(mut self) -> Self {
        self.options.lazy = false;
        self
    }

    pub fn cached(mut self) -> Self {
        self.options.cache = true;
        self
    }

    pub fn options(mut self, options: DynamicOptions) -> Self {
        self.options = options;
        self
    }
}

/// The full binding table for one mapped type
///
/// Invariant: a property appears in at most one of the binding families;
/// `ignored` removes a property from consideration even if bound.
#[derive(Debug, Clone, Default)]
pub struct TypeMetadata {
    pub attributes: HashMap<String, AttributeBinding>,
    pub field_elements: HashMap<String, ElementBinding>,
    pub arrays: HashMap<String, Vec<ArrayBinding>>,
    pub text_field: Option<(String, TextBinding)>,
    pub comment_fields: Vec<CommentBinding>,
    pub root: Option<RootBinding>,
    pub ignored: HashSet<String>,
    pub aliases: HashMap<String, String>,
    pub queryables: Vec<DynamicBinding>,
}

impl TypeMetadata {
    /// Start a fluent build
    pub fn builder() -> super::builder::MetadataBuilder {
        super::builder::MetadataBuilder::new()
    }

    /// Attribute binding for a property, honoring `ignored`
    pub fn attribute(&self, property: &str) -> Option<&AttributeBinding> {
        if self.ignored.contains(property) {
            return None;
        }
        self.attributes.get(property)
    }

    /// Element binding for a property, honoring `ignored`
    pub fn element(&self, property: &str) -> Option<&ElementBinding> {
        if self.ignored.contains(property) {
            return None;
        }
        self.field_elements.get(property)
    }

    /// Array bindings for a property, honoring `ignored`
    pub fn arrays_for(&self, property: &str) -> Option<&[ArrayBinding]> {
        if self.ignored.contains(property) {
            return None;
        }
        self.arrays.get(property).map(Vec::as_slice)
    }

    /// Whether a property carries the text content
    pub fn is_text_property(&self, property: &str) -> bool {
        self.text_field
            .as_ref()
            .is_some_and(|(p, _)| p == property)
    }

    /// Whether a property receives a comment
    pub fn is_comment_property(&self, property: &str) -> bool {
        self.comment_fields.iter().any(|c| c.property == property)
    }

    /// Whether a property is dynamic/queryable
    pub fn is_queryable_property(&self, property: &str) -> bool {
        self.queryables.iter().any(|q| q.property == property)
    }

    /// Whether any field is declared mixed-content
    pub fn has_mixed_field(&self) -> bool {
        self.field_elements.values().any(|e| e.mixed_content)
    }

    /// Declared element name, falling back to the type name passed in
    pub fn element_name<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.root.as_ref().map_or(fallback, |r| r.name.as_str())
    }

    /// Every tag name this type expects, for diagnostics
    pub fn known_tags(&self) -> Vec<String> {
        let mut tags: Vec<String> = self
            .field_elements
            .values()
            .map(|e| e.name.clone())
            .collect();
        for bindings in self.arrays.values() {
            for b in bindings {
                tags.push(
                    b.container_name
                        .clone()
                        .unwrap_or_else(|| b.item_name.clone()),
                );
            }
        }
        tags.sort();
        tags.dedup();
        tags
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ignored_wins_over_binding() {
        let meta = TypeMetadata::builder()
            .element("color", ElementBinding::new("Color"))
            .ignore("color")
            .build();
        assert!(meta.element("color").is_none());
    }

    #[test]
    fn test_unwrapped_array_flag() {
        let unwrapped = ArrayBinding::new("item");
        assert!(unwrapped.is_unwrapped());
        let wrapped = ArrayBinding::new("item").container("items");
        assert!(!wrapped.is_unwrapped());
    }

    #[test]
    fn test_known_tags_prefers_container() {
        let meta = TypeMetadata::builder()
            .element("name", ElementBinding::new("Name"))
            .array("parts", ArrayBinding::new("part").container("Parts"))
            .build();
        assert_eq!(meta.known_tags(), vec!["Name".to_string(), "Parts".to_string()]);
    }
}
