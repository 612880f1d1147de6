//! Serialization: typed instance to fragment
//!
//! The walk mirrors the deserialization order: attributes, text,
//! comments, then the property walk. Cycle detection is per call: the
//! active path is threaded through the recursion, and an instance
//! already on it serializes as a placeholder so the same instance can
//! still appear on sibling branches.

use super::to_object::element_tag;
use super::{Mapper, SerializeCtx};
use crate::convert::{self, Direction};
use crate::dynamic::DynamicSlot;
use crate::error::{BindError, BindResult, RequiredKind};
use crate::fragment::{keys, Fragment, Value};
use crate::meta::{registry, ElementBinding, TypeMetadata};
use crate::names;
use crate::object::{self, Bindable};

/// The stable fragment standing in for an instance already on the path
pub fn circular_placeholder() -> Fragment {
    let mut frag = Fragment::new();
    frag.insert(keys::attr("circular"), "true");
    frag
}

/// Tag used when a property serializes as a plain (non-nested) value
fn property_tag(meta: &TypeMetadata, property: &str) -> String {
    match meta.aliases.get(property) {
        Some(alias) => alias.clone(),
        None => element_tag(meta, property),
    }
}

impl Mapper {
    /// Serialize one instance into its element body
    ///
    /// `element_ctx` is the binding of the element enclosing this
    /// instance, when one exists; it contributes `xml:space`.
    pub(crate) fn serialize_instance(
        &self,
        instance: &dyn Bindable,
        meta: &TypeMetadata,
        element_ctx: Option<&ElementBinding>,
        ctx: &mut SerializeCtx,
    ) -> BindResult<Fragment> {
        let key = object::instance_key(instance);
        if ctx.contains(key) {
            return Ok(circular_placeholder());
        }
        ctx.push(key);
        let result = self.serialize_body(instance, meta, element_ctx, ctx);
        ctx.pop();
        result
    }

    fn serialize_body(
        &self,
        instance: &dyn Bindable,
        meta: &TypeMetadata,
        element_ctx: Option<&ElementBinding>,
        ctx: &mut SerializeCtx,
    ) -> BindResult<Fragment> {
        let mut out = Fragment::new();

        if let Some(space) = element_ctx.and_then(|e| e.xml_space.as_deref()) {
            out.insert(names::ns::XML_SPACE_ATTR, space);
        }

        self.serialize_attributes(instance, meta, &mut out)?;
        self.serialize_text(instance, meta, &mut out)?;
        self.serialize_comments(instance, meta, &mut out)?;

        for prop in instance.property_names() {
            if meta.attribute(prop).is_some()
                || meta.is_text_property(prop)
                || meta.is_comment_property(prop)
                || meta.ignored.contains(prop)
            {
                continue;
            }
            let Some(value) = instance.get_property(prop) else {
                continue;
            };

            // Dynamic slots serialize only when manually overridden; a
            // built or pending view reflects input that is still present
            // elsewhere in the fragment
            let value = match &value {
                Value::Dynamic(slot) => match DynamicSlot::override_value(slot) {
                    Some(overridden) => overridden,
                    None => continue,
                },
                _ => value,
            };

            self.serialize_property(&mut out, meta, prop, value, ctx)?;
        }

        Ok(out)
    }

    fn serialize_attributes(
        &self,
        instance: &dyn Bindable,
        meta: &TypeMetadata,
        out: &mut Fragment,
    ) -> BindResult<()> {
        for prop in instance.property_names() {
            let Some(ab) = meta.attribute(prop) else {
                continue;
            };
            let mut value = instance.get_property(prop).unwrap_or(Value::Null);
            if value.is_null() {
                if let Some(default) = &ab.default_value {
                    value = default.to_value();
                }
            }
            if value.is_null() {
                if self.options.omit_null_values {
                    continue;
                }
                value = Value::Text(String::new());
            }
            let value = convert::apply_converter(value, ab.converter.as_ref(), Direction::Serialize);
            let value = match value {
                Value::Bool(_) => Value::Text(value.stringify()),
                other => other,
            };
            let qualified = names::qualified_attribute_name(&ab.name, ab.namespace.as_ref());
            if !convert::validate_value(&value, ab.pattern.as_deref(), ab.enum_values.as_deref()) {
                return Err(BindError::InvalidValue {
                    name: qualified,
                    value: value.stringify(),
                });
            }
            out.insert(keys::attr(&qualified), value);
        }
        Ok(())
    }

    fn serialize_text(
        &self,
        instance: &dyn Bindable,
        meta: &TypeMetadata,
        out: &mut Fragment,
    ) -> BindResult<()> {
        let Some((prop, tb)) = &meta.text_field else {
            return Ok(());
        };
        let value = instance.get_property(prop).unwrap_or(Value::Null);
        if value.is_null() {
            if tb.required {
                return Err(BindError::MissingRequired {
                    kind: RequiredKind::Text,
                    name: prop.clone(),
                });
            }
            return Ok(());
        }
        let value = convert::apply_converter(value, tb.converter.as_ref(), Direction::Serialize);
        let key = if tb.use_cdata { keys::CDATA } else { keys::TEXT };
        out.insert(key, value);
        Ok(())
    }

    fn serialize_comments(
        &self,
        instance: &dyn Bindable,
        meta: &TypeMetadata,
        out: &mut Fragment,
    ) -> BindResult<()> {
        for cb in &meta.comment_fields {
            let tag = element_tag(meta, &cb.target_property);
            let text = match instance.get_property(&cb.property) {
                Some(Value::List(items)) => items
                    .iter()
                    .map(Value::stringify)
                    .collect::<Vec<_>>()
                    .join("\n"),
                Some(Value::Null) | None => String::new(),
                Some(other) => other.stringify(),
            };
            if text.is_empty() {
                if cb.required {
                    return Err(BindError::MissingRequired {
                        kind: RequiredKind::Comment,
                        name: tag,
                    });
                }
                continue;
            }
            out.insert(keys::comment(&tag), text);
        }
        Ok(())
    }

    /// Step 6 value handling for a single property
    fn serialize_property(
        &self,
        out: &mut Fragment,
        meta: &TypeMetadata,
        prop: &str,
        value: Value,
        ctx: &mut SerializeCtx,
    ) -> BindResult<()> {
        let eb = meta.element(prop);
        let mut value = value;

        // Serialize transform on primitives
        if let Some(transform) = eb.and_then(|e| e.transform.as_ref()) {
            if value.is_primitive() {
                value = convert::apply_converter(value, Some(transform), Direction::Serialize);
            }
        }

        // Mixed content list keeps its interleaved shape
        if eb.is_some_and(|e| e.mixed_content) {
            if let Value::List(items) = &value {
                let mut converted = Vec::with_capacity(items.len());
                for item in items {
                    converted.push(self.serialize_complex(item, None, ctx)?);
                }
                let mut node = Fragment::new();
                node.insert(keys::MIXED, Value::List(converted));
                out.insert(property_tag(meta, prop), node);
                return Ok(());
            }
        }

        if value.is_null() {
            if self.options.omit_null_values {
                return Ok(());
            }
            if eb.is_some_and(|e| e.nullable) {
                let mut nil = Fragment::new();
                nil.insert(keys::attr("xsi:nil"), "true");
                out.insert(property_tag(meta, prop), nil);
            } else {
                out.insert(property_tag(meta, prop), Value::Null);
            }
            return Ok(());
        }

        // Arrays
        if let Some(bindings) = meta.arrays_for(prop) {
            if let (Some(ab), Value::List(items)) = (bindings.first(), &value) {
                let mut mapped = Vec::with_capacity(items.len());
                for item in items {
                    mapped.push(self.serialize_complex(item, ab.item_type, ctx)?);
                }
                let item_tag =
                    names::qualified_element_name(&ab.item_name, ab.namespace.as_ref());
                match &ab.container_name {
                    // Items land directly under the parent
                    None => out.insert(item_tag, Value::List(mapped)),
                    Some(container) if *container != ab.item_name => {
                        let mut inner = Fragment::new();
                        inner.insert(item_tag, Value::List(mapped));
                        out.insert(
                            names::qualified_element_name(container, ab.namespace.as_ref()),
                            inner,
                        );
                    }
                    Some(container) => out.insert(
                        names::qualified_element_name(container, ab.namespace.as_ref()),
                        Value::List(mapped),
                    ),
                }
                return Ok(());
            }
        }

        // A list with no array metadata is emitted as-is
        if matches!(value, Value::List(_)) {
            out.insert(property_tag(meta, prop), value);
            return Ok(());
        }

        // Nested typed instance
        if let Value::Instance(inst) = &value {
            let borrowed = inst.borrow();
            let runtime = borrowed.type_name();
            let nested_meta =
                registry::metadata_by_name(runtime).ok_or_else(|| BindError::UnknownType {
                    name: runtime.to_string(),
                })?;
            let mut body = self.serialize_instance(&*borrowed, &nested_meta, eb, ctx)?;

            for (key, uri) in names::collect_namespaces(&nested_meta) {
                let attr_key = if key == "default" {
                    keys::attr(keys::XMLNS)
                } else {
                    keys::attr(&format!("{}{key}", keys::XMLNS_PREFIX))
                };
                if !body.contains_key(&attr_key) {
                    body.insert(attr_key, uri);
                }
            }

            if self.options.use_xsi_type {
                if let Some(declared) = eb.and_then(|e| e.nested_type) {
                    if declared != runtime {
                        body.insert(keys::attr("xsi:type"), runtime);
                    }
                }
            }

            let tag = if let Some(alias) = meta.aliases.get(prop) {
                alias.clone()
            } else if let Some(e) = eb.filter(|e| e.name != prop) {
                names::qualified_element_name(&e.name, e.primary_ns())
            } else if let Some(root) = &nested_meta.root {
                names::qualified_element_name(&root.name, root.namespace.as_ref())
            } else {
                prop.to_string()
            };
            out.insert(tag, Value::Map(body));
            return Ok(());
        }

        // Untyped fragments pass through under the property's tag
        if matches!(value, Value::Map(_)) {
            out.insert(property_tag(meta, prop), value);
            return Ok(());
        }

        // Primitives: CDATA wrap, xml:space carrier, or plain
        let tag = property_tag(meta, prop);
        if eb.is_some_and(|e| e.use_cdata) {
            let mut node = Fragment::new();
            node.insert(keys::CDATA, value);
            out.insert(tag, node);
        } else if let Some(space) = eb.and_then(|e| e.xml_space.as_deref()) {
            let mut node = Fragment::new();
            node.insert(names::ns::XML_SPACE_ATTR, space);
            node.insert(keys::TEXT, value);
            out.insert(tag, node);
        } else {
            out.insert(tag, value);
        }
        Ok(())
    }

    /// Serialize a complex list/mixed item; scalars and fragments pass
    /// through
    fn serialize_complex(
        &self,
        item: &Value,
        declared_type: Option<&'static str>,
        ctx: &mut SerializeCtx,
    ) -> BindResult<Value> {
        let Value::Instance(inst) = item else {
            return Ok(item.clone());
        };
        let borrowed = inst.borrow();
        let runtime = borrowed.type_name();
        let meta = declared_type
            .and_then(registry::metadata_by_name)
            .or_else(|| registry::metadata_by_name(runtime))
            .ok_or_else(|| BindError::UnknownType {
                name: runtime.to_string(),
            })?;
        let body = self.serialize_instance(&*borrowed, &meta, None, ctx)?;
        Ok(Value::Map(body))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::MapperOptions;
    use crate::meta::{ArrayBinding, AttributeBinding, TypeMetadata};
    use std::any::Any;
    use std::collections::HashMap;

    #[derive(Default)]
    struct Bag {
        fields: HashMap<String, Value>,
        props: Vec<&'static str>,
    }

    impl Bag {
        fn new(props: &[&'static str]) -> Self {
            Bag {
                fields: HashMap::new(),
                props: props.to_vec(),
            }
        }

        fn with(mut self, name: &str, value: impl Into<Value>) -> Self {
            self.fields.insert(name.to_string(), value.into());
            self
        }
    }

    impl Bindable for Bag {
        fn type_name(&self) -> &'static str {
            "Bag"
        }

        fn property_names(&self) -> Vec<&'static str> {
            self.props.clone()
        }

        fn get_property(&self, name: &str) -> Option<Value> {
            Some(self.fields.get(name).cloned().unwrap_or(Value::Null))
        }

        fn set_property(&mut self, name: &str, value: Value) {
            self.fields.insert(name.to_string(), value);
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    fn serialize(bag: &Bag, meta: &TypeMetadata, options: MapperOptions) -> Fragment {
        let mapper = Mapper::new(options);
        let mut ctx = SerializeCtx::new();
        mapper
            .serialize_instance(bag, meta, None, &mut ctx)
            .unwrap()
    }

    #[test]
    fn test_null_attribute_becomes_empty_string() {
        let meta = TypeMetadata::builder()
            .attribute("id", AttributeBinding::new("id"))
            .build();
        let bag = Bag::new(&["id"]);

        let out = serialize(&bag, &meta, MapperOptions::default());
        assert_eq!(out.get("@_id"), Some(&Value::Text(String::new())));
    }

    #[test]
    fn test_null_attribute_omitted_when_configured() {
        let meta = TypeMetadata::builder()
            .attribute("id", AttributeBinding::new("id"))
            .build();
        let bag = Bag::new(&["id"]);
        let options = MapperOptions {
            omit_null_values: true,
            ..Default::default()
        };

        let out = serialize(&bag, &meta, options);
        assert!(out.is_empty());
    }

    #[test]
    fn test_attribute_default_fills_null() {
        let meta = TypeMetadata::builder()
            .attribute("lang", AttributeBinding::new("lang").default_value("en"))
            .build();
        let bag = Bag::new(&["lang"]);

        let out = serialize(&bag, &meta, MapperOptions::default());
        assert_eq!(out.get("@_lang"), Some(&Value::Text("en".into())));
    }

    #[test]
    fn test_attribute_validation_is_fatal() {
        let meta = TypeMetadata::builder()
            .attribute("code", AttributeBinding::new("code").pattern(r"^\d+$"))
            .build();
        let bag = Bag::new(&["code"]).with("code", "not-numeric");

        let mapper = Mapper::new(MapperOptions::default());
        let mut ctx = SerializeCtx::new();
        let err = mapper
            .serialize_instance(&bag, &meta, None, &mut ctx)
            .unwrap_err();
        assert!(matches!(err, BindError::InvalidValue { .. }));
    }

    #[test]
    fn test_boolean_attribute_stringified() {
        let meta = TypeMetadata::builder()
            .attribute("active", AttributeBinding::new("active"))
            .build();
        let bag = Bag::new(&["active"]).with("active", true);

        let out = serialize(&bag, &meta, MapperOptions::default());
        assert_eq!(out.get("@_active"), Some(&Value::Text("true".into())));
    }

    #[test]
    fn test_cdata_element_wraps() {
        let meta = TypeMetadata::builder()
            .element("script", ElementBinding::new("Script").cdata())
            .build();
        let bag = Bag::new(&["script"]).with("script", "if (a < b) go()");

        let out = serialize(&bag, &meta, MapperOptions::default());
        let node = out.get("Script").and_then(Value::as_map).unwrap();
        assert_eq!(
            node.get(keys::CDATA),
            Some(&Value::Text("if (a < b) go()".into()))
        );
    }

    #[test]
    fn test_nullable_null_emits_xsi_nil() {
        let meta = TypeMetadata::builder()
            .element("note", ElementBinding::new("Note").nullable())
            .build();
        let bag = Bag::new(&["note"]);

        let out = serialize(&bag, &meta, MapperOptions::default());
        let node = out.get("Note").and_then(Value::as_map).unwrap();
        assert_eq!(node.get("@_xsi:nil"), Some(&Value::Text("true".into())));
    }

    #[test]
    fn test_unwrapped_array_lands_at_parent_level() {
        let meta = TypeMetadata::builder()
            .array("parts", ArrayBinding::new("part"))
            .build();
        let items = Value::List(vec![Value::Text("a".into()), Value::Text("b".into())]);
        let bag = Bag::new(&["parts"]).with("parts", items.clone());

        let out = serialize(&bag, &meta, MapperOptions::default());
        assert_eq!(out.get("part"), Some(&items));
        assert!(out.get("parts").is_none());
    }

    #[test]
    fn test_distinct_container_and_item_names_nest() {
        let meta = TypeMetadata::builder()
            .array("parts", ArrayBinding::new("part").container("Parts"))
            .build();
        let items = Value::List(vec![Value::Text("a".into())]);
        let bag = Bag::new(&["parts"]).with("parts", items.clone());

        let out = serialize(&bag, &meta, MapperOptions::default());
        let container = out.get("Parts").and_then(Value::as_map).unwrap();
        assert_eq!(container.get("part"), Some(&items));
    }

    #[test]
    fn test_comment_list_joined_with_newlines() {
        let meta = TypeMetadata::builder()
            .element("name", ElementBinding::new("Name"))
            .comment("remarks", "name", false)
            .build();
        let bag = Bag::new(&["name", "remarks"])
            .with("name", "x")
            .with(
                "remarks",
                Value::List(vec![Value::Text("one".into()), Value::Text("two".into())]),
            );

        let out = serialize(&bag, &meta, MapperOptions::default());
        assert_eq!(out.get("?_Name"), Some(&Value::Text("one\ntwo".into())));
    }

    #[test]
    fn test_xml_space_carrier_for_primitive() {
        let meta = TypeMetadata::builder()
            .element("raw", ElementBinding::new("Raw").xml_space("preserve"))
            .build();
        let bag = Bag::new(&["raw"]).with("raw", "  padded  ");

        let out = serialize(&bag, &meta, MapperOptions::default());
        let node = out.get("Raw").and_then(Value::as_map).unwrap();
        assert_eq!(
            node.get(names::ns::XML_SPACE_ATTR),
            Some(&Value::Text("preserve".into()))
        );
        assert_eq!(node.get(keys::TEXT), Some(&Value::Text("  padded  ".into())));
    }

    #[test]
    fn test_alias_used_as_tag() {
        let meta = TypeMetadata::builder().alias("kind", "Kind").build();
        let bag = Bag::new(&["kind"]).with("kind", "basic");

        let out = serialize(&bag, &meta, MapperOptions::default());
        assert_eq!(out.get("Kind"), Some(&Value::Text("basic".into())));
    }

    #[test]
    fn test_circular_placeholder_shape() {
        let frag = circular_placeholder();
        assert_eq!(frag.get("@_circular"), Some(&Value::Text("true".into())));
    }
}
