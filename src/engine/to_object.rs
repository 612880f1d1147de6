//! Deserialization: fragment to typed instance
//!
//! The order of operations matters; later steps may overwrite earlier
//! ones only where the algorithm says so. Auto-discovery is attempted
//! only when strict validation is off or the tag already has an
//! explicit mapping — it never silently satisfies strict completeness.

use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

use super::mixed;
use super::Mapper;
use crate::convert::{self, Direction};
use crate::discover;
use crate::dynamic::{self, DynamicSlot};
use crate::error::{BindError, BindResult, RequiredKind};
use crate::fragment::{keys, Fragment, FragmentEntry, Scalar, Value};
use crate::meta::{registry, TypeMetadata};
use crate::names;
use crate::object::Bindable;

/// Qualified tag for an element-bound property
pub(super) fn element_tag(meta: &TypeMetadata, property: &str) -> String {
    match meta.element(property) {
        Some(eb) => names::qualified_element_name(&eb.name, eb.primary_ns()),
        None => property.to_string(),
    }
}

impl Mapper {
    /// Populate a blank instance from a fragment (the element body, not
    /// the root wrapper)
    pub(crate) fn populate(
        &self,
        instance: &mut dyn Bindable,
        meta: &TypeMetadata,
        fragment: &Fragment,
    ) -> BindResult<()> {
        let mut found: HashSet<String> = HashSet::new();
        let mut consumed: HashSet<String> = HashSet::new();

        self.bind_attributes(instance, meta, fragment, &mut found)?;
        self.bind_text(instance, meta, fragment, &mut found)?;
        self.bind_comments(instance, meta, fragment, &mut found)?;

        let reverse = build_reverse_map(instance, meta);
        self.bind_unwrapped_arrays(instance, meta, fragment, &mut found, &mut consumed)?;

        let mut unrecognized: Vec<String> = Vec::new();
        self.walk_children(
            instance,
            meta,
            fragment,
            &reverse,
            &mut found,
            &consumed,
            &mut unrecognized,
        )?;

        apply_defaults(instance, meta, &found);
        self.materialize_queryables(instance, meta, fragment)?;
        check_required_elements(meta, fragment, &found)?;

        if self.options.strict_validation {
            self.strict_checks(instance, meta, &unrecognized)?;
        }
        Ok(())
    }

    fn bind_attributes(
        &self,
        instance: &mut dyn Bindable,
        meta: &TypeMetadata,
        fragment: &Fragment,
        found: &mut HashSet<String>,
    ) -> BindResult<()> {
        for prop in instance.property_names() {
            let Some(ab) = meta.attribute(prop) else {
                continue;
            };
            let qualified = names::qualified_attribute_name(&ab.name, ab.namespace.as_ref());
            let raw = fragment
                .get(&keys::attr(&qualified))
                .cloned()
                .or_else(|| ab.default_value.as_ref().map(Scalar::to_value));
            let value = match raw {
                Some(v) => v,
                None if ab.required => {
                    return Err(BindError::MissingRequired {
                        kind: RequiredKind::Attribute,
                        name: qualified,
                    });
                }
                None => continue,
            };
            let value = convert::apply_converter(value, ab.converter.as_ref(), Direction::Deserialize);
            if !convert::validate_value(&value, ab.pattern.as_deref(), ab.enum_values.as_deref()) {
                return Err(BindError::InvalidValue {
                    name: qualified,
                    value: value.stringify(),
                });
            }
            let current = instance.get_property(prop);
            instance.set_property(prop, convert::coerce_to_property(value, current.as_ref()));
            found.insert(prop.to_string());
        }
        Ok(())
    }

    fn bind_text(
        &self,
        instance: &mut dyn Bindable,
        meta: &TypeMetadata,
        fragment: &Fragment,
        found: &mut HashSet<String>,
    ) -> BindResult<()> {
        let Some((prop, tb)) = &meta.text_field else {
            return Ok(());
        };
        let raw = fragment
            .text_value()
            .cloned()
            .or_else(|| {
                fragment
                    .get(keys::MIXED)
                    .map(Value::as_slice)
                    .and_then(mixed::sole_cdata)
            });
        match raw {
            Some(value) => {
                let value =
                    convert::apply_converter(value, tb.converter.as_ref(), Direction::Deserialize);
                let current = instance.get_property(prop);
                instance.set_property(prop, convert::coerce_to_property(value, current.as_ref()));
                found.insert(prop.clone());
            }
            None if tb.required => {
                return Err(BindError::MissingRequired {
                    kind: RequiredKind::Text,
                    name: prop.clone(),
                });
            }
            None => {}
        }
        Ok(())
    }

    fn bind_comments(
        &self,
        instance: &mut dyn Bindable,
        meta: &TypeMetadata,
        fragment: &Fragment,
        found: &mut HashSet<String>,
    ) -> BindResult<()> {
        for cb in &meta.comment_fields {
            let tag = element_tag(meta, &cb.target_property);
            match fragment.get(&keys::comment(&tag)) {
                Some(raw) => {
                    let text = raw.stringify();
                    let current = instance.get_property(&cb.property);
                    let value = if matches!(current, Some(Value::List(_))) {
                        Value::List(
                            text.split('\n')
                                .map(|line| Value::Text(line.to_string()))
                                .collect(),
                        )
                    } else {
                        Value::Text(text)
                    };
                    instance.set_property(&cb.property, value);
                    found.insert(cb.property.clone());
                }
                None if cb.required => {
                    return Err(BindError::MissingRequired {
                        kind: RequiredKind::Comment,
                        name: tag,
                    });
                }
                None => {}
            }
        }
        Ok(())
    }

    fn bind_unwrapped_arrays(
        &self,
        instance: &mut dyn Bindable,
        meta: &TypeMetadata,
        fragment: &Fragment,
        found: &mut HashSet<String>,
        consumed: &mut HashSet<String>,
    ) -> BindResult<()> {
        for (prop, bindings) in &meta.arrays {
            if meta.ignored.contains(prop) {
                continue;
            }
            for ab in bindings.iter().filter(|ab| ab.is_unwrapped()) {
                let qualified =
                    names::qualified_element_name(&ab.item_name, ab.namespace.as_ref());
                let Some(raw) = fragment
                    .get(&ab.item_name)
                    .or_else(|| fragment.get(&qualified))
                else {
                    continue;
                };
                let mut items = Vec::new();
                for item in raw.as_slice() {
                    items.push(self.map_array_item(item, ab.item_type, prop)?);
                }
                instance.set_property(prop, Value::List(items));
                consumed.insert(ab.item_name.clone());
                consumed.insert(qualified);
                found.insert(prop.clone());
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn walk_children(
        &self,
        instance: &mut dyn Bindable,
        meta: &TypeMetadata,
        fragment: &Fragment,
        reverse: &HashMap<String, String>,
        found: &mut HashSet<String>,
        consumed: &HashSet<String>,
        unrecognized: &mut Vec<String>,
    ) -> BindResult<()> {
        for entry in fragment.entries() {
            let FragmentEntry::Child {
                name: key,
                value: raw,
            } = entry
            else {
                continue;
            };
            if consumed.contains(key) {
                continue;
            }
            let explicit = reverse.contains_key(key);
            let prop = reverse.get(key).cloned().or_else(|| {
                let (_, local) = discover::split_name(key);
                let props = instance.property_names();
                discover::name_variants(local)
                    .into_iter()
                    .find(|v| props.iter().any(|p| *p == v.as_str()))
            });
            let Some(prop) = prop else {
                unrecognized.push(key.to_string());
                continue;
            };
            if meta.ignored.contains(&prop) {
                continue;
            }
            let value =
                self.deserialize_child(instance, meta, &prop, key, raw, explicit)?;
            instance.set_property(&prop, value);
            found.insert(prop);
        }
        Ok(())
    }

    /// Step 7 value handling for a single child key
    fn deserialize_child(
        &self,
        instance: &dyn Bindable,
        meta: &TypeMetadata,
        prop: &str,
        key: &str,
        raw: &Value,
        explicitly_mapped: bool,
    ) -> BindResult<Value> {
        let eb = meta.element(prop);
        let is_mixed_field = eb.is_some_and(|e| e.mixed_content);
        let mut value = raw.clone();

        // An empty object means an empty element
        if let Value::Map(m) = &value {
            if m.is_empty() {
                value = Value::Text(String::new());
            }
        }

        // {#text: v} singleton unwraps to the scalar
        if let Value::Map(m) = &value {
            if m.is_text_singleton() {
                value = m.get(keys::TEXT).cloned().unwrap_or(Value::Null);
            }
        }

        // Mixed content
        if let Value::Map(m) = &value {
            if let Some(mixed_raw) = m.get(keys::MIXED) {
                let items = mixed_raw.as_slice().to_vec();
                if is_mixed_field {
                    value = Value::List(items);
                } else if let Some(text) = mixed::sole_cdata(&items) {
                    value = text;
                }
            } else if is_mixed_field && m.has_child_elements() {
                value = Value::List(mixed::synthesize_mixed(m));
            }
        }

        // Array container/item extraction
        if let Some(bindings) = meta.arrays_for(prop) {
            let matched = bindings.iter().find(|ab| match &ab.container_name {
                Some(container) => {
                    container == key
                        || names::qualified_element_name(container, ab.namespace.as_ref()) == key
                }
                None => {
                    ab.item_name == key
                        || names::qualified_element_name(&ab.item_name, ab.namespace.as_ref())
                            == key
                }
            });
            if let Some(ab) = matched {
                let raw_items: Vec<Value> = match (&ab.container_name, &value) {
                    (Some(_), Value::Map(m)) => {
                        let qualified =
                            names::qualified_element_name(&ab.item_name, ab.namespace.as_ref());
                        m.get(&ab.item_name)
                            .or_else(|| m.get(&qualified))
                            .map(|v| v.as_slice().to_vec())
                            .unwrap_or_default()
                    }
                    _ => value.as_slice().to_vec(),
                };
                let mut items = Vec::new();
                for item in raw_items {
                    items.push(self.map_array_item(&item, ab.item_type, prop)?);
                }
                return Ok(Value::List(items));
            }
        }

        // Remaining complex value: recursive nested mapping
        if let Value::Map(m) = &value {
            if let Some(type_name) = eb.and_then(|e| e.nested_type) {
                value = self.instantiate(type_name, m)?;
            } else if let Some(Value::Instance(existing)) = instance.get_property(prop) {
                let type_name = existing.borrow().type_name();
                value = self.instantiate(type_name, m)?;
            } else if !self.options.strict_validation || explicitly_mapped {
                let parent_prefix = meta
                    .root
                    .as_ref()
                    .and_then(|r| r.namespace.as_ref())
                    .and_then(|ns| ns.prefix.as_deref());
                if let Some(type_name) = discover::resolve_type(key, prop, parent_prefix) {
                    value = self.instantiate(type_name, m)?;
                }
            }
        }

        // Deserialize transform on primitives
        if let Some(transform) = eb.and_then(|e| e.transform.as_ref()) {
            if value.is_primitive() {
                value = convert::apply_converter(value, Some(transform), Direction::Deserialize);
            }
        }

        // Final coercion
        let value = match eb {
            Some(e) if !e.union_types.is_empty() => convert::to_union_type(value, &e.union_types),
            _ => {
                let current = instance.get_property(prop);
                convert::coerce_to_property(value, current.as_ref())
            }
        };
        Ok(value)
    }

    fn map_array_item(
        &self,
        item: &Value,
        item_type: Option<&'static str>,
        property: &str,
    ) -> BindResult<Value> {
        match item {
            Value::Map(m) => {
                let resolved = item_type
                    .or_else(|| {
                        if self.options.strict_validation {
                            None
                        } else {
                            discover::resolve_type(property, property, None)
                        }
                    });
                match resolved {
                    Some(type_name) => self.instantiate(type_name, m),
                    None => Ok(item.clone()),
                }
            }
            other => Ok(other.clone()),
        }
    }

    /// Map a fragment into a fresh shared instance of a registered type
    pub(crate) fn instantiate(&self, type_name: &str, fragment: &Fragment) -> BindResult<Value> {
        let meta = registry::metadata_by_name(type_name).ok_or_else(|| BindError::UnknownType {
            name: type_name.to_string(),
        })?;
        let inst = registry::new_instance(type_name).ok_or_else(|| BindError::UnknownType {
            name: type_name.to_string(),
        })?;
        self.populate(&mut *inst.borrow_mut(), &meta, fragment)?;
        Ok(Value::Instance(inst))
    }

    fn materialize_queryables(
        &self,
        instance: &mut dyn Bindable,
        meta: &TypeMetadata,
        fragment: &Fragment,
    ) -> BindResult<()> {
        for db in &meta.queryables {
            let (name, target): (String, Option<Fragment>) = match &db.target_property {
                None => (
                    meta.element_name(instance.type_name()).to_string(),
                    Some(fragment.clone()),
                ),
                Some(tp) => {
                    let tag = element_tag(meta, tp);
                    let target = fragment
                        .get(&tag)
                        .map(Value::as_slice)
                        .and_then(|items| items.first())
                        .and_then(Value::as_map)
                        .cloned();
                    (tag, target)
                }
            };
            match target {
                Some(target) => {
                    let slot = if db.options.lazy {
                        DynamicSlot::pending(&name, target, db.options.clone())
                    } else {
                        DynamicSlot::built(dynamic::build(&name, &target, &db.options))
                    };
                    instance
                        .set_property(&db.property, Value::Dynamic(Rc::new(RefCell::new(slot))));
                }
                None if db.required => {
                    return Err(BindError::MissingRequired {
                        kind: RequiredKind::Queryable,
                        name,
                    });
                }
                None => {}
            }
        }
        Ok(())
    }

    fn strict_checks(
        &self,
        instance: &dyn Bindable,
        meta: &TypeMetadata,
        unrecognized: &[String],
    ) -> BindResult<()> {
        // (a) unexpected elements, unless dynamic or mixed content may
        // legitimately absorb unknown tags
        if meta.queryables.is_empty() && !meta.has_mixed_field() {
            if !unrecognized.is_empty() {
                return Err(BindError::StrictUnexpectedElement {
                    found: unrecognized.join(", "),
                    expected: meta.known_tags().join(", "),
                });
            }
        }

        // (b) plain objects left where typed values were expected
        for prop in instance.property_names() {
            if meta.is_queryable_property(prop) {
                continue;
            }
            let Some(Value::Map(m)) = instance.get_property(prop) else {
                continue;
            };
            if !m.has_child_elements() {
                continue;
            }
            match meta.element(prop).and_then(|e| e.nested_type) {
                Some(type_name) => {
                    let nested_queryables = registry::metadata_by_name(type_name)
                        .is_some_and(|nm| !nm.queryables.is_empty());
                    if nested_queryables {
                        return Err(BindError::StrictTypeMismatch {
                            property: prop.to_string(),
                            reason: format!(
                                "nested type '{type_name}' declares queryable bindings"
                            ),
                        });
                    }
                }
                None => {
                    return Err(BindError::StrictTypeMismatch {
                        property: prop.to_string(),
                        reason: "no nested type is declared for its structured content"
                            .to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}

/// Reverse map from XML tag name to property name
///
/// Covers element bindings (raw and qualified names), array bindings
/// (container name when customized, item name otherwise), declared
/// aliases, and the instance's own properties. Every tag also gets a
/// prefixed alias when the type declares a prefixed root namespace, so
/// both prefixed and unprefixed incoming forms resolve.
fn build_reverse_map(instance: &dyn Bindable, meta: &TypeMetadata) -> HashMap<String, String> {
    let mut map: HashMap<String, String> = HashMap::new();
    let root_prefix = meta
        .root
        .as_ref()
        .and_then(|r| r.namespace.as_ref())
        .and_then(|ns| ns.prefix.clone());

    let mut add = |map: &mut HashMap<String, String>, tag: String, prop: &str| {
        if let Some(prefix) = &root_prefix {
            map.entry(format!("{prefix}:{tag}"))
                .or_insert_with(|| prop.to_string());
        }
        map.entry(tag).or_insert_with(|| prop.to_string());
    };

    for (prop, eb) in &meta.field_elements {
        if meta.ignored.contains(prop) {
            continue;
        }
        add(&mut map, eb.name.clone(), prop);
        add(
            &mut map,
            names::qualified_element_name(&eb.name, eb.primary_ns()),
            prop,
        );
    }
    for (prop, bindings) in &meta.arrays {
        if meta.ignored.contains(prop) {
            continue;
        }
        for ab in bindings {
            let tag = ab
                .container_name
                .clone()
                .unwrap_or_else(|| ab.item_name.clone());
            add(
                &mut map,
                names::qualified_element_name(&tag, ab.namespace.as_ref()),
                prop,
            );
            add(&mut map, tag, prop);
        }
    }
    for (prop, xml_name) in &meta.aliases {
        if meta.ignored.contains(prop) {
            continue;
        }
        add(&mut map, xml_name.clone(), prop);
    }
    for prop in instance.property_names() {
        if meta.ignored.contains(prop) {
            continue;
        }
        add(&mut map, prop.to_string(), prop);
    }
    map
}

fn apply_defaults(instance: &mut dyn Bindable, meta: &TypeMetadata, found: &HashSet<String>) {
    for (prop, eb) in &meta.field_elements {
        if found.contains(prop) || meta.ignored.contains(prop) {
            continue;
        }
        if let Some(default) = &eb.default_value {
            instance.set_property(prop, default.to_value());
        }
    }
}

fn check_required_elements(
    meta: &TypeMetadata,
    fragment: &Fragment,
    found: &HashSet<String>,
) -> BindResult<()> {
    for (prop, eb) in &meta.field_elements {
        if meta.ignored.contains(prop) || found.contains(prop) {
            continue;
        }
        if eb.required && eb.default_value.is_none() {
            let qualified = names::qualified_element_name(&eb.name, eb.primary_ns());
            if !fragment.contains_key(&qualified) {
                return Err(BindError::MissingRequired {
                    kind: RequiredKind::Element,
                    name: qualified,
                });
            }
        }
    }
    Ok(())
}
