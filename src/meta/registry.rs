//! Type Registry
//!
//! Process-wide store of registered mapped types:
//! - Metadata memoized by type identity, built once under the write
//!   lock so concurrent first-uses cannot race on construction
//! - Factories for blank instances (auto-discovery, nested mapping)
//! - Name indexes: declared element name and type name

use std::any::TypeId;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use once_cell::sync::Lazy;

use super::bindings::TypeMetadata;
use crate::object::{SharedInstance, XmlMapped};

struct TypeEntry {
    type_name: &'static str,
    factory: fn() -> SharedInstance,
    metadata: Arc<TypeMetadata>,
}

#[derive(Default)]
struct RegistryInner {
    by_type: HashMap<&'static str, TypeEntry>,
    by_element: HashMap<String, &'static str>,
    by_id: HashMap<TypeId, &'static str>,
}

static REGISTRY: Lazy<RwLock<RegistryInner>> = Lazy::new(|| RwLock::new(RegistryInner::default()));

fn make_shared<T: XmlMapped>() -> SharedInstance {
    std::rc::Rc::new(std::cell::RefCell::new(T::default()))
}

/// Register a mapped type, building its metadata on first registration
///
/// Idempotent; later registrations of the same type are no-ops. Name
/// collisions follow last-registration-wins.
pub fn register<T: XmlMapped>() {
    let id = TypeId::of::<T>();
    {
        let inner = REGISTRY.read().expect("registry poisoned");
        if inner.by_id.contains_key(&id) {
            return;
        }
    }

    // Build outside the write lock; insertion re-checks under it
    let metadata = Arc::new(T::metadata());

    let mut inner = REGISTRY.write().expect("registry poisoned");
    if inner.by_id.contains_key(&id) {
        return;
    }

    if let Some(root) = &metadata.root {
        inner.by_element.insert(root.name.clone(), T::TYPE_NAME);
        if let Some(ns) = &root.namespace {
            if let Some(prefix) = &ns.prefix {
                inner
                    .by_element
                    .insert(format!("{prefix}:{}", root.name), T::TYPE_NAME);
            }
        }
    }
    inner.by_id.insert(id, T::TYPE_NAME);
    inner.by_type.insert(
        T::TYPE_NAME,
        TypeEntry {
            type_name: T::TYPE_NAME,
            factory: make_shared::<T>,
            metadata,
        },
    );
}

/// Metadata for a type, registering it on first use
pub fn metadata_of<T: XmlMapped>() -> Arc<TypeMetadata> {
    register::<T>();
    let inner = REGISTRY.read().expect("registry poisoned");
    let name = inner.by_id[&TypeId::of::<T>()];
    Arc::clone(&inner.by_type[name].metadata)
}

/// Metadata by registered type name
pub fn metadata_by_name(type_name: &str) -> Option<Arc<TypeMetadata>> {
    let inner = REGISTRY.read().expect("registry poisoned");
    inner
        .by_type
        .get(type_name)
        .map(|e| Arc::clone(&e.metadata))
}

/// A blank shared instance of a registered type
pub fn new_instance(type_name: &str) -> Option<SharedInstance> {
    let factory = {
        let inner = REGISTRY.read().expect("registry poisoned");
        inner.by_type.get(type_name).map(|e| e.factory)
    };
    factory.map(|f| f())
}

/// Type registered under a declared element name
pub fn type_for_element(tag: &str) -> Option<&'static str> {
    let inner = REGISTRY.read().expect("registry poisoned");
    inner.by_element.get(tag).copied()
}

/// Type registered under its own type name
pub fn type_by_name(name: &str) -> Option<&'static str> {
    let inner = REGISTRY.read().expect("registry poisoned");
    inner.by_type.get(name).map(|e| e.type_name)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::Value;
    use crate::meta::bindings::ElementBinding;
    use crate::meta::Namespace;
    use std::any::Any;

    #[derive(Default)]
    struct RegProbe {
        label: String,
    }

    impl crate::object::Bindable for RegProbe {
        fn type_name(&self) -> &'static str {
            "RegProbe"
        }

        fn property_names(&self) -> Vec<&'static str> {
            vec!["label"]
        }

        fn get_property(&self, name: &str) -> Option<Value> {
            (name == "label").then(|| Value::Text(self.label.clone()))
        }

        fn set_property(&mut self, name: &str, value: Value) {
            if name == "label" {
                self.label = value.stringify();
            }
        }

        fn as_any(&self) -> &dyn Any {
            self
        }

        fn as_any_mut(&mut self) -> &mut dyn Any {
            self
        }
    }

    impl XmlMapped for RegProbe {
        const TYPE_NAME: &'static str = "RegProbe";

        fn metadata() -> TypeMetadata {
            TypeMetadata::builder()
                .root_ns("RegRoot", Namespace::prefixed("rp", "http://example.com/rp"))
                .element("label", ElementBinding::new("Label"))
                .build()
        }
    }

    #[test]
    fn test_metadata_memoized_by_identity() {
        let first = metadata_of::<RegProbe>();
        let second = metadata_of::<RegProbe>();
        assert!(Arc::ptr_eq(&first, &second));
    }

    #[test]
    fn test_name_indexes() {
        register::<RegProbe>();
        assert_eq!(type_for_element("RegRoot"), Some("RegProbe"));
        assert_eq!(type_for_element("rp:RegRoot"), Some("RegProbe"));
        assert_eq!(type_by_name("RegProbe"), Some("RegProbe"));
        assert_eq!(type_by_name("NoSuchType"), None);
    }

    #[test]
    fn test_factory_builds_blank_instance() {
        register::<RegProbe>();
        let inst = new_instance("RegProbe").unwrap();
        assert_eq!(inst.borrow().type_name(), "RegProbe");
        assert_eq!(
            inst.borrow().get_property("label"),
            Some(Value::Text(String::new()))
        );
    }
}
