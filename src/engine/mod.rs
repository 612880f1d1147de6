//! Mapping Engine
//!
//! Bidirectional mapping between untyped fragments and registered
//! types:
//! - [`Mapper::map_to_object`] / [`Mapper::map_fragment`]: deserialize
//!   an element body into a typed instance
//! - [`Mapper::map_from_object`]: serialize an instance under a root
//!   tag, with namespace declarations written at the root
//!
//! Behavior toggles live in [`MapperOptions`]; a `Mapper` is immutable
//! once built, so one mapper can serve concurrent callers.

mod from_object;
mod mixed;
mod to_object;

use std::sync::Arc;

use crate::error::{BindError, BindResult};
use crate::fragment::{Fragment, Value};
use crate::meta::{registry, ElementBinding, TypeMetadata};
use crate::names;
use crate::object::{Bindable, SharedInstance, XmlMapped};

pub use from_object::circular_placeholder;

/// Engine behavior toggles
#[derive(Debug, Clone, Copy, Default)]
pub struct MapperOptions {
    /// Fail on unexpected elements and untyped structured values
    pub strict_validation: bool,
    /// Skip null-valued attributes and elements entirely
    pub omit_null_values: bool,
    /// Mark nested elements with `xsi:type` when the runtime type
    /// differs from the declared one
    pub use_xsi_type: bool,
}

/// The mapping engine
#[derive(Debug, Default)]
pub struct Mapper {
    pub(crate) options: MapperOptions,
}

/// Per-call serialization path, for cycle detection only
///
/// Never engine state: each top-level serialize call owns its own path,
/// so concurrent calls cannot poison each other.
pub(crate) struct SerializeCtx {
    path: Vec<usize>,
}

impl SerializeCtx {
    pub(crate) fn new() -> Self {
        SerializeCtx { path: Vec::new() }
    }

    pub(crate) fn contains(&self, key: usize) -> bool {
        self.path.contains(&key)
    }

    pub(crate) fn push(&mut self, key: usize) {
        self.path.push(key);
    }

    pub(crate) fn pop(&mut self) {
        self.path.pop();
    }
}

impl Mapper {
    /// Build a mapper with explicit options
    pub fn new(options: MapperOptions) -> Self {
        Mapper { options }
    }

    /// Build a mapper with default options (lenient, nulls kept)
    pub fn with_defaults() -> Self {
        Mapper::default()
    }

    /// Deserialize an element-body fragment into a typed instance
    pub fn map_to_object<T: XmlMapped>(&self, fragment: &Fragment) -> BindResult<T> {
        let meta = registry::metadata_of::<T>();
        let mut instance = T::default();
        self.populate(&mut instance, &meta, fragment)?;
        Ok(instance)
    }

    /// Deserialize into a registered type named at runtime
    pub fn map_fragment(&self, fragment: &Fragment, type_name: &str) -> BindResult<SharedInstance> {
        match self.instantiate(type_name, fragment)? {
            Value::Instance(instance) => Ok(instance),
            _ => Err(BindError::UnknownType {
                name: type_name.to_string(),
            }),
        }
    }

    /// Serialize an instance into a fragment wrapped under `root_name`
    ///
    /// `element_ctx` is the enclosing element binding when this call
    /// serializes a sub-tree of a larger document; pass `None` at the
    /// top level.
    pub fn map_from_object(
        &self,
        instance: &dyn Bindable,
        root_name: &str,
        element_ctx: Option<&ElementBinding>,
    ) -> BindResult<Fragment> {
        let meta = registry::metadata_by_name(instance.type_name())
            .unwrap_or_else(|| Arc::new(TypeMetadata::default()));

        let mut ctx = SerializeCtx::new();
        let body = self.serialize_instance(instance, &meta, element_ctx, &mut ctx)?;

        let mut out = Fragment::new();
        out.insert(root_name, Value::Map(body));
        let namespaces = names::collect_namespaces(&meta);
        names::add_namespace_declarations(&mut out, root_name, &namespaces);
        Ok(out)
    }
}
