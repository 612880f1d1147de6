//! Bound Object Model
//!
//! Replaces runtime reflection with an explicit, object-safe property
//! access trait. Mapped types expose get/set by property name over the
//! shared `Value` shape; their binding tables are declared statically
//! through [`XmlMapped::metadata`] and cached by the registry.

use std::any::Any;
use std::cell::RefCell;
use std::rc::Rc;

use crate::fragment::Value;
use crate::meta::TypeMetadata;

/// Object-safe access to a mapped instance
///
/// Implementations are plain structs whose fields are surfaced by name.
/// `set_property` ignores unknown names; callers gate on
/// `property_names` or a binding table.
pub trait Bindable: Any {
    /// The registered type name
    fn type_name(&self) -> &'static str;

    /// Declared property names, in declaration order
    fn property_names(&self) -> Vec<&'static str>;

    /// Read a property by name (cloned view)
    fn get_property(&self, name: &str) -> Option<Value>;

    /// Write a property by name
    fn set_property(&mut self, name: &str, value: Value);

    /// Upcast for downcasting to the concrete type
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// A mapped type: bindable, constructible, statically described
pub trait XmlMapped: Bindable + Default + 'static {
    /// Name this type is registered under
    const TYPE_NAME: &'static str;

    /// Build the declarative binding table (called once; the registry
    /// caches the result for the process lifetime)
    fn metadata() -> TypeMetadata;
}

/// A nested instance shared across the object graph
pub type SharedInstance = Rc<RefCell<dyn Bindable>>;

/// Wrap a fresh instance for graph sharing
pub fn share<T: Bindable>(instance: T) -> SharedInstance {
    Rc::new(RefCell::new(instance))
}

/// Identity key for cycle detection: the address of the underlying
/// allocation, stable for the lifetime of the borrow
pub fn instance_key(instance: &dyn Bindable) -> usize {
    instance as *const dyn Bindable as *const () as usize
}
