//! xmlbind - Bidirectional XML data binding over fragment trees
//!
//! Layers:
//! A: Fragment model (`Fragment`, `Value`) exchanged with the external
//!    parser/serializer
//! B: Declarative per-type metadata (`TypeMetadata`, registry)
//! C: Namespace resolution and type coercion/validation
//! D: Auto-discovery of nested types and lazy dynamic sub-trees
//! E: The mapping engine (`Mapper`): `map_to_object` / `map_from_object`

pub mod convert;
pub mod discover;
pub mod dynamic;
pub mod engine;
pub mod error;
pub mod fragment;
pub mod meta;
pub mod names;
pub mod object;

pub use engine::{circular_placeholder, Mapper, MapperOptions};
pub use error::{BindError, BindResult, RequiredKind};
pub use fragment::{keys, Fragment, Scalar, Value};
pub use meta::{
    ArrayBinding, AttributeBinding, CommentBinding, Converter, DynamicBinding, ElementBinding,
    MetadataBuilder, Namespace, RootBinding, TextBinding, TypeMetadata,
};
pub use object::{share, Bindable, SharedInstance, XmlMapped};
