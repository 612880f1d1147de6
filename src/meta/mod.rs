//! Type Metadata
//!
//! Declarative per-type binding tables:
//! - Attribute/element/array/text/comment bindings with namespaces,
//!   validation rules and converter hooks
//! - Root element naming, ignored properties, property aliases
//! - Dynamic/queryable descriptors
//!
//! Built once per type through [`MetadataBuilder`] and cached for the
//! process lifetime by the [`registry`].

pub mod bindings;
pub mod builder;
pub mod registry;

pub use bindings::{
    ArrayBinding, AttributeBinding, CommentBinding, Converter, ConvertFn, DynamicBinding,
    ElementBinding, Namespace, RootBinding, TextBinding, TypeMetadata,
};
pub use builder::MetadataBuilder;
