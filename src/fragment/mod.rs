//! Raw Tree Fragment Model
//!
//! The untyped node shape exchanged with the external XML
//! parser/serializer:
//! - Attribute keys prefixed `@_`
//! - Text key `#text`, CDATA key `__cdata`
//! - Mixed-content key `#mixed` holding an ordered array
//! - Comment keys `?_<tagName>` adjacent to the element they precede
//! - All other keys are child element names (single fragment or array)

pub mod tree;
pub mod value;

pub use tree::{Fragment, FragmentEntry};
pub use value::{Scalar, Value};

/// Well-known fragment keys
pub mod keys {
    /// Prefix marking attribute keys
    pub const ATTR_PREFIX: &str = "@_";
    /// Plain text content
    pub const TEXT: &str = "#text";
    /// CDATA content
    pub const CDATA: &str = "__cdata";
    /// Ordered mixed-content array
    pub const MIXED: &str = "#mixed";
    /// Prefix marking comment keys
    pub const COMMENT_PREFIX: &str = "?_";
    /// Default namespace declaration attribute
    pub const XMLNS: &str = "xmlns";
    /// Prefixed namespace declaration attributes start with this
    pub const XMLNS_PREFIX: &str = "xmlns:";

    /// Build the fragment key for an attribute name
    pub fn attr(name: &str) -> String {
        format!("{ATTR_PREFIX}{name}")
    }

    /// Build the fragment key for a comment preceding `tag`
    pub fn comment(tag: &str) -> String {
        format!("{COMMENT_PREFIX}{tag}")
    }

    /// Check whether a key names an attribute
    pub fn is_attr(key: &str) -> bool {
        key.starts_with(ATTR_PREFIX)
    }

    /// Check whether a key names a comment
    pub fn is_comment(key: &str) -> bool {
        key.starts_with(COMMENT_PREFIX)
    }

    /// Check whether a key is reserved (not a child element name)
    pub fn is_reserved(key: &str) -> bool {
        is_attr(key) || is_comment(key) || key == TEXT || key == CDATA || key == MIXED
    }
}
