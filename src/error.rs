//! Mapping Errors
//!
//! All errors abort the current mapping call; a failed mapping never
//! returns a half-populated instance or fragment.

use thiserror::Error;

/// What kind of required piece was missing
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequiredKind {
    Attribute,
    Text,
    Comment,
    Element,
    Queryable,
}

impl std::fmt::Display for RequiredKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            RequiredKind::Attribute => "attribute",
            RequiredKind::Text => "text content",
            RequiredKind::Comment => "comment",
            RequiredKind::Element => "element",
            RequiredKind::Queryable => "queryable target",
        };
        f.write_str(s)
    }
}

/// Errors raised by the mapping engine
#[derive(Debug, Clone, Error)]
pub enum BindError {
    /// Required attribute, text, comment, element, or queryable target
    /// absent with no default
    #[error("required {kind} '{name}' is missing")]
    MissingRequired { kind: RequiredKind, name: String },

    /// Attribute value failed pattern or enum validation
    #[error("invalid value '{value}' for attribute '{name}'")]
    InvalidValue { name: String, value: String },

    /// Fragment contains a tag not covered by any binding under strict
    /// validation
    #[error("unexpected element '{found}', expected one of: {expected}")]
    StrictUnexpectedElement { found: String, expected: String },

    /// A property holds a plain untyped object where a nested type was
    /// expected
    #[error("property '{property}' holds a plain object but {reason}")]
    StrictTypeMismatch { property: String, reason: String },

    /// A declared nested type name was never registered
    #[error("type '{name}' is not registered")]
    UnknownType { name: String },
}

/// Result alias used throughout the crate
pub type BindResult<T> = Result<T, BindError>;
