//! Metadata Builder
//!
//! Fluent construction of a type's binding table. The per-family
//! uniqueness invariant is the caller's contract; the builder keeps
//! last-wins semantics within a family.

use super::bindings::{
    ArrayBinding, AttributeBinding, CommentBinding, DynamicBinding, ElementBinding, Namespace,
    RootBinding, TextBinding, TypeMetadata,
};

/// Builds a [`TypeMetadata`] table
#[derive(Debug, Default)]
pub struct MetadataBuilder {
    meta: TypeMetadata,
}

impl MetadataBuilder {
    pub fn new() -> Self {
        MetadataBuilder::default()
    }

    /// Declare the root element name
    pub fn root(mut self, name: impl Into<String>) -> Self {
        self.meta.root = Some(RootBinding {
            name: name.into(),
            namespace: None,
        });
        self
    }

    /// Declare the root element name with its namespace
    pub fn root_ns(mut self, name: impl Into<String>, namespace: Namespace) -> Self {
        self.meta.root = Some(RootBinding {
            name: name.into(),
            namespace: Some(namespace),
        });
        self
    }

    /// Bind a property to an attribute
    pub fn attribute(mut self, property: impl Into<String>, binding: AttributeBinding) -> Self {
        self.meta.attributes.insert(property.into(), binding);
        self
    }

    /// Bind a property to a child element
    pub fn element(mut self, property: impl Into<String>, binding: ElementBinding) -> Self {
        self.meta.field_elements.insert(property.into(), binding);
        self
    }

    /// Bind a property to repeated elements
    ///
    /// The first binding declared for a property drives serialization;
    /// additional bindings only widen the tag names accepted on input.
    pub fn array(mut self, property: impl Into<String>, binding: ArrayBinding) -> Self {
        self.meta
            .arrays
            .entry(property.into())
            .or_default()
            .push(binding);
        self
    }

    /// Bind a property to the element's text content
    pub fn text(mut self, property: impl Into<String>, binding: TextBinding) -> Self {
        self.meta.text_field = Some((property.into(), binding));
        self
    }

    /// Bind a property to the comment preceding `target_property`'s
    /// element
    pub fn comment(
        mut self,
        property: impl Into<String>,
        target_property: impl Into<String>,
        required: bool,
    ) -> Self {
        self.meta.comment_fields.push(CommentBinding {
            property: property.into(),
            target_property: target_property.into(),
            required,
        });
        self
    }

    /// Exclude a property from mapping entirely
    pub fn ignore(mut self, property: impl Into<String>) -> Self {
        self.meta.ignored.insert(property.into());
        self
    }

    /// Map a property to a different XML tag name
    pub fn alias(mut self, property: impl Into<String>, xml_name: impl Into<String>) -> Self {
        self.meta.aliases.insert(property.into(), xml_name.into());
        self
    }

    /// Declare a dynamic/queryable property
    pub fn queryable(mut self, binding: DynamicBinding) -> Self {
        self.meta.queryables.push(binding);
        self
    }

    /// Finish the table
    pub fn build(self) -> TypeMetadata {
        self.meta
    }
}
