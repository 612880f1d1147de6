//! Dynamic Sub-Tree Builder
//!
//! Converts a raw fragment into a navigable node structure for the
//! external query/expression evaluator:
//! - Attributes, namespace declarations, text and coerced scalar views
//! - Ordered children with parent/sibling back-links
//! - Lazy or eager materialization with optional per-instance caching

pub mod builder;
pub mod node;
pub mod slot;

pub use builder::{build, DynamicOptions};
pub use node::DynamicNode;
pub use slot::DynamicSlot;
