//! Dynamic Node
//!
//! One node of the navigable sub-tree view. Immutable after
//! construction except for the parent/sibling back-links, which are
//! wired immediately after the children are built.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

/// A navigable view of one element in a raw fragment
#[derive(Debug)]
pub struct DynamicNode {
    /// Element name as it appeared in the fragment
    pub name: String,
    /// Attributes in fragment order (namespace declarations included)
    pub attributes: Vec<(String, String)>,
    /// Namespace declarations: prefix (or `"default"`) to URI
    pub namespaces: Vec<(String, String)>,
    /// Ordered children, owned by this node
    pub children: Vec<Rc<DynamicNode>>,
    /// Text content, trimmed unless trimming was disabled
    pub text: Option<String>,
    /// Text content exactly as found
    pub raw_text: Option<String>,
    /// Numeric view of the text, when it qualifies
    pub numeric_value: Option<f64>,
    /// Boolean view of the text, when it qualifies
    pub boolean_value: Option<bool>,
    /// Depth below the build root (root is 0)
    pub depth: usize,
    /// Slash-delimited path from the build root, including this name
    pub path: String,
    /// Index among same-named siblings
    pub kind_index: usize,
    /// Index among all siblings
    pub index: usize,
    /// Back-link to the parent node
    pub(crate) parent: RefCell<Weak<DynamicNode>>,
    /// Back-links to every sibling, excluding this node
    pub(crate) siblings: RefCell<Vec<Weak<DynamicNode>>>,
}

impl DynamicNode {
    /// The parent node, if this is not the build root
    pub fn parent(&self) -> Option<Rc<DynamicNode>> {
        self.parent.borrow().upgrade()
    }

    /// All siblings, excluding this node
    pub fn siblings(&self) -> Vec<Rc<DynamicNode>> {
        self.siblings
            .borrow()
            .iter()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Look up an attribute value by name
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// First child with the given name
    pub fn find_child(&self, name: &str) -> Option<&Rc<DynamicNode>> {
        self.children.iter().find(|c| c.name == name)
    }

    /// Text content, or the empty string
    pub fn text_or_empty(&self) -> &str {
        self.text.as_deref().unwrap_or("")
    }
}
