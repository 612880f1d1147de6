//! Dynamic Tree Construction
//!
//! Pure function of a raw fragment plus options. Numeric coercion is
//! deliberately narrower than a plain parse: values with a
//! non-significant leading zero (`"00123"`) stay textual so codes and
//! identifiers survive, while `"0"` and `"0.5"` remain numeric.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use once_cell::sync::Lazy;
use regex::Regex;

use super::node::DynamicNode;
use crate::fragment::{keys, Fragment, Value};

static NUMERIC: Lazy<Regex> = Lazy::new(|| Regex::new(r"^-?\d+(\.\d+)?$").unwrap());
static LEADING_ZERO: Lazy<Regex> = Lazy::new(|| Regex::new(r"^0\d").unwrap());

/// Options controlling dynamic sub-tree construction
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicOptions {
    /// Trim text content (default true)
    pub trim_text: bool,
    /// Stop recursing below this depth, if set
    pub max_depth: Option<usize>,
    /// Build on first read instead of at deserialize time (default true)
    pub lazy: bool,
    /// Memoize the built tree on first read
    pub cache: bool,
}

impl Default for DynamicOptions {
    fn default() -> Self {
        DynamicOptions {
            trim_text: true,
            max_depth: None,
            lazy: true,
            cache: false,
        }
    }
}

/// Build a dynamic node tree from a raw fragment
pub fn build(name: &str, fragment: &Fragment, options: &DynamicOptions) -> Rc<DynamicNode> {
    build_node(name, fragment, options, 0, name, 0, 0)
}

#[allow(clippy::too_many_arguments)]
fn build_node(
    name: &str,
    fragment: &Fragment,
    options: &DynamicOptions,
    depth: usize,
    path: &str,
    kind_index: usize,
    index: usize,
) -> Rc<DynamicNode> {
    let mut attributes = Vec::new();
    let mut namespaces = Vec::new();
    let mut child_specs: Vec<(String, Fragment)> = Vec::new();

    for (key, value) in fragment.iter() {
        if let Some(attr_name) = key.strip_prefix(keys::ATTR_PREFIX) {
            let text = value.stringify();
            if attr_name == keys::XMLNS {
                namespaces.push(("default".to_string(), text.clone()));
            } else if let Some(prefix) = attr_name.strip_prefix(keys::XMLNS_PREFIX) {
                namespaces.push((prefix.to_string(), text.clone()));
            }
            attributes.push((attr_name.to_string(), text));
        } else if !keys::is_reserved(key) {
            for item in value.as_slice() {
                match item {
                    Value::Map(child) => child_specs.push((key.to_string(), child.clone())),
                    // Scalar child elements become text-only nodes
                    scalar => {
                        let mut leaf = Fragment::new();
                        leaf.insert(keys::TEXT, scalar.clone());
                        child_specs.push((key.to_string(), leaf));
                    }
                }
            }
        }
    }

    let raw_text = fragment
        .get(keys::TEXT)
        .or_else(|| fragment.get(keys::CDATA))
        .map(Value::stringify);
    let text = raw_text.as_ref().map(|t| {
        if options.trim_text {
            t.trim().to_string()
        } else {
            t.clone()
        }
    });

    let numeric_value = text.as_deref().and_then(coerce_numeric);
    let boolean_value = text.as_deref().and_then(coerce_boolean);

    let depth_reached = options.max_depth.is_some_and(|max| depth >= max);
    let children = if depth_reached {
        Vec::new()
    } else {
        let mut seen: Vec<(String, usize)> = Vec::new();
        child_specs
            .iter()
            .enumerate()
            .map(|(i, (child_name, child_frag))| {
                let kind = match seen.iter_mut().find(|(n, _)| n == child_name) {
                    Some((_, count)) => {
                        *count += 1;
                        *count - 1
                    }
                    None => {
                        seen.push((child_name.clone(), 1));
                        0
                    }
                };
                let child_path = format!("{path}/{child_name}");
                build_node(child_name, child_frag, options, depth + 1, &child_path, kind, i)
            })
            .collect()
    };

    let node = Rc::new(DynamicNode {
        name: name.to_string(),
        attributes,
        namespaces,
        children,
        text,
        raw_text,
        numeric_value,
        boolean_value,
        depth,
        path: path.to_string(),
        kind_index,
        index,
        parent: RefCell::new(Weak::new()),
        siblings: RefCell::new(Vec::new()),
    });

    wire_links(&node);
    node
}

/// Set parent and sibling back-links on every direct child
fn wire_links(node: &Rc<DynamicNode>) {
    for (i, child) in node.children.iter().enumerate() {
        *child.parent.borrow_mut() = Rc::downgrade(node);
        let siblings: Vec<Weak<DynamicNode>> = node
            .children
            .iter()
            .enumerate()
            .filter(|(j, _)| *j != i)
            .map(|(_, s)| Rc::downgrade(s))
            .collect();
        *child.siblings.borrow_mut() = siblings;
    }
}

fn coerce_numeric(text: &str) -> Option<f64> {
    if NUMERIC.is_match(text) && !LEADING_ZERO.is_match(text) {
        text.parse().ok()
    } else {
        None
    }
}

fn coerce_boolean(text: &str) -> Option<bool> {
    if text.eq_ignore_ascii_case("true") {
        Some(true)
    } else if text.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
