//! Lazy Dynamic Slot
//!
//! Explicit state for a dynamic/queryable property: unbuilt (pending
//! fragment + options), built (materialized tree), or overridden by a
//! manual assignment. A manual assignment discards any pending builder.

use std::cell::RefCell;
use std::rc::Rc;

use super::builder::{build, DynamicOptions};
use super::node::DynamicNode;
use crate::fragment::{Fragment, Value};

/// Materialization state of a dynamic property
#[derive(Debug)]
pub enum DynamicSlot {
    /// Not built yet; holds everything needed to build on first read
    Unbuilt {
        name: String,
        fragment: Fragment,
        options: DynamicOptions,
    },
    /// Built and memoized
    Built(Rc<DynamicNode>),
    /// Manually assigned; the builder is gone
    Overridden(Value),
}

impl DynamicSlot {
    /// Create a pending slot
    pub fn pending(name: impl Into<String>, fragment: Fragment, options: DynamicOptions) -> Self {
        DynamicSlot::Unbuilt {
            name: name.into(),
            fragment,
            options,
        }
    }

    /// Create an already-built slot (eager mode)
    pub fn built(node: Rc<DynamicNode>) -> Self {
        DynamicSlot::Built(node)
    }

    /// Materialize the node, building on demand
    ///
    /// With caching enabled the first build is memoized; without it the
    /// tree is rebuilt on every read and the slot stays unbuilt.
    /// Returns None for overridden slots.
    pub fn node(slot: &Rc<RefCell<DynamicSlot>>) -> Option<Rc<DynamicNode>> {
        let built = {
            let state = slot.borrow();
            match &*state {
                DynamicSlot::Built(node) => return Some(Rc::clone(node)),
                DynamicSlot::Overridden(_) => return None,
                DynamicSlot::Unbuilt {
                    name,
                    fragment,
                    options,
                } => {
                    let node = build(name, fragment, options);
                    if !options.cache {
                        return Some(node);
                    }
                    node
                }
            }
        };
        *slot.borrow_mut() = DynamicSlot::Built(Rc::clone(&built));
        Some(built)
    }

    /// Replace the slot with a manual value, clearing any pending builder
    pub fn set_override(slot: &Rc<RefCell<DynamicSlot>>, value: Value) {
        *slot.borrow_mut() = DynamicSlot::Overridden(value);
    }

    /// The override value, if one was assigned
    pub fn override_value(slot: &Rc<RefCell<DynamicSlot>>) -> Option<Value> {
        match &*slot.borrow() {
            DynamicSlot::Overridden(value) => Some(value.clone()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fragment::keys;

    fn sample() -> Fragment {
        let mut frag = Fragment::new();
        frag.insert(keys::TEXT, "payload");
        frag
    }

    #[test]
    fn test_cached_build_is_memoized() {
        let options = DynamicOptions {
            cache: true,
            ..Default::default()
        };
        let slot = Rc::new(RefCell::new(DynamicSlot::pending("q", sample(), options)));

        let first = DynamicSlot::node(&slot).unwrap();
        let second = DynamicSlot::node(&slot).unwrap();
        assert!(Rc::ptr_eq(&first, &second));
        assert!(matches!(&*slot.borrow(), DynamicSlot::Built(_)));
    }

    #[test]
    fn test_uncached_build_repeats() {
        let slot = Rc::new(RefCell::new(DynamicSlot::pending(
            "q",
            sample(),
            DynamicOptions::default(),
        )));

        let first = DynamicSlot::node(&slot).unwrap();
        let second = DynamicSlot::node(&slot).unwrap();
        assert!(!Rc::ptr_eq(&first, &second));
        assert!(matches!(&*slot.borrow(), DynamicSlot::Unbuilt { .. }));
    }

    #[test]
    fn test_override_clears_builder() {
        let slot = Rc::new(RefCell::new(DynamicSlot::pending(
            "q",
            sample(),
            DynamicOptions::default(),
        )));
        DynamicSlot::set_override(&slot, Value::Text("manual".into()));

        assert!(DynamicSlot::node(&slot).is_none());
        assert_eq!(
            DynamicSlot::override_value(&slot),
            Some(Value::Text("manual".into()))
        );
    }
}
