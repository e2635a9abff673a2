//! Virtual tree model for the strix rendering engine.
//!
//! A `VNode` is a cheap description of output produced by one render pass.
//! Trees are rebuilt from scratch on every render; the reconciler in
//! [`patch`] moves the concrete surface handles from the previous tree onto
//! the new one and mutates the output surface in place where identities
//! (kind + key) line up.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

pub mod memory;
pub mod patch;
pub mod surface;

pub use patch::{PatchError, build_tree, patch, patch_root, remove_tree};
pub use surface::{EventHandler, NodeId, Position, Surface};

/// Sibling-scoped identity component. The compiler assigns ascending numeric
/// keys in source order; string keys are reserved for user-provided ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    Num(u32),
    Str(String),
}

/// Called once with the root-level surface handle after the first build.
pub type CreateHook = Rc<dyn Fn(NodeId)>;

/// Attribute values: plain strings, presence booleans, or nothing.
/// `Bool(true)` renders as an empty attribute, `Bool(false)` and `Null`
/// render as absence.
#[derive(Debug, Clone, PartialEq)]
pub enum AttrValue {
    Str(String),
    Bool(bool),
    Null,
}

/// The root of one component render. Owns exactly one child subtree, carries
/// an opaque payload for the orchestration layer, and records where on the
/// surface it was attached so later patches can rebuild in place.
///
/// Roots are shared (`Rc<RefCell<..>>`) because the render body that fills
/// `child` runs as a deferred task after the node has already joined its
/// parent tree.
pub struct VRoot {
    pub key: Option<Key>,
    pub data: Rc<dyn Any>,
    pub child: Option<Box<VNode>>,
    pub create_hook: Option<CreateHook>,
    /// Pool of pre-built surface subtrees, cloned by `Static` descendants.
    pub statics: Vec<NodeId>,
    pub anchor: Option<NodeId>,
    pub position: Option<Position>,
}

impl VRoot {
    pub fn new(data: Rc<dyn Any>) -> Self {
        Self {
            key: None,
            data,
            child: None,
            create_hook: None,
            statics: Vec::new(),
            anchor: None,
            position: None,
        }
    }

    pub fn shared(data: Rc<dyn Any>) -> Rc<RefCell<Self>> {
        Rc::new(RefCell::new(Self::new(data)))
    }
}

pub struct VDom {
    pub key: Option<Key>,
    pub tag: String,
    pub children: Vec<VNode>,
    pub attrs: Vec<(String, AttrValue)>,
    pub class: Vec<(String, bool)>,
    pub on: Vec<(String, EventHandler)>,
    pub el: Option<NodeId>,
}

impl VDom {
    pub fn new(tag: impl Into<String>) -> Self {
        Self {
            key: None,
            tag: tag.into(),
            children: Vec::new(),
            attrs: Vec::new(),
            class: Vec::new(),
            on: Vec::new(),
            el: None,
        }
    }
}

pub struct VText {
    pub key: Option<Key>,
    /// `None` renders as the empty string.
    pub text: Option<String>,
    pub el: Option<NodeId>,
}

pub struct VComment {
    pub key: Option<Key>,
    pub text: String,
    pub el: Option<NodeId>,
}

/// Reference into the nearest enclosing root's static pool. Cloned at build
/// time, skipped entirely by the reconciler.
pub struct VStatic {
    pub key: Option<Key>,
    pub id: usize,
    pub el: Option<NodeId>,
}

/// Structural grouping with no surface representation of its own.
pub struct VMulti {
    pub key: Option<Key>,
    pub children: Vec<VNode>,
}

pub enum VNode {
    Root(Rc<RefCell<VRoot>>),
    Multi(VMulti),
    Dom(Box<VDom>),
    Text(VText),
    Comment(VComment),
    Static(VStatic),
}

impl VNode {
    pub fn key(&self) -> Option<&Key> {
        match self {
            VNode::Root(_) => None,
            VNode::Multi(n) => n.key.as_ref(),
            VNode::Dom(n) => n.key.as_ref(),
            VNode::Text(n) => n.key.as_ref(),
            VNode::Comment(n) => n.key.as_ref(),
            VNode::Static(n) => n.key.as_ref(),
        }
    }

    pub fn set_key(&mut self, key: Key) {
        match self {
            VNode::Root(n) => n.borrow_mut().key = Some(key),
            VNode::Multi(n) => n.key = Some(key),
            VNode::Dom(n) => n.key = Some(key),
            VNode::Text(n) => n.key = Some(key),
            VNode::Comment(n) => n.key = Some(key),
            VNode::Static(n) => n.key = Some(key),
        }
    }

    pub fn with_key(mut self, key: Key) -> Self {
        self.set_key(key);
        self
    }

    pub fn kind(&self) -> &'static str {
        match self {
            VNode::Root(_) => "root",
            VNode::Multi(_) => "multi",
            VNode::Dom(_) => "dom",
            VNode::Text(_) => "text",
            VNode::Comment(_) => "comment",
            VNode::Static(_) => "static",
        }
    }

    /// Short description used in mismatch reports.
    pub fn label(&self) -> String {
        let key = match self {
            VNode::Root(n) => n.borrow().key.clone(),
            other => other.key().cloned(),
        };
        match key {
            Some(Key::Num(k)) => format!("{}#{}", self.kind(), k),
            Some(Key::Str(k)) => format!("{}#{}", self.kind(), k),
            None => self.kind().to_string(),
        }
    }

    /// The single surface handle this subtree resolves to, if unambiguous.
    /// Multi nodes only resolve when they hold exactly one child.
    pub fn first_el(&self) -> Option<NodeId> {
        match self {
            VNode::Root(n) => n.borrow().child.as_ref().and_then(|c| c.first_el()),
            VNode::Multi(n) => {
                if n.children.len() == 1 {
                    n.children[0].first_el()
                } else {
                    None
                }
            }
            VNode::Dom(n) => n.el,
            VNode::Text(n) => n.el,
            VNode::Comment(n) => n.el,
            VNode::Static(n) => n.el,
        }
    }
}

/// Two nodes are the same render unit iff their kind and key match exactly.
pub fn same(a: &VNode, b: &VNode) -> bool {
    std::mem::discriminant(a) == std::mem::discriminant(b)
        && match (a, b) {
            (VNode::Root(x), VNode::Root(y)) => x.borrow().key == y.borrow().key,
            _ => a.key() == b.key(),
        }
}

impl fmt::Debug for VNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            VNode::Dom(n) => write!(f, "Dom<{}>({})", n.tag, self.label()),
            VNode::Text(n) => write!(f, "Text({:?})", n.text),
            VNode::Comment(n) => write!(f, "Comment({:?})", n.text),
            VNode::Static(n) => write!(f, "Static({})", n.id),
            VNode::Multi(n) => write!(f, "Multi[{}]", n.children.len()),
            VNode::Root(_) => write!(f, "Root"),
        }
    }
}

// Concise constructors, mirroring the usual h()/text() vocabulary.

pub fn dom(tag: impl Into<String>, children: Vec<VNode>) -> VNode {
    let mut node = VDom::new(tag);
    node.children = children;
    VNode::Dom(Box::new(node))
}

pub fn text(t: impl Into<String>) -> VNode {
    VNode::Text(VText {
        key: None,
        text: Some(t.into()),
        el: None,
    })
}

pub fn empty_text() -> VNode {
    VNode::Text(VText {
        key: None,
        text: None,
        el: None,
    })
}

pub fn comment(t: impl Into<String>) -> VNode {
    VNode::Comment(VComment {
        key: None,
        text: t.into(),
        el: None,
    })
}

pub fn multi(children: Vec<VNode>) -> VNode {
    VNode::Multi(VMulti {
        key: None,
        children,
    })
}

pub fn static_node(id: usize) -> VNode {
    VNode::Static(VStatic {
        key: None,
        id,
        el: None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identity_is_kind_plus_key() {
        let a = dom("div", vec![]).with_key(Key::Num(1));
        let b = dom("span", vec![]).with_key(Key::Num(1));
        let c = dom("div", vec![]).with_key(Key::Num(2));
        // tag is not part of identity, key is
        assert!(same(&a, &b));
        assert!(!same(&a, &c));
        assert!(!same(&a, &text("x")));
    }

    #[test]
    fn unkeyed_text_nodes_are_same() {
        assert!(same(&text("a"), &text("b")));
    }

    #[test]
    fn first_el_through_single_child_multi() {
        let mut inner = VDom::new("div");
        inner.el = Some(NodeId(7));
        let tree = multi(vec![VNode::Dom(Box::new(inner))]);
        assert_eq!(tree.first_el(), Some(NodeId(7)));

        let ambiguous = multi(vec![text("a"), text("b")]);
        assert_eq!(ambiguous.first_el(), None);
    }
}
