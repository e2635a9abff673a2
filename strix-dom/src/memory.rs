//! An in-memory [`Surface`] implementation. Backs the integration tests and
//! the demo CLI; serializes subtrees to HTML for assertions and can dispatch
//! events to registered listeners.

use std::collections::{BTreeMap, BTreeSet};

use crate::surface::{EventHandler, NodeId, Surface};

enum MemKind {
    Element {
        tag: String,
        attrs: BTreeMap<String, String>,
        classes: BTreeSet<String>,
        children: Vec<NodeId>,
    },
    Text(String),
    Comment(String),
}

struct MemNode {
    kind: MemKind,
    parent: Option<NodeId>,
    listeners: Vec<(String, EventHandler)>,
}

#[derive(Default)]
pub struct MemorySurface {
    nodes: Vec<MemNode>,
}

impl MemorySurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached container element to mount into, the equivalent of a
    /// test fixture `<div>`.
    pub fn create_root(&mut self) -> NodeId {
        self.create_element("div")
    }

    fn alloc(&mut self, kind: MemKind) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(MemNode {
            kind,
            parent: None,
            listeners: Vec::new(),
        });
        id
    }

    fn node(&self, id: NodeId) -> &MemNode {
        &self.nodes[id.0 as usize]
    }

    fn node_mut(&mut self, id: NodeId) -> &mut MemNode {
        &mut self.nodes[id.0 as usize]
    }

    fn detach(&mut self, child: NodeId) {
        if let Some(parent) = self.node(child).parent
            && let MemKind::Element { children, .. } = &mut self.node_mut(parent).kind
        {
            children.retain(|c| *c != child);
        }
        self.node_mut(child).parent = None;
    }

    pub fn child(&self, el: NodeId, index: usize) -> Option<NodeId> {
        match &self.node(el).kind {
            MemKind::Element { children, .. } => children.get(index).copied(),
            _ => None,
        }
    }

    pub fn child_count(&self, el: NodeId) -> usize {
        match &self.node(el).kind {
            MemKind::Element { children, .. } => children.len(),
            _ => 0,
        }
    }

    pub fn text_content(&self, el: NodeId) -> Option<String> {
        match &self.node(el).kind {
            MemKind::Text(t) => Some(t.clone()),
            _ => None,
        }
    }

    pub fn tag(&self, el: NodeId) -> Option<&str> {
        match &self.node(el).kind {
            MemKind::Element { tag, .. } => Some(tag),
            _ => None,
        }
    }

    /// Run every listener registered on `el` for `event`.
    pub fn dispatch(&self, el: NodeId, event: &str) {
        let handlers: Vec<EventHandler> = self
            .node(el)
            .listeners
            .iter()
            .filter(|(name, _)| name == event)
            .map(|(_, h)| h.clone())
            .collect();
        for handler in handlers {
            handler();
        }
    }

    pub fn inner_html(&self, el: NodeId) -> String {
        match &self.node(el).kind {
            MemKind::Element { children, .. } => {
                children.iter().map(|c| self.outer_html(*c)).collect()
            }
            MemKind::Text(t) => escape_text(t),
            MemKind::Comment(_) => String::new(),
        }
    }

    pub fn outer_html(&self, el: NodeId) -> String {
        match &self.node(el).kind {
            MemKind::Element {
                tag,
                attrs,
                classes,
                children,
            } => {
                let mut out = String::new();
                out.push('<');
                out.push_str(tag);
                for (name, value) in attrs {
                    out.push(' ');
                    out.push_str(name);
                    out.push_str("=\"");
                    out.push_str(&escape_attr(value));
                    out.push('"');
                }
                if !classes.is_empty() && !attrs.contains_key("class") {
                    let list: Vec<&str> = classes.iter().map(String::as_str).collect();
                    out.push_str(" class=\"");
                    out.push_str(&list.join(" "));
                    out.push('"');
                }
                out.push('>');
                for child in children {
                    out.push_str(&self.outer_html(*child));
                }
                out.push_str("</");
                out.push_str(tag);
                out.push('>');
                out
            }
            MemKind::Text(t) => escape_text(t),
            MemKind::Comment(t) => format!("<!--{t}-->"),
        }
    }
}

fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

fn escape_attr(s: &str) -> String {
    escape_text(s).replace('"', "&quot;")
}

impl Surface for MemorySurface {
    fn create_element(&mut self, tag: &str) -> NodeId {
        self.alloc(MemKind::Element {
            tag: tag.to_string(),
            attrs: BTreeMap::new(),
            classes: BTreeSet::new(),
            children: Vec::new(),
        })
    }

    fn create_text(&mut self, content: &str) -> NodeId {
        self.alloc(MemKind::Text(content.to_string()))
    }

    fn create_comment(&mut self, content: &str) -> NodeId {
        self.alloc(MemKind::Comment(content.to_string()))
    }

    fn set_attribute(&mut self, el: NodeId, name: &str, value: &str) {
        if let MemKind::Element { attrs, .. } = &mut self.node_mut(el).kind {
            attrs.insert(name.to_string(), value.to_string());
        }
    }

    fn add_class(&mut self, el: NodeId, name: &str) {
        if let MemKind::Element { classes, .. } = &mut self.node_mut(el).kind {
            classes.insert(name.to_string());
        }
    }

    fn add_listener(&mut self, el: NodeId, event: &str, handler: EventHandler) {
        self.node_mut(el).listeners.push((event.to_string(), handler));
    }

    fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        if let MemKind::Element { children, .. } = &mut self.node_mut(parent).kind {
            children.push(child);
        }
        self.node_mut(child).parent = Some(parent);
    }

    fn insert_before(&mut self, anchor: NodeId, child: NodeId) {
        let Some(parent) = self.node(anchor).parent else {
            return;
        };
        self.detach(child);
        if let MemKind::Element { children, .. } = &mut self.node_mut(parent).kind {
            let index = children.iter().position(|c| *c == anchor).unwrap_or(0);
            children.insert(index, child);
        }
        self.node_mut(child).parent = Some(parent);
    }

    fn set_text(&mut self, el: NodeId, content: &str) {
        if let MemKind::Text(t) = &mut self.node_mut(el).kind {
            *t = content.to_string();
        }
    }

    fn remove(&mut self, el: NodeId) {
        self.detach(el);
    }

    fn clone_node(&mut self, el: NodeId, deep: bool) -> NodeId {
        let (kind, children) = match &self.node(el).kind {
            MemKind::Element {
                tag,
                attrs,
                classes,
                children,
            } => (
                MemKind::Element {
                    tag: tag.clone(),
                    attrs: attrs.clone(),
                    classes: classes.clone(),
                    children: Vec::new(),
                },
                if deep { children.clone() } else { Vec::new() },
            ),
            MemKind::Text(t) => (MemKind::Text(t.clone()), Vec::new()),
            MemKind::Comment(t) => (MemKind::Comment(t.clone()), Vec::new()),
        };
        let id = self.alloc(kind);
        for child in children {
            let copy = self.clone_node(child, true);
            self.append_child(id, copy);
        }
        id
    }

    fn contains(&self, el: NodeId) -> bool {
        (el.0 as usize) < self.nodes.len()
    }
}
