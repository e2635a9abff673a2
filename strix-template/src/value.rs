//! Dynamic values flowing through render contexts and expressions.

use std::any::Any;
use std::collections::HashMap;
use std::rc::Rc;

use strix_dom::{AttrValue, VNode};

/// A render-context value. `Undefined` means "name not bound" and is distinct
/// from an explicit `Null`; the escaped-output fallback branches on it.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Int(i64),
    Str(String),
    List(Vec<Value>),
    Map(HashMap<String, Value>),
    /// A detached rendered body (template-variable bodies). Stringified on
    /// demand via [`vdom_to_string`].
    Fragment(Rc<Vec<VNode>>),
    /// Host object carried through the context opaquely, e.g. a component
    /// definition.
    Opaque(Rc<dyn Any>),
}

impl Value {
    pub fn str(s: impl Into<String>) -> Value {
        Value::Str(s.into())
    }

    pub fn map(entries: impl IntoIterator<Item = (String, Value)>) -> Value {
        Value::Map(entries.into_iter().collect())
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    pub fn truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Str(s) => !s.is_empty(),
            Value::List(_) | Value::Map(_) | Value::Opaque(_) => true,
            Value::Fragment(nodes) => !nodes.is_empty(),
        }
    }

    /// Field access; anything but a map yields `Undefined`.
    pub fn field(&self, name: &str) -> Value {
        match self {
            Value::Map(m) => m.get(name).cloned().unwrap_or(Value::Undefined),
            _ => Value::Undefined,
        }
    }

    /// Text rendering. `Undefined`/`Null` disappear, everything else follows
    /// the host language's string coercion.
    pub fn to_text(&self) -> String {
        self.to_text_opt().unwrap_or_default()
    }

    /// Like [`to_text`](Self::to_text), but keeps the "no content" cases
    /// distinguishable so text nodes can apply the empty-string rule at build
    /// time.
    pub fn to_text_opt(&self) -> Option<String> {
        match self {
            Value::Undefined | Value::Null => None,
            Value::Bool(b) => Some(b.to_string()),
            Value::Int(n) => Some(n.to_string()),
            Value::Str(s) => Some(s.clone()),
            Value::List(items) => Some(
                items
                    .iter()
                    .map(Value::to_text)
                    .collect::<Vec<_>>()
                    .join(","),
            ),
            Value::Map(_) => Some("[object]".to_string()),
            Value::Fragment(nodes) => Some(vdom_to_string(nodes)),
            Value::Opaque(_) => Some("[opaque]".to_string()),
        }
    }
}

impl std::fmt::Debug for Value {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Value::Undefined => write!(f, "undefined"),
            Value::Null => write!(f, "null"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Int(n) => write!(f, "{n}"),
            Value::Str(s) => write!(f, "{s:?}"),
            Value::List(items) => f.debug_list().entries(items).finish(),
            Value::Map(m) => f.debug_map().entries(m.iter()).finish(),
            Value::Fragment(nodes) => write!(f, "Fragment[{}]", nodes.len()),
            Value::Opaque(_) => write!(f, "[opaque]"),
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::Int(a), Value::Int(b)) => a == b,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => a == b,
            (Value::Map(a), Value::Map(b)) => a == b,
            (Value::Fragment(a), Value::Fragment(b)) => Rc::ptr_eq(a, b),
            (Value::Opaque(a), Value::Opaque(b)) => Rc::ptr_eq(a, b),
            _ => false,
        }
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Str(s.to_string())
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::Str(s)
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Int(n)
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

/// Stringify a detached virtual subtree. Used when a template variable that
/// holds a rendered body is escaped into text output. Static nodes have no
/// intrinsic content and contribute nothing.
pub fn vdom_to_string(nodes: &[VNode]) -> String {
    let mut out = String::new();
    for node in nodes {
        write_node(node, &mut out);
    }
    out
}

fn write_node(node: &VNode, out: &mut String) {
    match node {
        VNode::Text(n) => {
            if let Some(t) = &n.text {
                out.push_str(t);
            }
        }
        VNode::Comment(n) => {
            out.push_str("<!--");
            out.push_str(&n.text);
            out.push_str("-->");
        }
        VNode::Dom(n) => {
            out.push('<');
            out.push_str(&n.tag);
            for (name, value) in &n.attrs {
                match value {
                    AttrValue::Str(v) => {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"");
                        out.push_str(v);
                        out.push('"');
                    }
                    AttrValue::Bool(true) => {
                        out.push(' ');
                        out.push_str(name);
                        out.push_str("=\"\"");
                    }
                    AttrValue::Bool(false) | AttrValue::Null => {}
                }
            }
            let classes: Vec<&str> = n
                .class
                .iter()
                .filter(|(_, on)| *on)
                .map(|(name, _)| name.as_str())
                .collect();
            if !classes.is_empty() {
                out.push_str(" class=\"");
                out.push_str(&classes.join(" "));
                out.push('"');
            }
            out.push('>');
            for child in &n.children {
                write_node(child, out);
            }
            out.push_str("</");
            out.push_str(&n.tag);
            out.push('>');
        }
        VNode::Multi(n) => {
            for child in &n.children {
                write_node(child, out);
            }
        }
        VNode::Root(root) => {
            if let Some(child) = &root.borrow().child {
                write_node(child, out);
            }
        }
        VNode::Static(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strix_dom::{dom, multi, text};

    #[test]
    fn truthiness_follows_host_semantics() {
        assert!(!Value::Undefined.truthy());
        assert!(!Value::Null.truthy());
        assert!(!Value::Int(0).truthy());
        assert!(!Value::str("").truthy());
        assert!(Value::Int(-1).truthy());
        assert!(Value::str("0").truthy());
        assert!(Value::List(vec![]).truthy());
    }

    #[test]
    fn text_coercion() {
        assert_eq!(Value::Undefined.to_text(), "");
        assert_eq!(Value::Null.to_text(), "");
        assert_eq!(Value::Int(42).to_text(), "42");
        assert_eq!(Value::Bool(true).to_text(), "true");
        assert_eq!(
            Value::List(vec![Value::Int(1), Value::str("x")]).to_text(),
            "1,x"
        );
    }

    #[test]
    fn fragment_stringification() {
        let nodes = vec![
            text("Hello "),
            dom("b", vec![text("world")]),
            multi(vec![text("!")]),
        ];
        assert_eq!(vdom_to_string(&nodes), "Hello <b>world</b>!");
    }
}
