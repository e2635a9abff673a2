//! The output-surface capability. The tree builder and the reconciler talk to
//! the concrete output (a browser DOM, a test arena, ...) exclusively through
//! this trait; they never create or mutate platform nodes themselves.

use std::rc::Rc;

/// Opaque handle to one concrete surface node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub u32);

/// Where a freshly built node lands relative to its anchor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Append as last child of the anchor.
    Append,
    /// Insert as previous sibling of the anchor.
    Before,
}

pub type EventHandler = Rc<dyn Fn()>;

pub trait Surface {
    fn create_element(&mut self, tag: &str) -> NodeId;
    fn create_text(&mut self, content: &str) -> NodeId;
    fn create_comment(&mut self, content: &str) -> NodeId;

    fn set_attribute(&mut self, el: NodeId, name: &str, value: &str);
    fn add_class(&mut self, el: NodeId, name: &str);
    fn add_listener(&mut self, el: NodeId, event: &str, handler: EventHandler);

    fn append_child(&mut self, parent: NodeId, child: NodeId);
    fn insert_before(&mut self, anchor: NodeId, child: NodeId);

    /// Overwrite the content of a text node in place.
    fn set_text(&mut self, el: NodeId, content: &str);

    /// Detach a node (and its subtree) from the surface.
    fn remove(&mut self, el: NodeId);

    fn clone_node(&mut self, el: NodeId, deep: bool) -> NodeId;

    fn contains(&self, el: NodeId) -> bool;
}
