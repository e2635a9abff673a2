//! Tree building and reconciliation.
//!
//! `build_tree` walks a candidate tree top-down and creates one surface node
//! per Dom/Text/Comment/Static node. `patch` converges the surface from a
//! live tree to a candidate tree produced by the same compiled template path:
//! handles move from the old tree onto the new one, the new tree becomes the
//! live tree, and the old tree is discarded.
//!
//! The sibling walk is strictly positional: lists produced by the same
//! template path always agree on (kind, key) pairs, so any disagreement is a
//! fatal [`PatchError::Mismatch`] rather than a move/insert opportunity.

use std::cell::RefCell;
use std::rc::Rc;

use thiserror::Error;
use tracing::trace;

use crate::surface::{NodeId, Position, Surface};
use crate::{AttrValue, VNode, VRoot, same};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PatchError {
    /// Sibling lists disagree on identity mid-diff. Indicates a
    /// non-deterministic render path; nothing at this level was mutated.
    #[error("sibling mismatch at index {index}: live {live}, candidate {candidate}")]
    Mismatch {
        index: usize,
        live: String,
        candidate: String,
    },
    #[error("{kind} node was never built (missing surface handle)")]
    MissingHandle { kind: &'static str },
    #[error("root has no recorded anchor")]
    MissingAnchor,
    #[error("static pool has no entry {id}")]
    UnknownStatic { id: usize },
}

fn attach(surface: &mut dyn Surface, el: NodeId, anchor: NodeId, position: Position) {
    match position {
        Position::Append => surface.append_child(anchor, el),
        Position::Before => surface.insert_before(anchor, el),
    }
}

/// First build of a subtree: creates surface nodes, applies attributes,
/// classes and listeners at creation time, records the anchor/position on
/// root nodes and fires their create hook once the subtree is complete.
pub fn build_tree(
    vnode: &mut VNode,
    surface: &mut dyn Surface,
    anchor: NodeId,
    position: Position,
    statics: &[NodeId],
) -> Result<(), PatchError> {
    match vnode {
        VNode::Text(node) => {
            let el = surface.create_text(node.text.as_deref().unwrap_or(""));
            node.el = Some(el);
            attach(surface, el, anchor, position);
        }
        VNode::Comment(node) => {
            let el = surface.create_comment(&node.text);
            node.el = Some(el);
            attach(surface, el, anchor, position);
        }
        VNode::Dom(node) => {
            let el = surface.create_element(&node.tag);
            node.el = Some(el);
            for child in &mut node.children {
                build_tree(child, surface, el, Position::Append, statics)?;
            }
            for (name, value) in &node.attrs {
                match value {
                    AttrValue::Str(v) => surface.set_attribute(el, name, v),
                    AttrValue::Bool(true) => surface.set_attribute(el, name, ""),
                    AttrValue::Bool(false) | AttrValue::Null => {}
                }
            }
            for (name, enabled) in &node.class {
                if *enabled {
                    surface.add_class(el, name);
                }
            }
            for (event, handler) in &node.on {
                surface.add_listener(el, event, handler.clone());
            }
            attach(surface, el, anchor, position);
        }
        VNode::Root(root) => {
            let mut root = root.borrow_mut();
            root.anchor = Some(anchor);
            root.position = Some(position);
            let VRoot {
                child,
                statics: pool,
                create_hook,
                ..
            } = &mut *root;
            if let Some(child) = child {
                build_tree(child, surface, anchor, position, pool)?;
                if let Some(hook) = create_hook
                    && let Some(el) = child.first_el()
                {
                    hook(el);
                }
            }
        }
        VNode::Multi(node) => {
            for child in &mut node.children {
                build_tree(child, surface, anchor, position, statics)?;
            }
        }
        VNode::Static(node) => {
            let src = statics
                .get(node.id)
                .copied()
                .ok_or(PatchError::UnknownStatic { id: node.id })?;
            let el = surface.clone_node(src, true);
            node.el = Some(el);
            attach(surface, el, anchor, position);
        }
    }
    Ok(())
}

/// Recursively detach every owned surface handle in a subtree.
pub fn remove_tree(vnode: &VNode, surface: &mut dyn Surface) {
    match vnode {
        VNode::Multi(node) => {
            for child in &node.children {
                remove_tree(child, surface);
            }
        }
        VNode::Root(root) => {
            if let Some(child) = &root.borrow().child {
                remove_tree(child, surface);
            }
        }
        VNode::Dom(node) => {
            if let Some(el) = node.el {
                surface.remove(el);
            }
        }
        VNode::Text(node) => {
            if let Some(el) = node.el {
                surface.remove(el);
            }
        }
        VNode::Comment(node) => {
            if let Some(el) = node.el {
                surface.remove(el);
            }
        }
        VNode::Static(node) => {
            if let Some(el) = node.el {
                surface.remove(el);
            }
        }
    }
}

/// Commit entry point for re-renders: converge the surface from the live
/// root's subtree to the candidate root's, keeping `live` as the retained
/// tree object. The callers guarantee both roots came from the same template.
pub fn patch_root(
    live: &Rc<RefCell<VRoot>>,
    candidate: &Rc<RefCell<VRoot>>,
    surface: &mut dyn Surface,
) -> Result<(), PatchError> {
    if Rc::ptr_eq(live, candidate) {
        return Ok(());
    }
    let mut cand = candidate.borrow_mut();
    let mut root = live.borrow_mut();
    let anchor = root.anchor.ok_or(PatchError::MissingAnchor)?;
    let position = root.position.unwrap_or(Position::Append);
    let VRoot { child, statics, .. } = &mut *root;
    let mut cand_child = cand.child.take();
    let same_child = matches!(
        (child.as_deref(), cand_child.as_deref()),
        (Some(old), Some(new)) if same(old, new)
    );
    if same_child {
        if let (Some(old), Some(new)) = (child.as_deref_mut(), cand_child.take()) {
            patch(old, *new, surface, statics, anchor)?;
        }
    } else {
        trace!(target: "strix::patch", "root child replaced, rebuilding");
        if let Some(old) = child.take() {
            remove_tree(&old, surface);
        }
        if let Some(mut new) = cand_child {
            build_tree(&mut new, surface, anchor, position, statics)?;
            *child = Some(new);
        }
    }
    Ok(())
}

/// Patch one live node against its same-identity candidate. On success the
/// live slot holds the candidate node carrying the (possibly mutated) surface
/// handles; `anchor` is the element surplus siblings get appended to.
pub fn patch(
    live: &mut VNode,
    mut cand: VNode,
    surface: &mut dyn Surface,
    statics: &[NodeId],
    anchor: NodeId,
) -> Result<(), PatchError> {
    match (&mut *live, &mut cand) {
        (VNode::Text(old), VNode::Text(new)) => {
            let el = old.el.ok_or(PatchError::MissingHandle { kind: "text" })?;
            surface.set_text(el, new.text.as_deref().unwrap_or(""));
            new.el = Some(el);
        }
        (VNode::Comment(old), VNode::Comment(new)) => {
            // comment content is literal, only the handle moves
            new.el = old.el;
        }
        (VNode::Static(old), VNode::Static(new)) => {
            new.el = old.el;
        }
        (VNode::Dom(old), VNode::Dom(new)) => {
            let el = old.el.ok_or(PatchError::MissingHandle { kind: "dom" })?;
            // attributes, classes and listeners are applied at build time
            // only; a same-identity element keeps them untouched
            patch_children(&mut old.children, &mut new.children, surface, statics, el)?;
            new.el = Some(el);
        }
        (VNode::Multi(old), VNode::Multi(new)) => {
            patch_children(&mut old.children, &mut new.children, surface, statics, anchor)?;
        }
        (VNode::Root(old), VNode::Root(new)) => {
            patch_subroot(old, new, surface)?;
        }
        (old, new) => {
            return Err(PatchError::Mismatch {
                index: 0,
                live: old.label(),
                candidate: new.label(),
            });
        }
    }
    *live = cand;
    Ok(())
}

/// Nested component root inside a children list: the candidate root (carrying
/// the fresh render payload) adopts the live root's attachment state and its
/// child is diffed against the live child.
fn patch_subroot(
    live: &Rc<RefCell<VRoot>>,
    candidate: &Rc<RefCell<VRoot>>,
    surface: &mut dyn Surface,
) -> Result<(), PatchError> {
    if Rc::ptr_eq(live, candidate) {
        return Ok(());
    }
    let mut old = live.borrow_mut();
    let mut new = candidate.borrow_mut();
    new.anchor = old.anchor;
    new.position = old.position;
    new.statics = std::mem::take(&mut old.statics);
    let anchor = new.anchor.ok_or(PatchError::MissingAnchor)?;
    let position = new.position.unwrap_or(Position::Append);
    let VRoot {
        child: new_child,
        statics,
        ..
    } = &mut *new;
    match (old.child.take(), new_child.take()) {
        (Some(mut old_child), Some(cand_child)) if same(&old_child, &cand_child) => {
            patch(&mut old_child, *cand_child, surface, statics, anchor)?;
            *new_child = Some(old_child);
        }
        (old_child, cand_child) => {
            if let Some(old_child) = old_child {
                remove_tree(&old_child, surface);
            }
            if let Some(mut cand_child) = cand_child {
                build_tree(&mut cand_child, surface, anchor, position, statics)?;
                *new_child = Some(cand_child);
            }
        }
    }
    Ok(())
}

/// Positional list reconciliation. The overlapping prefix is identity-checked
/// up front so a mismatch surfaces before any node at this level is touched;
/// surplus candidates are built and appended in order; surplus live nodes are
/// removed from the surface.
fn patch_children(
    old: &mut Vec<VNode>,
    new: &mut Vec<VNode>,
    surface: &mut dyn Surface,
    statics: &[NodeId],
    parent_el: NodeId,
) -> Result<(), PatchError> {
    let incoming = std::mem::take(new);
    for (index, (live, cand)) in old.iter().zip(incoming.iter()).enumerate() {
        if !same(live, cand) {
            return Err(PatchError::Mismatch {
                index,
                live: live.label(),
                candidate: cand.label(),
            });
        }
    }
    let target_len = incoming.len();
    let mut iter = incoming.into_iter();
    for (live, cand) in old.iter_mut().zip(iter.by_ref()) {
        patch(live, cand, surface, statics, parent_el)?;
    }
    for mut cand in iter {
        build_tree(&mut cand, surface, parent_el, Position::Append, statics)?;
        old.push(cand);
    }
    if old.len() > target_len {
        for surplus in old.drain(target_len..) {
            remove_tree(&surplus, surface);
        }
    }
    *new = std::mem::take(old);
    Ok(())
}
