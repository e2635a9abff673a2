use std::cell::Cell;
use std::rc::Rc;

use strix_dom::memory::MemorySurface;
use strix_dom::{
    Key, PatchError, VDom, VNode, VRoot, build_tree, comment, dom, empty_text, multi, patch,
    patch_root, static_node, text,
};
use strix_dom::{NodeId, Position, Surface};

fn keyed_dom(tag: &str, key: &str, children: Vec<VNode>) -> VNode {
    dom(tag, children).with_key(Key::Str(key.to_string()))
}

fn vroot(child: VNode) -> std::rc::Rc<std::cell::RefCell<VRoot>> {
    let root = VRoot::shared(Rc::new(()));
    root.borrow_mut().child = Some(Box::new(child));
    root
}

fn build(node: &mut VNode, s: &mut MemorySurface, fixture: NodeId) {
    build_tree(node, s, fixture, Position::Append, &[]).unwrap();
}

#[test]
fn builds_and_updates_text_content() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let mut vnode = text("abc");
    build(&mut vnode, &mut s, fixture);
    let el = s.child(fixture, 0).unwrap();
    assert_eq!(s.inner_html(fixture), "abc");

    patch(&mut vnode, text("def"), &mut s, &[], fixture).unwrap();
    assert_eq!(s.inner_html(fixture), "def");
    // same surface node, mutated in place
    assert_eq!(s.child(fixture, 0), Some(el));
}

#[test]
fn missing_text_renders_as_empty_string() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let mut vnode = empty_text();
    build(&mut vnode, &mut s, fixture);
    let el = s.child(fixture, 0).unwrap();
    assert_eq!(s.text_content(el), Some(String::new()));
    assert_eq!(s.inner_html(fixture), "");
}

#[test]
fn updates_text_inside_div_same_key() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let mut vnode = keyed_dom("div", "k", vec![text("abc")]);
    build(&mut vnode, &mut s, fixture);
    assert_eq!(s.inner_html(fixture), "<div>abc</div>");
    let div = s.child(fixture, 0).unwrap();
    let txt = s.child(div, 0).unwrap();

    patch(
        &mut vnode,
        keyed_dom("div", "k", vec![text("def")]),
        &mut s,
        &[],
        fixture,
    )
    .unwrap();
    assert_eq!(s.inner_html(fixture), "<div>def</div>");
    assert_eq!(s.child(fixture, 0), Some(div));
    assert_eq!(s.child(div, 0), Some(txt));
}

#[test]
fn root_child_with_different_key_is_rebuilt() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let live = vroot(keyed_dom("div", "k1", vec![text("abc")]));
    let mut node = VNode::Root(live.clone());
    build(&mut node, &mut s, fixture);
    let old_div = s.child(fixture, 0).unwrap();
    assert_eq!(s.inner_html(fixture), "<div>abc</div>");

    let candidate = vroot(keyed_dom("div", "k2", vec![text("def")]));
    patch_root(&live, &candidate, &mut s).unwrap();
    assert_eq!(s.inner_html(fixture), "<div>def</div>");
    assert_ne!(s.child(fixture, 0), Some(old_div));
}

#[test]
fn root_child_kind_change_is_rebuilt() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let live = vroot(text("abc"));
    let mut node = VNode::Root(live.clone());
    build(&mut node, &mut s, fixture);
    assert_eq!(s.inner_html(fixture), "abc");

    let candidate = vroot(keyed_dom("span", "k", vec![text("def")]));
    patch_root(&live, &candidate, &mut s).unwrap();
    assert_eq!(s.inner_html(fixture), "<span>def</span>");
}

#[test]
fn patches_multi_against_multi() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let mut vnode = multi(vec![keyed_dom("div", "2", vec![text("abc")])]);
    build(&mut vnode, &mut s, fixture);
    assert_eq!(s.inner_html(fixture), "<div>abc</div>");

    patch(
        &mut vnode,
        multi(vec![keyed_dom("div", "2", vec![text("def")])]),
        &mut s,
        &[],
        fixture,
    )
    .unwrap();
    assert_eq!(s.inner_html(fixture), "<div>def</div>");
}

#[test]
fn updates_two_text_nodes_keeping_identity() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let mut vnode = multi(vec![text("abc"), text("def")]);
    build(&mut vnode, &mut s, fixture);
    assert_eq!(s.inner_html(fixture), "abcdef");
    let t1 = s.child(fixture, 0).unwrap();
    let t2 = s.child(fixture, 1).unwrap();

    patch(
        &mut vnode,
        multi(vec![text("abc"), text("ghi")]),
        &mut s,
        &[],
        fixture,
    )
    .unwrap();
    assert_eq!(s.inner_html(fixture), "abcghi");
    assert_eq!(s.child(fixture, 0), Some(t1));
    assert_eq!(s.child(fixture, 1), Some(t2));
    assert_eq!(s.text_content(t2), Some("ghi".to_string()));
}

#[test]
fn self_patch_keeps_surface_untouched() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let mut vnode = keyed_dom("div", "k", vec![text("1"), keyed_dom("p", "k2", vec![])]);
    build(&mut vnode, &mut s, fixture);
    let div = s.child(fixture, 0).unwrap();
    let t = s.child(div, 0).unwrap();
    let p = s.child(div, 1).unwrap();

    patch(
        &mut vnode,
        keyed_dom("div", "k", vec![text("1"), keyed_dom("p", "k2", vec![])]),
        &mut s,
        &[],
        fixture,
    )
    .unwrap();
    assert_eq!(s.inner_html(fixture), "<div>1<p></p></div>");
    assert_eq!(s.child(fixture, 0), Some(div));
    assert_eq!(s.child(div, 0), Some(t));
    assert_eq!(s.child(div, 1), Some(p));
}

fn span_num(n: u32) -> VNode {
    dom("span", vec![text(n.to_string())]).with_key(Key::Num(n))
}

#[test]
fn appends_new_siblings_keeping_existing_nodes() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let mut vnode = keyed_dom("p", "1", vec![span_num(1)]);
    build(&mut vnode, &mut s, fixture);
    assert_eq!(s.inner_html(fixture), "<p><span>1</span></p>");
    let p = s.child(fixture, 0).unwrap();
    let span1 = s.child(p, 0).unwrap();

    patch(
        &mut vnode,
        keyed_dom("p", "1", vec![span_num(1), span_num(2), span_num(3)]),
        &mut s,
        &[],
        fixture,
    )
    .unwrap();
    assert_eq!(
        s.inner_html(fixture),
        "<p><span>1</span><span>2</span><span>3</span></p>"
    );
    assert_eq!(s.child(p, 0), Some(span1));
    assert_eq!(s.child_count(p), 3);
}

#[test]
fn prepending_is_a_sibling_mismatch() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let mut vnode = keyed_dom("p", "1", vec![span_num(4), span_num(5)]);
    build(&mut vnode, &mut s, fixture);

    let err = patch(
        &mut vnode,
        keyed_dom(
            "p",
            "1",
            vec![span_num(1), span_num(2), span_num(3), span_num(4), span_num(5)],
        ),
        &mut s,
        &[],
        fixture,
    )
    .unwrap_err();
    assert!(matches!(err, PatchError::Mismatch { index: 0, .. }));
    // the fail-fast pre-scan left the children untouched
    assert_eq!(s.inner_html(fixture), "<p><span>4</span><span>5</span></p>");
}

#[test]
fn mid_list_mismatch_reports_position() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let mut vnode = multi(vec![span_num(1), span_num(2)]);
    build(&mut vnode, &mut s, fixture);

    let err = patch(
        &mut vnode,
        multi(vec![span_num(1), span_num(9)]),
        &mut s,
        &[],
        fixture,
    )
    .unwrap_err();
    assert!(matches!(err, PatchError::Mismatch { index: 1, .. }));
    assert_eq!(s.inner_html(fixture), "<span>1</span><span>2</span>");
}

#[test]
fn shrinking_list_removes_surplus_nodes() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let mut vnode = keyed_dom("p", "1", vec![span_num(1), span_num(2), span_num(3)]);
    build(&mut vnode, &mut s, fixture);
    let p = s.child(fixture, 0).unwrap();
    let span1 = s.child(p, 0).unwrap();

    patch(
        &mut vnode,
        keyed_dom("p", "1", vec![span_num(1)]),
        &mut s,
        &[],
        fixture,
    )
    .unwrap();
    assert_eq!(s.inner_html(fixture), "<p><span>1</span></p>");
    assert_eq!(s.child(p, 0), Some(span1));
    assert_eq!(s.child_count(p), 1);
}

#[test]
fn comments_are_built_and_carried() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let mut vnode = keyed_dom("div", "k", vec![comment("marker"), text("x")]);
    build(&mut vnode, &mut s, fixture);
    assert_eq!(s.inner_html(fixture), "<div><!--marker-->x</div>");

    patch(
        &mut vnode,
        keyed_dom("div", "k", vec![comment("marker"), text("y")]),
        &mut s,
        &[],
        fixture,
    )
    .unwrap();
    assert_eq!(s.outer_html(s.child(fixture, 0).unwrap()), "<div><!--marker-->y</div>");
}

#[test]
fn static_nodes_are_cloned_from_the_pool_and_skipped_by_patch() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();

    // pre-built pooled subtree
    let pooled = s.create_element("footer");
    let pooled_text = s.create_text("fixed");
    s.append_child(pooled, pooled_text);

    let live = VRoot::shared(Rc::new(()));
    {
        let mut root = live.borrow_mut();
        root.statics = vec![pooled];
        root.child = Some(Box::new(multi(vec![
            text("a"),
            static_node(0).with_key(Key::Num(1)),
        ])));
    }
    let mut node = VNode::Root(live.clone());
    build(&mut node, &mut s, fixture);
    assert_eq!(s.inner_html(fixture), "a<footer>fixed</footer>");
    let footer = s.child(fixture, 1).unwrap();
    assert_ne!(footer, pooled);

    let candidate = VRoot::shared(Rc::new(()));
    candidate.borrow_mut().child = Some(Box::new(multi(vec![
        text("b"),
        static_node(0).with_key(Key::Num(1)),
    ])));
    patch_root(&live, &candidate, &mut s).unwrap();
    assert_eq!(s.inner_html(fixture), "b<footer>fixed</footer>");
    assert_eq!(s.child(fixture, 1), Some(footer));
}

#[test]
fn build_applies_attrs_classes_and_listeners_once() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();

    let clicked = Rc::new(Cell::new(false));
    let seen = clicked.clone();
    let mut button = VDom::new("button");
    button.key = Some(Key::Str("b".to_string()));
    button.attrs.push((
        "type".to_string(),
        strix_dom::AttrValue::Str("submit".to_string()),
    ));
    button
        .attrs
        .push(("disabled".to_string(), strix_dom::AttrValue::Bool(true)));
    button
        .attrs
        .push(("hidden".to_string(), strix_dom::AttrValue::Bool(false)));
    button.class.push(("primary".to_string(), true));
    button.class.push(("ghost".to_string(), false));
    button
        .on
        .push(("click".to_string(), Rc::new(move || seen.set(true))));
    button.children.push(text("go"));
    let mut vnode = VNode::Dom(Box::new(button));

    build(&mut vnode, &mut s, fixture);
    assert_eq!(
        s.inner_html(fixture),
        "<button disabled=\"\" type=\"submit\" class=\"primary\">go</button>"
    );
    let el = s.child(fixture, 0).unwrap();
    s.dispatch(el, "click");
    assert!(clicked.get());
}

#[test]
fn remove_tree_detaches_nested_handles() {
    let mut s = MemorySurface::new();
    let fixture = s.create_root();
    let mut vnode = multi(vec![
        keyed_dom("div", "a", vec![text("1")]),
        text("2"),
        comment("c"),
    ]);
    build(&mut vnode, &mut s, fixture);
    assert_eq!(s.child_count(fixture), 3);

    strix_dom::remove_tree(&vnode, &mut s);
    assert_eq!(s.child_count(fixture), 0);
    assert_eq!(s.inner_html(fixture), "");
}
