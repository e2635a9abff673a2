//! Property: for a fixed context, compiling and rendering a template any
//! number of times always yields the same (kind, key) preorder sequence.

use std::rc::Rc;

use proptest::collection::vec;
use proptest::prelude::*;

use strix_dom::{VNode, VRoot};
use strix_template::{Ast, NullRuntime, PathExprCompiler, Scope, Value, compile};

fn shape(node: &VNode, out: &mut Vec<String>) {
    out.push(node.label());
    match node {
        VNode::Dom(n) => {
            for child in &n.children {
                shape(child, out);
            }
        }
        VNode::Multi(n) => {
            for child in &n.children {
                shape(child, out);
            }
        }
        VNode::Root(root) => {
            if let Some(child) = &root.borrow().child {
                shape(child, out);
            }
        }
        _ => {}
    }
}

fn render_shape(program: &strix_template::Program, scope: &Scope) -> Vec<String> {
    let tree = VRoot::shared(Rc::new(()));
    program.render(&tree, scope, &NullRuntime).unwrap();
    let mut out = Vec::new();
    let borrowed = tree.borrow();
    if let Some(child) = &borrowed.child {
        shape(child, &mut out);
    }
    out
}

fn expr_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        Just("n".to_string()),
        Just("name".to_string()),
        Just("flag".to_string()),
        Just("n + 1".to_string()),
        Just("'lit'".to_string()),
        Just("missing".to_string()),
        Just("n == 2".to_string()),
    ]
}

fn ast_strategy() -> impl Strategy<Value = Ast> {
    let leaf = prop_oneof![
        "[a-z ]{0,8}".prop_map(Ast::Text),
        "[a-z]{1,8}".prop_map(Ast::Comment),
        expr_strategy().prop_map(Ast::esc),
    ];
    leaf.prop_recursive(3, 24, 4, |inner| {
        prop_oneof![
            (
                prop_oneof![Just("div"), Just("span"), Just("p")],
                vec(inner.clone(), 0..4)
            )
                .prop_map(|(tag, children)| Ast::dom(tag, vec![], children)),
            vec(inner.clone(), 0..4).prop_map(Ast::Multi),
            (
                expr_strategy(),
                vec(inner.clone(), 0..3),
                vec(inner.clone(), 0..3)
            )
                .prop_map(|(condition, body, else_body)| Ast::if_else(
                    condition, body, else_body
                )),
        ]
    })
}

fn fixed_scope() -> Scope {
    let scope = Scope::new();
    scope.set("n", Value::Int(2));
    scope.set("name", Value::str("alex"));
    scope.set("flag", Value::Bool(true));
    scope
}

proptest! {
    #[test]
    fn rendering_twice_yields_identical_shapes(asts in vec(ast_strategy(), 1..4)) {
        let scope = fixed_scope();
        let program = compile("prop", &asts, &PathExprCompiler).unwrap();
        prop_assert_eq!(render_shape(&program, &scope), render_shape(&program, &scope));
    }

    #[test]
    fn recompiling_yields_the_same_shape(asts in vec(ast_strategy(), 1..4)) {
        let scope = fixed_scope();
        let first = compile("prop", &asts, &PathExprCompiler).unwrap();
        let second = compile("prop", &asts, &PathExprCompiler).unwrap();
        prop_assert_eq!(render_shape(&first, &scope), render_shape(&second, &scope));
    }
}
