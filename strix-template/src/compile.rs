//! Template compiler: lowers a parsed AST into a [`Program`].
//!
//! Each AST node is lowered once into a boxed step closure; executing the
//! steps against a scope builds the virtual tree the same way a generated
//! render function would. All reconciliation keys are fixed at
//! compile time, in source order, so a program's output shape only depends on
//! the control-flow path taken through it.

use std::any::Any;
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use strix_dom::{Key, VComment, VDom, VMulti, VNode, VRoot, VText};
use tracing::debug;

use crate::ast::{Ast, Attr, AttrSource, IfChain};
use crate::error::{CompileError, RenderError};
use crate::expr::{ExprCompiler, ExprFn};
use crate::scope::Scope;
use crate::value::Value;

/// Host hook for component references: turns a name plus the parent render
/// payload into a fresh subtree root. Implemented by the rendering engine.
pub trait Runtime {
    fn instantiate(
        &self,
        parent: &Rc<dyn Any>,
        name: &str,
        scope: &Scope,
        props: Value,
    ) -> Result<VNode, RenderError>;
}

/// Runtime for component-less rendering (template tests, detached bodies).
#[derive(Debug, Default)]
pub struct NullRuntime;

impl Runtime for NullRuntime {
    fn instantiate(
        &self,
        _parent: &Rc<dyn Any>,
        name: &str,
        _scope: &Scope,
        _props: Value,
    ) -> Result<VNode, RenderError> {
        Err(RenderError::UnknownComponent(name.to_string()))
    }
}

pub struct RenderCx<'a> {
    pub scope: Scope,
    pub rt: &'a dyn Runtime,
    /// Payload of the root being rendered, handed to component instantiation.
    pub data: Rc<dyn Any>,
}

type Step = Box<dyn Fn(&mut Vec<VNode>, &mut RenderCx<'_>) -> Result<(), RenderError>>;

/// A compiled template. Rendering produces a brand-new tree every time; the
/// previous tree is never mutated.
pub struct Program {
    name: String,
    steps: Vec<Step>,
    protect_scope: bool,
}

impl std::fmt::Debug for Program {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Program")
            .field("name", &self.name)
            .field("steps", &self.steps.len())
            .field("protect_scope", &self.protect_scope)
            .finish()
    }
}

impl Program {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Populate `tree.child` from this program. The tree's payload must
    /// already be set; it is passed through to component instantiation.
    pub fn render(
        &self,
        tree: &Rc<RefCell<VRoot>>,
        scope: &Scope,
        rt: &dyn Runtime,
    ) -> Result<(), RenderError> {
        // context isolation only when the template binds variables
        let scope = if self.protect_scope {
            scope.fork()
        } else {
            scope.clone()
        };
        let data = tree.borrow().data.clone();
        let mut cx = RenderCx { scope, rt, data };
        let mut out = Vec::new();
        for step in &self.steps {
            step(&mut out, &mut cx)?;
        }
        // a top-level conditional or fallback body may emit several roots
        let child = match out.len() {
            0 | 1 => out.pop(),
            _ => Some(VNode::Multi(VMulti {
                key: None,
                children: out,
            })),
        };
        tree.borrow_mut().child = child.map(Box::new);
        Ok(())
    }
}

pub fn compile(
    name: &str,
    asts: &[Ast],
    exprs: &dyn ExprCompiler,
) -> Result<Program, CompileError> {
    let mut compiler = Compiler {
        exprs,
        next_key: 1,
        vars: HashMap::new(),
        protect: false,
    };
    // several top-level nodes become one implicit structural group
    let steps = if asts.len() > 1 {
        vec![compiler.compile_multi(asts)?]
    } else {
        compiler.compile_nodes(asts)?
    };
    debug!(target: "strix::compile", template = name, steps = steps.len(), "compiled template");
    Ok(Program {
        name: name.to_string(),
        steps,
        protect_scope: compiler.protect,
    })
}

#[derive(Debug, Clone, Copy, Default)]
struct VarInfo {
    has_body: bool,
    has_value: bool,
}

struct Compiler<'a> {
    exprs: &'a dyn ExprCompiler,
    next_key: u32,
    vars: HashMap<String, VarInfo>,
    protect: bool,
}

enum AttrPart {
    Lit(String),
    Dyn(ExprFn),
}

fn text_node(key: Key, text: Option<String>) -> VNode {
    VNode::Text(VText {
        key: Some(key),
        text,
        el: None,
    })
}

fn run_steps(
    steps: &[Step],
    out: &mut Vec<VNode>,
    cx: &mut RenderCx<'_>,
) -> Result<(), RenderError> {
    for step in steps {
        step(out, cx)?;
    }
    Ok(())
}

impl Compiler<'_> {
    fn next_key(&mut self) -> Key {
        let key = Key::Num(self.next_key);
        self.next_key += 1;
        key
    }

    fn compile_nodes(&mut self, asts: &[Ast]) -> Result<Vec<Step>, CompileError> {
        asts.iter().map(|ast| self.compile_node(ast)).collect()
    }

    fn compile_node(&mut self, ast: &Ast) -> Result<Step, CompileError> {
        match ast {
            Ast::Text(t) => {
                let key = self.next_key();
                let t = t.clone();
                Ok(Box::new(move |out, _cx| {
                    out.push(text_node(key.clone(), Some(t.clone())));
                    Ok(())
                }))
            }
            Ast::Comment(t) => {
                let key = self.next_key();
                let t = t.clone();
                Ok(Box::new(move |out, _cx| {
                    out.push(VNode::Comment(VComment {
                        key: Some(key.clone()),
                        text: t.clone(),
                        el: None,
                    }));
                    Ok(())
                }))
            }
            Ast::Dom {
                tag,
                attrs,
                children,
            } => self.compile_dom(tag, attrs, children),
            Ast::Multi(children) => self.compile_multi(children),
            Ast::Esc { expr, body } => self.compile_esc(expr, body),
            Ast::Set { name, value, body } => self.compile_set(name, value.as_deref(), body),
            Ast::If(chain) => self.compile_if(chain),
            Ast::Component { name, props } => self.compile_component(name, props),
            Ast::Repeat { list, var, body } => self.compile_repeat(list, var, body),
        }
    }

    fn compile_dom(
        &mut self,
        tag: &str,
        attrs: &[Attr],
        children: &[Ast],
    ) -> Result<Step, CompileError> {
        // group contributions per attribute name, preserving source order;
        // several contributions to one name merge with a single space
        let mut plan: Vec<(String, Vec<AttrPart>)> = Vec::new();
        for attr in attrs {
            let part = match &attr.value {
                AttrSource::Literal(v) => AttrPart::Lit(v.clone()),
                AttrSource::Expr(src) => AttrPart::Dyn(self.exprs.compile(src)?),
            };
            match plan.iter_mut().find(|(name, _)| *name == attr.name) {
                Some((_, parts)) => parts.push(part),
                None => plan.push((attr.name.clone(), vec![part])),
            }
        }
        let key = self.next_key();
        let child_steps = self.compile_nodes(children)?;
        let tag = tag.to_string();
        Ok(Box::new(move |out, cx| {
            let mut node = VDom::new(tag.clone());
            node.key = Some(key.clone());
            for (name, parts) in &plan {
                node.attrs.push((name.clone(), eval_attr(parts, &cx.scope)));
            }
            run_steps(&child_steps, &mut node.children, cx)?;
            out.push(VNode::Dom(Box::new(node)));
            Ok(())
        }))
    }

    fn compile_multi(&mut self, children: &[Ast]) -> Result<Step, CompileError> {
        let key = self.next_key();
        let child_steps = self.compile_nodes(children)?;
        Ok(Box::new(move |out, cx| {
            let mut node = VMulti {
                key: Some(key.clone()),
                children: Vec::new(),
            };
            run_steps(&child_steps, &mut node.children, cx)?;
            out.push(VNode::Multi(node));
            Ok(())
        }))
    }

    fn compile_esc(&mut self, expr: &str, body: &[Ast]) -> Result<Step, CompileError> {
        if !body.is_empty() {
            // value wins when defined, otherwise the fallback body renders
            let value_fn = self.exprs.compile(expr)?;
            let key = self.next_key();
            let body_steps = self.compile_nodes(body)?;
            return Ok(Box::new(move |out, cx| {
                let value = value_fn(&cx.scope);
                if !value.is_undefined() {
                    out.push(text_node(key.clone(), value.to_text_opt()));
                } else {
                    run_steps(&body_steps, out, cx)?;
                }
                Ok(())
            }));
        }

        let trimmed = expr.trim();
        if let Some(info) = self.vars.get(trimmed).copied() {
            // escaping a previously declared template variable
            if !info.has_body && !info.has_value {
                return Ok(Box::new(|_out, _cx| Ok(())));
            }
            let name = trimmed.to_string();
            let key = self.next_key();
            // a rendered body stringifies, a literal value passes through;
            // to_text_opt covers both, including the value-or-body case
            return Ok(Box::new(move |out, cx| {
                let value = cx.scope.get(&name);
                out.push(text_node(key.clone(), value.to_text_opt()));
                Ok(())
            }));
        }

        let value_fn = self.exprs.compile(expr)?;
        let key = self.next_key();
        Ok(Box::new(move |out, cx| {
            let value = value_fn(&cx.scope);
            out.push(text_node(key.clone(), value.to_text_opt()));
            Ok(())
        }))
    }

    fn compile_set(
        &mut self,
        name: &str,
        value: Option<&str>,
        body: &[Ast],
    ) -> Result<Step, CompileError> {
        self.protect = true;
        let value_fn = value.map(|src| self.exprs.compile(src)).transpose()?;
        let body_steps = if body.is_empty() {
            None
        } else {
            Some(self.compile_nodes(body)?)
        };

        match self.vars.entry(name.to_string()) {
            std::collections::hash_map::Entry::Occupied(mut entry) => {
                let info = entry.get_mut();
                info.has_body = info.has_body || !body.is_empty();
                info.has_value = info.has_value || value.is_some();
            }
            std::collections::hash_map::Entry::Vacant(entry) => {
                entry.insert(VarInfo {
                    has_body: !body.is_empty(),
                    has_value: value.is_some(),
                });
            }
        }

        let name = name.to_string();
        Ok(Box::new(move |_out, cx| {
            match (&value_fn, &body_steps) {
                (Some(value_fn), None) => {
                    cx.scope.set(name.clone(), value_fn(&cx.scope));
                }
                (None, Some(steps)) => {
                    let fragment = render_detached(steps, cx)?;
                    cx.scope.set(name.clone(), fragment);
                }
                (Some(value_fn), Some(steps)) => {
                    let value = value_fn(&cx.scope);
                    if value.truthy() {
                        cx.scope.set(name.clone(), value);
                    } else {
                        let fragment = render_detached(steps, cx)?;
                        cx.scope.set(name.clone(), fragment);
                    }
                }
                (None, None) => {}
            }
            Ok(())
        }))
    }

    fn compile_if(&mut self, chain: &IfChain) -> Result<Step, CompileError> {
        let condition = self.exprs.compile(&chain.condition)?;
        let body = self.compile_nodes(&chain.body)?;
        let mut elifs = Vec::with_capacity(chain.elifs.len());
        for elif in &chain.elifs {
            let condition = self.exprs.compile(&elif.condition)?;
            let body = self.compile_nodes(&elif.body)?;
            elifs.push((condition, body));
        }
        let else_body = chain
            .else_body
            .as_deref()
            .map(|body| self.compile_nodes(body))
            .transpose()?;
        Ok(Box::new(move |out, cx| {
            if condition(&cx.scope).truthy() {
                return run_steps(&body, out, cx);
            }
            for (condition, body) in &elifs {
                if condition(&cx.scope).truthy() {
                    return run_steps(body, out, cx);
                }
            }
            if let Some(body) = &else_body {
                run_steps(body, out, cx)?;
            }
            Ok(())
        }))
    }

    fn compile_component(&mut self, name: &str, props: &[Attr]) -> Result<Step, CompileError> {
        let mut plan: Vec<(String, AttrPart)> = Vec::with_capacity(props.len());
        for prop in props {
            let part = match &prop.value {
                AttrSource::Literal(v) => AttrPart::Lit(v.clone()),
                AttrSource::Expr(src) => AttrPart::Dyn(self.exprs.compile(src)?),
            };
            plan.push((prop.name.clone(), part));
        }
        let key = self.next_key();
        let name = name.to_string();
        Ok(Box::new(move |out, cx| {
            let mut props = HashMap::new();
            for (prop, part) in &plan {
                let value = match part {
                    AttrPart::Lit(v) => Value::Str(v.clone()),
                    AttrPart::Dyn(f) => f(&cx.scope),
                };
                props.insert(prop.clone(), value);
            }
            let mut node = cx
                .rt
                .instantiate(&cx.data, &name, &cx.scope, Value::Map(props))?;
            node.set_key(key.clone());
            out.push(node);
            Ok(())
        }))
    }

    fn compile_repeat(&mut self, list: &str, var: &str, body: &[Ast]) -> Result<Step, CompileError> {
        let list_fn = self.exprs.compile(list)?;
        let key = self.next_key();
        let body_steps = self.compile_nodes(body)?;
        let var = var.to_string();
        Ok(Box::new(move |out, cx| {
            let items = match list_fn(&cx.scope) {
                Value::List(items) => items,
                Value::Undefined | Value::Null => Vec::new(),
                other => {
                    tracing::debug!(target: "strix::compile", value = ?other, "repeat over non-list renders nothing");
                    Vec::new()
                }
            };
            let mut outer = VMulti {
                key: Some(key.clone()),
                children: Vec::with_capacity(items.len()),
            };
            let count = items.len();
            for (index, item) in items.into_iter().enumerate() {
                let iteration = cx.scope.fork();
                iteration.set(var.clone(), item);
                iteration.set(format!("{var}_index"), Value::Int(index as i64));
                iteration.set(format!("{var}_first"), Value::Bool(index == 0));
                iteration.set(format!("{var}_last"), Value::Bool(index + 1 == count));
                let mut inner = VMulti {
                    key: Some(Key::Num(index as u32)),
                    children: Vec::new(),
                };
                let saved = std::mem::replace(&mut cx.scope, iteration);
                let result = run_steps(&body_steps, &mut inner.children, cx);
                cx.scope = saved;
                result?;
                outer.children.push(VNode::Multi(inner));
            }
            out.push(VNode::Multi(outer));
            Ok(())
        }))
    }
}

fn eval_attr(parts: &[AttrPart], scope: &Scope) -> strix_dom::AttrValue {
    use strix_dom::AttrValue;
    if let [part] = parts {
        return match part {
            AttrPart::Lit(v) => AttrValue::Str(v.clone()),
            AttrPart::Dyn(f) => match f(scope) {
                Value::Undefined | Value::Null => AttrValue::Null,
                Value::Bool(b) => AttrValue::Bool(b),
                other => AttrValue::Str(other.to_text()),
            },
        };
    }
    let joined = parts
        .iter()
        .map(|part| match part {
            AttrPart::Lit(v) => v.clone(),
            AttrPart::Dyn(f) => f(scope).to_text(),
        })
        .collect::<Vec<_>>()
        .join(" ");
    strix_dom::AttrValue::Str(joined)
}

fn render_detached(steps: &[Step], cx: &mut RenderCx<'_>) -> Result<Value, RenderError> {
    let mut nodes = Vec::new();
    run_steps(steps, &mut nodes, cx)?;
    Ok(Value::Fragment(Rc::new(nodes)))
}
