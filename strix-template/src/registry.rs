//! Explicitly owned template registry.
//!
//! Templates are registered as parsed ASTs under a name and compiled lazily
//! on first use; the compiled program is cached for the registry's lifetime.
//! The registry is created by the host, lives as long as the engine, and is
//! passed by reference wherever template lookup is needed.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::Rc;

use tracing::debug;

use crate::ast::Ast;
use crate::compile::{Program, compile};
use crate::error::CompileError;
use crate::expr::{ExprCompiler, PathExprCompiler};

pub struct TemplateSet {
    exprs: Rc<dyn ExprCompiler>,
    templates: RefCell<HashMap<String, Vec<Ast>>>,
    compiled: RefCell<HashMap<String, Rc<Program>>>,
    next_anon: Cell<u32>,
}

impl TemplateSet {
    pub fn new() -> Self {
        Self::with_exprs(Rc::new(PathExprCompiler))
    }

    pub fn with_exprs(exprs: Rc<dyn ExprCompiler>) -> Self {
        Self {
            exprs,
            templates: RefCell::new(HashMap::new()),
            compiled: RefCell::new(HashMap::new()),
            next_anon: Cell::new(1),
        }
    }

    /// Register a template under a name. Re-registering drops any cached
    /// compilation.
    pub fn add(&self, name: impl Into<String>, ast: Vec<Ast>) {
        let name = name.into();
        self.compiled.borrow_mut().remove(&name);
        self.templates.borrow_mut().insert(name, ast);
    }

    /// Register an unnamed template and return its generated name.
    pub fn add_anonymous(&self, ast: Vec<Ast>) -> String {
        let id = self.next_anon.get();
        self.next_anon.set(id + 1);
        let name = format!("__template__{id}");
        self.add(name.clone(), ast);
        name
    }

    pub fn contains(&self, name: &str) -> bool {
        self.templates.borrow().contains_key(name)
    }

    /// Compiled program for a registered template, compiling on first use.
    pub fn program(&self, name: &str) -> Result<Rc<Program>, CompileError> {
        if let Some(program) = self.compiled.borrow().get(name) {
            return Ok(program.clone());
        }
        let templates = self.templates.borrow();
        let ast = templates
            .get(name)
            .ok_or_else(|| CompileError::UnknownTemplate(name.to_string()))?;
        let program = Rc::new(compile(name, ast, &*self.exprs)?);
        debug!(target: "strix::registry", template = name, "compiled and cached");
        self.compiled
            .borrow_mut()
            .insert(name.to_string(), program.clone());
        Ok(program)
    }
}

impl Default for TemplateSet {
    fn default() -> Self {
        Self::new()
    }
}
