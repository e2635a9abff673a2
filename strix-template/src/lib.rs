//! Template compilation for the strix rendering engine.
//!
//! A parsed template [`ast::Ast`] is lowered once into a [`compile::Program`]:
//! a tree of step closures that, executed against a render [`scope::Scope`],
//! populates a fresh virtual tree. The markup parser itself is an external
//! collaborator; this crate starts at its output.

pub mod ast;
pub mod compile;
pub mod error;
pub mod expr;
pub mod registry;
pub mod scope;
pub mod value;

pub use ast::{Ast, Attr, AttrSource};
pub use compile::{NullRuntime, Program, Runtime, compile};
pub use error::{CompileError, RenderError};
pub use expr::{ExprCompiler, ExprFn, PathExprCompiler};
pub use registry::TemplateSet;
pub use scope::Scope;
pub use value::{Value, vdom_to_string};
