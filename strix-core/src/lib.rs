//! Fiber, scheduler and orchestration layer of the strix rendering engine.
//!
//! Rendering is cooperative and single-threaded: render bodies and deferred
//! component setups run as tasks on the [`Scheduler`]; a [`Fiber`] counts the
//! outstanding work of one logical render, and the commit against the output
//! surface happens exactly once per settled fiber.

pub mod completion;
pub mod component;
pub mod engine;
pub mod fiber;
pub mod scheduler;

pub use completion::Completion;
pub use component::{ComponentDef, ComponentMap, FunctionComponent, Setup, SetupFn, View};
pub use engine::{Engine, MountOptions, Mounted};
pub use fiber::Fiber;
pub use scheduler::Scheduler;

pub use strix_template::{RenderError, Scope, TemplateSet, Value};
