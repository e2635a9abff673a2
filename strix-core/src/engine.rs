//! The rendering engine: mount and re-render orchestration.
//!
//! Every logical render follows the same path: instantiate (resolve the
//! definition, compile or look up its program, run setup), defer the render
//! body to the scheduler, and commit exactly once when the render's fiber
//! settles. The initial commit builds the tree under the mount target; a
//! re-render commit reconciles the live tree against the fresh candidate.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::rc::Rc;

use strix_dom::{NodeId, Position, Surface, VNode, VRoot, build_tree, patch_root};
use strix_template::{Program, RenderError, Runtime, Scope, TemplateSet, Value};
use tracing::{debug, trace};

use crate::completion::Completion;
use crate::component::{ComponentDef, ComponentMap, Setup};
use crate::fiber::Fiber;
use crate::scheduler::Scheduler;

pub struct MountOptions {
    pub props: Value,
    pub env: Value,
}

impl Default for MountOptions {
    fn default() -> Self {
        Self {
            props: Value::Map(Default::default()),
            env: Value::Map(Default::default()),
        }
    }
}

/// Render payload attached to every component root.
pub(crate) struct ComponentData {
    pub(crate) name: String,
    pub(crate) program: Rc<Program>,
    /// Fiber of the current render pass; replaced on every re-render.
    pub(crate) fiber: RefCell<Rc<Fiber>>,
    pub(crate) components: ComponentMap,
    pub(crate) scope: RefCell<Scope>,
}

/// Handle to a mounted component: the live tree, its render context, and the
/// root-level surface node reported by the create hook.
#[derive(Clone)]
pub struct Mounted {
    tree: Rc<RefCell<VRoot>>,
    scope: Scope,
    el: Rc<Cell<Option<NodeId>>>,
}

impl std::fmt::Debug for Mounted {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Mounted")
            .field("el", &self.el.get())
            .finish_non_exhaustive()
    }
}

impl Mounted {
    pub fn tree(&self) -> &Rc<RefCell<VRoot>> {
        &self.tree
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn el(&self) -> Option<NodeId> {
        self.el.get()
    }
}

struct Instance {
    tree: Rc<RefCell<VRoot>>,
    fiber: Rc<Fiber>,
    scope: Scope,
    el: Rc<Cell<Option<NodeId>>>,
}

struct EngineInner {
    templates: Rc<TemplateSet>,
    scheduler: Rc<Scheduler>,
    surface: Rc<RefCell<dyn Surface>>,
}

#[derive(Clone)]
pub struct Engine {
    inner: Rc<EngineInner>,
}

impl Engine {
    pub fn new(templates: Rc<TemplateSet>, surface: Rc<RefCell<dyn Surface>>) -> Engine {
        Engine {
            inner: Rc::new(EngineInner {
                templates,
                scheduler: Rc::new(Scheduler::new()),
                surface,
            }),
        }
    }

    pub fn templates(&self) -> &Rc<TemplateSet> {
        &self.inner.templates
    }

    pub fn scheduler(&self) -> &Rc<Scheduler> {
        &self.inner.scheduler
    }

    /// Drive the scheduler to quiescence.
    pub fn flush(&self) {
        self.inner.scheduler.flush();
    }

    /// Run a single scheduler turn.
    pub fn tick(&self) -> bool {
        self.inner.scheduler.tick()
    }

    /// Mount a component under a surface node. The returned completion
    /// resolves after the render settles and the initial build committed;
    /// nothing touches the surface before that.
    pub fn mount(
        &self,
        target: NodeId,
        def: &ComponentDef,
        options: MountOptions,
    ) -> Completion<Mounted> {
        if !self.inner.surface.borrow().contains(target) {
            return Completion::rejected(RenderError::Target(format!(
                "no such surface node: {target:?}"
            )));
        }
        debug!(target: "strix::engine", component = def.name(), "mount requested");
        let instance = match self.instantiate_def(def, options.props, options.env, None) {
            Ok(instance) => instance,
            Err(error) => return Completion::rejected(error),
        };
        let done = Completion::new();
        let completion = done.clone();
        let surface = self.inner.surface.clone();
        let mounted = Mounted {
            tree: instance.tree.clone(),
            scope: instance.scope.clone(),
            el: instance.el.clone(),
        };
        let tree = instance.tree;
        self.inner
            .scheduler
            .add_fiber(&instance.fiber, move |result| match result {
                Err(error) => completion.resolve(Err(error)),
                Ok(()) => {
                    debug!(target: "strix::engine", "committing initial build");
                    let mut surface = surface.borrow_mut();
                    let mut node = VNode::Root(tree);
                    match build_tree(&mut node, &mut *surface, target, Position::Append, &[]) {
                        Ok(()) => completion.resolve(Ok(mounted)),
                        Err(error) => completion.resolve(Err(error.into())),
                    }
                }
            });
        done
    }

    /// Re-render a mounted component: a fresh candidate tree is rendered
    /// through a new fiber and reconciled against the live tree at
    /// settlement.
    pub fn rerender(&self, mounted: &Mounted) -> Completion<()> {
        let live = mounted.tree.clone();
        let Some(data) = component_data(&live) else {
            return Completion::rejected(RenderError::Target(
                "mounted tree has no component payload".to_string(),
            ));
        };
        debug!(target: "strix::engine", component = %data.name, "re-render requested");
        let fiber = Fiber::new(None);
        *data.fiber.borrow_mut() = fiber.clone();
        let candidate = VRoot::shared(live.borrow().data.clone());
        candidate.borrow_mut().create_hook = live.borrow().create_hook.clone();
        self.defer_render(&candidate, &fiber);

        let done = Completion::new();
        let completion = done.clone();
        let surface = self.inner.surface.clone();
        self.inner.scheduler.add_fiber(&fiber, move |result| match result {
            Err(error) => completion.resolve(Err(error)),
            Ok(()) => {
                debug!(target: "strix::engine", "committing re-render patch");
                let mut surface = surface.borrow_mut();
                match patch_root(&live, &candidate, &mut *surface) {
                    Ok(()) => completion.resolve(Ok(())),
                    Err(error) => completion.resolve(Err(error.into())),
                }
            }
        });
        done
    }

    fn instantiate_def(
        &self,
        def: &ComponentDef,
        props: Value,
        env: Value,
        parent: Option<&Rc<Fiber>>,
    ) -> Result<Instance, RenderError> {
        let name = def.name().to_string();
        let program = self.inner.templates.program(def.template())?;
        let fiber = Fiber::new(parent);
        let scope = Scope::new();
        scope.set("props", props.clone());
        scope.set("env", env.clone());
        let data = Rc::new(ComponentData {
            name: name.clone(),
            program,
            fiber: RefCell::new(fiber.clone()),
            components: def.components(),
            scope: RefCell::new(scope.clone()),
        });
        let payload: Rc<dyn Any> = data;
        let tree = VRoot::shared(payload);
        let el = Rc::new(Cell::new(None));
        {
            let el = el.clone();
            tree.borrow_mut().create_hook = Some(Rc::new(move |node| el.set(Some(node))));
        }

        let setup = def
            .run_setup(&props, &env)
            .map_err(|reason| RenderError::Setup {
                component: name.clone(),
                reason,
            })?;
        match setup {
            Setup::Ready(context) => {
                scope.merge(&context);
                self.defer_render(&tree, &fiber);
            }
            Setup::Deferred(job) => {
                trace!(target: "strix::engine", component = %name, "setup deferred");
                fiber.retain();
                let this = self.clone();
                let setup_fiber = fiber.clone();
                let setup_tree = tree.clone();
                let setup_scope = scope.clone();
                self.inner.scheduler.defer(move || match job() {
                    Ok(context) => {
                        setup_scope.merge(&context);
                        this.defer_render(&setup_tree, &setup_fiber);
                        setup_fiber.release();
                    }
                    Err(reason) => setup_fiber.fail(RenderError::Setup {
                        component: name,
                        reason,
                    }),
                });
            }
        }
        Ok(Instance {
            tree,
            fiber,
            scope,
            el,
        })
    }

    /// Enqueue a render body; it releases the fiber on success and fails it
    /// on error.
    fn defer_render(&self, tree: &Rc<RefCell<VRoot>>, fiber: &Rc<Fiber>) {
        let this = self.clone();
        let tree = tree.clone();
        let fiber = fiber.clone();
        self.inner.scheduler.defer(move || {
            let Some(data) = component_data(&tree) else {
                fiber.fail(RenderError::Target(
                    "render payload is not a component".to_string(),
                ));
                return;
            };
            let scope = data.scope.borrow().clone();
            trace!(target: "strix::engine", component = %data.name, fiber = fiber.id(), "render body");
            match data.program.render(&tree, &scope, &this) {
                Ok(()) => fiber.release(),
                Err(error) => fiber.fail(error),
            }
        });
    }
}

impl Runtime for Engine {
    fn instantiate(
        &self,
        parent: &Rc<dyn Any>,
        name: &str,
        scope: &Scope,
        props: Value,
    ) -> Result<VNode, RenderError> {
        let parent_data = parent
            .clone()
            .downcast::<ComponentData>()
            .map_err(|_| RenderError::Target("render payload is not a component".to_string()))?;
        // definition lookup: render context first, then the component's own
        // registered sub-components
        let def = match ComponentDef::from_value(&scope.get(name)) {
            Some(def) => def,
            None => parent_data
                .components
                .get(name)
                .cloned()
                .ok_or_else(|| RenderError::UnknownComponent(name.to_string()))?,
        };
        let env = scope.get("env");
        let parent_fiber = parent_data.fiber.borrow().clone();
        let instance = self.instantiate_def(&def, props, env, Some(&parent_fiber))?;
        Ok(VNode::Root(instance.tree))
    }
}

pub(crate) fn component_data(tree: &Rc<RefCell<VRoot>>) -> Option<Rc<ComponentData>> {
    tree.borrow().data.clone().downcast::<ComponentData>().ok()
}
