//! Component definitions.
//!
//! A component is resolved once, at instantiation, through an explicit tagged
//! definition: a plain [`FunctionComponent`] record, or a [`View`] trait
//! object for class-style components that want behavior attached. Both are
//! thin data holders; the engine does the work.

use std::collections::HashMap;
use std::rc::Rc;

use strix_template::Value;

pub type ComponentMap = HashMap<String, ComponentDef>;

/// Setup result: a context ready to render with, or a job the scheduler runs
/// on a later turn before the render body may start.
pub enum Setup {
    Ready(Value),
    Deferred(DeferredSetup),
}

pub type DeferredSetup = Box<dyn FnOnce() -> Result<Value, String>>;

pub type SetupFn = Rc<dyn Fn(&Value, &Value) -> Result<Setup, String>>;

pub struct FunctionComponent {
    pub name: String,
    /// Name of this component's template in the engine's `TemplateSet`.
    pub template: String,
    pub components: ComponentMap,
    pub setup: Option<SetupFn>,
}

impl FunctionComponent {
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            template: template.into(),
            components: ComponentMap::new(),
            setup: None,
        }
    }

    pub fn with_setup(
        mut self,
        setup: impl Fn(&Value, &Value) -> Result<Setup, String> + 'static,
    ) -> Self {
        self.setup = Some(Rc::new(setup));
        self
    }

    pub fn with_component(mut self, name: impl Into<String>, def: ComponentDef) -> Self {
        self.components.insert(name.into(), def);
        self
    }
}

/// Class-style component definition.
pub trait View {
    fn name(&self) -> &str;
    fn template(&self) -> &str;

    fn components(&self) -> ComponentMap {
        ComponentMap::new()
    }

    fn setup(&self, props: &Value, env: &Value) -> Result<Setup, String> {
        let _ = (props, env);
        Ok(Setup::Ready(Value::Map(HashMap::new())))
    }
}

#[derive(Clone)]
pub enum ComponentDef {
    Function(Rc<FunctionComponent>),
    View(Rc<dyn View>),
}

impl ComponentDef {
    pub fn function(component: FunctionComponent) -> Self {
        ComponentDef::Function(Rc::new(component))
    }

    pub fn view(view: impl View + 'static) -> Self {
        ComponentDef::View(Rc::new(view))
    }

    pub fn name(&self) -> &str {
        match self {
            ComponentDef::Function(f) => &f.name,
            ComponentDef::View(v) => v.name(),
        }
    }

    pub fn template(&self) -> &str {
        match self {
            ComponentDef::Function(f) => &f.template,
            ComponentDef::View(v) => v.template(),
        }
    }

    pub fn components(&self) -> ComponentMap {
        match self {
            ComponentDef::Function(f) => f.components.clone(),
            ComponentDef::View(v) => v.components(),
        }
    }

    pub fn run_setup(&self, props: &Value, env: &Value) -> Result<Setup, String> {
        match self {
            ComponentDef::Function(f) => match &f.setup {
                Some(setup) => setup(props, env),
                None => Ok(Setup::Ready(Value::Map(HashMap::new()))),
            },
            ComponentDef::View(v) => v.setup(props, env),
        }
    }

    /// Wrap the definition so it can travel through a render context and be
    /// resolved by name at instantiation time.
    pub fn into_value(&self) -> Value {
        Value::Opaque(Rc::new(self.clone()))
    }

    pub fn from_value(value: &Value) -> Option<ComponentDef> {
        match value {
            Value::Opaque(any) => any.downcast_ref::<ComponentDef>().cloned(),
            _ => None,
        }
    }
}
