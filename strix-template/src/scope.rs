//! Layered render contexts.
//!
//! A `Scope` is a mutable name → value map with an optional parent layer.
//! `fork` layers a fresh scope on top of the current one: reads fall through
//! to the parent, writes stay local, so sibling renders sharing the ambient
//! context are never polluted by template-variable assignments.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::value::Value;

#[derive(Clone, Default)]
pub struct Scope {
    inner: Rc<RefCell<ScopeInner>>,
}

#[derive(Default)]
struct ScopeInner {
    vars: HashMap<String, Value>,
    parent: Option<Scope>,
}

impl Scope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a scope from a map value; any other value yields an empty scope.
    pub fn from_value(value: &Value) -> Self {
        let scope = Scope::new();
        scope.merge(value);
        scope
    }

    /// Copy the entries of a map value into this scope's local layer.
    pub fn merge(&self, value: &Value) {
        if let Value::Map(entries) = value {
            let mut inner = self.inner.borrow_mut();
            for (name, value) in entries {
                inner.vars.insert(name.clone(), value.clone());
            }
        }
    }

    /// New child layer inheriting read access to this scope.
    pub fn fork(&self) -> Scope {
        Scope {
            inner: Rc::new(RefCell::new(ScopeInner {
                vars: HashMap::new(),
                parent: Some(self.clone()),
            })),
        }
    }

    pub fn get(&self, name: &str) -> Value {
        let inner = self.inner.borrow();
        if let Some(value) = inner.vars.get(name) {
            return value.clone();
        }
        match &inner.parent {
            Some(parent) => parent.get(name),
            None => Value::Undefined,
        }
    }

    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.inner.borrow_mut().vars.insert(name.into(), value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fork_reads_through_and_writes_locally() {
        let base = Scope::new();
        base.set("a", Value::Int(1));

        let child = base.fork();
        assert_eq!(child.get("a"), Value::Int(1));

        child.set("a", Value::Int(2));
        child.set("b", Value::Int(3));
        assert_eq!(child.get("a"), Value::Int(2));
        assert_eq!(base.get("a"), Value::Int(1));
        assert!(base.get("b").is_undefined());
    }

    #[test]
    fn missing_names_are_undefined() {
        assert!(Scope::new().get("nope").is_undefined());
    }
}
