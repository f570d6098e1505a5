//! Environment management for lexical scoping

use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use fnforge_core::ast::DeclKind;

use crate::error::BindingError;
use crate::value::Value;

/// A binding in the environment
#[derive(Debug, Clone)]
pub struct Binding {
    pub value: Value,
    pub mutable: bool,
    /// Declared with `let`/`const`, so redeclaration in the same scope fails
    pub lexical: bool,
}

/// Environment for variable bindings with lexical scoping
#[derive(Debug, Clone)]
pub struct Environment {
    inner: Rc<RefCell<EnvironmentInner>>,
}

#[derive(Debug)]
struct EnvironmentInner {
    bindings: FxHashMap<String, Binding>,
    parent: Option<Environment>,
    /// `var` declarations land in the nearest function scope
    function_scope: bool,
}

impl Environment {
    /// Create a new root environment
    pub fn new() -> Self {
        Self::build(None, true)
    }

    /// Create a block scope under `parent`
    pub fn with_parent(parent: Environment) -> Self {
        Self::build(Some(parent), false)
    }

    /// Create the scope of a function call under `parent`
    pub fn function_scope(parent: Environment) -> Self {
        Self::build(Some(parent), true)
    }

    fn build(parent: Option<Environment>, function_scope: bool) -> Self {
        Self {
            inner: Rc::new(RefCell::new(EnvironmentInner {
                bindings: FxHashMap::default(),
                parent,
                function_scope,
            })),
        }
    }

    /// Extend this environment with a new block scope
    pub fn extend(&self) -> Self {
        Self::with_parent(self.clone())
    }

    /// Declare a name in this scope
    pub fn declare(&self, name: &str, value: Value, kind: DeclKind) -> Result<(), BindingError> {
        if kind == DeclKind::Var {
            self.declare_var(name, Some(value));
            return Ok(());
        }

        let mut inner = self.inner.borrow_mut();
        if inner.bindings.get(name).is_some_and(|b| b.lexical) {
            return Err(BindingError::AlreadyDeclared(name.to_string()));
        }
        inner.bindings.insert(
            name.to_string(),
            Binding {
                value,
                mutable: kind != DeclKind::Const,
                lexical: true,
            },
        );
        Ok(())
    }

    /// Declare a `var` in the nearest function scope. Redeclaring without a
    /// value keeps the current one.
    pub fn declare_var(&self, name: &str, value: Option<Value>) {
        let target = self.nearest_function_scope();
        let mut inner = target.inner.borrow_mut();
        match inner.bindings.get_mut(name) {
            Some(binding) => {
                if let Some(value) = value {
                    binding.value = value;
                }
            }
            None => {
                inner.bindings.insert(
                    name.to_string(),
                    Binding {
                        value: value.unwrap_or(Value::Undefined),
                        mutable: true,
                        lexical: false,
                    },
                );
            }
        }
    }

    /// Bind a name unconditionally in this scope (parameters, hoisted
    /// functions, builtins)
    pub fn define(&self, name: &str, value: Value) {
        self.inner.borrow_mut().bindings.insert(
            name.to_string(),
            Binding {
                value,
                mutable: true,
                lexical: false,
            },
        );
    }

    /// Update an existing binding, searching outwards
    pub fn assign(&self, name: &str, value: Value) -> Result<(), BindingError> {
        let mut inner = self.inner.borrow_mut();

        if let Some(binding) = inner.bindings.get_mut(name) {
            if !binding.mutable {
                return Err(BindingError::ConstAssignment(name.to_string()));
            }
            binding.value = value;
            return Ok(());
        }

        if let Some(parent) = inner.parent.clone() {
            drop(inner);
            parent.assign(name, value)
        } else {
            Err(BindingError::Undefined(name.to_string()))
        }
    }

    /// Look up a variable
    pub fn lookup(&self, name: &str) -> Option<Value> {
        let inner = self.inner.borrow();

        if let Some(binding) = inner.bindings.get(name) {
            return Some(binding.value.clone());
        }

        match inner.parent.clone() {
            Some(parent) => {
                drop(inner);
                parent.lookup(name)
            }
            None => None,
        }
    }

    /// The outermost environment of the chain
    pub fn root(&self) -> Environment {
        let mut current = self.clone();
        loop {
            let parent = current.inner.borrow().parent.clone();
            match parent {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Copy of this scope's bindings under the same parent. Loops use it to
    /// give every iteration its own `let` bindings.
    pub fn fork(&self) -> Environment {
        let inner = self.inner.borrow();
        Self {
            inner: Rc::new(RefCell::new(EnvironmentInner {
                bindings: inner.bindings.clone(),
                parent: inner.parent.clone(),
                function_scope: inner.function_scope,
            })),
        }
    }

    fn nearest_function_scope(&self) -> Environment {
        let mut current = self.clone();
        loop {
            let next = {
                let inner = current.inner.borrow();
                if inner.function_scope {
                    None
                } else {
                    inner.parent.clone()
                }
            };
            match next {
                Some(parent) => current = parent,
                None => return current,
            }
        }
    }

    /// Drop every binding of this scope
    pub fn clear(&self) {
        self.inner.borrow_mut().bindings.clear();
    }

    pub fn size(&self) -> usize {
        self.inner.borrow().bindings.len()
    }

    /// Get the depth of the environment chain
    pub fn depth(&self) -> usize {
        let inner = self.inner.borrow();
        match &inner.parent {
            Some(parent) => 1 + parent.depth(),
            None => 1,
        }
    }

    fn downgrade(&self) -> Weak<RefCell<EnvironmentInner>> {
        Rc::downgrade(&self.inner)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Tracks scopes created during a run so reference cycles between closures
/// and the scopes that hold them can be broken when the run ends
#[derive(Debug, Default)]
pub struct ScopeRegistry {
    scopes: Vec<Weak<RefCell<EnvironmentInner>>>,
    prune_at: usize,
}

const MIN_PRUNE_THRESHOLD: usize = 1024;

impl ScopeRegistry {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            prune_at: MIN_PRUNE_THRESHOLD,
        }
    }

    pub fn register(&mut self, env: &Environment) {
        self.scopes.push(env.downgrade());
        if self.scopes.len() >= self.prune_at {
            self.scopes.retain(|scope| scope.strong_count() > 0);
            self.prune_at = (self.scopes.len() * 2).max(MIN_PRUNE_THRESHOLD);
        }
    }

    pub fn len(&self) -> usize {
        self.scopes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scopes.is_empty()
    }

    /// Clear every live scope, releasing captured values
    pub fn release(&mut self) {
        for scope in self.scopes.drain(..) {
            if let Some(inner) = scope.upgrade() {
                if let Ok(mut inner) = inner.try_borrow_mut() {
                    inner.bindings.clear();
                }
            }
        }
    }
}
