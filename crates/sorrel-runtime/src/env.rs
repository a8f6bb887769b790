//! Lexically scoped environments.
//!
//! An [`Env`] is a shared, mutable frame with an optional parent. Closures
//! capture the frame by reference, so a binding mutated in the enclosing
//! frame is observable inside the closure. Besides name bindings, a frame
//! carries context slots: the source filename and a dev-log handle; lookup
//! of either walks the parent chain.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::devlog::DevLog;
use crate::value::Value;

struct Frame {
    vars: HashMap<String, Value>,
    parent: Option<Env>,
    filename: Option<String>,
    dev_log: Option<Rc<dyn DevLog>>,
}

/// A lexical scope frame, cheaply cloneable by reference.
#[derive(Clone)]
pub struct Env {
    inner: Rc<RefCell<Frame>>,
}

impl Env {
    /// Creates a root environment.
    #[must_use]
    pub fn new() -> Self {
        Self {
            inner: Rc::new(RefCell::new(Frame {
                vars: HashMap::new(),
                parent: None,
                filename: None,
                dev_log: None,
            })),
        }
    }

    /// Creates a child frame enclosing this one.
    #[must_use]
    pub fn enclosed(&self) -> Self {
        Self {
            inner: Rc::new(RefCell::new(Frame {
                vars: HashMap::new(),
                parent: Some(self.clone()),
                filename: None,
                dev_log: None,
            })),
        }
    }

    /// Looks up a name, walking the parent chain.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<Value> {
        let frame = self.inner.borrow();
        if let Some(value) = frame.vars.get(name) {
            return Some(value.clone());
        }
        frame.parent.as_ref().and_then(|p| p.get(name))
    }

    /// Binds a name in the current frame, shadowing outer bindings.
    pub fn set(&self, name: impl Into<String>, value: Value) {
        self.inner.borrow_mut().vars.insert(name.into(), value);
    }

    /// Rebinds an existing name in the nearest frame that holds it.
    /// Returns false when the name is unbound everywhere.
    pub fn assign(&self, name: &str, value: Value) -> bool {
        let mut frame = self.inner.borrow_mut();
        if let Some(slot) = frame.vars.get_mut(name) {
            *slot = value;
            return true;
        }
        match &frame.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    /// Returns the source filename, walking the parent chain.
    #[must_use]
    pub fn filename(&self) -> Option<String> {
        let frame = self.inner.borrow();
        frame
            .filename
            .clone()
            .or_else(|| frame.parent.as_ref().and_then(Env::filename))
    }

    /// Sets the source filename of this frame.
    pub fn set_filename(&self, filename: impl Into<String>) {
        self.inner.borrow_mut().filename = Some(filename.into());
    }

    /// Returns the dev-log handle, walking the parent chain.
    #[must_use]
    pub fn dev_log(&self) -> Option<Rc<dyn DevLog>> {
        let frame = self.inner.borrow();
        frame
            .dev_log
            .clone()
            .or_else(|| frame.parent.as_ref().and_then(Env::dev_log))
    }

    /// Attaches a dev-log handle to this frame.
    pub fn set_dev_log(&self, log: Rc<dyn DevLog>) {
        self.inner.borrow_mut().dev_log = Some(log);
    }

    /// Returns whether two handles refer to the same frame.
    #[must_use]
    pub fn same_frame(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }

    /// Collects every name visible from this frame, innermost first.
    /// Used for "did you mean" suggestions on unresolved identifiers.
    #[must_use]
    pub fn visible_names(&self) -> Vec<String> {
        let mut out = Vec::new();
        let mut frame = Some(self.clone());
        while let Some(env) = frame {
            let inner = env.inner.borrow();
            out.extend(inner.vars.keys().cloned());
            frame = inner.parent.clone();
        }
        out
    }

    /// Collects every table binding visible from this frame, innermost
    /// first. Used to locate bindings for eager-loaded relations and for
    /// transaction handles.
    #[must_use]
    pub fn visible_bindings(&self) -> Vec<crate::binding::TableBinding> {
        let mut out = Vec::new();
        let mut frame = Some(self.clone());
        while let Some(env) = frame {
            let inner = env.inner.borrow();
            for value in inner.vars.values() {
                if let Value::Binding(binding) = value {
                    out.push(binding.clone());
                }
            }
            frame = inner.parent.clone();
        }
        out
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let frame = self.inner.borrow();
        f.debug_struct("Env")
            .field("names", &frame.vars.keys().collect::<Vec<_>>())
            .field("has_parent", &frame.parent.is_some())
            .finish()
    }
}
