//! Lexically scoped environments: a chain of reference-counted frames.
//!
//! The chain forms a tree — frames are shared by closures but never
//! cyclic, so child-to-parent links are strong references.

use crate::values::MObject;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

pub type Env = Rc<RefCell<Environment>>;

#[derive(Debug)]
pub struct Environment {
    enclosing: Option<Env>,
    vars: IndexMap<String, MObject>,
    /// Marks the prelude frame; `import` stops flattening here.
    startup: bool,
}

impl Environment {
    pub fn new() -> Env {
        Rc::new(RefCell::new(Environment {
            enclosing: None,
            vars: IndexMap::new(),
            startup: false,
        }))
    }

    pub fn with_enclosing(enclosing: &Env) -> Env {
        Rc::new(RefCell::new(Environment {
            enclosing: Some(Rc::clone(enclosing)),
            vars: IndexMap::new(),
            startup: false,
        }))
    }

    pub fn enclosing(&self) -> Option<Env> {
        self.enclosing.clone()
    }

    pub fn is_startup(&self) -> bool {
        self.startup
    }

    pub fn mark_startup(&mut self) {
        self.startup = true;
    }

    pub fn vars(&self) -> &IndexMap<String, MObject> {
        &self.vars
    }

    /// Bind a name in this frame, shadowing any outer binding.
    pub fn define(&mut self, key: &str, value: MObject) {
        self.vars.insert(key.to_string(), value);
    }

    /// Rebind an existing name, walking outward; fails if the name is
    /// nowhere defined.
    pub fn set(env: &Env, key: &str, value: MObject) -> bool {
        let mut value = Some(value);
        let mut current = Rc::clone(env);
        loop {
            let next = {
                let mut frame = current.borrow_mut();
                if frame.vars.contains_key(key) {
                    if let Some(value) = value.take() {
                        frame.vars.insert(key.to_string(), value);
                    }
                    return true;
                }
                frame.enclosing.clone()
            };
            match next {
                Some(outer) => current = outer,
                None => return false,
            }
        }
    }

    /// Look a name up, walking outward.
    pub fn get(env: &Env, key: &str) -> Option<MObject> {
        let mut current = Rc::clone(env);
        loop {
            let next = {
                let frame = current.borrow();
                if let Some(value) = frame.vars.get(key) {
                    return Some(value.clone());
                }
                frame.enclosing.clone()
            };
            match next {
                Some(outer) => current = outer,
                None => return None,
            }
        }
    }

    /// The nearest startup frame at or above `env`, or the root frame.
    pub fn startup_frame(env: &Env) -> Env {
        let mut current = Rc::clone(env);
        loop {
            let next = {
                let frame = current.borrow();
                if frame.startup {
                    return Rc::clone(&current);
                }
                frame.enclosing.clone()
            };
            match next {
                Some(outer) => current = outer,
                None => return current,
            }
        }
    }

    /// Collect every binding from `env` down to (but excluding) the first
    /// startup frame; inner bindings shadow outer ones.
    pub fn flattened(env: &Env) -> IndexMap<String, MObject> {
        let mut flat = IndexMap::new();
        let mut current = Rc::clone(env);
        loop {
            let next = {
                let frame = current.borrow();
                if frame.startup {
                    return flat;
                }
                for (key, value) in &frame.vars {
                    if !flat.contains_key(key) {
                        flat.insert(key.clone(), value.clone());
                    }
                }
                frame.enclosing.clone()
            };
            match next {
                Some(outer) => current = outer,
                None => return flat,
            }
        }
    }
}
