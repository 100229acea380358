//! Runtime values.
//!
//! Every value is an `MObject`: a plain data value, a first-class type, or
//! a callable. Containers are reference counted and mutated in place, so
//! every alias observes pushes, pops and member writes. Function equality
//! is pointer identity.

use crate::ast::{FunctionDef, TypeExpr};
use crate::env::Env;
use crate::interpreter::{Interpreter, Interrupt};
use crate::tokens::Token;
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

#[derive(Debug, Clone)]
pub enum MObject {
    Value(MValue),
    Type(MType),
    Function(Rc<FunctionValue>),
}

/// A plain data value with an optional annotation string.
#[derive(Debug, Clone)]
pub struct MValue {
    pub value: Value,
    pub annotation: Option<Rc<str>>,
}

#[derive(Debug, Clone)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Num(f64),
    Str(Rc<str>),
    Array(Rc<RefCell<Vec<MObject>>>),
    Map(Rc<RefCell<IndexMap<String, MObject>>>),
}

impl MValue {
    pub fn new(value: Value) -> Self {
        Self {
            value,
            annotation: None,
        }
    }

    pub fn null() -> Self {
        Self::new(Value::Null)
    }

    pub fn with_annotation(value: Value, annotation: &str) -> Self {
        Self {
            value,
            annotation: Some(Rc::from(annotation)),
        }
    }
}

impl MObject {
    pub fn null() -> Self {
        MObject::Value(MValue::null())
    }

    pub fn bool(value: bool) -> Self {
        MObject::Value(MValue::new(Value::Bool(value)))
    }

    pub fn int(value: i64) -> Self {
        MObject::Value(MValue::new(Value::Int(value)))
    }

    pub fn num(value: f64) -> Self {
        MObject::Value(MValue::new(Value::Num(value)))
    }

    pub fn str(value: &str) -> Self {
        MObject::Value(MValue::new(Value::Str(Rc::from(value))))
    }

    pub fn array(items: Vec<MObject>) -> Self {
        MObject::Value(MValue::new(Value::Array(Rc::new(RefCell::new(items)))))
    }

    pub fn map(entries: IndexMap<String, MObject>) -> Self {
        MObject::Value(MValue::new(Value::Map(Rc::new(RefCell::new(entries)))))
    }

    /// Null annotated with a failure reason; the oracle and several
    /// natives report recoverable errors this way.
    pub fn annotated_null(reason: &str) -> Self {
        MObject::Value(MValue::with_annotation(Value::Null, reason))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, MObject::Value(MValue { value: Value::Null, .. }))
    }

    pub fn annotation(&self) -> Option<Rc<str>> {
        match self {
            MObject::Value(v) => v.annotation.clone(),
            MObject::Type(t) => t.annotation.clone(),
            MObject::Function(f) => f.annotation.borrow().clone(),
        }
    }

    /// Attach an annotation. Function annotations write through the shared
    /// slot; value and type annotations are carried on this handle.
    pub fn set_annotation(&mut self, note: Option<Rc<str>>) {
        match self {
            MObject::Value(v) => v.annotation = note,
            MObject::Type(t) => t.annotation = note,
            MObject::Function(f) => *f.annotation.borrow_mut() = note,
        }
    }
}

/// A first-class structural type: a canonical `TypeExpr` plus the
/// environment its identifier references resolve in.
#[derive(Clone)]
pub struct MType {
    pub definition: Rc<TypeExpr>,
    pub env: Env,
    pub annotation: Option<Rc<str>>,
}

// The environment back-reference can reach this very type again, so the
// derived Debug would not terminate.
impl fmt::Debug for MType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<type {}>", crate::printer::print_type(&self.definition))
    }
}

impl MType {
    pub fn new(definition: Rc<TypeExpr>, env: Env) -> Self {
        let annotation = definition.annotation().map(Rc::from);
        Self {
            definition,
            env,
            annotation,
        }
    }
}

/// How a callable produces its result.
pub enum FunctionKind {
    /// User function: the definition body is a block evaluated over the
    /// closure environment.
    User,
    /// Host-provided operation.
    Native(Box<dyn NativeCallable>),
    /// LLM-backed oracle.
    Oracle(OracleSpec),
    /// Partial application: `applied` holds the argument prefix, `root`
    /// the original callable.
    Partial {
        root: Rc<FunctionValue>,
        applied: Vec<MObject>,
    },
}

impl fmt::Debug for FunctionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FunctionKind::User => write!(f, "User"),
            FunctionKind::Native(_) => write!(f, "Native"),
            FunctionKind::Oracle(_) => write!(f, "Oracle"),
            FunctionKind::Partial { .. } => write!(f, "Partial"),
        }
    }
}

/// Precomputed artifacts of an oracle function.
#[derive(Debug, Clone)]
pub struct OracleSpec {
    /// JSON Schema of the synthetic parameter map, pretty-printed.
    pub input_schema: String,
    /// JSON Schema of the declared return type, wrapped in a
    /// `{"result": ...}` object for backends that require object roots.
    pub output_schema: serde_json::Value,
    /// BNF grammar of the declared return type for constrained decoders.
    pub output_grammar: String,
    /// Validated few-shot examples (an array of arrays).
    pub examples: MObject,
}

/// A callable value. Immutable after construction except for the
/// annotation slot.
pub struct FunctionValue {
    pub definition: Rc<FunctionDef>,
    pub closure: Env,
    pub intypes: Vec<MType>,
    pub outtype: MType,
    pub annotation: RefCell<Option<Rc<str>>>,
    pub kind: FunctionKind,
}

impl fmt::Debug for FunctionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            FunctionKind::Oracle(_) => write!(f, "<oracle>"),
            FunctionKind::Native(_) => write!(f, "<native function>"),
            _ => write!(f, "<function>"),
        }
    }
}

impl FunctionValue {
    /// Split a right-associated type chain into per-parameter input type
    /// witnesses and the return type.
    pub fn split_types(types: &Rc<TypeExpr>, nparams: usize, env: &Env) -> (Vec<MType>, MType) {
        let mut intypes = Vec::with_capacity(nparams);
        let mut rest = Rc::clone(types);
        while intypes.len() < nparams {
            match rest.as_ref() {
                TypeExpr::Binary { left, right, .. } => {
                    intypes.push(MType::new(Rc::clone(left), Rc::clone(env)));
                    rest = Rc::clone(right);
                }
                _ => break,
            }
        }
        (intypes, MType::new(rest, Rc::clone(env)))
    }

    /// The parameter names as plain strings.
    pub fn param_names(&self) -> Vec<String> {
        self.definition
            .parameters
            .iter()
            .map(|p| p.text().to_string())
            .collect()
    }
}

/// Partial application: a new function whose parameter list and type chain
/// are the suffixes of the original's, closing over the supplied prefix.
pub fn partial(func: &Rc<FunctionValue>, args: Vec<MObject>) -> Rc<FunctionValue> {
    let supplied = args.len();
    let parameters: Vec<_> = func.definition.parameters[supplied..].to_vec();
    let mut types = Rc::clone(&func.definition.types);
    for _ in 0..supplied {
        if let TypeExpr::Binary { right, .. } = types.as_ref() {
            types = Rc::clone(right);
        }
    }
    let definition = Rc::new(FunctionDef {
        operator: func.definition.operator.clone(),
        parameters,
        types,
        body: Rc::clone(&func.definition.body),
    });
    Rc::new(FunctionValue {
        definition,
        closure: Rc::clone(&func.closure),
        intypes: func.intypes[supplied..].to_vec(),
        outtype: func.outtype.clone(),
        annotation: RefCell::new(func.annotation.borrow().clone()),
        kind: FunctionKind::Partial {
            root: Rc::clone(func),
            applied: args,
        },
    })
}

/// Host operations exposed as language callables. The operator token is
/// the call site, used for error reporting.
pub trait NativeCallable {
    fn call(
        &self,
        ip: &mut Interpreter,
        operator: &Token,
        args: Vec<MObject>,
    ) -> Result<MObject, Interrupt>;
}

impl<F> NativeCallable for F
where
    F: Fn(&mut Interpreter, &Token, Vec<MObject>) -> Result<MObject, Interrupt>,
{
    fn call(
        &self,
        ip: &mut Interpreter,
        operator: &Token,
        args: Vec<MObject>,
    ) -> Result<MObject, Interrupt> {
        self(ip, operator, args)
    }
}

/// Structural deep equality. Numbers compare across `Int`/`Num`; types
/// compare by mutual subtyping; functions compare by identity.
pub fn deep_equal(left: &MObject, right: &MObject) -> bool {
    match (left, right) {
        (MObject::Value(a), MObject::Value(b)) => match (&a.value, &b.value) {
            (Value::Null, Value::Null) => true,
            (Value::Bool(x), Value::Bool(y)) => x == y,
            (Value::Int(x), Value::Int(y)) => x == y,
            (Value::Num(x), Value::Num(y)) => x == y,
            (Value::Int(x), Value::Num(y)) | (Value::Num(y), Value::Int(x)) => *x as f64 == *y,
            (Value::Str(x), Value::Str(y)) => x == y,
            (Value::Array(x), Value::Array(y)) => {
                if Rc::ptr_eq(x, y) {
                    return true;
                }
                let xs = x.borrow();
                let ys = y.borrow();
                xs.len() == ys.len() && xs.iter().zip(ys.iter()).all(|(u, v)| deep_equal(u, v))
            }
            (Value::Map(x), Value::Map(y)) => {
                if Rc::ptr_eq(x, y) {
                    return true;
                }
                let xs = x.borrow();
                let ys = y.borrow();
                xs.len() == ys.len()
                    && xs
                        .iter()
                        .all(|(k, u)| ys.get(k).is_some_and(|v| deep_equal(u, v)))
            }
            _ => false,
        },
        (MObject::Type(a), MObject::Type(b)) => crate::types::mutual_subtype(a, b),
        (MObject::Function(a), MObject::Function(b)) => Rc::ptr_eq(a, b),
        _ => false,
    }
}

/// Convert a JSON value into a runtime value.
pub fn wrap(value: &serde_json::Value) -> MObject {
    match value {
        serde_json::Value::Null => MObject::null(),
        serde_json::Value::Bool(b) => MObject::bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                MObject::int(i)
            } else {
                MObject::num(n.as_f64().unwrap_or(f64::NAN))
            }
        }
        serde_json::Value::String(s) => MObject::str(s),
        serde_json::Value::Array(items) => MObject::array(items.iter().map(wrap).collect()),
        serde_json::Value::Object(entries) => {
            let mut map = IndexMap::new();
            for (key, item) in entries {
                map.insert(key.clone(), wrap(item));
            }
            MObject::map(map)
        }
    }
}

/// Convert a runtime value into JSON. Types and functions have no JSON
/// form and become null.
pub fn unwrap(obj: &MObject) -> serde_json::Value {
    match obj {
        MObject::Value(v) => match &v.value {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::Value::from(*i),
            Value::Num(n) => serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Str(s) => serde_json::Value::String(s.to_string()),
            Value::Array(items) => {
                serde_json::Value::Array(items.borrow().iter().map(unwrap).collect())
            }
            Value::Map(entries) => {
                let mut out = serde_json::Map::new();
                for (key, item) in entries.borrow().iter() {
                    out.insert(key.clone(), unwrap(item));
                }
                serde_json::Value::Object(out)
            }
        },
        MObject::Type(_) | MObject::Function(_) => serde_json::Value::Null,
    }
}

/// A deep copy: containers are duplicated, functions and types are shared.
pub fn deep_clone(obj: &MObject) -> MObject {
    match obj {
        MObject::Value(v) => {
            let value = match &v.value {
                Value::Array(items) => {
                    let copied = items.borrow().iter().map(deep_clone).collect();
                    Value::Array(Rc::new(RefCell::new(copied)))
                }
                Value::Map(entries) => {
                    let copied = entries
                        .borrow()
                        .iter()
                        .map(|(k, item)| (k.clone(), deep_clone(item)))
                        .collect();
                    Value::Map(Rc::new(RefCell::new(copied)))
                }
                other => other.clone(),
            };
            MObject::Value(MValue {
                value,
                annotation: v.annotation.clone(),
            })
        }
        other => other.clone(),
    }
}
