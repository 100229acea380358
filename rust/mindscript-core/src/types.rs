//! Structural typing: value-to-type witnessing (`typeof`), subtype
//! checking, and value-against-type validation.

use crate::ast::TypeExpr;
use crate::env::{Env, Environment};
use crate::tokens::{Literal, Token, TokenKind};
use crate::values::{deep_equal, MObject, MType, Value};
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

/// Raised when a type expression cannot be resolved (unknown or circular
/// identifier references, references to non-type values).
#[derive(Debug, Error, Clone)]
#[error("{0}")]
pub struct TypeError(pub String);

fn primitive(name: &str) -> Rc<TypeExpr> {
    Rc::new(TypeExpr::Terminal {
        token: Token::new(
            TokenKind::Type,
            Some(Literal::Str(name.to_string())),
            Rc::from("<typeof>"),
            0,
        ),
        annotation: None,
    })
}

fn terminal_name(t: &TypeExpr) -> Option<&str> {
    match t {
        TypeExpr::Terminal { token, .. } => Some(token.text()),
        _ => None,
    }
}

/// Follow grouping, annotation and identifier references until a
/// structural node remains. Cyclic aliases are an error.
pub(crate) fn resolve(t: &Rc<TypeExpr>, env: &Env) -> Result<(Rc<TypeExpr>, Env), TypeError> {
    let mut t = Rc::clone(t);
    let mut env = Rc::clone(env);
    let mut seen: Vec<*const TypeExpr> = Vec::new();
    loop {
        match t.as_ref() {
            TypeExpr::Annotation { expr, .. } => t = Rc::clone(expr),
            TypeExpr::Grouping { expr } => t = Rc::clone(expr),
            TypeExpr::Terminal { token, .. } if token.kind == TokenKind::Id => {
                if seen.contains(&Rc::as_ptr(&t)) {
                    return Err(TypeError(format!(
                        "Circular type reference '{}'.",
                        token.text()
                    )));
                }
                seen.push(Rc::as_ptr(&t));
                let name = token.text().to_string();
                let reference = match Environment::get(&env, &name) {
                    Some(MObject::Type(reference)) => reference,
                    Some(_) => {
                        return Err(TypeError(format!(
                            "Referencing '{}', which is not a type.",
                            name
                        )))
                    }
                    None => return Err(TypeError(format!("Unknown type '{}'.", name))),
                };
                env = reference.env;
                t = reference.definition;
            }
            _ => return Ok((t, env)),
        }
    }
}

type VisitedPairs = HashSet<(usize, usize)>;

fn subtype_rec(
    t1: &Rc<TypeExpr>,
    env1: &Env,
    t2: &Rc<TypeExpr>,
    env2: &Env,
    visited: &mut VisitedPairs,
) -> Result<bool, TypeError> {
    let (t1, env1) = resolve(t1, env1)?;
    let (t2, env2) = resolve(t2, env2)?;

    // Memoize on identity pairs so recursive aliases terminate.
    let pair = (Rc::as_ptr(&t1) as usize, Rc::as_ptr(&t2) as usize);
    let mirrored = (pair.1, pair.0);
    if visited.contains(&pair) || visited.contains(&mirrored) {
        return Ok(true);
    }
    visited.insert(pair);

    if t2.is_any() {
        return Ok(true);
    }

    match (t1.as_ref(), t2.as_ref()) {
        (TypeExpr::Terminal { .. }, TypeExpr::Terminal { .. }) => {
            let sub = terminal_name(&t1);
            let sup = terminal_name(&t2);
            // Integers embed into numbers; all other primitives are
            // related only to themselves.
            Ok(sub == sup || (sub == Some("Int") && sup == Some("Num")))
        }
        (TypeExpr::Array { expr: e1, .. }, TypeExpr::Array { expr: e2, .. }) => {
            subtype_rec(e1, &env1, e2, &env2, visited)
        }
        (
            TypeExpr::Map {
                map: m1,
                required: r1,
                ..
            },
            TypeExpr::Map {
                map: m2,
                required: r2,
                ..
            },
        ) => {
            // Width subtyping: the sub's required keys must cover the
            // super's, and shared keys must be subtypes in order.
            if !r2.iter().all(|k| r1.contains(k)) {
                return Ok(false);
            }
            for (key, sub) in m1 {
                if let Some(sup) = m2.get(key) {
                    if !subtype_rec(sub, &env1, sup, &env2, visited)? {
                        return Ok(false);
                    }
                }
            }
            Ok(true)
        }
        (TypeExpr::Enum { values: v1, .. }, TypeExpr::Enum { values: v2, .. }) => {
            Ok(v1.iter().all(|a| v2.iter().any(|b| deep_equal(a, b))))
        }
        (TypeExpr::Enum { values, .. }, _) => {
            for member in values {
                if !checktype_rec(member, &t2, &env2)? {
                    return Ok(false);
                }
            }
            Ok(true)
        }
        (_, TypeExpr::Unary { expr: sup, .. }) => match t1.as_ref() {
            TypeExpr::Unary { expr: sub, .. } => subtype_rec(sub, &env1, sup, &env2, visited),
            _ if t1.is_null() => Ok(true),
            _ => subtype_rec(&t1, &env1, sup, &env2, visited),
        },
        (
            TypeExpr::Binary {
                left: a1,
                right: b1,
                ..
            },
            TypeExpr::Binary {
                left: a2,
                right: b2,
                ..
            },
        ) => {
            // Contravariant in the argument, covariant in the result.
            Ok(subtype_rec(a2, &env2, a1, &env1, visited)?
                && subtype_rec(b1, &env1, b2, &env2, visited)?)
        }
        _ => Ok(false),
    }
}

fn checktype_rec(value: &MObject, target: &Rc<TypeExpr>, env: &Env) -> Result<bool, TypeError> {
    let (target, env) = resolve(target, env)?;
    if target.is_any() {
        return Ok(true);
    }

    match value {
        MObject::Value(v) => match target.as_ref() {
            TypeExpr::Terminal { token, .. } if token.kind == TokenKind::Type => {
                let ok = match (&v.value, token.text()) {
                    (Value::Null, "Null") => true,
                    (Value::Bool(_), "Bool") => true,
                    (Value::Int(_), "Int") => true,
                    (Value::Int(_), "Num") | (Value::Num(_), "Num") => true,
                    (Value::Str(_), "Str") => true,
                    _ => false,
                };
                Ok(ok)
            }
            TypeExpr::Array { expr, .. } => match &v.value {
                Value::Array(items) => {
                    for item in items.borrow().iter() {
                        if !checktype_rec(item, expr, &env)? {
                            return Ok(false);
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
            TypeExpr::Map { map, required, .. } => match &v.value {
                Value::Map(entries) => {
                    let entries = entries.borrow();
                    for (key, ktype) in map {
                        match entries.get(key) {
                            Some(item) => {
                                if !checktype_rec(item, ktype, &env)? {
                                    return Ok(false);
                                }
                            }
                            None => {
                                if required.contains(key) {
                                    return Ok(false);
                                }
                            }
                        }
                    }
                    Ok(true)
                }
                _ => Ok(false),
            },
            TypeExpr::Enum { values, .. } => {
                Ok(values.iter().any(|member| deep_equal(value, member)))
            }
            TypeExpr::Unary { expr, .. } => {
                if matches!(v.value, Value::Null) {
                    return Ok(true);
                }
                checktype_rec(value, expr, &env)
            }
            _ => Ok(false),
        },
        MObject::Type(_) => Ok(matches!(
            target.as_ref(),
            TypeExpr::Terminal { token, .. }
                if token.kind == TokenKind::Type && token.text() == "Type"
        )),
        MObject::Function(func) => {
            let mut visited = VisitedPairs::new();
            subtype_rec(
                &func.definition.types,
                &func.closure,
                &target,
                &env,
                &mut visited,
            )
        }
    }
}

/// Infer the structural type of a value.
///
/// List element types use a most-general-type scan: the first non-null
/// item's type seeds G; later items either keep G, widen it when G is a
/// subtype of theirs, or collapse it to `Any`. Nulls mark G optional.
/// Inferred map types carry no required-key constraints.
pub fn typeof_value(value: &MObject) -> Rc<TypeExpr> {
    match value {
        MObject::Value(v) => match &v.value {
            Value::Null => primitive("Null"),
            Value::Bool(_) => primitive("Bool"),
            Value::Str(_) => primitive("Str"),
            Value::Int(_) => primitive("Int"),
            Value::Num(_) => primitive("Num"),
            Value::Array(items) => {
                let items = items.borrow();
                if items.is_empty() {
                    return Rc::new(TypeExpr::Array {
                        expr: primitive("Any"),
                        annotation: None,
                    });
                }
                let scratch = Environment::new();
                let mut general: Option<Rc<TypeExpr>> = None;
                let mut nullable = false;
                let mut any = false;
                for item in items.iter() {
                    let subtype = typeof_value(item);
                    if subtype.is_null() {
                        nullable = true;
                        continue;
                    }
                    let Some(current) = general.clone() else {
                        general = Some(subtype);
                        continue;
                    };
                    let narrower = subtype_rec(
                        &subtype,
                        &scratch,
                        &current,
                        &scratch,
                        &mut VisitedPairs::new(),
                    )
                    .unwrap_or(false);
                    if narrower {
                        continue;
                    }
                    let wider = subtype_rec(
                        &current,
                        &scratch,
                        &subtype,
                        &scratch,
                        &mut VisitedPairs::new(),
                    )
                    .unwrap_or(false);
                    if wider {
                        general = Some(subtype);
                    } else {
                        any = true;
                        break;
                    }
                }
                let element = if any {
                    primitive("Any")
                } else if let Some(general) = general {
                    if nullable {
                        Rc::new(TypeExpr::Unary {
                            operator: Token::new(
                                TokenKind::Question,
                                Some(Literal::Str("?".to_string())),
                                Rc::from("<typeof>"),
                                0,
                            ),
                            expr: general,
                            annotation: None,
                        })
                    } else {
                        general
                    }
                } else {
                    primitive("Null")
                };
                Rc::new(TypeExpr::Array {
                    expr: element,
                    annotation: None,
                })
            }
            Value::Map(entries) => {
                let mut map = indexmap::IndexMap::new();
                for (key, item) in entries.borrow().iter() {
                    map.insert(key.clone(), typeof_value(item));
                }
                Rc::new(TypeExpr::Map {
                    map,
                    required: indexmap::IndexSet::new(),
                    annotation: None,
                })
            }
        },
        MObject::Function(func) => Rc::clone(&func.definition.types),
        MObject::Type(_) => primitive("Type"),
    }
}

/// Structural subtype check between two type values.
pub fn issubtype(sub: &MType, sup: &MType) -> Result<bool, TypeError> {
    let mut visited = VisitedPairs::new();
    subtype_rec(&sub.definition, &sub.env, &sup.definition, &sup.env, &mut visited)
}

/// Check a value directly against a type without reifying the value's
/// type where avoidable.
pub fn checktype(value: &MObject, target: &MType) -> Result<bool, TypeError> {
    checktype_rec(value, &target.definition, &target.env)
}

/// Mutual subtyping, the equality relation on first-class types.
/// Unresolvable references compare unequal.
pub fn mutual_subtype(a: &MType, b: &MType) -> bool {
    issubtype(a, b).unwrap_or(false) && issubtype(b, a).unwrap_or(false)
}
