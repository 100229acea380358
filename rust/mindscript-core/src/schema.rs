//! Type expression → JSON Schema emitter.
//!
//! Identifier references are inlined; a reference cycle is a user error
//! since JSON Schema output here carries no definitions table. Function
//! arrows are not expressible.

use crate::ast::TypeExpr;
use crate::env::Environment;
use crate::tokens::TokenKind;
use crate::values::{unwrap, MType};
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum SchemaError {
    #[error("Unknown type '{0}'.")]
    UnknownType(String),
    #[error("The value '{0}' is not a type.")]
    NotAType(String),
    #[error("Recursive types such as '{0}' are not allowed.")]
    RecursiveType(String),
    #[error("JSON Schemas for function types are not implemented.")]
    FunctionType,
    #[error("Schema serialization failed: {0}")]
    Serialize(String),
}

fn emit(
    node: &Rc<TypeExpr>,
    env: &crate::env::Env,
    visited: &mut Vec<*const TypeExpr>,
) -> Result<Value, SchemaError> {
    match node.as_ref() {
        TypeExpr::Terminal { token, annotation } => {
            if token.kind == TokenKind::Id {
                let name = token.text();
                let reference = match Environment::get(env, name) {
                    Some(crate::values::MObject::Type(t)) => t,
                    Some(_) => return Err(SchemaError::NotAType(name.to_string())),
                    None => return Err(SchemaError::UnknownType(name.to_string())),
                };
                let identity = Rc::as_ptr(&reference.definition);
                if visited.contains(&identity) {
                    return Err(SchemaError::RecursiveType(name.to_string()));
                }
                visited.push(identity);
                return emit(&reference.definition, &reference.env, visited);
            }
            let mut obj = Map::new();
            let kind = match token.text() {
                "Int" => json!("integer"),
                "Num" => json!("number"),
                "Str" => json!("string"),
                "Bool" => json!("boolean"),
                "Null" => json!("null"),
                _ => json!(["array", "boolean", "number", "null", "object", "string"]),
            };
            obj.insert("type".to_string(), kind);
            if let Some(note) = annotation {
                obj.insert("description".to_string(), json!(note));
            }
            Ok(Value::Object(obj))
        }
        TypeExpr::Annotation { annotation, expr, .. } => {
            let mut obj = emit(expr, env, visited)?;
            if let Value::Object(map) = &mut obj {
                map.insert("description".to_string(), json!(annotation.text()));
            }
            Ok(obj)
        }
        TypeExpr::Grouping { expr } => emit(expr, env, visited),
        TypeExpr::Unary { expr, .. } => {
            let mut obj = emit(expr, env, visited)?;
            if let Value::Object(map) = &mut obj {
                match map.get("type").cloned() {
                    Some(Value::String(name)) => {
                        map.insert("type".to_string(), json!([name, "null"]));
                    }
                    Some(Value::Array(mut kinds)) => {
                        if !kinds.iter().any(|k| k == "null") {
                            kinds.push(json!("null"));
                        }
                        map.insert("type".to_string(), Value::Array(kinds));
                    }
                    _ => {
                        // An optional enum admits null as a member.
                        if let Some(Value::Array(members)) = map.get_mut("enum") {
                            if !members.iter().any(|m| m.is_null()) {
                                members.push(Value::Null);
                            }
                        }
                    }
                }
            }
            Ok(obj)
        }
        TypeExpr::Binary { .. } => Err(SchemaError::FunctionType),
        TypeExpr::Enum {
            values, annotation, ..
        } => {
            let mut obj = Map::new();
            let members: Vec<Value> = values.iter().map(unwrap).collect();
            obj.insert("enum".to_string(), Value::Array(members));
            if let Some(note) = annotation {
                obj.insert("description".to_string(), json!(note));
            }
            Ok(Value::Object(obj))
        }
        TypeExpr::Array { expr, annotation } => {
            let mut obj = Map::new();
            obj.insert("type".to_string(), json!("array"));
            if let Some(note) = annotation {
                obj.insert("description".to_string(), json!(note));
            }
            obj.insert("items".to_string(), emit(expr, env, visited)?);
            Ok(Value::Object(obj))
        }
        TypeExpr::Map {
            map,
            required,
            annotation,
        } => {
            let mut obj = Map::new();
            obj.insert("type".to_string(), json!("object"));
            if let Some(note) = annotation {
                obj.insert("description".to_string(), json!(note));
            }
            let mut required_keys = Vec::new();
            let mut properties = Map::new();
            for (key, expr) in map {
                if required.contains(key) {
                    required_keys.push(json!(key));
                }
                properties.insert(key.clone(), emit(expr, env, visited)?);
            }
            obj.insert("required".to_string(), Value::Array(required_keys));
            obj.insert("properties".to_string(), Value::Object(properties));
            Ok(Value::Object(obj))
        }
    }
}

/// Produce the schema object for a type value.
pub fn dict_schema(value: &MType) -> Result<Value, SchemaError> {
    let mut visited = vec![Rc::as_ptr(&value.definition)];
    emit(&value.definition, &value.env, &mut visited)
}

/// Produce the schema serialized with four-space indentation.
pub fn print_schema(value: &MType) -> Result<String, SchemaError> {
    let schema = dict_schema(value)?;
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    schema
        .serialize(&mut serializer)
        .map_err(|e| SchemaError::Serialize(e.to_string()))?;
    String::from_utf8(out).map_err(|e| SchemaError::Serialize(e.to_string()))
}
