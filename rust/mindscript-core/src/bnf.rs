//! Type expression → BNF grammar emitter for constrained LLM decoders.
//!
//! Each structural node gets a rule named after a hash of its identity;
//! revisiting a node yields its rule name with an empty body, which keeps
//! recursive types finite. Primitives expand to a common terminal prelude.

use crate::ast::TypeExpr;
use crate::printer::Printer;
use crate::types::{self, TypeError};
use crate::values::MType;
use std::collections::HashSet;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum BnfError {
    #[error("BNF grammars for function types are not implemented.")]
    FunctionType,
    #[error("{0}")]
    Type(#[from] TypeError),
}

/// Terminal rules shared by every emitted grammar.
const GRAMMAR: &str = r#"value       ::= object | array | string | number | integer | boolean | "null"
object      ::= "{" ws ( string ":" ws value ws ( "," ws string ":" ws value ws )* )? "}"
array       ::= "[" ws ( value ws ( "," ws value ws )* )? "]"
boolean     ::= "true" | "false"
string      ::=
  "\"" (
    [^"\\] |
    "\\" (["\\/bfnrt] | "u" [0-9a-fA-F] [0-9a-fA-F] [0-9a-fA-F] [0-9a-fA-F])
  )* "\""
integer     ::= "-"? ([0-9] | [1-9] [0-9]*)
number      ::= ("-"? ([0-9] | [1-9] [0-9]*)) "." [0-9]* ([eE] [-+]? [0-9]+)?
ws          ::= ([ \t\n] ws)?
identifier  ::= [_a-zA-Z] [_a-zA-Z0-9]*
"#;

struct BnfRule {
    id: String,
    rule: String,
}

fn tag(node: &Rc<TypeExpr>) -> String {
    format!("{:x}", (Rc::as_ptr(node) as usize) % 99989)
}

fn emit(
    node: &Rc<TypeExpr>,
    env: &crate::env::Env,
    visited: &mut HashSet<*const TypeExpr>,
) -> Result<BnfRule, BnfError> {
    let (node, env) = types::resolve(node, env)?;
    match node.as_ref() {
        TypeExpr::Terminal { token, annotation } => {
            let term = match token.text() {
                "Int" => "integer",
                "Num" => "number",
                "Str" => "string",
                "Bool" => "boolean",
                "Null" => "\"null\"",
                _ => "(\"null\" | boolean | integer | number | string | array | object)",
            };
            if let Some(note) = annotation {
                let head = format!("terminal{}", tag(&node));
                let rule = format!("# {}\n{} ::= {}\n", note, head, term);
                return Ok(BnfRule { id: head, rule });
            }
            Ok(BnfRule {
                id: term.to_string(),
                rule: String::new(),
            })
        }
        TypeExpr::Annotation { expr, .. } | TypeExpr::Grouping { expr } => {
            emit(expr, &env, visited)
        }
        TypeExpr::Unary { expr, .. } => {
            let head = format!("optional{}", tag(&node));
            if !visited.insert(Rc::as_ptr(&node)) {
                return Ok(BnfRule {
                    id: head,
                    rule: String::new(),
                });
            }
            let sub = emit(expr, &env, visited)?;
            let rule = format!("{} ::= \"null\" | {}\n{}", head, sub.id, sub.rule);
            Ok(BnfRule { id: head, rule })
        }
        TypeExpr::Binary { .. } => Err(BnfError::FunctionType),
        TypeExpr::Enum { values, .. } => {
            let head = format!("enum{}", tag(&node));
            if !visited.insert(Rc::as_ptr(&node)) {
                return Ok(BnfRule {
                    id: head,
                    rule: String::new(),
                });
            }
            let members: Vec<String> = values
                .iter()
                .map(|value| {
                    let text = Printer::shorten(&crate::printer::print(value));
                    format!("\"{}\"", text.replace('"', "\\\""))
                })
                .collect();
            let rule = format!("{} ::= {}\n", head, members.join(" | "));
            Ok(BnfRule { id: head, rule })
        }
        TypeExpr::Array { expr, .. } => {
            let head = format!("array{}", tag(&node));
            if !visited.insert(Rc::as_ptr(&node)) {
                return Ok(BnfRule {
                    id: head,
                    rule: String::new(),
                });
            }
            let sub = emit(expr, &env, visited)?;
            let rule = format!(
                "{} ::= \"[\" ws ({})? (ws \",\" ws {})* ws \"]\"\n{}",
                head, sub.id, sub.id, sub.rule
            );
            Ok(BnfRule { id: head, rule })
        }
        TypeExpr::Map { map, .. } => {
            let head = format!("object{}", tag(&node));
            if !visited.insert(Rc::as_ptr(&node)) {
                return Ok(BnfRule {
                    id: head,
                    rule: String::new(),
                });
            }
            let mut subs = Vec::with_capacity(map.len());
            for expr in map.values() {
                subs.push(emit(expr, &env, visited)?);
            }
            let mut items = String::new();
            if map.is_empty() {
                items.push_str(r#""{" ws "}""#);
            } else {
                for (n, (key, sub)) in map.keys().zip(&subs).enumerate() {
                    if n == 0 {
                        items.push_str(&format!(
                            r#""{{" ws "\"{}\"" ws ":" ws {}"#,
                            key, sub.id
                        ));
                    } else {
                        items.push_str(&format!(
                            r#" ws "," ws "\"{}\"" ws ":" ws {}"#,
                            key, sub.id
                        ));
                    }
                }
                items.push_str(r#" ws "}""#);
            }
            let mut rule = format!("{} ::= ( {} )\n", head, items);
            for sub in &subs {
                rule.push_str(&sub.rule);
            }
            Ok(BnfRule { id: head, rule })
        }
    }
}

/// Produce a complete grammar for a type value, terminal prelude included.
pub fn format(value: &MType) -> Result<String, BnfError> {
    let mut visited = HashSet::new();
    let root = emit(&value.definition, &value.env, &mut visited)?;
    Ok(format!("root ::= {}\n{}{}", root.id, root.rule, GRAMMAR))
}
