//! JSON Schema and BNF grammar emission from type values.

mod common;

use common::{eval_err, eval_ok, interpreter, text_of};
use serde_json::{json, Value};

fn schema_of(ip: &mut mindscript_core::Interpreter, type_code: &str) -> Value {
    let value = eval_ok(ip, &format!("schema({})", type_code));
    let text = text_of(&value);
    match serde_json::from_str(&text) {
        Ok(parsed) => parsed,
        Err(e) => panic!("schema output is not JSON: {}\n{}", e, text),
    }
}

fn bnf_of(ip: &mut mindscript_core::Interpreter, type_code: &str) -> String {
    let value = eval_ok(ip, &format!("bnf({})", type_code));
    text_of(&value)
}

#[test]
fn primitive_schemas() {
    let mut ip = interpreter();
    assert_eq!(schema_of(&mut ip, "type Int"), json!({"type": "integer"}));
    assert_eq!(schema_of(&mut ip, "type Num"), json!({"type": "number"}));
    assert_eq!(schema_of(&mut ip, "type Str"), json!({"type": "string"}));
    assert_eq!(schema_of(&mut ip, "type Bool"), json!({"type": "boolean"}));
    assert_eq!(schema_of(&mut ip, "type Null"), json!({"type": "null"}));
}

#[test]
fn any_covers_all_json_types() {
    let mut ip = interpreter();
    assert_eq!(
        schema_of(&mut ip, "type Any"),
        json!({"type": ["array", "boolean", "number", "null", "object", "string"]})
    );
}

#[test]
fn optional_unions_null_into_the_type() {
    let mut ip = interpreter();
    assert_eq!(
        schema_of(&mut ip, "type Int?"),
        json!({"type": ["integer", "null"]})
    );
}

#[test]
fn array_schema_nests_items() {
    let mut ip = interpreter();
    assert_eq!(
        schema_of(&mut ip, "type [Str]"),
        json!({"type": "array", "items": {"type": "string"}})
    );
}

#[test]
fn map_schema_lists_required_keys_and_properties() {
    let mut ip = interpreter();
    let schema = schema_of(&mut ip, "type {name!: Str, age: Int?}");
    assert_eq!(schema["type"], json!("object"));
    assert_eq!(schema["required"], json!(["name"]));
    assert_eq!(schema["properties"]["name"], json!({"type": "string"}));
    assert_eq!(
        schema["properties"]["age"],
        json!({"type": ["integer", "null"]})
    );
}

#[test]
fn enum_schema_lists_member_literals() {
    let mut ip = interpreter();
    let schema = schema_of(&mut ip, "type Enum [\"red\", \"green\", \"blue\"]");
    assert_eq!(schema["enum"], json!(["red", "green", "blue"]));
}

#[test]
fn annotations_become_descriptions() {
    let mut ip = interpreter();
    let value = eval_ok(&mut ip, "schema(type # \"An age.\"\nInt)");
    let text = text_of(&value);
    assert!(text.contains("description"));
    assert!(text.contains("An age."));
}

#[test]
fn named_references_are_inlined() {
    let mut ip = interpreter();
    eval_ok(&mut ip, "let Age = type Int");
    assert_eq!(
        schema_of(&mut ip, "type {age: Age}"),
        json!({
            "type": "object",
            "required": [],
            "properties": {"age": {"type": "integer"}}
        })
    );
}

#[test]
fn recursive_references_are_an_error() {
    let mut ip = interpreter();
    eval_ok(&mut ip, "let Tree = type {next: Tree?}");
    let err = eval_err(&mut ip, "schema(Tree)");
    assert!(common::error_message(&err).contains("Recursive"));
}

#[test]
fn function_types_have_no_schema() {
    let mut ip = interpreter();
    let err = eval_err(&mut ip, "schema(type (Int -> Int))");
    assert!(common::error_message(&err).contains("function types"));
}

#[test]
fn schema_output_uses_four_space_indentation() {
    let mut ip = interpreter();
    let value = eval_ok(&mut ip, "schema(type {name!: Str})");
    let text = text_of(&value);
    assert!(text.contains("    \"type\""));
}

#[test]
fn bnf_primitives_use_the_shared_terminals() {
    let mut ip = interpreter();
    assert!(bnf_of(&mut ip, "type Int").starts_with("root ::= integer"));
    assert!(bnf_of(&mut ip, "type Str").starts_with("root ::= string"));
    assert!(bnf_of(&mut ip, "type Null").starts_with("root ::= \"null\""));
}

#[test]
fn bnf_grammar_carries_the_terminal_prelude() {
    let mut ip = interpreter();
    let grammar = bnf_of(&mut ip, "type Int");
    for rule in ["boolean", "string", "integer", "number", "ws", "identifier"] {
        assert!(grammar.contains(rule), "missing terminal rule {}", rule);
    }
}

#[test]
fn bnf_optional_admits_null() {
    let mut ip = interpreter();
    let grammar = bnf_of(&mut ip, "type Int?");
    assert!(grammar.contains("::= \"null\" | integer"));
}

#[test]
fn bnf_array_wraps_its_element_rule() {
    let mut ip = interpreter();
    let grammar = bnf_of(&mut ip, "type [Int]");
    assert!(grammar.contains("\"[\" ws (integer)? (ws \",\" ws integer)* ws \"]\""));
}

#[test]
fn bnf_map_spells_out_quoted_keys() {
    let mut ip = interpreter();
    let grammar = bnf_of(&mut ip, "type {name!: Str}");
    assert!(grammar.contains(r#""\"name\"""#));
}

#[test]
fn bnf_enum_alternates_printed_members() {
    let mut ip = interpreter();
    let grammar = bnf_of(&mut ip, "type Enum [\"red\", \"blue\"]");
    assert!(grammar.contains(r#""\"red\"""#));
    assert!(grammar.contains(" | "));
}

#[test]
fn bnf_recursive_types_emit_finite_rules() {
    let mut ip = interpreter();
    eval_ok(&mut ip, "let Tree = type {next: Tree?}");
    let grammar = eval_ok(&mut ip, "bnf(Tree)");
    let text = text_of(&grammar);
    assert!(text.starts_with("root ::= object"));
}

#[test]
fn bnf_function_types_are_an_error() {
    let mut ip = interpreter();
    let err = eval_err(&mut ip, "bnf(type (Int -> Int))");
    assert!(common::error_message(&err).contains("function types"));
}
