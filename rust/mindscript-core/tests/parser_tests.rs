//! Parser behavior: precedence, postfix chains, literals, functions,
//! types, assignment-target validation and interactive continuation.

use mindscript_core::ast::{Expr, Program, TypeExpr};
use mindscript_core::parser::{ParseError, Parser};
use mindscript_core::tokens::{Literal, TokenKind};

fn parse(code: &str) -> Program {
    let mut parser = Parser::new(false);
    match parser.parse(code, "test") {
        Ok(program) => program,
        Err(e) => panic!("parsing {:?} failed: {:?}", code, e),
    }
}

fn parse_one(code: &str) -> std::rc::Rc<Expr> {
    let program = parse(code);
    assert_eq!(program.program.len(), 1, "expected one expression");
    std::rc::Rc::clone(&program.program[0])
}

fn parse_err(code: &str) -> ParseError {
    let mut parser = Parser::new(false);
    match parser.parse(code, "test") {
        Err(e) => e,
        Ok(_) => panic!("parsing {:?} unexpectedly succeeded", code),
    }
}

#[test]
fn parses_integer_terminal() {
    let expr = parse_one("42");
    let Expr::Terminal(token) = expr.as_ref() else {
        panic!("expected a terminal");
    };
    assert_eq!(token.literal, Some(Literal::Int(42)));
}

#[test]
fn parses_binary_addition() {
    let expr = parse_one("1 + 2");
    let Expr::Binary { operator, .. } = expr.as_ref() else {
        panic!("expected a binary node");
    };
    assert_eq!(operator.kind, TokenKind::Plus);
}

#[test]
fn multiplication_binds_tighter_than_addition() {
    let expr = parse_one("1 + 2 * 3");
    let Expr::Binary {
        operator, right, ..
    } = expr.as_ref()
    else {
        panic!("expected a binary node");
    };
    assert_eq!(operator.kind, TokenKind::Plus);
    let Expr::Binary { operator, .. } = right.as_ref() else {
        panic!("expected the right side to be the multiplication");
    };
    assert_eq!(operator.kind, TokenKind::Mult);
}

#[test]
fn comparison_binds_tighter_than_conjunction() {
    let expr = parse_one("1 < 2 and true");
    let Expr::Binary { operator, left, .. } = expr.as_ref() else {
        panic!("expected a binary node");
    };
    assert_eq!(operator.kind, TokenKind::And);
    assert!(matches!(left.as_ref(), Expr::Binary { operator, .. }
        if operator.kind == TokenKind::Less));
}

#[test]
fn parses_assignment_to_identifier() {
    let expr = parse_one("a = 3");
    let Expr::Assign { target, .. } = expr.as_ref() else {
        panic!("expected an assignment");
    };
    assert!(matches!(target.as_ref(), Expr::Terminal(t) if t.kind == TokenKind::Id));
}

#[test]
fn parses_declaration_assignment() {
    let expr = parse_one("let a = 3");
    let Expr::Assign { target, .. } = expr.as_ref() else {
        panic!("expected an assignment");
    };
    assert!(matches!(target.as_ref(), Expr::Declaration { .. }));
}

#[test]
fn assignment_is_right_associative() {
    let expr = parse_one("a = b = 3");
    let Expr::Assign { expr: rhs, .. } = expr.as_ref() else {
        panic!("expected an assignment");
    };
    assert!(matches!(rhs.as_ref(), Expr::Assign { .. }));
}

#[test]
fn rejects_invalid_assignment_target() {
    assert!(matches!(parse_err("1 = 2"), ParseError::Syntax(_)));
    assert!(matches!(parse_err("f(x) = 2"), ParseError::Syntax(_)));
}

#[test]
fn destructuring_targets_parse() {
    let expr = parse_one("[a, b] = c");
    let Expr::Assign { target, .. } = expr.as_ref() else {
        panic!("expected an assignment");
    };
    assert!(matches!(target.as_ref(), Expr::Array { .. }));

    let expr = parse_one("{a: x} = c");
    let Expr::Assign { target, .. } = expr.as_ref() else {
        panic!("expected an assignment");
    };
    assert!(matches!(target.as_ref(), Expr::Map { .. }));
}

#[test]
fn getter_targets_become_setters() {
    let expr = parse_one("a[0] = 1");
    let Expr::Assign { target, .. } = expr.as_ref() else {
        panic!("expected an assignment");
    };
    assert!(matches!(target.as_ref(), Expr::ArraySet { .. }));

    let expr = parse_one("a.b = 1");
    let Expr::Assign { target, .. } = expr.as_ref() else {
        panic!("expected an assignment");
    };
    assert!(matches!(target.as_ref(), Expr::ObjectSet { .. }));
}

#[test]
fn property_access_desugars_to_string_index() {
    let expr = parse_one("a.b");
    let Expr::ObjectGet { index, .. } = expr.as_ref() else {
        panic!("expected an object getter");
    };
    let Expr::Terminal(token) = index.as_ref() else {
        panic!("expected a terminal index");
    };
    assert_eq!(token.kind, TokenKind::String);
    assert_eq!(token.literal, Some(Literal::Str("b".to_string())));
}

#[test]
fn call_chains_are_left_associative() {
    let expr = parse_one("f(1)(2)");
    let Expr::Call { callee, .. } = expr.as_ref() else {
        panic!("expected a call");
    };
    assert!(matches!(callee.as_ref(), Expr::Call { .. }));
}

#[test]
fn empty_call_gets_a_null_argument() {
    let expr = parse_one("f()");
    let Expr::Call { arguments, .. } = expr.as_ref() else {
        panic!("expected a call");
    };
    assert_eq!(arguments.len(), 1);
    assert!(matches!(arguments[0].as_ref(), Expr::Terminal(t) if t.kind == TokenKind::Null));
}

#[test]
fn parses_conditional_with_branches() {
    let expr = parse_one("if true then 1 elif false then 2 else 3 end");
    let Expr::Conditional {
        conds, default, ..
    } = expr.as_ref()
    else {
        panic!("expected a conditional");
    };
    assert_eq!(conds.len(), 2);
    assert!(default.is_some());
}

#[test]
fn parses_for_loop() {
    let expr = parse_one("for x in iter([1]) do x end");
    assert!(matches!(expr.as_ref(), Expr::For { .. }));
}

#[test]
fn function_literal_composes_type_chain() {
    let expr = parse_one("fun(a: Int, b: Str) -> Bool do a end");
    let Expr::Function(def) = expr.as_ref() else {
        panic!("expected a function literal");
    };
    assert_eq!(def.parameters.len(), 2);
    // (Int, Str) -> Bool becomes Int -> Str -> Bool.
    let TypeExpr::Binary { left, right, .. } = def.types.as_ref() else {
        panic!("expected a type chain");
    };
    assert!(matches!(left.as_ref(), TypeExpr::Terminal { token, .. }
        if token.text() == "Int"));
    let TypeExpr::Binary { left, right, .. } = right.as_ref() else {
        panic!("expected the chain to continue");
    };
    assert!(matches!(left.as_ref(), TypeExpr::Terminal { token, .. }
        if token.text() == "Str"));
    assert!(matches!(right.as_ref(), TypeExpr::Terminal { token, .. }
        if token.text() == "Bool"));
}

#[test]
fn missing_types_default_to_any() {
    let expr = parse_one("fun(x) do x end");
    let Expr::Function(def) = expr.as_ref() else {
        panic!("expected a function literal");
    };
    let TypeExpr::Binary { left, right, .. } = def.types.as_ref() else {
        panic!("expected a type chain");
    };
    assert!(left.is_any());
    assert!(right.is_any());
}

#[test]
fn parameterless_function_gets_placeholder() {
    let expr = parse_one("fun() do 1 end");
    let Expr::Function(def) = expr.as_ref() else {
        panic!("expected a function literal");
    };
    assert_eq!(def.parameters.len(), 1);
    assert_eq!(def.parameters[0].text(), "_");
    let TypeExpr::Binary { left, .. } = def.types.as_ref() else {
        panic!("expected a type chain");
    };
    assert!(left.is_null());
}

#[test]
fn oracle_literal_defaults_to_empty_examples() {
    let expr = parse_one("oracle(a: Str) -> Int");
    let Expr::Function(def) = expr.as_ref() else {
        panic!("expected an oracle literal");
    };
    assert_eq!(def.operator.kind, TokenKind::Oracle);
    assert!(matches!(def.body.as_ref(), Expr::Array { array } if array.is_empty()));
}

#[test]
fn oracle_literal_takes_examples_from_array() {
    let expr = parse_one("oracle(a: Str) -> Int from [[\"one\", 1]]");
    let Expr::Function(def) = expr.as_ref() else {
        panic!("expected an oracle literal");
    };
    assert!(matches!(def.body.as_ref(), Expr::Array { array } if array.len() == 1));
}

#[test]
fn type_map_records_required_keys() {
    let expr = parse_one("type {name!: Str, age: Int?}");
    let Expr::TypeDef { expr, .. } = expr.as_ref() else {
        panic!("expected a type definition");
    };
    let TypeExpr::Map { map, required, .. } = expr.as_ref() else {
        panic!("expected a type map");
    };
    assert_eq!(map.len(), 2);
    assert!(required.contains("name"));
    assert!(!required.contains("age"));
    assert!(matches!(map["age"].as_ref(), TypeExpr::Unary { .. }));
}

#[test]
fn type_enum_requires_an_array() {
    let expr = parse_one("type Enum [\"a\", \"b\"]");
    let Expr::TypeDef { expr, .. } = expr.as_ref() else {
        panic!("expected a type definition");
    };
    assert!(matches!(expr.as_ref(), TypeExpr::Enum { .. }));
    assert!(matches!(parse_err("type Enum 1"), ParseError::Syntax(_)));
}

#[test]
fn function_arrow_types_are_right_associative() {
    let expr = parse_one("type Int -> Int -> Int");
    let Expr::TypeDef { expr, .. } = expr.as_ref() else {
        panic!("expected a type definition");
    };
    let TypeExpr::Binary { right, .. } = expr.as_ref() else {
        panic!("expected an arrow");
    };
    assert!(matches!(right.as_ref(), TypeExpr::Binary { .. }));
}

#[test]
fn incomplete_input_raises_only_in_interactive_mode() {
    let mut interactive = Parser::new(true);
    assert!(matches!(
        interactive.parse("do 1", "test"),
        Err(ParseError::Incomplete)
    ));
    assert!(matches!(parse_err("do 1"), ParseError::Syntax(_)));
}

#[test]
fn incomplete_map_continues_in_interactive_mode() {
    let mut interactive = Parser::new(true);
    assert!(matches!(
        interactive.parse("{a: 1,", "test"),
        Err(ParseError::Incomplete)
    ));
}

#[test]
fn control_tokens_require_call_syntax() {
    assert!(matches!(parse_err("return 1"), ParseError::Syntax(_)));
    let expr = parse_one("fun() do return(1) end");
    assert!(matches!(expr.as_ref(), Expr::Function(_)));
}

#[test]
fn annotation_wraps_the_following_expression() {
    let expr = parse_one("# \"doc\"\nlet x = 1");
    let Expr::Annotation { annotation, .. } = expr.as_ref() else {
        panic!("expected an annotation");
    };
    assert_eq!(annotation.text(), "\"doc\"");
}

#[test]
fn syntax_errors_report_every_offending_line() {
    let err = parse_err("let = 1\nlet = 2");
    let ParseError::Syntax(diagnostics) = err else {
        panic!("expected syntax diagnostics");
    };
    assert!(diagnostics.len() >= 2);
}
