//! Printer behavior: canonical forms, compaction, depth limits and the
//! parse-print fixpoint.

mod common;

use common::{eval_ok, interpreter, printed};
use mindscript_core::parser::Parser;
use mindscript_core::printer;

fn print_parsed(code: &str) -> String {
    let mut parser = Parser::new(false);
    let program = match parser.parse(code, "test") {
        Ok(program) => program,
        Err(e) => panic!("parsing {:?} failed: {:?}", code, e),
    };
    printer::print_expr(&program.program[0])
}

#[test]
fn values_print_in_canonical_form() {
    let mut ip = interpreter();
    assert_eq!(printed(&mut ip, "null"), "null");
    assert_eq!(printed(&mut ip, "true"), "true");
    assert_eq!(printed(&mut ip, "42"), "42");
    assert_eq!(printed(&mut ip, "3.0"), "3.0");
    assert_eq!(printed(&mut ip, "\"hi\""), "\"hi\"");
    assert_eq!(printed(&mut ip, "[1, 2]"), "[1, 2]");
    assert_eq!(printed(&mut ip, "{a: 1}"), "{\"a\": 1}");
}

#[test]
fn strings_escape_control_characters() {
    let mut ip = interpreter();
    assert_eq!(printed(&mut ip, "\"a\\nb\""), "\"a\\nb\"");
    assert_eq!(printed(&mut ip, "\"q\\\"q\""), "\"q\\\"q\"");
}

#[test]
fn compact_forms_are_used_when_they_fit() {
    assert_eq!(print_parsed("do 1 2 end"), "do 1 2 end");
    assert_eq!(print_parsed("[1, 2, 3]"), "[1, 2, 3]");
    assert_eq!(print_parsed("{a: 1, b: 2}"), "{a: 1, b: 2}");
}

#[test]
fn long_content_stays_multi_line() {
    let mut ip = interpreter();
    let out = printed(
        &mut ip,
        "[\"aaaaaaaaaaaaaaaaaaaaaaaaa\", \"bbbbbbbbbbbbbbbbbbbbbbbbb\", \"ccccccccccccccccccccccccc\", \"ddddddddddddddddddddddddd\"]",
    );
    assert!(out.contains('\n'));
}

#[test]
fn deep_nesting_is_elided() {
    let mut ip = interpreter();
    let out = printed(&mut ip, "[[[[[1]]]]]");
    assert!(out.contains("[...]"));
}

#[test]
fn parse_print_is_a_fixpoint_on_canonical_forms() {
    for code in [
        "1 + 2 * 3",
        "let x = 1",
        "x = y",
        "[1, 2, 3]",
        "{a: 1}",
        "if x then 1 else 2 end",
        "for x in iter(xs) do x end",
        "fun(n: Int) -> Int do n end",
        "f(1, 2)",
        "a.\"b\"",
        "a[0]",
        "not x",
        "-x",
        "do 1 end",
        "type {name!: Str, age: Int?}",
        "type [Int]",
        "type Int?",
        "return(1)",
    ] {
        let once = print_parsed(code);
        let twice = print_parsed(&once);
        assert_eq!(once, twice, "not a fixpoint: {code}");
    }
}

#[test]
fn function_values_print_their_signature() {
    let mut ip = interpreter();
    eval_ok(&mut ip, "let f = fun(a: Int, b: Str) -> Bool do true end");
    assert_eq!(printed(&mut ip, "f"), "a:Int -> b:Str -> Bool");
}

#[test]
fn type_values_print_with_the_type_prefix() {
    let mut ip = interpreter();
    assert_eq!(printed(&mut ip, "type Int"), "type Int");
    assert_eq!(printed(&mut ip, "type [Str?]"), "type [Str?]");
    assert_eq!(
        printed(&mut ip, "type {name!: Str}"),
        "type {name!: Str}"
    );
    assert_eq!(
        printed(&mut ip, "type Enum [\"a\", \"b\"]"),
        "type Enum [\"a\", \"b\"]"
    );
}

#[test]
fn conditionals_print_their_branches() {
    assert_eq!(
        print_parsed("if a then 1 elif b then 2 else 3 end"),
        "if a then 1 elif b then 2 else 3 end"
    );
}
