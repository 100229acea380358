//! Structural typing: type inference, subtyping and value checks.

mod common;

use common::{eval_err, eval_ok, interpreter, printed};

#[test]
fn typeof_maps_primitives_to_their_terminals() {
    let mut ip = interpreter();
    assert_eq!(printed(&mut ip, "typeOf(null)"), "type Null");
    assert_eq!(printed(&mut ip, "typeOf(true)"), "type Bool");
    assert_eq!(printed(&mut ip, "typeOf(3)"), "type Int");
    assert_eq!(printed(&mut ip, "typeOf(3.5)"), "type Num");
    assert_eq!(printed(&mut ip, "typeOf(\"x\")"), "type Str");
}

#[test]
fn typeof_infers_list_element_types() {
    let mut ip = interpreter();
    assert_eq!(printed(&mut ip, "typeOf([1, 2])"), "type [Int]");
    assert_eq!(printed(&mut ip, "typeOf([])"), "type [Any]");
    assert_eq!(printed(&mut ip, "typeOf([1, null])"), "type [Int?]");
    assert_eq!(printed(&mut ip, "typeOf([1, \"a\"])"), "type [Any]");
    // Int widens to Num when both appear.
    assert_eq!(printed(&mut ip, "typeOf([1, 2.5])"), "type [Num]");
    assert_eq!(printed(&mut ip, "typeOf([null, null])"), "type [Null]");
}

#[test]
fn typeof_infers_map_types_without_required_keys() {
    let mut ip = interpreter();
    assert_eq!(printed(&mut ip, "typeOf({a: 1})"), "type {a: Int}");
}

#[test]
fn typeof_of_a_type_is_type() {
    let mut ip = interpreter();
    assert_eq!(printed(&mut ip, "typeOf(type Int)"), "type Type");
}

#[test]
fn subtyping_is_reflexive() {
    let mut ip = interpreter();
    for t in [
        "type Int",
        "type Str?",
        "type [Int]",
        "type {a!: Int, b: Str}",
        "type Enum [1, 2]",
        "type (Int -> Num)",
        "type Any",
    ] {
        let code = format!("isSubtype({t}, {t})");
        assert_eq!(printed(&mut ip, &code), "true", "not reflexive: {t}");
    }
}

#[test]
fn any_is_a_universal_supertype() {
    let mut ip = interpreter();
    assert_eq!(printed(&mut ip, "isSubtype(type Int, type Any)"), "true");
    assert_eq!(printed(&mut ip, "isSubtype(type {a: Int}, type Any)"), "true");
    assert_eq!(printed(&mut ip, "isSubtype(type Any, type Int)"), "false");
}

#[test]
fn integers_embed_into_numbers() {
    let mut ip = interpreter();
    assert_eq!(printed(&mut ip, "isSubtype(type [Int], type [Num])"), "true");
    assert_eq!(printed(&mut ip, "isSubtype(type Num, type Int)"), "false");
    // Transitivity along the chain Int <: Num <: Any.
    assert_eq!(printed(&mut ip, "isSubtype(type Int, type Num)"), "true");
    assert_eq!(printed(&mut ip, "isSubtype(type Num, type Any)"), "true");
    assert_eq!(printed(&mut ip, "isSubtype(type Int, type Any)"), "true");
}

#[test]
fn maps_use_width_subtyping() {
    let mut ip = interpreter();
    assert_eq!(
        printed(
            &mut ip,
            "isSubtype(type {a!: Int, b!: Str}, type {a!: Int})"
        ),
        "true"
    );
    assert_eq!(
        printed(
            &mut ip,
            "isSubtype(type {a!: Int}, type {a!: Int, b!: Str})"
        ),
        "false"
    );
    // Shared keys must be subtypes.
    assert_eq!(
        printed(&mut ip, "isSubtype(type {a!: Str}, type {a!: Int})"),
        "false"
    );
}

#[test]
fn optional_types_accept_null_and_the_base() {
    let mut ip = interpreter();
    assert_eq!(printed(&mut ip, "isSubtype(type Null, type Int?)"), "true");
    assert_eq!(printed(&mut ip, "isSubtype(type Int, type Int?)"), "true");
    assert_eq!(printed(&mut ip, "isSubtype(type Int?, type Int)"), "false");
    assert_eq!(printed(&mut ip, "isSubtype(type Int?, type Num?)"), "true");
}

#[test]
fn enum_members_check_against_other_types() {
    let mut ip = interpreter();
    assert_eq!(
        printed(&mut ip, "isSubtype(type Enum [1, 2], type Int)"),
        "true"
    );
    assert_eq!(
        printed(&mut ip, "isSubtype(type Enum [1, \"a\"], type Int)"),
        "false"
    );
    assert_eq!(
        printed(&mut ip, "isSubtype(type Enum [1], type Enum [1, 2])"),
        "true"
    );
    assert_eq!(
        printed(&mut ip, "isSubtype(type Enum [1, 2], type Enum [1])"),
        "false"
    );
}

#[test]
fn function_arrows_are_contravariant_in_arguments() {
    let mut ip = interpreter();
    assert_eq!(
        printed(&mut ip, "isSubtype(type (Num -> Int), type (Int -> Num))"),
        "true"
    );
    assert_eq!(
        printed(&mut ip, "isSubtype(type (Int -> Num), type (Num -> Int))"),
        "false"
    );
}

#[test]
fn recursive_aliases_terminate() {
    let mut ip = interpreter();
    eval_ok(&mut ip, "let Tree = type {value!: Int, next: Tree?}");
    assert_eq!(printed(&mut ip, "isSubtype(Tree, Tree)"), "true");
    assert_eq!(
        printed(&mut ip, "isType({value: 1, next: {value: 2}}, Tree)"),
        "true"
    );
    assert_eq!(printed(&mut ip, "isType({next: null}, Tree)"), "false");
}

#[test]
fn named_types_resolve_through_their_environment() {
    let mut ip = interpreter();
    eval_ok(&mut ip, "let Age = type Int");
    eval_ok(&mut ip, "let Person = type {name!: Str, age: Age}");
    assert_eq!(
        printed(&mut ip, "isType({name: \"ada\", age: 36}, Person)"),
        "true"
    );
    assert_eq!(
        printed(&mut ip, "isType({name: \"ada\", age: \"old\"}, Person)"),
        "false"
    );
    assert_eq!(printed(&mut ip, "isSubtype(Age, type Num)"), "true");
}

#[test]
fn checktype_validates_structures() {
    let mut ip = interpreter();
    eval_ok(&mut ip, "let P = type {name!: Str, age: Int?}");
    assert_eq!(printed(&mut ip, "isType({name: \"a\"}, P)"), "true");
    assert_eq!(printed(&mut ip, "isType({age: 2}, P)"), "false");
    assert_eq!(
        printed(&mut ip, "isType({name: \"a\", age: null}, P)"),
        "true"
    );
    assert_eq!(
        printed(&mut ip, "isType({name: \"a\", age: \"x\"}, P)"),
        "false"
    );
}

#[test]
fn enum_values_check_by_deep_equality() {
    let mut ip = interpreter();
    eval_ok(&mut ip, "let C = type Enum [\"red\", \"green\", \"blue\"]");
    assert_eq!(printed(&mut ip, "isType(\"red\", C)"), "true");
    assert_eq!(printed(&mut ip, "isType(\"yellow\", C)"), "false");
}

#[test]
fn empty_enum_is_rejected() {
    let mut ip = interpreter();
    let err = eval_err(&mut ip, "type Enum []");
    assert!(common::error_message(&err).contains("non-empty"));
}

#[test]
fn values_check_against_their_own_typeof() {
    let mut ip = interpreter();
    for v in ["null", "true", "3", "3.5", "\"s\"", "[1, 2]", "{a: 1}", "[1, null]"] {
        let code = format!("isType({v}, typeOf({v}))");
        assert_eq!(printed(&mut ip, &code), "true", "typeof round trip: {v}");
    }
}

#[test]
fn every_list_element_checks_against_the_inferred_element_type() {
    let mut ip = interpreter();
    eval_ok(&mut ip, "let a = [1, 2.5, 3]");
    assert_eq!(printed(&mut ip, "isType(a[0], type Num)"), "true");
    assert_eq!(printed(&mut ip, "isType(a[1], type Num)"), "true");
    assert_eq!(printed(&mut ip, "isSubtype(typeOf(a), type [Num])"), "true");
}

#[test]
fn function_values_check_against_arrow_types() {
    let mut ip = interpreter();
    eval_ok(&mut ip, "let f = fun(n: Num) -> Int do 1 end");
    assert_eq!(printed(&mut ip, "isType(f, type (Int -> Num))"), "true");
    assert_eq!(printed(&mut ip, "isType(f, type (Str -> Num))"), "false");
}

#[test]
fn type_equality_is_mutual_subtyping() {
    let mut ip = interpreter();
    eval_ok(&mut ip, "let A = type {a: Int}");
    eval_ok(&mut ip, "let B = type {a: Int}");
    assert_eq!(printed(&mut ip, "A == B"), "true");
    eval_ok(&mut ip, "let C = type {a: Str}");
    assert_eq!(printed(&mut ip, "A == C"), "false");
}

#[test]
fn postfix_question_widens_a_type_value() {
    let mut ip = interpreter();
    eval_ok(&mut ip, "let T = type Int");
    assert_eq!(printed(&mut ip, "isType(null, T?)"), "true");
    assert_eq!(printed(&mut ip, "isType(1, T?)"), "true");
    assert_eq!(printed(&mut ip, "isType(\"x\", T?)"), "false");
}
