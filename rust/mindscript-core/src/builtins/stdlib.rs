//! Core natives: conversions, printing, typing, schemas, modules.

use super::{arg, define_native};
use crate::bnf;
use crate::env::Environment;
use crate::interpreter::{Interpreter, Interrupt};
use crate::schema;
use crate::tokens::Token;
use crate::types;
use crate::values::{deep_clone, MObject, MValue, Value};
use std::hash::{DefaultHasher, Hash, Hasher};
use std::io::Write;
use std::rc::Rc;

type NativeResult = Result<MObject, Interrupt>;

fn code_import(ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let (code, name) = (arg(&args, 0), arg(&args, 1));
    let (MObject::Value(MValue { value: Value::Str(code), .. }),
         MObject::Value(MValue { value: Value::Str(name), .. })) = (&code, &name)
    else {
        return Ok(MObject::null());
    };
    ip.import_code(code, name)
}

fn import(ip: &mut Interpreter, op: &Token, args: Vec<MObject>) -> NativeResult {
    let MObject::Value(MValue {
        value: Value::Str(filename),
        ..
    }) = arg(&args, 0)
    else {
        return Ok(MObject::null());
    };
    let code = std::fs::read_to_string(filename.as_ref())
        .map_err(|_| ip.error(op, &format!("File not found: {}", filename)))?;
    let mut module = ip.import_code(&code, &filename)?;
    module.set_annotation(Some(Rc::from(format!("Module \"{}\"", filename).as_str())));
    Ok(module)
}

fn to_str(ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    Ok(MObject::str(&ip.print_obj(&arg(&args, 0))))
}

fn to_bool(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let value = match arg(&args, 0) {
        MObject::Value(v) => match &v.value {
            Value::Null => Some(false),
            Value::Bool(b) => Some(*b),
            Value::Int(i) => Some(*i != 0),
            Value::Num(n) => Some(*n != 0.0),
            Value::Str(s) => Some(!s.is_empty()),
            Value::Array(items) => Some(!items.borrow().is_empty()),
            Value::Map(entries) => Some(!entries.borrow().is_empty()),
        },
        _ => None,
    };
    Ok(value.map(MObject::bool).unwrap_or_else(MObject::null))
}

fn to_int(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let value = match arg(&args, 0) {
        MObject::Value(v) => match &v.value {
            Value::Bool(b) => Some(*b as i64),
            Value::Int(i) => Some(*i),
            Value::Num(n) => Some(*n as i64),
            Value::Str(s) => s.trim().parse::<i64>().ok(),
            _ => None,
        },
        _ => None,
    };
    Ok(value.map(MObject::int).unwrap_or_else(MObject::null))
}

fn to_num(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let value = match arg(&args, 0) {
        MObject::Value(v) => match &v.value {
            Value::Bool(b) => Some(*b as i64 as f64),
            Value::Int(i) => Some(*i as f64),
            Value::Num(n) => Some(*n),
            Value::Str(s) => s.trim().parse::<f64>().ok(),
            _ => None,
        },
        _ => None,
    };
    Ok(value.map(MObject::num).unwrap_or_else(MObject::null))
}

fn display(ip: &mut Interpreter, value: &MObject, newline: bool) {
    let text = match value {
        MObject::Value(MValue {
            value: Value::Str(s),
            ..
        }) => s.to_string(),
        other => ip.print_obj(other),
    };
    if newline {
        println!("{}", text);
    } else {
        print!("{}", text);
        let _ = std::io::stdout().flush();
    }
}

fn print_native(ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let value = arg(&args, 0);
    display(ip, &value, false);
    Ok(value)
}

fn println_native(ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let value = arg(&args, 0);
    display(ip, &value, true);
    Ok(value)
}

fn dump(ip: &mut Interpreter, _op: &Token, _args: Vec<MObject>) -> NativeResult {
    let mut frame = Some(Rc::clone(&ip.env));
    let mut pre = "=> ".to_string();
    println!("=== STATE DUMP START");
    while let Some(env) = frame {
        println!("{}", pre);
        let vars = env.borrow().vars().clone();
        println!("{}", ip.print_obj(&MObject::map(vars)));
        pre = format!("=={}", pre);
        frame = env.borrow().enclosing();
    }
    println!("=== STATE DUMP END");
    Ok(MObject::null())
}

fn get_env(ip: &mut Interpreter, _op: &Token, _args: Vec<MObject>) -> NativeResult {
    Ok(MObject::map(Environment::flattened(&ip.env)))
}

fn type_of(ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    Ok(MObject::Type(ip.typeof_obj(&arg(&args, 0))))
}

fn is_type(ip: &mut Interpreter, op: &Token, args: Vec<MObject>) -> NativeResult {
    let value = arg(&args, 0);
    let MObject::Type(target) = arg(&args, 1) else {
        return Ok(MObject::bool(false));
    };
    let confirmed = types::checktype(&value, &target).map_err(|e| ip.error(op, &e.0))?;
    Ok(MObject::bool(confirmed))
}

fn is_subtype(ip: &mut Interpreter, op: &Token, args: Vec<MObject>) -> NativeResult {
    let (MObject::Type(sub), MObject::Type(sup)) = (arg(&args, 0), arg(&args, 1)) else {
        return Ok(MObject::bool(false));
    };
    let confirmed = types::issubtype(&sub, &sup).map_err(|e| ip.error(op, &e.0))?;
    Ok(MObject::bool(confirmed))
}

fn schema_native(ip: &mut Interpreter, op: &Token, args: Vec<MObject>) -> NativeResult {
    let MObject::Type(target) = arg(&args, 0) else {
        return Ok(MObject::null());
    };
    let text = schema::print_schema(&target).map_err(|e| ip.error(op, &e.to_string()))?;
    Ok(MObject::str(&text))
}

fn bnf_native(ip: &mut Interpreter, op: &Token, args: Vec<MObject>) -> NativeResult {
    let MObject::Type(target) = arg(&args, 0) else {
        return Ok(MObject::null());
    };
    let text = bnf::format(&target).map_err(|e| ip.error(op, &e.to_string()))?;
    Ok(MObject::str(&text))
}

fn assert_native(ip: &mut Interpreter, op: &Token, args: Vec<MObject>) -> NativeResult {
    match arg(&args, 0) {
        MObject::Value(MValue {
            value: Value::Bool(true),
            ..
        }) => Ok(MObject::bool(true)),
        _ => Err(ip.error(op, "Assertion failed.")),
    }
}

fn error_native(ip: &mut Interpreter, op: &Token, args: Vec<MObject>) -> NativeResult {
    let message = match arg(&args, 0) {
        MObject::Value(MValue {
            value: Value::Str(s),
            ..
        }) => s.to_string(),
        _ => String::new(),
    };
    Err(ip.error(op, &message))
}

fn exit_native(_ip: &mut Interpreter, _op: &Token, _args: Vec<MObject>) -> NativeResult {
    Err(Interrupt::Exit)
}

fn size(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let value = match arg(&args, 0) {
        MObject::Value(v) => match &v.value {
            Value::Str(s) => Some(s.chars().count() as i64),
            Value::Array(items) => Some(items.borrow().len() as i64),
            Value::Map(entries) => Some(entries.borrow().len() as i64),
            _ => None,
        },
        _ => None,
    };
    Ok(value.map(MObject::int).unwrap_or_else(MObject::null))
}

fn clone_native(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    Ok(deep_clone(&arg(&args, 0)))
}

fn bind_method(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let value = arg(&args, 0);
    let func = arg(&args, 1);
    if let MObject::Function(f) = &func {
        f.closure.borrow_mut().define("this", value);
    }
    Ok(func)
}

// Scalars are value-cloned and have no per-instance address, so their
// identity is derived from the value itself; equal scalars share a uid.
fn scalar_uid(value: &Value) -> i64 {
    let mut hasher = DefaultHasher::new();
    match value {
        Value::Null => 0u8.hash(&mut hasher),
        Value::Bool(b) => (1u8, b).hash(&mut hasher),
        Value::Int(i) => (2u8, i).hash(&mut hasher),
        Value::Num(n) => (3u8, n.to_bits()).hash(&mut hasher),
        _ => {}
    }
    hasher.finish() as i64
}

fn uid(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let id = match arg(&args, 0) {
        MObject::Value(v) => match &v.value {
            Value::Array(items) => Rc::as_ptr(items) as i64,
            Value::Map(entries) => Rc::as_ptr(entries) as i64,
            Value::Str(s) => Rc::as_ptr(s) as *const u8 as i64,
            scalar => scalar_uid(scalar),
        },
        MObject::Type(t) => Rc::as_ptr(&t.definition) as i64,
        MObject::Function(f) => Rc::as_ptr(&f) as i64,
    };
    Ok(MObject::int(id))
}

fn set_note(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let mut value = arg(&args, 0);
    let note = match arg(&args, 1) {
        MObject::Value(MValue {
            value: Value::Str(s),
            ..
        }) => Some(s),
        _ => None,
    };
    value.set_annotation(note);
    Ok(value)
}

fn get_note(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match arg(&args, 0).annotation() {
        Some(note) => Ok(MObject::str(&note)),
        None => Ok(MObject::null()),
    }
}

pub fn register(ip: &mut Interpreter) -> Result<(), Interrupt> {
    define_native(
        ip,
        "codeImport",
        "fun(code: Str, name: Str) -> {}",
        "Imports code as a module.",
        Box::new(code_import),
    )?;
    define_native(
        ip,
        "import",
        "fun(filename: Str) -> {}",
        "Imports a file at a given path as a module.",
        Box::new(import),
    )?;
    define_native(
        ip,
        "str",
        "fun(value: Any) -> Str",
        "Converts a value into a string.",
        Box::new(to_str),
    )?;
    define_native(
        ip,
        "bool",
        "fun(value: Any) -> Bool?",
        "Converts a value into a boolean.",
        Box::new(to_bool),
    )?;
    define_native(
        ip,
        "int",
        "fun(value: Any) -> Int?",
        "Converts a value into an integer.",
        Box::new(to_int),
    )?;
    define_native(
        ip,
        "num",
        "fun(value: Any) -> Num?",
        "Converts a value into a number.",
        Box::new(to_num),
    )?;
    define_native(
        ip,
        "print",
        "fun(value: Any) -> Any",
        "Prints a value.",
        Box::new(print_native),
    )?;
    define_native(
        ip,
        "println",
        "fun(value: Any) -> Any",
        "Prints a value followed by a newline.",
        Box::new(println_native),
    )?;
    define_native(
        ip,
        "dump",
        "fun() -> Null",
        "Prints the current environment and its parents.",
        Box::new(dump),
    )?;
    define_native(
        ip,
        "getEnv",
        "fun() -> {}",
        "Returns the current environment.",
        Box::new(get_env),
    )?;
    define_native(
        ip,
        "typeOf",
        "fun(value: Any) -> Type",
        "Returns the type of the value.",
        Box::new(type_of),
    )?;
    define_native(
        ip,
        "isType",
        "fun(value: Any, ttype: Type) -> Bool",
        "Checks whether a value conforms to a given type.",
        Box::new(is_type),
    )?;
    define_native(
        ip,
        "isSubtype",
        "fun(subtype: Type, supertype: Type) -> Bool",
        "Checks whether a type is a subtype of another type.",
        Box::new(is_subtype),
    )?;
    define_native(
        ip,
        "schema",
        "fun(value: Type) -> Str",
        "Returns the JSON schema of a type.",
        Box::new(schema_native),
    )?;
    define_native(
        ip,
        "bnf",
        "fun(value: Type) -> Str",
        "Returns the BNF grammar of a type.",
        Box::new(bnf_native),
    )?;
    define_native(
        ip,
        "assert",
        "fun(condition: Bool) -> Bool",
        "Asserts the condition.",
        Box::new(assert_native),
    )?;
    define_native(
        ip,
        "error",
        "fun(message: Str?) -> Null",
        "Throws a runtime error.",
        Box::new(error_native),
    )?;
    define_native(
        ip,
        "exit",
        "fun(_: Null) -> Null",
        "Exits the program.",
        Box::new(exit_native),
    )?;
    define_native(
        ip,
        "size",
        "fun(value: Any) -> Int?",
        "Returns the size of a collection or a string.",
        Box::new(size),
    )?;
    define_native(
        ip,
        "clone",
        "fun(value: Any) -> Any",
        "Makes a deep clone of a value.",
        Box::new(clone_native),
    )?;
    define_native(
        ip,
        "bindMethod",
        "fun(value: Any, func: Any -> Any) -> Any -> Any",
        "Binds a function to a value as a method.",
        Box::new(bind_method),
    )?;
    define_native(
        ip,
        "uid",
        "fun(value: Any) -> Int",
        "Returns the unique value identifier.",
        Box::new(uid),
    )?;
    define_native(
        ip,
        "setNote",
        "fun(value: Any, annotation: Str?) -> Any",
        "Annotates a value.",
        Box::new(set_note),
    )?;
    define_native(
        ip,
        "getNote",
        "fun(value: Any) -> Str?",
        "Get a value's annotation.",
        Box::new(get_note),
    )?;
    Ok(())
}
