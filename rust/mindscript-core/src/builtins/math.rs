//! Math natives and constants.

use super::{arg, define_native};
use crate::interpreter::{Interpreter, Interrupt};
use crate::tokens::Token;
use crate::values::{MObject, MValue, Value};

type NativeResult = Result<MObject, Interrupt>;

fn as_num(value: &MObject) -> Option<f64> {
    match value {
        MObject::Value(MValue {
            value: Value::Int(i),
            ..
        }) => Some(*i as f64),
        MObject::Value(MValue {
            value: Value::Num(n),
            ..
        }) => Some(*n),
        _ => None,
    }
}

fn sin(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match as_num(&arg(&args, 0)) {
        Some(v) => Ok(MObject::num(v.sin())),
        None => Ok(MObject::null()),
    }
}

fn cos(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match as_num(&arg(&args, 0)) {
        Some(v) => Ok(MObject::num(v.cos())),
        None => Ok(MObject::null()),
    }
}

fn tan(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match as_num(&arg(&args, 0)) {
        Some(v) => Ok(MObject::num(v.tan())),
        None => Ok(MObject::null()),
    }
}

fn sqrt(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match as_num(&arg(&args, 0)) {
        Some(v) => Ok(MObject::num(v.sqrt())),
        None => Ok(MObject::null()),
    }
}

fn log(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match as_num(&arg(&args, 0)) {
        Some(v) if v > 0.0 => Ok(MObject::num(v.ln())),
        _ => Ok(MObject::null()),
    }
}

fn exp(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match as_num(&arg(&args, 0)) {
        Some(v) if v > 0.0 => Ok(MObject::num(v.exp())),
        _ => Ok(MObject::null()),
    }
}

fn pow(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match (as_num(&arg(&args, 0)), as_num(&arg(&args, 1))) {
        (Some(base), Some(exponent)) => Ok(MObject::num(base.powf(exponent))),
        _ => Ok(MObject::null()),
    }
}

pub fn register(ip: &mut Interpreter) -> Result<(), Interrupt> {
    ip.define(
        "PI",
        MObject::Value(MValue::with_annotation(
            Value::Num(std::f64::consts::PI),
            "\u{03c0}",
        )),
    );
    ip.define(
        "E",
        MObject::Value(MValue::with_annotation(
            Value::Num(std::f64::consts::E),
            "Euler's number",
        )),
    );
    define_native(ip, "sin", "fun(value: Num) -> Num", "Sine function", Box::new(sin))?;
    define_native(ip, "cos", "fun(value: Num) -> Num", "Cosine function", Box::new(cos))?;
    define_native(ip, "tan", "fun(value: Num) -> Num", "Tangent function", Box::new(tan))?;
    define_native(
        ip,
        "sqrt",
        "fun(value: Num) -> Num",
        "Square-root function",
        Box::new(sqrt),
    )?;
    define_native(
        ip,
        "log",
        "fun(value: Num) -> Num?",
        "Logarithm function",
        Box::new(log),
    )?;
    define_native(
        ip,
        "exp",
        "fun(value: Num) -> Num?",
        "Exponential function",
        Box::new(exp),
    )?;
    define_native(
        ip,
        "pow",
        "fun(base: Num, exp: Num) -> Num",
        "Power function",
        Box::new(pow),
    )?;
    Ok(())
}
