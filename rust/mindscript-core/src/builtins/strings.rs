//! String natives; pattern operations use regular expressions.

use super::{arg, define_native};
use crate::interpreter::{Interpreter, Interrupt};
use crate::tokens::Token;
use crate::values::{MObject, MValue, Value};
use regex::Regex;

type NativeResult = Result<MObject, Interrupt>;

fn as_str(value: &MObject) -> Option<&str> {
    match value {
        MObject::Value(MValue {
            value: Value::Str(s),
            ..
        }) => Some(s.as_ref()),
        _ => None,
    }
}

fn as_int(value: &MObject) -> Option<i64> {
    match value {
        MObject::Value(MValue {
            value: Value::Int(i),
            ..
        }) => Some(*i),
        _ => None,
    }
}

fn clamp_index(index: i64, len: usize) -> usize {
    let len = len as i64;
    let resolved = if index < 0 { index + len } else { index };
    resolved.clamp(0, len) as usize
}

fn substr(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let (string, start, end) = (arg(&args, 0), arg(&args, 1), arg(&args, 2));
    let (Some(string), Some(s), Some(e)) = (as_str(&string), as_int(&start), as_int(&end)) else {
        return Ok(MObject::null());
    };
    let chars: Vec<char> = string.chars().collect();
    let s = clamp_index(s, chars.len());
    let e = clamp_index(e, chars.len());
    if s >= e {
        return Ok(MObject::str(""));
    }
    Ok(MObject::str(&chars[s..e].iter().collect::<String>()))
}

fn to_upper(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match as_str(&arg(&args, 0)) {
        Some(s) => Ok(MObject::str(&s.to_uppercase())),
        None => Ok(MObject::null()),
    }
}

fn to_lower(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match as_str(&arg(&args, 0)) {
        Some(s) => Ok(MObject::str(&s.to_lowercase())),
        None => Ok(MObject::null()),
    }
}

fn strip(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match as_str(&arg(&args, 0)) {
        Some(s) => Ok(MObject::str(s.trim())),
        None => Ok(MObject::null()),
    }
}

fn lstrip(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match as_str(&arg(&args, 0)) {
        Some(s) => Ok(MObject::str(s.trim_start())),
        None => Ok(MObject::null()),
    }
}

fn rstrip(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    match as_str(&arg(&args, 0)) {
        Some(s) => Ok(MObject::str(s.trim_end())),
        None => Ok(MObject::null()),
    }
}

fn split(ip: &mut Interpreter, op: &Token, args: Vec<MObject>) -> NativeResult {
    let (string, separator) = (arg(&args, 0), arg(&args, 1));
    let (Some(string), Some(separator)) = (as_str(&string), as_str(&separator)) else {
        return Ok(MObject::null());
    };
    if separator.is_empty() {
        return Err(ip.error(op, "Empty separator."));
    }
    let parts: Vec<MObject> = string.split(separator).map(MObject::str).collect();
    Ok(MObject::array(parts))
}

fn join(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let (strings, separator) = (arg(&args, 0), arg(&args, 1));
    let MObject::Value(MValue {
        value: Value::Array(items),
        ..
    }) = &strings
    else {
        return Ok(MObject::null());
    };
    let Some(separator) = as_str(&separator) else {
        return Ok(MObject::null());
    };
    let parts: Vec<String> = items
        .borrow()
        .iter()
        .filter_map(|item| as_str(item).map(str::to_string))
        .collect();
    Ok(MObject::str(&parts.join(separator)))
}

fn match_native(ip: &mut Interpreter, op: &Token, args: Vec<MObject>) -> NativeResult {
    let (pattern, string) = (arg(&args, 0), arg(&args, 1));
    let (Some(pattern), Some(string)) = (as_str(&pattern), as_str(&string)) else {
        return Ok(MObject::null());
    };
    let regex = Regex::new(pattern).map_err(|e| ip.error(op, &e.to_string()))?;
    let matches: Vec<MObject> = regex
        .find_iter(string)
        .map(|m| MObject::str(m.as_str()))
        .collect();
    Ok(MObject::array(matches))
}

fn replace(ip: &mut Interpreter, op: &Token, args: Vec<MObject>) -> NativeResult {
    let (pattern, replacement, string) = (arg(&args, 0), arg(&args, 1), arg(&args, 2));
    let (Some(pattern), Some(replacement), Some(string)) = (
        as_str(&pattern),
        as_str(&replacement),
        as_str(&string),
    ) else {
        return Ok(MObject::null());
    };
    let regex = Regex::new(pattern).map_err(|e| ip.error(op, &e.to_string()))?;
    Ok(MObject::str(&regex.replace_all(string, replacement)))
}

pub fn register(ip: &mut Interpreter) -> Result<(), Interrupt> {
    define_native(
        ip,
        "substr",
        "fun(string: Str, s: Int, e: Int) -> Str",
        "Substring function",
        Box::new(substr),
    )?;
    define_native(
        ip,
        "toLower",
        "fun(string: Str) -> Str",
        "Converts a string to lowercase.",
        Box::new(to_lower),
    )?;
    define_native(
        ip,
        "toUpper",
        "fun(string: Str) -> Str",
        "Converts a string to uppercase.",
        Box::new(to_upper),
    )?;
    define_native(
        ip,
        "strip",
        "fun(string: Str) -> Str",
        "Removes leading and trailing whitespace.",
        Box::new(strip),
    )?;
    define_native(
        ip,
        "lstrip",
        "fun(string: Str) -> Str",
        "Removes leading whitespace.",
        Box::new(lstrip),
    )?;
    define_native(
        ip,
        "rstrip",
        "fun(string: Str) -> Str",
        "Removes trailing whitespace.",
        Box::new(rstrip),
    )?;
    define_native(
        ip,
        "split",
        "fun(string: Str, separator: Str) -> [Str]",
        "Splits a string into a list of strings using a separator.",
        Box::new(split),
    )?;
    define_native(
        ip,
        "join",
        "fun(strings: [Str], separator: Str) -> Str",
        "Joins strings into a single string using a separator.",
        Box::new(join),
    )?;
    define_native(
        ip,
        "match",
        "fun(pattern: Str, string: Str) -> [Str]",
        "Searches for a regex pattern within a string and returns a list of matches.",
        Box::new(match_native),
    )?;
    define_native(
        ip,
        "replace",
        "fun(pattern: Str, replace: Str, string: Str) -> Str",
        "Substitutes a regex pattern with a replacement within a string.",
        Box::new(replace),
    )?;
    Ok(())
}
