//! File natives: UTF-8 text reading and writing.

use super::{arg, define_native};
use crate::interpreter::{Interpreter, Interrupt};
use crate::tokens::Token;
use crate::values::{MObject, MValue, Value};

type NativeResult = Result<MObject, Interrupt>;

fn read_file(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let MObject::Value(MValue {
        value: Value::Str(filename),
        ..
    }) = arg(&args, 0)
    else {
        return Ok(MObject::null());
    };
    match std::fs::read_to_string(filename.as_ref()) {
        Ok(content) => Ok(MObject::str(&content)),
        Err(e) => Ok(MObject::annotated_null(&format!(
            "Could not read '{}': {}",
            filename, e
        ))),
    }
}

fn write_file(_ip: &mut Interpreter, _op: &Token, args: Vec<MObject>) -> NativeResult {
    let (filename, content) = (arg(&args, 0), arg(&args, 1));
    let (MObject::Value(MValue { value: Value::Str(filename), .. }),
         MObject::Value(MValue { value: Value::Str(content), .. })) = (&filename, &content)
    else {
        return Ok(MObject::null());
    };
    match std::fs::write(filename.as_ref(), content.as_bytes()) {
        Ok(()) => Ok(MObject::bool(true)),
        Err(e) => Ok(MObject::annotated_null(&format!(
            "Could not write '{}': {}",
            filename, e
        ))),
    }
}

pub fn register(ip: &mut Interpreter) -> Result<(), Interrupt> {
    define_native(
        ip,
        "readFile",
        "fun(filename: Str) -> Str?",
        "Reads a UTF-8 text file.",
        Box::new(read_file),
    )?;
    define_native(
        ip,
        "writeFile",
        "fun(filename: Str, content: Str) -> Bool?",
        "Writes a UTF-8 text file.",
        Box::new(write_file),
    )?;
    Ok(())
}
