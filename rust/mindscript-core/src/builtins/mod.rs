//! Built-ins glue: wraps host-provided operations as callable language
//! values. Each native declares its signature in MindScript source; the
//! signature is parsed and evaluated like any function literal, so natives
//! get the same argument and return type enforcement as user functions.

pub mod collections;
pub mod file;
pub mod math;
pub mod stdlib;
pub mod strings;
pub mod system;

use crate::ast::{Expr, FunctionDef};
use crate::interpreter::{Interpreter, Interrupt};
use crate::parser::ParseError;
use crate::values::{FunctionKind, FunctionValue, MObject, NativeCallable};
use std::cell::RefCell;
use std::rc::Rc;

/// Construct a native function value from its printed signature, e.g.
/// `fun(value: Any) -> Str`.
pub fn make_native(
    ip: &mut Interpreter,
    signature: &str,
    annotation: &str,
    callable: Box<dyn NativeCallable>,
) -> Result<Rc<FunctionValue>, Interrupt> {
    let current_buffer = ip.buffer().to_string();
    let source = format!("{} do null end\n", signature);
    let parsed = ip.parser.parse(&source, "<native def>");
    ip.set_buffer(&current_buffer);

    let program = match parsed {
        Ok(program) => program,
        Err(ParseError::Incomplete) => return Err(Interrupt::Incomplete),
        Err(ParseError::Lexical(d)) => return Err(Interrupt::Error(vec![d])),
        Err(ParseError::Syntax(ds)) => return Err(Interrupt::Error(ds)),
    };
    let Some(first) = program.program.first() else {
        return Err(Interrupt::Error(Vec::new()));
    };
    let Expr::Function(def) = first.as_ref() else {
        return Err(Interrupt::Error(Vec::new()));
    };

    let types = ip.eval_type(&def.types)?;
    let definition = Rc::new(FunctionDef {
        operator: def.operator.clone(),
        parameters: def.parameters.clone(),
        types,
        body: Rc::clone(&def.body),
    });
    let closure = Rc::clone(&ip.env);
    let (intypes, outtype) =
        FunctionValue::split_types(&definition.types, definition.parameters.len(), &closure);
    Ok(Rc::new(FunctionValue {
        definition,
        closure,
        intypes,
        outtype,
        annotation: RefCell::new(Some(Rc::from(annotation))),
        kind: FunctionKind::Native(callable),
    }))
}

/// Build a native and bind it under `name` in the current scope.
pub fn define_native(
    ip: &mut Interpreter,
    name: &str,
    signature: &str,
    annotation: &str,
    callable: Box<dyn NativeCallable>,
) -> Result<(), Interrupt> {
    let func = make_native(ip, signature, annotation, callable)?;
    ip.define(name, MObject::Function(func));
    Ok(())
}

pub(crate) fn arg(args: &[MObject], n: usize) -> MObject {
    args.get(n).cloned().unwrap_or_else(MObject::null)
}

/// Register every built-in native symbol.
pub fn register(ip: &mut Interpreter) -> Result<(), Interrupt> {
    stdlib::register(ip)?;
    math::register(ip)?;
    strings::register(ip)?;
    collections::register(ip)?;
    system::register(ip)?;
    file::register(ip)?;
    Ok(())
}
