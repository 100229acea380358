#![allow(dead_code)]

use mindscript_core::backend::{Backend, BackendError};
use mindscript_core::values::{MValue, Value};
use mindscript_core::{printer, Interpreter, Interrupt, MObject};
use std::rc::Rc;

/// A backend that always answers with the same canned text.
pub struct CannedBackend {
    pub reply: String,
}

impl Backend for CannedBackend {
    fn consult(
        &self,
        _prompt: &str,
        _output_grammar: Option<&str>,
        _output_schema: Option<&serde_json::Value>,
    ) -> Result<String, BackendError> {
        Ok(self.reply.clone())
    }
}

/// A backend whose consultations always fail.
pub struct FailingBackend;

impl Backend for FailingBackend {
    fn consult(
        &self,
        _prompt: &str,
        _output_grammar: Option<&str>,
        _output_schema: Option<&serde_json::Value>,
    ) -> Result<String, BackendError> {
        Err(BackendError::Connection("http://localhost:8080".to_string()))
    }
}

pub fn interpreter() -> Interpreter {
    interpreter_with_reply("{\"result\": null}")
}

pub fn interpreter_with_reply(reply: &str) -> Interpreter {
    let backend = Rc::new(CannedBackend {
        reply: reply.to_string(),
    });
    match mindscript_core::interpreter(false, backend) {
        Ok(ip) => ip,
        Err(e) => panic!("interpreter bootstrap failed: {:?}", e),
    }
}

pub fn interpreter_with_backend(backend: Rc<dyn Backend>) -> Interpreter {
    match mindscript_core::interpreter(false, backend) {
        Ok(ip) => ip,
        Err(e) => panic!("interpreter bootstrap failed: {:?}", e),
    }
}

pub fn eval_ok(ip: &mut Interpreter, code: &str) -> MObject {
    match ip.eval(code, Some("<test>")) {
        Ok(value) => value,
        Err(e) => panic!("evaluation of {:?} failed: {:?}", code, e),
    }
}

pub fn eval_err(ip: &mut Interpreter, code: &str) -> Interrupt {
    match ip.eval(code, Some("<test>")) {
        Err(e) => e,
        Ok(value) => panic!(
            "evaluation of {:?} unexpectedly succeeded with {}",
            code,
            printer::print(&value)
        ),
    }
}

/// Evaluate and return the value's canonical printed form.
pub fn printed(ip: &mut Interpreter, code: &str) -> String {
    let value = eval_ok(ip, code);
    printer::print(&value)
}

/// Extract a string payload from a value.
pub fn text_of(value: &MObject) -> String {
    match value {
        MObject::Value(MValue {
            value: Value::Str(s),
            ..
        }) => s.to_string(),
        other => panic!("expected a string value, got {}", printer::print(other)),
    }
}

/// The first diagnostic message of an error interrupt.
pub fn error_message(interrupt: &Interrupt) -> String {
    match interrupt {
        Interrupt::Error(diagnostics) => diagnostics
            .first()
            .map(|d| d.message.clone())
            .unwrap_or_default(),
        other => panic!("expected an error interrupt, got {:?}", other),
    }
}
