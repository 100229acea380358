//! MindScript core: lexer, parser, tree-walking evaluator, structural
//! type system, JSON Schema and BNF emitters, and the oracle runtime.
//!
//! The `interpreter` constructor wires the pieces together: it registers
//! the native built-ins, evaluates the prelude, and marks the resulting
//! scope as the startup frame that `import` flattening stops at.

pub mod ast;
pub mod backend;
pub mod bnf;
pub mod builtins;
pub mod diagnostics;
pub mod env;
pub mod interpreter;
pub mod lexer;
pub mod oracle;
pub mod parser;
pub mod printer;
pub mod schema;
pub mod tokens;
pub mod types;
pub mod values;

pub use backend::{Backend, BackendError};
pub use interpreter::{Interpreter, Interrupt};
pub use values::MObject;

use std::rc::Rc;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

const PRELUDE: &str = include_str!("lib/std.ms");

/// Build a ready-to-use interpreter: native built-ins registered, prelude
/// evaluated, startup frame marked, and a fresh user frame pushed above it
/// so that `import` and `getEnv` flattening stop below user bindings.
pub fn interpreter(
    interactive: bool,
    backend: Rc<dyn Backend>,
) -> Result<Interpreter, Interrupt> {
    interpreter_with(interactive, backend, |_| Ok(()))
}

/// Like [`interpreter`], with a hook that runs after the built-ins and
/// before the prelude. Provider crates register extra natives (e.g. the
/// `http` built-in) through it so they land in the startup scope.
pub fn interpreter_with(
    interactive: bool,
    backend: Rc<dyn Backend>,
    extra: impl FnOnce(&mut Interpreter) -> Result<(), Interrupt>,
) -> Result<Interpreter, Interrupt> {
    let mut ip = Interpreter::new(interactive, backend);
    ip.set_buffer("<core>");
    builtins::register(&mut ip)?;
    extra(&mut ip)?;
    ip.eval(PRELUDE, Some("<prelude>"))?;
    ip.mark_startup_environment();
    let base = Rc::clone(&ip.env);
    ip.env = env::Environment::with_enclosing(&base);
    ip.set_buffer("<interpreter>");
    Ok(ip)
}
