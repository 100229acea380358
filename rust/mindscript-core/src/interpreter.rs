//! Tree-walking evaluator.
//!
//! Control flow (`return`, `break`, `continue`), runtime errors and the
//! interpreter exit are all carried by the `Interrupt` enum threaded
//! through every evaluation result. Loops and function boundaries match on
//! the variants they handle; every other site propagates with `?`.

use crate::ast::{Expr, FunctionDef, TypeExpr};
use crate::backend::Backend;
use crate::diagnostics::{Category, Diagnostic};
use crate::env::{Env, Environment};
use crate::oracle;
use crate::parser::{ParseError, Parser};
use crate::printer;
use crate::tokens::{Literal, Token, TokenKind};
use crate::types::{self, TypeError};
use crate::values::{
    deep_equal, partial, FunctionKind, FunctionValue, MObject, MType, MValue, Value,
};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::rc::Rc;

/// Non-local outcome of an evaluation step.
#[derive(Debug)]
pub enum Interrupt {
    /// One or more reported errors; the current top-level expression is
    /// abandoned.
    Error(Vec<Diagnostic>),
    /// Interactive continuation: the parser needs more input.
    Incomplete,
    Return { operator: Token, value: MObject },
    Break { operator: Token, value: MObject },
    Continue { operator: Token, value: MObject },
    /// `exit(null)` was called.
    Exit,
}

pub type EvalResult = Result<MObject, Interrupt>;

pub struct Interpreter {
    pub parser: Parser,
    pub env: Env,
    pub backend: Rc<dyn Backend>,
    buffer: String,
}

impl Interpreter {
    pub fn new(interactive: bool, backend: Rc<dyn Backend>) -> Self {
        Self {
            parser: Parser::new(interactive),
            env: Environment::new(),
            backend,
            buffer: "<interpreter>".to_string(),
        }
    }

    pub fn buffer(&self) -> &str {
        &self.buffer
    }

    pub fn set_buffer(&mut self, buffer: &str) {
        self.parser.lexer.set_stream(buffer);
        self.buffer = buffer.to_string();
    }

    /// Report a runtime error at a token's source position.
    pub fn error(&self, token: &Token, message: &str) -> Interrupt {
        Interrupt::Error(vec![self.parser.lexer.diagnostic(
            &token.buffer,
            token.index,
            Category::Runtime,
            message,
        )])
    }

    pub fn define(&mut self, name: &str, value: MObject) {
        self.env.borrow_mut().define(name, value);
    }

    pub fn mark_startup_environment(&mut self) {
        self.env.borrow_mut().mark_startup();
    }

    pub fn print_obj(&self, value: &MObject) -> String {
        printer::print(value)
    }

    pub fn typeof_obj(&self, value: &MObject) -> MType {
        MType::new(types::typeof_value(value), Rc::clone(&self.env))
    }

    /// Parse and evaluate one input against the named buffer, returning
    /// the value of its last expression.
    pub fn eval(&mut self, code: &str, buffer: Option<&str>) -> EvalResult {
        let buffer = buffer.unwrap_or(&self.buffer).to_string();
        self.buffer = buffer.clone();

        let program = match self.parser.parse(code, &buffer) {
            Ok(program) => program,
            Err(ParseError::Incomplete) => return Err(Interrupt::Incomplete),
            Err(ParseError::Lexical(diagnostic)) => {
                return Err(Interrupt::Error(vec![diagnostic]))
            }
            Err(ParseError::Syntax(diagnostics)) => return Err(Interrupt::Error(diagnostics)),
        };

        let mut value = MObject::null();
        for expr in &program.program {
            value = match self.eval_expr(expr) {
                Ok(value) => value,
                Err(Interrupt::Break { operator, .. })
                | Err(Interrupt::Continue { operator, .. }) => {
                    return Err(self.error(
                        &operator,
                        &format!(
                            "Unexpected control flow expression '{}'.",
                            operator.lexeme()
                        ),
                    ));
                }
                Err(other) => return Err(other),
            };
        }
        Ok(value)
    }

    pub fn eval_expr(&mut self, node: &Rc<Expr>) -> EvalResult {
        match node.as_ref() {
            Expr::Terminal(token) => self.eval_terminal(token),
            Expr::Annotation {
                annotation, expr, ..
            } => {
                // An annotated assignment annotates the value before it is
                // bound, so the binding carries the note.
                if let Expr::Assign {
                    target,
                    operator,
                    expr: rhs,
                } = expr.as_ref()
                {
                    let previous = Rc::clone(&self.env);
                    let mut value = self.eval_expr(rhs)?;
                    value.set_annotation(Some(Rc::from(annotation.text())));
                    return self.destructure(&previous, target, operator, value, false);
                }
                let mut value = self.eval_expr(expr)?;
                value.set_annotation(Some(Rc::from(annotation.text())));
                Ok(value)
            }
            Expr::Unary { operator, expr } => self.eval_unary(operator, expr),
            Expr::Binary {
                left,
                operator,
                right,
            } => self.eval_binary(left, operator, right),
            Expr::Grouping { expr } => self.eval_expr(expr),
            Expr::Assign {
                target,
                operator,
                expr,
            } => {
                // Capture the environment first: the right-hand side may
                // push a fresh frame (function or type definition).
                let previous = Rc::clone(&self.env);
                let value = self.eval_expr(expr)?;
                self.destructure(&previous, target, operator, value, false)
            }
            Expr::Declaration { token, .. } => {
                self.env.borrow_mut().define(token.text(), MObject::null());
                Ok(MObject::null())
            }
            Expr::Array { array } => self.eval_array(array),
            Expr::Map { map } => self.eval_map(map),
            Expr::Block { .. } => {
                let env = Environment::with_enclosing(&self.env);
                self.execute_block(node, env)
            }
            Expr::Conditional {
                operators,
                conds,
                exprs,
                default,
            } => self.eval_conditional(operators, conds, exprs, default.as_ref()),
            Expr::For {
                operator,
                target,
                iterator,
                body,
            } => self.eval_for(operator, target, iterator, body),
            Expr::Call {
                operator,
                callee,
                arguments,
            } => {
                let callee = self.eval_expr(callee)?;
                let mut args = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    args.push(self.eval_expr(argument)?);
                }
                match callee {
                    MObject::Function(func) => self.call_function(&func, operator, args),
                    _ => Err(self.error(operator, "Not a function.")),
                }
            }
            Expr::ObjectGet {
                operator,
                object,
                index,
            } => self.eval_object_get(operator, object, index),
            Expr::ArrayGet {
                operator,
                array,
                index,
            } => self.eval_array_get(operator, array, index),
            Expr::ObjectSet { operator, .. } | Expr::ArraySet { operator, .. } => {
                Err(self.error(operator, "Set should not be interpreted directly."))
            }
            Expr::Function(def) => self.eval_function(def),
            Expr::TypeDef { expr, .. } => {
                let definition = self.eval_type(expr)?;
                let usertype = MType::new(definition, Rc::clone(&self.env));
                // Protect the captured environment from later bindings.
                self.env = Environment::with_enclosing(&self.env);
                Ok(MObject::Type(usertype))
            }
        }
    }

    fn eval_terminal(&mut self, token: &Token) -> EvalResult {
        if token.kind == TokenKind::Id {
            return Environment::get(&self.env, token.text())
                .ok_or_else(|| self.error(token, "Undefined variable."));
        }
        let value = match (&token.kind, &token.literal) {
            (TokenKind::Null, _) => Value::Null,
            (_, Some(Literal::Bool(b))) => Value::Bool(*b),
            (_, Some(Literal::Int(i))) => Value::Int(*i),
            (_, Some(Literal::Num(n))) => Value::Num(*n),
            (_, Some(Literal::Str(s))) => Value::Str(Rc::from(s.as_str())),
            _ => Value::Null,
        };
        Ok(MObject::Value(MValue::new(value)))
    }

    fn eval_unary(&mut self, operator: &Token, expr: &Rc<Expr>) -> EvalResult {
        let value = self.eval_expr(expr)?;
        match operator.kind {
            TokenKind::Not => match value {
                MObject::Value(MValue {
                    value: Value::Bool(b),
                    ..
                }) => Ok(MObject::bool(!b)),
                _ => Err(self.error(operator, "Expected a boolean.")),
            },
            TokenKind::Minus => match value {
                MObject::Value(MValue {
                    value: Value::Int(i),
                    ..
                }) => Ok(MObject::int(i.wrapping_neg())),
                MObject::Value(MValue {
                    value: Value::Num(n),
                    ..
                }) => Ok(MObject::num(-n)),
                _ => Err(self.error(operator, "Expected a number.")),
            },
            TokenKind::Return => Err(Interrupt::Return {
                operator: operator.clone(),
                value,
            }),
            TokenKind::Break => Err(Interrupt::Break {
                operator: operator.clone(),
                value,
            }),
            TokenKind::Continue => Err(Interrupt::Continue {
                operator: operator.clone(),
                value,
            }),
            TokenKind::Question => match value {
                MObject::Type(t) => {
                    if t.definition.is_any() {
                        return Ok(MObject::Type(t));
                    }
                    let definition = Rc::new(TypeExpr::Unary {
                        operator: operator.clone(),
                        expr: Rc::clone(&t.definition),
                        annotation: None,
                    });
                    Ok(MObject::Type(MType::new(definition, Rc::clone(&t.env))))
                }
                _ => Err(self.error(operator, "Expected a preceding type.")),
            },
            _ => Err(self.error(operator, "Wrong unary operation.")),
        }
    }

    fn boolean_operand(&self, operator: &Token, value: &MObject) -> Result<bool, Interrupt> {
        match value {
            MObject::Value(MValue {
                value: Value::Bool(b),
                ..
            }) => Ok(*b),
            _ => Err(self.error(operator, "Operands must be boolean.")),
        }
    }

    fn eval_binary(&mut self, left: &Rc<Expr>, operator: &Token, right: &Rc<Expr>) -> EvalResult {
        // Short-circuit operators evaluate the right side lazily.
        if operator.kind == TokenKind::Or {
            let lexpr = self.eval_expr(left)?;
            if self.boolean_operand(operator, &lexpr)? {
                return Ok(MObject::bool(true));
            }
            let rexpr = self.eval_expr(right)?;
            return Ok(MObject::bool(self.boolean_operand(operator, &rexpr)?));
        }
        if operator.kind == TokenKind::And {
            let lexpr = self.eval_expr(left)?;
            if !self.boolean_operand(operator, &lexpr)? {
                return Ok(MObject::bool(false));
            }
            let rexpr = self.eval_expr(right)?;
            return Ok(MObject::bool(self.boolean_operand(operator, &rexpr)?));
        }

        let lexpr = self.eval_expr(left)?;
        let rexpr = self.eval_expr(right)?;

        if operator.kind == TokenKind::Eq {
            return Ok(MObject::bool(deep_equal(&lexpr, &rexpr)));
        }
        if operator.kind == TokenKind::Neq {
            return Ok(MObject::bool(!deep_equal(&lexpr, &rexpr)));
        }

        let (MObject::Value(lval), MObject::Value(rval)) = (&lexpr, &rexpr) else {
            return Err(self.error(operator, "Wrong operand types."));
        };

        match (&lval.value, &rval.value) {
            (Value::Int(l), Value::Int(r)) => {
                let value = match operator.kind {
                    TokenKind::Plus => MObject::int(l.wrapping_add(*r)),
                    TokenKind::Minus => MObject::int(l.wrapping_sub(*r)),
                    TokenKind::Mult => MObject::int(l.wrapping_mul(*r)),
                    TokenKind::Div => {
                        if *r == 0 {
                            return Err(self.error(operator, "Division by zero."));
                        }
                        MObject::int(l.wrapping_div(*r))
                    }
                    TokenKind::Mod => {
                        if *r == 0 {
                            return Err(self.error(operator, "Division by zero."));
                        }
                        MObject::int(l.wrapping_rem(*r))
                    }
                    TokenKind::Greater => MObject::bool(l > r),
                    TokenKind::GreaterEq => MObject::bool(l >= r),
                    TokenKind::Less => MObject::bool(l < r),
                    TokenKind::LessEq => MObject::bool(l <= r),
                    _ => {
                        return Err(self
                            .error(operator, "Unexpected operator for integer/number operands."))
                    }
                };
                Ok(value)
            }
            (Value::Int(_) | Value::Num(_), Value::Int(_) | Value::Num(_)) => {
                let as_f64 = |v: &Value| match v {
                    Value::Int(i) => *i as f64,
                    Value::Num(n) => *n,
                    _ => f64::NAN,
                };
                let l = as_f64(&lval.value);
                let r = as_f64(&rval.value);
                let value = match operator.kind {
                    TokenKind::Plus => MObject::num(l + r),
                    TokenKind::Minus => MObject::num(l - r),
                    TokenKind::Mult => MObject::num(l * r),
                    TokenKind::Div => {
                        if r == 0.0 {
                            return Err(self.error(operator, "Division by zero."));
                        }
                        MObject::num(l / r)
                    }
                    TokenKind::Mod => MObject::num(l % r),
                    TokenKind::Greater => MObject::bool(l > r),
                    TokenKind::GreaterEq => MObject::bool(l >= r),
                    TokenKind::Less => MObject::bool(l < r),
                    TokenKind::LessEq => MObject::bool(l <= r),
                    _ => {
                        return Err(self
                            .error(operator, "Unexpected operator for integer/number operands."))
                    }
                };
                Ok(value)
            }
            (Value::Str(l), Value::Str(r)) => {
                let value = match operator.kind {
                    TokenKind::Plus => MObject::str(&format!("{}{}", l, r)),
                    TokenKind::Greater => MObject::bool(l > r),
                    TokenKind::GreaterEq => MObject::bool(l >= r),
                    TokenKind::Less => MObject::bool(l < r),
                    TokenKind::LessEq => MObject::bool(l <= r),
                    _ => return Err(self.error(operator, "Unexpected operator for string operands.")),
                };
                Ok(value)
            }
            (Value::Array(l), Value::Array(r)) if operator.kind == TokenKind::Plus => {
                let mut items = l.borrow().clone();
                items.extend(r.borrow().iter().cloned());
                Ok(MObject::array(items))
            }
            (Value::Map(l), Value::Map(r)) if operator.kind == TokenKind::Plus => {
                let mut entries = l.borrow().clone();
                for (key, value) in r.borrow().iter() {
                    entries.insert(key.clone(), value.clone());
                }
                Ok(MObject::map(entries))
            }
            _ => Err(self.error(operator, "Wrong operand types.")),
        }
    }

    fn eval_array(&mut self, array: &[Rc<Expr>]) -> EvalResult {
        let items = Rc::new(RefCell::new(Vec::with_capacity(array.len())));
        let result = MObject::Value(MValue::new(Value::Array(Rc::clone(&items))));

        // Items may refer to earlier items through `this`.
        let previous = Rc::clone(&self.env);
        self.env = Environment::with_enclosing(&previous);
        self.env.borrow_mut().define("this", result.clone());

        let mut outcome = Ok(());
        for expr in array {
            match self.eval_expr(expr) {
                Ok(value) => items.borrow_mut().push(value),
                Err(interrupt) => {
                    outcome = Err(interrupt);
                    break;
                }
            }
        }
        self.env = previous;
        outcome?;
        Ok(result)
    }

    fn eval_map(&mut self, map: &IndexMap<String, Rc<Expr>>) -> EvalResult {
        let entries = Rc::new(RefCell::new(IndexMap::with_capacity(map.len())));
        let result = MObject::Value(MValue::new(Value::Map(Rc::clone(&entries))));

        let previous = Rc::clone(&self.env);
        self.env = Environment::with_enclosing(&previous);
        self.env.borrow_mut().define("this", result.clone());

        let mut outcome = Ok(());
        for (key, expr) in map {
            match self.eval_expr(expr) {
                Ok(value) => {
                    entries.borrow_mut().insert(key.clone(), value);
                }
                Err(interrupt) => {
                    outcome = Err(interrupt);
                    break;
                }
            }
        }
        self.env = previous;
        outcome?;
        Ok(result)
    }

    /// Evaluate a block's expressions in the given environment, restoring
    /// the previous environment on every exit path.
    pub fn execute_block(&mut self, block: &Expr, env: Env) -> EvalResult {
        let Expr::Block { exprs } = block else {
            return Ok(MObject::null());
        };
        let previous = std::mem::replace(&mut self.env, env);
        let mut result = Ok(MObject::null());
        for expr in exprs {
            result = self.eval_expr(expr);
            if result.is_err() {
                break;
            }
        }
        self.env = previous;
        result
    }

    fn eval_conditional(
        &mut self,
        operators: &[Token],
        conds: &[Rc<Expr>],
        exprs: &[Rc<Expr>],
        default: Option<&Rc<Expr>>,
    ) -> EvalResult {
        for (n, cond) in conds.iter().enumerate() {
            let value = self.eval_expr(cond)?;
            let MObject::Value(MValue {
                value: Value::Bool(truth),
                ..
            }) = value
            else {
                return Err(self.error(
                    &operators[n],
                    "Condition must evaluate to a boolean value.",
                ));
            };
            if truth {
                return self.eval_expr(&exprs[n]);
            }
        }
        match default {
            Some(expr) => self.eval_expr(expr),
            None => Ok(MObject::null()),
        }
    }

    fn eval_for(
        &mut self,
        operator: &Token,
        target: &Rc<Expr>,
        iterator: &Rc<Expr>,
        body: &Rc<Expr>,
    ) -> EvalResult {
        let iterator = match self.eval_expr(iterator)? {
            MObject::Function(func) => func,
            _ => return Err(self.error(operator, "Can only iterate over an iterator function.")),
        };

        let mut value = MObject::null();
        let mut item = self.call_function(&iterator, operator, vec![MObject::null()])?;
        while !item.is_null() {
            // The loop variable is defined fresh each iteration.
            let env = Environment::with_enclosing(&self.env);
            self.destructure(&env, target, operator, item, true)?;
            match self.execute_block(body, env) {
                Ok(result) => value = result,
                Err(Interrupt::Break { value: brk, .. }) => return Ok(brk),
                Err(Interrupt::Continue { .. }) => {}
                Err(other) => return Err(other),
            }
            item = self.call_function(&iterator, operator, vec![MObject::null()])?;
        }
        Ok(value)
    }

    fn eval_object_get(
        &mut self,
        operator: &Token,
        object: &Rc<Expr>,
        index: &Rc<Expr>,
    ) -> EvalResult {
        let object = self.eval_expr(object)?;
        let index = self.eval_expr(index)?;
        let MObject::Value(container) = &object else {
            return Err(self.error(operator, "Attempted to access a property on a non-object."));
        };
        let MObject::Value(MValue {
            value: Value::Str(key),
            ..
        }) = &index
        else {
            return Err(self.error(operator, "Wrong object property."));
        };
        match &container.value {
            Value::Map(entries) => match entries.borrow().get(key.as_ref()) {
                Some(value) => Ok(value.clone()),
                None => Err(self.error(operator, &format!("Unknown property '{}'.", key))),
            },
            _ => Err(self.error(operator, "Attempted to access a property on a non-object.")),
        }
    }

    fn eval_array_get(
        &mut self,
        operator: &Token,
        array: &Rc<Expr>,
        index: &Rc<Expr>,
    ) -> EvalResult {
        let array = self.eval_expr(array)?;
        let index = self.eval_expr(index)?;
        let MObject::Value(container) = &array else {
            return Err(self.error(operator, "Attempted to access a member on a non-array."));
        };
        let MObject::Value(MValue {
            value: Value::Int(idx),
            ..
        }) = index
        else {
            return Err(self.error(operator, "Array index must be an integer."));
        };
        match &container.value {
            Value::Array(items) => {
                let items = items.borrow();
                let len = items.len() as i64;
                // Negative indices wrap around when in range.
                if len > 0 && idx.unsigned_abs() < len as u64 {
                    let resolved = idx.rem_euclid(len) as usize;
                    Ok(items[resolved].clone())
                } else {
                    Err(self.error(operator, "Array index out of range."))
                }
            }
            _ => Err(self.error(operator, "Attempted to access a member on a non-array.")),
        }
    }

    /// Pattern-directed assignment. Identifier targets rebind, declaration
    /// targets define, bracket and brace patterns recurse, and set nodes
    /// write into containers.
    pub fn destructure(
        &mut self,
        env: &Env,
        target: &Rc<Expr>,
        operator: &Token,
        value: MObject,
        define: bool,
    ) -> EvalResult {
        match target.as_ref() {
            Expr::Terminal(token) if token.kind == TokenKind::Id => {
                let name = token.text();
                if define {
                    env.borrow_mut().define(name, MObject::null());
                }
                if !Environment::set(env, name, value.clone()) {
                    return Err(
                        self.error(operator, "Attempted to assign to an uninitialized variable.")
                    );
                }
                Ok(value)
            }
            Expr::Annotation {
                annotation, expr, ..
            } => {
                let mut value = value;
                value.set_annotation(Some(Rc::from(annotation.text())));
                self.destructure(env, expr, operator, value, define)
            }
            Expr::Declaration { token, .. } => {
                env.borrow_mut().define(token.text(), value.clone());
                Ok(value)
            }
            Expr::ObjectSet {
                object,
                index,
                operator: set_op,
            } => {
                let setter = self.eval_expr(object)?;
                let key = self.eval_expr(index)?;
                let MObject::Value(container) = &setter else {
                    return Err(self.error(set_op, "Attempted to assign to a non-object."));
                };
                let MObject::Value(MValue {
                    value: Value::Str(key),
                    ..
                }) = &key
                else {
                    return Err(self.error(set_op, "Wrong object property."));
                };
                match &container.value {
                    Value::Map(entries) => {
                        entries.borrow_mut().insert(key.to_string(), value.clone());
                        Ok(value)
                    }
                    _ => Err(self.error(set_op, "Attempted to assign to a non-object.")),
                }
            }
            Expr::ArraySet {
                array,
                index,
                operator: set_op,
            } => {
                let setter = self.eval_expr(array)?;
                let idx = self.eval_expr(index)?;
                let MObject::Value(container) = &setter else {
                    return Err(self.error(set_op, "Attempted to assign to member of a non-array."));
                };
                let MObject::Value(MValue {
                    value: Value::Int(idx),
                    ..
                }) = idx
                else {
                    return Err(self.error(set_op, "Attempted to use a non-integer index."));
                };
                match &container.value {
                    Value::Array(items) => {
                        let mut items = items.borrow_mut();
                        let len = items.len() as i64;
                        if len > 0 && idx.unsigned_abs() < len as u64 {
                            let resolved = idx.rem_euclid(len) as usize;
                            items[resolved] = value.clone();
                            Ok(value)
                        } else {
                            Err(self.error(set_op, "Array index out of range."))
                        }
                    }
                    _ => Err(self.error(set_op, "Attempted to assign to member of a non-array.")),
                }
            }
            Expr::Array { array: pattern } => {
                let MObject::Value(MValue {
                    value: Value::Array(source),
                    ..
                }) = &value
                else {
                    return Err(self.error(operator, "Attempted to assign to a wrong target."));
                };
                let source = source.borrow().clone();
                if pattern.len() > source.len() {
                    return Err(self.error(
                        operator,
                        "The assignment expects a larger array on the right-hand-side.",
                    ));
                }
                let mut result = Vec::with_capacity(pattern.len());
                for (n, sub) in pattern.iter().enumerate() {
                    self.destructure(env, sub, operator, source[n].clone(), define)?;
                    result.push(source[n].clone());
                }
                Ok(MObject::array(result))
            }
            Expr::Map { map: pattern } => {
                let MObject::Value(MValue {
                    value: Value::Map(source),
                    ..
                }) = &value
                else {
                    return Err(self.error(operator, "Attempted to assign to a wrong target."));
                };
                let source = source.borrow().clone();
                let mut result = IndexMap::with_capacity(pattern.len());
                for (key, sub) in pattern {
                    let Some(item) = source.get(key) else {
                        return Err(self.error(
                            operator,
                            &format!(
                                "Attempted to extract the unknown key '{}' from the right-hand-side.",
                                key
                            ),
                        ));
                    };
                    self.destructure(env, sub, operator, item.clone(), define)?;
                    result.insert(key.clone(), item.clone());
                }
                Ok(MObject::map(result))
            }
            _ => Err(self.error(operator, "Attempted to assign to a wrong target.")),
        }
    }

    fn eval_function(&mut self, def: &Rc<FunctionDef>) -> EvalResult {
        let types = self.eval_type(&def.types)?;
        let definition = Rc::new(FunctionDef {
            operator: def.operator.clone(),
            parameters: def.parameters.clone(),
            types,
            body: Rc::clone(&def.body),
        });

        let closure = Rc::clone(&self.env);
        let callable = if def.operator.kind == TokenKind::Function {
            let (intypes, outtype) =
                FunctionValue::split_types(&definition.types, definition.parameters.len(), &closure);
            let annotation = definition.types.annotation().map(Rc::from);
            Rc::new(FunctionValue {
                definition,
                closure,
                intypes,
                outtype,
                annotation: RefCell::new(annotation),
                kind: FunctionKind::User,
            })
        } else {
            let examples = self.eval_expr(&def.body)?;
            oracle::build(self, definition, examples)?
        };

        // Protect the captured environment from later bindings.
        self.env = Environment::with_enclosing(&self.env);
        Ok(MObject::Function(callable))
    }

    /// Evaluate a type expression into canonical form: annotations become
    /// node slots, `Any?` collapses to `Any`, and enum members are
    /// evaluated eagerly.
    pub fn eval_type(&mut self, node: &Rc<TypeExpr>) -> Result<Rc<TypeExpr>, Interrupt> {
        match node.as_ref() {
            TypeExpr::Terminal { .. } => Ok(Rc::clone(node)),
            TypeExpr::Annotation {
                annotation, expr, ..
            } => {
                let inner = self.eval_type(expr)?;
                Ok(Rc::new(
                    inner.with_annotation(Some(annotation.text().to_string())),
                ))
            }
            TypeExpr::Grouping { expr } => {
                let inner = self.eval_type(expr)?;
                Ok(Rc::new(TypeExpr::Grouping { expr: inner }))
            }
            TypeExpr::Unary {
                operator, expr, ..
            } => {
                let inner = self.eval_type(expr)?;
                if inner.is_any() {
                    return Ok(inner);
                }
                Ok(Rc::new(TypeExpr::Unary {
                    operator: operator.clone(),
                    expr: inner,
                    annotation: None,
                }))
            }
            TypeExpr::Binary {
                left,
                operator,
                right,
                ..
            } => {
                let left = self.eval_type(left)?;
                let right = self.eval_type(right)?;
                Ok(Rc::new(TypeExpr::Binary {
                    left,
                    operator: operator.clone(),
                    right,
                    annotation: None,
                }))
            }
            TypeExpr::Enum { operator, expr, .. } => {
                let values = self.eval_expr(expr)?;
                let MObject::Value(MValue {
                    value: Value::Array(items),
                    ..
                }) = &values
                else {
                    return Err(
                        self.error(operator, "Expected a non-empty array of possible values.")
                    );
                };
                let members = items.borrow().clone();
                if members.is_empty() {
                    return Err(
                        self.error(operator, "Expected a non-empty array of possible values.")
                    );
                }
                Ok(Rc::new(TypeExpr::Enum {
                    operator: operator.clone(),
                    expr: Rc::clone(expr),
                    values: members,
                    annotation: None,
                }))
            }
            TypeExpr::Array { expr, .. } => {
                let inner = self.eval_type(expr)?;
                Ok(Rc::new(TypeExpr::Array {
                    expr: inner,
                    annotation: None,
                }))
            }
            TypeExpr::Map { map, required, .. } => {
                let mut evaluated = IndexMap::with_capacity(map.len());
                for (key, expr) in map {
                    evaluated.insert(key.clone(), self.eval_type(expr)?);
                }
                Ok(Rc::new(TypeExpr::Map {
                    map: evaluated,
                    required: required.clone(),
                    annotation: None,
                }))
            }
        }
    }

    fn type_mismatch(&self, err: TypeError, operator: &Token) -> Interrupt {
        self.error(operator, &err.0)
    }

    /// Call a function value: partial application on missing arguments,
    /// argument and return type checks around the actual invocation.
    pub fn call_function(
        &mut self,
        func: &Rc<FunctionValue>,
        operator: &Token,
        args: Vec<MObject>,
    ) -> EvalResult {
        if args.len() < func.definition.parameters.len() {
            return Ok(MObject::Function(partial(func, args)));
        }

        for (arg, typeobj) in args.iter().zip(&func.intypes) {
            let ok = types::checktype(arg, typeobj)
                .map_err(|e| self.type_mismatch(e, operator))?;
            if !ok {
                let reqtype = printer::print(&MObject::Type(typeobj.clone()));
                let val = printer::print(arg);
                let valtype = printer::print(&MObject::Type(self.typeof_obj(arg)));
                return Err(self.error(
                    operator,
                    &format!(
                        "Wrong type of function argument: Expected {} but got value {} of {}.",
                        reqtype, val, valtype
                    ),
                ));
            }
        }

        let value = self.invoke(func, operator, args)?;

        let ok = types::checktype(&value, &func.outtype)
            .map_err(|e| self.type_mismatch(e, operator))?;
        if !ok {
            let reqtype = printer::print(&MObject::Type(func.outtype.clone()));
            let val = printer::print(&value);
            let valtype = printer::print(&MObject::Type(self.typeof_obj(&value)));
            let message = format!(
                "Wrong type of function output: Expected {} but got value {} of {}.",
                reqtype, val, valtype
            );
            // An oracle's bad output is recoverable: it degrades to an
            // annotated null rather than aborting evaluation.
            if matches!(func.kind, FunctionKind::Oracle(_)) {
                return Ok(MObject::annotated_null(&message));
            }
            return Err(self.error(operator, &message));
        }
        Ok(value)
    }

    fn invoke(
        &mut self,
        func: &Rc<FunctionValue>,
        operator: &Token,
        args: Vec<MObject>,
    ) -> EvalResult {
        match &func.kind {
            FunctionKind::User => {
                let env = Environment::with_enclosing(&func.closure);
                for (param, arg) in func.definition.parameters.iter().zip(args) {
                    env.borrow_mut().define(param.text(), arg);
                }
                match self.execute_block(&func.definition.body, env) {
                    Ok(value) => Ok(value),
                    Err(Interrupt::Return { value, .. }) => Ok(value),
                    Err(Interrupt::Break { operator, .. })
                    | Err(Interrupt::Continue { operator, .. }) => Err(self.error(
                        &operator,
                        &format!(
                            "Unexpected control flow expression '{}'.",
                            operator.lexeme()
                        ),
                    )),
                    Err(other) => Err(other),
                }
            }
            FunctionKind::Native(callable) => callable.call(self, operator, args),
            FunctionKind::Oracle(spec) => oracle::consult(self, func, spec, args),
            FunctionKind::Partial { root, applied } => {
                let mut full = applied.clone();
                full.extend(args);
                self.invoke(root, operator, full)
            }
        }
    }

    /// Evaluate source as a module: a fresh environment branched off the
    /// startup frame, flattened into a map of the module's bindings.
    pub fn import_code(&mut self, code: &str, name: &str) -> EvalResult {
        let startup = Environment::startup_frame(&self.env);
        let module_env = Environment::with_enclosing(&startup);

        let current_env = std::mem::replace(&mut self.env, module_env);
        let current_buffer = self.buffer.clone();

        let outcome = self.eval(code, Some(name));

        let module = Environment::flattened(&self.env);
        self.env = current_env;
        self.set_buffer(&current_buffer);
        outcome?;

        Ok(MObject::map(module))
    }
}
