//! Deterministic pretty-printer for AST nodes and runtime values.
//!
//! Output is block-indented with four spaces; when the compact single-line
//! form of a fragment fits in the remaining line space it is used instead.
//! Printing stops descending at a fixed depth and emits ellipsis markers.

use crate::ast::{Expr, TypeExpr};
use crate::tokens::{Literal, TokenKind};
use crate::values::{FunctionValue, MObject, MType, Value};

const TABLEN: usize = 4;
const MAXDEPTH: usize = 4;
const LINELEN: usize = 80;

pub struct Printer {
    indent: usize,
}

impl Default for Printer {
    fn default() -> Self {
        Self::new()
    }
}

impl Printer {
    pub fn new() -> Self {
        Self { indent: 0 }
    }

    fn prefix(&self) -> String {
        " ".repeat(self.indent * TABLEN)
    }

    fn remaining_line_space(&self) -> usize {
        LINELEN.saturating_sub(self.indent * TABLEN)
    }

    fn is_max_depth(&self) -> bool {
        self.indent >= MAXDEPTH
    }

    /// Collapse a fragment to one line: newlines become spaces, space runs
    /// collapse, and spaces adjacent to brackets disappear.
    pub fn shorten(text: &str) -> String {
        let mut collapsed = String::with_capacity(text.len());
        let mut prev_space = false;
        for mut c in text.chars() {
            if c == '\n' {
                c = ' ';
            }
            if c == ' ' {
                if prev_space {
                    continue;
                }
                prev_space = true;
            } else {
                prev_space = false;
            }
            collapsed.push(c);
        }
        let mut out = String::with_capacity(collapsed.len());
        for c in collapsed.chars() {
            if matches!(c, ']' | ')' | '}') && out.ends_with(' ') {
                out.pop();
            }
            if c == ' ' && matches!(out.chars().last(), Some('[' | '(' | '{')) {
                continue;
            }
            out.push(c);
        }
        out
    }

    fn shorten_if_possible(&self, long: String) -> String {
        let short = Self::shorten(&long);
        if short.len() < self.remaining_line_space() {
            short
        } else {
            long
        }
    }

    fn escape(text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        for c in text.chars() {
            match c {
                '\\' => out.push_str("\\\\"),
                '"' => out.push_str("\\\""),
                '\n' => out.push_str("\\n"),
                '\r' => out.push_str("\\r"),
                '\t' => out.push_str("\\t"),
                _ => out.push(c),
            }
        }
        out
    }

    pub fn expr(&mut self, node: &Expr) -> String {
        match node {
            Expr::Terminal(token) => match token.kind {
                TokenKind::Null => "null".to_string(),
                TokenKind::String => format!("\"{}\"", Self::escape(token.text())),
                TokenKind::Number => match &token.literal {
                    Some(Literal::Num(n)) => format!("{:?}", n),
                    _ => token.lexeme(),
                },
                _ => token.lexeme(),
            },
            Expr::Annotation { expr, .. } => self.expr(expr),
            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left = self.expr(left);
                let right = self.expr(right);
                format!("{} {} {}", left, operator.lexeme(), right)
            }
            Expr::Unary { operator, expr } => {
                let inner = self.expr(expr);
                match operator.kind {
                    TokenKind::Minus => format!("-{}", inner),
                    TokenKind::Not => format!("not {}", inner),
                    TokenKind::Question => format!("{}?", inner),
                    _ => format!("{}({})", operator.lexeme(), inner),
                }
            }
            Expr::Grouping { expr } => {
                if self.is_max_depth() {
                    return "(...)".to_string();
                }
                format!("({})", self.expr(expr))
            }
            Expr::ArrayGet { array, index, .. } => {
                format!("{}[{}]", self.expr(array), self.expr(index))
            }
            Expr::ArraySet { array, index, .. } => {
                format!("{}[{}]", self.expr(array), self.expr(index))
            }
            Expr::ObjectGet { object, index, .. } => {
                format!("{}.{}", self.expr(object), self.expr(index))
            }
            Expr::ObjectSet { object, index, .. } => {
                format!("{}.{}", self.expr(object), self.expr(index))
            }
            Expr::Assign { target, expr, .. } => {
                let expr = self.expr(expr);
                let target = self.expr(target);
                format!("{} = {}", target, expr)
            }
            Expr::Declaration { token, .. } => format!("let {}", token.text()),
            Expr::Array { array } => {
                if self.is_max_depth() {
                    return "[...]".to_string();
                }
                self.indent += 1;
                let items: Vec<String> = array
                    .iter()
                    .map(|expr| format!("{}{}", self.prefix(), self.expr(expr)))
                    .collect();
                self.indent -= 1;
                format!("[\n{}\n{}]", items.join(",\n"), self.prefix())
            }
            Expr::Map { map } => {
                if self.is_max_depth() {
                    return "{...}".to_string();
                }
                self.indent += 1;
                let items: Vec<String> = map
                    .iter()
                    .map(|(key, expr)| format!("{}{}: {}", self.prefix(), key, self.expr(expr)))
                    .collect();
                self.indent -= 1;
                format!("{{\n{}\n{}}}", items.join(",\n"), self.prefix())
            }
            Expr::Block { .. } => {
                if self.is_max_depth() {
                    return "do ... end".to_string();
                }
                let mut content = "do\n".to_string();
                content.push_str(&self.chunk(node));
                content.push_str(&self.prefix());
                content.push_str("end");
                content
            }
            Expr::Conditional {
                conds,
                exprs,
                default,
                ..
            } => {
                if self.is_max_depth() {
                    return "if ... end".to_string();
                }
                let mut content = format!("if {} then\n{}", self.expr(&conds[0]), self.chunk(&exprs[0]));
                for n in 1..conds.len() {
                    content.push_str(&format!(
                        "{}elif {} then\n{}",
                        self.prefix(),
                        self.expr(&conds[n]),
                        self.chunk(&exprs[n])
                    ));
                }
                if let Some(default) = default {
                    content.push_str(&format!("{}else\n{}", self.prefix(), self.chunk(default)));
                }
                content.push_str(&self.prefix());
                content.push_str("end");
                content
            }
            Expr::For {
                target,
                iterator,
                body,
                ..
            } => {
                if self.is_max_depth() {
                    return "for ... end".to_string();
                }
                format!(
                    "for {} in {} {}",
                    self.expr(target),
                    self.expr(iterator),
                    self.expr(body)
                )
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                let args: Vec<String> = arguments.iter().map(|a| self.expr(a)).collect();
                format!("{}({})", self.expr(callee), args.join(", "))
            }
            Expr::Function(def) => {
                let mut parameters = Vec::new();
                let mut types = &def.types;
                for param in &def.parameters {
                    if let TypeExpr::Binary { left, right, .. } = types.as_ref() {
                        parameters.push(format!("{}: {}", param.text(), self.type_expr(left)));
                        types = right;
                    }
                }
                let out_type = self.type_expr(types);
                let body = self.expr(&def.body);
                format!("fun({}) -> {} {}", parameters.join(", "), out_type, body)
            }
            Expr::TypeDef { expr, .. } => format!("type {}", self.type_expr(expr)),
        }
    }

    fn chunk(&mut self, node: &Expr) -> String {
        if self.is_max_depth() {
            return "...".to_string();
        }
        let Expr::Block { exprs } = node else {
            return String::new();
        };
        self.indent += 1;
        let mut content = String::new();
        for expr in exprs {
            content.push_str(&self.prefix());
            content.push_str(&self.expr(expr));
            content.push('\n');
        }
        self.indent -= 1;
        content
    }

    pub fn type_expr(&mut self, node: &TypeExpr) -> String {
        match node {
            TypeExpr::Terminal { token, .. } => token.text().to_string(),
            TypeExpr::Annotation { expr, .. } => self.type_expr(expr),
            TypeExpr::Grouping { expr } => {
                if self.is_max_depth() {
                    return "(...)".to_string();
                }
                format!("({})", self.type_expr(expr))
            }
            TypeExpr::Unary { expr, .. } => format!("{}?", self.type_expr(expr)),
            TypeExpr::Binary { left, right, .. } => {
                self.indent += 1;
                let left = self.type_expr(left);
                let right = self.type_expr(right);
                let content = format!("{}\n{} -> {}\n", left, self.prefix(), right);
                self.indent -= 1;
                self.shorten_if_possible(content)
            }
            TypeExpr::Enum { expr, values, .. } => {
                if self.is_max_depth() {
                    return "Enum(...)".to_string();
                }
                if values.is_empty() {
                    return format!("Enum {}", self.expr(expr));
                }
                let items: Vec<String> = values.iter().map(|v| self.value(v)).collect();
                format!("Enum [{}]", items.join(", "))
            }
            TypeExpr::Array { expr, .. } => {
                if self.is_max_depth() {
                    return "[...]".to_string();
                }
                format!("[{}]", self.type_expr(expr))
            }
            TypeExpr::Map { map, required, .. } => {
                if self.is_max_depth() {
                    return "{...}".to_string();
                }
                self.indent += 1;
                let items: Vec<String> = map
                    .iter()
                    .map(|(key, expr)| {
                        let marker = if required.contains(key) { "!" } else { "" };
                        format!("{}{}{}: {}", self.prefix(), key, marker, self.type_expr(expr))
                    })
                    .collect();
                self.indent -= 1;
                format!("{{\n{}\n{}}}", items.join(",\n"), self.prefix())
            }
        }
    }

    pub fn value(&mut self, value: &MObject) -> String {
        let text = match value {
            MObject::Value(v) => match &v.value {
                Value::Null => "null".to_string(),
                Value::Bool(b) => if *b { "true" } else { "false" }.to_string(),
                Value::Int(i) => i.to_string(),
                Value::Num(n) => format!("{:?}", n),
                Value::Str(s) => format!("\"{}\"", Self::escape(s)),
                Value::Array(items) => {
                    if self.is_max_depth() {
                        return "[...]".to_string();
                    }
                    self.indent += 1;
                    let items: Vec<String> = items
                        .borrow()
                        .iter()
                        .map(|item| format!("{}{}", self.prefix(), self.value(item)))
                        .collect();
                    self.indent -= 1;
                    format!("[\n{}\n{}]", items.join(",\n"), self.prefix())
                }
                Value::Map(entries) => {
                    if self.is_max_depth() {
                        return "{...}".to_string();
                    }
                    self.indent += 1;
                    let items: Vec<String> = entries
                        .borrow()
                        .iter()
                        .map(|(key, item)| {
                            format!("{}\"{}\": {}", self.prefix(), key, self.value(item))
                        })
                        .collect();
                    self.indent -= 1;
                    format!("{{\n{}\n{}}}", items.join(",\n"), self.prefix())
                }
            },
            MObject::Function(func) => self.function_signature(func),
            MObject::Type(t) => format!("type {}", self.type_expr(&t.definition)),
        };
        self.shorten_if_possible(text)
    }

    fn function_signature(&mut self, func: &FunctionValue) -> String {
        let mut items = Vec::new();
        for (param, ptype) in func.definition.parameters.iter().zip(&func.intypes) {
            items.push(format!("{}:{}", param.text(), self.type_expr(&ptype.definition)));
        }
        self.indent += 1;
        let separator = format!("\n{} -> ", self.prefix());
        self.indent -= 1;
        let mut text = items.join(&separator);
        text.push_str(&separator);
        text.push_str(&self.type_expr(&func.outtype.definition));
        text
    }
}

/// Print a runtime value in its canonical display form.
pub fn print(value: &MObject) -> String {
    let mut printer = Printer::new();
    let text = printer.value(value);
    printer.shorten_if_possible(text)
}

/// Print a value expression.
pub fn print_expr(expr: &Expr) -> String {
    let mut printer = Printer::new();
    let text = printer.expr(expr);
    printer.shorten_if_possible(text)
}

/// Print a type expression.
pub fn print_type(node: &TypeExpr) -> String {
    let mut printer = Printer::new();
    let text = printer.type_expr(node);
    printer.shorten_if_possible(text)
}

/// Print a first-class type value, `type ...` prefix included.
pub fn print_mtype(t: &MType) -> String {
    let mut printer = Printer::new();
    let text = format!("type {}", printer.type_expr(&t.definition));
    printer.shorten_if_possible(text)
}
