//! Caret-formatted diagnostics for lexical, syntax and runtime errors.

use std::fmt;

const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Semantic category of a reported error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Lexical,
    Syntax,
    Runtime,
}

impl Category {
    pub fn label(&self) -> &'static str {
        match self {
            Category::Lexical => "LEXICAL ERROR",
            Category::Syntax => "SYNTAX ERROR",
            Category::Runtime => "RUNTIME ERROR",
        }
    }
}

/// A rendered error location: buffer name, 1-based line, 0-based column,
/// and up to two lines of source context ending at the offending line.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostic {
    pub category: Category,
    pub message: String,
    pub buffer: String,
    pub line: usize,
    pub col: usize,
    pub context: Vec<String>,
}

impl Diagnostic {
    /// Plain rendering with a caret under the offending column:
    ///
    /// ```text
    /// SYNTAX ERROR: In <repl>, line 2, near
    /// let x =
    ///         ^
    /// Expected an expression.
    /// ```
    pub fn render(&self) -> String {
        let mut out = format!(
            "{}: In {}, line {}, near\n",
            self.category.label(),
            self.buffer,
            self.line
        );
        for line in &self.context {
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(&" ".repeat(self.col));
        out.push_str("^\n");
        out.push_str(&self.message);
        out
    }

    /// ANSI rendering for terminal display.
    pub fn render_ansi(&self) -> String {
        format!("{}{}{}", RED, self.render(), RESET)
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}
