//! AST node model shared by the parser, evaluator, type checker, schema
//! emitters and printer.
//!
//! Nodes are reference counted: the same subtree may be held by the parse
//! result, by function values, and by first-class types at once. All nodes
//! are immutable after parse; type evaluation rebuilds canonical `TypeExpr`
//! nodes instead of mutating parser output.

use crate::tokens::{Literal, Token, TokenKind};
use crate::values::MObject;
use indexmap::{IndexMap, IndexSet};
use std::rc::Rc;

/// A value expression.
#[derive(Debug, Clone)]
pub enum Expr {
    /// Literal or identifier reference.
    Terminal(Token),
    /// `not`, unary `-`, postfix `?` on a type value, and the control
    /// tokens `return`/`break`/`continue` which signal up the call stack.
    Unary { operator: Token, expr: Rc<Expr> },
    Binary {
        left: Rc<Expr>,
        operator: Token,
        right: Rc<Expr>,
    },
    Grouping { expr: Rc<Expr> },
    Assign {
        target: Rc<Expr>,
        operator: Token,
        expr: Rc<Expr>,
    },
    /// `let name`
    Declaration { operator: Token, token: Token },
    /// `# "..."` attached to a sub-expression.
    Annotation {
        operator: Token,
        annotation: Token,
        expr: Rc<Expr>,
    },
    Array { array: Vec<Rc<Expr>> },
    Map { map: IndexMap<String, Rc<Expr>> },
    /// `do ... end`
    Block { exprs: Vec<Rc<Expr>> },
    Conditional {
        operators: Vec<Token>,
        conds: Vec<Rc<Expr>>,
        exprs: Vec<Rc<Expr>>,
        default: Option<Rc<Expr>>,
    },
    For {
        operator: Token,
        target: Rc<Expr>,
        iterator: Rc<Expr>,
        body: Rc<Expr>,
    },
    Call {
        operator: Token,
        callee: Rc<Expr>,
        arguments: Vec<Rc<Expr>>,
    },
    ObjectGet {
        operator: Token,
        object: Rc<Expr>,
        index: Rc<Expr>,
    },
    ArrayGet {
        operator: Token,
        array: Rc<Expr>,
        index: Rc<Expr>,
    },
    /// Constructed only when an assignment target has a getter on its
    /// left-hand side; never produced directly by the grammar.
    ObjectSet {
        operator: Token,
        object: Rc<Expr>,
        index: Rc<Expr>,
    },
    ArraySet {
        operator: Token,
        array: Rc<Expr>,
        index: Rc<Expr>,
    },
    /// `fun(...)` or `oracle(...)` literal.
    Function(Rc<FunctionDef>),
    /// `type <type-expr>`; evaluates to a first-class type value.
    TypeDef { operator: Token, expr: Rc<TypeExpr> },
}

/// Shared definition of a function or oracle literal.
#[derive(Debug, Clone)]
pub struct FunctionDef {
    /// The `fun` or `oracle` keyword token.
    pub operator: Token,
    pub parameters: Vec<Token>,
    /// Parameter and return types composed right-associatively into a
    /// `TypeExpr::Binary` chain: `(A, B) -> C` becomes `A -> B -> C`.
    pub types: Rc<TypeExpr>,
    /// Block body for functions, examples array for oracles.
    pub body: Rc<Expr>,
}

/// A top-level sequence of expressions.
#[derive(Debug, Clone)]
pub struct Program {
    pub program: Vec<Rc<Expr>>,
}

/// A type expression. The `annotation` slots are empty on parser output and
/// filled during type evaluation when `Annotation` wrappers are unwrapped.
#[derive(Debug, Clone)]
pub enum TypeExpr {
    /// Primitive name (`Null`, `Bool`, `Int`, `Num`, `Str`, `Any`, `Type`)
    /// or an identifier referencing a user-defined type.
    Terminal {
        token: Token,
        annotation: Option<String>,
    },
    Annotation {
        operator: Token,
        annotation: Token,
        expr: Rc<TypeExpr>,
    },
    /// Optional type `T?`.
    Unary {
        operator: Token,
        expr: Rc<TypeExpr>,
        annotation: Option<String>,
    },
    /// Function arrow `A -> B`.
    Binary {
        left: Rc<TypeExpr>,
        operator: Token,
        right: Rc<TypeExpr>,
        annotation: Option<String>,
    },
    /// `Enum [ ... ]`; `values` holds the eagerly evaluated members after
    /// type evaluation and is empty on parser output.
    Enum {
        operator: Token,
        expr: Rc<Expr>,
        values: Vec<MObject>,
        annotation: Option<String>,
    },
    /// `[T]`
    Array {
        expr: Rc<TypeExpr>,
        annotation: Option<String>,
    },
    /// `{k!: T, k2: T}`; `required` lists the keys marked with `!`.
    Map {
        map: IndexMap<String, Rc<TypeExpr>>,
        required: IndexSet<String>,
        annotation: Option<String>,
    },
    Grouping { expr: Rc<TypeExpr> },
}

impl TypeExpr {
    /// The annotation attached to this node, if any.
    pub fn annotation(&self) -> Option<&str> {
        match self {
            TypeExpr::Terminal { annotation, .. }
            | TypeExpr::Unary { annotation, .. }
            | TypeExpr::Binary { annotation, .. }
            | TypeExpr::Enum { annotation, .. }
            | TypeExpr::Array { annotation, .. }
            | TypeExpr::Map { annotation, .. } => annotation.as_deref(),
            TypeExpr::Annotation { annotation, .. } => Some(annotation.text()),
            TypeExpr::Grouping { expr } => expr.annotation(),
        }
    }

    /// A copy of this node with the annotation slot replaced.
    pub fn with_annotation(&self, note: Option<String>) -> TypeExpr {
        let mut copy = self.clone();
        match &mut copy {
            TypeExpr::Terminal { annotation, .. }
            | TypeExpr::Unary { annotation, .. }
            | TypeExpr::Binary { annotation, .. }
            | TypeExpr::Enum { annotation, .. }
            | TypeExpr::Array { annotation, .. }
            | TypeExpr::Map { annotation, .. } => *annotation = note,
            TypeExpr::Annotation { .. } | TypeExpr::Grouping { .. } => {}
        }
        copy
    }

    /// True for the `Any` terminal.
    pub fn is_any(&self) -> bool {
        matches!(
            self,
            TypeExpr::Terminal { token, .. }
                if token.kind == TokenKind::Type && token.text() == "Any"
        )
    }

    /// True for the `Null` terminal.
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            TypeExpr::Terminal { token, .. }
                if token.kind == TokenKind::Type && token.text() == "Null"
        )
    }
}

/// A fresh `Any` terminal positioned at an existing token.
pub fn any_type_terminal(at: &Token) -> TypeExpr {
    named_type_terminal(at, "Any")
}

/// A fresh `Null` terminal positioned at an existing token.
pub fn null_type_terminal(at: &Token) -> TypeExpr {
    named_type_terminal(at, "Null")
}

fn named_type_terminal(at: &Token, name: &str) -> TypeExpr {
    TypeExpr::Terminal {
        token: Token::new(
            TokenKind::Type,
            Some(Literal::Str(name.to_string())),
            Rc::clone(&at.buffer),
            at.index,
        ),
        annotation: None,
    }
}

/// A fresh `null` literal expression positioned at an existing token.
pub fn null_terminal(at: &Token) -> Expr {
    Expr::Terminal(Token::new(
        TokenKind::Null,
        None,
        Rc::clone(&at.buffer),
        at.index,
    ))
}
