//! Recursive descent parser for MindScript.
//!
//! Grammar (lowest to highest precedence):
//!
//! ```text
//! program     ::= chunk EOF
//! chunk       ::= expression*
//! expression  ::= ANNOTATION? ("return"|"break"|"continue") "~(" expression ")"
//!                 | ANNOTATION? assignment
//! assignment  ::= disjunction "=" expression | disjunction
//! disjunction ::= conjunction ("or" conjunction)*
//! conjunction ::= equality ("and" equality)*
//! equality    ::= comparison (("=="|"!=") comparison)*
//! comparison  ::= term (("<"|"<="|">"|">=") term)*
//! term        ::= factor (("+"|"-") factor)*
//! factor      ::= unary (("*"|"/"|"%") unary)*
//! unary       ::= ("not"|"-") call | call
//! call        ::= primary ( "~(" expression* ")" | "." ID | "~[" expression "]" )*
//! primary     ::= literal | array | map | type | function | oracle | target
//!                 | grouping | block | conditional | for
//! ```
//!
//! `~(` and `~[` denote the closed delimiter forms the lexer emits when the
//! bracket is directly adjacent to the previous token.

use crate::ast::{
    any_type_terminal, null_terminal, null_type_terminal, Expr, FunctionDef, Program, TypeExpr,
};
use crate::diagnostics::{Category, Diagnostic};
use crate::lexer::{LexError, Lexer};
use crate::tokens::{Literal, Token, TokenKind};
use indexmap::{IndexMap, IndexSet};
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum ParseError {
    /// The parser ran out of tokens mid-production; interactive callers
    /// should read more input and retry the whole buffer.
    #[error("incomplete expression")]
    Incomplete,
    #[error("{0}")]
    Lexical(Diagnostic),
    #[error("{}", .0.first().map(|d| d.render()).unwrap_or_default())]
    Syntax(Vec<Diagnostic>),
}

pub struct Parser {
    pub lexer: Lexer,
    interactive: bool,
    tokens: Vec<Token>,
    current: usize,
}

impl Parser {
    pub fn new(interactive: bool) -> Self {
        Self {
            lexer: Lexer::new(),
            interactive,
            tokens: Vec::new(),
            current: 0,
        }
    }

    pub fn reset(&mut self) {
        self.tokens.clear();
        self.current = 0;
    }

    fn is_at_end(&self) -> bool {
        self.tokens
            .get(self.current)
            .map(|t| t.kind == TokenKind::Eof)
            .unwrap_or(true)
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current.min(self.tokens.len() - 1)]
    }

    fn advance(&mut self) -> Token {
        let token = self.peek().clone();
        if self.current < self.tokens.len() - 1 {
            self.current += 1;
        }
        token
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn previous(&self) -> Token {
        self.tokens[self.current.saturating_sub(1)].clone()
    }

    fn match_kinds(&mut self, kinds: &[TokenKind]) -> bool {
        for &kind in kinds {
            if self.check(kind) {
                self.advance();
                return true;
            }
        }
        false
    }

    fn error<T>(&self, token: &Token, message: &str) -> Result<T, ParseError> {
        Err(ParseError::Syntax(vec![self.lexer.diagnostic(
            &token.buffer,
            token.index,
            Category::Syntax,
            message,
        )]))
    }

    fn consume(&mut self, kind: TokenKind, fail_msg: &str) -> Result<Token, ParseError> {
        if self.interactive && self.is_at_end() {
            return Err(ParseError::Incomplete);
        }
        if self.is_at_end() || !self.check(kind) {
            let token = self.peek().clone();
            return self.error(&token, fail_msg);
        }
        Ok(self.advance())
    }

    /// Skip tokens until the next source line to resume after a syntax
    /// error.
    fn synchronize(&mut self) {
        let token = self.peek().clone();
        let (line_before, _) = self.lexer.linecol(&token.buffer, token.index);
        while !self.is_at_end() {
            self.advance();
            let token = self.peek().clone();
            let (line_current, _) = self.lexer.linecol(&token.buffer, token.index);
            if !self.is_at_end() && line_before < line_current {
                return;
            }
        }
    }

    fn annotation_token(hash: &Token) -> Token {
        Token::new(
            TokenKind::String,
            hash.literal.clone(),
            Rc::clone(&hash.buffer),
            hash.index,
        )
    }

    fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut program = Vec::new();
        let mut diagnostics = Vec::new();
        while !self.is_at_end() {
            match self.parse_expression() {
                Ok(expr) => program.push(Rc::new(expr)),
                Err(ParseError::Syntax(mut errs)) => {
                    diagnostics.append(&mut errs);
                    self.synchronize();
                }
                Err(other) => return Err(other),
            }
        }
        if !diagnostics.is_empty() {
            return Err(ParseError::Syntax(diagnostics));
        }
        Ok(Program { program })
    }

    fn parse_expression(&mut self) -> Result<Expr, ParseError> {
        let mut annotation = None;
        if self.match_kinds(&[TokenKind::Hash]) {
            let operator = self.previous();
            annotation = Some((operator.clone(), Self::annotation_token(&operator)));
        }

        let expr = if self.match_kinds(&[TokenKind::Return, TokenKind::Break, TokenKind::Continue])
        {
            let operator = self.previous();
            self.consume(
                TokenKind::ClRound,
                &format!("Expected '(' after '{}'.", operator.lexeme()),
            )?;
            let expr = self.parse_expression()?;
            self.consume(TokenKind::RRound, "Expected closing ')' after expression.")?;
            Expr::Unary {
                operator,
                expr: Rc::new(expr),
            }
        } else {
            self.parse_assignment()?
        };

        if let Some((operator, annotation)) = annotation {
            return Ok(Expr::Annotation {
                operator,
                annotation,
                expr: Rc::new(expr),
            });
        }
        Ok(expr)
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let mapping = self.parse_disjunction()?;
        if !self.match_kinds(&[TokenKind::Assign]) {
            return Ok(mapping);
        }
        let operator = self.previous();
        let expr = Rc::new(self.parse_expression()?);
        let target = match mapping {
            Expr::Terminal(token) if token.kind == TokenKind::Id => Expr::Terminal(token),
            target @ (Expr::Declaration { .. } | Expr::Array { .. } | Expr::Map { .. }) => target,
            Expr::ArrayGet {
                operator: get_op,
                array,
                index,
            } => Expr::ArraySet {
                operator: get_op,
                array,
                index,
            },
            Expr::ObjectGet {
                operator: get_op,
                object,
                index,
            } => Expr::ObjectSet {
                operator: get_op,
                object,
                index,
            },
            _ => return self.error(&operator, "Invalid assignment target."),
        };
        Ok(Expr::Assign {
            target: Rc::new(target),
            operator,
            expr,
        })
    }

    fn parse_disjunction(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_conjunction()?;
        while self.match_kinds(&[TokenKind::Or]) {
            let operator = self.previous();
            let right = self.parse_conjunction()?;
            expr = Expr::Binary {
                left: Rc::new(expr),
                operator,
                right: Rc::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_conjunction(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_equality()?;
        while self.match_kinds(&[TokenKind::And]) {
            let operator = self.previous();
            let right = self.parse_equality()?;
            expr = Expr::Binary {
                left: Rc::new(expr),
                operator,
                right: Rc::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_equality(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_comparison()?;
        while self.match_kinds(&[TokenKind::Eq, TokenKind::Neq]) {
            let operator = self.previous();
            let right = self.parse_comparison()?;
            expr = Expr::Binary {
                left: Rc::new(expr),
                operator,
                right: Rc::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_comparison(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_term()?;
        while self.match_kinds(&[
            TokenKind::Less,
            TokenKind::LessEq,
            TokenKind::Greater,
            TokenKind::GreaterEq,
        ]) {
            let operator = self.previous();
            let right = self.parse_term()?;
            expr = Expr::Binary {
                left: Rc::new(expr),
                operator,
                right: Rc::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_term(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_factor()?;
        while self.match_kinds(&[TokenKind::Plus, TokenKind::Minus]) {
            let operator = self.previous();
            let right = self.parse_factor()?;
            expr = Expr::Binary {
                left: Rc::new(expr),
                operator,
                right: Rc::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_factor(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_unary()?;
        while self.match_kinds(&[TokenKind::Mult, TokenKind::Div, TokenKind::Mod]) {
            let operator = self.previous();
            let right = self.parse_unary()?;
            expr = Expr::Binary {
                left: Rc::new(expr),
                operator,
                right: Rc::new(right),
            };
        }
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        if self.match_kinds(&[TokenKind::Minus, TokenKind::Not]) {
            let operator = self.previous();
            let expr = self.parse_call()?;
            return Ok(Expr::Unary {
                operator,
                expr: Rc::new(expr),
            });
        }
        let mut expr = self.parse_call()?;
        // Postfix `?` widens a first-class type value to optional.
        while self.match_kinds(&[TokenKind::Question]) {
            let operator = self.previous();
            expr = Expr::Unary {
                operator,
                expr: Rc::new(expr),
            };
        }
        Ok(expr)
    }

    fn parse_call(&mut self) -> Result<Expr, ParseError> {
        let mut primary = self.parse_primary()?;
        while self.match_kinds(&[TokenKind::ClRound, TokenKind::Period, TokenKind::ClSquare]) {
            let operator = self.previous();
            match operator.kind {
                TokenKind::ClRound => {
                    let mut arguments = Vec::new();
                    if !self.check(TokenKind::RRound) {
                        arguments.push(Rc::new(self.parse_expression()?));
                        while self.match_kinds(&[TokenKind::Comma]) {
                            arguments.push(Rc::new(self.parse_expression()?));
                        }
                    }
                    self.consume(TokenKind::RRound, "Expected closing ')'.")?;
                    if arguments.is_empty() {
                        arguments.push(Rc::new(null_terminal(&operator)));
                    }
                    primary = Expr::Call {
                        operator,
                        callee: Rc::new(primary),
                        arguments,
                    };
                }
                TokenKind::ClSquare => {
                    let index = self.parse_expression()?;
                    self.consume(TokenKind::RSquare, "Expected closing ']'.")?;
                    primary = Expr::ArrayGet {
                        operator,
                        array: Rc::new(primary),
                        index: Rc::new(index),
                    };
                }
                _ => {
                    // Syntax sugar: a.field => a."field"
                    if self.match_kinds(&[TokenKind::Id, TokenKind::String]) {
                        let token = self.previous();
                        let key = Token::new(
                            TokenKind::String,
                            token.literal.clone(),
                            Rc::clone(&token.buffer),
                            token.index,
                        );
                        primary = Expr::ObjectGet {
                            operator,
                            object: Rc::new(primary),
                            index: Rc::new(Expr::Terminal(key)),
                        };
                    } else {
                        return self.error(&operator, "Expected a property name.");
                    }
                }
            }
        }
        Ok(primary)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        if self.match_kinds(&[
            TokenKind::Id,
            TokenKind::Integer,
            TokenKind::Number,
            TokenKind::String,
            TokenKind::Boolean,
            TokenKind::Null,
        ]) {
            return Ok(Expr::Terminal(self.previous()));
        }
        if self.match_kinds(&[TokenKind::Type, TokenKind::Enum]) {
            let token = self.previous();
            return self.error(&token, "Type atom without type constructor.");
        }
        if self.check(TokenKind::LSquare) || self.check(TokenKind::ClSquare) {
            return self.parse_array();
        }
        if self.check(TokenKind::LCurly) {
            return self.parse_map();
        }
        if self.check(TokenKind::TypeCons) {
            return self.parse_type_def();
        }
        if self.check(TokenKind::Do) {
            return self.parse_block();
        }
        if self.check(TokenKind::If) {
            return self.parse_conditional();
        }
        if self.check(TokenKind::For) {
            return self.parse_for();
        }
        if self.check(TokenKind::Function) || self.check(TokenKind::Oracle) {
            return self.parse_function();
        }
        if self.match_kinds(&[TokenKind::LRound, TokenKind::ClRound]) {
            let expr = self.parse_expression()?;
            self.consume(TokenKind::RRound, "Expected ')' after expression.")?;
            return Ok(Expr::Grouping {
                expr: Rc::new(expr),
            });
        }
        if self.check(TokenKind::Let) {
            return self.parse_declaration();
        }
        if matches!(
            self.peek().kind,
            TokenKind::Return | TokenKind::Break | TokenKind::Continue
        ) {
            let token = self.peek().clone();
            return self.error(
                &token,
                &format!("Invalid '{}' expression.", token.lexeme()),
            );
        }
        if self.check(TokenKind::Eof) && self.interactive {
            return Err(ParseError::Incomplete);
        }
        let token = self.peek().clone();
        self.error(&token, "Expected an expression.")
    }

    fn parse_array(&mut self) -> Result<Expr, ParseError> {
        if self.match_kinds(&[TokenKind::LSquare, TokenKind::ClSquare]) {
            if self.match_kinds(&[TokenKind::RSquare]) {
                return Ok(Expr::Array { array: Vec::new() });
            }
            let mut array = vec![Rc::new(self.parse_expression()?)];
            while self.match_kinds(&[TokenKind::Comma]) {
                array.push(Rc::new(self.parse_expression()?));
            }
            self.consume(
                TokenKind::RSquare,
                "Expected closing ']' after list of expressions.",
            )?;
            return Ok(Expr::Array { array });
        }
        let token = self.peek().clone();
        self.error(&token, "Expected an array expression.")
    }

    fn parse_map(&mut self) -> Result<Expr, ParseError> {
        let mut map = IndexMap::new();
        self.consume(TokenKind::LCurly, "Expected opening '{'.")?;
        if self.match_kinds(&[TokenKind::RCurly]) {
            return Ok(Expr::Map { map });
        }
        let (key, expr) = self.parse_item()?;
        map.insert(key.text().to_string(), Rc::new(expr));
        while self.match_kinds(&[TokenKind::Comma]) {
            let (key, expr) = self.parse_item()?;
            map.insert(key.text().to_string(), Rc::new(expr));
        }
        self.consume(
            TokenKind::RCurly,
            "Expected closing '}' after list of members.",
        )?;
        Ok(Expr::Map { map })
    }

    fn parse_item(&mut self) -> Result<(Token, Expr), ParseError> {
        if self.match_kinds(&[TokenKind::Hash]) {
            let operator = self.previous();
            let annotation = Self::annotation_token(&operator);
            let key = self.parse_key()?;
            self.consume(TokenKind::Colon, "Expected ':' after member key.")?;
            let expr = self.parse_expression()?;
            return Ok((
                key,
                Expr::Annotation {
                    operator,
                    annotation,
                    expr: Rc::new(expr),
                },
            ));
        }
        let key = self.parse_key()?;
        self.consume(TokenKind::Colon, "Expected ':' after member key.")?;
        let expr = self.parse_expression()?;
        Ok((key, expr))
    }

    fn parse_key(&mut self) -> Result<Token, ParseError> {
        if self.match_kinds(&[TokenKind::Id]) {
            let key = self.previous();
            return Ok(Token::new(
                TokenKind::String,
                key.literal.clone(),
                Rc::clone(&key.buffer),
                key.index,
            ));
        }
        if self.match_kinds(&[TokenKind::String]) {
            return Ok(self.previous());
        }
        if self.check(TokenKind::Eof) && self.interactive {
            return Err(ParseError::Incomplete);
        }
        let token = self.peek().clone();
        self.error(&token, "Expected a member key.")
    }

    fn parse_chunk_until(&mut self, ends: &[TokenKind]) -> Result<Expr, ParseError> {
        let mut exprs = Vec::new();
        while !ends.contains(&self.peek().kind) {
            exprs.push(Rc::new(self.parse_expression()?));
        }
        Ok(Expr::Block { exprs })
    }

    fn parse_block(&mut self) -> Result<Expr, ParseError> {
        self.consume(TokenKind::Do, "Expected 'do' keyword.")?;
        let block = self.parse_chunk_until(&[TokenKind::End, TokenKind::Eof])?;
        self.consume(TokenKind::End, "Expected 'end' keyword.")?;
        Ok(block)
    }

    fn parse_conditional(&mut self) -> Result<Expr, ParseError> {
        self.consume(TokenKind::If, "Expected 'if' keyword.")?;
        let mut operators = vec![self.previous()];
        let mut conds = vec![Rc::new(self.parse_expression()?)];
        self.consume(TokenKind::Then, "Expected 'then' after condition.")?;
        let branch_ends = [
            TokenKind::End,
            TokenKind::Elif,
            TokenKind::Else,
            TokenKind::Eof,
        ];
        let mut exprs = vec![Rc::new(self.parse_chunk_until(&branch_ends)?)];
        while self.match_kinds(&[TokenKind::Elif]) {
            operators.push(self.previous());
            conds.push(Rc::new(self.parse_expression()?));
            self.consume(TokenKind::Then, "Expected 'then' after condition.")?;
            exprs.push(Rc::new(self.parse_chunk_until(&branch_ends)?));
        }
        let mut default = None;
        if self.match_kinds(&[TokenKind::Else]) {
            default = Some(Rc::new(
                self.parse_chunk_until(&[TokenKind::End, TokenKind::Eof])?,
            ));
        }
        self.consume(
            TokenKind::End,
            "Expected closing 'end' after conditional expression.",
        )?;
        Ok(Expr::Conditional {
            operators,
            conds,
            exprs,
            default,
        })
    }

    fn parse_for(&mut self) -> Result<Expr, ParseError> {
        self.consume(TokenKind::For, "Expected 'for' keyword.")?;
        let operator = self.previous();
        let target = self.parse_expression()?;
        self.consume(TokenKind::In, "Expected 'in' keyword.")?;
        let iterator = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Expr::For {
            operator,
            target: Rc::new(target),
            iterator: Rc::new(iterator),
            body: Rc::new(body),
        })
    }

    fn parse_function(&mut self) -> Result<Expr, ParseError> {
        self.match_kinds(&[TokenKind::Function, TokenKind::Oracle]);
        let operator = self.previous();
        self.consume(
            TokenKind::ClRound,
            &format!("Expected '(' after '{}' keyword.", operator.lexeme()),
        )?;
        let mut params = Vec::new();
        let mut ptypes = Vec::new();
        if !self.check(TokenKind::RRound) {
            let (param, ptype) = self.parse_parameter()?;
            params.push(param);
            ptypes.push(ptype);
            while self.match_kinds(&[TokenKind::Comma]) {
                let (param, ptype) = self.parse_parameter()?;
                params.push(param);
                ptypes.push(ptype);
            }
        }
        self.consume(
            TokenKind::RRound,
            "Expected closing ')' after function parameters.",
        )?;
        if params.is_empty() {
            // A parameterless literal still takes one ignored null argument.
            params.push(Token::new(
                TokenKind::Id,
                Some(Literal::Str("_".to_string())),
                Rc::clone(&operator.buffer),
                operator.index,
            ));
            ptypes.push(null_type_terminal(&operator));
        }

        let mut types = if self.match_kinds(&[TokenKind::Arrow]) {
            self.parse_type_expr()?
        } else {
            any_type_terminal(&operator)
        };
        for ptype in ptypes.into_iter().rev() {
            types = TypeExpr::Binary {
                left: Rc::new(ptype),
                operator: operator.clone(),
                right: Rc::new(types),
                annotation: None,
            };
        }

        let body = if operator.kind == TokenKind::Function {
            self.parse_block()?
        } else if self.match_kinds(&[TokenKind::From]) {
            self.parse_expression()?
        } else {
            Expr::Array { array: Vec::new() }
        };

        Ok(Expr::Function(Rc::new(FunctionDef {
            operator,
            parameters: params,
            types: Rc::new(types),
            body: Rc::new(body),
        })))
    }

    fn parse_parameter(&mut self) -> Result<(Token, TypeExpr), ParseError> {
        let mut annotation = None;
        if self.match_kinds(&[TokenKind::Hash]) {
            let operator = self.previous();
            annotation = Some((operator.clone(), Self::annotation_token(&operator)));
        }

        self.consume(TokenKind::Id, "Expected a parameter name.")?;
        let param = self.previous();

        let mut ptype = if self.match_kinds(&[TokenKind::Colon]) {
            let ptype = self.parse_type_expr()?;
            if matches!(ptype, TypeExpr::Binary { .. }) {
                TypeExpr::Grouping {
                    expr: Rc::new(ptype),
                }
            } else {
                ptype
            }
        } else {
            any_type_terminal(&self.previous())
        };

        if let Some((operator, annotation)) = annotation {
            ptype = TypeExpr::Annotation {
                operator,
                annotation,
                expr: Rc::new(ptype),
            };
        }
        Ok((param, ptype))
    }

    fn parse_declaration(&mut self) -> Result<Expr, ParseError> {
        if self.match_kinds(&[TokenKind::Let]) {
            let operator = self.previous();
            let token = self.consume(TokenKind::Id, "Expected an identifier.")?;
            return Ok(Expr::Declaration { operator, token });
        }
        let token = self.peek().clone();
        self.error(&token, "Invalid expression.")
    }

    fn parse_type_def(&mut self) -> Result<Expr, ParseError> {
        self.consume(TokenKind::TypeCons, "Expected 'type' keyword.")?;
        let operator = self.previous();
        let expr = self.parse_type_expr()?;
        Ok(Expr::TypeDef {
            operator,
            expr: Rc::new(expr),
        })
    }

    fn parse_type_expr(&mut self) -> Result<TypeExpr, ParseError> {
        if self.match_kinds(&[TokenKind::Hash]) {
            let operator = self.previous();
            let annotation = Self::annotation_token(&operator);
            let expr = self.parse_type_expr()?;
            return Ok(TypeExpr::Annotation {
                operator,
                annotation,
                expr: Rc::new(expr),
            });
        }
        self.parse_type_binary()
    }

    fn parse_type_binary(&mut self) -> Result<TypeExpr, ParseError> {
        let left = self.parse_type_unary()?;
        if self.match_kinds(&[TokenKind::Arrow]) {
            let operator = self.previous();
            let mut right = self.parse_type_expr()?;
            while let TypeExpr::Grouping { expr } = right {
                right = expr.as_ref().clone();
            }
            return Ok(TypeExpr::Binary {
                left: Rc::new(left),
                operator,
                right: Rc::new(right),
                annotation: None,
            });
        }
        Ok(left)
    }

    fn parse_type_unary(&mut self) -> Result<TypeExpr, ParseError> {
        let expr = self.parse_type_prim()?;
        if self.match_kinds(&[TokenKind::Question]) {
            let operator = self.previous();
            return Ok(TypeExpr::Unary {
                operator,
                expr: Rc::new(expr),
                annotation: None,
            });
        }
        Ok(expr)
    }

    fn parse_type_prim(&mut self) -> Result<TypeExpr, ParseError> {
        if self.match_kinds(&[TokenKind::Id, TokenKind::Type]) {
            return Ok(TypeExpr::Terminal {
                token: self.previous(),
                annotation: None,
            });
        }
        if self.check(TokenKind::Enum) {
            return self.parse_type_enum();
        }
        if self.check(TokenKind::LSquare) || self.check(TokenKind::ClSquare) {
            return self.parse_type_array();
        }
        if self.check(TokenKind::LCurly) {
            return self.parse_type_map();
        }
        if self.match_kinds(&[TokenKind::LRound, TokenKind::ClRound]) {
            let expr = self.parse_type_expr()?;
            self.consume(TokenKind::RRound, "Expected ')' after type expression.")?;
            return Ok(TypeExpr::Grouping {
                expr: Rc::new(expr),
            });
        }
        if self.check(TokenKind::Eof) && self.interactive {
            return Err(ParseError::Incomplete);
        }
        let token = self.peek().clone();
        self.error(&token, "Expected a type expression.")
    }

    fn parse_type_enum(&mut self) -> Result<TypeExpr, ParseError> {
        self.consume(TokenKind::Enum, "Expected an Enum expression.")?;
        let operator = self.previous();
        if self.check(TokenKind::Eof) && self.interactive {
            return Err(ParseError::Incomplete);
        }
        if !(self.check(TokenKind::LSquare) || self.check(TokenKind::ClSquare)) {
            let token = self.peek().clone();
            return self.error(&token, "Expected an array after Enum.");
        }
        let expr = self.parse_array()?;
        Ok(TypeExpr::Enum {
            operator,
            expr: Rc::new(expr),
            values: Vec::new(),
            annotation: None,
        })
    }

    fn parse_type_array(&mut self) -> Result<TypeExpr, ParseError> {
        self.match_kinds(&[TokenKind::LSquare, TokenKind::ClSquare]);
        let expr = self.parse_type_expr()?;
        self.consume(
            TokenKind::RSquare,
            "Expected closing ']' after type expression.",
        )?;
        Ok(TypeExpr::Array {
            expr: Rc::new(expr),
            annotation: None,
        })
    }

    fn parse_type_map(&mut self) -> Result<TypeExpr, ParseError> {
        let mut map = IndexMap::new();
        let mut required = IndexSet::new();
        self.consume(TokenKind::LCurly, "Expected opening '{'.")?;
        if self.match_kinds(&[TokenKind::RCurly]) {
            return Ok(TypeExpr::Map {
                map,
                required,
                annotation: None,
            });
        }
        let (key, req, expr) = self.parse_type_item()?;
        if req {
            required.insert(key.text().to_string());
        }
        map.insert(key.text().to_string(), Rc::new(expr));
        while self.match_kinds(&[TokenKind::Comma]) {
            let (key, req, expr) = self.parse_type_item()?;
            if req {
                required.insert(key.text().to_string());
            }
            map.insert(key.text().to_string(), Rc::new(expr));
        }
        self.consume(
            TokenKind::RCurly,
            "Expected closing '}' after list of members.",
        )?;
        Ok(TypeExpr::Map {
            map,
            required,
            annotation: None,
        })
    }

    fn parse_type_item(&mut self) -> Result<(Token, bool, TypeExpr), ParseError> {
        let mut annotation = None;
        if self.match_kinds(&[TokenKind::Hash]) {
            let operator = self.previous();
            annotation = Some((operator.clone(), Self::annotation_token(&operator)));
        }
        let key = self.parse_key()?;
        let required = self.match_kinds(&[TokenKind::Bang]);
        self.consume(TokenKind::Colon, "Expected ':' after member key.")?;
        let mut expr = self.parse_type_expr()?;
        if let Some((operator, note)) = annotation {
            expr = TypeExpr::Annotation {
                operator,
                annotation: note,
                expr: Rc::new(expr),
            };
        }
        Ok((key, required, expr))
    }

    /// Scan and parse one input. On any failure the lexer is rolled back so
    /// the bad input does not pollute the accumulated buffer.
    pub fn parse(&mut self, code: &str, buffer: &str) -> Result<Program, ParseError> {
        self.reset();
        let snapshot = self.lexer.clone();

        let tokens = match self.lexer.scan(code, buffer) {
            Ok(tokens) => tokens,
            Err(LexError::Incomplete) => {
                self.lexer = snapshot;
                return Err(ParseError::Incomplete);
            }
            Err(LexError::Lexical(diagnostic)) => {
                self.lexer = snapshot;
                return Err(ParseError::Lexical(diagnostic));
            }
        };
        self.tokens = tokens;
        self.current = 0;

        match self.parse_program() {
            Ok(program) => Ok(program),
            Err(err) => {
                self.lexer = snapshot;
                Err(err)
            }
        }
    }
}
