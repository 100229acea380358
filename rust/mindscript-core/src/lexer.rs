//! Re-entrant buffered lexer for MindScript source code.
//!
//! Source text accumulates in named buffers so that tokens from earlier
//! REPL inputs keep valid positions; `set_stream` switches the active
//! buffer without clearing prior content.

use crate::diagnostics::{Category, Diagnostic};
use crate::tokens::{keyword, Literal, Token, TokenKind};
use std::collections::HashMap;
use std::rc::Rc;
use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum LexError {
    /// The scanner ran out of input mid-token; interactive callers should
    /// read more input and retry.
    #[error("incomplete input")]
    Incomplete,
    #[error("{0}")]
    Lexical(Diagnostic),
}

#[derive(Debug, Clone)]
pub struct Lexer {
    streams: HashMap<Rc<str>, Vec<char>>,
    stream_id: Rc<str>,
    start: usize,
    current: usize,
    whitespace: bool,
    tokens: Vec<Token>,
}

impl Default for Lexer {
    fn default() -> Self {
        Self::new()
    }
}

impl Lexer {
    pub fn new() -> Self {
        let stream_id: Rc<str> = Rc::from("std");
        let mut streams = HashMap::new();
        streams.insert(Rc::clone(&stream_id), Vec::new());
        Self {
            streams,
            stream_id,
            start: 0,
            current: 0,
            whitespace: true,
            tokens: Vec::new(),
        }
    }

    /// Switch the active buffer, creating it if needed. The cursor moves to
    /// the end of the buffer so new input appends.
    pub fn set_stream(&mut self, stream_id: &str) {
        let existing = self
            .streams
            .keys()
            .find(|k| k.as_ref() == stream_id)
            .cloned();
        let key = match existing {
            Some(key) => key,
            None => {
                let key: Rc<str> = Rc::from(stream_id);
                self.streams.insert(Rc::clone(&key), Vec::new());
                key
            }
        };
        self.stream_id = key;
        self.start = self.streams[&self.stream_id].len();
        self.current = self.start;
        self.whitespace = true;
    }

    pub fn stream_id(&self) -> &str {
        &self.stream_id
    }

    fn chars(&self) -> &[char] {
        &self.streams[&self.stream_id]
    }

    fn peek(&self) -> Option<char> {
        self.chars().get(self.current).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.chars().get(self.current).copied()?;
        self.current += 1;
        Some(c)
    }

    fn rewind(&mut self) {
        self.current = self.start;
    }

    fn forward(&mut self) {
        self.start = self.current;
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.chars().len()
    }

    fn add_token(&mut self, kind: TokenKind, literal: Option<Literal>) -> Token {
        self.whitespace = false;
        let token = Token::new(kind, literal, Rc::clone(&self.stream_id), self.start);
        self.tokens.push(token.clone());
        self.forward();
        token
    }

    fn previous_kind(&self) -> Option<TokenKind> {
        self.tokens.last().map(|t| t.kind)
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(' ' | '\r' | '\n')) {
            self.whitespace = true;
            self.advance();
        }
        self.forward();
    }

    fn is_nonzero_digit(c: char) -> bool {
        ('1'..='9').contains(&c)
    }

    fn is_id_start(c: char) -> bool {
        c.is_ascii_alphabetic() || c == '_'
    }

    fn is_id(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_'
    }

    /// Recover a 0-based line/column pair for an index into a buffer by
    /// rescanning the accumulated text.
    pub fn linecol(&self, buffer: &str, index: usize) -> (usize, usize) {
        let chars = match self.streams.keys().find(|k| k.as_ref() == buffer) {
            Some(k) => &self.streams[k],
            None => return (0, 0),
        };
        let mut line = 0;
        let mut col = 0;
        let mut idx = index;
        let mut len = 0;
        for &c in chars.iter().chain(std::iter::once(&'\n')) {
            len += 1;
            if c == '\n' {
                if idx >= len {
                    idx -= len;
                    line += 1;
                    len = 0;
                } else {
                    col = idx;
                    break;
                }
            } else if idx < len {
                col = idx;
                break;
            }
        }
        (line, col)
    }

    /// Build a caret diagnostic for a position in a named buffer.
    pub fn diagnostic(
        &self,
        buffer: &str,
        index: usize,
        category: Category,
        message: &str,
    ) -> Diagnostic {
        let (line, col) = self.linecol(buffer, index);
        let text: String = self
            .streams
            .keys()
            .find(|k| k.as_ref() == buffer)
            .map(|k| self.streams[k].iter().collect())
            .unwrap_or_default();
        let lines: Vec<&str> = text.lines().collect();
        let mut context = Vec::new();
        if line > 0 {
            if let Some(prev) = lines.get(line - 1) {
                context.push((*prev).to_string());
            }
        }
        context.push(lines.get(line).copied().unwrap_or("").to_string());
        Diagnostic {
            category,
            message: message.to_string(),
            buffer: buffer.to_string(),
            line: line + 1,
            col,
            context,
        }
    }

    fn error(&self, message: &str) -> LexError {
        let buffer = Rc::clone(&self.stream_id);
        LexError::Lexical(self.diagnostic(&buffer, self.start, Category::Lexical, message))
    }

    // String scanning follows JSON: both quote characters delimit, with
    // \b \f \n \r \t \\ \" \/ and \uXXXX escapes.
    fn scan_string(&mut self) -> Result<String, LexError> {
        let Some(delimiter) = self.advance() else {
            return Err(self.error("String was not terminated."));
        };
        let mut lexeme = String::new();
        while let Some(c) = self.peek() {
            if c == delimiter {
                break;
            }
            self.advance();
            if c != '\\' {
                lexeme.push(c);
                continue;
            }
            match self.peek() {
                Some(cc) if cc == delimiter || matches!(cc, '"' | '\\' | '/') => {
                    self.advance();
                    lexeme.push(cc);
                }
                Some('b') => {
                    self.advance();
                    lexeme.push('\u{0008}');
                }
                Some('f') => {
                    self.advance();
                    lexeme.push('\u{000C}');
                }
                Some('n') => {
                    self.advance();
                    lexeme.push('\n');
                }
                Some('r') => {
                    self.advance();
                    lexeme.push('\r');
                }
                Some('t') => {
                    self.advance();
                    lexeme.push('\t');
                }
                Some('u') => {
                    self.advance();
                    let mut hex = String::new();
                    for _ in 0..4 {
                        match self.peek() {
                            Some(h) if h.is_ascii_hexdigit() => {
                                hex.push(h);
                                self.advance();
                            }
                            _ => return Err(self.error("Unicode escape was not terminated.")),
                        }
                    }
                    let decoded = u32::from_str_radix(&hex, 16)
                        .ok()
                        .and_then(char::from_u32)
                        .ok_or_else(|| self.error("Invalid Unicode escape."))?;
                    lexeme.push(decoded);
                }
                _ => return Err(self.error("Invalid escape sequence.")),
            }
        }
        if self.is_at_end() {
            return Err(self.error("String was not terminated."));
        }
        self.advance();
        Ok(lexeme)
    }

    fn scan_integer(&mut self) -> Option<String> {
        let mut lexeme = String::new();
        if matches!(self.peek(), Some(c) if Self::is_nonzero_digit(c)) {
            lexeme.push(self.advance()?);
        }
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            lexeme.push(self.advance()?);
        }
        // A following '.', 'e' or 'E' means this is a float instead.
        if matches!(self.peek(), Some('.' | 'e' | 'E')) {
            return None;
        }
        if lexeme.is_empty() {
            return None;
        }
        Some(lexeme)
    }

    fn scan_float(&mut self) -> Option<String> {
        let mut lexeme = String::new();
        match self.peek() {
            Some('0') => lexeme.push(self.advance()?),
            Some(c) if Self::is_nonzero_digit(c) => {
                lexeme.push(self.advance()?);
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    lexeme.push(self.advance()?);
                }
            }
            _ => return None,
        }
        if self.peek() == Some('.') {
            lexeme.push(self.advance()?);
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                lexeme.push(self.advance()?);
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            lexeme.push(self.advance()?);
            if matches!(self.peek(), Some('-' | '+')) {
                lexeme.push(self.advance()?);
            }
            if !matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                return None;
            }
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                lexeme.push(self.advance()?);
            }
        }
        Some(lexeme)
    }

    fn ignore_until_newline(&mut self) {
        while let Some(c) = self.advance() {
            if c == '\n' {
                return;
            }
        }
    }

    /// Scan an annotation body after the opening `#`. An annotation may span
    /// multiple lines when each continuation line begins with `#`; a lone
    /// `#` line followed by a blank line degenerates to null (`Ok(None)`).
    fn scan_annotation(&mut self) -> Result<Option<String>, LexError> {
        let mut lexeme = String::new();
        let mut line = String::new();
        while let Some(c) = self.advance() {
            line.push(c);
            if c != '\n' {
                continue;
            }
            lexeme.push_str(line.trim());
            lexeme.push('\n');
            line.clear();
            while matches!(self.peek(), Some(' ' | '\r' | '\t')) {
                self.advance();
            }
            match self.peek() {
                None => return Err(LexError::Incomplete),
                Some('#') => {
                    self.advance();
                }
                Some('\n') => return Ok(None),
                Some(_) => return Ok(Some(lexeme.trim().to_string())),
            }
        }
        Err(LexError::Incomplete)
    }

    fn scan_id(&mut self) -> String {
        let mut lexeme = String::new();
        while matches!(self.peek(), Some(c) if Self::is_id(c)) {
            if let Some(c) = self.advance() {
                lexeme.push(c);
            }
        }
        lexeme
    }

    fn scan_token(&mut self) -> Result<Token, LexError> {
        loop {
            self.skip_whitespace();
            if self.is_at_end() {
                return Ok(self.add_token(TokenKind::Eof, None));
            }
            let Some(c) = self.advance() else {
                return Ok(self.add_token(TokenKind::Eof, None));
            };

            let lit = |s: &str| Some(Literal::Str(s.to_string()));

            match c {
                '(' => {
                    let kind = if self.whitespace {
                        TokenKind::LRound
                    } else {
                        TokenKind::ClRound
                    };
                    return Ok(self.add_token(kind, lit("(")));
                }
                ')' => return Ok(self.add_token(TokenKind::RRound, lit(")"))),
                '[' => {
                    let kind = if self.whitespace {
                        TokenKind::LSquare
                    } else {
                        TokenKind::ClSquare
                    };
                    return Ok(self.add_token(kind, lit("[")));
                }
                ']' => return Ok(self.add_token(TokenKind::RSquare, lit("]"))),
                '{' => return Ok(self.add_token(TokenKind::LCurly, lit("{"))),
                '}' => return Ok(self.add_token(TokenKind::RCurly, lit("}"))),
                '+' => return Ok(self.add_token(TokenKind::Plus, lit("+"))),
                '*' => return Ok(self.add_token(TokenKind::Mult, lit("*"))),
                '/' => return Ok(self.add_token(TokenKind::Div, lit("/"))),
                '%' => return Ok(self.add_token(TokenKind::Mod, lit("%"))),
                ':' => return Ok(self.add_token(TokenKind::Colon, lit(":"))),
                ',' => return Ok(self.add_token(TokenKind::Comma, lit(","))),
                '?' => return Ok(self.add_token(TokenKind::Question, lit("?"))),
                '.' if !matches!(self.peek(), Some(d) if d.is_ascii_digit()) => {
                    return Ok(self.add_token(TokenKind::Period, lit(".")));
                }
                '-' => {
                    if self.peek() == Some('>') {
                        self.advance();
                        return Ok(self.add_token(TokenKind::Arrow, lit("->")));
                    }
                    return Ok(self.add_token(TokenKind::Minus, lit("-")));
                }
                '=' => {
                    if self.peek() == Some('=') {
                        self.advance();
                        return Ok(self.add_token(TokenKind::Eq, lit("==")));
                    }
                    return Ok(self.add_token(TokenKind::Assign, lit("=")));
                }
                '!' => {
                    if self.peek() == Some('=') {
                        self.advance();
                        return Ok(self.add_token(TokenKind::Neq, lit("!=")));
                    }
                    return Ok(self.add_token(TokenKind::Bang, lit("!")));
                }
                '<' => {
                    if self.peek() == Some('=') {
                        self.advance();
                        return Ok(self.add_token(TokenKind::LessEq, lit("<=")));
                    }
                    return Ok(self.add_token(TokenKind::Less, lit("<")));
                }
                '>' => {
                    if self.peek() == Some('=') {
                        self.advance();
                        return Ok(self.add_token(TokenKind::GreaterEq, lit(">=")));
                    }
                    return Ok(self.add_token(TokenKind::Greater, lit(">")));
                }
                '#' => {
                    if self.peek() == Some('#') {
                        self.ignore_until_newline();
                        self.forward();
                        continue;
                    }
                    return match self.scan_annotation()? {
                        Some(text) => Ok(self.add_token(TokenKind::Hash, Some(Literal::Str(text)))),
                        None => Ok(self.add_token(TokenKind::Null, None)),
                    };
                }
                '"' | '\'' => {
                    self.rewind();
                    let lexeme = self.scan_string()?;
                    if self.previous_kind() == Some(TokenKind::Period) {
                        return Ok(self.add_token(TokenKind::Id, Some(Literal::Str(lexeme))));
                    }
                    return Ok(self.add_token(TokenKind::String, Some(Literal::Str(lexeme))));
                }
                c if c.is_ascii_digit() => {
                    self.rewind();
                    if let Some(lexeme) = self.scan_integer() {
                        let value: i64 = lexeme
                            .parse()
                            .map_err(|_| self.error("Integer literal out of range."))?;
                        return Ok(self.add_token(TokenKind::Integer, Some(Literal::Int(value))));
                    }
                    self.rewind();
                    if let Some(lexeme) = self.scan_float() {
                        let value: f64 = lexeme
                            .parse()
                            .map_err(|_| self.error("Malformed number literal."))?;
                        return Ok(self.add_token(TokenKind::Number, Some(Literal::Num(value))));
                    }
                    self.rewind();
                    return Err(self.error("Malformed number literal."));
                }
                c if Self::is_id_start(c) => {
                    self.rewind();
                    let lexeme = self.scan_id();
                    if self.previous_kind() == Some(TokenKind::Period) {
                        return Ok(self.add_token(TokenKind::Id, Some(Literal::Str(lexeme))));
                    }
                    return match keyword(&lexeme) {
                        Some(TokenKind::Null) => Ok(self.add_token(TokenKind::Null, None)),
                        Some(TokenKind::Boolean) => {
                            let value = lexeme == "true";
                            Ok(self.add_token(TokenKind::Boolean, Some(Literal::Bool(value))))
                        }
                        Some(kind) => Ok(self.add_token(kind, Some(Literal::Str(lexeme)))),
                        None => Ok(self.add_token(TokenKind::Id, Some(Literal::Str(lexeme)))),
                    };
                }
                _ => return Err(self.error("Unexpected character.")),
            }
        }
    }

    /// Append `code` to the named buffer (tabs normalized to four spaces)
    /// and scan tokens until end of input.
    pub fn scan(&mut self, code: &str, buffer: &str) -> Result<Vec<Token>, LexError> {
        self.set_stream(buffer);
        self.tokens.clear();
        let expanded = code.replace('\t', "    ");
        if let Some(chars) = self.streams.get_mut(&self.stream_id) {
            chars.extend(expanded.chars());
        }
        loop {
            let token = self.scan_token()?;
            if token.kind == TokenKind::Eof {
                break;
            }
        }
        Ok(std::mem::take(&mut self.tokens))
    }
}
