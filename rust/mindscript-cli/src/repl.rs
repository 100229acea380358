//! Interactive REPL: `> ` for a fresh expression, `| ` while the parser
//! waits for the rest of an incomplete one.

use mindscript_core::{printer, Interpreter, Interrupt};
use rustyline::completion::{Completer, Pair};
use rustyline::error::ReadlineError;
use rustyline::highlight::Highlighter;
use rustyline::hint::Hinter;
use rustyline::validate::Validator;
use rustyline::{Context, Editor, Helper};
use std::process::ExitCode;

// ANSI color helpers
fn green(s: &str) -> String {
    format!("\x1b[32m{}\x1b[0m", s)
}
fn blue(s: &str) -> String {
    format!("\x1b[94m{}\x1b[0m", s)
}

const WELCOME: &str = "
MindScript Version {version} ({backend})
(C) 2024, 2025 DAIOS Technologies Limited
Use Control-D to exit.
";

/// Language keywords for tab completion.
const KEYWORDS: &[&str] = &[
    "and", "or", "not", "let", "do", "end", "return", "break", "continue",
    "if", "then", "elif", "else", "fun", "oracle", "for", "in", "from",
    "type", "true", "false", "null",
];

/// Type names for tab completion.
const TYPES: &[&str] = &["Type", "Null", "Str", "Int", "Num", "Bool", "Any", "Enum"];

/// Builtin and prelude functions for tab completion.
const BUILTINS: &[&str] = &[
    "import", "codeImport", "str", "bool", "int", "num", "print", "println",
    "dump", "getEnv", "typeOf", "isType", "isSubtype", "schema", "bnf",
    "assert", "error", "exit", "size", "clone", "bindMethod", "uid",
    "setNote", "getNote", "sin", "cos", "tan", "sqrt", "log", "exp", "pow",
    "substr", "toLower", "toUpper", "strip", "lstrip", "rstrip", "split",
    "join", "match", "replace", "iter", "slice", "push", "pop", "shift",
    "unshift", "delete", "keys", "values", "exists", "get", "set", "http",
    "tsNow", "dateNow", "random", "readFile", "writeFile", "map", "filter",
    "reduce", "range", "contains", "reverse", "min", "max", "sum", "abs",
    "zip", "enumerate",
];

struct MindScriptHelper;

impl Completer for MindScriptHelper {
    type Candidate = Pair;

    fn complete(
        &self,
        line: &str,
        pos: usize,
        _ctx: &Context<'_>,
    ) -> rustyline::Result<(usize, Vec<Pair>)> {
        let start = line[..pos]
            .rfind(|c: char| !c.is_alphanumeric() && c != '_')
            .map(|i| i + 1)
            .unwrap_or(0);
        let word = &line[start..pos];
        if word.is_empty() {
            return Ok((start, Vec::new()));
        }
        let mut candidates = Vec::new();
        for name in KEYWORDS.iter().chain(TYPES).chain(BUILTINS) {
            if name.starts_with(word) {
                candidates.push(Pair {
                    display: (*name).to_string(),
                    replacement: (*name).to_string(),
                });
            }
        }
        Ok((start, candidates))
    }
}

impl Hinter for MindScriptHelper {
    type Hint = String;
}
impl Highlighter for MindScriptHelper {}
impl Validator for MindScriptHelper {}
impl Helper for MindScriptHelper {}

pub fn run(ip: &mut Interpreter, backend_name: &str) -> ExitCode {
    println!(
        "{}",
        WELCOME
            .replace("{version}", mindscript_core::VERSION)
            .replace("{backend}", backend_name)
    );

    let mut editor: Editor<MindScriptHelper, rustyline::history::DefaultHistory> =
        match Editor::new() {
            Ok(editor) => editor,
            Err(e) => {
                eprintln!("Could not start the line editor: {}", e);
                return ExitCode::from(1);
            }
        };
    editor.set_helper(Some(MindScriptHelper));

    let mut prompt = "> ";
    let mut lines = String::new();
    loop {
        match editor.readline(prompt) {
            Ok(line) => {
                lines.push_str(&line);
                lines.push('\n');
                if lines.trim().is_empty() {
                    prompt = "> ";
                    lines.clear();
                    continue;
                }
                match ip.eval(&lines, Some("<repl>")) {
                    Ok(value) => {
                        let _ = editor.add_history_entry(lines.trim_end());
                        if let Some(note) = value.annotation() {
                            println!("{}", green(&note));
                        }
                        println!("{}", blue(&printer::print(&value)));
                        prompt = "> ";
                        lines.clear();
                    }
                    Err(Interrupt::Incomplete) => {
                        prompt = "| ";
                    }
                    Err(Interrupt::Error(diagnostics)) => {
                        for diagnostic in diagnostics {
                            eprintln!("{}", diagnostic.render_ansi());
                        }
                        prompt = "> ";
                        lines.clear();
                    }
                    Err(Interrupt::Return { .. }) | Err(Interrupt::Exit) => {
                        println!("\nExiting...");
                        return ExitCode::SUCCESS;
                    }
                    Err(_) => {
                        prompt = "> ";
                        lines.clear();
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                // Control-C discards the buffered partial input.
                println!("<Cancel input>");
                prompt = "> ";
                lines.clear();
            }
            Err(ReadlineError::Eof) => {
                println!();
                return ExitCode::SUCCESS;
            }
            Err(e) => {
                eprintln!("{}", e);
                return ExitCode::from(1);
            }
        }
    }
}
