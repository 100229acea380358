//! The `mindscript` binary: file execution and the interactive REPL.

mod repl;

use clap::Parser;
use mindscript_core::backend::Backend;
use mindscript_core::{Interpreter, Interrupt};
use mindscript_provider_llm::{llamacpp::LlamaCpp, network, ollama::Ollama, openai::OpenAi};
use std::path::PathBuf;
use std::process::ExitCode;
use std::rc::Rc;

const BACKENDS: &[&str] = &["llamacpp", "openai", "ollama"];

#[derive(Parser)]
#[command(name = "mindscript", version, about = "The MindScript interpreter")]
struct Args {
    /// An optional filename to process
    filename: Option<PathBuf>,
    /// Chooses an LLM backend (llamacpp, openai, ollama)
    #[arg(short = 'b', value_name = "BACKEND")]
    backend: Option<String>,
    /// Specifies the API's URL
    #[arg(short = 'u', value_name = "URL")]
    url: Option<String>,
    /// Specifies the name of the model to use
    #[arg(short = 'm', value_name = "MODEL")]
    model: Option<String>,
}

fn build_backend(args: &Args) -> Result<(Rc<dyn Backend>, String), String> {
    let name = args.backend.as_deref().unwrap_or("llamacpp");
    if !BACKENDS.contains(&name) {
        return Err(format!("Unknown backend: {}", name));
    }
    let url = args.url.as_deref();
    let model = args.model.as_deref();
    let backend: Rc<dyn Backend> = match name {
        "openai" => Rc::new(OpenAi::new(url, model).map_err(|e| e.to_string())?),
        "ollama" => Rc::new(Ollama::new(url, model).map_err(|e| e.to_string())?),
        _ => Rc::new(LlamaCpp::new(url)),
    };
    Ok((backend, name.to_string()))
}

fn execute_file(ip: &mut Interpreter, filename: &PathBuf) -> ExitCode {
    let code = match std::fs::read_to_string(filename) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {}", filename.display(), e);
            return ExitCode::from(1);
        }
    };
    match ip.eval(&code, Some(&filename.display().to_string())) {
        Ok(_) | Err(Interrupt::Return { .. }) | Err(Interrupt::Exit) => ExitCode::SUCCESS,
        Err(Interrupt::Error(diagnostics)) => {
            for diagnostic in diagnostics {
                eprintln!("{}", diagnostic.render_ansi());
            }
            ExitCode::from(1)
        }
        Err(_) => {
            eprintln!("Reached end of file.");
            ExitCode::from(1)
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    let (backend, backend_name) = match build_backend(&args) {
        Ok(built) => built,
        Err(message) => {
            eprintln!("{}", message);
            return ExitCode::from(2);
        }
    };

    let interactive = args.filename.is_none();
    let mut ip = match mindscript_core::interpreter_with(interactive, backend, network::register) {
        Ok(ip) => ip,
        Err(Interrupt::Error(diagnostics)) => {
            for diagnostic in diagnostics {
                eprintln!("{}", diagnostic.render());
            }
            return ExitCode::from(1);
        }
        Err(_) => {
            eprintln!("Interpreter startup failed.");
            return ExitCode::from(1);
        }
    };

    match &args.filename {
        Some(filename) => execute_file(&mut ip, filename),
        None => repl::run(&mut ip, &backend_name),
    }
}
