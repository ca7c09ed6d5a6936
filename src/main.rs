use std::fs;
use std::io::{self, Read};
use std::process::ExitCode;

use anyhow::{Context, Result, bail};
use loxparse::diagnostics::Diagnostic;
use loxparse::interpreter::Interpreter;
use loxparse::printer::AstPrinter;
use loxparse::{lexer, parser, resolver};

const EXIT_COMPILE_ERROR: u8 = 65;
const EXIT_RUNTIME_ERROR: u8 = 70;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    let mut args = std::env::args().skip(1);
    let Some(mode) = args.next() else {
        bail!("Usage: loxparse <tokenize|parse|evaluate|run> [path]");
    };
    if !matches!(mode.as_str(), "tokenize" | "parse" | "evaluate" | "run") {
        bail!("Unknown command '{mode}'");
    }
    let input_path = args.next();
    if args.next().is_some() {
        bail!("Only one input file is supported");
    }

    let source = match input_path.as_deref() {
        Some("-") | None => {
            let mut buffer = String::new();
            io::stdin()
                .read_to_string(&mut buffer)
                .context("Reading stdin")?;
            buffer
        }
        Some(path) => fs::read_to_string(path).with_context(|| format!("Reading {path}"))?,
    };

    let (tokens, scan_diagnostics) = lexer::tokenize(&source);
    report(&scan_diagnostics);

    if mode == "tokenize" {
        for token in &tokens {
            println!("{token}");
        }
        return Ok(compile_exit(scan_diagnostics.is_empty()));
    }

    let (statements, parse_diagnostics) = parser::parse_tokens(tokens);
    report(&parse_diagnostics);
    let clean_syntax = scan_diagnostics.is_empty() && parse_diagnostics.is_empty();

    if mode == "parse" {
        if clean_syntax {
            println!("{}", AstPrinter::new().print(&statements));
        }
        return Ok(compile_exit(clean_syntax));
    }

    if !clean_syntax {
        return Ok(ExitCode::from(EXIT_COMPILE_ERROR));
    }

    let (locals, resolve_diagnostics) = resolver::resolve(&statements);
    report(&resolve_diagnostics);
    if !resolve_diagnostics.is_empty() {
        return Ok(ExitCode::from(EXIT_COMPILE_ERROR));
    }

    let mut interpreter = Interpreter::new(mode == "evaluate");
    interpreter.resolve(locals);
    let result = interpreter.interpret(&statements);

    // Output produced before a runtime error still belongs on stdout.
    for line in interpreter.output() {
        println!("{line}");
    }
    if let Err(error) = result {
        eprintln!("{error}");
        eprintln!("[line {}]", error.line());
        return Ok(ExitCode::from(EXIT_RUNTIME_ERROR));
    }

    Ok(ExitCode::SUCCESS)
}

fn report(diagnostics: &[Diagnostic]) {
    for diagnostic in diagnostics {
        eprintln!("{diagnostic}");
    }
}

fn compile_exit(clean: bool) -> ExitCode {
    if clean {
        ExitCode::SUCCESS
    } else {
        ExitCode::from(EXIT_COMPILE_ERROR)
    }
}
