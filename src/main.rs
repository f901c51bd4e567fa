//! lox CLI and REPL
//!
//! Usage:
//!   lox                 - Start interactive REPL
//!   lox <file.lox>      - Execute a Lox file
//!   lox run <file.lox>  - Execute a Lox file
//!   lox repl            - Start interactive REPL
//!   lox ast <file.lox>  - Print the parsed program
//!   lox tokens <file.lox> - Print the token stream

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser as CliParser, Subcommand};
use colored::Colorize;
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;

use lox_tw::{printer, Diagnostics, Lexer, Parser, Session, Value, VERSION};

/// Usage error (sysexits `EX_USAGE`).
const EXIT_USAGE: i32 = 64;
/// Input file could not be read (sysexits `EX_NOINPUT`).
const EXIT_NO_INPUT: i32 = 66;

#[derive(CliParser)]
#[command(name = "lox", version, about = "A tree-walking interpreter for Lox")]
#[command(args_conflicts_with_subcommands = true)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,

    /// Script to run. Starts the REPL when omitted.
    file: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Command {
    /// Execute a Lox file
    Run { file: PathBuf },
    /// Start the interactive REPL
    Repl,
    /// Parse a file and print its syntax tree
    Ast { file: PathBuf },
    /// Scan a file and print its tokens
    Tokens { file: PathBuf },
}

fn main() {
    init_tracing();

    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) if e.use_stderr() => {
            let _ = e.print();
            process::exit(EXIT_USAGE);
        }
        Err(e) => e.exit(),
    };

    match (cli.command, cli.file) {
        (Some(Command::Run { file }), _) | (None, Some(file)) => run_file(&file),
        (Some(Command::Ast { file }), _) => print_ast(&file),
        (Some(Command::Tokens { file }), _) => print_tokens(&file),
        (Some(Command::Repl), _) | (None, None) => run_repl(),
    }
}

/// Install a stderr subscriber, but only when `RUST_LOG` asks for one.
fn init_tracing() {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    if std::env::var("RUST_LOG").is_ok() {
        tracing_subscriber::registry()
            .with(fmt::layer().with_writer(io::stderr).with_target(true))
            .with(EnvFilter::from_default_env())
            .init();
    }
}

fn read_source(path: &Path) -> String {
    match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            eprintln!("{}: cannot read file '{}': {}", "error".red(), path.display(), e);
            process::exit(EXIT_NO_INPUT);
        }
    }
}

fn report(errors: &Diagnostics) {
    for err in errors {
        eprintln!("{}", err);
    }
}

fn run_file(path: &Path) {
    let source = read_source(path);
    let stdout = io::stdout();
    let mut out = stdout.lock();

    if let Err(errors) = lox_tw::run(&source, &mut out) {
        report(&errors);
        let code = errors.iter().map(|e| e.exit_code()).min().unwrap_or(70);
        process::exit(code);
    }
}

fn print_ast(path: &Path) {
    let source = read_source(path);

    let program = Lexer::new(&source)
        .tokenize()
        .and_then(|tokens| Parser::new(tokens).parse());

    match program {
        Ok(program) => println!("{}", printer::program(&program)),
        Err(errors) => {
            let errors: Diagnostics = errors.into_iter().map(|e| e.with_source(&source)).collect();
            report(&errors);
            process::exit(65);
        }
    }
}

fn print_tokens(path: &Path) {
    let source = read_source(path);

    match Lexer::new(&source).tokenize() {
        Ok(tokens) => println!("{}", printer::tokens(&tokens)),
        Err(errors) => {
            let errors: Diagnostics = errors.into_iter().map(|e| e.with_source(&source)).collect();
            report(&errors);
            process::exit(65);
        }
    }
}

fn run_repl() {
    println!("{} {}", "Lox".cyan().bold(), VERSION.cyan());
    println!("Type {} to exit\n", "exit".yellow());

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(e) => {
            eprintln!("{}: cannot start REPL: {}", "error".red(), e);
            process::exit(1);
        }
    };

    let mut stdout = io::stdout();
    let mut session = Session::new(&mut stdout);

    loop {
        match rl.readline(&format!("{} ", "lox>".green().bold())) {
            Ok(line) => {
                let line = line.trim();

                if line.is_empty() {
                    continue;
                }

                let _ = rl.add_history_entry(line);

                if matches!(line, "exit" | "quit") {
                    break;
                }

                match session.eval(line) {
                    Ok(Some(Value::Nil)) | Ok(None) => {}
                    Ok(Some(value)) => {
                        println!("{} {}", "=>".dimmed(), value.to_string().cyan());
                    }
                    Err(errors) => {
                        for err in errors {
                            eprintln!("{}", err.to_string().red());
                        }
                    }
                }
            }
            Err(ReadlineError::Interrupted) => {
                println!("{}", "^C".dimmed());
            }
            Err(ReadlineError::Eof) => break,
            Err(err) => {
                eprintln!("{}: {:?}", "error".red(), err);
                break;
            }
        }
    }
}
