//! lox-tw - A tree-walking interpreter for Lox
//!
//! Source text goes through four stages: [`Lexer`], [`Parser`], [`Resolver`] and
//! [`Interpreter`]. The first three only report static errors; nothing runs until the
//! whole program has resolved cleanly.

pub mod ast;
pub mod callable;
pub mod environment;
pub mod error;
pub mod interpreter;
pub mod lexer;
pub mod parser;
pub mod printer;
pub mod resolver;
pub mod stack;
pub mod token;
pub mod value;

use std::io::Write;

pub use error::{Diagnostics, ErrorKind, LoxError, Phase, Result};
pub use interpreter::Interpreter;
pub use lexer::Lexer;
pub use parser::Parser;
pub use resolver::Resolver;
pub use value::Value;

use ast::NodeId;

/// Run a complete program, writing `print` output to `out`
pub fn run(source: &str, out: &mut dyn Write) -> std::result::Result<(), Diagnostics> {
    run_program(source, out).map_err(|errors| with_source(errors, source))
}

fn run_program(source: &str, out: &mut dyn Write) -> std::result::Result<(), Diagnostics> {
    let tokens = Lexer::new(source).tokenize()?;
    let program = Parser::new(tokens).parse()?;
    let depths = Resolver::new().resolve(&program)?;
    Interpreter::new(out).interpret(&program, depths)
}

/// An interpreter that keeps its globals between inputs, as the REPL needs
pub struct Session<'out> {
    interpreter: Interpreter<'out>,
    next_id: NodeId,
}

impl<'out> Session<'out> {
    pub fn new(out: &'out mut dyn Write) -> Self {
        Self {
            interpreter: Interpreter::new(out),
            next_id: 0,
        }
    }

    /// Run one input.
    ///
    /// A bare expression is evaluated and its value returned; anything else runs as a
    /// program and yields `None`.
    pub fn eval(&mut self, source: &str) -> std::result::Result<Option<Value>, Diagnostics> {
        self.eval_inner(source)
            .map_err(|errors| with_source(errors, source))
    }

    fn eval_inner(&mut self, source: &str) -> std::result::Result<Option<Value>, Diagnostics> {
        let tokens = Lexer::new(source).tokenize()?;

        let mut parser = Parser::with_offset(tokens.clone(), self.next_id);
        if let Ok(expr) = parser.parse_expression() {
            self.next_id = parser.next_id();
            let depths = Resolver::new().resolve_expression(&expr)?;
            return self
                .interpreter
                .evaluate_expression(&expr, depths)
                .map(Some)
                .map_err(|e| vec![e]);
        }

        let mut parser = Parser::with_offset(tokens, self.next_id);
        let program = parser.parse();
        self.next_id = parser.next_id();

        let program = program?;
        let depths = Resolver::new().resolve(&program)?;
        self.interpreter.interpret(&program, depths)?;
        Ok(None)
    }
}

fn with_source(errors: Diagnostics, source: &str) -> Diagnostics {
    errors.into_iter().map(|e| e.with_source(source)).collect()
}

/// Version of the interpreter
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
