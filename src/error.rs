//! Error types for Lox
//!
//! Every stage reports through [`LoxError`]: a kind, an optional source location and,
//! once [`LoxError::with_source`] has been called, the offending source line.

use crate::token::Span;
use std::fmt;
use thiserror::Error;

/// Which part of the pipeline an error comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Scanning, parsing or resolution. Nothing has been executed yet.
    Static,
    Runtime,
}

/// Error kinds in Lox
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ErrorKind {
    // Lexer errors
    #[error("Unexpected character '{0}'.")]
    UnexpectedCharacter(char),
    #[error("Unterminated string.")]
    UnterminatedString,
    #[error("Unterminated multi-line comment.")]
    UnterminatedComment,

    // Parser errors
    #[error("{message} Got '{found}'.")]
    ExpectedToken { message: String, found: String },
    #[error("Expect expression.")]
    ExpectedExpression,
    #[error("Invalid assignment target.")]
    InvalidAssignmentTarget,
    #[error("Can't have more than {0} {1}.")]
    TooMany(usize, &'static str),

    // Resolver errors
    #[error("Already a variable with this name in this scope.")]
    AlreadyDeclared(String),
    #[error("Can't read local variable in its own initializer.")]
    ReadInOwnInitializer(String),
    #[error("Can't return from top-level code.")]
    ReturnOutsideFunction,
    #[error("Can't return a value from an initializer.")]
    ReturnFromInitializer,
    #[error("Can't use 'this' outside of a class.")]
    ThisOutsideClass,
    #[error("Can't use 'super' outside of a class.")]
    SuperOutsideClass,
    #[error("Can't use 'super' in a class with no superclass.")]
    SuperWithoutSuperclass,
    #[error("A class can't inherit from itself.")]
    InheritFromSelf,
    #[error("Can't use 'break' outside of a loop.")]
    BreakOutsideLoop,

    // Runtime errors
    #[error("Operand must be a number.")]
    OperandMustBeNumber,
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers,
    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings,
    #[error("Can only call functions and classes.")]
    NotCallable,
    #[error("Expected {expected} arguments but got {got}.")]
    WrongArity { expected: usize, got: usize },
    #[error("Undefined variable '{0}'.")]
    UndefinedVariable(String),
    #[error("Undefined property '{0}'.")]
    UndefinedProperty(String),
    #[error("Only instances have properties.")]
    OnlyInstancesHaveProperties,
    #[error("Only instances have fields.")]
    OnlyInstancesHaveFields,
    #[error("Superclass must be a class.")]
    SuperclassMustBeClass,
    #[error("Stack overflow.")]
    StackOverflow,
    #[error("'{0}' escaped to the top level.")]
    UnexpectedSignal(&'static str),
    #[error("output error: {0}")]
    Io(String),
}

impl ErrorKind {
    pub fn phase(&self) -> Phase {
        use ErrorKind::*;
        match self {
            UnexpectedCharacter(_)
            | UnterminatedString
            | UnterminatedComment
            | ExpectedToken { .. }
            | ExpectedExpression
            | InvalidAssignmentTarget
            | TooMany(..)
            | AlreadyDeclared(_)
            | ReadInOwnInitializer(_)
            | ReturnOutsideFunction
            | ReturnFromInitializer
            | ThisOutsideClass
            | SuperOutsideClass
            | SuperWithoutSuperclass
            | InheritFromSelf
            | BreakOutsideLoop => Phase::Static,
            OperandMustBeNumber
            | OperandsMustBeNumbers
            | OperandsMustBeNumbersOrStrings
            | NotCallable
            | WrongArity { .. }
            | UndefinedVariable(_)
            | UndefinedProperty(_)
            | OnlyInstancesHaveProperties
            | OnlyInstancesHaveFields
            | SuperclassMustBeClass
            | StackOverflow
            | UnexpectedSignal(_)
            | Io(_) => Phase::Runtime,
        }
    }
}

/// A Lox error with location information
#[derive(Debug, Clone, PartialEq)]
pub struct LoxError {
    pub kind: ErrorKind,
    pub span: Option<Span>,
    pub source_line: Option<String>,
}

impl LoxError {
    pub fn new(kind: ErrorKind, span: Option<Span>) -> Self {
        Self {
            kind,
            span,
            source_line: None,
        }
    }

    pub fn at(kind: ErrorKind, span: Span) -> Self {
        Self::new(kind, Some(span))
    }

    pub fn with_source(mut self, source: &str) -> Self {
        if let Some(span) = &self.span {
            if span.line > 0 {
                self.source_line = source.lines().nth(span.line - 1).map(str::to_string);
            }
        }
        self
    }

    pub fn phase(&self) -> Phase {
        self.kind.phase()
    }

    /// Conventional process exit code for this error (sysexits `EX_DATAERR` / `EX_SOFTWARE`).
    pub fn exit_code(&self) -> i32 {
        match self.phase() {
            Phase::Static => 65,
            Phase::Runtime => 70,
        }
    }
}

impl fmt::Display for LoxError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(span) = &self.span {
            write!(f, "[line {}:{}] Error: {}", span.line, span.column, self.kind)?;

            if let Some(ref line) = self.source_line {
                write!(f, "\n  | {}", line)?;
                write!(f, "\n  | {}^", " ".repeat(span.column.saturating_sub(1)))?;
            }
        } else {
            write!(f, "Error: {}", self.kind)?;
        }
        Ok(())
    }
}

impl std::error::Error for LoxError {}

/// Result type for Lox operations
pub type Result<T> = std::result::Result<T, LoxError>;

/// Every error a stage found, in source order.
pub type Diagnostics = Vec<LoxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_with_source() {
        let err = LoxError::at(ErrorKind::OperandsMustBeNumbers, Span::new(8, 9, 2, 3))
            .with_source("var a;\nb + \"x\";");
        assert_eq!(
            err.to_string(),
            "[line 2:3] Error: Operands must be numbers.\n  | b + \"x\";\n  |   ^"
        );
    }

    #[test]
    fn test_exit_codes() {
        assert_eq!(LoxError::new(ErrorKind::UnterminatedString, None).exit_code(), 65);
        assert_eq!(LoxError::new(ErrorKind::BreakOutsideLoop, None).exit_code(), 65);
        assert_eq!(LoxError::new(ErrorKind::NotCallable, None).exit_code(), 70);
    }

    #[test]
    fn test_arity_message() {
        let kind = ErrorKind::WrongArity { expected: 2, got: 1 };
        assert_eq!(kind.to_string(), "Expected 2 arguments but got 1.");
    }
}
