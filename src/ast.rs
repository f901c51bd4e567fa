//! Abstract Syntax Tree definitions for Lox
//!
//! Represents the structure of programs after parsing.

use std::rc::Rc;

use crate::token::Span;

/// A unique identifier for expression nodes.
///
/// The resolver's depth table is keyed by this id, so two textually identical
/// references at different places in the source are different entries.
pub type NodeId = usize;

/// An identifier as written in the source, e.g. a variable or parameter name.
#[derive(Debug, Clone, PartialEq)]
pub struct Ident {
    pub name: String,
    pub span: Span,
}

impl Ident {
    pub fn new(name: impl Into<String>, span: Span) -> Self {
        Self { name: name.into(), span }
    }
}

/// Literal values
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Number(f64),
    String(String),
    Bool(bool),
    Nil,
}

/// An expression node
#[derive(Debug, Clone)]
pub struct Expr {
    pub id: NodeId,
    /// For operators and calls this is the operator / closing paren, which is where runtime
    /// errors are reported.
    pub span: Span,
    pub kind: ExprKind,
}

/// Expression variants
#[derive(Debug, Clone)]
pub enum ExprKind {
    /// Literal: 42, "hello", true, nil
    Literal(Literal),

    /// Grouping: (expr)
    Grouping(Box<Expr>),

    /// Unary operation: -x, !y
    Unary { op: UnaryOp, operand: Box<Expr> },

    /// Binary operation: a + b, x == y
    Binary {
        left: Box<Expr>,
        op: BinaryOp,
        right: Box<Expr>,
    },

    /// Short-circuiting and/or
    Logical {
        left: Box<Expr>,
        op: LogicalOp,
        right: Box<Expr>,
    },

    /// cond ? a : b
    Ternary {
        condition: Box<Expr>,
        then_branch: Box<Expr>,
        else_branch: Box<Expr>,
    },

    /// Variable assignment: x = value
    Assign { name: Ident, value: Box<Expr> },

    /// Variable reference: foo
    Variable { name: Ident },

    /// Function call: foo(a, b)
    Call { callee: Box<Expr>, args: Vec<Expr> },

    /// Property access: obj.prop
    Get { object: Box<Expr>, name: Ident },

    /// Property assignment: obj.prop = value
    Set {
        object: Box<Expr>,
        name: Ident,
        value: Box<Expr>,
    },

    This,

    /// super.method
    Super { method: Ident },

    /// Anonymous function: fun (a, b) { ... }
    Lambda(Rc<FunctionDecl>),
}

/// Binary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    Add, // +
    Sub, // -
    Mul, // *
    Div, // /
    Eq,  // ==
    Ne,  // !=
    Lt,  // <
    Le,  // <=
    Gt,  // >
    Ge,  // >=
}

impl std::fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BinaryOp::Add => write!(f, "+"),
            BinaryOp::Sub => write!(f, "-"),
            BinaryOp::Mul => write!(f, "*"),
            BinaryOp::Div => write!(f, "/"),
            BinaryOp::Eq => write!(f, "=="),
            BinaryOp::Ne => write!(f, "!="),
            BinaryOp::Lt => write!(f, "<"),
            BinaryOp::Le => write!(f, "<="),
            BinaryOp::Gt => write!(f, ">"),
            BinaryOp::Ge => write!(f, ">="),
        }
    }
}

/// Unary operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    Neg, // -
    Not, // !
}

impl std::fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UnaryOp::Neg => write!(f, "-"),
            UnaryOp::Not => write!(f, "!"),
        }
    }
}

/// Logical operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LogicalOp {
    And,
    Or,
}

impl std::fmt::Display for LogicalOp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogicalOp::And => write!(f, "and"),
            LogicalOp::Or => write!(f, "or"),
        }
    }
}

/// A function, method or lambda declaration.
///
/// Shared behind an `Rc` so runtime functions can keep their body alive after the
/// program that declared them is gone (the REPL drops each line's AST).
#[derive(Debug, Clone)]
pub struct FunctionDecl {
    /// `None` for lambdas.
    pub name: Option<Ident>,
    pub params: Vec<Ident>,
    pub body: Vec<Stmt>,
    pub span: Span,
}

/// A class declaration
#[derive(Debug, Clone)]
pub struct ClassDecl {
    pub name: Ident,
    /// Always an `ExprKind::Variable` when present.
    pub superclass: Option<Expr>,
    pub methods: Vec<Rc<FunctionDecl>>,
    /// Methods declared with a leading `class`, called on the class itself.
    pub class_methods: Vec<Rc<FunctionDecl>>,
    pub span: Span,
}

/// Statement nodes
#[derive(Debug, Clone)]
pub enum Stmt {
    /// Expression statement
    Expr { expr: Expr },

    /// print expr;
    Print { expr: Expr, span: Span },

    /// var name = initializer;
    Var {
        name: Ident,
        initializer: Option<Expr>,
    },

    /// Block: { stmt* }
    Block { stmts: Vec<Stmt>, span: Span },

    /// if (cond) stmt else stmt
    If {
        condition: Expr,
        then_branch: Box<Stmt>,
        else_branch: Option<Box<Stmt>>,
        span: Span,
    },

    /// while (cond) stmt. `for` loops are desugared into this.
    While {
        condition: Expr,
        body: Box<Stmt>,
        span: Span,
    },

    /// Break statement
    Break { span: Span },

    /// Function declaration: fun name(params) { }
    Function(Rc<FunctionDecl>),

    /// Return statement: return expr;
    Return { value: Option<Expr>, span: Span },

    /// Class declaration
    Class(ClassDecl),
}

/// A complete program
#[derive(Debug, Clone)]
pub struct Program {
    pub statements: Vec<Stmt>,
}

impl Program {
    pub fn new(statements: Vec<Stmt>) -> Self {
        Self { statements }
    }
}
