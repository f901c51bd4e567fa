//! Debug renderings of tokens and the AST
//!
//! `prefix` writes Lisp-style `(- 123 (* 45.67 89))`, `rpn` writes the operands first:
//! `((123 -) ...)`. Neither output is meant to be parsed back.

use crate::ast::{Expr, ExprKind, FunctionDecl, Literal, Program, Stmt};
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;

/// Render an expression in prefix notation
pub fn prefix(expr: &Expr) -> String {
    ensure_sufficient_stack(|| prefix_kind(expr))
}

fn prefix_kind(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Literal(literal) => literal_text(literal),
        ExprKind::Grouping(inner) => format!("(group {})", prefix(inner)),
        ExprKind::Unary { op, operand } => format!("({} {})", op, prefix(operand)),
        ExprKind::Binary { left, op, right } => {
            format!("({} {} {})", op, prefix(left), prefix(right))
        }
        ExprKind::Logical { left, op, right } => {
            format!("({} {} {})", op, prefix(left), prefix(right))
        }
        ExprKind::Ternary { condition, then_branch, else_branch } => format!(
            "(? {} {} {})",
            prefix(condition),
            prefix(then_branch),
            prefix(else_branch)
        ),
        ExprKind::Assign { name, value } => format!("(= {} {})", name.name, prefix(value)),
        ExprKind::Variable { name } => name.name.clone(),
        ExprKind::Call { callee, args } => {
            let mut out = format!("(call {}", prefix(callee));
            for arg in args {
                out.push(' ');
                out.push_str(&prefix(arg));
            }
            out.push(')');
            out
        }
        ExprKind::Get { object, name } => format!("(. {} {})", prefix(object), name.name),
        ExprKind::Set { object, name, value } => {
            format!("(= (. {} {}) {})", prefix(object), name.name, prefix(value))
        }
        ExprKind::This => "this".to_string(),
        ExprKind::Super { method } => format!("(super {})", method.name),
        ExprKind::Lambda(decl) => function("lambda", decl),
    }
}

/// Render an expression in reverse polish notation
pub fn rpn(expr: &Expr) -> String {
    ensure_sufficient_stack(|| rpn_kind(expr))
}

fn rpn_kind(expr: &Expr) -> String {
    match &expr.kind {
        ExprKind::Grouping(inner) => format!("(group {})", rpn(inner)),
        ExprKind::Unary { op, operand } => format!("({} {})", rpn(operand), op),
        ExprKind::Binary { left, op, right } => format!("({} {} {})", rpn(left), rpn(right), op),
        ExprKind::Logical { left, op, right } => {
            format!("({} {} {})", rpn(left), rpn(right), op)
        }
        ExprKind::Ternary { condition, then_branch, else_branch } => format!(
            "({} {} {} ?)",
            rpn(condition),
            rpn(then_branch),
            rpn(else_branch)
        ),
        _ => prefix(expr),
    }
}

/// Render a whole program, one top-level statement per line
pub fn program(program: &Program) -> String {
    program
        .statements
        .iter()
        .map(statement)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render a token stream, one token per line: position, kind and lexeme
pub fn tokens(tokens: &[Token]) -> String {
    tokens
        .iter()
        .map(|token| {
            format!(
                "{}:{} {:?} {}",
                token.span.line, token.span.column, token.kind, token.lexeme
            )
            .trim_end()
            .to_string()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn statement(stmt: &Stmt) -> String {
    ensure_sufficient_stack(|| statement_kind(stmt))
}

fn statement_kind(stmt: &Stmt) -> String {
    match stmt {
        Stmt::Expr { expr } => format!("(; {})", prefix(expr)),
        Stmt::Print { expr, .. } => format!("(print {})", prefix(expr)),
        Stmt::Var { name, initializer: Some(init) } => {
            format!("(var {} {})", name.name, prefix(init))
        }
        Stmt::Var { name, initializer: None } => format!("(var {})", name.name),
        Stmt::Block { stmts, .. } => block("block", stmts),
        Stmt::If { condition, then_branch, else_branch, .. } => match else_branch {
            Some(else_branch) => format!(
                "(if {} {} {})",
                prefix(condition),
                statement(then_branch),
                statement(else_branch)
            ),
            None => format!("(if {} {})", prefix(condition), statement(then_branch)),
        },
        Stmt::While { condition, body, .. } => {
            format!("(while {} {})", prefix(condition), statement(body))
        }
        Stmt::Break { .. } => "(break)".to_string(),
        Stmt::Function(decl) => function("fun", decl),
        Stmt::Return { value: Some(value), .. } => format!("(return {})", prefix(value)),
        Stmt::Return { value: None, .. } => "(return)".to_string(),
        Stmt::Class(class) => {
            let mut out = format!("(class {}", class.name.name);
            if let Some(superclass) = &class.superclass {
                out.push_str(&format!(" < {}", prefix(superclass)));
            }
            for method in &class.class_methods {
                out.push(' ');
                out.push_str(&function("class-method", method));
            }
            for method in &class.methods {
                out.push(' ');
                out.push_str(&function("method", method));
            }
            out.push(')');
            out
        }
    }
}

fn function(keyword: &str, decl: &FunctionDecl) -> String {
    let mut out = format!("({keyword}");
    if let Some(name) = &decl.name {
        out.push(' ');
        out.push_str(&name.name);
    }
    let params: Vec<&str> = decl.params.iter().map(|p| p.name.as_str()).collect();
    out.push_str(&format!(" ({})", params.join(" ")));
    for stmt in &decl.body {
        out.push(' ');
        out.push_str(&statement(stmt));
    }
    out.push(')');
    out
}

fn block(keyword: &str, stmts: &[Stmt]) -> String {
    let mut out = format!("({keyword}");
    for stmt in stmts {
        out.push(' ');
        out.push_str(&statement(stmt));
    }
    out.push(')');
    out
}

fn literal_text(literal: &Literal) -> String {
    match literal {
        Literal::Number(n) => {
            let text = n.to_string();
            if text.contains('.') || !n.is_finite() {
                text
            } else {
                format!("{text}.0")
            }
        }
        Literal::String(s) => format!("\"{s}\""),
        Literal::Bool(b) => b.to_string(),
        Literal::Nil => "nil".to_string(),
    }
}
