//! Static scope resolution for Lox
//!
//! Walks the AST once before execution. Every variable, assignment, `this` and `super`
//! expression that refers to a local binding gets an entry in the depth table: the number of
//! scopes between the use and the declaration. Anything without an entry is a global.
//!
//! The resolver also rejects programs that are syntactically fine but meaningless: `return`
//! at top level, `this` outside a class, a local read in its own initializer and so on.

use std::collections::HashMap;

use tracing::trace;

use crate::ast::{ClassDecl, Expr, ExprKind, FunctionDecl, Ident, NodeId, Program, Stmt};
use crate::callable::INITIALIZER;
use crate::error::{Diagnostics, ErrorKind, LoxError};
use crate::stack::ensure_sufficient_stack;
use crate::token::Span;

/// Hop count from a use site to the scope that declares it, keyed by expression id.
pub type Depths = HashMap<NodeId, usize>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FunctionKind {
    None,
    Function,
    Initializer,
    Method,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ClassKind {
    None,
    Class,
    Subclass,
}

/// Scope resolver
pub struct Resolver {
    /// Innermost scope last. `false` means declared but not yet initialized.
    scopes: Vec<HashMap<String, bool>>,
    current_function: FunctionKind,
    current_class: ClassKind,
    /// Loops enclosing the current point, reset at every function boundary.
    loop_depth: usize,
    depths: Depths,
    errors: Diagnostics,
}

impl Resolver {
    pub fn new() -> Self {
        Self {
            scopes: Vec::new(),
            current_function: FunctionKind::None,
            current_class: ClassKind::None,
            loop_depth: 0,
            depths: HashMap::new(),
            errors: Vec::new(),
        }
    }

    /// Resolve a whole program, reporting every static error found
    pub fn resolve(mut self, program: &Program) -> std::result::Result<Depths, Diagnostics> {
        self.resolve_stmts(&program.statements);
        self.finish()
    }

    /// Resolve a standalone expression evaluated in the global scope
    pub fn resolve_expression(mut self, expr: &Expr) -> std::result::Result<Depths, Diagnostics> {
        self.resolve_expr(expr);
        self.finish()
    }

    fn finish(self) -> std::result::Result<Depths, Diagnostics> {
        if self.errors.is_empty() {
            Ok(self.depths)
        } else {
            Err(self.errors)
        }
    }

    fn error(&mut self, kind: ErrorKind, span: Span) {
        self.errors.push(LoxError::at(kind, span));
    }

    // ==================== Scopes ====================

    fn begin_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn end_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &Ident) {
        let Some(scope) = self.scopes.last_mut() else {
            return;
        };
        let duplicate = scope.insert(name.name.clone(), false).is_some();
        if duplicate {
            self.error(ErrorKind::AlreadyDeclared(name.name.clone()), name.span);
        }
    }

    fn define(&mut self, name: &str) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), true);
        }
    }

    fn resolve_local(&mut self, id: NodeId, name: &str) {
        let innermost = self.scopes.len();
        for (index, scope) in self.scopes.iter().enumerate().rev() {
            if scope.contains_key(name) {
                let depth = innermost - 1 - index;
                trace!(variable = name, id, depth, "resolved local");
                self.depths.insert(id, depth);
                return;
            }
        }
    }

    // ==================== Statements ====================

    fn resolve_stmts(&mut self, stmts: &[Stmt]) {
        for stmt in stmts {
            self.resolve_stmt(stmt);
        }
    }

    fn resolve_stmt(&mut self, stmt: &Stmt) {
        ensure_sufficient_stack(|| self.resolve_stmt_kind(stmt))
    }

    fn resolve_stmt_kind(&mut self, stmt: &Stmt) {
        match stmt {
            Stmt::Expr { expr } | Stmt::Print { expr, .. } => self.resolve_expr(expr),
            Stmt::Var { name, initializer } => {
                self.declare(name);
                if let Some(init) = initializer {
                    self.resolve_expr(init);
                }
                self.define(&name.name);
            }
            Stmt::Block { stmts, .. } => {
                self.begin_scope();
                self.resolve_stmts(stmts);
                self.end_scope();
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                self.resolve_expr(condition);
                self.resolve_stmt(then_branch);
                if let Some(else_branch) = else_branch {
                    self.resolve_stmt(else_branch);
                }
            }
            Stmt::While { condition, body, .. } => {
                self.resolve_expr(condition);
                self.loop_depth += 1;
                self.resolve_stmt(body);
                self.loop_depth -= 1;
            }
            Stmt::Break { span } => {
                if self.loop_depth == 0 {
                    self.error(ErrorKind::BreakOutsideLoop, *span);
                }
            }
            Stmt::Function(decl) => {
                if let Some(name) = &decl.name {
                    self.declare(name);
                    self.define(&name.name);
                }
                self.resolve_function(decl, FunctionKind::Function);
            }
            Stmt::Return { value, span } => {
                if self.current_function == FunctionKind::None {
                    self.error(ErrorKind::ReturnOutsideFunction, *span);
                }
                if let Some(value) = value {
                    if self.current_function == FunctionKind::Initializer {
                        self.error(ErrorKind::ReturnFromInitializer, *span);
                    }
                    self.resolve_expr(value);
                }
            }
            Stmt::Class(class) => self.resolve_class(class),
        }
    }

    fn resolve_class(&mut self, class: &ClassDecl) {
        let enclosing_class = std::mem::replace(&mut self.current_class, ClassKind::Class);

        self.declare(&class.name);
        self.define(&class.name.name);

        if let Some(superclass) = &class.superclass {
            if let ExprKind::Variable { name } = &superclass.kind {
                if name.name == class.name.name {
                    self.error(ErrorKind::InheritFromSelf, superclass.span);
                }
            }
            self.current_class = ClassKind::Subclass;
            self.resolve_expr(superclass);

            self.begin_scope();
            self.define("super");
        }

        self.begin_scope();
        self.define("this");

        for method in &class.methods {
            let is_init = method
                .name
                .as_ref()
                .is_some_and(|name| name.name == INITIALIZER);
            let kind = if is_init {
                FunctionKind::Initializer
            } else {
                FunctionKind::Method
            };
            self.resolve_function(method, kind);
        }
        for method in &class.class_methods {
            self.resolve_function(method, FunctionKind::Method);
        }

        self.end_scope();
        if class.superclass.is_some() {
            self.end_scope();
        }

        self.current_class = enclosing_class;
    }

    fn resolve_function(&mut self, decl: &FunctionDecl, kind: FunctionKind) {
        let enclosing_function = std::mem::replace(&mut self.current_function, kind);
        let enclosing_loops = std::mem::replace(&mut self.loop_depth, 0);

        self.begin_scope();
        for param in &decl.params {
            self.declare(param);
            self.define(&param.name);
        }
        self.resolve_stmts(&decl.body);
        self.end_scope();

        self.loop_depth = enclosing_loops;
        self.current_function = enclosing_function;
    }

    // ==================== Expressions ====================

    fn resolve_expr(&mut self, expr: &Expr) {
        ensure_sufficient_stack(|| self.resolve_expr_kind(expr))
    }

    fn resolve_expr_kind(&mut self, expr: &Expr) {
        match &expr.kind {
            ExprKind::Literal(_) => {}
            ExprKind::Grouping(inner) => self.resolve_expr(inner),
            ExprKind::Unary { operand, .. } => self.resolve_expr(operand),
            ExprKind::Binary { left, right, .. } | ExprKind::Logical { left, right, .. } => {
                self.resolve_expr(left);
                self.resolve_expr(right);
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                self.resolve_expr(condition);
                self.resolve_expr(then_branch);
                self.resolve_expr(else_branch);
            }
            ExprKind::Variable { name } => {
                let uninitialized = self
                    .scopes
                    .last()
                    .and_then(|scope| scope.get(&name.name))
                    .is_some_and(|defined| !defined);
                if uninitialized {
                    self.error(ErrorKind::ReadInOwnInitializer(name.name.clone()), name.span);
                }
                self.resolve_local(expr.id, &name.name);
            }
            ExprKind::Assign { name, value } => {
                self.resolve_expr(value);
                self.resolve_local(expr.id, &name.name);
            }
            ExprKind::Call { callee, args } => {
                self.resolve_expr(callee);
                for arg in args {
                    self.resolve_expr(arg);
                }
            }
            ExprKind::Get { object, .. } => self.resolve_expr(object),
            ExprKind::Set { object, value, .. } => {
                self.resolve_expr(value);
                self.resolve_expr(object);
            }
            ExprKind::This => {
                if self.current_class == ClassKind::None {
                    self.error(ErrorKind::ThisOutsideClass, expr.span);
                    return;
                }
                self.resolve_local(expr.id, "this");
            }
            ExprKind::Super { .. } => {
                match self.current_class {
                    ClassKind::None => self.error(ErrorKind::SuperOutsideClass, expr.span),
                    ClassKind::Class => self.error(ErrorKind::SuperWithoutSuperclass, expr.span),
                    ClassKind::Subclass => {}
                }
                self.resolve_local(expr.id, "super");
            }
            ExprKind::Lambda(decl) => self.resolve_function(decl, FunctionKind::Function),
        }
    }
}

impl Default for Resolver {
    fn default() -> Self {
        Self::new()
    }
}
