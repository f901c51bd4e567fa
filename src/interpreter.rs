//! Tree-walking interpreter for Lox
//!
//! Executes a resolved [`Program`]. Locals are looked up by the hop counts the resolver
//! recorded; names without an entry go straight to the global scope.
//!
//! Statement completion is explicit: [`Flow`] carries `break` and `return` out of nested
//! statements up to the loop or call that consumes them.

use std::collections::HashMap;
use std::io::Write;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::ast::{
    BinaryOp, ClassDecl, Expr, ExprKind, FunctionDecl, LogicalOp, Program, Stmt, UnaryOp,
};
use crate::callable::{self, Class, Function, Instance, NativeFn, INITIALIZER};
use crate::environment::{EnvRef, Environment};
use crate::error::{Diagnostics, ErrorKind, LoxError, Result};
use crate::resolver::Depths;
use crate::stack::ensure_sufficient_stack;
use crate::token::Span;
use crate::value::Value;

/// Nested calls allowed before a script is reported as overflowing the stack.
pub const MAX_CALL_DEPTH: usize = 256;

/// How a statement finished
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    Normal,
    Break,
    Return(Value),
}

/// The interpreter state
pub struct Interpreter<'out> {
    globals: EnvRef,
    environment: EnvRef,
    depths: Depths,
    out: &'out mut dyn Write,
    call_depth: usize,
}

impl<'out> Interpreter<'out> {
    /// Create an interpreter writing `print` output to `out`
    pub fn new(out: &'out mut dyn Write) -> Self {
        let globals = Environment::new().into_ref();
        globals
            .borrow_mut()
            .define("clock", Value::NativeFunction(NativeFn::new("clock", 0, callable::clock)));

        Self {
            environment: Rc::clone(&globals),
            globals,
            depths: HashMap::new(),
            out,
            call_depth: 0,
        }
    }

    /// Run every top-level statement.
    ///
    /// A runtime error aborts only the statement that raised it; later statements still run
    /// and every error is returned. `depths` is merged into the tables of earlier programs.
    pub fn interpret(
        &mut self,
        program: &Program,
        depths: Depths,
    ) -> std::result::Result<(), Diagnostics> {
        self.depths.extend(depths);
        debug!(statements = program.statements.len(), "interpreting program");

        let mut errors = Vec::new();
        for stmt in &program.statements {
            let signal = match self.execute(stmt) {
                Ok(Flow::Normal) => continue,
                Ok(Flow::Break) => "break",
                Ok(Flow::Return(_)) => "return",
                Err(e) => {
                    debug!(error = %e, "top-level statement failed");
                    errors.push(e);
                    continue;
                }
            };
            errors.push(LoxError::new(ErrorKind::UnexpectedSignal(signal), None));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Evaluate a single expression in the global scope
    pub fn evaluate_expression(&mut self, expr: &Expr, depths: Depths) -> Result<Value> {
        self.depths.extend(depths);
        self.evaluate(expr)
    }

    // ==================== Statements ====================

    fn execute(&mut self, stmt: &Stmt) -> Result<Flow> {
        ensure_sufficient_stack(|| self.execute_stmt(stmt))
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<Flow> {
        match stmt {
            Stmt::Expr { expr } => {
                self.evaluate(expr)?;
                Ok(Flow::Normal)
            }
            Stmt::Print { expr, span } => {
                let value = self.evaluate(expr)?;
                writeln!(self.out, "{}", value)
                    .map_err(|e| LoxError::at(ErrorKind::Io(e.to_string()), *span))?;
                Ok(Flow::Normal)
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(init) => self.evaluate(init)?,
                    None => Value::Nil,
                };
                self.environment.borrow_mut().define(name.name.clone(), value);
                Ok(Flow::Normal)
            }
            Stmt::Block { stmts, .. } => {
                let scope = Environment::with_parent(Rc::clone(&self.environment)).into_ref();
                self.execute_block(stmts, scope)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
                ..
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(Flow::Normal)
                }
            }
            Stmt::While { condition, body, .. } => {
                while self.evaluate(condition)?.is_truthy() {
                    match self.execute(body)? {
                        Flow::Normal => {}
                        Flow::Break => break,
                        flow @ Flow::Return(_) => return Ok(flow),
                    }
                }
                Ok(Flow::Normal)
            }
            Stmt::Break { .. } => Ok(Flow::Break),
            Stmt::Function(decl) => {
                let function = Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                let name = decl.name.as_ref().map_or("", |n| n.name.as_str());
                self.environment
                    .borrow_mut()
                    .define(name, Value::Function(Rc::new(function)));
                Ok(Flow::Normal)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Ok(Flow::Return(value))
            }
            Stmt::Class(class) => {
                self.execute_class(class)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `stmts` with `scope` as the current environment.
    ///
    /// The previous environment is restored however the block finishes, errors included.
    pub(crate) fn execute_block(&mut self, stmts: &[Stmt], scope: EnvRef) -> Result<Flow> {
        let previous = std::mem::replace(&mut self.environment, scope);
        let result = self.execute_all(stmts);
        self.environment = previous;
        result
    }

    fn execute_all(&mut self, stmts: &[Stmt]) -> Result<Flow> {
        for stmt in stmts {
            match self.execute(stmt)? {
                Flow::Normal => {}
                flow => return Ok(flow),
            }
        }
        Ok(Flow::Normal)
    }

    fn execute_class(&mut self, class: &ClassDecl) -> Result<()> {
        let superclass = match &class.superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(superclass) => Some(superclass),
                _ => return Err(LoxError::at(ErrorKind::SuperclassMustBeClass, expr.span)),
            },
            None => None,
        };

        let enclosing = Rc::clone(&self.environment);
        let method_scope = match &superclass {
            Some(superclass) => {
                let mut scope = Environment::with_parent(Rc::clone(&enclosing));
                scope.define("super", Value::Class(Rc::clone(superclass)));
                scope.into_ref()
            }
            None => Rc::clone(&enclosing),
        };

        let methods = Self::methods(&class.methods, &method_scope, true);
        let class_methods = Self::methods(&class.class_methods, &method_scope, false);

        let class_value = Class::new(class.name.name.clone(), superclass, methods, class_methods);
        enclosing
            .borrow_mut()
            .define(class.name.name.clone(), Value::Class(Rc::new(class_value)));
        Ok(())
    }

    fn methods(
        decls: &[Rc<FunctionDecl>],
        closure: &EnvRef,
        allow_initializer: bool,
    ) -> HashMap<String, Function> {
        decls
            .iter()
            .filter_map(|decl| {
                let name = decl.name.as_ref()?.name.clone();
                let is_initializer = allow_initializer && name == INITIALIZER;
                let method = Function::new(Rc::clone(decl), Rc::clone(closure), is_initializer);
                Some((name, method))
            })
            .collect()
    }

    // ==================== Expressions ====================

    fn evaluate(&mut self, expr: &Expr) -> Result<Value> {
        ensure_sufficient_stack(|| self.evaluate_expr(expr))
    }

    fn evaluate_expr(&mut self, expr: &Expr) -> Result<Value> {
        match &expr.kind {
            ExprKind::Literal(literal) => Ok(Value::from(literal)),
            ExprKind::Grouping(inner) => self.evaluate(inner),
            ExprKind::Unary { op, operand } => {
                let value = self.evaluate(operand)?;
                match op {
                    UnaryOp::Neg => match value {
                        Value::Number(n) => Ok(Value::Number(-n)),
                        _ => Err(LoxError::at(ErrorKind::OperandMustBeNumber, expr.span)),
                    },
                    UnaryOp::Not => Ok(Value::Bool(!value.is_truthy())),
                }
            }
            ExprKind::Binary { left, op, right } => {
                let left = self.evaluate(left)?;
                let right = self.evaluate(right)?;
                binary(*op, left, right, expr.span)
            }
            ExprKind::Logical { left, op, right } => {
                let left = self.evaluate(left)?;
                let short_circuit = match op {
                    LogicalOp::Or => left.is_truthy(),
                    LogicalOp::And => !left.is_truthy(),
                };
                if short_circuit {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            ExprKind::Ternary {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.evaluate(then_branch)
                } else {
                    self.evaluate(else_branch)
                }
            }
            ExprKind::Assign { name, value } => {
                let value = self.evaluate(value)?;
                match self.depths.get(&expr.id) {
                    Some(&distance) => Environment::assign_at(
                        &self.environment,
                        distance,
                        &name.name,
                        value.clone(),
                        name.span,
                    )?,
                    None => self
                        .globals
                        .borrow_mut()
                        .assign(&name.name, value.clone(), name.span)?,
                }
                Ok(value)
            }
            ExprKind::Variable { name } => self.look_up(&name.name, expr),
            ExprKind::Call { callee, args } => self.call(callee, args, expr.span),
            ExprKind::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => Instance::get(&instance, &name.name, name.span),
                Value::Class(class) => Class::get(&class, &name.name, name.span),
                _ => Err(LoxError::at(ErrorKind::OnlyInstancesHaveProperties, name.span)),
            },
            ExprKind::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object)? else {
                    return Err(LoxError::at(ErrorKind::OnlyInstancesHaveFields, name.span));
                };
                let value = self.evaluate(value)?;
                instance.borrow_mut().set(&name.name, value.clone());
                Ok(value)
            }
            ExprKind::This => self.look_up("this", expr),
            ExprKind::Super { method } => self.super_method(expr, &method.name),
            ExprKind::Lambda(decl) => {
                let function = Function::new(Rc::clone(decl), Rc::clone(&self.environment), false);
                Ok(Value::Function(Rc::new(function)))
            }
        }
    }

    fn look_up(&self, name: &str, expr: &Expr) -> Result<Value> {
        match self.depths.get(&expr.id) {
            Some(&distance) => Environment::get_at(&self.environment, distance, name, expr.span),
            None => self.globals.borrow().get(name, expr.span),
        }
    }

    fn call(&mut self, callee: &Expr, args: &[Expr], span: Span) -> Result<Value> {
        let callee = self.evaluate(callee)?;
        let Some(function) = callee.as_callable() else {
            return Err(LoxError::at(ErrorKind::NotCallable, span));
        };

        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.evaluate(arg)?);
        }

        if values.len() != function.arity() {
            return Err(LoxError::at(
                ErrorKind::WrongArity {
                    expected: function.arity(),
                    got: values.len(),
                },
                span,
            ));
        }

        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(LoxError::at(ErrorKind::StackOverflow, span));
        }

        trace!(callee = %callee, args = values.len(), depth = self.call_depth, "call");
        self.call_depth += 1;
        let result = function.call(self, values);
        self.call_depth -= 1;
        result
    }

    /// `super.method`: look `method` up starting at the superclass and bind it to `this`.
    fn super_method(&mut self, expr: &Expr, method: &str) -> Result<Value> {
        let Some(&distance) = self.depths.get(&expr.id) else {
            return Err(LoxError::at(ErrorKind::UndefinedVariable("super".into()), expr.span));
        };

        let superclass = Environment::get_at(&self.environment, distance, "super", expr.span)?;
        let Value::Class(superclass) = superclass else {
            return Err(LoxError::at(ErrorKind::SuperclassMustBeClass, expr.span));
        };

        // `this` lives in the scope directly inside the one holding `super`.
        let receiver = distance
            .checked_sub(1)
            .ok_or_else(|| LoxError::at(ErrorKind::UndefinedVariable("this".into()), expr.span))
            .and_then(|d| Environment::get_at(&self.environment, d, "this", expr.span))?;

        let found = match receiver {
            Value::Class(_) => superclass.find_class_method(method),
            _ => superclass.find_method(method),
        };
        match found {
            Some(function) => Ok(Value::Function(Rc::new(function.bind(receiver)))),
            None => Err(LoxError::at(
                ErrorKind::UndefinedProperty(method.to_string()),
                expr.span,
            )),
        }
    }
}

fn binary(op: BinaryOp, left: Value, right: Value, span: Span) -> Result<Value> {
    use BinaryOp::*;

    match op {
        Add => match (left, right) {
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
            (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
            _ => Err(LoxError::at(ErrorKind::OperandsMustBeNumbersOrStrings, span)),
        },
        Eq => Ok(Value::Bool(left == right)),
        Ne => Ok(Value::Bool(left != right)),
        Sub | Mul | Div | Lt | Le | Gt | Ge => {
            let (Value::Number(a), Value::Number(b)) = (left, right) else {
                return Err(LoxError::at(ErrorKind::OperandsMustBeNumbers, span));
            };
            Ok(match op {
                Sub => Value::Number(a - b),
                Mul => Value::Number(a * b),
                Div => Value::Number(a / b),
                Lt => Value::Bool(a < b),
                Le => Value::Bool(a <= b),
                Gt => Value::Bool(a > b),
                _ => Value::Bool(a >= b),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;
    use crate::parser::Parser;
    use crate::resolver::Resolver;

    fn run(source: &str) -> (String, std::result::Result<(), Diagnostics>) {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let depths = Resolver::new().resolve(&program).unwrap();

        let mut out = Vec::new();
        let result = Interpreter::new(&mut out).interpret(&program, depths);
        (String::from_utf8(out).unwrap(), result)
    }

    fn output(source: &str) -> String {
        let (out, result) = run(source);
        assert!(result.is_ok(), "unexpected errors: {:?}", result);
        out
    }

    fn errors(source: &str) -> Vec<ErrorKind> {
        run(source).1.unwrap_err().into_iter().map(|e| e.kind).collect()
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(output("print 1 + 2 * 3;"), "7\n");
        assert_eq!(output("print (1 + 2) * 3;"), "9\n");
        assert_eq!(output("print 7 / 2;"), "3.5\n");
        assert_eq!(output("print -(3 - 5);"), "2\n");
        assert_eq!(output("print 1 / 0;"), "inf\n");
    }

    #[test]
    fn test_string_concatenation() {
        assert_eq!(output("print \"foo\" + \"bar\";"), "foobar\n");
        assert_eq!(
            errors("print \"a\" + 1;"),
            vec![ErrorKind::OperandsMustBeNumbersOrStrings]
        );
    }

    #[test]
    fn test_comparison_and_equality() {
        assert_eq!(output("print 1 + 2 == 3;"), "true\n");
        assert_eq!(output("print 1 < 2;"), "true\n");
        assert_eq!(output("print \"1\" == 1;"), "false\n");
        assert_eq!(output("print nil == nil;"), "true\n");
        assert_eq!(errors("print \"a\" < \"b\";"), vec![ErrorKind::OperandsMustBeNumbers]);
        assert_eq!(errors("print -\"a\";"), vec![ErrorKind::OperandMustBeNumber]);
    }

    #[test]
    fn test_logical_returns_operand() {
        assert_eq!(output("print nil or \"default\";"), "default\n");
        assert_eq!(output("print 0 and \"second\";"), "second\n");
        assert_eq!(output("print false and undefined;"), "false\n");
    }

    #[test]
    fn test_ternary() {
        assert_eq!(output("print true ? 1 : 2;"), "1\n");
        assert_eq!(output("print nil ? 1 : false ? 2 : 3;"), "3\n");
    }

    #[test]
    fn test_while_and_break() {
        assert_eq!(
            output("var i = 0; while (true) { if (i == 3) break; print i; i = i + 1; }"),
            "0\n1\n2\n"
        );
        assert_eq!(
            output("for (var i = 0; i < 3; i = i + 1) print i;"),
            "0\n1\n2\n"
        );
    }

    #[test]
    fn test_return_unwinds_loop() {
        assert_eq!(
            output("fun f() { while (true) { return \"out\"; } } print f();"),
            "out\n"
        );
    }

    #[test]
    fn test_lambda() {
        assert_eq!(
            output("var add = fun (a, b) { return a + b; }; print add(1, 2); print add;"),
            "3\n<lambda fn>\n"
        );
    }

    #[test]
    fn test_display_of_callables() {
        assert_eq!(
            output("fun f() {} class C {} print f; print C; print C(); print clock;"),
            "<fn f>\nC\nC instance\n<native fn>\n"
        );
    }

    #[test]
    fn test_runtime_error_continues_with_next_statement() {
        let (out, result) = run("print 1; print undefined; print 2;");
        assert_eq!(out, "1\n2\n");
        let kinds: Vec<_> = result.unwrap_err().into_iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![ErrorKind::UndefinedVariable("undefined".into())]);
    }

    #[test]
    fn test_environment_restored_after_error_in_block() {
        let (out, _) = run("var a = \"global\"; { var a = \"local\"; nil(); } print a;");
        assert_eq!(out, "global\n");
    }

    #[test]
    fn test_call_errors() {
        assert_eq!(errors("\"str\"();"), vec![ErrorKind::NotCallable]);
        assert_eq!(
            errors("fun f(a, b) {} f(1);"),
            vec![ErrorKind::WrongArity { expected: 2, got: 1 }]
        );
        assert_eq!(
            errors("class P { init(x) {} } P();"),
            vec![ErrorKind::WrongArity { expected: 1, got: 0 }]
        );
    }

    #[test]
    fn test_property_errors() {
        assert_eq!(errors("var n = 1; print n.x;"), vec![ErrorKind::OnlyInstancesHaveProperties]);
        assert_eq!(errors("var n = 1; n.x = 2;"), vec![ErrorKind::OnlyInstancesHaveFields]);
        assert_eq!(
            errors("class A {} print A().missing;"),
            vec![ErrorKind::UndefinedProperty("missing".into())]
        );
        assert_eq!(
            errors("var NotAClass = 1; class B < NotAClass {}"),
            vec![ErrorKind::SuperclassMustBeClass]
        );
    }

    #[test]
    fn test_class_methods() {
        assert_eq!(
            output("class Math { class square(n) { return n * n; } } print Math.square(3);"),
            "9\n"
        );
    }

    fn run_with_depths(source: &str, adjust: impl FnOnce(&mut Depths)) -> (String, Vec<ErrorKind>) {
        let tokens = Lexer::new(source).tokenize().unwrap();
        let program = Parser::new(tokens).parse().unwrap();
        let mut depths = Resolver::new().resolve(&program).unwrap();
        adjust(&mut depths);

        let mut out = Vec::new();
        let result = Interpreter::new(&mut out).interpret(&program, depths);
        let kinds = result.err().unwrap_or_default().into_iter().map(|e| e.kind).collect();
        (String::from_utf8(out).unwrap(), kinds)
    }

    #[test]
    fn test_lookups_follow_the_depth_table() {
        let source = "var a = \"outer\"; { var a = \"inner\"; print a; }";
        assert_eq!(run_with_depths(source, |_| {}), ("inner\n".to_string(), vec![]));

        // One hop further lands on the global `a`.
        let shifted = run_with_depths(source, |depths| {
            assert_eq!(depths.len(), 1);
            for depth in depths.values_mut() {
                *depth += 1;
            }
        });
        assert_eq!(shifted, ("outer\n".to_string(), vec![]));

        // Past the end of the scope chain the lookup fails.
        let broken = run_with_depths(source, |depths| {
            for depth in depths.values_mut() {
                *depth += 5;
            }
        });
        assert_eq!(
            broken,
            (String::new(), vec![ErrorKind::UndefinedVariable("a".into())])
        );
    }

    #[test]
    fn test_evaluate_expression_sees_globals() {
        let mut out = Vec::new();
        let mut interpreter = Interpreter::new(&mut out);

        let tokens = Lexer::new("var x = 20;").tokenize().unwrap();
        let mut parser = Parser::new(tokens);
        let program = parser.parse().unwrap();
        let depths = Resolver::new().resolve(&program).unwrap();
        interpreter.interpret(&program, depths).unwrap();

        let tokens = Lexer::new("x + 1").tokenize().unwrap();
        let expr = Parser::with_offset(tokens, parser.next_id())
            .parse_expression()
            .unwrap();
        let depths = Resolver::new().resolve_expression(&expr).unwrap();
        assert_eq!(
            interpreter.evaluate_expression(&expr, depths).unwrap(),
            Value::Number(21.0)
        );
    }
}
