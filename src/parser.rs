//! Parser for Lox
//!
//! Converts tokens into an Abstract Syntax Tree. Every expression node gets a fresh
//! [`NodeId`]; the resolver keys its depth table on these ids.

use std::rc::Rc;

use crate::ast::{
    BinaryOp, ClassDecl, Expr, ExprKind, FunctionDecl, Ident, Literal, LogicalOp, NodeId,
    Program, Stmt, UnaryOp,
};
use crate::error::{Diagnostics, ErrorKind, LoxError, Result};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Span, Token, TokenKind};

/// Upper bound on parameters and call arguments.
const MAX_ARGS: usize = 255;

/// The parser state
pub struct Parser {
    tokens: Vec<Token>,
    current: usize,
    next_id: NodeId,
    errors: Diagnostics,
}

impl Parser {
    /// Create a new parser from tokens
    pub fn new(tokens: Vec<Token>) -> Self {
        Self::with_offset(tokens, 0)
    }

    /// Create a parser whose node ids start at `first_id`.
    ///
    /// Used when several programs are fed to one interpreter, so their ids never collide.
    pub fn with_offset(tokens: Vec<Token>, first_id: NodeId) -> Self {
        Self {
            tokens,
            current: 0,
            next_id: first_id,
            errors: Vec::new(),
        }
    }

    /// The first id not handed out yet.
    pub fn next_id(&self) -> NodeId {
        self.next_id
    }

    /// Parse the tokens into a program
    pub fn parse(&mut self) -> std::result::Result<Program, Diagnostics> {
        let mut statements = Vec::new();

        while !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                statements.push(stmt);
            }
        }

        if self.errors.is_empty() {
            Ok(Program::new(statements))
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    /// Parse the tokens as a single expression spanning the whole input
    pub fn parse_expression(&mut self) -> std::result::Result<Expr, Diagnostics> {
        let expr = match self.expression() {
            Ok(expr) => expr,
            Err(e) => {
                self.errors.push(e);
                return Err(std::mem::take(&mut self.errors));
            }
        };

        if !self.is_at_end() {
            let err = self.error_expected("Expect end of expression.");
            self.errors.push(err);
        }

        if self.errors.is_empty() {
            Ok(expr)
        } else {
            Err(std::mem::take(&mut self.errors))
        }
    }

    // ==================== Declarations ====================

    /// Parse one declaration, recovering at the next statement boundary on error.
    fn declaration(&mut self) -> Option<Stmt> {
        match self.declaration_inner() {
            Ok(stmt) => Some(stmt),
            Err(e) => {
                self.errors.push(e);
                self.synchronize();
                None
            }
        }
    }

    fn declaration_inner(&mut self) -> Result<Stmt> {
        if self.match_token(&TokenKind::Class) {
            self.class_declaration()
        } else if self.check(&TokenKind::Fun)
            && matches!(self.peek_next().map(|t| &t.kind), Some(TokenKind::Ident(_)))
        {
            self.advance();
            Ok(Stmt::Function(self.function("function")?))
        } else if self.match_token(&TokenKind::Var) {
            self.var_declaration()
        } else {
            self.statement()
        }
    }

    fn class_declaration(&mut self) -> Result<Stmt> {
        let name = self.expect_ident("Expect class name.")?;

        let superclass = if self.match_token(&TokenKind::Less) {
            let superclass = self.expect_ident("Expect superclass name.")?;
            Some(self.expr(superclass.span, ExprKind::Variable { name: superclass }))
        } else {
            None
        };

        self.expect(&TokenKind::LeftBrace, "Expect '{' before class body.")?;

        let mut methods = Vec::new();
        let mut class_methods = Vec::new();
        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            if self.match_token(&TokenKind::Class) {
                class_methods.push(self.function("method")?);
            } else {
                methods.push(self.function("method")?);
            }
        }

        self.expect(&TokenKind::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class(ClassDecl {
            span: name.span,
            name,
            superclass,
            methods,
            class_methods,
        }))
    }

    /// Parse `name(params) { body }` for functions and methods
    fn function(&mut self, kind: &str) -> Result<Rc<FunctionDecl>> {
        let name = self.expect_ident(&format!("Expect {kind} name."))?;
        let params = self.parameters(&format!("Expect '(' after {kind} name."))?;
        self.expect(&TokenKind::LeftBrace, &format!("Expect '{{' before {kind} body."))?;
        let body = self.block_statements()?;

        Ok(Rc::new(FunctionDecl {
            span: name.span,
            name: Some(name),
            params,
            body,
        }))
    }

    fn parameters(&mut self, open_message: &str) -> Result<Vec<Ident>> {
        self.expect(&TokenKind::LeftParen, open_message)?;

        let mut params = Vec::new();
        if !self.check(&TokenKind::RightParen) {
            loop {
                if params.len() >= MAX_ARGS {
                    let span = self.peek().span;
                    self.errors
                        .push(LoxError::at(ErrorKind::TooMany(MAX_ARGS, "parameters"), span));
                }
                params.push(self.expect_ident("Expect parameter name.")?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        self.expect(&TokenKind::RightParen, "Expect ')' after parameters.")?;
        Ok(params)
    }

    fn var_declaration(&mut self) -> Result<Stmt> {
        let name = self.expect_ident("Expect variable name.")?;

        let initializer = if self.match_token(&TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };

        self.expect(&TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    // ==================== Statements ====================

    fn statement(&mut self) -> Result<Stmt> {
        ensure_sufficient_stack(|| self.statement_inner())
    }

    fn statement_inner(&mut self) -> Result<Stmt> {
        if self.match_token(&TokenKind::For) {
            self.for_statement()
        } else if self.match_token(&TokenKind::If) {
            self.if_statement()
        } else if self.match_token(&TokenKind::Print) {
            self.print_statement()
        } else if self.match_token(&TokenKind::Return) {
            self.return_statement()
        } else if self.match_token(&TokenKind::While) {
            self.while_statement()
        } else if self.match_token(&TokenKind::Break) {
            let span = self.previous().span;
            self.expect(&TokenKind::Semicolon, "Expect ';' after 'break'.")?;
            Ok(Stmt::Break { span })
        } else if self.match_token(&TokenKind::LeftBrace) {
            let span = self.previous().span;
            let stmts = self.block_statements()?;
            Ok(Stmt::Block { stmts, span })
        } else {
            self.expression_statement()
        }
    }

    /// `for` has no node of its own: it becomes blocks around a `while`.
    fn for_statement(&mut self) -> Result<Stmt> {
        let span = self.previous().span;
        self.expect(&TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_token(&TokenKind::Semicolon) {
            None
        } else if self.match_token(&TokenKind::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(&TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.expect(&TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;

        if let Some(increment) = increment {
            body = Stmt::Block {
                stmts: vec![body, Stmt::Expr { expr: increment }],
                span,
            };
        }

        let condition = match condition {
            Some(condition) => condition,
            None => self.expr(span, ExprKind::Literal(Literal::Bool(true))),
        };
        body = Stmt::While {
            condition,
            body: Box::new(body),
            span,
        };

        if let Some(initializer) = initializer {
            body = Stmt::Block {
                stmts: vec![initializer, body],
                span,
            };
        }

        Ok(body)
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        let span = self.previous().span;
        self.expect(&TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.expect(&TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_token(&TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            span,
        })
    }

    fn print_statement(&mut self) -> Result<Stmt> {
        let span = self.previous().span;
        let expr = self.expression()?;
        self.expect(&TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print { expr, span })
    }

    fn return_statement(&mut self) -> Result<Stmt> {
        let span = self.previous().span;

        let value = if self.check(&TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };

        self.expect(&TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { value, span })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        let span = self.previous().span;
        self.expect(&TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.expect(&TokenKind::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);

        Ok(Stmt::While { condition, body, span })
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let expr = self.expression()?;
        self.expect(&TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expr { expr })
    }

    /// Statements up to and including the closing brace (the opening one is already consumed)
    fn block_statements(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = Vec::new();

        while !self.check(&TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(stmt) = self.declaration() {
                stmts.push(stmt);
            }
        }

        self.expect(&TokenKind::RightBrace, "Expect '}' after block.")?;

        Ok(stmts)
    }

    // ==================== Expressions ====================

    fn expression(&mut self) -> Result<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.assignment_inner())
    }

    fn assignment_inner(&mut self) -> Result<Expr> {
        let expr = self.ternary()?;

        if self.match_token(&TokenKind::Equal) {
            let equals = self.previous().span;
            let value = Box::new(self.assignment()?);

            return match expr {
                Expr { kind: ExprKind::Variable { name }, .. } => {
                    Ok(self.expr(name.span, ExprKind::Assign { name, value }))
                }
                Expr { kind: ExprKind::Get { object, name }, span, .. } => {
                    Ok(self.expr(span, ExprKind::Set { object, name, value }))
                }
                other => {
                    // Reported, but the parser is not confused: no need to synchronize.
                    self.errors
                        .push(LoxError::at(ErrorKind::InvalidAssignmentTarget, equals));
                    Ok(other)
                }
            };
        }

        Ok(expr)
    }

    fn ternary(&mut self) -> Result<Expr> {
        let condition = self.or_expr()?;

        if self.match_token(&TokenKind::Question) {
            let span = self.previous().span;
            let then_branch = self.expression()?;
            self.expect(&TokenKind::Colon, "Expect ':' after then branch of ternary expression.")?;
            let else_branch = self.ternary()?;

            return Ok(self.expr(span, ExprKind::Ternary {
                condition: Box::new(condition),
                then_branch: Box::new(then_branch),
                else_branch: Box::new(else_branch),
            }));
        }

        Ok(condition)
    }

    fn or_expr(&mut self) -> Result<Expr> {
        let mut left = self.and_expr()?;

        while self.match_token(&TokenKind::Or) {
            let span = self.previous().span;
            let right = self.and_expr()?;
            left = self.expr(span, ExprKind::Logical {
                left: Box::new(left),
                op: LogicalOp::Or,
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn and_expr(&mut self) -> Result<Expr> {
        let mut left = self.equality()?;

        while self.match_token(&TokenKind::And) {
            let span = self.previous().span;
            let right = self.equality()?;
            left = self.expr(span, ExprKind::Logical {
                left: Box::new(left),
                op: LogicalOp::And,
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn equality(&mut self) -> Result<Expr> {
        let mut left = self.comparison()?;

        loop {
            let op = if self.match_token(&TokenKind::EqualEqual) {
                BinaryOp::Eq
            } else if self.match_token(&TokenKind::BangEqual) {
                BinaryOp::Ne
            } else {
                break;
            };

            let span = self.previous().span;
            let right = self.comparison()?;
            left = self.binary(left, op, right, span);
        }

        Ok(left)
    }

    fn comparison(&mut self) -> Result<Expr> {
        let mut left = self.term()?;

        loop {
            let op = if self.match_token(&TokenKind::Less) {
                BinaryOp::Lt
            } else if self.match_token(&TokenKind::LessEqual) {
                BinaryOp::Le
            } else if self.match_token(&TokenKind::Greater) {
                BinaryOp::Gt
            } else if self.match_token(&TokenKind::GreaterEqual) {
                BinaryOp::Ge
            } else {
                break;
            };

            let span = self.previous().span;
            let right = self.term()?;
            left = self.binary(left, op, right, span);
        }

        Ok(left)
    }

    fn term(&mut self) -> Result<Expr> {
        let mut left = self.factor()?;

        loop {
            let op = if self.match_token(&TokenKind::Plus) {
                BinaryOp::Add
            } else if self.match_token(&TokenKind::Minus) {
                BinaryOp::Sub
            } else {
                break;
            };

            let span = self.previous().span;
            let right = self.factor()?;
            left = self.binary(left, op, right, span);
        }

        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr> {
        let mut left = self.unary()?;

        loop {
            let op = if self.match_token(&TokenKind::Star) {
                BinaryOp::Mul
            } else if self.match_token(&TokenKind::Slash) {
                BinaryOp::Div
            } else {
                break;
            };

            let span = self.previous().span;
            let right = self.unary()?;
            left = self.binary(left, op, right, span);
        }

        Ok(left)
    }

    fn unary(&mut self) -> Result<Expr> {
        ensure_sufficient_stack(|| self.unary_inner())
    }

    fn unary_inner(&mut self) -> Result<Expr> {
        let op = if self.match_token(&TokenKind::Minus) {
            UnaryOp::Neg
        } else if self.match_token(&TokenKind::Bang) {
            UnaryOp::Not
        } else {
            return self.call();
        };

        let span = self.previous().span;
        let operand = self.unary()?;
        Ok(self.expr(span, ExprKind::Unary {
            op,
            operand: Box::new(operand),
        }))
    }

    fn call(&mut self) -> Result<Expr> {
        let mut expr = self.primary()?;

        loop {
            if self.match_token(&TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_token(&TokenKind::Dot) {
                let name = self.expect_ident("Expect property name after '.'.")?;
                expr = self.expr(name.span, ExprKind::Get {
                    object: Box::new(expr),
                    name,
                });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> Result<Expr> {
        let mut args = Vec::new();

        if !self.check(&TokenKind::RightParen) {
            loop {
                if args.len() >= MAX_ARGS {
                    let span = self.peek().span;
                    self.errors
                        .push(LoxError::at(ErrorKind::TooMany(MAX_ARGS, "arguments"), span));
                }
                args.push(self.expression()?);
                if !self.match_token(&TokenKind::Comma) {
                    break;
                }
            }
        }

        let paren = self.expect(&TokenKind::RightParen, "Expect ')' after arguments.")?.span;

        Ok(self.expr(paren, ExprKind::Call {
            callee: Box::new(callee),
            args,
        }))
    }

    fn primary(&mut self) -> Result<Expr> {
        let token = self.peek().clone();

        let kind = match token.kind {
            TokenKind::Number(n) => ExprKind::Literal(Literal::Number(n)),
            TokenKind::String(s) => ExprKind::Literal(Literal::String(s)),
            TokenKind::True => ExprKind::Literal(Literal::Bool(true)),
            TokenKind::False => ExprKind::Literal(Literal::Bool(false)),
            TokenKind::Nil => ExprKind::Literal(Literal::Nil),
            TokenKind::This => ExprKind::This,
            TokenKind::Ident(name) => ExprKind::Variable {
                name: Ident::new(name, token.span),
            },
            TokenKind::Super => {
                self.advance();
                self.expect(&TokenKind::Dot, "Expect '.' after 'super'.")?;
                let method = self.expect_ident("Expect superclass method name.")?;
                return Ok(self.expr(token.span, ExprKind::Super { method }));
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.expression()?;
                self.expect(&TokenKind::RightParen, "Expect ')' after expression.")?;
                return Ok(self.expr(token.span, ExprKind::Grouping(Box::new(expr))));
            }
            TokenKind::Fun => {
                self.advance();
                let params = self.parameters("Expect '(' after 'fun'.")?;
                self.expect(&TokenKind::LeftBrace, "Expect '{' before lambda body.")?;
                let body = self.block_statements()?;
                let decl = Rc::new(FunctionDecl {
                    name: None,
                    params,
                    body,
                    span: token.span,
                });
                return Ok(self.expr(token.span, ExprKind::Lambda(decl)));
            }
            // The offending token stays put for synchronize() to look at.
            _ => return Err(LoxError::at(ErrorKind::ExpectedExpression, token.span)),
        };

        self.advance();
        Ok(self.expr(token.span, kind))
    }

    // ==================== Helpers ====================

    fn expr(&mut self, span: Span, kind: ExprKind) -> Expr {
        let id = self.next_id;
        self.next_id += 1;
        Expr { id, span, kind }
    }

    fn binary(&mut self, left: Expr, op: BinaryOp, right: Expr, span: Span) -> Expr {
        self.expr(span, ExprKind::Binary {
            left: Box::new(left),
            op,
            right: Box::new(right),
        })
    }

    /// Skip tokens until something that looks like the start of a statement.
    fn synchronize(&mut self) {
        self.advance();

        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }

            match self.peek().kind {
                TokenKind::Class
                | TokenKind::Fun
                | TokenKind::Var
                | TokenKind::For
                | TokenKind::If
                | TokenKind::While
                | TokenKind::Print
                | TokenKind::Return => return,
                _ => {}
            }

            self.advance();
        }
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.current]
    }

    fn peek_next(&self) -> Option<&Token> {
        self.tokens.get(self.current + 1)
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.current.saturating_sub(1)]
    }

    fn is_at_end(&self) -> bool {
        matches!(self.peek().kind, TokenKind::Eof)
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.current += 1;
        }
        self.previous()
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(&self.peek().kind) == std::mem::discriminant(kind)
    }

    fn match_token(&mut self, kind: &TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn error_expected(&self, message: &str) -> LoxError {
        LoxError::at(
            ErrorKind::ExpectedToken {
                message: message.to_string(),
                found: format!("{}", self.peek().kind),
            },
            self.peek().span,
        )
    }

    fn expect(&mut self, kind: &TokenKind, message: &str) -> Result<&Token> {
        if self.check(kind) {
            Ok(self.advance())
        } else {
            Err(self.error_expected(message))
        }
    }

    fn expect_ident(&mut self, message: &str) -> Result<Ident> {
        if let TokenKind::Ident(name) = &self.peek().kind {
            let ident = Ident::new(name.clone(), self.peek().span);
            self.advance();
            Ok(ident)
        } else {
            Err(self.error_expected(message))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::Lexer;

    fn parse(source: &str) -> Program {
        let mut lexer = Lexer::new(source);
        let tokens = lexer.tokenize().unwrap();
        let mut parser = Parser::new(tokens);
        parser.parse().unwrap()
    }

    fn parse_errors(source: &str) -> Vec<ErrorKind> {
        let tokens = Lexer::new(source).tokenize().unwrap();
        Parser::new(tokens)
            .parse()
            .unwrap_err()
            .into_iter()
            .map(|e| e.kind)
            .collect()
    }

    #[test]
    fn test_var_statement() {
        let program = parse("var x = 42;");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0] {
            Stmt::Var { name, initializer } => {
                assert_eq!(name.name, "x");
                assert!(initializer.is_some());
            }
            _ => panic!("expected var statement"),
        }
    }

    #[test]
    fn test_function() {
        let program = parse("fun add(a, b) { return a + b; }");
        match &program.statements[0] {
            Stmt::Function(decl) => {
                assert_eq!(decl.name.as_ref().map(|n| n.name.as_str()), Some("add"));
                let params: Vec<_> = decl.params.iter().map(|p| p.name.as_str()).collect();
                assert_eq!(params, ["a", "b"]);
                assert_eq!(decl.body.len(), 1);
            }
            _ => panic!("expected function"),
        }
    }

    #[test]
    fn test_class_with_superclass_and_class_methods() {
        let program = parse("class B < A { init(x) {} class make() {} speak() {} }");
        match &program.statements[0] {
            Stmt::Class(class) => {
                assert_eq!(class.name.name, "B");
                assert!(matches!(
                    class.superclass.as_ref().map(|e| &e.kind),
                    Some(ExprKind::Variable { name }) if name.name == "A"
                ));
                assert_eq!(class.methods.len(), 2);
                assert_eq!(class.class_methods.len(), 1);
            }
            _ => panic!("expected class"),
        }
    }

    #[test]
    fn test_if_else() {
        let program = parse("if (x > 0) print x; else print 0;");
        match &program.statements[0] {
            Stmt::If { else_branch, .. } => assert!(else_branch.is_some()),
            _ => panic!("expected if statement"),
        }
    }

    #[test]
    fn test_for_desugars_to_while() {
        let program = parse("for (var i = 0; i < 3; i = i + 1) print i;");
        match &program.statements[0] {
            Stmt::Block { stmts, .. } => {
                assert!(matches!(stmts[0], Stmt::Var { .. }));
                match &stmts[1] {
                    Stmt::While { body, .. } => match body.as_ref() {
                        Stmt::Block { stmts, .. } => assert_eq!(stmts.len(), 2),
                        _ => panic!("expected body with increment"),
                    },
                    _ => panic!("expected while"),
                }
            }
            _ => panic!("expected block"),
        }
    }

    #[test]
    fn test_node_ids_are_unique() {
        fn collect(expr: &Expr, ids: &mut Vec<NodeId>) {
            ids.push(expr.id);
            if let ExprKind::Binary { left, right, .. } = &expr.kind {
                collect(left, ids);
                collect(right, ids);
            }
        }

        let program = parse("x + x + x;");
        let mut ids = Vec::new();
        match &program.statements[0] {
            Stmt::Expr { expr } => collect(expr, &mut ids),
            _ => panic!("expected expression statement"),
        }
        let count = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), count);
        assert_eq!(count, 5);
    }

    #[test]
    fn test_offset_ids() {
        let tokens = Lexer::new("a;").tokenize().unwrap();
        let mut parser = Parser::with_offset(tokens, 100);
        let program = parser.parse().unwrap();
        match &program.statements[0] {
            Stmt::Expr { expr } => assert_eq!(expr.id, 100),
            _ => panic!("expected expression statement"),
        }
        assert_eq!(parser.next_id(), 101);
    }

    #[test]
    fn test_ternary_is_right_associative() {
        let tokens = Lexer::new("a ? b : c ? d : e").tokenize().unwrap();
        let expr = Parser::new(tokens).parse_expression().unwrap();
        match expr.kind {
            ExprKind::Ternary { else_branch, .. } => {
                assert!(matches!(else_branch.kind, ExprKind::Ternary { .. }))
            }
            _ => panic!("expected ternary"),
        }
    }

    #[test]
    fn test_invalid_assignment_target() {
        assert_eq!(parse_errors("1 = 2;"), vec![ErrorKind::InvalidAssignmentTarget]);
    }

    #[test]
    fn test_recovers_and_reports_every_error() {
        let errors = parse_errors("var = 1;\nprint 2;\nprint ;\nvar ok = 3;");
        assert_eq!(errors.len(), 2);
        assert!(matches!(errors[0], ErrorKind::ExpectedToken { .. }));
        assert_eq!(errors[1], ErrorKind::ExpectedExpression);
    }

    #[test]
    fn test_error_inside_block_recovers_locally() {
        let errors = parse_errors("{ var a = ; print a; } print 1 +;");
        assert_eq!(errors.len(), 2);
    }

    #[test]
    fn test_lambda_expression() {
        let program = parse("var f = fun (a) { return a; };");
        match &program.statements[0] {
            Stmt::Var { initializer: Some(expr), .. } => match &expr.kind {
                ExprKind::Lambda(decl) => {
                    assert!(decl.name.is_none());
                    assert_eq!(decl.params.len(), 1);
                }
                _ => panic!("expected lambda"),
            },
            _ => panic!("expected var"),
        }
    }
}
