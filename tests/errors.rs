use lox_tw::{Diagnostics, ErrorKind, Phase};
use pretty_assertions::assert_eq;

fn run(source: &str) -> (String, Result<(), Diagnostics>) {
    let mut out = Vec::new();
    let result = lox_tw::run(source, &mut out);
    (String::from_utf8(out).expect("output is not UTF-8"), result)
}

fn kinds(errors: &Diagnostics) -> Vec<ErrorKind> {
    errors.iter().map(|e| e.kind.clone()).collect()
}

#[test]
fn test_arity_error_message() {
    let (_, result) = run("fun f(a, b) { return a + b; }\nf(1);");
    let errors = result.expect_err("expected an arity error");
    assert_eq!(kinds(&errors), vec![ErrorKind::WrongArity { expected: 2, got: 1 }]);
    assert_eq!(errors[0].phase(), Phase::Runtime);
    assert_eq!(errors[0].exit_code(), 70);

    let message = errors[0].to_string();
    assert!(message.contains("Expected 2 arguments but got 1."), "{message}");
    assert!(message.contains("[line 2:"), "{message}");
    assert!(message.contains("f(1);"), "{message}");
}

#[test]
fn test_static_error_prevents_execution() {
    let (out, result) = run("print \"before\"; var x = 10; { var x = x + 1; print x; }");
    assert_eq!(out, "");
    let errors = result.expect_err("expected a resolution error");
    assert_eq!(kinds(&errors), vec![ErrorKind::ReadInOwnInitializer("x".to_string())]);
    assert_eq!(errors[0].exit_code(), 65);
}

#[test]
fn test_syntax_errors_are_all_reported() {
    let (out, result) = run("print 1 +;\nvar = 2;\nprint \"ok\";");
    assert_eq!(out, "");
    let errors = result.expect_err("expected syntax errors");
    assert_eq!(errors.len(), 2);
    assert!(errors.iter().all(|e| e.phase() == Phase::Static));
}

#[test]
fn test_lexer_errors() {
    let (_, result) = run("print \"unterminated;");
    assert_eq!(
        kinds(&result.expect_err("expected a lexer error")),
        vec![ErrorKind::UnterminatedString]
    );

    let (_, result) = run("var a = 1 @ 2;");
    assert_eq!(
        kinds(&result.expect_err("expected a lexer error")),
        vec![ErrorKind::UnexpectedCharacter('@')]
    );
}

#[test]
fn test_runtime_error_does_not_stop_later_statements() {
    let (out, result) = run("print \"a\"; print -\"b\"; print \"c\";");
    assert_eq!(out, "a\nc\n");
    assert_eq!(
        kinds(&result.expect_err("expected a runtime error")),
        vec![ErrorKind::OperandMustBeNumber]
    );
}

#[test]
fn test_undefined_variable() {
    let (_, result) = run("print missing;");
    assert_eq!(
        kinds(&result.expect_err("expected a runtime error")),
        vec![ErrorKind::UndefinedVariable("missing".to_string())]
    );

    let (_, result) = run("missing = 1;");
    assert_eq!(
        kinds(&result.expect_err("expected a runtime error")),
        vec![ErrorKind::UndefinedVariable("missing".to_string())]
    );
}

#[test]
fn test_static_misuse() {
    let cases = [
        ("return 1;", ErrorKind::ReturnOutsideFunction),
        ("print this;", ErrorKind::ThisOutsideClass),
        ("super.foo();", ErrorKind::SuperOutsideClass),
        ("class A { f() { super.f(); } }", ErrorKind::SuperWithoutSuperclass),
        ("class A < A {}", ErrorKind::InheritFromSelf),
        ("class A { init() { return 1; } }", ErrorKind::ReturnFromInitializer),
        ("break;", ErrorKind::BreakOutsideLoop),
        ("fun f(a, a) {}", ErrorKind::AlreadyDeclared("a".to_string())),
    ];
    for (source, expected) in cases {
        let (_, result) = run(source);
        let errors = result.expect_err(source);
        assert_eq!(kinds(&errors), vec![expected], "{source}");
    }
}

#[test]
fn test_unbounded_recursion_reports_stack_overflow() {
    let (out, result) = run("fun f() { f(); } f(); print \"after\";");

    assert_eq!(out, "after\n");
    assert_eq!(
        kinds(&result.expect_err("expected a stack overflow")),
        vec![ErrorKind::StackOverflow]
    );
}

#[test]
fn test_recursion_through_nested_blocks_reports_stack_overflow() {
    let blocks = 30;
    let source = format!(
        "fun f() {{ {}f();{} }} f();",
        "{ ".repeat(blocks),
        " }".repeat(blocks)
    );
    let (_, result) = run(&source);
    assert_eq!(
        kinds(&result.expect_err("expected a stack overflow")),
        vec![ErrorKind::StackOverflow]
    );
}

#[test]
fn test_deep_expressions_inside_calls_run_to_completion() {
    let source = r#"
        fun f(n) {
            if (n > 0) return 1 + (1 + (1 + (1 + (1 + (1 + (1 + (1 + f(n - 1))))))));
            return 0;
        }
        print f(200);
    "#;
    let (out, result) = run(source);
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(out, "1600\n");
}

#[test]
fn test_deeply_nested_parentheses() {
    let depth = 2_000;
    let source = format!("print {}1{};", "(".repeat(depth), ")".repeat(depth));
    let (out, result) = run(&source);
    assert!(result.is_ok(), "{result:?}");
    assert_eq!(out, "1\n");
}

#[test]
fn test_arity_checks_extra_arguments() {
    let (out, result) = run("fun f(a, b) { return a + b; }\nprint f(1, 2);\nf(1, 2, 3);");
    assert_eq!(out, "3\n");
    assert_eq!(
        kinds(&result.expect_err("expected an arity error")),
        vec![ErrorKind::WrongArity { expected: 2, got: 3 }]
    );
}
