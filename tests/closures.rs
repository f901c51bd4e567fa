use pretty_assertions::assert_eq;

fn output(source: &str) -> String {
    let mut out = Vec::new();
    lox_tw::run(source, &mut out).expect("Execution failed");
    String::from_utf8(out).expect("output is not UTF-8")
}

#[test]
fn test_basic_closure() {
    let source = r#"
        var x = "global";
        fun makeClosure() {
            var y = "captured";
            fun inner() {
                return x + " " + y;
            }
            return inner;
        }
        var closure = makeClosure();
        print closure();
    "#;
    assert_eq!(output(source), "global captured\n");
}

#[test]
fn test_counter() {
    let source = r#"
        fun makeCounter() {
            var i = 0;
            fun count() {
                i = i + 1;
                print i;
            }
            return count;
        }
        var counter = makeCounter();
        counter();
        counter();
    "#;
    assert_eq!(output(source), "1\n2\n");
}

#[test]
fn test_counters_are_independent() {
    let source = r#"
        fun makeCounter() {
            var i = 0;
            fun count() {
                i = i + 1;
                return i;
            }
            return count;
        }
        var c1 = makeCounter();
        var c2 = makeCounter();
        c1();
        print c1();
        print c2();
    "#;
    assert_eq!(output(source), "2\n1\n");
}

#[test]
fn test_closures_share_captured_scope() {
    let source = r#"
        var get;
        var set;
        fun make() {
            var value = "initial";
            fun getter() { return value; }
            fun setter(v) { value = v; }
            get = getter;
            set = setter;
        }
        make();
        set("updated");
        print get();
    "#;
    assert_eq!(output(source), "updated\n");
}

#[test]
fn test_closure_binds_at_declaration() {
    // The inner `a` declared later in the block must not change what showA sees.
    let source = r#"
        var a = "global";
        {
            fun showA() {
                print a;
            }
            showA();
            var a = "block";
            showA();
        }
    "#;
    assert_eq!(output(source), "global\nglobal\n");
}

#[test]
fn test_lambda_captures_environment() {
    let source = r#"
        fun adder(n) {
            return fun (x) { return x + n; };
        }
        var add5 = adder(5);
        print add5(10);
    "#;
    assert_eq!(output(source), "15\n");
}

#[test]
fn test_recursion() {
    let source = r#"
        fun fib(n) {
            if (n < 2) return n;
            return fib(n - 1) + fib(n - 2);
        }
        print fib(15);
    "#;
    assert_eq!(output(source), "610\n");
}

#[test]
fn test_closure_over_loop_variable() {
    let source = r#"
        var fns = nil;
        for (var i = 0; i < 3; i = i + 1) {
            var j = i;
            fun show() { print j; }
            if (j == 1) fns = show;
        }
        fns();
    "#;
    assert_eq!(output(source), "1\n");
}

#[test]
fn test_rerun_is_deterministic() {
    let source = r#"
        fun makeCounter() {
            var i = 0;
            fun count() { i = i + 1; return i; }
            return count;
        }
        var c = makeCounter();
        print c() + c() * 10;
    "#;
    let first = output(source);
    assert_eq!(first, "21\n");
    assert_eq!(output(source), first);
}
