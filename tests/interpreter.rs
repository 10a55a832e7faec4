#[cfg(test)]
mod interpreter_tests {
    use std::cell::RefCell;
    use std::io::{self, Write};
    use std::rc::Rc;

    use demon_interpreter as demon;

    use demon::error::Diagnostics;
    use demon::interpreter::RuntimeError;
    use demon::session::{RunStatus, Session};
    use demon::value::{TraceEntry, Value};

    /// In-memory `print` sink shared between the test and the interpreter.
    #[derive(Clone, Default)]
    struct SharedBuf(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.borrow()).into_owned()
        }
    }

    struct Outcome {
        status: RunStatus,
        output: String,
        diagnostics: Diagnostics,
    }

    impl Outcome {
        fn runtime_error(&self) -> &RuntimeError {
            assert_eq!(self.status, RunStatus::RuntimeError, "output: {}", self.output);
            &self.diagnostics.runtime_errors[0]
        }
    }

    fn run(source: &str) -> Outcome {
        let buf = SharedBuf::default();
        let mut session = Session::with_output(Box::new(buf.clone()));
        let mut diagnostics = Diagnostics::new();

        let status = session.run(source, &mut diagnostics);

        Outcome {
            status,
            output: buf.contents(),
            diagnostics,
        }
    }

    /// Runs a program that must succeed and returns what it printed.
    fn output_of(source: &str) -> String {
        let outcome = run(source);
        assert_eq!(
            outcome.status,
            RunStatus::Ok,
            "static: {:?}, runtime: {:?}",
            outcome.diagnostics.messages(),
            outcome
                .diagnostics
                .runtime_errors
                .iter()
                .map(|e| e.message.clone())
                .collect::<Vec<_>>()
        );
        outcome.output
    }

    // ───────────────────────── scoping and closures ─────────────────────────

    #[test]
    fn test_shadowing_uses_static_scope() {
        let source = r#"
            let a = "global";
            {
                func show() { print(a); }
                show();
                let a = "block";
                show();
            }
        "#;

        assert_eq!(output_of(source), "global\nglobal\n");
    }

    #[test]
    fn test_closures_capture_by_reference() {
        let source = r#"
            func make() {
                let count = 0;
                func inc() { count = count + 1; return count; }
                return inc;
            }
            let c = make();
            c();
            c();
            print(c());

            func pair() {
                let n = 0;
                func get() { return n; }
                func set(v) { n = v; }
                return [get, set];
            }
            let p = pair();
            p[1](5);
            print(p[0]());
        "#;

        assert_eq!(output_of(source), "3\n5\n");
    }

    #[test]
    fn test_closure_over_global_sees_updates() {
        let source = r#"
            let x = 10;
            func addX(n) { return n + x; }
            print(addX(5));
            x = 20;
            print(addX(5));
        "#;

        assert_eq!(output_of(source), "15\n25\n");
    }

    #[test]
    fn test_for_each_binds_a_fresh_variable_per_iteration() {
        let source = r#"
            let fs = [];
            for (let i in [1, 2, 3]) {
                fs.append(func () { return i; });
            }
            print(fs[0](), fs[2]());
        "#;

        assert_eq!(output_of(source), "1 3\n");
    }

    #[test]
    fn test_constant_reassignment_is_fatal() {
        let outcome = run("const k = 1; k = 2;");
        assert_eq!(outcome.runtime_error().message, "Cannot reassign constant 'k'.");

        let outcome = run("{ const k = 1; { k = 2; } }");
        assert_eq!(outcome.runtime_error().message, "Cannot reassign constant 'k'.");
    }

    #[test]
    fn test_undefined_variable_is_fatal() {
        let outcome = run("print(1);\nprint(nope);\nprint(3);");

        assert_eq!(outcome.output, "1\n");
        let error = outcome.runtime_error();
        assert_eq!(error.message, "Undefined variable 'nope'.");
        assert_eq!(error.line, 2);
    }

    // ─────────────────────────── classes ────────────────────────────────────

    #[test]
    fn test_super_dispatch() {
        let source = r#"
            class A { method() { return "a"; } }
            class B < A { method() { return super.method() + "b"; } }
            class C < B {}
            print(B().method());
            print(C().method());
        "#;

        assert_eq!(output_of(source), "ab\nab\n");
    }

    #[test]
    fn test_initializer_and_fields() {
        let source = r#"
            class Point {
                init(x, y) { this.x = x; this.y = y; }
                sum() { return this.x + this.y; }
            }
            let p = Point(2, 3);
            print(p.sum());
            print(p.init(10, 20).x);
            print(p);
            print(Point);
        "#;

        assert_eq!(output_of(source), "5\n10\n<Point instance>\n<class Point>\n");
    }

    #[test]
    fn test_bound_methods_remember_their_receiver() {
        let source = r#"
            class Counter {
                init() { this.n = 0; }
                bump() { this.n = this.n + 1; return this.n; }
            }
            let c = Counter();
            let bump = c.bump;
            bump();
            print(bump(), c.n);
        "#;

        assert_eq!(output_of(source), "2 2\n");
    }

    #[test]
    fn test_static_methods() {
        let source = r#"
            class Math { static square(x) { return x * x; } }
            class Sub < Math { static cube(x) { return x * Sub.square(x); } }
            print(Math.square(4), Sub.square(3), Sub.cube(2));

            class K { static me() { return this; } }
            print(K.me());

            class P { static hello() { return "P"; } }
            class Q < P { static hello() { return super.hello() + "Q"; } }
            print(Q.hello());
        "#;

        assert_eq!(output_of(source), "16 9 8\n<class K>\nPQ\n");
    }

    #[test]
    fn test_arity_and_call_faults() {
        let outcome = run("func f(a) {} f(1, 2);");
        assert_eq!(
            outcome.runtime_error().message,
            "Expected 1 arguments but got 2."
        );

        let outcome = run("class A {} A(1);");
        assert_eq!(
            outcome.runtime_error().message,
            "Expected 0 arguments but got 1."
        );

        let outcome = run("let s = \"x\"; s();");
        assert_eq!(
            outcome.runtime_error().message,
            "Can only call functions and classes."
        );

        let outcome = run("let NotClass = 1; class A < NotClass {}");
        assert_eq!(outcome.runtime_error().message, "Superclass must be a class.");
    }

    #[test]
    fn test_undefined_property_is_fatal() {
        let outcome = run("class A {} print(A().missing);");
        assert_eq!(outcome.runtime_error().message, "Undefined property 'missing'.");
    }

    // ───────────────────── exceptions and control flow ──────────────────────

    #[test]
    fn test_try_catch_finally_ordering() {
        let source = r#"
            func f() {
                try {
                    print("try");
                    throw "boom";
                    print("unreached");
                } catch (e) {
                    print("catch " + e);
                } finally {
                    print("finally");
                }
                print("after");
            }
            f();
        "#;

        assert_eq!(output_of(source), "try\ncatch boom\nfinally\nafter\n");
    }

    #[test]
    fn test_finally_runs_on_return_and_can_override_it() {
        let source = r#"
            func g() { try { return 1; } finally { print("cleanup"); } }
            print(g());

            func h() { try { return 1; } finally { return 2; } }
            print(h());
        "#;

        assert_eq!(output_of(source), "cleanup\n1\n2\n");
    }

    #[test]
    fn test_finally_runs_on_break_and_uncaught_throw() {
        let source = r#"
            while (true) {
                try { break; } finally { print("left loop"); }
            }
            try {
                try { throw "inner"; } finally { print("inner finally"); }
            } catch (e) {
                print("outer caught " + e);
            }
        "#;

        assert_eq!(
            output_of(source),
            "left loop\ninner finally\nouter caught inner\n"
        );
    }

    #[test]
    fn test_finally_runs_once_when_catch_throws() {
        let source = r#"
            try {
                try {
                    throw "boom";
                } catch (e) {
                    print(e);
                    throw "again";
                } finally {
                    print("done");
                }
            } catch (x) {
                print("outer " + x);
            }
        "#;

        assert_eq!(output_of(source), "boom\ndone\nouter again\n");
    }

    #[test]
    fn test_typed_catch_follows_class_chain() {
        let source = r#"
            class Error { init(message) { this.message = message; } }
            class ValueError < Error {}
            try {
                throw ValueError("bad");
            } catch (TypeError e) {
                print("wrong handler");
            } catch (Error e) {
                print("caught", type(e), e.message);
            }
        "#;

        assert_eq!(output_of(source), "caught ValueError bad\n");
    }

    #[test]
    fn test_uncaught_exception_reports_kind_and_traceback() {
        let source = "func inner() { throw \"oops\"; }\nfunc outer() { inner(); }\nouter();";
        let outcome = run(source);
        let error = outcome.runtime_error();

        assert_eq!(error.message, "Uncaught Exception: oops");
        assert_eq!(
            error.traceback,
            vec![
                TraceEntry {
                    function: "inner".to_string(),
                    line: 1
                },
                TraceEntry {
                    function: "outer".to_string(),
                    line: 2
                },
                TraceEntry {
                    function: "<script>".to_string(),
                    line: 3
                },
            ]
        );
        assert!(error.to_string().contains("  at outer (line 2)"));
    }

    #[test]
    fn test_uncaught_instance_uses_class_name() {
        let source = r#"
            class Boom { init(message) { this.message = message; } }
            throw Boom("kaput");
        "#;

        assert_eq!(run(source).runtime_error().message, "Uncaught Boom: kaput");
    }

    #[test]
    fn test_faults_are_not_caught() {
        let source = r#"
            try {
                print(undefinedThing);
            } catch (e) {
                print("should not run");
            } finally {
                print("should not run either");
            }
        "#;

        let outcome = run(source);
        assert_eq!(outcome.output, "");
        assert_eq!(
            outcome.runtime_error().message,
            "Undefined variable 'undefinedThing'."
        );
    }

    #[test]
    fn test_break_and_continue() {
        let source = r#"
            for (let i = 0; i < 10; i = i + 1) {
                if (i == 2) continue;
                if (i == 5) break;
                print(i);
            }
            let n = 0;
            while (n < 3) { n = n + 1; if (n == 2) continue; print("w" + n); }
        "#;

        assert_eq!(output_of(source), "0\n1\n3\n4\nw1\nw3\n");
    }

    #[test]
    fn test_return_from_inside_loop_and_do_block() {
        let source = r#"
            func find(xs, target) {
                for (let x in xs) {
                    if (x == target) return "found";
                }
                return "missing";
            }
            print(find([1, 2], 2), find([1, 2], 3));

            func early() {
                let v = do { return "escaped"; };
                return "not here";
            }
            print(early());
        "#;

        assert_eq!(output_of(source), "found missing\nescaped\n");
    }

    // ────────────────────────── operators ───────────────────────────────────

    #[test]
    fn test_arithmetic_and_coercion() {
        let source = r#"
            print(1 + 2 * 3, 7 / 2, -7 % 3, 7 % -3);
            print("n=" + 3, 2.5 + "x", "a" + "b");
            print(1 < 2, 2 <= 1, nil == nil, nil == false, [1, 2] == [1, 2]);
            print(!nil, !0, true and "yes", nil or "fallback");
        "#;

        assert_eq!(
            output_of(source),
            "7 3.5 2 -2\nn=3 2.5x ab\ntrue false true false true\ntrue false yes fallback\n"
        );
    }

    #[test]
    fn test_non_numeric_operands_are_fatal() {
        let outcome = run("print(1 - \"a\");");
        assert_eq!(outcome.runtime_error().message, "Operands must be numbers.");

        let outcome = run("print(true + 1);");
        assert_eq!(
            outcome.runtime_error().message,
            "Operands must be two numbers or two strings."
        );

        let outcome = run("print(-\"a\");");
        assert_eq!(outcome.runtime_error().message, "Operand must be a number.");
    }

    #[test]
    fn test_division_by_zero_is_catchable() {
        let source = r#"
            try { print(1 / 0); } catch (DivisionByZeroError e) { print("caught " + e); }
            try { print(1 % 0); } catch (e) { print("caught " + e); }
        "#;

        assert_eq!(
            output_of(source),
            "caught Division by zero.\ncaught Modulo by zero.\n"
        );

        let outcome = run("print(1 % 0);");
        assert_eq!(
            outcome.runtime_error().message,
            "Uncaught DivisionByZeroError: Modulo by zero."
        );
    }

    // ────────────────────────── collections ─────────────────────────────────

    #[test]
    fn test_subscript_policy() {
        let outcome = run("print([1, 2, 3][5]);");
        assert_eq!(
            outcome.runtime_error().message,
            "Index 5 out of range for length 3."
        );

        assert_eq!(output_of("print({\"a\": 1}[\"b\"]);"), "nil\n");
        assert_eq!(output_of("print(\"abc\"[1]);"), "b\n");

        let outcome = run("print({\"a\": 1}[1]);");
        assert_eq!(outcome.runtime_error().message, "Map keys must be strings.");

        let outcome = run("print(nil[0]);");
        assert_eq!(
            outcome.runtime_error().message,
            "Only lists, strings and maps can be indexed."
        );
    }

    #[test]
    fn test_collections_assignment_and_display() {
        let source = r#"
            let xs = [1, "a", nil];
            xs[2] = true;
            let m = {"k": 1};
            m["z"] = [2];
            m.k = 5;
            print(xs, m, m.k, m.missing);
        "#;

        assert_eq!(
            output_of(source),
            "[1, \"a\", true] {\"k\": 5, \"z\": [2]} 5 nil\n"
        );
    }

    #[test]
    fn test_self_referencing_collections() {
        let source = r#"
            let xs = [1];
            xs.append(xs);
            print(len(xs), xs);
            let m = {"k": 1};
            m["self"] = m;
            print(m);
            let a = [];
            let b = [];
            a.append(b);
            b.append(a);
            print(a, a == b);
            let c = [1];
            c.append(c);
            let d = [2];
            d.append(d);
            print(c == d, xs == xs);
        "#;

        assert_eq!(
            output_of(source),
            "2 [1, [...]]\n{\"k\": 1, \"self\": {...}}\n[[[...]]] true\nfalse true\n"
        );
    }

    #[test]
    fn test_list_methods() {
        let source = r#"
            let xs = [3, 1];
            xs.append(2);
            print(xs, xs.length);
            print(xs.pop(), xs);
            xs.insert(0, 9);
            print(xs);
            print(xs.index(1), xs.count(9));
            xs.remove(9);
            print(xs, xs.pop(0), xs);
        "#;

        assert_eq!(
            output_of(source),
            "[3, 1, 2] 3\n2 [3, 1]\n[9, 3, 1]\n2 1\n[3, 1] 3 [1]\n"
        );
    }

    #[test]
    fn test_string_methods() {
        let source = r#"
            print("  Hi ".trim().upper(), "MiX".lower(), "abc".length);
            print("a,b".split(","), "x y".split(), "hello".replace("l", "L"));
        "#;

        assert_eq!(
            output_of(source),
            "HI mix 3\n[\"a\", \"b\"] [\"x\", \"y\"] heLLo\n"
        );
    }

    #[test]
    fn test_for_each_over_strings_and_maps() {
        let source = r#"
            for (let c in "ab") print(c);
            for (let k in {"b": 2, "a": 1}) print(k);
        "#;

        assert_eq!(output_of(source), "a\nb\na\nb\n");

        let outcome = run("for (let x in 5) print(x);");
        assert_eq!(outcome.runtime_error().message, "Cannot iterate over a number.");
    }

    // ─────────────────────── expression forms ───────────────────────────────

    #[test]
    fn test_ranges() {
        assert_eq!(output_of("print(1..3, 0..<3, 3..1);"), "[1, 2, 3] [0, 1, 2] []\n");

        let outcome = run("print(1..2.5);");
        assert_eq!(outcome.runtime_error().message, "Range bounds must be integers.");

        let outcome = run("let r = 0..1000000000000000000;");
        assert_eq!(outcome.runtime_error().message, "Range too large.");
    }

    #[test]
    fn test_match_expression() {
        let source = r#"
            func name(n) {
                return match (n) {
                    1 => { "one"; },
                    2 => { "two"; },
                    default => { "many"; }
                };
            }
            print(name(1), name(2), name(7));
            print(match ("z") { "a" => { 1; } });
        "#;

        assert_eq!(output_of(source), "one two many\nnil\n");
    }

    #[test]
    fn test_pipeline_and_lambdas() {
        let source = r#"
            func double(x) { return x * 2; }
            let inc = func (x) { return x + 1; };
            print(3 |> double |> inc);
            print(inc, double, clock);
        "#;

        assert_eq!(output_of(source), "7\n<lambda> <fn double> <native fn clock>\n");
    }

    #[test]
    fn test_block_expression_yields_last_expression() {
        let source = r#"
            let v = do { let a = 2; a * 3; };
            let w = do { let unused = 1; };
            print(v, w);
        "#;

        assert_eq!(output_of(source), "6 nil\n");
    }

    #[test]
    fn test_natives() {
        let source = r#"
            class Thing {}
            print(len([1, 2]), len("abc"), len({"a": 1}), str(12) + "!");
            print(type(nil), type(true), type(1), type("s"), type([]), type({}));
            print(type(Thing), type(Thing()), type(len));
            print(clock() > 0);
            print(max(3, 7, 5), min(2), max(-1.5, -2));
        "#;

        assert_eq!(
            output_of(source),
            "2 3 1 12!\nnil boolean number string list map\nclass Thing function\ntrue\n7 2 -1.5\n"
        );

        let outcome = run("print(max());");
        assert_eq!(
            outcome.runtime_error().message,
            "max() expects at least one argument."
        );
    }

    // ─────────────────────────── sessions ───────────────────────────────────

    #[test]
    fn test_static_errors_prevent_execution() {
        let outcome = run("print(\"side effect\");\nbreak;");

        assert_eq!(outcome.status, RunStatus::StaticError);
        assert_eq!(outcome.output, "");
        assert!(!outcome.diagnostics.has_runtime_errors());
        assert_eq!(
            outcome.diagnostics.messages(),
            vec!["Can't use 'break' outside of a loop."]
        );

        let outcome = run("print(1;");
        assert_eq!(outcome.status, RunStatus::StaticError);
        assert_eq!(outcome.output, "");
    }

    #[test]
    fn test_session_keeps_globals_between_runs() {
        let buf = SharedBuf::default();
        let mut session = Session::with_output(Box::new(buf.clone()));
        let mut diagnostics = Diagnostics::new();

        let first = "func mk() { let a = 1; func g() { return a; } return g; } let g = mk();";
        assert_eq!(session.run(first, &mut diagnostics), RunStatus::Ok);

        // A fault in one run does not poison the next.
        assert_eq!(
            session.run("{ let inner = 1; print(nope); }", &mut diagnostics),
            RunStatus::RuntimeError
        );

        assert_eq!(session.run("print(g());", &mut diagnostics), RunStatus::Ok);
        assert_eq!(buf.contents(), "1\n");
    }

    #[test]
    fn test_define_exposes_host_values() {
        let buf = SharedBuf::default();
        let mut session = Session::with_output(Box::new(buf.clone()));
        let mut diagnostics = Diagnostics::new();

        session
            .interpreter()
            .define("answer", Value::Number(42.0), true);

        assert_eq!(session.run("print(answer);", &mut diagnostics), RunStatus::Ok);
        assert_eq!(
            session.run("answer = 1;", &mut diagnostics),
            RunStatus::RuntimeError
        );
        assert_eq!(buf.contents(), "42\n");
        assert_eq!(
            session.interpreter().global("answer"),
            Some(Value::Number(42.0))
        );
    }
}
