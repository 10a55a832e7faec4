#[cfg(test)]
mod resolver_tests {
    use demon_interpreter as demon;

    use demon::ast::{ExprId, Stmt};
    use demon::error::Diagnostics;
    use demon::interpreter::Interpreter;
    use demon::parser::Parser;
    use demon::resolver::Resolver;
    use demon::scanner::scan_tokens;

    /// Parses `source` (which must be syntactically valid) and returns the
    /// statements with the number of node ids handed out.
    fn parse(source: &str) -> (Vec<Stmt>, usize) {
        let (tokens, errors) = scan_tokens(source);
        assert!(errors.is_empty(), "lex errors: {:?}", errors);

        let mut diagnostics = Diagnostics::new();
        let mut parser = Parser::new(tokens);
        let statements = parser.parse(&mut diagnostics);
        assert!(
            !diagnostics.has_errors(),
            "parse errors: {:?}",
            diagnostics.messages()
        );

        (statements, parser.next_id())
    }

    fn resolve_errors(source: &str) -> Vec<String> {
        let (statements, _) = parse(source);
        let mut interpreter = Interpreter::new();
        let mut diagnostics = Diagnostics::new();

        let ok = Resolver::new(&mut interpreter).resolve(&statements, &mut diagnostics);
        assert_eq!(ok, !diagnostics.has_errors());

        diagnostics.messages()
    }

    fn depths(source: &str) -> Vec<Option<usize>> {
        let (statements, ids) = parse(source);
        let mut interpreter = Interpreter::new();
        let mut diagnostics = Diagnostics::new();

        assert!(Resolver::new(&mut interpreter).resolve(&statements, &mut diagnostics));

        (0..ids)
            .map(|i| interpreter.resolved_depth(ExprId(i)))
            .collect()
    }

    #[test]
    fn test_local_distances() {
        // Only reference: `a` inside the inner block, one scope up.
        assert_eq!(depths("{ let a = 1; { print(a); } }"), vec![Some(1)]);

        // Parameters and body share one scope.
        assert_eq!(depths("func f(x) { return x; }"), vec![Some(0)]);

        // Top-level names are globals.
        assert_eq!(depths("let a = 1; print(a);"), vec![None]);
    }

    #[test]
    fn test_method_distances() {
        // ids: A (superclass), this, super
        let source = "class A {} class B < A { m() { this; super.m; } }";
        assert_eq!(depths(source), vec![None, Some(1), Some(2)]);
    }

    #[test]
    fn test_for_loop_scopes() {
        // ids: i (cond), i (assignment target, replaced), i (incr rhs),
        // the assignment, i (body)
        let source = "for (let i = 0; i < 3; i = i + 1) { print(i); }";
        assert_eq!(
            depths(source),
            vec![Some(0), None, Some(0), Some(0), Some(1)]
        );

        // ids: xs, x
        let source = "let xs = []; for (let x in xs) print(x);";
        assert_eq!(depths(source), vec![None, Some(0)]);
    }

    #[test]
    fn test_resolution_is_idempotent() {
        let source = "
            let g = 1;
            func outer(a) {
                let b = a + g;
                func inner() { return a + b; }
                return inner;
            }
            class P { m() { return this; } }
            class C < P { m() { return super.m(); } }
        ";

        let (statements, ids) = parse(source);
        let mut interpreter = Interpreter::new();
        let mut diagnostics = Diagnostics::new();

        assert!(Resolver::new(&mut interpreter).resolve(&statements, &mut diagnostics));
        let first: Vec<Option<usize>> = (0..ids)
            .map(|i| interpreter.resolved_depth(ExprId(i)))
            .collect();

        assert!(Resolver::new(&mut interpreter).resolve(&statements, &mut diagnostics));
        let second: Vec<Option<usize>> = (0..ids)
            .map(|i| interpreter.resolved_depth(ExprId(i)))
            .collect();

        assert_eq!(first, second);
        assert!(first.iter().any(Option::is_some));
    }

    #[test]
    fn test_return_rules() {
        assert_eq!(
            resolve_errors("return 1;"),
            vec!["Can't return from top-level code."]
        );
        assert_eq!(
            resolve_errors("class A { init() { return 1; } }"),
            vec!["Can't return a value from an initializer."]
        );
        assert!(resolve_errors("class A { init() { return; } }").is_empty());
        assert!(resolve_errors("let f = func () { return 1; };").is_empty());
    }

    #[test]
    fn test_break_and_continue_need_a_loop() {
        assert_eq!(
            resolve_errors("break;"),
            vec!["Can't use 'break' outside of a loop."]
        );
        assert_eq!(
            resolve_errors("continue;"),
            vec!["Can't use 'continue' outside of a loop."]
        );
        assert!(resolve_errors("while (true) { if (true) break; }").is_empty());

        // A function body is not inside the loop that encloses its declaration.
        assert_eq!(
            resolve_errors("while (true) { func f() { break; } }"),
            vec!["Can't use 'break' outside of a loop."]
        );
        assert_eq!(
            resolve_errors("for (;;) { let g = func () { continue; }; }"),
            vec!["Can't use 'continue' outside of a loop."]
        );
    }

    #[test]
    fn test_this_and_super_rules() {
        assert_eq!(
            resolve_errors("print(this);"),
            vec!["Can't use 'this' outside of a class."]
        );
        assert_eq!(
            resolve_errors("super.m();"),
            vec!["Can't use 'super' outside of a class."]
        );
        assert_eq!(
            resolve_errors("class A { m() { super.m(); } }"),
            vec!["Can't use 'super' in a class with no superclass."]
        );
        assert_eq!(
            resolve_errors("class A < A {}"),
            vec!["A class can't inherit from itself."]
        );
        assert!(resolve_errors("class A { static make() { return this; } }").is_empty());
    }

    #[test]
    fn test_declaration_rules() {
        assert_eq!(
            resolve_errors("{ let a = 1; let a = 2; }"),
            vec!["Already a variable with this name in this scope."]
        );
        assert_eq!(
            resolve_errors("func f(a, a) {}"),
            vec!["Already a variable with this name in this scope."]
        );
        assert_eq!(
            resolve_errors("{ let a = a; }"),
            vec!["Can't read local variable in its own initializer."]
        );

        // Globals may be redeclared.
        assert!(resolve_errors("let a = 1; let a = 2;").is_empty());
    }

    #[test]
    fn test_errors_do_not_stop_resolution() {
        assert_eq!(
            resolve_errors("return 1; break; print(this);"),
            vec![
                "Can't return from top-level code.",
                "Can't use 'break' outside of a loop.",
                "Can't use 'this' outside of a class."
            ]
        );
    }

    #[test]
    fn test_error_format() {
        let (statements, _) = parse("\n\nbreak;");
        let mut interpreter = Interpreter::new();
        let mut diagnostics = Diagnostics::new();

        Resolver::new(&mut interpreter).resolve(&statements, &mut diagnostics);

        assert_eq!(
            diagnostics.errors[0].to_string(),
            "[line 3] Error at 'break': Can't use 'break' outside of a loop."
        );
    }
}
