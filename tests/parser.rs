#[cfg(test)]
mod parser_tests {
    use demon_interpreter as demon;

    use demon::ast::Stmt;
    use demon::ast_printer::AstPrinter;
    use demon::error::Diagnostics;
    use demon::parser::Parser;
    use demon::scanner::scan_tokens;

    fn parse(source: &str) -> (Vec<Stmt>, Diagnostics) {
        let (tokens, errors) = scan_tokens(source);
        assert!(errors.is_empty(), "lex errors: {:?}", errors);

        let mut diagnostics = Diagnostics::new();
        let statements = Parser::new(tokens).parse(&mut diagnostics);

        (statements, diagnostics)
    }

    /// Parses `source`, which must be error free, and prints every statement.
    fn print_ast(source: &str) -> Vec<String> {
        let (statements, diagnostics) = parse(source);
        assert!(
            !diagnostics.has_errors(),
            "unexpected errors: {:?}",
            diagnostics.messages()
        );

        statements.iter().map(AstPrinter::print_stmt).collect()
    }

    fn assert_ast(source: &str, expected: &str) {
        assert_eq!(print_ast(source), vec![expected.to_string()]);
    }

    #[test]
    fn test_precedence() {
        assert_ast("print(1 + 2 * 3);", "(print (+ 1.0 (* 2.0 3.0)))");
        assert_ast("(1 + 2) * 3;", "(; (* (group (+ 1.0 2.0)) 3.0))");
        assert_ast("-a % b - c;", "(; (- (% (- a) b) c))");
        assert_ast("a or b and c;", "(; (or a (and b c)))");
        assert_ast("a == b < c;", "(; (== a (< b c)))");
    }

    #[test]
    fn test_assignment_targets() {
        assert_ast("a = b = 1;", "(; (= a (= b 1.0)))");
        assert_ast("obj.field = 3;", "(; (= (. obj field) 3.0))");
        assert_ast("xs[0] = 1;", "(; (= (index xs 0.0) 1.0))");
    }

    #[test]
    fn test_invalid_assignment_target_is_not_fatal() {
        let (statements, diagnostics) = parse("1 = 2; print(3);");

        assert_eq!(diagnostics.messages(), vec!["Invalid assignment target."]);
        assert_eq!(statements.len(), 2);
        assert_eq!(AstPrinter::print_stmt(&statements[0]), "(; 1.0)");
    }

    #[test]
    fn test_pipeline_range_and_calls() {
        assert_ast("x |> f |> g;", "(; (|> (|> x f) g))");
        assert_ast("1..3;", "(; (.. 1.0 3.0))");
        assert_ast("0..<n;", "(; (..< 0.0 n))");
        assert_ast("a.b(1)[2];", "(; (index (call (. a b) 1.0) 2.0))");
    }

    #[test]
    fn test_collection_literals() {
        assert_ast(
            "let m = {\"a\": 1, \"b\": [1, 2]};",
            "(let m (map (\"a\" 1.0) (\"b\" (list 1.0 2.0))))",
        );
        assert_ast("let e = [];", "(let e (list))");
    }

    #[test]
    fn test_loops() {
        assert_ast(
            "for (let x in xs) print(x);",
            "(for-in x xs (print x))",
        );
        assert_ast(
            "for (let i = 0; i < 3; i = i + 1) print(i);",
            "(for (let i 0.0) (< i 3.0) (= i (+ i 1.0)) (print i))",
        );
        assert_ast("for (;;) break;", "(for _ _ _ (break))");
        assert_ast(
            "while (true) { continue; }",
            "(while true {(continue)})",
        );
    }

    #[test]
    fn test_functions_and_lambdas() {
        assert_ast(
            "func add(a: number, b): number { return a + b; }",
            "(func add (a b) {(return (+ a b))})",
        );
        assert_ast(
            "let f = func (x) { return x; };",
            "(let f (lambda (x) {(return x)}))",
        );
        assert_ast("const k = 1;", "(const k 1.0)");
    }

    #[test]
    fn test_classes() {
        assert_ast(
            "class B < A { init() {} static make() {} }",
            "(class B < A init (static make))",
        );
        assert_ast("class B extends A {}", "(class B < A)");
    }

    #[test]
    fn test_try_catch_finally() {
        assert_ast(
            "try { throw \"x\"; } catch (Err e) { print(e); } finally { print(1); }",
            "(try {(throw x)} (catch Err e {(print e)}) (finally {(print 1.0)}))",
        );
        assert_ast("try {} catch (err) {}", "(try {} (catch _ err {}))");
        assert_ast("try {} catch () {}", "(try {} (catch _ e {}))");
    }

    #[test]
    fn test_try_needs_catch_or_finally() {
        let (_, diagnostics) = parse("try { print(1); }");

        assert_eq!(
            diagnostics.messages(),
            vec!["Expect 'catch' or 'finally' after try block."]
        );
    }

    #[test]
    fn test_match_and_do_expressions() {
        assert_ast(
            "match (x) { 1 => { \"a\"; }, default => { \"b\"; } };",
            "(; (match x (=> 1.0 {(; a)}) (default {(; b)})))",
        );
        assert_ast("let v = do { 1; };", "(let v (do {(; 1.0)}))");
    }

    #[test]
    fn test_panic_mode_recovery_reports_each_declaration() {
        let (statements, diagnostics) = parse("let = 1; print(2); let y 3; print(4);");

        assert_eq!(
            diagnostics.messages(),
            vec![
                "Expect variable name.",
                "Expect ';' after variable declaration."
            ]
        );

        let printed: Vec<String> = statements.iter().map(AstPrinter::print_stmt).collect();
        assert_eq!(printed, vec!["(print 2.0)", "(print 4.0)"]);
    }

    #[test]
    fn test_error_location_format() {
        let (_, diagnostics) = parse("print(1");
        assert_eq!(
            diagnostics.errors[0].to_string(),
            "[line 1] Error at end: Expect ')' after arguments."
        );

        let (_, diagnostics) = parse("let x = ;");
        assert_eq!(
            diagnostics.errors[0].to_string(),
            "[line 1] Error at ';': Expect expression."
        );
    }

    #[test]
    fn test_too_many_arguments_is_not_fatal() {
        let args = vec!["0"; 256].join(", ");
        let (statements, diagnostics) = parse(&format!("f({});", args));

        assert_eq!(
            diagnostics.messages(),
            vec!["Can't have more than 255 arguments."]
        );
        assert_eq!(statements.len(), 1);
    }

    #[test]
    fn test_node_ids_are_unique_and_threaded() {
        let (tokens, _) = scan_tokens("a; b = c; this;");
        let mut diagnostics = Diagnostics::new();
        let mut parser = Parser::with_first_id(tokens, 10);
        parser.parse(&mut diagnostics);

        // a, b, c, the assignment, this
        assert_eq!(parser.next_id(), 15);
    }

    #[test]
    fn test_ast_serializes_to_json() {
        let (statements, _) = parse("print(1 + 2);");
        let json = serde_json::to_string(&statements).expect("AST should serialize");

        assert!(json.contains("\"Print\""), "got {}", json);
        assert!(json.contains("\"Binary\""), "got {}", json);
    }
}
