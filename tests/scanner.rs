#[cfg(test)]
mod scanner_tests {
    use demon_interpreter as demon;

    use demon::error::DemonError;
    use demon::scanner::*;
    use demon::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(
            tokens.len(),
            expected.len(),
            "token count mismatch: {:?}",
            tokens
        );

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})",
            &[
                (TokenType::LEFT_PAREN, "("),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::STAR, "*"),
                (TokenType::DOT, "."),
                (TokenType::COMMA, ","),
                (TokenType::PLUS, "+"),
                (TokenType::STAR, "*"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_extended_operators() {
        assert_token_sequence(
            "[]:% |> .. ..< => && || != <= >= ==",
            &[
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::COLON, ":"),
                (TokenType::PERCENT, "%"),
                (TokenType::PIPE_GREATER, "|>"),
                (TokenType::DOT_DOT, ".."),
                (TokenType::DOT_DOT_LESS, "..<"),
                (TokenType::FAT_ARROW, "=>"),
                (TokenType::AND, "&&"),
                (TokenType::OR, "||"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "let const func class extends static match default do in try catch finally throw letter",
            &[
                (TokenType::LET, "let"),
                (TokenType::CONST, "const"),
                (TokenType::FUNC, "func"),
                (TokenType::CLASS, "class"),
                (TokenType::EXTENDS, "extends"),
                (TokenType::STATIC, "static"),
                (TokenType::MATCH, "match"),
                (TokenType::DEFAULT, "default"),
                (TokenType::DO, "do"),
                (TokenType::IN, "in"),
                (TokenType::TRY, "try"),
                (TokenType::CATCH, "catch"),
                (TokenType::FINALLY, "finally"),
                (TokenType::THROW, "throw"),
                (TokenType::IDENTIFIER, "letter"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_range_is_not_a_fraction() {
        assert_token_sequence(
            "1..3 0..<2 3.14",
            &[
                (TokenType::NUMBER, "1"),
                (TokenType::DOT_DOT, ".."),
                (TokenType::NUMBER, "3"),
                (TokenType::NUMBER, "0"),
                (TokenType::DOT_DOT_LESS, "..<"),
                (TokenType::NUMBER, "2"),
                (TokenType::NUMBER, "3.14"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_token_display() {
        let (tokens, errors) = scan_tokens("123 \"hi\" x");
        assert!(errors.is_empty());

        let rendered: Vec<String> = tokens.iter().map(|t| t.to_string()).collect();
        assert_eq!(
            rendered,
            vec![
                "NUMBER 123 123.0",
                "STRING \"hi\" hi",
                "IDENTIFIER x null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_string_escapes() {
        let (tokens, errors) = scan_tokens(r#""a\nb\t\"q\"\\""#);
        assert!(errors.is_empty());

        assert_eq!(
            tokens[0].literal,
            Some(Literal::Str("a\nb\t\"q\"\\".to_string()))
        );
    }

    #[test]
    fn test_comments_and_line_numbers() {
        let source = "// line comment\n/* block\ncomment */ x\n\"multi\nline\" y";
        let (tokens, errors) = scan_tokens(source);
        assert!(errors.is_empty());

        let x = &tokens[0];
        assert_eq!(x.lexeme, "x");
        assert_eq!(x.line, 3);

        let y = &tokens[2];
        assert_eq!(y.lexeme, "y");
        assert_eq!(y.line, 5);

        assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::EOF));
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source).collect();

        // COMMA, DOT, error, LEFT_PAREN, error, EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        let error_count = results.iter().filter(|r| r.is_err()).count();
        assert_eq!(error_count, 2, "Expected 2 error messages");

        for err in results.iter().filter_map(|r| r.as_ref().err()) {
            assert!(
                err.to_string().starts_with("[line 1] Error: Unexpected character:"),
                "unexpected error text: {}",
                err
            );
        }

        assert!(matches!(&results[5], Ok(t) if t.token_type == TokenType::EOF));
    }

    #[test]
    fn test_unterminated_string_reports_and_ends() {
        let (tokens, errors) = scan_tokens("print \"oops");

        assert_eq!(errors.len(), 1);
        assert!(matches!(&errors[0], DemonError::Lex { .. }));
        assert_eq!(errors[0].message(), "Unterminated string.");

        assert_eq!(tokens.first().map(|t| t.token_type), Some(TokenType::PRINT));
        assert_eq!(tokens.last().map(|t| t.token_type), Some(TokenType::EOF));
    }

    #[test]
    fn test_unterminated_block_comment() {
        let (_, errors) = scan_tokens("/* never\nclosed");

        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].line(), 2);
        assert_eq!(errors[0].message(), "Unterminated block comment.");
    }

    #[test]
    fn test_exactly_one_eof() {
        let mut scanner = Scanner::new("a");

        assert!(matches!(scanner.next(), Some(Ok(t)) if t.lexeme == "a"));
        assert!(matches!(scanner.next(), Some(Ok(t)) if t.token_type == TokenType::EOF));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
