#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;

    use rlox::error::{Diagnostics, LoxError, Result};
    use rlox::scanner::*;
    use rlox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(|r| r.ok()).collect();

        assert_eq!(tokens.len(), expected.len());

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
    fn test_scanner_02_two_char_operators() {
        assert_token_sequence(
            "! != = == < <= > >= /",
            &[
                (TokenType::BANG, "!"),
                (TokenType::BANG_EQUAL, "!="),
                (TokenType::EQUAL, "="),
                (TokenType::EQUAL_EQUAL, "=="),
                (TokenType::LESS, "<"),
                (TokenType::LESS_EQUAL, "<="),
                (TokenType::GREATER, ">"),
                (TokenType::GREATER_EQUAL, ">="),
                (TokenType::SLASH, "/"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "class Foo < Bar { init() { this.x = super.y; } } fortune",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "Foo"),
                (TokenType::LESS, "<"),
                (TokenType::IDENTIFIER, "Bar"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::IDENTIFIER, "init"),
                (TokenType::LEFT_PAREN, "("),
                (TokenType::RIGHT_PAREN, ")"),
                (TokenType::LEFT_BRACE, "{"),
                (TokenType::THIS, "this"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "x"),
                (TokenType::EQUAL, "="),
                (TokenType::SUPER, "super"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "y"),
                (TokenType::SEMICOLON, ";"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::RIGHT_BRACE, "}"),
                (TokenType::IDENTIFIER, "fortune"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_literals() {
        let tokens: Vec<Token> = Scanner::new("\"hi there\" 42 3.14 7.")
            .collect::<Result<Vec<_>>>()
            .expect("valid input");

        assert_eq!(tokens[0].token_type, TokenType::STRING(String::new()));
        assert_eq!(tokens[0].lexeme, "\"hi there\"");
        assert_eq!(tokens[0].to_string(), "STRING \"hi there\" hi there");

        assert_eq!(tokens[1].to_string(), "NUMBER 42 42.0");
        assert_eq!(tokens[2].to_string(), "NUMBER 3.14 3.14");

        // A trailing dot is not part of the number.
        assert_eq!(tokens[3].to_string(), "NUMBER 7 7.0");
        assert_eq!(tokens[4].token_type, TokenType::DOT);
        assert_eq!(tokens[5].to_string(), "EOF  null");
    }

    #[test]
    fn test_scanner_05_comments_and_lines() {
        let tokens: Vec<Token> = Scanner::new("// nothing here\nvar a; // trailing\n\n\"multi\nline\" a")
            .collect::<Result<Vec<_>>>()
            .expect("valid input");

        let lines: Vec<usize> = tokens.iter().map(|t| t.line).collect();

        // var a ; on line 2, the string ends on line 5, then `a` and EOF.
        assert_eq!(lines, vec![2, 2, 2, 5, 5, 5]);
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let scanner = Scanner::new(source);

        // Collect all results (both tokens and errors)
        let results: Vec<_> = scanner.collect();

        // We expect this sequence:
        // 0: COMMA ','
        // 1: DOT '.'
        // 2: Error for '$'
        // 3: LEFT_PAREN '('
        // 4: Error for '#'
        // 5: EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

        // Check valid tokens
        assert_token_matches(&results[0], TokenType::COMMA, ",");
        assert_token_matches(&results[1], TokenType::DOT, ".");
        assert_token_matches(&results[3], TokenType::LEFT_PAREN, "(");
        assert_token_matches(&results[5], TokenType::EOF, "");

        let errors: Vec<String> = results
            .iter()
            .filter_map(|r| r.as_ref().err())
            .map(|e| e.to_string())
            .collect();

        assert_eq!(
            errors,
            vec![
                "[line 1] Error: Unexpected character: $".to_string(),
                "[line 1] Error: Unexpected character: #".to_string(),
            ]
        );

        // Helper function
        fn assert_token_matches(
            result: &std::result::Result<Token, LoxError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(
                        token.token_type, expected_type,
                        "Expected token type {:?}, got {:?}",
                        expected_type, token.token_type
                    );
                    assert_eq!(
                        token.lexeme, expected_lexeme,
                        "Expected lexeme '{}', got '{}'",
                        expected_lexeme, token.lexeme
                    );
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }

    #[test]
    fn test_unterminated_string_is_reported() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan("print \"oops;\n", &mut diagnostics);

        assert!(diagnostics.had_error());
        assert_eq!(
            diagnostics.to_string(),
            "[line 2] Error: Unterminated string."
        );
        assert_eq!(tokens.last().map(|t| t.token_type.clone()), Some(TokenType::EOF));
    }

    #[test]
    fn test_non_ascii_character_is_one_error() {
        let mut diagnostics = Diagnostics::new();
        let tokens = scan("a é b", &mut diagnostics);

        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics.to_string(),
            "[line 1] Error: Unexpected character: é"
        );
        assert_eq!(tokens.len(), 3);
    }

    #[test]
    fn test_source_must_be_utf8() {
        assert_eq!(rlox::source_text(b"print 1;").ok(), Some("print 1;"));

        let err = rlox::source_text(b"print \"\xff\";").expect_err("invalid UTF-8");
        assert!(matches!(err, LoxError::Utf8(_)));
        assert!(err.to_string().contains("invalid utf-8"), "got: {}", err);
    }

    /// Concatenating the lexemes of every token, skipping whitespace and
    /// comments, rebuilds the meaningful part of the source.
    #[test]
    fn test_lexemes_rebuild_source() {
        let source = "fun add(a, b) { return a + b; } // sum\nprint add(1, 2.5) >= \"x\";";

        let mut diagnostics = Diagnostics::new();
        let rebuilt: String = scan(source, &mut diagnostics)
            .iter()
            .map(|t| t.lexeme)
            .collect();

        let expected: String = source
            .replace("// sum", "")
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect();

        assert!(diagnostics.is_empty());
        assert_eq!(rebuilt, expected);
    }

    #[test]
    fn test_scanner_is_fused() {
        let mut scanner = Scanner::new("");

        assert!(matches!(scanner.next(), Some(Ok(ref t)) if t.token_type == TokenType::EOF));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
