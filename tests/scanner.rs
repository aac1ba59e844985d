#[cfg(test)]
mod scanner_tests {
    use pretty_assertions::assert_eq;

    use wagago::error::WagagoError;
    use wagago::scanner::*;
    use wagago::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn display_lines(source: &str) -> Vec<String> {
        let (tokens, errors) = Scanner::new(source).scan_all();
        assert!(errors.is_empty(), "unexpected errors: {:?}", errors);
        tokens.iter().map(|t| t.to_string()).collect()
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*}):",
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
                (TokenType::COLON, ":"),
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
            "class Foo : Bar import math fun _x1 orchid",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::IDENTIFIER, "Foo"),
                (TokenType::COLON, ":"),
                (TokenType::IDENTIFIER, "Bar"),
                (TokenType::IMPORT, "import"),
                (TokenType::IDENTIFIER, "math"),
                (TokenType::FUN, "fun"),
                (TokenType::IDENTIFIER, "_x1"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_04_literal_display() {
        assert_eq!(
            display_lines("42 3.14 \"hi there\" nil"),
            vec![
                "NUMBER 42 42.0",
                "NUMBER 3.14 3.14",
                "STRING \"hi there\" hi there",
                "NIL nil null",
                "EOF  null",
            ]
        );
    }

    #[test]
    fn test_scanner_05_number_edges() {
        // No leading or trailing dot on numbers.
        assert_token_sequence(
            ".5 7.",
            &[
                (TokenType::DOT, "."),
                (TokenType::NUMBER(0.0), "5"),
                (TokenType::NUMBER(0.0), "7"),
                (TokenType::DOT, "."),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_06_comments_and_lines() {
        let source = "// line comment\n/* block\n comment */ var\n\"multi\nline\" x";
        let (tokens, errors) = Scanner::new(source).scan_all();

        assert!(errors.is_empty());
        let summary: Vec<(&str, usize)> = tokens
            .iter()
            .map(|t| (t.token_type.name(), t.line))
            .collect();

        assert_eq!(
            summary,
            vec![("VAR", 3), ("STRING", 5), ("IDENTIFIER", 5), ("EOF", 5)]
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let source = ",.$(#";
        let results: Vec<_> = Scanner::new(source).collect();

        // COMMA, DOT, error '$', LEFT_PAREN, error '#', EOF
        assert_eq!(results.len(), 6, "Expected 6 items in result");

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
                "[line 1] Error: Unexpected character: $.",
                "[line 1] Error: Unexpected character: #.",
            ]
        );

        fn assert_token_matches(
            result: &Result<Token, WagagoError>,
            expected_type: TokenType,
            expected_lexeme: &str,
        ) {
            match result {
                Ok(token) => {
                    assert_eq!(token.token_type, expected_type);
                    assert_eq!(token.lexeme, expected_lexeme);
                }
                Err(e) => panic!("Expected token but got error: {}", e),
            }
        }
    }

    #[test]
    fn test_multibyte_unexpected_character_is_skipped_whole() {
        let (tokens, errors) = Scanner::new("é+").scan_all();

        assert_eq!(errors.len(), 1);
        assert_eq!(
            errors[0].to_string(),
            "[line 1] Error: Unexpected character: é."
        );
        assert_eq!(tokens.len(), 2);
        assert_eq!(tokens[0].token_type, TokenType::PLUS);
    }

    #[test]
    fn test_unterminated_string_and_comment() {
        let (tokens, errors) = Scanner::new("\"abc\n").scan_all();
        assert_eq!(
            errors,
            vec![WagagoError::Lex {
                message: "Unterminated string.".to_string(),
                line: 2,
            }]
        );
        assert_eq!(tokens.len(), 1);
        assert_eq!(tokens[0].token_type, TokenType::EOF);

        let (_, errors) = Scanner::new("/* never\nclosed").scan_all();
        assert_eq!(
            errors,
            vec![WagagoError::Lex {
                message: "Unterminated block comment.".to_string(),
                line: 2,
            }]
        );
    }

    #[test]
    fn test_exactly_one_eof() {
        let mut scanner = Scanner::new("   ");
        assert!(matches!(
            scanner.next(),
            Some(Ok(Token {
                token_type: TokenType::EOF,
                ..
            }))
        ));
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }
}
