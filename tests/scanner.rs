#[cfg(test)]
mod scanner_tests {
    use rox::diagnostics::Diagnostics;
    use rox::scanner::*;
    use rox::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenType, &str)]) {
        let scanner = Scanner::new(source);
        let tokens: Vec<_> = scanner.filter_map(Result::ok).collect();

        assert_eq!(tokens.len(), expected.len());

        for (actual, (expected_type, expected_lexeme)) in tokens.iter().zip(expected.iter()) {
            assert_eq!(actual.token_type, *expected_type);
            assert_eq!(actual.lexeme, *expected_lexeme);
        }
    }

    fn single(source: &str) -> Token {
        let mut tokens: Vec<Token> = Scanner::new(source).filter_map(Result::ok).collect();
        assert_eq!(tokens.len(), 2, "expected one token plus EOF in {:?}", source);
        tokens.remove(0)
    }

    #[test]
    fn test_scanner_01_symbols() {
        assert_token_sequence(
            "({*.,+*})[]:",
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
                (TokenType::LEFT_BRACKET, "["),
                (TokenType::RIGHT_BRACKET, "]"),
                (TokenType::COLON, ":"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_02_operators() {
        assert_token_sequence(
            "! != = == < <= > >= / && ||",
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
                (TokenType::AND, "&&"),
                (TokenType::OR, "||"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_scanner_03_keywords_and_identifiers() {
        assert_token_sequence(
            "class fun var orchid and or _x1",
            &[
                (TokenType::CLASS, "class"),
                (TokenType::FUN, "fun"),
                (TokenType::VAR, "var"),
                (TokenType::IDENTIFIER, "orchid"),
                (TokenType::AND, "and"),
                (TokenType::OR, "or"),
                (TokenType::IDENTIFIER, "_x1"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_unexpected_chars_token_sequence() {
        let results: Vec<_> = Scanner::new(",.$(#").collect();

        assert_eq!(results.len(), 6);
        assert_eq!(results[0].as_ref().unwrap().token_type, TokenType::COMMA);
        assert_eq!(results[1].as_ref().unwrap().token_type, TokenType::DOT);
        assert_eq!(
            results[2].as_ref().unwrap_err().to_string(),
            "[line 1:3] Error: Unexpected character: $"
        );
        assert_eq!(results[3].as_ref().unwrap().token_type, TokenType::LEFT_PAREN);
        assert_eq!(
            results[4].as_ref().unwrap_err().to_string(),
            "[line 1:5] Error: Unexpected character: #"
        );
        assert_eq!(results[5].as_ref().unwrap().token_type, TokenType::EOF);
    }

    #[test]
    fn test_unexpected_multibyte_character() {
        let results: Vec<_> = Scanner::new("é").collect();
        assert_eq!(
            results[0].as_ref().unwrap_err().to_string(),
            "[line 1:1] Error: Unexpected character: é"
        );
        assert_eq!(results[1].as_ref().unwrap().token_type, TokenType::EOF);
    }

    #[test]
    fn test_lone_ampersand_is_an_error() {
        let results: Vec<_> = Scanner::new("a & b").collect();
        assert_eq!(results.len(), 4);
        assert!(results[1].is_err());
    }

    #[test]
    fn test_string_escapes() {
        let token = single(r#""a\tb\n\"c\" \x41é""#);
        assert_eq!(token.token_type, TokenType::STRING(String::new()));
        assert_eq!(token.literal(), Some(Literal::Str("a\tb\n\"c\" Aé")));
        assert_eq!(token.lexeme, r#""a\tb\n\"c\" \x41é""#);
    }

    #[test]
    fn test_single_quoted_string() {
        let token = single("'it\\'s'");
        assert_eq!(token.literal(), Some(Literal::Str("it's")));
    }

    #[test]
    fn test_unknown_escape_keeps_character() {
        let token = single(r#""\q""#);
        assert_eq!(token.literal(), Some(Literal::Str("q")));
    }

    #[test]
    fn test_invalid_hex_escape() {
        let results: Vec<_> = Scanner::new(r#""\xZZ" 1"#).collect();
        assert_eq!(
            results[0].as_ref().unwrap_err().to_string(),
            "[line 1:1] Error: Invalid escape sequence."
        );
        assert_eq!(results[1].as_ref().unwrap().token_type, TokenType::NUMBER(0.0));
    }

    #[test]
    fn test_unterminated_string() {
        let results: Vec<_> = Scanner::new("print \"oops").collect();
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().unwrap().token_type, TokenType::PRINT);
        assert_eq!(
            results[1].as_ref().unwrap_err().to_string(),
            "[line 1:7] Error: Unterminated string."
        );
        assert_eq!(results[2].as_ref().unwrap().token_type, TokenType::EOF);
    }

    #[test]
    fn test_multiline_string_advances_line() {
        let tokens: Vec<Token> = Scanner::new("\"a\nb\" x").filter_map(Result::ok).collect();
        assert_eq!(tokens[0].line, 1);
        assert_eq!(tokens[1].lexeme, "x");
        assert_eq!(tokens[1].line, 2);
    }

    #[test]
    fn test_numbers() {
        let cases: [(&str, f64); 6] = [
            ("42", 42.0),
            ("3.14", 3.14),
            ("1e3", 1000.0),
            ("2.5E-2", 0.025),
            ("0xFF", 255.0),
            ("0x10", 16.0),
        ];

        for (source, expected) in cases {
            assert_eq!(single(source).literal(), Some(Literal::Number(expected)), "{}", source);
        }
    }

    #[test]
    fn test_trailing_dot_is_not_fraction() {
        assert_token_sequence(
            "1.foo",
            &[
                (TokenType::NUMBER(0.0), "1"),
                (TokenType::DOT, "."),
                (TokenType::IDENTIFIER, "foo"),
                (TokenType::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_malformed_numbers() {
        let results: Vec<_> = Scanner::new("1e").collect();
        assert_eq!(
            results[0].as_ref().unwrap_err().to_string(),
            "[line 1:1] Error: Invalid number: expected digit after exponent."
        );

        let results: Vec<_> = Scanner::new("0xg").collect();
        assert_eq!(
            results[0].as_ref().unwrap_err().to_string(),
            "[line 1:1] Error: Invalid hexadecimal number."
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        let tokens: Vec<Token> = Scanner::new("a // line comment\n/* block\n comment */ b")
            .filter_map(Result::ok)
            .collect();

        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].lexeme, "a");
        assert_eq!(tokens[1].lexeme, "b");
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn test_unterminated_block_comment() {
        let results: Vec<_> = Scanner::new("x /* never closed").collect();
        assert_eq!(results.len(), 3);
        assert_eq!(
            results[1].as_ref().unwrap_err().to_string(),
            "[line 1:3] Error: Unterminated block comment."
        );
    }

    #[test]
    fn test_columns() {
        let tokens: Vec<Token> = Scanner::new("var  x\n  = 1;").filter_map(Result::ok).collect();
        assert_eq!((tokens[0].line, tokens[0].column), (1, 1));
        assert_eq!((tokens[1].line, tokens[1].column), (1, 6));
        assert_eq!((tokens[2].line, tokens[2].column), (2, 3));
        assert_eq!((tokens[3].line, tokens[3].column), (2, 5));
    }

    #[test]
    fn test_columns_count_characters_not_bytes() {
        let tokens: Vec<Token> = Scanner::new("\"héllo\" x\n'ü' y").filter_map(Result::ok).collect();
        assert_eq!((tokens[1].line, tokens[1].column), (1, 9));
        assert_eq!((tokens[3].line, tokens[3].column), (2, 5));
        assert_eq!(tokens[4].column, 6);

        let results: Vec<_> = Scanner::new("é $").collect();
        assert_eq!(
            results[1].as_ref().unwrap_err().to_string(),
            "[line 1:3] Error: Unexpected character: $"
        );
    }

    #[test]
    fn test_exactly_one_eof_and_fused() {
        let mut scanner = Scanner::new("");
        assert_eq!(scanner.next().unwrap().unwrap().token_type, TokenType::EOF);
        assert!(scanner.next().is_none());
        assert!(scanner.next().is_none());
    }

    #[test]
    fn test_lexemes_round_trip() {
        let source = "var greeting = \"hi\";\nfun f(a, b) { return a <= b and !(a == 0x1F); }\nprint f(1.5, 2) || [1, 2][0];";

        let lexemes: String = Scanner::new(source)
            .filter_map(Result::ok)
            .map(|t| t.lexeme)
            .collect();

        let significant: String = source.split_whitespace().collect();
        assert_eq!(lexemes, significant);
    }

    #[test]
    fn test_token_display() {
        assert_eq!(single("\"hi\"").to_string(), "STRING \"hi\" hi");
        assert_eq!(single("42").to_string(), "NUMBER 42 42.0");
        assert_eq!(single("2.5").to_string(), "NUMBER 2.5 2.5");
        assert_eq!(single("and").to_string(), "AND and null");
    }

    #[test]
    fn test_tokenize_collects_errors_and_keeps_going() {
        let mut diagnostics = Diagnostics::new();
        let tokens = tokenize("1 @ 2 ~ 3", &mut diagnostics);

        assert_eq!(diagnostics.len(), 2);
        assert!(diagnostics.had_static_error());
        assert_eq!(tokens.len(), 4);
        assert_eq!(tokens.last().unwrap().token_type, TokenType::EOF);
    }
}
