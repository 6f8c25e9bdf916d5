#[cfg(test)]
mod lexer_tests {
    use pretty_assertions::assert_eq;

    use sprig::error::LexError;
    use sprig::lexer::*;
    use sprig::token::*;

    fn assert_token_sequence(source: &str, expected: &[(TokenKind, &str)]) {
        let tokens = tokenize(source).expect("source should tokenize");

        let actual: Vec<(TokenKind, &str)> = tokens
            .iter()
            .map(|t| (t.kind, t.literal.as_str()))
            .collect();

        assert_eq!(actual, expected);
    }

    #[test]
    fn test_lexer_01_punctuation() {
        assert_token_sequence(
            "({[,.;:]})",
            &[
                (TokenKind::LPAREN, "("),
                (TokenKind::LBRACE, "{"),
                (TokenKind::LBRACKET, "["),
                (TokenKind::COMMA, ","),
                (TokenKind::DOT, "."),
                (TokenKind::SEMICOLON, ";"),
                (TokenKind::COLON, ":"),
                (TokenKind::RBRACKET, "]"),
                (TokenKind::RBRACE, "}"),
                (TokenKind::RPAREN, ")"),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_lexer_02_operators() {
        assert_token_sequence(
            "= == ! != < <= > >= + += - -= * *= / /= // % && ||",
            &[
                (TokenKind::ASSIGN, "="),
                (TokenKind::EQ, "=="),
                (TokenKind::BANG, "!"),
                (TokenKind::NOT_EQ, "!="),
                (TokenKind::LT, "<"),
                (TokenKind::LT_EQ, "<="),
                (TokenKind::GT, ">"),
                (TokenKind::GT_EQ, ">="),
                (TokenKind::PLUS, "+"),
                (TokenKind::PLUS_ASSIGN, "+="),
                (TokenKind::MINUS, "-"),
                (TokenKind::MINUS_ASSIGN, "-="),
                (TokenKind::ASTERISK, "*"),
                (TokenKind::ASTERISK_ASSIGN, "*="),
                (TokenKind::SLASH, "/"),
                (TokenKind::SLASH_ASSIGN, "/="),
                (TokenKind::SLASH_SLASH, "//"),
                (TokenKind::PERCENT, "%"),
                (TokenKind::AND, "&&"),
                (TokenKind::OR, "||"),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_lexer_03_keywords_and_identifiers() {
        assert_token_sequence(
            "let const fn class extends new this super elif foo _bar x1",
            &[
                (TokenKind::LET, "let"),
                (TokenKind::CONST, "const"),
                (TokenKind::FUNCTION, "fn"),
                (TokenKind::CLASS, "class"),
                (TokenKind::EXTENDS, "extends"),
                (TokenKind::NEW, "new"),
                (TokenKind::THIS, "this"),
                (TokenKind::SUPER, "super"),
                (TokenKind::ELIF, "elif"),
                (TokenKind::IDENT, "foo"),
                (TokenKind::IDENT, "_bar"),
                (TokenKind::IDENT, "x1"),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_lexer_04_numbers() {
        assert_token_sequence(
            "42 3.14 .5 5.part",
            &[
                (TokenKind::INT, "42"),
                (TokenKind::FLOAT, "3.14"),
                (TokenKind::FLOAT, ".5"),
                (TokenKind::INT, "5"),
                (TokenKind::DOT, "."),
                (TokenKind::IDENT, "part"),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_lexer_05_strings_translate_escapes() {
        assert_token_sequence(
            r#""a\tb\n" "say \"hi\"" "\q""#,
            &[
                (TokenKind::STRING, "a\tb\n"),
                (TokenKind::STRING, "say \"hi\""),
                (TokenKind::STRING, "q"),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_lexer_06_fstring_keeps_interpolations_verbatim() {
        assert_token_sequence(
            r#"f"sum={a + b} and {h["k"]}""#,
            &[
                (TokenKind::F_STRING, r#"sum={a + b} and {h["k"]}"#),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_lexer_07_comments_are_skipped() {
        let source = "1 # line comment\n/* block /* nested */ still */ 2";

        assert_token_sequence(
            source,
            &[
                (TokenKind::INT, "1"),
                (TokenKind::INT, "2"),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_lexer_08_illegal_characters_become_tokens() {
        assert_token_sequence(
            "a $ & b",
            &[
                (TokenKind::IDENT, "a"),
                (TokenKind::ILLEGAL, "$"),
                (TokenKind::ILLEGAL, "&"),
                (TokenKind::IDENT, "b"),
                (TokenKind::EOF, ""),
            ],
        );
    }

    #[test]
    fn test_lexer_09_positions_are_line_and_column() {
        let tokens = tokenize("let x\n  = 10").expect("source should tokenize");

        let positions: Vec<(usize, usize)> = tokens
            .iter()
            .map(|t| (t.position.line, t.position.column))
            .collect();

        assert_eq!(positions, vec![(1, 1), (1, 5), (2, 3), (2, 5), (2, 7)]);
    }

    #[test]
    fn test_lexer_10_columns_count_characters_not_bytes() {
        let tokens = tokenize("\"é\" x").expect("source should tokenize");

        assert_eq!(tokens[1].kind, TokenKind::IDENT);
        assert_eq!(tokens[1].position, Position::new(1, 5));
    }

    #[test]
    fn test_lexer_11_unterminated_string() {
        let err = tokenize("let s = \"open").unwrap_err();

        assert_eq!(
            err,
            LexError::UnterminatedString {
                position: Position::new(1, 9)
            }
        );
        assert_eq!(err.to_string(), "[line 1, column 9] Error: Unterminated string.");
    }

    #[test]
    fn test_lexer_12_unterminated_fstring_and_stray_brace() {
        assert!(matches!(
            tokenize("f\"{x\""),
            Err(LexError::UnterminatedFString { .. })
        ));

        assert!(matches!(
            tokenize("f\"a } b\""),
            Err(LexError::UnmatchedBrace { .. })
        ));
    }

    #[test]
    fn test_lexer_13_eof_repeats_after_end() {
        let mut lexer = Lexer::new("x");

        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::IDENT);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::EOF);
        assert_eq!(lexer.next_token().unwrap().kind, TokenKind::EOF);
    }

    #[test]
    fn test_lexer_14_iterator_stops_after_first_eof() {
        let results: Vec<_> = Lexer::new("a b").collect();

        assert_eq!(results.len(), 3);
        assert!(results.iter().all(Result::is_ok));
    }

    #[test]
    fn test_lexer_15_reset_rewinds() {
        let mut lexer = Lexer::new("a b");
        let first: Vec<_> = lexer.by_ref().collect();

        lexer.reset();
        let second: Vec<_> = lexer.collect();

        assert_eq!(first, second);
    }

    #[test]
    fn test_lexer_16_token_display_and_json() {
        let tokens = tokenize("let x").expect("source should tokenize");

        assert_eq!(tokens[0].to_string(), "LET let 1:1");

        let json = serde_json::to_value(&tokens[1]).expect("token should serialize");
        assert_eq!(json["kind"], "IDENT");
        assert_eq!(json["literal"], "x");
        assert_eq!(json["position"]["line"], 1);
        assert_eq!(json["position"]["column"], 5);
    }

    #[test]
    fn test_lexer_17_fstring_is_a_single_token() {
        assert_token_sequence(
            "f\"sum={1+2}\"",
            &[(TokenKind::F_STRING, "sum={1+2}"), (TokenKind::EOF, "")],
        );
    }

    #[test]
    fn test_lexer_18_fstring_keeps_escaped_braces() {
        assert_token_sequence(
            r#"f"\{x\} \\ {y}\t""#,
            &[(TokenKind::F_STRING, "\\{x\\} \\\\ {y}\t"), (TokenKind::EOF, "")],
        );
    }

    #[test]
    fn test_lexer_19_unterminated_block_comment_runs_to_end() {
        assert_token_sequence(
            "1 /* a /* b */ 2",
            &[(TokenKind::INT, "1"), (TokenKind::EOF, "")],
        );
    }
}
