use crate::diagnostics::Diagnostic;

pub mod token;

use token::{Token, TokenKind, TokenLiteral};

/// Lexical scanner over raw source text.
///
/// `start`/`current` are byte cursors into `source`; `line` advances on every
/// newline, including those inside string literals. Scan errors are recorded
/// and scanning continues, so one pass can surface several bad characters.
pub struct Scanner<'a> {
    source: &'a str,
    start: usize,
    current: usize,
    line: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Scanner<'a> {
    pub fn new(source: &'a str) -> Self {
        Self {
            source,
            start: 0,
            current: 0,
            line: 1,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn scan_tokens(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while !self.is_at_end() {
            self.start = self.current;
            self.scan_token();
        }
        self.tokens
            .push(Token::new(TokenKind::Eof, String::new(), None, self.line));
        (self.tokens, self.diagnostics)
    }

    fn scan_token(&mut self) {
        let c = self.advance();
        match c {
            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            ',' => self.add_token(TokenKind::Comma),
            '.' => self.add_token(TokenKind::Dot),
            '-' => self.add_token(TokenKind::Minus),
            '+' => self.add_token(TokenKind::Plus),
            ';' => self.add_token(TokenKind::Semicolon),
            '*' => self.add_token(TokenKind::Star),
            '!' => {
                let kind = if self.match_char('=') {
                    TokenKind::BangEqual
                } else {
                    TokenKind::Bang
                };
                self.add_token(kind);
            }
            '=' => {
                let kind = if self.match_char('=') {
                    TokenKind::EqualEqual
                } else {
                    TokenKind::Equal
                };
                self.add_token(kind);
            }
            '<' => {
                let kind = if self.match_char('=') {
                    TokenKind::LessEqual
                } else {
                    TokenKind::Less
                };
                self.add_token(kind);
            }
            '>' => {
                let kind = if self.match_char('=') {
                    TokenKind::GreaterEqual
                } else {
                    TokenKind::Greater
                };
                self.add_token(kind);
            }
            '/' => {
                if self.match_char('/') {
                    // Line comment, discarded up to (not including) the newline.
                    while !self.is_at_end() && self.peek() != Some('\n') {
                        self.advance();
                    }
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }
            ' ' | '\r' | '\t' => {}
            '\n' => self.line += 1,
            '"' => self.read_string(),
            c if c.is_ascii_digit() => self.read_number(),
            c if c.is_ascii_alphabetic() || c == '_' => self.read_identifier(),
            _ => {
                self.diagnostics
                    .push(Diagnostic::new(self.line, format!("Unexpected character: {c}")));
            }
        }
    }

    fn read_string(&mut self) {
        while let Some(c) = self.peek() {
            if c == '"' {
                break;
            }
            if c == '\n' {
                self.line += 1;
            }
            self.advance();
        }

        if self.is_at_end() {
            self.diagnostics
                .push(Diagnostic::new(self.line, "Unterminated string."));
            return;
        }

        self.advance(); // closing quote
        let value = self.source[self.start + 1..self.current - 1].to_string();
        self.add_literal_token(TokenKind::String, Some(TokenLiteral::Str(value)));
    }

    fn read_number(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.advance();
        }

        // A dot only belongs to the number when digits follow it.
        if self.peek() == Some('.') && matches!(self.peek_next(), Some(c) if c.is_ascii_digit()) {
            self.advance();
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.advance();
            }
        }

        let value = self.source[self.start..self.current]
            .parse::<f64>()
            .expect("numeric lexeme must parse as f64");
        self.add_literal_token(TokenKind::Number, Some(TokenLiteral::Number(value)));
    }

    fn read_identifier(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_') {
            self.advance();
        }

        let kind = match &self.source[self.start..self.current] {
            "and" => TokenKind::And,
            "class" => TokenKind::Class,
            "else" => TokenKind::Else,
            "false" => TokenKind::False,
            "for" => TokenKind::For,
            "fun" => TokenKind::Fun,
            "if" => TokenKind::If,
            "nil" => TokenKind::Nil,
            "or" => TokenKind::Or,
            "print" => TokenKind::Print,
            "return" => TokenKind::Return,
            "super" => TokenKind::Super,
            "this" => TokenKind::This,
            "true" => TokenKind::True,
            "var" => TokenKind::Var,
            "while" => TokenKind::While,
            _ => TokenKind::Identifier,
        };
        self.add_token(kind);
    }

    fn add_token(&mut self, kind: TokenKind) {
        self.add_literal_token(kind, None);
    }

    fn add_literal_token(&mut self, kind: TokenKind, literal: Option<TokenLiteral>) {
        let lexeme = self.source[self.start..self.current].to_string();
        self.tokens.push(Token::new(kind, lexeme, literal, self.line));
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current..]
            .chars()
            .next()
            .expect("scan_token called at end of source");
        self.current += c.len_utf8();
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.current += expected.len_utf8();
            return true;
        }
        false
    }

    fn peek(&self) -> Option<char> {
        self.source[self.current..].chars().next()
    }

    fn peek_next(&self) -> Option<char> {
        let mut chars = self.source[self.current..].chars();
        chars.next();
        chars.next()
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    Scanner::new(source).scan_tokens()
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn kinds(source: &str) -> Vec<TokenKind> {
        let (tokens, diagnostics) = tokenize(source);
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        tokens.into_iter().map(|token| token.kind).collect()
    }

    #[test]
    fn scans_simple_program() {
        let input = indoc! {r#"
            var greeting = "hi";
            print greeting;
        "#};
        let expected = vec![
            TokenKind::Var,
            TokenKind::Identifier,
            TokenKind::Equal,
            TokenKind::String,
            TokenKind::Semicolon,
            TokenKind::Print,
            TokenKind::Identifier,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn scans_one_and_two_char_operators() {
        let expected = vec![
            TokenKind::Bang,
            TokenKind::BangEqual,
            TokenKind::Equal,
            TokenKind::EqualEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Slash,
            TokenKind::Eof,
        ];
        assert_eq!(kinds("! != = == < <= > >= /"), expected);
    }

    #[test]
    fn scans_number_literals() {
        let (tokens, diagnostics) = tokenize("42 3.14 1.");
        assert!(diagnostics.is_empty());

        assert_eq!(tokens[0].literal, Some(TokenLiteral::Number(42.0)));
        assert_eq!(tokens[1].literal, Some(TokenLiteral::Number(3.14)));
        // The trailing dot is not part of the number.
        assert_eq!(tokens[2].literal, Some(TokenLiteral::Number(1.0)));
        assert_eq!(tokens[3].kind, TokenKind::Dot);
    }

    #[test]
    fn scans_multi_line_string_and_tracks_lines() {
        let (tokens, diagnostics) = tokenize("\"one\ntwo\"\nident");
        assert!(diagnostics.is_empty());

        assert_eq!(tokens[0].kind, TokenKind::String);
        assert_eq!(tokens[0].literal, Some(TokenLiteral::Str("one\ntwo".to_string())));
        assert_eq!(tokens[1].kind, TokenKind::Identifier);
        assert_eq!(tokens[1].line, 3);
    }

    #[test]
    fn promotes_keywords_but_not_prefixed_identifiers() {
        let (tokens, _) = tokenize("class classy or orchid");
        let scanned = tokens
            .iter()
            .map(|token| (token.kind, token.lexeme.as_str()))
            .collect::<Vec<_>>();
        assert_eq!(
            scanned,
            vec![
                (TokenKind::Class, "class"),
                (TokenKind::Identifier, "classy"),
                (TokenKind::Or, "or"),
                (TokenKind::Identifier, "orchid"),
                (TokenKind::Eof, ""),
            ]
        );
    }

    #[test]
    fn discards_comments_to_end_of_line() {
        let input = indoc! {"
            // nothing to see
            print 1; // trailing
        "};
        let expected = vec![
            TokenKind::Print,
            TokenKind::Number,
            TokenKind::Semicolon,
            TokenKind::Eof,
        ];
        assert_eq!(kinds(input), expected);
    }

    #[test]
    fn reports_unexpected_character_and_continues() {
        let (tokens, diagnostics) = tokenize("var x = @ 1;");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].to_string(),
            "[line 1] Error: Unexpected character: @"
        );
        // The token after the bad character is still scanned.
        assert!(tokens.iter().any(|token| token.kind == TokenKind::Number));
    }

    #[test]
    fn reports_unterminated_string() {
        let (_, diagnostics) = tokenize("var x = \"abc");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message(), "Unterminated string.");
    }

    #[test]
    fn scanning_is_idempotent() {
        let input = indoc! {r#"
            fun add(a, b) { return a + b; }
            print add(1, 2.5) == 3.5;
        "#};
        let (first, _) = tokenize(input);
        let (second, _) = tokenize(input);
        assert_eq!(first, second);
    }
}
