use std::fmt;

use crate::lexer::token::{Token, TokenKind};

/// One compile-time error record from the scanner, parser, or resolver.
///
/// The scanner and parser keep going after reporting, so a single run can
/// carry several of these; any at all means the program must not execute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    line: usize,
    location: String,
    message: String,
}

impl Diagnostic {
    pub fn new(line: usize, message: impl Into<String>) -> Self {
        Self {
            line,
            location: String::new(),
            message: message.into(),
        }
    }

    pub fn at_token(token: &Token, message: impl Into<String>) -> Self {
        let location = if token.kind == TokenKind::Eof {
            " at end".to_string()
        } else {
            format!(" at '{}'", token.lexeme)
        };
        Self {
            line: token.line,
            location,
            message: message.into(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[line {}] Error{}: {}", self.line, self.location, self.message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn renders_bare_line_diagnostic() {
        let diagnostic = Diagnostic::new(3, "Unexpected character: @");
        assert_eq!(
            diagnostic.to_string(),
            "[line 3] Error: Unexpected character: @"
        );
    }

    #[test]
    fn renders_token_location() {
        let token = Token::new(TokenKind::Equal, "=".to_string(), None, 2);
        let diagnostic = Diagnostic::at_token(&token, "Invalid assignment target.");
        assert_eq!(
            diagnostic.to_string(),
            "[line 2] Error at '=': Invalid assignment target."
        );
    }

    #[test]
    fn renders_at_end_for_eof() {
        let token = Token::new(TokenKind::Eof, String::new(), None, 7);
        let diagnostic = Diagnostic::at_token(&token, "Expect expression.");
        assert_eq!(
            diagnostic.to_string(),
            "[line 7] Error at end: Expect expression."
        );
    }
}
