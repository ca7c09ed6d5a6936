use thiserror::Error;

use crate::ast::{Expr, ExprId, FunctionDecl, LiteralValue, Stmt};
use crate::diagnostics::Diagnostic;
use crate::lexer::token::{Token, TokenKind, TokenLiteral};
use std::rc::Rc;

/// Unwinding marker for a syntax error. The diagnostic has already been
/// recorded by the time this value exists; callers synchronize and move on.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("{0}")]
pub struct ParseError(Diagnostic);

type ParseResult<T> = Result<T, ParseError>;

/// Recursive-descent parser with one-token lookahead.
///
/// A failed declaration reports, discards tokens up to the next statement
/// boundary, and parsing resumes, so several syntax errors surface per run.
/// The resulting statement list omits failed declarations; any diagnostic at
/// all means the caller must not execute the program.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    next_id: ExprId,
    diagnostics: Vec<Diagnostic>,
}

impl Parser {
    pub fn new(mut tokens: Vec<Token>) -> Self {
        if tokens.is_empty() {
            tokens.push(Token::new(TokenKind::Eof, String::new(), None, 1));
        }
        Self {
            tokens,
            pos: 0,
            next_id: 0,
            diagnostics: Vec::new(),
        }
    }

    pub fn parse_program(mut self) -> (Vec<Stmt>, Vec<Diagnostic>) {
        let mut statements = Vec::new();
        while !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        (statements, self.diagnostics)
    }

    fn declaration(&mut self) -> Option<Stmt> {
        let result = if self.match_kind(TokenKind::Var) {
            self.var_declaration()
        } else if self.match_kind(TokenKind::Fun) {
            self.function("function").map(Stmt::Function)
        } else if self.match_kind(TokenKind::Class) {
            self.class_declaration()
        } else {
            self.statement()
        };

        match result {
            Ok(statement) => Some(statement),
            Err(_) => {
                self.synchronize();
                None
            }
        }
    }

    fn var_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect variable name.")?;
        let initializer = if self.match_kind(TokenKind::Equal) {
            Some(self.expression()?)
        } else {
            None
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after variable declaration.")?;
        Ok(Stmt::Var { name, initializer })
    }

    fn function(&mut self, kind: &str) -> ParseResult<Rc<FunctionDecl>> {
        let name = self.consume(TokenKind::Identifier, &format!("Expect {kind} name."))?;
        self.consume(TokenKind::LeftParen, &format!("Expect '(' after {kind} name."))?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if params.len() >= 255 {
                    let token = self.peek().clone();
                    self.report(&token, "Can't have more than 255 parameters.");
                }
                params.push(self.consume(TokenKind::Identifier, "Expect parameter name.")?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        self.consume(TokenKind::RightParen, "Expect ')' after parameters.")?;

        self.consume(TokenKind::LeftBrace, &format!("Expect '{{' before {kind} body."))?;
        let body = self.block()?;
        Ok(Rc::new(FunctionDecl { name, params, body }))
    }

    fn class_declaration(&mut self) -> ParseResult<Stmt> {
        let name = self.consume(TokenKind::Identifier, "Expect class name.")?;

        let superclass = if self.match_kind(TokenKind::Less) {
            let superclass_name = self.consume(TokenKind::Identifier, "Expect superclass name.")?;
            Some(Expr::Variable {
                id: self.next_expr_id(),
                name: superclass_name,
            })
        } else {
            None
        };

        self.consume(TokenKind::LeftBrace, "Expect '{' before class body.")?;
        let mut methods = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            methods.push(self.function("method")?);
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after class body.")?;

        Ok(Stmt::Class {
            name,
            superclass,
            methods,
        })
    }

    fn statement(&mut self) -> ParseResult<Stmt> {
        if self.match_kind(TokenKind::Print) {
            return self.print_statement();
        }
        if self.match_kind(TokenKind::For) {
            return self.for_statement();
        }
        if self.match_kind(TokenKind::While) {
            return self.while_statement();
        }
        if self.match_kind(TokenKind::Return) {
            return self.return_statement();
        }
        if self.match_kind(TokenKind::If) {
            return self.if_statement();
        }
        if self.match_kind(TokenKind::LeftBrace) {
            return Ok(Stmt::Block(self.block()?));
        }
        self.expression_statement()
    }

    fn print_statement(&mut self) -> ParseResult<Stmt> {
        let value = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after value.")?;
        Ok(Stmt::Print(value))
    }

    fn expression_statement(&mut self) -> ParseResult<Stmt> {
        let expr = self.expression()?;
        self.consume(TokenKind::Semicolon, "Expect ';' after expression.")?;
        Ok(Stmt::Expression(expr))
    }

    fn block(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut statements = Vec::new();
        while !self.check(TokenKind::RightBrace) && !self.is_at_end() {
            if let Some(statement) = self.declaration() {
                statements.push(statement);
            }
        }
        self.consume(TokenKind::RightBrace, "Expect '}' after block.")?;
        Ok(statements)
    }

    fn if_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'if'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after if condition.")?;

        let then_branch = Box::new(self.statement()?);
        let else_branch = if self.match_kind(TokenKind::Else) {
            Some(Box::new(self.statement()?))
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
        })
    }

    fn while_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'while'.")?;
        let condition = self.expression()?;
        self.consume(TokenKind::RightParen, "Expect ')' after condition.")?;
        let body = Box::new(self.statement()?);
        Ok(Stmt::While { condition, body })
    }

    /// `for` desugars at parse time into a while loop:
    /// `Block { initializer?, While(condition, Block { body, increment? }) }`,
    /// with a missing condition becoming the literal `true`.
    fn for_statement(&mut self) -> ParseResult<Stmt> {
        self.consume(TokenKind::LeftParen, "Expect '(' after 'for'.")?;

        let initializer = if self.match_kind(TokenKind::Semicolon) {
            None
        } else if self.match_kind(TokenKind::Var) {
            Some(self.var_declaration()?)
        } else {
            Some(self.expression_statement()?)
        };

        let condition = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after loop condition.")?;

        let increment = if self.check(TokenKind::RightParen) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::RightParen, "Expect ')' after for clauses.")?;

        let mut body = self.statement()?;
        if let Some(increment) = increment {
            body = Stmt::Block(vec![body, Stmt::Expression(increment)]);
        }
        let condition = condition.unwrap_or(Expr::Literal(LiteralValue::Boolean(true)));
        body = Stmt::While {
            condition,
            body: Box::new(body),
        };
        if let Some(initializer) = initializer {
            body = Stmt::Block(vec![initializer, body]);
        }
        Ok(body)
    }

    fn return_statement(&mut self) -> ParseResult<Stmt> {
        let keyword = self.previous().clone();
        let value = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.expression()?)
        };
        self.consume(TokenKind::Semicolon, "Expect ';' after return value.")?;
        Ok(Stmt::Return { keyword, value })
    }

    fn expression(&mut self) -> ParseResult<Expr> {
        self.assignment()
    }

    fn assignment(&mut self) -> ParseResult<Expr> {
        let expr = self.or()?;

        if self.match_kind(TokenKind::Equal) {
            let equals = self.previous().clone();
            let value = Box::new(self.assignment()?);

            return Ok(match expr {
                Expr::Variable { name, .. } => Expr::Assign {
                    id: self.next_expr_id(),
                    name,
                    value,
                },
                Expr::Get { object, name } => Expr::Set {
                    object,
                    name,
                    value,
                },
                other => {
                    // Not fatal: the left-hand side still stands as an expression.
                    self.report(&equals, "Invalid assignment target.");
                    other
                }
            });
        }

        Ok(expr)
    }

    fn or(&mut self) -> ParseResult<Expr> {
        let mut expr = self.and()?;
        while self.match_kind(TokenKind::Or) {
            let op = self.previous().clone();
            let right = self.and()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn and(&mut self) -> ParseResult<Expr> {
        let mut expr = self.equality()?;
        while self.match_kind(TokenKind::And) {
            let op = self.previous().clone();
            let right = self.equality()?;
            expr = Expr::Logical {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn equality(&mut self) -> ParseResult<Expr> {
        let mut expr = self.comparison()?;
        while self.match_kinds(&[TokenKind::BangEqual, TokenKind::EqualEqual]) {
            let op = self.previous().clone();
            let right = self.comparison()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn comparison(&mut self) -> ParseResult<Expr> {
        let mut expr = self.term()?;
        while self.match_kinds(&[
            TokenKind::Greater,
            TokenKind::GreaterEqual,
            TokenKind::Less,
            TokenKind::LessEqual,
        ]) {
            let op = self.previous().clone();
            let right = self.term()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn term(&mut self) -> ParseResult<Expr> {
        let mut expr = self.factor()?;
        while self.match_kinds(&[TokenKind::Plus, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.factor()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn factor(&mut self) -> ParseResult<Expr> {
        let mut expr = self.unary()?;
        while self.match_kinds(&[TokenKind::Star, TokenKind::Slash]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            expr = Expr::Binary {
                left: Box::new(expr),
                op,
                right: Box::new(right),
            };
        }
        Ok(expr)
    }

    fn unary(&mut self) -> ParseResult<Expr> {
        if self.match_kinds(&[TokenKind::Bang, TokenKind::Minus]) {
            let op = self.previous().clone();
            let right = self.unary()?;
            return Ok(Expr::Unary {
                op,
                right: Box::new(right),
            });
        }
        self.call()
    }

    fn call(&mut self) -> ParseResult<Expr> {
        let mut expr = self.primary()?;
        loop {
            if self.match_kind(TokenKind::LeftParen) {
                expr = self.finish_call(expr)?;
            } else if self.match_kind(TokenKind::Dot) {
                let name = self.consume(TokenKind::Identifier, "Expect property name after '.'.")?;
                expr = Expr::Get {
                    object: Box::new(expr),
                    name,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    fn finish_call(&mut self, callee: Expr) -> ParseResult<Expr> {
        let mut arguments = Vec::new();
        if !self.check(TokenKind::RightParen) {
            loop {
                if arguments.len() >= 255 {
                    let token = self.peek().clone();
                    self.report(&token, "Can't have more than 255 arguments.");
                }
                arguments.push(self.expression()?);
                if !self.match_kind(TokenKind::Comma) {
                    break;
                }
            }
        }
        let paren = self.consume(TokenKind::RightParen, "Expect ')' after arguments.")?;
        Ok(Expr::Call {
            callee: Box::new(callee),
            paren,
            arguments,
        })
    }

    fn primary(&mut self) -> ParseResult<Expr> {
        if self.match_kind(TokenKind::False) {
            return Ok(Expr::Literal(LiteralValue::Boolean(false)));
        }
        if self.match_kind(TokenKind::True) {
            return Ok(Expr::Literal(LiteralValue::Boolean(true)));
        }
        if self.match_kind(TokenKind::Nil) {
            return Ok(Expr::Literal(LiteralValue::Nil));
        }
        if self.match_kind(TokenKind::Number) {
            let value = match self.previous().literal {
                Some(TokenLiteral::Number(value)) => value,
                _ => unreachable!("number token without numeric literal"),
            };
            return Ok(Expr::Literal(LiteralValue::Number(value)));
        }
        if self.match_kind(TokenKind::String) {
            let value = match &self.previous().literal {
                Some(TokenLiteral::Str(value)) => value.clone(),
                _ => unreachable!("string token without string literal"),
            };
            return Ok(Expr::Literal(LiteralValue::Str(value)));
        }
        if self.match_kind(TokenKind::Super) {
            let keyword = self.previous().clone();
            self.consume(TokenKind::Dot, "Expect '.' after 'super'.")?;
            let method =
                self.consume(TokenKind::Identifier, "Expect superclass method name.")?;
            return Ok(Expr::Super {
                id: self.next_expr_id(),
                keyword,
                method,
            });
        }
        if self.match_kind(TokenKind::This) {
            return Ok(Expr::This {
                id: self.next_expr_id(),
                keyword: self.previous().clone(),
            });
        }
        if self.match_kind(TokenKind::Identifier) {
            return Ok(Expr::Variable {
                id: self.next_expr_id(),
                name: self.previous().clone(),
            });
        }
        if self.match_kind(TokenKind::LeftParen) {
            let expr = self.expression()?;
            self.consume(TokenKind::RightParen, "Expect ')' after expression.")?;
            return Ok(Expr::Grouping(Box::new(expr)));
        }

        let token = self.peek().clone();
        Err(self.error(&token, "Expect expression."))
    }

    /// Discard tokens until just past a `;` or to a token that begins a
    /// statement, so one syntax error does not cascade into spurious ones.
    fn synchronize(&mut self) {
        self.advance();
        while !self.is_at_end() {
            if self.previous().kind == TokenKind::Semicolon {
                return;
            }
            if matches!(
                self.peek().kind,
                TokenKind::Class
                    | TokenKind::Fun
                    | TokenKind::Var
                    | TokenKind::For
                    | TokenKind::If
                    | TokenKind::While
                    | TokenKind::Print
                    | TokenKind::Return
            ) {
                return;
            }
            self.advance();
        }
    }

    fn match_kind(&mut self, kind: TokenKind) -> bool {
        if self.check(kind) {
            self.advance();
            return true;
        }
        false
    }

    fn match_kinds(&mut self, kinds: &[TokenKind]) -> bool {
        kinds.iter().any(|&kind| self.match_kind(kind))
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek().kind == kind
    }

    fn consume(&mut self, kind: TokenKind, message: &str) -> ParseResult<Token> {
        if self.check(kind) {
            return Ok(self.advance().clone());
        }
        let token = self.peek().clone();
        Err(self.error(&token, message))
    }

    fn advance(&mut self) -> &Token {
        if !self.is_at_end() {
            self.pos += 1;
        }
        self.previous()
    }

    fn is_at_end(&self) -> bool {
        self.peek().kind == TokenKind::Eof
    }

    fn peek(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn previous(&self) -> &Token {
        &self.tokens[self.pos - 1]
    }

    /// Non-fatal report: records the diagnostic without unwinding.
    fn report(&mut self, token: &Token, message: &str) {
        self.diagnostics.push(Diagnostic::at_token(token, message));
    }

    fn error(&mut self, token: &Token, message: &str) -> ParseError {
        let diagnostic = Diagnostic::at_token(token, message);
        self.diagnostics.push(diagnostic.clone());
        ParseError(diagnostic)
    }

    fn next_expr_id(&mut self) -> ExprId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }
}

pub fn parse_tokens(tokens: Vec<Token>) -> (Vec<Stmt>, Vec<Diagnostic>) {
    Parser::new(tokens).parse_program()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer;
    use crate::printer::AstPrinter;

    fn parse_source(source: &str) -> (Vec<Stmt>, Vec<Diagnostic>) {
        let (tokens, scan_diagnostics) = lexer::tokenize(source);
        assert!(scan_diagnostics.is_empty(), "scan errors: {scan_diagnostics:?}");
        parse_tokens(tokens)
    }

    fn printed(source: &str) -> String {
        let (statements, diagnostics) = parse_source(source);
        assert!(diagnostics.is_empty(), "parse errors: {diagnostics:?}");
        AstPrinter::new().print(&statements)
    }

    #[test]
    fn parses_arithmetic_with_precedence() {
        assert_eq!(printed("1 + 2 * 3;"), "(+ 1.0 (* 2.0 3.0))");
        assert_eq!(printed("(1 + 2) * 3;"), "(* (group (+ 1.0 2.0)) 3.0)");
        assert_eq!(printed("-1 - 2;"), "(- (- 1.0) 2.0)");
    }

    #[test]
    fn comparison_binds_tighter_than_equality() {
        assert_eq!(printed("1 < 2 == true;"), "(== (< 1.0 2.0) true)");
    }

    #[test]
    fn logical_operators_nest_or_over_and() {
        assert_eq!(printed("a or b and c;"), "(or a (and b c))");
    }

    #[test]
    fn parses_variable_declaration() {
        assert_eq!(printed("var x = 1;"), "(var x 1.0)");
        assert_eq!(printed("var x;"), "(var x)");
    }

    #[test]
    fn parses_function_declaration() {
        assert_eq!(
            printed("fun add(a, b) { print a + b; }"),
            "(fun add (a b) (block (print (+ a b))))"
        );
    }

    #[test]
    fn parses_if_while_and_return() {
        assert_eq!(printed("if (a) print 1; else print 2;"), "(if a (print 1.0) (print 2.0))");
        assert_eq!(printed("while (a) print 1;"), "(while a (print 1.0))");
        assert_eq!(printed("fun f() { return 1; }"), "(fun f () (block (return 1.0)))");
    }

    #[test]
    fn desugars_for_into_while() {
        assert_eq!(
            printed("for (var i = 0; i < 3; i = i + 1) print i;"),
            "(block (var i 0.0) (while (< i 3.0) (block (print i) (assign i (+ i 1.0)))))"
        );
    }

    #[test]
    fn for_without_clauses_loops_on_literal_true() {
        assert_eq!(printed("for (;;) print 1;"), "(while true (print 1.0))");
    }

    #[test]
    fn rewrites_assignment_targets() {
        let (statements, diagnostics) = parse_source("a = 1; a.b = 2;");
        assert!(diagnostics.is_empty());
        assert!(matches!(
            &statements[0],
            Stmt::Expression(Expr::Assign { .. })
        ));
        assert!(matches!(&statements[1], Stmt::Expression(Expr::Set { .. })));
    }

    #[test]
    fn reports_invalid_assignment_target() {
        let (_, diagnostics) = parse_source("1 = 2;");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message(), "Invalid assignment target.");
    }

    #[test]
    fn parses_call_and_property_chains() {
        assert_eq!(printed("f(1)(2);"), "f(1.0)(2.0)");
        assert_eq!(printed("a.b.c;"), "(get (get a b) c)");
        assert_eq!(printed("super.f(1);"), "(super f)(1.0)");
    }

    #[test]
    fn recovers_at_statement_boundary_after_error() {
        let (statements, diagnostics) = parse_source("var = 1; print 2;");
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message(), "Expect variable name.");
        // The statement after the bad declaration still parses.
        assert_eq!(statements.len(), 1);
        assert!(matches!(&statements[0], Stmt::Print(_)));
    }

    #[test]
    fn reports_each_error_once_per_statement() {
        let (_, diagnostics) = parse_source("var = 1; var = 2;");
        assert_eq!(diagnostics.len(), 2);
    }

    #[test]
    fn reports_unexpected_eof_at_end() {
        let (_, diagnostics) = parse_source("(1 + ");
        assert!(!diagnostics.is_empty());
        assert!(diagnostics[0].to_string().contains(" at end"));
    }

    #[test]
    fn distinct_expression_nodes_get_distinct_ids() {
        let (statements, _) = parse_source("a + a;");
        let Stmt::Expression(Expr::Binary { left, right, .. }) = &statements[0] else {
            panic!("expected binary expression statement");
        };
        let (Expr::Variable { id: left_id, .. }, Expr::Variable { id: right_id, .. }) =
            (left.as_ref(), right.as_ref())
        else {
            panic!("expected variable operands");
        };
        assert_ne!(left_id, right_id);
    }
}
