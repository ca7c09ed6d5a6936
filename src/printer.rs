use crate::ast::{Expr, FunctionDecl, LiteralValue, Stmt};

/// Renders statements as prefix-notation S-expressions for parse mode.
pub struct AstPrinter;

impl AstPrinter {
    pub fn new() -> Self {
        Self
    }

    pub fn print(&self, statements: &[Stmt]) -> String {
        statements
            .iter()
            .map(|statement| self.print_stmt(statement))
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn print_stmt(&self, statement: &Stmt) -> String {
        match statement {
            Stmt::Expression(expr) => self.print_expr(expr),
            Stmt::Print(expr) => format!("(print {})", self.print_expr(expr)),
            Stmt::Var { name, initializer } => match initializer {
                Some(initializer) => {
                    format!("(var {} {})", name.lexeme, self.print_expr(initializer))
                }
                None => format!("(var {})", name.lexeme),
            },
            Stmt::Block(statements) => {
                let mut rendered = String::from("(block");
                for statement in statements {
                    rendered.push(' ');
                    rendered.push_str(&self.print_stmt(statement));
                }
                rendered.push(')');
                rendered
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => match else_branch {
                Some(else_branch) => format!(
                    "(if {} {} {})",
                    self.print_expr(condition),
                    self.print_stmt(then_branch),
                    self.print_stmt(else_branch)
                ),
                None => format!(
                    "(if {} {})",
                    self.print_expr(condition),
                    self.print_stmt(then_branch)
                ),
            },
            Stmt::While { condition, body } => format!(
                "(while {} {})",
                self.print_expr(condition),
                self.print_stmt(body)
            ),
            Stmt::Function(declaration) => self.print_function(declaration),
            Stmt::Return { value, .. } => match value {
                Some(value) => format!("(return {})", self.print_expr(value)),
                None => "(return)".to_string(),
            },
            Stmt::Class {
                name,
                superclass,
                methods,
            } => {
                let mut rendered = format!("(class {}", name.lexeme);
                if let Some(Expr::Variable {
                    name: superclass_name,
                    ..
                }) = superclass
                {
                    rendered.push_str(" < ");
                    rendered.push_str(&superclass_name.lexeme);
                }
                for method in methods {
                    rendered.push(' ');
                    rendered.push_str(&self.print_function(method));
                }
                rendered.push(')');
                rendered
            }
        }
    }

    fn print_function(&self, declaration: &FunctionDecl) -> String {
        let params = declaration
            .params
            .iter()
            .map(|param| param.lexeme.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        let body = self.print_stmt(&Stmt::Block(declaration.body.clone()));
        format!("(fun {} ({params}) {body})", declaration.name.lexeme)
    }

    fn print_expr(&self, expr: &Expr) -> String {
        match expr {
            Expr::Literal(literal) => match literal {
                LiteralValue::Nil => "nil".to_string(),
                LiteralValue::Boolean(value) => value.to_string(),
                // Numbers always show a fractional part in parse mode.
                LiteralValue::Number(value) => format!("{value:?}"),
                LiteralValue::Str(value) => value.clone(),
            },
            Expr::Grouping(inner) => format!("(group {})", self.print_expr(inner)),
            Expr::Unary { op, right } => format!("({} {})", op.lexeme, self.print_expr(right)),
            Expr::Binary { left, op, right } | Expr::Logical { left, op, right } => format!(
                "({} {} {})",
                op.lexeme,
                self.print_expr(left),
                self.print_expr(right)
            ),
            Expr::Variable { name, .. } => name.lexeme.clone(),
            Expr::Assign { name, value, .. } => {
                format!("(assign {} {})", name.lexeme, self.print_expr(value))
            }
            Expr::Call {
                callee, arguments, ..
            } => {
                let rendered = arguments
                    .iter()
                    .map(|argument| self.print_expr(argument))
                    .collect::<Vec<_>>()
                    .join(", ");
                format!("{}({rendered})", self.print_expr(callee))
            }
            Expr::Get { object, name } => {
                format!("(get {} {})", self.print_expr(object), name.lexeme)
            }
            Expr::Set {
                object,
                name,
                value,
            } => format!(
                "(set {} {} {})",
                self.print_expr(object),
                name.lexeme,
                self.print_expr(value)
            ),
            Expr::This { .. } => "this".to_string(),
            Expr::Super { method, .. } => format!("(super {})", method.lexeme),
        }
    }
}

impl Default for AstPrinter {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{lexer, parser};

    fn printed(source: &str) -> String {
        let (tokens, _) = lexer::tokenize(source);
        let (statements, diagnostics) = parser::parse_tokens(tokens);
        assert!(diagnostics.is_empty(), "parse errors: {diagnostics:?}");
        AstPrinter::new().print(&statements)
    }

    #[test]
    fn prints_literals_in_canonical_form() {
        assert_eq!(printed("1;"), "1.0");
        assert_eq!(printed("0.5;"), "0.5");
        assert_eq!(printed("true;"), "true");
        assert_eq!(printed("nil;"), "nil");
        assert_eq!(printed("\"str\";"), "str");
    }

    #[test]
    fn prints_one_top_level_form_per_line() {
        assert_eq!(printed("print 1; print 2;"), "(print 1.0)\n(print 2.0)");
    }

    #[test]
    fn prints_nested_blocks() {
        assert_eq!(
            printed("{ var a = 1; { print a; } }"),
            "(block (var a 1.0) (block (print a)))"
        );
    }

    #[test]
    fn prints_unary_and_grouping() {
        assert_eq!(printed("!(-1 < 2);"), "(! (group (< (- 1.0) 2.0)))");
    }

    #[test]
    fn prints_class_declaration() {
        assert_eq!(
            printed("class B < A { f() { return; } }"),
            "(class B < A (fun f () (block (return))))"
        );
    }
}
