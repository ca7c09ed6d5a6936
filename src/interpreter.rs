//! Tree-walking evaluator.
//!
//! Executes resolved statements directly against a chain of environment
//! frames. Variable uses annotated by the resolver read their frame by
//! distance; everything else falls back to dynamic lookup in globals.
//! `return` unwinds as an `ExecResult`, never as an error, so it stays
//! distinguishable from runtime failures.

use std::collections::HashMap;
use std::rc::Rc;

use crate::ast::{Expr, ExprId, FunctionDecl, Stmt};
use crate::builtins::BuiltinFunction;
use crate::lexer::token::{Token, TokenKind};

pub mod class;
pub mod environment;
pub mod error;
pub mod function;
pub mod value;

use class::{ClassObject, InstanceObject};
use environment::{EnvRef, Environment};
use error::RuntimeError;
use function::FunctionObject;
use value::Value;

/// Control-flow marker for statement execution.
pub enum ExecResult {
    Continue,
    Return(Value),
}

pub struct Interpreter {
    globals: EnvRef,
    environment: EnvRef,
    locals: HashMap<ExprId, usize>,
    print_expression_statements: bool,
    output: Vec<String>,
}

impl Interpreter {
    pub fn new(print_expression_statements: bool) -> Self {
        let globals = Environment::new();
        globals
            .borrow_mut()
            .define("clock".to_string(), Value::Builtin(BuiltinFunction::Clock));
        Self {
            environment: Rc::clone(&globals),
            globals,
            locals: HashMap::new(),
            print_expression_statements,
            output: Vec::new(),
        }
    }

    /// Installs the resolver's side-table of binding depths.
    pub fn resolve(&mut self, locals: HashMap<ExprId, usize>) {
        self.locals.extend(locals);
    }

    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<(), RuntimeError> {
        for statement in statements {
            // Evaluate mode prints top-level expression statements only;
            // expression statements inside bodies stay silent.
            if self.print_expression_statements
                && let Stmt::Expression(expr) = statement
            {
                let value = self.evaluate(expr)?;
                self.output.push(value.stringify());
                continue;
            }
            // A top-level `return` was rejected by the resolver; if one ever
            // slips through, treat it as end of program.
            if let ExecResult::Return(_) = self.execute(statement)? {
                break;
            }
        }
        Ok(())
    }

    /// Lines produced by `print` (and expression statements in evaluate
    /// mode), in execution order. Populated even when a later statement
    /// fails, so partial output survives a runtime error.
    pub fn output(&self) -> &[String] {
        &self.output
    }

    fn execute(&mut self, statement: &Stmt) -> Result<ExecResult, RuntimeError> {
        match statement {
            Stmt::Expression(expr) => {
                self.evaluate(expr)?;
                Ok(ExecResult::Continue)
            }
            Stmt::Print(expr) => {
                let value = self.evaluate(expr)?;
                self.output.push(value.stringify());
                Ok(ExecResult::Continue)
            }
            Stmt::Var { name, initializer } => {
                let value = match initializer {
                    Some(initializer) => self.evaluate(initializer)?,
                    None => Value::Nil,
                };
                self.environment
                    .borrow_mut()
                    .define(name.lexeme.clone(), value);
                Ok(ExecResult::Continue)
            }
            Stmt::Block(statements) => {
                let environment = Environment::enclosed(Rc::clone(&self.environment));
                self.execute_block(statements, environment)
            }
            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition)?.is_truthy() {
                    self.execute(then_branch)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch)
                } else {
                    Ok(ExecResult::Continue)
                }
            }
            Stmt::While { condition, body } => {
                while self.evaluate(condition)?.is_truthy() {
                    if let result @ ExecResult::Return(_) = self.execute(body)? {
                        return Ok(result);
                    }
                }
                Ok(ExecResult::Continue)
            }
            Stmt::Function(declaration) => {
                let function = FunctionObject::new(
                    Rc::clone(declaration),
                    Rc::clone(&self.environment),
                    false,
                );
                self.environment
                    .borrow_mut()
                    .define(declaration.name.lexeme.clone(), Value::Function(Rc::new(function)));
                Ok(ExecResult::Continue)
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(value) => self.evaluate(value)?,
                    None => Value::Nil,
                };
                Ok(ExecResult::Return(value))
            }
            Stmt::Class {
                name,
                superclass,
                methods,
            } => self.execute_class(name, superclass.as_ref(), methods),
        }
    }

    /// Runs `statements` inside `environment`, restoring the previous frame
    /// on every exit path, error included.
    pub(crate) fn execute_block(
        &mut self,
        statements: &[Stmt],
        environment: EnvRef,
    ) -> Result<ExecResult, RuntimeError> {
        let previous = std::mem::replace(&mut self.environment, environment);
        let mut result = Ok(ExecResult::Continue);
        for statement in statements {
            match self.execute(statement) {
                Ok(ExecResult::Continue) => {}
                other => {
                    result = other;
                    break;
                }
            }
        }
        self.environment = previous;
        result
    }

    fn execute_class(
        &mut self,
        name: &Token,
        superclass: Option<&Expr>,
        methods: &[Rc<FunctionDecl>],
    ) -> Result<ExecResult, RuntimeError> {
        let superclass_value = match superclass {
            Some(expr) => match self.evaluate(expr)? {
                Value::Class(class) => Some(class),
                _ => {
                    let line = match expr {
                        Expr::Variable {
                            name: superclass_name,
                            ..
                        } => superclass_name.line,
                        _ => name.line,
                    };
                    return Err(RuntimeError::SuperclassMustBeClass { line });
                }
            },
            None => None,
        };

        self.environment
            .borrow_mut()
            .define(name.lexeme.clone(), Value::Nil);

        // Methods capture the frame where `super` is bound, so it must be in
        // place before any of them are constructed.
        let enclosing = Rc::clone(&self.environment);
        if let Some(superclass) = &superclass_value {
            self.environment = Environment::enclosed(Rc::clone(&self.environment));
            self.environment
                .borrow_mut()
                .define("super".to_string(), Value::Class(Rc::clone(superclass)));
        }

        let mut class_methods = HashMap::new();
        for method in methods {
            let is_initializer = method.name.lexeme == "init";
            let function = FunctionObject::new(
                Rc::clone(method),
                Rc::clone(&self.environment),
                is_initializer,
            );
            class_methods.insert(method.name.lexeme.clone(), function);
        }

        let class = ClassObject::new(name.lexeme.clone(), superclass_value, class_methods);

        self.environment = enclosing;
        self.environment
            .borrow_mut()
            .assign(name, Value::Class(Rc::new(class)))?;
        Ok(ExecResult::Continue)
    }

    fn evaluate(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),
            Expr::Grouping(inner) => self.evaluate(inner),
            Expr::Unary { op, right } => {
                let right = self.evaluate(right)?;
                match op.kind {
                    TokenKind::Minus => match right {
                        Value::Number(value) => Ok(Value::Number(-value)),
                        _ => Err(RuntimeError::OperandMustBeNumber { line: op.line }),
                    },
                    TokenKind::Bang => Ok(Value::Boolean(!right.is_truthy())),
                    _ => unreachable!("parser only produces '!' and '-' unary operators"),
                }
            }
            Expr::Binary { left, op, right } => self.eval_binary(left, op, right),
            Expr::Logical { left, op, right } => {
                let left = self.evaluate(left)?;
                let short_circuits = if op.kind == TokenKind::Or {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.evaluate(right)
                }
            }
            Expr::Variable { id, name } => self.look_up_variable(*id, name),
            Expr::Assign { id, name, value } => {
                let value = self.evaluate(value)?;
                match self.locals.get(id) {
                    Some(&distance) => {
                        Environment::assign_at(&self.environment, distance, name, value.clone());
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }
                Ok(value)
            }
            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee = self.evaluate(callee)?;
                let mut evaluated = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    evaluated.push(self.evaluate(argument)?);
                }
                self.call_value(callee, evaluated, paren)
            }
            Expr::Get { object, name } => match self.evaluate(object)? {
                Value::Instance(instance) => InstanceObject::get(&instance, name),
                _ => Err(RuntimeError::OnlyInstancesHaveProperties { line: name.line }),
            },
            Expr::Set {
                object,
                name,
                value,
            } => match self.evaluate(object)? {
                Value::Instance(instance) => {
                    let value = self.evaluate(value)?;
                    instance.borrow_mut().set(name, value.clone());
                    Ok(value)
                }
                _ => Err(RuntimeError::OnlyInstancesHaveFields { line: name.line }),
            },
            Expr::This { id, keyword } => self.look_up_variable(*id, keyword),
            Expr::Super {
                id,
                keyword: _,
                method,
            } => self.eval_super(*id, method),
        }
    }

    fn eval_binary(&mut self, left: &Expr, op: &Token, right: &Expr) -> Result<Value, RuntimeError> {
        let left = self.evaluate(left)?;
        let right = self.evaluate(right)?;
        match op.kind {
            TokenKind::Plus => match (left, right) {
                (Value::Number(left), Value::Number(right)) => Ok(Value::Number(left + right)),
                (Value::Str(left), Value::Str(right)) => Ok(Value::Str(left + &right)),
                _ => Err(RuntimeError::OperandsMustBeNumbersOrStrings { line: op.line }),
            },
            TokenKind::Minus => Self::number_op(left, right, op, |l, r| Value::Number(l - r)),
            TokenKind::Star => Self::number_op(left, right, op, |l, r| Value::Number(l * r)),
            TokenKind::Slash => Self::number_op(left, right, op, |l, r| Value::Number(l / r)),
            TokenKind::Greater => Self::number_op(left, right, op, |l, r| Value::Boolean(l > r)),
            TokenKind::GreaterEqual => {
                Self::number_op(left, right, op, |l, r| Value::Boolean(l >= r))
            }
            TokenKind::Less => Self::number_op(left, right, op, |l, r| Value::Boolean(l < r)),
            TokenKind::LessEqual => Self::number_op(left, right, op, |l, r| Value::Boolean(l <= r)),
            TokenKind::BangEqual => Ok(Value::Boolean(!left.equals(&right))),
            TokenKind::EqualEqual => Ok(Value::Boolean(left.equals(&right))),
            _ => unreachable!("parser only produces arithmetic, comparison, and equality operators"),
        }
    }

    fn number_op(
        left: Value,
        right: Value,
        op: &Token,
        apply: impl Fn(f64, f64) -> Value,
    ) -> Result<Value, RuntimeError> {
        match (left, right) {
            (Value::Number(left), Value::Number(right)) => Ok(apply(left, right)),
            _ => Err(RuntimeError::OperandsMustBeNumbers { line: op.line }),
        }
    }

    fn call_value(
        &mut self,
        callee: Value,
        arguments: Vec<Value>,
        paren: &Token,
    ) -> Result<Value, RuntimeError> {
        let expected = match &callee {
            Value::Function(function) => function.arity(),
            Value::Class(class) => class.arity(),
            Value::Builtin(builtin) => builtin.arity(),
            _ => return Err(RuntimeError::NotCallable { line: paren.line }),
        };
        if arguments.len() != expected {
            return Err(RuntimeError::ArityMismatch {
                expected,
                found: arguments.len(),
                line: paren.line,
            });
        }

        match callee {
            Value::Function(function) => function.call(self, arguments),
            Value::Class(class) => ClassObject::instantiate(&class, self, arguments),
            Value::Builtin(builtin) => Ok(builtin.call()),
            _ => unreachable!("non-callable values rejected above"),
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token) -> Result<Value, RuntimeError> {
        match self.locals.get(&id) {
            Some(&distance) => Ok(Environment::get_at(&self.environment, distance, &name.lexeme)),
            None => self.globals.borrow().get(name),
        }
    }

    /// `super` lives at the resolved distance; the receiver sits one frame
    /// closer, in the scope holding `this`.
    fn eval_super(&mut self, id: ExprId, method: &Token) -> Result<Value, RuntimeError> {
        let distance = *self
            .locals
            .get(&id)
            .expect("'super' use must carry a resolved depth");
        let superclass = match Environment::get_at(&self.environment, distance, "super") {
            Value::Class(class) => class,
            _ => unreachable!("'super' frame always holds the superclass"),
        };
        let instance = Environment::get_at(&self.environment, distance - 1, "this");

        let method_value =
            superclass
                .find_method(&method.lexeme)
                .ok_or_else(|| RuntimeError::UndefinedProperty {
                    name: method.lexeme.clone(),
                    line: method.line,
                })?;
        Ok(Value::Function(Rc::new(method_value.bind(instance))))
    }
}
