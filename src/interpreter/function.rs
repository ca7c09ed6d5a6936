use std::fmt;
use std::rc::Rc;

use crate::ast::FunctionDecl;
use crate::interpreter::environment::{EnvRef, Environment};
use crate::interpreter::error::RuntimeError;
use crate::interpreter::value::Value;
use crate::interpreter::{ExecResult, Interpreter};

/// A user function value: the shared declaration, the frame captured at the
/// declaration site, and the initializer flag that forces `init` to yield
/// `this` no matter how its body exits.
#[derive(Clone)]
pub struct FunctionObject {
    declaration: Rc<FunctionDecl>,
    closure: EnvRef,
    is_initializer: bool,
}

impl FunctionObject {
    pub fn new(declaration: Rc<FunctionDecl>, closure: EnvRef, is_initializer: bool) -> Self {
        Self {
            declaration,
            closure,
            is_initializer,
        }
    }

    pub fn name(&self) -> &str {
        &self.declaration.name.lexeme
    }

    pub fn arity(&self) -> usize {
        self.declaration.params.len()
    }

    /// Copy of this function whose captured chain is extended with a frame
    /// binding `this` to the receiver.
    pub fn bind(&self, instance: Value) -> FunctionObject {
        let environment = Environment::enclosed(Rc::clone(&self.closure));
        environment
            .borrow_mut()
            .define("this".to_string(), instance);
        FunctionObject {
            declaration: Rc::clone(&self.declaration),
            closure: environment,
            is_initializer: self.is_initializer,
        }
    }

    pub fn call(
        &self,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let environment = Environment::enclosed(Rc::clone(&self.closure));
        for (param, argument) in self.declaration.params.iter().zip(arguments) {
            environment
                .borrow_mut()
                .define(param.lexeme.clone(), argument);
        }

        let result = interpreter.execute_block(&self.declaration.body, environment)?;

        if self.is_initializer {
            return Ok(Environment::get_at(&self.closure, 0, "this"));
        }
        match result {
            ExecResult::Return(value) => Ok(value),
            ExecResult::Continue => Ok(Value::Nil),
        }
    }
}

impl fmt::Debug for FunctionObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "FunctionObject(<fn {}>)", self.name())
    }
}
