use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::interpreter::Interpreter;
use crate::interpreter::error::RuntimeError;
use crate::interpreter::function::FunctionObject;
use crate::interpreter::value::Value;
use crate::lexer::token::Token;

#[derive(Debug)]
pub struct ClassObject {
    name: String,
    superclass: Option<Rc<ClassObject>>,
    methods: HashMap<String, FunctionObject>,
}

impl ClassObject {
    pub fn new(
        name: String,
        superclass: Option<Rc<ClassObject>>,
        methods: HashMap<String, FunctionObject>,
    ) -> Self {
        Self {
            name,
            superclass,
            methods,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Searches this class, then walks the superclass chain.
    pub fn find_method(&self, name: &str) -> Option<FunctionObject> {
        if let Some(method) = self.methods.get(name) {
            return Some(method.clone());
        }
        self.superclass
            .as_ref()
            .and_then(|superclass| superclass.find_method(name))
    }

    /// A class called as a constructor takes whatever its initializer takes.
    pub fn arity(&self) -> usize {
        self.find_method("init")
            .map(|initializer| initializer.arity())
            .unwrap_or(0)
    }

    pub fn instantiate(
        class: &Rc<ClassObject>,
        interpreter: &mut Interpreter,
        arguments: Vec<Value>,
    ) -> Result<Value, RuntimeError> {
        let instance = Value::Instance(Rc::new(RefCell::new(InstanceObject::new(Rc::clone(
            class,
        )))));
        if let Some(initializer) = class.find_method("init") {
            initializer.bind(instance.clone()).call(interpreter, arguments)?;
        }
        Ok(instance)
    }
}

pub struct InstanceObject {
    class: Rc<ClassObject>,
    fields: HashMap<String, Value>,
}

impl InstanceObject {
    pub fn new(class: Rc<ClassObject>) -> Self {
        Self {
            class,
            fields: HashMap::new(),
        }
    }

    pub fn class_name(&self) -> &str {
        self.class.name()
    }

    /// Fields shadow methods; a method hit produces a fresh function value
    /// bound to this receiver.
    pub fn get(instance: &Rc<RefCell<InstanceObject>>, name: &Token) -> Result<Value, RuntimeError> {
        if let Some(value) = instance.borrow().fields.get(&name.lexeme) {
            return Ok(value.clone());
        }

        let method = instance.borrow().class.find_method(&name.lexeme);
        if let Some(method) = method {
            let bound = method.bind(Value::Instance(Rc::clone(instance)));
            return Ok(Value::Function(Rc::new(bound)));
        }

        Err(RuntimeError::UndefinedProperty {
            name: name.lexeme.clone(),
            line: name.line,
        })
    }

    /// Fields are created on first assignment.
    pub fn set(&mut self, name: &Token, value: Value) {
        self.fields.insert(name.lexeme.clone(), value);
    }
}

impl fmt::Debug for InstanceObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "InstanceObject({} instance)", self.class.name())
    }
}
