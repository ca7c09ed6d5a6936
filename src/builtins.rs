use std::time::{SystemTime, UNIX_EPOCH};

use crate::interpreter::value::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BuiltinFunction {
    Clock,
}

impl BuiltinFunction {
    pub fn name(self) -> &'static str {
        match self {
            Self::Clock => "clock",
        }
    }

    pub fn arity(self) -> usize {
        match self {
            Self::Clock => 0,
        }
    }

    pub fn call(self) -> Value {
        match self {
            Self::Clock => {
                let elapsed = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .unwrap_or_default();
                Value::Number(elapsed.as_secs_f64())
            }
        }
    }
}
