use thiserror::Error;

/// Typed errors produced during evaluation.
///
/// Each variant carries the source line of the token it was raised at; the
/// driver renders `message` then `[line N]` on stderr and exits 70.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum RuntimeError {
    #[error("Operand must be a number.")]
    OperandMustBeNumber { line: usize },
    #[error("Operands must be numbers.")]
    OperandsMustBeNumbers { line: usize },
    #[error("Operands must be two numbers or two strings.")]
    OperandsMustBeNumbersOrStrings { line: usize },
    #[error("Can only call functions and classes.")]
    NotCallable { line: usize },
    #[error("Expected {expected} arguments but got {found}.")]
    ArityMismatch {
        expected: usize,
        found: usize,
        line: usize,
    },
    #[error("Only instances have properties.")]
    OnlyInstancesHaveProperties { line: usize },
    #[error("Only instances have fields.")]
    OnlyInstancesHaveFields { line: usize },
    #[error("Undefined property '{name}'.")]
    UndefinedProperty { name: String, line: usize },
    #[error("Undefined variable '{name}'.")]
    UndefinedVariable { name: String, line: usize },
    #[error("Superclass must be a class.")]
    SuperclassMustBeClass { line: usize },
}

impl RuntimeError {
    pub fn line(&self) -> usize {
        match self {
            Self::OperandMustBeNumber { line }
            | Self::OperandsMustBeNumbers { line }
            | Self::OperandsMustBeNumbersOrStrings { line }
            | Self::NotCallable { line }
            | Self::ArityMismatch { line, .. }
            | Self::OnlyInstancesHaveProperties { line }
            | Self::OnlyInstancesHaveFields { line }
            | Self::UndefinedProperty { line, .. }
            | Self::UndefinedVariable { line, .. }
            | Self::SuperclassMustBeClass { line } => *line,
        }
    }
}
