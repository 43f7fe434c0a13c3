use std::fmt;

use super::RuntimeError;
use crate::parser::ParseError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Syntax,
    ModuleLookup,
    TypeMismatch,
    InvalidOperation,
    RuntimePanic,
}

impl ErrorCode {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCode::Syntax => "E001",
            ErrorCode::ModuleLookup => "E002",
            ErrorCode::TypeMismatch => "E003",
            ErrorCode::InvalidOperation => "E004",
            ErrorCode::RuntimePanic => "E005",
        }
    }
}

/// Uniform diagnostic wrapper carrying a stable error code.
#[derive(Debug, Clone)]
pub struct ScriptError {
    pub code: ErrorCode,
    pub message: String,
}

impl ScriptError {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    pub fn code_str(&self) -> &'static str {
        self.code.as_str()
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code.as_str(), self.message)
    }
}

impl std::error::Error for ScriptError {}

impl From<ParseError> for ScriptError {
    fn from(value: ParseError) -> Self {
        ScriptError::new(ErrorCode::Syntax, value.to_string())
    }
}

impl From<RuntimeError> for ScriptError {
    fn from(value: RuntimeError) -> Self {
        ScriptError::new(runtime_error_code(&value), value.to_string())
    }
}

pub fn runtime_error_code(error: &RuntimeError) -> ErrorCode {
    match error {
        RuntimeError::TypeError(_) => ErrorCode::TypeMismatch,
        RuntimeError::ModuleNotFound(_) => ErrorCode::ModuleLookup,
        RuntimeError::ArgumentError(_)
        | RuntimeError::IndexError(_)
        | RuntimeError::DivisionByZero
        | RuntimeError::VariableNotFound(_)
        | RuntimeError::AttributeNotFound { .. } => ErrorCode::InvalidOperation,
        RuntimeError::StackOverflow => ErrorCode::RuntimePanic,
        RuntimeError::Return(_) | RuntimeError::Break | RuntimeError::Continue => {
            ErrorCode::RuntimePanic
        }
    }
}
