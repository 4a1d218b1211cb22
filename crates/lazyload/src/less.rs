//! LESS compiler collaborator.

/// A LESS compiler rejected its input.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct CompileError {
    pub message: String,
}

impl CompileError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Turns LESS source into plain stylesheet text.
pub trait LessCompiler: Send + Sync {
    fn compile(&self, source: &str) -> Result<String, CompileError>;
}

impl<F> LessCompiler for F
where
    F: Fn(&str) -> Result<String, CompileError> + Send + Sync,
{
    fn compile(&self, source: &str) -> Result<String, CompileError> {
        self(source)
    }
}
