//! Passthrough LESS compiler for the command line.
//!
//! [`PassthroughLess`] returns plain CSS unchanged. Sources containing
//! variable definitions, guarded mixins or mixin calls are rejected with the
//! line of the first offending construct.

use lazyload::{CompileError, LessCompiler};
use regex::Regex;
use std::sync::LazyLock;

static VARIABLE_DEFINITION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*@[\w-]+\s*:").unwrap());

static GUARD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\bwhen\s*\(").unwrap());

static MIXIN_CALL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^\s*\.[\w-]+\s*\([^)]*\)\s*;").unwrap());

#[derive(Debug, Clone, Copy, Default)]
pub struct PassthroughLess;

impl LessCompiler for PassthroughLess {
    fn compile(&self, source: &str) -> Result<String, CompileError> {
        let checks: [(&Regex, &str); 3] = [
            (&*VARIABLE_DEFINITION, "variable definitions"),
            (&*GUARD, "guarded mixins"),
            (&*MIXIN_CALL, "mixin calls"),
        ];
        for (pattern, construct) in checks {
            if let Some(m) = pattern.find(source) {
                let start = m.end() - m.as_str().trim_start().len();
                let line = source[..start].matches('\n').count() + 1;
                return Err(CompileError::new(format!(
                    "{construct} are not supported by the passthrough compiler (line {line})"
                )));
            }
        }
        Ok(source.to_string())
    }
}
