//! Compile-time error taxonomy
//!
//! Lex, parse and code-generation errors all carry the source line they
//! were detected on. The driver prints them once and exits non-zero.

use thiserror::Error;
use tinct_runtime::VmError;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum CompileError {
    // Lex errors
    #[error("unexpected character '{ch}' on line {line}")]
    UnexpectedCharacter { ch: char, line: usize },

    #[error("unterminated string literal on line {line}")]
    UnterminatedString { line: usize },

    #[error("unterminated character literal on line {line}")]
    UnterminatedChar { line: usize },

    #[error("empty character literal on line {line}")]
    EmptyChar { line: usize },

    #[error("unterminated multi-line comment on line {line}")]
    UnterminatedComment { line: usize },

    // Parse errors
    #[error("expected {expected} on line {line}")]
    ExpectedToken { expected: &'static str, line: usize },

    #[error("expected an expression on line {line}")]
    ExpectedExpression { line: usize },

    #[error("expected a statement on line {line}")]
    ExpectedStatement { line: usize },

    #[error("expected an assignment on line {line}")]
    ExpectedAssignment { line: usize },

    // Code-generation errors
    #[error("{construct} is not yet supported on line {line}")]
    Unsupported {
        construct: &'static str,
        line: usize,
    },

    // Emission can overflow the fixed instruction store
    #[error(transparent)]
    Vm(#[from] VmError),
}
