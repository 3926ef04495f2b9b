//! Tinct compiler front end
//!
//! Source text goes through the [`Lexer`] (characters to tokens), the
//! [`Parser`] (tokens to a node tree) and the code generator (tree to a
//! runtime [`Program`](tinct_runtime::Program) of opcodes plus operand
//! feed). The driver then hands the program to the VM.
//!
//! ```
//! use tinct_compiler::compile;
//! use tinct_runtime::{SymbolMap, Value, Vm};
//!
//! let program = compile("2 ** 5").unwrap();
//! let mut vm = Vm::new();
//! let mut env = SymbolMap::new();
//! vm.load(program);
//! vm.run(&mut env).unwrap();
//! assert_eq!(vm.peek_value(), Some(&Value::Number(32)));
//! ```

pub mod ast;
pub mod codegen;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod token;

pub use ast::{Node, NodeTree};
pub use error::CompileError;
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenKind};

use tinct_runtime::Program;

/// Compile source text to a runnable program.
pub fn compile(source: &str) -> Result<Program, CompileError> {
    let tree = Parser::new(source)?.parse()?;
    codegen::generate(&tree)
}
