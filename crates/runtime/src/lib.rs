//! Tinct execution core
//!
//! Everything the language needs at run time: the tagged value model, the
//! managed object store with mark-and-sweep collection, the bounded operand
//! stack, the register file, the FNV-1a symbol map, the bytecode
//! instruction set, and the interpreter loop that ties them together.
//!
//! The compiler crate produces a [`Program`] (opcode bytes plus an operand
//! feed); a driver loads it into a [`Vm`] and runs it against a
//! [`SymbolMap`] environment:
//!
//! ```
//! use tinct_runtime::{Opcode, Program, SymbolMap, Value, Vm};
//!
//! let mut program = Program::new();
//! program.psh_literal("2").unwrap();
//! program.psh_literal("5").unwrap();
//! program.emit(Opcode::Pow).unwrap();
//! program.emit(Opcode::End).unwrap();
//!
//! let mut vm = Vm::new();
//! let mut env = SymbolMap::new();
//! vm.load(program);
//! vm.run(&mut env).unwrap();
//! assert_eq!(vm.peek_value(), Some(&Value::Number(32)));
//! ```

pub mod error;
pub mod kernel;
pub mod opcode;
pub mod program;
pub mod registers;
pub mod stack;
pub mod store;
pub mod symbol_map;
pub mod value;
pub mod vm;

pub use error::VmError;
pub use opcode::{INSTRUCTION_FILL, Opcode};
pub use program::{INSTRUCTION_STORE_SIZE, Operand, Program};
pub use registers::{REGISTER_COUNT, REGISTER_EMPTY, RS, RegisterFile};
pub use stack::{MAX_STACK_CAPACITY, OperandStack};
pub use store::{GcStats, Handle, INITIAL_STORE_CAPACITY, Object, ObjectStore};
pub use symbol_map::{SymbolMap, fnv1a};
pub use value::{Tag, Value};
pub use vm::{Vm, VmState};
