//! Interactive read-eval-print loop
//!
//! Each line is compiled and run as its own program against one shared VM
//! and environment, so variable bindings accumulate across lines. After
//! every evaluation the top of stack (if any) is printed, the stack is
//! cleared and a collection cycle runs; bindings survive as environment
//! globals, evaluation temporaries do not.

use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use tinct_runtime::{SymbolMap, Vm};

const PROMPT: &str = "tinct> ";

pub fn run() -> anyhow::Result<()> {
    println!("Tinct v{}", env!("CARGO_PKG_VERSION"));
    println!("Press Ctrl-D to exit.");

    let mut editor = DefaultEditor::new()?;
    let mut vm = Vm::new();
    let mut env = SymbolMap::new();

    loop {
        match editor.readline(PROMPT) {
            Ok(line) => {
                if line.trim().is_empty() {
                    continue;
                }
                editor.add_history_entry(&line)?;
                eval_line(&mut vm, &mut env, &line);
            }
            Err(ReadlineError::Interrupted) => continue,
            Err(ReadlineError::Eof) => return Ok(()),
            Err(error) => return Err(error.into()),
        }
    }
}

/// Compile and run one line; diagnostics go to stderr and the loop keeps
/// going.
fn eval_line(vm: &mut Vm, env: &mut SymbolMap<tinct_runtime::Handle>, line: &str) {
    let program = match tinct_compiler::compile(line) {
        Ok(program) => program,
        Err(error) => {
            eprintln!("error: {error}");
            return;
        }
    };

    vm.load(program);
    if let Err(error) = vm.run(env) {
        eprintln!("error: {error}");
    } else if let Some(value) = vm.peek_value() {
        println!("=> {value}");
    }

    // Temporaries die here; environment bindings are globals and survive.
    vm.stack_mut().clear();
    vm.collect();
}
