//! Tinct interpreter CLI
//!
//! `tinct FILE` compiles and runs a program file; `tinct` with no file
//! starts the interactive REPL. `--debug` (or the `TINCT_LOG` env filter)
//! enables structured traces on standard error.

mod repl;

use anyhow::Context;
use clap::Parser as ClapParser;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tinct_runtime::{SymbolMap, Vm};
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "tinct")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Tinct interpreter - run .tn programs or an interactive REPL", long_about = None)]
struct Cli {
    /// Program file to execute (omit to start the REPL)
    file: Option<PathBuf>,

    /// Enable debug traces on standard error
    #[arg(short, long)]
    debug: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.debug);

    let result = match &cli.file {
        Some(path) => run_file(path),
        None => repl::run(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            eprintln!("tinct: {error:#}");
            ExitCode::FAILURE
        }
    }
}

/// Install the stderr trace subscriber. `--debug` forces debug level;
/// otherwise `TINCT_LOG` decides (warnings only by default).
fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("TINCT_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Compile and execute one program file.
fn run_file(path: &Path) -> anyhow::Result<()> {
    let source = std::fs::read_to_string(path)
        .with_context(|| format!("error opening {}", path.display()))?;
    let program = tinct_compiler::compile(&source)
        .with_context(|| format!("error compiling {}", path.display()))?;
    tracing::debug!(file = %path.display(), instructions = program.len(), "compiled");

    let mut vm = Vm::new();
    let mut env = SymbolMap::new();
    vm.load(program);
    vm.run(&mut env)
        .with_context(|| format!("error running {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_program(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        file.write_all(contents.as_bytes()).expect("write");
        file
    }

    #[test]
    fn runs_a_program_file() {
        let file = write_program("x = 2 ** 5\ny = \"done\"\n");
        run_file(file.path()).unwrap();
    }

    #[test]
    fn missing_file_is_an_error() {
        let err = run_file(Path::new("no/such/file.tn")).unwrap_err();
        assert!(err.to_string().contains("error opening"));
    }

    #[test]
    fn compile_errors_are_reported_with_the_file_name() {
        let file = write_program("x = \"open\n");
        let err = run_file(file.path()).unwrap_err();
        assert!(err.to_string().contains("error compiling"));
        assert!(format!("{err:#}").contains("unterminated string literal on line 1"));
    }

    #[test]
    fn runtime_faults_are_reported() {
        let file = write_program("1 / 0\n");
        let err = run_file(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("division by zero"));
    }
}
