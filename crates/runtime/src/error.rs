//! Runtime error taxonomy
//!
//! Every operation handler returns `Result<_, VmError>`; the interpreter
//! loop surfaces the first error, transitions to FAULTED and stops. Errors
//! never unwind the object store; whatever was allocated before the fault
//! stays collectable.

use thiserror::Error;

/// Errors raised by the virtual machine and its components.
///
/// The `op` fields carry the mnemonic (or operator symbol) of the
/// instruction that was executing, so diagnostics read like
/// `stack underflow during ADD operation`.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum VmError {
    // Structural errors
    #[error("stack underflow during {0} operation")]
    StackUnderflow(&'static str),

    #[error("stack overflow during {0} operation")]
    StackOverflow(&'static str),

    #[error("invalid register index {index} during {op} operation")]
    InvalidRegister { op: &'static str, index: u8 },

    #[error("register R{index} is empty during {op} operation")]
    EmptyRegister { op: &'static str, index: u8 },

    #[error("illegal instruction 0x{0:02X}")]
    IllegalInstruction(u8),

    #[error("reserved instruction {0} reached")]
    ReservedInstruction(&'static str),

    #[error("operand feed exhausted during {0} operation")]
    OperandFeedEmpty(&'static str),

    #[error("unexpected operand kind in feed during {0} operation")]
    OperandMismatch(&'static str),

    #[error("stale object reference during {0} operation")]
    StaleHandle(&'static str),

    // Type errors
    #[error("invalid operation ({op}) for value of type \"{type_name}\"")]
    InvalidOperand {
        op: &'static str,
        type_name: &'static str,
    },

    #[error("cannot compare {lhs} with {rhs} during {op} operation")]
    CrossTypeComparison {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },

    #[error("identifier is not a string key during ASN operation")]
    InvalidAssignmentKey,

    // Arithmetic errors
    #[error("division by zero during {0} operation")]
    DivisionByZero(&'static str),

    // Resource errors
    #[error("instruction store is full ({0} bytes)")]
    ProgramTooLarge(usize),

    #[error("object store exhausted")]
    StoreExhausted,
}
