//! Operation kernel: one handler per implemented opcode
//!
//! Binary handlers pop the right operand first and the left second (the
//! emitter pushes producers left-to-right), so `2 ** 5` is the program
//! `PSH 2; PSH 5; POW`.
//!
//! Cross-type numeric work goes through a single promotion routine instead
//! of per-tag-pair tables: both operands are widened to the larger of their
//! tags (BYTE < NUMBER < BIGNUM < DECIMAL) and the result keeps that tag.
//! Integer arithmetic wraps in the target tag. Modulo and the bitwise
//! operators truncate DECIMAL operands to BIGNUM and re-wrap the result as
//! DECIMAL; exponentiation computes in binary64 and re-wraps to the widest
//! operand tag.
//!
//! Handlers push newly produced values and leave their operands to the
//! collector; consumed operands are simply no longer rooted by the stack.

use crate::error::VmError;
use crate::program::{Operand, Program};
use crate::registers::{REGISTER_EMPTY, RegisterFile};
use crate::stack::OperandStack;
use crate::store::{Handle, Object, ObjectStore};
use crate::symbol_map::SymbolMap;
use crate::value::Value;
use std::cmp::Ordering;

/// Pop the top of stack and resolve it to a value (cloned out of the store).
fn pop_value(
    stack: &mut OperandStack,
    store: &ObjectStore,
    op: &'static str,
) -> Result<Value, VmError> {
    let handle = stack.pop(op)?;
    let object = store.get(handle).ok_or(VmError::StaleHandle(op))?;
    Ok(object.value.clone())
}

/// Allocate a result value and push its handle.
fn push_new(
    store: &mut ObjectStore,
    stack: &mut OperandStack,
    value: Value,
    op: &'static str,
) -> Result<(), VmError> {
    let handle = store.alloc(Object::new(value))?;
    stack.push(handle, op)
}

/// Both operands of a binary numeric operator, widened to a common tag.
enum NumericPair {
    Byte(u8, u8),
    Number(i32, i32),
    BigNum(i64, i64),
    Decimal(f64, f64),
}

/// Coerce two numeric operands to the widest of their tags.
///
/// Non-numeric operands are type errors naming the offending type.
fn promote(lhs: &Value, rhs: &Value, op: &'static str) -> Result<NumericPair, VmError> {
    for operand in [lhs, rhs] {
        if !operand.is_numeric() {
            return Err(VmError::InvalidOperand {
                op,
                type_name: operand.type_name(),
            });
        }
    }

    fn as_f64(v: &Value) -> f64 {
        match v {
            Value::Byte(b) => f64::from(*b),
            Value::Number(n) => f64::from(*n),
            Value::BigNum(n) => *n as f64,
            Value::Decimal(d) => *d,
            _ => unreachable!("checked numeric"),
        }
    }
    fn as_i64(v: &Value) -> i64 {
        match v {
            Value::Byte(b) => i64::from(*b),
            Value::Number(n) => i64::from(*n),
            Value::BigNum(n) => *n,
            _ => unreachable!("checked integral"),
        }
    }
    fn as_i32(v: &Value) -> i32 {
        match v {
            Value::Byte(b) => i32::from(*b),
            Value::Number(n) => *n,
            _ => unreachable!("checked narrow"),
        }
    }

    let decimal = |v: &Value| matches!(v, Value::Decimal(_));
    let bignum = |v: &Value| matches!(v, Value::BigNum(_));
    let number = |v: &Value| matches!(v, Value::Number(_));

    if decimal(lhs) || decimal(rhs) {
        Ok(NumericPair::Decimal(as_f64(lhs), as_f64(rhs)))
    } else if bignum(lhs) || bignum(rhs) {
        Ok(NumericPair::BigNum(as_i64(lhs), as_i64(rhs)))
    } else if number(lhs) || number(rhs) {
        Ok(NumericPair::Number(as_i32(lhs), as_i32(rhs)))
    } else {
        match (lhs, rhs) {
            (Value::Byte(a), Value::Byte(b)) => Ok(NumericPair::Byte(*a, *b)),
            _ => unreachable!("checked numeric"),
        }
    }
}

// ---------------------------------------------------------------------------
// Arithmetic
// ---------------------------------------------------------------------------

/// ADD: numeric addition, or STRING + STRING concatenation.
pub fn op_add(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let rhs = pop_value(stack, store, "ADD")?;
    let lhs = pop_value(stack, store, "ADD")?;
    let value = match (&lhs, &rhs) {
        (Value::String(a), Value::String(b)) => {
            let mut joined = String::with_capacity(a.len() + b.len());
            joined.push_str(a);
            joined.push_str(b);
            Value::String(joined)
        }
        _ => match promote(&lhs, &rhs, "ADD")? {
            NumericPair::Byte(a, b) => Value::Byte(a.wrapping_add(b)),
            NumericPair::Number(a, b) => Value::Number(a.wrapping_add(b)),
            NumericPair::BigNum(a, b) => Value::BigNum(a.wrapping_add(b)),
            NumericPair::Decimal(a, b) => Value::Decimal(a + b),
        },
    };
    push_new(store, stack, value, "ADD")
}

/// SUB: numeric subtraction.
pub fn op_sub(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let rhs = pop_value(stack, store, "SUB")?;
    let lhs = pop_value(stack, store, "SUB")?;
    let value = match promote(&lhs, &rhs, "SUB")? {
        NumericPair::Byte(a, b) => Value::Byte(a.wrapping_sub(b)),
        NumericPair::Number(a, b) => Value::Number(a.wrapping_sub(b)),
        NumericPair::BigNum(a, b) => Value::BigNum(a.wrapping_sub(b)),
        NumericPair::Decimal(a, b) => Value::Decimal(a - b),
    };
    push_new(store, stack, value, "SUB")
}

/// MUL: numeric multiplication, or string repetition when one side is a
/// STRING and the other a NUMBER.
///
/// Repetition uses the absolute value of the count; a zero or negative
/// count yields the empty string.
pub fn op_mul(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let rhs = pop_value(stack, store, "MUL")?;
    let lhs = pop_value(stack, store, "MUL")?;
    let value = match (&lhs, &rhs) {
        (Value::String(s), Value::Number(n)) | (Value::Number(n), Value::String(s)) => {
            if *n <= 0 {
                Value::String(String::new())
            } else {
                Value::String(s.repeat(n.unsigned_abs() as usize))
            }
        }
        _ => match promote(&lhs, &rhs, "MUL")? {
            NumericPair::Byte(a, b) => Value::Byte(a.wrapping_mul(b)),
            NumericPair::Number(a, b) => Value::Number(a.wrapping_mul(b)),
            NumericPair::BigNum(a, b) => Value::BigNum(a.wrapping_mul(b)),
            NumericPair::Decimal(a, b) => Value::Decimal(a * b),
        },
    };
    push_new(store, stack, value, "MUL")
}

/// DIV: numeric division. Division by zero is an arithmetic error; the
/// operands stay consumed.
pub fn op_div(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let rhs = pop_value(stack, store, "DIV")?;
    let lhs = pop_value(stack, store, "DIV")?;
    let value = match promote(&lhs, &rhs, "DIV")? {
        NumericPair::Byte(_, 0) | NumericPair::Number(_, 0) | NumericPair::BigNum(_, 0) => {
            return Err(VmError::DivisionByZero("DIV"));
        }
        NumericPair::Decimal(_, d) if d == 0.0 => {
            return Err(VmError::DivisionByZero("DIV"));
        }
        NumericPair::Byte(a, b) => Value::Byte(a / b),
        NumericPair::Number(a, b) => Value::Number(a.wrapping_div(b)),
        NumericPair::BigNum(a, b) => Value::BigNum(a.wrapping_div(b)),
        NumericPair::Decimal(a, b) => Value::Decimal(a / b),
    };
    push_new(store, stack, value, "DIV")
}

/// MOD: remainder. DECIMAL operands are truncated to BIGNUM first and the
/// result re-wrapped as DECIMAL.
pub fn op_mod(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let rhs = pop_value(stack, store, "MOD")?;
    let lhs = pop_value(stack, store, "MOD")?;
    let value = match promote(&lhs, &rhs, "MOD")? {
        NumericPair::Byte(_, 0) | NumericPair::Number(_, 0) | NumericPair::BigNum(_, 0) => {
            return Err(VmError::DivisionByZero("MOD"));
        }
        NumericPair::Byte(a, b) => Value::Byte(a % b),
        NumericPair::Number(a, b) => Value::Number(a.wrapping_rem(b)),
        NumericPair::BigNum(a, b) => Value::BigNum(a.wrapping_rem(b)),
        NumericPair::Decimal(a, b) => {
            let divisor = b as i64;
            if divisor == 0 {
                return Err(VmError::DivisionByZero("MOD"));
            }
            Value::Decimal(((a as i64).wrapping_rem(divisor)) as f64)
        }
    };
    push_new(store, stack, value, "MOD")
}

/// POW: exponentiation. Computed in binary64 and re-wrapped to the widest
/// operand tag.
pub fn op_pow(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let rhs = pop_value(stack, store, "POW")?;
    let lhs = pop_value(stack, store, "POW")?;
    let value = match promote(&lhs, &rhs, "POW")? {
        NumericPair::Byte(a, b) => Value::Byte(f64::from(a).powf(f64::from(b)) as u8),
        NumericPair::Number(a, b) => Value::Number(f64::from(a).powf(f64::from(b)) as i32),
        NumericPair::BigNum(a, b) => Value::BigNum((a as f64).powf(b as f64) as i64),
        NumericPair::Decimal(a, b) => Value::Decimal(a.powf(b)),
    };
    push_new(store, stack, value, "POW")
}

// ---------------------------------------------------------------------------
// Unary numeric
// ---------------------------------------------------------------------------

fn pop_numeric(
    stack: &mut OperandStack,
    store: &ObjectStore,
    op: &'static str,
) -> Result<Value, VmError> {
    let value = pop_value(stack, store, op)?;
    if value.is_numeric() {
        Ok(value)
    } else {
        Err(VmError::InvalidOperand {
            op,
            type_name: value.type_name(),
        })
    }
}

/// INC: add one, same tag.
pub fn op_inc(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let value = match pop_numeric(stack, store, "INC")? {
        Value::Byte(b) => Value::Byte(b.wrapping_add(1)),
        Value::Number(n) => Value::Number(n.wrapping_add(1)),
        Value::BigNum(n) => Value::BigNum(n.wrapping_add(1)),
        Value::Decimal(d) => Value::Decimal(d + 1.0),
        _ => unreachable!("pop_numeric"),
    };
    push_new(store, stack, value, "INC")
}

/// DEC: subtract one, same tag.
pub fn op_dec(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let value = match pop_numeric(stack, store, "DEC")? {
        Value::Byte(b) => Value::Byte(b.wrapping_sub(1)),
        Value::Number(n) => Value::Number(n.wrapping_sub(1)),
        Value::BigNum(n) => Value::BigNum(n.wrapping_sub(1)),
        Value::Decimal(d) => Value::Decimal(d - 1.0),
        _ => unreachable!("pop_numeric"),
    };
    push_new(store, stack, value, "DEC")
}

/// NEG: arithmetic negation, same tag.
pub fn op_neg(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let value = match pop_numeric(stack, store, "NEG")? {
        Value::Byte(b) => Value::Byte(b.wrapping_neg()),
        Value::Number(n) => Value::Number(n.wrapping_neg()),
        Value::BigNum(n) => Value::BigNum(n.wrapping_neg()),
        Value::Decimal(d) => Value::Decimal(-d),
        _ => unreachable!("pop_numeric"),
    };
    push_new(store, stack, value, "NEG")
}

/// POS: absolute value, same tag.
pub fn op_pos(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let value = match pop_numeric(stack, store, "POS")? {
        Value::Byte(b) => Value::Byte(b),
        Value::Number(n) => Value::Number(n.wrapping_abs()),
        Value::BigNum(n) => Value::BigNum(n.wrapping_abs()),
        Value::Decimal(d) => Value::Decimal(d.abs()),
        _ => unreachable!("pop_numeric"),
    };
    push_new(store, stack, value, "POS")
}

/// BNT: ones' complement. DECIMAL truncates to BIGNUM, complements and
/// re-wraps.
pub fn op_bnt(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let value = match pop_numeric(stack, store, "BNT")? {
        Value::Byte(b) => Value::Byte(!b),
        Value::Number(n) => Value::Number(!n),
        Value::BigNum(n) => Value::BigNum(!n),
        Value::Decimal(d) => Value::Decimal(!(d as i64) as f64),
        _ => unreachable!("pop_numeric"),
    };
    push_new(store, stack, value, "BNT")
}

// ---------------------------------------------------------------------------
// Bitwise binary
// ---------------------------------------------------------------------------

fn bitwise(
    store: &mut ObjectStore,
    stack: &mut OperandStack,
    op: &'static str,
    apply: fn(i64, i64) -> i64,
) -> Result<(), VmError> {
    let rhs = pop_value(stack, store, op)?;
    let lhs = pop_value(stack, store, op)?;
    let value = match promote(&lhs, &rhs, op)? {
        NumericPair::Byte(a, b) => Value::Byte(apply(i64::from(a), i64::from(b)) as u8),
        NumericPair::Number(a, b) => Value::Number(apply(i64::from(a), i64::from(b)) as i32),
        NumericPair::BigNum(a, b) => Value::BigNum(apply(a, b)),
        NumericPair::Decimal(a, b) => Value::Decimal(apply(a as i64, b as i64) as f64),
    };
    push_new(store, stack, value, op)
}

/// BND: bitwise and.
pub fn op_bnd(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    bitwise(store, stack, "BND", |a, b| a & b)
}

/// BOR: bitwise or.
pub fn op_bor(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    bitwise(store, stack, "BOR", |a, b| a | b)
}

/// XOR: bitwise exclusive or.
pub fn op_xor(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    bitwise(store, stack, "XOR", |a, b| a ^ b)
}

/// SHL: shift left. The count is masked to the width of the target tag.
pub fn op_shl(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    shift(store, stack, "SHL", false)
}

/// SHR: shift right (arithmetic on the signed tags).
pub fn op_shr(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    shift(store, stack, "SHR", true)
}

fn shift(
    store: &mut ObjectStore,
    stack: &mut OperandStack,
    op: &'static str,
    right: bool,
) -> Result<(), VmError> {
    let rhs = pop_value(stack, store, op)?;
    let lhs = pop_value(stack, store, op)?;
    let value = match promote(&lhs, &rhs, op)? {
        NumericPair::Byte(a, b) => {
            let count = u32::from(b);
            Value::Byte(if right {
                a.wrapping_shr(count)
            } else {
                a.wrapping_shl(count)
            })
        }
        NumericPair::Number(a, b) => {
            let count = b as u32;
            Value::Number(if right {
                a.wrapping_shr(count)
            } else {
                a.wrapping_shl(count)
            })
        }
        NumericPair::BigNum(a, b) => {
            let count = b as u32;
            Value::BigNum(if right {
                a.wrapping_shr(count)
            } else {
                a.wrapping_shl(count)
            })
        }
        NumericPair::Decimal(a, b) => {
            let (a, count) = (a as i64, b as i64 as u32);
            Value::Decimal(if right {
                a.wrapping_shr(count) as f64
            } else {
                a.wrapping_shl(count) as f64
            })
        }
    };
    push_new(store, stack, value, op)
}

// ---------------------------------------------------------------------------
// Logical
// ---------------------------------------------------------------------------

fn pop_bool(
    stack: &mut OperandStack,
    store: &ObjectStore,
    op: &'static str,
) -> Result<bool, VmError> {
    match pop_value(stack, store, op)? {
        Value::Bool(b) => Ok(b),
        other => Err(VmError::InvalidOperand {
            op,
            type_name: other.type_name(),
        }),
    }
}

/// AND: logical and over two BOOL operands.
pub fn op_and(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let rhs = pop_bool(stack, store, "AND")?;
    let lhs = pop_bool(stack, store, "AND")?;
    push_new(store, stack, Value::Bool(lhs && rhs), "AND")
}

/// OR: logical or over two BOOL operands.
pub fn op_or(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let rhs = pop_bool(stack, store, "OR")?;
    let lhs = pop_bool(stack, store, "OR")?;
    push_new(store, stack, Value::Bool(lhs || rhs), "OR")
}

/// NOT: logical negation of one BOOL operand.
pub fn op_not(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let operand = pop_bool(stack, store, "NOT")?;
    push_new(store, stack, Value::Bool(!operand), "NOT")
}

// ---------------------------------------------------------------------------
// Comparison
// ---------------------------------------------------------------------------

/// Equality over the defined pairs: same-tag BOOL, same-tag STRING (byte
/// equality), any numeric pair after promotion, NIL with NIL. Everything
/// else is a cross-tag error.
fn values_equal(lhs: &Value, rhs: &Value, op: &'static str) -> Result<bool, VmError> {
    match (lhs, rhs) {
        (Value::Nil, Value::Nil) => Ok(true),
        (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
        (Value::String(a), Value::String(b)) => Ok(a == b),
        _ if lhs.is_numeric() && rhs.is_numeric() => Ok(match promote(lhs, rhs, op)? {
            NumericPair::Byte(a, b) => a == b,
            NumericPair::Number(a, b) => a == b,
            NumericPair::BigNum(a, b) => a == b,
            NumericPair::Decimal(a, b) => a == b,
        }),
        _ => Err(VmError::CrossTypeComparison {
            op,
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}

/// EQL: equal to.
pub fn op_eql(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let rhs = pop_value(stack, store, "EQL")?;
    let lhs = pop_value(stack, store, "EQL")?;
    let equal = values_equal(&lhs, &rhs, "EQL")?;
    push_new(store, stack, Value::Bool(equal), "EQL")
}

/// NEQ: not equal to.
pub fn op_neq(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let rhs = pop_value(stack, store, "NEQ")?;
    let lhs = pop_value(stack, store, "NEQ")?;
    let equal = values_equal(&lhs, &rhs, "NEQ")?;
    push_new(store, stack, Value::Bool(!equal), "NEQ")
}

/// Ordered comparison: numeric pairs compare by value, STRING pairs compare
/// by length (a language choice, not an accident). NIL and BOOL are invalid;
/// a STRING against a numeric tag is a cross-tag error.
fn binary_cmp(
    store: &mut ObjectStore,
    stack: &mut OperandStack,
    op: &'static str,
    accept: fn(Ordering) -> bool,
) -> Result<(), VmError> {
    let rhs = pop_value(stack, store, op)?;
    let lhs = pop_value(stack, store, op)?;
    let result = match (&lhs, &rhs) {
        (Value::String(a), Value::String(b)) => accept(a.len().cmp(&b.len())),
        _ if lhs.is_numeric() && rhs.is_numeric() => match promote(&lhs, &rhs, op)? {
            NumericPair::Byte(a, b) => accept(a.cmp(&b)),
            NumericPair::Number(a, b) => accept(a.cmp(&b)),
            NumericPair::BigNum(a, b) => accept(a.cmp(&b)),
            // NaN compares false for every ordered operator
            NumericPair::Decimal(a, b) => a.partial_cmp(&b).map(accept).unwrap_or(false),
        },
        _ => {
            for operand in [&lhs, &rhs] {
                if operand.is_nil() || operand.is_bool() {
                    return Err(VmError::InvalidOperand {
                        op,
                        type_name: operand.type_name(),
                    });
                }
            }
            return Err(VmError::CrossTypeComparison {
                op,
                lhs: lhs.type_name(),
                rhs: rhs.type_name(),
            });
        }
    };
    push_new(store, stack, Value::Bool(result), op)
}

/// GT: greater than.
pub fn op_gt(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    binary_cmp(store, stack, "GT", |ord| ord == Ordering::Greater)
}

/// GTE: greater than or equal to.
pub fn op_gte(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    binary_cmp(store, stack, "GTE", |ord| ord != Ordering::Less)
}

/// LT: less than.
pub fn op_lt(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    binary_cmp(store, stack, "LT", |ord| ord == Ordering::Less)
}

/// LTE: less than or equal to.
pub fn op_lte(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    binary_cmp(store, stack, "LTE", |ord| ord != Ordering::Greater)
}

fn pop_string(
    stack: &mut OperandStack,
    store: &ObjectStore,
    op: &'static str,
) -> Result<String, VmError> {
    match pop_value(stack, store, op)? {
        Value::String(s) => Ok(s),
        other => Err(VmError::InvalidOperand {
            op,
            type_name: other.type_name(),
        }),
    }
}

/// SLE: string lengths equal ($=).
pub fn op_sle(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let rhs = pop_string(stack, store, "SLE")?;
    let lhs = pop_string(stack, store, "SLE")?;
    push_new(store, stack, Value::Bool(lhs.len() == rhs.len()), "SLE")
}

/// SLN: string lengths not equal ($!).
pub fn op_sln(store: &mut ObjectStore, stack: &mut OperandStack) -> Result<(), VmError> {
    let rhs = pop_string(stack, store, "SLN")?;
    let lhs = pop_string(stack, store, "SLN")?;
    push_new(store, stack, Value::Bool(lhs.len() != rhs.len()), "SLN")
}

// ---------------------------------------------------------------------------
// Stack, registers, environment
// ---------------------------------------------------------------------------

/// PSH: allocate the next feed value and push it.
pub fn op_psh(
    store: &mut ObjectStore,
    stack: &mut OperandStack,
    program: &mut Program,
) -> Result<(), VmError> {
    let value = match program.next_operand("PSH")? {
        Operand::Literal(text) => Value::from_text(&text),
        Operand::Value(value) => value,
        _ => return Err(VmError::OperandMismatch("PSH")),
    };
    push_new(store, stack, value, "PSH")
}

/// POP: discard the top of stack.
pub fn op_pop(stack: &mut OperandStack) -> Result<(), VmError> {
    stack.pop("POP")?;
    Ok(())
}

/// LOD: pop the stack into a register.
pub fn op_lod(
    stack: &mut OperandStack,
    registers: &mut RegisterFile,
    program: &mut Program,
) -> Result<(), VmError> {
    let Operand::Register(dst) = program.next_operand("LOD")? else {
        return Err(VmError::OperandMismatch("LOD"));
    };
    let handle = stack.pop("LOD")?;
    registers.set(dst, Some(handle), "LOD")
}

/// STR: push a register's content onto the stack.
pub fn op_str(
    stack: &mut OperandStack,
    registers: &RegisterFile,
    program: &mut Program,
) -> Result<(), VmError> {
    let Operand::Register(src) = program.next_operand("STR")? else {
        return Err(VmError::OperandMismatch("STR"));
    };
    let handle = registers
        .get(src, "STR")?
        .ok_or(VmError::EmptyRegister { op: "STR", index: src })?;
    stack.push(handle, "STR")
}

/// MOV: register-to-register copy, or immediate-to-register when the source
/// index is the "no source register" sentinel (the value rides the feed).
pub fn op_mov(
    store: &mut ObjectStore,
    registers: &mut RegisterFile,
    program: &mut Program,
) -> Result<(), VmError> {
    let Operand::RegisterPair(src, dst) = program.next_operand("MOV")? else {
        return Err(VmError::OperandMismatch("MOV"));
    };
    if src == REGISTER_EMPTY {
        let value = match program.next_operand("MOV")? {
            Operand::Literal(text) => Value::from_text(&text),
            Operand::Value(value) => value,
            _ => return Err(VmError::OperandMismatch("MOV")),
        };
        let handle = store.alloc(Object::new(value))?;
        registers.set(dst, Some(handle), "MOV")
    } else {
        registers.copy(src, dst, "MOV")
    }
}

/// XCG: swap two registers.
pub fn op_xcg(
    registers: &mut RegisterFile,
    program: &mut Program,
) -> Result<(), VmError> {
    let Operand::RegisterPair(a, b) = program.next_operand("XCG")? else {
        return Err(VmError::OperandMismatch("XCG"));
    };
    registers.exchange(a, b, "XCG")
}

/// CLR: empty every register.
pub fn op_clr(registers: &mut RegisterFile) -> Result<(), VmError> {
    registers.clear();
    Ok(())
}

/// CLS: empty the operand stack.
pub fn op_cls(stack: &mut OperandStack) -> Result<(), VmError> {
    stack.clear();
    Ok(())
}

/// ASN: pop a key (STRING, on top) and a value, and bind the value in the
/// environment under the key text.
///
/// The installed value becomes a global (environment bindings are roots);
/// the spent key loses its mark bit so the next cycle can collect it.
pub fn op_asn(
    store: &mut ObjectStore,
    stack: &mut OperandStack,
    env: &mut SymbolMap<Handle>,
) -> Result<(), VmError> {
    let key_handle = stack.pop("ASN")?;
    let value_handle = stack.pop("ASN")?;

    let key_object = store.get(key_handle).ok_or(VmError::StaleHandle("ASN"))?;
    let Value::String(key) = &key_object.value else {
        return Err(VmError::InvalidAssignmentKey);
    };
    let key = key.clone();

    let value_object = store
        .get_mut(value_handle)
        .ok_or(VmError::StaleHandle("ASN"))?;
    value_object.global = true;
    env.set(&key, value_handle);

    if let Some(spent_key) = store.get_mut(key_handle) {
        spent_key.reachable = false;
    }
    Ok(())
}
