//! Code generator: node tree to VM program
//!
//! Covers the executable subset of the language: expression statements and
//! plain assignments. The instruction set has no jump opcodes (they are
//! reserved), so control-flow statements parse but do not compile yet.
//!
//! Emission is producers-first: for a binary operator the left operand's
//! instructions are emitted, then the right operand's, then the operator,
//! so at run time the operator pops its right argument first.

use crate::ast::{Node, NodeTree};
use crate::error::CompileError;
use crate::token::TokenKind;
use tinct_runtime::{Opcode, Program, Value};

/// Generate a program for a parsed tree, terminated by `END`.
pub fn generate(tree: &NodeTree) -> Result<Program, CompileError> {
    let mut program = Program::new();
    for stat in &tree.statements {
        emit_stat(&mut program, stat)?;
    }
    program.emit(Opcode::End)?;
    Ok(program)
}

fn emit_stat(program: &mut Program, node: &Node) -> Result<(), CompileError> {
    match node.kind() {
        TokenKind::Assign => {
            // value first, key on top; ASN pops the key then the value
            emit_expr(program, &node.children[1])?;
            program.psh_value(Value::String(node.children[0].token.text.clone()))?;
            program.emit(Opcode::Asn)?;
            Ok(())
        }
        TokenKind::AddAssign
        | TokenKind::SubAssign
        | TokenKind::MulAssign
        | TokenKind::DivAssign
        | TokenKind::ModAssign
        | TokenKind::ExpAssign => Err(unsupported("compound assignment", node)),
        TokenKind::If => Err(unsupported("the 'if' statement", node)),
        TokenKind::While => Err(unsupported("the 'while' statement", node)),
        TokenKind::Do => Err(unsupported("the 'do' statement", node)),
        TokenKind::For => Err(unsupported("the 'for' statement", node)),
        TokenKind::LeftBrace => Err(unsupported("the compound statement", node)),
        TokenKind::Break => Err(unsupported("the 'break' statement", node)),
        TokenKind::Continue => Err(unsupported("the 'continue' statement", node)),
        TokenKind::Return => Err(unsupported("the 'return' statement", node)),
        _ => emit_expr(program, node),
    }
}

fn emit_expr(program: &mut Program, node: &Node) -> Result<(), CompileError> {
    // `+` and `-` lex identically in unary and binary position; arity
    // decides which opcode they mean.
    if node.children.len() == 2 {
        if let Some(op) = binary_opcode(node.kind()) {
            emit_expr(program, &node.children[0])?;
            emit_expr(program, &node.children[1])?;
            program.emit(op)?;
            return Ok(());
        }
    }
    if node.children.len() == 1 {
        if let Some(op) = unary_opcode(node.kind()) {
            emit_expr(program, &node.children[0])?;
            program.emit(op)?;
            return Ok(());
        }
    }
    match node.kind() {
        // Int literals ride the feed as text; textual coercion widens an
        // over-size literal to BIGNUM (or DECIMAL) at execution.
        TokenKind::Int | TokenKind::Float => {
            program.psh_literal(node.token.text.clone())?;
            Ok(())
        }
        // String literals must stay strings, so they are pushed pre-typed
        // ("42" is a STRING, not a NUMBER).
        TokenKind::String => {
            program.psh_value(Value::String(node.token.text.clone()))?;
            Ok(())
        }
        // A char literal is its byte
        TokenKind::Char => {
            let byte = node.token.text.as_bytes().first().copied().unwrap_or(0);
            program.psh_value(Value::Byte(byte))?;
            Ok(())
        }
        TokenKind::True => Ok(program.psh_value(Value::Bool(true))?),
        TokenKind::False => Ok(program.psh_value(Value::Bool(false))?),
        TokenKind::Null => Ok(program.psh_value(Value::Nil)?),
        TokenKind::Identifier => Err(unsupported("reading a variable", node)),
        TokenKind::Dot => Err(unsupported("member access", node)),
        _ => Err(unsupported("this construct", node)),
    }
}

fn unsupported(construct: &'static str, node: &Node) -> CompileError {
    CompileError::Unsupported {
        construct,
        line: node.line(),
    }
}

fn binary_opcode(kind: TokenKind) -> Option<Opcode> {
    Some(match kind {
        TokenKind::Add => Opcode::Add,
        TokenKind::Sub => Opcode::Sub,
        TokenKind::Mul => Opcode::Mul,
        TokenKind::Div => Opcode::Div,
        TokenKind::Mod => Opcode::Mod,
        TokenKind::Exp => Opcode::Pow,
        TokenKind::Equal => Opcode::Eql,
        TokenKind::NotEqual => Opcode::Neq,
        TokenKind::StrlenEqual => Opcode::Sle,
        TokenKind::StrlenNotEqual => Opcode::Sln,
        TokenKind::Greater => Opcode::Gt,
        TokenKind::GreaterEqual => Opcode::Gte,
        TokenKind::Less => Opcode::Lt,
        TokenKind::LessEqual => Opcode::Lte,
        TokenKind::And => Opcode::And,
        TokenKind::Or => Opcode::Or,
        TokenKind::BinAnd => Opcode::Bnd,
        TokenKind::BinOr => Opcode::Bor,
        TokenKind::BinXor => Opcode::Xor,
        TokenKind::Shl => Opcode::Shl,
        TokenKind::Shr => Opcode::Shr,
        _ => return None,
    })
}

fn unary_opcode(kind: TokenKind) -> Option<Opcode> {
    Some(match kind {
        TokenKind::Not => Opcode::Not,
        TokenKind::BinNot => Opcode::Bnt,
        TokenKind::Inc => Opcode::Inc,
        TokenKind::Dec => Opcode::Dec,
        TokenKind::Sub => Opcode::Neg,
        TokenKind::Add => Opcode::Pos,
        _ => return None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::Parser;
    use tinct_runtime::{SymbolMap, Vm};

    fn compile(source: &str) -> Result<Program, CompileError> {
        let tree = Parser::new(source)?.parse()?;
        generate(&tree)
    }

    fn eval(source: &str) -> Value {
        let mut vm = Vm::new();
        let mut env = SymbolMap::new();
        vm.load(compile(source).unwrap());
        vm.run(&mut env).unwrap();
        vm.peek_value().cloned().expect("a result on the stack")
    }

    #[test]
    fn arithmetic_expression_evaluates() {
        assert_eq!(eval("2 ** 5"), Value::Number(32));
        assert_eq!(eval("1 + 2 * 3"), Value::Number(7));
        assert_eq!(eval("(1 + 2) * 3"), Value::Number(9));
        assert_eq!(eval("2 + 3.0"), Value::Decimal(5.0));
    }

    #[test]
    fn unary_expressions_evaluate() {
        assert_eq!(eval("-5"), Value::Number(-5));
        assert_eq!(eval("!false"), Value::Bool(true));
        assert_eq!(eval("~0"), Value::Number(-1));
    }

    #[test]
    fn string_literals_stay_strings() {
        assert_eq!(eval("\"42\""), Value::String("42".into()));
        assert_eq!(
            eval("\"foo\" + \"bar\""),
            Value::String("foobar".into())
        );
        assert_eq!(eval("\"ab\" * 3"), Value::String("ababab".into()));
    }

    #[test]
    fn char_literals_become_bytes() {
        assert_eq!(eval("'A'"), Value::Byte(65));
        assert_eq!(eval("'A' + 1"), Value::Number(66));
    }

    #[test]
    fn keyword_literals_evaluate() {
        assert_eq!(eval("true && true"), Value::Bool(true));
        assert_eq!(eval("null == null"), Value::Bool(true));
    }

    #[test]
    fn comparison_chains_evaluate() {
        assert_eq!(eval("5 > 3 && 2 <= 2"), Value::Bool(true));
        assert_eq!(eval("\"abc\" $= \"xyz\""), Value::Bool(true));
    }

    #[test]
    fn assignment_binds_in_the_environment() {
        let mut vm = Vm::new();
        let mut env = SymbolMap::new();
        vm.load(compile("var x = 40 + 2").unwrap());
        vm.run(&mut env).unwrap();
        assert!(vm.stack().is_empty());
        let handle = *env.get("x").expect("x bound");
        assert_eq!(vm.store().get(handle).unwrap().value, Value::Number(42));
    }

    #[test]
    fn control_flow_is_reported_unsupported() {
        let err = compile("if true { x = 1 }").unwrap_err();
        assert_eq!(
            err,
            CompileError::Unsupported {
                construct: "the 'if' statement",
                line: 1
            }
        );
        assert!(compile("while true { x = 1 }").is_err());
        assert!(compile("x += 1").is_err());
    }

    #[test]
    fn variable_reads_are_reported_unsupported() {
        let err = compile("x = 1\ny = x + 1").unwrap_err();
        assert_eq!(
            err,
            CompileError::Unsupported {
                construct: "reading a variable",
                line: 2
            }
        );
    }

    #[test]
    fn oversize_literals_widen_at_execution() {
        assert_eq!(eval("2147483648"), Value::BigNum(2_147_483_648));
        assert_eq!(eval("3.5"), Value::Decimal(3.5));
    }
}
