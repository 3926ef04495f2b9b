//! Interpreter loop
//!
//! A small state machine: RUNNING from the first instruction, HALTED on
//! `END`/`HLT`, FAULTED on the first handler error or on an illegal or
//! reserved opcode. Dispatch is one dense `match` over the decoded opcode:
//! the instruction set is closed and dispatch is the hot path, so there is
//! no per-opcode dynamic dispatch.
//!
//! The VM owns the object store, operand stack, register file and the
//! loaded program; the variable environment is passed into [`Vm::run`] so a
//! driver can keep bindings alive across programs (the REPL does). Garbage
//! collection only happens when the driver asks for it via [`Vm::collect`].

use crate::error::VmError;
use crate::kernel;
use crate::opcode::Opcode;
use crate::program::Program;
use crate::registers::RegisterFile;
use crate::stack::OperandStack;
use crate::store::{GcStats, Handle, ObjectStore};
use crate::symbol_map::SymbolMap;
use crate::value::Value;
use tracing::trace;

/// Interpreter lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VmState {
    Running,
    Halted,
    Faulted,
}

enum Flow {
    Continue,
    Halt,
}

/// The virtual machine.
#[derive(Debug)]
pub struct Vm {
    store: ObjectStore,
    stack: OperandStack,
    registers: RegisterFile,
    program: Program,
    ip: usize,
    state: VmState,
}

impl Default for Vm {
    fn default() -> Self {
        Self::new()
    }
}

impl Vm {
    pub fn new() -> Self {
        Vm {
            store: ObjectStore::new(),
            stack: OperandStack::new(),
            registers: RegisterFile::new(),
            program: Program::new(),
            ip: 0,
            state: VmState::Halted,
        }
    }

    /// Replace the loaded program and rewind the instruction pointer.
    pub fn load(&mut self, program: Program) {
        self.program = program;
        self.ip = 0;
        self.state = VmState::Halted;
    }

    pub fn state(&self) -> VmState {
        self.state
    }

    pub fn stack(&self) -> &OperandStack {
        &self.stack
    }

    pub fn stack_mut(&mut self) -> &mut OperandStack {
        &mut self.stack
    }

    pub fn store(&self) -> &ObjectStore {
        &self.store
    }

    pub fn store_mut(&mut self) -> &mut ObjectStore {
        &mut self.store
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Resolve the top of stack to its value, if any.
    pub fn peek_value(&self) -> Option<&Value> {
        let handle = self.stack.peek()?;
        Some(&self.store.get(handle)?.value)
    }

    /// Execute the loaded program to HALTED or FAULTED.
    ///
    /// On a normal halt the instruction pointer rewinds and the instruction
    /// store clears, ready for the next load. On a fault the first error is
    /// returned and the machine state is left for inspection.
    pub fn run(&mut self, env: &mut SymbolMap<Handle>) -> Result<(), VmError> {
        self.state = VmState::Running;
        loop {
            match self.step(env) {
                Ok(Flow::Continue) => self.ip += 1,
                Ok(Flow::Halt) => {
                    self.state = VmState::Halted;
                    break;
                }
                Err(error) => {
                    self.state = VmState::Faulted;
                    return Err(error);
                }
            }
        }
        self.ip = 0;
        self.program.clear();
        Ok(())
    }

    fn step(&mut self, env: &mut SymbolMap<Handle>) -> Result<Flow, VmError> {
        let byte = self.program.byte_at(self.ip);
        let op = Opcode::try_from(byte).map_err(|_| VmError::IllegalInstruction(byte))?;
        trace!(ip = self.ip, op = op.mnemonic(), "dispatch");

        match op {
            Opcode::End | Opcode::Hlt => return Ok(Flow::Halt),
            Opcode::Nop => {}

            Opcode::Add => kernel::op_add(&mut self.store, &mut self.stack)?,
            Opcode::Sub => kernel::op_sub(&mut self.store, &mut self.stack)?,
            Opcode::Mul => kernel::op_mul(&mut self.store, &mut self.stack)?,
            Opcode::Div => kernel::op_div(&mut self.store, &mut self.stack)?,
            Opcode::Mod => kernel::op_mod(&mut self.store, &mut self.stack)?,
            Opcode::Pow => kernel::op_pow(&mut self.store, &mut self.stack)?,
            Opcode::Inc => kernel::op_inc(&mut self.store, &mut self.stack)?,
            Opcode::Dec => kernel::op_dec(&mut self.store, &mut self.stack)?,
            Opcode::Neg => kernel::op_neg(&mut self.store, &mut self.stack)?,
            Opcode::Pos => kernel::op_pos(&mut self.store, &mut self.stack)?,

            Opcode::And => kernel::op_and(&mut self.store, &mut self.stack)?,
            Opcode::Or => kernel::op_or(&mut self.store, &mut self.stack)?,
            Opcode::Not => kernel::op_not(&mut self.store, &mut self.stack)?,

            Opcode::Bnd => kernel::op_bnd(&mut self.store, &mut self.stack)?,
            Opcode::Bor => kernel::op_bor(&mut self.store, &mut self.stack)?,
            Opcode::Xor => kernel::op_xor(&mut self.store, &mut self.stack)?,
            Opcode::Bnt => kernel::op_bnt(&mut self.store, &mut self.stack)?,
            Opcode::Shl => kernel::op_shl(&mut self.store, &mut self.stack)?,
            Opcode::Shr => kernel::op_shr(&mut self.store, &mut self.stack)?,

            Opcode::Eql => kernel::op_eql(&mut self.store, &mut self.stack)?,
            Opcode::Neq => kernel::op_neq(&mut self.store, &mut self.stack)?,
            Opcode::Gt => kernel::op_gt(&mut self.store, &mut self.stack)?,
            Opcode::Gte => kernel::op_gte(&mut self.store, &mut self.stack)?,
            Opcode::Lt => kernel::op_lt(&mut self.store, &mut self.stack)?,
            Opcode::Lte => kernel::op_lte(&mut self.store, &mut self.stack)?,
            Opcode::Sle => kernel::op_sle(&mut self.store, &mut self.stack)?,
            Opcode::Sln => kernel::op_sln(&mut self.store, &mut self.stack)?,

            Opcode::Psh => kernel::op_psh(&mut self.store, &mut self.stack, &mut self.program)?,
            Opcode::Pop => kernel::op_pop(&mut self.stack)?,
            Opcode::Lod => {
                kernel::op_lod(&mut self.stack, &mut self.registers, &mut self.program)?
            }
            Opcode::Str => kernel::op_str(&mut self.stack, &self.registers, &mut self.program)?,
            Opcode::Mov => {
                kernel::op_mov(&mut self.store, &mut self.registers, &mut self.program)?
            }
            Opcode::Xcg => kernel::op_xcg(&mut self.registers, &mut self.program)?,
            Opcode::Clr => kernel::op_clr(&mut self.registers)?,
            Opcode::Cls => kernel::op_cls(&mut self.stack)?,

            Opcode::Asn => kernel::op_asn(&mut self.store, &mut self.stack, env)?,

            reserved => return Err(VmError::ReservedInstruction(reserved.mnemonic())),
        }
        Ok(Flow::Continue)
    }

    /// Run a garbage-collection cycle with the operand stack as the root
    /// set (globals and constants are roots implicitly).
    pub fn collect(&mut self) -> GcStats {
        self.store.collect(self.stack.handles())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Object;

    fn run_program(vm: &mut Vm, program: Program) -> Result<(), VmError> {
        let mut env = SymbolMap::new();
        vm.load(program);
        vm.run(&mut env)
    }

    #[test]
    fn integer_exponent_scenario() {
        let mut vm = Vm::new();
        let mut program = Program::new();
        program.psh_literal("2").unwrap();
        program.psh_literal("5").unwrap();
        program.emit(Opcode::Pow).unwrap();
        program.emit(Opcode::End).unwrap();
        run_program(&mut vm, program).unwrap();
        assert_eq!(vm.state(), VmState::Halted);
        assert_eq!(vm.peek_value(), Some(&Value::Number(32)));
    }

    #[test]
    fn mixed_type_add_scenario() {
        let mut vm = Vm::new();
        let mut program = Program::new();
        program.psh_literal("2").unwrap();
        program.psh_value(Value::Decimal(3.0)).unwrap();
        program.emit(Opcode::Add).unwrap();
        program.emit(Opcode::End).unwrap();
        run_program(&mut vm, program).unwrap();
        assert_eq!(vm.peek_value(), Some(&Value::Decimal(5.0)));
    }

    #[test]
    fn string_concatenation_scenario() {
        let mut vm = Vm::new();
        let mut program = Program::new();
        program
            .psh_value(Value::String("Greetings, ".into()))
            .unwrap();
        program
            .psh_value(Value::String("Tincter!".into()))
            .unwrap();
        program.emit(Opcode::Add).unwrap();
        program.emit(Opcode::End).unwrap();
        run_program(&mut vm, program).unwrap();
        assert_eq!(
            vm.peek_value(),
            Some(&Value::String("Greetings, Tincter!".into()))
        );
    }

    #[test]
    fn string_repetition_scenario() {
        let mut vm = Vm::new();
        let mut program = Program::new();
        program.psh_value(Value::String("foo".into())).unwrap();
        program.psh_literal("3").unwrap();
        program.emit(Opcode::Mul).unwrap();
        program.emit(Opcode::End).unwrap();
        run_program(&mut vm, program).unwrap();
        assert_eq!(vm.peek_value(), Some(&Value::String("foofoofoo".into())));
    }

    #[test]
    fn bitwise_mask_scenario() {
        let mut vm = Vm::new();
        let mut program = Program::new();
        program.psh_literal("255").unwrap();
        program.psh_literal("15").unwrap();
        program.emit(Opcode::Bnd).unwrap();
        program.emit(Opcode::End).unwrap();
        run_program(&mut vm, program).unwrap();
        assert_eq!(vm.peek_value(), Some(&Value::Number(15)));
    }

    #[test]
    fn comparison_and_logic_scenario() {
        let mut vm = Vm::new();
        let mut program = Program::new();
        program.psh_literal("5").unwrap();
        program.psh_literal("3").unwrap();
        program.emit(Opcode::Gt).unwrap();
        program.psh_literal("true").unwrap();
        program.emit(Opcode::And).unwrap();
        program.emit(Opcode::End).unwrap();
        run_program(&mut vm, program).unwrap();
        assert_eq!(vm.peek_value(), Some(&Value::Bool(true)));
    }

    #[test]
    fn assignment_scenario() {
        let mut vm = Vm::new();
        let mut env = SymbolMap::new();
        let mut program = Program::new();
        program.psh_literal("42").unwrap();
        program.psh_value(Value::String("x".into())).unwrap();
        program.emit(Opcode::Asn).unwrap();
        program.emit(Opcode::End).unwrap();
        vm.load(program);
        vm.run(&mut env).unwrap();
        assert!(vm.stack().is_empty());
        let bound = *env.get("x").expect("x bound");
        assert_eq!(vm.store().get(bound).unwrap().value, Value::Number(42));
    }

    #[test]
    fn gc_flow_scenario() {
        let mut vm = Vm::new();
        for n in 0..200 {
            vm.store_mut()
                .alloc(Object::new(Value::Number(n)))
                .unwrap();
        }
        vm.store_mut()
            .alloc(Object::global(Value::Number(-1)))
            .unwrap();
        vm.store_mut()
            .alloc(Object::constant(Value::Number(-2), "KEPT"))
            .unwrap();
        let stats = vm.collect();
        assert_eq!(stats.collected, 200);
        assert_eq!(vm.store().used_slots(), 2);
    }

    #[test]
    fn register_traffic_round_trip() {
        let mut vm = Vm::new();
        let mut program = Program::new();
        program.psh_literal("7").unwrap();
        program.lod(0).unwrap();
        program.mov(0, 3).unwrap();
        program.xcg(3, 15).unwrap();
        program.str_reg(15).unwrap();
        program.emit(Opcode::End).unwrap();
        run_program(&mut vm, program).unwrap();
        assert_eq!(vm.peek_value(), Some(&Value::Number(7)));
    }

    #[test]
    fn clr_and_cls_reset_machine_state() {
        let mut vm = Vm::new();
        let mut program = Program::new();
        program.psh_literal("1").unwrap();
        program.psh_literal("2").unwrap();
        program.lod(2).unwrap();
        program.emit(Opcode::Clr).unwrap();
        program.emit(Opcode::Cls).unwrap();
        program.emit(Opcode::End).unwrap();
        run_program(&mut vm, program).unwrap();
        assert!(vm.stack().is_empty());
        assert_eq!(vm.registers().get(2, "MOV").unwrap(), None);
    }

    #[test]
    fn empty_program_faults_on_the_fill_byte() {
        let mut vm = Vm::new();
        let err = run_program(&mut vm, Program::new()).unwrap_err();
        assert_eq!(err, VmError::IllegalInstruction(0xFF));
        assert_eq!(vm.state(), VmState::Faulted);
    }

    #[test]
    fn reserved_opcode_faults() {
        let mut vm = Vm::new();
        let mut program = Program::new();
        program.emit(Opcode::Jmp).unwrap();
        program.emit(Opcode::End).unwrap();
        let err = run_program(&mut vm, program).unwrap_err();
        assert_eq!(err, VmError::ReservedInstruction("JMP"));
        assert_eq!(vm.state(), VmState::Faulted);
    }

    #[test]
    fn fault_surfaces_the_first_error() {
        let mut vm = Vm::new();
        let mut program = Program::new();
        program.psh_literal("1").unwrap();
        program.psh_literal("0").unwrap();
        program.emit(Opcode::Div).unwrap();
        program.emit(Opcode::End).unwrap();
        let err = run_program(&mut vm, program).unwrap_err();
        assert_eq!(err, VmError::DivisionByZero("DIV"));
        // Operands were consumed before the fault.
        assert!(vm.stack().is_empty());
    }

    #[test]
    fn nop_and_hlt_are_benign() {
        let mut vm = Vm::new();
        let mut program = Program::new();
        program.emit(Opcode::Nop).unwrap();
        program.psh_literal("9").unwrap();
        program.emit(Opcode::Hlt).unwrap();
        run_program(&mut vm, program).unwrap();
        assert_eq!(vm.state(), VmState::Halted);
        assert_eq!(vm.peek_value(), Some(&Value::Number(9)));
    }
}
