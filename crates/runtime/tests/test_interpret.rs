//! End-to-end interpreter tests
//!
//! Programs are built through the emitter API exactly as the code generator
//! builds them, then run to HALTED or FAULTED.

use tinct_runtime::{
    MAX_STACK_CAPACITY, Object, Opcode, Program, SymbolMap, Value, Vm, VmError, VmState,
};

fn run(vm: &mut Vm, program: Program) -> Result<(), VmError> {
    let mut env = SymbolMap::new();
    vm.load(program);
    vm.run(&mut env)
}

#[test]
fn arithmetic_chain_halts_with_expected_top() {
    // ((10 - 3) * 4 + 2) / 5 = 6
    let mut program = Program::new();
    program.psh_literal("10").unwrap();
    program.psh_literal("3").unwrap();
    program.emit(Opcode::Sub).unwrap();
    program.psh_literal("4").unwrap();
    program.emit(Opcode::Mul).unwrap();
    program.psh_literal("2").unwrap();
    program.emit(Opcode::Add).unwrap();
    program.psh_literal("5").unwrap();
    program.emit(Opcode::Div).unwrap();
    program.emit(Opcode::End).unwrap();

    let mut vm = Vm::new();
    run(&mut vm, program).unwrap();
    assert_eq!(vm.state(), VmState::Halted);
    assert_eq!(vm.peek_value(), Some(&Value::Number(6)));
}

#[test]
fn comparison_logic_and_string_operators_compose() {
    // ("abcd" > "xyz") || !("aa" $= "bb")  =>  true || !true  =>  true
    let mut program = Program::new();
    program.psh_value(Value::String("abcd".into())).unwrap();
    program.psh_value(Value::String("xyz".into())).unwrap();
    program.emit(Opcode::Gt).unwrap();
    program.psh_value(Value::String("aa".into())).unwrap();
    program.psh_value(Value::String("bb".into())).unwrap();
    program.emit(Opcode::Sle).unwrap();
    program.emit(Opcode::Not).unwrap();
    program.emit(Opcode::Or).unwrap();
    program.emit(Opcode::End).unwrap();

    let mut vm = Vm::new();
    run(&mut vm, program).unwrap();
    assert_eq!(vm.peek_value(), Some(&Value::Bool(true)));
}

#[test]
fn environment_bindings_survive_across_programs() {
    let mut vm = Vm::new();
    let mut env = SymbolMap::new();

    let mut first = Program::new();
    first.psh_literal("21").unwrap();
    first.psh_literal("2").unwrap();
    first.emit(Opcode::Mul).unwrap();
    first.psh_value(Value::String("answer".into())).unwrap();
    first.emit(Opcode::Asn).unwrap();
    first.emit(Opcode::End).unwrap();
    vm.load(first);
    vm.run(&mut env).unwrap();

    // A collection between programs must not take the binding.
    vm.collect();

    let handle = *env.get("answer").expect("binding survives");
    assert_eq!(vm.store().get(handle).unwrap().value, Value::Number(42));

    let mut second = Program::new();
    second.psh_literal("1").unwrap();
    second.emit(Opcode::End).unwrap();
    vm.load(second);
    vm.run(&mut env).unwrap();
    assert_eq!(env.len(), 1);
}

#[test]
fn stack_overflow_faults_the_machine() {
    let mut vm = Vm::new();
    for n in 0..MAX_STACK_CAPACITY {
        let handle = vm
            .store_mut()
            .alloc(Object::new(Value::Number(n as i32)))
            .unwrap();
        vm.stack_mut().push(handle, "PSH").unwrap();
    }

    let mut program = Program::new();
    program.psh_literal("1").unwrap();
    program.emit(Opcode::End).unwrap();
    let err = run(&mut vm, program).unwrap_err();
    assert_eq!(err, VmError::StackOverflow("PSH"));
    assert_eq!(vm.state(), VmState::Faulted);
}

#[test]
fn stack_underflow_faults_the_machine() {
    let mut program = Program::new();
    program.emit(Opcode::Add).unwrap();
    program.emit(Opcode::End).unwrap();

    let mut vm = Vm::new();
    let err = run(&mut vm, program).unwrap_err();
    assert_eq!(err, VmError::StackUnderflow("ADD"));
    assert_eq!(vm.state(), VmState::Faulted);
}

#[test]
fn store_grows_during_a_long_run_and_shrinks_after_collection() {
    let mut vm = Vm::new();
    for n in 0..200 {
        vm.store_mut()
            .alloc(Object::new(Value::Number(n)))
            .unwrap();
    }
    vm.store_mut()
        .alloc(Object::global(Value::Nil))
        .unwrap();
    let grown = vm.store().capacity();
    assert!(grown > 128);

    let stats = vm.collect();
    assert_eq!(stats.collected, 200);
    assert!(stats.bytes_freed > 0);
    assert!(vm.store().capacity() < grown);
    assert!(vm.store().capacity() >= 128);
}

#[test]
fn faulted_state_reports_the_mnemonic() {
    let mut program = Program::new();
    program.psh_literal("8").unwrap();
    program.psh_literal("0").unwrap();
    program.emit(Opcode::Mod).unwrap();
    program.emit(Opcode::End).unwrap();

    let mut vm = Vm::new();
    let err = run(&mut vm, program).unwrap_err();
    assert_eq!(err.to_string(), "division by zero during MOD operation");
}

#[test]
fn registers_shuffle_values_between_programs_and_stack() {
    // Load two values into registers, clear the stack, then bring them
    // back in swapped order and subtract.
    let mut program = Program::new();
    program.psh_literal("30").unwrap();
    program.psh_literal("12").unwrap();
    program.lod(1).unwrap(); // R1 = 12
    program.lod(0).unwrap(); // R0 = 30
    program.emit(Opcode::Cls).unwrap();
    program.xcg(0, 1).unwrap(); // R0 = 12, R1 = 30
    program.str_reg(1).unwrap(); // push 30
    program.str_reg(0).unwrap(); // push 12
    program.emit(Opcode::Sub).unwrap(); // 30 - 12
    program.emit(Opcode::End).unwrap();

    let mut vm = Vm::new();
    run(&mut vm, program).unwrap();
    assert_eq!(vm.peek_value(), Some(&Value::Number(18)));
}

#[test]
fn byte_values_ride_the_whole_pipeline() {
    // A char literal arrives as a pre-typed BYTE and widens on contact
    // with a NUMBER.
    let mut program = Program::new();
    program.psh_value(Value::Byte(b'A')).unwrap();
    program.psh_literal("1").unwrap();
    program.emit(Opcode::Add).unwrap();
    program.emit(Opcode::End).unwrap();

    let mut vm = Vm::new();
    run(&mut vm, program).unwrap();
    assert_eq!(vm.peek_value(), Some(&Value::Number(66)));
}
