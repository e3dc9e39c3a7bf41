use dcpu16::assembler::assemble;
use dcpu16::report::Report;
use dcpu16::spec::hw::{Reg, FONT_BASE, SCRATCH_ADDR};
use dcpu16::vm::{Emulator, LogLevel, State};

fn assemble_clean(source: &str) -> Vec<u32> {
    let mut report = Report::new();
    let code = assemble(source, &mut report);
    assert!(report.is_empty(), "unexpected diagnostics:\n{}", report);
    code
}

fn boot(source: &str) -> Emulator {
    let mut vm = Emulator::new(LogLevel::default());
    vm.load(&assemble_clean(source));
    vm
}

fn run_to_halt(vm: &mut Emulator, cap: u64) {
    let mut steps = 0;
    while vm.state() == State::Running {
        assert!(steps < cap, "program did not halt within {} steps", cap);
        vm.step();
        steps += 1;
    }
}

#[test]
fn set_chains_through_registers() {
    let mut vm = boot("SET A, 5\nSET B, A");
    vm.step();
    vm.step();
    assert_eq!(vm.reg(Reg::A), 5);
    assert_eq!(vm.reg(Reg::B), 5);
}

#[test]
fn add_carries_into_overflow() {
    let mut vm = boot("SET A, 0xFFFF\nADD A, 1");
    vm.step();
    vm.step();
    assert_eq!(vm.reg(Reg::A), 0);
    assert_eq!(vm.reg(Reg::O), 1);
}

#[test]
fn jsr_pushes_return_address_and_jumps() {
    let mut vm = boot(
        ":loop\n\
         SET A, 1\n\
         JSR loop",
    );
    vm.step();
    vm.step();
    assert_eq!(vm.reg(Reg::A), 1);
    assert_eq!(vm.reg(Reg::PC), 0);
    assert_eq!(vm.reg(Reg::SP), 0xFFFE);
    assert_eq!(vm.mem(0xFFFE), 4);
}

#[test]
fn skip_advances_past_extra_words() {
    let mut vm = boot(
        "SET A, 1\n\
         IFE A, 0\n\
         SET [0x1000], 0x2222\n\
         SET B, 9",
    );
    run_to_halt(&mut vm, 10);
    assert_eq!(vm.mem(0x1000), 0);
    assert_eq!(vm.reg(Reg::B), 9);
}

#[test]
fn conditional_that_holds_executes_next() {
    let mut vm = boot(
        "SET A, 1\n\
         IFE A, 1\n\
         SET [0x1000], 0x2222\n\
         SET B, 9",
    );
    run_to_halt(&mut vm, 10);
    assert_eq!(vm.mem(0x1000), 0x2222);
    assert_eq!(vm.reg(Reg::B), 9);
}

#[test]
fn conditional_family() {
    let mut vm = boot(
        "SET A, 5\n\
         IFG A, 3\n\
         SET B, 1\n\
         IFG A, 9\n\
         SET C, 1\n\
         IFB A, 4\n\
         SET X, 1\n\
         IFN A, 5\n\
         SET Y, 1",
    );
    run_to_halt(&mut vm, 20);
    assert_eq!(vm.reg(Reg::B), 1);
    assert_eq!(vm.reg(Reg::C), 0);
    assert_eq!(vm.reg(Reg::X), 1);
    assert_eq!(vm.reg(Reg::Y), 0);
}

#[test]
fn sub_underflow_is_lifted_by_one_short() {
    let mut vm = boot("SET A, 0\nSUB A, 1");
    vm.step();
    vm.step();
    assert_eq!(vm.reg(Reg::A), 0xFFFE);
    assert_eq!(vm.reg(Reg::O), 0xFFFF);
}

#[test]
fn mul_captures_high_bits() {
    let mut vm = boot("SET A, 0x8000\nMUL A, 4");
    vm.step();
    vm.step();
    assert_eq!(vm.reg(Reg::A), 0);
    assert_eq!(vm.reg(Reg::O), 2);
}

#[test]
fn div_truncates_and_captures_fraction() {
    let mut vm = boot("SET A, 7\nDIV A, 2");
    vm.step();
    vm.step();
    assert_eq!(vm.reg(Reg::A), 3);
    assert_eq!(vm.reg(Reg::O), 0x8000);
}

#[test]
fn div_by_zero_does_not_fault() {
    let mut vm = boot("SET A, 7\nDIV A, 0");
    vm.step();
    vm.step();
    assert_eq!(vm.reg(Reg::A), 0);
    assert_eq!(vm.reg(Reg::O), 0);
}

#[test]
fn mod_follows_dividend() {
    let mut vm = boot("SET A, 7\nMOD A, 3");
    vm.step();
    vm.step();
    assert_eq!(vm.reg(Reg::A), 1);
}

#[test]
fn shifts_capture_spilled_bits() {
    let mut vm = boot("SET A, 0xFFFF\nSHL A, 4");
    vm.step();
    vm.step();
    assert_eq!(vm.reg(Reg::A), 0xFFF0);
    assert_eq!(vm.reg(Reg::O), 0xF);

    let mut vm = boot("SET A, 0xFF\nSHR A, 4");
    vm.step();
    vm.step();
    assert_eq!(vm.reg(Reg::A), 0xF);
    assert_eq!(vm.reg(Reg::O), 0xF000);
}

#[test]
fn stack_operations() {
    let mut vm = boot(
        "SET PUSH, 0x1234\n\
         SET Y, PEEK\n\
         SET X, POP",
    );
    run_to_halt(&mut vm, 10);
    assert_eq!(vm.reg(Reg::Y), 0x1234);
    assert_eq!(vm.reg(Reg::X), 0x1234);
    assert_eq!(vm.reg(Reg::SP), 0xFFFF);
}

#[test]
fn control_registers_as_plain_operands() {
    let mut vm = boot("SET SP, 0x1234\nSET A, SP");
    vm.step();
    vm.step();
    assert_eq!(vm.reg(Reg::SP), 0x1234);
    assert_eq!(vm.reg(Reg::A), 0x1234);
}

#[test]
fn memory_addressing_forms() {
    let mut vm = boot(
        "SET I, 0x3000\n\
         SET [I], 42\n\
         SET X, [0+I]\n\
         SET Y, [0x3000]",
    );
    run_to_halt(&mut vm, 10);
    assert_eq!(vm.mem(0x3000), 42);
    assert_eq!(vm.reg(Reg::X), 42);
    assert_eq!(vm.reg(Reg::Y), 42);
}

#[test]
fn literal_write_mutates_the_stream() {
    // Writing through the literal operand form lands in the code cell
    // holding the literal itself.
    let mut vm = boot("SET 5, 10");
    vm.step();
    assert_eq!(vm.mem(1), 10);
    assert_eq!(vm.state(), State::Halted);
}

#[test]
fn machine_halts_at_program_end() {
    let mut vm = boot("SET A, 1");
    assert_eq!(vm.state(), State::Running);
    vm.step();
    assert_eq!(vm.state(), State::Halted);
    assert_eq!(vm.reg(Reg::PC), 2);

    // Further steps are no-ops.
    vm.step();
    assert_eq!(vm.reg(Reg::A), 1);
    assert_eq!(vm.reg(Reg::PC), 2);
    assert_eq!(vm.total_steps(), 1);
}

#[test]
fn empty_program_is_immediately_halted() {
    let mut vm = Emulator::new(LogLevel::default());
    vm.load(&[]);
    assert_eq!(vm.state(), State::Halted);
    vm.step();
    assert_eq!(vm.reg(Reg::PC), 0);
}

#[test]
fn display_and_font_regions() {
    let mut vm = boot("SET [0x8000], 72");
    vm.step();
    assert_eq!(vm.vram()[0], 72);

    vm.write_word(FONT_BASE + 2, 0xBEEF);
    assert_eq!(vm.font()[2], 0xBEEF);
}

#[test]
fn undefined_operand_codes_resolve_to_scratch() {
    // 0x20 in the B field is outside every defined addressing mode.
    let mut vm = Emulator::new(LogLevel::default());
    vm.load(&[0x8001]);
    vm.write_word(SCRATCH_ADDR, 7);
    vm.step();
    assert_eq!(vm.reg(Reg::A), 7);

    // And in the A field the write lands harmlessly in the scratch cell.
    let mut vm = Emulator::new(LogLevel::default());
    vm.load(&[0x201]);
    vm.step();
    assert_eq!(vm.state(), State::Halted);
}

#[test]
fn reload_reruns_identically() {
    let source = ":loop\n\
                  ADD A, 1\n\
                  IFN A, 3\n\
                  SET PC, loop";
    let code = assemble_clean(source);

    let mut vm = Emulator::new(LogLevel::default());
    vm.load(&code);
    run_to_halt(&mut vm, 100);
    let first = (vm.reg(Reg::A), vm.reg(Reg::PC), vm.reg(Reg::SP), vm.total_steps());

    vm.load(&code);
    run_to_halt(&mut vm, 100);
    let second = (vm.reg(Reg::A), vm.reg(Reg::PC), vm.reg(Reg::SP), vm.total_steps());

    assert_eq!(first, second);
    assert_eq!(vm.reg(Reg::A), 3);
}

#[test]
fn forward_references_match_straight_line_equivalent() {
    let mut forward = boot(
        "JSR routine\n\
         SET B, A\n\
         SET PC, end\n\
         :routine\n\
         SET A, 5\n\
         SET PC, POP\n\
         :end",
    );
    run_to_halt(&mut forward, 100);

    let mut straight = boot("SET A, 5\nSET B, A");
    run_to_halt(&mut straight, 100);

    for reg in &[Reg::A, Reg::B, Reg::C, Reg::SP, Reg::O] {
        assert_eq!(forward.reg(*reg), straight.reg(*reg), "register {}", reg);
    }
}
