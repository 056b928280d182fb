//! Instruction-level tests for the TMS7000 core.

use emu_core::{Cpu, IllegalOpcode, Observable, SimpleBus, Value};
use serde::Deserialize;
use ti_tms7000::{Config, Register, Tms7000, Tms7000Model, flags};

const ORIGIN: u16 = 0xF000;

/// Load `program` at 0xF000, point the reset vector at it and reset.
fn boot(program: &[u8]) -> (Tms7000, SimpleBus) {
    let mut bus = SimpleBus::new();
    bus.load(ORIGIN, program);
    bus.poke_word(0xFFFE, ORIGIN);
    let mut cpu = Tms7000::new(Tms7000Model::Tms7040);
    cpu.reset(&mut bus);
    (cpu, bus)
}

#[derive(Deserialize)]
struct AluCase {
    name: String,
    program: Vec<u8>,
    a: u8,
    b: u8,
    st: u8,
    expect_a: u8,
    expect_b: u8,
    expect_st: u8,
    cycles: u32,
}

#[test]
fn alu_fixtures() {
    let cases: Vec<AluCase> =
        serde_json::from_str(include_str!("fixtures/alu.json")).expect("fixture parses");
    for case in cases {
        let (mut cpu, mut bus) = boot(&case.program);
        cpu.set_register(Register::A, case.a.into()).expect("A");
        cpu.set_register(Register::B, case.b.into()).expect("B");
        cpu.set_register(Register::St, case.st.into()).expect("ST");
        let cycles = cpu.step(&mut bus);
        assert_eq!(cpu.a(), case.expect_a, "{}: A", case.name);
        assert_eq!(cpu.b(), case.expect_b, "{}: B", case.name);
        assert_eq!(cpu.st(), case.expect_st, "{}: ST", case.name);
        assert_eq!(cycles, case.cycles, "{}: cycles", case.name);
    }
}

#[test]
fn reset_then_nop() {
    let (mut cpu, mut bus) = boot(&[0x00]);
    assert_eq!(cpu.pc(), 0xF000);
    assert_eq!(cpu.step(&mut bus), 5);
    assert_eq!(cpu.pc(), 0xF001);
}

#[test]
fn run_overshoots_by_at_most_one_instruction() {
    let (mut cpu, mut bus) = boot(&[0x00; 64]);
    assert_eq!(cpu.run(&mut bus, 12), 15);
    assert_eq!(cpu.pc(), 0xF003);
    assert_eq!(cpu.run(&mut bus, 5), 5);
}

#[test]
fn mov_immediate_forms() {
    // MOV %0x42,A; MOV %0x43,B; MOV %0x44,R9; MOV R9,R10
    let (mut cpu, mut bus) = boot(&[0x22, 0x42, 0x52, 0x43, 0x72, 0x44, 0x09, 0x42, 0x09, 0x0A]);
    assert_eq!(cpu.step(&mut bus), 7);
    assert_eq!(cpu.step(&mut bus), 7);
    assert_eq!(cpu.step(&mut bus), 9);
    assert_eq!(cpu.step(&mut bus), 10);
    assert_eq!(cpu.a(), 0x42);
    assert_eq!(cpu.b(), 0x43);
    assert_eq!(cpu.register(Register::R(10)), 0x44);
}

#[test]
fn call_and_return_use_register_file_stack() {
    let (mut cpu, mut bus) = boot(&[0x8E, 0xF1, 0x00, 0x00]); // CALL @0xF100; NOP
    bus.load(0xF100, &[0x0A]); // RETS
    assert_eq!(cpu.step(&mut bus), 15);
    assert_eq!(cpu.pc(), 0xF100);
    assert_eq!(cpu.sp(), 3);
    assert_eq!(cpu.register(Register::R(2)), 0xF0);
    assert_eq!(cpu.register(Register::R(3)), 0x03);
    assert_eq!(cpu.step(&mut bus), 7);
    assert_eq!(cpu.pc(), 0xF003);
    assert_eq!(cpu.sp(), 1);
}

#[test]
fn btjo_taken_costs_two_more() {
    // MOV %1,A; BTJO %1,A,+2; NOP; NOP; MOV %0x99,B
    let (mut cpu, mut bus) = boot(&[0x22, 0x01, 0x26, 0x01, 0x02, 0x00, 0x00, 0x52, 0x99]);
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 10);
    assert_eq!(cpu.pc(), 0xF007);
    // BTJZ with every tested bit set falls through.
    let (mut cpu, mut bus) = boot(&[0x22, 0xFF, 0x27, 0x0F, 0x02]);
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 8);
    assert_eq!(cpu.pc(), 0xF005);
}

#[test]
fn djnz_loop() {
    // MOV %3,R5; loop: INC A; DJNZ R5,loop
    let (mut cpu, mut bus) = boot(&[0x72, 0x03, 0x05, 0xB3, 0xDA, 0x05, 0xFC]);
    cpu.step(&mut bus);
    let mut cycles = 0;
    for _ in 0..6 {
        cycles += cpu.step(&mut bus);
    }
    assert_eq!(cpu.a(), 3);
    assert_eq!(cpu.register(Register::R(5)), 0);
    assert_eq!(cpu.pc(), 0xF007);
    // Three INC A, two taken DJNZ and one that falls through.
    assert_eq!(cycles, 3 * 5 + 2 * 11 + 9);
}

#[test]
fn conditional_jump_timing() {
    // MOV %0,A (sets Z); JEQ +0; JNE +0
    let (mut cpu, mut bus) = boot(&[0x22, 0x00, 0xE2, 0x00, 0xE6, 0x00]);
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 7);
    assert_eq!(cpu.step(&mut bus), 5);
}

#[test]
fn movd_and_decd_use_register_pairs() {
    // MOVD %0x0100,R7; DECD R7
    let (mut cpu, mut bus) = boot(&[0x88, 0x01, 0x00, 0x07, 0xDB, 0x07]);
    assert_eq!(cpu.step(&mut bus), 15);
    assert_eq!(cpu.register(Register::R(6)), 0x01);
    assert_eq!(cpu.register(Register::R(7)), 0x00);
    assert_eq!(cpu.step(&mut bus), 11);
    assert_eq!(cpu.register(Register::R(6)), 0x00);
    assert_eq!(cpu.register(Register::R(7)), 0xFF);
    // N and Z follow the high byte. The 16-bit carry is left unchecked.
    assert_eq!(cpu.st() & flags::Z, flags::Z);
    assert_eq!(cpu.st() & flags::N, 0);
}

#[test]
fn extended_addressing() {
    // MOVD %0x2000,R3; MOV %4,B; LDA *R3; STA @0x3000(B)
    let (mut cpu, mut bus) = boot(&[
        0x88, 0x20, 0x00, 0x03, //
        0x52, 0x04, //
        0x9A, 0x03, //
        0xAB, 0x30, 0x00,
    ]);
    bus.poke(0x2000, 0x5A);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 9);
    assert_eq!(cpu.a(), 0x5A);
    assert_eq!(cpu.step(&mut bus), 13);
    assert_eq!(bus.peek(0x3004), 0x5A);
}

#[test]
fn trap_vectors_down_from_reset() {
    let (mut cpu, mut bus) = boot(&[0xFE]); // TRAP 1
    bus.poke_word(0xFFFC, 0xF800);
    assert_eq!(cpu.step(&mut bus), 14);
    assert_eq!(cpu.pc(), 0xF800);
    assert_eq!(cpu.sp(), 3);
}

#[test]
fn stack_pointer_transfer() {
    // MOV %0x40,B; LDSP; PUSH A; STSP
    let (mut cpu, mut bus) = boot(&[0x52, 0x40, 0x0D, 0xB8, 0x09]);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.sp(), 0x40);
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 6);
    assert_eq!(cpu.b(), 0x41);
}

#[test]
fn illegal_opcode_is_skipped() {
    let (mut cpu, mut bus) = boot(&[0x02, 0x00]);
    assert_eq!(cpu.step(&mut bus), 4);
    assert_eq!(cpu.pc(), 0xF001);
}

/// Boot a TMS7040 with a modified configuration.
fn boot_with(config: Config, program: &[u8]) -> (Tms7000, SimpleBus) {
    let mut bus = SimpleBus::new();
    bus.load(ORIGIN, program);
    bus.poke_word(0xFFFE, ORIGIN);
    let mut cpu = Tms7000::with_config(config);
    cpu.reset(&mut bus);
    (cpu, bus)
}

#[test]
fn illegal_opcode_cost_is_configurable() {
    let config = Config {
        illegal: IllegalOpcode::Ignore { cycles: 9 },
        ..Tms7000Model::Tms7040.config()
    };
    let (mut cpu, mut bus) = boot_with(config, &[0x02, 0x00]);
    assert_eq!(cpu.step(&mut bus), 9);
    assert_eq!(cpu.pc(), 0xF001);
    assert_eq!(cpu.sp(), 1);
}

#[test]
fn illegal_opcode_can_trap_through_trap_zero() {
    let config = Config {
        illegal: IllegalOpcode::Trap,
        ..Tms7000Model::Tms7040.config()
    };
    let (mut cpu, mut bus) = boot_with(config, &[0x02, 0x00]);
    bus.poke_word(0xFFFE, 0xF800);
    assert_eq!(cpu.step(&mut bus), 14);
    assert_eq!(cpu.pc(), 0xF800);
    // Return address of the opcode after the illegal one.
    assert_eq!(cpu.sp(), 3);
    assert_eq!(cpu.register(Register::R(2)), 0xF0);
    assert_eq!(cpu.register(Register::R(3)), 0x01);
}

#[test]
fn tiny_register_file_still_holds_a_and_b() {
    let config = Config {
        rf_size: 0,
        ..Tms7000Model::Tms7000.config()
    };
    let (cpu, _) = boot_with(config, &[0x00]);
    assert_eq!(cpu.config().rf_size, 2);
    assert_eq!(cpu.registers().b, 0);
    assert!(cpu.try_register(Register::R(2)).is_err());
}

#[test]
fn oversized_register_file_leaves_the_peripheral_file_alone() {
    let config = Config {
        rf_size: 0x400,
        ..Tms7000Model::Tms7040.config()
    };
    // MOV %0x5A,A; STA @0x0104
    let (mut cpu, mut bus) = boot_with(config, &[0x22, 0x5A, 0x8B, 0x01, 0x04]);
    assert_eq!(cpu.config().rf_size, 0x100);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(bus.peek_io(4), 0x5A);
}

#[test]
fn wait_states_are_charged() {
    use emu_core::{Bus, ReadResult};

    struct SlowBus(SimpleBus);
    impl Bus for SlowBus {
        fn read(&mut self, address: u32) -> ReadResult {
            let data = self.0.read(address).data;
            ReadResult::with_wait(data, 1)
        }
        fn write(&mut self, address: u32, value: u8) -> u8 {
            self.0.write(address, value)
        }
        fn io_read(&mut self, address: u32) -> ReadResult {
            self.0.io_read(address)
        }
        fn io_write(&mut self, address: u32, value: u8) -> u8 {
            self.0.io_write(address, value)
        }
    }
    let (mut cpu, bus) = boot(&[0x22, 0x01]);
    let mut slow = SlowBus(bus);
    // Two fetches from external memory, one wait state each.
    assert_eq!(cpu.step(&mut slow), 9);
    assert_eq!(cpu.query("a"), Some(Value::U8(1)));
}
