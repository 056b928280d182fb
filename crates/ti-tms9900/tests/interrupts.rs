//! Interrupt priority, LOAD, the TMS9995 decrementer and the MID trap.

use emu_core::{Bus, Cpu, LineState, Observable, ReadResult, SimpleBus, Value};
use ti_tms9900::flags::MASK;
use ti_tms9900::onchip::{DECREMENTER, INT1, INTERNAL};
use ti_tms9900::{Register, Tms9900, Tms9900Model};

const WS: u16 = 0x8300;
const ORIGIN: u16 = 0x0100;
/// JMP $ (spin in place).
const SPIN: u16 = 0x10FF;
/// JMP $+2 (fall through).
const NOP: u16 = 0x1000;

fn boot(model: Tms9900Model, program: &[u16]) -> (Tms9900, SimpleBus) {
    let mut bus = SimpleBus::new();
    for (i, &word) in program.iter().enumerate() {
        bus.poke_word(ORIGIN + 2 * i as u16, word);
    }
    bus.poke_word(0x0000, WS);
    bus.poke_word(0x0002, ORIGIN);
    // Level n vectors to WP 0x8300 + 0x20n, PC 0x0400 + 0x10n.
    for level in 1..16u16 {
        bus.poke_word(4 * level, WS + 0x20 * level);
        bus.poke_word(4 * level + 2, 0x0400 + 0x10 * level);
        bus.poke_word(0x0400 + 0x10 * level, NOP);
    }
    let mut cpu = Tms9900::new(model);
    cpu.reset(&mut bus);
    (cpu, bus)
}

#[test]
fn lowest_level_wins_and_lowers_the_mask() {
    // LIMI 15; NOP
    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9900, &[0x0300, 0x000F, NOP]);
    cpu.step(&mut bus);
    cpu.set_irq_line(5, LineState::Asserted);
    cpu.set_irq_line(2, LineState::Asserted);
    // Service (22) plus the NOP at the handler (10).
    assert_eq!(cpu.step(&mut bus), 22 + 10);
    assert_eq!(bus.acknowledged, vec![2]);
    assert_eq!(cpu.wp(), WS + 0x40);
    assert_eq!(cpu.pc(), 0x0422);
    assert_eq!(cpu.st() & MASK, 1);
    assert_eq!(bus.peek_word(0x835A), WS);
    assert_eq!(bus.peek_word(0x835C), 0x0104);
    assert_eq!(bus.peek_word(0x835E), 0x000F);

    // Both lines still asserted, but the mask now holds them off.
    cpu.step(&mut bus);
    assert_eq!(bus.acknowledged, vec![2]);
}

#[test]
fn masked_levels_wait() {
    // LIMI 2; NOP; NOP
    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9900, &[0x0300, 0x0002, NOP, NOP]);
    cpu.step(&mut bus);
    cpu.set_irq_line(3, LineState::Held);
    assert_eq!(cpu.step(&mut bus), 10);
    assert!(bus.acknowledged.is_empty());
    cpu.set_register(&mut bus, Register::St, 3).expect("ST");
    cpu.step(&mut bus);
    assert_eq!(bus.acknowledged, vec![3]);
}

/// Level 0 is the reset level. Servicing it leaves the mask at 0 rather
/// than above the serviced level, so a level 0 request still active after
/// the context switch is taken again before the next instruction.
#[test]
fn level_zero_reset_request_is_retaken_while_active() {
    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9900, &[NOP, NOP]);
    bus.poke_word(0x0000, 0x8380);
    bus.poke_word(0x0002, 0x0500);
    bus.poke_word(0x0500, NOP);
    cpu.set_irq_line(0, LineState::Asserted);
    cpu.step(&mut bus);
    assert_eq!(bus.acknowledged, vec![0]);
    assert_eq!(cpu.pc(), 0x0502);
    assert_eq!(cpu.st() & MASK, 0);
    cpu.step(&mut bus);
    assert_eq!(bus.acknowledged, vec![0, 0]);
    assert_eq!(cpu.pc(), 0x0502);
}

#[test]
fn load_vectors_through_fffc_and_keeps_the_mask() {
    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9900, &[0x0300, 0x0007, NOP]);
    bus.poke_word(0xFFFC, 0x83E0);
    bus.poke_word(0xFFFE, 0x0600);
    bus.poke_word(0x0600, NOP);
    cpu.step(&mut bus);
    let load = Tms9900Model::Tms9900.config().load_line();
    assert_eq!(load, 16);
    cpu.set_irq_line(load, LineState::Held);
    cpu.step(&mut bus);
    assert_eq!(bus.acknowledged, vec![16]);
    assert_eq!(cpu.wp(), 0x83E0);
    assert_eq!(cpu.pc(), 0x0602);
    assert_eq!(cpu.st() & MASK, 7);
    assert_eq!(cpu.query("irq.16.state"), Some(Value::String("Clear".into())));
}

#[test]
fn blwp_suppresses_one_interrupt_check() {
    // LIMI 15; BLWP @>0200 -> WP 0x8340, PC 0x0300
    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9900, &[0x0300, 0x000F, 0x0420, 0x0200]);
    bus.poke_word(0x0200, 0x8340);
    bus.poke_word(0x0202, 0x0300);
    bus.poke_word(0x0300, NOP);
    bus.poke_word(0x0302, NOP);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.set_irq_line(1, LineState::Held);

    // The first instruction of the called routine runs before the check.
    assert_eq!(cpu.step(&mut bus), 10);
    assert_eq!(cpu.pc(), 0x0302);
    assert!(bus.acknowledged.is_empty());

    cpu.step(&mut bus);
    assert_eq!(bus.acknowledged, vec![1]);
}

#[test]
fn rtwp_from_a_handler_restores_the_mask() {
    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9900, &[0x0300, 0x000F, NOP, NOP]);
    bus.poke_word(0x0440, 0x0380); // RTWP at the level 4 handler
    cpu.step(&mut bus);
    cpu.set_irq_line(4, LineState::Held);
    assert_eq!(cpu.step(&mut bus), 22 + 14);
    assert_eq!(cpu.pc(), 0x0104);
    assert_eq!(cpu.wp(), WS);
    assert_eq!(cpu.st() & MASK, 15);
}

#[test]
fn idle_waits_for_an_interrupt() {
    // LIMI 1; IDLE
    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9900, &[0x0300, 0x0001, 0x0340]);
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 12);
    assert!(cpu.is_idle());
    assert!(bus.idle);
    for _ in 0..10 {
        let spent = cpu.step(&mut bus);
        assert!((1..=4).contains(&spent));
    }
    assert!(cpu.is_idle());

    cpu.set_irq_line(1, LineState::Held);
    cpu.step(&mut bus);
    assert!(!cpu.is_idle());
    assert!(!bus.idle);
    assert_eq!(bus.acknowledged, vec![1]);
}

#[test]
fn tms9900_drops_a_pulse_the_tms9995_latches() {
    let program = [0x0300, 0x000F, NOP, NOP];

    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9900, &program);
    cpu.step(&mut bus);
    cpu.set_irq_line(1, LineState::Asserted);
    cpu.set_irq_line(1, LineState::Clear);
    cpu.step(&mut bus);
    assert!(bus.acknowledged.is_empty());

    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9995, &program);
    cpu.step(&mut bus);
    cpu.set_irq_line(INT1, LineState::Asserted);
    cpu.set_irq_line(INT1, LineState::Clear);
    cpu.step(&mut bus);
    assert_eq!(bus.acknowledged, vec![INT1]);
}

#[test]
fn tms9980a_load_is_line_five() {
    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9980A, &[NOP, NOP]);
    bus.poke_word(0xFFFC & 0x3FFF, 0x83E0);
    bus.poke_word(0xFFFE & 0x3FFF, 0x0600);
    bus.poke_word(0x0600, NOP);
    cpu.set_irq_line(5, LineState::Held);
    cpu.step(&mut bus);
    assert_eq!(bus.acknowledged, vec![5]);
    assert_eq!(cpu.pc(), 0x0602);
}

#[test]
fn tms9995_decrementer_raises_level_three() {
    let (mut cpu, mut bus) = boot(
        Tms9900Model::Tms9995,
        &[
            0x020C, 0x1EE0, // LI R12,>1EE0 (flag register)
            0x1D01, // SBO 1: enable the decrementer
            0x0200, 0x000A, // LI R0,10
            0xC800, 0xFFFA, // MOV R0,@>FFFA
            0x0300, 0x0003, // LIMI 3
            0x0340, // IDLE
        ],
    );
    bus.poke_word(0x000C, 0x8380);
    bus.poke_word(0x000E, 0x0500);
    bus.poke_word(0x0500, SPIN);

    for _ in 0..6 {
        cpu.step(&mut bus);
    }
    assert!(cpu.is_idle());
    assert_eq!(cpu.query("decrementer.start"), Some(Value::U16(10)));

    let mut steps = 0;
    while cpu.is_idle() {
        cpu.step(&mut bus);
        steps += 1;
        assert!(steps < 100, "decrementer never fired");
    }
    assert_eq!(bus.acknowledged, vec![DECREMENTER]);
    assert_eq!(cpu.wp(), 0x8380);
    assert_eq!(cpu.pc(), 0x0500);
    assert_eq!(cpu.st() & MASK, 2);
    // Reloaded from the start value and counting again.
    assert_eq!(cpu.query("decrementer.start"), Some(Value::U16(10)));
    assert_eq!(cpu.query("irq.3.latched"), Some(Value::Bool(false)));
}

#[test]
fn tms9995_decrementer_is_on_chip() {
    // LI R0,>0100; MOV R0,@>FFFA; MOV @>FFFA,R1
    let (mut cpu, mut bus) = boot(
        Tms9900Model::Tms9995,
        &[0x0200, 0x0100, 0xC800, 0xFFFA, 0xC060, 0xFFFA],
    );
    for _ in 0..3 {
        cpu.step(&mut bus);
    }
    // Not enabled, so still at its start value.
    assert_eq!(bus.peek_word(WS + 2), 0x0100);
    assert_eq!(bus.peek_word(0xFFFA), 0);
}

#[test]
fn tms9995_illegal_opcode_sets_mid_and_traps() {
    // LIMI 2; illegal
    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9995, &[0x0300, 0x0002, 0x0000]);
    bus.poke_word(0x0008, 0x8360);
    bus.poke_word(0x000A, 0x0600);
    bus.poke_word(0x0600, SPIN);
    cpu.step(&mut bus);
    assert_eq!(cpu.step(&mut bus), 6);
    assert!(cpu.mid());
    assert_eq!(cpu.query("mid"), Some(Value::Bool(true)));

    // Service (14) plus the JMP at the handler (3).
    assert_eq!(cpu.step(&mut bus), 14 + 3);
    assert_eq!(bus.acknowledged, vec![INTERNAL]);
    assert_eq!(cpu.pc(), 0x0600);
    assert_eq!(cpu.st() & MASK, 1);
    // MID stays set until software clears it.
    assert!(cpu.mid());
}

#[test]
fn tms9995_handler_reads_and_clears_mid() {
    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9995, &[0x0000, 0x0300, 0x0002]);
    bus.poke_word(0x0008, 0x8360);
    bus.poke_word(0x000A, 0x0600);
    // LI R12,>1FDA (bit 0xFED); TB 0; SBZ 0
    for (i, word) in [0x020C, 0x1FDA, 0x1F00, 0x1E00].into_iter().enumerate() {
        bus.poke_word(0x0600 + 2 * i as u16, word);
    }
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.pc(), 0x0604);
    cpu.step(&mut bus);
    assert_eq!(cpu.st() & ti_tms9900::flags::EQ, ti_tms9900::flags::EQ);
    cpu.step(&mut bus);
    assert!(!cpu.mid());
}

#[test]
fn tms9995_overflow_interrupt_needs_ovie() {
    // LST R1; AI R2,1
    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9995, &[0x0081, 0x0222, 0x0001, NOP]);
    bus.poke_word(0x0008, 0x8360);
    bus.poke_word(0x000A, 0x0600);
    bus.poke_word(0x0600, SPIN);
    bus.poke_word(WS + 2, 0x0022); // OVIE, mask 2
    bus.poke_word(WS + 4, 0x7FFF);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.query("irq.2.latched"), Some(Value::Bool(true)));
    cpu.step(&mut bus);
    assert_eq!(bus.acknowledged, vec![INTERNAL]);
    assert!(!cpu.mid());
}

#[test]
fn tms9995_overflow_without_ovie_is_silent() {
    let (mut cpu, mut bus) = boot(Tms9900Model::Tms9995, &[0x0081, 0x0222, 0x0001, NOP]);
    bus.poke_word(WS + 2, 0x0002);
    bus.poke_word(WS + 4, 0x7FFF);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert!(bus.acknowledged.is_empty());
    assert_eq!(cpu.query("irq.2.latched"), Some(Value::Bool(false)));
}

#[test]
fn tms9995_flag_register_mirrors_latches() {
    // LI R12,>1EE0; SBO 3 (set the decrementer latch); LIMI 3; NOP
    let (mut cpu, mut bus) = boot(
        Tms9900Model::Tms9995,
        &[0x020C, 0x1EE0, 0x1D03, 0x0300, 0x0003, NOP],
    );
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(cpu.query("flag_register"), Some(Value::U16(1 << 3)));
    assert_eq!(cpu.query("irq.3.latched"), Some(Value::Bool(true)));
    cpu.step(&mut bus);
    cpu.step(&mut bus);
    assert_eq!(bus.acknowledged, vec![DECREMENTER]);
    assert_eq!(cpu.query("flag_register"), Some(Value::U16(0)));
}

#[test]
fn tms9995_event_counter_counts_int4_edges() {
    // LI R12,>1EE0; SBO 0; SBO 1; LI R0,2; MOV R0,@>FFFA; LIMI 4; NOP...
    let (mut cpu, mut bus) = boot(
        Tms9900Model::Tms9995,
        &[
            0x020C, 0x1EE0, 0x1D00, 0x1D01, 0x0200, 0x0002, 0xC800, 0xFFFA, 0x0300, 0x0004,
            NOP, NOP, NOP,
        ],
    );
    for _ in 0..6 {
        cpu.step(&mut bus);
    }
    let int4 = ti_tms9900::onchip::INT4;
    cpu.set_irq_line(int4, LineState::Asserted);
    cpu.set_irq_line(int4, LineState::Clear);
    cpu.step(&mut bus);
    assert_eq!(cpu.query("decrementer.count"), Some(Value::U16(1)));
    // INT4 itself is not latched in event mode.
    assert!(bus.acknowledged.is_empty());

    cpu.set_irq_line(int4, LineState::Asserted);
    cpu.set_irq_line(int4, LineState::Clear);
    cpu.step(&mut bus);
    assert_eq!(bus.acknowledged, vec![DECREMENTER]);
}

/// Host timer that drives level 1 on its first peripheral tick.
struct TimerBus {
    inner: SimpleBus,
    ticks: u32,
}

impl Bus for TimerBus {
    fn read(&mut self, address: u32) -> ReadResult {
        self.inner.read(address)
    }

    fn write(&mut self, address: u32, value: u8) -> u8 {
        self.inner.write(address, value)
    }

    fn io_read(&mut self, address: u32) -> ReadResult {
        self.inner.io_read(address)
    }

    fn io_write(&mut self, address: u32, value: u8) -> u8 {
        self.inner.io_write(address, value)
    }

    fn interrupt_ack(&mut self, line: u8) -> u8 {
        self.inner.interrupt_ack(line)
    }

    fn peripheral_tick(&mut self) -> Option<(u8, LineState)> {
        self.ticks += 1;
        (self.ticks == 1).then_some((1, LineState::Held))
    }
}

#[test]
fn host_peripheral_tick_raises_a_line_for_the_next_iteration() {
    // LIMI 15; NOP
    let (mut cpu, inner) = boot(Tms9900Model::Tms9900, &[0x0300, 0x000F, NOP]);
    let mut bus = TimerBus { inner, ticks: 0 };
    let start = cpu.total_cycles().get();
    cpu.step(&mut bus);
    // Raised after LIMI finished, not serviced inside the same step.
    assert!(bus.inner.acknowledged.is_empty());
    assert_eq!(cpu.pc(), 0x0104);
    assert_eq!(cpu.step(&mut bus), 22 + 10);
    assert_eq!(bus.inner.acknowledged, vec![1]);
    assert_eq!(cpu.pc(), 0x0412);
    // One tick per four CPU cycles.
    assert_eq!(u64::from(bus.ticks), (cpu.total_cycles().get() - start) / 4);
}
